use std::collections::BTreeMap;
use std::path::Path;

use serde::Serialize;

use crate::error::{Result, TotoError};
use crate::evaluator::EvaluationResult;

#[derive(Debug, Clone, PartialEq)]
pub struct PerformanceTrends {
    pub evaluated_draws: usize,
    pub mean_best_hits: f64,
    pub mean_average_hits: f64,
    /// Première date atteignant le meilleur score.
    pub best_draw: (String, usize),
    /// Première date au score le plus faible.
    pub worst_draw: (String, usize),
}

/// Tendances sur toutes les évaluations stockées ; `None` sans évaluation.
pub fn performance_trends(evaluations: &BTreeMap<String, EvaluationResult>) -> Option<PerformanceTrends> {
    let n = evaluations.len();
    if n == 0 {
        return None;
    }

    let mut best: Option<(&String, usize)> = None;
    let mut worst: Option<(&String, usize)> = None;
    for (date, e) in evaluations {
        let hits = e.summary.best_hit_count;
        if best.map_or(true, |(_, b)| hits > b) {
            best = Some((date, hits));
        }
        if worst.map_or(true, |(_, w)| hits < w) {
            worst = Some((date, hits));
        }
    }
    let (best, worst) = (best?, worst?);

    Some(PerformanceTrends {
        evaluated_draws: n,
        mean_best_hits: evaluations.values().map(|e| e.summary.best_hit_count as f64).sum::<f64>() / n as f64,
        mean_average_hits: evaluations.values().map(|e| e.summary.average_hit_count).sum::<f64>() / n as f64,
        best_draw: (best.0.clone(), best.1),
        worst_draw: (worst.0.clone(), worst.1),
    })
}

#[derive(Debug, Serialize)]
struct EvaluationRow {
    draw_date: String,
    actual_result: String,
    best_hit_count: usize,
    best_prediction_index: usize,
    average_hit_count: f64,
    total_predictions: usize,
    hits_0: usize,
    hits_1: usize,
    hits_2: usize,
    hits_3: usize,
    hits_4: usize,
    hits_5: usize,
    hits_6: usize,
}

impl From<&EvaluationResult> for EvaluationRow {
    fn from(e: &EvaluationResult) -> Self {
        let h = e.summary.hit_distribution;
        Self {
            draw_date: e.draw_date.clone(),
            actual_result: e
                .actual_result
                .iter()
                .map(|n| n.to_string())
                .collect::<Vec<_>>()
                .join(" "),
            best_hit_count: e.summary.best_hit_count,
            best_prediction_index: e.summary.best_prediction_index,
            average_hit_count: e.summary.average_hit_count,
            total_predictions: e.total_predictions,
            hits_0: h[0],
            hits_1: h[1],
            hits_2: h[2],
            hits_3: h[3],
            hits_4: h[4],
            hits_5: h[5],
            hits_6: h[6],
        }
    }
}

/// Exporte une ligne CSV par tirage évalué, dans l'ordre des dates. Retourne le nombre de lignes.
pub fn export_evaluations_csv(evaluations: &BTreeMap<String, EvaluationResult>, path: &Path) -> Result<usize> {
    let export_err = |source: csv::Error| TotoError::Export { path: path.to_path_buf(), source };

    let mut writer = csv::Writer::from_path(path).map_err(export_err)?;
    for e in evaluations.values() {
        writer.serialize(EvaluationRow::from(e)).map_err(export_err)?;
    }
    writer.flush().map_err(|source| TotoError::Persistence { path: path.to_path_buf(), source })?;
    Ok(evaluations.len())
}
