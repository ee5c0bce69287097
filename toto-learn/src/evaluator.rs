use serde::{Deserialize, Serialize};
use toto_db::models::PICK_COUNT;

use crate::error::{Result, TotoError};
use crate::generator::Prediction;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionEvaluation {
    /// Position 1-based dans le lot évalué.
    pub index: usize,
    pub predicted_numbers: [u8; PICK_COUNT],
    pub confidence: f64,
    pub hit_count: usize,
    pub hit_numbers: Vec<u8>,
    pub missed_numbers: Vec<u8>,
    pub extra_numbers: Vec<u8>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluationSummary {
    pub best_hit_count: usize,
    /// 1-based ; 0 quand aucune prédiction ne trouve de numéro.
    pub best_prediction_index: usize,
    pub average_hit_count: f64,
    /// `hit_distribution[k]` = nombre de prédictions à k numéros trouvés.
    pub hit_distribution: [usize; PICK_COUNT + 1],
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluationResult {
    pub draw_date: String,
    pub actual_result: [u8; PICK_COUNT],
    pub total_predictions: usize,
    pub predictions: Vec<PredictionEvaluation>,
    pub summary: EvaluationSummary,
}

fn sorted(mut numbers: Vec<u8>) -> Vec<u8> {
    numbers.sort_unstable();
    numbers
}

/// Compare un lot de prédictions au tirage réel. Fonction pure : même entrée, même résultat.
pub fn evaluate(draw_date: &str, predictions: &[Prediction], actual: &[u8; PICK_COUNT]) -> Result<EvaluationResult> {
    if predictions.is_empty() {
        return Err(TotoError::invalid(format!("aucune prédiction à évaluer pour le {}", draw_date)));
    }

    let evaluations: Vec<PredictionEvaluation> = predictions
        .iter()
        .enumerate()
        .map(|(i, p)| {
            let hits = sorted(p.numbers.iter().copied().filter(|n| actual.contains(n)).collect());
            PredictionEvaluation {
                index: i + 1,
                predicted_numbers: p.numbers,
                confidence: p.confidence,
                hit_count: hits.len(),
                missed_numbers: sorted(actual.iter().copied().filter(|n| !p.numbers.contains(n)).collect()),
                extra_numbers: sorted(p.numbers.iter().copied().filter(|n| !actual.contains(n)).collect()),
                hit_numbers: hits,
            }
        })
        .collect();

    let mut hit_distribution = [0usize; PICK_COUNT + 1];
    let mut best_hit_count = 0;
    let mut best_prediction_index = 0;
    for e in &evaluations {
        hit_distribution[e.hit_count.min(PICK_COUNT)] += 1;
        if e.hit_count > best_hit_count {
            best_hit_count = e.hit_count;
            best_prediction_index = e.index;
        }
    }
    let average_hit_count =
        evaluations.iter().map(|e| e.hit_count).sum::<usize>() as f64 / evaluations.len() as f64;

    let mut actual_result = *actual;
    actual_result.sort_unstable();

    Ok(EvaluationResult {
        draw_date: draw_date.to_string(),
        actual_result,
        total_predictions: evaluations.len(),
        predictions: evaluations,
        summary: EvaluationSummary {
            best_hit_count,
            best_prediction_index,
            average_hit_count,
            hit_distribution,
        },
    })
}
