use std::collections::{BTreeMap, BTreeSet};

use log::{debug, info, warn};
use serde::{Deserialize, Serialize};

use crate::config::TotoConfig;
use crate::error::Result;
use crate::evaluator::{EvaluationResult, EvaluationSummary};
use crate::features::{FeatureId, FeatureSet};
use crate::store::{EvaluationStore, LearningHistoryStore, WeightStore};
use crate::weights::{WeightChange, WeightVector};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeaturePerformance {
    pub feature: FeatureId,
    pub actual_average: f64,
    pub predicted_average: f64,
    pub effectiveness: f64,
}

/// Trace d'un pas d'apprentissage, conservée par date de tirage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LearningRecord {
    pub timestamp: String,
    pub draw_date: String,
    pub performance: f64,
    pub features: Vec<FeaturePerformance>,
    /// Seuls les ajustements significatifs.
    pub adjustments: Vec<WeightChange>,
    pub weights_after: BTreeMap<String, f64>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum LearnOutcome {
    Updated(LearningRecord),
    /// Pas d'évaluation pour cette date : poids inchangés.
    EvaluationNotFound { date: String },
}

pub struct WeightLearner<'a> {
    config: &'a TotoConfig,
}

impl<'a> WeightLearner<'a> {
    pub fn new(config: &'a TotoConfig) -> Self {
        Self { config }
    }

    /// Performance globale d'un lot : 0.7 × meilleur/6 + 0.3 × moyenne/6.
    pub fn performance(summary: &EvaluationSummary) -> f64 {
        0.7 * (summary.best_hit_count as f64 / 6.0) + 0.3 * (summary.average_hit_count / 6.0)
    }

    /// Compare la projection moyenne d'une feature sur les numéros tirés
    /// à celle sur les numéros des bonnes prédictions.
    pub fn effectiveness(&self, features: &FeatureSet, id: FeatureId, evaluation: &EvaluationResult) -> FeaturePerformance {
        let mean_projection = |numbers: &BTreeSet<u8>| -> Option<f64> {
            let values: Vec<f64> = numbers.iter().filter_map(|&n| features.projection(id, n)).collect();
            if values.is_empty() {
                None
            } else {
                Some(values.iter().sum::<f64>() / values.len() as f64)
            }
        };

        let actual: BTreeSet<u8> = evaluation.actual_result.iter().copied().collect();
        let predicted: BTreeSet<u8> = evaluation
            .predictions
            .iter()
            .filter(|p| p.hit_count >= self.config.good_prediction_hits)
            .flat_map(|p| p.predicted_numbers.iter().copied())
            .collect();

        match (mean_projection(&actual), mean_projection(&predicted)) {
            (Some(a), Some(p)) => {
                let scale = a.max(p).max(1.0);
                FeaturePerformance {
                    feature: id,
                    actual_average: a,
                    predicted_average: p,
                    effectiveness: (1.0 - (a - p).abs() / scale).max(0.0),
                }
            }
            (a, p) => FeaturePerformance {
                feature: id,
                actual_average: a.unwrap_or(0.0),
                predicted_average: p.unwrap_or(0.0),
                effectiveness: 0.0,
            },
        }
    }

    pub fn delta(&self, effectiveness: f64, performance: f64) -> f64 {
        let eta = self.config.learning_rate;
        let effective = effectiveness > self.config.effectiveness_threshold;
        let performing = performance > self.config.performance_threshold;
        match (effective, performing) {
            (true, true) => eta * effectiveness,
            (true, false) => -eta * effectiveness * 0.5,
            (false, true) => -eta * (1.0 - effectiveness) * 0.3,
            (false, false) => -eta * (1.0 - effectiveness),
        }
    }

    /// Met à jour `weights` à partir de l'évaluation stockée pour `date`.
    /// Les poids en mémoire ne changent qu'après une sauvegarde réussie.
    pub fn learn<S>(&self, date: &str, features: &FeatureSet, weights: &mut WeightVector, store: &mut S) -> Result<LearnOutcome>
    where
        S: WeightStore + EvaluationStore + LearningHistoryStore + ?Sized,
    {
        let Some(evaluation) = store.evaluation(date) else {
            info!("Aucune évaluation pour le {}, poids inchangés", date);
            return Ok(LearnOutcome::EvaluationNotFound { date: date.to_string() });
        };

        let performance = Self::performance(&evaluation.summary);
        let reports: Vec<FeaturePerformance> = FeatureId::WEIGHTED
            .iter()
            .map(|&id| self.effectiveness(features, id, &evaluation))
            .collect();
        let deltas: Vec<(FeatureId, f64)> = reports
            .iter()
            .map(|r| (r.feature, self.delta(r.effectiveness, performance)))
            .collect();

        let mut updated = weights.clone();
        let changes = updated.apply_deltas(&deltas, self.config.weight_min, self.config.weight_max);
        store.save_weights(&updated)?;
        *weights = updated;

        let adjustments: Vec<WeightChange> = changes
            .into_iter()
            .filter(|c| c.delta.abs() > self.config.significant_change)
            .collect();
        for c in &adjustments {
            debug!("{} : {:.4} → {:.4} ({:+.4})", c.feature, c.old_weight, c.new_weight, c.delta);
        }
        info!(
            "Apprentissage {} : performance {:.3}, {} ajustements",
            date,
            performance,
            adjustments.len()
        );

        let record = LearningRecord {
            timestamp: chrono::Local::now().to_rfc3339(),
            draw_date: date.to_string(),
            performance,
            features: reports,
            adjustments,
            weights_after: weights.to_document(),
        };
        if let Err(e) = store.append_learning_record(&record) {
            warn!("Historique d'apprentissage non sauvegardé : {e}");
        }
        Ok(LearnOutcome::Updated(record))
    }
}
