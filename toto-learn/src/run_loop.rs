use std::collections::BTreeSet;

use log::{info, warn};
use rand::Rng;
use toto_db::models::Draw;

use crate::config::TotoConfig;
use crate::error::{Result, TotoError};
use crate::evaluator::{evaluate, EvaluationResult};
use crate::features::{FeatureId, FeatureSet};
use crate::generator::{CombinationGenerator, Generation};
use crate::learner::{LearnOutcome, WeightLearner};
use crate::scoring::Scorer;
use crate::store::Store;
use crate::trends::{performance_trends, PerformanceTrends};
use crate::weights::WeightVector;

/// Résultat d'un cycle prédiction → évaluation → apprentissage pour un tirage.
#[derive(Debug, Clone)]
pub struct CycleReport {
    pub draw_date: String,
    pub generation: Generation,
    pub evaluation: EvaluationResult,
    pub learning: LearnOutcome,
}

#[derive(Debug, Clone, Default)]
pub struct RunSummary {
    pub processed: Vec<String>,
    /// (date, message d'erreur)
    pub failures: Vec<(String, String)>,
}

#[derive(Debug, Clone)]
pub struct SystemStatus {
    pub processed_count: usize,
    pub last_processed: Option<String>,
    pub trends: Option<PerformanceTrends>,
    pub top_weights: Vec<(FeatureId, f64)>,
}

/// Boucle d'apprentissage : rejoue les tirages non traités dans l'ordre chronologique.
/// Chaque tirage est prédit à partir des seuls tirages qui le précèdent.
pub struct RunLoop<'a, S: Store + ?Sized> {
    config: &'a TotoConfig,
    store: &'a mut S,
    weights: WeightVector,
    processed: BTreeSet<String>,
}

impl<'a, S: Store + ?Sized> RunLoop<'a, S> {
    pub fn new(config: &'a TotoConfig, store: &'a mut S) -> Self {
        let weights = store.load_weights();
        let processed = store.load_processed();
        Self { config, store, weights, processed }
    }

    pub fn weights(&self) -> &WeightVector {
        &self.weights
    }

    pub fn processed(&self) -> &BTreeSet<String> {
        &self.processed
    }

    /// Positions des tirages pas encore traités, du plus ancien au plus récent.
    pub fn pending(&self, history: &[Draw]) -> Vec<usize> {
        history
            .iter()
            .enumerate()
            .filter(|(_, d)| !self.processed.contains(&d.date))
            .map(|(i, _)| i)
            .collect()
    }

    fn predict_from<R: Rng + ?Sized>(
        &self,
        features: &FeatureSet,
        pool_size: usize,
        rng: &mut R,
    ) -> Result<Generation> {
        let scorer = Scorer::new(features, &self.weights);
        CombinationGenerator::new(&scorer, self.config)
            .with_pool_size(pool_size)
            .generate(self.config.prediction_count, rng)
    }

    /// Traite le tirage `history[position]`. La date n'est marquée traitée qu'en cas de succès.
    pub fn process_draw<R: Rng + ?Sized>(&mut self, history: &[Draw], position: usize, rng: &mut R) -> Result<CycleReport> {
        let draw = history
            .get(position)
            .ok_or_else(|| TotoError::invalid(format!("position {} hors de l'historique", position)))?;

        let features = FeatureSet::extract(&history[..position], self.config);
        let generation = self.predict_from(&features, self.config.candidate_pool_size, rng)?;

        let evaluation = evaluate(&draw.date, &generation.predictions, &draw.numbers)?;
        self.store.save_evaluation(&evaluation)?;

        // un pas déjà appris (date restée en attente après un échec d'écriture) n'est pas rejoué
        let learning = match self.store.load_learning_history().remove(&draw.date) {
            Some(record) => {
                info!("Poids déjà ajustés pour le {}, apprentissage ignoré", draw.date);
                LearnOutcome::Updated(record)
            }
            None => WeightLearner::new(self.config).learn(&draw.date, &features, &mut self.weights, &mut *self.store)?,
        };

        let mut processed = self.processed.clone();
        processed.insert(draw.date.clone());
        self.store.save_processed(&processed)?;
        self.processed = processed;

        info!(
            "Tirage {} : meilleur {} numéros, moyenne {:.2}",
            draw.date, evaluation.summary.best_hit_count, evaluation.summary.average_hit_count
        );
        Ok(CycleReport { draw_date: draw.date.clone(), generation, evaluation, learning })
    }

    /// Traite au plus `max_draws` tirages en attente. Un échec est consigné et la boucle continue.
    pub fn run<R, F>(&mut self, history: &[Draw], max_draws: Option<usize>, rng: &mut R, mut on_cycle: F) -> RunSummary
    where
        R: Rng + ?Sized,
        F: FnMut(&str, &Result<CycleReport>),
    {
        let mut pending = self.pending(history);
        if let Some(max) = max_draws {
            pending.truncate(max);
        }

        let mut summary = RunSummary::default();
        for position in pending {
            let date = history[position].date.clone();
            let result = self.process_draw(history, position, rng);
            on_cycle(&date, &result);
            match result {
                Ok(_) => summary.processed.push(date),
                Err(e) => {
                    warn!("Échec du traitement du tirage {} : {e}", date);
                    summary.failures.push((date, e.to_string()));
                }
            }
        }
        summary
    }

    /// Prédictions pour le prochain tirage à partir de tout l'historique, sans évaluation.
    pub fn predict_next<R: Rng + ?Sized>(&self, history: &[Draw], pool_size: usize, rng: &mut R) -> Result<(FeatureSet, Generation)> {
        let features = FeatureSet::extract(history, self.config);
        let generation = self.predict_from(&features, pool_size, rng)?;
        Ok((features, generation))
    }

    pub fn status(&self) -> SystemStatus {
        let evaluations = self.store.load_evaluations();
        SystemStatus {
            processed_count: self.processed.len(),
            last_processed: self.processed.iter().next_back().cloned(),
            trends: performance_trends(&evaluations),
            top_weights: self.weights.ranked().into_iter().take(5).collect(),
        }
    }
}
