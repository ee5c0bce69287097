use std::collections::HashSet;

use chrono::Datelike;
use log::{debug, warn};
use rand::Rng;
use serde::{Deserialize, Serialize};
use toto_db::models::{PICK_COUNT, POOL_SIZE};

use crate::config::TotoConfig;
use crate::error::{Result, TotoError};
use crate::scoring::{self, Scorer};

/// Génère un seed déterministe basé sur la date du jour (YYYYMMDD).
pub fn date_seed() -> u64 {
    let today = chrono::Local::now().date_naive();
    let y = today.year() as u64;
    let m = today.month() as u64;
    let d = today.day() as u64;
    y * 10_000 + m * 100 + d
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Prediction {
    /// Rang 1-based après tri par score de combinaison.
    pub rank: usize,
    pub numbers: [u8; PICK_COUNT],
    pub combination_score: f64,
    pub confidence: f64,
}

/// Lot de prédictions. `attempts` compte les tirages aléatoires consommés.
#[derive(Debug, Clone)]
pub struct Generation {
    pub predictions: Vec<Prediction>,
    pub requested: usize,
    pub attempts: usize,
}

impl Generation {
    /// Budget épuisé avant d'atteindre le nombre demandé.
    pub fn is_partial(&self) -> bool {
        self.predictions.len() < self.requested
    }
}

/// Numéros triés par score décroissant, égalités départagées par numéro croissant.
pub fn rank_numbers(scores: &[f64]) -> Vec<u8> {
    let mut numbers: Vec<u8> = (1..=POOL_SIZE).collect();
    numbers.sort_by(|&a, &b| {
        let (sa, sb) = (scores[(a - 1) as usize], scores[(b - 1) as usize]);
        sb.partial_cmp(&sa)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then(a.cmp(&b))
    });
    numbers
}

pub struct CombinationGenerator<'a> {
    scorer: &'a Scorer<'a>,
    pool_size: usize,
    attempt_factor: usize,
}

impl<'a> CombinationGenerator<'a> {
    pub fn new(scorer: &'a Scorer<'a>, config: &TotoConfig) -> Self {
        Self {
            scorer,
            pool_size: config.candidate_pool_size,
            attempt_factor: config.attempt_factor,
        }
    }

    pub fn with_pool_size(mut self, pool_size: usize) -> Self {
        self.pool_size = pool_size;
        self
    }

    /// Tire jusqu'à `count` combinaisons distinctes dans le pool des meilleurs numéros.
    pub fn generate<R: Rng + ?Sized>(&self, count: usize, rng: &mut R) -> Result<Generation> {
        if self.scorer.features().draw_count == 0 {
            return Err(TotoError::missing("historique vide, aucune prédiction possible"));
        }
        if self.pool_size < PICK_COUNT {
            return Err(TotoError::invalid(format!(
                "pool de {} numéros, au moins {} requis",
                self.pool_size, PICK_COUNT
            )));
        }

        let scores = self.scorer.number_scores();
        let pool: Vec<u8> = rank_numbers(&scores)
            .into_iter()
            .take(self.pool_size.min(POOL_SIZE as usize))
            .collect();
        debug!("Pool de candidats : {:?}", pool);

        let budget = count.saturating_mul(self.attempt_factor);
        let mut seen: HashSet<[u8; PICK_COUNT]> = HashSet::with_capacity(count);
        let mut predictions = Vec::with_capacity(count);
        let mut attempts = 0;

        while predictions.len() < count && attempts < budget {
            attempts += 1;
            let mut numbers = [0u8; PICK_COUNT];
            for (slot, idx) in numbers
                .iter_mut()
                .zip(rand::seq::index::sample(rng, pool.len(), PICK_COUNT).into_iter())
            {
                *slot = pool[idx];
            }
            numbers.sort_unstable();

            if !seen.insert(numbers) {
                continue;
            }
            let combination_score = scoring::combination_score(&numbers);
            predictions.push(Prediction {
                rank: 0,
                numbers,
                combination_score,
                confidence: scoring::confidence(&scores, &numbers, combination_score),
            });
        }

        if predictions.len() < count {
            warn!(
                "Candidats insuffisants : {}/{} combinaisons uniques après {} tentatives",
                predictions.len(),
                count,
                attempts
            );
        }

        // tri stable
        predictions.sort_by(|a, b| {
            b.combination_score
                .partial_cmp(&a.combination_score)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        for (i, p) in predictions.iter_mut().enumerate() {
            p.rank = i + 1;
        }

        Ok(Generation { predictions, requested: count, attempts })
    }
}
