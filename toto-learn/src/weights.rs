use std::collections::BTreeMap;

use log::warn;
use serde::{Deserialize, Serialize};

use crate::features::FeatureId;

const BISECTION_STEPS: usize = 100;

/// Poids normalisés des features pondérées.
#[derive(Debug, Clone, PartialEq)]
pub struct WeightVector {
    weights: BTreeMap<FeatureId, f64>,
}

/// Variation d'un poids lors d'un pas d'apprentissage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeightChange {
    pub feature: FeatureId,
    pub old_weight: f64,
    pub new_weight: f64,
    pub delta: f64,
}

impl Default for WeightVector {
    fn default() -> Self {
        let weights = FeatureId::WEIGHTED
            .iter()
            .filter_map(|&id| id.default_weight().map(|w| (id, w)))
            .collect();
        Self { weights }
    }
}

impl WeightVector {
    /// Construit le vecteur depuis un document clé → poids. Les features du
    /// catalogue absentes reçoivent leur poids par défaut ; les clés inconnues
    /// ou non pondérées sont ignorées.
    pub fn from_document(document: &BTreeMap<String, f64>) -> Self {
        let mut vector = Self::default();
        for (name, &value) in document {
            match name.parse::<FeatureId>() {
                Ok(id) if id.is_weighted() && value.is_finite() && value >= 0.0 => {
                    vector.weights.insert(id, value);
                }
                Ok(id) if id.is_weighted() => {
                    warn!("Poids invalide pour {} : {}, valeur par défaut conservée", id, value);
                }
                Ok(id) => warn!("La feature {} n'est pas pondérée, entrée ignorée", id),
                Err(e) => warn!("{e}, entrée ignorée"),
            }
        }
        vector
    }

    pub fn to_document(&self) -> BTreeMap<String, f64> {
        self.weights
            .iter()
            .map(|(id, &w)| (id.name().to_string(), w))
            .collect()
    }

    /// Poids d'une feature ; le poids par défaut du catalogue si absent.
    pub fn get(&self, id: FeatureId) -> f64 {
        self.weights
            .get(&id)
            .copied()
            .or_else(|| id.default_weight())
            .unwrap_or(0.0)
    }

    pub fn iter(&self) -> impl Iterator<Item = (FeatureId, f64)> + '_ {
        self.weights.iter().map(|(&id, &w)| (id, w))
    }

    pub fn sum(&self) -> f64 {
        self.weights.values().sum()
    }

    /// Poids triés par valeur décroissante.
    pub fn ranked(&self) -> Vec<(FeatureId, f64)> {
        let mut ranked: Vec<(FeatureId, f64)> = self.iter().collect();
        ranked.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
        ranked
    }

    /// Applique les deltas, borne chaque poids à [min, max] puis renormalise.
    pub fn apply_deltas(&mut self, deltas: &[(FeatureId, f64)], min: f64, max: f64) -> Vec<WeightChange> {
        let before = self.clone();
        for &(id, delta) in deltas {
            let current = self.get(id);
            self.weights.insert(id, (current + delta).clamp(min, max));
        }
        self.normalize_within(min, max);

        deltas
            .iter()
            .map(|&(id, delta)| WeightChange {
                feature: id,
                old_weight: before.get(id),
                new_weight: self.get(id),
                delta,
            })
            .collect()
    }

    /// Ramène la somme à 1. Si la simple division fait sortir un poids de
    /// [min, max], cherche l'échelle s telle que Σ clamp(s·w) = 1.
    pub fn normalize_within(&mut self, min: f64, max: f64) {
        let n = self.weights.len() as f64;
        let total = self.sum();
        if total <= 0.0 || !total.is_finite() {
            for w in self.weights.values_mut() {
                *w = 1.0 / n;
            }
            return;
        }

        for w in self.weights.values_mut() {
            *w /= total;
        }

        let feasible = n * min <= 1.0 && n * max >= 1.0;
        let eps = 1e-12;
        let in_bounds = self.weights.values().all(|&w| w >= min - eps && w <= max + eps);
        if in_bounds || !feasible {
            return;
        }

        let raw: Vec<f64> = self.weights.values().copied().collect();
        let smallest = raw.iter().copied().fold(f64::INFINITY, f64::min).max(f64::MIN_POSITIVE);
        let clamped_sum = |s: f64| raw.iter().map(|&w| (s * w).clamp(min, max)).sum::<f64>();

        let (mut lo, mut hi) = (0.0, max / smallest);
        for _ in 0..BISECTION_STEPS {
            let mid = 0.5 * (lo + hi);
            if clamped_sum(mid) < 1.0 {
                lo = mid;
            } else {
                hi = mid;
            }
        }

        let scale = 0.5 * (lo + hi);
        for w in self.weights.values_mut() {
            *w = (scale * *w).clamp(min, max);
        }
        let total = self.sum();
        for w in self.weights.values_mut() {
            *w /= total;
        }
    }
}
