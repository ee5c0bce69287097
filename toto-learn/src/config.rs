use std::path::Path;

use log::warn;
use serde::{Deserialize, Serialize};

/// Paramètres du pipeline, passés explicitement à l'extracteur, au générateur
/// et à l'apprenant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TotoConfig {
    /// Fenêtre des apparitions récentes (k).
    pub recent_window: usize,
    /// Seuil τ de la classification chaud / froid.
    pub hot_cold_threshold: f64,
    /// Fenêtre de la moyenne mobile.
    pub moving_average_window: usize,
    /// Taille du pool de candidats pour l'évaluation historique.
    pub candidate_pool_size: usize,
    /// Taille du pool pour la prédiction du prochain tirage.
    pub next_draw_pool_size: usize,
    /// Nombre de prédictions par tirage.
    pub prediction_count: usize,
    /// Budget de tirages aléatoires = prediction_count × attempt_factor.
    pub attempt_factor: usize,
    pub learning_rate: f64,
    pub weight_min: f64,
    pub weight_max: f64,
    pub effectiveness_threshold: f64,
    pub performance_threshold: f64,
    /// Une prédiction compte comme « bonne » à partir de ce nombre de numéros trouvés.
    pub good_prediction_hits: usize,
    /// Variation de poids en dessous de laquelle un ajustement n'est pas signalé.
    pub significant_change: f64,
}

impl Default for TotoConfig {
    fn default() -> Self {
        Self {
            recent_window: 10,
            hot_cold_threshold: 0.7,
            moving_average_window: 5,
            candidate_pool_size: 20,
            next_draw_pool_size: 25,
            prediction_count: 6,
            attempt_factor: 100,
            learning_rate: 0.1,
            weight_min: 0.01,
            weight_max: 0.5,
            effectiveness_threshold: 0.6,
            performance_threshold: 0.5,
            good_prediction_hits: 2,
            significant_change: 0.001,
        }
    }
}

impl TotoConfig {
    /// Charge la configuration depuis un fichier JSON ; les champs absents prennent
    /// leur valeur par défaut, un fichier absent ou illisible donne la configuration par défaut.
    pub fn load_or_default(path: &Path) -> Self {
        match std::fs::read_to_string(path) {
            Ok(json) => match serde_json::from_str(&json) {
                Ok(config) => config,
                Err(e) => {
                    warn!("Configuration {:?} invalide ({e}), valeurs par défaut utilisées", path);
                    Self::default()
                }
            },
            Err(_) => Self::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = TotoConfig::default();
        assert_eq!(config.recent_window, 10);
        assert_eq!(config.candidate_pool_size, 20);
        assert!((config.learning_rate - 0.1).abs() < 1e-12);
        assert!((config.weight_min - 0.01).abs() < 1e-12);
        assert!((config.weight_max - 0.5).abs() < 1e-12);
        assert_eq!(config.prediction_count * config.attempt_factor, 600);
    }

    #[test]
    fn test_config_serde_roundtrip() {
        let config = TotoConfig {
            learning_rate: 0.05,
            ..TotoConfig::default()
        };
        let json = serde_json::to_string(&config).unwrap();
        let restored: TotoConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(restored, config);
    }

    #[test]
    fn test_partial_document_uses_defaults() {
        let restored: TotoConfig = serde_json::from_str(r#"{"recent_window": 15}"#).unwrap();
        assert_eq!(restored.recent_window, 15);
        assert_eq!(restored.prediction_count, 6);
    }

    #[test]
    fn test_load_missing_file() {
        let config = TotoConfig::load_or_default(Path::new("/nonexistent/toto-config.json"));
        assert_eq!(config, TotoConfig::default());
    }
}
