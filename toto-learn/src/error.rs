use std::path::PathBuf;

use thiserror::Error;

/// Erreurs du pipeline de prédiction / apprentissage.
#[derive(Debug, Error)]
pub enum TotoError {
    #[error("Données manquantes : {reason}")]
    MissingData { reason: String },

    #[error("Entrée invalide : {reason}")]
    InvalidInput { reason: String },

    #[error("Accès impossible à {path:?}")]
    Persistence {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Document JSON invalide {path:?}")]
    Serialization {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Export CSV impossible vers {path:?}")]
    Export {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },
}

impl TotoError {
    pub fn invalid(reason: impl Into<String>) -> Self {
        TotoError::InvalidInput { reason: reason.into() }
    }

    pub fn missing(reason: impl Into<String>) -> Self {
        TotoError::MissingData { reason: reason.into() }
    }
}

pub type Result<T> = std::result::Result<T, TotoError>;
