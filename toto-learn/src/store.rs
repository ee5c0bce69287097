use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use log::warn;
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::{Result, TotoError};
use crate::evaluator::EvaluationResult;
use crate::learner::LearningRecord;
use crate::weights::WeightVector;

pub const WEIGHTS_FILE: &str = "feature_weights.json";
pub const EVALUATIONS_FILE: &str = "evaluation_results.json";
pub const PROCESSED_FILE: &str = "processed_draws.json";
pub const LEARNING_HISTORY_FILE: &str = "learning_history.json";

pub trait WeightStore {
    /// Poids persistés ; les poids par défaut si rien n'est lisible.
    fn load_weights(&self) -> WeightVector;
    fn save_weights(&mut self, weights: &WeightVector) -> Result<()>;
}

pub trait EvaluationStore {
    fn load_evaluations(&self) -> BTreeMap<String, EvaluationResult>;
    /// Remplace toute évaluation existante pour la même date.
    fn save_evaluation(&mut self, result: &EvaluationResult) -> Result<()>;

    fn evaluation(&self, date: &str) -> Option<EvaluationResult> {
        self.load_evaluations().remove(date)
    }
}

pub trait ProcessedDateStore {
    fn load_processed(&self) -> BTreeSet<String>;
    fn save_processed(&mut self, dates: &BTreeSet<String>) -> Result<()>;
}

pub trait LearningHistoryStore {
    fn load_learning_history(&self) -> BTreeMap<String, LearningRecord>;
    fn append_learning_record(&mut self, record: &LearningRecord) -> Result<()>;
}

/// Ensemble des stockages utilisés par la boucle d'apprentissage.
pub trait Store: WeightStore + EvaluationStore + ProcessedDateStore + LearningHistoryStore {}

impl<T> Store for T where T: WeightStore + EvaluationStore + ProcessedDateStore + LearningHistoryStore {}

/// Lit un document JSON. Fichier absent : valeur par défaut ; illisible : avertissement et valeur par défaut.
fn read_json<T: DeserializeOwned + Default>(path: &Path) -> T {
    match fs::read_to_string(path) {
        Ok(json) => serde_json::from_str(&json).unwrap_or_else(|e| {
            warn!("{:?} invalide ({e}), valeur par défaut utilisée", path);
            T::default()
        }),
        Err(e) if e.kind() == ErrorKind::NotFound => T::default(),
        Err(e) => {
            warn!("Lecture de {:?} impossible ({e}), valeur par défaut utilisée", path);
            T::default()
        }
    }
}

/// Lecture avant modification : un document illisible est renommé en
/// `<fichier>.<horodatage>.bak` au lieu d'être écrasé.
fn read_json_for_update<T: DeserializeOwned + Default>(path: &Path) -> Result<T> {
    let json = match fs::read_to_string(path) {
        Ok(json) => json,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(T::default()),
        Err(source) => {
            return Err(TotoError::Persistence {
                path: path.to_path_buf(),
                source,
            })
        }
    };
    match serde_json::from_str(&json) {
        Ok(value) => Ok(value),
        Err(e) => {
            let backup = backup_path(path);
            fs::rename(path, &backup).map_err(|source| TotoError::Persistence {
                path: backup.clone(),
                source,
            })?;
            warn!("{:?} invalide ({e}), contenu conservé dans {:?}", path, backup);
            Ok(T::default())
        }
    }
}

fn backup_path(path: &Path) -> PathBuf {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let stamp = chrono::Local::now().format("%Y%m%d%H%M%S%3f");
    path.with_file_name(format!("{name}.{stamp}.bak"))
}

fn write_json<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|source| TotoError::Persistence {
            path: parent.to_path_buf(),
            source,
        })?;
    }
    let json = serde_json::to_string_pretty(value).map_err(|source| TotoError::Serialization {
        path: path.to_path_buf(),
        source,
    })?;
    fs::write(path, json).map_err(|source| TotoError::Persistence {
        path: path.to_path_buf(),
        source,
    })
}

/// Stockage JSON dans un répertoire : un fichier par document, ouvert puis refermé à chaque accès.
#[derive(Debug, Clone)]
pub struct JsonStore {
    dir: PathBuf,
}

impl JsonStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn path(&self, file: &str) -> PathBuf {
        self.dir.join(file)
    }
}

impl WeightStore for JsonStore {
    fn load_weights(&self) -> WeightVector {
        let document: BTreeMap<String, f64> = read_json(&self.path(WEIGHTS_FILE));
        if document.is_empty() {
            WeightVector::default()
        } else {
            WeightVector::from_document(&document)
        }
    }

    fn save_weights(&mut self, weights: &WeightVector) -> Result<()> {
        write_json(&self.path(WEIGHTS_FILE), &weights.to_document())
    }
}

impl EvaluationStore for JsonStore {
    fn load_evaluations(&self) -> BTreeMap<String, EvaluationResult> {
        read_json(&self.path(EVALUATIONS_FILE))
    }

    fn save_evaluation(&mut self, result: &EvaluationResult) -> Result<()> {
        let mut all: BTreeMap<String, EvaluationResult> = read_json_for_update(&self.path(EVALUATIONS_FILE))?;
        all.insert(result.draw_date.clone(), result.clone());
        write_json(&self.path(EVALUATIONS_FILE), &all)
    }
}

impl ProcessedDateStore for JsonStore {
    fn load_processed(&self) -> BTreeSet<String> {
        read_json(&self.path(PROCESSED_FILE))
    }

    fn save_processed(&mut self, dates: &BTreeSet<String>) -> Result<()> {
        write_json(&self.path(PROCESSED_FILE), dates)
    }
}

impl LearningHistoryStore for JsonStore {
    fn load_learning_history(&self) -> BTreeMap<String, LearningRecord> {
        read_json(&self.path(LEARNING_HISTORY_FILE))
    }

    fn append_learning_record(&mut self, record: &LearningRecord) -> Result<()> {
        let mut history: BTreeMap<String, LearningRecord> = read_json_for_update(&self.path(LEARNING_HISTORY_FILE))?;
        history.insert(record.draw_date.clone(), record.clone());
        write_json(&self.path(LEARNING_HISTORY_FILE), &history)
    }
}

/// Stockage en mémoire pour les tests.
#[cfg(test)]
#[derive(Debug, Default)]
pub(crate) struct MemoryStore {
    pub saved_weights: Option<WeightVector>,
    pub evaluations: BTreeMap<String, EvaluationResult>,
    pub processed: BTreeSet<String>,
    pub learning: BTreeMap<String, LearningRecord>,
    /// Fait échouer `save_processed`.
    pub fail_processed_writes: bool,
}

#[cfg(test)]
impl WeightStore for MemoryStore {
    fn load_weights(&self) -> WeightVector {
        self.saved_weights.clone().unwrap_or_default()
    }

    fn save_weights(&mut self, weights: &WeightVector) -> Result<()> {
        self.saved_weights = Some(weights.clone());
        Ok(())
    }
}

#[cfg(test)]
impl EvaluationStore for MemoryStore {
    fn load_evaluations(&self) -> BTreeMap<String, EvaluationResult> {
        self.evaluations.clone()
    }

    fn save_evaluation(&mut self, result: &EvaluationResult) -> Result<()> {
        self.evaluations.insert(result.draw_date.clone(), result.clone());
        Ok(())
    }
}

#[cfg(test)]
impl ProcessedDateStore for MemoryStore {
    fn load_processed(&self) -> BTreeSet<String> {
        self.processed.clone()
    }

    fn save_processed(&mut self, dates: &BTreeSet<String>) -> Result<()> {
        if self.fail_processed_writes {
            return Err(TotoError::Persistence {
                path: PathBuf::from(PROCESSED_FILE),
                source: std::io::Error::new(ErrorKind::PermissionDenied, "écriture refusée"),
            });
        }
        self.processed = dates.clone();
        Ok(())
    }
}

#[cfg(test)]
impl LearningHistoryStore for MemoryStore {
    fn load_learning_history(&self) -> BTreeMap<String, LearningRecord> {
        self.learning.clone()
    }

    fn append_learning_record(&mut self, record: &LearningRecord) -> Result<()> {
        self.learning.insert(record.draw_date.clone(), record.clone());
        Ok(())
    }
}
