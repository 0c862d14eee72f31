use thiserror::Error;

use crate::evaluator::EvaluationError;
use crate::model::{CatalogError, SettingsError};
use crate::progression::ProgressionError;

#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Catalog(#[from] CatalogError),
    #[error(transparent)]
    Settings(#[from] SettingsError),
    #[error(transparent)]
    Evaluation(#[from] EvaluationError),
    #[error(transparent)]
    Progression(#[from] ProgressionError),
}
