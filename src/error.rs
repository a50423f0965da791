use thiserror::Error;

use crate::model::JobKind;
use crate::thumbnail::FetchError;

/// Why a job was not started
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StartError {
    #[error("{0}")]
    InvalidInput(&'static str),
    #[error("a {0} is already running")]
    Busy(JobKind),
}

/// Failures that stop the application before or while opening its window
#[derive(Debug, Error)]
pub enum AppError {
    #[error("could not start the async runtime: {0}")]
    Runtime(#[from] std::io::Error),
    #[error("could not build the HTTP client: {0}")]
    Http(#[from] FetchError),
    #[error("window failed: {0}")]
    Ui(#[from] eframe::Error),
}
