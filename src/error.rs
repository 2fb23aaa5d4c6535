//! Error types for the context switch lab

use thiserror::Error;

use crate::types::{ColumnId, Phase, RunHandle};

/// Errors that can occur while driving a lab run
///
/// Every error rejects exactly one action; the run it targeted is left unchanged.
#[derive(Debug, Error)]
pub enum LabError {
    #[error("No run is in progress")]
    NotStarted,

    #[error("Invalid column {column}: run has {column_count} columns")]
    InvalidColumn {
        column: ColumnId,
        column_count: usize,
    },

    #[error("Run {0} has not finished")]
    NotFinished(RunHandle),

    #[error("Unknown run handle: {0}")]
    UnknownRun(RunHandle),

    #[error("Cannot {action} while in {from} phase")]
    InvalidTransition { from: Phase, action: &'static str },

    #[error("Invalid shape symbol: {0}")]
    InvalidShape(String),

    #[error("Invalid mode: {0}")]
    InvalidMode(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Invalid JSON: {0}")]
    Json(#[from] serde_json::Error),
}
