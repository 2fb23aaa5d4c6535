//! Context Switch Lab - session core for a context-switching cost experiment
//!
//! A participant fills columns of symbols (numbers 1–20, letters A–T, shapes
//! ○□△) either one column at a time (Focus mode) or in forced rotation
//! (Chaos mode). This crate records every entry with its elapsed time, derives
//! per-category completion milestones, audits the run for defects and keeps
//! grouped averages over past runs.
//!
//! ## Modules
//!
//! - **Session**: tokenization and the append-only entry log of one run
//! - **Milestones**: elapsed time of the 20th qualifying entry per category
//! - **Audit**: defect report, unreached-milestone policy and history averages
//! - **Lab**: the Setup → Playing → Summary state machine driven by a UI layer
//!
//! Rendering and input capture are left to the embedding driver, which only
//! calls into [`Lab`].

pub mod audit;
pub mod clock;
pub mod config;
pub mod error;
pub mod history;
pub mod lab;
pub mod milestone;
pub mod session;
pub mod tokenizer;
pub mod types;

pub use audit::{summarize, AuditEngine};
pub use clock::{Clock, ManualClock, SystemClock};
pub use config::LabConfig;
pub use error::LabError;
pub use history::HistoryStore;
pub use lab::Lab;
pub use milestone::MilestoneTracker;
pub use session::SessionState;
pub use types::{
    AuditReport, Category, ColumnId, Defect, DefectReport, Entry, GroupBy, HistoryRecord,
    MilestoneSet, Mode, Phase, RunHandle, Shape, SummaryRow,
};

/// Crate version, for display layers
pub const LAB_VERSION: &str = env!("CARGO_PKG_VERSION");
