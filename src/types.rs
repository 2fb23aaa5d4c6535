//! Core lab data types
//!
//! This module defines the values that flow between the session, milestone,
//! audit and history layers: modes, categories, entries, defect reports and
//! the immutable history records produced when a run finishes.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::LabError;

/// Experiment mode chosen when a run starts
///
/// The mode only changes the instructions shown to the participant and the
/// active-column guidance; entry handling and scoring are identical.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Mode {
    /// Complete one category before starting the next
    Focus,
    /// Forced rotation between columns every few actions
    #[serde(alias = "multitasking")]
    Chaos,
}

impl Mode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Mode::Focus => "Focus",
            Mode::Chaos => "Chaos",
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Mode {
    type Err = LabError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "focus" => Ok(Mode::Focus),
            "chaos" | "multitasking" => Ok(Mode::Chaos),
            other => Err(LabError::InvalidMode(other.to_string())),
        }
    }
}

/// Task category, classified purely from a unit's textual form
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    Numbers,
    Letters,
    Shapes,
}

impl Category {
    /// All categories in column order
    pub const ALL: [Category; 3] = [Category::Numbers, Category::Letters, Category::Shapes];

    /// Classify a unit
    ///
    /// - Numbers: one or more decimal digits
    /// - Letters: exactly one alphabetic character
    /// - Shapes: one of the three fixed shape markers
    pub fn classify(symbol: &str) -> Option<Category> {
        if !symbol.is_empty() && symbol.chars().all(|c| c.is_ascii_digit()) {
            return Some(Category::Numbers);
        }

        let mut chars = symbol.chars();
        match (chars.next(), chars.next()) {
            (Some(c), None) if c.is_alphabetic() => Some(Category::Letters),
            _ if Shape::from_symbol(symbol).is_some() => Some(Category::Shapes),
            _ => None,
        }
    }

    /// Canonical target sequence of the given length
    ///
    /// Numbers count up from 1, letters run from `A`, shapes repeat the
    /// `○ □ △` cycle. Letters past `Z` are not representable; callers keep
    /// `len <= 26` (enforced by the lab configuration).
    pub fn target_sequence(&self, len: usize) -> Vec<String> {
        match self {
            Category::Numbers => (1..=len).map(|n| n.to_string()).collect(),
            Category::Letters => (b'A'..=b'Z')
                .take(len)
                .map(|b| char::from(b).to_string())
                .collect(),
            Category::Shapes => Shape::ALL
                .iter()
                .cycle()
                .take(len)
                .map(|s| s.symbol().to_string())
                .collect(),
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Category::Numbers => "Numbers",
            Category::Letters => "Letters",
            Category::Shapes => "Shapes",
        };
        f.write_str(name)
    }
}

/// One of the three fixed shape markers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Shape {
    Circle,
    Square,
    Triangle,
}

impl Shape {
    /// Shapes in target cycle order
    pub const ALL: [Shape; 3] = [Shape::Circle, Shape::Square, Shape::Triangle];

    pub fn symbol(&self) -> &'static str {
        match self {
            Shape::Circle => "○",
            Shape::Square => "□",
            Shape::Triangle => "△",
        }
    }

    pub fn from_symbol(symbol: &str) -> Option<Shape> {
        Shape::ALL.into_iter().find(|s| s.symbol() == symbol)
    }
}

impl FromStr for Shape {
    type Err = LabError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Shape::from_symbol(s).ok_or_else(|| LabError::InvalidShape(s.to_string()))
    }
}

impl fmt::Display for Shape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

/// Zero-based index of a physical column
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ColumnId(pub usize);

impl ColumnId {
    pub fn index(&self) -> usize {
        self.0
    }
}

impl fmt::Display for ColumnId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Coarse lab state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    Setup,
    Playing,
    Summary,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Phase::Setup => "setup",
            Phase::Playing => "playing",
            Phase::Summary => "summary",
        };
        f.write_str(name)
    }
}

/// Opaque identifier of one run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RunHandle(pub Uuid);

impl RunHandle {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for RunHandle {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for RunHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One unit produced by the participant
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entry {
    /// Normalized symbol text
    pub symbol: String,
    /// Column the unit was filed under
    pub column: ColumnId,
    /// Seconds since run start (non-decreasing across the log)
    pub elapsed_seconds: f64,
}

impl Entry {
    pub fn category(&self) -> Option<Category> {
        Category::classify(&self.symbol)
    }
}

/// Elapsed time of the target-th qualifying entry per category
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MilestoneSet {
    /// `None` when the category has not reached its target yet
    pub times: BTreeMap<Category, Option<f64>>,
}

impl MilestoneSet {
    pub fn get(&self, category: Category) -> Option<f64> {
        self.times.get(&category).copied().flatten()
    }

    /// Replace every unreached milestone with `total_time`
    pub fn resolve(&self, total_time: f64) -> BTreeMap<Category, f64> {
        self.times
            .iter()
            .map(|(&category, time)| (category, time.unwrap_or(total_time)))
            .collect()
    }
}

/// A single deviation from the canonical targets
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Defect {
    /// Column length differs from the target count
    ColumnCount {
        column: ColumnId,
        expected: usize,
        actual: usize,
    },
    /// Fewer qualifying entries than the target across the whole log
    SequenceIncomplete {
        category: Category,
        expected: usize,
        found: usize,
    },
    /// The first target-count entries differ from the canonical sequence
    SequenceMismatch {
        category: Category,
        /// Index of the first differing unit
        position: usize,
        expected: String,
        actual: String,
    },
}

/// Itemized defects for one run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DefectReport {
    pub defects: Vec<Defect>,
}

impl DefectReport {
    pub fn count(&self) -> usize {
        self.defects.len()
    }

    pub fn is_clean(&self) -> bool {
        self.defects.is_empty()
    }

    /// Defects attached to a category's sequence check
    pub fn for_category(&self, category: Category) -> impl Iterator<Item = &Defect> {
        self.defects.iter().filter(move |d| match d {
            Defect::SequenceIncomplete { category: c, .. }
            | Defect::SequenceMismatch { category: c, .. } => *c == category,
            Defect::ColumnCount { .. } => false,
        })
    }

    /// Column count defects only
    pub fn column_defects(&self) -> impl Iterator<Item = &Defect> {
        self.defects
            .iter()
            .filter(|d| matches!(d, Defect::ColumnCount { .. }))
    }
}

/// Audit output for one run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditReport {
    /// Seconds from start to finish
    pub total_time: f64,
    /// Raw milestones, unreached kept as `None`
    pub milestones: MilestoneSet,
    /// Milestones with unreached categories reported as `total_time`
    pub category_times: BTreeMap<Category, f64>,
    /// Itemized defects
    pub defects: DefectReport,
    /// Final length of each column
    pub column_counts: Vec<usize>,
    /// Target length of each column
    pub target_count: usize,
}

impl AuditReport {
    /// Signed distance of each column from the target length
    pub fn count_deltas(&self) -> Vec<i64> {
        self.column_counts
            .iter()
            .map(|&n| n as i64 - self.target_count as i64)
            .collect()
    }
}

/// Immutable snapshot appended to the history after each run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryRecord {
    pub run_id: RunHandle,
    pub participant: String,
    pub mode: Mode,
    /// Seconds from start to finish
    pub total_time: f64,
    /// Per-category completion time (unreached reported as `total_time`)
    pub category_times: BTreeMap<Category, f64>,
    pub defect_count: usize,
    /// Final length of each column
    pub column_counts: Vec<usize>,
    pub finished_at: DateTime<Utc>,
}

/// Grouping key for history aggregation
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GroupBy {
    #[default]
    ParticipantAndMode,
    Participant,
    Mode,
}

/// One row of the aggregated history table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SummaryRow {
    /// Present unless grouped by mode only
    #[serde(skip_serializing_if = "Option::is_none")]
    pub participant: Option<String>,
    /// Present unless grouped by participant only
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mode: Option<Mode>,
    /// Number of runs aggregated into this row
    pub runs: usize,
    pub mean_total_time: f64,
    pub mean_category_times: BTreeMap<Category, f64>,
    pub mean_defect_count: f64,
    pub mean_column_counts: Vec<f64>,
}
