//! Session state for one run
//!
//! Holds the columns, the timed entry log and the action counter of a single
//! run. A session is created when the run starts, mutated by entry events
//! while playing, and frozen when the run finishes. A frozen session rejects
//! every further mutation.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};

use crate::clock::seconds_between;
use crate::config::LabConfig;
use crate::error::LabError;
use crate::milestone::MilestoneTracker;
use crate::tokenizer::{normalize_unit, tokenize};
use crate::types::{Category, ColumnId, Entry, MilestoneSet, Mode, RunHandle};

/// Data accumulated during one run
#[derive(Debug, Clone)]
pub struct SessionState {
    run_id: RunHandle,
    mode: Mode,
    participant: String,
    start_time: DateTime<Utc>,
    finished_at: Option<DateTime<Utc>>,
    total_time: Option<f64>,
    columns: Vec<Vec<String>>,
    entry_log: Vec<Entry>,
    actions: usize,
    config: LabConfig,
}

impl SessionState {
    /// Start a session with the default three-column layout
    pub fn start(mode: Mode, participant_name: &str, now: DateTime<Utc>) -> Self {
        Self::open(mode, participant_name, now, &LabConfig::default())
    }

    /// Start a session laid out according to `config`
    ///
    /// A blank participant name is replaced by the configured placeholder.
    /// The configuration is validated first.
    pub fn start_with_config(
        mode: Mode,
        participant_name: &str,
        now: DateTime<Utc>,
        config: &LabConfig,
    ) -> Result<Self, LabError> {
        config.validate()?;
        Ok(Self::open(mode, participant_name, now, config))
    }

    fn open(mode: Mode, participant_name: &str, now: DateTime<Utc>, config: &LabConfig) -> Self {
        let participant = match participant_name.trim() {
            "" => config.default_participant.clone(),
            name => name.to_string(),
        };

        Self {
            run_id: RunHandle::new(),
            mode,
            participant,
            start_time: now,
            finished_at: None,
            total_time: None,
            columns: vec![Vec::new(); config.column_count],
            entry_log: Vec::new(),
            actions: 0,
            config: config.clone(),
        }
    }

    /// Tokenize `raw_input` and append every unit to `column`
    ///
    /// All units of one submission share a single elapsed time. Blank input
    /// appends nothing and is not an error. The batch is either appended whole
    /// or, on error, not at all.
    pub fn record(
        &mut self,
        raw_input: &str,
        column: ColumnId,
        now: DateTime<Utc>,
    ) -> Result<Vec<Entry>, LabError> {
        self.ensure_writable(column)?;

        let units = tokenize(raw_input);
        if units.is_empty() {
            return Ok(Vec::new());
        }

        let elapsed = self.elapsed_at(now);
        let entries: Vec<Entry> = units
            .into_iter()
            .map(|symbol| Entry {
                symbol,
                column,
                elapsed_seconds: elapsed,
            })
            .collect();

        self.append(&entries);
        log::debug!(
            "run {}: {} unit(s) into column {} at {:.3}s",
            self.run_id,
            entries.len(),
            column,
            elapsed
        );
        Ok(entries)
    }

    /// Append a single non-tokenized unit (used for the shape buttons)
    ///
    /// Returns `None` when `symbol` is blank.
    pub fn record_symbol(
        &mut self,
        symbol: &str,
        column: ColumnId,
        now: DateTime<Utc>,
    ) -> Result<Option<Entry>, LabError> {
        self.ensure_writable(column)?;

        let symbol = symbol.trim();
        if symbol.is_empty() {
            return Ok(None);
        }

        let entry = Entry {
            symbol: normalize_unit(symbol),
            column,
            elapsed_seconds: self.elapsed_at(now),
        };
        self.append(std::slice::from_ref(&entry));
        log::debug!(
            "run {}: {} into column {} at {:.3}s",
            self.run_id,
            entry.symbol,
            column,
            entry.elapsed_seconds
        );
        Ok(Some(entry))
    }

    /// Freeze the session and return the total run time in seconds
    pub fn freeze(&mut self, now: DateTime<Utc>) -> Result<f64, LabError> {
        if self.is_frozen() {
            return Err(LabError::NotStarted);
        }
        let total = self.elapsed_at(now);
        self.finished_at = Some(now);
        self.total_time = Some(total);
        Ok(total)
    }

    /// Seconds since start, clamped so the log never runs backwards
    pub fn elapsed_at(&self, now: DateTime<Utc>) -> f64 {
        let raw = seconds_between(self.start_time, now);
        let floor = self.last_elapsed();
        if raw < floor {
            log::warn!(
                "run {}: clock moved backwards ({:.3}s < {:.3}s), clamping",
                self.run_id,
                raw,
                floor
            );
            floor
        } else {
            raw
        }
    }

    /// Column the participant is expected to work on next
    ///
    /// Chaos mode rotates every `chaos_rotation` actions; Focus mode stays on
    /// the first column short of the target count.
    pub fn active_column(&self) -> ColumnId {
        let count = self.columns.len().max(1);
        match self.mode {
            Mode::Chaos => ColumnId((self.actions / self.config.chaos_rotation.max(1)) % count),
            Mode::Focus => ColumnId(
                self.columns
                    .iter()
                    .position(|c| c.len() < self.config.target_count)
                    .unwrap_or(count - 1),
            ),
        }
    }

    /// Milestones derived from the current log
    pub fn milestones(&self) -> MilestoneSet {
        MilestoneTracker::new(self.config.target_count)
            .milestones(&self.entry_log, self.config.categories())
    }

    /// Qualifying entries logged so far, per audited category
    pub fn progress(&self) -> BTreeMap<Category, usize> {
        let tracker = MilestoneTracker::new(self.config.target_count);
        self.config
            .categories()
            .iter()
            .map(|&c| (c, tracker.progress(&self.entry_log, c)))
            .collect()
    }

    pub fn run_id(&self) -> RunHandle {
        self.run_id
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn participant(&self) -> &str {
        &self.participant
    }

    pub fn start_time(&self) -> DateTime<Utc> {
        self.start_time
    }

    pub fn finished_at(&self) -> Option<DateTime<Utc>> {
        self.finished_at
    }

    /// Total run time, once frozen
    pub fn total_time(&self) -> Option<f64> {
        self.total_time
    }

    pub fn is_frozen(&self) -> bool {
        self.finished_at.is_some()
    }

    pub fn columns(&self) -> &[Vec<String>] {
        &self.columns
    }

    pub fn column(&self, column: ColumnId) -> Option<&[String]> {
        self.columns.get(column.index()).map(Vec::as_slice)
    }

    pub fn entries(&self) -> &[Entry] {
        &self.entry_log
    }

    /// Number of non-empty submissions so far
    pub fn actions(&self) -> usize {
        self.actions
    }

    pub fn config(&self) -> &LabConfig {
        &self.config
    }

    fn ensure_writable(&self, column: ColumnId) -> Result<(), LabError> {
        if self.is_frozen() {
            return Err(LabError::NotStarted);
        }
        if column.index() >= self.columns.len() {
            return Err(LabError::InvalidColumn {
                column,
                column_count: self.columns.len(),
            });
        }
        Ok(())
    }

    fn append(&mut self, entries: &[Entry]) {
        for entry in entries {
            self.columns[entry.column.index()].push(entry.symbol.clone());
            self.entry_log.push(entry.clone());
        }
        self.actions += 1;
    }

    fn last_elapsed(&self) -> f64 {
        self.entry_log
            .last()
            .map(|e| e.elapsed_seconds)
            .unwrap_or(0.0)
    }
}
