//! Lab orchestration
//!
//! This module provides the driver-facing API. A [`Lab`] owns the coarse
//! state machine, the clock, the current session and the run history:
//!
//! ```text
//! Setup --start_run--> Playing --finish_run--> Summary --return_to_setup--> Setup
//! ```
//!
//! Entry submissions are sub-transitions inside `Playing`; they mutate the
//! session without changing the phase. Every action outside its phase is
//! rejected with an error and leaves the lab unchanged.

use std::collections::BTreeMap;

use crate::audit::AuditEngine;
use crate::clock::{Clock, SystemClock};
use crate::config::LabConfig;
use crate::error::LabError;
use crate::history::HistoryStore;
use crate::session::SessionState;
use crate::types::{
    AuditReport, Category, ColumnId, Entry, GroupBy, HistoryRecord, Mode, Phase, RunHandle,
    Shape, SummaryRow,
};

/// Stateful experiment driver with an in-memory run history
pub struct Lab<C: Clock = SystemClock> {
    config: LabConfig,
    clock: C,
    auditor: AuditEngine,
    phase: Phase,
    session: Option<SessionState>,
    last_report: Option<AuditReport>,
    history: HistoryStore,
}

impl Default for Lab<SystemClock> {
    fn default() -> Self {
        Self::new()
    }
}

impl Lab<SystemClock> {
    /// Create a three-column lab timed by the system clock
    pub fn new() -> Self {
        Self::with_clock(SystemClock)
    }
}

impl<C: Clock> Lab<C> {
    /// Create a lab with the default layout and a custom clock
    pub fn with_clock(clock: C) -> Self {
        Self::assemble(LabConfig::default(), AuditEngine::default(), clock)
    }

    /// Create a lab with a validated configuration
    pub fn with_config(config: LabConfig, clock: C) -> Result<Self, LabError> {
        let auditor = AuditEngine::new(&config)?;
        Ok(Self::assemble(config, auditor, clock))
    }

    fn assemble(config: LabConfig, auditor: AuditEngine, clock: C) -> Self {
        Self {
            config,
            clock,
            auditor,
            phase: Phase::Setup,
            session: None,
            last_report: None,
            history: HistoryStore::new(),
        }
    }

    /// Start a run (Setup → Playing)
    pub fn start_run(&mut self, mode: Mode, participant_name: &str) -> Result<RunHandle, LabError> {
        self.expect_phase(Phase::Setup, "start a run")?;

        let session = SessionState::start_with_config(
            mode,
            participant_name,
            self.clock.now(),
            &self.config,
        )?;
        let handle = session.run_id();
        log::info!(
            "run {} started: participant={} mode={}",
            handle,
            session.participant(),
            mode
        );

        self.session = Some(session);
        self.last_report = None;
        self.phase = Phase::Playing;
        Ok(handle)
    }

    /// Submit raw text typed into a column
    ///
    /// Blank text is ignored and returns no entries.
    pub fn submit_text(
        &mut self,
        handle: RunHandle,
        column: ColumnId,
        raw_text: &str,
    ) -> Result<Vec<Entry>, LabError> {
        let now = self.clock.now();
        self.playing_session_mut(handle)?.record(raw_text, column, now)
    }

    /// Submit one shape button press
    pub fn submit_shape(
        &mut self,
        handle: RunHandle,
        column: ColumnId,
        shape: Shape,
    ) -> Result<Entry, LabError> {
        let now = self.clock.now();
        self.playing_session_mut(handle)?
            .record_symbol(shape.symbol(), column, now)?
            .ok_or_else(|| LabError::InvalidShape(shape.to_string()))
    }

    /// Submit a shape by its symbol text (`○`, `□` or `△`)
    pub fn submit_shape_symbol(
        &mut self,
        handle: RunHandle,
        column: ColumnId,
        shape_symbol: &str,
    ) -> Result<Entry, LabError> {
        let shape: Shape = shape_symbol.parse()?;
        self.submit_shape(handle, column, shape)
    }

    /// Finish the run (Playing → Summary)
    ///
    /// Freezes the session, audits it and appends the resulting record to the
    /// history. The record is returned for display.
    pub fn finish_run(&mut self, handle: RunHandle) -> Result<HistoryRecord, LabError> {
        let now = self.clock.now();
        let total_time = self.playing_session_mut(handle)?.freeze(now)?;

        let session = self.session.as_ref().ok_or(LabError::NotStarted)?;
        let report = self.auditor.audit(session, total_time);
        let record = self.auditor.to_record(session, &report)?;

        log::info!(
            "run {} finished: total={:.2}s defects={}",
            handle,
            total_time,
            record.defect_count
        );

        self.history.append(record.clone());
        self.last_report = Some(report);
        self.phase = Phase::Summary;
        Ok(record)
    }

    /// Leave the summary screen (Summary → Setup)
    ///
    /// Only the history survives the transition.
    pub fn return_to_setup(&mut self) -> Result<(), LabError> {
        self.expect_phase(Phase::Summary, "return to setup")?;
        self.session = None;
        self.last_report = None;
        self.phase = Phase::Setup;
        Ok(())
    }

    /// Grouped averages over the run history
    pub fn get_history(&self, group_by: GroupBy) -> Vec<SummaryRow> {
        self.history.summarize(group_by)
    }

    /// Clear the run history
    pub fn reset_history(&mut self) {
        log::info!("history reset ({} runs dropped)", self.history.len());
        self.history.clear();
    }

    pub fn history(&self) -> &HistoryStore {
        &self.history
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn config(&self) -> &LabConfig {
        &self.config
    }

    /// Current or just-finished session
    pub fn session(&self) -> Option<&SessionState> {
        self.session.as_ref()
    }

    /// Audit of the run shown on the summary screen
    pub fn last_report(&self) -> Option<&AuditReport> {
        self.last_report.as_ref()
    }

    /// Column the participant should work on, while playing
    pub fn active_column(&self) -> Option<ColumnId> {
        match self.phase {
            Phase::Playing => self.session.as_ref().map(SessionState::active_column),
            _ => None,
        }
    }

    /// Live per-category entry counts, while playing
    pub fn progress(&self) -> Option<BTreeMap<Category, usize>> {
        match self.phase {
            Phase::Playing => self.session.as_ref().map(SessionState::progress),
            _ => None,
        }
    }

    /// Live timer value, while playing
    pub fn elapsed(&self) -> Option<f64> {
        match self.phase {
            Phase::Playing => self
                .session
                .as_ref()
                .map(|s| s.elapsed_at(self.clock.now())),
            _ => None,
        }
    }

    fn expect_phase(&self, expected: Phase, action: &'static str) -> Result<(), LabError> {
        if self.phase == expected {
            Ok(())
        } else {
            Err(LabError::InvalidTransition {
                from: self.phase,
                action,
            })
        }
    }

    fn playing_session_mut(&mut self, handle: RunHandle) -> Result<&mut SessionState, LabError> {
        if self.phase != Phase::Playing {
            return Err(LabError::NotStarted);
        }
        match self.session.as_mut() {
            Some(session) if session.run_id() == handle => Ok(session),
            Some(_) => Err(LabError::UnknownRun(handle)),
            None => Err(LabError::NotStarted),
        }
    }
}
