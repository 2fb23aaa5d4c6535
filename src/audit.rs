//! Run auditing and history aggregation
//!
//! The audit compares a run against the canonical targets:
//!
//! - every column must hold exactly `target_count` symbols
//! - for every audited category, the first `target_count` qualifying units
//!   of the whole entry log (across all columns) must equal the category's
//!   target sequence
//!
//! Unreached milestones are reported as the total run time.

use std::collections::BTreeMap;

use crate::config::LabConfig;
use crate::error::LabError;
use crate::milestone::MilestoneTracker;
use crate::session::SessionState;
use crate::types::{
    AuditReport, Category, ColumnId, Defect, DefectReport, Entry, GroupBy, HistoryRecord, Mode,
    SummaryRow,
};

/// Scores runs and aggregates history
#[derive(Debug, Clone)]
pub struct AuditEngine {
    target_count: usize,
    categories: &'static [Category],
}

impl Default for AuditEngine {
    fn default() -> Self {
        Self::from_config(&LabConfig::default())
    }
}

impl AuditEngine {
    /// Create an engine scoring against a validated configuration
    pub fn new(config: &LabConfig) -> Result<Self, LabError> {
        config.validate()?;
        Ok(Self::from_config(config))
    }

    fn from_config(config: &LabConfig) -> Self {
        Self {
            target_count: config.target_count,
            categories: config.categories(),
        }
    }

    /// Audit a session given its total run time in seconds
    ///
    /// Works on finished and in-progress sessions alike; for a frozen session
    /// pass `session.total_time()`.
    pub fn audit(&self, session: &SessionState, total_time: f64) -> AuditReport {
        let tracker = MilestoneTracker::new(self.target_count);
        let milestones = tracker.milestones(session.entries(), self.categories);
        let category_times = milestones.resolve(total_time);

        let mut defects = DefectReport::default();
        self.check_column_counts(session.columns(), &mut defects);
        for &category in self.categories {
            if let Some(defect) = self.check_sequence(session.entries(), category) {
                defects.defects.push(defect);
            }
        }

        AuditReport {
            total_time,
            milestones,
            category_times,
            defects,
            column_counts: session.columns().iter().map(Vec::len).collect(),
            target_count: self.target_count,
        }
    }

    fn check_column_counts(&self, columns: &[Vec<String>], report: &mut DefectReport) {
        for (index, column) in columns.iter().enumerate() {
            if column.len() != self.target_count {
                report.defects.push(Defect::ColumnCount {
                    column: ColumnId(index),
                    expected: self.target_count,
                    actual: column.len(),
                });
            }
        }
    }

    /// Compare the first `target_count` units of `category` with its target
    fn check_sequence(&self, log: &[Entry], category: Category) -> Option<Defect> {
        let actual: Vec<&str> = log
            .iter()
            .filter(|e| e.category() == Some(category))
            .take(self.target_count)
            .map(|e| e.symbol.as_str())
            .collect();

        if actual.len() < self.target_count {
            return Some(Defect::SequenceIncomplete {
                category,
                expected: self.target_count,
                found: actual.len(),
            });
        }

        let target = category.target_sequence(self.target_count);
        actual
            .iter()
            .zip(target.iter())
            .position(|(a, t)| *a != t.as_str())
            .map(|position| Defect::SequenceMismatch {
                category,
                position,
                expected: target[position].clone(),
                actual: actual[position].to_string(),
            })
    }

    /// Turn a frozen session and its audit into a history record
    ///
    /// The record is stamped with the session's own finish time, so a session
    /// that is still in progress is rejected.
    pub fn to_record(
        &self,
        session: &SessionState,
        report: &AuditReport,
    ) -> Result<HistoryRecord, LabError> {
        let finished_at = session
            .finished_at()
            .ok_or(LabError::NotFinished(session.run_id()))?;

        Ok(HistoryRecord {
            run_id: session.run_id(),
            participant: session.participant().to_string(),
            mode: session.mode(),
            total_time: report.total_time,
            category_times: report.category_times.clone(),
            defect_count: report.defects.count(),
            column_counts: report.column_counts.clone(),
            finished_at,
        })
    }
}

/// Arithmetic mean of every numeric field, per group
///
/// Rows are ordered by group key. No weighting, decay or outlier handling.
pub fn summarize(history: &[HistoryRecord], group_by: GroupBy) -> Vec<SummaryRow> {
    let mut groups: BTreeMap<(Option<String>, Option<Mode>), Vec<&HistoryRecord>> =
        BTreeMap::new();

    for record in history {
        let key = match group_by {
            GroupBy::ParticipantAndMode => (Some(record.participant.clone()), Some(record.mode)),
            GroupBy::Participant => (Some(record.participant.clone()), None),
            GroupBy::Mode => (None, Some(record.mode)),
        };
        groups.entry(key).or_default().push(record);
    }

    groups
        .into_iter()
        .map(|((participant, mode), records)| SummaryRow {
            participant,
            mode,
            runs: records.len(),
            mean_total_time: mean(records.iter().map(|r| r.total_time)).unwrap_or(0.0),
            mean_category_times: mean_category_times(&records),
            mean_defect_count: mean(records.iter().map(|r| r.defect_count as f64))
                .unwrap_or(0.0),
            mean_column_counts: mean_column_counts(&records),
        })
        .collect()
}

fn mean(values: impl Iterator<Item = f64>) -> Option<f64> {
    let (sum, n) = values.fold((0.0, 0usize), |(sum, n), v| (sum + v, n + 1));
    if n == 0 {
        None
    } else {
        Some(sum / n as f64)
    }
}

/// Mean per category over the records that carry that category
fn mean_category_times(records: &[&HistoryRecord]) -> BTreeMap<Category, f64> {
    Category::ALL
        .iter()
        .filter_map(|&category| {
            mean(
                records
                    .iter()
                    .filter_map(|r| r.category_times.get(&category).copied()),
            )
            .map(|m| (category, m))
        })
        .collect()
}

/// Mean per column position over the records that have that column
fn mean_column_counts(records: &[&HistoryRecord]) -> Vec<f64> {
    let width = records
        .iter()
        .map(|r| r.column_counts.len())
        .max()
        .unwrap_or(0);

    (0..width)
        .filter_map(|i| {
            mean(
                records
                    .iter()
                    .filter_map(|r| r.column_counts.get(i).map(|&n| n as f64)),
            )
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{RunHandle, Shape};
    use chrono::{DateTime, Duration, TimeZone, Utc};
    use pretty_assertions::assert_eq;

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 15, 14, 0, 0).unwrap()
    }

    fn at(secs: i64) -> DateTime<Utc> {
        t0() + Duration::seconds(secs)
    }

    /// Fill all three columns correctly, one unit per second, Focus order
    fn perfect_session() -> SessionState {
        let mut session = SessionState::start(Mode::Focus, "Ada", t0());
        let mut clock = 0;
        for n in 1..=20 {
            clock += 1;
            session.record(&n.to_string(), ColumnId(0), at(clock)).unwrap();
        }
        for letter in Category::Letters.target_sequence(20) {
            clock += 1;
            session.record(&letter, ColumnId(1), at(clock)).unwrap();
        }
        for shape in Shape::ALL.iter().cycle().take(20) {
            clock += 1;
            session
                .record_symbol(shape.symbol(), ColumnId(2), at(clock))
                .unwrap();
        }
        session
    }

    fn record(
        participant: &str,
        mode: Mode,
        total: f64,
        numbers: f64,
        defects: usize,
    ) -> HistoryRecord {
        let mut category_times = BTreeMap::new();
        category_times.insert(Category::Numbers, numbers);
        category_times.insert(Category::Letters, total);
        category_times.insert(Category::Shapes, total);
        HistoryRecord {
            run_id: RunHandle::new(),
            participant: participant.to_string(),
            mode,
            total_time: total,
            category_times,
            defect_count: defects,
            column_counts: vec![20, 20, 19],
            finished_at: t0(),
        }
    }

    #[test]
    fn test_defect_free_run() {
        let mut session = perfect_session();
        let total = session.freeze(at(65)).unwrap();
        let report = AuditEngine::default().audit(&session, total);

        assert_eq!(report.defects.count(), 0);
        assert!(report.defects.is_clean());
        assert_eq!(report.category_times[&Category::Numbers], 20.0);
        assert_eq!(report.category_times[&Category::Letters], 40.0);
        assert_eq!(report.category_times[&Category::Shapes], 60.0);
        assert_eq!(report.count_deltas(), vec![0, 0, 0]);
        assert_eq!(report.total_time, 65.0);
    }

    #[test]
    fn test_short_shape_column() {
        let mut session = SessionState::start(Mode::Chaos, "Ada", t0());
        let numbers: Vec<String> = (1..=20).map(|n| n.to_string()).collect();
        session.record(&numbers.join(" "), ColumnId(0), at(10)).unwrap();
        session.record("ABCDEFGHIJKLMNOPQRST", ColumnId(1), at(20)).unwrap();
        for (i, shape) in Shape::ALL.iter().cycle().take(19).enumerate() {
            session
                .record_symbol(shape.symbol(), ColumnId(2), at(21 + i as i64))
                .unwrap();
        }
        let total = session.freeze(at(50)).unwrap();
        let report = AuditEngine::default().audit(&session, total);

        assert_eq!(
            report.defects.column_defects().cloned().collect::<Vec<_>>(),
            vec![Defect::ColumnCount {
                column: ColumnId(2),
                expected: 20,
                actual: 19
            }]
        );
        assert_eq!(
            report.defects.for_category(Category::Shapes).cloned().collect::<Vec<_>>(),
            vec![Defect::SequenceIncomplete {
                category: Category::Shapes,
                expected: 20,
                found: 19
            }]
        );
        assert_eq!(report.defects.count(), 2);
        // Unreached milestone reported as the full run time
        assert_eq!(report.milestones.get(Category::Shapes), None);
        assert_eq!(report.category_times[&Category::Shapes], 50.0);
        assert_eq!(report.count_deltas(), vec![0, 0, -1]);
    }

    #[test]
    fn test_wrong_shape_order() {
        let mut session = SessionState::start(Mode::Focus, "Ada", t0());
        let order = [Shape::Square, Shape::Circle, Shape::Triangle];
        for (i, shape) in order.iter().cycle().take(20).enumerate() {
            session
                .record_symbol(shape.symbol(), ColumnId(2), at(i as i64 + 1))
                .unwrap();
        }
        let report = AuditEngine::default().audit(&session, 30.0);

        let shape_defects: Vec<_> = report.defects.for_category(Category::Shapes).collect();
        assert_eq!(shape_defects.len(), 1);
        assert_eq!(
            shape_defects[0],
            &Defect::SequenceMismatch {
                category: Category::Shapes,
                position: 0,
                expected: "○".to_string(),
                actual: "□".to_string(),
            }
        );
        // Milestone is about count, not correctness
        assert_eq!(report.milestones.get(Category::Shapes), Some(20.0));
    }

    #[test]
    fn test_sequence_drawn_from_global_log() {
        let mut session = perfect_session();
        // A stray number filed under letters after the first twenty is ignored by
        // the sequence check but still breaks the letters column count
        session.record("21", ColumnId(1), at(100)).unwrap();
        let report = AuditEngine::default().audit(&session, 100.0);

        assert_eq!(report.defects.for_category(Category::Numbers).count(), 0);
        assert_eq!(report.defects.column_defects().count(), 1);
    }

    #[test]
    fn test_misplaced_entry_breaks_sequence() {
        let mut session = SessionState::start(Mode::Chaos, "Ada", t0());
        session.record("1 2 4 3", ColumnId(0), at(3)).unwrap();
        let report = AuditEngine::default().audit(&session, 10.0);

        // Fewer than 20 numbers: incomplete takes precedence over order
        assert!(matches!(
            report.defects.for_category(Category::Numbers).next(),
            Some(Defect::SequenceIncomplete { found: 4, .. })
        ));
    }

    #[test]
    fn test_two_column_audit_ignores_shapes() {
        let config = LabConfig::two_column();
        let mut session =
            SessionState::start_with_config(Mode::Focus, "Ada", t0(), &config).unwrap();
        let numbers: Vec<String> = (1..=20).map(|n| n.to_string()).collect();
        session.record(&numbers.join(" "), ColumnId(0), at(10)).unwrap();
        session.record("abcdefghijklmnopqrst", ColumnId(1), at(20)).unwrap();

        let report = AuditEngine::new(&config).unwrap().audit(&session, 25.0);
        assert!(report.defects.is_clean());
        assert_eq!(
            report.category_times.keys().copied().collect::<Vec<_>>(),
            vec![Category::Numbers, Category::Letters]
        );
    }

    #[test]
    fn test_to_record() {
        let mut session = perfect_session();
        let total = session.freeze(at(70)).unwrap();
        let engine = AuditEngine::default();
        let report = engine.audit(&session, total);
        let record = engine.to_record(&session, &report).unwrap();

        assert_eq!(record.run_id, session.run_id());
        assert_eq!(record.participant, "Ada");
        assert_eq!(record.mode, Mode::Focus);
        assert_eq!(record.total_time, 70.0);
        assert_eq!(record.defect_count, 0);
        assert_eq!(record.column_counts, vec![20, 20, 20]);
        assert_eq!(record.finished_at, at(70));
    }

    #[test]
    fn test_to_record_requires_frozen_session() {
        let session = perfect_session();
        let engine = AuditEngine::default();
        let report = engine.audit(&session, 60.0);

        assert!(matches!(
            engine.to_record(&session, &report),
            Err(LabError::NotFinished(id)) if id == session.run_id()
        ));
    }

    #[test]
    fn test_new_rejects_target_beyond_alphabet() {
        // Letters stop at Z, so a 27th position could never be compared
        let config = LabConfig {
            target_count: 27,
            ..LabConfig::default()
        };
        assert!(matches!(
            AuditEngine::new(&config),
            Err(LabError::InvalidConfig(_))
        ));

        let config = LabConfig {
            target_count: 26,
            ..LabConfig::default()
        };
        let mut session =
            SessionState::start_with_config(Mode::Focus, "Ada", t0(), &config).unwrap();
        session
            .record("ABCDEFGHIJKLMNOPQRSTUVWXYQ", ColumnId(1), at(30))
            .unwrap();
        let report = AuditEngine::new(&config).unwrap().audit(&session, 30.0);

        assert_eq!(
            report.defects.for_category(Category::Letters).cloned().collect::<Vec<_>>(),
            vec![Defect::SequenceMismatch {
                category: Category::Letters,
                position: 25,
                expected: "Z".to_string(),
                actual: "Q".to_string(),
            }]
        );
    }

    #[test]
    fn test_summarize_arithmetic_mean() {
        let history = vec![
            record("Ada", Mode::Chaos, 60.0, 20.0, 1),
            record("Ada", Mode::Chaos, 90.0, 40.0, 4),
        ];
        let rows = summarize(&history, GroupBy::ParticipantAndMode);

        assert_eq!(rows.len(), 1);
        let row = &rows[0];
        assert_eq!(row.participant.as_deref(), Some("Ada"));
        assert_eq!(row.mode, Some(Mode::Chaos));
        assert_eq!(row.runs, 2);
        assert_eq!(row.mean_total_time, 75.0);
        assert_eq!(row.mean_category_times[&Category::Numbers], 30.0);
        assert_eq!(row.mean_category_times[&Category::Letters], 75.0);
        assert_eq!(row.mean_defect_count, 2.5);
        assert_eq!(row.mean_column_counts, vec![20.0, 20.0, 19.0]);
    }

    #[test]
    fn test_summarize_grouping() {
        let history = vec![
            record("Ada", Mode::Chaos, 60.0, 20.0, 0),
            record("Ada", Mode::Focus, 40.0, 10.0, 0),
            record("Bo", Mode::Focus, 50.0, 15.0, 2),
        ];

        let by_key = summarize(&history, GroupBy::ParticipantAndMode);
        assert_eq!(by_key.len(), 3);
        assert_eq!(by_key[0].participant.as_deref(), Some("Ada"));
        assert_eq!(by_key[0].mode, Some(Mode::Focus));

        let by_mode = summarize(&history, GroupBy::Mode);
        assert_eq!(by_mode.len(), 2);
        assert_eq!(by_mode[0].participant, None);
        assert_eq!(by_mode[0].mode, Some(Mode::Focus));
        assert_eq!(by_mode[0].mean_total_time, 45.0);

        let by_participant = summarize(&history, GroupBy::Participant);
        assert_eq!(by_participant.len(), 2);
        assert_eq!(by_participant[1].participant.as_deref(), Some("Bo"));
        assert_eq!(by_participant[1].runs, 1);
    }

    #[test]
    fn test_summarize_empty_history() {
        assert!(summarize(&[], GroupBy::default()).is_empty());
    }
}
