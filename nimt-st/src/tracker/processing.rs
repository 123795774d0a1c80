//! Processing status updates
//!
//! Pipeline runners report one [`PipelineOutcome`] per (participant,
//! session) pair they attempted; [`record_outcomes`] folds a batch of them
//! into the processing status table, keeping one record per pair and
//! pipeline step.

use tracing::info;

use crate::error::Result;
use crate::tables::processing::{PipelineRef, ProcessingStatusRow, ProcessingStatusTable, RunStatus};

/// Outcome of one pipeline run.
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineOutcome {
    pub pipeline: PipelineRef,
    pub participant_id: String,
    pub session_id: String,
    pub status: RunStatus,
}

impl PipelineOutcome {
    pub fn new(
        pipeline: PipelineRef,
        participant_id: impl Into<String>,
        session_id: impl Into<String>,
        status: RunStatus,
    ) -> Self {
        Self {
            pipeline,
            participant_id: participant_id.into(),
            session_id: session_id.into(),
            status,
        }
    }
}

impl From<PipelineOutcome> for ProcessingStatusRow {
    fn from(outcome: PipelineOutcome) -> Self {
        ProcessingStatusRow::new(
            outcome.participant_id,
            outcome.session_id,
            &outcome.pipeline,
            outcome.status,
        )
    }
}

/// Upserts run outcomes into the table.
///
/// A pair that already has a record for the same pipeline step keeps a
/// single record carrying the new status; new pairs are appended. The input
/// table is left untouched.
pub fn record_outcomes(
    table: &ProcessingStatusTable,
    outcomes: impl IntoIterator<Item = PipelineOutcome>,
) -> Result<ProcessingStatusTable> {
    let rows: Vec<ProcessingStatusRow> = outcomes.into_iter().map(Into::into).collect();
    let updated = table.add_or_update_rows(&rows)?;
    info!(
        outcomes = rows.len(),
        records = updated.len(),
        "Recorded pipeline outcomes"
    );
    Ok(updated)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pipeline() -> PipelineRef {
        PipelineRef::new("fmriprep", "23.1.3", "default")
    }

    fn outcome(participant: &str, session: &str, status: RunStatus) -> PipelineOutcome {
        PipelineOutcome::new(pipeline(), participant, session, status)
    }

    #[test]
    fn rerun_replaces_the_existing_record() {
        let table = record_outcomes(
            &ProcessingStatusTable::new(),
            vec![outcome("01", "BL", RunStatus::Fail)],
        )
        .unwrap();
        assert_eq!(table.len(), 1);
        assert_eq!(table.rows()[0].status, RunStatus::Fail);

        let table = record_outcomes(&table, vec![outcome("01", "BL", RunStatus::Success)]).unwrap();
        assert_eq!(table.len(), 1);
        assert_eq!(table.rows()[0].status, RunStatus::Success);
    }

    #[test]
    fn new_pairs_are_appended_in_order() {
        let table = record_outcomes(
            &ProcessingStatusTable::new(),
            vec![
                outcome("01", "BL", RunStatus::Success),
                outcome("02", "BL", RunStatus::Incomplete),
            ],
        )
        .unwrap();
        let participants: Vec<&str> = table.iter().map(|r| r.participant_id.as_str()).collect();
        assert_eq!(participants, vec!["01", "02"]);

        let done: Vec<(&str, &str)> = table
            .get_completed_participants_sessions(&pipeline(), None, None)
            .collect();
        assert_eq!(done, vec![("01", "BL")]);
    }

    #[test]
    fn outcomes_for_different_steps_do_not_collide() {
        let mut step2 = pipeline();
        step2.step = "step2".to_owned();
        let table = record_outcomes(
            &ProcessingStatusTable::new(),
            vec![
                outcome("01", "BL", RunStatus::Success),
                PipelineOutcome::new(step2, "01", "BL", RunStatus::Fail),
            ],
        )
        .unwrap();
        assert_eq!(table.len(), 2);
    }

    #[test]
    fn derived_identifiers_are_filled_in() {
        let table = record_outcomes(
            &ProcessingStatusTable::new(),
            vec![outcome("01", "none", RunStatus::Unavailable)],
        )
        .unwrap();
        let row = &table.rows()[0];
        assert_eq!(row.bids_participant_id, "sub-01");
        assert_eq!(row.bids_session_id, "ses-none");
    }
}
