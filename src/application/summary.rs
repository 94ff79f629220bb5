//! Run summary aggregated after all verification tasks finish.

use crate::application::services::result_persister::PersistOutcome;
use crate::domain::entities::LinkStatus;

/// Number of rows shown in the console preview.
pub const PREVIEW_ROWS: usize = 20;

/// One processed record, as reported to the operator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResultRow {
    pub id: i64,
    pub provider: String,
    pub status: LinkStatus,
    pub final_url: Option<String>,
    pub persist: PersistOutcome,
}

impl ResultRow {
    /// A verdict was computed but could not be stored.
    pub fn is_unpersisted(&self) -> bool {
        self.persist.is_failure()
    }
}

/// Aggregate of one pipeline run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunSummary {
    /// Rows returned by the candidate query.
    pub candidates: usize,
    /// Candidates skipped because they had no link to probe.
    pub without_link: usize,
    pub valid: usize,
    pub redirected: usize,
    pub broken: usize,
    pub written: usize,
    /// Verdicts not written because the run was a dry run.
    pub skipped_writes: usize,
    pub persist_failures: usize,
    /// Tasks that panicked; their records have no verdict.
    pub task_failures: usize,
    /// Candidates left unverified because the run was cancelled.
    pub interrupted: usize,
    pub dry_run: bool,
    /// Per-record results, in candidate order.
    pub rows: Vec<ResultRow>,
}

impl RunSummary {
    pub fn new(dry_run: bool) -> Self {
        Self {
            dry_run,
            ..Self::default()
        }
    }

    /// Records a classified row and its persistence outcome.
    pub fn record(&mut self, row: ResultRow) {
        match row.status {
            LinkStatus::Valid => self.valid += 1,
            LinkStatus::Redirected => self.redirected += 1,
            LinkStatus::Broken => self.broken += 1,
        }
        match row.persist {
            PersistOutcome::Written => self.written += 1,
            PersistOutcome::Skipped => self.skipped_writes += 1,
            PersistOutcome::Failed(_) => self.persist_failures += 1,
        }
        self.rows.push(row);
    }

    /// Number of records that received a verdict.
    pub fn processed(&self) -> usize {
        self.valid + self.redirected + self.broken
    }

    pub fn count(&self, status: LinkStatus) -> usize {
        match status {
            LinkStatus::Valid => self.valid,
            LinkStatus::Redirected => self.redirected,
            LinkStatus::Broken => self.broken,
        }
    }

    /// First rows for the console table.
    pub fn preview(&self) -> &[ResultRow] {
        &self.rows[..self.rows.len().min(PREVIEW_ROWS)]
    }

    /// One-line totals, e.g. for the final log record.
    pub fn totals_line(&self) -> String {
        let mut line = format!(
            "Processed {} of {} candidates: {} valid, {} redirected, {} broken",
            self.processed(),
            self.candidates,
            self.valid,
            self.redirected,
            self.broken
        );

        if self.dry_run {
            line.push_str(" (dry run, nothing written)");
        } else {
            line.push_str(&format!(
                "; {} written, {} unpersisted",
                self.written, self.persist_failures
            ));
        }
        if self.task_failures > 0 {
            line.push_str(&format!("; {} tasks failed", self.task_failures));
        }
        if self.interrupted > 0 {
            line.push_str(&format!("; {} interrupted", self.interrupted));
        }

        line
    }
}
