//! Export job model
//!
//! An [`ExportJob`] is the persisted record of one export run. Its cursor
//! (`processing_date`) starts at `start_date` and walks backward one day at a
//! time until it reaches `end_date`.

use crate::domain::ids::JobId;
use crate::domain::{Result, SyncError};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Lifecycle state of an export job
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    #[default]
    Pending,
    Running,
    Paused,
    Completed,
    Failed,
}

impl JobStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Running => "running",
            Self::Paused => "paused",
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }

    /// `completed` and `failed` never change again
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }

    /// Whether the ledger accepts a move from `self` to `next`
    ///
    /// `paused → running` is the only way back into `running` once a job
    /// has left it.
    pub fn can_transition_to(&self, next: JobStatus) -> bool {
        use JobStatus::*;
        matches!(
            (self, next),
            (Pending, Running)
                | (Pending, Paused)
                | (Pending, Failed)
                | (Running, Paused)
                | (Running, Completed)
                | (Running, Failed)
                | (Paused, Running)
        )
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for JobStatus {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            "running" => Ok(Self::Running),
            "paused" => Ok(Self::Paused),
            "completed" => Ok(Self::Completed),
            "failed" => Ok(Self::Failed),
            other => Err(format!("Unknown job status: {other}")),
        }
    }
}

/// Where the cursor went after a batch
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CursorMove {
    /// The day has more rows; the offset moved forward
    SameDay,
    /// The day was exhausted; the cursor moved back one day
    PreviousDay,
    /// The last day in range was exhausted
    Finished,
}

/// Persisted export job
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExportJob {
    pub id: JobId,
    pub start_date: NaiveDate,
    /// Inclusive lower bound of the walk; `None` means the configured floor date
    pub end_date: Option<NaiveDate>,
    pub status: JobStatus,
    pub processing_date: NaiveDate,
    /// Rows of `processing_date` already read
    pub processing_offset: i64,
    pub total_leads: i64,
    pub exported_leads: i64,
    pub error_leads: i64,
    pub last_completed_date: Option<NaiveDate>,
    pub pause_reason: Option<String>,
    pub last_error: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl ExportJob {
    /// Creates a `pending` job with the cursor at `start_date`
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::Validation`] when `end_date` is after `start_date`.
    ///
    /// ```
    /// use leadsync::core::state::{ExportJob, JobStatus};
    /// use chrono::NaiveDate;
    ///
    /// let start = NaiveDate::from_ymd_opt(2024, 1, 10).unwrap();
    /// let end = NaiveDate::from_ymd_opt(2024, 1, 8).unwrap();
    /// let job = ExportJob::new(start, Some(end)).unwrap();
    /// assert_eq!(job.status, JobStatus::Pending);
    /// assert_eq!(job.processing_date, start);
    /// ```
    pub fn new(start_date: NaiveDate, end_date: Option<NaiveDate>) -> Result<Self> {
        if let Some(end) = end_date {
            if end > start_date {
                return Err(SyncError::Validation(format!(
                    "end_date {end} is after start_date {start_date}; jobs walk backward in time"
                )));
            }
        }

        let now = Utc::now();
        Ok(Self {
            id: JobId::generate(),
            start_date,
            end_date,
            status: JobStatus::Pending,
            processing_date: start_date,
            processing_offset: 0,
            total_leads: 0,
            exported_leads: 0,
            error_leads: 0,
            last_completed_date: None,
            pause_reason: None,
            last_error: None,
            created_at: now,
            updated_at: now,
            started_at: None,
            completed_at: None,
        })
    }

    /// Last day the cursor may reach
    pub fn stop_date(&self, floor_date: NaiveDate) -> NaiveDate {
        self.end_date.unwrap_or(floor_date)
    }

    /// Records the outcome of one batch in the counters
    pub fn record_batch(&mut self, rows: usize, exported: usize, errors: usize) {
        self.total_leads += rows as i64;
        self.exported_leads += exported as i64;
        self.error_leads += errors as i64;
        self.updated_at = Utc::now();
    }

    /// Moves the cursor after a batch of `rows` read with page size `batch_size`
    ///
    /// A short page means the day is exhausted and the cursor moves back one
    /// day. Landing on the stop date finishes the walk without reading that
    /// day; a job that starts on its stop date finishes where it is.
    pub fn advance_cursor(
        &mut self,
        rows: usize,
        batch_size: usize,
        floor_date: NaiveDate,
    ) -> CursorMove {
        self.updated_at = Utc::now();

        if rows >= batch_size {
            self.processing_offset += rows as i64;
            return CursorMove::SameDay;
        }

        self.last_completed_date = Some(self.processing_date);
        let stop = self.stop_date(floor_date);
        match self.processing_date.pred_opt() {
            Some(previous) if previous > stop => {
                self.processing_date = previous;
                self.processing_offset = 0;
                CursorMove::PreviousDay
            }
            Some(previous) if previous == stop => {
                self.processing_date = previous;
                self.processing_offset = 0;
                CursorMove::Finished
            }
            _ => CursorMove::Finished,
        }
    }

    /// Applies a status change and its timestamps without checking the guard
    pub(crate) fn apply_status(&mut self, next: JobStatus, reason: Option<String>) {
        let now = Utc::now();
        match next {
            JobStatus::Running => {
                if self.started_at.is_none() {
                    self.started_at = Some(now);
                }
                self.pause_reason = None;
            }
            JobStatus::Paused => self.pause_reason = reason,
            JobStatus::Failed => {
                self.last_error = reason;
                self.completed_at = Some(now);
            }
            JobStatus::Completed => self.completed_at = Some(now),
            JobStatus::Pending => {}
        }
        self.status = next;
        self.updated_at = now;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_new_rejects_end_after_start() {
        let err = ExportJob::new(date(2024, 1, 8), Some(date(2024, 1, 10))).unwrap_err();
        assert!(matches!(err, SyncError::Validation(_)));
    }

    #[test]
    fn test_new_allows_single_day_range() {
        let job = ExportJob::new(date(2024, 1, 8), Some(date(2024, 1, 8))).unwrap();
        assert_eq!(job.processing_date, date(2024, 1, 8));
    }

    #[test]
    fn test_transition_table() {
        use JobStatus::*;
        let allowed = [
            (Pending, Running),
            (Pending, Paused),
            (Pending, Failed),
            (Running, Paused),
            (Running, Completed),
            (Running, Failed),
            (Paused, Running),
        ];
        let all = [Pending, Running, Paused, Completed, Failed];
        for from in all {
            for to in all {
                assert_eq!(
                    from.can_transition_to(to),
                    allowed.contains(&(from, to)),
                    "{from} -> {to}"
                );
            }
        }
    }

    #[test]
    fn test_full_page_keeps_day_and_moves_offset() {
        let mut job = ExportJob::new(date(2024, 1, 10), Some(date(2024, 1, 8))).unwrap();
        let floor = date(2020, 1, 1);
        assert_eq!(job.advance_cursor(100, 100, floor), CursorMove::SameDay);
        assert_eq!(job.processing_date, date(2024, 1, 10));
        assert_eq!(job.processing_offset, 100);
        assert_eq!(job.last_completed_date, None);
    }

    #[test]
    fn test_cursor_walks_to_end_date_then_finishes() {
        let floor = date(2020, 1, 1);
        let mut job = ExportJob::new(date(2024, 1, 10), Some(date(2024, 1, 8))).unwrap();
        job.processing_offset = 100;

        assert_eq!(job.advance_cursor(50, 100, floor), CursorMove::PreviousDay);
        assert_eq!(job.processing_date, date(2024, 1, 9));
        assert_eq!(job.processing_offset, 0);
        assert_eq!(job.last_completed_date, Some(date(2024, 1, 10)));

        assert_eq!(job.advance_cursor(0, 100, floor), CursorMove::Finished);
        assert_eq!(job.processing_date, date(2024, 1, 8));
        assert_eq!(job.processing_offset, 0);
        assert_eq!(job.last_completed_date, Some(date(2024, 1, 9)));
    }

    #[test]
    fn test_single_day_job_finishes_in_place() {
        let floor = date(2020, 1, 1);
        let mut job = ExportJob::new(date(2024, 1, 8), Some(date(2024, 1, 8))).unwrap();
        assert_eq!(job.advance_cursor(3, 100, floor), CursorMove::Finished);
        assert_eq!(job.processing_date, date(2024, 1, 8));
        assert_eq!(job.last_completed_date, Some(date(2024, 1, 8)));
    }

    #[test]
    fn test_open_ended_job_stops_at_floor() {
        let floor = date(2024, 1, 8);
        let mut job = ExportJob::new(date(2024, 1, 10), None).unwrap();
        assert_eq!(job.advance_cursor(0, 100, floor), CursorMove::PreviousDay);
        assert_eq!(job.advance_cursor(0, 100, floor), CursorMove::Finished);
        assert_eq!(job.processing_date, floor);
    }

    #[test]
    fn test_apply_status_timestamps() {
        let mut job = ExportJob::new(date(2024, 1, 10), None).unwrap();
        job.apply_status(JobStatus::Running, None);
        let started = job.started_at;
        assert!(started.is_some());

        job.apply_status(JobStatus::Paused, Some("operator".to_string()));
        assert_eq!(job.pause_reason.as_deref(), Some("operator"));

        job.apply_status(JobStatus::Running, None);
        assert_eq!(job.started_at, started);
        assert!(job.pause_reason.is_none());

        job.apply_status(JobStatus::Failed, Some("source unreachable".to_string()));
        assert!(job.completed_at.is_some());
        assert_eq!(job.last_error.as_deref(), Some("source unreachable"));
    }

    #[test]
    fn test_status_parse_roundtrip() {
        for status in ["pending", "running", "paused", "completed", "failed"] {
            assert_eq!(status.parse::<JobStatus>().unwrap().as_str(), status);
        }
        assert!("cancelled".parse::<JobStatus>().is_err());
    }
}
