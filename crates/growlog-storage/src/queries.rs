//! Read-side queries that combine several repositories.
//!
//! The daily log is assembled on read from todos, emotions and the
//! reflections a user authored on that date.

use std::sync::Arc;

use chrono::NaiveDate;
use tracing::debug;
use uuid::Uuid;

use growlog_core::error::GrowlogError;
use growlog_core::types::DailyLog;

use crate::db::Database;
use crate::repository::{EmotionRepository, ReflectionRepository, TodoRepository};

/// Longest span, in days and inclusive of both ends, a range query may cover.
pub const MAX_RANGE_DAYS: i64 = 31;

/// Builds per-day aggregates for a single user.
#[derive(Clone, Debug)]
pub struct QueryService {
    todos: TodoRepository,
    reflections: ReflectionRepository,
    emotions: EmotionRepository,
}

impl QueryService {
    pub fn new(db: Arc<Database>) -> Self {
        Self {
            todos: TodoRepository::new(Arc::clone(&db)),
            reflections: ReflectionRepository::new(Arc::clone(&db)),
            emotions: EmotionRepository::new(db),
        }
    }

    /// The full log for one date. Always returns a log, empty when nothing
    /// was recorded.
    pub fn daily_log(&self, user_id: Uuid, date: NaiveDate) -> Result<DailyLog, GrowlogError> {
        let todos = self.todos.list(user_id, Some(date))?;
        let reflections = self.reflections.list_by_author(user_id, date)?;
        let emotions = self.emotions.list(user_id, Some(date))?;
        Ok(DailyLog::new(date, todos, reflections, emotions))
    }

    /// Logs for every date in `from..=to` that has at least one entry,
    /// in ascending date order.
    pub fn daily_range(
        &self,
        user_id: Uuid,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<DailyLog>, GrowlogError> {
        validate_range(from, to)?;

        let mut logs = Vec::new();
        for date in from.iter_days().take_while(|d| *d <= to) {
            let log = self.daily_log(user_id, date)?;
            if !log.is_empty() {
                logs.push(log);
            }
        }

        debug!(
            user_id = %user_id,
            %from,
            %to,
            days = logs.len(),
            "daily range assembled"
        );
        Ok(logs)
    }
}

/// Reject reversed ranges and ranges longer than [`MAX_RANGE_DAYS`].
pub fn validate_range(from: NaiveDate, to: NaiveDate) -> Result<(), GrowlogError> {
    if from > to {
        return Err(GrowlogError::Validation(format!(
            "range start {from} is after end {to}"
        )));
    }
    let days = (to - from).num_days() + 1;
    if days > MAX_RANGE_DAYS {
        return Err(GrowlogError::Validation(format!(
            "range covers {days} days, at most {MAX_RANGE_DAYS} allowed"
        )));
    }
    Ok(())
}
