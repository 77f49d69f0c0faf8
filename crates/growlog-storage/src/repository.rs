//! Repository implementations for SQLite-backed persistence.
//!
//! Provides UserRepository, TodoRepository, ReflectionRepository, and
//! EmotionRepository that operate on the Database struct using raw SQL.
//! Todo and emotion operations are always scoped by owner: a row that
//! belongs to someone else behaves exactly like a missing row.

use std::sync::Arc;

use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use rusqlite::{Connection, ErrorCode, OptionalExtension, Row};
use uuid::Uuid;

use growlog_core::error::GrowlogError;
use growlog_core::types::{
    Emotion, EmotionKind, NewEmotion, NewReflection, NewTodo, Reflection, Todo, TodoPatch, User,
};

use crate::db::Database;

// =============================================================================
// Users
// =============================================================================

/// A user row together with its stored password hash.
#[derive(Clone, Debug)]
pub struct UserRecord {
    pub user: User,
    pub password_hash: String,
}

/// Repository for registered accounts.
#[derive(Clone, Debug)]
pub struct UserRepository {
    db: Arc<Database>,
}

impl UserRepository {
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    /// Register a new user. Emails are unique, compared case-insensitively.
    pub fn create(
        &self,
        email: &str,
        nickname: &str,
        password_hash: &str,
    ) -> Result<User, GrowlogError> {
        let user = User {
            id: Uuid::new_v4(),
            email: email.to_string(),
            nickname: nickname.to_string(),
            created_at: now_millis_precision(),
        };

        self.db.with_conn(|conn| {
            conn.execute(
                "INSERT INTO users (id, email, nickname, password_hash, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                rusqlite::params![
                    user.id.to_string(),
                    user.email,
                    user.nickname,
                    password_hash,
                    user.created_at.timestamp_millis(),
                ],
            )
            .map_err(|e| {
                if is_constraint_violation(&e) {
                    GrowlogError::Conflict(format!("email already registered: {}", email))
                } else {
                    GrowlogError::Storage(format!("Failed to save user: {}", e))
                }
            })?;
            Ok(())
        })?;

        Ok(user)
    }

    pub fn find_by_email(&self, email: &str) -> Result<Option<UserRecord>, GrowlogError> {
        self.db.with_conn(|conn| {
            let result = conn
                .query_row(
                    "SELECT id, email, nickname, created_at, password_hash
                     FROM users WHERE email = ?1",
                    rusqlite::params![email],
                    |row| Ok(row_to_user_record(row)),
                )
                .optional()
                .map_err(storage_err)?;
            result.transpose()
        })
    }

    pub fn find_by_id(&self, id: Uuid) -> Result<Option<User>, GrowlogError> {
        self.db.with_conn(|conn| {
            let result = conn
                .query_row(
                    "SELECT id, email, nickname, created_at, password_hash
                     FROM users WHERE id = ?1",
                    rusqlite::params![id.to_string()],
                    |row| Ok(row_to_user_record(row)),
                )
                .optional()
                .map_err(storage_err)?;
            Ok(result.transpose()?.map(|record| record.user))
        })
    }
}

// =============================================================================
// Todos
// =============================================================================

const TODO_COLUMNS: &str = "id, user_id, title, done, date, created_at, updated_at";

fn find_todo(conn: &Connection, user_id: Uuid, id: Uuid) -> Result<Option<Todo>, GrowlogError> {
    let sql = format!("SELECT {TODO_COLUMNS} FROM todos WHERE id = ?1 AND user_id = ?2");
    conn.query_row(
        &sql,
        rusqlite::params![id.to_string(), user_id.to_string()],
        |row| Ok(row_to_todo(row)),
    )
    .optional()
    .map_err(storage_err)?
    .transpose()
}

/// Persist the mutable fields of `todo`, stamping `updated_at`. `None` when
/// the row is gone.
fn write_todo(conn: &Connection, mut todo: Todo) -> Result<Option<Todo>, GrowlogError> {
    todo.updated_at = now_millis_precision();
    let affected = conn
        .execute(
            "UPDATE todos SET title = ?1, done = ?2, date = ?3, updated_at = ?4
             WHERE id = ?5 AND user_id = ?6",
            rusqlite::params![
                todo.title,
                todo.done as i32,
                todo.date.to_string(),
                todo.updated_at.timestamp_millis(),
                todo.id.to_string(),
                todo.user_id.to_string(),
            ],
        )
        .map_err(|e| GrowlogError::Storage(format!("Failed to update todo: {}", e)))?;
    Ok((affected > 0).then_some(todo))
}

/// Repository for todo items.
#[derive(Clone, Debug)]
pub struct TodoRepository {
    db: Arc<Database>,
}

impl TodoRepository {
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    pub fn create(&self, input: &NewTodo) -> Result<Todo, GrowlogError> {
        let now = now_millis_precision();
        let todo = Todo {
            id: Uuid::new_v4(),
            user_id: input.user_id,
            title: input.title.clone(),
            done: false,
            date: input.date,
            created_at: now,
            updated_at: now,
        };

        self.db.with_conn(|conn| {
            conn.execute(
                "INSERT INTO todos (id, user_id, title, done, date, created_at, updated_at)
                 VALUES (?1, ?2, ?3, 0, ?4, ?5, ?6)",
                rusqlite::params![
                    todo.id.to_string(),
                    todo.user_id.to_string(),
                    todo.title,
                    todo.date.to_string(),
                    todo.created_at.timestamp_millis(),
                    todo.updated_at.timestamp_millis(),
                ],
            )
            .map_err(|e| GrowlogError::Storage(format!("Failed to save todo: {}", e)))?;
            Ok(())
        })?;

        Ok(todo)
    }

    /// List a user's todos in creation order, optionally for a single date.
    pub fn list(&self, user_id: Uuid, date: Option<NaiveDate>) -> Result<Vec<Todo>, GrowlogError> {
        self.db.with_conn(|conn| {
            let sql = format!(
                "SELECT {TODO_COLUMNS} FROM todos
                 WHERE user_id = ?1 AND (?2 IS NULL OR date = ?2)
                 ORDER BY created_at ASC, rowid ASC"
            );
            let mut stmt = conn.prepare(&sql).map_err(storage_err)?;
            let rows = stmt
                .query_map(
                    rusqlite::params![user_id.to_string(), date.map(|d| d.to_string())],
                    |row| Ok(row_to_todo(row)),
                )
                .map_err(storage_err)?;

            let mut todos = Vec::new();
            for row in rows {
                todos.push(row.map_err(storage_err)??);
            }
            Ok(todos)
        })
    }

    pub fn find(&self, user_id: Uuid, id: Uuid) -> Result<Option<Todo>, GrowlogError> {
        self.db.with_conn(|conn| find_todo(conn, user_id, id))
    }

    /// Apply a partial update. Returns `None` when the todo does not exist
    /// for this user.
    ///
    /// The read and the write happen under one connection lock.
    pub fn update(
        &self,
        user_id: Uuid,
        id: Uuid,
        patch: &TodoPatch,
    ) -> Result<Option<Todo>, GrowlogError> {
        self.db.with_conn(|conn| {
            let Some(mut todo) = find_todo(conn, user_id, id)? else {
                return Ok(None);
            };
            if let Some(title) = &patch.title {
                todo.title = title.clone();
            }
            if let Some(done) = patch.done {
                todo.done = done;
            }
            if let Some(date) = patch.date {
                todo.date = date;
            }
            write_todo(conn, todo)
        })
    }

    /// Flip the `done` flag.
    pub fn toggle(&self, user_id: Uuid, id: Uuid) -> Result<Option<Todo>, GrowlogError> {
        self.db.with_conn(|conn| {
            let Some(mut todo) = find_todo(conn, user_id, id)? else {
                return Ok(None);
            };
            todo.done = !todo.done;
            write_todo(conn, todo)
        })
    }

    /// Delete a todo. Returns whether a row was removed.
    pub fn delete(&self, user_id: Uuid, id: Uuid) -> Result<bool, GrowlogError> {
        self.db.with_conn(|conn| {
            let affected = conn
                .execute(
                    "DELETE FROM todos WHERE id = ?1 AND user_id = ?2",
                    rusqlite::params![id.to_string(), user_id.to_string()],
                )
                .map_err(storage_err)?;
            Ok(affected > 0)
        })
    }
}

// =============================================================================
// Reflections
// =============================================================================

const REFLECTION_COLUMNS: &str = "id, user_id, content, date, created_at";

/// Repository for reflections. Not owner-scoped: the reflection routes are
/// public and entries may be anonymous.
#[derive(Clone, Debug)]
pub struct ReflectionRepository {
    db: Arc<Database>,
}

impl ReflectionRepository {
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    pub fn create(&self, input: &NewReflection) -> Result<Reflection, GrowlogError> {
        let reflection = Reflection {
            id: Uuid::new_v4(),
            user_id: input.user_id,
            content: input.content.clone(),
            date: input.date,
            created_at: now_millis_precision(),
        };

        self.db.with_conn(|conn| {
            conn.execute(
                "INSERT INTO reflections (id, user_id, content, date, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                rusqlite::params![
                    reflection.id.to_string(),
                    reflection.user_id.map(|id| id.to_string()),
                    reflection.content,
                    reflection.date.to_string(),
                    reflection.created_at.timestamp_millis(),
                ],
            )
            .map_err(|e| GrowlogError::Storage(format!("Failed to save reflection: {}", e)))?;
            Ok(())
        })?;

        Ok(reflection)
    }

    /// List all reflections, newest first, optionally for a single date.
    pub fn list(&self, date: Option<NaiveDate>) -> Result<Vec<Reflection>, GrowlogError> {
        self.db.with_conn(|conn| {
            let sql = format!(
                "SELECT {REFLECTION_COLUMNS} FROM reflections
                 WHERE ?1 IS NULL OR date = ?1
                 ORDER BY created_at DESC, rowid DESC"
            );
            collect_reflections(conn, &sql, rusqlite::params![date.map(|d| d.to_string())])
        })
    }

    /// Reflections authored by a user on a date, in the order written.
    pub fn list_by_author(
        &self,
        user_id: Uuid,
        date: NaiveDate,
    ) -> Result<Vec<Reflection>, GrowlogError> {
        self.db.with_conn(|conn| {
            let sql = format!(
                "SELECT {REFLECTION_COLUMNS} FROM reflections
                 WHERE user_id = ?1 AND date = ?2
                 ORDER BY created_at ASC, rowid ASC"
            );
            collect_reflections(
                conn,
                &sql,
                rusqlite::params![user_id.to_string(), date.to_string()],
            )
        })
    }

    pub fn find(&self, id: Uuid) -> Result<Option<Reflection>, GrowlogError> {
        self.db.with_conn(|conn| {
            let sql = format!("SELECT {REFLECTION_COLUMNS} FROM reflections WHERE id = ?1");
            conn.query_row(&sql, rusqlite::params![id.to_string()], |row| {
                Ok(row_to_reflection(row))
            })
            .optional()
            .map_err(storage_err)?
            .transpose()
        })
    }

    pub fn delete(&self, id: Uuid) -> Result<bool, GrowlogError> {
        self.db.with_conn(|conn| {
            let affected = conn
                .execute(
                    "DELETE FROM reflections WHERE id = ?1",
                    rusqlite::params![id.to_string()],
                )
                .map_err(storage_err)?;
            Ok(affected > 0)
        })
    }
}

fn collect_reflections(
    conn: &rusqlite::Connection,
    sql: &str,
    params: &[&dyn rusqlite::ToSql],
) -> Result<Vec<Reflection>, GrowlogError> {
    let mut stmt = conn.prepare(sql).map_err(storage_err)?;
    let rows = stmt
        .query_map(params, |row| Ok(row_to_reflection(row)))
        .map_err(storage_err)?;

    let mut reflections = Vec::new();
    for row in rows {
        reflections.push(row.map_err(storage_err)??);
    }
    Ok(reflections)
}

// =============================================================================
// Emotions
// =============================================================================

const EMOTION_COLUMNS: &str = "id, user_id, kind, intensity, note, date, created_at";

/// Repository for recorded emotions.
#[derive(Clone, Debug)]
pub struct EmotionRepository {
    db: Arc<Database>,
}

impl EmotionRepository {
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    pub fn create(&self, input: &NewEmotion) -> Result<Emotion, GrowlogError> {
        input.validate()?;

        let emotion = Emotion {
            id: Uuid::new_v4(),
            user_id: input.user_id,
            kind: input.kind,
            intensity: input.intensity,
            note: input.note.clone(),
            date: input.date,
            created_at: now_millis_precision(),
        };

        self.db.with_conn(|conn| {
            conn.execute(
                "INSERT INTO emotions (id, user_id, kind, intensity, note, date, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                rusqlite::params![
                    emotion.id.to_string(),
                    emotion.user_id.to_string(),
                    emotion.kind.as_str(),
                    emotion.intensity,
                    emotion.note,
                    emotion.date.to_string(),
                    emotion.created_at.timestamp_millis(),
                ],
            )
            .map_err(|e| GrowlogError::Storage(format!("Failed to save emotion: {}", e)))?;
            Ok(())
        })?;

        Ok(emotion)
    }

    /// List a user's emotions in the order recorded, optionally for one date.
    pub fn list(
        &self,
        user_id: Uuid,
        date: Option<NaiveDate>,
    ) -> Result<Vec<Emotion>, GrowlogError> {
        self.db.with_conn(|conn| {
            let sql = format!(
                "SELECT {EMOTION_COLUMNS} FROM emotions
                 WHERE user_id = ?1 AND (?2 IS NULL OR date = ?2)
                 ORDER BY created_at ASC, rowid ASC"
            );
            let mut stmt = conn.prepare(&sql).map_err(storage_err)?;
            let rows = stmt
                .query_map(
                    rusqlite::params![user_id.to_string(), date.map(|d| d.to_string())],
                    |row| Ok(row_to_emotion(row)),
                )
                .map_err(storage_err)?;

            let mut emotions = Vec::new();
            for row in rows {
                emotions.push(row.map_err(storage_err)??);
            }
            Ok(emotions)
        })
    }

    pub fn delete(&self, user_id: Uuid, id: Uuid) -> Result<bool, GrowlogError> {
        self.db.with_conn(|conn| {
            let affected = conn
                .execute(
                    "DELETE FROM emotions WHERE id = ?1 AND user_id = ?2",
                    rusqlite::params![id.to_string(), user_id.to_string()],
                )
                .map_err(storage_err)?;
            Ok(affected > 0)
        })
    }
}

// =============================================================================
// Row conversion helpers
// =============================================================================

fn storage_err(e: rusqlite::Error) -> GrowlogError {
    GrowlogError::Storage(e.to_string())
}

fn is_constraint_violation(e: &rusqlite::Error) -> bool {
    matches!(
        e,
        rusqlite::Error::SqliteFailure(err, _) if err.code == ErrorCode::ConstraintViolation
    )
}

/// Current time truncated to milliseconds, so values round-trip through
/// storage unchanged.
fn now_millis_precision() -> DateTime<Utc> {
    millis_to_datetime(Utc::now().timestamp_millis()).unwrap_or_else(Utc::now)
}

fn millis_to_datetime(ms: i64) -> Option<DateTime<Utc>> {
    Utc.timestamp_millis_opt(ms).single()
}

fn get_col<T: rusqlite::types::FromSql>(row: &Row<'_>, idx: usize) -> Result<T, GrowlogError> {
    row.get(idx).map_err(storage_err)
}

fn parse_uuid(s: &str) -> Result<Uuid, GrowlogError> {
    Uuid::parse_str(s).map_err(|e| GrowlogError::Storage(format!("Invalid UUID '{}': {}", s, e)))
}

fn parse_date(s: &str) -> Result<NaiveDate, GrowlogError> {
    s.parse()
        .map_err(|e| GrowlogError::Storage(format!("Invalid date '{}': {}", s, e)))
}

fn parse_timestamp(ms: i64) -> Result<DateTime<Utc>, GrowlogError> {
    millis_to_datetime(ms)
        .ok_or_else(|| GrowlogError::Storage(format!("Invalid timestamp: {}", ms)))
}

fn row_to_user_record(row: &Row<'_>) -> Result<UserRecord, GrowlogError> {
    let id: String = get_col(row, 0)?;
    Ok(UserRecord {
        user: User {
            id: parse_uuid(&id)?,
            email: get_col(row, 1)?,
            nickname: get_col(row, 2)?,
            created_at: parse_timestamp(get_col(row, 3)?)?,
        },
        password_hash: get_col(row, 4)?,
    })
}

fn row_to_todo(row: &Row<'_>) -> Result<Todo, GrowlogError> {
    let id: String = get_col(row, 0)?;
    let user_id: String = get_col(row, 1)?;
    let done: i64 = get_col(row, 3)?;
    let date: String = get_col(row, 4)?;
    Ok(Todo {
        id: parse_uuid(&id)?,
        user_id: parse_uuid(&user_id)?,
        title: get_col(row, 2)?,
        done: done != 0,
        date: parse_date(&date)?,
        created_at: parse_timestamp(get_col(row, 5)?)?,
        updated_at: parse_timestamp(get_col(row, 6)?)?,
    })
}

fn row_to_reflection(row: &Row<'_>) -> Result<Reflection, GrowlogError> {
    let id: String = get_col(row, 0)?;
    let user_id: Option<String> = get_col(row, 1)?;
    let date: String = get_col(row, 3)?;
    Ok(Reflection {
        id: parse_uuid(&id)?,
        user_id: user_id.as_deref().map(parse_uuid).transpose()?,
        content: get_col(row, 2)?,
        date: parse_date(&date)?,
        created_at: parse_timestamp(get_col(row, 4)?)?,
    })
}

fn row_to_emotion(row: &Row<'_>) -> Result<Emotion, GrowlogError> {
    let id: String = get_col(row, 0)?;
    let user_id: String = get_col(row, 1)?;
    let kind: String = get_col(row, 2)?;
    let date: String = get_col(row, 5)?;
    Ok(Emotion {
        id: parse_uuid(&id)?,
        user_id: parse_uuid(&user_id)?,
        kind: kind.parse::<EmotionKind>()?,
        intensity: get_col(row, 3)?,
        note: get_col(row, 4)?,
        date: parse_date(&date)?,
        created_at: parse_timestamp(get_col(row, 6)?)?,
    })
}
