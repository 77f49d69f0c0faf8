use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::GrowlogError;

// =============================================================================
// Enums
// =============================================================================

/// The kind of emotion a user records for a day.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(rename_all = "snake_case")]
pub enum EmotionKind {
    Joy,
    Gratitude,
    Calm,
    Sadness,
    Anger,
    Anxiety,
    Tired,
}

impl EmotionKind {
    pub const ALL: [EmotionKind; 7] = [
        EmotionKind::Joy,
        EmotionKind::Gratitude,
        EmotionKind::Calm,
        EmotionKind::Sadness,
        EmotionKind::Anger,
        EmotionKind::Anxiety,
        EmotionKind::Tired,
    ];

    /// Stable lowercase name, used for storage and JSON.
    pub fn as_str(&self) -> &'static str {
        match self {
            EmotionKind::Joy => "joy",
            EmotionKind::Gratitude => "gratitude",
            EmotionKind::Calm => "calm",
            EmotionKind::Sadness => "sadness",
            EmotionKind::Anger => "anger",
            EmotionKind::Anxiety => "anxiety",
            EmotionKind::Tired => "tired",
        }
    }
}

impl fmt::Display for EmotionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EmotionKind {
    type Err = GrowlogError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        EmotionKind::ALL
            .into_iter()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| GrowlogError::Validation(format!("unknown emotion kind: {s}")))
    }
}

// =============================================================================
// Entities
// =============================================================================

/// A registered account. The password hash lives only in storage.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct User {
    pub id: Uuid,
    pub email: String,
    pub nickname: String,
    pub created_at: DateTime<Utc>,
}

/// A single todo item, owned by one user and filed under one date.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct Todo {
    pub id: Uuid,
    pub user_id: Uuid,
    pub title: String,
    pub done: bool,
    pub date: NaiveDate,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A free-text reflection. Authorship is optional: the reflection routes
/// accept anonymous writes.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct Reflection {
    pub id: Uuid,
    pub user_id: Option<Uuid>,
    pub content: String,
    pub date: NaiveDate,
    pub created_at: DateTime<Utc>,
}

/// A recorded emotion with intensity 1..=5.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct Emotion {
    pub id: Uuid,
    pub user_id: Uuid,
    pub kind: EmotionKind,
    pub intensity: u8,
    pub note: Option<String>,
    pub date: NaiveDate,
    pub created_at: DateTime<Utc>,
}

pub const MIN_INTENSITY: u8 = 1;
pub const MAX_INTENSITY: u8 = 5;

// =============================================================================
// Inputs
// =============================================================================

#[derive(Clone, Debug)]
pub struct NewTodo {
    pub user_id: Uuid,
    pub title: String,
    pub date: NaiveDate,
}

/// Partial update for a todo. `None` fields are left unchanged.
#[derive(Clone, Debug, Default)]
pub struct TodoPatch {
    pub title: Option<String>,
    pub done: Option<bool>,
    pub date: Option<NaiveDate>,
}

impl TodoPatch {
    pub fn is_empty(&self) -> bool {
        self.title.is_none() && self.done.is_none() && self.date.is_none()
    }
}

#[derive(Clone, Debug)]
pub struct NewReflection {
    pub user_id: Option<Uuid>,
    pub content: String,
    pub date: NaiveDate,
}

#[derive(Clone, Debug)]
pub struct NewEmotion {
    pub user_id: Uuid,
    pub kind: EmotionKind,
    pub intensity: u8,
    pub note: Option<String>,
    pub date: NaiveDate,
}

impl NewEmotion {
    pub fn validate(&self) -> Result<(), GrowlogError> {
        if !(MIN_INTENSITY..=MAX_INTENSITY).contains(&self.intensity) {
            return Err(GrowlogError::Validation(format!(
                "intensity must be between {MIN_INTENSITY} and {MAX_INTENSITY}, got {}",
                self.intensity
            )));
        }
        Ok(())
    }
}

// =============================================================================
// Daily aggregate
// =============================================================================

/// Everything one user logged on one date. Computed on read, never stored.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct DailyLog {
    pub date: NaiveDate,
    pub todos: Vec<Todo>,
    pub reflections: Vec<Reflection>,
    pub emotions: Vec<Emotion>,
    pub summary: DailySummary,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct DailySummary {
    pub total_todos: u32,
    pub completed_todos: u32,
    /// Emotion with the highest summed intensity; ties go to the kind
    /// recorded first that day.
    pub dominant_emotion: Option<EmotionKind>,
}

impl DailyLog {
    pub fn new(
        date: NaiveDate,
        todos: Vec<Todo>,
        reflections: Vec<Reflection>,
        emotions: Vec<Emotion>,
    ) -> Self {
        let summary = DailySummary::compute(&todos, &emotions);
        Self {
            date,
            todos,
            reflections,
            emotions,
            summary,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.todos.is_empty() && self.reflections.is_empty() && self.emotions.is_empty()
    }
}

impl DailySummary {
    pub fn compute(todos: &[Todo], emotions: &[Emotion]) -> Self {
        let completed = todos.iter().filter(|t| t.done).count();

        // First-seen order breaks ties deterministically.
        let mut order: Vec<EmotionKind> = Vec::new();
        let mut totals: HashMap<EmotionKind, u32> = HashMap::new();
        for emotion in emotions {
            let entry = totals.entry(emotion.kind).or_insert_with(|| {
                order.push(emotion.kind);
                0
            });
            *entry += u32::from(emotion.intensity);
        }

        let mut dominant: Option<(EmotionKind, u32)> = None;
        for kind in order {
            let total = totals[&kind];
            if dominant.map_or(true, |(_, best)| total > best) {
                dominant = Some((kind, total));
            }
        }

        Self {
            total_todos: todos.len() as u32,
            completed_todos: completed as u32,
            dominant_emotion: dominant.map(|(kind, _)| kind),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(s: &str) -> NaiveDate {
        s.parse().unwrap()
    }

    fn todo(done: bool) -> Todo {
        let now = Utc::now();
        Todo {
            id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            title: "water plants".to_string(),
            done,
            date: date("2024-05-01"),
            created_at: now,
            updated_at: now,
        }
    }

    fn emotion(kind: EmotionKind, intensity: u8) -> Emotion {
        Emotion {
            id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            kind,
            intensity,
            note: None,
            date: date("2024-05-01"),
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_emotion_kind_string_forms_agree() {
        for kind in EmotionKind::ALL {
            let json = serde_json::to_string(&kind).unwrap();
            assert_eq!(json, format!("\"{}\"", kind.as_str()));
            assert_eq!(kind.as_str().parse::<EmotionKind>().unwrap(), kind);
        }
    }

    #[test]
    fn test_unknown_emotion_kind_is_validation_error() {
        let err = "ecstatic".parse::<EmotionKind>().unwrap_err();
        assert!(matches!(err, GrowlogError::Validation(_)));
    }

    #[test]
    fn test_new_emotion_intensity_bounds() {
        let mut input = NewEmotion {
            user_id: Uuid::new_v4(),
            kind: EmotionKind::Calm,
            intensity: 1,
            note: None,
            date: date("2024-05-01"),
        };
        assert!(input.validate().is_ok());
        input.intensity = 5;
        assert!(input.validate().is_ok());
        input.intensity = 0;
        assert!(input.validate().is_err());
        input.intensity = 6;
        assert!(input.validate().is_err());
    }

    #[test]
    fn test_todo_patch_is_empty() {
        assert!(TodoPatch::default().is_empty());
        let patch = TodoPatch {
            done: Some(true),
            ..TodoPatch::default()
        };
        assert!(!patch.is_empty());
    }

    #[test]
    fn test_summary_counts_todos() {
        let summary = DailySummary::compute(&[todo(true), todo(false), todo(true)], &[]);
        assert_eq!(summary.total_todos, 3);
        assert_eq!(summary.completed_todos, 2);
        assert_eq!(summary.dominant_emotion, None);
    }

    #[test]
    fn test_summary_dominant_emotion_sums_intensity() {
        let emotions = vec![
            emotion(EmotionKind::Joy, 4),
            emotion(EmotionKind::Anxiety, 3),
            emotion(EmotionKind::Anxiety, 3),
        ];
        let summary = DailySummary::compute(&[], &emotions);
        assert_eq!(summary.dominant_emotion, Some(EmotionKind::Anxiety));
    }

    #[test]
    fn test_summary_tie_goes_to_first_recorded() {
        let emotions = vec![emotion(EmotionKind::Calm, 2), emotion(EmotionKind::Tired, 2)];
        let summary = DailySummary::compute(&[], &emotions);
        assert_eq!(summary.dominant_emotion, Some(EmotionKind::Calm));
    }

    #[test]
    fn test_daily_log_is_empty() {
        let log = DailyLog::new(date("2024-05-01"), vec![], vec![], vec![]);
        assert!(log.is_empty());
        let log = DailyLog::new(date("2024-05-01"), vec![todo(false)], vec![], vec![]);
        assert!(!log.is_empty());
    }
}
