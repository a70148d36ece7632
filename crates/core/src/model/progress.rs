use std::collections::{BTreeMap, HashSet};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::model::ids::{ExerciseId, LessonId};
use crate::model::lesson::Lesson;

/// The single global progress record of an installation.
///
/// Field names follow the persisted JSON layout, which is also the export
/// format.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProgress {
    /// Completed lesson ids; membership semantics, no duplicates.
    pub completed_lessons: Vec<LessonId>,
    pub quiz_scores: BTreeMap<LessonId, f64>,
    /// Empty when no lesson has been visited yet.
    #[serde(default)]
    pub last_accessed_lesson: String,
    /// Set once when the record is first created.
    pub start_date: DateTime<Utc>,
    /// Cumulative seconds across all lessons.
    #[serde(default)]
    pub total_time_spent: u64,
    #[serde(default)]
    pub current_lesson: String,
}

impl UserProgress {
    /// Default record for a brand-new installation.
    #[must_use]
    pub fn fresh(now: DateTime<Utc>) -> Self {
        Self {
            completed_lessons: Vec::new(),
            quiz_scores: BTreeMap::new(),
            last_accessed_lesson: String::new(),
            start_date: now,
            total_time_spent: 0,
            current_lesson: String::new(),
        }
    }

    #[must_use]
    pub fn has_completed(&self, lesson_id: &str) -> bool {
        self.completed_lessons.iter().any(|id| id.as_str() == lesson_id)
    }

    /// Adds the lesson to the completed set. Returns `false` if it was already there.
    pub fn mark_lesson_completed(&mut self, lesson_id: &LessonId) -> bool {
        if self.has_completed(lesson_id.as_str()) {
            return false;
        }
        self.completed_lessons.push(lesson_id.clone());
        true
    }

    /// Removes the lesson from the completed set. Returns `true` if it was present.
    pub fn unmark_lesson_completed(&mut self, lesson_id: &str) -> bool {
        let before = self.completed_lessons.len();
        self.completed_lessons.retain(|id| id.as_str() != lesson_id);
        before != self.completed_lessons.len()
    }

    pub fn add_time(&mut self, seconds: u64) {
        self.total_time_spent = self.total_time_spent.saturating_add(seconds);
    }

    /// Drops repeated entries from the completed set, keeping first occurrences.
    pub fn dedup_completed(&mut self) {
        let mut seen = HashSet::with_capacity(self.completed_lessons.len());
        self.completed_lessons.retain(|id| seen.insert(id.clone()));
    }
}

/// Progress of a single lesson, keyed externally by lesson id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LessonProgress {
    pub is_completed: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quiz_score: Option<f64>,
    pub last_accessed: DateTime<Utc>,
    /// Cumulative seconds spent in this lesson.
    #[serde(default)]
    pub time_spent: u64,
    #[serde(default)]
    pub completed_exercises: BTreeMap<ExerciseId, bool>,
}

impl LessonProgress {
    /// Default record for a lesson; every catalog exercise starts incomplete.
    ///
    /// An unknown lesson (`None`) gets an empty exercise mapping.
    #[must_use]
    pub fn fresh(lesson: Option<&Lesson>, now: DateTime<Utc>) -> Self {
        let completed_exercises = lesson
            .map(|lesson| {
                lesson
                    .exercises()
                    .iter()
                    .map(|ex| (ex.id().clone(), false))
                    .collect()
            })
            .unwrap_or_default();

        Self {
            is_completed: false,
            quiz_score: None,
            last_accessed: now,
            time_spent: 0,
            completed_exercises,
        }
    }

    #[must_use]
    pub fn is_exercise_completed(&self, exercise_id: &str) -> bool {
        self.completed_exercises
            .get(exercise_id)
            .copied()
            .unwrap_or(false)
    }

    /// Flags the exercise as done. Returns `false` if it already was.
    pub fn mark_exercise_completed(&mut self, exercise_id: &ExerciseId) -> bool {
        if self.is_exercise_completed(exercise_id.as_str()) {
            return false;
        }
        self.completed_exercises.insert(exercise_id.clone(), true);
        true
    }

    /// Count of the lesson's catalog exercises flagged as done.
    ///
    /// Ids in the mapping that the catalog no longer lists are ignored.
    #[must_use]
    pub fn completed_count(&self, lesson: &Lesson) -> usize {
        lesson
            .exercises()
            .iter()
            .filter(|ex| self.is_exercise_completed(ex.id().as_str()))
            .count()
    }

    /// True when every catalog exercise of the lesson is flagged as done.
    #[must_use]
    pub fn all_exercises_completed(&self, lesson: &Lesson) -> bool {
        lesson
            .exercises()
            .iter()
            .all(|ex| self.is_exercise_completed(ex.id().as_str()))
    }

    pub fn add_time(&mut self, seconds: u64) {
        self.time_spent = self.time_spent.saturating_add(seconds);
    }
}
