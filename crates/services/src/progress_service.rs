use std::sync::Arc;

use log::{debug, info, warn};
use serde::de::DeserializeOwned;
use serde_json::Value;

use storage::repository::{InMemoryStore, ProgressStore};
use tutor_core::LessonCatalog;
use tutor_core::model::{ExerciseId, Lesson, LessonProgress, UserProgress};

use crate::Clock;
use crate::error::{ProgressError, ValidationError};

/// Storage key of the global `UserProgress` record.
pub const PROGRESS_KEY: &str = "typescript-tutor-progress";

/// Prefix of per-lesson `LessonProgress` keys.
pub const LESSON_PROGRESS_KEY: &str = "typescript-tutor-lesson-progress";

/// Storage key of the progress record for `lesson_id`.
#[must_use]
pub fn lesson_progress_key(lesson_id: &str) -> String {
    format!("{LESSON_PROGRESS_KEY}-{lesson_id}")
}

/// Single authority for reading, mutating and persisting learner progress.
///
/// Every mutation is a read-modify-write against the store with no locking;
/// concurrent writers lose updates (last writer wins).
#[derive(Clone)]
pub struct ProgressManager {
    clock: Clock,
    catalog: Arc<LessonCatalog>,
    store: Arc<dyn ProgressStore>,
}

impl ProgressManager {
    #[must_use]
    pub fn new(clock: Clock, catalog: Arc<LessonCatalog>, store: Arc<dyn ProgressStore>) -> Self {
        Self {
            clock,
            catalog,
            store,
        }
    }

    #[must_use]
    pub fn in_memory(clock: Clock, catalog: Arc<LessonCatalog>) -> Self {
        Self::new(clock, catalog, Arc::new(InMemoryStore::new()))
    }

    #[must_use]
    pub fn catalog(&self) -> &LessonCatalog {
        &self.catalog
    }

    #[must_use]
    pub fn clock(&self) -> Clock {
        self.clock
    }

    // ─── READS ─────────────────────────────────────────────────────────────────

    /// Read the global record without creating it.
    ///
    /// # Errors
    ///
    /// Returns `ProgressError::CorruptData` if the stored value does not
    /// parse, or `ProgressError::Storage` if the store fails.
    pub async fn load_progress(&self) -> Result<Option<UserProgress>, ProgressError> {
        self.read_record(PROGRESS_KEY).await
    }

    /// Read the global record, creating and persisting a fresh one if absent.
    ///
    /// # Errors
    ///
    /// Returns `ProgressError::CorruptData` if the stored value does not
    /// parse, or `ProgressError::Storage` if the store fails.
    pub async fn get_progress(&self) -> Result<UserProgress, ProgressError> {
        if let Some(progress) = self.load_progress().await? {
            return Ok(progress);
        }
        let fresh = UserProgress::fresh(self.clock.now());
        debug!("initialising progress record");
        self.save_progress(&fresh).await?;
        Ok(fresh)
    }

    /// Read a lesson's record without creating it.
    ///
    /// # Errors
    ///
    /// Returns `ProgressError::CorruptData` if the stored value does not
    /// parse, or `ProgressError::Storage` if the store fails.
    pub async fn load_lesson_progress(
        &self,
        lesson_id: &str,
    ) -> Result<Option<LessonProgress>, ProgressError> {
        self.read_record(&lesson_progress_key(lesson_id)).await
    }

    /// Read a lesson's record, creating and persisting a fresh one if absent.
    ///
    /// A fresh record lists every catalog exercise of the lesson as
    /// incomplete; lessons missing from the catalog get an empty mapping.
    ///
    /// # Errors
    ///
    /// Returns `ProgressError::CorruptData` if the stored value does not
    /// parse, or `ProgressError::Storage` if the store fails.
    pub async fn get_lesson_progress(&self, lesson_id: &str) -> Result<LessonProgress, ProgressError> {
        if let Some(progress) = self.load_lesson_progress(lesson_id).await? {
            return Ok(progress);
        }
        let lesson = self.catalog.find_lesson_by_id(lesson_id);
        if lesson.is_none() {
            debug!("lesson {lesson_id} is not in the catalog; starting with no exercises");
        }
        let fresh = LessonProgress::fresh(lesson, self.clock.now());
        self.save_lesson_progress(lesson_id, &fresh).await?;
        Ok(fresh)
    }

    /// # Errors
    ///
    /// Returns `ProgressError` if the record cannot be read.
    pub async fn is_exercise_completed(
        &self,
        lesson_id: &str,
        exercise_id: &str,
    ) -> Result<bool, ProgressError> {
        let progress = self.get_lesson_progress(lesson_id).await?;
        Ok(progress.is_exercise_completed(exercise_id))
    }

    /// Whether every prerequisite of the lesson has been completed.
    ///
    /// Lessons missing from the catalog are never unlocked.
    ///
    /// # Errors
    ///
    /// Returns `ProgressError` if the global record cannot be read.
    pub async fn is_lesson_unlocked(&self, lesson_id: &str) -> Result<bool, ProgressError> {
        let Some(lesson) = self.catalog.find_lesson_by_id(lesson_id) else {
            return Ok(false);
        };
        let progress = self.get_progress().await?;
        Ok(prerequisites_met(lesson, &progress))
    }

    // ─── WRITES ───────────────────────────────────────────────────────────────

    /// Overwrite the global record.
    ///
    /// # Errors
    ///
    /// Returns `ProgressError` if serialization or the store write fails.
    pub async fn save_progress(&self, progress: &UserProgress) -> Result<(), ProgressError> {
        self.write_record(PROGRESS_KEY, progress).await
    }

    /// Overwrite a lesson's record.
    ///
    /// # Errors
    ///
    /// Returns `ProgressError` if serialization or the store write fails.
    pub async fn save_lesson_progress(
        &self,
        lesson_id: &str,
        progress: &LessonProgress,
    ) -> Result<(), ProgressError> {
        self.write_record(&lesson_progress_key(lesson_id), progress).await
    }

    /// Flag an exercise as completed.
    ///
    /// Idempotent: returns `false` and writes nothing when it already was.
    ///
    /// # Errors
    ///
    /// Returns `ProgressError` if the lesson record cannot be read or written.
    pub async fn mark_exercise_completed(
        &self,
        lesson_id: &str,
        exercise_id: &str,
    ) -> Result<bool, ProgressError> {
        let mut progress = self.get_lesson_progress(lesson_id).await?;
        if !progress.mark_exercise_completed(&ExerciseId::new(exercise_id)) {
            return Ok(false);
        }
        if self
            .catalog
            .find_lesson_by_id(lesson_id)
            .and_then(|lesson| lesson.exercise(exercise_id))
            .is_none()
        {
            debug!("exercise {exercise_id} is not listed for lesson {lesson_id}");
        }
        self.save_lesson_progress(lesson_id, &progress).await?;
        Ok(true)
    }

    /// Mark a lesson completed once all of its catalog exercises are done.
    ///
    /// Returns `false` without writing when the lesson is unknown or an
    /// exercise is still open. The global record is written before the
    /// lesson record; a failure in between leaves them disagreeing until
    /// [`ProgressManager::reconcile_lesson`] runs.
    ///
    /// # Errors
    ///
    /// Returns `ProgressError` if either record cannot be read or written.
    pub async fn complete_lesson(&self, lesson_id: &str) -> Result<bool, ProgressError> {
        let Some(lesson) = self.catalog.find_lesson_by_id(lesson_id) else {
            debug!("complete_lesson: unknown lesson {lesson_id}");
            return Ok(false);
        };

        let mut lesson_progress = self.get_lesson_progress(lesson_id).await?;
        if !lesson_progress.all_exercises_completed(lesson) {
            debug!("complete_lesson: {lesson_id} still has open exercises");
            return Ok(false);
        }

        let mut progress = self.get_progress().await?;
        if progress.mark_lesson_completed(lesson.id()) {
            self.save_progress(&progress).await?;
        }

        lesson_progress.is_completed = true;
        self.save_lesson_progress(lesson_id, &lesson_progress).await?;
        info!("lesson {lesson_id} completed");
        Ok(true)
    }

    /// Store a quiz score in both the global and the lesson record.
    ///
    /// Scores are expected to be percentages; values outside `[0, 100]` are
    /// stored as given and logged.
    ///
    /// # Errors
    ///
    /// Returns `ProgressError::InvalidScore` for NaN or infinite scores, or
    /// `ProgressError` if a record cannot be read or written.
    pub async fn save_quiz_score(&self, lesson_id: &str, score: f64) -> Result<(), ProgressError> {
        if !score.is_finite() {
            return Err(ProgressError::InvalidScore(score));
        }
        if !(0.0..=100.0).contains(&score) {
            warn!("quiz score {score} for {lesson_id} is outside 0..=100");
        }

        let mut progress = self.get_progress().await?;
        progress.quiz_scores.insert(lesson_id.into(), score);
        self.save_progress(&progress).await?;

        let mut lesson_progress = self.get_lesson_progress(lesson_id).await?;
        lesson_progress.quiz_score = Some(score);
        self.save_lesson_progress(lesson_id, &lesson_progress).await
    }

    /// Add `seconds` to the global total and to the lesson's total.
    ///
    /// # Errors
    ///
    /// Returns `ProgressError` if a record cannot be read or written.
    pub async fn update_time_spent(&self, lesson_id: &str, seconds: u64) -> Result<(), ProgressError> {
        let mut progress = self.get_progress().await?;
        progress.add_time(seconds);
        self.save_progress(&progress).await?;

        let mut lesson_progress = self.get_lesson_progress(lesson_id).await?;
        lesson_progress.add_time(seconds);
        self.save_lesson_progress(lesson_id, &lesson_progress).await
    }

    /// Note that the learner opened a lesson: updates the current and
    /// last-accessed lesson and the lesson's access time.
    ///
    /// Returns `false` without writing for lessons missing from the catalog.
    ///
    /// # Errors
    ///
    /// Returns `ProgressError` if a record cannot be read or written.
    pub async fn record_visit(&self, lesson_id: &str) -> Result<bool, ProgressError> {
        if self.catalog.find_lesson_by_id(lesson_id).is_none() {
            return Ok(false);
        }

        let mut progress = self.get_progress().await?;
        progress.current_lesson = lesson_id.to_owned();
        progress.last_accessed_lesson = lesson_id.to_owned();
        self.save_progress(&progress).await?;

        let mut lesson_progress = self.get_lesson_progress(lesson_id).await?;
        lesson_progress.last_accessed = self.clock.now();
        self.save_lesson_progress(lesson_id, &lesson_progress).await?;
        Ok(true)
    }

    /// Recompute a lesson's completion from its exercise mapping and repair
    /// the global completed set and the lesson flag to match.
    ///
    /// Lessons without exercises have nothing to derive from; they count as
    /// completed if either record says so. Returns whether anything changed.
    ///
    /// # Errors
    ///
    /// Returns `ProgressError` if a record cannot be read or written.
    pub async fn reconcile_lesson(&self, lesson_id: &str) -> Result<bool, ProgressError> {
        let Some(lesson) = self.catalog.find_lesson_by_id(lesson_id) else {
            return Ok(false);
        };

        let mut progress = self.get_progress().await?;
        let mut lesson_progress = self.get_lesson_progress(lesson_id).await?;

        let completed = if lesson.exercises().is_empty() {
            lesson_progress.is_completed || progress.has_completed(lesson_id)
        } else {
            lesson_progress.all_exercises_completed(lesson)
        };

        let mut changed = false;
        if progress.has_completed(lesson_id) != completed {
            if completed {
                progress.mark_lesson_completed(lesson.id());
            } else {
                progress.unmark_lesson_completed(lesson_id);
            }
            self.save_progress(&progress).await?;
            changed = true;
        }
        if lesson_progress.is_completed != completed {
            lesson_progress.is_completed = completed;
            self.save_lesson_progress(lesson_id, &lesson_progress).await?;
            changed = true;
        }

        if changed {
            info!("reconciled lesson {lesson_id}: completed = {completed}");
        }
        Ok(changed)
    }

    /// Reconcile every catalog lesson; returns how many were repaired.
    ///
    /// # Errors
    ///
    /// Returns the first `ProgressError` hit.
    pub async fn reconcile_all(&self) -> Result<usize, ProgressError> {
        let mut repaired = 0;
        for lesson in self.catalog.lessons() {
            if self.reconcile_lesson(lesson.id().as_str()).await? {
                repaired += 1;
            }
        }
        Ok(repaired)
    }

    // ─── IMPORT / EXPORT ───────────────────────────────────────────────────────

    /// Serialize the global record as JSON. Per-lesson records are not included.
    ///
    /// # Errors
    ///
    /// Returns `ProgressError` if the record cannot be read or serialized.
    pub async fn export_progress(&self) -> Result<String, ProgressError> {
        let progress = self.get_progress().await?;
        serde_json::to_string(&progress).map_err(ProgressError::Serialization)
    }

    /// Replace the global record with an exported one.
    ///
    /// Returns `Ok(false)` and leaves storage untouched when the payload is
    /// not valid progress JSON.
    ///
    /// # Errors
    ///
    /// Returns `ProgressError` only if the store rejects the write.
    pub async fn import_progress(&self, serialized: &str) -> Result<bool, ProgressError> {
        let progress = match parse_import(serialized) {
            Ok(progress) => progress,
            Err(err) => {
                warn!("rejected progress import: {err}");
                return Ok(false);
            }
        };
        self.save_progress(&progress).await?;
        info!(
            "imported progress with {} completed lessons",
            progress.completed_lessons.len()
        );
        Ok(true)
    }

    // ─── HELPERS ───────────────────────────────────────────────────────────────

    async fn read_record<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>, ProgressError> {
        let Some(raw) = self.store.read(key).await? else {
            return Ok(None);
        };
        serde_json::from_str(&raw)
            .map(Some)
            .map_err(|source| ProgressError::CorruptData {
                key: key.to_owned(),
                source,
            })
    }

    async fn write_record<T: serde::Serialize>(&self, key: &str, record: &T) -> Result<(), ProgressError> {
        let raw = serde_json::to_string(record).map_err(ProgressError::Serialization)?;
        self.store.write(key, &raw).await?;
        Ok(())
    }
}

/// Shape checks applied to an import payload before it is decoded.
///
/// # Errors
///
/// Returns the first failing check: `completedLessons` must be an array,
/// `quizScores` an object and `startDate` a non-empty string.
pub fn validate_progress(candidate: &Value) -> Result<(), ValidationError> {
    if !candidate.get("completedLessons").is_some_and(Value::is_array) {
        return Err(ValidationError::CompletedLessonsNotArray);
    }
    if !candidate.get("quizScores").is_some_and(Value::is_object) {
        return Err(ValidationError::QuizScoresNotObject);
    }
    if !candidate
        .get("startDate")
        .and_then(Value::as_str)
        .is_some_and(|date| !date.is_empty())
    {
        return Err(ValidationError::StartDateNotString);
    }
    Ok(())
}

fn parse_import(serialized: &str) -> Result<UserProgress, ValidationError> {
    let candidate: Value = serde_json::from_str(serialized)?;
    validate_progress(&candidate)?;
    let mut progress: UserProgress = serde_json::from_value(candidate)?;
    progress.dedup_completed();
    Ok(progress)
}

pub(crate) fn prerequisites_met(lesson: &Lesson, progress: &UserProgress) -> bool {
    lesson
        .prerequisites()
        .iter()
        .all(|req| progress.has_completed(req.as_str()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use storage::repository::StorageError;
    use tutor_core::time::{fixed_clock, fixed_now};

    const COURSE: &str = r#"[
        {
            "id": "L1", "title": "One", "difficulty": "beginner", "order": 1,
            "exercises": [
                {"id": "e1", "type": "quiz", "question": "?", "correctAnswer": "a", "explanation": ""},
                {"id": "e2", "type": "quiz", "question": "?", "correctAnswer": "b", "explanation": ""}
            ]
        },
        {
            "id": "L2", "title": "Two", "difficulty": "beginner", "order": 2,
            "prerequisites": ["L1"],
            "exercises": [
                {"id": "x1", "type": "coding", "question": "?", "correctAnswer": "c", "explanation": ""}
            ]
        },
        {"id": "L3", "title": "Empty", "difficulty": "bonus", "order": 1}
    ]"#;

    fn manager_with(store: InMemoryStore) -> ProgressManager {
        let catalog = Arc::new(LessonCatalog::from_json(COURSE).unwrap());
        ProgressManager::new(fixed_clock(), catalog, Arc::new(store))
    }

    fn manager() -> ProgressManager {
        manager_with(InMemoryStore::new())
    }

    #[test]
    fn lesson_keys_use_prefix_and_hyphen() {
        assert_eq!(
            lesson_progress_key("basic-types"),
            "typescript-tutor-lesson-progress-basic-types"
        );
    }

    #[tokio::test]
    async fn get_progress_initialises_and_persists() {
        let store = InMemoryStore::new();
        let mgr = manager_with(store.clone());
        assert!(mgr.load_progress().await.unwrap().is_none());

        let progress = mgr.get_progress().await.unwrap();
        assert_eq!(progress, UserProgress::fresh(fixed_now()));
        assert!(store.read(PROGRESS_KEY).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn start_date_is_not_overwritten_by_later_reads() {
        let store = InMemoryStore::new();
        let first = manager_with(store.clone()).get_progress().await.unwrap();

        let mut later_clock = fixed_clock();
        later_clock.advance(chrono::Duration::days(3));
        let catalog = Arc::new(LessonCatalog::from_json(COURSE).unwrap());
        let later = ProgressManager::new(later_clock, catalog, Arc::new(store));
        let second = later.get_progress().await.unwrap();
        assert_eq!(first.start_date, second.start_date);
    }

    #[tokio::test]
    async fn corrupt_global_record_propagates() {
        let store = InMemoryStore::new();
        store.write(PROGRESS_KEY, "{not json").await.unwrap();
        let err = manager_with(store).get_progress().await.unwrap_err();
        assert!(matches!(err, ProgressError::CorruptData { ref key, .. } if key == PROGRESS_KEY));
    }

    #[tokio::test]
    async fn corrupt_lesson_record_propagates() {
        let store = InMemoryStore::new();
        store
            .write(&lesson_progress_key("L1"), r#"{"isCompleted": "yes"}"#)
            .await
            .unwrap();
        let err = manager_with(store).get_lesson_progress("L1").await.unwrap_err();
        assert!(matches!(err, ProgressError::CorruptData { .. }));
    }

    #[tokio::test]
    async fn unknown_lesson_has_empty_mapping_and_cannot_complete() {
        let mgr = manager();
        let progress = mgr.get_lesson_progress("ghost").await.unwrap();
        assert!(progress.completed_exercises.is_empty());

        assert!(!mgr.complete_lesson("ghost").await.unwrap());
        assert!(mgr.get_progress().await.unwrap().completed_lessons.is_empty());
    }

    #[tokio::test]
    async fn mark_exercise_is_idempotent() {
        let mgr = manager();
        assert!(mgr.mark_exercise_completed("L1", "e1").await.unwrap());
        let once = mgr.get_lesson_progress("L1").await.unwrap();
        assert!(!mgr.mark_exercise_completed("L1", "e1").await.unwrap());
        let twice = mgr.get_lesson_progress("L1").await.unwrap();
        assert_eq!(once.completed_exercises, twice.completed_exercises);
        assert!(mgr.is_exercise_completed("L1", "e1").await.unwrap());
        assert!(!mgr.is_exercise_completed("L1", "e2").await.unwrap());
    }

    #[tokio::test]
    async fn lesson_without_exercises_completes_immediately() {
        let mgr = manager();
        assert!(mgr.complete_lesson("L3").await.unwrap());
        assert!(mgr.get_progress().await.unwrap().has_completed("L3"));
    }

    #[tokio::test]
    async fn complete_lesson_does_not_duplicate_ids() {
        let mgr = manager();
        mgr.mark_exercise_completed("L2", "x1").await.unwrap();
        assert!(mgr.complete_lesson("L2").await.unwrap());
        assert!(mgr.complete_lesson("L2").await.unwrap());
        let progress = mgr.get_progress().await.unwrap();
        assert_eq!(progress.completed_lessons.len(), 1);
    }

    #[tokio::test]
    async fn quiz_score_lands_in_both_records() {
        let mgr = manager();
        mgr.save_quiz_score("L1", 80.0).await.unwrap();
        assert_eq!(mgr.get_progress().await.unwrap().quiz_scores["L1"], 80.0);
        assert_eq!(
            mgr.get_lesson_progress("L1").await.unwrap().quiz_score,
            Some(80.0)
        );
    }

    #[tokio::test]
    async fn out_of_range_scores_are_kept_but_nan_is_rejected() {
        let mgr = manager();
        mgr.save_quiz_score("L1", 150.0).await.unwrap();
        assert_eq!(mgr.get_progress().await.unwrap().quiz_scores["L1"], 150.0);

        let err = mgr.save_quiz_score("L1", f64::NAN).await.unwrap_err();
        assert!(matches!(err, ProgressError::InvalidScore(_)));
    }

    #[tokio::test]
    async fn unlocking_follows_prerequisites() {
        let mgr = manager();
        assert!(mgr.is_lesson_unlocked("L1").await.unwrap());
        assert!(!mgr.is_lesson_unlocked("L2").await.unwrap());
        assert!(!mgr.is_lesson_unlocked("ghost").await.unwrap());

        mgr.mark_exercise_completed("L1", "e1").await.unwrap();
        mgr.mark_exercise_completed("L1", "e2").await.unwrap();
        mgr.complete_lesson("L1").await.unwrap();
        assert!(mgr.is_lesson_unlocked("L2").await.unwrap());
    }

    #[tokio::test]
    async fn record_visit_updates_current_and_last_lesson() {
        let mgr = manager();
        assert!(mgr.record_visit("L2").await.unwrap());
        let progress = mgr.get_progress().await.unwrap();
        assert_eq!(progress.current_lesson, "L2");
        assert_eq!(progress.last_accessed_lesson, "L2");

        assert!(!mgr.record_visit("ghost").await.unwrap());
        assert_eq!(mgr.get_progress().await.unwrap().current_lesson, "L2");
    }

    #[tokio::test]
    async fn reconcile_repairs_half_written_completion() {
        let mgr = manager();
        mgr.mark_exercise_completed("L2", "x1").await.unwrap();
        // Global write landed, lesson write did not.
        let mut progress = mgr.get_progress().await.unwrap();
        progress.mark_lesson_completed(&"L2".into());
        mgr.save_progress(&progress).await.unwrap();
        assert!(!mgr.get_lesson_progress("L2").await.unwrap().is_completed);

        assert!(mgr.reconcile_lesson("L2").await.unwrap());
        assert!(mgr.get_lesson_progress("L2").await.unwrap().is_completed);
        assert!(!mgr.reconcile_lesson("L2").await.unwrap());
    }

    #[tokio::test]
    async fn reconcile_drops_unearned_completion() {
        let mgr = manager();
        let mut progress = mgr.get_progress().await.unwrap();
        progress.mark_lesson_completed(&"L1".into());
        mgr.save_progress(&progress).await.unwrap();

        assert_eq!(mgr.reconcile_all().await.unwrap(), 1);
        assert!(!mgr.get_progress().await.unwrap().has_completed("L1"));
    }

    #[test]
    fn validation_reports_first_failing_field() {
        let ok = json!({"completedLessons": [], "quizScores": {}, "startDate": "2024-01-01T00:00:00Z"});
        assert!(validate_progress(&ok).is_ok());

        let missing = json!({"quizScores": {}, "startDate": "2024-01-01T00:00:00Z"});
        assert!(matches!(
            validate_progress(&missing),
            Err(ValidationError::CompletedLessonsNotArray)
        ));

        let scores = json!({"completedLessons": [], "quizScores": 3, "startDate": "x"});
        assert!(matches!(
            validate_progress(&scores),
            Err(ValidationError::QuizScoresNotObject)
        ));

        let date = json!({"completedLessons": [], "quizScores": {}, "startDate": 17});
        assert!(matches!(
            validate_progress(&date),
            Err(ValidationError::StartDateNotString)
        ));

        assert!(validate_progress(&Value::Null).is_err());
    }

    #[test]
    fn import_accepts_javascript_timestamps_and_defaults() {
        let progress = parse_import(
            r#"{"completedLessons": ["a", "a"], "quizScores": {"a": 90}, "startDate": "2024-05-01T10:00:00.000Z"}"#,
        )
        .unwrap();
        assert_eq!(progress.completed_lessons.len(), 1);
        assert_eq!(progress.total_time_spent, 0);
        assert_eq!(progress.current_lesson, "");
    }

    #[test]
    fn import_rejects_negative_time() {
        let err = parse_import(
            r#"{"completedLessons": [], "quizScores": {}, "startDate": "2024-05-01T10:00:00Z", "totalTimeSpent": -5}"#,
        )
        .unwrap_err();
        assert!(matches!(err, ValidationError::Malformed(_)));
    }

    #[tokio::test]
    async fn import_write_failure_propagates() {
        let store = InMemoryStore::with_quota(16);
        let mgr = manager_with(store);
        let payload = r#"{"completedLessons": ["L1"], "quizScores": {}, "startDate": "2024-05-01T10:00:00Z"}"#;
        let err = mgr.import_progress(payload).await.unwrap_err();
        assert!(matches!(
            err,
            ProgressError::Storage(StorageError::QuotaExceeded { .. })
        ));
    }
}
