use std::time::{Duration, Instant};

use log::warn;

use tutor_core::model::{ExerciseId, Lesson, LessonId, LessonProgress};

use crate::error::ProgressError;
use crate::progress_service::ProgressManager;

/// Derived values of a lesson view at one point in time, useful for UI.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LessonProgressSnapshot {
    pub total_exercises: usize,
    pub completed_count: usize,
    pub quiz_score: u32,
    pub all_exercises_completed: bool,
    pub is_completed: bool,
    pub time_spent: u64,
}

/// Binds one lesson's progress to a front end.
///
/// Holds a local copy of the lesson record that reflects this view's own
/// mutations immediately, and times the session from `open` until `finish`
/// (or drop), reporting the elapsed seconds exactly once.
pub struct LessonProgressView {
    manager: ProgressManager,
    lesson_id: LessonId,
    lesson: Option<Lesson>,
    progress: LessonProgress,
    started: Instant,
    reported: bool,
}

impl LessonProgressView {
    /// Load the lesson's record, note the visit and start the session timer.
    ///
    /// # Errors
    ///
    /// Returns `ProgressError` if the records cannot be read or written,
    /// including `CorruptData` for unparsable stored records.
    pub async fn open(
        manager: ProgressManager,
        lesson_id: impl Into<LessonId>,
    ) -> Result<Self, ProgressError> {
        let lesson_id = lesson_id.into();
        manager.record_visit(lesson_id.as_str()).await?;
        let progress = manager.get_lesson_progress(lesson_id.as_str()).await?;
        let lesson = manager
            .catalog()
            .find_lesson_by_id(lesson_id.as_str())
            .cloned();

        Ok(Self {
            manager,
            lesson_id,
            lesson,
            progress,
            started: Instant::now(),
            reported: false,
        })
    }

    #[must_use]
    pub fn lesson_id(&self) -> &LessonId {
        &self.lesson_id
    }

    /// Catalog entry, or `None` for ids the catalog does not know.
    #[must_use]
    pub fn lesson(&self) -> Option<&Lesson> {
        self.lesson.as_ref()
    }

    #[must_use]
    pub fn progress(&self) -> &LessonProgress {
        &self.progress
    }

    #[must_use]
    pub fn total_exercises(&self) -> usize {
        self.lesson.as_ref().map_or(0, |l| l.exercises().len())
    }

    /// Completed exercises that the catalog still lists for this lesson.
    #[must_use]
    pub fn completed_count(&self) -> usize {
        self.lesson
            .as_ref()
            .map_or(0, |l| self.progress.completed_count(l))
    }

    /// Share of completed exercises as a rounded percentage; 0 with no exercises.
    #[must_use]
    #[allow(clippy::cast_precision_loss, clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    pub fn quiz_score(&self) -> u32 {
        let total = self.total_exercises();
        if total == 0 {
            return 0;
        }
        ((self.completed_count() as f64 / total as f64) * 100.0).round() as u32
    }

    #[must_use]
    pub fn all_exercises_completed(&self) -> bool {
        let total = self.total_exercises();
        total > 0 && self.completed_count() == total
    }

    #[must_use]
    pub fn is_completed(&self) -> bool {
        self.progress.is_completed
    }

    /// Seconds recorded for the lesson before this session.
    #[must_use]
    pub fn time_spent(&self) -> u64 {
        self.progress.time_spent
    }

    #[must_use]
    pub fn is_exercise_completed(&self, exercise_id: &str) -> bool {
        self.progress.is_exercise_completed(exercise_id)
    }

    #[must_use]
    pub fn snapshot(&self) -> LessonProgressSnapshot {
        LessonProgressSnapshot {
            total_exercises: self.total_exercises(),
            completed_count: self.completed_count(),
            quiz_score: self.quiz_score(),
            all_exercises_completed: self.all_exercises_completed(),
            is_completed: self.is_completed(),
            time_spent: self.time_spent(),
        }
    }

    /// Complete the lesson if every exercise is done; otherwise does nothing.
    ///
    /// # Errors
    ///
    /// Returns `ProgressError` if the manager fails to persist the completion.
    pub async fn complete_lesson(&mut self) -> Result<bool, ProgressError> {
        if !self.all_exercises_completed() {
            return Ok(false);
        }
        let done = self
            .manager
            .complete_lesson(self.lesson_id.as_str())
            .await?;
        if done {
            self.progress.is_completed = true;
        }
        Ok(done)
    }

    /// Persist an exercise completion and reflect it locally.
    ///
    /// # Errors
    ///
    /// Returns `ProgressError` if the manager fails; the local copy is then
    /// left unchanged.
    pub async fn mark_exercise_completed(&mut self, exercise_id: &str) -> Result<(), ProgressError> {
        self.manager
            .mark_exercise_completed(self.lesson_id.as_str(), exercise_id)
            .await?;
        self.progress
            .mark_exercise_completed(&ExerciseId::new(exercise_id));
        Ok(())
    }

    /// Time since the view was opened.
    #[must_use]
    pub fn session_elapsed(&self) -> Duration {
        self.started.elapsed()
    }

    /// End the session and add its whole seconds to the lesson's time.
    ///
    /// Returns the seconds reported. The report is attempted once; a failed
    /// write is not retried.
    ///
    /// # Errors
    ///
    /// Returns `ProgressError` if the time update fails.
    pub async fn finish(mut self) -> Result<u64, ProgressError> {
        self.reported = true;
        let seconds = self.session_elapsed().as_secs();
        self.manager
            .update_time_spent(self.lesson_id.as_str(), seconds)
            .await?;
        Ok(seconds)
    }
}

impl Drop for LessonProgressView {
    fn drop(&mut self) {
        if self.reported {
            return;
        }
        self.reported = true;
        let seconds = self.session_elapsed().as_secs();

        let Ok(handle) = tokio::runtime::Handle::try_current() else {
            warn!(
                "no async runtime; {seconds}s in lesson {} were not recorded",
                self.lesson_id
            );
            return;
        };

        let manager = self.manager.clone();
        let lesson_id = self.lesson_id.clone();
        handle.spawn(async move {
            if let Err(err) = manager.update_time_spent(lesson_id.as_str(), seconds).await {
                warn!("failed to record session time for {lesson_id}: {err}");
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::sync::Arc;

    use tutor_core::LessonCatalog;
    use tutor_core::time::fixed_clock;

    const COURSE: &str = r#"[
        {
            "id": "L1", "title": "One", "difficulty": "beginner", "order": 1,
            "exercises": [
                {"id": "e1", "type": "quiz", "question": "?", "correctAnswer": "a", "explanation": ""},
                {"id": "e2", "type": "quiz", "question": "?", "correctAnswer": "b", "explanation": ""},
                {"id": "e3", "type": "quiz", "question": "?", "correctAnswer": "c", "explanation": ""}
            ]
        },
        {"id": "L0", "title": "Reading only", "difficulty": "bonus", "order": 1}
    ]"#;

    fn manager() -> ProgressManager {
        let catalog = Arc::new(LessonCatalog::from_json(COURSE).unwrap());
        ProgressManager::in_memory(fixed_clock(), catalog)
    }

    #[tokio::test]
    async fn derived_values_track_local_marks() {
        let mut view = LessonProgressView::open(manager(), "L1").await.unwrap();
        assert_eq!(view.total_exercises(), 3);
        assert_eq!(view.quiz_score(), 0);

        view.mark_exercise_completed("e1").await.unwrap();
        assert!(view.is_exercise_completed("e1"));
        assert_eq!(view.completed_count(), 1);
        assert_eq!(view.quiz_score(), 33);

        view.mark_exercise_completed("e2").await.unwrap();
        assert_eq!(view.quiz_score(), 67);
        assert!(!view.all_exercises_completed());
        view.finish().await.unwrap();
    }

    #[tokio::test]
    async fn stale_exercise_ids_are_not_counted() {
        let mut view = LessonProgressView::open(manager(), "L1").await.unwrap();
        view.mark_exercise_completed("retired").await.unwrap();
        assert!(view.is_exercise_completed("retired"));
        assert_eq!(view.completed_count(), 0);
        view.finish().await.unwrap();
    }

    #[tokio::test]
    async fn complete_lesson_waits_for_all_exercises() {
        let mgr = manager();
        let mut view = LessonProgressView::open(mgr.clone(), "L1").await.unwrap();
        assert!(!view.complete_lesson().await.unwrap());

        for id in ["e1", "e2", "e3"] {
            view.mark_exercise_completed(id).await.unwrap();
        }
        assert!(view.all_exercises_completed());
        assert!(view.complete_lesson().await.unwrap());
        assert!(view.is_completed());
        assert!(mgr.get_progress().await.unwrap().has_completed("L1"));
        view.finish().await.unwrap();
    }

    #[tokio::test]
    async fn lesson_without_exercises_is_never_completed_by_view() {
        let mgr = manager();
        let mut view = LessonProgressView::open(mgr.clone(), "L0").await.unwrap();
        assert_eq!(view.quiz_score(), 0);
        assert!(!view.all_exercises_completed());
        assert!(!view.complete_lesson().await.unwrap());
        assert!(mgr.get_progress().await.unwrap().completed_lessons.is_empty());
        view.finish().await.unwrap();
    }

    #[tokio::test]
    async fn unknown_lesson_view_is_empty() {
        let view = LessonProgressView::open(manager(), "ghost").await.unwrap();
        assert!(view.lesson().is_none());
        assert_eq!(
            view.snapshot(),
            LessonProgressSnapshot {
                total_exercises: 0,
                completed_count: 0,
                quiz_score: 0,
                all_exercises_completed: false,
                is_completed: false,
                time_spent: 0,
            }
        );
        view.finish().await.unwrap();
    }

    #[tokio::test]
    async fn opening_records_the_visit() {
        let mgr = manager();
        let view = LessonProgressView::open(mgr.clone(), "L1").await.unwrap();
        assert_eq!(mgr.get_progress().await.unwrap().current_lesson, "L1");
        view.finish().await.unwrap();
    }

    #[tokio::test]
    async fn finish_reports_elapsed_seconds_to_both_totals() {
        let mgr = manager();
        mgr.update_time_spent("L1", 40).await.unwrap();

        let view = LessonProgressView::open(mgr.clone(), "L1").await.unwrap();
        assert_eq!(view.time_spent(), 40);
        let reported = view.finish().await.unwrap();

        assert_eq!(mgr.get_progress().await.unwrap().total_time_spent, 40 + reported);
        assert_eq!(
            mgr.get_lesson_progress("L1").await.unwrap().time_spent,
            40 + reported
        );
    }
}
