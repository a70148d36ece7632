use chrono::{DateTime, Utc};

use tutor_core::model::{Difficulty, LessonId};
use tutor_core::time::format_duration;

use crate::error::ProgressError;
use crate::progress_service::{ProgressManager, prerequisites_met};

/// Presentation-agnostic overview of the global record.
///
/// No pre-formatted strings besides `formatted_time`; the front end decides
/// how to render dates.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DashboardSummary {
    pub completed_lessons: usize,
    pub total_lessons: usize,
    pub total_time_spent: u64,
    pub start_date: DateTime<Utc>,
    pub current_lesson: Option<String>,
    pub last_accessed_lesson: Option<String>,
}

impl DashboardSummary {
    /// Total time as `"{h}h {m}m"`.
    #[must_use]
    pub fn formatted_time(&self) -> String {
        format_duration(self.total_time_spent)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoadmapLesson {
    pub id: LessonId,
    pub title: String,
    pub estimated_minutes: u32,
    pub is_completed: bool,
    pub is_unlocked: bool,
}

/// One difficulty band of the roadmap with its completion ratio.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoadmapSection {
    pub difficulty: Difficulty,
    pub label: &'static str,
    pub lessons: Vec<RoadmapLesson>,
    pub completed: usize,
    pub total: usize,
}

impl RoadmapSection {
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn percent(&self) -> f64 {
        if self.total == 0 {
            return 0.0;
        }
        self.completed as f64 / self.total as f64 * 100.0
    }
}

impl ProgressManager {
    /// Summarise the global record for a dashboard.
    ///
    /// # Errors
    ///
    /// Returns `ProgressError` if the global record cannot be read.
    pub async fn dashboard(&self) -> Result<DashboardSummary, ProgressError> {
        let progress = self.get_progress().await?;
        let non_empty = |s: String| (!s.is_empty()).then_some(s);
        Ok(DashboardSummary {
            completed_lessons: progress.completed_lessons.len(),
            total_lessons: self.catalog().len(),
            total_time_spent: progress.total_time_spent,
            start_date: progress.start_date,
            current_lesson: non_empty(progress.current_lesson),
            last_accessed_lesson: non_empty(progress.last_accessed_lesson),
        })
    }

    /// Catalog sections in roadmap order with per-lesson completion and
    /// unlock state.
    ///
    /// # Errors
    ///
    /// Returns `ProgressError` if the global record cannot be read.
    pub async fn roadmap(&self) -> Result<Vec<RoadmapSection>, ProgressError> {
        let progress = self.get_progress().await?;
        let sections = self
            .catalog()
            .sections()
            .into_iter()
            .map(|section| {
                let lessons: Vec<RoadmapLesson> = section
                    .lessons
                    .iter()
                    .map(|lesson| RoadmapLesson {
                        id: lesson.id().clone(),
                        title: lesson.title().to_owned(),
                        estimated_minutes: lesson.estimated_minutes(),
                        is_completed: progress.has_completed(lesson.id().as_str()),
                        is_unlocked: prerequisites_met(lesson, &progress),
                    })
                    .collect();
                RoadmapSection {
                    difficulty: section.difficulty,
                    label: section.label(),
                    completed: lessons.iter().filter(|l| l.is_completed).count(),
                    total: lessons.len(),
                    lessons,
                }
            })
            .collect();
        Ok(sections)
    }
}
