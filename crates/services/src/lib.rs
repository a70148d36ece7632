#![forbid(unsafe_code)]

pub mod app_services;
pub mod error;
pub mod lesson_view;
pub mod progress_service;
pub mod summary;

pub use tutor_core::Clock;

pub use app_services::AppServices;
pub use error::{AppServicesError, ProgressError, ValidationError};
pub use lesson_view::{LessonProgressSnapshot, LessonProgressView};
pub use progress_service::{
    LESSON_PROGRESS_KEY, PROGRESS_KEY, ProgressManager, lesson_progress_key, validate_progress,
};
pub use summary::{DashboardSummary, RoadmapLesson, RoadmapSection};
