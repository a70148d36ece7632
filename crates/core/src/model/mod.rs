mod ids;
mod lesson;
mod progress;

pub use ids::{ExerciseId, LessonId, ParseIdError};
pub use lesson::{Difficulty, Exercise, ExerciseKind, Lesson, LessonDraft, LessonError};
pub use progress::{LessonProgress, UserProgress};
