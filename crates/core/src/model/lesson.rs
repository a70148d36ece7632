use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::model::ids::{ExerciseId, LessonId};

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum LessonError {
    #[error("lesson id cannot be empty")]
    EmptyId,

    #[error("lesson {lesson} has an empty title")]
    EmptyTitle { lesson: String },

    #[error("lesson {lesson} has an exercise with an empty id")]
    EmptyExerciseId { lesson: String },

    #[error("lesson {lesson} declares exercise {exercise} more than once")]
    DuplicateExercise { lesson: String, exercise: String },

    #[error("exercise {exercise} in lesson {lesson} needs at least one option")]
    MissingOptions { lesson: String, exercise: String },

    #[error("correct answer of exercise {exercise} in lesson {lesson} is not one of its options")]
    AnswerNotAnOption { lesson: String, exercise: String },

    #[error("lesson {lesson} lists itself as a prerequisite")]
    SelfPrerequisite { lesson: String },
}

//
// ─── ENUMS ─────────────────────────────────────────────────────────────────────
//

/// Difficulty band; also the roadmap section a lesson is listed under.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    Beginner,
    Intermediate,
    Advanced,
    Bonus,
}

impl Difficulty {
    /// Roadmap order of the sections.
    pub const ALL: [Difficulty; 4] = [
        Difficulty::Beginner,
        Difficulty::Intermediate,
        Difficulty::Advanced,
        Difficulty::Bonus,
    ];

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Difficulty::Beginner => "beginner",
            Difficulty::Intermediate => "intermediate",
            Difficulty::Advanced => "advanced",
            Difficulty::Bonus => "bonus",
        }
    }

    /// Heading shown for the roadmap section of this difficulty.
    #[must_use]
    pub fn section_label(self) -> &'static str {
        match self {
            Difficulty::Beginner => "TypeScript Fundamentals",
            Difficulty::Intermediate => "Intermediate TypeScript",
            Difficulty::Advanced => "Advanced TypeScript",
            Difficulty::Bonus => "Bonus Modules",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ExerciseKind {
    MultipleChoice,
    Coding,
    Quiz,
}

//
// ─── EXERCISE ──────────────────────────────────────────────────────────────────
//

/// A single gradable question inside a lesson.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Exercise {
    id: ExerciseId,
    #[serde(rename = "type")]
    kind: ExerciseKind,
    question: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    options: Option<Vec<String>>,
    correct_answer: String,
    explanation: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    placeholder: Option<String>,
}

impl Exercise {
    #[must_use]
    pub fn new(
        id: impl Into<String>,
        kind: ExerciseKind,
        question: impl Into<String>,
        correct_answer: impl Into<String>,
        explanation: impl Into<String>,
    ) -> Self {
        Self {
            id: ExerciseId::new(id),
            kind,
            question: question.into(),
            options: None,
            correct_answer: correct_answer.into(),
            explanation: explanation.into(),
            placeholder: None,
        }
    }

    #[must_use]
    pub fn with_options<I, S>(mut self, options: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.options = Some(options.into_iter().map(Into::into).collect());
        self
    }

    #[must_use]
    pub fn with_placeholder(mut self, placeholder: impl Into<String>) -> Self {
        self.placeholder = Some(placeholder.into());
        self
    }

    #[must_use]
    pub fn id(&self) -> &ExerciseId {
        &self.id
    }

    #[must_use]
    pub fn kind(&self) -> ExerciseKind {
        self.kind
    }

    #[must_use]
    pub fn question(&self) -> &str {
        &self.question
    }

    #[must_use]
    pub fn options(&self) -> Option<&[String]> {
        self.options.as_deref()
    }

    #[must_use]
    pub fn correct_answer(&self) -> &str {
        &self.correct_answer
    }

    #[must_use]
    pub fn explanation(&self) -> &str {
        &self.explanation
    }

    #[must_use]
    pub fn placeholder(&self) -> Option<&str> {
        self.placeholder.as_deref()
    }

    fn validate(&self, lesson: &LessonId) -> Result<(), LessonError> {
        if self.id.as_str().trim().is_empty() {
            return Err(LessonError::EmptyExerciseId {
                lesson: lesson.to_string(),
            });
        }
        if self.kind == ExerciseKind::MultipleChoice {
            let options = match self.options.as_deref() {
                Some(options) if !options.is_empty() => options,
                _ => {
                    return Err(LessonError::MissingOptions {
                        lesson: lesson.to_string(),
                        exercise: self.id.to_string(),
                    });
                }
            };
            if !options.iter().any(|opt| opt == &self.correct_answer) {
                return Err(LessonError::AnswerNotAnOption {
                    lesson: lesson.to_string(),
                    exercise: self.id.to_string(),
                });
            }
        }
        Ok(())
    }
}

//
// ─── LESSON ────────────────────────────────────────────────────────────────────
//

/// Unvalidated lesson as it appears in a catalog file.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LessonDraft {
    pub id: LessonId,
    pub title: String,
    #[serde(default)]
    pub content: String,
    pub difficulty: Difficulty,
    #[serde(default)]
    pub prerequisites: Vec<LessonId>,
    #[serde(default)]
    pub exercises: Vec<Exercise>,
    /// Estimated duration in minutes.
    #[serde(default)]
    pub estimated_time: u32,
    pub order: i32,
}

impl LessonDraft {
    /// Validate the draft into an immutable `Lesson`.
    ///
    /// # Errors
    ///
    /// Returns `LessonError` for blank ids or titles, duplicate exercise ids,
    /// malformed multiple-choice exercises, or a self-referencing prerequisite.
    pub fn validate(self) -> Result<Lesson, LessonError> {
        if self.id.as_str().trim().is_empty() {
            return Err(LessonError::EmptyId);
        }
        if self.title.trim().is_empty() {
            return Err(LessonError::EmptyTitle {
                lesson: self.id.to_string(),
            });
        }
        if self.prerequisites.contains(&self.id) {
            return Err(LessonError::SelfPrerequisite {
                lesson: self.id.to_string(),
            });
        }

        let mut seen = HashSet::with_capacity(self.exercises.len());
        for exercise in &self.exercises {
            exercise.validate(&self.id)?;
            if !seen.insert(exercise.id()) {
                return Err(LessonError::DuplicateExercise {
                    lesson: self.id.to_string(),
                    exercise: exercise.id().to_string(),
                });
            }
        }

        Ok(Lesson {
            id: self.id,
            title: self.title,
            content: self.content,
            difficulty: self.difficulty,
            prerequisites: self.prerequisites,
            exercises: self.exercises,
            estimated_minutes: self.estimated_time,
            order: self.order,
        })
    }
}

/// A catalog entry: instructional content plus its exercises.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Lesson {
    id: LessonId,
    title: String,
    content: String,
    difficulty: Difficulty,
    prerequisites: Vec<LessonId>,
    exercises: Vec<Exercise>,
    estimated_minutes: u32,
    order: i32,
}

impl Lesson {
    #[must_use]
    pub fn id(&self) -> &LessonId {
        &self.id
    }

    #[must_use]
    pub fn title(&self) -> &str {
        &self.title
    }

    /// Markdown body; rendering is left to the front end.
    #[must_use]
    pub fn content(&self) -> &str {
        &self.content
    }

    #[must_use]
    pub fn difficulty(&self) -> Difficulty {
        self.difficulty
    }

    #[must_use]
    pub fn prerequisites(&self) -> &[LessonId] {
        &self.prerequisites
    }

    #[must_use]
    pub fn exercises(&self) -> &[Exercise] {
        &self.exercises
    }

    #[must_use]
    pub fn exercise(&self, id: &str) -> Option<&Exercise> {
        self.exercises.iter().find(|ex| ex.id().as_str() == id)
    }

    #[must_use]
    pub fn estimated_minutes(&self) -> u32 {
        self.estimated_minutes
    }

    #[must_use]
    pub fn order(&self) -> i32 {
        self.order
    }
}
