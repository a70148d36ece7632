//! Read-only lesson catalog.

use std::collections::HashMap;

use thiserror::Error;

use crate::model::{Difficulty, Exercise, ExerciseKind, Lesson, LessonDraft, LessonError, LessonId};

const BUILTIN_COURSE: &str = include_str!("../data/typescript_course.json");

#[derive(Debug, Error)]
#[non_exhaustive]
pub enum CatalogError {
    #[error("catalog is not valid lesson JSON: {0}")]
    Parse(#[from] serde_json::Error),

    #[error(transparent)]
    Lesson(#[from] LessonError),

    #[error("lesson {lesson} appears more than once")]
    DuplicateLesson { lesson: String },

    #[error("lesson {lesson} requires unknown lesson {prerequisite}")]
    UnknownPrerequisite { lesson: String, prerequisite: String },
}

/// Ordered collection of lessons with lookup by id.
#[derive(Debug, Clone, Default)]
pub struct LessonCatalog {
    lessons: Vec<Lesson>,
    index: HashMap<LessonId, usize>,
}

/// Lessons of one difficulty band, sorted by their `order`.
#[derive(Debug, Clone)]
pub struct CatalogSection<'a> {
    pub difficulty: Difficulty,
    pub lessons: Vec<&'a Lesson>,
}

impl CatalogSection<'_> {
    #[must_use]
    pub fn label(&self) -> &'static str {
        self.difficulty.section_label()
    }
}

impl LessonCatalog {
    /// Build a catalog from validated lessons, keeping their order.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError` on duplicate lesson ids or prerequisites that
    /// name lessons missing from the catalog.
    pub fn new(lessons: Vec<Lesson>) -> Result<Self, CatalogError> {
        let mut index = HashMap::with_capacity(lessons.len());
        for (pos, lesson) in lessons.iter().enumerate() {
            if index.insert(lesson.id().clone(), pos).is_some() {
                return Err(CatalogError::DuplicateLesson {
                    lesson: lesson.id().to_string(),
                });
            }
        }

        for lesson in &lessons {
            if let Some(missing) = lesson
                .prerequisites()
                .iter()
                .find(|req| !index.contains_key(*req))
            {
                return Err(CatalogError::UnknownPrerequisite {
                    lesson: lesson.id().to_string(),
                    prerequisite: missing.to_string(),
                });
            }
        }

        Ok(Self { lessons, index })
    }

    /// Validate drafts and build a catalog from them.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::Lesson` for the first invalid draft, or any
    /// error of [`LessonCatalog::new`].
    pub fn from_drafts(drafts: Vec<LessonDraft>) -> Result<Self, CatalogError> {
        let lessons = drafts
            .into_iter()
            .map(LessonDraft::validate)
            .collect::<Result<Vec<_>, _>>()?;
        Self::new(lessons)
    }

    /// Parse a JSON array of lessons.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::Parse` if the text is not a lesson array, or a
    /// validation error otherwise.
    pub fn from_json(json: &str) -> Result<Self, CatalogError> {
        let drafts: Vec<LessonDraft> = serde_json::from_str(json)?;
        Self::from_drafts(drafts)
    }

    /// The TypeScript course bundled with the crate.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError` if the bundled data fails validation.
    pub fn builtin() -> Result<Self, CatalogError> {
        Self::from_json(BUILTIN_COURSE)
    }

    #[must_use]
    pub fn find_lesson_by_id(&self, id: &str) -> Option<&Lesson> {
        self.index.get(id).map(|pos| &self.lessons[*pos])
    }

    /// Exercises of a lesson in catalog order; empty for unknown ids.
    #[must_use]
    pub fn exercises_for(&self, id: &str) -> &[Exercise] {
        self.find_lesson_by_id(id)
            .map(Lesson::exercises)
            .unwrap_or_default()
    }

    #[must_use]
    pub fn lessons(&self) -> &[Lesson] {
        &self.lessons
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.lessons.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lessons.is_empty()
    }

    /// Non-empty difficulty sections in roadmap order.
    #[must_use]
    pub fn sections(&self) -> Vec<CatalogSection<'_>> {
        Difficulty::ALL
            .into_iter()
            .filter_map(|difficulty| {
                let mut lessons: Vec<&Lesson> = self
                    .lessons
                    .iter()
                    .filter(|lesson| lesson.difficulty() == difficulty)
                    .collect();
                if lessons.is_empty() {
                    return None;
                }
                lessons.sort_by_key(|lesson| lesson.order());
                Some(CatalogSection {
                    difficulty,
                    lessons,
                })
            })
            .collect()
    }

    #[must_use]
    pub fn exercise_count(&self) -> usize {
        self.lessons.iter().map(|l| l.exercises().len()).sum()
    }

    #[must_use]
    pub fn count_exercises_of_kind(&self, kind: ExerciseKind) -> usize {
        self.lessons
            .iter()
            .flat_map(Lesson::exercises)
            .filter(|ex| ex.kind() == kind)
            .count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TWO_LESSONS: &str = r#"[
        {
            "id": "b", "title": "Second", "difficulty": "beginner", "order": 2,
            "prerequisites": ["a"],
            "exercises": [
                {"id": "b1", "type": "quiz", "question": "?", "correctAnswer": "x", "explanation": ""}
            ]
        },
        {
            "id": "a", "title": "First", "difficulty": "beginner", "order": 1,
            "exercises": []
        }
    ]"#;

    #[test]
    fn builtin_course_is_valid() {
        let catalog = LessonCatalog::builtin().unwrap();
        assert_eq!(catalog.len(), 8);
        assert_eq!(catalog.exercise_count(), 16);
        assert_eq!(catalog.count_exercises_of_kind(ExerciseKind::MultipleChoice), 9);
        let intro = catalog.find_lesson_by_id("intro-to-typescript").unwrap();
        assert_eq!(intro.exercises().len(), 2);
    }

    #[test]
    fn unknown_lesson_has_no_exercises() {
        let catalog = LessonCatalog::from_json(TWO_LESSONS).unwrap();
        assert!(catalog.find_lesson_by_id("zzz").is_none());
        assert!(catalog.exercises_for("zzz").is_empty());
        assert_eq!(catalog.exercises_for("b").len(), 1);
    }

    #[test]
    fn sections_sort_by_order_within_difficulty() {
        let catalog = LessonCatalog::from_json(TWO_LESSONS).unwrap();
        let sections = catalog.sections();
        assert_eq!(sections.len(), 1);
        assert_eq!(sections[0].label(), "TypeScript Fundamentals");
        let ids: Vec<&str> = sections[0].lessons.iter().map(|l| l.id().as_str()).collect();
        assert_eq!(ids, vec!["a", "b"]);
    }

    #[test]
    fn builtin_sections_follow_roadmap_order() {
        let catalog = LessonCatalog::builtin().unwrap();
        let order: Vec<Difficulty> = catalog.sections().iter().map(|s| s.difficulty).collect();
        assert_eq!(
            order,
            vec![
                Difficulty::Beginner,
                Difficulty::Intermediate,
                Difficulty::Advanced
            ]
        );
    }

    #[test]
    fn rejects_duplicate_lessons() {
        let json = r#"[
            {"id": "a", "title": "A", "difficulty": "bonus", "order": 1},
            {"id": "a", "title": "A again", "difficulty": "bonus", "order": 2}
        ]"#;
        assert!(matches!(
            LessonCatalog::from_json(json),
            Err(CatalogError::DuplicateLesson { .. })
        ));
    }

    #[test]
    fn rejects_unknown_prerequisite() {
        let json = r#"[{"id": "a", "title": "A", "difficulty": "advanced", "order": 1, "prerequisites": ["ghost"]}]"#;
        assert!(matches!(
            LessonCatalog::from_json(json),
            Err(CatalogError::UnknownPrerequisite { .. })
        ));
    }

    #[test]
    fn rejects_malformed_json() {
        assert!(matches!(
            LessonCatalog::from_json("{\"not\": \"a list\"}"),
            Err(CatalogError::Parse(_))
        ));
    }
}
