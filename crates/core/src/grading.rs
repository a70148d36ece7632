//! Answer checking for exercises.

use serde_json::Value;

use crate::model::{Exercise, ExerciseKind};

/// Returns true when `answer` is accepted for `exercise`.
///
/// Multiple-choice answers must equal the correct option exactly. Coding and
/// quiz answers are compared after trimming; when both sides parse as JSON
/// they are compared structurally, so whitespace and key order do not matter.
#[must_use]
pub fn grade_answer(exercise: &Exercise, answer: &str) -> bool {
    match exercise.kind() {
        ExerciseKind::MultipleChoice => answer == exercise.correct_answer(),
        ExerciseKind::Coding | ExerciseKind::Quiz => {
            let expected = exercise.correct_answer().trim();
            let given = answer.trim();
            match (parse_json(expected), parse_json(given)) {
                (Some(expected), Some(given)) => expected == given,
                _ => expected == given,
            }
        }
    }
}

fn parse_json(text: &str) -> Option<Value> {
    // Only structured values; bare numbers and strings compare as text.
    if !(text.starts_with('{') || text.starts_with('[')) {
        return None;
    }
    serde_json::from_str(text).ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn coding(answer: &str) -> Exercise {
        Exercise::new("c1", ExerciseKind::Coding, "Write it", answer, "")
    }

    #[test]
    fn multiple_choice_requires_exact_option() {
        let ex = Exercise::new("m1", ExerciseKind::MultipleChoice, "?", ".ts", "")
            .with_options([".js", ".ts"]);
        assert!(grade_answer(&ex, ".ts"));
        assert!(!grade_answer(&ex, " .ts"));
        assert!(!grade_answer(&ex, ".js"));
    }

    #[test]
    fn coding_answers_ignore_surrounding_whitespace() {
        let ex = coding("let isActive: boolean = true;");
        assert!(grade_answer(&ex, "  let isActive: boolean = true;\n"));
        assert!(!grade_answer(&ex, "let isActive = true;"));
    }

    #[test]
    fn json_answers_compare_structurally() {
        let ex = coding("{\n  \"compilerOptions\": { \"outDir\": \"./dist\" },\n  \"include\": [\"src/**/*\"]\n}");
        assert!(grade_answer(
            &ex,
            r#"{"include":["src/**/*"],"compilerOptions":{"outDir":"./dist"}}"#
        ));
        assert!(!grade_answer(
            &ex,
            r#"{"include":["lib/**/*"],"compilerOptions":{"outDir":"./dist"}}"#
        ));
    }

    #[test]
    fn broken_json_falls_back_to_text() {
        let ex = coding("{ not json");
        assert!(grade_answer(&ex, "{ not json "));
        assert!(!grade_answer(&ex, "{not json"));
    }
}
