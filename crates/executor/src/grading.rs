use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use super::error::Error;
use super::format::{DecimalLocale, parse_number};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExerciseKind {
    Direct,
    Inverse,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    Easy,
    Medium,
    Hard,
}

/// A practice exercise with a numeric answer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Exercise {
    pub id: String,
    pub statement: String,
    pub answer: f64,
    /// Largest accepted |user − answer|.
    pub tolerance: f64,
    #[serde(default)]
    pub solution: Vec<String>,
    #[serde(rename = "type")]
    pub kind: ExerciseKind,
    pub difficulty: Difficulty,
    /// Other accepted answers, checked with the same tolerance.
    #[serde(default)]
    pub alt_answers: Vec<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Verdict {
    pub correct: bool,
    /// The accepted answer the user hit, if any.
    pub matched: Option<f64>,
    /// |user − answer| / |answer| in percent; 0 for a zero answer.
    pub relative_error_percent: f64,
}

/// Grades a numeric answer against the main and alternate answers.
pub fn grade(user: f64, exercise: &Exercise) -> Verdict {
    let matched = std::iter::once(exercise.answer)
        .chain(exercise.alt_answers.iter().copied())
        .find(|accepted| (user - accepted).abs() <= exercise.tolerance);

    let relative_error_percent = if exercise.answer == 0.0 {
        0.0
    } else {
        ((user - exercise.answer) / exercise.answer).abs() * 100.0
    };

    Verdict {
        correct: matched.is_some(),
        matched,
        relative_error_percent,
    }
}

/// Grades an answer as typed by the user; unreadable text counts as `0`.
pub fn grade_text(answer: &str, exercise: &Exercise, locale: DecimalLocale) -> Verdict {
    grade(parse_number(answer, locale), exercise)
}

/// Reads a JSON array of exercises.
pub fn load_exercises(path: &Path) -> Result<Vec<Exercise>, Error> {
    let file = File::open(path)?;
    let exercises = serde_json::from_reader(BufReader::new(file))?;
    Ok(exercises)
}
