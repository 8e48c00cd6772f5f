use std::collections::BTreeSet;
use std::fmt;

use chrono::NaiveDate;
use serde::de::DeserializeOwned;

use super::domain::{
    AnswerQuality, Difficulty, ExperienceSubmission, ExperienceUpdate, InterviewResult,
    QuestionSubmission, RoundResult, RoundSubmission, RoundType,
};
use crate::envelope::FieldError;

const MIN_CONFIDENCE: i64 = 1;
const MAX_CONFIDENCE: i64 = 10;

const RESULT_CHOICES: &str = "pass, fail, not_sure";
const ROUND_RESULT_CHOICES: &str = "pass, fail, not_sure, not_evaluated";
const DIFFICULTY_CHOICES: &str = "easy, medium, hard";
const ROUND_TYPE_CHOICES: &str = "HR, Technical, Coding, Managerial, Group_Discussion, Other";
const ANSWER_QUALITY_CHOICES: &str = "poor, average, good, excellent";

/// Every field problem found in one payload.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ValidationErrors(pub Vec<FieldError>);

impl ValidationErrors {
    pub fn single(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self(vec![FieldError::new(field, message)])
    }

    fn push(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.0.push(FieldError::new(field, message));
    }

    pub fn fields(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(|error| error.field.as_str())
    }

    fn into_result<T>(self, value: T) -> Result<T, Self> {
        if self.0.is_empty() {
            Ok(value)
        } else {
            Err(self)
        }
    }

    /// Parses a mandatory enumerated field, recording a problem when it is absent or unknown.
    fn required_choice<T: DeserializeOwned>(
        &mut self,
        field: impl Into<String>,
        raw: Option<&str>,
        label: &str,
        choices: &str,
    ) -> Option<T> {
        let parsed = raw.and_then(parse_choice);
        if parsed.is_none() {
            self.push(field, format!("{label} must be one of: {choices}"));
        }
        parsed
    }

    fn optional_choice<T: DeserializeOwned>(
        &mut self,
        field: impl Into<String>,
        raw: Option<&str>,
        label: &str,
        choices: &str,
    ) -> Option<T> {
        raw?;
        self.required_choice(field, raw, label, choices)
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let rendered: Vec<String> = self
            .0
            .iter()
            .map(|error| format!("{}: {}", error.field, error.message))
            .collect();
        write!(f, "{}", rendered.join("; "))
    }
}

impl std::error::Error for ValidationErrors {}

/// Reads a value using the same spelling the API writes it with.
fn parse_choice<T: DeserializeOwned>(raw: &str) -> Option<T> {
    serde_json::from_value(serde_json::Value::String(raw.trim().to_string())).ok()
}

/// Submission that passed validation, with round numbers resolved.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidatedSubmission {
    pub drive_id: Option<i64>,
    pub company_name: String,
    pub role_applied: String,
    pub result: InterviewResult,
    pub selected: bool,
    pub offer_received: bool,
    pub ctc_offered: Option<f64>,
    pub is_anonymous: bool,
    pub interview_duration: Option<i64>,
    pub overall_difficulty: Option<Difficulty>,
    pub overall_feedback: Option<String>,
    pub confidence_level: Option<i64>,
    pub rounds: Vec<ValidatedRound>,
}

impl ValidatedSubmission {
    pub fn question_count(&self) -> usize {
        self.rounds.iter().map(|round| round.questions.len()).sum()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ValidatedRound {
    pub round_number: i64,
    pub round_type: RoundType,
    pub duration_minutes: Option<i64>,
    pub result: RoundResult,
    pub difficulty_level: Difficulty,
    pub round_date: Option<NaiveDate>,
    pub topics: Vec<String>,
    pub skills_tested: Vec<String>,
    pub problem_statement: Option<String>,
    pub approach_used: Option<String>,
    pub code_snippet: Option<String>,
    pub tips_and_insights: Option<String>,
    pub interviewer_feedback: Option<String>,
    pub questions: Vec<ValidatedQuestion>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ValidatedQuestion {
    pub question_text: String,
    pub category: Option<String>,
    pub subcategory: Option<String>,
    pub difficulty: Difficulty,
    pub answer_provided: Option<bool>,
    pub answer_quality: AnswerQuality,
    pub is_common: bool,
}

/// Owner edit that passed validation. `None` leaves a column as stored.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ValidatedUpdate {
    pub result: Option<InterviewResult>,
    pub selected: Option<bool>,
    pub offer_received: Option<bool>,
    /// `Some(None)` clears the stored CTC.
    pub ctc_offered: Option<Option<f64>>,
    pub overall_feedback: Option<String>,
    pub overall_difficulty: Option<Difficulty>,
    pub confidence_level: Option<i64>,
}

impl ValidatedUpdate {
    pub fn is_empty(&self) -> bool {
        self == &ValidatedUpdate::default()
    }
}

pub fn validate_submission(
    submission: ExperienceSubmission,
) -> Result<ValidatedSubmission, ValidationErrors> {
    let mut errors = ValidationErrors::default();

    let company_name = submission.company_name.trim().to_string();
    if company_name.is_empty() {
        errors.push("company_name", "Company name is required");
    }
    let role_applied = submission.role_applied.trim().to_string();
    if role_applied.is_empty() {
        errors.push("role_applied", "Role applied is required");
    }
    let result = errors.required_choice(
        "result",
        submission.result.as_deref(),
        "Result",
        RESULT_CHOICES,
    );
    let overall_difficulty = errors.optional_choice(
        "overall_difficulty",
        submission.overall_difficulty.as_deref(),
        "Difficulty",
        DIFFICULTY_CHOICES,
    );
    if matches!(submission.drive_id, Some(id) if id < 1) {
        errors.push("drive_id", "Drive ID must be a positive integer");
    }
    check_ctc(&mut errors, submission.ctc_offered);
    check_confidence(&mut errors, submission.confidence_level);
    if matches!(submission.interview_duration, Some(minutes) if minutes < 0) {
        errors.push("interview_duration", "Interview duration cannot be negative");
    }

    let rounds = resolve_rounds(&mut errors, submission.rounds);

    let Some(result) = result else {
        return Err(errors);
    };

    errors.into_result(ValidatedSubmission {
        drive_id: submission.drive_id,
        company_name,
        role_applied,
        result,
        selected: submission.selected,
        offer_received: submission.offer_received,
        ctc_offered: submission.ctc_offered,
        is_anonymous: submission.is_anonymous,
        interview_duration: submission.interview_duration,
        overall_difficulty,
        overall_feedback: non_blank(submission.overall_feedback),
        confidence_level: submission.confidence_level,
        rounds,
    })
}

pub fn validate_update(update: ExperienceUpdate) -> Result<ValidatedUpdate, ValidationErrors> {
    let mut errors = ValidationErrors::default();
    let result = errors.optional_choice(
        "result",
        update.result.as_deref(),
        "Result",
        RESULT_CHOICES,
    );
    let overall_difficulty = errors.optional_choice(
        "overall_difficulty",
        update.overall_difficulty.as_deref(),
        "Difficulty",
        DIFFICULTY_CHOICES,
    );
    check_ctc(&mut errors, update.ctc_offered.flatten());
    check_confidence(&mut errors, update.confidence_level);

    errors.into_result(ValidatedUpdate {
        result,
        selected: update.selected,
        offer_received: update.offer_received,
        ctc_offered: update.ctc_offered,
        overall_feedback: update.overall_feedback,
        overall_difficulty,
        confidence_level: update.confidence_level,
    })
}

fn check_ctc(errors: &mut ValidationErrors, ctc: Option<f64>) {
    if matches!(ctc, Some(value) if !value.is_finite() || value < 0.0) {
        errors.push("ctc_offered", "CTC offered must be a non-negative number");
    }
}

fn check_confidence(errors: &mut ValidationErrors, confidence: Option<i64>) {
    if matches!(confidence, Some(level) if !(MIN_CONFIDENCE..=MAX_CONFIDENCE).contains(&level)) {
        errors.push(
            "confidence_level",
            format!("Confidence level must be between {MIN_CONFIDENCE} and {MAX_CONFIDENCE}"),
        );
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|text| text.trim().to_string())
        .filter(|text| !text.is_empty())
}

/// Assigns positional numbers to rounds without one and checks the result is exactly `1..=N`.
fn resolve_rounds(
    errors: &mut ValidationErrors,
    rounds: Vec<RoundSubmission>,
) -> Vec<ValidatedRound> {
    let total = rounds.len();
    let mut seen = BTreeSet::new();
    let mut numbering_valid = true;
    let mut resolved = Vec::with_capacity(total);

    for (index, round) in rounds.into_iter().enumerate() {
        let field = format!("rounds[{index}]");
        let round_number = round.round_number.unwrap_or(index as i64 + 1);

        if round_number < 1 {
            errors.push(
                format!("{field}.round_number"),
                "Round number must be a positive integer",
            );
            numbering_valid = false;
        } else if !seen.insert(round_number) {
            errors.push(
                format!("{field}.round_number"),
                format!("Round number {round_number} is repeated"),
            );
            numbering_valid = false;
        }

        let round_type = errors.required_choice(
            format!("{field}.round_type"),
            round.round_type.as_deref(),
            "Round type",
            ROUND_TYPE_CHOICES,
        );
        let result = errors.optional_choice(
            format!("{field}.result"),
            round.result.as_deref(),
            "Round result",
            ROUND_RESULT_CHOICES,
        );
        let difficulty_level = errors.optional_choice(
            format!("{field}.difficulty_level"),
            round.difficulty_level.as_deref(),
            "Difficulty",
            DIFFICULTY_CHOICES,
        );
        if matches!(round.duration_minutes, Some(minutes) if minutes < 0) {
            errors.push(
                format!("{field}.duration_minutes"),
                "Duration cannot be negative",
            );
        }

        let questions: Vec<ValidatedQuestion> = round
            .questions_list
            .into_iter()
            .enumerate()
            .map(|(question_index, question)| {
                let field = format!("{field}.questions_list[{question_index}]");
                validate_question(errors, &field, question)
            })
            .collect();

        if let Some(round_type) = round_type {
            resolved.push(ValidatedRound {
                round_number,
                round_type,
                duration_minutes: round.duration_minutes,
                result: result.unwrap_or_default(),
                difficulty_level: difficulty_level.unwrap_or_default(),
                round_date: round.round_date,
                topics: round.topics,
                skills_tested: round.skills_tested,
                problem_statement: round.problem_statement,
                approach_used: round.approach_used,
                code_snippet: round.code_snippet,
                tips_and_insights: round.tips_and_insights,
                interviewer_feedback: round.interviewer_feedback,
                questions,
            });
        }
    }

    let contiguous = seen.iter().copied().eq(1..=total as i64);
    if numbering_valid && !contiguous {
        errors.push(
            "rounds",
            format!("Round numbers must run from 1 to {total} without gaps"),
        );
    }

    resolved
}

fn validate_question(
    errors: &mut ValidationErrors,
    field: &str,
    question: QuestionSubmission,
) -> ValidatedQuestion {
    let question_text = question.question_text.trim().to_string();
    if question_text.is_empty() {
        errors.push(format!("{field}.question_text"), "Question text is required");
    }
    let difficulty = errors.optional_choice(
        format!("{field}.difficulty"),
        question.difficulty.as_deref(),
        "Difficulty",
        DIFFICULTY_CHOICES,
    );
    let answer_quality = errors.optional_choice(
        format!("{field}.answer_quality"),
        question.answer_quality.as_deref(),
        "Answer quality",
        ANSWER_QUALITY_CHOICES,
    );

    ValidatedQuestion {
        question_text,
        category: question.category,
        subcategory: question.subcategory,
        difficulty: difficulty.unwrap_or_default(),
        answer_provided: question.answer_provided,
        answer_quality: answer_quality.unwrap_or_default(),
        is_common: question.is_common,
    }
}
