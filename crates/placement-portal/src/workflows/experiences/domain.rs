use std::fmt;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Deserializer, Serialize};

use crate::users::UserId;

/// Identifier wrapper for submitted experiences.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[serde(transparent)]
#[sqlx(transparent)]
pub struct ExperienceId(pub i64);

impl fmt::Display for ExperienceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Candidate-reported outcome of the whole interview process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(rename_all = "snake_case")]
pub enum InterviewResult {
    Pass,
    Fail,
    NotSure,
}

/// Outcome of a single round. Rounds nobody has graded stay `not_evaluated`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(rename_all = "snake_case")]
pub enum RoundResult {
    Pass,
    Fail,
    NotSure,
    #[default]
    NotEvaluated,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(rename_all = "snake_case")]
pub enum Difficulty {
    Easy,
    #[default]
    Medium,
    Hard,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
pub enum RoundType {
    #[serde(rename = "HR")]
    #[sqlx(rename = "HR")]
    Hr,
    Technical,
    Coding,
    Managerial,
    #[serde(rename = "Group_Discussion")]
    #[sqlx(rename = "Group_Discussion")]
    GroupDiscussion,
    Other,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(rename_all = "snake_case")]
pub enum AnswerQuality {
    Poor,
    Average,
    #[default]
    Good,
    Excellent,
}

/// Admin-controlled visibility gate for a submitted experience.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApprovalStatus {
    Pending,
    #[serde(alias = "accepted")]
    Approved,
    Rejected,
}

impl ApprovalStatus {
    pub const fn label(self) -> &'static str {
        match self {
            ApprovalStatus::Pending => "pending",
            ApprovalStatus::Approved => "approved",
            ApprovalStatus::Rejected => "rejected",
        }
    }

    /// Parses a stored or requested status. Older rows carry `accepted` for approvals.
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "pending" => Some(ApprovalStatus::Pending),
            "approved" | "accepted" => Some(ApprovalStatus::Approved),
            "rejected" => Some(ApprovalStatus::Rejected),
            _ => None,
        }
    }

    pub const fn is_terminal(self) -> bool {
        !matches!(self, ApprovalStatus::Pending)
    }

    /// Decides how a review decision applies to a submission currently in `self`.
    pub fn review(self, decision: ReviewDecision) -> Result<Transition, InvalidTransition> {
        let target = decision.target();
        match self {
            ApprovalStatus::Pending => Ok(Transition::Apply(target)),
            current if current == target => Ok(Transition::Unchanged),
            current => Err(InvalidTransition {
                from: current,
                to: target,
            }),
        }
    }
}

impl fmt::Display for ApprovalStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Admin decision on a pending submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReviewDecision {
    Approve,
    Reject,
}

impl ReviewDecision {
    pub const fn target(self) -> ApprovalStatus {
        match self {
            ReviewDecision::Approve => ApprovalStatus::Approved,
            ReviewDecision::Reject => ApprovalStatus::Rejected,
        }
    }
}

/// Effect of a review decision on the stored row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    Apply(ApprovalStatus),
    /// The row already carries the requested terminal status.
    Unchanged,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("cannot move a submission from {from} to {to}")]
pub struct InvalidTransition {
    pub from: ApprovalStatus,
    pub to: ApprovalStatus,
}

/// Nested payload posted by a student.
///
/// Enumerated fields arrive as raw text and are checked during validation, so an unknown value
/// is reported next to every other field problem.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExperienceSubmission {
    #[serde(default)]
    pub drive_id: Option<i64>,
    #[serde(default)]
    pub company_name: String,
    #[serde(default)]
    pub role_applied: String,
    #[serde(default)]
    pub result: Option<String>,
    #[serde(default)]
    pub selected: bool,
    #[serde(default)]
    pub offer_received: bool,
    #[serde(default)]
    pub ctc_offered: Option<f64>,
    #[serde(default)]
    pub is_anonymous: bool,
    #[serde(default)]
    pub interview_duration: Option<i64>,
    #[serde(default)]
    pub overall_difficulty: Option<String>,
    #[serde(default)]
    pub overall_feedback: Option<String>,
    #[serde(default)]
    pub confidence_level: Option<i64>,
    #[serde(default)]
    pub rounds: Vec<RoundSubmission>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RoundSubmission {
    #[serde(default)]
    pub round_number: Option<i64>,
    #[serde(default)]
    pub round_type: Option<String>,
    #[serde(default)]
    pub duration_minutes: Option<i64>,
    #[serde(default)]
    pub result: Option<String>,
    #[serde(default)]
    pub difficulty_level: Option<String>,
    #[serde(default)]
    pub round_date: Option<NaiveDate>,
    #[serde(default)]
    pub topics: Vec<String>,
    #[serde(default)]
    pub skills_tested: Vec<String>,
    #[serde(default)]
    pub problem_statement: Option<String>,
    #[serde(default)]
    pub approach_used: Option<String>,
    #[serde(default)]
    pub code_snippet: Option<String>,
    #[serde(default)]
    pub tips_and_insights: Option<String>,
    #[serde(default)]
    pub interviewer_feedback: Option<String>,
    #[serde(default)]
    pub questions_list: Vec<QuestionSubmission>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QuestionSubmission {
    #[serde(default)]
    pub question_text: String,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub subcategory: Option<String>,
    #[serde(default)]
    pub difficulty: Option<String>,
    #[serde(default)]
    pub answer_provided: Option<bool>,
    #[serde(default)]
    pub answer_quality: Option<String>,
    #[serde(default)]
    pub is_common: bool,
}

/// Fields an owner may change while the submission is pending.
///
/// `ctc_offered` tells an absent field (`None`, keep) from an explicit `null` (`Some(None)`,
/// clear).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExperienceUpdate {
    #[serde(default)]
    pub result: Option<String>,
    #[serde(default)]
    pub selected: Option<bool>,
    #[serde(default)]
    pub offer_received: Option<bool>,
    #[serde(default, deserialize_with = "deserialize_nullable")]
    pub ctc_offered: Option<Option<f64>>,
    #[serde(default)]
    pub overall_feedback: Option<String>,
    #[serde(default)]
    pub overall_difficulty: Option<String>,
    #[serde(default)]
    pub confidence_level: Option<i64>,
}

fn deserialize_nullable<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

/// Identifying fields returned once a submission commits.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubmissionReceipt {
    pub id: ExperienceId,
    pub company_name: String,
    pub role_applied: String,
    pub approval_status: ApprovalStatus,
    pub submitted_at: DateTime<Utc>,
}

/// Full experience row.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExperienceRecord {
    pub id: ExperienceId,
    /// `None` when the submitter stays anonymous to the current viewer.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_id: Option<UserId>,
    pub drive_id: Option<i64>,
    pub company_name: String,
    pub role_applied: String,
    pub result: InterviewResult,
    pub selected: bool,
    pub offer_received: bool,
    pub ctc_offered: Option<f64>,
    pub is_anonymous: bool,
    pub approval_status: ApprovalStatus,
    pub interview_duration: Option<i64>,
    pub overall_difficulty: Option<Difficulty>,
    pub overall_feedback: Option<String>,
    pub confidence_level: Option<i64>,
    pub approved_by: Option<UserId>,
    pub approved_at: Option<DateTime<Utc>>,
    pub admin_comments: Option<String>,
    pub submitted_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ExperienceRecord {
    pub fn owned_by(&self, user: UserId) -> bool {
        self.user_id == Some(user)
    }
}

/// Listing row.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExperienceSummary {
    pub id: ExperienceId,
    pub user_id: UserId,
    pub company_name: String,
    pub role_applied: String,
    pub result: InterviewResult,
    pub approval_status: ApprovalStatus,
    pub submitted_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RoundRecord {
    pub id: i64,
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
    pub questions: Vec<QuestionRecord>,
}

#[derive(Debug, Clone, PartialEq, Serialize, sqlx::FromRow)]
pub struct QuestionRecord {
    pub id: i64,
    #[serde(skip)]
    pub round_id: i64,
    pub question_text: String,
    pub category: Option<String>,
    pub subcategory: Option<String>,
    pub difficulty: Difficulty,
    pub answer_provided: Option<bool>,
    pub answer_quality: AnswerQuality,
    pub is_common: bool,
}

/// Experience with its rounds (by round number) and their questions.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExperienceDetail {
    #[serde(flatten)]
    pub experience: ExperienceRecord,
    pub rounds: Vec<RoundRecord>,
}

impl ExperienceDetail {
    pub fn question_count(&self) -> usize {
        self.rounds.iter().map(|round| round.questions.len()).sum()
    }
}

/// Per-status counts for the admin review queue.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StatusSummary {
    pub pending: i64,
    pub approved: i64,
    pub rejected: i64,
    pub total: i64,
}
