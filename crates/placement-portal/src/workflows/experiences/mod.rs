//! Student-submitted interview experiences and the admin review queue.
//!
//! A submission is a tree (experience, ordered rounds, per-round questions) that is written in
//! one transaction and always starts `pending`. Admins move it to `approved` or `rejected`;
//! owners may edit or withdraw it only while it is still pending.

pub mod domain;
pub mod repository;
pub mod router;
pub mod service;
pub mod validation;

#[cfg(test)]
mod tests;

pub use domain::{
    AnswerQuality, ApprovalStatus, Difficulty, ExperienceDetail, ExperienceId, ExperienceRecord,
    ExperienceSubmission, ExperienceSummary, ExperienceUpdate, InterviewResult,
    QuestionSubmission, ReviewDecision, RoundResult, RoundSubmission, RoundType, StatusSummary,
    SubmissionReceipt,
};
pub use repository::ExperienceRepository;
pub use router::{experience_router, ExperienceRouterState};
pub use service::{ExperienceError, ExperienceService};
pub use validation::ValidationErrors;
