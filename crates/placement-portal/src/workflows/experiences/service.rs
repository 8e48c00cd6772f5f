use chrono::Utc;
use tracing::{info, warn};

use super::domain::{
    ApprovalStatus, ExperienceDetail, ExperienceId, ExperienceRecord, ExperienceSubmission,
    ExperienceSummary, ExperienceUpdate, InvalidTransition, ReviewDecision, StatusSummary,
    SubmissionReceipt, Transition,
};
use super::repository::ExperienceRepository;
use super::validation::{validate_submission, validate_update, ValidationErrors};
use crate::auth::Identity;
use crate::pagination::{Page, Paginated};
use crate::store::StoreError;
use crate::users::UserId;

/// Submission, review, and owner-edit rules for interview experiences.
#[derive(Debug, Clone)]
pub struct ExperienceService {
    repository: ExperienceRepository,
}

impl ExperienceService {
    pub fn new(repository: ExperienceRepository) -> Self {
        Self { repository }
    }

    /// Validate the nested payload and persist it as one pending experience.
    pub async fn submit(
        &self,
        owner: UserId,
        submission: ExperienceSubmission,
    ) -> Result<SubmissionReceipt, ExperienceError> {
        let validated = validate_submission(submission)?;
        let rounds = validated.rounds.len();
        let questions = validated.question_count();

        let receipt = self
            .repository
            .insert_tree(owner, &validated, Utc::now())
            .await
            .map_err(|err| {
                warn!(owner = %owner, error = %err, "experience submission rolled back");
                ExperienceError::SubmissionFailed(err)
            })?;

        info!(
            experience_id = %receipt.id,
            owner = %owner,
            rounds,
            questions,
            "experience submitted"
        );
        Ok(receipt)
    }

    pub async fn list_for_owner(
        &self,
        owner: UserId,
        page: Page,
    ) -> Result<Paginated<ExperienceSummary>, ExperienceError> {
        Ok(self.repository.list_by_owner(owner, page).await?)
    }

    pub async fn list_by_status(
        &self,
        status: ApprovalStatus,
        page: Page,
    ) -> Result<Paginated<ExperienceSummary>, ExperienceError> {
        Ok(self.repository.list_by_status(status, page).await?)
    }

    pub async fn status_summary(&self) -> Result<StatusSummary, ExperienceError> {
        Ok(self.repository.status_counts().await?)
    }

    /// Full experience as seen by `viewer`.
    ///
    /// Owners and admins see every status. Everyone else sees approved experiences only, with
    /// the submitter hidden when the experience is anonymous; anything else reads as not found.
    pub async fn detail(
        &self,
        id: ExperienceId,
        viewer: Identity,
    ) -> Result<ExperienceDetail, ExperienceError> {
        let mut detail = self
            .repository
            .fetch_detail(id)
            .await?
            .ok_or(ExperienceError::NotFound(id))?;

        if viewer.is_admin() || detail.experience.owned_by(viewer.user_id) {
            return Ok(detail);
        }
        if detail.experience.approval_status != ApprovalStatus::Approved {
            return Err(ExperienceError::NotFound(id));
        }
        if detail.experience.is_anonymous {
            detail.experience.user_id = None;
        }
        Ok(detail)
    }

    pub async fn approve(
        &self,
        id: ExperienceId,
        reviewer: UserId,
        comment: Option<String>,
    ) -> Result<ExperienceRecord, ExperienceError> {
        self.review(id, ReviewDecision::Approve, reviewer, comment)
            .await
    }

    pub async fn reject(
        &self,
        id: ExperienceId,
        reviewer: UserId,
        reason: Option<String>,
    ) -> Result<ExperienceRecord, ExperienceError> {
        self.review(id, ReviewDecision::Reject, reviewer, reason)
            .await
    }

    async fn review(
        &self,
        id: ExperienceId,
        decision: ReviewDecision,
        reviewer: UserId,
        comment: Option<String>,
    ) -> Result<ExperienceRecord, ExperienceError> {
        let current = self.require(id).await?;

        let target = match current.approval_status.review(decision)? {
            Transition::Unchanged => {
                info!(
                    experience_id = %id,
                    status = %current.approval_status,
                    "review repeated; experience unchanged"
                );
                return Ok(current);
            }
            Transition::Apply(target) => target,
        };

        let comment = comment
            .map(|text| text.trim().to_string())
            .filter(|text| !text.is_empty());
        let applied = self
            .repository
            .record_review(id, target, reviewer, comment, Utc::now())
            .await?;

        let latest = self.require(id).await?;
        if !applied {
            // Another reviewer decided first; judge this decision against what they stored.
            return match latest.approval_status.review(decision)? {
                Transition::Unchanged => Ok(latest),
                Transition::Apply(_) => Err(ExperienceError::Store(StoreError::Corrupt(format!(
                    "review of experience {id} did not apply"
                )))),
            };
        }

        info!(
            experience_id = %id,
            reviewer = %reviewer,
            status = %target,
            "experience reviewed"
        );
        Ok(latest)
    }

    /// Apply owner edits while the experience is still pending.
    pub async fn update(
        &self,
        id: ExperienceId,
        owner: UserId,
        changes: ExperienceUpdate,
    ) -> Result<ExperienceRecord, ExperienceError> {
        let changes = validate_update(changes)?;
        let current = self.require(id).await?;
        ensure_editable(&current, owner)?;

        if changes.is_empty() {
            return Ok(current);
        }

        if !self
            .repository
            .update_pending(id, &changes, Utc::now())
            .await?
        {
            return Err(self.edit_conflict(id).await);
        }

        info!(experience_id = %id, owner = %owner, "experience updated");
        self.require(id).await
    }

    /// Delete a pending experience together with its rounds and questions.
    pub async fn withdraw(&self, id: ExperienceId, owner: UserId) -> Result<(), ExperienceError> {
        let current = self.require(id).await?;
        ensure_editable(&current, owner)?;

        if !self.repository.delete_pending(id).await? {
            return Err(self.edit_conflict(id).await);
        }

        info!(experience_id = %id, owner = %owner, "experience withdrawn");
        Ok(())
    }

    async fn require(&self, id: ExperienceId) -> Result<ExperienceRecord, ExperienceError> {
        self.repository
            .fetch(id)
            .await?
            .ok_or(ExperienceError::NotFound(id))
    }

    /// Explains why a guarded edit touched no row.
    async fn edit_conflict(&self, id: ExperienceId) -> ExperienceError {
        match self.require(id).await {
            Ok(record) => ExperienceError::CannotUpdate {
                id,
                status: record.approval_status,
            },
            Err(err) => err,
        }
    }
}

fn ensure_editable(record: &ExperienceRecord, owner: UserId) -> Result<(), ExperienceError> {
    if !record.owned_by(owner) {
        return Err(ExperienceError::NotOwner(record.id));
    }
    if record.approval_status.is_terminal() {
        return Err(ExperienceError::CannotUpdate {
            id: record.id,
            status: record.approval_status,
        });
    }
    Ok(())
}

/// Error raised by the experience service.
#[derive(Debug, thiserror::Error)]
pub enum ExperienceError {
    #[error("validation failed: {0}")]
    Validation(#[from] ValidationErrors),
    #[error("experience {0} not found")]
    NotFound(ExperienceId),
    #[error("experience {0} belongs to another user")]
    NotOwner(ExperienceId),
    #[error("experience {id} is {status} and can no longer change")]
    CannotUpdate {
        id: ExperienceId,
        status: ApprovalStatus,
    },
    #[error(transparent)]
    InvalidTransition(#[from] InvalidTransition),
    #[error("submission failed: {0}")]
    SubmissionFailed(#[source] StoreError),
    #[error(transparent)]
    Store(#[from] StoreError),
}
