use std::collections::BTreeMap;

use chrono::{DateTime, NaiveDate, Utc};
use sqlx::{QueryBuilder, Sqlite, SqliteConnection, SqlitePool};
use tracing::warn;

use super::domain::{
    ApprovalStatus, Difficulty, ExperienceDetail, ExperienceId, ExperienceRecord,
    ExperienceSummary, InterviewResult, QuestionRecord, RoundRecord,
    RoundResult, RoundType, StatusSummary, SubmissionReceipt,
};
use super::validation::{ValidatedRound, ValidatedSubmission, ValidatedUpdate};
use crate::pagination::{Page, Paginated};
use crate::store::StoreError;
use crate::users::UserId;

const EXPERIENCE_COLUMNS: &str = "id, user_id, drive_id, company_name, role_applied, result, \
     selected, offer_received, ctc_offered, is_anonymous, approval_status, interview_duration, \
     overall_difficulty, overall_feedback, confidence_level, approved_by, approved_at, \
     admin_comments, submitted_at, updated_at";

const SUMMARY_COLUMNS: &str =
    "id, user_id, company_name, role_applied, result, approval_status, submitted_at";

#[derive(Debug, sqlx::FromRow)]
struct ExperienceRow {
    id: i64,
    user_id: i64,
    drive_id: Option<i64>,
    company_name: String,
    role_applied: String,
    result: InterviewResult,
    selected: bool,
    offer_received: bool,
    ctc_offered: Option<f64>,
    is_anonymous: bool,
    approval_status: String,
    interview_duration: Option<i64>,
    overall_difficulty: Option<Difficulty>,
    overall_feedback: Option<String>,
    confidence_level: Option<i64>,
    approved_by: Option<i64>,
    approved_at: Option<DateTime<Utc>>,
    admin_comments: Option<String>,
    submitted_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<ExperienceRow> for ExperienceRecord {
    type Error = StoreError;

    fn try_from(row: ExperienceRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: ExperienceId(row.id),
            user_id: Some(UserId(row.user_id)),
            drive_id: row.drive_id,
            company_name: row.company_name,
            role_applied: row.role_applied,
            result: row.result,
            selected: row.selected,
            offer_received: row.offer_received,
            ctc_offered: row.ctc_offered,
            is_anonymous: row.is_anonymous,
            approval_status: parse_status(row.id, &row.approval_status)?,
            interview_duration: row.interview_duration,
            overall_difficulty: row.overall_difficulty,
            overall_feedback: row.overall_feedback,
            confidence_level: row.confidence_level,
            approved_by: row.approved_by.map(UserId),
            approved_at: row.approved_at,
            admin_comments: row.admin_comments,
            submitted_at: row.submitted_at,
            updated_at: row.updated_at,
        })
    }
}

#[derive(Debug, sqlx::FromRow)]
struct SummaryRow {
    id: i64,
    user_id: i64,
    company_name: String,
    role_applied: String,
    result: InterviewResult,
    approval_status: String,
    submitted_at: DateTime<Utc>,
}

impl TryFrom<SummaryRow> for ExperienceSummary {
    type Error = StoreError;

    fn try_from(row: SummaryRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: ExperienceId(row.id),
            user_id: UserId(row.user_id),
            company_name: row.company_name,
            role_applied: row.role_applied,
            result: row.result,
            approval_status: parse_status(row.id, &row.approval_status)?,
            submitted_at: row.submitted_at,
        })
    }
}

#[derive(Debug, sqlx::FromRow)]
struct RoundRow {
    id: i64,
    round_number: i64,
    round_type: RoundType,
    duration_minutes: Option<i64>,
    result: RoundResult,
    difficulty_level: Difficulty,
    round_date: Option<NaiveDate>,
    topics: String,
    skills_tested: String,
    problem_statement: Option<String>,
    approach_used: Option<String>,
    code_snippet: Option<String>,
    tips_and_insights: Option<String>,
    interviewer_feedback: Option<String>,
}

impl RoundRow {
    fn into_record(self, questions: Vec<QuestionRecord>) -> Result<RoundRecord, StoreError> {
        Ok(RoundRecord {
            id: self.id,
            round_number: self.round_number,
            round_type: self.round_type,
            duration_minutes: self.duration_minutes,
            result: self.result,
            difficulty_level: self.difficulty_level,
            round_date: self.round_date,
            topics: serde_json::from_str(&self.topics)?,
            skills_tested: serde_json::from_str(&self.skills_tested)?,
            problem_statement: self.problem_statement,
            approach_used: self.approach_used,
            code_snippet: self.code_snippet,
            tips_and_insights: self.tips_and_insights,
            interviewer_feedback: self.interviewer_feedback,
            questions,
        })
    }
}

fn parse_status(id: i64, raw: &str) -> Result<ApprovalStatus, StoreError> {
    ApprovalStatus::parse(raw)
        .ok_or_else(|| StoreError::Corrupt(format!("experience {id} has approval status '{raw}'")))
}

/// Stored spellings that read back as `status`.
fn stored_labels(status: ApprovalStatus) -> [&'static str; 2] {
    match status {
        ApprovalStatus::Approved => ["approved", "accepted"],
        other => [other.label(), other.label()],
    }
}

/// SQL access for experiences and their nested rounds and questions.
#[derive(Debug, Clone)]
pub struct ExperienceRepository {
    pool: SqlitePool,
}

impl ExperienceRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Persists the experience, its rounds, and their questions in one transaction.
    pub async fn insert_tree(
        &self,
        owner: UserId,
        submission: &ValidatedSubmission,
        submitted_at: DateTime<Utc>,
    ) -> Result<SubmissionReceipt, StoreError> {
        let mut tx = self.pool.begin().await?;

        match insert_tree_in(&mut tx, owner, submission, submitted_at).await {
            Ok(receipt) => {
                tx.commit().await?;
                Ok(receipt)
            }
            Err(err) => {
                if let Err(rollback) = tx.rollback().await {
                    warn!(error = %rollback, "rollback after failed submission did not complete");
                }
                Err(err)
            }
        }
    }

    pub async fn fetch(&self, id: ExperienceId) -> Result<Option<ExperienceRecord>, StoreError> {
        let mut conn = self.pool.acquire().await?;
        fetch_in(&mut conn, id).await
    }

    /// Loads the experience with rounds ordered by round number and questions by insertion.
    pub async fn fetch_detail(
        &self,
        id: ExperienceId,
    ) -> Result<Option<ExperienceDetail>, StoreError> {
        let mut tx = self.pool.begin().await?;

        let Some(experience) = fetch_in(&mut tx, id).await? else {
            return Ok(None);
        };

        let rounds = sqlx::query_as::<_, RoundRow>(
            "SELECT id, round_number, round_type, duration_minutes, result, difficulty_level, \
             round_date, topics, skills_tested, problem_statement, approach_used, code_snippet, \
             tips_and_insights, interviewer_feedback \
             FROM rounds WHERE experience_id = ? ORDER BY round_number",
        )
        .bind(id)
        .fetch_all(&mut *tx)
        .await?;

        let questions = sqlx::query_as::<_, QuestionRecord>(
            "SELECT q.id, q.round_id, q.question_text, q.category, q.subcategory, q.difficulty, \
             q.answer_provided, q.answer_quality, q.is_common \
             FROM questions q JOIN rounds r ON q.round_id = r.id \
             WHERE r.experience_id = ? ORDER BY q.id",
        )
        .bind(id)
        .fetch_all(&mut *tx)
        .await?;

        tx.commit().await?;

        let mut by_round: BTreeMap<i64, Vec<QuestionRecord>> = BTreeMap::new();
        for question in questions {
            by_round.entry(question.round_id).or_default().push(question);
        }

        let rounds = rounds
            .into_iter()
            .map(|round| {
                let questions = by_round.remove(&round.id).unwrap_or_default();
                round.into_record(questions)
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Some(ExperienceDetail { experience, rounds }))
    }

    pub async fn list_by_owner(
        &self,
        owner: UserId,
        page: Page,
    ) -> Result<Paginated<ExperienceSummary>, StoreError> {
        let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM experiences WHERE user_id = ?")
            .bind(owner)
            .fetch_one(&self.pool)
            .await?;

        let rows = sqlx::query_as::<_, SummaryRow>(&format!(
            "SELECT {SUMMARY_COLUMNS} FROM experiences WHERE user_id = ? \
             ORDER BY submitted_at DESC, id DESC LIMIT ? OFFSET ?"
        ))
        .bind(owner)
        .bind(page.limit() as i64)
        .bind(page.offset())
        .fetch_all(&self.pool)
        .await?;

        paginate(rows, total, page)
    }

    pub async fn list_by_status(
        &self,
        status: ApprovalStatus,
        page: Page,
    ) -> Result<Paginated<ExperienceSummary>, StoreError> {
        let [primary, legacy] = stored_labels(status);

        let total: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM experiences WHERE approval_status IN (?, ?)",
        )
        .bind(primary)
        .bind(legacy)
        .fetch_one(&self.pool)
        .await?;

        let rows = sqlx::query_as::<_, SummaryRow>(&format!(
            "SELECT {SUMMARY_COLUMNS} FROM experiences WHERE approval_status IN (?, ?) \
             ORDER BY submitted_at DESC, id DESC LIMIT ? OFFSET ?"
        ))
        .bind(primary)
        .bind(legacy)
        .bind(page.limit() as i64)
        .bind(page.offset())
        .fetch_all(&self.pool)
        .await?;

        paginate(rows, total, page)
    }

    /// Moves a pending experience to `status`. Returns `false` when the row is no longer
    /// pending (or gone), leaving it untouched.
    pub async fn record_review(
        &self,
        id: ExperienceId,
        status: ApprovalStatus,
        reviewer: UserId,
        comment: Option<String>,
        reviewed_at: DateTime<Utc>,
    ) -> Result<bool, StoreError> {
        let result = sqlx::query(
            "UPDATE experiences \
             SET approval_status = ?, approved_by = ?, approved_at = ?, admin_comments = ?, \
                 updated_at = ? \
             WHERE id = ? AND approval_status = 'pending'",
        )
        .bind(status.label())
        .bind(reviewer)
        .bind(reviewed_at)
        .bind(comment)
        .bind(reviewed_at)
        .bind(id)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    /// Applies owner edits to a pending experience. Returns `false` when the row is no longer
    /// pending (or gone).
    pub async fn update_pending(
        &self,
        id: ExperienceId,
        changes: &ValidatedUpdate,
        updated_at: DateTime<Utc>,
    ) -> Result<bool, StoreError> {
        let mut builder = QueryBuilder::<Sqlite>::new("UPDATE experiences SET ");
        {
            let mut fields = builder.separated(", ");
            if let Some(result) = changes.result {
                fields.push("result = ").push_bind_unseparated(result);
            }
            if let Some(selected) = changes.selected {
                fields.push("selected = ").push_bind_unseparated(selected);
            }
            if let Some(offer_received) = changes.offer_received {
                fields
                    .push("offer_received = ")
                    .push_bind_unseparated(offer_received);
            }
            if let Some(ctc_offered) = changes.ctc_offered {
                fields.push("ctc_offered = ").push_bind_unseparated(ctc_offered);
            }
            if let Some(feedback) = &changes.overall_feedback {
                fields
                    .push("overall_feedback = ")
                    .push_bind_unseparated(feedback.clone());
            }
            if let Some(difficulty) = changes.overall_difficulty {
                fields
                    .push("overall_difficulty = ")
                    .push_bind_unseparated(difficulty);
            }
            if let Some(confidence) = changes.confidence_level {
                fields
                    .push("confidence_level = ")
                    .push_bind_unseparated(confidence);
            }
            fields.push("updated_at = ").push_bind_unseparated(updated_at);
        }
        builder
            .push(" WHERE id = ")
            .push_bind(id)
            .push(" AND approval_status = 'pending'");

        let result = builder.build().execute(&self.pool).await?;
        Ok(result.rows_affected() == 1)
    }

    /// Deletes a pending experience; rounds and questions follow through `ON DELETE CASCADE`.
    pub async fn delete_pending(&self, id: ExperienceId) -> Result<bool, StoreError> {
        let result =
            sqlx::query("DELETE FROM experiences WHERE id = ? AND approval_status = 'pending'")
                .bind(id)
                .execute(&self.pool)
                .await?;
        Ok(result.rows_affected() == 1)
    }

    pub async fn status_counts(&self) -> Result<StatusSummary, StoreError> {
        let rows: Vec<(String, i64)> = sqlx::query_as(
            "SELECT approval_status, COUNT(*) FROM experiences GROUP BY approval_status",
        )
        .fetch_all(&self.pool)
        .await?;

        let mut summary = StatusSummary::default();
        for (raw, count) in rows {
            match ApprovalStatus::parse(&raw) {
                Some(ApprovalStatus::Pending) => summary.pending += count,
                Some(ApprovalStatus::Approved) => summary.approved += count,
                Some(ApprovalStatus::Rejected) => summary.rejected += count,
                None => {
                    return Err(StoreError::Corrupt(format!(
                        "{count} experiences have approval status '{raw}'"
                    )))
                }
            }
            summary.total += count;
        }
        Ok(summary)
    }
}

fn paginate(
    rows: Vec<SummaryRow>,
    total: i64,
    page: Page,
) -> Result<Paginated<ExperienceSummary>, StoreError> {
    let data = rows
        .into_iter()
        .map(ExperienceSummary::try_from)
        .collect::<Result<Vec<_>, _>>()?;
    Ok(Paginated { data, total, page })
}

async fn fetch_in(
    conn: &mut SqliteConnection,
    id: ExperienceId,
) -> Result<Option<ExperienceRecord>, StoreError> {
    let row = sqlx::query_as::<_, ExperienceRow>(&format!(
        "SELECT {EXPERIENCE_COLUMNS} FROM experiences WHERE id = ?"
    ))
    .bind(id)
    .fetch_optional(&mut *conn)
    .await?;

    row.map(ExperienceRecord::try_from).transpose()
}

async fn insert_tree_in(
    conn: &mut SqliteConnection,
    owner: UserId,
    submission: &ValidatedSubmission,
    submitted_at: DateTime<Utc>,
) -> Result<SubmissionReceipt, StoreError> {
    if let Some(drive_id) = submission.drive_id {
        let exists: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM drives WHERE id = ?")
            .bind(drive_id)
            .fetch_one(&mut *conn)
            .await?;
        if exists == 0 {
            return Err(StoreError::MissingReference(format!(
                "drive {drive_id} does not exist"
            )));
        }
    }

    let experience_id = sqlx::query(
        "INSERT INTO experiences (user_id, drive_id, company_name, role_applied, result, \
         selected, offer_received, ctc_offered, is_anonymous, approval_status, \
         interview_duration, overall_difficulty, overall_feedback, confidence_level, \
         submitted_at, created_at, updated_at) \
         VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, 'pending', ?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(owner)
    .bind(submission.drive_id)
    .bind(&submission.company_name)
    .bind(&submission.role_applied)
    .bind(submission.result)
    .bind(submission.selected)
    .bind(submission.offer_received)
    .bind(submission.ctc_offered)
    .bind(submission.is_anonymous)
    .bind(submission.interview_duration)
    .bind(submission.overall_difficulty)
    .bind(&submission.overall_feedback)
    .bind(submission.confidence_level)
    .bind(submitted_at)
    .bind(submitted_at)
    .bind(submitted_at)
    .execute(&mut *conn)
    .await?
    .last_insert_rowid();

    for round in &submission.rounds {
        insert_round(conn, experience_id, round, submitted_at).await?;
    }

    Ok(SubmissionReceipt {
        id: ExperienceId(experience_id),
        company_name: submission.company_name.clone(),
        role_applied: submission.role_applied.clone(),
        approval_status: ApprovalStatus::Pending,
        submitted_at,
    })
}

async fn insert_round(
    conn: &mut SqliteConnection,
    experience_id: i64,
    round: &ValidatedRound,
    created_at: DateTime<Utc>,
) -> Result<(), StoreError> {
    let round_id = sqlx::query(
        "INSERT INTO rounds (experience_id, round_number, round_type, duration_minutes, result, \
         round_date, topics, difficulty_level, problem_statement, approach_used, code_snippet, \
         tips_and_insights, interviewer_feedback, skills_tested, created_at, updated_at) \
         VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(experience_id)
    .bind(round.round_number)
    .bind(round.round_type)
    .bind(round.duration_minutes)
    .bind(round.result)
    .bind(round.round_date)
    .bind(serde_json::to_string(&round.topics)?)
    .bind(round.difficulty_level)
    .bind(&round.problem_statement)
    .bind(&round.approach_used)
    .bind(&round.code_snippet)
    .bind(&round.tips_and_insights)
    .bind(&round.interviewer_feedback)
    .bind(serde_json::to_string(&round.skills_tested)?)
    .bind(created_at)
    .bind(created_at)
    .execute(&mut *conn)
    .await?
    .last_insert_rowid();

    for question in &round.questions {
        sqlx::query(
            "INSERT INTO questions (round_id, question_text, category, subcategory, difficulty, \
             answer_provided, answer_quality, is_common, created_at) \
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(round_id)
        .bind(&question.question_text)
        .bind(&question.category)
        .bind(&question.subcategory)
        .bind(question.difficulty)
        .bind(question.answer_provided)
        .bind(question.answer_quality)
        .bind(question.is_common)
        .bind(created_at)
        .execute(&mut *conn)
        .await?;
    }

    Ok(())
}
