use std::sync::Arc;

use axum::response::Response;
use jsonwebtoken::{EncodingKey, Header};
use serde_json::Value;

use crate::auth::{Claims, Identity, Role, TokenVerifier};
use crate::store::Store;
use crate::users::{NewUser, UserId, UserRepository};
use crate::workflows::experiences::domain::{
    ExperienceId, ExperienceSubmission, QuestionSubmission, RoundSubmission, RoundType,
};
use crate::workflows::experiences::{
    experience_router, ExperienceRepository, ExperienceRouterState, ExperienceService,
};

pub(super) const SECRET: &str = "experience-test-secret";

pub(super) struct Harness {
    pub(super) store: Store,
    pub(super) service: Arc<ExperienceService>,
    pub(super) student: UserId,
    pub(super) classmate: UserId,
    pub(super) admin: UserId,
}

impl Harness {
    pub(super) fn router(&self) -> axum::Router {
        experience_router(ExperienceRouterState {
            service: self.service.clone(),
            tokens: Arc::new(TokenVerifier::new(SECRET)),
        })
    }

    pub(super) fn student_identity(&self) -> Identity {
        Identity {
            user_id: self.student,
            role: Role::Student,
        }
    }

    pub(super) fn classmate_identity(&self) -> Identity {
        Identity {
            user_id: self.classmate,
            role: Role::Student,
        }
    }

    pub(super) fn admin_identity(&self) -> Identity {
        Identity {
            user_id: self.admin,
            role: Role::Admin,
        }
    }

    /// Submits `payload` as the primary student and returns the new id.
    pub(super) async fn submit(&self, payload: ExperienceSubmission) -> ExperienceId {
        self.service
            .submit(self.student, payload)
            .await
            .expect("submission accepted")
            .id
    }

    pub(super) async fn row_counts(&self) -> (i64, i64, i64) {
        let mut counts = Vec::new();
        for table in ["experiences", "rounds", "questions"] {
            let count: i64 = sqlx::query_scalar(&format!("SELECT COUNT(*) FROM {table}"))
                .fetch_one(self.store.pool())
                .await
                .expect("count rows");
            counts.push(count);
        }
        (counts[0], counts[1], counts[2])
    }

    pub(super) async fn insert_drive(&self) -> i64 {
        let company = sqlx::query(
            "INSERT INTO companies (name, industry, created_at) VALUES ('Acme', 'Software', ?)",
        )
        .bind(chrono::Utc::now())
        .execute(self.store.pool())
        .await
        .expect("company inserted")
        .last_insert_rowid();

        sqlx::query(
            "INSERT INTO drives (company_id, role_name, interview_date, created_at) \
             VALUES (?, 'SDE', '2025-02-10', ?)",
        )
        .bind(company)
        .bind(chrono::Utc::now())
        .execute(self.store.pool())
        .await
        .expect("drive inserted")
        .last_insert_rowid()
    }
}

fn new_user(email: &str, role: Role) -> NewUser {
    NewUser {
        email: email.to_string(),
        first_name: "Test".to_string(),
        last_name: role.label().to_string(),
        role,
        department: Some("CSE".to_string()),
        batch_year: Some(2025),
    }
}

pub(super) async fn harness() -> Harness {
    let store = Store::in_memory().await.expect("store opens");
    store.migrate().await.expect("migrations apply");

    let users = UserRepository::new(store.pool().clone());
    let student = users
        .create(new_user("asha@campus.edu", Role::Student))
        .await
        .expect("student")
        .id;
    let classmate = users
        .create(new_user("ravi@campus.edu", Role::Student))
        .await
        .expect("classmate")
        .id;
    let admin = users
        .create(new_user("tpo@campus.edu", Role::Admin))
        .await
        .expect("admin")
        .id;

    let service = Arc::new(ExperienceService::new(ExperienceRepository::new(
        store.pool().clone(),
    )));

    Harness {
        store,
        service,
        student,
        classmate,
        admin,
    }
}

pub(super) fn round(round_type: RoundType, questions: &[&str]) -> RoundSubmission {
    let round_type = serde_json::to_value(round_type).expect("round type encodes");
    RoundSubmission {
        round_type: round_type.as_str().map(str::to_string),
        duration_minutes: Some(45),
        topics: vec!["Arrays".to_string(), "Hashing".to_string()],
        skills_tested: vec!["Problem solving".to_string()],
        tips_and_insights: Some("Think aloud".to_string()),
        questions_list: questions
            .iter()
            .map(|text| QuestionSubmission {
                question_text: text.to_string(),
                category: Some("DSA".to_string()),
                ..QuestionSubmission::default()
            })
            .collect(),
        ..RoundSubmission::default()
    }
}

pub(super) fn submission(company: &str, rounds: Vec<RoundSubmission>) -> ExperienceSubmission {
    ExperienceSubmission {
        company_name: company.to_string(),
        role_applied: "SDE".to_string(),
        result: Some("pass".to_string()),
        rounds,
        ..ExperienceSubmission::default()
    }
}

/// The single-round Acme submission used across scenarios.
pub(super) fn acme() -> ExperienceSubmission {
    submission(
        "Acme",
        vec![round(RoundType::Technical, &["Reverse a linked list"])],
    )
}

pub(super) fn token(user: UserId, role: Role, expires_in: i64) -> String {
    let exp = (chrono::Utc::now().timestamp() + expires_in) as usize;
    jsonwebtoken::encode(
        &Header::default(),
        &Claims {
            sub: user.0,
            role,
            exp,
        },
        &EncodingKey::from_secret(SECRET.as_bytes()),
    )
    .expect("token encodes")
}

pub(super) fn bearer(user: UserId, role: Role) -> String {
    format!("Bearer {}", token(user, role, 3600))
}

pub(super) async fn read_json_body(response: Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), 64 * 1024)
        .await
        .expect("read body");
    serde_json::from_slice(&body).expect("json payload")
}
