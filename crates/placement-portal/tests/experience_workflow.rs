use std::sync::Arc;

use axum::body::Body;
use axum::http::header::{AUTHORIZATION, CONTENT_TYPE};
use axum::http::{Request, StatusCode};
use axum::response::Response;
use axum::Router;
use jsonwebtoken::{EncodingKey, Header};
use placement_portal::auth::{Claims, Role, TokenVerifier};
use placement_portal::store::Store;
use placement_portal::users::{NewUser, UserId, UserRepository};
use placement_portal::workflows::experiences::{
    experience_router, ExperienceRepository, ExperienceRouterState, ExperienceService,
};
use serde_json::{json, Value};
use tower::ServiceExt;

const SECRET: &str = "workflow-secret";

fn bearer(user: UserId, role: Role) -> String {
    let exp = (chrono::Utc::now().timestamp() + 600) as usize;
    let token = jsonwebtoken::encode(
        &Header::default(),
        &Claims {
            sub: user.0,
            role,
            exp,
        },
        &EncodingKey::from_secret(SECRET.as_bytes()),
    )
    .expect("token encodes");
    format!("Bearer {token}")
}

fn user(email: &str, role: Role) -> NewUser {
    NewUser {
        email: email.to_string(),
        first_name: "Workflow".to_string(),
        last_name: "User".to_string(),
        role,
        department: None,
        batch_year: None,
    }
}

fn request(method: &str, uri: &str, auth: &str, body: Option<Value>) -> Request<Body> {
    let builder = Request::builder()
        .method(method)
        .uri(uri)
        .header(AUTHORIZATION, auth);
    match body {
        Some(body) => builder
            .header(CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string())),
        None => builder.body(Body::empty()),
    }
    .expect("request builds")
}

async fn send(router: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response: Response = router.clone().oneshot(request).await.expect("router responds");
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), 64 * 1024)
        .await
        .expect("read body");
    (status, serde_json::from_slice(&bytes).expect("json payload"))
}

#[tokio::test]
async fn anonymous_experience_moves_from_submission_to_public_view() {
    let store = Store::in_memory().await.expect("store opens");
    store.migrate().await.expect("migrations apply");

    let users = UserRepository::new(store.pool().clone());
    let author = users
        .create(user("author@campus.edu", Role::Student))
        .await
        .expect("author")
        .id;
    let junior = users
        .create(user("junior@campus.edu", Role::Junior))
        .await
        .expect("junior")
        .id;
    let admin = users
        .create(user("admin@campus.edu", Role::Admin))
        .await
        .expect("admin")
        .id;

    let router = experience_router(ExperienceRouterState {
        service: Arc::new(ExperienceService::new(ExperienceRepository::new(
            store.pool().clone(),
        ))),
        tokens: Arc::new(TokenVerifier::new(SECRET)),
    });

    let (status, created) = send(
        &router,
        request(
            "POST",
            "/api/student/experience",
            &bearer(author, Role::Student),
            Some(json!({
                "company_name": "Acme",
                "role_applied": "SDE",
                "result": "pass",
                "is_anonymous": true,
                "rounds": [
                    {
                        "round_type": "Coding",
                        "round_date": "2025-02-10",
                        "questions_list": [
                            { "question_text": "Merge k sorted lists", "difficulty": "hard" }
                        ]
                    },
                    { "round_type": "HR" }
                ]
            })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let id = created["data"]["id"].as_i64().expect("numeric id");

    let detail_uri = format!("/api/student/experience/{id}");
    let (status, _) = send(
        &router,
        request("GET", &detail_uri, &bearer(junior, Role::Junior), None),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, queue) = send(
        &router,
        request(
            "GET",
            "/api/admin/submissions/pending",
            &bearer(admin, Role::Admin),
            None,
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(queue["pagination"]["total"], json!(1));

    let (status, approved) = send(
        &router,
        request(
            "POST",
            &format!("/api/admin/submissions/{id}/approve"),
            &bearer(admin, Role::Admin),
            None,
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(approved["data"]["approval_status"], json!("approved"));

    let (status, public) = send(
        &router,
        request("GET", &detail_uri, &bearer(junior, Role::Junior), None),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert!(public["data"].get("user_id").is_none());
    assert_eq!(public["data"]["company_name"], json!("Acme"));
    let rounds = public["data"]["rounds"].as_array().expect("rounds");
    assert_eq!(rounds.len(), 2);
    assert_eq!(rounds[0]["round_type"], json!("Coding"));
    assert_eq!(rounds[0]["questions"][0]["difficulty"], json!("hard"));
    assert_eq!(rounds[1]["round_number"], json!(2));

    let (status, _) = send(
        &router,
        request(
            "DELETE",
            &detail_uri,
            &bearer(author, Role::Student),
            None,
        ),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    store.close().await;
}
