use super::common::*;
use crate::pagination::Page;
use crate::workflows::experiences::domain::{ApprovalStatus, ExperienceId};
use crate::workflows::experiences::ExperienceError;

#[tokio::test]
async fn owner_listing_pages_through_forty_five_rows() {
    let harness = harness().await;
    let mut ids = Vec::new();
    for index in 0..45 {
        ids.push(harness.submit(submission(&format!("Company {index}"), Vec::new())).await);
    }

    let first = harness
        .service
        .list_for_owner(harness.student, Page::new(Some(1), Some(20)))
        .await
        .expect("first page");
    assert_eq!(first.data.len(), 20);
    let meta = first.meta();
    assert_eq!(meta.total, 45);
    assert_eq!(meta.pages, 3);
    assert_eq!(first.data[0].id, *ids.last().expect("ids"));

    let last = harness
        .service
        .list_for_owner(harness.student, Page::new(Some(3), Some(20)))
        .await
        .expect("last page");
    assert_eq!(last.data.len(), 5);
    assert_eq!(last.data[4].id, ids[0]);

    let clamped = harness
        .service
        .list_for_owner(harness.student, Page::new(Some(1), Some(1000)))
        .await
        .expect("clamped page");
    assert_eq!(clamped.meta().limit, 100);
    assert_eq!(clamped.data.len(), 45);
}

#[tokio::test]
async fn owner_listing_excludes_other_students() {
    let harness = harness().await;
    harness.submit(acme()).await;
    harness
        .service
        .submit(harness.classmate, acme())
        .await
        .expect("classmate submits");

    let page = harness
        .service
        .list_for_owner(harness.classmate, Page::default())
        .await
        .expect("listing");
    assert_eq!(page.total, 1);
    assert_eq!(page.data[0].user_id, harness.classmate);
}

#[tokio::test]
async fn status_listing_and_summary_follow_review_decisions() {
    let harness = harness().await;
    let approved = harness.submit(acme()).await;
    let rejected = harness.submit(acme()).await;
    let pending = harness.submit(acme()).await;
    harness
        .service
        .approve(approved, harness.admin, None)
        .await
        .expect("approved");
    harness
        .service
        .reject(rejected, harness.admin, None)
        .await
        .expect("rejected");

    let queue = harness
        .service
        .list_by_status(ApprovalStatus::Pending, Page::default())
        .await
        .expect("pending queue");
    let queued: Vec<ExperienceId> = queue.data.iter().map(|row| row.id).collect();
    assert_eq!(queued, vec![pending]);

    let summary = harness.service.status_summary().await.expect("summary");
    assert_eq!(
        (summary.pending, summary.approved, summary.rejected, summary.total),
        (1, 1, 1, 3)
    );
}

#[tokio::test]
async fn legacy_accepted_rows_read_as_approved() {
    let harness = harness().await;
    let id = harness.submit(acme()).await;
    sqlx::query("UPDATE experiences SET approval_status = 'accepted' WHERE id = ?")
        .bind(id)
        .execute(harness.store.pool())
        .await
        .expect("legacy status written");

    let approved = harness
        .service
        .list_by_status(ApprovalStatus::Approved, Page::default())
        .await
        .expect("approved listing");
    assert_eq!(approved.total, 1);
    assert_eq!(approved.data[0].approval_status, ApprovalStatus::Approved);

    let summary = harness.service.status_summary().await.expect("summary");
    assert_eq!(summary.approved, 1);
}

#[tokio::test]
async fn other_students_only_see_approved_submissions() {
    let harness = harness().await;
    let id = harness.submit(acme()).await;

    match harness
        .service
        .detail(id, harness.classmate_identity())
        .await
    {
        Err(ExperienceError::NotFound(missing)) => assert_eq!(missing, id),
        other => panic!("pending submission leaked: {other:?}"),
    }

    harness
        .service
        .approve(id, harness.admin, None)
        .await
        .expect("approved");
    let detail = harness
        .service
        .detail(id, harness.classmate_identity())
        .await
        .expect("approved submission is visible");
    assert_eq!(detail.experience.user_id, Some(harness.student));
    assert_eq!(detail.rounds.len(), 1);
}

#[tokio::test]
async fn anonymous_submitters_are_hidden_from_other_students() {
    let harness = harness().await;
    let mut payload = acme();
    payload.is_anonymous = true;
    let id = harness.submit(payload).await;
    harness
        .service
        .approve(id, harness.admin, None)
        .await
        .expect("approved");

    let public = harness
        .service
        .detail(id, harness.classmate_identity())
        .await
        .expect("visible");
    assert_eq!(public.experience.user_id, None);

    let own = harness
        .service
        .detail(id, harness.student_identity())
        .await
        .expect("owner view");
    assert_eq!(own.experience.user_id, Some(harness.student));

    let admin = harness
        .service
        .detail(id, harness.admin_identity())
        .await
        .expect("admin view");
    assert_eq!(admin.experience.user_id, Some(harness.student));
}
