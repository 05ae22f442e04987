//! Lifecycle tests for the review service.
//!
//! These go through the public API only: callers authenticate with signed
//! bearer tokens exactly as HTTP clients do.

use std::sync::Arc;

use hotel_reviews::{
    issue_token, mean_rating, AccessGuard, Claims, Hotel, HotelId, InMemoryHotelCatalog,
    InMemoryReviewStore, ModerationDecision, Rating, ReviewError, ReviewService, ReviewStatus,
    ReviewVisibility, SigningSecret, SubmitReview, TokenVerifier, UserId, VerificationMode,
};
use http::header::AUTHORIZATION;
use http::{HeaderMap, HeaderValue};
use proptest::prelude::*;

/// Test signing secret
const TEST_SECRET: &[u8] = b"test_secret_for_review_lifecycle";

const HOTEL: &str = "grand-luxury";

// ─────────────────────────────────────────────────────────────────────────────
// Test Helpers
// ─────────────────────────────────────────────────────────────────────────────

fn secret() -> SigningSecret {
    SigningSecret::new(TEST_SECRET.to_vec()).unwrap()
}

fn build_service(visibility: ReviewVisibility) -> ReviewService<InMemoryReviewStore> {
    let verifier = TokenVerifier::new(VerificationMode::cached(Some(secret())));
    let catalog = InMemoryHotelCatalog::new()
        .with_hotel(Hotel::new(HotelId::new(HOTEL), "Grand Luxury Hotel", "", "Paris, France"))
        .with_hotel(Hotel::new(
            HotelId::new("city-comfort"),
            "City Comfort Inn",
            "",
            "New York, USA",
        ));
    ReviewService::with_visibility(
        AccessGuard::new(Arc::new(verifier)),
        Arc::new(InMemoryReviewStore::new()),
        Arc::new(catalog),
        visibility,
    )
}

fn bearer(token: &str) -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(AUTHORIZATION, HeaderValue::from_str(&format!("Bearer {}", token)).unwrap());
    headers
}

fn headers_for(user: &str) -> HeaderMap {
    let now = chrono::Utc::now().timestamp();
    let token = issue_token(&secret(), &Claims::new(UserId::new(user), now, now + 3600)).unwrap();
    bearer(&token)
}

async fn submit(service: &ReviewService<InMemoryReviewStore>, user: &str, rating: i64) {
    service
        .submit(&headers_for(user), SubmitReview::new(HOTEL, rating, ""))
        .await
        .unwrap();
}

// ─────────────────────────────────────────────────────────────────────────────
// Submission
// ─────────────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn submitted_review_reads_back_pending_without_response() {
    let service = build_service(ReviewVisibility::All);

    let created = service
        .submit(&headers_for("u1"), SubmitReview::new(HOTEL, 4, "Great stay"))
        .await
        .unwrap();
    assert_eq!(created.status, ReviewStatus::Pending);
    assert!(created.response.is_none());

    let listed = service.list_reviews(&HotelId::new(HOTEL)).await.unwrap();
    assert_eq!(listed.len(), 1);
    let review = &listed[0];
    assert_eq!(review.id, created.id);
    assert_eq!(review.user_id.id.as_str(), "u1");
    assert_eq!(review.rating.value(), 4);
    assert_eq!(review.review_text, "Great stay");
    assert_eq!(review.status, ReviewStatus::Pending);
    assert!(review.response.is_none());
}

#[tokio::test]
async fn body_user_id_cannot_spoof_author() {
    let service = build_service(ReviewVisibility::All);
    let mut body = SubmitReview::new(HOTEL, 5, "");
    body.user_id = Some(serde_json::json!("victim"));

    let review = service.submit(&headers_for("attacker"), body).await.unwrap();
    assert_eq!(review.user_id.as_str(), "attacker");
}

#[tokio::test]
async fn rejected_credentials_leave_store_unchanged() {
    let service = build_service(ReviewVisibility::All);
    let now = chrono::Utc::now().timestamp();

    let wrong_secret = SigningSecret::new(b"another_secret".to_vec()).unwrap();
    let forged =
        issue_token(&wrong_secret, &Claims::new(UserId::new("u1"), now, now + 3600)).unwrap();
    let expired =
        issue_token(&secret(), &Claims::new(UserId::new("u1"), now - 7200, now - 3600)).unwrap();

    let cases = [
        (HeaderMap::new(), ReviewError::MissingCredential),
        (bearer(&forged), ReviewError::InvalidCredential(String::new())),
        (bearer(&expired), ReviewError::InvalidCredential(String::new())),
        (bearer("not-a-jwt"), ReviewError::InvalidCredential(String::new())),
    ];

    for (headers, expected) in cases {
        let err = service
            .submit(&headers, SubmitReview::new(HOTEL, 3, "should not persist"))
            .await
            .unwrap_err();
        assert_eq!(err.code(), expected.code());
    }

    assert_eq!(service.store().num_reviews(), 0);
}

#[tokio::test]
async fn out_of_range_rating_is_rejected() {
    let service = build_service(ReviewVisibility::All);

    for rating in [0, 6, -1, 100] {
        let err = service
            .submit(&headers_for("u1"), SubmitReview::new(HOTEL, rating, ""))
            .await
            .unwrap_err();
        assert!(matches!(err, ReviewError::Validation { field: "rating", .. }));
    }
    assert_eq!(service.store().num_reviews(), 0);
}

#[tokio::test]
async fn concurrent_submissions_are_all_recorded() {
    let service = Arc::new(build_service(ReviewVisibility::All));
    let n = 32;

    let handles: Vec<_> = (0..n)
        .map(|i| {
            let service = Arc::clone(&service);
            tokio::spawn(async move {
                let user = format!("user-{}", i);
                let request = SubmitReview::new(HOTEL, (i % 5) + 1, "concurrent");
                service.submit(&headers_for(&user), request).await
            })
        })
        .collect();

    for handle in handles {
        handle.await.unwrap().unwrap();
    }

    let listed = service.list_reviews(&HotelId::new(HOTEL)).await.unwrap();
    assert_eq!(listed.len(), n as usize);

    let mut ids: Vec<_> = listed.iter().map(|r| r.id).collect();
    ids.sort_by_key(|id| id.as_uuid());
    ids.dedup();
    assert_eq!(ids.len(), n as usize);
}

// ─────────────────────────────────────────────────────────────────────────────
// Aggregation
// ─────────────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn average_is_none_without_reviews() {
    let service = build_service(ReviewVisibility::All);
    assert_eq!(service.average_rating(&HotelId::new(HOTEL)).await.unwrap(), None);
    assert_eq!(service.average_rating(&HotelId::new("unknown")).await.unwrap(), None);
}

#[tokio::test]
async fn average_tracks_new_reviews() {
    let service = build_service(ReviewVisibility::All);
    for rating in [3, 5, 4] {
        submit(&service, "u1", rating).await;
    }
    assert_eq!(service.average_rating(&HotelId::new(HOTEL)).await.unwrap(), Some(4.0));

    submit(&service, "u2", 2).await;
    assert_eq!(service.average_rating(&HotelId::new(HOTEL)).await.unwrap(), Some(3.5));

    let summary = service.rating_summary(&HotelId::new(HOTEL)).await.unwrap();
    assert_eq!(summary.review_count, 4);
}

#[tokio::test]
async fn reviews_of_other_hotels_are_not_averaged() {
    let service = build_service(ReviewVisibility::All);
    submit(&service, "u1", 5).await;
    service
        .submit(&headers_for("u1"), SubmitReview::new("city-comfort", 1, ""))
        .await
        .unwrap();

    assert_eq!(service.average_rating(&HotelId::new(HOTEL)).await.unwrap(), Some(5.0));
    assert_eq!(service.list_reviews(&HotelId::new("city-comfort")).await.unwrap().len(), 1);
}

#[tokio::test]
async fn approved_only_visibility_applies_to_list_and_average() {
    let service = build_service(ReviewVisibility::ApprovedOnly);
    let approved = service
        .submit(&headers_for("u1"), SubmitReview::new(HOTEL, 4, "ok"))
        .await
        .unwrap();
    let rejected = service
        .submit(&headers_for("u2"), SubmitReview::new(HOTEL, 1, "bad"))
        .await
        .unwrap();
    submit(&service, "u3", 2).await;

    service.moderate(&approved.id, ModerationDecision::Approve, None).await.unwrap();
    service.moderate(&rejected.id, ModerationDecision::Reject, None).await.unwrap();

    let detail = service.hotel_reviews(&HotelId::new(HOTEL)).await.unwrap();
    assert_eq!(detail.reviews.len(), 1);
    assert_eq!(detail.reviews[0].id, approved.id);
    assert_eq!(detail.average_rating, Some(4.0));
}

// ─────────────────────────────────────────────────────────────────────────────
// Moderation
// ─────────────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn terminal_states_do_not_transition() {
    let service = build_service(ReviewVisibility::All);

    for decision in [ModerationDecision::Approve, ModerationDecision::Reject] {
        let review = service
            .submit(&headers_for("u1"), SubmitReview::new(HOTEL, 3, ""))
            .await
            .unwrap();
        let moderated = service
            .moderate(&review.id, decision, Some("Thank you".into()))
            .await
            .unwrap();
        assert!(moderated.status.is_terminal());
        assert!(moderated.moderated_at.is_some());

        for next in [ModerationDecision::Approve, ModerationDecision::Reject] {
            let err = service.moderate(&review.id, next, None).await.unwrap_err();
            assert!(matches!(err, ReviewError::InvalidTransition { .. }));
        }

        let listed = service.list_reviews(&HotelId::new(HOTEL)).await.unwrap();
        let shown = listed.iter().find(|r| r.id == review.id).unwrap();
        assert_eq!(shown.status, moderated.status);
        assert_eq!(shown.response.as_deref(), Some("Thank you"));
    }
}

#[tokio::test]
async fn moderating_unknown_review_is_not_found() {
    let service = build_service(ReviewVisibility::All);
    let err = service
        .moderate(&hotel_reviews::ReviewId::generate(), ModerationDecision::Approve, None)
        .await
        .unwrap_err();
    assert!(matches!(err, ReviewError::NotFound { entity: "review", .. }));
}

#[tokio::test]
async fn listing_resolves_registered_usernames() {
    let service = build_service(ReviewVisibility::All);
    service.store().register_user(UserId::new("u1"), "alice");
    submit(&service, "u1", 5).await;
    submit(&service, "u2", 4).await;

    let listed = service.list_reviews(&HotelId::new(HOTEL)).await.unwrap();
    assert_eq!(listed[0].user_id.username.as_deref(), Some("alice"));
    assert_eq!(listed[1].user_id.username, None);
}

#[tokio::test]
async fn listing_shows_username_from_token() {
    let service = build_service(ReviewVisibility::All);
    let now = chrono::Utc::now().timestamp();
    let claims = Claims::new(UserId::new("u7"), now, now + 3600).with_username("dana");
    let token = issue_token(&secret(), &claims).unwrap();

    service
        .submit(&bearer(&token), SubmitReview::new(HOTEL, 4, "named"))
        .await
        .unwrap();
    submit(&service, "u7", 5).await;

    let listed = service.list_reviews(&HotelId::new(HOTEL)).await.unwrap();
    assert_eq!(listed.len(), 2);
    for review in &listed {
        assert_eq!(review.user_id.id.as_str(), "u7");
        assert_eq!(review.user_id.username.as_deref(), Some("dana"));
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Properties
// ─────────────────────────────────────────────────────────────────────────────

proptest! {
    #[test]
    fn rating_accepts_exactly_one_to_five(value in -1000i64..1000) {
        let accepted = Rating::new(value).is_ok();
        prop_assert_eq!(accepted, (1..=5).contains(&value));
    }

    #[test]
    fn mean_stays_within_rating_bounds(values in proptest::collection::vec(1i64..=5, 1..200)) {
        let ratings: Vec<Rating> = values.iter().map(|v| Rating::new(*v).unwrap()).collect();
        let mean = mean_rating(&ratings).unwrap();
        prop_assert!((1.0..=5.0).contains(&mean));

        let expected = values.iter().sum::<i64>() as f64 / values.len() as f64;
        prop_assert!((mean - expected).abs() < 1e-9);
    }
}

#[test]
fn mean_of_nothing_is_none() {
    assert_eq!(mean_rating(&[]), None);
}
