//! Integration tests for the user listing, per-user adjustments and bulk grants.

use axum::http::StatusCode;

use aiq_integration_tests::{TestApp, body_text, location};

// ============================================================================
// Listing
// ============================================================================

#[tokio::test]
async fn test_users_listing_is_fetched_on_every_visit() {
    let app = TestApp::new();
    let cookie = app.login().await.expect("login failed");

    let resp = app.get("/users", Some(&cookie)).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let body = body_text(resp).await;
    assert!(body.contains("Somchai"));
    assert!(body.contains("Pim"));

    app.get("/users", Some(&cookie)).await;
    assert_eq!(app.backend.count("list_users"), 2);

    let resp = app
        .get("/users?credit_filter=high-credits", Some(&cookie))
        .await;
    let body = body_text(resp).await;
    assert!(body.contains("Pim"));
    assert!(!body.contains("Somchai"));
    assert_eq!(app.backend.count("list_users"), 3);
}

#[tokio::test]
async fn test_unknown_filter_lists_everyone() {
    let app = TestApp::new();
    let cookie = app.login().await.expect("login failed");

    let resp = app.get("/users?credit_filter=bogus", Some(&cookie)).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let body = body_text(resp).await;
    assert!(body.contains("Somchai"));
    assert!(body.contains("Pim"));
}

// ============================================================================
// Per-user adjustment
// ============================================================================

#[tokio::test]
async fn test_adjust_credits_keeps_page_and_filter() {
    let app = TestApp::new();
    let cookie = app.login().await.expect("login failed");

    let resp = app
        .post_form(
            "/users/u2/credits",
            "amount=-2&reason=&page=1&credit_filter=low-credits",
            Some(&cookie),
        )
        .await;
    assert_eq!(resp.status(), StatusCode::SEE_OTHER);
    assert_eq!(
        location(&resp),
        Some("/users?page=1&credit_filter=low-credits")
    );
    assert_eq!(app.backend.count("adjust_user_credits"), 1);
    assert_eq!(app.backend.credits_of("u2"), Some(1));

    let resp = app
        .get("/users?page=1&credit_filter=low-credits", Some(&cookie))
        .await;
    assert!(body_text(resp).await.contains("Deducted 2 credits for user u2"));
}

#[tokio::test]
async fn test_adjust_credits_rejects_zero_without_calling_backend() {
    let app = TestApp::new();
    let cookie = app.login().await.expect("login failed");

    let resp = app
        .post_form("/users/u1/credits", "amount=0&reason=oops", Some(&cookie))
        .await;
    assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let body = body_text(resp).await;
    assert!(body.contains("amount must not be zero"));
    assert!(body.contains("value=\"oops\""));
    assert_eq!(app.backend.count("adjust_user_credits"), 0);
}

#[tokio::test]
async fn test_adjust_credits_shows_backend_error_inline() {
    let app = TestApp::new();
    let cookie = app.login().await.expect("login failed");

    let resp = app
        .post_form("/users/missing/credits", "amount=5", Some(&cookie))
        .await;
    assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);
    assert!(body_text(resp).await.contains("User not found"));
}

// ============================================================================
// Bulk grant
// ============================================================================

#[tokio::test]
async fn test_bulk_grant_refreshes_credit_views() {
    let app = TestApp::new();
    let cookie = app.login().await.expect("login failed");

    app.get("/users", Some(&cookie)).await;
    app.get("/credits", Some(&cookie)).await;
    app.backend.reset_calls();

    let resp = app
        .post_form(
            "/credits/bulk-add",
            "user_ids=u1%2C+u2%2C&amount=25&reason=promo",
            Some(&cookie),
        )
        .await;
    assert_eq!(resp.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&resp), Some("/credits"));
    assert_eq!(app.backend.calls(), ["bulk_add_credits"]);
    assert_eq!(app.backend.credits_of("u1"), Some(25));
    assert_eq!(app.backend.credits_of("u2"), Some(28));

    let resp = app.get("/credits", Some(&cookie)).await;
    let body = body_text(resp).await;
    assert!(body.contains("Granted 25 credits to 2 users"));
    assert!(body.contains("promo"));
    assert_eq!(app.backend.count("list_transactions"), 1);
    assert_eq!(app.backend.count("credit_stats"), 1);

    app.get("/users", Some(&cookie)).await;
    assert_eq!(app.backend.count("list_users"), 1);

    // The flash is shown once.
    let resp = app.get("/credits", Some(&cookie)).await;
    assert!(!body_text(resp).await.contains("Granted 25 credits"));
}

#[tokio::test]
async fn test_bulk_grant_validation_keeps_input() {
    let app = TestApp::new();
    let cookie = app.login().await.expect("login failed");

    let resp = app
        .post_form(
            "/credits/bulk-add",
            "user_ids=u1&amount=lots&reason=promo",
            Some(&cookie),
        )
        .await;
    assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let body = body_text(resp).await;
    assert!(body.contains("amount must be a whole number"));
    assert!(body.contains("value=\"promo\""));
    assert_eq!(app.backend.count("bulk_add_credits"), 0);
}

#[tokio::test]
async fn test_bulk_grant_requires_users() {
    let app = TestApp::new();
    let cookie = app.login().await.expect("login failed");

    let resp = app
        .post_form("/credits/bulk-add", "user_ids=+%2C+&amount=5", Some(&cookie))
        .await;
    assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);
    assert!(body_text(resp).await.contains("enter at least one user id"));
    assert_eq!(app.backend.count("bulk_add_credits"), 0);
}
