//! Login, logout and registration.

#![allow(clippy::unwrap_used)]

use std::sync::atomic::Ordering;

use axum::http::StatusCode;
use lunchbox_core::UserId;
use lunchbox_integration_tests::{
    FakeAuth, FakeRecipes, STUDENT_EMAIL, TestApp, body_string, location, session_cookie,
};

#[tokio::test]
async fn test_login_signs_student_in() {
    let app = TestApp::new().await;
    let cookie = app.login().await;

    let response = app.get("/", Some(&cookie)).await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_string(response).await;
    assert!(body.contains("Hi, Asha"));
    assert!(body.contains("Logout"));
}

#[tokio::test]
async fn test_login_page_failures_redirect_with_code() {
    let app = TestApp::new().await;

    let response = app.post_form("/auth/login", "email=&password=", None).await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/auth/login?login_error=missing");

    let response = app
        .post_form(
            "/auth/login",
            &format!("email={STUDENT_EMAIL}&password=wrong"),
            None,
        )
        .await;
    assert_eq!(location(&response), "/auth/login?login_error=credentials");

    let response = app
        .get("/auth/login?login_error=credentials", None)
        .await;
    assert!(body_string(response).await.contains("Invalid email or password."));
}

#[tokio::test]
async fn test_login_without_profile_row_fails() {
    let auth = FakeAuth::default();
    auth.add_account("no.profile@iiitdmj.ac.in", "pw-123456", "user-9");
    let app = TestApp::with(auth, FakeRecipes::default()).await;

    let response = app
        .post_form(
            "/auth/login",
            "email=no.profile%40iiitdmj.ac.in&password=pw-123456",
            None,
        )
        .await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/auth/login?login_error=profile");

    let body = body_string(app.get("/auth/login?login_error=profile", None).await).await;
    assert!(body.contains("your profile could not be loaded"));
}

#[tokio::test]
async fn test_overlay_failure_reopens_overlay_on_same_page() {
    let app = TestApp::new().await;

    let response = app
        .post_form(
            "/auth/login",
            &format!("email={STUDENT_EMAIL}&password=wrong&return_to=%2Fcanteens%3Fq%3Dnight"),
            None,
        )
        .await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/canteens?login_error=credentials");
    let cookie = session_cookie(&response).unwrap();

    let response = app
        .get("/canteens?login_error=credentials", Some(&cookie))
        .await;
    let body = body_string(response).await;
    assert!(body.contains(r#"role="dialog""#));
    assert!(body.contains("Invalid email or password."));
}

#[tokio::test]
async fn test_overlay_refuses_offsite_return_path() {
    let app = TestApp::new().await;
    let response = app
        .post_form(
            "/auth/login",
            "email=&password=&return_to=%2F%2Fevil.example",
            None,
        )
        .await;
    assert_eq!(location(&response), "/?login_error=missing");
}

#[tokio::test]
async fn test_modal_open_and_close() {
    let app = TestApp::new().await;

    let response = app
        .post_form("/modal/login/open", "return_to=%2Fcart", None)
        .await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/cart");
    let cookie = session_cookie(&response).unwrap();

    let body = body_string(app.get("/cart", Some(&cookie)).await).await;
    assert!(body.contains("Welcome back"));

    let response = app
        .post_form("/modal/login/close", "return_to=%2Fcart", Some(&cookie))
        .await;
    assert_eq!(location(&response), "/cart");

    let body = body_string(app.get("/cart", Some(&cookie)).await).await;
    assert!(!body.contains("Welcome back"));
}

#[tokio::test]
async fn test_logout_signs_out_and_flushes_session() {
    let app = TestApp::new().await;
    let cookie = app.login().await;

    let response = app.post_form("/auth/logout", "", Some(&cookie)).await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/");
    assert_eq!(app.auth.sign_out_calls.load(Ordering::SeqCst), 1);
    assert!(app.auth.is_revoked("access-0"));

    let body = body_string(app.get("/", Some(&cookie)).await).await;
    assert!(!body.contains("Hi, Asha"));
}

#[tokio::test]
async fn test_logout_survives_auth_service_outage() {
    let app = TestApp::new().await;
    let cookie = app.login().await;
    app.auth.set_offline(true);

    let response = app.post_form("/auth/logout", "", Some(&cookie)).await;
    assert_eq!(location(&response), "/");

    let body = body_string(app.get("/cart", Some(&cookie)).await).await;
    assert!(!body.contains("Hi, Asha"));
}

const VALID_FORM: &str = "email=ravi.kumar%40iiitdmj.ac.in&password=pw-123456\
    &full_name=Ravi+Kumar&phone=9123456780&gender=male&hostel_id=H1&preferred_canteen_id=C1";

#[tokio::test]
async fn test_registration_rejects_outside_domain_without_remote_call() {
    let app = TestApp::new().await;
    let form = VALID_FORM.replace("iiitdmj.ac.in", "gmail.com");

    let response = app.post_form("/auth/register", &form, None).await;
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let body = body_string(response).await;
    assert!(body.contains("Use your official college email only."));
    // Submitted values are kept, the password is not
    assert!(body.contains("Ravi Kumar"));
    assert!(!body.contains("pw-123456"));
    assert_eq!(app.auth.sign_up_calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_registration_rejects_male_in_girls_hostel() {
    let app = TestApp::new().await;
    let form = VALID_FORM.replace("hostel_id=H1", "hostel_id=H4");

    let response = app.post_form("/auth/register", &form, None).await;
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    assert!(
        body_string(response)
            .await
            .contains("Male students cannot select a girls")
    );
    assert_eq!(app.auth.sign_up_calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_registration_requires_preferred_canteen() {
    let app = TestApp::new().await;
    let form = VALID_FORM.replace("preferred_canteen_id=C1", "preferred_canteen_id=");

    let response = app.post_form("/auth/register", &form, None).await;
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    assert!(
        body_string(response)
            .await
            .contains("Please select your preferred canteen.")
    );
}

#[tokio::test]
async fn test_registration_creates_account_and_profile() {
    let app = TestApp::new().await;

    let response = app.post_form("/auth/register", VALID_FORM, None).await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_string(response).await;
    assert!(body.contains("Check your email"));
    assert!(body.contains("ravi.kumar@iiitdmj.ac.in"));

    let signed_up = app.auth.signed_up();
    assert_eq!(signed_up.len(), 1);
    assert_eq!(signed_up[0].full_name, "Ravi Kumar");

    let profile = app.auth.profile(&UserId::new("user-2")).unwrap();
    assert_eq!(profile.preferred_canteen_id.as_str(), "C1");
    assert_eq!(profile.role.as_str(), "student");
}

#[tokio::test]
async fn test_duplicate_registration_shows_service_message() {
    let app = TestApp::new().await;
    let form = VALID_FORM.replace("ravi.kumar%40", "asha.verma%40");

    let response = app.post_form("/auth/register", &form, None).await;
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    assert!(body_string(response).await.contains("User already registered"));
}

#[tokio::test]
async fn test_register_dropdown_fragments() {
    let app = TestApp::new().await;

    let body = body_string(app.get("/auth/register/hostels?gender=male", None).await).await;
    assert!(body.contains("Hall 1"));
    assert!(!body.contains("Hall 4"));

    let body = body_string(app.get("/auth/register/hostels?gender=female", None).await).await;
    assert!(body.contains("Hall 4"));

    let body = body_string(
        app.get("/auth/register/canteens?hostel_id=H4&gender=female", None)
            .await,
    )
    .await;
    assert!(body.contains("Hall 4 Night Mess"));
    assert!(body.contains("Juice Corner"));

    let body = body_string(
        app.get("/auth/register/canteens?hostel_id=H4&gender=male", None)
            .await,
    )
    .await;
    assert!(!body.contains("Hall 4 Night Mess"));

    let body = body_string(app.get("/auth/register/canteens", None).await).await;
    assert!(body.contains("Select canteen"));
    assert!(!body.contains("Juice Corner"));
}
