//! Cart behaviour through the HTTP surface.

#![allow(clippy::unwrap_used)]

use axum::http::StatusCode;
use lunchbox_integration_tests::{TestApp, body_string, next_cookie, session_cookie};

const DOSA: &str = "item_id=masala-dosa&name=Masala+Dosa&price=100&canteen_id=C1&is_veg=true";
const CHAI: &str = "item_id=chai&name=Chai&price=10&canteen_id=C2";

#[tokio::test]
async fn test_add_item_returns_badge_and_trigger() {
    let app = TestApp::new().await;

    let response = app.post_form("/cart/add", DOSA, None).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()["hx-trigger"], "cart-updated");
    let cookie = session_cookie(&response).unwrap();
    assert_eq!(body_string(response).await.trim(), "1");

    let response = app.post_form("/cart/add", DOSA, Some(&cookie)).await;
    let cookie = next_cookie(&response, &cookie);
    assert_eq!(body_string(response).await.trim(), "2");

    let response = app.get("/cart/count", Some(&cookie)).await;
    assert_eq!(body_string(response).await.trim(), "2");
}

#[tokio::test]
async fn test_cart_page_shows_totals_with_tax() {
    let app = TestApp::new().await;
    let response = app.post_form("/cart/add", DOSA, None).await;
    let cookie = session_cookie(&response).unwrap();
    let response = app.post_form("/cart/add", DOSA, Some(&cookie)).await;
    let cookie = next_cookie(&response, &cookie);

    let response = app.get("/cart", Some(&cookie)).await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_string(response).await;
    assert!(body.contains("Masala Dosa"));
    assert!(body.contains("₹200.00"));
    assert!(body.contains("₹10.00"));
    assert!(body.contains("₹210.00"));
}

#[tokio::test]
async fn test_second_canteen_is_refused_with_notice() {
    let app = TestApp::new().await;
    let response = app.post_form("/cart/add", DOSA, None).await;
    let cookie = session_cookie(&response).unwrap();

    let response = app.post_form("/cart/add", CHAI, Some(&cookie)).await;
    assert_eq!(response.status(), StatusCode::CONFLICT);
    assert_eq!(
        body_string(response).await,
        "You can only order from one canteen at a time."
    );

    // The cart is unchanged
    let response = app.get("/cart/count", Some(&cookie)).await;
    assert_eq!(body_string(response).await.trim(), "1");
}

#[tokio::test]
async fn test_update_and_remove_return_items_fragment() {
    let app = TestApp::new().await;
    let response = app.post_form("/cart/add", DOSA, None).await;
    let cookie = session_cookie(&response).unwrap();

    let response = app
        .post_form("/cart/update", "item_id=masala-dosa&quantity=3", Some(&cookie))
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()["hx-trigger"], "cart-updated");
    let body = body_string(response).await;
    assert!(body.contains(r#"id="cart-items""#));
    assert!(body.contains("₹300.00"));

    let response = app
        .post_form("/cart/update", "item_id=masala-dosa&quantity=0", Some(&cookie))
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = app
        .post_form("/cart/remove", "item_id=masala-dosa", Some(&cookie))
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert!(body_string(response).await.contains("Your cart is empty."));

    // Empty again, so another canteen is fine
    let response = app.post_form("/cart/add", CHAI, Some(&cookie)).await;
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_clear_empties_cart() {
    let app = TestApp::new().await;
    let response = app.post_form("/cart/add", DOSA, None).await;
    let cookie = session_cookie(&response).unwrap();

    let response = app.post_form("/cart/clear", "", Some(&cookie)).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert!(body_string(response).await.contains("Your cart is empty."));

    let response = app.get("/cart/count", Some(&cookie)).await;
    assert_eq!(body_string(response).await.trim(), "");
}

#[tokio::test]
async fn test_unparseable_price_is_rejected() {
    let app = TestApp::new().await;
    let response = app
        .post_form(
            "/cart/add",
            "item_id=x&name=X&price=cheap&canteen_id=C1",
            None,
        )
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_oversized_amounts_are_refused() {
    let app = TestApp::new().await;
    let response = app
        .post_form(
            "/cart/add",
            "item_id=gold&name=Gold+Thali&price=79228162514264337593543950335&canteen_id=C1",
            None,
        )
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    // The largest accepted price still leaves room for any line quantity
    let response = app
        .post_form(
            "/cart/add",
            "item_id=feast&name=Feast&price=100000&canteen_id=C1",
            None,
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let cookie = session_cookie(&response).unwrap();

    let response = app
        .post_form("/cart/update", "item_id=feast&quantity=4000000000", Some(&cookie))
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert!(body_string(response).await.contains("₹400000000000000.00"));
}
