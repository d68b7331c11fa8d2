use axum::Router;
use axum::http::StatusCode;
use roomstay::testing::{get, post};
use roomstay::{
    App, AppState, Config, ConfigBuilder, CsrfConfig, CsrfToken, DirectorySource,
    STATIC_CACHE_CONTROL,
};
use std::sync::Arc;

const CSRF_COOKIE: &str = "__csrf_token";
const SESSION_COOKIE: &str = "roomstay_session";

fn templates_dir() -> String {
    format!("{}/templates", env!("CARGO_MANIFEST_DIR"))
}

fn router_with(config: Config) -> Router {
    let state = AppState::builder(config)
        .with_template_source(Arc::new(DirectorySource::new(templates_dir())))
        .build();
    App::new(state).into_test_router().unwrap()
}

fn router() -> Router {
    router_with(ConfigBuilder::new().build().unwrap())
}

/// GET a form page and return (cookies to send back, token to submit)
async fn fetch_token(app: &Router, path: &str) -> (Vec<(String, String)>, String) {
    let response = get(app.clone(), path).execute().await.assert_ok();
    let token = response.set_cookie(CSRF_COOKIE).expect("token cookie");
    (response.cookies(), token)
}

#[tokio::test]
async fn test_get_issues_cookie_and_embeds_token() {
    let response = get(router(), "/search-availability")
        .execute()
        .await
        .assert_ok();

    let header = response.set_cookie_header(CSRF_COOKIE).unwrap();
    assert!(header.contains("HttpOnly"));
    assert!(header.contains("SameSite=Strict"));
    assert!(header.contains("Path=/"));
    assert!(header.contains("Max-Age=43200"));
    assert!(!header.contains("Secure"));

    let cookie_token = response.set_cookie(CSRF_COOKIE).unwrap();
    assert!(CsrfToken::parse(&cookie_token).is_some());
    assert_eq!(response.form_token(), Some(cookie_token));
}

#[tokio::test]
async fn test_existing_token_is_reused() {
    let app = router();
    let (cookies, token) = fetch_token(&app, "/search-availability").await;

    let response = get(app, "/search-availability")
        .cookies(&cookies)
        .execute()
        .await
        .assert_ok();

    assert!(response.set_cookie(CSRF_COOKIE).is_none());
    assert_eq!(response.form_token(), Some(token));
}

#[tokio::test]
async fn test_malformed_cookie_is_reissued() {
    let response = get(router(), "/search-availability")
        .cookie(CSRF_COOKIE, "not-a-token")
        .execute()
        .await
        .assert_ok();

    let fresh = response.set_cookie(CSRF_COOKIE).unwrap();
    assert_ne!(fresh, "not-a-token");
    assert_eq!(response.form_token(), Some(fresh));
}

#[tokio::test]
async fn test_prod_cookies_are_secure() {
    let config = ConfigBuilder::new()
        .with_environment(roomstay::Environment::Prod)
        .build()
        .unwrap();
    let response = get(router_with(config), "/contact")
        .execute()
        .await
        .assert_ok();

    assert!(response.set_cookie_header(CSRF_COOKIE).unwrap().contains("Secure"));
}

#[tokio::test]
async fn test_post_with_form_token_succeeds() {
    let app = router();
    let (cookies, token) = fetch_token(&app, "/search-availability").await;

    post(app, "/search-availability")
        .cookies(&cookies)
        .form(&[
            ("csrf_token", token.as_str()),
            ("start_date", "2026-07-01"),
            ("end_date", "2026-07-04"),
        ])
        .execute()
        .await
        .assert_ok()
        .assert_contains("Choose Your Room")
        .assert_contains("/choose-room/1");
}

#[tokio::test]
async fn test_post_with_header_token_succeeds() {
    let app = router();
    let (cookies, token) = fetch_token(&app, "/search-availability").await;

    post(app, "/search-availability")
        .cookies(&cookies)
        .header("X-CSRF-Token", &token)
        .form(&[("start_date", "2026-07-01"), ("end_date", "2026-07-04")])
        .execute()
        .await
        .assert_ok();
}

#[tokio::test]
async fn test_post_without_cookie_is_forbidden() {
    let token = CsrfToken::generate().unwrap();

    let response = post(router(), "/search-availability")
        .form(&[("csrf_token", token.as_str()), ("start_date", "2026-07-01")])
        .execute()
        .await
        .assert_forbidden();

    assert_eq!(response.body_string(), "Forbidden: Invalid CSRF token");
}

#[tokio::test]
async fn test_post_without_submitted_token_is_forbidden() {
    let app = router();
    let (cookies, _) = fetch_token(&app, "/search-availability").await;

    post(app, "/search-availability")
        .cookies(&cookies)
        .form(&[("start_date", "2026-07-01"), ("end_date", "2026-07-04")])
        .execute()
        .await
        .assert_forbidden();
}

#[tokio::test]
async fn test_tampered_token_is_forbidden() {
    let app = router();
    let (cookies, token) = fetch_token(&app, "/search-availability").await;
    let other = CsrfToken::generate().unwrap();
    assert_ne!(other.as_str(), token);

    post(app, "/search-availability")
        .cookies(&cookies)
        .form(&[("csrf_token", other.as_str())])
        .execute()
        .await
        .assert_forbidden()
        .assert_not_contains("Choose Your Room");
}

#[tokio::test]
async fn test_token_survives_successful_post() {
    let app = router();
    let (cookies, token) = fetch_token(&app, "/search-availability").await;
    let form = [
        ("csrf_token", token.as_str()),
        ("start_date", "2026-07-01"),
        ("end_date", "2026-07-04"),
    ];

    for _ in 0..2 {
        let response = post(app.clone(), "/search-availability")
            .cookies(&cookies)
            .form(&form)
            .execute()
            .await
            .assert_ok();
        assert!(response.set_cookie(CSRF_COOKIE).is_none());
    }
}

#[tokio::test]
async fn test_redirect_mode_flashes_error_once() {
    let config = ConfigBuilder::new()
        .with_csrf(
            CsrfConfig::builder()
                .redirect_on_failure()
                .failure_message("Please submit the form again")
                .build(),
        )
        .build()
        .unwrap();
    let app = router_with(config);
    let (mut cookies, _) = fetch_token(&app, "/search-availability").await;

    let rejected = post(app.clone(), "/search-availability")
        .cookies(&cookies)
        .form(&[("csrf_token", "forged"), ("start_date", "2026-07-01")])
        .execute()
        .await
        .assert_redirect_to("/search-availability");
    let session = rejected.set_cookie(SESSION_COOKIE).expect("session cookie");
    cookies.push((SESSION_COOKIE.to_string(), session));

    get(app.clone(), "/search-availability")
        .cookies(&cookies)
        .execute()
        .await
        .assert_ok()
        .assert_contains("Please submit the form again");

    get(app, "/search-availability")
        .cookies(&cookies)
        .execute()
        .await
        .assert_ok()
        .assert_not_contains("Please submit the form again");
}

#[tokio::test]
async fn test_oversized_form_is_rejected() {
    let config = ConfigBuilder::new().with_max_body_size(64).build().unwrap();
    let app = router_with(config);
    let (cookies, token) = fetch_token(&app, "/search-availability").await;
    let padding = "x".repeat(256);

    let response = post(app, "/search-availability")
        .cookies(&cookies)
        .form(&[("csrf_token", token.as_str()), ("comment", padding.as_str())])
        .execute()
        .await;

    assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
}

#[tokio::test]
async fn test_security_headers_on_pages() {
    get(router(), "/")
        .execute()
        .await
        .assert_ok()
        .assert_header("x-content-type-options", "nosniff")
        .assert_header("x-frame-options", "DENY")
        .assert_header("x-xss-protection", "1; mode=block")
        .assert_header("referrer-policy", "strict-origin-when-cross-origin");
}

#[tokio::test]
async fn test_static_files_are_cacheable() {
    let config = ConfigBuilder::new()
        .with_static_dir(format!("{}/static", env!("CARGO_MANIFEST_DIR")))
        .build()
        .unwrap();

    get(router_with(config), "/static/css/styles.css")
        .execute()
        .await
        .assert_ok()
        .assert_header("cache-control", STATIC_CACHE_CONTROL)
        .assert_header("x-content-type-options", "nosniff")
        .assert_no_header("set-cookie");
}

#[tokio::test]
async fn test_health_reports_json() {
    let response = get(router(), "/health").execute().await.assert_ok();
    let body: serde_json::Value = response.json();

    assert_eq!(body["status"], "available");
    assert_eq!(body["version"], env!("CARGO_PKG_VERSION"));
    assert!(body["uptime"].as_str().unwrap().ends_with('s'));
    assert!(body["timestamp"].is_string());
}
