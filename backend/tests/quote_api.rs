use axum::{body::Body, http::StatusCode};
use serde_json::{json, Value};

mod support;

use support::{body_json, browser_request, json_request, TestApp};

fn valid_quote() -> Value {
    json!({
        "name": "Ada <b>Lovelace</b>",
        "email": "  Ada@Example.COM ",
        "phone": "+44 20 7946 0958",
        "company": "Analytical Engines",
        "services": ["web", "branding"],
        "challenge": "We need a new marketing site <script>alert(1)</script>before the launch.",
        "timeline": "one_to_three_months",
        "privacy_consent": true
    })
}

#[tokio::test]
async fn valid_submission_is_sanitized_and_stored() {
    let app = TestApp::new();
    let response = app
        .send(json_request("POST", "/api/quote", "9.9.9.9", &valid_quote()))
        .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let body = body_json(response).await;
    assert_eq!(body["success"], true);

    let rows = app.quotes.rows();
    assert_eq!(rows.len(), 1);
    let stored = &rows[0];
    assert_eq!(body["id"], stored.id.as_str());
    assert_eq!(stored.name, "Ada Lovelace");
    assert_eq!(stored.email, "ada@example.com");
    assert_eq!(stored.phone.as_deref(), Some("+442079460958"));
    assert!(!stored.challenge.contains("script"));
    assert_eq!(stored.timeline, "one_to_three_months");
    assert_eq!(stored.client_ip, "9.9.9.9");
}

#[tokio::test]
async fn filled_honeypot_pretends_success_and_stores_nothing() {
    let app = TestApp::new();
    let mut quote = valid_quote();
    quote["website"] = json!("http://spam.example");

    let response = app
        .send(json_request("POST", "/api/quote", "9.9.9.9", &quote))
        .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    assert_eq!(body_json(response).await, json!({ "success": true }));
    assert!(app.quotes.rows().is_empty());
}

#[tokio::test]
async fn missing_consent_is_rejected() {
    let app = TestApp::new();
    let mut quote = valid_quote();
    quote["privacy_consent"] = json!(false);

    let response = app
        .send(json_request("POST", "/api/quote", "9.9.9.9", &quote))
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["code"], "BAD_REQUEST");
    assert!(app.quotes.rows().is_empty());
}

#[tokio::test]
async fn invalid_fields_return_validation_errors() {
    let app = TestApp::new();
    let mut quote = valid_quote();
    quote["email"] = json!("not-an-email");
    quote["challenge"] = json!("too short");

    let response = app
        .send(json_request("POST", "/api/quote", "9.9.9.9", &quote))
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = body_json(response).await;
    assert_eq!(body["code"], "VALIDATION_ERROR");
    assert!(app.quotes.rows().is_empty());
}

#[tokio::test]
async fn malformed_json_is_a_400() {
    let app = TestApp::new();
    let response = app
        .send(
            browser_request("POST", "/api/quote", "9.9.9.9")
                .header("content-type", "application/json")
                .body(Body::from("{\"name\":"))
                .unwrap(),
        )
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn sixth_submission_from_one_client_is_rate_limited() {
    let app = TestApp::new();
    for attempt in 1..=5 {
        let response = app
            .send(json_request("POST", "/api/quote", "9.9.9.9", &valid_quote()))
            .await;
        assert_eq!(response.status(), StatusCode::CREATED, "attempt {}", attempt);
    }

    let response = app
        .send(json_request("POST", "/api/quote", "9.9.9.9", &valid_quote()))
        .await;
    assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(app.quotes.rows().len(), 5);

    let response = app
        .send(json_request("POST", "/api/quote", "8.8.8.8", &valid_quote()))
        .await;
    assert_eq!(response.status(), StatusCode::CREATED);
}

#[tokio::test]
async fn stored_quotes_show_up_as_leads() {
    let app = TestApp::new();
    app.send(json_request("POST", "/api/quote", "9.9.9.9", &valid_quote()))
        .await;

    let response = app
        .send(json_request(
            "POST",
            "/api/console/login",
            "1.2.3.4",
            &json!({ "token": support::DB_TOKEN }),
        ))
        .await;
    let secret = support::cookie_value(response.headers(), "console_session").expect("cookie");

    let response = app
        .send(
            browser_request("GET", "/api/console/leads?limit=10", "1.2.3.4")
                .header("cookie", format!("console_session={}", secret))
                .body(Body::empty())
                .unwrap(),
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["total"], 1);
    assert_eq!(body["limit"], 10);
    assert_eq!(body["data"][0]["email"], "ada@example.com");
}
