use axum::{
    body::Body,
    http::{Request, StatusCode},
};

mod support;

use support::{body_json, TestApp, BROWSER_AGENT};

fn get(uri: &str) -> Request<Body> {
    Request::builder()
        .uri(uri)
        .header("user-agent", BROWSER_AGENT)
        .body(Body::empty())
        .unwrap()
}

fn post_from(origin: Option<&str>, referer: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder()
        .method("POST")
        .uri("/api/console/logout")
        .header("user-agent", BROWSER_AGENT);
    if let Some(origin) = origin {
        builder = builder.header("origin", origin);
    }
    if let Some(referer) = referer {
        builder = builder.header("referer", referer);
    }
    builder.body(Body::empty()).unwrap()
}

#[tokio::test]
async fn traversal_is_a_400_and_sensitive_files_are_a_404() {
    let app = TestApp::new();

    let response = app.send(get("/../../etc/passwd")).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["success"], false);

    let response = app.send(get("/.env")).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let response = app.send(get("/api/node_modules/pkg/index.js")).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn origin_matrix_on_state_changing_requests() {
    let app = TestApp::new();

    let response = app.send(post_from(Some("https://evil.example"), None)).await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    assert_eq!(body_json(response).await["code"], "INVALID_ORIGIN");

    let response = app
        .send(post_from(Some("https://preview-123.vercel.app"), None))
        .await;
    assert_eq!(response.status(), StatusCode::OK);

    let response = app
        .send(post_from(None, Some("https://www.studio.dev/console")))
        .await;
    assert_eq!(response.status(), StatusCode::OK);

    let response = app
        .send(post_from(None, Some("https://evil.example/console")))
        .await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let response = app.send(get("/api/console/login")).await;
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn opaque_origin_is_rejected_even_when_host_is_allowed() {
    let app = TestApp::new();
    for origin in ["null", "https://"] {
        let response = app
            .send(
                Request::builder()
                    .method("POST")
                    .uri("/api/console/logout")
                    .header("user-agent", BROWSER_AGENT)
                    .header("origin", origin)
                    .header("host", "studio.dev")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await;
        assert_eq!(response.status(), StatusCode::FORBIDDEN, "origin {}", origin);
    }
}

#[tokio::test]
async fn api_rejects_bots_and_missing_agents_but_pages_do_not() {
    let app = TestApp::new();

    let response = app
        .send(
            Request::builder()
                .uri("/api/console/login")
                .header("user-agent", "python-requests/2.31")
                .body(Body::empty())
                .unwrap(),
        )
        .await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let response = app
        .send(
            Request::builder()
                .uri("/api/console/login")
                .body(Body::empty())
                .unwrap(),
        )
        .await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let response = app
        .send(
            Request::builder()
                .uri("/health")
                .header("user-agent", "kube-probe/1.29")
                .body(Body::empty())
                .unwrap(),
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn blocked_ips_are_rejected() {
    let app = TestApp::with_config(support::test_config(&[("BLOCKED_IPS", "203.0.113.9")]));
    let response = app
        .send(
            Request::builder()
                .uri("/health")
                .header("user-agent", BROWSER_AGENT)
                .header("x-forwarded-for", "203.0.113.9, 10.0.0.1")
                .body(Body::empty())
                .unwrap(),
        )
        .await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn security_headers_are_on_every_response() {
    let app = TestApp::new();

    for uri in ["/health", "/api/console/login", "/.env", "/missing"] {
        let response = app.send(get(uri)).await;
        let headers = response.headers();
        assert_eq!(headers["x-frame-options"], "DENY", "uri {}", uri);
        assert_eq!(headers["x-content-type-options"], "nosniff");
        assert_eq!(headers["x-xss-protection"], "1; mode=block");
        assert_eq!(headers["referrer-policy"], "strict-origin-when-cross-origin");
        assert!(headers.contains_key("strict-transport-security"));
        assert!(headers.contains_key("permissions-policy"));
        assert!(headers.contains_key("x-request-id"));
    }

    let api = app.send(get("/api/console/login")).await;
    assert_eq!(
        api.headers()["cache-control"],
        "no-store, no-cache, must-revalidate, private"
    );
    let page = app.send(get("/health")).await;
    assert!(page.headers().get("cache-control").is_none());
}

#[tokio::test]
async fn unknown_routes_are_json_404s() {
    let app = TestApp::new();
    let response = app.send(get("/api/unknown")).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let body = body_json(response).await;
    assert_eq!(body["success"], false);
    assert_eq!(body["code"], "NOT_FOUND");
}

#[tokio::test]
async fn request_id_is_echoed_or_minted() {
    let app = TestApp::new();
    let response = app
        .send(
            Request::builder()
                .uri("/health")
                .header("x-request-id", "client-req-123")
                .body(Body::empty())
                .unwrap(),
        )
        .await;
    assert_eq!(response.headers()["x-request-id"], "client-req-123");

    let response = app.send(get("/health")).await;
    let minted = response.headers()["x-request-id"].to_str().unwrap();
    assert!(uuid::Uuid::parse_str(minted).is_ok());
}
