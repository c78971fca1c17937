mod common;

use anyhow::Result;
use axum::body::{self, Body};
use axum::http::{Request, StatusCode};
use axum::response::Response;
use serde_json::Value;
use tower::util::ServiceExt; // for `oneshot`

use cms_scopes::create_app;

use common::TestDb;

#[tokio::test]
async fn health_endpoint_reports_db_ok() -> Result<()> {
    let db = TestDb::new().await?;

    std::env::set_var("JWT_SECRET", "test-secret");
    let app = create_app(db.pool.clone()).await?;

    let req = Request::builder()
        .method("GET")
        .uri("/api/health")
        .body(Body::empty())?;

    let resp: Response = app.oneshot(req).await?;
    assert_eq!(resp.status(), StatusCode::OK, "health endpoint did not return 200");

    let body_bytes = body::to_bytes(resp.into_body(), 10_485_760).await?;
    let v: Value = serde_json::from_slice(&body_bytes)?;
    assert_eq!(v["status"], "ok", "unexpected body: {}", v);
    assert_eq!(v["db_ok"], true, "expected db_ok: true, got: {}", v);

    Ok(())
}
