pub mod health;

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};

use crate::errors::AppError;
use crate::schema::handlers::handle_form_config;
use crate::state::AppState;
use crate::submission::handlers::handle_submit_application;

/// Room for the text fields and multipart framing around a maximum-size file.
const FORM_OVERHEAD_BYTES: usize = 1024 * 1024;

async fn not_found() -> AppError {
    AppError::NotFound("Endpoint not found".to_string())
}

pub fn build_router(state: AppState) -> Router {
    let body_limit = state.config.max_upload_bytes + FORM_OVERHEAD_BYTES;

    Router::new()
        .route("/health", get(health::health_handler))
        .route("/api/health", get(health::health_handler))
        .route("/api/public/form-config", get(handle_form_config))
        .route(
            "/api/submit_application",
            post(handle_submit_application).layer(DefaultBodyLimit::max(body_limit)),
        )
        .fallback(not_found)
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use axum::body::Body;
    use axum::http::{header, Request, StatusCode};
    use serde_json::Value;
    use sqlx::SqlitePool;
    use tower::ServiceExt;

    use crate::config::Config;
    use crate::dashboard::Dashboard;
    use crate::schema::defaults::default_schema;
    use crate::test_support::{memory_pool, seed_form, FakeDashboard, SubmitBehavior};

    const BOUNDARY: &str = "----intake-test-boundary";

    fn app(pool: SqlitePool, dashboard: impl Dashboard + 'static, config: Config) -> Router {
        build_router(AppState {
            db: pool,
            dashboard: Arc::new(dashboard),
            config: Arc::new(config),
        })
    }

    /// Hand-built multipart body: text parts followed by an optional file part.
    fn multipart_body(fields: &[(&str, &str)], file: Option<(&str, &[u8])>) -> Vec<u8> {
        let mut body = Vec::new();
        for (name, value) in fields {
            body.extend_from_slice(
                format!("--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{name}\"\r\n\r\n{value}\r\n")
                    .as_bytes(),
            );
        }
        if let Some((file_name, bytes)) = file {
            body.extend_from_slice(
                format!(
                    "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"cv-resume\"; filename=\"{file_name}\"\r\nContent-Type: application/octet-stream\r\n\r\n"
                )
                .as_bytes(),
            );
            body.extend_from_slice(bytes);
            body.extend_from_slice(b"\r\n");
        }
        body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());
        body
    }

    fn submit_request(body: Vec<u8>) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri("/api/submit_application")
            .header(header::CONTENT_TYPE, format!("multipart/form-data; boundary={BOUNDARY}"))
            .body(Body::from(body))
            .unwrap()
    }

    async fn json_body(response: axum::response::Response) -> Value {
        serde_json::from_str(&text_body(response).await).unwrap()
    }

    async fn text_body(response: axum::response::Response) -> String {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    /// Asserts every quoted key in `keys` occurs in `text`, in that order.
    fn assert_in_order(text: &str, keys: &[&str]) {
        let positions: Vec<usize> = keys
            .iter()
            .map(|k| text.find(&format!("\"{k}\"")).unwrap_or_else(|| panic!("{k} missing from {text}")))
            .collect();
        assert!(positions.windows(2).all(|w| w[0] < w[1]), "{keys:?} out of order in {text}");
    }

    async fn stored_files(dir: &std::path::Path) -> Vec<std::path::PathBuf> {
        let mut out = Vec::new();
        if let Ok(mut entries) = tokio::fs::read_dir(dir).await {
            while let Some(entry) = entries.next_entry().await.unwrap() {
                out.push(entry.path());
            }
        }
        out
    }

    async fn application_count(pool: &SqlitePool) -> i64 {
        sqlx::query_scalar("SELECT COUNT(*) FROM applications")
            .fetch_one(pool)
            .await
            .unwrap_or(0)
    }

    const JANE: &[(&str, &str)] = &[
        ("name", "Jane Doe"),
        ("email", "jane@x.com"),
        ("phone", "555-1234"),
        ("position", "Intern"),
        ("location", "Remote"),
        ("qualification", "BSc"),
    ];

    #[tokio::test]
    async fn test_health_endpoints() {
        let app = app(memory_pool().await, FakeDashboard::down(), Config::for_tests("/nonexistent"));
        for uri in ["/health", "/api/health"] {
            let response = app
                .clone()
                .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
                .await
                .unwrap();
            assert_eq!(response.status(), StatusCode::OK);
            assert_eq!(json_body(response).await["status"], "ok");
        }
    }

    #[tokio::test]
    async fn test_unknown_route_is_json_404() {
        let app = app(memory_pool().await, FakeDashboard::down(), Config::for_tests("/nonexistent"));
        let response = app
            .oneshot(Request::builder().uri("/nope").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(json_body(response).await["error"], "Endpoint not found");
    }

    #[tokio::test]
    async fn test_form_config_default_and_store() {
        let pool = memory_pool().await;
        let router = app(pool.clone(), FakeDashboard::down(), Config::for_tests("/nonexistent"));
        let get = || Request::builder().uri("/api/public/form-config").body(Body::empty()).unwrap();

        let response = router.clone().oneshot(get()).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(json_body(response).await, serde_json::to_value(default_schema()).unwrap());

        seed_form(&pool).await;
        let body = json_body(router.oneshot(get()).await.unwrap()).await;
        let keys: Vec<&String> = body.as_object().unwrap().keys().collect();
        assert!(keys.contains(&&"Links".to_string()));
        assert_eq!(body["Links"][0]["name"], "github");
        assert_eq!(body["About You"][0]["required"], true);
    }

    #[tokio::test]
    async fn test_form_config_body_keeps_section_order() {
        let pool = memory_pool().await;
        let router = app(pool.clone(), FakeDashboard::down(), Config::for_tests("/nonexistent"));
        let get = || Request::builder().uri("/api/public/form-config").body(Body::empty()).unwrap();

        let text = text_body(router.clone().oneshot(get()).await.unwrap()).await;
        assert_in_order(&text, &["Personal Information", "Application Details", "Documents"]);

        // "Links" holds the lowest field order, so it leads despite sorting after "About You".
        seed_form(&pool).await;
        let text = text_body(router.oneshot(get()).await.unwrap()).await;
        assert_in_order(&text, &["Links", "About You"]);
    }

    #[tokio::test]
    async fn test_non_multipart_submission_is_json_400() {
        let dir = tempfile::tempdir().unwrap();
        let router = app(memory_pool().await, FakeDashboard::down(), Config::for_tests(dir.path()));

        let response = router
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/api/submit_application")
                    .header(header::CONTENT_TYPE, "application/json")
                    .body(Body::from(r#"{"name": "Jane Doe"}"#))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = json_body(response).await;
        assert!(body["error"].as_str().unwrap().starts_with("Malformed form submission"));
        assert!(stored_files(dir.path()).await.is_empty());
    }

    #[tokio::test]
    async fn test_submission_with_dashboard_down_lands_in_store() {
        let dir = tempfile::tempdir().unwrap();
        let pool = memory_pool().await;
        let router = app(pool.clone(), FakeDashboard::down(), Config::for_tests(dir.path()));
        let pdf = vec![b'%'; 2048];

        let response = router
            .oneshot(submit_request(multipart_body(JANE, Some(("résumé final.pdf", pdf.as_slice())))))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = json_body(response).await;
        assert_eq!(body["success"], true);
        assert_eq!(body["route"], "local");
        let id = body["application_id"].as_i64().unwrap();

        let files = stored_files(dir.path()).await;
        assert_eq!(files.len(), 1);
        let stored_name = files[0].file_name().unwrap().to_string_lossy().into_owned();
        assert!(stored_name.starts_with("jane_x_com_"), "{stored_name}");
        assert!(stored_name.ends_with("_resume_final.pdf"), "{stored_name}");

        assert_eq!(application_count(&pool).await, 1);
        let row: (String, String, String, String, String, String, String, String) = sqlx::query_as(
            "SELECT name, email, phone, position, location, qualification, cv_resume_path, status FROM applications WHERE id = ?",
        )
        .bind(id)
        .fetch_one(&pool)
        .await
        .unwrap();
        assert_eq!(
            (&*row.0, &*row.1, &*row.2, &*row.3, &*row.4, &*row.5),
            ("Jane Doe", "jane@x.com", "555-1234", "Intern", "Remote", "BSc")
        );
        assert!(std::path::Path::new(&row.6).exists());
        assert_eq!(row.7, "Pending");
    }

    #[tokio::test]
    async fn test_submission_accepted_by_dashboard_skips_store() {
        let dir = tempfile::tempdir().unwrap();
        let pool = memory_pool().await;
        let dashboard = FakeDashboard::healthy().with_submit(SubmitBehavior::Accept(None));
        let router = app(pool.clone(), dashboard, Config::for_tests(dir.path()));

        let response = router
            .oneshot(submit_request(multipart_body(JANE, Some(("cv.pdf", &b"%PDF"[..])))))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(json_body(response).await["route"], "remote");
        assert_eq!(application_count(&pool).await, 0);
        // The document is kept regardless of where the record went.
        assert_eq!(stored_files(dir.path()).await.len(), 1);
    }

    #[tokio::test]
    async fn test_missing_file_is_400_with_no_side_effects() {
        let dir = tempfile::tempdir().unwrap();
        let pool = memory_pool().await;
        let router = app(pool.clone(), FakeDashboard::down(), Config::for_tests(dir.path()));

        let response = router
            .oneshot(submit_request(multipart_body(JANE, None)))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(json_body(response).await["error"], "No resume file provided");
        assert_eq!(application_count(&pool).await, 0);
        assert!(stored_files(dir.path()).await.is_empty());
    }

    #[tokio::test]
    async fn test_wrong_extension_is_400() {
        let dir = tempfile::tempdir().unwrap();
        let router = app(memory_pool().await, FakeDashboard::down(), Config::for_tests(dir.path()));

        let response = router
            .oneshot(submit_request(multipart_body(JANE, Some(("cv.exe", &b"MZ"[..])))))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert!(stored_files(dir.path()).await.is_empty());
    }

    #[tokio::test]
    async fn test_oversized_file_is_413() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = Config::for_tests(dir.path());
        config.max_upload_bytes = 1024;
        let router = app(memory_pool().await, FakeDashboard::down(), config);

        let response = router
            .oneshot(submit_request(multipart_body(JANE, Some(("cv.pdf", &[0u8; 2048][..])))))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
        assert_eq!(json_body(response).await["error"], "File size exceeds 1024 bytes limit");
        assert!(stored_files(dir.path()).await.is_empty());
    }

    #[tokio::test]
    async fn test_same_second_resubmission_keeps_both_files() {
        let dir = tempfile::tempdir().unwrap();
        let pool = memory_pool().await;
        let router = app(pool.clone(), FakeDashboard::down(), Config::for_tests(dir.path()));

        for payload in [&b"first"[..], &b"second"[..]] {
            let response = router
                .clone()
                .oneshot(submit_request(multipart_body(JANE, Some(("cv.pdf", payload)))))
                .await
                .unwrap();
            assert_eq!(response.status(), StatusCode::OK);
        }

        let files = stored_files(dir.path()).await;
        assert_eq!(files.len(), 2);
        let mut contents = Vec::new();
        for f in &files {
            contents.push(tokio::fs::read(f).await.unwrap());
        }
        contents.sort();
        assert_eq!(contents, vec![b"first".to_vec(), b"second".to_vec()]);
        assert_eq!(application_count(&pool).await, 2);
    }

    #[tokio::test]
    async fn test_store_failure_is_500() {
        let dir = tempfile::tempdir().unwrap();
        let pool = memory_pool().await;
        pool.close().await;
        let router = app(pool, FakeDashboard::down(), Config::for_tests(dir.path()));

        let response = router
            .oneshot(submit_request(multipart_body(JANE, Some(("cv.pdf", &b"%PDF"[..])))))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(json_body(response).await["error"], "Failed to save application");
        // The upload itself survives the failed save.
        assert_eq!(stored_files(dir.path()).await.len(), 1);
    }
}
