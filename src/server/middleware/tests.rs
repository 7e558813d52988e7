//! Middleware tests

use super::{ApiKeyAuthMiddleware, MetricsMiddleware, RateLimitMiddleware, RequestIdMiddleware};
use crate::config::PricingConfig;
use crate::core::SlidingWindowLimiter;
use crate::monitoring::MetricsCollector;
use actix_web::http::StatusCode;
use actix_web::{test, web, App, HttpResponse};
use std::sync::Arc;

async fn ok_handler() -> HttpResponse {
    HttpResponse::Ok().finish()
}

async fn failing_handler() -> HttpResponse {
    HttpResponse::InternalServerError().finish()
}

#[actix_web::test]
async fn test_rate_limit_sets_quota_headers() {
    let limiter = Arc::new(SlidingWindowLimiter::new(5));
    let app = test::init_service(
        App::new()
            .wrap(RateLimitMiddleware::new(limiter))
            .route("/api/v1/notes", web::get().to(ok_handler)),
    )
    .await;

    let req = test::TestRequest::get()
        .uri("/api/v1/notes")
        .insert_header(("x-api-key", "client-a"))
        .to_request();
    let res = test::call_service(&app, req).await;

    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(res.headers().get("x-ratelimit-limit").unwrap(), "5");
    assert_eq!(res.headers().get("x-ratelimit-remaining").unwrap(), "4");
}

#[actix_web::test]
async fn test_rate_limit_denies_with_retry_after() {
    let limiter = Arc::new(SlidingWindowLimiter::new(2));
    let app = test::init_service(
        App::new()
            .wrap(RateLimitMiddleware::new(limiter))
            .route("/api/v1/notes", web::get().to(ok_handler)),
    )
    .await;

    for _ in 0..2 {
        let req = test::TestRequest::get()
            .uri("/api/v1/notes")
            .insert_header(("x-api-key", "client-b"))
            .to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::OK);
    }

    let req = test::TestRequest::get()
        .uri("/api/v1/notes")
        .insert_header(("x-api-key", "client-b"))
        .to_request();
    let err = test::try_call_service(&app, req).await.unwrap_err();
    let res = err.error_response();

    assert_eq!(res.status(), StatusCode::TOO_MANY_REQUESTS);
    let retry_after: u64 = res
        .headers()
        .get("Retry-After")
        .unwrap()
        .to_str()
        .unwrap()
        .parse()
        .unwrap();
    assert!(retry_after <= 60);
}

#[actix_web::test]
async fn test_rate_limit_exempts_health() {
    let limiter = Arc::new(SlidingWindowLimiter::new(1));
    let app = test::init_service(
        App::new()
            .wrap(RateLimitMiddleware::new(limiter))
            .route("/health", web::get().to(ok_handler)),
    )
    .await;

    for _ in 0..5 {
        let req = test::TestRequest::get().uri("/health").to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::OK);
    }
}

#[actix_web::test]
async fn test_rate_limit_disabled_when_rpm_is_zero() {
    let limiter = Arc::new(SlidingWindowLimiter::new(0));
    let app = test::init_service(
        App::new()
            .wrap(RateLimitMiddleware::new(limiter))
            .route("/api/v1/notes", web::get().to(ok_handler)),
    )
    .await;

    for _ in 0..10 {
        let req = test::TestRequest::get()
            .uri("/api/v1/notes")
            .insert_header(("x-api-key", "client-c"))
            .to_request();
        let res = test::call_service(&app, req).await;
        assert_eq!(res.status(), StatusCode::OK);
        // No quota headers when the limiter is off
        assert!(res.headers().get("x-ratelimit-limit").is_none());
    }
}

#[actix_web::test]
async fn test_metrics_middleware_records_outcomes() {
    let metrics = Arc::new(MetricsCollector::new(PricingConfig::default()));
    let app = test::init_service(
        App::new()
            .wrap(MetricsMiddleware::new(Arc::clone(&metrics)))
            .route("/ok", web::get().to(ok_handler))
            .route("/boom", web::get().to(failing_handler)),
    )
    .await;

    let req = test::TestRequest::get().uri("/ok").to_request();
    test::call_service(&app, req).await;
    let req = test::TestRequest::get().uri("/boom").to_request();
    test::call_service(&app, req).await;

    let snapshot = metrics.snapshot();
    assert_eq!(snapshot.total_requests, 2);
    assert_eq!(snapshot.successful_requests, 1);
    assert_eq!(snapshot.failed_requests, 1);
    assert_eq!(snapshot.error_rate, 50.0);
}

#[actix_web::test]
async fn test_metrics_middleware_skips_scrape_paths() {
    let metrics = Arc::new(MetricsCollector::new(PricingConfig::default()));
    let app = test::init_service(
        App::new()
            .wrap(MetricsMiddleware::new(Arc::clone(&metrics)))
            .route("/health", web::get().to(ok_handler))
            .route("/metrics", web::get().to(ok_handler)),
    )
    .await;

    let req = test::TestRequest::get().uri("/health").to_request();
    test::call_service(&app, req).await;
    let req = test::TestRequest::get().uri("/metrics").to_request();
    test::call_service(&app, req).await;

    assert_eq!(metrics.snapshot().total_requests, 0);
}

#[actix_web::test]
async fn test_dropped_request_records_one_failure() {
    let metrics = Arc::new(MetricsCollector::new(PricingConfig::default()));
    let app = test::init_service(
        App::new()
            .wrap(MetricsMiddleware::new(Arc::clone(&metrics)))
            .route(
                "/slow",
                web::get().to(|| async {
                    tokio::time::sleep(std::time::Duration::from_secs(60)).await;
                    HttpResponse::Ok().finish()
                }),
            ),
    )
    .await;

    // Abandon the in-flight request, as a client disconnect does
    let req = test::TestRequest::get().uri("/slow").to_request();
    let outcome = tokio::time::timeout(
        std::time::Duration::from_millis(50),
        test::call_service(&app, req),
    )
    .await;
    assert!(outcome.is_err());

    let snapshot = metrics.snapshot();
    assert_eq!(snapshot.total_requests, 1);
    assert_eq!(snapshot.failed_requests, 1);
    assert_eq!(snapshot.successful_requests, 0);
}

#[actix_web::test]
async fn test_metrics_middleware_counts_denials_from_inner_middleware() {
    let metrics = Arc::new(MetricsCollector::new(PricingConfig::default()));
    let keys = vec!["valid-key".to_string()];
    let app = test::init_service(
        App::new()
            .wrap(ApiKeyAuthMiddleware::new(&keys))
            .wrap(MetricsMiddleware::new(Arc::clone(&metrics)))
            .route("/api/v1/notes", web::get().to(ok_handler)),
    )
    .await;

    let req = test::TestRequest::get().uri("/api/v1/notes").to_request();
    let err = test::try_call_service(&app, req).await.unwrap_err();
    assert_eq!(err.error_response().status(), StatusCode::UNAUTHORIZED);

    let snapshot = metrics.snapshot();
    assert_eq!(snapshot.total_requests, 1);
    assert_eq!(snapshot.failed_requests, 1);
}

#[actix_web::test]
async fn test_auth_accepts_valid_key() {
    let keys = vec!["valid-key".to_string()];
    let app = test::init_service(
        App::new()
            .wrap(ApiKeyAuthMiddleware::new(&keys))
            .route("/api/v1/notes", web::get().to(ok_handler)),
    )
    .await;

    let req = test::TestRequest::get()
        .uri("/api/v1/notes")
        .insert_header(("x-api-key", "valid-key"))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::OK);
}

#[actix_web::test]
async fn test_auth_rejects_invalid_key() {
    let keys = vec!["valid-key".to_string()];
    let app = test::init_service(
        App::new()
            .wrap(ApiKeyAuthMiddleware::new(&keys))
            .route("/api/v1/notes", web::get().to(ok_handler)),
    )
    .await;

    let req = test::TestRequest::get()
        .uri("/api/v1/notes")
        .insert_header(("x-api-key", "wrong"))
        .to_request();
    let err = test::try_call_service(&app, req).await.unwrap_err();
    assert_eq!(err.error_response().status(), StatusCode::UNAUTHORIZED);
}

#[actix_web::test]
async fn test_auth_open_when_no_keys_configured() {
    let app = test::init_service(
        App::new()
            .wrap(ApiKeyAuthMiddleware::new(&[]))
            .route("/api/v1/notes", web::get().to(ok_handler)),
    )
    .await;

    let req = test::TestRequest::get().uri("/api/v1/notes").to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::OK);
}

#[actix_web::test]
async fn test_auth_health_is_public() {
    let keys = vec!["valid-key".to_string()];
    let app = test::init_service(
        App::new()
            .wrap(ApiKeyAuthMiddleware::new(&keys))
            .route("/health", web::get().to(ok_handler)),
    )
    .await;

    let req = test::TestRequest::get().uri("/health").to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::OK);
}

#[actix_web::test]
async fn test_request_id_added_and_preserved() {
    let app = test::init_service(
        App::new()
            .wrap(RequestIdMiddleware)
            .route("/ok", web::get().to(ok_handler)),
    )
    .await;

    let req = test::TestRequest::get().uri("/ok").to_request();
    let res = test::call_service(&app, req).await;
    assert!(res.headers().get("x-request-id").is_some());

    let req = test::TestRequest::get()
        .uri("/ok")
        .insert_header(("x-request-id", "abc-123"))
        .to_request();
    let res = test::call_service(&app, req).await;
    assert_eq!(res.headers().get("x-request-id").unwrap(), "abc-123");
}
