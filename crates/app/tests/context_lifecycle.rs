//! Integration tests for the application context against a mocked gateway.

mod support;

use std::sync::Arc;
use std::time::Duration;

use serde_json::json;
use stockbridge_app::{commands, GridFilter};
use stockbridge_domain::{BridgeError, SyncState};
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

async fn mount_listing(server: &MockServer, rows: &[(&str, &str, i64)]) {
    Mock::given(method("GET"))
        .and(path("/api/mdm/inventory"))
        .respond_with(ResponseTemplate::new(200).set_body_json(support::listing(rows)))
        .mount(server)
        .await;
}

#[tokio::test]
async fn selected_keys_resolve_against_the_listed_page() {
    let server = MockServer::start().await;
    mount_listing(&server, &[("A100", "7", 5), ("B-200", "8", 2)]).await;
    Mock::given(method("POST"))
        .and(path("/api/magento/inventory/source-items"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .expect(1)
        .mount(&server)
        .await;

    let ctx = support::context(support::settings_for(&server.uri()));
    let page = commands::list_inventory(&ctx, ctx.default_filter()).await.unwrap();
    assert_eq!(page.rows.len(), 2);

    let keys = vec!["7-A100".to_string(), "8-B-200".to_string(), "7-ZZZ".to_string()];
    let outcome = commands::sync_selected(&ctx, &keys).await.unwrap();

    assert_eq!(outcome.report.state, SyncState::Succeeded);
    assert_eq!(outcome.report.batch.as_ref().unwrap().succeeded, 2);
    assert_eq!(outcome.unknown_keys, vec!["7-ZZZ".to_string()]);
}

#[tokio::test]
async fn default_filter_queries_the_configured_branch() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/mdm/inventory"))
        .and(query_param("succursale", "16"))
        .and(query_param("changed", "1"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(support::listing(&[("A100", "7", 5)])),
        )
        .expect(1)
        .mount(&server)
        .await;

    let ctx = support::context(support::settings_for(&server.uri()));
    let filter = GridFilter { changed_only: true, ..ctx.default_filter() };

    let page = ctx.list(filter).await.unwrap();
    assert_eq!(page.total, 1);
    assert_eq!(ctx.grid_rows().len(), 1);
}

#[tokio::test]
async fn moving_to_another_source_drops_the_snapshot() {
    let server = MockServer::start().await;
    mount_listing(&server, &[("A100", "7", 5)]).await;

    let ctx = support::context(support::settings_for(&server.uri()));
    ctx.list(ctx.default_filter()).await.unwrap();
    assert_eq!(ctx.grid_rows().len(), 1);

    let next_page = GridFilter { page: 1, ..ctx.default_filter() };
    assert!(!ctx.set_filter(&next_page));
    assert_eq!(ctx.grid_rows().len(), 1);

    let other_source = GridFilter { source_code: "8".into(), ..ctx.default_filter() };
    assert!(ctx.set_filter(&other_source));
    assert!(ctx.grid_rows().is_empty());
}

#[tokio::test]
async fn switching_transport_cancels_the_running_sync() {
    let server = MockServer::start().await;
    mount_listing(&server, &[("A100", "7", 5), ("A200", "7", 1)]).await;
    Mock::given(method("POST"))
        .and(path("/api/magento/inventory/source-items"))
        .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(2)))
        .mount(&server)
        .await;

    let ctx = Arc::new(support::context(support::settings_for(&server.uri())));
    ctx.list(ctx.default_filter()).await.unwrap();

    let running = {
        let ctx = Arc::clone(&ctx);
        let keys = vec!["7-A100".to_string(), "7-A200".to_string()];
        tokio::spawn(async move { ctx.sync_selected(&keys).await })
    };
    tokio::time::sleep(Duration::from_millis(150)).await;
    assert!(ctx.set_direct_enabled(true));

    let outcome = running.await.unwrap().unwrap();
    assert_eq!(outcome.report.state, SyncState::Cancelled);
    assert_eq!(outcome.report.progress.completed, 0);
}

#[tokio::test]
async fn malformed_keys_are_rejected_before_any_request() {
    let server = MockServer::start().await;
    Mock::given(wiremock::matchers::any())
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let ctx = support::context(support::settings_for(&server.uri()));
    let err = ctx.sync_selected(&["7-A100".to_string(), "nodash".to_string()]).await.unwrap_err();

    assert!(matches!(err, BridgeError::Validation(_)));
    assert_eq!(ctx.coordinator.state(), SyncState::Idle);
}

#[tokio::test]
async fn metrics_report_reflects_client_counters() {
    let server = MockServer::start().await;
    mount_listing(&server, &[]).await;

    let ctx = support::context(support::settings_for(&server.uri()));
    ctx.list(ctx.default_filter()).await.unwrap();
    ctx.list(ctx.default_filter()).await.unwrap();

    let status = commands::get_metrics(&ctx);
    assert!(!status.direct_enabled);
    assert_eq!(status.gateway_url, server.uri());
    assert_eq!(status.metrics.total, 2);
    assert_eq!(status.metrics.cache_hits, 1);

    commands::reset_metrics(&ctx);
    assert_eq!(commands::get_metrics(&ctx).metrics.total, 0);
}

#[tokio::test]
async fn catalog_stock_searches_by_sku_and_catalog_source() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/magento/inventory/source-items"))
        .and(query_param("searchCriteria[filterGroups][0][filters][0][field]", "sku"))
        .and(query_param("searchCriteria[filterGroups][0][filters][0][value]", "A100"))
        .and(query_param("searchCriteria[filterGroups][0][filters][0][conditionType]", "eq"))
        .and(query_param("searchCriteria[filterGroups][1][filters][0][value]", "warehouse_paris"))
        .and(query_param("fieldName", "sku"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "items": [
                {"sku": "A100", "source_code": "warehouse_paris", "quantity": 5.0, "status": 1},
                {"sku": "", "source_code": "warehouse_paris", "quantity": 1.0}
            ],
            "total_count": 1
        })))
        .expect(1)
        .mount(&server)
        .await;

    let ctx = support::context(support::settings_for(&server.uri()));
    let page = commands::catalog_stock(&ctx, "A100", Some("7")).await.unwrap();

    assert_eq!(page.total, 1);
    assert_eq!(page.rows.len(), 1);
    assert_eq!(page.rows[0].source_code, "warehouse_paris");
    assert_eq!(page.rows[0].quantity, 5);
    assert_eq!(page.rows[0].status, 1);
}

#[tokio::test]
async fn catalog_stock_rejects_unknown_sources_without_io() {
    let server = MockServer::start().await;
    let ctx = support::context(support::settings_for(&server.uri()));

    let err = commands::catalog_stock(&ctx, "A100", Some("999")).await.unwrap_err();
    assert!(matches!(err, BridgeError::UnknownSource(_)));
    let err = commands::catalog_stock(&ctx, "  ", None).await.unwrap_err();
    assert!(matches!(err, BridgeError::Validation(_)));
    assert!(server.received_requests().await.unwrap().is_empty());
}
