mod common;

use bundle_admin::controllers::analytics::{AnalyticsController, DateRange};
use bundle_admin::controllers::bundles::{
    BundleEditor, BundleId, BundleKind, BundleListController, BundleStatus,
};
use bundle_admin::controllers::plans::PlansController;
use bundle_admin::controllers::settings::SettingsController;
use bundle_admin::controllers::{Debouncer, Refresh};
use bundle_admin::domain::ApiError;
use bundle_admin::notify::{NoopLoading, NoticeLevel};
use common::executor;
use futures::future::join_all;
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use wiremock::matchers::{body_partial_json, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const SHOP: &str = "demo.myshopify.com";

fn bundle_list(server: &MockServer) -> (BundleListController, Arc<common::RecordingSink>) {
    let (executor, sink) = executor(server.uri());
    (
        BundleListController::new(executor, Arc::new(NoopLoading), SHOP),
        sink,
    )
}

#[tokio::test]
async fn test_write_triggers_exactly_one_reload() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/bundles"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "status": true,
            "data": {"bundles": [{"id": 1, "title": "Summer kit", "status": "draft"}]}
        })))
        .expect(2)
        .mount(&mock_server)
        .await;

    Mock::given(method("POST"))
        .and(path("/api/bundles/1/status"))
        .and(body_partial_json(json!({"shop": SHOP, "status": "active"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"status": true})))
        .expect(1)
        .mount(&mock_server)
        .await;

    let (list, sink) = bundle_list(&mock_server);
    assert_eq!(list.load().await.unwrap(), Refresh::Applied);

    list.set_status(&BundleId::from(1), BundleStatus::Active)
        .await
        .unwrap();

    assert_eq!(list.resource().generation().await, 2);
    let notices = sink.notices();
    assert_eq!(notices.len(), 1);
    assert_eq!(notices[0].level, NoticeLevel::Success);
}

#[tokio::test]
async fn test_failed_read_keeps_previous_data() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/bundles"))
        .and(query_param("page", "1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "bundles": [{"id": 1, "title": "First"}]
        })))
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/api/bundles"))
        .and(query_param("page", "2"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&mock_server)
        .await;

    let (list, sink) = bundle_list(&mock_server);
    list.load().await.unwrap();

    let err = list.go_to_page(2).await.unwrap_err();
    assert_eq!(err.to_string(), "HTTP Error: 500");

    let page = list.page().await.unwrap().unwrap();
    assert_eq!(page.bundles.len(), 1);
    assert_eq!(page.bundles[0].title, "First");
    assert_eq!(sink.messages(), vec!["HTTP Error: 500".to_string()]);
    assert!(list.resource().last_error().await.is_some());
}

#[tokio::test]
async fn test_failed_write_leaves_data_and_skips_reload() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/bundles"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "bundles": [{"id": 4, "title": "Kit"}]
        })))
        .expect(1)
        .mount(&mock_server)
        .await;

    Mock::given(method("DELETE"))
        .and(path("/api/bundles/4"))
        .respond_with(ResponseTemplate::new(403).set_body_json(json!({"message": "Not allowed"})))
        .expect(1)
        .mount(&mock_server)
        .await;

    let (list, sink) = bundle_list(&mock_server);
    list.load().await.unwrap();

    let err = list.delete(&BundleId::from(4)).await.unwrap_err();
    assert_eq!(
        err,
        ApiError::Http {
            status: 403,
            message: "Not allowed".to_string()
        }
    );

    let page = list.page().await.unwrap().unwrap();
    assert_eq!(page.bundles[0].id, BundleId::Number(4));
    assert_eq!(sink.notices()[0].level, NoticeLevel::Error);
}

#[tokio::test]
async fn test_rejected_status_flag_is_a_failure() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/bundles/2/duplicate"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "status": false,
            "message": "Bundle limit reached for your plan"
        })))
        .mount(&mock_server)
        .await;

    let (list, sink) = bundle_list(&mock_server);
    let err = list.duplicate(&BundleId::from(2)).await.unwrap_err();

    assert_eq!(
        err,
        ApiError::Rejected("Bundle limit reached for your plan".to_string())
    );
    assert_eq!(
        sink.messages(),
        vec!["Bundle limit reached for your plan".to_string()]
    );
}

#[tokio::test]
async fn test_status_wrapper_without_data_keeps_payload() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/bundles"))
        .and(query_param("shop", SHOP))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "status": true,
            "bundles": [{"id": 1, "title": "Kit"}],
            "totalPages": 3
        })))
        .expect(1)
        .mount(&mock_server)
        .await;

    let (list, sink) = bundle_list(&mock_server);

    assert_eq!(list.load().await.unwrap(), Refresh::Applied);

    let page = list.page().await.unwrap().unwrap();
    assert_eq!(page.bundles.len(), 1);
    assert_eq!(page.bundles[0].id, BundleId::from(1u64));
    assert_eq!(page.bundles[0].title, "Kit");
    assert_eq!(page.total_pages, Some(3));
    assert!(sink.notices().is_empty());
}

#[tokio::test]
async fn test_superseded_response_is_discarded() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/bundles"))
        .and(query_param("page", "1"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"bundles": [{"id": 1, "title": "Page one"}]}))
                .set_delay(Duration::from_millis(400)),
        )
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/api/bundles"))
        .and(query_param("page", "2"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"bundles": [{"id": 2, "title": "Page two"}]})),
        )
        .mount(&mock_server)
        .await;

    let (list, _sink) = bundle_list(&mock_server);

    let (slow, fast) = tokio::join!(list.load(), async {
        tokio::time::sleep(Duration::from_millis(50)).await;
        list.go_to_page(2).await
    });

    assert_eq!(slow.unwrap(), Refresh::Superseded);
    assert_eq!(fast.unwrap(), Refresh::Applied);

    let page = list.page().await.unwrap().unwrap();
    assert_eq!(page.bundles[0].title, "Page two");
}

#[tokio::test]
async fn test_search_is_debounced() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/bundles"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"bundles": []})))
        .mount(&mock_server)
        .await;

    let (list, _sink) = bundle_list(&mock_server);
    let list = list.with_debouncer(Debouncer::new(Duration::from_millis(100)));

    let typed = |text: &'static str, after_ms: u64| {
        let list = &list;
        async move {
            tokio::time::sleep(Duration::from_millis(after_ms)).await;
            list.search(text).await
        }
    };

    let results = join_all([typed("s", 0), typed("sh", 20), typed("shirt", 40)]).await;
    let results: Vec<Refresh> = results.into_iter().map(Result::unwrap).collect();

    assert_eq!(
        results,
        vec![Refresh::Debounced, Refresh::Debounced, Refresh::Applied]
    );

    let requests = mock_server.received_requests().await.unwrap();
    assert_eq!(requests.len(), 1);
    let query = requests[0].url.query().unwrap_or_default().to_string();
    assert!(query.contains("search=shirt"), "query = {}", query);
    assert!(query.contains("page=1"));
}

#[tokio::test]
async fn test_unchanged_query_does_not_refetch() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/bundles"))
        .and(query_param("type", "bxgy"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"bundles": []})))
        .expect(1)
        .mount(&mock_server)
        .await;

    let (list, _sink) = bundle_list(&mock_server);

    assert_eq!(
        list.select_kind(Some(BundleKind::BuyXGetY)).await.unwrap(),
        Refresh::Applied
    );
    assert_eq!(
        list.select_kind(Some(BundleKind::BuyXGetY)).await.unwrap(),
        Refresh::Unchanged
    );
}

#[tokio::test]
async fn test_editor_creates_then_loads_bundle() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/bundles"))
        .and(body_partial_json(json!({"shop": SHOP, "bundle": {"title": "Gift set"}})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "status": true,
            "data": {"id": 42}
        })))
        .expect(1)
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/api/bundles/42"))
        .and(query_param("shop", SHOP))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": 42,
            "title": "Gift set",
            "type": "fixed"
        })))
        .expect(1)
        .mount(&mock_server)
        .await;

    let (executor, _sink) = executor(mock_server.uri());
    let editor = BundleEditor::new(executor, Arc::new(NoopLoading), SHOP, None);

    assert_eq!(editor.load().await.unwrap(), Refresh::Idle);

    editor
        .edit(|bundle| bundle["title"] = json!("Gift set"))
        .await;
    let saved = editor.save().await.unwrap();

    assert_eq!(saved["id"], 42);
    assert_eq!(saved["type"], "fixed");
    assert!(!editor.editable().is_dirty().await);
}

#[tokio::test]
async fn test_failed_settings_save_discards_edits() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/settings/customization"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "button_color": "#000000",
            "label": "Bundle & save"
        })))
        .expect(1)
        .mount(&mock_server)
        .await;

    Mock::given(method("POST"))
        .and(path("/api/settings/customization"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({"message": "Invalid color"})))
        .expect(1)
        .mount(&mock_server)
        .await;

    let (executor, sink) = executor(mock_server.uri());
    let settings = SettingsController::new(executor, Arc::new(NoopLoading), SHOP);
    settings.load().await.unwrap();

    settings.set("button_color", json!("not-a-color")).await;
    assert!(settings.is_dirty().await);
    assert_eq!(settings.settings().await.unwrap()["button_color"], "not-a-color");

    let err = settings.save().await.unwrap_err();
    assert_eq!(err.to_string(), "Invalid color");

    assert!(!settings.is_dirty().await);
    assert_eq!(settings.settings().await.unwrap()["button_color"], "#000000");
    assert_eq!(sink.messages(), vec!["Invalid color".to_string()]);
}

#[tokio::test]
async fn test_analytics_sends_date_range_and_summarizes() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/analytics"))
        .and(query_param("start_date", "2024-05-01"))
        .and(query_param("end_date", "2024-05-03"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "daily": [
                {"date": "2024-05-01", "revenue": 10.0, "orders": 1, "views": 10},
                {"date": "2024-05-02", "revenue": 20.0, "orders": 2, "views": 20},
                {"date": "2024-05-03", "revenue": 0.0, "orders": 0, "views": 10}
            ]
        })))
        .expect(1)
        .mount(&mock_server)
        .await;

    let (executor, _sink) = executor(mock_server.uri());
    let range = DateRange::parse("2024-05-01", "2024-05-03").unwrap();
    let analytics = AnalyticsController::new(executor, Arc::new(NoopLoading), SHOP, range);

    analytics.load().await.unwrap();
    let summary = analytics.summary().await.unwrap().unwrap();

    assert_eq!(summary.days, 3);
    assert_eq!(summary.orders, 3);
    assert_eq!(summary.views, 40);
    assert!((summary.revenue - 30.0).abs() < f64::EPSILON);
    assert!((summary.conversion_rate - 0.075).abs() < 1e-9);
}

#[tokio::test]
async fn test_plan_subscription_returns_confirmation_url() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/plans"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "plans": [
                {"name": "Free", "price": 0.0},
                {"name": "Pro", "price": 19.99, "features": ["Unlimited bundles"]}
            ],
            "currentPlan": "Free"
        })))
        .expect(2)
        .mount(&mock_server)
        .await;

    Mock::given(method("POST"))
        .and(path("/api/plans/subscribe"))
        .and(body_partial_json(json!({"plan": "Pro"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "confirmation_url": "https://billing.example/confirm/1"
        })))
        .expect(1)
        .mount(&mock_server)
        .await;

    let (executor, _sink) = executor(mock_server.uri());
    let plans = PlansController::new(executor, Arc::new(NoopLoading), SHOP);
    plans.load().await.unwrap();

    let catalog = plans.catalog().await.unwrap().unwrap();
    assert_eq!(catalog.current().unwrap().name, "Free");

    let url = plans.subscribe("Pro").await.unwrap();
    assert_eq!(url.as_deref(), Some("https://billing.example/confirm/1"));
}
