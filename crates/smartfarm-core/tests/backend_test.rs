// Cache/mutation behavior of `Backend` against a wiremock REST backend.
#![allow(clippy::unwrap_used)]

use std::time::Duration;

use pretty_assertions::assert_eq;
use serde_json::json;
use tokio::sync::broadcast;
use url::Url;
use wiremock::matchers::{body_partial_json, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use smartfarm_api::types::{
    CropStatus, FarmerCreate, FarmerUpdate, GenerateRecommendationsRequest, ListParams,
    RecommendationEntity, RecommendationStatus, RecommendationType, ReportStatus,
};
use smartfarm_core::{
    Backend, BackendConfig, CoreError, Notification, NotificationLevel, QueryKey, QueryStatus,
};

// ── Helpers ─────────────────────────────────────────────────────────

async fn setup() -> (MockServer, Backend) {
    let server = MockServer::start().await;
    let api_url = Url::parse(&format!("{}/api", server.uri())).unwrap();
    let backend = Backend::new(BackendConfig::new(api_url).unwrap()).unwrap();
    (server, backend)
}

fn page(data: serde_json::Value) -> serde_json::Value {
    let total = data.as_array().map_or(0, Vec::len);
    json!({"data": data, "total": total, "page": 1, "limit": 10, "totalPages": 1})
}

fn farmer_json(id: &str) -> serde_json::Value {
    json!({
        "id": id,
        "firstName": "Amina",
        "lastName": "Okafor",
        "email": "amina@example.com",
        "status": "active"
    })
}

fn supplier_json(id: &str) -> serde_json::Value {
    json!({"id": id, "name": "Green Seeds Ltd", "type": "seed", "status": "active"})
}

fn crop_json(id: &str, status: &str) -> serde_json::Value {
    json!({"id": id, "name": "Maize", "plantingDate": "2026-03-01", "status": status})
}

fn recommendation_json(id: &str, status: &str) -> serde_json::Value {
    json!({
        "id": id,
        "type": "pest_control",
        "title": "Scout for fall armyworm",
        "priority": "high",
        "status": status,
        "relatedEntityType": "crop",
        "relatedEntityId": "c-1"
    })
}

/// Every key in `keys` was invalidated exactly once.
fn assert_invalidated_once(backend: &Backend, keys: &[QueryKey]) {
    for key in keys {
        let state = backend.cache().state(key).unwrap();
        assert!(state.is_invalidated, "{key} should be stale");
        assert_eq!(state.invalidation_count, 1, "{key} invalidated more than once");
    }
}

fn new_farmer() -> FarmerCreate {
    FarmerCreate {
        first_name: "Amina".into(),
        last_name: "Okafor".into(),
        email: "amina@example.com".into(),
        phone: "+234-800-000".into(),
        address: "1 Farm Road".into(),
        city: "Jos".into(),
        state: "Plateau".into(),
        zip_code: "930001".into(),
        farm_size: 12.5,
        crops: vec!["maize".into()],
        status: None,
        notes: None,
    }
}

fn next_note(rx: &mut broadcast::Receiver<Notification>) -> Notification {
    rx.try_recv().expect("expected a notification")
}

// ── Mutations ───────────────────────────────────────────────────────

#[tokio::test]
async fn test_create_farmer_invalidates_list_and_stats_once() {
    let (server, backend) = setup().await;

    Mock::given(method("GET"))
        .and(path("/api/farmers"))
        .respond_with(ResponseTemplate::new(200).set_body_json(page(json!([farmer_json("f-1")]))))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/farmers/stats"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({"totalFarmers": 1, "activeFarmers": 1})),
        )
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/farmers"))
        .and(body_partial_json(json!({"firstName": "Amina", "farmSize": 12.5})))
        .respond_with(ResponseTemplate::new(201).set_body_json(farmer_json("f-2")))
        .expect(1)
        .mount(&server)
        .await;

    let farmers = backend.farmers();
    let params = ListParams::page(1, 10);
    farmers.list(&params).await.unwrap();
    farmers.stats().await.unwrap();

    let mut notes = backend.notifier().subscribe();
    let created = farmers.create(&new_farmer()).await.unwrap();
    assert_eq!(created.id, "f-2");

    let cache = backend.cache();
    for key in [
        QueryKey::new("farmers").with(&params),
        QueryKey::new("farmer-stats"),
    ] {
        let state = cache.state(&key).unwrap();
        assert!(state.is_invalidated, "{key} should be stale");
        assert_eq!(state.invalidation_count, 1, "{key} invalidated more than once");
    }

    let note = next_note(&mut notes);
    assert_eq!(note.level, NotificationLevel::Success);
    assert_eq!(note.message, "Farmer created successfully");
}

#[tokio::test]
async fn test_delete_supplier_removes_item_entry() {
    let (server, backend) = setup().await;

    Mock::given(method("GET"))
        .and(path("/api/suppliers/S1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(supplier_json("S1")))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/suppliers"))
        .respond_with(ResponseTemplate::new(200).set_body_json(page(json!([supplier_json("S1")]))))
        .mount(&server)
        .await;
    Mock::given(method("DELETE"))
        .and(path("/api/suppliers/S1"))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    let suppliers = backend.suppliers();
    let params = ListParams::page(1, 10);
    suppliers.item("S1").await.unwrap().unwrap();
    suppliers.list(&params).await.unwrap();

    let mut notes = backend.notifier().subscribe();
    suppliers.delete("S1").await.unwrap();

    let cache = backend.cache();
    assert!(!cache.contains(&QueryKey::new("suppliers").with("S1")));
    let list = cache.state(&QueryKey::new("suppliers").with(&params)).unwrap();
    assert!(list.is_invalidated);
    assert_eq!(next_note(&mut notes).message, "Supplier deleted successfully");
}

#[tokio::test]
async fn test_failed_mutation_leaves_cache_untouched() {
    let (server, backend) = setup().await;

    Mock::given(method("GET"))
        .and(path("/api/farmers"))
        .respond_with(ResponseTemplate::new(200).set_body_json(page(json!([]))))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/farmers"))
        .respond_with(
            ResponseTemplate::new(400).set_body_json(json!({"message": "Email already registered"})),
        )
        .mount(&server)
        .await;

    let farmers = backend.farmers();
    let params = ListParams::page(1, 10);
    farmers.list(&params).await.unwrap();

    let mut notes = backend.notifier().subscribe();
    let err = farmers.create(&new_farmer()).await.unwrap_err();
    assert_eq!(err.status(), Some(400));

    let state = backend
        .cache()
        .state(&QueryKey::new("farmers").with(&params))
        .unwrap();
    assert!(!state.is_invalidated);
    assert_eq!(state.invalidation_count, 0);

    let note = next_note(&mut notes);
    assert_eq!(note.level, NotificationLevel::Error);
    assert_eq!(note.message, "Failed to create farmer: Email already registered");
}

#[tokio::test]
async fn test_invalid_create_never_reaches_the_backend() {
    let (server, backend) = setup().await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(201))
        .expect(0)
        .mount(&server)
        .await;

    let mut farmer = new_farmer();
    farmer.email = "not-an-email".into();
    let err = backend.farmers().create(&farmer).await.unwrap_err();
    assert!(matches!(err, CoreError::Validation { .. }));
}

#[tokio::test]
async fn test_product_change_invalidates_supplier_products() {
    let (server, backend) = setup().await;

    Mock::given(method("GET"))
        .and(path("/api/suppliers/S1/products"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&server)
        .await;
    Mock::given(method("DELETE"))
        .and(path("/api/suppliers/S1/products/p-1"))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    let suppliers = backend.suppliers();
    suppliers.products("S1").await.unwrap().unwrap();

    let mut notes = backend.notifier().subscribe();
    suppliers.remove_product("S1", "p-1").await.unwrap();

    let key = QueryKey::new("suppliers").with("S1").with("products");
    assert!(backend.cache().state(&key).unwrap().is_invalidated);
    assert_eq!(
        next_note(&mut notes).message,
        "Product removed from supplier successfully"
    );
}

#[tokio::test]
async fn test_update_farmer_invalidates_list_item_and_stats_once() {
    let (server, backend) = setup().await;

    Mock::given(method("GET"))
        .and(path("/api/farmers"))
        .respond_with(ResponseTemplate::new(200).set_body_json(page(json!([farmer_json("f-1")]))))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/farmers/f-1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(farmer_json("f-1")))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/farmers/stats"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({"totalFarmers": 1, "activeFarmers": 1})),
        )
        .mount(&server)
        .await;
    Mock::given(method("PUT"))
        .and(path("/api/farmers/f-1"))
        .and(body_partial_json(json!({"city": "Kano"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(farmer_json("f-1")))
        .expect(1)
        .mount(&server)
        .await;

    let farmers = backend.farmers();
    let params = ListParams::page(1, 10);
    farmers.list(&params).await.unwrap();
    farmers.item("f-1").await.unwrap().unwrap();
    farmers.stats().await.unwrap();

    let mut notes = backend.notifier().subscribe();
    let update = FarmerUpdate {
        city: Some("Kano".into()),
        ..FarmerUpdate::default()
    };
    farmers.update("f-1", &update).await.unwrap();

    assert_invalidated_once(
        &backend,
        &[
            QueryKey::new("farmers").with(&params),
            QueryKey::new("farmers").with("f-1"),
            QueryKey::new("farmer-stats"),
        ],
    );
    assert_eq!(next_note(&mut notes).message, "Farmer updated successfully");
}

#[tokio::test]
async fn test_crop_status_change_invalidates_list_item_and_stats_once() {
    let (server, backend) = setup().await;

    Mock::given(method("GET"))
        .and(path("/api/crops"))
        .respond_with(ResponseTemplate::new(200).set_body_json(page(json!([crop_json("c-1", "planted")]))))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/crops/c-1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(crop_json("c-1", "planted")))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/crops/stats"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"totalCrops": 1})))
        .mount(&server)
        .await;
    Mock::given(method("PATCH"))
        .and(path("/api/crops/c-1/status"))
        .and(body_partial_json(json!({"status": "growing"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(crop_json("c-1", "growing")))
        .expect(1)
        .mount(&server)
        .await;

    let crops = backend.crops();
    let params = ListParams::page(1, 10);
    crops.list(&params).await.unwrap();
    crops.item("c-1").await.unwrap().unwrap();
    crops.stats().await.unwrap();

    let mut notes = backend.notifier().subscribe();
    let crop = crops.update_status("c-1", CropStatus::Growing, None).await.unwrap();
    assert_eq!(crop.status, CropStatus::Growing);

    assert_invalidated_once(
        &backend,
        &[
            QueryKey::new("crops").with(&params),
            QueryKey::new("crops").with("c-1"),
            QueryKey::new("crop-stats"),
        ],
    );
    assert_eq!(next_note(&mut notes).message, "Crop status updated successfully");
}

#[tokio::test]
async fn test_command_with_empty_id_never_reaches_the_backend() {
    let (server, backend) = setup().await;

    let mut notes = backend.notifier().subscribe();
    let err = backend
        .crops()
        .update_status("", CropStatus::Growing, None)
        .await
        .unwrap_err();
    assert!(matches!(err, CoreError::Validation { ref message } if message == "crop id is required"));

    let err = backend.suppliers().remove_product("S1", "").await.unwrap_err();
    assert!(matches!(err, CoreError::Validation { .. }));

    assert!(server.received_requests().await.unwrap().is_empty());
    assert!(notes.try_recv().is_err(), "validation failures raise no notification");
}

// ── Recommendations ─────────────────────────────────────────────────

#[tokio::test]
async fn test_recommendation_status_invalidates_list_item_and_stats() {
    let (server, backend) = setup().await;

    Mock::given(method("GET"))
        .and(path("/api/recommendations"))
        .respond_with(ResponseTemplate::new(200).set_body_json(page(json!([recommendation_json("r-1", "pending")]))))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/recommendations/r-1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(recommendation_json("r-1", "pending")))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/recommendations/stats"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "total": 1,
            "byStatus": [{"status": "pending", "count": 1}],
            "byPriority": [{"priority": "high", "count": 1}]
        })))
        .mount(&server)
        .await;
    Mock::given(method("PATCH"))
        .and(path("/api/recommendations/r-1/status"))
        .and(body_partial_json(json!({"status": "in_progress", "notes": "crew assigned"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(recommendation_json("r-1", "in_progress")))
        .expect(1)
        .mount(&server)
        .await;

    let recs = backend.recommendations();
    let params = ListParams::page(1, 10);
    recs.list(&params).await.unwrap();
    recs.item("r-1").await.unwrap().unwrap();
    let stats = recs.stats().await.unwrap();
    assert_eq!(stats.by_priority[0].priority, "high");

    let mut notes = backend.notifier().subscribe();
    let rec = recs
        .update_status("r-1", RecommendationStatus::InProgress, Some("crew assigned".into()))
        .await
        .unwrap();
    assert_eq!(rec.status, RecommendationStatus::InProgress);

    assert_invalidated_once(
        &backend,
        &[
            QueryKey::new("recommendations").with(&params),
            QueryKey::new("recommendations").with("r-1"),
            QueryKey::new("recommendation-stats"),
        ],
    );
    assert_eq!(next_note(&mut notes).message, "Recommendation status updated");
}

#[tokio::test]
async fn test_generate_recommendations_refreshes_lists_and_stats() {
    let (server, backend) = setup().await;

    Mock::given(method("GET"))
        .and(path("/api/recommendations"))
        .respond_with(ResponseTemplate::new(200).set_body_json(page(json!([]))))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/recommendations/generate"))
        .and(body_partial_json(json!({"type": "irrigation", "entityType": "field", "entityId": "fld-1"})))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({
            "success": true,
            "generated": 1,
            "recommendations": [recommendation_json("r-9", "pending")]
        })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/recommendations/generate"))
        .respond_with(ResponseTemplate::new(500).set_body_json(json!({"message": "model offline"})))
        .mount(&server)
        .await;

    let recs = backend.recommendations();
    let params = ListParams::page(1, 10);
    recs.list(&params).await.unwrap();

    let mut notes = backend.notifier().subscribe();
    let response = recs
        .generate(GenerateRecommendationsRequest {
            kind: Some(RecommendationType::Irrigation),
            entity_type: Some(RecommendationEntity::Field),
            entity_id: Some("fld-1".into()),
            context: None,
        })
        .await
        .unwrap();
    assert_eq!(response.generated, 1);
    assert_eq!(response.recommendations[0].id, "r-9");
    assert!(backend.cache().state(&QueryKey::new("recommendations").with(&params)).unwrap().is_invalidated);
    assert_eq!(next_note(&mut notes).message, "Recommendations generated successfully");

    recs.generate(GenerateRecommendationsRequest::default()).await.unwrap_err();
    let note = next_note(&mut notes);
    assert_eq!(note.level, NotificationLevel::Error);
    assert!(note.message.starts_with("Failed to generate recommendations"), "{}", note.message);
}

#[tokio::test]
async fn test_recommendation_lookups_skip_empty_ids() {
    let (server, backend) = setup().await;

    Mock::given(method("GET"))
        .and(path("/api/recommendations/r-1/similar"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([recommendation_json("r-2", "pending")])))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/crop/c-1/recommendations"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([recommendation_json("r-1", "pending")])))
        .expect(1)
        .mount(&server)
        .await;

    let recs = backend.recommendations();
    assert!(recs.similar("").await.unwrap().is_none());
    assert!(recs.for_entity(RecommendationEntity::Crop, "").await.unwrap().is_none());

    let similar = recs.similar("r-1").await.unwrap().unwrap();
    assert_eq!(similar[0].id, "r-2");
    let attached = recs.for_entity(RecommendationEntity::Crop, "c-1").await.unwrap().unwrap();
    assert_eq!(attached.len(), 1);

    // Similar lists sit under the item key, so item writes reach them.
    let similar_key = QueryKey::new("recommendations").with("r-1").with("similar");
    assert!(backend.cache().state(&similar_key).is_some());
    let entity_key = QueryKey::new("crop").with("c-1").with("recommendations");
    assert!(backend.cache().state(&entity_key).is_some());
}

// ── Reads ───────────────────────────────────────────────────────────

#[tokio::test]
async fn test_empty_id_issues_no_request() {
    let (server, backend) = setup().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .expect(0)
        .mount(&server)
        .await;

    assert!(backend.farmers().item("").await.unwrap().is_none());
    assert!(backend.suppliers().products("").await.unwrap().is_none());
    assert!(backend.market().history("", &Default::default()).await.unwrap().is_none());
    assert!(backend.farmers().search("ab").await.unwrap().is_none());
}

#[tokio::test]
async fn test_concurrent_identical_lists_share_one_request() {
    let (server, backend) = setup().await;

    Mock::given(method("GET"))
        .and(path("/api/crops"))
        .and(query_param("page", "1"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(page(json!([])))
                .set_delay(Duration::from_millis(200)),
        )
        .expect(1)
        .mount(&server)
        .await;

    let crops = backend.crops();
    let params = ListParams::page(1, 10);
    let (a, b) = tokio::join!(crops.list(&params), crops.list(&params));

    assert_eq!(a.unwrap().total, 0);
    assert_eq!(b.unwrap().total, 0);
}

#[tokio::test]
async fn test_reference_data_is_served_from_cache() {
    let (server, backend) = setup().await;

    Mock::given(method("GET"))
        .and(path("/api/market-prices/commodities"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!(["maize", "cassava"])))
        .expect(1)
        .mount(&server)
        .await;

    let market = backend.market();
    let first = market.commodities().await.unwrap();
    let second = market.commodities().await.unwrap();
    assert_eq!(*first, *second);

    let state = backend.cache().state(&QueryKey::new("commodities")).unwrap();
    assert_eq!(state.status, QueryStatus::Fresh);
    assert_eq!(state.fetch_count, 1);
}

#[tokio::test]
async fn test_failed_query_notifies() {
    let (server, backend) = setup().await;

    Mock::given(method("GET"))
        .and(path("/api/market-prices/stats"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let mut notes = backend.notifier().subscribe();
    let err = backend.market().stats().await.unwrap_err();
    assert_eq!(err.status(), Some(503));
    assert_eq!(next_note(&mut notes).level, NotificationLevel::Error);
}

// ── Reports ─────────────────────────────────────────────────────────

fn report_json(status: &str) -> serde_json::Value {
    json!({"id": "r-1", "templateId": "t-1", "status": status, "format": "pdf"})
}

#[tokio::test]
async fn test_report_status_polling_stops_when_done() {
    let (server, backend) = setup().await;

    Mock::given(method("GET"))
        .and(path("/api/reports/r-1/status"))
        .respond_with(ResponseTemplate::new(200).set_body_json(report_json("processing")))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/reports/r-1/status"))
        .respond_with(ResponseTemplate::new(200).set_body_json(report_json("completed")))
        .mount(&server)
        .await;

    let mut handle = backend.reports().poll_status("r-1");

    let first = tokio::time::timeout(Duration::from_secs(5), handle.changed())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(first.status, ReportStatus::Processing);

    let second = tokio::time::timeout(Duration::from_secs(15), handle.changed())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(second.status, ReportStatus::Completed);

    tokio::time::timeout(Duration::from_secs(5), async {
        while handle.is_active() {
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
    })
    .await
    .unwrap();

    handle.stop().await;
    assert_eq!(server.received_requests().await.unwrap().len(), 2);
}

#[tokio::test]
async fn test_generate_report_invalidates_history() {
    let (server, backend) = setup().await;

    Mock::given(method("GET"))
        .and(path("/api/reports/history"))
        .respond_with(ResponseTemplate::new(200).set_body_json(page(json!([report_json("completed")]))))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/reports/generate/t-1"))
        .respond_with(
            ResponseTemplate::new(202)
                .set_body_json(json!({"reportId": "r-2", "status": "queued", "message": "queued"})),
        )
        .expect(1)
        .mount(&server)
        .await;

    let reports = backend.reports();
    let params = ListParams::page(1, 10);
    reports.history(&params).await.unwrap();

    let mut notes = backend.notifier().subscribe();
    let started = reports
        .generate(
            "t-1",
            smartfarm_api::types::GenerateReportRequest {
                parameters: Default::default(),
                format: None,
                email_notification: None,
            },
        )
        .await
        .unwrap();
    assert_eq!(started.report_id, "r-2");

    let history = backend
        .cache()
        .state(&QueryKey::new("report-history").with(&params))
        .unwrap();
    assert!(history.is_invalidated);
    assert_eq!(
        next_note(&mut notes).message,
        "Report generation started. You will be notified when it's ready."
    );
}

#[tokio::test]
async fn test_download_failure_notifies() {
    let (server, backend) = setup().await;

    Mock::given(method("GET"))
        .and(path("/api/reports/r-9/download"))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({"message": "Report not found"})))
        .mount(&server)
        .await;

    let mut notes = backend.notifier().subscribe();
    let err = backend.reports().download("r-9").await.unwrap_err();
    assert!(err.is_not_found());
    assert_eq!(
        next_note(&mut notes).message,
        "Failed to download report: Report not found"
    );
}

#[tokio::test]
async fn test_update_schedule_invalidates_schedule_list() {
    let (server, backend) = setup().await;

    let schedule = json!({"id": "s-1", "templateId": "t-1", "active": true});
    Mock::given(method("GET"))
        .and(path("/api/reports/scheduled"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([schedule])))
        .mount(&server)
        .await;
    Mock::given(method("PUT"))
        .and(path("/api/reports/scheduled/s-1"))
        .and(body_partial_json(json!({"active": false})))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"id": "s-1", "templateId": "t-1", "active": false})),
        )
        .expect(1)
        .mount(&server)
        .await;

    let reports = backend.reports();
    assert!(reports.scheduled().await.unwrap()[0].active);

    let mut notes = backend.notifier().subscribe();
    let update = smartfarm_api::types::ScheduledReportUpdate {
        active: Some(false),
        ..Default::default()
    };
    let updated = reports.update_scheduled("s-1", &update).await.unwrap();
    assert!(!updated.active);

    let list = backend
        .cache()
        .state(&QueryKey::new(smartfarm_core::keys::SCHEDULED_REPORTS))
        .unwrap();
    assert!(list.is_invalidated);
    assert_eq!(
        next_note(&mut notes).message,
        "Scheduled report updated successfully"
    );
}

#[tokio::test]
async fn test_history_view_keeps_previous_page_until_next_arrives() {
    let (server, backend) = setup().await;

    Mock::given(method("GET"))
        .and(path("/api/reports/history"))
        .and(query_param("page", "1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(page(json!([report_json("completed")]))))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/reports/history"))
        .and(query_param("page", "2"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(page(json!([])))
                .set_delay(Duration::from_millis(300)),
        )
        .mount(&server)
        .await;

    let mut view = backend.reports().observe_history();
    let first = view.load(ListParams::page(1, 10)).await.unwrap();
    assert_eq!(first.data.len(), 1);

    let mut results = view.observer().subscribe();
    let _ = results.borrow_and_update();
    let loading = async {
        results.changed().await.unwrap();
        results.borrow_and_update().clone()
    };
    let (second, during) = tokio::join!(view.load(ListParams::page(2, 10)), loading);

    assert!(during.is_loading());
    assert!(during.is_previous_data);
    assert_eq!(during.data.unwrap().data.len(), 1);

    assert!(second.unwrap().data.is_empty());
    let settled = view.observer().result();
    assert!(!settled.is_loading());
    assert!(!settled.is_previous_data);
    assert!(settled.data.unwrap().data.is_empty());
}
