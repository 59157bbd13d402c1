//! HTTP server for the DataWeave provenance ledger.
//!
//! Exposes record creation, querying, chain verification and the
//! administrative export/import surface as a JSON API over axum.

pub mod config;
pub mod error;
pub mod handler;
pub mod router;
pub mod server;
pub mod state;

pub use config::ServerConfig;
pub use error::{ServerError, ServerResult};
pub use router::build_router;
pub use server::DataWeaveServer;
pub use state::AppState;

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use axum::body::{to_bytes, Body};
    use axum::http::{Request, StatusCode};
    use axum::Router;
    use serde_json::{json, Value};
    use tower::util::ServiceExt;

    use dw_ledger::ProvenanceLedger;
    use dw_store::InMemoryDurableStore;

    use super::*;

    fn app() -> Router {
        build_router(AppState::in_memory(ServerConfig::default()).unwrap())
    }

    async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
        let response = app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, body)
    }

    fn get(uri: &str) -> Request<Body> {
        Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    fn post(uri: &str, body: &Value) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    fn compute(origin: &str, computation: &str) -> Value {
        json!({
            "kind": "compute",
            "originId": origin,
            "metadata": {
                "computationType": computation,
                "tags": [computation]
            },
            "payload": { "inputs": ["in"], "outputs": ["out"] }
        })
    }

    async fn create(app: &Router, body: Value) -> Value {
        let (status, descriptor) = send(app, post("/v1/provenance", &body)).await;
        assert_eq!(status, StatusCode::CREATED, "{descriptor}");
        descriptor
    }

    #[tokio::test]
    async fn health_endpoint() {
        let (status, body) = send(&app(), get("/v1/health")).await;
        assert_eq!(status, 200);
        assert_eq!(body["status"], "ok");
    }

    #[tokio::test]
    async fn info_endpoint() {
        let (status, body) = send(&app(), get("/v1/info")).await;
        assert_eq!(status, 200);
        assert_eq!(body["name"], "DataWeave");
        assert_eq!(body["schemaVersion"], dw_types::SCHEMA_VERSION);
        assert_eq!(body["signingScheme"], "blake3-keyed");
    }

    #[tokio::test]
    async fn create_links_records_per_origin() {
        let app = app();
        let first = create(&app, compute("miner-1", "inference")).await;
        assert!(first["priorLink"].is_null());
        assert!(first["durableRef"].as_str().unwrap().starts_with("dw-"));

        let second = create(&app, compute("miner-1", "training")).await;
        assert_eq!(second["priorLink"], first["recordId"]);

        let other = create(&app, compute("miner-2", "inference")).await;
        assert!(other["priorLink"].is_null());
    }

    #[tokio::test]
    async fn invalid_create_is_bad_request() {
        let app = app();

        let (status, body) = send(&app, post("/v1/provenance", &json!({ "kind": "compute" }))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"].as_str().unwrap().contains("originId"));

        let mut blank = compute("miner-1", "x");
        blank["metadata"]["computationType"] = json!("");
        let (status, _) = send(&app, post("/v1/provenance", &blank)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let malformed = Request::builder()
            .method("POST")
            .uri("/v1/provenance")
            .header("content-type", "application/json")
            .body(Body::from("{not json"))
            .unwrap();
        let (status, _) = send(&app, malformed).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (_, stats) = send(&app, get("/v1/stats")).await;
        assert_eq!(stats["totalRecords"], 0);
    }

    #[tokio::test]
    async fn storage_outage_is_service_unavailable() {
        let store = Arc::new(InMemoryDurableStore::new());
        let config = ServerConfig::default();
        let ledger = ProvenanceLedger::new(config.ledger.clone(), store.clone()).unwrap();
        let app = build_router(AppState::new(Arc::new(ledger), config));

        store.set_available(false);
        let (status, body) = send(&app, post("/v1/provenance", &compute("m", "x"))).await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert!(body["error"].is_string());

        store.set_available(true);
        let first = create(&app, compute("m", "x")).await;
        assert!(first["priorLink"].is_null());
    }

    #[tokio::test]
    async fn get_record_and_chain() {
        let app = app();
        let first = create(&app, compute("miner-1", "a")).await;
        let second = create(&app, compute("miner-1", "b")).await;
        let id = second["recordId"].as_str().unwrap();

        let (status, body) = send(&app, get(&format!("/v1/provenance/{id}"))).await;
        assert_eq!(status, 200);
        assert_eq!(body["record"]["id"], second["recordId"]);
        assert!(body.get("chain").is_none());

        let uri = format!("/v1/provenance/{id}?verifyChain=true");
        let (_, body) = send(&app, get(&uri)).await;
        assert_eq!(body["chain"]["valid"], true);

        let (status, chain) = send(&app, get(&format!("/v1/provenance/{id}/chain"))).await;
        assert_eq!(status, 200);
        assert_eq!(chain["valid"], true);
        assert_eq!(chain["trail"].as_array().unwrap().len(), 2);
        assert_eq!(chain["trail"][1]["recordId"], first["recordId"]);

        let (status, durable) = send(&app, get(&format!("/v1/provenance/{id}/durable"))).await;
        assert_eq!(status, 200);
        assert_eq!(durable["matches"], true);
    }

    #[tokio::test]
    async fn missing_and_malformed_ids() {
        let app = app();
        let unknown = dw_types::RecordId::new();

        let (status, _) = send(&app, get(&format!("/v1/provenance/{unknown}"))).await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (status, _) = send(&app, get("/v1/provenance/not-a-uuid")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, chain) = send(&app, get(&format!("/v1/provenance/{unknown}/chain"))).await;
        assert_eq!(status, 200);
        assert_eq!(chain["valid"], false);
        assert_eq!(chain["missingLinks"][0], unknown.to_string());
    }

    #[tokio::test]
    async fn query_string_filters_and_pages() {
        let app = app();
        for i in 0..3 {
            create(&app, compute("miner-1", &format!("job-{i}"))).await;
        }
        create(&app, compute("miner-2", "job-0")).await;

        let (status, page) = send(&app, get("/v1/provenance?originId=miner-1&limit=2")).await;
        assert_eq!(status, 200);
        assert_eq!(page["total"], 3);
        assert_eq!(page["records"].as_array().unwrap().len(), 2);
        assert_eq!(page["hasMore"], true);

        let (_, page) = send(&app, get("/v1/provenance?tags=job-0,job-2")).await;
        assert_eq!(page["total"], 3);

        let (_, page) = send(&app, get("/v1/provenance?kind=proof")).await;
        assert_eq!(page["total"], 0);

        let (status, _) = send(&app, get("/v1/provenance?kind=bogus")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, _) = send(&app, get("/v1/provenance?startTime=soon")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn search_body_and_recent() {
        let app = app();
        create(&app, compute("miner-1", "a")).await;
        let newest = create(&app, compute("miner-2", "b")).await;

        let filter = json!({ "originId": "miner-2", "sortOrder": "asc" });
        let (status, page) = send(&app, post("/v1/provenance/search", &filter)).await;
        assert_eq!(status, 200);
        assert_eq!(page["total"], 1);

        let (_, recent) = send(&app, get("/v1/provenance/recent?limit=1")).await;
        let recent = recent.as_array().unwrap();
        assert_eq!(recent.len(), 1);
        assert_eq!(recent[0]["id"], newest["recordId"]);
    }

    #[tokio::test]
    async fn statistics_and_audit() {
        let app = app();
        create(&app, compute("miner-1", "a")).await;
        create(&app, compute("miner-2", "a")).await;

        let (_, stats) = send(&app, get("/v1/stats")).await;
        assert_eq!(stats["totalRecords"], 2);
        assert_eq!(stats["computeRecords"], 2);
        assert_eq!(stats["uniqueOrigins"], 2);

        let (status, audit) = send(&app, get("/v1/admin/audit")).await;
        assert_eq!(status, 200);
        assert!(audit["violations"].as_array().unwrap().is_empty());
    }

    #[tokio::test]
    async fn export_import_round_trip() {
        let source = app();
        create(&source, compute("miner-1", "a")).await;
        let last = create(&source, compute("miner-1", "b")).await;
        let (_, export) = send(&source, get("/v1/admin/export")).await;

        let target = app();
        let (status, report) = send(&target, post("/v1/admin/import", &export)).await;
        assert_eq!(status, 200, "{report}");
        assert_eq!(report["recordCount"], 2);

        let id = last["recordId"].as_str().unwrap();
        let (_, chain) = send(&target, get(&format!("/v1/provenance/{id}/chain"))).await;
        assert_eq!(chain["valid"], true);

        let next = create(&target, compute("miner-1", "c")).await;
        assert_eq!(next["priorLink"], last["recordId"]);
    }

    #[tokio::test]
    async fn tampered_import_reports_broken_chain() {
        let source = app();
        let record = create(&source, compute("miner-1", "a")).await;
        let (_, mut export) = send(&source, get("/v1/admin/export")).await;
        export["records"][0]["metadata"]["computationType"] = json!("forged");

        let target = app();
        let (status, _) = send(&target, post("/v1/admin/import", &export)).await;
        assert_eq!(status, 200);

        let id = record["recordId"].as_str().unwrap();
        let (status, chain) = send(&target, get(&format!("/v1/provenance/{id}/chain"))).await;
        assert_eq!(status, 200);
        assert_eq!(chain["valid"], false);
        assert_eq!(chain["missingLinks"][0], record["recordId"]);
    }

    #[tokio::test]
    async fn rejected_import_is_bad_request() {
        let app = app();
        let mut export = json!({
            "schemaVersion": "0.1.0",
            "exportedAt": 0,
            "records": [],
            "byOriginIndex": {},
            "byKindIndex": {}
        });
        let (status, _) = send(&app, post("/v1/admin/import", &export)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        export["schemaVersion"] = json!(dw_types::SCHEMA_VERSION);
        let (status, _) = send(&app, post("/v1/admin/import", &export)).await;
        assert_eq!(status, 200);
    }

    #[tokio::test]
    async fn created_records_persist_to_data_dir() {
        let tmp = tempfile::tempdir().unwrap();
        let config = ServerConfig {
            data_dir: Some(tmp.path().to_path_buf()),
            ..ServerConfig::default()
        };

        let app = build_router(AppState::open(config.clone()).unwrap());
        let created = create(&app, compute("miner-1", "a")).await;

        let reopened = build_router(AppState::open(config).unwrap());
        let id = created["recordId"].as_str().unwrap();
        let (status, body) = send(&reopened, get(&format!("/v1/provenance/{id}"))).await;
        assert_eq!(status, 200);
        assert_eq!(body["record"]["originId"], "miner-1");
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_creates_all_reach_disk() {
        let tmp = tempfile::tempdir().unwrap();
        let config = ServerConfig {
            data_dir: Some(tmp.path().to_path_buf()),
            ..ServerConfig::default()
        };

        let app = build_router(AppState::open(config.clone()).unwrap());
        let creates: Vec<_> = (0..12)
            .map(|i| {
                let app = app.clone();
                tokio::spawn(async move {
                    create(&app, compute(&format!("miner-{}", i % 3), "a")).await
                })
            })
            .collect();
        for task in creates {
            task.await.unwrap();
        }

        let reopened = build_router(AppState::open(config).unwrap());
        let (_, stats) = send(&reopened, get("/v1/stats")).await;
        assert_eq!(stats["totalRecords"], 12);
        let (_, audit) = send(&reopened, get("/v1/admin/audit")).await;
        assert!(audit["violations"].as_array().unwrap().is_empty());
    }

    #[tokio::test]
    async fn time_range_accepts_either_bound() {
        let app = app();
        let record = create(&app, compute("miner-1", "a")).await;
        let at = record["createdAt"].as_u64().unwrap();

        let (status, page) = send(&app, get(&format!("/v1/provenance?startTime={at}"))).await;
        assert_eq!(status, 200);
        assert_eq!(page["total"], 1);

        let uri = format!("/v1/provenance?endTime={}", at - 1);
        let (_, page) = send(&app, get(&uri)).await;
        assert_eq!(page["total"], 0);
    }
}
