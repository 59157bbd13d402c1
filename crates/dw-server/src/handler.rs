use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::Json;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use dw_ledger::{
    AuditReport, ChainReport, CreateRecordRequest, DurableCopyReport, LedgerExport,
    LedgerStatistics, PageRequest, ProvenanceRecord, QueryFilter, QueryPage, RecordDescriptor,
    RecordMetadata, RecordPayload, SortKey, SortOrder, TimeRange,
};
use dw_types::{OriginId, RecordId, RecordKind};

use crate::error::{ServerError, ServerResult};
use crate::state::AppState;

/// Health check handler.
pub async fn health_handler() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

/// Info handler.
pub async fn info_handler(State(state): State<AppState>) -> Json<Value> {
    Json(json!({
        "name": state.ledger.config().app_name,
        "version": env!("CARGO_PKG_VERSION"),
        "schemaVersion": dw_types::SCHEMA_VERSION,
        "signingScheme": state.ledger.signer().scheme(),
    }))
}

/// Body of `POST /v1/provenance`.
///
/// Every field is optional at the wire level so that a missing field is
/// reported by name instead of as a generic deserialization failure.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateRecordBody {
    pub kind: Option<String>,
    pub origin_id: Option<String>,
    pub metadata: Option<Value>,
    pub payload: Option<Value>,
}

impl CreateRecordBody {
    pub fn into_request(self) -> ServerResult<CreateRecordRequest> {
        let missing: Vec<&str> = [
            ("kind", self.kind.is_none()),
            ("originId", self.origin_id.is_none()),
            ("metadata", self.metadata.is_none()),
            ("payload", self.payload.is_none()),
        ]
        .into_iter()
        .filter_map(|(name, absent)| absent.then_some(name))
        .collect();

        let (Some(kind), Some(origin_id), Some(metadata), Some(payload)) =
            (self.kind, self.origin_id, self.metadata, self.payload)
        else {
            return Err(ServerError::InvalidRequest(format!(
                "missing required fields: {}",
                missing.join(", ")
            )));
        };

        let kind: RecordKind = kind.parse().map_err(invalid)?;
        let origin_id = OriginId::new(origin_id).map_err(invalid)?;
        let metadata: RecordMetadata = serde_json::from_value(metadata)
            .map_err(|e| ServerError::InvalidRequest(format!("metadata: {e}")))?;

        // The payload may omit its own tag; the top-level kind supplies it.
        let payload = match payload {
            Value::Object(mut map) => {
                map.entry("kind")
                    .or_insert_with(|| Value::String(kind.as_str().into()));
                Value::Object(map)
            }
            other => other,
        };
        let payload: RecordPayload = serde_json::from_value(payload)
            .map_err(|e| ServerError::InvalidRequest(format!("payload: {e}")))?;

        Ok(CreateRecordRequest {
            kind,
            origin_id,
            metadata,
            payload,
        })
    }
}

fn invalid(e: impl std::fmt::Display) -> ServerError {
    ServerError::InvalidRequest(e.to_string())
}

fn parse_id(raw: &str) -> ServerResult<RecordId> {
    raw.parse().map_err(invalid)
}

pub async fn create_record(
    State(state): State<AppState>,
    body: Result<Json<CreateRecordBody>, JsonRejection>,
) -> ServerResult<(StatusCode, Json<RecordDescriptor>)> {
    let Json(body) = body.map_err(|e| ServerError::InvalidRequest(e.body_text()))?;
    let request = body.into_request()?;
    let descriptor = state.ledger.create(request).await?;
    state.persist().await;
    Ok((StatusCode::CREATED, Json(descriptor)))
}

/// Query string of `GET /v1/provenance`.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchParams {
    pub origin_id: Option<String>,
    pub kind: Option<String>,
    pub start_time: Option<u64>,
    pub end_time: Option<u64>,
    /// Comma-separated.
    pub tags: Option<String>,
    pub offset: Option<usize>,
    pub limit: Option<usize>,
    pub sort_by: Option<SortKey>,
    pub sort_order: Option<SortOrder>,
}

impl SearchParams {
    fn into_query(self, state: &AppState) -> ServerResult<(QueryFilter, PageRequest)> {
        let origin_id = self
            .origin_id
            .map(OriginId::new)
            .transpose()
            .map_err(invalid)?;
        let kind = self
            .kind
            .map(|k| k.parse::<RecordKind>())
            .transpose()
            .map_err(invalid)?;
        let time_range = match (self.start_time, self.end_time) {
            (None, None) => None,
            (start, end) => Some(TimeRange { start, end }),
        };
        let tags = self
            .tags
            .map(|raw| {
                raw.split(',')
                    .map(str::trim)
                    .filter(|t| !t.is_empty())
                    .map(String::from)
                    .collect()
            })
            .unwrap_or_default();

        let filter = QueryFilter {
            origin_id,
            kind,
            time_range,
            tags,
        };
        let page = PageRequest {
            offset: self.offset.unwrap_or(0),
            limit: Some(state.config.page_limit(self.limit)),
            sort_by: self.sort_by.unwrap_or_default(),
            sort_order: self.sort_order.unwrap_or_default(),
        };
        Ok((filter, page))
    }
}

pub async fn list_records(
    State(state): State<AppState>,
    params: Result<Query<SearchParams>, QueryRejection>,
) -> ServerResult<Json<QueryPage>> {
    let Query(params) = params.map_err(|e| ServerError::InvalidRequest(e.body_text()))?;
    let (filter, page) = params.into_query(&state)?;
    Ok(Json(state.ledger.query(&filter, &page)?))
}

/// Body of `POST /v1/provenance/search`.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct SearchBody {
    #[serde(flatten)]
    pub filter: QueryFilter,
    #[serde(flatten)]
    pub page: PageRequest,
}

pub async fn search_records(
    State(state): State<AppState>,
    body: Result<Json<SearchBody>, JsonRejection>,
) -> ServerResult<Json<QueryPage>> {
    let Json(SearchBody { filter, mut page }) =
        body.map_err(|e| ServerError::InvalidRequest(e.body_text()))?;
    page.limit = Some(state.config.page_limit(page.limit));
    Ok(Json(state.ledger.query(&filter, &page)?))
}

#[derive(Debug, Default, Deserialize)]
pub struct RecentParams {
    pub limit: Option<usize>,
}

pub async fn recent_records(
    State(state): State<AppState>,
    params: Result<Query<RecentParams>, QueryRejection>,
) -> ServerResult<Json<Vec<ProvenanceRecord>>> {
    let Query(params) = params.map_err(|e| ServerError::InvalidRequest(e.body_text()))?;
    let limit = params
        .limit
        .unwrap_or(state.config.recent_limit)
        .min(state.config.max_page_limit);
    Ok(Json(state.ledger.recent(limit)?))
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordParams {
    #[serde(default)]
    pub verify_chain: bool,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordResponse {
    pub record: ProvenanceRecord,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub chain: Option<ChainReport>,
}

pub async fn get_record(
    State(state): State<AppState>,
    Path(id): Path<String>,
    params: Result<Query<RecordParams>, QueryRejection>,
) -> ServerResult<Json<RecordResponse>> {
    let Query(params) = params.map_err(|e| ServerError::InvalidRequest(e.body_text()))?;
    let id = parse_id(&id)?;
    let record = state
        .ledger
        .get_by_id(&id)?
        .ok_or_else(|| ServerError::NotFound(format!("record {id}")))?;
    let chain = if params.verify_chain {
        Some(state.ledger.verify_chain(&id)?)
    } else {
        None
    };
    Ok(Json(RecordResponse { record, chain }))
}

/// Walks the chain from `id`. An invalid or missing chain is still a 200;
/// the outcome is in the report.
pub async fn verify_chain(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ServerResult<Json<ChainReport>> {
    let id = parse_id(&id)?;
    Ok(Json(state.ledger.verify_chain(&id)?))
}

pub async fn verify_durable(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ServerResult<Json<DurableCopyReport>> {
    let id = parse_id(&id)?;
    state
        .ledger
        .verify_durable_copy(&id)
        .await?
        .map(Json)
        .ok_or_else(|| ServerError::NotFound(format!("record {id}")))
}

pub async fn statistics(State(state): State<AppState>) -> ServerResult<Json<LedgerStatistics>> {
    Ok(Json(state.ledger.statistics()?))
}

pub async fn audit(State(state): State<AppState>) -> ServerResult<Json<AuditReport>> {
    Ok(Json(state.ledger.audit()?))
}

pub async fn export_ledger(State(state): State<AppState>) -> ServerResult<Json<LedgerExport>> {
    Ok(Json(state.ledger.export()?))
}

pub async fn import_ledger(
    State(state): State<AppState>,
    body: Result<Json<LedgerExport>, JsonRejection>,
) -> ServerResult<Json<AuditReport>> {
    let Json(export) = body.map_err(|e| ServerError::InvalidRequest(e.body_text()))?;
    let report = state.ledger.import(export)?;
    state.persist().await;
    tracing::info!(records = report.record_count, "ledger imported");
    Ok(Json(report))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn body(value: Value) -> CreateRecordBody {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn missing_fields_are_named() {
        let err = body(json!({ "kind": "compute" })).into_request().unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("originId"), "{msg}");
        assert!(msg.contains("metadata"), "{msg}");
        assert!(msg.contains("payload"), "{msg}");
        assert!(!msg.contains("kind,"), "{msg}");
    }

    #[test]
    fn payload_kind_is_inferred() {
        let request = body(json!({
            "kind": "reasoning",
            "originId": "miner-1",
            "metadata": { "computationType": "inference" },
            "payload": { "steps": ["a", "b"], "conclusion": "c" }
        }))
        .into_request()
        .unwrap();
        assert_eq!(request.kind, RecordKind::Reasoning);
        assert_eq!(request.payload.kind(), RecordKind::Reasoning);
    }

    #[test]
    fn unknown_kind_and_blank_origin_rejected() {
        let unknown = body(json!({
            "kind": "training",
            "originId": "m",
            "metadata": { "computationType": "x" },
            "payload": {}
        }));
        assert!(matches!(unknown.into_request(), Err(ServerError::InvalidRequest(_))));

        let blank = body(json!({
            "kind": "compute",
            "originId": "  ",
            "metadata": { "computationType": "x" },
            "payload": {}
        }));
        assert!(matches!(blank.into_request(), Err(ServerError::InvalidRequest(_))));
    }
}
