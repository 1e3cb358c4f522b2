#![cfg(not(tarpaulin_include))]

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::{StatusCode, header},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use chrono::{Local, NaiveDateTime};
use log::{error, info};
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::net::TcpListener;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::agreement::{
    AgreementRecord, AgreementSheet, IndexEntry, IssuedAgreement, StaffDetails, issue_agreement,
    verify_doc_hash,
};
use crate::config::AppConfig;
use crate::conflict::{ClientSplit, ExclusionLists, find_active_record, split_clients};
use crate::dates::parse_date;
use crate::document::DocType;
use crate::error::LedgerError;
use crate::export;
use crate::identifier::{Location, PartitionKey, allocate, next_uid};
use crate::intake::{ClientIntake, load_intake};
use crate::invoice::{InvoiceRequest, IssuedInvoice, end_service, issue_invoice};
use crate::record::LedgerRecord;
use crate::sheet::{CachedSheet, CsvSheet, SheetStore};
use crate::snapshot;

type Ledger = CachedSheet<CsvSheet<LedgerRecord>, LedgerRecord>;

const INDEX_SHEET: &str = "Agreements_Index";

pub struct AppState {
    config: AppConfig,
    ledger: Mutex<Ledger>,
}

impl AppState {
    pub fn new(config: AppConfig) -> Self {
        let ledger = CachedSheet::new(CsvSheet::new(&config.ledger_path), config.cache_ttl());
        AppState {
            config,
            ledger: Mutex::new(ledger),
        }
    }

    fn ledger(&self) -> Result<MutexGuard<'_, Ledger>, ApiError> {
        self.ledger
            .lock()
            .map_err(|_| ApiError::Internal("ledger lock poisoned".to_string()))
    }
}

/// Handler error, rendered as `{"status": "error", "message": ...}`.
enum ApiError {
    Ledger(LedgerError),
    BadRequest(String),
    NotFound(String),
    Internal(String),
}

impl From<LedgerError> for ApiError {
    fn from(e: LedgerError) -> Self {
        ApiError::Ledger(e)
    }
}

#[derive(Serialize)]
struct ErrorResponse {
    status: String,
    message: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (code, message) = match self {
            ApiError::Ledger(e) => {
                let code = match &e {
                    LedgerError::ActiveEngagement { .. } | LedgerError::DuplicateAgreement { .. } => {
                        StatusCode::CONFLICT
                    }
                    LedgerError::NoActiveRecord { .. } | LedgerError::RowNotFound { .. } => {
                        StatusCode::NOT_FOUND
                    }
                    _ => StatusCode::INTERNAL_SERVER_ERROR,
                };
                (code, e.to_string())
            }
            ApiError::BadRequest(m) => (StatusCode::BAD_REQUEST, m),
            ApiError::NotFound(m) => (StatusCode::NOT_FOUND, m),
            ApiError::Internal(m) => (StatusCode::INTERNAL_SERVER_ERROR, m),
        };
        if code.is_server_error() {
            error!("request failed: {}", message);
        }
        let body = ErrorResponse {
            status: "error".to_string(),
            message,
        };
        (code, Json(body)).into_response()
    }
}

#[derive(Deserialize)]
struct NextIdQuery {
    date: String,
    location: String,
}

#[derive(Serialize)]
struct NextIdResponse {
    partition: String,
    identifier: String,
}

#[derive(Serialize)]
struct UidResponse {
    uid: String,
}

#[derive(Deserialize)]
struct AgreementRequest {
    invoice_number: String,
    staff: StaffDetails,
    #[serde(default = "default_agreement_type")]
    doc_type: DocType,
}

fn default_agreement_type() -> DocType {
    DocType::NurseAgreement
}

fn now() -> NaiveDateTime {
    Local::now().naive_local()
}

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/api/ledger", get(get_ledger))
        .route("/api/ledger.csv", get(download_csv))
        .route("/api/ledger.xlsx", get(download_xlsx))
        .route("/api/next-id", get(preview_identifier))
        .route("/api/uid", get(preview_uid))
        .route("/api/clients", get(get_clients))
        .route("/api/active/:reference_key", get(get_active))
        .route("/api/invoice", post(post_invoice))
        .route("/api/end-service/:reference_key", post(post_end_service))
        .route("/api/agreement", post(post_agreement))
        .route("/api/verify/:hash", get(get_verify))
        .route("/api/snapshot", get(download_snapshot))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

pub async fn run(config: AppConfig) -> Result<(), Box<dyn std::error::Error>> {
    let bind_addr = config.bind_addr.clone();
    let app = router(Arc::new(AppState::new(config)));

    let listener = TcpListener::bind(&bind_addr).await?;
    info!("Listening on http://{}", bind_addr);
    axum::serve(listener, app).await?;

    Ok(())
}

async fn get_ledger(State(state): State<Arc<AppState>>) -> Result<Json<Vec<LedgerRecord>>, ApiError> {
    let ledger = state.ledger()?.read_all()?;
    Ok(Json(ledger))
}

async fn download_csv(State(state): State<Arc<AppState>>) -> Result<Response, ApiError> {
    let ledger = state.ledger()?.read_all()?;
    let body = export::to_csv(&ledger);
    Ok((
        [
            (header::CONTENT_TYPE, "text/csv"),
            (header::CONTENT_DISPOSITION, "attachment; filename=\"ledger.csv\""),
        ],
        body,
    )
        .into_response())
}

async fn download_xlsx(State(state): State<Arc<AppState>>) -> Result<Response, ApiError> {
    let ledger = state.ledger()?.read_all()?;
    let body = export::to_xlsx(&ledger)?;
    Ok((
        [
            (
                header::CONTENT_TYPE,
                "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
            ),
            (header::CONTENT_DISPOSITION, "attachment; filename=\"ledger.xlsx\""),
        ],
        body,
    )
        .into_response())
}

async fn download_snapshot(State(state): State<Arc<AppState>>) -> Result<Response, ApiError> {
    let ledger = state.ledger()?.read_all()?;
    let body = snapshot::to_bytes(&ledger)?;
    Ok((
        [
            (header::CONTENT_TYPE, "application/gzip"),
            (header::CONTENT_DISPOSITION, "attachment; filename=\"ledger.bin.gz\""),
        ],
        body,
    )
        .into_response())
}

async fn preview_identifier(
    Query(params): Query<NextIdQuery>,
    State(state): State<Arc<AppState>>,
) -> Result<Json<NextIdResponse>, ApiError> {
    let date = parse_date(&params.date)
        .ok_or_else(|| ApiError::BadRequest(format!("invalid date '{}'", params.date)))?;
    let location = Location::from_code(&params.location)
        .unwrap_or_else(|| Location::infer(&params.location));
    let partition = PartitionKey::new(location, date);

    let ledger = state.ledger()?.read_all()?;
    Ok(Json(NextIdResponse {
        partition: partition.to_string(),
        identifier: allocate(&partition, &ledger).to_string(),
    }))
}

async fn preview_uid(State(state): State<Arc<AppState>>) -> Result<Json<UidResponse>, ApiError> {
    let ledger = state.ledger()?.read_all()?;
    Ok(Json(UidResponse {
        uid: next_uid(&ledger),
    }))
}

#[derive(Serialize)]
struct ClientsResponse {
    #[serde(flatten)]
    split: ClientSplit<ClientIntake>,
    /// Reference keys already in the ledger, and those with a closed row.
    keys: ExclusionLists,
}

async fn get_clients(
    State(state): State<Arc<AppState>>,
) -> Result<Json<ClientsResponse>, ApiError> {
    let clients = load_intake(&state.config.intake_path)?;
    let ledger = state.ledger()?.read_all()?;
    Ok(Json(ClientsResponse {
        split: split_clients(clients, &ledger, ClientIntake::reference_key),
        keys: ExclusionLists::scan(&ledger),
    }))
}

async fn get_active(
    Path(reference_key): Path<String>,
    State(state): State<Arc<AppState>>,
) -> Result<Json<LedgerRecord>, ApiError> {
    let ledger = state.ledger()?.read_all()?;
    match find_active_record(&reference_key, &ledger) {
        Some(record) => Ok(Json(record.clone())),
        None => Err(LedgerError::NoActiveRecord { reference_key }.into()),
    }
}

async fn post_invoice(
    State(state): State<Arc<AppState>>,
    Json(request): Json<InvoiceRequest>,
) -> Result<Json<IssuedInvoice>, ApiError> {
    let mut ledger = state.ledger()?;
    let issued = issue_invoice(&mut *ledger, &request, now())?;
    Ok(Json(issued))
}

async fn post_end_service(
    Path(reference_key): Path<String>,
    State(state): State<Arc<AppState>>,
) -> Result<Json<LedgerRecord>, ApiError> {
    let mut ledger = state.ledger()?;
    let record = end_service(&mut *ledger, &reference_key, now())?;
    Ok(Json(record))
}

async fn post_agreement(
    State(state): State<Arc<AppState>>,
    Json(request): Json<AgreementRequest>,
) -> Result<Json<IssuedAgreement>, ApiError> {
    let ledger = state.ledger()?.read_all()?;
    let wanted = request.invoice_number.trim();
    let invoice = ledger
        .iter()
        .rev()
        .find(|r| r.identifier.trim() == wanted)
        .ok_or_else(|| ApiError::NotFound(format!("no invoice '{}' in the ledger", wanted)))?;

    let client = load_intake(&state.config.intake_path)?
        .into_iter()
        .find(|c| c.reference_key() == invoice.reference_key)
        .ok_or_else(|| {
            ApiError::NotFound(format!("no intake row for client '{}'", invoice.reference_key))
        })?;

    let kind = AgreementSheet::for_plan(&client.plan);
    let mut sheet: CsvSheet<AgreementRecord> =
        CsvSheet::new(state.config.agreement_sheet_path(kind.name()));
    let mut index: CsvSheet<IndexEntry> =
        CsvSheet::new(state.config.agreement_sheet_path(INDEX_SHEET));

    let issued = issue_agreement(
        &mut sheet,
        &mut index,
        invoice,
        &client,
        &request.staff,
        request.doc_type,
        now(),
    )?;
    Ok(Json(issued))
}

async fn get_verify(
    Path(hash): Path<String>,
    State(state): State<Arc<AppState>>,
) -> Result<Json<IndexEntry>, ApiError> {
    let index: CsvSheet<IndexEntry> = CsvSheet::new(state.config.agreement_sheet_path(INDEX_SHEET));
    let entries = index.read_all()?;
    verify_doc_hash(&entries, &hash)
        .map(Json)
        .ok_or_else(|| ApiError::NotFound(format!("no document with hash '{}'", hash.trim())))
}
