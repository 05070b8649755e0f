//! # tabkeep-server
//!
//! HTTP surface over one workbook: list sheets, fetch a sheet, submit an
//! edited table, trigger a manual save and toggle autosave.

pub mod config;
pub mod error;

use std::path::PathBuf;
use std::sync::Arc;

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::routing::{get, post, put};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use tabkeep_sheet::{normalize, Sheet, SheetError, SheetStore, WorkbookStore};
use tabkeep_sync::{
    EditDecision, Notice, PendingChanges, PersistenceController, SaveTicket, SheetStatus,
};
use tokio::sync::Mutex;
use tower_http::trace::TraceLayer;

pub use config::ServerConfig;
pub use error::{ApiError, ErrorBody};

type ApiResult<T> = Result<Json<T>, ApiError>;

/// Shared handler state.
#[derive(Clone)]
pub struct AppState {
    file: PathBuf,
    store: Option<Arc<dyn SheetStore>>,
    controller: Arc<Mutex<PersistenceController>>,
}

impl AppState {
    /// Open the configured workbook.
    ///
    /// A missing file is logged, not fatal: sheet routes then answer with
    /// `file_not_found`.
    #[must_use]
    pub fn from_config(config: &ServerConfig) -> Self {
        let store = match WorkbookStore::open(&config.file) {
            Ok(store) => Some(Arc::new(store) as Arc<dyn SheetStore>),
            Err(err) => {
                tracing::error!(error = %err, "workbook unavailable");
                None
            }
        };
        AppState {
            file: config.file.clone(),
            store,
            controller: Arc::new(Mutex::new(PersistenceController::new(!config.no_autosave))),
        }
    }

    /// State over any store.
    #[must_use]
    pub fn with_store(store: Arc<dyn SheetStore>, autosave: bool) -> Self {
        AppState {
            file: PathBuf::new(),
            store: Some(store),
            controller: Arc::new(Mutex::new(PersistenceController::new(autosave))),
        }
    }

    fn store(&self) -> Result<Arc<dyn SheetStore>, ApiError> {
        self.store.clone().ok_or_else(|| {
            ApiError::Sheet(SheetError::FileNotFound {
                path: self.file.clone(),
            })
        })
    }

    /// Load and track `name` unless it is already tracked.
    async fn ensure_open(&self, name: &str) -> Result<Arc<dyn SheetStore>, ApiError> {
        let store = self.store()?;
        if self.controller.lock().await.is_tracked(name) {
            return Ok(store);
        }

        let loader = Arc::clone(&store);
        let sheet_name = name.to_string();
        let table = tokio::task::spawn_blocking(move || loader.load(&sheet_name).map(normalize))
            .await
            .map_err(|e| SheetError::Load {
                what: name.to_string(),
                message: e.to_string(),
            })??;

        // Another request may have registered it meanwhile; keep the first.
        if self.controller.lock().await.register(name, table) {
            tracing::info!(sheet = name, "sheet loaded");
        }
        Ok(store)
    }

    /// Run a ticket's save on the blocking pool and commit the result.
    ///
    /// Save and commit run in their own task, so the sheet leaves `Saving`
    /// even if the request that started the save is dropped.
    async fn run_save(&self, store: Arc<dyn SheetStore>, ticket: SaveTicket) -> Notice {
        let controller = Arc::clone(&self.controller);
        let sheet_name = ticket.sheet().to_string();

        let task = tokio::spawn(async move {
            let name = ticket.sheet().to_string();
            let table = ticket.table().clone();
            let result = tokio::task::spawn_blocking(move || store.save(&name, &table))
                .await
                .unwrap_or_else(|e| Err(SheetError::Write(format!("save task failed: {e}"))));

            controller.lock().await.complete_save(ticket, result)
        });

        task.await.unwrap_or_else(|e| {
            tracing::error!(sheet = %sheet_name, error = %e, "save task failed");
            Notice::error(format!("Save failed: {e}"))
        })
    }
}

/// Health check response.
#[derive(Debug, Serialize, Deserialize)]
pub struct Health {
    /// Server status ("ok" when healthy).
    pub status: String,
    /// Server version from Cargo.toml.
    pub version: String,
}

#[derive(Debug, Serialize)]
pub struct SheetList {
    pub sheets: Vec<String>,
    pub autosave: bool,
}

#[derive(Debug, Serialize)]
pub struct SheetView {
    pub table: Sheet,
    pub status: SheetStatus,
}

#[derive(Debug, Serialize)]
pub struct EditResponse {
    pub status: SheetStatus,
    pub pending: PendingChanges,
    pub notice: Option<Notice>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct AutosaveToggle {
    pub enabled: bool,
}

/// Health check endpoint handler.
pub async fn health() -> Json<Health> {
    Json(Health {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

async fn list_sheets(State(state): State<AppState>) -> ApiResult<SheetList> {
    let store = state.store()?;
    let sheets = tokio::task::spawn_blocking(move || store.sheet_names())
        .await
        .map_err(|e| SheetError::Load {
            what: "sheet names".to_string(),
            message: e.to_string(),
        })??;
    let autosave = state.controller.lock().await.autosave();
    Ok(Json(SheetList { sheets, autosave }))
}

async fn get_sheet(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> ApiResult<SheetView> {
    state.ensure_open(&name).await?;
    let controller = state.controller.lock().await;
    Ok(Json(SheetView {
        table: controller.view(&name)?.clone(),
        status: controller.status(&name)?,
    }))
}

async fn edit_sheet(
    State(state): State<AppState>,
    Path(name): Path<String>,
    payload: Result<Json<Sheet>, JsonRejection>,
) -> ApiResult<EditResponse> {
    let Json(edited) = payload?;
    let store = state.ensure_open(&name).await?;

    let decision = state.controller.lock().await.record_edit(&name, edited)?;
    let notice = match decision {
        EditDecision::Save(ticket) => Some(state.run_save(store, ticket).await),
        EditDecision::Busy => {
            tracing::debug!(sheet = %name, "autosave skipped; save in progress");
            None
        }
        EditDecision::Unchanged | EditDecision::Held => None,
    };

    let controller = state.controller.lock().await;
    Ok(Json(EditResponse {
        status: controller.status(&name)?,
        pending: controller.pending(&name)?.clone(),
        notice,
    }))
}

async fn save_sheet(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> ApiResult<EditResponse> {
    let store = state.ensure_open(&name).await?;

    let ticket = state.controller.lock().await.request_save(&name)?;
    let notice = match ticket {
        Some(ticket) => state.run_save(store, ticket).await,
        None => Notice::info(format!("A save for {name} is already in progress")),
    };

    let controller = state.controller.lock().await;
    Ok(Json(EditResponse {
        status: controller.status(&name)?,
        pending: controller.pending(&name)?.clone(),
        notice: Some(notice),
    }))
}

async fn set_autosave(
    State(state): State<AppState>,
    payload: Result<Json<AutosaveToggle>, JsonRejection>,
) -> ApiResult<AutosaveToggle> {
    let Json(toggle) = payload?;
    state.controller.lock().await.set_autosave(toggle.enabled);
    Ok(Json(toggle))
}

/// Create the application router.
///
/// This is separated from `main()` to allow testing.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/sheets", get(list_sheets))
        .route("/sheets/:name", get(get_sheet).post(edit_sheet))
        .route("/sheets/:name/save", post(save_sheet))
        .route("/autosave", put(set_autosave))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
