use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Router,
};
use serde::Deserialize;
use serde_json::json;

use super::domain::CardId;
use super::repository::{FailureNotifier, PipelineRepository};
use super::service::{BoardServiceError, PipelineBoardService};
use super::store::{BoardError, MoveOutcome};
use super::surface::{DropTargetPayload, MoveIntent, ViewConfig};

/// Router builder exposing the board to browser clients.
pub fn pipeline_router<R, A>(service: Arc<PipelineBoardService<R, A>>) -> Router
where
    R: PipelineRepository + 'static,
    A: FailureNotifier + 'static,
{
    Router::new()
        .route("/api/v1/pipeline/board", get(board_handler::<R, A>))
        .route(
            "/api/v1/pipeline/board/refresh",
            post(refresh_handler::<R, A>),
        )
        .route("/api/v1/pipeline/drag", post(drag_handler::<R, A>))
        .route(
            "/api/v1/pipeline/cards/:card_id/move",
            post(move_handler::<R, A>),
        )
        .route(
            "/api/v1/pipeline/cards/:card_id/menu",
            get(menu_handler::<R, A>).post(menu_select_handler::<R, A>),
        )
        .route(
            "/api/v1/pipeline/cards/:card_id/activate",
            post(activate_handler::<R, A>),
        )
        .route(
            "/api/v1/pipeline/cards/:card_id/history",
            get(history_handler::<R, A>),
        )
        .with_state(service)
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct BoardQuery {
    #[serde(default)]
    pub(crate) expanded: Option<String>,
    #[serde(default)]
    pub(crate) focus: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct MovePayload {
    pub(crate) stage: String,
    #[serde(default)]
    pub(crate) sub_stage: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct DragPayload {
    pub(crate) card_id: String,
    pub(crate) to: DropTargetPayload,
}

pub(crate) async fn board_handler<R, A>(
    State(service): State<Arc<PipelineBoardService<R, A>>>,
    Query(query): Query<BoardQuery>,
) -> Response
where
    R: PipelineRepository + 'static,
    A: FailureNotifier + 'static,
{
    let config = ViewConfig::from_query(query.expanded.as_deref(), query.focus.as_deref());
    (StatusCode::OK, axum::Json(service.render(&config))).into_response()
}

pub(crate) async fn refresh_handler<R, A>(
    State(service): State<Arc<PipelineBoardService<R, A>>>,
) -> Response
where
    R: PipelineRepository + 'static,
    A: FailureNotifier + 'static,
{
    match service.refresh().await {
        Ok(summary) => (StatusCode::OK, axum::Json(summary)).into_response(),
        Err(error) => service_error_response(error),
    }
}

pub(crate) async fn move_handler<R, A>(
    State(service): State<Arc<PipelineBoardService<R, A>>>,
    Path(card_id): Path<String>,
    axum::Json(payload): axum::Json<MovePayload>,
) -> Response
where
    R: PipelineRepository + 'static,
    A: FailureNotifier + 'static,
{
    let intent = match MoveIntent::parse(
        CardId(card_id),
        &payload.stage,
        payload.sub_stage.as_deref(),
    ) {
        Ok(intent) => intent,
        Err(error) => return board_error_response(error),
    };

    match service.apply(intent).await {
        Ok(outcome) => outcome_response(outcome),
        Err(error) => board_error_response(error),
    }
}

pub(crate) async fn drag_handler<R, A>(
    State(service): State<Arc<PipelineBoardService<R, A>>>,
    axum::Json(payload): axum::Json<DragPayload>,
) -> Response
where
    R: PipelineRepository + 'static,
    A: FailureNotifier + 'static,
{
    let target = match payload.to.into_target() {
        Ok(target) => target,
        Err(error) => return board_error_response(error),
    };

    match service.drag(&CardId(payload.card_id), target).await {
        Ok(Some(outcome)) => outcome_response(outcome),
        Ok(None) => StatusCode::NO_CONTENT.into_response(),
        Err(error) => board_error_response(error),
    }
}

pub(crate) async fn menu_handler<R, A>(
    State(service): State<Arc<PipelineBoardService<R, A>>>,
    Path(card_id): Path<String>,
) -> Response
where
    R: PipelineRepository + 'static,
    A: FailureNotifier + 'static,
{
    match service.menu(&CardId(card_id)) {
        Ok(menu) => (StatusCode::OK, axum::Json(menu)).into_response(),
        Err(error) => board_error_response(error),
    }
}

pub(crate) async fn menu_select_handler<R, A>(
    State(service): State<Arc<PipelineBoardService<R, A>>>,
    Path(card_id): Path<String>,
    axum::Json(payload): axum::Json<MovePayload>,
) -> Response
where
    R: PipelineRepository + 'static,
    A: FailureNotifier + 'static,
{
    let intent = match MoveIntent::parse(
        CardId(card_id),
        &payload.stage,
        payload.sub_stage.as_deref(),
    ) {
        Ok(intent) => intent,
        Err(error) => return board_error_response(error),
    };

    match service
        .select_from_menu(&intent.card_id, intent.destination)
        .await
    {
        Ok(Some(outcome)) => outcome_response(outcome),
        Ok(None) => {
            let payload = json!({
                "error": format!("{} is not offered for card {}", intent.destination, intent.card_id),
            });
            (StatusCode::UNPROCESSABLE_ENTITY, axum::Json(payload)).into_response()
        }
        Err(error) => board_error_response(error),
    }
}

pub(crate) async fn activate_handler<R, A>(
    State(service): State<Arc<PipelineBoardService<R, A>>>,
    Path(card_id): Path<String>,
) -> Response
where
    R: PipelineRepository + 'static,
    A: FailureNotifier + 'static,
{
    match service.activate(&CardId(card_id)) {
        Ok(request) => (StatusCode::OK, axum::Json(request)).into_response(),
        Err(error) => board_error_response(error),
    }
}

pub(crate) async fn history_handler<R, A>(
    State(service): State<Arc<PipelineBoardService<R, A>>>,
    Path(card_id): Path<String>,
) -> Response
where
    R: PipelineRepository + 'static,
    A: FailureNotifier + 'static,
{
    match service.history(&CardId(card_id)).await {
        Ok(entries) => (StatusCode::OK, axum::Json(entries)).into_response(),
        Err(error) => service_error_response(error),
    }
}

fn outcome_response(outcome: MoveOutcome) -> Response {
    let label = outcome.label();
    match outcome {
        MoveOutcome::Confirmed(card) => {
            let payload = json!({ "outcome": label, "card": card });
            (StatusCode::OK, axum::Json(payload)).into_response()
        }
        MoveOutcome::RolledBack { card, notice } => {
            let payload = json!({ "outcome": label, "card": card, "notice": notice });
            (StatusCode::BAD_GATEWAY, axum::Json(payload)).into_response()
        }
        MoveOutcome::Ignored(card_id) => {
            let payload = json!({ "outcome": label, "card_id": card_id });
            (StatusCode::ACCEPTED, axum::Json(payload)).into_response()
        }
        MoveOutcome::Stale(card_id) => {
            let payload = json!({ "outcome": label, "card_id": card_id });
            (StatusCode::CONFLICT, axum::Json(payload)).into_response()
        }
    }
}

fn board_error_response(error: BoardError) -> Response {
    let status = match error {
        BoardError::UnknownCard(_) => StatusCode::NOT_FOUND,
        BoardError::UnknownStage(_) => StatusCode::BAD_REQUEST,
    };
    let payload = json!({ "error": error.to_string() });
    (status, axum::Json(payload)).into_response()
}

fn service_error_response(error: BoardServiceError) -> Response {
    match error {
        BoardServiceError::Board(error) => board_error_response(error),
        BoardServiceError::Repository(error) => {
            let payload = json!({ "error": error.to_string() });
            (StatusCode::SERVICE_UNAVAILABLE, axum::Json(payload)).into_response()
        }
    }
}
