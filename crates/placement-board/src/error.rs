use crate::config::ConfigError;
use crate::telemetry::TelemetryError;
use crate::workflows::pipeline::{BoardError, BoardServiceError, SeedError};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use std::fmt;

#[derive(Debug)]
pub enum AppError {
    Config(ConfigError),
    Telemetry(TelemetryError),
    Io(std::io::Error),
    Seed(SeedError),
    Board(BoardServiceError),
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::Config(err) => write!(f, "configuration error: {}", err),
            AppError::Telemetry(err) => write!(f, "telemetry error: {}", err),
            AppError::Io(err) => write!(f, "io error: {}", err),
            AppError::Seed(err) => write!(f, "seed error: {}", err),
            AppError::Board(err) => write!(f, "pipeline board error: {}", err),
        }
    }
}

impl std::error::Error for AppError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            AppError::Config(err) => Some(err),
            AppError::Telemetry(err) => Some(err),
            AppError::Io(err) => Some(err),
            AppError::Seed(err) => Some(err),
            AppError::Board(err) => Some(err),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = match self {
            AppError::Seed(_) => StatusCode::BAD_REQUEST,
            AppError::Board(BoardServiceError::Board(BoardError::UnknownCard(_))) => {
                StatusCode::NOT_FOUND
            }
            AppError::Board(BoardServiceError::Board(BoardError::UnknownStage(_))) => {
                StatusCode::BAD_REQUEST
            }
            AppError::Board(BoardServiceError::Repository(_)) => StatusCode::SERVICE_UNAVAILABLE,
            AppError::Config(_) | AppError::Telemetry(_) | AppError::Io(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };

        let body = Json(json!({ "error": self.to_string() }));
        (status, body).into_response()
    }
}

impl From<ConfigError> for AppError {
    fn from(value: ConfigError) -> Self {
        Self::Config(value)
    }
}

impl From<TelemetryError> for AppError {
    fn from(value: TelemetryError) -> Self {
        Self::Telemetry(value)
    }
}

impl From<std::io::Error> for AppError {
    fn from(value: std::io::Error) -> Self {
        Self::Io(value)
    }
}

impl From<SeedError> for AppError {
    fn from(value: SeedError) -> Self {
        Self::Seed(value)
    }
}

impl From<BoardServiceError> for AppError {
    fn from(value: BoardServiceError) -> Self {
        Self::Board(value)
    }
}

impl From<BoardError> for AppError {
    fn from(value: BoardError) -> Self {
        Self::Board(BoardServiceError::Board(value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workflows::pipeline::{CardId, RepositoryError};

    #[test]
    fn maps_board_errors_to_http_statuses() {
        let missing = AppError::from(BoardServiceError::from(BoardError::UnknownCard(
            CardId::new("42"),
        )));
        assert!(missing.to_string().contains("42"));
        assert_eq!(missing.into_response().status(), StatusCode::NOT_FOUND);

        let offline = AppError::from(BoardServiceError::from(RepositoryError::Unavailable(
            "database offline".to_string(),
        )));
        assert_eq!(
            offline.into_response().status(),
            StatusCode::SERVICE_UNAVAILABLE
        );
    }
}
