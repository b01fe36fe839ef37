use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use serde_json::json;
use thiserror::Error;

use crate::config::ConfigError;
use crate::core::TableLoadError;
use crate::telemetry::TelemetryError;

/// Why a calculation could not produce a number.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Error, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum NoSolution {
    #[error("payment never exceeds the interest accrued; the loan does not amortize")]
    NonAmortizing,
    #[error("division by zero")]
    DivisionByZero,
    #[error("result is outside the supported integer range")]
    Overflow,
    #[error("reference value must be positive")]
    ZeroReference,
    #[error("income does not leave room for a housing payment")]
    InsufficientIncome,
    #[error("a shortfall remains but there are no periods to save over")]
    NoPeriods,
}

#[derive(Clone, Debug, PartialEq, Error)]
pub enum CalcError {
    #[error("{field} {reason}")]
    InvalidField { field: &'static str, reason: String },
    #[error("cannot compute: {0}")]
    NoSolution(#[from] NoSolution),
}

impl CalcError {
    pub fn invalid(field: &'static str, reason: impl Into<String>) -> Self {
        Self::InvalidField {
            field,
            reason: reason.into(),
        }
    }

    pub fn field(&self) -> Option<&'static str> {
        match self {
            Self::InvalidField { field, .. } => Some(field),
            Self::NoSolution(_) => None,
        }
    }
}

impl IntoResponse for CalcError {
    fn into_response(self) -> Response {
        let message = self.to_string();
        let (status, body) = match self {
            CalcError::InvalidField { field, .. } => (
                StatusCode::BAD_REQUEST,
                json!({ "error": message, "field": field }),
            ),
            CalcError::NoSolution(kind) => (
                StatusCode::UNPROCESSABLE_ENTITY,
                json!({ "error": message, "kind": kind }),
            ),
        };
        (status, Json(body)).into_response()
    }
}

/// Process-level failures surfaced by the binary.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),
    #[error("telemetry error: {0}")]
    Telemetry(#[from] TelemetryError),
    #[error("table error: {0}")]
    Table(#[from] TableLoadError),
    #[error("calculation error: {0}")]
    Calc(#[from] CalcError),
    #[error("serialization error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}
