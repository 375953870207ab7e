use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

/// Rejections the scheduling rules can produce before anything is written.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SchedulingError {
    #[error("Horário Ocupado: já existe um agendamento neste horário")]
    Conflict,

    #[error("Horário inválido: não é possível agendar no passado")]
    Past,

    #[error("Horário inválido: o atendimento terminaria às {end}, após o fechamento")]
    TooLate { end: String },

    #[error("Horário inválido: fora do horário de funcionamento")]
    OutsideHours,

    #[error("Horário inválido: {start} não corresponde a um horário da agenda")]
    Misaligned { start: String },
}

impl SchedulingError {
    pub fn kind(&self) -> &'static str {
        match self {
            SchedulingError::Conflict => "conflict",
            SchedulingError::Past => "past",
            SchedulingError::TooLate { .. } => "too_late",
            SchedulingError::OutsideHours => "outside_hours",
            SchedulingError::Misaligned { .. } => "misaligned",
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("{0}")]
    Validation(String),

    #[error(transparent)]
    Scheduling(#[from] SchedulingError),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("unauthorized")]
    Unauthorized,

    #[error("internal error: {0}")]
    Internal(String),
}

impl From<anyhow::Error> for AppError {
    fn from(e: anyhow::Error) -> Self {
        AppError::Internal(e.to_string())
    }
}

impl AppError {
    pub fn kind(&self) -> &'static str {
        match self {
            AppError::Database(_) | AppError::Internal(_) => "persistence",
            AppError::Validation(_) => "validation",
            AppError::Scheduling(e) => e.kind(),
            AppError::NotFound(_) => "not_found",
            AppError::Unauthorized => "unauthorized",
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = match &self {
            AppError::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::Scheduling(SchedulingError::Conflict) => StatusCode::CONFLICT,
            AppError::Scheduling(_) => StatusCode::UNPROCESSABLE_ENTITY,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Unauthorized => StatusCode::UNAUTHORIZED,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        // Storage details stay in the log.
        let message = match &self {
            AppError::Database(e) => {
                tracing::error!(error = %e, "database failure");
                "Não foi possível salvar as alterações".to_string()
            }
            AppError::Internal(e) => {
                tracing::error!(error = %e, "internal failure");
                "Não foi possível salvar as alterações".to_string()
            }
            other => other.to_string(),
        };

        let body = serde_json::json!({ "error": self.kind(), "message": message });
        (status, axum::Json(body)).into_response()
    }
}
