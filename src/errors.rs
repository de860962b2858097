use actix_web::http::StatusCode;
use actix_web::{HttpResponse, ResponseError};
use std::fmt;

use crate::templates_structs::ApiErrorResponse;

#[derive(Debug)]
pub enum AppError {
    Db(sqlx::Error),
    Json(serde_json::Error),
    Template(askama::Error),
    Session(String),
    Unauthorized,
    /// Malformed input or a lifecycle guard violation. Nothing was written.
    Validation(String),
    /// Already signed, consumed token, or a lost race on the document row.
    Conflict(String),
    NotFound,
    /// The signing link is unusable. Callers must not learn why.
    Expired,
    /// Resend throttled; carries the seconds until the next send is allowed.
    CooldownActive(u64),
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::Db(e) => write!(f, "Database error: {e}"),
            AppError::Json(e) => write!(f, "JSON error: {e}"),
            AppError::Template(e) => write!(f, "Template error: {e}"),
            AppError::Session(e) => write!(f, "Session error: {e}"),
            AppError::Unauthorized => write!(f, "Not authenticated"),
            AppError::Validation(msg) => write!(f, "Validation failed: {msg}"),
            AppError::Conflict(msg) => write!(f, "Conflict: {msg}"),
            AppError::NotFound => write!(f, "Not found"),
            AppError::Expired => write!(f, "This signing link is no longer available"),
            AppError::CooldownActive(secs) => {
                write!(f, "Please wait {secs} seconds before resending")
            }
        }
    }
}

impl std::error::Error for AppError {}

impl AppError {
    fn body(&self) -> ApiErrorResponse {
        let (error, details) = match self {
            AppError::Validation(msg) => ("Validation failed", Some(msg.clone())),
            AppError::Conflict(msg) => ("Conflict", Some(msg.clone())),
            AppError::NotFound => ("Not found", None),
            AppError::Expired => ("This signing link is no longer available", None),
            AppError::CooldownActive(_) => ("Resend cooldown active", Some(self.to_string())),
            AppError::Unauthorized => ("Not authenticated", None),
            _ => ("Internal server error", None),
        };
        ApiErrorResponse {
            error: error.to_string(),
            details,
        }
    }
}

impl ResponseError for AppError {
    fn status_code(&self) -> StatusCode {
        match self {
            AppError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::NotFound => StatusCode::NOT_FOUND,
            AppError::Expired => StatusCode::GONE,
            AppError::CooldownActive(_) => StatusCode::TOO_MANY_REQUESTS,
            AppError::Unauthorized => StatusCode::UNAUTHORIZED,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let status = self.status_code();
        if status.is_server_error() {
            log::error!("{self}");
        }
        let mut builder = HttpResponse::build(status);
        if let AppError::CooldownActive(secs) = self {
            builder.insert_header(("Retry-After", secs.to_string()));
        }
        builder.json(self.body())
    }
}

impl From<sqlx::Error> for AppError {
    fn from(e: sqlx::Error) -> Self {
        AppError::Db(e)
    }
}

impl From<serde_json::Error> for AppError {
    fn from(e: serde_json::Error) -> Self {
        AppError::Json(e)
    }
}

impl From<askama::Error> for AppError {
    fn from(e: askama::Error) -> Self {
        AppError::Template(e)
    }
}

/// Render an Askama template into an HTML response.
pub fn render(tmpl: impl askama::Template) -> Result<HttpResponse, AppError> {
    render_with_status(StatusCode::OK, tmpl)
}

pub fn render_with_status(
    status: StatusCode,
    tmpl: impl askama::Template,
) -> Result<HttpResponse, AppError> {
    let html = tmpl.render()?;
    Ok(HttpResponse::build(status)
        .content_type("text/html; charset=utf-8")
        .body(html))
}
