//! The error taxonomy (§7): one stable code, one HTTP status, one JSON-RPC
//! code per variant. Replaces the teacher's ad-hoc `(Status, Json<Value>)`
//! tuples with a single enum and one `Responder` impl.

use rocket::http::Status;
use rocket::response::{self, Responder, Response};
use rocket::serde::json::Json;
use rocket::Request;
use serde_json::json;

use crate::canon::CanonError;

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("unauthorized")]
    Unauthorized,
    #[error("forbidden")]
    Forbidden,
    #[error("not_a_member")]
    NotAMember,
    #[error("origin_not_allowed")]
    OriginNotAllowed,
    #[error("not_found: {0}")]
    NotFound(&'static str),
    #[error("validation_error: {0}")]
    ValidationError(String),
    #[error("message_too_large")]
    MessageTooLarge,
    #[error("invalid_room_id")]
    InvalidRoomId,
    #[error("conflict: {0}")]
    Conflict(String),
    #[error("duplicate_request")]
    DuplicateRequest,
    #[error("idempotency_evicted")]
    IdempotencyEvicted,
    #[error("rate_limited")]
    RateLimited,
    #[error("internal_error: {0}")]
    Internal(String),
    #[error("non_canonicalizable: {0}")]
    NonCanonicalizable(String),
}

impl AppError {
    pub fn code(&self) -> &'static str {
        match self {
            AppError::Unauthorized => "unauthorized",
            AppError::Forbidden => "forbidden",
            AppError::NotAMember => "not_a_member",
            AppError::OriginNotAllowed => "origin_not_allowed",
            AppError::NotFound(_) => "not_found",
            AppError::ValidationError(_) => "validation_error",
            AppError::MessageTooLarge => "message_too_large",
            AppError::InvalidRoomId => "invalid_room_id",
            AppError::Conflict(_) => "conflict",
            AppError::DuplicateRequest => "duplicate_request",
            AppError::IdempotencyEvicted => "idempotency_evicted",
            AppError::RateLimited => "rate_limited",
            AppError::Internal(_) => "internal_error",
            AppError::NonCanonicalizable(_) => "internal_error",
        }
    }

    pub fn http_status(&self) -> Status {
        match self {
            AppError::Unauthorized => Status::Unauthorized,
            AppError::Forbidden | AppError::NotAMember | AppError::OriginNotAllowed => {
                Status::Forbidden
            }
            AppError::NotFound(_) => Status::NotFound,
            AppError::ValidationError(_) | AppError::MessageTooLarge | AppError::InvalidRoomId => {
                Status::BadRequest
            }
            AppError::Conflict(_) | AppError::DuplicateRequest => Status::Conflict,
            AppError::IdempotencyEvicted => Status::Conflict,
            AppError::RateLimited => Status::TooManyRequests,
            AppError::Internal(_) | AppError::NonCanonicalizable(_) => {
                Status::InternalServerError
            }
        }
    }

    /// §7's HTTP ↔ JSON-RPC code mapping table.
    pub fn jsonrpc_code(&self) -> i64 {
        match self {
            AppError::Unauthorized => -32001,
            AppError::Forbidden | AppError::NotAMember | AppError::OriginNotAllowed => -32003,
            AppError::NotFound(_) => -32004,
            AppError::ValidationError(_) | AppError::MessageTooLarge | AppError::InvalidRoomId => {
                -32602
            }
            AppError::Conflict(_) | AppError::DuplicateRequest | AppError::IdempotencyEvicted => {
                -32600
            }
            AppError::RateLimited => -32029,
            AppError::Internal(_) | AppError::NonCanonicalizable(_) => -32603,
        }
    }
}

impl From<CanonError> for AppError {
    fn from(e: CanonError) -> Self {
        match e {
            CanonError::NonCanonicalizable(msg) => AppError::NonCanonicalizable(msg),
        }
    }
}

impl From<rusqlite::Error> for AppError {
    fn from(e: rusqlite::Error) -> Self {
        AppError::Internal(e.to_string())
    }
}

impl<'r> Responder<'r, 'static> for AppError {
    fn respond_to(self, req: &'r Request<'_>) -> response::Result<'static> {
        if matches!(self, AppError::Internal(_) | AppError::NonCanonicalizable(_)) {
            tracing::error!(error = %self, "internal_error");
        } else {
            tracing::warn!(error = %self, code = self.code(), "request_failed");
        }
        let body = Json(json!({
            "error": {
                "code": self.code(),
                "message": self.to_string(),
            }
        }));
        Response::build_from(body.respond_to(req)?)
            .status(self.http_status())
            .ok()
    }
}
