//! # Outcome Translation
//!
//! Maps the terminal outcome of a bridged call onto an HTTP response. The
//! translation is a pure function of the outcome, and producing a single
//! `Response` value makes writing twice to one request impossible.
use axum::http::{StatusCode, header};
use axum::response::{IntoResponse, Response};
use gangway_core::invoke::CallOutcome;
use tonic::Code;

/// Maps a terminal RPC status onto an HTTP status.
///
/// Codes outside the table fall back to 400: a backend-reported error must
/// not be presented as a gateway-side (5xx) fault.
pub fn http_status(code: Code) -> StatusCode {
    match code {
        Code::Ok => StatusCode::OK,
        Code::Unauthenticated => StatusCode::UNAUTHORIZED,
        Code::PermissionDenied => StatusCode::FORBIDDEN,
        Code::Unimplemented => StatusCode::NOT_FOUND,
        Code::Internal => StatusCode::BAD_REQUEST,
        Code::Unavailable => StatusCode::SERVICE_UNAVAILABLE,
        _ => StatusCode::BAD_REQUEST,
    }
}

/// Renders a call outcome as the HTTP response.
///
/// Success renders the payload as JSON with status 200. Failure renders the
/// status message as a plain body under the mapped status; an empty message
/// yields an empty body.
pub fn translate(outcome: CallOutcome) -> Response {
    match outcome {
        CallOutcome::Success(payload) => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, "application/json")],
            payload.to_string(),
        )
            .into_response(),
        CallOutcome::Failure { code, message } => (http_status(code), message).into_response(),
    }
}
