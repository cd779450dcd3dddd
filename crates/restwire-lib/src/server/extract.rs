//! Request and response glue between axum and the JSON processor.
//!
//! [`Wire`] reads a request body through the [`JsonProcessor`] held in router
//! state; [`respond`] writes a value back through it. Both carry the
//! processor's leniency and output rules onto the wire.

use axum::body::Bytes;
use axum::extract::rejection::BytesRejection;
use axum::extract::{FromRef, FromRequest, Request};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::json;

use crate::content_type;
use crate::errors::ProcessorError;
use crate::json::JsonProcessor;
use crate::processor::SerializationProcessor;

/// Extractor that deserializes the request body with the processor from state.
#[derive(Debug, Clone, Copy, Default)]
pub struct Wire<T>(pub T);

#[derive(Debug)]
pub enum WireRejection {
    UnsupportedMediaType(String),
    EmptyBody,
    Body(BytesRejection),
    Processor(ProcessorError),
}

/// JSON error body shared by every failure response.
pub fn error_response(status: StatusCode, message: impl Into<String>) -> Response {
    (
        status,
        Json(json!({
            "success": false,
            "error": message.into()
        })),
    )
        .into_response()
}

impl IntoResponse for ProcessorError {
    fn into_response(self) -> Response {
        let status = if self.is_deserialization() {
            StatusCode::BAD_REQUEST
        } else {
            StatusCode::INTERNAL_SERVER_ERROR
        };
        if status.is_server_error() {
            tracing::error!(error = %self, "failed to write response body");
        }
        error_response(status, self.to_string())
    }
}

impl IntoResponse for WireRejection {
    fn into_response(self) -> Response {
        match self {
            WireRejection::UnsupportedMediaType(found) => error_response(
                StatusCode::UNSUPPORTED_MEDIA_TYPE,
                format!("Expected a JSON request body, got content type {found:?}"),
            ),
            WireRejection::EmptyBody => {
                error_response(StatusCode::BAD_REQUEST, "Request body is empty")
            }
            WireRejection::Body(rejection) => rejection.into_response(),
            WireRejection::Processor(err) => err.into_response(),
        }
    }
}

impl<T, S> FromRequest<S> for Wire<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
    JsonProcessor: FromRef<S>,
{
    type Rejection = WireRejection;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        // An absent content type is read as JSON.
        let unsupported = req
            .headers()
            .get(header::CONTENT_TYPE)
            .map(|value| value.to_str().unwrap_or_default())
            .filter(|value| !content_type::is_json(value))
            .map(str::to_owned);
        if let Some(found) = unsupported {
            return Err(WireRejection::UnsupportedMediaType(found));
        }

        let processor = JsonProcessor::from_ref(state);
        let body = Bytes::from_request(req, state)
            .await
            .map_err(WireRejection::Body)?;

        match processor.deserialize_bytes(body) {
            Ok(Some(value)) => Ok(Wire(value)),
            Ok(None) => Err(WireRejection::EmptyBody),
            Err(err) => {
                tracing::debug!(error = %err, "rejected request body");
                Err(WireRejection::Processor(err))
            }
        }
    }
}

/// Serialize `value` with the processor and send it with `status`.
///
/// A value that serializes to nothing (a top-level `None`) is sent without a
/// body.
pub fn respond<T: Serialize + ?Sized>(
    processor: &JsonProcessor,
    status: StatusCode,
    value: &T,
) -> Response {
    match processor.serialize(value) {
        Ok(text) if text.is_empty() => status.into_response(),
        Ok(text) => (
            status,
            [(header::CONTENT_TYPE, processor.resulting_content_type())],
            text,
        )
            .into_response(),
        Err(err) => err.into_response(),
    }
}
