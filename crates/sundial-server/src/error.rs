use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use sundial_store::StoreError;

/// Error returned by API handlers.
///
/// Wraps the [`StoreError`] together with the generic message to expose when
/// the failure is internal (storage, IO).  Domain errors carry their own
/// user-facing message and map to 4xx codes; anything else is logged in full
/// and reported with the per-endpoint generic message.
#[derive(Debug)]
pub struct ApiError {
    source: StoreError,
    internal_message: &'static str,
}

impl ApiError {
    pub fn new(source: StoreError, internal_message: &'static str) -> Self {
        Self {
            source,
            internal_message,
        }
    }
}

impl From<StoreError> for ApiError {
    fn from(source: StoreError) -> Self {
        Self::new(source, "Something went wrong. Please try again.")
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match &self.source {
            StoreError::Validation(_)
            | StoreError::InvalidStatus
            | StoreError::AlreadyCancelled
            | StoreError::CancelCompleted => (StatusCode::BAD_REQUEST, self.source.to_string()),

            StoreError::ClientNotFound | StoreError::AppointmentNotFound => {
                (StatusCode::NOT_FOUND, self.source.to_string())
            }

            StoreError::DuplicateEmail
            | StoreError::HasAppointments
            | StoreError::TerminalStatus(_) => (StatusCode::CONFLICT, self.source.to_string()),

            other => {
                tracing::error!(error = %other, "request failed");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    self.internal_message.to_string(),
                )
            }
        };

        let body = serde_json::json!({
            "error": message,
        });

        (status, axum::Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn status_of(err: StoreError) -> StatusCode {
        ApiError::from(err).into_response().status()
    }

    #[test]
    fn domain_errors_map_to_expected_codes() {
        assert_eq!(
            status_of(StoreError::Validation("bad".into())),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(status_of(StoreError::ClientNotFound), StatusCode::NOT_FOUND);
        assert_eq!(
            status_of(StoreError::AppointmentNotFound),
            StatusCode::NOT_FOUND
        );
        assert_eq!(status_of(StoreError::DuplicateEmail), StatusCode::CONFLICT);
        assert_eq!(status_of(StoreError::HasAppointments), StatusCode::CONFLICT);
        assert_eq!(
            status_of(StoreError::AlreadyCancelled),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            status_of(StoreError::CancelCompleted),
            StatusCode::BAD_REQUEST
        );
    }

    #[test]
    fn internal_errors_hide_detail() {
        let err = ApiError::new(
            StoreError::Migration("boom".into()),
            "Unable to create client. Please try again.",
        );
        let response = err.into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
