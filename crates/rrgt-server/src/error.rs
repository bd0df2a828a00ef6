use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use rrgt_core::RrgtError;

/// Unified error type for HTTP responses.
///
/// Wraps `anyhow::Error` so handlers can use `?` on anything; known
/// `RrgtError` values map to their status code and a structured body,
/// everything else is an opaque 500.
#[derive(Debug)]
pub struct AppError(pub anyhow::Error);

/// Response body shape: `{"error": kind, "message": ..., ...context}`.
fn error_body(kind: &str, message: &str) -> serde_json::Value {
    serde_json::json!({ "error": kind, "message": message })
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let Some(e) = self.0.downcast_ref::<RrgtError>() else {
            tracing::error!(error = %self.0, "unhandled error");
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                axum::Json(error_body("Internal Server Error", "internal error")),
            )
                .into_response();
        };

        let (status, kind) = match e {
            RrgtError::MissingTeamMemberContext => (StatusCode::UNAUTHORIZED, "Unauthorized"),
            RrgtError::NotAccountAdmin { .. }
            | RrgtError::NotAssignedToTask
            | RrgtError::NotItemOwner { .. } => (StatusCode::FORBIDDEN, "Forbidden"),
            RrgtError::DialPlanNotOwned { .. }
            | RrgtError::ColumnOutOfRange { .. }
            | RrgtError::NegativeColumnIndex
            | RrgtError::InvalidSlot(_)
            | RrgtError::InvalidRole(_)
            | RrgtError::MissingField(_) => (StatusCode::BAD_REQUEST, "Validation Error"),
            RrgtError::PlanNotFound(_)
            | RrgtError::TaskNotFound(_)
            | RrgtError::ItemNotFound(_) => (StatusCode::NOT_FOUND, "Not Found"),
            RrgtError::Db(_) | RrgtError::Migrate(_) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal Server Error")
            }
        };

        // Datastore detail stays in the logs, not the response.
        if status == StatusCode::INTERNAL_SERVER_ERROR {
            tracing::error!(error = %e, "request failed");
            return (status, axum::Json(error_body(kind, "internal error"))).into_response();
        }

        let mut body = error_body(kind, &e.to_string());
        match e {
            RrgtError::NotAccountAdmin { current_role } => {
                body["current_role"] = serde_json::json!(current_role);
            }
            RrgtError::NotItemOwner { owner_id, .. } => {
                body["owner_id"] = serde_json::json!(owner_id);
            }
            RrgtError::DialPlanNotOwned { side } => {
                body["side"] = serde_json::json!(side.as_str());
            }
            _ => {}
        }
        (status, axum::Json(body)).into_response()
    }
}

impl<E> From<E> for AppError
where
    E: Into<anyhow::Error>,
{
    fn from(err: E) -> Self {
        Self(err.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rrgt_core::types::Slot;
    use uuid::Uuid;

    #[test]
    fn missing_context_maps_to_401() {
        let err = AppError(RrgtError::MissingTeamMemberContext.into());
        assert_eq!(err.into_response().status(), StatusCode::UNAUTHORIZED);
    }

    #[test]
    fn role_gate_maps_to_403() {
        let err = AppError(
            RrgtError::NotAccountAdmin {
                current_role: "Team Member".into(),
            }
            .into(),
        );
        assert_eq!(err.into_response().status(), StatusCode::FORBIDDEN);
    }

    #[test]
    fn item_ownership_maps_to_403() {
        let err = AppError(
            RrgtError::NotItemOwner {
                action: "update",
                owner_id: Uuid::new_v4(),
            }
            .into(),
        );
        assert_eq!(err.into_response().status(), StatusCode::FORBIDDEN);
    }

    #[test]
    fn dial_ownership_maps_to_400() {
        let err = AppError(RrgtError::DialPlanNotOwned { side: Slot::Left }.into());
        assert_eq!(err.into_response().status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn column_range_maps_to_400() {
        let err = AppError(RrgtError::ColumnOutOfRange { index: 7, max: 6 }.into());
        assert_eq!(err.into_response().status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn plan_not_found_maps_to_404() {
        let err = AppError(RrgtError::PlanNotFound(Uuid::new_v4()).into());
        assert_eq!(err.into_response().status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn task_not_found_maps_to_404() {
        let err = AppError(RrgtError::TaskNotFound(Uuid::new_v4()).into());
        assert_eq!(err.into_response().status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn db_error_maps_to_500() {
        let err = AppError(RrgtError::Db(sqlx::Error::PoolClosed).into());
        assert_eq!(
            err.into_response().status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn unknown_error_maps_to_500() {
        let err = AppError(anyhow::anyhow!("something unexpected"));
        assert_eq!(
            err.into_response().status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn response_is_json() {
        let err = AppError(RrgtError::PlanNotFound(Uuid::new_v4()).into());
        let response = err.into_response();
        let ct = response
            .headers()
            .get(axum::http::header::CONTENT_TYPE)
            .expect("should have content-type");
        assert!(ct.to_str().unwrap().contains("application/json"));
    }
}
