//! JSON body extractor that runs `validator` rules before the handler sees the request

use axum::{
    async_trait,
    extract::{rejection::JsonRejection, FromRequest, Request},
    Json,
};
use serde::de::DeserializeOwned;
use validator::Validate;

use crate::response::ApiError;

/// `Json<T>` whose `Validate` rules already passed
#[derive(Debug, Clone)]
pub struct ValidatedJson<T>(pub T);

#[async_trait]
impl<S, T> FromRequest<S> for ValidatedJson<T>
where
    S: Send + Sync,
    T: DeserializeOwned + Validate,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(body) = Json::<T>::from_request(req, state)
            .await
            .map_err(|rejection: JsonRejection| ApiError::invalid_body(rejection.body_text()))?;

        if let Err(errors) = body.validate() {
            let fields: Vec<_> = errors.field_errors().into_keys().collect();
            tracing::debug!(?fields, "Request body failed validation");
            return Err(errors.into());
        }

        Ok(Self(body))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::header;
    use rolechat_service::dto::CreateGroupRequest;

    async fn extract(body: &str) -> Result<CreateGroupRequest, ApiError> {
        let request = Request::builder()
            .method("POST")
            .uri("/api/groups")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap();
        ValidatedJson::<CreateGroupRequest>::from_request(request, &())
            .await
            .map(|ValidatedJson(inner)| inner)
    }

    #[tokio::test]
    async fn test_valid_body_passes() {
        let request = extract(r#"{"name":"Physics 101"}"#).await.unwrap();
        assert_eq!(request.name, "Physics 101");
    }

    #[tokio::test]
    async fn test_rule_violation_is_a_validation_error() {
        let err = extract(r#"{"name":""}"#).await.unwrap_err();
        assert!(matches!(err, ApiError::Validation(_)));
        assert_eq!(err.error_code(), "VALIDATION_ERROR");
    }

    #[tokio::test]
    async fn test_malformed_json_is_rejected() {
        let err = extract("{name").await.unwrap_err();
        assert!(matches!(err, ApiError::InvalidBody(_)));
    }
}
