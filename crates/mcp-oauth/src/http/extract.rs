//! Request body extractor for OAuth endpoints.

use axum::extract::{FromRequest, Request};
use axum::http::header::CONTENT_TYPE;
use axum::response::Response;
use axum::{Form, Json};
use serde::de::DeserializeOwned;

use crate::error::AuthError;

use super::error_response;

/// Form-encoded body, or JSON when the request says `application/json`.
///
/// OAuth endpoints are specified as `application/x-www-form-urlencoded`;
/// JSON is accepted for clients that send it anyway. A body that cannot be
/// parsed is rejected with `invalid_request`; handlers that must always
/// answer `200` take `Result<FormOrJson<T>, Response>` instead.
#[derive(Debug, Clone)]
pub struct FormOrJson<T>(pub T);

impl<T, S> FromRequest<S> for FormOrJson<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = Response;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let is_json = req
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .is_some_and(|value| value.starts_with("application/json"));

        if is_json {
            let Json(value) = Json::<T>::from_request(req, state)
                .await
                .map_err(|rejection| {
                    error_response(&AuthError::invalid_request(rejection.body_text()))
                })?;
            Ok(Self(value))
        } else {
            let Form(value) = Form::<T>::from_request(req, state)
                .await
                .map_err(|rejection| {
                    error_response(&AuthError::invalid_request(rejection.body_text()))
                })?;
            Ok(Self(value))
        }
    }
}
