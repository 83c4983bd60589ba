//! Body extractors with OAuth2-shaped rejections.
//!
//! Thin wrappers around Axum's `Form` and `Json` extractors. A body that
//! fails to parse is reported as `400 invalid_request` with the same JSON
//! error shape as every other failure.

use crate::error::LockwardError;
use axum::extract::rejection::{FormRejection, JsonRejection};
use axum::extract::{FromRequest, Request};

/// Form-encoded body extractor
pub struct Form<T>(pub T);

impl<T, S> FromRequest<S> for Form<T>
where
    axum::Form<T>: FromRequest<S, Rejection = FormRejection>,
    S: Send + Sync,
{
    type Rejection = LockwardError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let axum::Form(value) = axum::Form::<T>::from_request(req, state)
            .await
            .map_err(|rejection| LockwardError::bad_request(rejection.body_text()))?;
        Ok(Form(value))
    }
}

/// JSON body extractor
pub struct Json<T>(pub T);

impl<T, S> FromRequest<S> for Json<T>
where
    axum::Json<T>: FromRequest<S, Rejection = JsonRejection>,
    S: Send + Sync,
{
    type Rejection = LockwardError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let axum::Json(value) = axum::Json::<T>::from_request(req, state)
            .await
            .map_err(|rejection| LockwardError::bad_request(rejection.body_text()))?;
        Ok(Json(value))
    }
}
