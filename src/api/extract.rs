//! Body extractors that validate their payload and answer bad input with 400.

use async_trait::async_trait;
use axum::{
    Form, Json,
    extract::{FromRequest, FromRequestParts, Path, Request},
    http::request::Parts,
};
use serde::de::DeserializeOwned;
use validator::Validate;

use crate::error::Error;

/// JSON body that deserialized and passed its `validator` rules
pub struct ValidJson<T>(pub T);

/// URL-encoded form body that deserialized and passed its `validator` rules
pub struct ValidForm<T>(pub T);

/// Path parameters, with parse failures answered like any other bad input
pub struct ValidPath<T>(pub T);

#[async_trait]
impl<T, S> FromRequest<S> for ValidJson<T>
where
    T: DeserializeOwned + Validate,
    S: Send + Sync,
{
    type Rejection = Error;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state)
            .await
            .map_err(|rejection| Error::Validation(rejection.body_text()))?;

        value
            .validate()
            .map_err(|errors| Error::Validation(errors.to_string()))?;

        Ok(Self(value))
    }
}

#[async_trait]
impl<T, S> FromRequest<S> for ValidForm<T>
where
    T: DeserializeOwned + Validate,
    S: Send + Sync,
{
    type Rejection = Error;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Form(value) = Form::<T>::from_request(req, state)
            .await
            .map_err(|rejection| Error::Validation(rejection.body_text()))?;

        value
            .validate()
            .map_err(|errors| Error::Validation(errors.to_string()))?;

        Ok(Self(value))
    }
}

#[async_trait]
impl<T, S> FromRequestParts<S> for ValidPath<T>
where
    T: DeserializeOwned + Send,
    S: Send + Sync,
{
    type Rejection = Error;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Path(value) = Path::<T>::from_request_parts(parts, state)
            .await
            .map_err(|rejection| Error::Validation(rejection.body_text()))?;

        Ok(Self(value))
    }
}
