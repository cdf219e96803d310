//! [`Context`]-related definitions.

use std::sync::atomic::{self, AtomicU16};

use axum::{async_trait, extract::FromRequestParts};
use juniper::{
    http::{GraphQLBatchResponse, GraphQLResponse},
    IntoFieldError as _,
};
use service::domain::Session;

use crate::{
    session::{self, AuthError},
    Error, JuniperResponse, Service,
};

/// GraphQL request context.
#[derive(Debug)]
pub struct Context {
    /// [`session::Store`] of the current request.
    session: session::Store,

    /// Error status code.
    error_status_code: AtomicU16,
}

impl Context {
    /// Creates a new [`Context`] over the provided [`session::Store`].
    #[must_use]
    pub fn new(session: session::Store) -> Self {
        Self {
            session,
            error_status_code: AtomicU16::new(
                http::StatusCode::INTERNAL_SERVER_ERROR.as_u16(),
            ),
        }
    }

    /// Returns [`Service`] instance of this [`Context`].
    #[must_use]
    pub fn service(&self) -> &Service {
        self.session.service()
    }

    /// Returns [`session::Store`] of this [`Context`].
    #[must_use]
    pub fn session(&self) -> &session::Store {
        &self.session
    }

    /// Returns the error status code of this [`Context`].
    #[must_use]
    pub fn error_status_code(&self) -> http::StatusCode {
        http::StatusCode::from_u16(
            self.error_status_code.load(atomic::Ordering::Relaxed),
        )
        .unwrap_or(http::StatusCode::INTERNAL_SERVER_ERROR)
    }

    /// Sets the error status code for this [`Context`].
    ///
    /// Provided [`http::StatusCode`] will be applied to the response.
    pub fn set_error_status_code(&self, status_code: http::StatusCode) {
        self.error_status_code
            .store(status_code.as_u16(), atomic::Ordering::Relaxed);
    }

    /// Helper method calling [`Context::set_error_status_code()`] inside
    /// [`Result::map_err()`] closure.
    pub fn error(&self) -> impl FnOnce(Error) -> Error + '_ {
        move |err| {
            self.set_error_status_code(err.status_code);
            err
        }
    }

    /// Returns the current [`Session`] of this [`Context`].
    ///
    /// # Errors
    ///
    /// Errors if the current HTTP request carries no valid [`Session`].
    pub async fn current_session(&self) -> Result<Session, Error> {
        self.session
            .get()
            .await
            .ok_or_else(|| AuthError::AuthorizationRequired.into())
            .map_err(self.error())
    }
}

impl juniper::Context for Context {}

#[async_trait]
impl<S> FromRequestParts<S> for Context
where
    S: Send + Sync,
{
    type Rejection = JuniperResponse;

    async fn from_request_parts(
        parts: &mut http::request::Parts,
        _: &S,
    ) -> Result<Self, Self::Rejection> {
        let session = parts
            .extensions
            .get::<session::Store>()
            .cloned()
            .ok_or_else(|| JuniperResponse {
                status_code: http::StatusCode::INTERNAL_SERVER_ERROR,
                response: GraphQLBatchResponse::Single(GraphQLResponse::error(
                    Error::internal(&"missing `session::Store` extension")
                        .into_field_error(),
                )),
            })?;

        Ok(Self::new(session))
    }
}
