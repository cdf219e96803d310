//! [`Error`]-related definitions.

use std::fmt;

use axum::{
    extract::rejection::JsonRejection,
    response::{IntoResponse, Response},
    Json,
};
use derive_more::Error as StdError;
use itertools::Itertools as _;
use juniper::IntoFieldError;
use serde_json::json;
use service::{
    cipher,
    domain::token,
    infra::{database, identity},
};
use tracerr::{Trace, Traced};
use tracing as log;

/// Defines a new error type.
#[expect(clippy::module_name_repetitions, reason = "more readable")]
#[macro_export]
macro_rules! define_error {
    (
        enum $name:ident {
            $(
                #[code = $code:literal]
                #[status = $status_code:ident]
                #[message = $message:literal]
                $variant:ident
            ),* $(,)?
        }
    ) => {
        /// Error type.
        #[derive(
            Clone,
            Copy,
            Debug,
            ::derive_more::Display,
            ::derive_more::Error
        )]
        #[repr(u16)]
        pub enum $name {
            $(
                #[display($message)]
                #[doc = $message]
                $variant,
            )*
        }

        impl From<$name> for $crate::Error {
            fn from(err: $name) -> Self {
                match err {
                    $(
                        $name::$variant => Self {
                            code: $code,
                            status_code: ::http::StatusCode::$status_code,
                            message: $message.to_string(),
                            backtrace: None,
                        },
                    )*
                }
            }
        }
    };
}

/// API [`Error`], shared by the GraphQL and REST endpoints.
#[derive(Clone, Debug, StdError)]
pub struct Error {
    /// [`Error`] code.
    pub code: Code,

    /// [`http::StatusCode`] of this [`Error`].
    pub status_code: http::StatusCode,

    /// Backtrace of this [`Error`].
    #[error(not(backtrace))]
    pub backtrace: Option<Trace>,

    /// [`Error`] message.
    pub message: String,
}

impl Error {
    /// Create a new [`Error`] representing an internal server error.
    #[must_use]
    pub fn internal(msg: &impl ToString) -> Self {
        Self {
            code: "INTERNAL_SERVER_ERROR",
            status_code: http::StatusCode::INTERNAL_SERVER_ERROR,
            message: msg.to_string(),
            backtrace: None,
        }
    }

    /// Creates a new [`Error`] representing an invalid client input.
    #[must_use]
    pub fn invalid_input(msg: &impl ToString) -> Self {
        Self {
            code: "INVALID_INPUT",
            status_code: http::StatusCode::BAD_REQUEST,
            message: msg.to_string(),
            backtrace: None,
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let Self {
            code,
            status_code: _,
            backtrace,
            message,
        } = self;

        write!(
            f,
            "[{code}]: {message}{}",
            backtrace
                .iter()
                .format_with("\n", |trace, f| f(&format_args!("{trace}"))),
        )
    }
}

impl<S> IntoFieldError<S> for Error
where
    S: From<String>,
{
    fn into_field_error(self) -> juniper::FieldError<S> {
        let mut ext = juniper::Object::with_capacity(1);
        drop(
            ext.add_field("code", juniper::Value::scalar(self.code.to_owned())),
        );
        drop(
            ext.add_field(
                "backtrace",
                juniper::Value::list(
                    self.backtrace
                        .iter()
                        .flat_map(|trace| trace.iter())
                        .map(|frame| juniper::Value::scalar(frame.to_string()))
                        .collect(),
                ),
            ),
        );
        juniper::FieldError::new(self.message, juniper::Value::object(ext))
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        if self.status_code.is_server_error() {
            log::error!("{self}");
        }

        let Self {
            code,
            status_code,
            message,
            backtrace: _,
        } = self;
        (status_code, Json(json!({ "error": message, "code": code })))
            .into_response()
    }
}

/// [`Error`] code.
pub type Code = &'static str;

/// Helper trait for converting types into [`Error`]s.
pub trait AsError {
    /// Tries to convert the type into an [`Error`].
    ///
    /// [`None`] is returned if the type cannot be converted into an [`Error`].
    fn try_as_error(&self) -> Option<Error>;

    /// Converts the type into an [`Error`].
    fn as_error(&self) -> Error
    where
        Self: fmt::Display,
    {
        self.try_as_error()
            .unwrap_or_else(|| Error::internal(&self))
    }

    /// Converts the type into an [`Error`] by consuming it.
    fn into_error(self) -> Error
    where
        Self: fmt::Display + Sized,
    {
        self.as_error()
    }
}

impl<E: AsError> AsError for Traced<E> {
    fn try_as_error(&self) -> Option<Error> {
        let mut error = self.as_ref().try_as_error()?;
        error.backtrace = Some(self.trace().clone());
        Some(error)
    }
}

impl AsError for JsonRejection {
    fn try_as_error(&self) -> Option<Error> {
        Some(Error::invalid_input(&self.body_text()))
    }
}

impl AsError for identity::Error {
    fn try_as_error(&self) -> Option<Error> {
        use identity::Error as E;

        let (code, status_code) = match self {
            E::InvalidCredentials => {
                ("INVALID_CREDENTIALS", http::StatusCode::UNAUTHORIZED)
            }
            E::UserNotFound => {
                ("USER_NOT_FOUND", http::StatusCode::UNAUTHORIZED)
            }
            E::AccountUnconfirmed => {
                ("ACCOUNT_UNCONFIRMED", http::StatusCode::UNAUTHORIZED)
            }
            E::PasswordPolicyViolation(_) => {
                ("PASSWORD_POLICY_VIOLATION", http::StatusCode::BAD_REQUEST)
            }
            E::InvalidChallengeSession => {
                ("INVALID_CHALLENGE_SESSION", http::StatusCode::BAD_REQUEST)
            }
            E::RefreshRejected => {
                ("AUTHORIZATION_REQUIRED", http::StatusCode::UNAUTHORIZED)
            }
            E::UsernameRequired => {
                ("USERNAME_REQUIRED", http::StatusCode::BAD_REQUEST)
            }
            E::UnsupportedChallenge(_) => {
                ("UNSUPPORTED_CHALLENGE", http::StatusCode::UNAUTHORIZED)
            }
            E::MisconfiguredProvider(_) => (
                "MISCONFIGURED_PROVIDER",
                http::StatusCode::INTERNAL_SERVER_ERROR,
            ),
            E::Unexpected { .. } | E::Transport(_) => return None,
        };
        Some(Error {
            code,
            status_code,
            message: self.to_string(),
            backtrace: None,
        })
    }
}

impl AsError for token::DecodeError {
    fn try_as_error(&self) -> Option<Error> {
        Some(Error {
            code: "DECODE_FAILURE",
            status_code: http::StatusCode::BAD_GATEWAY,
            message: self.to_string(),
            backtrace: None,
        })
    }
}

impl AsError for cipher::SealError {
    fn try_as_error(&self) -> Option<Error> {
        Some(Error {
            code: "ENCRYPTION_FAILURE",
            status_code: http::StatusCode::INTERNAL_SERVER_ERROR,
            message: self.to_string(),
            backtrace: None,
        })
    }
}

impl AsError for database::Error {
    fn try_as_error(&self) -> Option<Error> {
        None
    }
}

#[cfg(test)]
mod spec {
    use service::infra::identity;

    use super::{AsError as _, Error};

    #[test]
    fn maps_identity_errors_once() {
        let err = identity::Error::InvalidCredentials.as_error();
        assert_eq!(err.code, "INVALID_CREDENTIALS");
        assert_eq!(err.status_code, http::StatusCode::UNAUTHORIZED);

        let err = identity::Error::PasswordPolicyViolation("digit".into())
            .as_error();
        assert_eq!(err.code, "PASSWORD_POLICY_VIOLATION");
        assert_eq!(err.status_code, http::StatusCode::BAD_REQUEST);
    }

    #[test]
    fn hides_unexpected_provider_errors_behind_internal_one() {
        let err = identity::Error::Transport("connection refused".into())
            .as_error();

        assert_eq!(err.code, "INTERNAL_SERVER_ERROR");
        assert_eq!(
            err.status_code,
            http::StatusCode::INTERNAL_SERVER_ERROR,
        );
    }

    #[test]
    fn displays_code_and_message() {
        let err = Error::invalid_input(&"bad");

        assert_eq!(err.to_string(), "[INVALID_INPUT]: bad");
    }
}
