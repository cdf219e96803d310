//! [`Command`] for authorizing a [`Session`].

use common::DateTime;
use derive_more::{Display, Error, From};
use tracerr::Traced;

use crate::{
    cipher::Sealed,
    domain::{session, token, Session},
    Service,
};

use super::Command;

/// [`Command`] for authorizing a [`Session`] by its [`Sealed`] ID token.
///
/// Read-only: an expired [`Session`] is rejected, never refreshed.
#[derive(Clone, Debug, From)]
pub struct AuthorizeUserSession {
    /// [`Sealed`] ID token of the [`Session`] to authorize.
    pub id_token: Sealed,
}

impl<Idp, Db> Command<AuthorizeUserSession> for Service<Idp, Db> {
    type Ok = Session;
    type Err = Traced<ExecutionError>;

    async fn execute(
        &self,
        cmd: AuthorizeUserSession,
    ) -> Result<Self::Ok, Self::Err> {
        use ExecutionError as E;

        let AuthorizeUserSession { id_token } = cmd;

        let id_token = self
            .config()
            .cipher
            .open(&id_token)
            .ok_or_else(|| tracerr::new!(E::Decryption))?;
        let claims =
            token::decode(id_token).map_err(tracerr::from_and_wrap!(=> E))?;
        let session = Session::from_claims(&claims)
            .ok_or_else(|| tracerr::new!(E::NoExpiration))?;

        if session.is_expired_at(DateTime::now()) {
            return Err(tracerr::new!(E::Expired(session.expires_at)));
        }
        Ok(session)
    }
}

/// Error of [`AuthorizeUserSession`] [`Command`] execution.
#[derive(Debug, Display, Error, From)]
pub enum ExecutionError {
    /// ID token cannot be decrypted.
    #[display("Failed to decrypt the ID token")]
    #[from(ignore)]
    Decryption,

    /// ID token cannot be decoded.
    #[display("Failed to decode the ID token: {_0}")]
    Decode(token::DecodeError),

    /// ID token carries no expiration.
    #[display("ID token carries no expiration")]
    #[from(ignore)]
    NoExpiration,

    /// [`Session`] has expired.
    #[display("`Session` expired at {}", _0.to_rfc3339())]
    #[from(ignore)]
    Expired(#[error(not(source))] session::ExpirationDateTime),
}

#[cfg(test)]
mod spec {
    use common::DateTime;
    use serde_json::json;

    use crate::{
        command::{spec::service, CreateUserSession},
        domain::{
            token::{self, AccessToken, IdToken},
            TokenSet,
        },
        infra::Fake,
        Command as _,
    };

    use super::{AuthorizeUserSession, ExecutionError};

    fn id_token(exp: i64) -> IdToken {
        IdToken::from(token::spec::unsigned(&json!({
            "sub": "user-123",
            "email": "test@example.com",
            "exp": exp,
        })))
    }

    #[tokio::test]
    async fn authorizes_what_was_created() {
        let svc = service(Fake::default());
        let created = svc
            .execute(CreateUserSession {
                tokens: TokenSet {
                    access_token: AccessToken::from("access".to_owned()),
                    id_token: id_token(DateTime::now().unix_timestamp() + 3600),
                    refresh_token: None,
                },
            })
            .await
            .unwrap();

        let session = svc
            .execute(AuthorizeUserSession {
                id_token: created.tokens.id_token,
            })
            .await
            .unwrap();

        assert_eq!(session.user.id.as_ref(), "user-123");
        assert_eq!(session, created.session);
    }

    #[tokio::test]
    async fn rejects_expired_sessions() {
        let svc = service(Fake::default());
        let sealed = svc
            .config()
            .cipher
            .seal(id_token(DateTime::now().unix_timestamp() - 1).as_ref())
            .unwrap();

        let err = svc
            .execute(AuthorizeUserSession { id_token: sealed })
            .await
            .unwrap_err();

        assert!(matches!(err.as_ref(), ExecutionError::Expired(_)));
    }

    #[tokio::test]
    async fn rejects_plaintext_tokens() {
        let svc = service(Fake::default());
        let plain = id_token(DateTime::now().unix_timestamp() + 3600);

        let err = svc
            .execute(AuthorizeUserSession {
                id_token: plain.as_ref().to_owned().into(),
            })
            .await
            .unwrap_err();

        assert!(matches!(err.as_ref(), ExecutionError::Decryption));
    }
}
