//! [`Command`] for refreshing an expired [`Session`].

use derive_more::{Display, Error, From};
use tracerr::Traced;

#[cfg(doc)]
use crate::domain::Session;
use crate::{
    cipher::Sealed,
    domain::{
        token::{self, RefreshToken},
        TokenSet,
    },
    infra::identity::{
        self, IdentityProvider, RefreshTokens, RefreshedTokens,
    },
    Service,
};

use super::{create_user_session, Command, CreateUserSession};

/// [`Command`] for refreshing an expired [`Session`] with its [`Sealed`]
/// refresh token.
#[derive(Clone, Debug)]
pub struct RefreshUserSession {
    /// [`Sealed`] refresh token of the [`Session`].
    pub refresh_token: Sealed,

    /// [`Sealed`] ID token of the [`Session`], possibly expired.
    ///
    /// Tells the identity provider whose refresh token it is.
    pub id_token: Option<Sealed>,
}

impl<Idp, Db> Command<RefreshUserSession> for Service<Idp, Db>
where
    Idp: IdentityProvider<
        RefreshTokens,
        Ok = RefreshedTokens,
        Err = Traced<identity::Error>,
    >,
{
    type Ok = create_user_session::Output;
    type Err = Traced<ExecutionError>;

    async fn execute(
        &self,
        cmd: RefreshUserSession,
    ) -> Result<Self::Ok, Self::Err> {
        use ExecutionError as E;

        let RefreshUserSession {
            refresh_token,
            id_token,
        } = cmd;
        let cipher = &self.config().cipher;

        let refresh_token = cipher
            .open(&refresh_token)
            .map(RefreshToken::from)
            .ok_or_else(|| tracerr::new!(E::Decryption))?;
        let username = id_token
            .and_then(|t| cipher.open(t))
            .and_then(|t| token::decode(t).ok())
            .map(|claims| claims.username().to_owned());

        let RefreshedTokens {
            access_token,
            id_token,
            refresh_token: rotated,
        } = self
            .identity_provider()
            .execute(RefreshTokens {
                refresh_token: refresh_token.clone(),
                username,
            })
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?;

        self.execute(CreateUserSession {
            tokens: TokenSet {
                access_token,
                id_token,
                refresh_token: Some(rotated.unwrap_or(refresh_token)),
            },
        })
        .await
        .map_err(tracerr::map_from_and_wrap!(=> E))
    }
}

/// Error of [`RefreshUserSession`] [`Command`] execution.
#[derive(Debug, Display, Error, From)]
pub enum ExecutionError {
    /// Refresh token cannot be decrypted.
    #[display("Failed to decrypt the refresh token")]
    #[from(ignore)]
    Decryption,

    /// [`IdentityProvider`] error.
    #[display("`IdentityProvider` operation failed: {_0}")]
    IdentityProvider(identity::Error),

    /// [`CreateUserSession`] error.
    #[display("Failed to create `Session`: {_0}")]
    Session(create_user_session::ExecutionError),
}
