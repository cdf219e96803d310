//! [`Command`] for creating a [`Session`] out of a [`TokenSet`].

use derive_more::{Display, Error, From};
use tracerr::Traced;

use crate::{
    cipher::{SealError, Sealed},
    domain::{token::DecodeError, Session, TokenSet},
    Service,
};

use super::Command;

/// [`Command`] for creating a [`Session`] out of a [`TokenSet`].
///
/// Decodes the ID token into a [`Session`] and seals every token for storing
/// it at rest.
#[derive(Clone, Debug)]
pub struct CreateUserSession {
    /// [`TokenSet`] issued by the identity provider.
    pub tokens: TokenSet,
}

/// Output of [`CreateUserSession`] [`Command`].
#[derive(Clone, Debug)]
pub struct Output {
    /// Created [`Session`].
    pub session: Session,

    /// [`Sealed`] tokens of the created [`Session`].
    pub tokens: SealedTokens,
}

/// [`TokenSet`] with every token [`Sealed`].
#[derive(Clone, Debug)]
pub struct SealedTokens {
    /// [`Sealed`] access token.
    pub access_token: Sealed,

    /// [`Sealed`] ID token.
    pub id_token: Sealed,

    /// [`Sealed`] refresh token, if one was issued.
    pub refresh_token: Option<Sealed>,
}

impl<Idp, Db> Command<CreateUserSession> for Service<Idp, Db> {
    type Ok = Output;
    type Err = Traced<ExecutionError>;

    async fn execute(
        &self,
        cmd: CreateUserSession,
    ) -> Result<Self::Ok, Self::Err> {
        use ExecutionError as E;

        let CreateUserSession { tokens } = cmd;

        let claims = tokens
            .id_token
            .claims()
            .map_err(tracerr::from_and_wrap!(=> E))?;
        let session = Session::from_claims(&claims)
            .ok_or_else(|| tracerr::new!(E::NoExpiration))?;

        let cipher = &self.config().cipher;
        let seal = |token: &str| {
            cipher.seal(token).map_err(tracerr::from_and_wrap!(=> E))
        };
        let tokens = SealedTokens {
            access_token: seal(tokens.access_token.as_ref())?,
            id_token: seal(tokens.id_token.as_ref())?,
            refresh_token: tokens
                .refresh_token
                .as_ref()
                .map(|t| seal(t.as_ref()))
                .transpose()?,
        };

        Ok(Output { session, tokens })
    }
}

/// Error of [`CreateUserSession`] [`Command`] execution.
#[derive(Debug, Display, Error, From)]
pub enum ExecutionError {
    /// ID token cannot be decoded.
    #[display("Failed to decode the ID token: {_0}")]
    Decode(DecodeError),

    /// ID token carries no expiration.
    #[display("ID token carries no expiration")]
    #[from(ignore)]
    NoExpiration,

    /// Token cannot be encrypted.
    #[display("Failed to encrypt a token: {_0}")]
    Encryption(SealError),
}
