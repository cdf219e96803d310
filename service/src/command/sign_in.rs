//! [`Command`] for signing in a [`User`] by its credentials.

use derive_more::{Display, Error, From};
use secrecy::SecretBox;
use tracerr::Traced;

#[cfg(doc)]
use crate::domain::{Session, TokenSet, User};
use crate::{
    domain::{user, Challenge},
    infra::identity::{self, Authentication, IdentityProvider, InitiateAuth},
    Service,
};

use super::{create_user_session, Command, CreateUserSession};

/// [`Command`] for signing in a [`User`] by its credentials.
#[derive(Debug)]
pub struct SignIn {
    /// Name the [`User`] signs in with.
    pub username: user::Username,

    /// Current password of the [`User`].
    pub password: SecretBox<user::Password>,
}

/// Output of [`SignIn`] [`Command`].
#[derive(Clone, Debug)]
pub enum Output {
    /// [`User`] is authenticated and its [`Session`] is created.
    Authenticated(create_user_session::Output),

    /// [`User`] must resolve a [`Challenge`] before a [`TokenSet`] is issued.
    ChallengeRequired {
        /// [`Challenge`] to resolve.
        challenge: Challenge,

        /// Name of the [`User`] the [`Challenge`] is issued for.
        username: String,
    },
}

impl<Idp, Db> Command<SignIn> for Service<Idp, Db>
where
    Idp: IdentityProvider<
        InitiateAuth,
        Ok = Authentication,
        Err = Traced<identity::Error>,
    >,
{
    type Ok = Output;
    type Err = Traced<ExecutionError>;

    async fn execute(&self, cmd: SignIn) -> Result<Self::Ok, Self::Err> {
        use ExecutionError as E;

        let SignIn { username, password } = cmd;

        let auth = self
            .identity_provider()
            .execute(InitiateAuth {
                username: username.clone(),
                password,
            })
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?;

        match auth {
            Authentication::Tokens(tokens) => self
                .execute(CreateUserSession { tokens })
                .await
                .map(Output::Authenticated)
                .map_err(tracerr::map_from_and_wrap!(=> E)),
            Authentication::Challenge(challenge) => {
                let username = challenge
                    .username()
                    .unwrap_or_else(|| username.to_string());
                Ok(Output::ChallengeRequired {
                    challenge,
                    username,
                })
            }
        }
    }
}

/// Error of [`SignIn`] [`Command`] execution.
#[derive(Debug, Display, Error, From)]
pub enum ExecutionError {
    /// [`IdentityProvider`] error.
    #[display("`IdentityProvider` operation failed: {_0}")]
    IdentityProvider(identity::Error),

    /// [`CreateUserSession`] error.
    #[display("Failed to create `Session`: {_0}")]
    Session(create_user_session::ExecutionError),
}
