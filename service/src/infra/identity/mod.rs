//! [`IdentityProvider`]-related implementations.

#[cfg(feature = "cognito")]
pub mod cognito;
pub mod fake;

use derive_more::{Display, Error as StdError};
use secrecy::SecretBox;
use tracerr::Traced;

use crate::domain::{
    challenge,
    token::{AccessToken, IdToken, RefreshToken},
    user, Challenge, TokenSet,
};

#[cfg(feature = "cognito")]
pub use self::cognito::Cognito;
pub use self::fake::Fake;

/// Identity provider operation.
pub use common::Handler as IdentityProvider;

/// Operation authenticating a user by its credentials.
#[derive(Debug)]
pub struct InitiateAuth {
    /// Name the user signs in with.
    pub username: user::Username,

    /// Current password of the user.
    pub password: SecretBox<user::Password>,
}

/// Result of an [`InitiateAuth`] operation.
#[derive(Clone, Debug)]
pub enum Authentication {
    /// User is authenticated.
    Tokens(TokenSet),

    /// User must resolve a [`Challenge`] first.
    Challenge(Challenge),
}

/// Operation resolving a [`challenge::Name::NewPasswordRequired`]
/// [`Challenge`].
#[derive(Debug)]
pub struct RespondToNewPasswordChallenge {
    /// [`challenge::Session`] of the [`Challenge`] being resolved.
    pub session: challenge::Session,

    /// Password replacing the temporary one.
    pub new_password: SecretBox<user::NewPassword>,

    /// Name of the user the [`Challenge`] was issued for.
    pub username: Option<user::Username>,
}

/// Operation minting new tokens with a [`RefreshToken`].
#[derive(Clone, Debug)]
pub struct RefreshTokens {
    /// [`RefreshToken`] to use.
    pub refresh_token: RefreshToken,

    /// Name the user is registered with, if known.
    pub username: Option<String>,
}

/// Result of a [`RefreshTokens`] operation.
#[derive(Clone, Debug)]
pub struct RefreshedTokens {
    /// Newly issued [`AccessToken`].
    pub access_token: AccessToken,

    /// Newly issued [`IdToken`].
    pub id_token: IdToken,

    /// Newly issued [`RefreshToken`], if the provider rotates them.
    pub refresh_token: Option<RefreshToken>,
}

/// [`IdentityProvider`] selected at runtime.
#[derive(Clone, Debug)]
pub enum Identity {
    /// [`Cognito`] user pool.
    #[cfg(feature = "cognito")]
    Cognito(Cognito),

    /// In-memory [`Fake`] provider.
    Fake(Fake),
}

#[cfg(feature = "cognito")]
impl From<Cognito> for Identity {
    fn from(idp: Cognito) -> Self {
        Self::Cognito(idp)
    }
}

impl From<Fake> for Identity {
    fn from(idp: Fake) -> Self {
        Self::Fake(idp)
    }
}

/// Implements an [`IdentityProvider`] operation for [`Identity`] by
/// dispatching it to the selected provider.
macro_rules! dispatch {
    ($op:ty => $ok:ty) => {
        impl IdentityProvider<$op> for Identity {
            type Ok = $ok;
            type Err = Traced<Error>;

            async fn execute(&self, op: $op) -> Result<Self::Ok, Self::Err> {
                match self {
                    #[cfg(feature = "cognito")]
                    Self::Cognito(idp) => idp.execute(op).await,
                    Self::Fake(idp) => idp.execute(op).await,
                }
            }
        }
    };
}

dispatch!(InitiateAuth => Authentication);
dispatch!(RespondToNewPasswordChallenge => TokenSet);
dispatch!(RefreshTokens => RefreshedTokens);

/// [`IdentityProvider`] error.
///
/// Provider-specific failures are mapped into these kinds exactly once, by
/// the [`IdentityProvider`] implementation.
#[derive(Clone, Debug, Display, StdError)]
pub enum Error {
    /// Wrong username or password.
    #[display("Incorrect username or password")]
    InvalidCredentials,

    /// No user with the provided username.
    #[display("User does not exist")]
    UserNotFound,

    /// User has not confirmed its account yet.
    #[display("User account is not confirmed")]
    AccountUnconfirmed,

    /// New password doesn't satisfy the user pool password policy.
    #[display("Password does not conform to the policy: {_0}")]
    PasswordPolicyViolation(#[error(not(source))] String),

    /// [`challenge::Session`] is invalid or expired.
    #[display("Challenge session is invalid or expired")]
    InvalidChallengeSession,

    /// [`RefreshToken`] is invalid, expired or revoked.
    #[display("Refresh token is rejected")]
    RefreshRejected,

    /// Username is required to respond to a [`Challenge`].
    #[display("Username is required to respond to the challenge")]
    UsernameRequired,

    /// Provider demands a [`Challenge`] this application cannot resolve.
    #[display("Unsupported challenge: {_0}")]
    UnsupportedChallenge(#[error(not(source))] String),

    /// Provider is misconfigured (missing pool, client, or disabled flow).
    #[display("Identity provider is misconfigured: {_0}")]
    MisconfiguredProvider(#[error(not(source))] String),

    /// Provider failed with an unexpected error.
    #[display("Identity provider failed with `{kind}`: {message}")]
    Unexpected {
        /// Provider-specific kind of the error.
        kind: String,

        /// Provider-specific error message.
        message: String,
    },

    /// Provider couldn't be reached.
    #[display("Identity provider is unreachable: {_0}")]
    Transport(#[error(not(source))] String),
}
