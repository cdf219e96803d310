//! In-memory [`Fake`] [`IdentityProvider`].

use std::{collections::HashMap, sync::Arc, time::Duration};

use common::DateTime;
use derive_more::Debug;
use jsonwebtoken::{EncodingKey, Header};
use secrecy::ExposeSecret as _;
use serde_json::json;
use tokio::sync::Mutex;
use tracerr::Traced;
use uuid::Uuid;

use crate::domain::{
    challenge,
    token::{AccessToken, IdToken, RefreshToken},
    Challenge, TokenSet,
};

use super::{
    Authentication, Error, IdentityProvider, InitiateAuth, RefreshTokens,
    RefreshedTokens, RespondToNewPasswordChallenge,
};

/// Account registered in a [`Fake`] provider.
#[derive(Clone, Debug)]
pub struct Account {
    /// Subject ID of this [`Account`].
    pub sub: String,

    /// Name this [`Account`] signs in with.
    pub username: String,

    /// Current password of this [`Account`].
    #[debug(skip)]
    pub password: String,

    /// Display name of this [`Account`].
    pub name: Option<String>,

    /// [`Status`] of this [`Account`].
    pub status: Status,
}

/// Status of an [`Account`].
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Status {
    /// [`Account`] may sign in.
    Confirmed,

    /// [`Account`] hasn't been confirmed yet.
    Unconfirmed,

    /// [`Account`] must replace its temporary password.
    ForceChangePassword,
}

/// [`IdentityProvider`] keeping its [`Account`]s in memory.
///
/// Issues HS256-signed JWTs whose signature nobody is expected to check.
#[derive(Clone, Debug)]
pub struct Fake {
    /// Mutable state of this [`Fake`] provider.
    state: Arc<Mutex<State>>,

    /// Key signing the issued tokens.
    #[debug(skip)]
    key: EncodingKey,

    /// Lifetime of the issued access and ID tokens.
    token_lifetime: Duration,
}

/// Mutable state of a [`Fake`] provider.
#[derive(Debug, Default)]
struct State {
    /// Registered [`Account`]s by their username.
    accounts: HashMap<String, Account>,

    /// Usernames of pending [`Challenge`]s by their session.
    challenges: HashMap<String, String>,
}

impl Default for Fake {
    /// Creates a [`Fake`] provider with the demo [`Account`]s.
    fn default() -> Self {
        Self::new([
            Account {
                sub: "user-123".into(),
                username: "test@example.com".into(),
                password: "password123".into(),
                name: Some("Test User".into()),
                status: Status::Confirmed,
            },
            Account {
                sub: "user-456".into(),
                username: "unconfirmed@example.com".into(),
                password: "password123".into(),
                name: Some("Unconfirmed User".into()),
                status: Status::Unconfirmed,
            },
            Account {
                sub: "user-789".into(),
                username: "newpassword@example.com".into(),
                password: "oldpassword".into(),
                name: Some("New Password User".into()),
                status: Status::ForceChangePassword,
            },
        ])
    }
}

impl Fake {
    /// Default lifetime of the issued access and ID tokens.
    pub const TOKEN_LIFETIME: Duration = Duration::from_secs(60 * 60);

    /// Prefix of the issued refresh tokens.
    const REFRESH_TOKEN_PREFIX: &'static str = "refresh-token-";

    /// Creates a new [`Fake`] provider with the provided [`Account`]s.
    #[must_use]
    pub fn new(accounts: impl IntoIterator<Item = Account>) -> Self {
        let accounts = accounts
            .into_iter()
            .map(|a| (a.username.clone(), a))
            .collect();
        Self {
            state: Arc::new(Mutex::new(State {
                accounts,
                challenges: HashMap::new(),
            })),
            key: EncodingKey::from_secret(b"fake-identity-provider"),
            token_lifetime: Self::TOKEN_LIFETIME,
        }
    }

    /// Sets the lifetime of the access and ID tokens issued by this [`Fake`]
    /// provider.
    #[must_use]
    pub fn with_token_lifetime(mut self, lifetime: Duration) -> Self {
        self.token_lifetime = lifetime;
        self
    }

    /// Returns the number of [`Challenge`]s waiting for a response.
    pub async fn pending_challenges(&self) -> usize {
        self.state.lock().await.challenges.len()
    }

    /// Issues new access and ID tokens for the provided [`Account`].
    fn issue(
        &self,
        account: &Account,
    ) -> Result<(AccessToken, IdToken), Traced<Error>> {
        let now = DateTime::now();
        let exp = (now + self.token_lifetime).unix_timestamp();
        let encode = |claims: serde_json::Value| {
            jsonwebtoken::encode(&Header::default(), &claims, &self.key)
                .map_err(|e| {
                    tracerr::new!(Error::Unexpected {
                        kind: "TokenEncoding".into(),
                        message: e.to_string(),
                    })
                })
        };

        let access = encode(json!({
            "sub": account.sub,
            "username": account.username,
            "token_use": "access",
            "iat": now.unix_timestamp(),
            "exp": exp,
        }))?;
        let id = encode(json!({
            "sub": account.sub,
            "email": account.username,
            "name": account.name,
            "cognito:username": account.username,
            "token_use": "id",
            "iat": now.unix_timestamp(),
            "exp": exp,
        }))?;

        Ok((AccessToken::from(access), IdToken::from(id)))
    }
}

impl IdentityProvider<InitiateAuth> for Fake {
    type Ok = Authentication;
    type Err = Traced<Error>;

    async fn execute(
        &self,
        InitiateAuth { username, password }: InitiateAuth,
    ) -> Result<Self::Ok, Self::Err> {
        use Error as E;

        let mut state = self.state.lock().await;
        let account = state
            .accounts
            .get(username.as_ref())
            .cloned()
            .ok_or_else(|| tracerr::new!(E::UserNotFound))?;
        if account.password != password.expose_secret().as_ref() {
            return Err(tracerr::new!(E::InvalidCredentials));
        }

        match account.status {
            Status::Unconfirmed => Err(tracerr::new!(E::AccountUnconfirmed)),
            Status::ForceChangePassword => {
                let session = Uuid::new_v4().to_string();
                // Only the latest challenge of an account stays answerable.
                state
                    .challenges
                    .retain(|_, owner| *owner != account.username);
                drop(
                    state
                        .challenges
                        .insert(session.clone(), account.username.clone()),
                );
                Ok(Authentication::Challenge(Challenge {
                    name: challenge::Name::NewPasswordRequired,
                    session: challenge::Session::new(session)
                        .ok_or_else(|| {
                            tracerr::new!(E::Unexpected {
                                kind: "ChallengeSession".into(),
                                message: "empty session generated".into(),
                            })
                        })?,
                    parameters: HashMap::from([
                        ("USERNAME".into(), account.username.clone()),
                        (
                            "userAttributes".into(),
                            json!({"email": account.username}).to_string(),
                        ),
                    ]),
                }))
            }
            Status::Confirmed => {
                let (access_token, id_token) = self.issue(&account)?;
                Ok(Authentication::Tokens(TokenSet {
                    access_token,
                    id_token,
                    refresh_token: Some(RefreshToken::from(format!(
                        "{}{}",
                        Self::REFRESH_TOKEN_PREFIX,
                        account.sub,
                    ))),
                }))
            }
        }
    }
}

impl IdentityProvider<RespondToNewPasswordChallenge> for Fake {
    type Ok = TokenSet;
    type Err = Traced<Error>;

    async fn execute(
        &self,
        op: RespondToNewPasswordChallenge,
    ) -> Result<Self::Ok, Self::Err> {
        use Error as E;

        let RespondToNewPasswordChallenge {
            session,
            new_password,
            username,
        } = op;

        let mut state = self.state.lock().await;
        let owner = state
            .challenges
            .get(session.as_ref())
            .cloned()
            .ok_or_else(|| tracerr::new!(E::InvalidChallengeSession))?;
        if username.is_some_and(|u| u.as_ref() != owner) {
            return Err(tracerr::new!(E::InvalidChallengeSession));
        }

        let new_password = new_password.expose_secret().as_ref();
        if !new_password.chars().any(|c| c.is_ascii_digit()) {
            return Err(tracerr::new!(E::PasswordPolicyViolation(
                "Password must have numeric characters".into(),
            )));
        }

        drop(state.challenges.remove(session.as_ref()));
        let account = state
            .accounts
            .get_mut(&owner)
            .ok_or_else(|| tracerr::new!(E::UserNotFound))?;
        new_password.clone_into(&mut account.password);
        account.status = Status::Confirmed;
        let account = account.clone();
        drop(state);

        let (access_token, id_token) = self.issue(&account)?;
        Ok(TokenSet {
            access_token,
            id_token,
            refresh_token: Some(RefreshToken::from(format!(
                "{}{}",
                Self::REFRESH_TOKEN_PREFIX,
                account.sub,
            ))),
        })
    }
}

impl IdentityProvider<RefreshTokens> for Fake {
    type Ok = RefreshedTokens;
    type Err = Traced<Error>;

    async fn execute(
        &self,
        RefreshTokens { refresh_token, .. }: RefreshTokens,
    ) -> Result<Self::Ok, Self::Err> {
        let sub = refresh_token
            .as_ref()
            .strip_prefix(Self::REFRESH_TOKEN_PREFIX)
            .ok_or_else(|| tracerr::new!(Error::RefreshRejected))?;

        let account = self
            .state
            .lock()
            .await
            .accounts
            .values()
            .find(|a| a.sub == sub && a.status == Status::Confirmed)
            .cloned()
            .ok_or_else(|| tracerr::new!(Error::RefreshRejected))?;

        let (access_token, id_token) = self.issue(&account)?;
        Ok(RefreshedTokens {
            access_token,
            id_token,
            refresh_token: None,
        })
    }
}

#[cfg(test)]
mod spec {
    use secrecy::SecretBox;

    use crate::{
        domain::{challenge, token::RefreshToken, user},
        infra::identity::{
            Authentication, Error, IdentityProvider as _, InitiateAuth,
            RefreshTokens, RespondToNewPasswordChallenge,
        },
    };

    use super::Fake;

    fn credentials(username: &str, password: &str) -> InitiateAuth {
        InitiateAuth {
            username: user::Username::new(username).unwrap(),
            password: SecretBox::new(Box::new(
                user::Password::new(password).unwrap(),
            )),
        }
    }

    fn new_password(
        session: &challenge::Session,
        password: &str,
    ) -> RespondToNewPasswordChallenge {
        RespondToNewPasswordChallenge {
            session: session.clone(),
            new_password: SecretBox::new(Box::new(
                user::NewPassword::new(password).unwrap(),
            )),
            username: user::Username::new("newpassword@example.com"),
        }
    }

    #[tokio::test]
    async fn issues_tokens_for_confirmed_accounts() {
        let idp = Fake::default();

        let Authentication::Tokens(tokens) = idp
            .execute(credentials("test@example.com", "password123"))
            .await
            .unwrap()
        else {
            panic!("tokens expected");
        };

        let claims = tokens.id_token.claims().unwrap();
        assert_eq!(claims.sub, "user-123");
        assert_eq!(claims.email.as_deref(), Some("test@example.com"));
        assert_eq!(claims.name.as_deref(), Some("Test User"));
        assert!(claims.expires_at().is_some());
        assert_eq!(
            tokens.refresh_token.unwrap().as_ref(),
            "refresh-token-user-123",
        );
    }

    #[tokio::test]
    async fn maps_failures() {
        let idp = Fake::default();

        let err = idp
            .execute(credentials("test@example.com", "wrong"))
            .await
            .unwrap_err();
        assert!(matches!(err.as_ref(), Error::InvalidCredentials));

        let err = idp
            .execute(credentials("nobody@example.com", "password123"))
            .await
            .unwrap_err();
        assert!(matches!(err.as_ref(), Error::UserNotFound));

        let err = idp
            .execute(credentials("unconfirmed@example.com", "password123"))
            .await
            .unwrap_err();
        assert!(matches!(err.as_ref(), Error::AccountUnconfirmed));
    }

    #[tokio::test]
    async fn resolves_new_password_challenge() {
        let idp = Fake::default();

        let Authentication::Challenge(c) = idp
            .execute(credentials("newpassword@example.com", "oldpassword"))
            .await
            .unwrap()
        else {
            panic!("challenge expected");
        };
        assert_eq!(c.name, challenge::Name::NewPasswordRequired);
        assert_eq!(c.username().as_deref(), Some("newpassword@example.com"));
        assert_eq!(idp.pending_challenges().await, 1);

        let tokens = idp
            .execute(new_password(&c.session, "NewPassword1!"))
            .await
            .unwrap();
        assert_eq!(tokens.id_token.claims().unwrap().sub, "user-789");
        assert_eq!(idp.pending_challenges().await, 0);

        let err = idp
            .execute(new_password(&c.session, "NewPassword1!"))
            .await
            .unwrap_err();
        assert!(matches!(err.as_ref(), Error::InvalidChallengeSession));

        assert!(matches!(
            idp.execute(credentials("newpassword@example.com", "NewPassword1!"))
                .await
                .unwrap(),
            Authentication::Tokens(_),
        ));
    }

    #[tokio::test]
    async fn keeps_challenge_on_policy_violation() {
        let idp = Fake::default();
        let Authentication::Challenge(c) = idp
            .execute(credentials("newpassword@example.com", "oldpassword"))
            .await
            .unwrap()
        else {
            panic!("challenge expected");
        };

        let err = idp
            .execute(new_password(&c.session, "NoDigitsHere"))
            .await
            .unwrap_err();

        assert!(matches!(err.as_ref(), Error::PasswordPolicyViolation(_)));
        assert_eq!(idp.pending_challenges().await, 1);
    }

    #[tokio::test]
    async fn replaces_stale_challenges_of_the_same_account() {
        let idp = Fake::default();

        let mut sessions = Vec::new();
        for _ in 0..5 {
            let Authentication::Challenge(c) = idp
                .execute(credentials("newpassword@example.com", "oldpassword"))
                .await
                .unwrap()
            else {
                panic!("challenge expected");
            };
            sessions.push(c.session);
        }
        assert_eq!(idp.pending_challenges().await, 1);

        let err = idp
            .execute(new_password(&sessions[0], "NewPassword1!"))
            .await
            .unwrap_err();
        assert!(matches!(err.as_ref(), Error::InvalidChallengeSession));

        let latest = sessions.last().unwrap();
        let res = idp.execute(new_password(latest, "NewPassword1!")).await;
        assert!(res.is_ok());
        assert_eq!(idp.pending_challenges().await, 0);
    }

    #[tokio::test]
    async fn refreshes_without_rotation() {
        let idp = Fake::default();

        let tokens = idp
            .execute(RefreshTokens {
                refresh_token: RefreshToken::from(
                    "refresh-token-user-123".to_owned(),
                ),
                username: None,
            })
            .await
            .unwrap();
        assert_eq!(tokens.id_token.claims().unwrap().sub, "user-123");
        assert!(tokens.refresh_token.is_none());

        let err = idp
            .execute(RefreshTokens {
                refresh_token: RefreshToken::from("garbage".to_owned()),
                username: None,
            })
            .await
            .unwrap_err();
        assert!(matches!(err.as_ref(), Error::RefreshRejected));
    }
}
