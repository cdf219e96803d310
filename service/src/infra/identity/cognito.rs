//! [AWS Cognito] user pool [`IdentityProvider`].
//!
//! Talks the JSON protocol of the `AWSCognitoIdentityProviderService` API
//! directly. The used operations are public (unsigned) ones, so no AWS
//! credentials are involved, only the app client ID and its optional secret.
//!
//! [AWS Cognito]: https://docs.aws.amazon.com/cognito

use std::{collections::HashMap, sync::Arc, time::Duration};

use base64::{engine::general_purpose::STANDARD, Engine as _};
use derive_more::Debug;
use ring::hmac;
use secrecy::{ExposeSecret as _, SecretString};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use tracerr::Traced;
use tracing as log;

use crate::domain::{
    challenge,
    token::{AccessToken, IdToken, RefreshToken},
    Challenge, TokenSet,
};

use super::{
    Authentication, Error, IdentityProvider, InitiateAuth, RefreshTokens,
    RefreshedTokens, RespondToNewPasswordChallenge,
};

/// [`Cognito`] configuration.
#[derive(Clone, Debug)]
pub struct Config {
    /// AWS region of the user pool.
    ///
    /// Derived from the [`Config::user_pool_id`] prefix, if [`None`].
    pub region: Option<String>,

    /// ID of the user pool (`<region>_<id>`).
    pub user_pool_id: String,

    /// ID of the app client.
    pub client_id: String,

    /// Secret of the app client, if it's a confidential one.
    pub client_secret: Option<SecretString>,

    /// Endpoint overriding the regional one (for local emulators).
    pub endpoint: Option<String>,

    /// Timeout of a single request.
    pub timeout: Duration,
}

/// [AWS Cognito] user pool client.
///
/// [AWS Cognito]: https://docs.aws.amazon.com/cognito
#[derive(Clone, Debug)]
pub struct Cognito {
    /// HTTP client performing the requests.
    http: reqwest::Client,

    /// URL the requests are sent to.
    endpoint: String,

    /// ID of the app client.
    client_id: String,

    /// Key computing `SECRET_HASH`es, if the app client has a secret.
    #[debug(skip)]
    secret: Option<Arc<hmac::Key>>,
}

impl Cognito {
    /// Creates a new [`Cognito`] client with the provided [`Config`].
    ///
    /// # Errors
    ///
    /// - If the user pool or the app client ID is empty.
    /// - If the region cannot be determined.
    /// - If the HTTP client fails to initialize.
    pub fn new(conf: Config) -> Result<Self, Traced<Error>> {
        use Error as E;

        if conf.user_pool_id.trim().is_empty() {
            return Err(tracerr::new!(E::MisconfiguredProvider(
                "user pool ID is not set".into(),
            )));
        }
        if conf.client_id.trim().is_empty() {
            return Err(tracerr::new!(E::MisconfiguredProvider(
                "app client ID is not set".into(),
            )));
        }

        let endpoint = match conf.endpoint {
            Some(endpoint) => endpoint,
            None => {
                let region = conf
                    .region
                    .filter(|r| !r.is_empty())
                    .or_else(|| {
                        conf.user_pool_id
                            .split_once('_')
                            .map(|(region, _)| region.to_owned())
                    })
                    .ok_or_else(|| {
                        E::MisconfiguredProvider(
                            "region is not set and cannot be derived from the \
                             user pool ID"
                                .into(),
                        )
                    })
                    .map_err(tracerr::wrap!())?;
                format!("https://cognito-idp.{region}.amazonaws.com/")
            }
        };

        let http = reqwest::Client::builder()
            .timeout(conf.timeout)
            .build()
            .map_err(|e| tracerr::new!(E::Transport(e.to_string())))?;

        let secret = conf
            .client_secret
            .filter(|s| !s.expose_secret().is_empty())
            .map(|s| {
                Arc::new(hmac::Key::new(
                    hmac::HMAC_SHA256,
                    s.expose_secret().as_bytes(),
                ))
            });

        Ok(Self {
            http,
            endpoint,
            client_id: conf.client_id,
            secret,
        })
    }

    /// Computes the `SECRET_HASH` of the provided `username`, if the app
    /// client has a secret.
    ///
    /// `SECRET_HASH = base64(HMAC-SHA256(client_secret, username ‖ client_id))`
    fn secret_hash(&self, username: &str) -> Option<String> {
        self.secret.as_ref().map(|key| {
            let mut ctx = hmac::Context::with_key(key);
            ctx.update(username.as_bytes());
            ctx.update(self.client_id.as_bytes());
            STANDARD.encode(ctx.sign())
        })
    }

    /// Invokes the provided API `action` with the provided `body`.
    ///
    /// Error responses are mapped with the [`Flow`]'s mapping.
    async fn call<B, R>(
        &self,
        action: &str,
        body: &B,
        flow: Flow,
    ) -> Result<R, Traced<Error>>
    where
        B: Serialize + ?Sized,
        R: DeserializeOwned,
    {
        use Error as E;

        let resp = self
            .http
            .post(&self.endpoint)
            .header(
                "X-Amz-Target",
                format!("AWSCognitoIdentityProviderService.{action}"),
            )
            .header(reqwest::header::CONTENT_TYPE, "application/x-amz-json-1.1")
            .json(body)
            .send()
            .await
            .map_err(|e| tracerr::new!(E::Transport(e.to_string())))?;

        let status = resp.status();
        let bytes = resp
            .bytes()
            .await
            .map_err(|e| tracerr::new!(E::Transport(e.to_string())))?;

        if !status.is_success() {
            let ErrorBody { kind, message } = serde_json::from_slice(&bytes)
                .unwrap_or_else(|_| ErrorBody {
                    kind: format!("HTTP {status}"),
                    message: None,
                });
            let kind = normalize_kind(&kind);
            let message = message.unwrap_or_default();
            log::debug!("`{action}` failed with `{kind}`: {message}");
            return Err(tracerr::new!(flow.map_error(kind, message)));
        }

        serde_json::from_slice(&bytes).map_err(|e| {
            tracerr::new!(E::Unexpected {
                kind: "InvalidResponse".into(),
                message: e.to_string(),
            })
        })
    }
}

impl IdentityProvider<InitiateAuth> for Cognito {
    type Ok = Authentication;
    type Err = Traced<Error>;

    async fn execute(
        &self,
        InitiateAuth { username, password }: InitiateAuth,
    ) -> Result<Self::Ok, Self::Err> {
        let mut params = HashMap::from([
            ("USERNAME", username.to_string()),
            ("PASSWORD", password.expose_secret().to_string()),
        ]);
        if let Some(hash) = self.secret_hash(username.as_ref()) {
            drop(params.insert("SECRET_HASH", hash));
        }

        let resp: AuthResponse = self
            .call(
                "InitiateAuth",
                &InitiateAuthRequest {
                    auth_flow: "USER_PASSWORD_AUTH",
                    client_id: &self.client_id,
                    auth_parameters: params,
                },
                Flow::SignIn,
            )
            .await?;

        resp.into_authentication()
    }
}

impl IdentityProvider<RespondToNewPasswordChallenge> for Cognito {
    type Ok = TokenSet;
    type Err = Traced<Error>;

    async fn execute(
        &self,
        op: RespondToNewPasswordChallenge,
    ) -> Result<Self::Ok, Self::Err> {
        let RespondToNewPasswordChallenge {
            session,
            new_password,
            username,
        } = op;

        let username = username
            .ok_or_else(|| tracerr::new!(Error::UsernameRequired))?;
        let mut responses = HashMap::from([
            ("USERNAME", username.to_string()),
            ("NEW_PASSWORD", new_password.expose_secret().to_string()),
        ]);
        if let Some(hash) = self.secret_hash(username.as_ref()) {
            drop(responses.insert("SECRET_HASH", hash));
        }

        let resp: AuthResponse = self
            .call(
                "RespondToAuthChallenge",
                &RespondToAuthChallengeRequest {
                    challenge_name: challenge::Name::NewPasswordRequired
                        .into(),
                    client_id: &self.client_id,
                    session: session.as_ref(),
                    challenge_responses: responses,
                },
                Flow::Challenge,
            )
            .await?;

        match resp.into_authentication()? {
            Authentication::Tokens(tokens) => Ok(tokens),
            Authentication::Challenge(c) => Err(tracerr::new!(
                Error::UnsupportedChallenge(c.name.to_string())
            )),
        }
    }
}

impl IdentityProvider<RefreshTokens> for Cognito {
    type Ok = RefreshedTokens;
    type Err = Traced<Error>;

    async fn execute(
        &self,
        RefreshTokens {
            refresh_token,
            username,
        }: RefreshTokens,
    ) -> Result<Self::Ok, Self::Err> {
        let mut params = HashMap::from([(
            "REFRESH_TOKEN",
            refresh_token.as_ref().to_owned(),
        )]);
        if self.secret.is_some() {
            let username = username
                .ok_or_else(|| tracerr::new!(Error::UsernameRequired))?;
            if let Some(hash) = self.secret_hash(&username) {
                drop(params.insert("SECRET_HASH", hash));
            }
        }

        let resp: AuthResponse = self
            .call(
                "InitiateAuth",
                &InitiateAuthRequest {
                    auth_flow: "REFRESH_TOKEN_AUTH",
                    client_id: &self.client_id,
                    auth_parameters: params,
                },
                Flow::Refresh,
            )
            .await?;

        match resp.into_authentication()? {
            Authentication::Tokens(TokenSet {
                access_token,
                id_token,
                refresh_token,
            }) => Ok(RefreshedTokens {
                access_token,
                id_token,
                refresh_token,
            }),
            Authentication::Challenge(c) => Err(tracerr::new!(
                Error::UnsupportedChallenge(c.name.to_string())
            )),
        }
    }
}

/// Authentication flow an API call is made in.
///
/// The same provider error means different things in different flows.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
enum Flow {
    /// Signing in with credentials.
    SignIn,

    /// Responding to a [`Challenge`].
    Challenge,

    /// Refreshing tokens.
    Refresh,
}

impl Flow {
    /// Maps the provided Cognito error `kind` into an [`Error`].
    fn map_error(self, kind: &str, message: String) -> Error {
        use Error as E;

        match (kind, self) {
            ("NotAuthorizedException", Self::SignIn) => E::InvalidCredentials,
            ("NotAuthorizedException", Self::Challenge)
            | (
                "CodeMismatchException" | "ExpiredCodeException",
                Self::Challenge,
            ) => E::InvalidChallengeSession,
            (
                "NotAuthorizedException" | "UserNotFoundException",
                Self::Refresh,
            ) => E::RefreshRejected,
            ("UserNotFoundException", Self::SignIn | Self::Challenge) => {
                E::UserNotFound
            }
            ("UserNotConfirmedException", _) => E::AccountUnconfirmed,
            ("InvalidPasswordException", Self::SignIn | Self::Challenge) => {
                E::PasswordPolicyViolation(message)
            }
            (
                "InvalidParameterException"
                | "ResourceNotFoundException"
                | "InvalidUserPoolConfigurationException",
                _,
            ) => E::MisconfiguredProvider(message),
            (kind, _) => E::Unexpected {
                kind: kind.to_owned(),
                message,
            },
        }
    }
}

/// Strips namespace (`prefix#Kind`) and URL (`Kind:url`) decorations from a
/// Cognito error kind.
fn normalize_kind(kind: &str) -> &str {
    let kind = kind.rsplit_once('#').map_or(kind, |(_, k)| k);
    kind.split_once(':').map_or(kind, |(k, _)| k)
}

/// Request of the `InitiateAuth` action.
#[derive(Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
struct InitiateAuthRequest<'a> {
    /// Authentication flow to start.
    auth_flow: &'static str,

    /// ID of the app client.
    client_id: &'a str,

    /// Parameters of the flow.
    #[debug(skip)]
    auth_parameters: HashMap<&'static str, String>,
}

/// Request of the `RespondToAuthChallenge` action.
#[derive(Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
struct RespondToAuthChallengeRequest<'a> {
    /// Name of the challenge being responded to.
    challenge_name: &'static str,

    /// ID of the app client.
    client_id: &'a str,

    /// Session of the challenge.
    #[debug(skip)]
    session: &'a str,

    /// Responses to the challenge.
    #[debug(skip)]
    challenge_responses: HashMap<&'static str, String>,
}

/// Response of the `InitiateAuth` and `RespondToAuthChallenge` actions.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct AuthResponse {
    /// Issued tokens.
    authentication_result: Option<AuthenticationResult>,

    /// Name of the next challenge.
    challenge_name: Option<String>,

    /// Session of the next challenge.
    #[debug(skip)]
    session: Option<String>,

    /// Parameters of the next challenge.
    #[serde(default)]
    challenge_parameters: HashMap<String, String>,
}

impl AuthResponse {
    /// Converts this [`AuthResponse`] into an [`Authentication`].
    fn into_authentication(self) -> Result<Authentication, Traced<Error>> {
        use Error as E;

        if let Some(result) = self.authentication_result {
            let (Some(access), Some(id)) =
                (result.access_token, result.id_token)
            else {
                return Err(tracerr::new!(E::Unexpected {
                    kind: "InvalidResponse".into(),
                    message: "authentication result misses tokens".into(),
                }));
            };
            return Ok(Authentication::Tokens(TokenSet {
                access_token: AccessToken::from(access),
                id_token: IdToken::from(id),
                refresh_token: result.refresh_token.map(RefreshToken::from),
            }));
        }

        let Some(name) = self.challenge_name else {
            return Err(tracerr::new!(E::Unexpected {
                kind: "InvalidResponse".into(),
                message: "neither tokens nor challenge returned".into(),
            }));
        };
        let name = name
            .parse::<challenge::Name>()
            .map_err(|_| tracerr::new!(E::UnsupportedChallenge(name.clone())))?;
        let session = self
            .session
            .and_then(challenge::Session::new)
            .ok_or_else(|| {
                tracerr::new!(E::Unexpected {
                    kind: "InvalidResponse".into(),
                    message: "challenge misses session".into(),
                })
            })?;

        Ok(Authentication::Challenge(Challenge {
            name,
            session,
            parameters: self.challenge_parameters,
        }))
    }
}

/// Tokens of an [`AuthResponse`].
#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct AuthenticationResult {
    /// Issued access token.
    #[debug(skip)]
    access_token: Option<String>,

    /// Issued ID token.
    #[debug(skip)]
    id_token: Option<String>,

    /// Issued refresh token.
    #[debug(skip)]
    refresh_token: Option<String>,
}

/// Body of an error response.
#[derive(Debug, Deserialize)]
struct ErrorBody {
    /// Kind of the error.
    #[serde(rename = "__type")]
    kind: String,

    /// Human-readable message of the error.
    #[serde(alias = "Message")]
    message: Option<String>,
}
