//! REST API handlers of the authentication flow.

use axum::{extract::rejection::JsonRejection, Json};
use secrecy::SecretBox;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use service::{
    command::{self, sign_in, Command as _},
    domain::{self, challenge, user},
};
use tracing as log;

use crate::{api, session, AsError, Error};

/// Body of a `POST /api/auth/signin` request.
#[derive(Debug, Deserialize)]
pub struct SignInRequest {
    /// Name the user signs in with.
    pub username: String,

    /// Current password of the user.
    pub password: String,
}

/// Body of a `POST /api/auth/change-password` request.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangePasswordRequest {
    /// Session of the challenge being resolved.
    pub session: String,

    /// Password replacing the temporary one.
    pub new_password: String,

    /// Name of the user the challenge was issued for.
    #[serde(default)]
    pub username: Option<String>,
}

/// [`domain::User`] as returned by the REST API.
#[derive(Clone, Debug, Serialize)]
pub struct User {
    /// ID of the user.
    pub id: String,

    /// Email address of the user.
    pub email: Option<String>,

    /// Display name of the user.
    pub name: Option<String>,

    /// Avatar URL of the user.
    pub image: Option<String>,
}

impl From<domain::User> for User {
    fn from(user: domain::User) -> Self {
        let domain::User {
            id,
            email,
            name,
            image,
        } = user;
        Self {
            id: id.as_ref().to_owned(),
            email,
            name,
            image,
        }
    }
}

/// Signs in a user by its credentials.
///
/// # Errors
///
/// Possible error codes:
/// - `INVALID_INPUT` - the request body is malformed;
/// - `INVALID_CREDENTIALS` - wrong username or password;
/// - `USER_NOT_FOUND` - no user with the provided username;
/// - `ACCOUNT_UNCONFIRMED` - the user hasn't confirmed its account.
#[tracing::instrument(skip_all, fields(http.route = "/api/auth/signin"))]
pub async fn sign_in(
    store: session::Store,
    body: Result<Json<SignInRequest>, JsonRejection>,
) -> Result<Json<Value>, Error> {
    let Json(SignInRequest { username, password }) =
        body.map_err(AsError::into_error)?;
    let username = user::Username::new(username)
        .ok_or_else(|| Error::invalid_input(&"invalid `username`"))?;
    let password = user::Password::new(password)
        .ok_or_else(|| Error::invalid_input(&"invalid `password`"))?;

    let output = store
        .service()
        .execute(command::SignIn {
            username,
            password: SecretBox::new(Box::new(password)),
        })
        .await
        .map_err(AsError::into_error)?;

    Ok(Json(match output {
        sign_in::Output::Authenticated(output) => {
            let session = store.save(output).await;
            json!({ "success": true, "user": User::from(session.user) })
        }
        sign_in::Output::ChallengeRequired {
            challenge,
            username,
        } => {
            log::info!("`{}` challenge issued", challenge.name);
            json!({
                "success": false,
                "requiresPasswordChange": true,
                "challenge": {
                    "name": challenge.name.to_string(),
                    "session": challenge.session.as_ref(),
                    "username": username,
                },
            })
        }
    }))
}

/// Replaces a temporary password, resolving the challenge issued on sign-in.
///
/// # Errors
///
/// Possible error codes:
/// - `INVALID_INPUT` - the request body is malformed;
/// - `PASSWORD_POLICY_VIOLATION` - the new password is too weak;
/// - `INVALID_CHALLENGE_SESSION` - the challenge is invalid or expired;
/// - `USERNAME_REQUIRED` - the identity provider needs the username.
#[tracing::instrument(
    skip_all,
    fields(http.route = "/api/auth/change-password"),
)]
pub async fn change_password(
    store: session::Store,
    body: Result<Json<ChangePasswordRequest>, JsonRejection>,
) -> Result<Json<Value>, Error> {
    let Json(ChangePasswordRequest {
        session,
        new_password,
        username,
    }) = body.map_err(AsError::into_error)?;
    let session = challenge::Session::new(session)
        .ok_or_else(|| Error::invalid_input(&"invalid `session`"))?;
    let new_password = api::user::NewPassword::from(new_password).validate()?;
    let username = username
        .filter(|u| !u.is_empty())
        .map(|u| {
            user::Username::new(u)
                .ok_or_else(|| Error::invalid_input(&"invalid `username`"))
        })
        .transpose()?;

    let output = store
        .service()
        .execute(command::RespondToPasswordChallenge {
            session,
            new_password: SecretBox::new(Box::new(new_password)),
            username,
        })
        .await
        .map_err(AsError::into_error)?;
    let session = store.save(output).await;

    Ok(Json(json!({ "success": true, "user": User::from(session.user) })))
}

/// Signs out the current user by clearing its session cookies.
#[tracing::instrument(skip_all, fields(http.route = "/api/auth/signout"))]
pub async fn sign_out(store: session::Store) -> Json<Value> {
    store.clear().await;
    Json(json!({ "success": true }))
}

/// Returns the session of the authenticated user.
///
/// Reachable only through the authorization gate.
#[tracing::instrument(skip_all, fields(http.route = "/private"))]
pub async fn private(
    session::Current(session): session::Current,
) -> Json<Value> {
    Json(json!({
        "user": User::from(session.user),
        "expiresAt": session.expires_at.to_rfc3339(),
    }))
}
