//! Tokens issued by the identity provider and their payload decoding.
//!
//! Decoding here is display-only: signatures are never checked, because the
//! tokens are received directly from the identity provider and are stored
//! encrypted afterwards.

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use derive_more::{AsRef, Debug, Display, Error, From};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::domain::{session::ExpirationDateTime, user, User};

/// Bearer token authorizing calls to the identity provider on behalf of a
/// [`User`].
#[derive(AsRef, Clone, Debug, Eq, From, PartialEq)]
#[as_ref(str)]
#[debug("AccessToken(***)")]
pub struct AccessToken(String);

/// Token carrying the identity claims of a [`User`].
#[derive(AsRef, Clone, Debug, Eq, From, PartialEq)]
#[as_ref(str)]
#[debug("IdToken(***)")]
pub struct IdToken(String);

impl IdToken {
    /// Decodes the [`Claims`] of this [`IdToken`].
    ///
    /// # Errors
    ///
    /// See [`decode()`].
    pub fn claims(&self) -> Result<Claims, DecodeError> {
        decode(&self.0)
    }
}

/// Long-lived credential minting new [`AccessToken`]s and [`IdToken`]s.
#[derive(AsRef, Clone, Debug, Eq, From, PartialEq)]
#[as_ref(str)]
#[debug("RefreshToken(***)")]
pub struct RefreshToken(String);

/// Tokens issued together on a successful authentication.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct TokenSet {
    /// [`AccessToken`] of this [`TokenSet`].
    pub access_token: AccessToken,

    /// [`IdToken`] of this [`TokenSet`].
    pub id_token: IdToken,

    /// [`RefreshToken`] of this [`TokenSet`], if one was issued.
    pub refresh_token: Option<RefreshToken>,
}

/// Identity claims carried by a token payload.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct Claims {
    /// Subject, the identity provider's ID of the [`User`].
    pub sub: String,

    /// Email address of the [`User`].
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,

    /// Display name of the [`User`].
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    /// Avatar URL of the [`User`].
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub picture: Option<String>,

    /// Name the [`User`] is registered with in the user pool.
    #[serde(
        rename = "cognito:username",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub username: Option<String>,

    /// Moment the token expires at, as the `exp` Unix timestamp claim.
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        with = "common::datetime::serde::unix_timestamp::option"
    )]
    pub exp: Option<ExpirationDateTime>,

    /// Every other claim of the payload.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Claims {
    /// Returns the moment these [`Claims`] expire at, if they carry an `exp`
    /// claim.
    #[must_use]
    pub fn expires_at(&self) -> Option<ExpirationDateTime> {
        self.exp
    }

    /// Returns the name the [`User`] is registered with, falling back to the
    /// subject.
    #[must_use]
    pub fn username(&self) -> &str {
        self.username.as_deref().unwrap_or(&self.sub)
    }

    /// Builds the [`User`] described by these [`Claims`].
    #[must_use]
    pub fn to_user(&self) -> User {
        User {
            id: user::Id::from(self.sub.clone()),
            email: self.email.clone(),
            name: self.name.clone(),
            image: self.picture.clone(),
        }
    }
}

/// Decodes the [`Claims`] of the provided JWT-shaped `token` without
/// verifying its signature.
///
/// # Errors
///
/// - If the `token` has less than 2 dot-separated segments, or an empty
///   payload segment.
/// - If the payload segment is not valid base64url (padded or not).
/// - If the payload is not a JSON object with a string `sub` claim.
pub fn decode(token: impl AsRef<str>) -> Result<Claims, DecodeError> {
    use DecodeError as E;

    let payload = token
        .as_ref()
        .split('.')
        .nth(1)
        .filter(|s| !s.is_empty())
        .ok_or(E::Malformed)?;
    let json = URL_SAFE_NO_PAD.decode(payload.trim_end_matches('='))?;
    Ok(serde_json::from_slice(&json)?)
}

/// Error of [`decode()`]ing a token.
#[derive(Debug, Display, Error, From)]
pub enum DecodeError {
    /// Token has no payload segment.
    #[display("Token is not made of dot-separated segments")]
    #[from(ignore)]
    Malformed,

    /// Payload segment is not valid base64url.
    #[display("Token payload is not valid base64url: {_0}")]
    Base64(base64::DecodeError),

    /// Payload is not a valid claims object.
    #[display("Token payload is not a valid claims object: {_0}")]
    Json(serde_json::Error),
}
