//! [`User`] definitions.

use std::{str::FromStr, sync::LazyLock};

use derive_more::{AsRef, Debug, Display, From};
use regex::Regex;
use secrecy::{zeroize::Zeroize, CloneableSecret};
use serde::{Deserialize, Serialize};

#[cfg(doc)]
use crate::domain::token::Claims;

/// Authenticated user, as described by the identity claims of its ID token.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct User {
    /// ID of this [`User`] (the `sub` claim).
    pub id: Id,

    /// Email address of this [`User`], if the identity provider shares one.
    pub email: Option<String>,

    /// Display name of this [`User`].
    pub name: Option<String>,

    /// URL of this [`User`]'s avatar (the `picture` claim).
    pub image: Option<String>,
}

/// ID of a [`User`] assigned by the identity provider.
#[derive(
    AsRef,
    Clone,
    Debug,
    Deserialize,
    Display,
    Eq,
    From,
    Hash,
    PartialEq,
    Serialize,
)]
#[as_ref(str)]
#[serde(transparent)]
pub struct Id(String);

/// Name a [`User`] signs in with (usually an email address).
#[derive(AsRef, Clone, Debug, Display, Eq, PartialEq)]
#[as_ref(str)]
pub struct Username(String);

impl Username {
    /// Creates a new [`Username`] if the given `name` is valid.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Option<Self> {
        let name = name.into();
        Self::check(&name).then_some(Self(name))
    }

    /// Checks whether the given `name` is a valid [`Username`].
    fn check(name: impl AsRef<str>) -> bool {
        /// Regular expression of the characters allowed by the identity
        /// provider: letters, marks, symbols, numbers and punctuation, up to
        /// 128 of them.
        static REGEX: LazyLock<Regex> = LazyLock::new(|| {
            Regex::new(r"^[\p{L}\p{M}\p{S}\p{N}\p{P}]{1,128}$")
                .expect("valid regex")
        });

        REGEX.is_match(name.as_ref())
    }
}

impl FromStr for Username {
    type Err = &'static str;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s).ok_or("invalid `Username`")
    }
}

/// Current password of a [`User`].
#[derive(AsRef, Clone, Debug, Display, Eq, PartialEq)]
#[as_ref(str)]
#[debug("Password(***)")]
pub struct Password(String);

impl Password {
    /// Maximum number of characters accepted by the identity provider.
    pub const MAX_LENGTH: usize = 256;

    /// Creates a new [`Password`] if the given `password` is valid.
    #[must_use]
    pub fn new(password: impl Into<String>) -> Option<Self> {
        let password = password.into();
        let len = password.chars().count();
        (len > 0 && len <= Self::MAX_LENGTH).then_some(Self(password))
    }
}

impl FromStr for Password {
    type Err = &'static str;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s).ok_or("invalid `Password`")
    }
}

impl CloneableSecret for Password {}
impl Zeroize for Password {
    fn zeroize(&mut self) {
        self.0.zeroize();
    }
}

/// Password chosen by a [`User`] to replace a temporary one.
#[derive(AsRef, Clone, Debug, Display, Eq, PartialEq)]
#[as_ref(str)]
#[debug("NewPassword(***)")]
pub struct NewPassword(String);

impl NewPassword {
    /// Minimum number of characters of a [`NewPassword`].
    pub const MIN_LENGTH: usize = 8;

    /// Creates a new [`NewPassword`] if the given `password` is long enough.
    #[must_use]
    pub fn new(password: impl Into<String>) -> Option<Self> {
        let password = password.into();
        let len = password.chars().count();
        (Self::MIN_LENGTH..=Password::MAX_LENGTH)
            .contains(&len)
            .then_some(Self(password))
    }
}

impl FromStr for NewPassword {
    type Err = &'static str;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s).ok_or("`NewPassword` must be at least 8 characters long")
    }
}

impl CloneableSecret for NewPassword {}
impl Zeroize for NewPassword {
    fn zeroize(&mut self) {
        self.0.zeroize();
    }
}

#[cfg(test)]
mod spec {
    use super::{NewPassword, Password, Username};

    #[test]
    fn accepts_emails_as_usernames() {
        assert!(Username::new("test@example.com").is_some());
        assert!(Username::new("newpassword@example.com").is_some());
    }

    #[test]
    fn rejects_malformed_usernames() {
        assert!(Username::new("").is_none());
        assert!(Username::new("with space").is_none());
        assert!(Username::new("a".repeat(129)).is_none());
    }

    #[test]
    fn rejects_short_new_passwords() {
        assert!(NewPassword::new("Short1!").is_none());
        assert!(NewPassword::new("Longer1!").is_some());
        assert!("Short1!".parse::<NewPassword>().is_err());
    }

    #[test]
    fn rejects_empty_passwords() {
        assert!(Password::new("").is_none());
        assert!(Password::new("x").is_some());
    }

    #[test]
    fn hides_passwords_in_debug_output() {
        let password = Password::new("password123").unwrap();

        assert!(!format!("{password:?}").contains("password123"));
    }
}
