//! [`Challenge`] definitions.

use std::{collections::HashMap, str::FromStr};

use derive_more::{AsRef, Debug, Display};
use serde::Deserialize;
use strum::{EnumString, IntoStaticStr};

#[cfg(doc)]
use crate::domain::token::TokenSet;

/// Intermediate authentication state that must be resolved before a
/// [`TokenSet`] is issued.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Challenge {
    /// [`Name`] of this [`Challenge`].
    pub name: Name,

    /// [`Session`] to round-trip when responding to this [`Challenge`].
    pub session: Session,

    /// Parameters the identity provider attached to this [`Challenge`].
    pub parameters: HashMap<String, String>,
}

impl Challenge {
    /// Returns the username this [`Challenge`] is issued for, if the
    /// identity provider tells it.
    ///
    /// Looks at the `USERNAME` parameter first, then at the `email` of the
    /// JSON-encoded `userAttributes` parameter.
    #[must_use]
    pub fn username(&self) -> Option<String> {
        /// Subset of the `userAttributes` [`Challenge`] parameter.
        #[derive(Deserialize)]
        struct Attributes {
            /// Email address of the user.
            email: Option<String>,
        }

        if let Some(name) = self.parameters.get("USERNAME") {
            return Some(name.clone());
        }
        self.parameters
            .get("userAttributes")
            .and_then(|a| serde_json::from_str::<Attributes>(a).ok())
            .and_then(|a| a.email)
    }
}

/// Name of a [`Challenge`].
#[derive(
    Clone,
    Copy,
    Debug,
    EnumString,
    Eq,
    IntoStaticStr,
    PartialEq,
    strum::Display,
)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum Name {
    /// User must replace a temporary password before signing in.
    NewPasswordRequired,
}

/// Opaque state of a [`Challenge`] issued by the identity provider.
#[derive(AsRef, Clone, Debug, Display, Eq, PartialEq)]
#[as_ref(str)]
#[debug("Session(***)")]
pub struct Session(String);

impl Session {
    /// Maximum length of a [`Session`] accepted by the identity provider.
    pub const MAX_LENGTH: usize = 2048;

    /// Creates a new [`Session`] if the given `session` is non-empty and
    /// short enough.
    #[must_use]
    pub fn new(session: impl Into<String>) -> Option<Self> {
        let session = session.into();
        (!session.trim().is_empty() && session.len() <= Self::MAX_LENGTH)
            .then_some(Self(session))
    }
}

impl FromStr for Session {
    type Err = &'static str;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s).ok_or("invalid challenge `Session`")
    }
}

#[cfg(test)]
mod spec {
    use std::collections::HashMap;

    use super::{Challenge, Name, Session};

    fn challenge(parameters: &[(&str, &str)]) -> Challenge {
        Challenge {
            name: Name::NewPasswordRequired,
            session: Session::new("session").unwrap(),
            parameters: parameters
                .iter()
                .map(|(k, v)| ((*k).to_owned(), (*v).to_owned()))
                .collect::<HashMap<_, _>>(),
        }
    }

    #[test]
    fn names_challenges_as_provider_does() {
        assert_eq!(
            Name::NewPasswordRequired.to_string(),
            "NEW_PASSWORD_REQUIRED",
        );
        assert_eq!(
            "NEW_PASSWORD_REQUIRED".parse::<Name>().unwrap(),
            Name::NewPasswordRequired,
        );
        assert!("SMS_MFA".parse::<Name>().is_err());
    }

    #[test]
    fn prefers_username_parameter() {
        let c = challenge(&[
            ("USERNAME", "user-789"),
            ("userAttributes", r#"{"email":"a@b.c"}"#),
        ]);

        assert_eq!(c.username().as_deref(), Some("user-789"));
    }

    #[test]
    fn falls_back_to_user_attributes_email() {
        let c = challenge(&[("userAttributes", r#"{"email":"a@b.c"}"#)]);
        assert_eq!(c.username().as_deref(), Some("a@b.c"));

        let c = challenge(&[("userAttributes", "not json")]);
        assert_eq!(c.username(), None);
    }

    #[test]
    fn rejects_blank_sessions() {
        assert!(Session::new("").is_none());
        assert!(Session::new("   ").is_none());
        assert!(Session::new("x".repeat(2049)).is_none());
    }
}
