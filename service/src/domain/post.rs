//! [`Post`] definitions.

use std::str::FromStr;

use common::{unit, DateTimeOf};
use derive_more::{AsRef, Display, From};
use uuid::Uuid;

use crate::domain::user;

/// Post of the demo guestbook, authored by a signed-in [`User`].
///
/// [`User`]: crate::domain::User
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Post {
    /// ID of this [`Post`].
    pub id: Id,

    /// [`Name`] of this [`Post`].
    pub name: Name,

    /// ID of the [`User`] who created this [`Post`].
    ///
    /// [`User`]: crate::domain::User
    pub created_by: user::Id,

    /// [`DateTime`] when this [`Post`] was created.
    ///
    /// [`DateTime`]: common::DateTime
    pub created_at: CreationDateTime,
}

/// ID of a [`Post`].
#[derive(Clone, Copy, Debug, Display, Eq, From, Hash, PartialEq)]
pub struct Id(Uuid);

impl Id {
    /// Creates a new random [`Id`].
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for Id {
    fn default() -> Self {
        Self::new()
    }
}

impl FromStr for Id {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.parse().map(Self)
    }
}

/// Name of a [`Post`].
#[derive(AsRef, Clone, Debug, Display, Eq, PartialEq)]
#[as_ref(str)]
pub struct Name(String);

impl Name {
    /// Maximum number of characters in a [`Name`].
    pub const MAX_LENGTH: usize = 256;

    /// Creates a new [`Name`] if the given `name` is valid.
    ///
    /// Surrounding whitespace is trimmed.
    #[must_use]
    pub fn new(name: impl AsRef<str>) -> Option<Self> {
        let name = name.as_ref().trim();
        (!name.is_empty() && name.chars().count() <= Self::MAX_LENGTH)
            .then(|| Self(name.to_owned()))
    }
}

impl FromStr for Name {
    type Err = &'static str;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s).ok_or("`PostName` must be 1 to 256 non-blank characters")
    }
}

/// [`DateTime`] when a [`Post`] was created.
///
/// [`DateTime`]: common::DateTime
pub type CreationDateTime = DateTimeOf<(Post, unit::Creation)>;

/// Greeting the guestbook welcomes visitors with.
#[must_use]
pub fn greeting(text: &str) -> String {
    format!("Hello {text}")
}

/// Message revealed to signed-in [`User`]s only.
///
/// [`User`]: crate::domain::User
pub const SECRET_MESSAGE: &str = "you can now see this secret message!";
