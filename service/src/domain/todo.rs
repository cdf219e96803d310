//! [`Todo`] definitions.

use std::str::FromStr;

use common::{unit, DateTimeOf};
use derive_more::{AsRef, Display, From};
use uuid::Uuid;

/// Item of the demo todo list.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Todo {
    /// ID of this [`Todo`].
    pub id: Id,

    /// [`Title`] of this [`Todo`].
    pub title: Title,

    /// Indicator whether this [`Todo`] is done.
    pub completed: bool,

    /// [`DateTime`] when this [`Todo`] was created.
    ///
    /// [`DateTime`]: common::DateTime
    pub created_at: CreationDateTime,
}

/// ID of a [`Todo`].
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

/// Title of a [`Todo`].
#[derive(AsRef, Clone, Debug, Display, Eq, PartialEq)]
#[as_ref(str)]
pub struct Title(String);

impl Title {
    /// Maximum number of characters in a [`Title`].
    pub const MAX_LENGTH: usize = 256;

    /// Creates a new [`Title`] if the given `title` is valid.
    ///
    /// Surrounding whitespace is trimmed.
    #[must_use]
    pub fn new(title: impl AsRef<str>) -> Option<Self> {
        let title = title.as_ref().trim();
        (!title.is_empty() && title.chars().count() <= Self::MAX_LENGTH)
            .then(|| Self(title.to_owned()))
    }
}

impl FromStr for Title {
    type Err = &'static str;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s).ok_or("invalid `Title`")
    }
}

/// [`DateTime`] when a [`Todo`] was created.
///
/// [`DateTime`]: common::DateTime
pub type CreationDateTime = DateTimeOf<(Todo, unit::Creation)>;

#[cfg(test)]
mod spec {
    use super::Title;

    #[test]
    fn trims_titles() {
        assert_eq!(Title::new("  buy milk ").unwrap().as_ref(), "buy milk");
    }

    #[test]
    fn rejects_blank_and_long_titles() {
        assert!(Title::new(" \t").is_none());
        assert!(Title::new("x".repeat(257)).is_none());
        assert!(Title::new("x".repeat(256)).is_some());
    }
}
