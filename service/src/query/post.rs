//! [`Query`] collection related to [`Post`]s.

use common::operations::By;

use crate::domain::{user, Post};
#[cfg(doc)]
use crate::Query;

use super::DatabaseQuery;

/// Queries the newest [`Post`] created by the [`User`] with the provided
/// [`user::Id`].
///
/// [`User`]: crate::domain::User
pub type LatestBy = DatabaseQuery<By<Option<Post>, user::Id>>;
