//! [`Query`] collection related to [`Todo`]s.

use common::operations::By;

use crate::domain::{todo, Todo};
#[cfg(doc)]
use crate::Query;

use super::DatabaseQuery;

/// Queries all the [`Todo`]s in their creation order.
pub type All = DatabaseQuery<By<Vec<Todo>, ()>>;

/// Queries a [`Todo`] by its [`todo::Id`].
pub type ById = DatabaseQuery<By<Option<Todo>, todo::Id>>;
