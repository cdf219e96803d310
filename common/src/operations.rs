//! Abstract storage operations, executed as [`Handler`]s.
//!
//! [`Handler`]: crate::Handler

use std::marker::PhantomData;

/// Operation storing a new entity.
#[derive(Clone, Copy, Debug)]
pub struct Insert<T>(pub T);

/// Operation removing a stored entity, usually [`By`] its ID.
#[derive(Clone, Copy, Debug)]
pub struct Delete<T>(pub T);

/// Operation reading stored entities, usually [`By`] some criteria.
#[derive(Clone, Copy, Debug)]
pub struct Select<T>(pub T);

/// Criteria `B` an operation outputting `W` is performed by.
///
/// `W` is the output shape, so the same criteria may select a single entity
/// (`Option<T>`) or all of them (`Vec<T>`).
#[derive(Clone, Copy, Debug)]
pub struct By<W, B> {
    /// Output shape of the operation.
    _what: PhantomData<W>,

    /// Criteria of the operation.
    by: B,
}

impl<W, B> By<W, B> {
    /// Creates new [`By`] criteria.
    #[must_use]
    pub fn new(by: B) -> Self {
        Self {
            _what: PhantomData,
            by,
        }
    }

    /// Returns the criteria of this [`By`].
    #[must_use]
    pub fn get(&self) -> &B {
        &self.by
    }

    /// Consumes this [`By`] returning its criteria.
    #[must_use]
    pub fn into_inner(self) -> B {
        self.by
    }
}
