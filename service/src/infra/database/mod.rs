//! [`Database`]-related implementations.

pub mod memory;

use derive_more::{Display, Error as StdError};

use crate::domain::todo;
#[cfg(doc)]
use crate::domain::Todo;

pub use self::memory::Memory;

/// Database operation.
pub use common::Handler as Database;

/// Operation flipping the completion of a [`Todo`] in place, outputting the
/// updated [`Todo`] if it exists.
#[derive(Clone, Copy, Debug)]
pub struct ToggleCompletion(pub todo::Id);

/// [`Database`] error.
#[derive(Clone, Copy, Debug, Display, StdError)]
pub enum Error {
    /// Entity with the same ID is stored already.
    #[display("`Todo(id: {_0})` already exists")]
    Duplicate(#[error(not(source))] todo::Id),
}
