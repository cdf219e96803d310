//! Infrastructure layer.

pub mod database;
pub mod identity;

#[cfg(feature = "cognito")]
pub use self::identity::Cognito;
pub use self::{
    database::{Database, Memory},
    identity::{Fake, Identity, IdentityProvider},
};
