//! Service contains the business logic of the application: authentication
//! against an identity provider and sessions kept in encrypted cookies.
//!
//! List of available Cargo features:
#![doc = document_features::document_features!()]
#![deny(
    nonstandard_style,
    rust_2018_idioms,
    rustdoc::all,
    trivial_casts,
    trivial_numeric_casts,
    unsafe_code
)]
#![forbid(non_ascii_idents)]
#![warn(
    clippy::allow_attributes,
    clippy::allow_attributes_without_reason,
    clippy::pedantic,
    clippy::wildcard_enum_match_arm,
    deprecated_in_future,
    missing_copy_implementations,
    missing_debug_implementations,
    missing_docs,
    unreachable_pub,
    unused_crate_dependencies,
    unused_import_braces,
    unused_labels,
    unused_lifetimes,
    unused_qualifications,
    unused_results
)]

pub mod cipher;
pub mod command;
pub mod domain;
pub mod infra;
pub mod query;

#[cfg(doc)]
use infra::{Database, IdentityProvider};

pub use self::{cipher::Cipher, command::Command, query::Query};

/// [`Service`] configuration.
#[derive(Clone, Debug)]
pub struct Config {
    /// [`Cipher`] of the tokens stored in cookies.
    pub cipher: Cipher,
}

/// Domain service.
#[derive(Clone, Debug)]
pub struct Service<Idp, Db> {
    /// Configuration of this [`Service`].
    config: Config,

    /// [`IdentityProvider`] of this [`Service`].
    identity_provider: Idp,

    /// [`Database`] of this [`Service`].
    database: Db,
}

impl<Idp, Db> Service<Idp, Db> {
    /// Creates a new [`Service`] with the provided parameters.
    #[must_use]
    pub fn new(config: Config, identity_provider: Idp, database: Db) -> Self {
        Self {
            config,
            identity_provider,
            database,
        }
    }

    /// Returns [`Config`] of this [`Service`].
    #[must_use]
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Returns [`IdentityProvider`] of this [`Service`].
    #[must_use]
    pub fn identity_provider(&self) -> &Idp {
        &self.identity_provider
    }

    /// Returns [`Database`] of this [`Service`].
    #[must_use]
    pub fn database(&self) -> &Db {
        &self.database
    }
}

#[cfg(test)]
mod dev_deps {
    use axum as _;
}
