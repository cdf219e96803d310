//! [`Session`]-related definitions.

use common::DateTime;
use derive_more::{AsRef, From, Into};
use juniper::{GraphQLObject, GraphQLScalar, GraphQLUnion};
use service::domain;

use crate::{
    api::{self, scalar},
    Context,
};

/// Session of the authenticated `User`.
#[derive(Clone, Debug, GraphQLObject)]
#[graphql(context = Context, name = "Session")]
pub struct Session {
    /// `User` this `Session` belongs to.
    pub user: api::User,

    /// `DateTime` when this `Session` expires.
    pub expires_at: DateTime,
}

impl From<domain::Session> for Session {
    fn from(session: domain::Session) -> Self {
        let domain::Session { user, expires_at } = session;
        Self {
            user: user.into(),
            expires_at: expires_at.coerce(),
        }
    }
}

/// Challenge to resolve before a `Session` is created.
#[derive(Clone, Debug, GraphQLObject)]
#[graphql(context = Context, name = "Challenge")]
pub struct Challenge {
    /// Name of this `Challenge`, like `NEW_PASSWORD_REQUIRED`.
    pub name: String,

    /// Opaque session to pass back when responding to this `Challenge`.
    pub session: ChallengeSession,

    /// Name of the `User` this `Challenge` is issued for.
    pub username: String,
}

/// Opaque session of a `Challenge`.
#[derive(AsRef, Clone, Debug, From, GraphQLScalar, Into)]
#[graphql(
    name = "ChallengeSession",
    with = scalar::Via::<domain::challenge::Session>,
)]
pub struct ChallengeSession(domain::challenge::Session);

/// Result of signing in.
#[derive(Clone, Debug, From, GraphQLUnion)]
#[graphql(context = Context, name = "SignInResult")]
pub enum SignInResult {
    /// `User` is signed in.
    Session(Session),

    /// `User` must resolve a `Challenge` first.
    Challenge(Challenge),
}
