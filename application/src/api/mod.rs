//! GraphQL API definitions.

mod mutation;
pub mod post;
mod query;
pub mod scalar;
pub mod session;
pub mod todo;
pub mod user;

use juniper::EmptySubscription;

use crate::Context;

pub use self::{
    mutation::Mutation,
    post::Post,
    query::Query,
    session::{Challenge, Session, SignInResult},
    todo::Todo,
    user::User,
};

/// GraphQL schema.
pub type Schema =
    juniper::RootNode<'static, Query, Mutation, EmptySubscription<Context>>;
