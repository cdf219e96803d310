//! Domain definitions.

pub mod challenge;
pub mod post;
pub mod session;
pub mod todo;
pub mod token;
pub mod user;

pub use self::{
    challenge::Challenge, post::Post, session::Session, todo::Todo,
    token::TokenSet, user::User,
};
