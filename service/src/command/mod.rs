//! [`Command`] definition.

pub mod authorize_user_session;
pub mod create_post;
pub mod create_todo;
pub mod create_user_session;
pub mod delete_todo;
pub mod refresh_user_session;
pub mod respond_to_password_challenge;
pub mod sign_in;
pub mod toggle_todo;

/// [`Command`] of the [`Service`].
///
/// [`Service`]: crate::Service
pub use common::Handler as Command;

pub use self::{
    authorize_user_session::AuthorizeUserSession, create_post::CreatePost,
    create_todo::CreateTodo, create_user_session::CreateUserSession,
    delete_todo::DeleteTodo, refresh_user_session::RefreshUserSession,
    respond_to_password_challenge::RespondToPasswordChallenge,
    sign_in::SignIn, toggle_todo::ToggleTodo,
};
