//! GraphQL [`Mutation`]s definitions.

use juniper::graphql_object;
use secrecy::SecretBox;
use service::{
    command::{self, sign_in},
    Command as _,
};

use crate::{api, define_error, AsError, Context, Error};

/// Root of all GraphQL mutations.
#[derive(Clone, Copy, Debug)]
pub struct Mutation;

impl Mutation {
    /// Name of the [`tracing::Span`] for the mutations.
    const SPAN_NAME: &'static str = "GraphQL mutation";
}

#[graphql_object(context = Context)]
impl Mutation {
    /// Signs in a `User` with the provided credentials.
    ///
    /// Returns a `Challenge` if the `User` must replace a temporary password
    /// first.
    ///
    /// # Errors
    ///
    /// Possible error codes:
    /// - `INVALID_CREDENTIALS` - wrong username or password;
    /// - `USER_NOT_FOUND` - no `User` with the provided username;
    /// - `ACCOUNT_UNCONFIRMED` - the `User` hasn't confirmed its account.
    #[tracing::instrument(
        skip_all,
        fields(
            gql.name = "signIn",
            otel.name = Self::SPAN_NAME,
            username = %username,
        ),
    )]
    pub async fn sign_in(
        username: api::user::Username,
        password: api::user::Password,
        ctx: &Context,
    ) -> Result<api::SignInResult, Error> {
        let output = ctx
            .service()
            .execute(command::SignIn {
                username: username.into(),
                password: SecretBox::init_with(move || password.into()),
            })
            .await
            .map_err(AsError::into_error)
            .map_err(ctx.error())?;

        Ok(match output {
            sign_in::Output::Authenticated(output) => {
                api::Session::from(ctx.session().save(output).await).into()
            }
            sign_in::Output::ChallengeRequired {
                challenge,
                username,
            } => api::Challenge {
                name: challenge.name.to_string(),
                session: challenge.session.into(),
                username,
            }
            .into(),
        })
    }

    /// Replaces a temporary password of a `User`, resolving the `Challenge`
    /// issued on signing in.
    ///
    /// # Errors
    ///
    /// Possible error codes:
    /// - `PASSWORD_POLICY_VIOLATION` - the new password is too weak;
    /// - `INVALID_CHALLENGE_SESSION` - the `Challenge` is invalid or expired;
    /// - `USERNAME_REQUIRED` - the identity provider needs the username.
    #[tracing::instrument(
        skip_all,
        fields(
            gql.name = "changePassword",
            otel.name = Self::SPAN_NAME,
            username = ?username.as_ref().map(ToString::to_string),
        ),
    )]
    pub async fn change_password(
        session: api::session::ChallengeSession,
        new_password: api::user::NewPassword,
        username: Option<api::user::Username>,
        ctx: &Context,
    ) -> Result<api::Session, Error> {
        let new_password = new_password
            .validate()
            .map_err(Error::from)
            .map_err(ctx.error())?;

        let output = ctx
            .service()
            .execute(command::RespondToPasswordChallenge {
                session: session.into(),
                new_password: SecretBox::new(Box::new(new_password)),
                username: username.map(Into::into),
            })
            .await
            .map_err(AsError::into_error)
            .map_err(ctx.error())?;

        Ok(ctx.session().save(output).await.into())
    }

    /// Signs out the current `User` by clearing its `Session`.
    #[tracing::instrument(
        skip_all,
        fields(
            gql.name = "signOut",
            otel.name = Self::SPAN_NAME,
        ),
    )]
    pub async fn sign_out(ctx: &Context) -> bool {
        ctx.session().clear().await;
        true
    }

    /// Creates a new `Post` with the provided name on behalf of the current
    /// `User`.
    ///
    /// # Errors
    ///
    /// Possible error codes:
    /// - `AUTHORIZATION_REQUIRED` - the request carries no valid `Session`.
    #[tracing::instrument(
        skip_all,
        fields(
            gql.name = "createPost",
            name = %name,
            otel.name = Self::SPAN_NAME,
        ),
    )]
    pub async fn create_post(
        name: api::post::Name,
        ctx: &Context,
    ) -> Result<api::Post, Error> {
        let session = ctx.current_session().await?;

        ctx.service()
            .execute(command::CreatePost {
                name: name.into(),
                author: session.user.id,
            })
            .await
            .map_err(AsError::into_error)
            .map_err(ctx.error())
            .map(Into::into)
    }

    /// Creates a new `Todo` with the provided title.
    ///
    /// # Errors
    ///
    /// Possible error codes:
    /// - `AUTHORIZATION_REQUIRED` - the request carries no valid `Session`.
    #[tracing::instrument(
        skip_all,
        fields(
            gql.name = "createTodo",
            otel.name = Self::SPAN_NAME,
            title = %title,
        ),
    )]
    pub async fn create_todo(
        title: api::todo::Title,
        ctx: &Context,
    ) -> Result<api::Todo, Error> {
        _ = ctx.current_session().await?;

        ctx.service()
            .execute(command::CreateTodo {
                title: title.into(),
            })
            .await
            .map_err(AsError::into_error)
            .map_err(ctx.error())
            .map(Into::into)
    }

    /// Toggles the completion of the `Todo` with the provided ID.
    ///
    /// # Errors
    ///
    /// Possible error codes:
    /// - `AUTHORIZATION_REQUIRED` - the request carries no valid `Session`;
    /// - `TODO_NOT_EXISTS` - the `Todo` with the provided ID does not exist.
    #[tracing::instrument(
        skip_all,
        fields(
            gql.name = "toggleTodo",
            id = %id,
            otel.name = Self::SPAN_NAME,
        ),
    )]
    pub async fn toggle_todo(
        id: api::todo::Id,
        ctx: &Context,
    ) -> Result<api::Todo, Error> {
        _ = ctx.current_session().await?;

        ctx.service()
            .execute(command::ToggleTodo { id: id.into() })
            .await
            .map_err(AsError::into_error)
            .map_err(ctx.error())
            .map(Into::into)
    }

    /// Deletes the `Todo` with the provided ID.
    ///
    /// # Errors
    ///
    /// Possible error codes:
    /// - `AUTHORIZATION_REQUIRED` - the request carries no valid `Session`;
    /// - `TODO_NOT_EXISTS` - the `Todo` with the provided ID does not exist.
    #[tracing::instrument(
        skip_all,
        fields(
            gql.name = "deleteTodo",
            id = %id,
            otel.name = Self::SPAN_NAME,
        ),
    )]
    pub async fn delete_todo(
        id: api::todo::Id,
        ctx: &Context,
    ) -> Result<api::Todo, Error> {
        _ = ctx.current_session().await?;

        ctx.service()
            .execute(command::DeleteTodo { id: id.into() })
            .await
            .map_err(AsError::into_error)
            .map_err(ctx.error())
            .map(Into::into)
    }
}

impl AsError for command::create_user_session::ExecutionError {
    fn try_as_error(&self) -> Option<Error> {
        define_error! {
            enum Error {
                #[code = "DECODE_FAILURE"]
                #[status = BAD_GATEWAY]
                #[message = "ID token carries no expiration"]
                NoExpiration,
            }
        }

        match self {
            Self::Decode(e) => e.try_as_error(),
            Self::NoExpiration => Some(Error::NoExpiration.into()),
            Self::Encryption(e) => e.try_as_error(),
        }
    }
}

impl AsError for sign_in::ExecutionError {
    fn try_as_error(&self) -> Option<Error> {
        match self {
            Self::IdentityProvider(e) => e.try_as_error(),
            Self::Session(e) => e.try_as_error(),
        }
    }
}

impl AsError for command::respond_to_password_challenge::ExecutionError {
    fn try_as_error(&self) -> Option<Error> {
        match self {
            Self::IdentityProvider(e) => e.try_as_error(),
            Self::Session(e) => e.try_as_error(),
        }
    }
}

impl AsError for command::create_post::ExecutionError {
    fn try_as_error(&self) -> Option<Error> {
        match self {
            Self::Db(e) => e.try_as_error(),
        }
    }
}

define_error! {
    enum TodoError {
        #[code = "TODO_NOT_EXISTS"]
        #[status = NOT_FOUND]
        #[message = "`Todo` with the provided ID does not exist"]
        NotExists,
    }
}

impl AsError for command::create_todo::ExecutionError {
    fn try_as_error(&self) -> Option<Error> {
        match self {
            Self::Db(e) => e.try_as_error(),
        }
    }
}

impl AsError for command::toggle_todo::ExecutionError {
    fn try_as_error(&self) -> Option<Error> {
        match self {
            Self::Db(e) => e.try_as_error(),
            Self::TodoNotExists(_) => Some(TodoError::NotExists.into()),
        }
    }
}

impl AsError for command::delete_todo::ExecutionError {
    fn try_as_error(&self) -> Option<Error> {
        match self {
            Self::Db(e) => e.try_as_error(),
            Self::TodoNotExists(_) => Some(TodoError::NotExists.into()),
        }
    }
}
