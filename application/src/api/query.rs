//! GraphQL [`Query`]s definitions.

use juniper::graphql_object;
use service::{domain::post, query, Query as _};

use crate::{api, AsError, Context, Error};

/// Root of all GraphQL queries.
#[derive(Clone, Copy, Debug)]
pub struct Query;

impl Query {
    /// Name of the [`tracing::Span`] for the queries.
    pub(crate) const SPAN_NAME: &'static str = "GraphQL query";
}

#[graphql_object(context = Context)]
impl Query {
    /// Returns the `Session` of the current request, if it's authenticated.
    ///
    /// Never refreshes an expired `Session`.
    #[tracing::instrument(
        skip_all,
        fields(
            gql.name = "session",
            otel.name = Self::SPAN_NAME,
        ),
    )]
    pub async fn session(ctx: &Context) -> Option<api::Session> {
        ctx.session().get().await.map(Into::into)
    }

    /// Returns all the `Todo`s in their creation order.
    ///
    /// # Errors
    ///
    /// Possible error codes:
    /// - `AUTHORIZATION_REQUIRED` - the request carries no valid `Session`.
    #[tracing::instrument(
        skip_all,
        fields(
            gql.name = "todos",
            otel.name = Self::SPAN_NAME,
        ),
    )]
    pub async fn todos(ctx: &Context) -> Result<Vec<api::Todo>, Error> {
        _ = ctx.current_session().await?;

        ctx.service()
            .execute(query::todo::All::by(()))
            .await
            .map_err(AsError::into_error)
            .map_err(ctx.error())
            .map(|todos| todos.into_iter().map(Into::into).collect())
    }

    /// Greets the provided `text`.
    #[tracing::instrument(
        skip_all,
        fields(
            gql.name = "hello",
            otel.name = Self::SPAN_NAME,
        ),
    )]
    pub fn hello(text: String) -> String {
        post::greeting(&text)
    }

    /// Returns the newest `Post` created by the current `User`, if any.
    ///
    /// # Errors
    ///
    /// Possible error codes:
    /// - `AUTHORIZATION_REQUIRED` - the request carries no valid `Session`.
    #[tracing::instrument(
        skip_all,
        fields(
            gql.name = "latestPost",
            otel.name = Self::SPAN_NAME,
        ),
    )]
    pub async fn latest_post(
        ctx: &Context,
    ) -> Result<Option<api::Post>, Error> {
        let session = ctx.current_session().await?;

        ctx.service()
            .execute(query::post::LatestBy::by(session.user.id))
            .await
            .map_err(AsError::into_error)
            .map_err(ctx.error())
            .map(|post| post.map(Into::into))
    }

    /// Returns the message visible to signed-in `User`s only.
    ///
    /// # Errors
    ///
    /// Possible error codes:
    /// - `AUTHORIZATION_REQUIRED` - the request carries no valid `Session`.
    #[tracing::instrument(
        skip_all,
        fields(
            gql.name = "secretMessage",
            otel.name = Self::SPAN_NAME,
        ),
    )]
    pub async fn secret_message(ctx: &Context) -> Result<String, Error> {
        _ = ctx.current_session().await?;

        Ok(post::SECRET_MESSAGE.to_owned())
    }
}
