//! [`Post`]-related definitions.

use common::DateTime;
use derive_more::{AsRef, Display, From, Into};
use juniper::{graphql_object, GraphQLScalar};
use service::domain;

use crate::{
    api::{self, scalar},
    Context,
};

/// Post created by a signed-in `User`.
#[derive(Clone, Debug, From, Into)]
pub struct Post(domain::Post);

/// Post created by a signed-in `User`.
#[graphql_object(context = Context)]
impl Post {
    /// Unique identifier of this `Post`.
    #[tracing::instrument(
        skip_all,
        fields(
            gql.name = "Post.id",
            otel.name = api::Query::SPAN_NAME,
        ),
    )]
    pub fn id(&self) -> Id {
        self.0.id.into()
    }

    /// Name of this `Post`.
    #[tracing::instrument(
        skip_all,
        fields(
            gql.name = "Post.name",
            otel.name = api::Query::SPAN_NAME,
        ),
    )]
    pub fn name(&self) -> Name {
        self.0.name.clone().into()
    }

    /// ID of the `User` who created this `Post`.
    #[tracing::instrument(
        skip_all,
        fields(
            gql.name = "Post.createdById",
            otel.name = api::Query::SPAN_NAME,
        ),
    )]
    pub fn created_by_id(&self) -> &str {
        self.0.created_by.as_ref()
    }

    /// `DateTime` when this `Post` was created.
    #[tracing::instrument(
        skip_all,
        fields(
            gql.name = "Post.createdAt",
            otel.name = api::Query::SPAN_NAME,
        ),
    )]
    pub fn created_at(&self) -> DateTime {
        self.0.created_at.coerce()
    }
}

/// Unique identifier of a `Post`.
#[derive(AsRef, Clone, Copy, Debug, Display, From, GraphQLScalar, Into)]
#[graphql(name = "PostId", with = scalar::Via::<domain::post::Id>)]
pub struct Id(domain::post::Id);

/// Name of a `Post`, trimmed and 1 to 256 characters long.
#[derive(AsRef, Clone, Debug, Display, From, GraphQLScalar, Into)]
#[graphql(name = "PostName", with = scalar::Via::<domain::post::Name>)]
pub struct Name(domain::post::Name);
