//! [`Todo`]-related definitions.

use common::DateTime;
use derive_more::{AsRef, Display, From, Into};
use juniper::{graphql_object, GraphQLScalar};
use service::domain;

use crate::{
    api::{self, scalar},
    Context,
};

/// Item of the demo todo list.
#[derive(Clone, Debug, From, Into)]
pub struct Todo(domain::Todo);

/// Item of the demo todo list.
#[graphql_object(context = Context)]
impl Todo {
    /// Unique identifier of this `Todo`.
    #[tracing::instrument(
        skip_all,
        fields(
            gql.name = "Todo.id",
            otel.name = api::Query::SPAN_NAME,
        ),
    )]
    pub fn id(&self) -> Id {
        self.0.id.into()
    }

    /// Title of this `Todo`.
    #[tracing::instrument(
        skip_all,
        fields(
            gql.name = "Todo.title",
            otel.name = api::Query::SPAN_NAME,
        ),
    )]
    pub fn title(&self) -> Title {
        self.0.title.clone().into()
    }

    /// Indicator whether this `Todo` is done.
    #[tracing::instrument(
        skip_all,
        fields(
            gql.name = "Todo.completed",
            otel.name = api::Query::SPAN_NAME,
        ),
    )]
    pub fn completed(&self) -> bool {
        self.0.completed
    }

    /// `DateTime` when this `Todo` was created.
    #[tracing::instrument(
        skip_all,
        fields(
            gql.name = "Todo.createdAt",
            otel.name = api::Query::SPAN_NAME,
        ),
    )]
    pub fn created_at(&self) -> DateTime {
        self.0.created_at.coerce()
    }
}

/// Unique identifier of a `Todo`.
#[derive(AsRef, Clone, Copy, Debug, Display, From, GraphQLScalar, Into)]
#[graphql(name = "TodoId", with = scalar::Via::<domain::todo::Id>)]
pub struct Id(domain::todo::Id);

/// Title of a `Todo`, trimmed and at most 256 characters long.
#[derive(AsRef, Clone, Debug, Display, From, GraphQLScalar, Into)]
#[graphql(name = "TodoTitle", with = scalar::Via::<domain::todo::Title>)]
pub struct Title(domain::todo::Title);
