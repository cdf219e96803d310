//! [`Command`] for creating a new [`Post`].

use common::{operations::Insert, DateTime};
use derive_more::{Display, Error, From};
use tracerr::Traced;

use crate::{
    domain::{post, user, Post},
    infra::{database, Database},
    Service,
};

use super::Command;

/// [`Command`] for creating a new [`Post`] on behalf of a [`User`].
///
/// [`User`]: crate::domain::User
#[derive(Clone, Debug)]
pub struct CreatePost {
    /// [`post::Name`] of the [`Post`].
    pub name: post::Name,

    /// ID of the [`User`] creating the [`Post`].
    ///
    /// [`User`]: crate::domain::User
    pub author: user::Id,
}

impl<Idp, Db> Command<CreatePost> for Service<Idp, Db>
where
    Db: Database<Insert<Post>, Ok = (), Err = Traced<database::Error>>,
{
    type Ok = Post;
    type Err = Traced<ExecutionError>;

    async fn execute(&self, cmd: CreatePost) -> Result<Self::Ok, Self::Err> {
        use ExecutionError as E;

        let CreatePost { name, author } = cmd;

        let post = Post {
            id: post::Id::new(),
            name,
            created_by: author,
            created_at: DateTime::now().coerce(),
        };
        self.database()
            .execute(Insert(post.clone()))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?;

        Ok(post)
    }
}

/// Error of [`CreatePost`] [`Command`] execution.
#[derive(Clone, Copy, Debug, Display, Error, From)]
pub enum ExecutionError {
    /// [`Database`] error.
    #[display("`Database` operation failed: {_0}")]
    Db(database::Error),
}

#[cfg(test)]
mod spec {
    use crate::{
        command::spec::service,
        domain::{post, user},
        infra::Fake,
        query, Command as _,
    };

    use super::CreatePost;

    #[tokio::test]
    async fn creates_posts_of_their_author() {
        let svc = service(Fake::default());
        let author = user::Id::from("user-123".to_owned());

        let latest = svc
            .execute(query::post::LatestBy::by(author.clone()))
            .await
            .unwrap();
        assert!(latest.is_none());

        let created = svc
            .execute(CreatePost {
                name: post::Name::new("Test Post").unwrap(),
                author: author.clone(),
            })
            .await
            .unwrap();
        assert_eq!(created.name.as_ref(), "Test Post");
        assert_eq!(created.created_by, author);

        let latest = svc
            .execute(query::post::LatestBy::by(author))
            .await
            .unwrap();
        assert_eq!(latest, Some(created));

        let stranger = user::Id::from("user-456".to_owned());
        let latest = svc
            .execute(query::post::LatestBy::by(stranger))
            .await
            .unwrap();
        assert!(latest.is_none());
    }
}
