//! [`Command`] for deleting a [`Todo`].

use common::operations::{By, Delete};
use derive_more::{Display, Error, From};
use tracerr::Traced;

use crate::{
    domain::{todo, Todo},
    infra::{database, Database},
    Service,
};

use super::Command;

/// [`Command`] for deleting a [`Todo`].
#[derive(Clone, Copy, Debug)]
pub struct DeleteTodo {
    /// ID of the [`Todo`] to delete.
    pub id: todo::Id,
}

impl<Idp, Db> Command<DeleteTodo> for Service<Idp, Db>
where
    Db: Database<
        Delete<By<Option<Todo>, todo::Id>>,
        Ok = Option<Todo>,
        Err = Traced<database::Error>,
    >,
{
    type Ok = Todo;
    type Err = Traced<ExecutionError>;

    async fn execute(&self, cmd: DeleteTodo) -> Result<Self::Ok, Self::Err> {
        use ExecutionError as E;

        let DeleteTodo { id } = cmd;

        self.database()
            .execute(Delete(By::new(id)))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?
            .ok_or_else(|| tracerr::new!(E::TodoNotExists(id)))
    }
}

/// Error of [`DeleteTodo`] [`Command`] execution.
#[derive(Clone, Copy, Debug, Display, Error, From)]
pub enum ExecutionError {
    /// [`Database`] error.
    #[display("`Database` operation failed: {_0}")]
    Db(database::Error),

    /// [`Todo`] with the provided ID does not exist.
    #[display("`Todo(id: {_0})` does not exist")]
    #[from(ignore)]
    TodoNotExists(#[error(not(source))] todo::Id),
}

#[cfg(test)]
mod spec {
    use crate::{
        command::{spec::service, CreateTodo, ToggleTodo},
        domain::todo,
        infra::Fake,
        query, Command as _,
    };

    use super::{DeleteTodo, ExecutionError};

    #[tokio::test]
    async fn manages_todos() {
        let svc = service(Fake::default());

        let created = svc
            .execute(CreateTodo {
                title: todo::Title::new("write tests").unwrap(),
            })
            .await
            .unwrap();
        assert!(!created.completed);

        let toggled = svc.execute(ToggleTodo { id: created.id }).await.unwrap();
        assert!(toggled.completed);

        let all = svc.execute(query::todo::All::by(())).await.unwrap();
        assert_eq!(all, vec![toggled.clone()]);

        let deleted = svc.execute(DeleteTodo { id: created.id }).await.unwrap();
        assert_eq!(deleted, toggled);

        let err = svc
            .execute(DeleteTodo { id: created.id })
            .await
            .unwrap_err();
        assert!(matches!(err.as_ref(), ExecutionError::TodoNotExists(_)));
    }
}
