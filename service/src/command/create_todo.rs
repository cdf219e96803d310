//! [`Command`] for creating a new [`Todo`].

use common::{operations::Insert, DateTime};
use derive_more::{Display, Error, From};
use tracerr::Traced;

use crate::{
    domain::{todo, Todo},
    infra::{database, Database},
    Service,
};

use super::Command;

/// [`Command`] for creating a new [`Todo`].
#[derive(Clone, Debug)]
pub struct CreateTodo {
    /// [`todo::Title`] of the [`Todo`].
    pub title: todo::Title,
}

impl<Idp, Db> Command<CreateTodo> for Service<Idp, Db>
where
    Db: Database<Insert<Todo>, Ok = (), Err = Traced<database::Error>>,
{
    type Ok = Todo;
    type Err = Traced<ExecutionError>;

    async fn execute(&self, cmd: CreateTodo) -> Result<Self::Ok, Self::Err> {
        use ExecutionError as E;

        let CreateTodo { title } = cmd;

        let todo = Todo {
            id: todo::Id::new(),
            title,
            completed: false,
            created_at: DateTime::now().coerce(),
        };
        self.database()
            .execute(Insert(todo.clone()))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?;

        Ok(todo)
    }
}

/// Error of [`CreateTodo`] [`Command`] execution.
#[derive(Clone, Copy, Debug, Display, Error, From)]
pub enum ExecutionError {
    /// [`Database`] error.
    #[display("`Database` operation failed: {_0}")]
    Db(database::Error),
}
