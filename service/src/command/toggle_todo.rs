//! [`Command`] for toggling a [`Todo`] completion.

use derive_more::{Display, Error, From};
use tracerr::Traced;

use crate::{
    domain::{todo, Todo},
    infra::{
        database::{self, ToggleCompletion},
        Database,
    },
    Service,
};

use super::Command;

/// [`Command`] for toggling a [`Todo`] completion.
#[derive(Clone, Copy, Debug)]
pub struct ToggleTodo {
    /// ID of the [`Todo`] to toggle.
    pub id: todo::Id,
}

impl<Idp, Db> Command<ToggleTodo> for Service<Idp, Db>
where
    Db: Database<
        ToggleCompletion,
        Ok = Option<Todo>,
        Err = Traced<database::Error>,
    >,
{
    type Ok = Todo;
    type Err = Traced<ExecutionError>;

    async fn execute(&self, cmd: ToggleTodo) -> Result<Self::Ok, Self::Err> {
        use ExecutionError as E;

        let ToggleTodo { id } = cmd;

        self.database()
            .execute(ToggleCompletion(id))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?
            .ok_or_else(|| tracerr::new!(E::TodoNotExists(id)))
    }
}

/// Error of [`ToggleTodo`] [`Command`] execution.
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
