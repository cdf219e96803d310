//! In-memory [`Database`] implementation.

use std::sync::Arc;

use common::{
    operations::{By, Delete, Insert, Select},
    DateTime,
};
use tokio::sync::RwLock;
use tracerr::Traced;

use crate::{
    domain::{todo, user, Post, Todo},
    infra::{
        database::{self, ToggleCompletion},
        Database,
    },
};

/// [`Database`] keeping its entities in process memory.
///
/// Entities are lost on restart.
#[derive(Clone, Debug, Default)]
pub struct Memory {
    /// Stored [`Todo`]s in their creation order.
    todos: Arc<RwLock<Vec<Todo>>>,

    /// Stored [`Post`]s in their creation order.
    posts: Arc<RwLock<Vec<Post>>>,
}

impl Memory {
    /// Creates a new [`Memory`] database seeded with the demo [`Todo`]s.
    #[must_use]
    pub fn seeded() -> Self {
        let todos = ["Learn Rust", "Build something"]
            .into_iter()
            .zip([true, false])
            .filter_map(|(title, completed)| {
                Some(Todo {
                    id: todo::Id::new(),
                    title: todo::Title::new(title)?,
                    completed,
                    created_at: DateTime::now().coerce(),
                })
            })
            .collect();
        Self {
            todos: Arc::new(RwLock::new(todos)),
            posts: Arc::default(),
        }
    }
}

impl Database<Select<By<Vec<Todo>, ()>>> for Memory {
    type Ok = Vec<Todo>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        _: Select<By<Vec<Todo>, ()>>,
    ) -> Result<Self::Ok, Self::Err> {
        Ok(self.todos.read().await.clone())
    }
}

impl Database<Select<By<Option<Todo>, todo::Id>>> for Memory {
    type Ok = Option<Todo>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<Option<Todo>, todo::Id>>,
    ) -> Result<Self::Ok, Self::Err> {
        let id = by.into_inner();
        Ok(self.todos.read().await.iter().find(|t| t.id == id).cloned())
    }
}

impl Database<Insert<Todo>> for Memory {
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Insert(todo): Insert<Todo>,
    ) -> Result<Self::Ok, Self::Err> {
        let mut todos = self.todos.write().await;
        if todos.iter().any(|t| t.id == todo.id) {
            return Err(tracerr::new!(database::Error::Duplicate(todo.id)));
        }
        todos.push(todo);
        Ok(())
    }
}

impl Database<ToggleCompletion> for Memory {
    type Ok = Option<Todo>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        ToggleCompletion(id): ToggleCompletion,
    ) -> Result<Self::Ok, Self::Err> {
        Ok(self
            .todos
            .write()
            .await
            .iter_mut()
            .find(|t| t.id == id)
            .map(|t| {
                t.completed = !t.completed;
                t.clone()
            }))
    }
}

impl Database<Delete<By<Option<Todo>, todo::Id>>> for Memory {
    type Ok = Option<Todo>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Delete(by): Delete<By<Option<Todo>, todo::Id>>,
    ) -> Result<Self::Ok, Self::Err> {
        let id = by.into_inner();
        let mut todos = self.todos.write().await;
        Ok(todos
            .iter()
            .position(|t| t.id == id)
            .map(|i| todos.remove(i)))
    }
}

impl Database<Insert<Post>> for Memory {
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Insert(post): Insert<Post>,
    ) -> Result<Self::Ok, Self::Err> {
        self.posts.write().await.push(post);
        Ok(())
    }
}

/// Selects the newest [`Post`] created by the [`User`] with the provided ID.
///
/// [`User`]: crate::domain::User
impl Database<Select<By<Option<Post>, user::Id>>> for Memory {
    type Ok = Option<Post>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<Option<Post>, user::Id>>,
    ) -> Result<Self::Ok, Self::Err> {
        let author = by.into_inner();
        Ok(self
            .posts
            .read()
            .await
            .iter()
            .rev()
            .find(|p| p.created_by == author)
            .cloned())
    }
}
