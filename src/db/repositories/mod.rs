use async_trait::async_trait;
use sea_orm::DbErr;
use serde::Serialize;
use serde::de::DeserializeOwned;
use thiserror::Error;

use crate::models::Validate;
use crate::query::ListQuery;

pub mod review;
pub mod tour;
pub mod user;

#[derive(Debug, Error)]
pub enum RepoError {
    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    Conflict(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl From<DbErr> for RepoError {
    fn from(err: DbErr) -> Self {
        let message = err.to_string();
        if message.contains("UNIQUE constraint failed") {
            if message.contains("reviews.") {
                Self::Conflict("You have already reviewed this tour".to_string())
            } else if message.contains("users.email") {
                Self::Conflict("This email is already in use".to_string())
            } else if message.contains("tours.name") {
                Self::Conflict("A tour with this name already exists".to_string())
            } else {
                Self::Conflict("A record with this value already exists".to_string())
            }
        } else {
            Self::Other(anyhow::Error::new(err))
        }
    }
}

/// Uniform CRUD surface over an entity, the seam the generic resource
/// handlers are parameterized over.
#[async_trait]
pub trait CrudRepository: Send + Sync {
    type Output: Serialize + Send + Sync;
    type Create: DeserializeOwned + Validate + Send;
    type Update: DeserializeOwned + Validate + Send;

    async fn find_all(&self, query: &ListQuery) -> Result<Vec<Self::Output>, RepoError>;

    async fn find_by_id(&self, id: i32) -> Result<Option<Self::Output>, RepoError>;

    async fn create(&self, input: Self::Create) -> Result<Self::Output, RepoError>;

    async fn update_by_id(
        &self,
        id: i32,
        input: Self::Update,
    ) -> Result<Option<Self::Output>, RepoError>;

    async fn delete_by_id(&self, id: i32) -> Result<bool, RepoError>;
}

/// Decodes a JSON-array text column, tolerating absent and malformed data.
pub(crate) fn decode_list<T: DeserializeOwned>(raw: Option<&String>) -> Vec<T> {
    raw.and_then(|s| serde_json::from_str(s).ok())
        .unwrap_or_default()
}

/// Encodes a list into a JSON-array text column; empty lists store NULL.
pub(crate) fn encode_list<T: Serialize>(items: &[T]) -> Option<String> {
    if items.is_empty() {
        None
    } else {
        serde_json::to_string(items).ok()
    }
}
