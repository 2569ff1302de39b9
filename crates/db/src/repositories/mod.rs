use async_trait::async_trait;
use thiserror::Error;

use bento_core::domain::profile::{ChoiceAction, ProfilePatch, UserId, UserProfile};

pub mod memory;
pub mod profile;

pub use memory::InMemoryProfileRepository;
pub use profile::SqlProfileRepository;

#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("decode error: {0}")]
    Decode(String),
}

/// Per-user conversation state store. `upsert` merges: fields absent from the
/// patch keep their stored value, and the awaiting flag lands in the same
/// statement as the purpose/preference change that justifies it.
#[async_trait]
pub trait ProfileRepository: Send + Sync {
    async fn find(&self, user_id: &UserId) -> Result<Option<UserProfile>, RepositoryError>;

    async fn upsert(
        &self,
        user_id: &UserId,
        display_name: &str,
        patch: ProfilePatch,
    ) -> Result<(), RepositoryError>;

    async fn append_preference(
        &self,
        user_id: &UserId,
        preference: &str,
    ) -> Result<(), RepositoryError>;

    async fn record_choice(
        &self,
        user_id: &UserId,
        place_id: &str,
        action: ChoiceAction,
    ) -> Result<(), RepositoryError>;
}
