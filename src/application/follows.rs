//! Follow/unfollow operations between authors.

use std::sync::Arc;

use thiserror::Error;
use uuid::Uuid;

use crate::application::repos::{FollowsRepo, RepoError, UsersRepo};
use crate::domain::entities::UserRecord;

#[derive(Debug, Error)]
pub enum FollowError {
    #[error("unknown user")]
    UnknownUser,
    #[error("no follow edge to remove")]
    EdgeNotFound,
    #[error(transparent)]
    Repo(RepoError),
}

impl From<RepoError> for FollowError {
    fn from(error: RepoError) -> Self {
        match error {
            RepoError::NotFound => Self::EdgeNotFound,
            other => Self::Repo(other),
        }
    }
}

pub struct FollowService {
    users: Arc<dyn UsersRepo>,
    follows: Arc<dyn FollowsRepo>,
}

impl FollowService {
    pub fn new(users: Arc<dyn UsersRepo>, follows: Arc<dyn FollowsRepo>) -> Self {
        Self { users, follows }
    }

    /// Subscribes `follower_id` to the author named `username`. Idempotent:
    /// re-following and following oneself both succeed without creating an
    /// edge. Returns the author so callers can redirect to the profile.
    pub async fn follow(
        &self,
        follower_id: Uuid,
        username: &str,
    ) -> Result<UserRecord, FollowError> {
        let author = self
            .users
            .find_by_username(username)
            .await?
            .ok_or(FollowError::UnknownUser)?;
        if author.id != follower_id {
            // The repo upsert swallows concurrent duplicates.
            self.follows.follow(follower_id, author.id).await?;
        }
        Ok(author)
    }

    /// Removes the subscription. Fails with [`FollowError::EdgeNotFound`]
    /// when no edge exists, leaving state unchanged.
    pub async fn unfollow(
        &self,
        follower_id: Uuid,
        username: &str,
    ) -> Result<UserRecord, FollowError> {
        let author = self
            .users
            .find_by_username(username)
            .await?
            .ok_or(FollowError::UnknownUser)?;
        let removed = self.follows.unfollow(follower_id, author.id).await?;
        if !removed {
            return Err(FollowError::EdgeNotFound);
        }
        Ok(author)
    }
}
