//! Comment write operations.

use std::sync::Arc;

use thiserror::Error;
use uuid::Uuid;

use crate::application::repos::{CommentsRepo, CreateCommentParams, PostsRepo, RepoError};
use crate::domain::entities::{CommentDraft, CommentRecord};

#[derive(Debug, Error)]
pub enum CommentError {
    #[error("{0}")]
    Validation(String),
    #[error("post not found")]
    PostNotFound,
    #[error(transparent)]
    Repo(RepoError),
}

impl From<RepoError> for CommentError {
    fn from(error: RepoError) -> Self {
        match error {
            RepoError::InvalidInput { message } => Self::Validation(message),
            RepoError::NotFound => Self::PostNotFound,
            other => Self::Repo(other),
        }
    }
}

pub struct CommentService {
    posts: Arc<dyn PostsRepo>,
    comments: Arc<dyn CommentsRepo>,
}

impl CommentService {
    pub fn new(posts: Arc<dyn PostsRepo>, comments: Arc<dyn CommentsRepo>) -> Self {
        Self { posts, comments }
    }

    /// Attaches a comment to an existing post. A draft that fails text
    /// validation leaves the post's comments untouched.
    pub async fn add_comment(
        &self,
        post_id: Uuid,
        author_id: Uuid,
        draft: CommentDraft,
    ) -> Result<CommentRecord, CommentError> {
        if self.posts.find_by_id(post_id).await?.is_none() {
            return Err(CommentError::PostNotFound);
        }
        let created = self
            .comments
            .create_comment(CreateCommentParams {
                post_id,
                author_id,
                text: draft.text,
            })
            .await?;
        Ok(created)
    }
}
