//! Post write operations: create and edit with authorship checks.

use std::sync::Arc;

use thiserror::Error;
use uuid::Uuid;

use crate::application::repos::{
    CreatePostParams, PostsRepo, PostsWriteRepo, RepoError, UpdatePostParams,
};
use crate::domain::entities::{PostDraft, PostRecord};

#[derive(Debug, Error)]
pub enum PostWriteError {
    /// Storage refused the draft. Handlers re-render the form with this
    /// message instead of failing the request.
    #[error("{0}")]
    Validation(String),
    #[error("post not found")]
    NotFound,
    #[error("only the author may edit a post")]
    NotAuthor,
    #[error(transparent)]
    Repo(RepoError),
}

impl From<RepoError> for PostWriteError {
    fn from(error: RepoError) -> Self {
        match error {
            RepoError::InvalidInput { message } => Self::Validation(message),
            RepoError::NotFound => Self::NotFound,
            other => Self::Repo(other),
        }
    }
}

pub struct PostService {
    posts: Arc<dyn PostsRepo>,
    posts_write: Arc<dyn PostsWriteRepo>,
}

impl PostService {
    pub fn new(posts: Arc<dyn PostsRepo>, posts_write: Arc<dyn PostsWriteRepo>) -> Self {
        Self { posts, posts_write }
    }

    pub async fn create_post(
        &self,
        author_id: Uuid,
        draft: PostDraft,
    ) -> Result<PostRecord, PostWriteError> {
        let created = self
            .posts_write
            .create_post(CreatePostParams {
                author_id,
                text: draft.text,
                group_id: draft.group_id,
                image: draft.image,
            })
            .await?;
        Ok(created)
    }

    /// Loads the post for the edit form, enforcing authorship.
    pub async fn post_for_edit(
        &self,
        post_id: Uuid,
        editor_id: Uuid,
    ) -> Result<PostRecord, PostWriteError> {
        let post = self
            .posts
            .find_by_id(post_id)
            .await?
            .ok_or(PostWriteError::NotFound)?;
        if post.author_id != editor_id {
            return Err(PostWriteError::NotAuthor);
        }
        Ok(post)
    }

    pub async fn edit_post(
        &self,
        post_id: Uuid,
        editor_id: Uuid,
        draft: PostDraft,
    ) -> Result<PostRecord, PostWriteError> {
        let existing = self
            .posts
            .find_by_id(post_id)
            .await?
            .ok_or(PostWriteError::NotFound)?;
        if existing.author_id != editor_id {
            return Err(PostWriteError::NotAuthor);
        }
        let updated = self
            .posts_write
            .update_post(UpdatePostParams {
                id: post_id,
                text: draft.text,
                group_id: draft.group_id,
                image: draft.image,
            })
            .await?;
        Ok(updated)
    }
}
