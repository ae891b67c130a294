//! Read-side listing and detail queries behind the public pages.

use std::sync::Arc;

use thiserror::Error;
use uuid::Uuid;

use crate::application::pagination::{Page, Paginator};
use crate::application::repos::{
    CommentsRepo, FollowsRepo, GroupsRepo, PostQueryFilter, PostsRepo, RepoError, UsersRepo,
};
use crate::domain::entities::{CommentRecord, GroupRecord, PostRecord, UserRecord};

#[derive(Debug, Error)]
pub enum FeedError {
    #[error("unknown group")]
    UnknownGroup,
    #[error("unknown user")]
    UnknownUser,
    #[error("unknown post")]
    UnknownPost,
    #[error(transparent)]
    Repo(#[from] RepoError),
}

#[derive(Debug, Clone)]
pub struct GroupFeed {
    pub group: GroupRecord,
    pub page: Page<PostRecord>,
}

#[derive(Debug, Clone)]
pub struct ProfileFeed {
    pub author: UserRecord,
    pub page: Page<PostRecord>,
    /// Total posts by the author, independent of the current page.
    pub post_count: u64,
    /// Whether the signed-in viewer follows the author. `false` for
    /// anonymous viewers and for the author's own profile.
    pub viewer_is_following: bool,
}

#[derive(Debug, Clone)]
pub struct PostDetail {
    pub post: PostRecord,
    pub comments: Vec<CommentRecord>,
    pub author_post_count: u64,
}

pub struct FeedService {
    posts: Arc<dyn PostsRepo>,
    groups: Arc<dyn GroupsRepo>,
    users: Arc<dyn UsersRepo>,
    comments: Arc<dyn CommentsRepo>,
    follows: Arc<dyn FollowsRepo>,
    paginator: Paginator,
}

impl FeedService {
    pub fn new(
        posts: Arc<dyn PostsRepo>,
        groups: Arc<dyn GroupsRepo>,
        users: Arc<dyn UsersRepo>,
        comments: Arc<dyn CommentsRepo>,
        follows: Arc<dyn FollowsRepo>,
        paginator: Paginator,
    ) -> Self {
        Self {
            posts,
            groups,
            users,
            comments,
            follows,
            paginator,
        }
    }

    async fn list_page(
        &self,
        filter: &PostQueryFilter,
        requested_page: Option<&str>,
    ) -> Result<Page<PostRecord>, FeedError> {
        let total = self.posts.count_posts(filter).await?;
        let bounds = self.paginator.resolve(total, requested_page);
        let items = self
            .posts
            .list_posts(filter, bounds.limit, bounds.offset)
            .await?;
        Ok(self.paginator.assemble(items, total, bounds))
    }

    /// All posts, newest first.
    pub async fn home_page(
        &self,
        requested_page: Option<&str>,
    ) -> Result<Page<PostRecord>, FeedError> {
        self.list_page(&PostQueryFilter::default(), requested_page)
            .await
    }

    pub async fn group_page(
        &self,
        slug: &str,
        requested_page: Option<&str>,
    ) -> Result<GroupFeed, FeedError> {
        let group = self
            .groups
            .find_by_slug(slug)
            .await?
            .ok_or(FeedError::UnknownGroup)?;
        let page = self
            .list_page(&PostQueryFilter::by_group(group.id), requested_page)
            .await?;
        Ok(GroupFeed { group, page })
    }

    pub async fn profile_page(
        &self,
        username: &str,
        requested_page: Option<&str>,
        viewer: Option<Uuid>,
    ) -> Result<ProfileFeed, FeedError> {
        let author = self
            .users
            .find_by_username(username)
            .await?
            .ok_or(FeedError::UnknownUser)?;
        let filter = PostQueryFilter::by_author(author.id);
        let post_count = self.posts.count_posts(&filter).await?;
        let bounds = self.paginator.resolve(post_count, requested_page);
        let items = self
            .posts
            .list_posts(&filter, bounds.limit, bounds.offset)
            .await?;
        let page = self.paginator.assemble(items, post_count, bounds);

        let viewer_is_following = match viewer {
            Some(viewer_id) if viewer_id != author.id => {
                self.follows.is_following(viewer_id, author.id).await?
            }
            _ => false,
        };

        Ok(ProfileFeed {
            author,
            page,
            post_count,
            viewer_is_following,
        })
    }

    /// Posts by authors the given user follows.
    pub async fn following_page(
        &self,
        user_id: Uuid,
        requested_page: Option<&str>,
    ) -> Result<Page<PostRecord>, FeedError> {
        self.list_page(&PostQueryFilter::followed_by(user_id), requested_page)
            .await
    }

    pub async fn post_detail(&self, post_id: Uuid) -> Result<PostDetail, FeedError> {
        let post = self
            .posts
            .find_by_id(post_id)
            .await?
            .ok_or(FeedError::UnknownPost)?;
        let comments = self.comments.list_for_post(post.id).await?;
        let author_post_count = self
            .posts
            .count_posts(&PostQueryFilter::by_author(post.author_id))
            .await?;
        Ok(PostDetail {
            post,
            comments,
            author_post_count,
        })
    }

    pub async fn list_groups(&self) -> Result<Vec<GroupRecord>, FeedError> {
        Ok(self.groups.list_groups().await?)
    }
}
