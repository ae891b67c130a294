//! In-memory repository implementations.
//!
//! Backs the integration tests and local demos with the same trait surface
//! as Postgres. Cascade rules mirror the schema: deleting a post removes its
//! comments and likes, deleting a group detaches its posts.

use std::sync::{RwLock, RwLockWriteGuard};

use async_trait::async_trait;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::application::repos::{
    CommentsRepo, CreateCommentParams, CreatePostParams, FollowsRepo, GroupsRepo, PostQueryFilter,
    PostsRepo, PostsWriteRepo, RepoError, UpdatePostParams, UsersRepo,
};
use crate::domain::entities::{
    CommentRecord, FollowRecord, GroupRecord, PostRecord, UserRecord,
};
use crate::domain::validate::FieldLimits;
use crate::infra::db::{check_length, check_slug, check_text};

#[derive(Debug, Clone)]
struct StoredPost {
    seq: u64,
    id: Uuid,
    author_id: Uuid,
    group_id: Option<Uuid>,
    text: String,
    image: Option<String>,
    created_at: OffsetDateTime,
}

#[derive(Debug, Clone)]
struct StoredComment {
    seq: u64,
    id: Uuid,
    post_id: Uuid,
    author_id: Uuid,
    text: String,
    created_at: OffsetDateTime,
}

#[derive(Debug, Default)]
struct State {
    seq: u64,
    users: Vec<UserRecord>,
    groups: Vec<GroupRecord>,
    posts: Vec<StoredPost>,
    comments: Vec<StoredComment>,
    follows: Vec<FollowRecord>,
    likes: Vec<(Uuid, Uuid)>,
}

impl State {
    fn next_seq(&mut self) -> u64 {
        self.seq += 1;
        self.seq
    }
}

pub struct InMemoryRepositories {
    state: RwLock<State>,
    limits: FieldLimits,
}

impl Default for InMemoryRepositories {
    fn default() -> Self {
        Self::new(FieldLimits::default())
    }
}

impl InMemoryRepositories {
    pub fn new(limits: FieldLimits) -> Self {
        Self {
            state: RwLock::new(State::default()),
            limits,
        }
    }

    fn write(&self) -> RwLockWriteGuard<'_, State> {
        self.state.write().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn assemble_post(state: &State, post: &StoredPost) -> Option<PostRecord> {
        let author = state.users.iter().find(|u| u.id == post.author_id)?;
        let group = post
            .group_id
            .and_then(|gid| state.groups.iter().find(|g| g.id == gid));
        let like_count = state.likes.iter().filter(|(pid, _)| *pid == post.id).count() as i64;
        Some(PostRecord {
            id: post.id,
            text: post.text.clone(),
            author_id: post.author_id,
            author_username: author.username.clone(),
            group_id: group.map(|g| g.id),
            group_slug: group.map(|g| g.slug.clone()),
            group_title: group.map(|g| g.title.clone()),
            image: post.image.clone(),
            like_count,
            created_at: post.created_at,
        })
    }

    fn matches(state: &State, post: &StoredPost, filter: &PostQueryFilter) -> bool {
        if let Some(group_id) = filter.group_id
            && post.group_id != Some(group_id)
        {
            return false;
        }
        if let Some(author_id) = filter.author_id
            && post.author_id != author_id
        {
            return false;
        }
        if let Some(follower_id) = filter.followed_by
            && !state
                .follows
                .iter()
                .any(|f| f.follower_id == follower_id && f.followed_id == post.author_id)
        {
            return false;
        }
        true
    }

    fn filtered_newest_first(state: &State, filter: &PostQueryFilter) -> Vec<StoredPost> {
        let mut matched: Vec<StoredPost> = state
            .posts
            .iter()
            .filter(|p| Self::matches(state, p, filter))
            .cloned()
            .collect();
        matched.sort_by(|a, b| b.seq.cmp(&a.seq));
        matched
    }
}

#[async_trait]
impl UsersRepo for InMemoryRepositories {
    async fn find_by_username(&self, username: &str) -> Result<Option<UserRecord>, RepoError> {
        let state = self.write();
        Ok(state.users.iter().find(|u| u.username == username).cloned())
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<UserRecord>, RepoError> {
        let state = self.write();
        Ok(state.users.iter().find(|u| u.id == id).cloned())
    }

    async fn create_user(
        &self,
        username: &str,
        display_name: &str,
    ) -> Result<UserRecord, RepoError> {
        check_text("username", username, &self.limits)?;
        check_text("display name", display_name, &self.limits)?;
        let mut state = self.write();
        if state.users.iter().any(|u| u.username == username) {
            return Err(RepoError::Duplicate {
                constraint: "users_username_key".to_string(),
            });
        }
        let user = UserRecord {
            id: Uuid::new_v4(),
            username: username.to_string(),
            display_name: display_name.to_string(),
            joined_at: OffsetDateTime::now_utc(),
        };
        state.users.push(user.clone());
        Ok(user)
    }
}

#[async_trait]
impl GroupsRepo for InMemoryRepositories {
    async fn list_groups(&self) -> Result<Vec<GroupRecord>, RepoError> {
        let state = self.write();
        let mut groups = state.groups.clone();
        groups.sort_by(|a, b| a.title.cmp(&b.title));
        Ok(groups)
    }

    async fn find_by_slug(&self, slug: &str) -> Result<Option<GroupRecord>, RepoError> {
        let state = self.write();
        Ok(state.groups.iter().find(|g| g.slug == slug).cloned())
    }

    async fn create_group(
        &self,
        title: &str,
        slug: &str,
        description: &str,
    ) -> Result<GroupRecord, RepoError> {
        check_text("title", title, &self.limits)?;
        check_slug("slug", slug, &self.limits)?;
        check_length("description", description, &self.limits)?;
        let mut state = self.write();
        if state.groups.iter().any(|g| g.slug == slug) {
            return Err(RepoError::Duplicate {
                constraint: "groups_slug_key".to_string(),
            });
        }
        let group = GroupRecord {
            id: Uuid::new_v4(),
            slug: slug.to_string(),
            title: title.to_string(),
            description: description.to_string(),
            created_at: OffsetDateTime::now_utc(),
        };
        state.groups.push(group.clone());
        Ok(group)
    }

    async fn delete_group(&self, id: Uuid) -> Result<(), RepoError> {
        let mut state = self.write();
        let before = state.groups.len();
        state.groups.retain(|g| g.id != id);
        if state.groups.len() == before {
            return Err(RepoError::NotFound);
        }
        for post in &mut state.posts {
            if post.group_id == Some(id) {
                post.group_id = None;
            }
        }
        Ok(())
    }
}

#[async_trait]
impl PostsRepo for InMemoryRepositories {
    async fn list_posts(
        &self,
        filter: &PostQueryFilter,
        limit: u32,
        offset: u64,
    ) -> Result<Vec<PostRecord>, RepoError> {
        let state = self.write();
        let matched = Self::filtered_newest_first(&state, filter);
        Ok(matched
            .into_iter()
            .skip(offset as usize)
            .take(limit as usize)
            .filter_map(|p| Self::assemble_post(&state, &p))
            .collect())
    }

    async fn count_posts(&self, filter: &PostQueryFilter) -> Result<u64, RepoError> {
        let state = self.write();
        Ok(state
            .posts
            .iter()
            .filter(|p| Self::matches(&state, p, filter))
            .count() as u64)
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<PostRecord>, RepoError> {
        let state = self.write();
        Ok(state
            .posts
            .iter()
            .find(|p| p.id == id)
            .and_then(|p| Self::assemble_post(&state, p)))
    }
}

#[async_trait]
impl PostsWriteRepo for InMemoryRepositories {
    async fn create_post(&self, params: CreatePostParams) -> Result<PostRecord, RepoError> {
        check_text("text", &params.text, &self.limits)?;
        let mut state = self.write();
        if !state.users.iter().any(|u| u.id == params.author_id) {
            return Err(RepoError::invalid_input("unknown author"));
        }
        if let Some(group_id) = params.group_id
            && !state.groups.iter().any(|g| g.id == group_id)
        {
            return Err(RepoError::invalid_input("unknown group"));
        }
        let seq = state.next_seq();
        let post = StoredPost {
            seq,
            id: Uuid::new_v4(),
            author_id: params.author_id,
            group_id: params.group_id,
            text: params.text,
            image: params.image,
            created_at: OffsetDateTime::now_utc(),
        };
        state.posts.push(post.clone());
        Self::assemble_post(&state, &post)
            .ok_or_else(|| RepoError::from_persistence("created post disappeared"))
    }

    async fn update_post(&self, params: UpdatePostParams) -> Result<PostRecord, RepoError> {
        check_text("text", &params.text, &self.limits)?;
        let mut state = self.write();
        if let Some(group_id) = params.group_id
            && !state.groups.iter().any(|g| g.id == group_id)
        {
            return Err(RepoError::invalid_input("unknown group"));
        }
        let Some(post) = state.posts.iter_mut().find(|p| p.id == params.id) else {
            return Err(RepoError::NotFound);
        };
        post.text = params.text;
        post.group_id = params.group_id;
        post.image = params.image;
        let updated = post.clone();
        Self::assemble_post(&state, &updated)
            .ok_or_else(|| RepoError::from_persistence("updated post disappeared"))
    }

    async fn delete_post(&self, id: Uuid) -> Result<(), RepoError> {
        let mut state = self.write();
        let before = state.posts.len();
        state.posts.retain(|p| p.id != id);
        if state.posts.len() == before {
            return Err(RepoError::NotFound);
        }
        state.comments.retain(|c| c.post_id != id);
        state.likes.retain(|(pid, _)| *pid != id);
        Ok(())
    }

    async fn add_like(&self, post_id: Uuid, user_id: Uuid) -> Result<bool, RepoError> {
        let mut state = self.write();
        if !state.posts.iter().any(|p| p.id == post_id) {
            return Err(RepoError::NotFound);
        }
        if state
            .likes
            .iter()
            .any(|(pid, uid)| *pid == post_id && *uid == user_id)
        {
            return Ok(false);
        }
        state.likes.push((post_id, user_id));
        Ok(true)
    }
}

#[async_trait]
impl CommentsRepo for InMemoryRepositories {
    async fn list_for_post(&self, post_id: Uuid) -> Result<Vec<CommentRecord>, RepoError> {
        let state = self.write();
        let mut rows: Vec<&StoredComment> = state
            .comments
            .iter()
            .filter(|c| c.post_id == post_id)
            .collect();
        rows.sort_by_key(|c| c.seq);
        Ok(rows
            .into_iter()
            .filter_map(|c| {
                let author = state.users.iter().find(|u| u.id == c.author_id)?;
                Some(CommentRecord {
                    id: c.id,
                    post_id: c.post_id,
                    author_id: c.author_id,
                    author_username: author.username.clone(),
                    text: c.text.clone(),
                    created_at: c.created_at,
                })
            })
            .collect())
    }

    async fn create_comment(
        &self,
        params: CreateCommentParams,
    ) -> Result<CommentRecord, RepoError> {
        check_text("text", &params.text, &self.limits)?;
        let mut state = self.write();
        if !state.posts.iter().any(|p| p.id == params.post_id) {
            return Err(RepoError::invalid_input("unknown post"));
        }
        let Some(author) = state
            .users
            .iter()
            .find(|u| u.id == params.author_id)
            .cloned()
        else {
            return Err(RepoError::invalid_input("unknown author"));
        };
        let seq = state.next_seq();
        let comment = StoredComment {
            seq,
            id: Uuid::new_v4(),
            post_id: params.post_id,
            author_id: params.author_id,
            text: params.text,
            created_at: OffsetDateTime::now_utc(),
        };
        state.comments.push(comment.clone());
        Ok(CommentRecord {
            id: comment.id,
            post_id: comment.post_id,
            author_id: comment.author_id,
            author_username: author.username,
            text: comment.text,
            created_at: comment.created_at,
        })
    }
}

#[async_trait]
impl FollowsRepo for InMemoryRepositories {
    async fn follow(&self, follower_id: Uuid, followed_id: Uuid) -> Result<bool, RepoError> {
        if follower_id == followed_id {
            return Err(RepoError::invalid_input("cannot follow yourself"));
        }
        let mut state = self.write();
        if state
            .follows
            .iter()
            .any(|f| f.follower_id == follower_id && f.followed_id == followed_id)
        {
            return Ok(false);
        }
        state.follows.push(FollowRecord {
            id: Uuid::new_v4(),
            follower_id,
            followed_id,
            created_at: OffsetDateTime::now_utc(),
        });
        Ok(true)
    }

    async fn unfollow(&self, follower_id: Uuid, followed_id: Uuid) -> Result<bool, RepoError> {
        let mut state = self.write();
        let before = state.follows.len();
        state
            .follows
            .retain(|f| !(f.follower_id == follower_id && f.followed_id == followed_id));
        Ok(state.follows.len() != before)
    }

    async fn is_following(
        &self,
        follower_id: Uuid,
        followed_id: Uuid,
    ) -> Result<bool, RepoError> {
        let state = self.write();
        Ok(state
            .follows
            .iter()
            .any(|f| f.follower_id == follower_id && f.followed_id == followed_id))
    }

    async fn list_followed(&self, follower_id: Uuid) -> Result<Vec<FollowRecord>, RepoError> {
        let state = self.write();
        Ok(state
            .follows
            .iter()
            .filter(|f| f.follower_id == follower_id)
            .cloned()
            .collect())
    }
}
