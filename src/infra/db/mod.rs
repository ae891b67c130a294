//! Postgres-backed repository implementations.

mod comments;
mod follows;
mod groups;
mod posts;
mod users;
mod util;

pub use util::{check_length, check_slug, check_text, map_sqlx_error};

use std::sync::Arc;

use sqlx::{
    Postgres, QueryBuilder,
    postgres::{PgPool, PgPoolOptions},
    query,
};

use crate::application::repos::{PostQueryFilter, RepoError};
use crate::domain::validate::FieldLimits;

/// Columns shared by every post listing and lookup. Author and group data
/// come along in the same row so record assembly never re-queries.
const POST_SELECT: &str = "SELECT p.id, p.text, p.author_id, u.username AS author_username, \
    p.group_id, g.slug AS group_slug, g.title AS group_title, p.image, \
    (SELECT COUNT(*) FROM post_likes pl WHERE pl.post_id = p.id) AS like_count, \
    p.created_at \
    FROM posts p \
    INNER JOIN users u ON u.id = p.author_id \
    LEFT JOIN groups g ON g.id = p.group_id \
    WHERE 1 = 1";

#[derive(Clone)]
pub struct PostgresRepositories {
    pool: Arc<PgPool>,
    limits: FieldLimits,
}

impl PostgresRepositories {
    pub fn new(pool: PgPool, limits: FieldLimits) -> Self {
        Self {
            pool: Arc::new(pool),
            limits,
        }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    pub async fn connect(url: &str, max_connections: u32) -> Result<PgPool, sqlx::Error> {
        PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(url)
            .await
    }

    pub async fn run_migrations(pool: &PgPool) -> Result<(), sqlx::Error> {
        sqlx::migrate!("./migrations")
            .run(pool)
            .await
            .map_err(Into::into)
    }

    pub async fn health_check(&self) -> Result<(), sqlx::Error> {
        query("SELECT 1").execute(self.pool()).await.map(|_| ())
    }

    fn apply_post_filter<'q>(qb: &mut QueryBuilder<'q, Postgres>, filter: &'q PostQueryFilter) {
        if let Some(group_id) = filter.group_id {
            qb.push(" AND p.group_id = ");
            qb.push_bind(group_id);
        }

        if let Some(author_id) = filter.author_id {
            qb.push(" AND p.author_id = ");
            qb.push_bind(author_id);
        }

        if let Some(follower_id) = filter.followed_by {
            qb.push(
                " AND EXISTS (SELECT 1 FROM follows f \
                 WHERE f.followed_id = p.author_id AND f.follower_id = ",
            );
            qb.push_bind(follower_id);
            qb.push(")");
        }
    }

    fn convert_count(value: i64) -> Result<u64, RepoError> {
        value
            .try_into()
            .map_err(|_| RepoError::from_persistence("count exceeds supported range"))
    }
}
