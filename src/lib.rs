//! Piazza is a small community blog: authors publish short posts, optionally
//! filed under a group, and readers comment on posts and follow authors to
//! build a personal feed.
//!
//! The crate is layered: [`domain`] holds entities and validation, free of
//! I/O; [`application`] holds the services and repository traits; [`infra`]
//! provides the Postgres and in-memory repositories plus the HTTP surface;
//! [`presentation`] renders the Askama templates; [`cache`] wraps the home
//! listing in a TTL response cache; [`config`] loads layered settings.

pub mod application;
pub mod cache;
pub mod config;
pub mod domain;
pub mod infra;
pub mod presentation;
