//! Behavior of the home-listing response cache through the router.

use std::collections::HashSet;
use std::sync::Arc;

use axum::{
    Router,
    body::Body,
    http::{Method, Request, StatusCode, header},
};
use metrics_util::debugging::DebuggingRecorder;
use piazza::{
    application::{
        comments::CommentService,
        feed::FeedService,
        follows::FollowService,
        pagination::Paginator,
        posts::PostService,
        repos::{
            CommentsRepo, CreatePostParams, FollowsRepo, GroupsRepo, PostsRepo, PostsWriteRepo,
            UsersRepo,
        },
    },
    cache::{CacheConfig, CacheState, ListingStore},
    infra::{
        http::{HttpState, build_router},
        memory::InMemoryRepositories,
    },
};
use tower::ServiceExt;

fn build_cached_app(
    repos: Arc<InMemoryRepositories>,
    config: CacheConfig,
) -> (Router, Arc<ListingStore>) {
    let posts_repo: Arc<dyn PostsRepo> = repos.clone();
    let posts_write_repo: Arc<dyn PostsWriteRepo> = repos.clone();
    let groups_repo: Arc<dyn GroupsRepo> = repos.clone();
    let users_repo: Arc<dyn UsersRepo> = repos.clone();
    let comments_repo: Arc<dyn CommentsRepo> = repos.clone();
    let follows_repo: Arc<dyn FollowsRepo> = repos.clone();

    let feed = Arc::new(FeedService::new(
        posts_repo.clone(),
        groups_repo,
        users_repo.clone(),
        comments_repo.clone(),
        follows_repo.clone(),
        Paginator::new(10),
    ));
    let posts = Arc::new(PostService::new(posts_repo.clone(), posts_write_repo));
    let comments = Arc::new(CommentService::new(posts_repo, comments_repo));
    let follows = Arc::new(FollowService::new(users_repo.clone(), follows_repo));

    let store = Arc::new(ListingStore::new(&config));
    let router = build_router(HttpState {
        feed,
        posts,
        comments,
        follows,
        users: users_repo,
        db: None,
        cache: Some(CacheState {
            config,
            store: store.clone(),
        }),
    });

    (router, store)
}

fn get(uri: &str) -> Request<Body> {
    Request::builder()
        .method(Method::GET)
        .uri(uri)
        .body(Body::empty())
        .expect("request should build")
}

fn get_as(uri: &str, username: &str) -> Request<Body> {
    Request::builder()
        .method(Method::GET)
        .uri(uri)
        .header(header::COOKIE, format!("identity={username}"))
        .body(Body::empty())
        .expect("request should build")
}

async fn body_text(response: axum::response::Response) -> String {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body should collect");
    String::from_utf8(bytes.to_vec()).expect("body should be utf-8")
}

async fn seed_post(repos: &Arc<InMemoryRepositories>, username: &str, text: &str) -> uuid::Uuid {
    let author = match repos.find_by_username(username).await.unwrap() {
        Some(user) => user,
        None => repos.create_user(username, username).await.unwrap(),
    };
    repos
        .create_post(CreatePostParams {
            author_id: author.id,
            text: text.to_string(),
            group_id: None,
            image: None,
        })
        .await
        .unwrap()
        .id
}

#[tokio::test]
async fn home_listing_is_served_stale_within_ttl() {
    let repos = Arc::new(InMemoryRepositories::default());
    let post_id = seed_post(&repos, "alice", "cached post").await;

    let (app, store) = build_cached_app(repos.clone(), CacheConfig::default());

    let first = app.clone().oneshot(get("/")).await.unwrap();
    assert_eq!(first.status(), StatusCode::OK);
    assert!(body_text(first).await.contains("cached post"));
    assert_eq!(store.len(), 1);

    repos.delete_post(post_id).await.unwrap();

    // Within the TTL the deleted post still shows up.
    let stale = app.clone().oneshot(get("/")).await.unwrap();
    assert_eq!(stale.status(), StatusCode::OK);
    assert!(body_text(stale).await.contains("cached post"));

    store.clear();
    let fresh = app.oneshot(get("/")).await.unwrap();
    assert_eq!(fresh.status(), StatusCode::OK);
    assert!(body_text(fresh).await.contains("No posts yet."));
}

#[tokio::test]
async fn distinct_pages_are_cached_separately() {
    let repos = Arc::new(InMemoryRepositories::default());
    for n in 1..=13 {
        seed_post(&repos, "alice", &format!("post number {n}")).await;
    }

    let (app, store) = build_cached_app(repos, CacheConfig::default());

    let first = app.clone().oneshot(get("/?page=1")).await.unwrap();
    assert!(body_text(first).await.contains("Page 1 of 2"));
    let second = app.clone().oneshot(get("/?page=2")).await.unwrap();
    assert!(body_text(second).await.contains("Page 2 of 2"));

    assert_eq!(store.len(), 2);

    // A repeat hit must not grow the store.
    let repeat = app.oneshot(get("/?page=2")).await.unwrap();
    assert!(body_text(repeat).await.contains("Page 2 of 2"));
    assert_eq!(store.len(), 2);
}

#[tokio::test]
async fn non_home_routes_bypass_the_cache() {
    let repos = Arc::new(InMemoryRepositories::default());
    seed_post(&repos, "alice", "a post").await;

    let (app, store) = build_cached_app(repos, CacheConfig::default());

    let profile = app.clone().oneshot(get("/profile/alice")).await.unwrap();
    assert_eq!(profile.status(), StatusCode::OK);
    assert_eq!(store.len(), 0);

    let missing = app.oneshot(get("/no-such-route")).await.unwrap();
    assert_eq!(missing.status(), StatusCode::NOT_FOUND);
    assert_eq!(store.len(), 0);
}

#[tokio::test]
async fn signed_in_pages_are_never_shared_through_the_cache() {
    let repos = Arc::new(InMemoryRepositories::default());
    seed_post(&repos, "alice", "a post").await;

    let (app, store) = build_cached_app(repos, CacheConfig::default());

    // A signed-in warm-up must not populate the shared store.
    let signed_in = app.clone().oneshot(get_as("/", "alice")).await.unwrap();
    assert_eq!(signed_in.status(), StatusCode::OK);
    let signed_in_body = body_text(signed_in).await;
    assert!(signed_in_body.contains("New post"));
    assert!(!signed_in_body.contains("Sign in"));
    assert!(store.is_empty());

    // Anonymous traffic still uses the cache and gets the anonymous chrome.
    let anonymous = app.clone().oneshot(get("/")).await.unwrap();
    assert!(body_text(anonymous).await.contains("Sign in"));
    assert_eq!(store.len(), 1);

    // A signed-in request after the anonymous warm-up bypasses the stored
    // copy and keeps its own chrome.
    let repeat = app.oneshot(get_as("/", "alice")).await.unwrap();
    let repeat_body = body_text(repeat).await;
    assert!(repeat_body.contains("New post"));
    assert!(!repeat_body.contains("Sign in"));
}

#[tokio::test]
async fn disabled_cache_reflects_writes_immediately() {
    let repos = Arc::new(InMemoryRepositories::default());
    let post_id = seed_post(&repos, "alice", "short lived").await;

    let config = CacheConfig {
        enabled: false,
        ..Default::default()
    };
    let (app, store) = build_cached_app(repos.clone(), config);

    let first = app.clone().oneshot(get("/")).await.unwrap();
    assert!(body_text(first).await.contains("short lived"));
    assert!(store.is_empty());

    repos.delete_post(post_id).await.unwrap();

    let second = app.oneshot(get("/")).await.unwrap();
    assert!(body_text(second).await.contains("No posts yet."));
}

#[tokio::test]
async fn cache_paths_emit_expected_metric_keys() {
    let recorder = DebuggingRecorder::new();
    let snapshotter = recorder.snapshotter();
    recorder
        .install()
        .expect("debug metrics recorder should install in this test process");

    let repos = Arc::new(InMemoryRepositories::default());
    seed_post(&repos, "alice", "metrics post").await;
    let (app, _store) = build_cached_app(repos, CacheConfig::default());

    // First request misses, second hits.
    for _ in 0..2 {
        let response = app.clone().oneshot(get("/")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    let names: HashSet<String> = snapshotter
        .snapshot()
        .into_vec()
        .into_iter()
        .map(|(composite_key, _, _, _)| composite_key.key().name().to_string())
        .collect();

    for metric in ["piazza_cache_hit_total", "piazza_cache_miss_total"] {
        assert!(names.contains(metric), "missing metric: {metric}");
    }
}

#[tokio::test]
async fn cached_response_keeps_content_type() {
    let repos = Arc::new(InMemoryRepositories::default());
    seed_post(&repos, "alice", "typed post").await;

    let (app, _store) = build_cached_app(repos, CacheConfig::default());

    let _ = app.clone().oneshot(get("/")).await.unwrap();
    let cached = app.oneshot(get("/")).await.unwrap();

    let content_type = cached
        .headers()
        .get(header::CONTENT_TYPE)
        .expect("content type should survive the cache")
        .to_str()
        .unwrap();
    assert!(content_type.starts_with("text/html"));
}
