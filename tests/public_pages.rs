//! Router-level tests for the public pages, driven through `tower::oneshot`
//! over the in-memory repositories.

use std::sync::Arc;

use axum::{
    Router,
    body::Body,
    http::{Method, Request, StatusCode, header},
};
use piazza::{
    application::{
        comments::CommentService,
        feed::FeedService,
        follows::FollowService,
        pagination::Paginator,
        posts::PostService,
        repos::{
            CommentsRepo, CreateCommentParams, CreatePostParams, FollowsRepo, GroupsRepo,
            PostQueryFilter, PostsRepo, PostsWriteRepo, UsersRepo,
        },
    },
    domain::entities::{GroupRecord, UserRecord},
    infra::{
        http::{HttpState, build_router},
        memory::InMemoryRepositories,
    },
};
use tower::ServiceExt;

fn build_app(repos: Arc<InMemoryRepositories>, posts_per_page: u32) -> Router {
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
        Paginator::new(posts_per_page),
    ));
    let posts = Arc::new(PostService::new(posts_repo.clone(), posts_write_repo));
    let comments = Arc::new(CommentService::new(posts_repo, comments_repo));
    let follows = Arc::new(FollowService::new(users_repo.clone(), follows_repo));

    build_router(HttpState {
        feed,
        posts,
        comments,
        follows,
        users: users_repo,
        db: None,
        cache: None,
    })
}

async fn seed_user(repos: &Arc<InMemoryRepositories>, username: &str) -> UserRecord {
    repos
        .create_user(username, username)
        .await
        .expect("user should be created")
}

async fn seed_group(repos: &Arc<InMemoryRepositories>, slug: &str, title: &str) -> GroupRecord {
    repos
        .create_group(title, slug, "")
        .await
        .expect("group should be created")
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

fn post_form(uri: &str, username: Option<&str>, body: &str) -> Request<Body> {
    let mut builder = Request::builder()
        .method(Method::POST)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded");
    if let Some(username) = username {
        builder = builder.header(header::COOKIE, format!("identity={username}"));
    }
    builder
        .body(Body::from(body.to_string()))
        .expect("request should build")
}

async fn body_text(response: axum::response::Response) -> String {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body should collect");
    String::from_utf8(bytes.to_vec()).expect("body should be utf-8")
}

fn location(response: &axum::response::Response) -> &str {
    response
        .headers()
        .get(header::LOCATION)
        .expect("location header should be present")
        .to_str()
        .expect("location should be ascii")
}

async fn post_count(repos: &Arc<InMemoryRepositories>) -> u64 {
    repos
        .count_posts(&PostQueryFilter::default())
        .await
        .expect("count should succeed")
}

#[tokio::test]
async fn home_listing_paginates_newest_first() {
    let repos = Arc::new(InMemoryRepositories::default());
    let alice = seed_user(&repos, "alice").await;
    for n in 1..=13 {
        repos
            .create_post(CreatePostParams {
                author_id: alice.id,
                text: format!("post number {n}"),
                group_id: None,
                image: None,
            })
            .await
            .expect("post should be created");
    }

    let app = build_app(repos, 10);

    let first = app.clone().oneshot(get("/")).await.unwrap();
    assert_eq!(first.status(), StatusCode::OK);
    let first_body = body_text(first).await;
    assert!(first_body.contains("Page 1 of 2"));
    assert!(first_body.contains(">post number 13</p>"));
    assert!(first_body.contains(">post number 4</p>"));
    assert!(!first_body.contains(">post number 3</p>"));

    let second = app.clone().oneshot(get("/?page=2")).await.unwrap();
    assert_eq!(second.status(), StatusCode::OK);
    let second_body = body_text(second).await;
    assert!(second_body.contains("Page 2 of 2"));
    assert!(second_body.contains(">post number 3</p>"));
    assert!(second_body.contains(">post number 1</p>"));
    assert!(!second_body.contains(">post number 4</p>"));
}

#[tokio::test]
async fn out_of_range_and_garbage_page_numbers_clamp() {
    let repos = Arc::new(InMemoryRepositories::default());
    let alice = seed_user(&repos, "alice").await;
    for n in 1..=13 {
        repos
            .create_post(CreatePostParams {
                author_id: alice.id,
                text: format!("post number {n}"),
                group_id: None,
                image: None,
            })
            .await
            .expect("post should be created");
    }

    let app = build_app(repos, 10);

    let overflow = app.clone().oneshot(get("/?page=99")).await.unwrap();
    assert_eq!(overflow.status(), StatusCode::OK);
    assert!(body_text(overflow).await.contains("Page 2 of 2"));

    let garbage = app.clone().oneshot(get("/?page=abc")).await.unwrap();
    assert_eq!(garbage.status(), StatusCode::OK);
    assert!(body_text(garbage).await.contains("Page 1 of 2"));

    let zero = app.clone().oneshot(get("/?page=0")).await.unwrap();
    assert_eq!(zero.status(), StatusCode::OK);
    assert!(body_text(zero).await.contains("Page 1 of 2"));
}

#[tokio::test]
async fn empty_listing_renders_single_page() {
    let repos = Arc::new(InMemoryRepositories::default());
    let app = build_app(repos, 10);

    let response = app.oneshot(get("/")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_text(response).await;
    assert!(body.contains("No posts yet."));
    assert!(body.contains("Page 1 of 1"));
}

#[tokio::test]
async fn anonymous_create_redirects_to_login_with_next() {
    let repos = Arc::new(InMemoryRepositories::default());
    let app = build_app(repos.clone(), 10);

    let response = app
        .oneshot(post_form("/create", None, "text=hello&group="))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::FOUND);
    assert_eq!(location(&response), "/auth/login/?next=%2Fcreate");
    assert_eq!(post_count(&repos).await, 0);
}

#[tokio::test]
async fn create_persists_and_redirects_to_profile() {
    let repos = Arc::new(InMemoryRepositories::default());
    seed_user(&repos, "alice").await;
    let group = seed_group(&repos, "news", "News").await;
    let app = build_app(repos.clone(), 10);

    let body = format!("text=first+post&group={}", group.id);
    let response = app
        .oneshot(post_form("/create", Some("alice"), &body))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/profile/alice");

    let stored = repos
        .list_posts(&PostQueryFilter::default(), 10, 0)
        .await
        .unwrap();
    assert_eq!(stored.len(), 1);
    assert_eq!(stored[0].text, "first post");
    assert_eq!(stored[0].group_slug.as_deref(), Some("news"));
}

#[tokio::test]
async fn whitespace_post_rerenders_form_and_stores_nothing() {
    let repos = Arc::new(InMemoryRepositories::default());
    seed_user(&repos, "alice").await;
    let app = build_app(repos.clone(), 10);

    let response = app
        .oneshot(post_form("/create", Some("alice"), "text=+++&group="))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_text(response).await;
    assert!(body.contains("form-error"));
    assert_eq!(post_count(&repos).await, 0);
}

#[tokio::test]
async fn non_author_edit_redirects_without_changes() {
    let repos = Arc::new(InMemoryRepositories::default());
    let alice = seed_user(&repos, "alice").await;
    seed_user(&repos, "mallory").await;
    let post = repos
        .create_post(CreatePostParams {
            author_id: alice.id,
            text: "original text".to_string(),
            group_id: None,
            image: None,
        })
        .await
        .unwrap();

    let app = build_app(repos.clone(), 10);

    let edit_page = app
        .clone()
        .oneshot(get_as(&format!("/posts/{}/edit", post.id), "mallory"))
        .await
        .unwrap();
    assert_eq!(edit_page.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&edit_page), format!("/posts/{}", post.id));

    let submit = app
        .oneshot(post_form(
            &format!("/posts/{}/edit", post.id),
            Some("mallory"),
            "text=hijacked&group=",
        ))
        .await
        .unwrap();
    assert_eq!(submit.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&submit), format!("/posts/{}", post.id));

    let unchanged = PostsRepo::find_by_id(repos.as_ref(), post.id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(unchanged.text, "original text");
}

#[tokio::test]
async fn author_edit_updates_post() {
    let repos = Arc::new(InMemoryRepositories::default());
    let alice = seed_user(&repos, "alice").await;
    let post = repos
        .create_post(CreatePostParams {
            author_id: alice.id,
            text: "original text".to_string(),
            group_id: None,
            image: None,
        })
        .await
        .unwrap();

    let app = build_app(repos.clone(), 10);

    let response = app
        .oneshot(post_form(
            &format!("/posts/{}/edit", post.id),
            Some("alice"),
            "text=revised+text&group=",
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), format!("/posts/{}", post.id));

    let updated = PostsRepo::find_by_id(repos.as_ref(), post.id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(updated.text, "revised text");
}

#[tokio::test]
async fn invalid_comment_redirects_to_detail_and_persists_nothing() {
    let repos = Arc::new(InMemoryRepositories::default());
    let alice = seed_user(&repos, "alice").await;
    let post = repos
        .create_post(CreatePostParams {
            author_id: alice.id,
            text: "a post".to_string(),
            group_id: None,
            image: None,
        })
        .await
        .unwrap();

    let app = build_app(repos.clone(), 10);

    let response = app
        .oneshot(post_form(
            &format!("/posts/{}/comment", post.id),
            Some("alice"),
            "text=++",
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), format!("/posts/{}", post.id));
    assert!(repos.list_for_post(post.id).await.unwrap().is_empty());
}

#[tokio::test]
async fn comment_appears_on_post_detail() {
    let repos = Arc::new(InMemoryRepositories::default());
    let alice = seed_user(&repos, "alice").await;
    seed_user(&repos, "bob").await;
    let post = repos
        .create_post(CreatePostParams {
            author_id: alice.id,
            text: "a post".to_string(),
            group_id: None,
            image: None,
        })
        .await
        .unwrap();

    let app = build_app(repos.clone(), 10);

    let submit = app
        .clone()
        .oneshot(post_form(
            &format!("/posts/{}/comment", post.id),
            Some("bob"),
            "text=nice+one",
        ))
        .await
        .unwrap();
    assert_eq!(submit.status(), StatusCode::SEE_OTHER);

    let detail = app
        .oneshot(get(&format!("/posts/{}", post.id)))
        .await
        .unwrap();
    assert_eq!(detail.status(), StatusCode::OK);
    let body = body_text(detail).await;
    assert!(body.contains("nice one"));
    assert!(body.contains("bob"));
}

#[tokio::test]
async fn follow_feed_shows_only_followed_authors() {
    let repos = Arc::new(InMemoryRepositories::default());
    let alice = seed_user(&repos, "alice").await;
    let bob = seed_user(&repos, "bob").await;
    seed_user(&repos, "carol").await;
    repos
        .create_post(CreatePostParams {
            author_id: alice.id,
            text: "from alice".to_string(),
            group_id: None,
            image: None,
        })
        .await
        .unwrap();
    repos
        .create_post(CreatePostParams {
            author_id: bob.id,
            text: "from bob".to_string(),
            group_id: None,
            image: None,
        })
        .await
        .unwrap();

    let app = build_app(repos.clone(), 10);

    let follow = app
        .clone()
        .oneshot(post_form("/profile/alice/follow", Some("carol"), ""))
        .await
        .unwrap();
    assert_eq!(follow.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&follow), "/profile/alice");

    let feed = app.oneshot(get_as("/follow", "carol")).await.unwrap();
    assert_eq!(feed.status(), StatusCode::OK);
    let body = body_text(feed).await;
    assert!(body.contains("from alice"));
    assert!(!body.contains("from bob"));
}

#[tokio::test]
async fn refollow_and_self_follow_do_not_duplicate_edges() {
    let repos = Arc::new(InMemoryRepositories::default());
    let alice = seed_user(&repos, "alice").await;
    let carol = seed_user(&repos, "carol").await;

    let app = build_app(repos.clone(), 10);

    for _ in 0..2 {
        let response = app
            .clone()
            .oneshot(post_form("/profile/alice/follow", Some("carol"), ""))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
    }
    assert_eq!(repos.list_followed(carol.id).await.unwrap().len(), 1);

    let self_follow = app
        .oneshot(post_form("/profile/alice/follow", Some("alice"), ""))
        .await
        .unwrap();
    assert_eq!(self_follow.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&self_follow), "/profile/alice");
    assert!(repos.list_followed(alice.id).await.unwrap().is_empty());
}

#[tokio::test]
async fn unfollow_without_edge_is_not_found() {
    let repos = Arc::new(InMemoryRepositories::default());
    seed_user(&repos, "alice").await;
    let carol = seed_user(&repos, "carol").await;

    let app = build_app(repos.clone(), 10);

    let response = app
        .oneshot(post_form("/profile/alice/unfollow", Some("carol"), ""))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert!(repos.list_followed(carol.id).await.unwrap().is_empty());
}

#[tokio::test]
async fn anonymous_follow_routes_redirect_to_login() {
    let repos = Arc::new(InMemoryRepositories::default());
    seed_user(&repos, "alice").await;
    let app = build_app(repos, 10);

    let feed = app.clone().oneshot(get("/follow")).await.unwrap();
    assert_eq!(feed.status(), StatusCode::FOUND);
    assert_eq!(location(&feed), "/auth/login/?next=%2Ffollow");

    let follow = app
        .oneshot(post_form("/profile/alice/follow", None, ""))
        .await
        .unwrap();
    assert_eq!(follow.status(), StatusCode::FOUND);
    assert_eq!(
        location(&follow),
        "/auth/login/?next=%2Fprofile%2Falice%2Ffollow"
    );
}

#[tokio::test]
async fn group_page_filters_and_group_deletion_detaches_posts() {
    let repos = Arc::new(InMemoryRepositories::default());
    let alice = seed_user(&repos, "alice").await;
    let group = seed_group(&repos, "news", "News").await;
    repos
        .create_post(CreatePostParams {
            author_id: alice.id,
            text: "grouped post".to_string(),
            group_id: Some(group.id),
            image: None,
        })
        .await
        .unwrap();
    repos
        .create_post(CreatePostParams {
            author_id: alice.id,
            text: "loose post".to_string(),
            group_id: None,
            image: None,
        })
        .await
        .unwrap();

    let app = build_app(repos.clone(), 10);

    let page = app.clone().oneshot(get("/group/news")).await.unwrap();
    assert_eq!(page.status(), StatusCode::OK);
    let body = body_text(page).await;
    assert!(body.contains("grouped post"));
    assert!(!body.contains("loose post"));

    repos.delete_group(group.id).await.unwrap();

    let gone = app.clone().oneshot(get("/group/news")).await.unwrap();
    assert_eq!(gone.status(), StatusCode::NOT_FOUND);

    // The post survives its group.
    let home = app.oneshot(get("/")).await.unwrap();
    assert!(body_text(home).await.contains("grouped post"));
}

#[tokio::test]
async fn profile_shows_follow_state_and_post_count() {
    let repos = Arc::new(InMemoryRepositories::default());
    let alice = seed_user(&repos, "alice").await;
    let carol = seed_user(&repos, "carol").await;
    repos
        .create_post(CreatePostParams {
            author_id: alice.id,
            text: "from alice".to_string(),
            group_id: None,
            image: None,
        })
        .await
        .unwrap();
    repos.follow(carol.id, alice.id).await.unwrap();

    let app = build_app(repos, 10);

    let response = app.oneshot(get_as("/profile/alice", "carol")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_text(response).await;
    assert!(body.contains("Unfollow"));
    assert!(body.contains("from alice"));
}

#[tokio::test]
async fn unknown_routes_and_ids_render_not_found() {
    let repos = Arc::new(InMemoryRepositories::default());
    let alice = seed_user(&repos, "alice").await;
    repos
        .create_post(CreatePostParams {
            author_id: alice.id,
            text: "a post".to_string(),
            group_id: None,
            image: None,
        })
        .await
        .unwrap();

    let app = build_app(repos.clone(), 10);

    for uri in [
        "/no-such-route",
        "/profile/nobody",
        "/group/missing",
        "/posts/not-a-uuid",
        &format!("/posts/{}", uuid::Uuid::new_v4()),
    ] {
        let response = app.clone().oneshot(get(uri)).await.unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND, "uri: {uri}");
    }
}

#[tokio::test]
async fn unknown_identity_cookie_is_treated_as_anonymous() {
    let repos = Arc::new(InMemoryRepositories::default());
    let app = build_app(repos, 10);

    let response = app.oneshot(get_as("/", "ghost")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_text(response).await;
    assert!(body.contains("Sign in"));

    // An unknown identity gets the anonymous treatment on gated routes too.
    let repos = Arc::new(InMemoryRepositories::default());
    let app = build_app(repos, 10);
    let gated = app.oneshot(get_as("/follow", "ghost")).await.unwrap();
    assert_eq!(gated.status(), StatusCode::FOUND);
}

#[tokio::test]
async fn add_comment_to_missing_post_is_not_found() {
    let repos = Arc::new(InMemoryRepositories::default());
    seed_user(&repos, "alice").await;
    let app = build_app(repos, 10);

    let response = app
        .oneshot(post_form(
            &format!("/posts/{}/comment", uuid::Uuid::new_v4()),
            Some("alice"),
            "text=hello",
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn health_route_reports_no_content_without_postgres() {
    let repos = Arc::new(InMemoryRepositories::default());
    let app = build_app(repos, 10);

    let response = app.oneshot(get("/_health/db")).await.unwrap();
    assert_eq!(response.status(), StatusCode::NO_CONTENT);
}
