use std::sync::Arc;

use axum::{
    Router,
    extract::{Path, Query, State},
    http::StatusCode,
    middleware,
    response::{IntoResponse, Redirect, Response},
    routing::{get, post},
};
use axum_extra::extract::cookie::CookieJar;
use serde::Deserialize;

use crate::{
    application::{
        comments::CommentService,
        error::HttpError,
        feed::{FeedError, FeedService},
        follows::{FollowError, FollowService},
        posts::PostService,
        repos::UsersRepo,
    },
    cache::{CacheState, response_cache_layer},
    domain::entities::UserRecord,
    infra::db::PostgresRepositories,
    presentation::views::{
        FollowTemplate, GroupTemplate, IndexTemplate, ListingContext, PostDetailTemplate,
        PostCard, ProfileTemplate, ViewerView, render_not_found_response,
        render_template_response,
    },
};

use super::{
    db_health_response,
    identity::{self, login_redirect},
    middleware::{log_responses, set_request_context},
    posts,
    repo_error_to_http,
};

#[derive(Clone)]
pub struct HttpState {
    pub feed: Arc<FeedService>,
    pub posts: Arc<PostService>,
    pub comments: Arc<CommentService>,
    pub follows: Arc<FollowService>,
    pub users: Arc<dyn UsersRepo>,
    /// Present only when serving against Postgres; the health route reports
    /// no-content when running over another backend.
    pub db: Option<Arc<PostgresRepositories>>,
    pub cache: Option<CacheState>,
}

pub fn build_router(state: HttpState) -> Router {
    // Only the home listing goes through the response cache.
    let cached_routes = Router::new().route("/", get(index));
    let cached_routes = if let Some(cache_state) = state.cache.clone() {
        cached_routes.layer(middleware::from_fn_with_state(
            cache_state,
            response_cache_layer,
        ))
    } else {
        cached_routes
    };

    let plain_routes = Router::new()
        .route("/group/{slug}", get(group_list))
        .route("/profile/{username}", get(profile))
        .route("/posts/{id}", get(post_detail))
        .route("/create", get(posts::create_form).post(posts::create_submit))
        .route(
            "/posts/{id}/edit",
            get(posts::edit_form).post(posts::edit_submit),
        )
        .route("/posts/{id}/comment", post(posts::add_comment))
        .route(
            "/profile/{username}/follow",
            get(follow_author).post(follow_author),
        )
        .route(
            "/profile/{username}/unfollow",
            get(unfollow_author).post(unfollow_author),
        )
        .route("/follow", get(follow_feed))
        .route("/_health/db", get(public_health));

    cached_routes
        .merge(plain_routes)
        .fallback(fallback)
        .with_state(state)
        .layer(middleware::from_fn(log_responses))
        .layer(middleware::from_fn(set_request_context))
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub(super) struct PageQuery {
    pub page: Option<String>,
}

pub(super) async fn resolve_viewer(
    state: &HttpState,
    jar: &CookieJar,
) -> Result<Option<UserRecord>, Response> {
    identity::current_user(jar, &state.users)
        .await
        .map_err(|err| repo_error_to_http("infra::http::resolve_viewer", err).into_response())
}

pub(super) fn viewer_view(viewer: &Option<UserRecord>) -> Option<ViewerView> {
    viewer.as_ref().map(ViewerView::from)
}

fn feed_error_to_response(error: FeedError, viewer: Option<ViewerView>) -> Response {
    match error {
        FeedError::UnknownGroup | FeedError::UnknownUser | FeedError::UnknownPost => {
            render_not_found_response(viewer)
        }
        other => HttpError::from(other).into_response(),
    }
}

async fn index(
    State(state): State<HttpState>,
    jar: CookieJar,
    Query(query): Query<PageQuery>,
) -> Response {
    let viewer = match resolve_viewer(&state, &jar).await {
        Ok(viewer) => viewer,
        Err(response) => return response,
    };

    match state.feed.home_page(query.page.as_deref()).await {
        Ok(page) => render_template_response(
            IndexTemplate {
                viewer: viewer_view(&viewer),
                content: ListingContext::new(&page, "/"),
            },
            StatusCode::OK,
        ),
        Err(err) => feed_error_to_response(err, viewer_view(&viewer)),
    }
}

async fn group_list(
    State(state): State<HttpState>,
    jar: CookieJar,
    Path(slug): Path<String>,
    Query(query): Query<PageQuery>,
) -> Response {
    let viewer = match resolve_viewer(&state, &jar).await {
        Ok(viewer) => viewer,
        Err(response) => return response,
    };

    match state.feed.group_page(&slug, query.page.as_deref()).await {
        Ok(feed) => render_template_response(
            GroupTemplate {
                viewer: viewer_view(&viewer),
                group: (&feed.group).into(),
                content: ListingContext::new(&feed.page, &format!("/group/{slug}")),
            },
            StatusCode::OK,
        ),
        Err(err) => feed_error_to_response(err, viewer_view(&viewer)),
    }
}

async fn profile(
    State(state): State<HttpState>,
    jar: CookieJar,
    Path(username): Path<String>,
    Query(query): Query<PageQuery>,
) -> Response {
    let viewer = match resolve_viewer(&state, &jar).await {
        Ok(viewer) => viewer,
        Err(response) => return response,
    };
    let viewer_id = viewer.as_ref().map(|u| u.id);

    match state
        .feed
        .profile_page(&username, query.page.as_deref(), viewer_id)
        .await
    {
        Ok(feed) => {
            let viewing_own_profile = viewer_id == Some(feed.author.id);
            render_template_response(
                ProfileTemplate {
                    viewer: viewer_view(&viewer),
                    author_username: feed.author.username.clone(),
                    author_display_name: feed.author.display_name.clone(),
                    post_count: feed.post_count,
                    viewer_is_following: feed.viewer_is_following,
                    viewing_own_profile,
                    content: ListingContext::new(&feed.page, &format!("/profile/{username}")),
                },
                StatusCode::OK,
            )
        }
        Err(err) => feed_error_to_response(err, viewer_view(&viewer)),
    }
}

async fn post_detail(
    State(state): State<HttpState>,
    jar: CookieJar,
    Path(id): Path<String>,
) -> Response {
    let viewer = match resolve_viewer(&state, &jar).await {
        Ok(viewer) => viewer,
        Err(response) => return response,
    };

    let Ok(post_id) = id.parse() else {
        return render_not_found_response(viewer_view(&viewer));
    };

    match state.feed.post_detail(post_id).await {
        Ok(detail) => {
            let can_edit = viewer.as_ref().is_some_and(|u| u.id == detail.post.author_id);
            render_template_response(
                PostDetailTemplate {
                    viewer: viewer_view(&viewer),
                    post: PostCard::from(&detail.post),
                    author_post_count: detail.author_post_count,
                    comments: detail.comments.iter().map(Into::into).collect(),
                    can_edit,
                    can_comment: viewer.is_some(),
                },
                StatusCode::OK,
            )
        }
        Err(err) => feed_error_to_response(err, viewer_view(&viewer)),
    }
}

async fn follow_feed(
    State(state): State<HttpState>,
    jar: CookieJar,
    Query(query): Query<PageQuery>,
) -> Response {
    let viewer = match resolve_viewer(&state, &jar).await {
        Ok(Some(viewer)) => viewer,
        Ok(None) => return login_redirect("/follow"),
        Err(response) => return response,
    };

    match state
        .feed
        .following_page(viewer.id, query.page.as_deref())
        .await
    {
        Ok(page) => render_template_response(
            FollowTemplate {
                viewer: Some(ViewerView::from(&viewer)),
                content: ListingContext::new(&page, "/follow"),
            },
            StatusCode::OK,
        ),
        Err(err) => feed_error_to_response(err, Some(ViewerView::from(&viewer))),
    }
}

async fn follow_author(
    State(state): State<HttpState>,
    jar: CookieJar,
    Path(username): Path<String>,
) -> Response {
    let viewer = match resolve_viewer(&state, &jar).await {
        Ok(Some(viewer)) => viewer,
        Ok(None) => return login_redirect(&format!("/profile/{username}/follow")),
        Err(response) => return response,
    };

    match state.follows.follow(viewer.id, &username).await {
        Ok(author) => Redirect::to(&format!("/profile/{}", author.username)).into_response(),
        Err(err) => follow_error_to_response(err, Some(ViewerView::from(&viewer))),
    }
}

async fn unfollow_author(
    State(state): State<HttpState>,
    jar: CookieJar,
    Path(username): Path<String>,
) -> Response {
    let viewer = match resolve_viewer(&state, &jar).await {
        Ok(Some(viewer)) => viewer,
        Ok(None) => return login_redirect(&format!("/profile/{username}/unfollow")),
        Err(response) => return response,
    };

    match state.follows.unfollow(viewer.id, &username).await {
        Ok(author) => Redirect::to(&format!("/profile/{}", author.username)).into_response(),
        Err(err) => follow_error_to_response(err, Some(ViewerView::from(&viewer))),
    }
}

fn follow_error_to_response(error: FollowError, viewer: Option<ViewerView>) -> Response {
    match error {
        FollowError::UnknownUser | FollowError::EdgeNotFound => render_not_found_response(viewer),
        FollowError::Repo(err) => {
            repo_error_to_http("infra::http::follow_error_to_response", err).into_response()
        }
    }
}

async fn public_health(State(state): State<HttpState>) -> Response {
    match &state.db {
        Some(db) => db_health_response(db.health_check().await),
        None => StatusCode::NO_CONTENT.into_response(),
    }
}

async fn fallback(State(state): State<HttpState>, jar: CookieJar) -> Response {
    let viewer = resolve_viewer(&state, &jar).await.unwrap_or(None);
    render_not_found_response(viewer_view(&viewer))
}
