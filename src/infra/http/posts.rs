//! Post and comment form handlers.

use axum::{
    Form,
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
};
use axum_extra::extract::cookie::CookieJar;
use serde::Deserialize;
use uuid::Uuid;

use crate::{
    application::{comments::CommentError, posts::PostWriteError},
    domain::entities::{CommentDraft, PostDraft, UserRecord},
    presentation::views::{
        GroupOption, PostFormContext, PostFormTemplate, ViewerView, render_not_found_response,
        render_template_response,
    },
};

use super::{
    identity::login_redirect,
    public::{HttpState, resolve_viewer},
    repo_error_to_http,
};

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub(super) struct PostForm {
    text: String,
    group: String,
}

impl PostForm {
    /// An unparseable or empty group value means "no group"; the repository
    /// rejects ids that do not exist.
    fn group_id(&self) -> Option<Uuid> {
        self.group.parse().ok()
    }

    fn into_draft(self) -> PostDraft {
        let group_id = self.group_id();
        PostDraft {
            text: self.text,
            group_id,
            image: None,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub(super) struct CommentForm {
    text: String,
}

async fn load_group_options(
    state: &HttpState,
    selected: Option<Uuid>,
) -> Result<Vec<GroupOption>, Response> {
    let groups = state
        .feed
        .list_groups()
        .await
        .map_err(|err| crate::application::error::HttpError::from(err).into_response())?;
    Ok(groups
        .iter()
        .map(|g| GroupOption {
            id: g.id,
            title: g.title.clone(),
            selected: Some(g.id) == selected,
        })
        .collect())
}

fn render_post_form(
    viewer: &UserRecord,
    heading: &'static str,
    submit_label: &'static str,
    action: String,
    text: String,
    groups: Vec<GroupOption>,
    error: Option<String>,
) -> Response {
    render_template_response(
        PostFormTemplate {
            viewer: Some(ViewerView::from(viewer)),
            form: PostFormContext {
                heading,
                submit_label,
                action,
                text,
                groups,
                error,
            },
        },
        StatusCode::OK,
    )
}

pub(super) async fn create_form(State(state): State<HttpState>, jar: CookieJar) -> Response {
    let viewer = match resolve_viewer(&state, &jar).await {
        Ok(Some(viewer)) => viewer,
        Ok(None) => return login_redirect("/create"),
        Err(response) => return response,
    };

    let groups = match load_group_options(&state, None).await {
        Ok(groups) => groups,
        Err(response) => return response,
    };

    render_post_form(
        &viewer,
        "New post",
        "Publish",
        "/create".to_string(),
        String::new(),
        groups,
        None,
    )
}

pub(super) async fn create_submit(
    State(state): State<HttpState>,
    jar: CookieJar,
    Form(form): Form<PostForm>,
) -> Response {
    let viewer = match resolve_viewer(&state, &jar).await {
        Ok(Some(viewer)) => viewer,
        Ok(None) => return login_redirect("/create"),
        Err(response) => return response,
    };

    let group_id = form.group_id();
    let text = form.text.clone();
    match state.posts.create_post(viewer.id, form.into_draft()).await {
        Ok(_) => Redirect::to(&format!("/profile/{}", viewer.username)).into_response(),
        Err(PostWriteError::Validation(message)) => {
            let groups = match load_group_options(&state, group_id).await {
                Ok(groups) => groups,
                Err(response) => return response,
            };
            render_post_form(
                &viewer,
                "New post",
                "Publish",
                "/create".to_string(),
                text,
                groups,
                Some(message),
            )
        }
        Err(PostWriteError::NotFound) => render_not_found_response(Some((&viewer).into())),
        Err(PostWriteError::NotAuthor) => render_not_found_response(Some((&viewer).into())),
        Err(PostWriteError::Repo(err)) => {
            repo_error_to_http("infra::http::posts::create_submit", err).into_response()
        }
    }
}

pub(super) async fn edit_form(
    State(state): State<HttpState>,
    jar: CookieJar,
    Path(id): Path<String>,
) -> Response {
    let viewer = match resolve_viewer(&state, &jar).await {
        Ok(Some(viewer)) => viewer,
        Ok(None) => return login_redirect(&format!("/posts/{id}/edit")),
        Err(response) => return response,
    };

    let Ok(post_id) = id.parse::<Uuid>() else {
        return render_not_found_response(Some((&viewer).into()));
    };

    match state.posts.post_for_edit(post_id, viewer.id).await {
        Ok(existing) => {
            let groups = match load_group_options(&state, existing.group_id).await {
                Ok(groups) => groups,
                Err(response) => return response,
            };
            render_post_form(
                &viewer,
                "Edit post",
                "Save",
                format!("/posts/{post_id}/edit"),
                existing.text,
                groups,
                None,
            )
        }
        // Ownership is not disclosed: a non-author lands on the detail
        // page as if nothing happened.
        Err(PostWriteError::NotAuthor) => {
            Redirect::to(&format!("/posts/{post_id}")).into_response()
        }
        Err(PostWriteError::NotFound) => render_not_found_response(Some((&viewer).into())),
        Err(PostWriteError::Validation(message)) => repo_error_to_http(
            "infra::http::posts::edit_form",
            crate::application::repos::RepoError::InvalidInput { message },
        )
        .into_response(),
        Err(PostWriteError::Repo(err)) => {
            repo_error_to_http("infra::http::posts::edit_form", err).into_response()
        }
    }
}

pub(super) async fn edit_submit(
    State(state): State<HttpState>,
    jar: CookieJar,
    Path(id): Path<String>,
    Form(form): Form<PostForm>,
) -> Response {
    let viewer = match resolve_viewer(&state, &jar).await {
        Ok(Some(viewer)) => viewer,
        Ok(None) => return login_redirect(&format!("/posts/{id}/edit")),
        Err(response) => return response,
    };

    let Ok(post_id) = id.parse::<Uuid>() else {
        return render_not_found_response(Some((&viewer).into()));
    };

    let group_id = form.group_id();
    let text = form.text.clone();
    match state
        .posts
        .edit_post(post_id, viewer.id, form.into_draft())
        .await
    {
        Ok(updated) => Redirect::to(&format!("/posts/{}", updated.id)).into_response(),
        Err(PostWriteError::NotAuthor) => {
            Redirect::to(&format!("/posts/{post_id}")).into_response()
        }
        Err(PostWriteError::Validation(message)) => {
            let groups = match load_group_options(&state, group_id).await {
                Ok(groups) => groups,
                Err(response) => return response,
            };
            render_post_form(
                &viewer,
                "Edit post",
                "Save",
                format!("/posts/{post_id}/edit"),
                text,
                groups,
                Some(message),
            )
        }
        Err(PostWriteError::NotFound) => render_not_found_response(Some((&viewer).into())),
        Err(PostWriteError::Repo(err)) => {
            repo_error_to_http("infra::http::posts::edit_submit", err).into_response()
        }
    }
}

pub(super) async fn add_comment(
    State(state): State<HttpState>,
    jar: CookieJar,
    Path(id): Path<String>,
    Form(form): Form<CommentForm>,
) -> Response {
    let viewer = match resolve_viewer(&state, &jar).await {
        Ok(Some(viewer)) => viewer,
        Ok(None) => return login_redirect(&format!("/posts/{id}")),
        Err(response) => return response,
    };

    let Ok(post_id) = id.parse::<Uuid>() else {
        return render_not_found_response(Some((&viewer).into()));
    };

    let draft = CommentDraft { text: form.text };
    match state.comments.add_comment(post_id, viewer.id, draft).await {
        // Invalid text persists nothing; either way the user lands back on
        // the detail page.
        Ok(_) | Err(CommentError::Validation(_)) => {
            Redirect::to(&format!("/posts/{post_id}")).into_response()
        }
        Err(CommentError::PostNotFound) => render_not_found_response(Some((&viewer).into())),
        Err(CommentError::Repo(err)) => {
            repo_error_to_http("infra::http::posts::add_comment", err).into_response()
        }
    }
}
