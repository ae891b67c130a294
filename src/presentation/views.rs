use askama::{Error as AskamaError, Template};
use axum::{
    http::StatusCode,
    response::{Html, IntoResponse, Response},
};
use thiserror::Error;
use time::OffsetDateTime;
use time::macros::format_description;
use uuid::Uuid;

use crate::application::error::{ErrorReport, HttpError};
use crate::application::pagination::Page;
use crate::domain::entities::{CommentRecord, GroupRecord, PostRecord, UserRecord};

#[derive(Debug, Error)]
#[error("{public_message}")]
pub struct TemplateRenderError {
    pub(crate) source: &'static str,
    pub(crate) public_message: &'static str,
    #[source]
    pub(crate) error: AskamaError,
}

impl TemplateRenderError {
    pub fn new(source: &'static str, public_message: &'static str, error: AskamaError) -> Self {
        Self {
            source,
            public_message,
            error,
        }
    }
}

impl From<TemplateRenderError> for HttpError {
    fn from(err: TemplateRenderError) -> Self {
        let TemplateRenderError {
            source,
            public_message,
            error,
        } = err;

        HttpError::from_error(
            source,
            StatusCode::INTERNAL_SERVER_ERROR,
            public_message,
            &error,
        )
    }
}

pub fn render_template<T: Template>(template: T) -> Result<Html<String>, HttpError> {
    template.render().map(Html).map_err(|err| {
        TemplateRenderError::new(
            "presentation::views::render_template",
            "Template rendering failed",
            err,
        )
        .into()
    })
}

pub fn render_template_response<T: Template>(template: T, status: StatusCode) -> Response {
    match render_template(template) {
        Ok(html) => (status, html).into_response(),
        Err(err) => err.into_response(),
    }
}

pub fn render_not_found_response(viewer: Option<ViewerView>) -> Response {
    let mut response =
        render_template_response(NotFoundTemplate { viewer }, StatusCode::NOT_FOUND);
    ErrorReport::from_message(
        "presentation::views::render_not_found_response",
        StatusCode::NOT_FOUND,
        "Resource not found",
    )
    .attach(&mut response);
    response
}

/// The signed-in user as the page header shows them.
#[derive(Clone)]
pub struct ViewerView {
    pub username: String,
    pub display_name: String,
}

impl From<&UserRecord> for ViewerView {
    fn from(user: &UserRecord) -> Self {
        Self {
            username: user.username.clone(),
            display_name: user.display_name.clone(),
        }
    }
}

#[derive(Clone)]
pub struct PostCard {
    pub id: Uuid,
    pub text: String,
    pub author_username: String,
    pub group_slug: Option<String>,
    pub group_title: Option<String>,
    pub image: Option<String>,
    pub like_count: i64,
    pub iso_date: String,
    pub date_label: String,
}

impl From<&PostRecord> for PostCard {
    fn from(post: &PostRecord) -> Self {
        Self {
            id: post.id,
            text: post.text.clone(),
            author_username: post.author_username.clone(),
            group_slug: post.group_slug.clone(),
            group_title: post.group_title.clone(),
            image: post.image.clone(),
            like_count: post.like_count,
            iso_date: iso_date(post.created_at),
            date_label: date_label(post.created_at),
        }
    }
}

#[derive(Clone)]
pub struct CommentView {
    pub author_username: String,
    pub text: String,
    pub date_label: String,
}

impl From<&CommentRecord> for CommentView {
    fn from(comment: &CommentRecord) -> Self {
        Self {
            author_username: comment.author_username.clone(),
            text: comment.text.clone(),
            date_label: date_label(comment.created_at),
        }
    }
}

#[derive(Clone)]
pub struct GroupView {
    pub slug: String,
    pub title: String,
    pub description: String,
}

impl From<&GroupRecord> for GroupView {
    fn from(group: &GroupRecord) -> Self {
        Self {
            slug: group.slug.clone(),
            title: group.title.clone(),
            description: group.description.clone(),
        }
    }
}

/// Pager links are resolved here so templates only print hrefs.
#[derive(Clone)]
pub struct PagerView {
    pub number: u64,
    pub total_pages: u64,
    pub previous_href: Option<String>,
    pub next_href: Option<String>,
}

impl PagerView {
    pub fn from_page<T>(page: &Page<T>, base_path: &str) -> Self {
        let previous_href = page
            .has_previous()
            .then(|| format!("{base_path}?page={}", page.previous_number()));
        let next_href = page
            .has_next()
            .then(|| format!("{base_path}?page={}", page.next_number()));
        Self {
            number: page.number,
            total_pages: page.total_pages,
            previous_href,
            next_href,
        }
    }
}

pub struct ListingContext {
    pub posts: Vec<PostCard>,
    pub pager: PagerView,
}

impl ListingContext {
    pub fn new(page: &Page<PostRecord>, base_path: &str) -> Self {
        Self {
            posts: page.items.iter().map(PostCard::from).collect(),
            pager: PagerView::from_page(page, base_path),
        }
    }
}

#[derive(Clone)]
pub struct GroupOption {
    pub id: Uuid,
    pub title: String,
    pub selected: bool,
}

pub struct PostFormContext {
    pub heading: &'static str,
    pub submit_label: &'static str,
    pub action: String,
    pub text: String,
    pub groups: Vec<GroupOption>,
    pub error: Option<String>,
}

#[derive(Template)]
#[template(path = "index.html")]
pub struct IndexTemplate {
    pub viewer: Option<ViewerView>,
    pub content: ListingContext,
}

#[derive(Template)]
#[template(path = "group_list.html")]
pub struct GroupTemplate {
    pub viewer: Option<ViewerView>,
    pub group: GroupView,
    pub content: ListingContext,
}

#[derive(Template)]
#[template(path = "profile.html")]
pub struct ProfileTemplate {
    pub viewer: Option<ViewerView>,
    pub author_username: String,
    pub author_display_name: String,
    pub post_count: u64,
    pub viewer_is_following: bool,
    pub viewing_own_profile: bool,
    pub content: ListingContext,
}

#[derive(Template)]
#[template(path = "post_detail.html")]
pub struct PostDetailTemplate {
    pub viewer: Option<ViewerView>,
    pub post: PostCard,
    pub author_post_count: u64,
    pub comments: Vec<CommentView>,
    pub can_edit: bool,
    pub can_comment: bool,
}

#[derive(Template)]
#[template(path = "post_form.html")]
pub struct PostFormTemplate {
    pub viewer: Option<ViewerView>,
    pub form: PostFormContext,
}

#[derive(Template)]
#[template(path = "follow.html")]
pub struct FollowTemplate {
    pub viewer: Option<ViewerView>,
    pub content: ListingContext,
}

#[derive(Template)]
#[template(path = "not_found.html")]
pub struct NotFoundTemplate {
    pub viewer: Option<ViewerView>,
}

fn iso_date(at: OffsetDateTime) -> String {
    at.format(format_description!("[year]-[month]-[day]"))
        .unwrap_or_default()
}

fn date_label(at: OffsetDateTime) -> String {
    at.format(format_description!(
        "[day padding:none] [month repr:short] [year], [hour]:[minute]"
    ))
    .unwrap_or_default()
}
