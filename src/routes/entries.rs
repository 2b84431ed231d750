use askama::Template;
use axum::{
    extract::{DefaultBodyLimit, Multipart, Path, Query},
    response::{Html, IntoResponse, Redirect},
    routing::{delete, get, post},
    Form, Json, Router,
};
use base64::{engine::general_purpose::STANDARD, Engine};
use chrono::Utc;
use serde::Deserialize;
use std::collections::HashMap;

use crate::auth::Curator;
use crate::error::AppError;
use crate::models::entry::DATE_FORMAT;
use crate::models::{Category, Comment, CommentDraft, NewEntry};
use crate::sync::{CategoryFilter, LiveView, SessionContext, ViewMode};
use crate::AppState;

#[derive(Template)]
#[template(path = "timeline.html")]
struct TimelineTemplate {
    heading: String,
    total: usize,
    query: String,
    category: String,
    categories: Vec<CategoryLink>,
    entries: Vec<EntryView>,
    suggestion: Option<String>,
    show_form: bool,
    no_results: bool,
    form: FormValues,
    form_categories: Vec<CategoryOption>,
    errors: HashMap<String, String>,

    user: Option<SessionContext>,
}

pub struct CategoryLink {
    pub label: String,
    pub href: String,
    pub selected: bool,
}

pub struct CategoryOption {
    pub label: String,
    pub selected: bool,
}

pub struct EntryView {
    pub id: String,
    pub text: String,
    pub date: String,
    pub category: String,
    pub image_url: Option<String>,
    pub ai_prompted: bool,
    pub comments: Vec<Comment>,
    pub even: bool,
}

#[derive(Default)]
struct FormValues {
    text: String,
    date: String,
    category: String,
    image_url: String,
}

#[derive(Deserialize)]
pub struct TimelineQuery {
    category: Option<String>,
    q: Option<String>,
}

/// Photos are stored inline, so the form body may be larger than usual.
const ENTRY_BODY_LIMIT: usize = 8 * 1024 * 1024;

/// The new-entry form. It is posted as multipart so a photo can ride along.
#[derive(Default)]
struct EntryForm {
    text: String,
    date: String,
    category: String,
    image_url: String,
    photo: Option<Photo>,
}

struct Photo {
    content_type: String,
    bytes: Vec<u8>,
}

impl Photo {
    fn is_image(&self) -> bool {
        self.content_type.starts_with("image/")
    }

    fn data_url(&self) -> String {
        format!("data:{};base64,{}", self.content_type, STANDARD.encode(&self.bytes))
    }
}

impl EntryForm {
    async fn read(mut multipart: Multipart) -> Result<Self, AppError> {
        let mut form = Self::default();
        while let Some(field) = multipart.next_field().await? {
            let Some(name) = field.name().map(str::to_string) else {
                continue;
            };
            match name.as_str() {
                "text" => form.text = field.text().await?,
                "date" => form.date = field.text().await?,
                "category" => form.category = field.text().await?,
                "image_url" => form.image_url = field.text().await?,
                "photo" => {
                    let content_type = field.content_type().unwrap_or_default().to_string();
                    let bytes = field.bytes().await?;
                    // Browsers send an empty part when no file was picked.
                    if !bytes.is_empty() {
                        form.photo = Some(Photo {
                            content_type,
                            bytes: bytes.to_vec(),
                        });
                    }
                }
                _ => {}
            }
        }
        Ok(form)
    }
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(timeline))
        .route("/view.json", get(view_json))
        .route(
            "/entries",
            post(create_entry).layer(DefaultBodyLimit::max(ENTRY_BODY_LIMIT)),
        )
        .route("/entries/{id}", delete(delete_entry))
        .route("/entries/{id}/comments", post(add_comment))
}

fn category_href(filter: CategoryFilter) -> String {
    let encoded: String = url::form_urlencoded::byte_serialize(filter.label().as_bytes()).collect();
    format!("/?category={encoded}")
}

fn category_links(selected: CategoryFilter) -> Vec<CategoryLink> {
    std::iter::once(CategoryFilter::All)
        .chain(Category::ALL.into_iter().map(CategoryFilter::Only))
        .map(|filter| CategoryLink {
            label: filter.label().to_string(),
            href: category_href(filter),
            selected: filter == selected,
        })
        .collect()
}

fn heading(filter: CategoryFilter) -> String {
    match filter {
        CategoryFilter::All => "Complete Timeline".to_string(),
        CategoryFilter::Only(category) => format!("{category} Collection"),
    }
}

/// Blank form, pre-set to today and to the collection being browsed.
fn blank_form(filter: CategoryFilter) -> FormValues {
    let category = match filter {
        CategoryFilter::All => Category::General,
        CategoryFilter::Only(category) => category,
    };
    FormValues {
        date: Utc::now().format(DATE_FORMAT).to_string(),
        category: category.label().to_string(),
        ..FormValues::default()
    }
}

fn render_timeline(
    user: SessionContext,
    live: LiveView,
    form: FormValues,
    errors: HashMap<String, String>,
) -> Result<Html<String>, AppError> {
    let filter = live.selectors.category;
    let query = live.selectors.query;

    let entries: Vec<EntryView> = live
        .entries
        .into_iter()
        .enumerate()
        .map(|(index, entry)| EntryView {
            id: entry.id,
            text: entry.text,
            date: entry.date,
            category: entry.category.label().to_string(),
            image_url: entry.image_url,
            ai_prompted: entry.ai_prompted,
            comments: entry.comments,
            even: index % 2 == 0,
        })
        .collect();

    let form_categories = Category::ALL
        .into_iter()
        .map(|c| CategoryOption {
            label: c.label().to_string(),
            selected: c.label() == form.category,
        })
        .collect();

    let template = TimelineTemplate {
        heading: heading(filter),
        total: live.total,
        show_form: query.is_empty(),
        no_results: !query.is_empty() && entries.is_empty(),
        query,
        category: filter.label().to_string(),
        categories: category_links(filter),
        entries,
        suggestion: live.suggestion,
        form,
        form_categories,
        errors,

        user: Some(user),
    };
    Ok(Html(template.render()?))
}

async fn timeline(
    Curator { session, view }: Curator,
    Query(params): Query<TimelineQuery>,
) -> Result<impl IntoResponse, AppError> {
    if let Some(category) = params.category {
        let filter: CategoryFilter = category
            .parse()
            .map_err(|e| AppError::BadRequest(format!("{e}")))?;
        view.set_category(filter);
    }
    if let Some(q) = params.q {
        view.set_query(q);
    }
    view.set_mode(ViewMode::Timeline);

    let live = view.view();
    let form = blank_form(live.selectors.category);
    render_timeline(session, live, form, HashMap::new())
}

async fn view_json(Curator { view, .. }: Curator) -> Json<LiveView> {
    Json(view.view())
}

async fn create_entry(
    Curator { session, view }: Curator,
    multipart: Multipart,
) -> Result<impl IntoResponse, AppError> {
    let form = EntryForm::read(multipart).await?;
    let category = form.category.parse::<Category>();

    // An uploaded photo wins over a typed link.
    let image_url = match &form.photo {
        Some(photo) if photo.is_image() => Some(photo.data_url()),
        _ => Some(form.image_url.trim().to_string()).filter(|s| !s.is_empty()),
    };

    let new_entry = NewEntry {
        text: form.text.clone(),
        date: form.date.trim().to_string(),
        category: category.clone().unwrap_or(Category::General),
        image_url,
        ai_prompted: false,
    };

    let mut errors = new_entry.validate();
    if category.is_err() {
        errors.insert("category".to_string(), "Choose a collection".to_string());
    }
    if form.photo.as_ref().is_some_and(|photo| !photo.is_image()) {
        errors.insert("photo".to_string(), "Photo must be an image file".to_string());
    }

    if !errors.is_empty() {
        let values = FormValues {
            text: form.text,
            date: form.date,
            category: form.category,
            image_url: new_entry.image_url.unwrap_or_default(),
        };
        return Ok(render_timeline(session, view.view(), values, errors)?.into_response());
    }

    view.submit_entry(new_entry).await?;
    Ok(Redirect::to("/").into_response())
}

async fn delete_entry(
    Curator { view, .. }: Curator,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    if !view.delete_entry(&id).await? {
        tracing::debug!(entry_id = %id, "delete ignored: not found or not owned");
    }

    // htmx follows HX-Redirect; the body is ignored.
    Ok(([("HX-Redirect", "/")], ""))
}

async fn add_comment(
    Curator { view, .. }: Curator,
    Path(id): Path<String>,
    Form(draft): Form<CommentDraft>,
) -> Result<impl IntoResponse, AppError> {
    view.add_comment(&id, draft).await?;
    Ok(Redirect::to("/"))
}
