use askama::Template;
use axum::{
    response::{Html, IntoResponse, Redirect},
    routing::get,
    Router,
};

use crate::auth::Curator;
use crate::error::AppError;
use crate::sync::{SessionContext, ViewMode};
use crate::AppState;

#[derive(Template)]
#[template(path = "story.html")]
struct StoryTemplate {
    narrative: Option<String>,
    total: usize,

    user: Option<SessionContext>,
}

pub fn router() -> Router<AppState> {
    Router::new().route("/story", get(show_story).post(write_story))
}

async fn show_story(Curator { session, view }: Curator) -> Result<impl IntoResponse, AppError> {
    view.set_mode(ViewMode::Story);

    let live = view.view();
    let template = StoryTemplate {
        narrative: live.narrative,
        total: live.total,

        user: Some(session),
    };
    Ok(Html(template.render()?))
}

/// Generation can take a while; the chapter is kept on the live view and
/// shown by the redirect target.
async fn write_story(Curator { view, .. }: Curator) -> Result<impl IntoResponse, AppError> {
    view.generate_narrative().await?;
    Ok(Redirect::to("/story"))
}
