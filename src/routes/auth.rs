use askama::Template;
use axum::{
    extract::{Query, State},
    response::{Html, IntoResponse, Redirect},
    routing::{get, post},
    Form, Router,
};
use serde::Deserialize;
use tower_sessions::Session;

use crate::accounts::{self, AuthError};
use crate::auth::{forget, remember, signed_in};
use crate::error::AppError;
use crate::models::User;
use crate::sync::SessionContext;
use crate::AppState;

#[derive(Template)]
#[template(path = "login.html")]
struct LoginTemplate {
    error: Option<String>,
    signup: bool,
    email: String,

    user: Option<SessionContext>,
}

#[derive(Deserialize)]
pub struct LoginQuery {
    mode: Option<String>,
}

#[derive(Deserialize)]
pub struct CredentialsForm {
    email: String,
    password: String,
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/login", get(login_page))
        .route("/login", post(login_submit))
        .route("/signup", post(signup_submit))
        .route("/logout", post(logout))
}

fn render_login(signup: bool, email: String, error: Option<String>) -> Result<Html<String>, AppError> {
    let template = LoginTemplate {
        error,
        signup,
        email,

        user: None,
    };
    Ok(Html(template.render()?))
}

async fn login_page(Query(query): Query<LoginQuery>) -> Result<impl IntoResponse, AppError> {
    let signup = query.mode.as_deref() == Some("signup");
    render_login(signup, String::new(), None)
}

async fn start_session(state: &AppState, session: &Session, user: &User) -> Result<(), AppError> {
    let context = SessionContext::from(user);
    remember(session, &context).await?;
    state.views.open(context).await?;
    tracing::info!(user_id = %user.id, "signed in");
    Ok(())
}

fn log_auth_failure(e: &AuthError) {
    match e {
        AuthError::Other(cause) => tracing::error!("Authentication error: {cause}"),
        other => tracing::info!("Authentication rejected: {other}"),
    }
}

async fn login_submit(
    State(state): State<AppState>,
    session: Session,
    Form(form): Form<CredentialsForm>,
) -> Result<impl IntoResponse, AppError> {
    match accounts::sign_in(&state.db, &form.email, &form.password).await {
        Ok(user) => {
            start_session(&state, &session, &user).await?;
            Ok(Redirect::to("/").into_response())
        }
        Err(e) => {
            log_auth_failure(&e);
            Ok(render_login(false, form.email, Some(e.to_string()))?.into_response())
        }
    }
}

async fn signup_submit(
    State(state): State<AppState>,
    session: Session,
    Form(form): Form<CredentialsForm>,
) -> Result<impl IntoResponse, AppError> {
    match accounts::sign_up(&state.db, &form.email, &form.password).await {
        Ok(user) => {
            start_session(&state, &session, &user).await?;
            Ok(Redirect::to("/").into_response())
        }
        Err(e) => {
            log_auth_failure(&e);
            Ok(render_login(true, form.email, Some(e.to_string()))?.into_response())
        }
    }
}

async fn logout(State(state): State<AppState>, session: Session) -> Result<impl IntoResponse, AppError> {
    if let Some(context) = signed_in(&session).await? {
        state.views.close(&context.user_id).await;
    }
    forget(&session).await?;
    Ok(Redirect::to("/login"))
}
