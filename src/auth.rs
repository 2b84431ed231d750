//! Sign-in state lives in the session as a [`SessionContext`]; protected
//! handlers take a [`Curator`], which also hands them the live view.

use axum::{extract::FromRequestParts, http::request::Parts};
use std::sync::Arc;
use tower_sessions::session::Error as SessionError;
use tower_sessions::Session;

use crate::error::AppError;
use crate::sync::{SessionContext, Synchronizer};
use crate::AppState;

const SESSION_KEY: &str = "curator";

/// A signed-in request: who is asking and the live view bound to them.
pub struct Curator {
    pub session: SessionContext,
    pub view: Arc<Synchronizer>,
}

impl FromRequestParts<AppState> for Curator {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let session = Session::from_request_parts(parts, state)
            .await
            .map_err(|_| AppError::SignInRequired)?;

        let context = signed_in(&session)
            .await
            .ok()
            .flatten()
            .ok_or(AppError::SignInRequired)?;

        // The registry is in memory; a cookie can outlive it across restarts.
        let view = state.views.open(context.clone()).await?;
        Ok(Self {
            session: context,
            view,
        })
    }
}

pub async fn signed_in(session: &Session) -> Result<Option<SessionContext>, SessionError> {
    session.get(SESSION_KEY).await
}

pub async fn remember(session: &Session, context: &SessionContext) -> Result<(), SessionError> {
    session.insert(SESSION_KEY, context).await
}

/// Drop everything in the session, cookie included.
pub async fn forget(session: &Session) -> Result<(), SessionError> {
    session.flush().await
}
