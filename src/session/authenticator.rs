//! Interactive login capture
//!
//! Opens a visible surface on the service home page and waits for the user to
//! log in by hand. The logged-in marker appearing in the DOM is the signal to
//! read the cookie jar and persist it.

use std::time::Duration;
use tokio_util::sync::CancellationToken;

use super::store::{SessionError, SessionStore};
use super::types::Session;
use crate::config::SpiderConfig;
use crate::status::{ErrorKind, StatusChannel};
use crate::surface::{
    NavigableSurface, SurfaceOptions, SurfaceProvider, WaitError, wait_for_selector,
};
use crate::utils::{LOGIN_MARKER_SELECTOR, SELECTOR_POLL_INTERVAL, home_url};

#[derive(Debug, thiserror::Error)]
pub enum AuthFailure {
    #[error("could not open a login window: {0}")]
    SurfaceUnavailable(String),

    #[error("login not completed within {0:?}")]
    LoginTimedOut(Duration),

    /// The login window failed or was closed while waiting
    #[error("login window lost: {0}")]
    SurfaceLost(String),

    #[error("login cancelled")]
    Cancelled,

    #[error("could not read cookies: {0}")]
    CookieRead(String),

    #[error(transparent)]
    Store(#[from] SessionError),
}

/// Capture a session through an interactive login
///
/// Every outcome is also reported on `status`; the login surface is closed
/// before returning.
pub async fn authenticate(
    provider: &dyn SurfaceProvider,
    store: &SessionStore,
    config: &SpiderConfig,
    status: &StatusChannel,
    cancel: &CancellationToken,
) -> Result<Session, AuthFailure> {
    status.info("Waiting for login");

    let surface = match provider
        .open(SurfaceOptions::visible(home_url(config.feed_base_url())))
        .await
    {
        Ok(surface) => surface,
        Err(e) => {
            let failure = AuthFailure::SurfaceUnavailable(format!("{e:#}"));
            status.error(ErrorKind::Auth, "Login failed", failure.to_string());
            return Err(failure);
        }
    };

    let result = capture(surface.as_ref(), store, config, status, cancel).await;

    if let Err(e) = surface.close().await {
        log::debug!("Login surface already gone: {e:#}");
    }

    match &result {
        Ok(_) => {
            status.info("Login succeeded");
        }
        Err(AuthFailure::Cancelled) => {
            status.error(ErrorKind::Cancelled, "Login cancelled", "cancelled by caller");
        }
        Err(failure) => {
            status.error(ErrorKind::Auth, "Login failed", failure.to_string());
        }
    }
    result
}

async fn capture(
    surface: &dyn NavigableSurface,
    store: &SessionStore,
    config: &SpiderConfig,
    status: &StatusChannel,
    cancel: &CancellationToken,
) -> Result<Session, AuthFailure> {
    wait_for_selector(
        surface,
        LOGIN_MARKER_SELECTOR,
        config.login_timeout(),
        SELECTOR_POLL_INTERVAL,
        cancel,
    )
    .await
    .map_err(|e| match e {
        WaitError::TimedOut(after) => AuthFailure::LoginTimedOut(after),
        WaitError::Cancelled => AuthFailure::Cancelled,
        WaitError::Surface(err) => AuthFailure::SurfaceLost(format!("{err:#}")),
    })?;

    status.info("Trying to read and write session");
    let cookies = surface
        .cookies()
        .await
        .map_err(|e| AuthFailure::CookieRead(format!("{e:#}")))?;
    let session = Session::new(cookies);
    store.save(&session).await?;
    status.log(
        "Session written",
        Some(format!("{} cookies", session.len())),
    );
    Ok(session)
}
