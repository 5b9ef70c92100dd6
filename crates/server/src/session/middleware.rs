use super::{Session, SessionData, SessionStore};
use crate::AppResources;
use crate::config::SessionConfig;
use axum::{
    extract::{Request, State},
    http::{
        HeaderMap, HeaderValue,
        header::{COOKIE, InvalidHeaderValue, SET_COOKIE},
    },
    middleware::Next,
    response::Response,
};
use time::OffsetDateTime;
use tokio::time::{Duration, interval};

pub const SESSION_COOKIE_NAME: &str = "gatehouse_session";

/// How often expired session rows are pruned.
const CLEANUP_INTERVAL: Duration = Duration::from_secs(600);

/// Load the session for this request, run the handler, persist what changed.
///
/// Database failures while loading fall back to an empty session; failures
/// while saving are logged and the response is still returned.
#[tracing::instrument(skip_all)]
pub async fn manage_session(
    State(resources): State<AppResources>,
    mut request: Request,
    next: Next,
) -> Response {
    let store = SessionStore::new(resources.db.clone(), &resources.config.session);
    let now = OffsetDateTime::now_utc();

    let existing = match extract_session_token(request.headers()) {
        Some(token) => match store.load(&token, now).await {
            Ok(found) => found,
            Err(e) => {
                tracing::error!(error = %e, "Failed to load session");
                None
            }
        },
        None => None,
    };

    let (existing_id, data) = match existing {
        Some(stored) => (Some(stored.id), stored.data),
        None => (None, SessionData::default()),
    };

    let session = Session::new(data);
    request.extensions_mut().insert(session.clone());

    let mut response = next.run(request).await;

    let (data, dirty, renew) = session.snapshot();
    if !dirty {
        return response;
    }

    match existing_id {
        Some(id) if !renew => {
            if let Err(e) = store.update(&id, &data).await {
                tracing::error!(error = %e, "Failed to save session");
            }
        }
        existing_id => {
            if let Some(old_id) = existing_id {
                if let Err(e) = store.delete(&old_id).await {
                    tracing::error!(error = %e, "Failed to delete rotated session");
                }
            }
            match store.create(&data, now).await {
                Ok(token) => match session_cookie(&resources.config.session, &token) {
                    Ok(cookie) => {
                        response.headers_mut().append(SET_COOKIE, cookie);
                    }
                    Err(e) => tracing::error!(error = %e, "Failed to build session cookie"),
                },
                Err(e) => tracing::error!(error = %e, "Failed to create session"),
            }
        }
    }

    response
}

/// Build the `HttpOnly` cookie carrying the session token.
pub(crate) fn session_cookie(
    config: &SessionConfig,
    token: &str,
) -> Result<HeaderValue, InvalidHeaderValue> {
    let mut cookie = format!(
        "{SESSION_COOKIE_NAME}={token}; Path=/; HttpOnly; SameSite=Lax; Max-Age={}",
        config.max_age_secs
    );
    if config.secure_cookie {
        cookie.push_str("; Secure");
    }
    HeaderValue::from_str(&cookie)
}

pub(crate) fn extract_session_token(headers: &HeaderMap) -> Option<String> {
    headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .find_map(|pair| {
            let (key, val) = pair.trim().split_once('=')?;
            (key.trim() == SESSION_COOKIE_NAME && !val.trim().is_empty())
                .then(|| val.trim().to_string())
        })
}

/// Periodically delete expired session rows.
pub fn spawn_cleanup_task(resources: AppResources) {
    let store = SessionStore::new(resources.db.clone(), &resources.config.session);
    tokio::spawn(async move {
        let mut interval = interval(CLEANUP_INTERVAL);
        loop {
            interval.tick().await;
            match store.delete_expired(OffsetDateTime::now_utc()).await {
                Ok(0) => {}
                Ok(count) => tracing::debug!(count, "Pruned expired sessions"),
                Err(e) => tracing::warn!(error = %e, "Session cleanup failed"),
            }
        }
    });
}
