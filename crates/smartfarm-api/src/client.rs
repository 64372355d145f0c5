// Async HTTP client for the SmartFarm REST API.
//
// Base path: configurable, default `http://localhost:8000/api/`
// Auth: `Authorization: Bearer <access>`; one refresh + retry on 401.

use std::sync::Arc;

use bytes::Bytes;
use reqwest::StatusCode;
use secrecy::{ExposeSecret, SecretString};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tokio::sync::Mutex;
use tracing::{debug, warn};
use url::Url;

use crate::error::{Error, FieldErrors};
use crate::session::Session;
use crate::transport::TransportConfig;

const REFRESH_PATH: &str = "auth/token/refresh/";

// ── Error response shape ─────────────────────────────────────────────

#[derive(serde::Deserialize)]
struct ErrorResponse {
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    detail: Option<String>,
    #[serde(default)]
    errors: Option<FieldErrors>,
}

#[derive(serde::Deserialize)]
struct RefreshResponse {
    access: String,
    #[serde(default)]
    refresh: Option<String>,
}

// ── Client ───────────────────────────────────────────────────────────

/// Async client for the SmartFarm REST API.
///
/// Cheap to clone: the HTTP pool, session and refresh lock are shared.
#[derive(Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    base_url: Url,
    session: Session,
    refresh_lock: Arc<Mutex<()>>,
    timeout_secs: u64,
}

impl ApiClient {
    // ── Constructors ─────────────────────────────────────────────────

    /// Build a client for `base_url` sharing `session` with the caller.
    pub fn new(base_url: &str, session: Session, transport: &TransportConfig) -> Result<Self, Error> {
        let http = transport.build_client()?;
        Ok(Self {
            http,
            base_url: normalize_base_url(base_url)?,
            session,
            refresh_lock: Arc::new(Mutex::new(())),
            timeout_secs: transport.timeout.as_secs(),
        })
    }

    /// Wrap an existing `reqwest::Client`.
    pub fn from_reqwest(base_url: &str, http: reqwest::Client, session: Session) -> Result<Self, Error> {
        Ok(Self {
            http,
            base_url: normalize_base_url(base_url)?,
            session,
            refresh_lock: Arc::new(Mutex::new(())),
            timeout_secs: 30,
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    // ── URL builder ──────────────────────────────────────────────────

    /// Join a relative path (e.g. `"farmers/42"`) onto the base URL.
    pub fn url(&self, path: &str) -> Result<Url, Error> {
        Ok(self.base_url.join(path.trim_start_matches('/'))?)
    }

    // ── HTTP verbs ───────────────────────────────────────────────────

    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, Error> {
        debug!("GET {path}");
        let resp = self.execute(path, |http, url| http.get(url)).await?;
        handle_response(resp).await
    }

    pub async fn get_with_params<T, P>(&self, path: &str, params: &P) -> Result<T, Error>
    where
        T: DeserializeOwned,
        P: Serialize + ?Sized,
    {
        debug!("GET {path} params={}", serde_json::to_string(params).unwrap_or_default());
        let resp = self
            .execute(path, |http, url| http.get(url).query(params))
            .await?;
        handle_response(resp).await
    }

    /// GET returning the raw body (report downloads).
    pub async fn get_bytes(&self, path: &str) -> Result<Bytes, Error> {
        debug!("GET {path} (binary)");
        let resp = self.execute(path, |http, url| http.get(url)).await?;
        let status = resp.status();
        if status.is_success() {
            Ok(resp.bytes().await?)
        } else {
            Err(parse_error(status, resp).await)
        }
    }

    pub async fn post<T, B>(&self, path: &str, body: &B) -> Result<T, Error>
    where
        T: DeserializeOwned,
        B: Serialize + Sync + ?Sized,
    {
        debug!("POST {path}");
        let resp = self
            .execute(path, |http, url| http.post(url).json(body))
            .await?;
        handle_response(resp).await
    }

    pub async fn post_no_response<B>(&self, path: &str, body: &B) -> Result<(), Error>
    where
        B: Serialize + Sync + ?Sized,
    {
        debug!("POST {path}");
        let resp = self
            .execute(path, |http, url| http.post(url).json(body))
            .await?;
        handle_empty(resp).await
    }

    pub async fn put<T, B>(&self, path: &str, body: &B) -> Result<T, Error>
    where
        T: DeserializeOwned,
        B: Serialize + Sync + ?Sized,
    {
        debug!("PUT {path}");
        let resp = self
            .execute(path, |http, url| http.put(url).json(body))
            .await?;
        handle_response(resp).await
    }

    pub async fn patch<T, B>(&self, path: &str, body: &B) -> Result<T, Error>
    where
        T: DeserializeOwned,
        B: Serialize + Sync + ?Sized,
    {
        debug!("PATCH {path}");
        let resp = self
            .execute(path, |http, url| http.patch(url).json(body))
            .await?;
        handle_response(resp).await
    }

    /// PATCH with no request body and no response payload.
    pub async fn patch_empty(&self, path: &str) -> Result<(), Error> {
        debug!("PATCH {path}");
        let resp = self.execute(path, |http, url| http.patch(url)).await?;
        handle_empty(resp).await
    }

    pub async fn delete(&self, path: &str) -> Result<(), Error> {
        debug!("DELETE {path}");
        let resp = self.execute(path, |http, url| http.delete(url)).await?;
        handle_empty(resp).await
    }

    // ── Request execution ────────────────────────────────────────────

    /// Send a request built by `build`, refreshing the session and
    /// retrying once if the backend answers 401. Without a refresh token
    /// the 401 response is returned as is.
    async fn execute<F>(&self, path: &str, build: F) -> Result<reqwest::Response, Error>
    where
        F: Fn(&reqwest::Client, Url) -> reqwest::RequestBuilder,
    {
        let url = self.url(path)?;
        let sent_with = self.session.bearer();
        let resp = self.send(build(&self.http, url.clone())).await?;

        if resp.status() != StatusCode::UNAUTHORIZED || is_auth_path(path) {
            return Ok(resp);
        }

        // Nothing to refresh with and no concurrent refresh landed: the
        // 401 is the answer.
        if self.session.refresh_token().is_none() && self.session.bearer() == sent_with {
            debug!("{url} answered 401 and there is no refresh token");
            return Ok(resp);
        }

        self.refresh_after_401(sent_with.as_deref()).await?;
        debug!("retrying {url} with refreshed token");

        let retried = self.send(build(&self.http, url)).await?;
        if retried.status() == StatusCode::UNAUTHORIZED {
            self.session.clear();
            return Err(Error::SessionExpired);
        }
        Ok(retried)
    }

    async fn send(&self, request: reqwest::RequestBuilder) -> Result<reqwest::Response, Error> {
        let request = match self.session.bearer() {
            Some(bearer) => request.header(reqwest::header::AUTHORIZATION, bearer),
            None => request,
        };
        request.send().await.map_err(|e| {
            if e.is_timeout() {
                Error::Timeout {
                    timeout_secs: self.timeout_secs,
                }
            } else {
                Error::Transport(e)
            }
        })
    }

    /// Refresh the access token once. Concurrent 401s wait on the same
    /// lock; whoever arrives after a successful refresh just retries.
    async fn refresh_after_401(&self, sent_with: Option<&str>) -> Result<(), Error> {
        let _guard = self.refresh_lock.lock().await;

        let current = self.session.bearer();
        if current.is_some() && current.as_deref() != sent_with {
            return Ok(());
        }

        match self.refresh_token().await {
            Ok(()) => Ok(()),
            Err(e) => {
                warn!(error = %e, "token refresh failed, clearing session");
                self.session.clear();
                Err(Error::SessionExpired)
            }
        }
    }

    /// POST the refresh token and store the new access token.
    pub async fn refresh_token(&self) -> Result<(), Error> {
        let refresh = self.session.refresh_token().ok_or(Error::SessionExpired)?;
        let url = self.url(REFRESH_PATH)?;
        debug!("POST {url}");

        let body = serde_json::json!({ "refresh": refresh.expose_secret() });
        let resp = self.http.post(url).json(&body).send().await?;
        let tokens: RefreshResponse = handle_response(resp).await?;

        match tokens.refresh {
            Some(rotated) => self.session.set(crate::TokenPair::new(tokens.access, Some(rotated))),
            None => self.session.set_access(SecretString::from(tokens.access)),
        }
        debug!("access token refreshed");
        Ok(())
    }
}

// ── Response handling ────────────────────────────────────────────────

async fn handle_response<T: DeserializeOwned>(resp: reqwest::Response) -> Result<T, Error> {
    let status = resp.status();
    if status.is_success() {
        let body = resp.text().await?;
        serde_json::from_str(&body).map_err(|e| {
            let preview: String = body.chars().take(200).collect();
            Error::Deserialization {
                message: format!("{e} (body preview: {preview:?})"),
                body,
            }
        })
    } else {
        Err(parse_error(status, resp).await)
    }
}

async fn handle_empty(resp: reqwest::Response) -> Result<(), Error> {
    let status = resp.status();
    if status.is_success() {
        Ok(())
    } else {
        Err(parse_error(status, resp).await)
    }
}

async fn parse_error(status: StatusCode, resp: reqwest::Response) -> Error {
    let raw = resp.text().await.unwrap_or_default();
    error_from_body(status, &raw)
}

fn error_from_body(status: StatusCode, raw: &str) -> Error {
    if let Ok(err) = serde_json::from_str::<ErrorResponse>(raw) {
        Error::Api {
            status: status.as_u16(),
            message: err.message.or(err.detail).unwrap_or_default(),
            errors: err.errors,
        }
    } else {
        Error::Api {
            status: status.as_u16(),
            message: raw.trim().to_owned(),
            errors: None,
        }
    }
}

// ── Helpers ──────────────────────────────────────────────────────────

/// Ensure the base URL ends with `/` so relative joins keep the `/api` prefix.
fn normalize_base_url(raw: &str) -> Result<Url, Error> {
    let mut url = Url::parse(raw)?;
    let path = url.path().trim_end_matches('/').to_owned();
    url.set_path(&format!("{path}/"));
    Ok(url)
}

/// Token endpoints answer 401 for bad credentials; never refresh on those.
fn is_auth_path(path: &str) -> bool {
    let path = path.trim_start_matches('/');
    path.starts_with("auth/token") || path.starts_with("auth/register")
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn base_url_gets_trailing_slash() {
        let url = normalize_base_url("http://localhost:8000/api").unwrap();
        assert_eq!(url.as_str(), "http://localhost:8000/api/");
        assert_eq!(
            url.join("farmers/7").unwrap().as_str(),
            "http://localhost:8000/api/farmers/7"
        );
    }

    #[test]
    fn error_body_prefers_message_then_detail() {
        let err = error_from_body(
            StatusCode::BAD_REQUEST,
            r#"{"message":"Validation failed","errors":{"email":["is taken"]}}"#,
        );
        assert_eq!(err.server_message(), Some("Validation failed"));
        assert_eq!(err.field_errors().unwrap()["email"], vec!["is taken".to_owned()]);

        let err = error_from_body(StatusCode::FORBIDDEN, r#"{"detail":"Not allowed"}"#);
        assert_eq!(err.server_message(), Some("Not allowed"));
    }

    #[test]
    fn non_json_error_body_is_kept_verbatim() {
        let err = error_from_body(StatusCode::BAD_GATEWAY, "upstream down\n");
        assert_eq!(err.status(), Some(502));
        assert_eq!(err.server_message(), Some("upstream down"));
    }

    #[test]
    fn auth_paths_skip_refresh() {
        assert!(is_auth_path("auth/token/"));
        assert!(is_auth_path("/auth/token/refresh/"));
        assert!(!is_auth_path("auth/me/"));
        assert!(!is_auth_path("farmers"));
    }
}
