use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use futures_util::StreamExt;
use reqwest::header::{HeaderMap, HeaderValue, ORIGIN, USER_AGENT};
use reqwest::Client;
use serde::Deserialize;
use serde_json::{json, Value};
use tokio::io::AsyncWriteExt;
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::remote::error::RemoteError;
use crate::remote::types::{Album, AlbumKind, AssetPage, AuthOutcome, RemoteAsset};
use crate::retry::{retry_with_backoff, RetryAction, RetryPolicy};

const SETUP_ENDPOINT: &str = "https://setup.icloud.com/setup/ws/1";
const HOME_ENDPOINT: &str = "https://www.icloud.com";

const DEFAULT_USER_AGENT: &str =
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/138.0.0.0 Safari/537.36";

const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);
/// Per-request ceiling for JSON endpoints. Downloads use the client-wide
/// timeout instead, sized for large originals on slow links.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
const DOWNLOAD_TIMEOUT: Duration = Duration::from_secs(300);

/// Everything the sync engine needs from the photo service. One shared
/// session backs every call; implementations must tolerate concurrent use.
#[async_trait]
pub trait RemoteClient: Send + Sync {
    async fn authenticate(&self) -> Result<AuthOutcome, RemoteError>;

    async fn requires_second_factor(&self) -> bool;

    async fn submit_second_factor(&self, code: &str) -> Result<(), RemoteError>;

    /// True only while a session exists and the photo listing answers.
    async fn is_authenticated(&self) -> bool;

    async fn list_albums(&self, kind: AlbumKind) -> Result<Vec<Album>, RemoteError>;

    async fn list_assets_page(
        &self,
        album: &Album,
        cursor: Option<&str>,
    ) -> Result<AssetPage, RemoteError>;

    /// Downloads one asset to `dest`, returning the number of bytes written.
    async fn download_asset(&self, asset: &RemoteAsset, dest: &Path) -> Result<u64, RemoteError>;
}

#[derive(Debug, Default)]
struct SessionState {
    photos_url: Option<String>,
    requires_second_factor: bool,
    authenticated: bool,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LoginResponse {
    #[serde(default)]
    hsa_challenge_required: bool,
    #[serde(default)]
    webservices: HashMap<String, ServiceEndpoint>,
}

#[derive(Debug, Deserialize)]
struct ServiceEndpoint {
    url: String,
}

/// HTTP client for the photo service. Holds one cookie-backed session for
/// the whole process; authentication state lives behind an `RwLock` so
/// concurrent downloads can share it.
pub struct HttpRemoteClient {
    client: Client,
    username: String,
    password: String,
    state: tokio::sync::RwLock<SessionState>,
}

impl fmt::Debug for HttpRemoteClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HttpRemoteClient")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish_non_exhaustive()
    }
}

impl HttpRemoteClient {
    pub fn new(config: &Config) -> Result<Self, RemoteError> {
        let mut headers = HeaderMap::new();
        headers.insert(ORIGIN, HeaderValue::from_static(HOME_ENDPOINT));
        headers.insert(USER_AGENT, HeaderValue::from_static(DEFAULT_USER_AGENT));

        let client = Client::builder()
            .cookie_store(true)
            .default_headers(headers)
            .connect_timeout(CONNECT_TIMEOUT)
            .timeout(DOWNLOAD_TIMEOUT)
            .build()?;

        Ok(Self {
            client,
            username: config.icloud_username.clone(),
            password: config.icloud_password.clone(),
            state: tokio::sync::RwLock::new(SessionState::default()),
        })
    }

    async fn photos_url(&self) -> Result<String, RemoteError> {
        let state = self.state.read().await;
        state
            .photos_url
            .clone()
            .ok_or(RemoteError::NotAuthenticated)
    }

    /// Cheap reachability check against the album listing.
    async fn probe_photos(&self, base: &str) -> Result<(), RemoteError> {
        let url = format!("{base}/albums");
        let response = self
            .client
            .get(&url)
            .timeout(REQUEST_TIMEOUT)
            .query(&[("kind", AlbumKind::Personal.as_str())])
            .send()
            .await?;
        let status = response.status();
        if !status.is_success() {
            return Err(RemoteError::Status {
                status: status.as_u16(),
                context: "albums probe".to_string(),
            });
        }
        Ok(())
    }

    async fn attempt_download(
        &self,
        asset: &RemoteAsset,
        dest: &Path,
    ) -> Result<u64, RemoteError> {
        let part = part_path(dest);
        // A stale partial from an interrupted run is overwritten below.
        let _ = tokio::fs::remove_file(&part).await;

        let response = self.client.get(&asset.download_url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(RemoteError::Status {
                status: status.as_u16(),
                context: format!("download of {}", asset.filename),
            });
        }

        let mut file = tokio::fs::File::create(&part).await?;
        let mut stream = response.bytes_stream();
        let mut written: u64 = 0;
        while let Some(chunk) = stream.next().await {
            let chunk = chunk?;
            file.write_all(&chunk).await?;
            written += chunk.len() as u64;
        }
        file.flush().await?;
        drop(file);

        // Only a fully-written file ever lands at the final path.
        tokio::fs::rename(&part, dest).await?;
        Ok(written)
    }
}

#[async_trait]
impl RemoteClient for HttpRemoteClient {
    async fn authenticate(&self) -> Result<AuthOutcome, RemoteError> {
        let url = format!("{SETUP_ENDPOINT}/accountLogin");
        let response = self
            .client
            .post(&url)
            .timeout(REQUEST_TIMEOUT)
            .json(&json!({
                "appleId": self.username,
                "password": self.password,
                "extended_login": true,
            }))
            .send()
            .await?;

        let status = response.status();
        if status == reqwest::StatusCode::UNAUTHORIZED || status == reqwest::StatusCode::FORBIDDEN
        {
            let detail = error_reason(response).await;
            return Err(RemoteError::AuthenticationFailed { detail });
        }
        // 409 is how the service answers a valid login that still needs a
        // second factor; the body carries the challenge flag.
        if !status.is_success() && status.as_u16() != 409 {
            return Err(RemoteError::Status {
                status: status.as_u16(),
                context: "accountLogin".to_string(),
            });
        }

        let login: LoginResponse = response.json().await?;
        if login.hsa_challenge_required || status.as_u16() == 409 {
            let mut state = self.state.write().await;
            state.requires_second_factor = true;
            state.authenticated = false;
            info!("Two-factor authentication required");
            return Ok(AuthOutcome::SecondFactorRequired);
        }

        let photos_url = login
            .webservices
            .get("ckdatabasews")
            .map(|service| service.url.clone())
            .ok_or_else(|| RemoteError::AuthenticationFailed {
                detail: "login response carried no photo service url".to_string(),
            })?;

        // Login is only trusted once the photo listing actually answers.
        if let Err(e) = self.probe_photos(&photos_url).await {
            return Err(RemoteError::AuthenticationFailed {
                detail: format!("photo service unreachable after login: {e}"),
            });
        }

        let mut state = self.state.write().await;
        state.photos_url = Some(photos_url);
        state.requires_second_factor = false;
        state.authenticated = true;
        info!("Authenticated with the photo service");
        Ok(AuthOutcome::Authenticated)
    }

    async fn requires_second_factor(&self) -> bool {
        self.state.read().await.requires_second_factor
    }

    async fn submit_second_factor(&self, code: &str) -> Result<(), RemoteError> {
        let url = format!("{SETUP_ENDPOINT}/validateVerificationCode");
        let response = self
            .client
            .post(&url)
            .timeout(REQUEST_TIMEOUT)
            .json(&json!({"securityCode": {"code": code}}))
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(RemoteError::SecondFactorRejected);
        }
        {
            let mut state = self.state.write().await;
            state.requires_second_factor = false;
        }

        // The trusted session only takes effect on a fresh login.
        match self.authenticate().await? {
            AuthOutcome::Authenticated => {
                info!("Second factor accepted");
                Ok(())
            }
            AuthOutcome::SecondFactorRequired => Err(RemoteError::SecondFactorRejected),
        }
    }

    async fn is_authenticated(&self) -> bool {
        let base = {
            let state = self.state.read().await;
            if !state.authenticated {
                return false;
            }
            match &state.photos_url {
                Some(url) => url.clone(),
                None => return false,
            }
        };
        // Re-checked on every call to catch mid-run session expiry.
        self.probe_photos(&base).await.is_ok()
    }

    async fn list_albums(&self, kind: AlbumKind) -> Result<Vec<Album>, RemoteError> {
        let base = self.photos_url().await?;
        let url = format!("{base}/albums");
        let response = self
            .client
            .get(&url)
            .timeout(REQUEST_TIMEOUT)
            .query(&[("kind", kind.as_str())])
            .send()
            .await?;
        let body = check_json(response, "albums").await?;

        let mut albums = Vec::new();
        if let Some(records) = body.get("albums").and_then(Value::as_array) {
            for record in records {
                match record.get("name").and_then(Value::as_str) {
                    Some(name) => albums.push(Album::new(name, kind)),
                    None => warn!("Skipping album record without a name"),
                }
            }
        }
        debug!("Listed {} {} albums", albums.len(), kind.as_str());
        Ok(albums)
    }

    async fn list_assets_page(
        &self,
        album: &Album,
        cursor: Option<&str>,
    ) -> Result<AssetPage, RemoteError> {
        let base = self.photos_url().await?;
        let url = format!("{base}/assets");
        let mut query = vec![
            ("album", album.name.as_str()),
            ("kind", album.kind.as_str()),
        ];
        if let Some(cursor) = cursor {
            query.push(("cursor", cursor));
        }
        let response = self
            .client
            .get(&url)
            .timeout(REQUEST_TIMEOUT)
            .query(&query)
            .send()
            .await?;
        let body = check_json(response, "assets").await?;

        let mut page = AssetPage::default();
        if let Some(records) = body.get("assets").and_then(Value::as_array) {
            for record in records {
                page.items.push(parse_asset(record, album));
            }
        }
        page.next = body
            .get("nextCursor")
            .and_then(Value::as_str)
            .map(str::to_string);
        Ok(page)
    }

    async fn download_asset(&self, asset: &RemoteAsset, dest: &Path) -> Result<u64, RemoteError> {
        retry_with_backoff(
            RetryPolicy::default(),
            "download",
            || self.attempt_download(asset, dest),
            |e: &RemoteError| {
                if e.is_retryable() {
                    RetryAction::Retry
                } else {
                    RetryAction::Abort
                }
            },
        )
        .await
        .map_err(|e| match e {
            already @ RemoteError::DownloadFailed { .. } => already,
            other => RemoteError::DownloadFailed {
                filename: asset.filename.clone(),
                detail: other.to_string(),
            },
        })
    }
}

/// Validates an HTTP response and surfaces service-level errors carried in
/// an otherwise successful JSON body.
async fn check_json(response: reqwest::Response, context: &str) -> Result<Value, RemoteError> {
    let status = response.status();
    if !status.is_success() {
        return Err(RemoteError::Status {
            status: status.as_u16(),
            context: context.to_string(),
        });
    }
    let body: Value = response.json().await?;
    if let Some(code) = body.get("errorCode").and_then(Value::as_i64) {
        let message = body
            .get("errorMessage")
            .and_then(Value::as_str)
            .unwrap_or("unknown error")
            .to_string();
        return Err(RemoteError::Api { code, message });
    }
    Ok(body)
}

async fn error_reason(response: reqwest::Response) -> String {
    let status = response.status();
    match response.json::<Value>().await {
        Ok(body) => body
            .get("serviceErrors")
            .and_then(Value::as_array)
            .and_then(|errors| errors.first())
            .and_then(|e| e.get("message"))
            .and_then(Value::as_str)
            .map(str::to_string)
            .unwrap_or_else(|| format!("status {status}")),
        Err(_) => format!("status {status}"),
    }
}

fn parse_asset(record: &Value, album: &Album) -> Result<RemoteAsset, RemoteError> {
    let id = string_field(record, "id")?;
    let filename = string_field(record, "filename")?;
    let download_url = string_field(record, "downloadUrl")?;
    let size = record
        .get("size")
        .and_then(Value::as_u64)
        .ok_or_else(|| RemoteError::EnumerationItem {
            detail: format!("missing field 'size' in asset record {id}"),
        })?;
    let created = record
        .get("createdAt")
        .and_then(Value::as_i64)
        .and_then(|ms| Utc.timestamp_millis_opt(ms).single());

    Ok(RemoteAsset {
        id,
        filename,
        album: album.name.clone(),
        download_url,
        size,
        created,
        kind: album.kind,
    })
}

fn string_field(record: &Value, key: &str) -> Result<String, RemoteError> {
    record
        .get(key)
        .and_then(Value::as_str)
        .map(str::to_string)
        .ok_or_else(|| RemoteError::EnumerationItem {
            detail: format!("missing field '{key}' in asset record"),
        })
}

fn part_path(dest: &Path) -> PathBuf {
    match dest.file_name() {
        Some(name) => {
            let mut part = name.to_os_string();
            part.push(".part");
            dest.with_file_name(part)
        }
        None => dest.with_extension("part"),
    }
}
