//! In-memory blacklist and the background sync task that extends it.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::RwLock;
use serde::Deserialize;
use tokio::task::JoinHandle;
use tracing::{info, warn};

use crate::connection::HttpHandle;
use crate::errors::{CapabilityError, Result};
use crate::traits::Blacklist;

/// Blacklist held in process memory.
///
/// Entries are stored lowercase; a lookup matches when any entry is a
/// substring of the lowercased input, so `"steam"` blocks `"Steam - Library"`.
#[derive(Default)]
pub struct MemoryBlacklist {
    apps: RwLock<Vec<String>>,
    urls: RwLock<Vec<String>>,
}

impl MemoryBlacklist {
    /// Create a blacklist seeded with the given entries.
    pub fn with_entries<A, U>(apps: A, urls: U) -> Self
    where
        A: IntoIterator,
        A::Item: AsRef<str>,
        U: IntoIterator,
        U::Item: AsRef<str>,
    {
        let list = Self::default();
        for app in apps {
            let _ = insert(&list.apps, app.as_ref());
        }
        for url in urls {
            let _ = insert(&list.urls, url.as_ref());
        }
        list
    }

    /// Number of listed apps.
    pub fn app_count(&self) -> usize {
        self.apps.read().len()
    }

    /// Number of listed URL fragments.
    pub fn url_count(&self) -> usize {
        self.urls.read().len()
    }
}

fn normalize(value: &str) -> String {
    value.trim().to_lowercase()
}

fn insert(entries: &RwLock<Vec<String>>, value: &str) -> bool {
    let value = normalize(value);
    if value.is_empty() {
        return false;
    }
    let mut entries = entries.write();
    if entries.contains(&value) {
        return false;
    }
    entries.push(value);
    true
}

fn matches(entries: &RwLock<Vec<String>>, input: &str) -> bool {
    let input = normalize(input);
    if input.is_empty() {
        return false;
    }
    entries.read().iter().any(|entry| input.contains(entry.as_str()))
}

#[async_trait]
impl Blacklist for MemoryBlacklist {
    async fn is_app_blocked(&self, app: &str) -> Result<bool> {
        Ok(matches(&self.apps, app))
    }

    async fn is_url_blocked(&self, url: &str) -> Result<bool> {
        Ok(matches(&self.urls, url))
    }

    async fn add_app(&self, app: &str) -> Result<bool> {
        Ok(insert(&self.apps, app))
    }

    async fn add_url(&self, url: &str) -> Result<bool> {
        Ok(insert(&self.urls, url))
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Sync
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct SyncResponse {
    success: bool,
    data: Vec<SyncEntry>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct SyncEntry {
    app_name: String,
}

const SYNC_REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Spawn the blacklist sync task.
///
/// After `delay` the task fetches `{success, data: [{appName}]}` from `url`
/// and adds every app name. The handle resolves to the number of names
/// received or the failure; nothing waits on it for the server to start.
pub fn spawn_blacklist_sync(
    blacklist: Arc<dyn Blacklist>,
    url: String,
    delay: Duration,
) -> JoinHandle<Result<usize>> {
    tokio::spawn(async move {
        tokio::time::sleep(delay).await;
        info!(%url, "fetching external blacklist");

        let result = fetch_and_apply(blacklist.as_ref(), &url).await;
        match &result {
            Ok(count) => info!(count, "synced apps from data service"),
            Err(error) => warn!(%error, "blacklist sync failed"),
        }
        result
    })
}

async fn fetch_and_apply(blacklist: &dyn Blacklist, url: &str) -> Result<usize> {
    let handle = HttpHandle::open(url)?;
    let request = async {
        let response = handle.client().get(url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(CapabilityError::Rejected {
                status: status.as_u16(),
                message: response.text().await.unwrap_or_default(),
            });
        }
        let body: SyncResponse = serde_json::from_slice(&response.bytes().await?)?;
        Ok::<_, CapabilityError>((status.as_u16(), body))
    };
    let (status, body) = tokio::time::timeout(SYNC_REQUEST_TIMEOUT, request)
        .await
        .map_err(|_| CapabilityError::timeout(SYNC_REQUEST_TIMEOUT))??;

    if !body.success {
        return Err(CapabilityError::Rejected {
            status,
            message: "data service reported failure".to_string(),
        });
    }

    let mut count = 0;
    for entry in body.data {
        if entry.app_name.trim().is_empty() {
            continue;
        }
        let _ = blacklist.add_app(&entry.app_name).await?;
        count += 1;
    }
    Ok(count)
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn case_insensitive_substring_match() {
        let list = MemoryBlacklist::with_entries(["Steam"], ["youtube.com"]);
        assert!(list.is_app_blocked("STEAM - Library").await.unwrap());
        assert!(!list.is_app_blocked("Visual Studio Code").await.unwrap());
        assert!(list.is_url_blocked("https://www.YouTube.com/watch?v=1").await.unwrap());
        assert!(!list.is_url_blocked("https://docs.rs").await.unwrap());
    }

    #[tokio::test]
    async fn empty_input_never_blocked() {
        let list = MemoryBlacklist::with_entries(["steam"], ["youtube.com"]);
        assert!(!list.is_app_blocked("").await.unwrap());
        assert!(!list.is_url_blocked("   ").await.unwrap());
    }

    #[tokio::test]
    async fn add_is_idempotent() {
        let list = MemoryBlacklist::default();
        assert!(list.add_app("Minecraft").await.unwrap());
        assert!(!list.add_app("minecraft").await.unwrap());
        assert!(!list.add_app("  ").await.unwrap());
        assert_eq!(list.app_count(), 1);
        assert!(list.add_url("twitch.tv").await.unwrap());
        assert_eq!(list.url_count(), 1);
    }

    #[tokio::test]
    async fn sync_adds_apps() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/v1/blacklist"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "success": true,
                "data": [{"appName": "Minecraft"}, {"appName": "Roblox"}, {"appName": ""}]
            })))
            .mount(&server)
            .await;

        let list = Arc::new(MemoryBlacklist::default());
        let handle = spawn_blacklist_sync(
            list.clone(),
            format!("{}/api/v1/blacklist", server.uri()),
            Duration::ZERO,
        );
        let count = handle.await.unwrap().unwrap();
        assert_eq!(count, 2);
        assert!(list.is_app_blocked("Roblox Player").await.unwrap());
    }

    #[tokio::test]
    async fn sync_failure_flag_is_rejected() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"success": false})))
            .mount(&server)
            .await;

        let list = Arc::new(MemoryBlacklist::default());
        let handle = spawn_blacklist_sync(list.clone(), server.uri(), Duration::ZERO);
        let err = handle.await.unwrap().unwrap_err();
        assert_matches!(err, CapabilityError::Rejected { status: 200, .. });
        assert_eq!(list.app_count(), 0);
    }

    #[tokio::test]
    async fn sync_invalid_url_is_connect_error() {
        let list = Arc::new(MemoryBlacklist::default());
        let handle = spawn_blacklist_sync(list, "::not a url".into(), Duration::ZERO);
        assert_matches!(handle.await.unwrap(), Err(CapabilityError::Connect { .. }));
    }
}
