//! Paged album enumeration exposed as a bounded stream. A producer task
//! prefetches pages while the consumer downloads, so neither side ever
//! buffers a whole library in memory.

use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::remote::client::RemoteClient;
use crate::remote::error::RemoteError;
use crate::remote::types::{Album, RemoteAsset};

/// Upper bound on assets buffered ahead of the consumer.
pub const PREFETCH_LIMIT: usize = 64;

const PROGRESS_EVERY: u64 = 100;

/// The albums to enumerate, in order.
#[derive(Debug, Clone, Default)]
pub struct EnumerationPlan {
    pub albums: Vec<Album>,
}

/// Receiving side of an enumeration. Items arrive in service order within
/// each album; albums follow the plan order.
pub struct AssetStream {
    rx: mpsc::Receiver<Result<RemoteAsset, RemoteError>>,
}

impl futures_util::Stream for AssetStream {
    type Item = Result<RemoteAsset, RemoteError>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.rx.poll_recv(cx)
    }
}

/// Starts enumerating in a background task and returns the consuming end.
/// Malformed records arrive as `Err` items; a failed page fetch yields its
/// error and ends that album, never the whole enumeration.
pub fn enumerate_assets(
    client: Arc<dyn RemoteClient>,
    plan: EnumerationPlan,
    cancel: CancellationToken,
) -> AssetStream {
    let (tx, rx) = mpsc::channel(PREFETCH_LIMIT);
    tokio::spawn(produce(client, plan, cancel, tx));
    AssetStream { rx }
}

async fn produce(
    client: Arc<dyn RemoteClient>,
    plan: EnumerationPlan,
    cancel: CancellationToken,
    tx: mpsc::Sender<Result<RemoteAsset, RemoteError>>,
) {
    let mut produced: u64 = 0;
    for album in &plan.albums {
        let mut cursor: Option<String> = None;
        loop {
            let page = tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    debug!("Enumeration cancelled");
                    return;
                }
                page = client.list_assets_page(album, cursor.as_deref()) => page,
            };
            let page = match page {
                Ok(page) => page,
                Err(e) => {
                    warn!("Failed to list assets for album '{}': {e}", album.name);
                    if tx.send(Err(e)).await.is_err() {
                        return;
                    }
                    break;
                }
            };

            let next = page.next;
            for item in page.items {
                if item.is_ok() {
                    produced += 1;
                    if produced % PROGRESS_EVERY == 0 {
                        info!("Enumerated {produced} assets so far");
                    }
                }
                // A closed receiver means the consumer is gone; stop quietly.
                if tx.send(item).await.is_err() {
                    return;
                }
            }

            match next {
                Some(c) => cursor = Some(c),
                None => break,
            }
        }
    }
    debug!("Enumeration finished with {produced} assets");
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::{HashMap, VecDeque};
    use std::path::Path;
    use std::sync::Mutex;

    use async_trait::async_trait;
    use futures_util::StreamExt;

    use crate::remote::types::{AlbumKind, AssetPage, AuthOutcome};

    fn asset(id: &str) -> RemoteAsset {
        RemoteAsset {
            id: id.to_string(),
            filename: format!("{id}.jpg"),
            album: "All Photos".to_string(),
            download_url: format!("https://cdn.example.test/{id}"),
            size: 100,
            created: None,
            kind: AlbumKind::Personal,
        }
    }

    fn page(ids: &[&str], next: Option<&str>) -> Result<AssetPage, RemoteError> {
        Ok(AssetPage {
            items: ids.iter().map(|id| Ok(asset(id))).collect(),
            next: next.map(str::to_string),
        })
    }

    /// Pops pre-scripted page results per album, ignoring the cursor.
    struct ScriptedClient {
        pages: Mutex<HashMap<String, VecDeque<Result<AssetPage, RemoteError>>>>,
    }

    impl ScriptedClient {
        fn new(scripts: Vec<(&str, Vec<Result<AssetPage, RemoteError>>)>) -> Arc<Self> {
            let pages = scripts
                .into_iter()
                .map(|(name, pages)| (name.to_string(), pages.into()))
                .collect();
            Arc::new(Self {
                pages: Mutex::new(pages),
            })
        }
    }

    #[async_trait]
    impl RemoteClient for ScriptedClient {
        async fn authenticate(&self) -> Result<AuthOutcome, RemoteError> {
            Ok(AuthOutcome::Authenticated)
        }

        async fn requires_second_factor(&self) -> bool {
            false
        }

        async fn submit_second_factor(&self, _code: &str) -> Result<(), RemoteError> {
            Ok(())
        }

        async fn is_authenticated(&self) -> bool {
            true
        }

        async fn list_albums(&self, _kind: AlbumKind) -> Result<Vec<Album>, RemoteError> {
            Ok(Vec::new())
        }

        async fn list_assets_page(
            &self,
            album: &Album,
            _cursor: Option<&str>,
        ) -> Result<AssetPage, RemoteError> {
            let mut pages = self.pages.lock().unwrap();
            pages
                .get_mut(&album.name)
                .and_then(VecDeque::pop_front)
                .unwrap_or_else(|| {
                    Err(RemoteError::Api {
                        code: -1,
                        message: format!("no scripted page for {}", album.name),
                    })
                })
        }

        async fn download_asset(
            &self,
            asset: &RemoteAsset,
            _dest: &Path,
        ) -> Result<u64, RemoteError> {
            Ok(asset.size)
        }
    }

    fn plan(names: &[&str]) -> EnumerationPlan {
        EnumerationPlan {
            albums: names
                .iter()
                .map(|n| Album::new(*n, AlbumKind::Personal))
                .collect(),
        }
    }

    #[tokio::test]
    async fn preserves_order_across_pages() {
        let client = ScriptedClient::new(vec![(
            "All Photos",
            vec![page(&["a1", "a2"], Some("next")), page(&["a3"], None)],
        )]);
        let stream = enumerate_assets(client, plan(&["All Photos"]), CancellationToken::new());

        let ids: Vec<String> = stream
            .map(|item| item.unwrap().id)
            .collect::<Vec<_>>()
            .await;
        assert_eq!(ids, vec!["a1", "a2", "a3"]);
    }

    #[tokio::test]
    async fn per_item_errors_pass_through_without_ending_the_stream() {
        let client = ScriptedClient::new(vec![(
            "All Photos",
            vec![Ok(AssetPage {
                items: vec![
                    Ok(asset("a1")),
                    Err(RemoteError::EnumerationItem {
                        detail: "missing field 'filename' in asset record".to_string(),
                    }),
                    Ok(asset("a2")),
                ],
                next: None,
            })],
        )]);
        let stream = enumerate_assets(client, plan(&["All Photos"]), CancellationToken::new());

        let items: Vec<_> = stream.collect().await;
        assert_eq!(items.len(), 3);
        assert!(items[0].is_ok());
        assert!(items[1].is_err());
        assert!(items[2].is_ok());
    }

    #[tokio::test]
    async fn page_failure_ends_only_that_album() {
        let client = ScriptedClient::new(vec![
            (
                "Broken",
                vec![Err(RemoteError::Status {
                    status: 500,
                    context: "assets".to_string(),
                })],
            ),
            ("Family", vec![page(&["f1", "f2"], None)]),
        ]);
        let stream = enumerate_assets(
            client,
            plan(&["Broken", "Family"]),
            CancellationToken::new(),
        );

        let items: Vec<_> = stream.collect().await;
        assert_eq!(items.len(), 3);
        assert!(items[0].is_err());
        assert_eq!(items[1].as_ref().unwrap().id, "f1");
        assert_eq!(items[2].as_ref().unwrap().id, "f2");
    }

    #[tokio::test]
    async fn cancellation_stops_enumeration() {
        let client = ScriptedClient::new(vec![(
            "All Photos",
            vec![page(&["a1"], Some("next")), page(&["a2"], None)],
        )]);
        let cancel = CancellationToken::new();
        cancel.cancel();
        let stream = enumerate_assets(client, plan(&["All Photos"]), cancel);

        let items: Vec<_> = stream.collect().await;
        assert!(items.is_empty());
    }
}
