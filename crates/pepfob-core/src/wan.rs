// ── WAN status model ──
//
// Fetches WAN connection status through the session chokepoint, turns it
// into ordered `WanLink`s and merges per-WAN traffic counters into them.
// The current list is published on a `watch` channel so the menu can
// build pages from a snapshot without touching the network.

use std::sync::Arc;

use pepfob_api::models::{TrafficResponse, WanConnectionStatus};
use pepfob_api::{Method, decode, paths, wan_query};
use tokio::sync::{Mutex, watch};
use tracing::{debug, warn};

use crate::convert::wan_links;
use crate::error::CoreError;
use crate::model::{WanLink, order_by_priority};
use crate::session::SessionManager;

pub struct WanStatusModel {
    session: Arc<SessionManager>,
    links: watch::Sender<Arc<Vec<WanLink>>>,
    /// Serializes refresh and merge so a merge never lands on a list that
    /// a concurrent refresh is about to replace.
    busy: Mutex<()>,
}

impl WanStatusModel {
    pub fn new(session: Arc<SessionManager>) -> Self {
        let (links, _) = watch::channel(Arc::new(Vec::new()));
        Self {
            session,
            links,
            busy: Mutex::new(()),
        }
    }

    /// Current links.
    pub fn links(&self) -> Arc<Vec<WanLink>> {
        self.links.borrow().clone()
    }

    /// Subscribe to list replacements.
    pub fn subscribe(&self) -> watch::Receiver<Arc<Vec<WanLink>>> {
        self.links.subscribe()
    }

    /// Fetch and re-derive the WAN list, then merge traffic into it.
    ///
    /// `filter` scopes the fetch to one WAN id (`Some(0)` means all). An
    /// unfiltered fetch replaces the published list and clears it on
    /// failure so nothing stale is displayed. A filtered fetch only
    /// replaces that one link and returns just it; the rest of the list
    /// stays as the last full fetch left it.
    pub async fn refresh(&self, filter: Option<u8>) -> Result<Vec<WanLink>, CoreError> {
        let filter = normalize(filter);
        let _busy = self.busy.lock().await;

        let fetched = self
            .session
            .send_authenticated(
                Method::GET,
                paths::WAN_CONNECTION,
                &wan_query(filter.unwrap_or(0)),
                None,
            )
            .await
            .and_then(|payload| decode::<WanConnectionStatus>(payload).map_err(CoreError::from));

        let status = match fetched {
            Ok(status) => status,
            Err(e) => {
                if filter.is_none() {
                    self.links.send_replace(Arc::new(Vec::new()));
                }
                return Err(e);
            }
        };

        let fresh = wan_links(&status);
        debug!(count = fresh.len(), ?filter, "WAN list refreshed");
        match filter {
            None => {
                self.links.send_replace(Arc::new(fresh));
            }
            Some(id) => {
                self.links.send_modify(|links| splice(Arc::make_mut(links), id, fresh));
            }
        }

        if let Err(e) = self.merge_locked(filter).await {
            warn!(error = %e, "traffic merge failed");
        }
        let links = self.links.borrow();
        Ok(links
            .iter()
            .filter(|l| filter.is_none_or(|id| l.id == id))
            .cloned()
            .collect())
    }

    /// Fetch traffic counters and merge them into the current list,
    /// matching strictly by WAN id. Disabled links are left at zero.
    pub async fn merge_traffic(&self, filter: Option<u8>) -> Result<(), CoreError> {
        let filter = normalize(filter);
        let _busy = self.busy.lock().await;
        self.merge_locked(filter).await
    }

    async fn merge_locked(&self, filter: Option<u8>) -> Result<(), CoreError> {
        let payload = self
            .session
            .send_authenticated(Method::GET, paths::TRAFFIC, &[], None)
            .await?;
        let traffic: TrafficResponse = decode(payload)?;
        let table = traffic.bandwidth;

        self.links.send_modify(|links| {
            let links = Arc::make_mut(links);
            for (id, bw) in table.entries() {
                if filter.is_some_and(|f| f != id) {
                    continue;
                }
                if let Some(link) = links.iter_mut().find(|l| l.id == id && !l.is_disabled()) {
                    link.download = bw.overall.download;
                    link.upload = bw.overall.upload;
                    link.unit.clone_from(&table.unit);
                }
            }
        });
        Ok(())
    }
}

/// Id 0 is the router's "every WAN".
fn normalize(filter: Option<u8>) -> Option<u8> {
    filter.filter(|&id| id != 0)
}

/// Put the freshly fetched link `id` in place of the published one. A
/// link the router no longer reports is dropped.
fn splice(links: &mut Vec<WanLink>, id: u8, fresh: Vec<WanLink>) {
    let fresh = fresh.into_iter().find(|l| l.id == id);
    match (links.iter().position(|l| l.id == id), fresh) {
        (Some(at), Some(link)) => {
            if let Some(slot) = links.get_mut(at) {
                *slot = link;
            }
        }
        (Some(at), None) => {
            links.remove(at);
        }
        (None, Some(link)) => links.push(link),
        (None, None) => {}
    }
    order_by_priority(links);
}
