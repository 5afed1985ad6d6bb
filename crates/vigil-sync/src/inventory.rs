//! Monitored-host inventory: listing, stale classification, cleanup.

use std::collections::HashSet;

use chrono::{DateTime, Duration, Utc};
use serde::Deserialize;
use tracing::{error, info};

use crate::client::ApiClient;
use crate::engine::RunSummary;
use crate::error::{SyncError, SyncResult};
use crate::pagination::collect_entities;

const SERVERS_PATH: &str = "/v2/servers.json";

/// Hours a non-reporting server is retained before inventory deletion.
pub const DEFAULT_RETENTION_HOURS: i64 = 24;

/// A monitored host as reported by the remote inventory.
///
/// Listings are transient; nothing here survives a reconciliation pass.
#[derive(Debug, Clone, Deserialize)]
pub struct Server {
    pub id: i64,
    pub name: String,
    pub reporting: bool,
    #[serde(default)]
    pub last_reported_at: Option<String>,
}

impl Server {
    /// Canonical membership identity: the decimal form of the remote ID.
    ///
    /// Member sets compare on this string form only; numeric and string
    /// identities are never mixed.
    #[must_use]
    pub fn entity_id(&self) -> String {
        self.id.to_string()
    }

    /// Timezone-aware `last_reported_at`.
    ///
    /// A missing or non-RFC 3339 value on a non-reporting server is a
    /// contract violation of the remote API and fails the pass.
    fn last_reported_at_utc(&self) -> SyncResult<DateTime<Utc>> {
        let raw = self
            .last_reported_at
            .as_deref()
            .ok_or_else(|| SyncError::Timestamp {
                server: self.name.clone(),
                value: String::new(),
            })?;
        DateTime::parse_from_rfc3339(raw)
            .map(|dt| dt.with_timezone(&Utc))
            .map_err(|_| SyncError::Timestamp {
                server: self.name.clone(),
                value: raw.to_string(),
            })
    }
}

/// Read/delete access to the remote server inventory.
pub struct ServerInventory<'a> {
    client: &'a ApiClient,
}

impl<'a> ServerInventory<'a> {
    pub fn new(client: &'a ApiClient) -> Self {
        Self { client }
    }

    /// List servers, optionally filtered by the given query parameters.
    pub async fn list(&self, query: &[(&str, &str)]) -> SyncResult<Vec<Server>> {
        let raw = collect_entities(self.client, SERVERS_PATH, "servers", query).await?;
        let mut servers = Vec::with_capacity(raw.len());
        for value in raw {
            servers.push(serde_json::from_value::<Server>(value)?);
        }
        Ok(servers)
    }

    /// List the union of servers carrying any of the given labels.
    ///
    /// One filtered listing is issued per label and the results are merged
    /// by server ID, preserving first-seen order. Membership is therefore
    /// the OR across labels irrespective of how the remote service
    /// combines multiple labels in a single filter expression.
    pub async fn list_by_labels(&self, labels: &[String]) -> SyncResult<Vec<Server>> {
        let mut seen = HashSet::new();
        let mut servers = Vec::new();
        for label in labels {
            for server in self.list(&[("filter[labels]", label.as_str())]).await? {
                if seen.insert(server.id) {
                    servers.push(server);
                }
            }
        }
        Ok(servers)
    }

    /// Servers that stopped reporting more than `threshold_hours` ago.
    ///
    /// The comparison is strict: a server exactly at the boundary is
    /// retained.
    pub async fn not_reporting(&self, threshold_hours: i64) -> SyncResult<Vec<Server>> {
        let all = self.list(&[("filter[reported]", "false")]).await?;
        let cutoff = Duration::hours(threshold_hours);
        let now = Utc::now();

        let mut stale = Vec::new();
        for server in all {
            if server.reporting {
                continue;
            }
            if now - server.last_reported_at_utc()? > cutoff {
                stale.push(server);
            }
        }
        Ok(stale)
    }

    /// Delete every server past the retention threshold.
    ///
    /// Deletion is best-effort per server: a failed delete is logged and
    /// counted, and the remaining servers are still processed. A server
    /// whose delete failed reappears in the next pass's stale set and is
    /// retried there.
    pub async fn cleanup(&self, threshold_hours: i64, summary: &mut RunSummary) -> SyncResult<()> {
        let stale = self.not_reporting(threshold_hours).await?;
        info!(count = stale.len(), threshold_hours, "deleting stale servers");

        for server in &stale {
            let path = format!("/v2/servers/{}.json", server.id);
            match self.client.delete(&path, &[]).await {
                Ok(_) => {
                    info!(server = %server.name, id = server.id, "deleted stale server");
                    summary.servers_deleted += 1;
                }
                Err(e) => {
                    error!(
                        server = %server.name,
                        id = server.id,
                        error = %e,
                        "failed to delete stale server"
                    );
                    summary.delete_failures += 1;
                }
            }
        }
        Ok(())
    }
}
