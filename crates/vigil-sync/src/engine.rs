//! Top-level reconciliation pass: cleanup, then per-policy convergence.

use serde::Serialize;
use tracing::info;

use crate::client::ApiClient;
use crate::error::SyncResult;
use crate::inventory::ServerInventory;
use crate::policy::{PolicyDeclaration, PolicyStore};

/// Namespace token prefixed to every policy tag to form a deployment
/// label.
const LABEL_NAMESPACE: &str = "Deployment";

/// Counters for one reconciliation pass.
///
/// Per-item failures (a single delete or condition mutation) are counted
/// here and logged, never escalated; whole-run failures surface as errors
/// from [`ReconciliationEngine::reconcile`] instead.
#[derive(Debug, Default, Clone, Serialize)]
pub struct RunSummary {
    pub servers_deleted: u32,
    pub delete_failures: u32,
    pub entities_added: u32,
    pub entities_removed: u32,
    pub mutation_failures: u32,
}

/// Stateless orchestrator: recomputes desired membership from tags every
/// pass and converges each condition's actual membership to it. Nothing
/// is remembered between passes; convergence is always against whatever
/// the remote API currently reports.
pub struct ReconciliationEngine;

impl ReconciliationEngine {
    /// Run one full pass: stale-server cleanup, then policy
    /// reconciliation in declaration order.
    ///
    /// # Errors
    ///
    /// Fails on an unresolvable policy name, a pagination or transport
    /// failure, or a malformed `last_reported_at` timestamp; per-server
    /// mutation and delete failures are logged and counted in the
    /// returned [`RunSummary`] without aborting the pass.
    pub async fn reconcile(
        client: &ApiClient,
        declarations: &[PolicyDeclaration],
        retention_hours: i64,
    ) -> SyncResult<RunSummary> {
        let mut summary = RunSummary::default();
        let inventory = ServerInventory::new(client);

        inventory.cleanup(retention_hours, &mut summary).await?;

        let mut store = PolicyStore::new();
        for declaration in declarations {
            store.add_policy(client, declaration).await?;
        }

        for policy in store.policies_mut() {
            let labels: Vec<String> = policy
                .tags()
                .iter()
                .map(|tag| format!("{LABEL_NAMESPACE}:{tag}"))
                .collect();
            let servers = inventory.list_by_labels(&labels).await?;
            info!(
                policy = %policy.name(),
                servers = servers.len(),
                "refreshing policy membership"
            );

            for server in &servers {
                policy
                    .conditions
                    .register_server(client, server, &mut summary)
                    .await;
            }
            policy
                .conditions
                .deregister_absent(client, &servers, &mut summary)
                .await;
        }

        info!(
            servers_deleted = summary.servers_deleted,
            entities_added = summary.entities_added,
            entities_removed = summary.entities_removed,
            failures = summary.delete_failures + summary.mutation_failures,
            "reconciliation pass complete"
        );
        Ok(summary)
    }
}
