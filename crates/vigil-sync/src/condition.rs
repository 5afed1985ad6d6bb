//! Alert conditions and their member-entity sets.

use std::collections::HashSet;

use reqwest::Response;
use serde::Deserialize;
use serde_json::Value;
use tracing::{info, warn};

use crate::client::ApiClient;
use crate::engine::RunSummary;
use crate::error::{SyncError, SyncResult};
use crate::inventory::Server;
use crate::pagination::collect_entities;

const CONDITIONS_PATH: &str = "/v2/alerts_conditions.json";

fn entity_condition_path(entity_id: &str) -> String {
    format!("/v2/alerts_entity_conditions/{entity_id}.json")
}

/// Raw condition entry from the conditions listing.
#[derive(Debug, Deserialize)]
struct ConditionPayload {
    id: i64,
    name: String,
    #[serde(default)]
    entities: Vec<Value>,
}

/// Mutation responses wrap the updated condition.
#[derive(Debug, Deserialize)]
struct ConditionEnvelope {
    condition: ConditionPayload,
}

/// Canonical string form of a mixed numeric/string entity-ID list.
fn canonical_ids(values: &[Value]) -> HashSet<String> {
    values
        .iter()
        .filter_map(|v| match v {
            Value::Number(n) => Some(n.to_string()),
            Value::String(s) => Some(s.clone()),
            _ => None,
        })
        .collect()
}

/// One alerting rule under a policy, with its mutable target entity set.
///
/// `members` always reflects the most recent successful mutation response;
/// it is never re-fetched in between. When a mutation response cannot be
/// decoded the remote set has changed without us seeing it: `dirty` is
/// raised and `members` stays as-is until the next full pass replaces it
/// from remote truth.
#[derive(Debug)]
pub struct Condition {
    id: i64,
    name: String,
    members: HashSet<String>,
    dirty: bool,
}

impl Condition {
    fn from_payload(payload: ConditionPayload) -> Self {
        Self {
            id: payload.id,
            name: payload.name,
            members: canonical_ids(&payload.entities),
            dirty: false,
        }
    }

    #[must_use]
    pub fn id(&self) -> i64 {
        self.id
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Current member-entity IDs as last confirmed by the remote API.
    #[must_use]
    pub fn members(&self) -> &HashSet<String> {
        &self.members
    }

    /// Whether a mutation response could not be decoded, leaving
    /// `members` stale until the next reconciliation pass.
    #[must_use]
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Member IDs not present in the desired set, in stable order.
    #[must_use]
    pub fn absent_members(&self, desired: &HashSet<String>) -> Vec<String> {
        let mut absent: Vec<String> = self.members.difference(desired).cloned().collect();
        absent.sort();
        absent
    }

    /// Add a server to this condition's target set.
    ///
    /// No-op (and no request) when the server is already a member. On
    /// success `members` is replaced wholesale from the mutation response.
    /// Returns `true` when a mutation was issued.
    pub async fn register_server(
        &mut self,
        client: &ApiClient,
        server: &Server,
    ) -> SyncResult<bool> {
        let entity_id = server.entity_id();
        if self.members.contains(&entity_id) {
            return Ok(false);
        }

        info!(entity = %server.name, condition = %self.name, "adding entity to condition");
        let condition_id = self.id.to_string();
        let response = client
            .put(
                &entity_condition_path(&entity_id),
                &[("entity_type", "Server"), ("condition_id", &condition_id)],
            )
            .await?;
        self.refresh_members(response).await?;
        Ok(true)
    }

    /// Remove a member entity by its canonical ID (no-op when absent).
    ///
    /// A server's canonical ID ([`Server::entity_id`]) is its membership
    /// identity, so this is also the per-server removal operation.
    pub async fn deregister_entity(
        &mut self,
        client: &ApiClient,
        entity_id: &str,
    ) -> SyncResult<()> {
        if !self.members.contains(entity_id) {
            return Ok(());
        }

        info!(entity = entity_id, condition = %self.name, "removing entity from condition");
        let condition_id = self.id.to_string();
        let response = client
            .delete(
                &entity_condition_path(entity_id),
                &[("entity_type", "Server"), ("condition_id", &condition_id)],
            )
            .await?;
        self.refresh_members(response).await
    }

    /// Replace `members` from a successful mutation response body.
    async fn refresh_members(&mut self, response: Response) -> SyncResult<()> {
        let body = response.text().await?;
        match serde_json::from_str::<ConditionEnvelope>(&body) {
            Ok(envelope) => {
                self.members = canonical_ids(&envelope.condition.entities);
                self.dirty = false;
                Ok(())
            }
            Err(e) => {
                // The mutation has been applied remotely; the local set no
                // longer matches what the API holds.
                self.dirty = true;
                Err(SyncError::Json(e))
            }
        }
    }
}

/// Every condition under one alert policy.
#[derive(Debug, Default)]
pub struct ConditionStore {
    conditions: Vec<Condition>,
}

impl ConditionStore {
    /// Load all conditions declared under a policy, seeding each member
    /// set from the condition payload's entity list.
    pub async fn load(client: &ApiClient, policy_id: i64) -> SyncResult<Self> {
        let policy_id = policy_id.to_string();
        let raw = collect_entities(
            client,
            CONDITIONS_PATH,
            "conditions",
            &[("policy_id", policy_id.as_str())],
        )
        .await?;

        let mut conditions = Vec::with_capacity(raw.len());
        for value in raw {
            let payload: ConditionPayload = serde_json::from_value(value)?;
            conditions.push(Condition::from_payload(payload));
        }
        Ok(Self { conditions })
    }

    /// Conditions in remote listing order.
    #[must_use]
    pub fn conditions(&self) -> &[Condition] {
        &self.conditions
    }

    /// Register a server into every condition.
    ///
    /// Mutation failures are logged and counted; the remaining conditions
    /// are still processed.
    pub async fn register_server(
        &mut self,
        client: &ApiClient,
        server: &Server,
        summary: &mut RunSummary,
    ) {
        for condition in &mut self.conditions {
            match condition.register_server(client, server).await {
                Ok(true) => summary.entities_added += 1,
                Ok(false) => {}
                Err(e) => {
                    summary.mutation_failures += 1;
                    warn!(
                        condition = %condition.name,
                        server = %server.name,
                        error = %e,
                        "failed to register server on condition"
                    );
                }
            }
        }
    }

    /// Deregister, from every condition, each member absent from the
    /// desired server set.
    ///
    /// Per-entity failures are logged and counted without aborting the
    /// remaining entities or conditions.
    pub async fn deregister_absent(
        &mut self,
        client: &ApiClient,
        desired: &[Server],
        summary: &mut RunSummary,
    ) {
        let desired_ids: HashSet<String> = desired.iter().map(Server::entity_id).collect();
        for condition in &mut self.conditions {
            for entity_id in condition.absent_members(&desired_ids) {
                match condition.deregister_entity(client, &entity_id).await {
                    Ok(()) => summary.entities_removed += 1,
                    Err(e) => {
                        summary.mutation_failures += 1;
                        warn!(
                            condition = %condition.name,
                            entity = %entity_id,
                            error = %e,
                            "failed to deregister entity from condition"
                        );
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn canonical_ids_normalizes_numbers_and_strings() {
        let values = vec![json!(86867839), json!("86713155"), json!(null)];
        let ids = canonical_ids(&values);
        assert_eq!(ids.len(), 2);
        assert!(ids.contains("86867839"));
        assert!(ids.contains("86713155"));
    }

    #[test]
    fn absent_members_is_exact_set_difference() {
        let condition = Condition {
            id: 1,
            name: "CPU % (High)".to_string(),
            members: ["1", "2", "3"].iter().map(|s| s.to_string()).collect(),
            dirty: false,
        };
        let desired: HashSet<String> = ["1", "3"].iter().map(|s| s.to_string()).collect();
        assert_eq!(condition.absent_members(&desired), vec!["2".to_string()]);
    }
}
