//! Desired-state policy declarations and remote policy resolution.

use serde::Deserialize;
use tracing::info;

use crate::client::ApiClient;
use crate::condition::ConditionStore;
use crate::error::{SyncError, SyncResult};
use crate::pagination::collect_entities;

const POLICIES_PATH: &str = "/v2/alerts_policies.json";

/// One desired-state entry: a policy name and the deployment tags whose
/// servers belong to it.
#[derive(Debug, Clone, Deserialize)]
pub struct PolicyDeclaration {
    pub name: String,
    #[serde(default)]
    pub tags: Vec<String>,
}

/// Remote policy entry from the policies listing.
#[derive(Debug, Deserialize)]
struct PolicyPayload {
    id: i64,
    name: String,
}

/// A declared policy resolved against the remote service.
#[derive(Debug)]
pub struct Policy {
    name: String,
    tags: Vec<String>,
    id: i64,
    pub(crate) conditions: ConditionStore,
}

impl Policy {
    #[must_use]
    pub fn id(&self) -> i64 {
        self.id
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Membership tags, deduplicated in declaration order.
    #[must_use]
    pub fn tags(&self) -> &[String] {
        &self.tags
    }

    #[must_use]
    pub fn conditions(&self) -> &ConditionStore {
        &self.conditions
    }

    /// Whether any of the given tags is one of this policy's tags.
    #[must_use]
    pub fn matches_tags(&self, tags: &[String]) -> bool {
        tags.iter().any(|t| self.tags.iter().any(|own| own == t))
    }
}

/// Owner of every declared policy and its conditions.
#[derive(Debug, Default)]
pub struct PolicyStore {
    policies: Vec<Policy>,
}

impl PolicyStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolve a declaration against the remote policy collection and
    /// load its conditions.
    ///
    /// The remote listing is filtered by name but may match loosely; the
    /// declared name must equal exactly one returned policy's name. Zero
    /// matches fail with [`SyncError::PolicyNotFound`], several with
    /// [`SyncError::AmbiguousPolicy`].
    pub async fn add_policy(
        &mut self,
        client: &ApiClient,
        declaration: &PolicyDeclaration,
    ) -> SyncResult<()> {
        let raw = collect_entities(
            client,
            POLICIES_PATH,
            "policies",
            &[("filter[name]", declaration.name.as_str())],
        )
        .await?;

        let mut matches = Vec::new();
        for value in raw {
            let payload: PolicyPayload = serde_json::from_value(value)?;
            if payload.name == declaration.name {
                matches.push(payload);
            }
        }

        let policy_id = match matches.len() {
            0 => return Err(SyncError::PolicyNotFound(declaration.name.clone())),
            1 => matches[0].id,
            count => {
                return Err(SyncError::AmbiguousPolicy {
                    name: declaration.name.clone(),
                    count,
                })
            }
        };

        let conditions = ConditionStore::load(client, policy_id).await?;
        info!(
            policy = %declaration.name,
            id = policy_id,
            conditions = conditions.conditions().len(),
            "resolved alert policy"
        );

        let mut tags = Vec::new();
        for tag in &declaration.tags {
            if !tags.contains(tag) {
                tags.push(tag.clone());
            }
        }

        self.policies.push(Policy {
            name: declaration.name.clone(),
            tags,
            id: policy_id,
            conditions,
        });
        Ok(())
    }

    /// Declared policies, in declaration order.
    #[must_use]
    pub fn policies(&self) -> &[Policy] {
        &self.policies
    }

    pub(crate) fn policies_mut(&mut self) -> &mut [Policy] {
        &mut self.policies
    }

    /// Policies whose tag set intersects the given tags.
    #[must_use]
    pub fn policies_by_tags(&self, tags: &[String]) -> Vec<&Policy> {
        self.policies
            .iter()
            .filter(|p| p.matches_tags(tags))
            .collect()
    }
}
