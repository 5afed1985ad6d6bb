//! Tag-driven alert-condition membership reconciliation.
//!
//! Keeps a remote monitoring service's alert-condition membership in sync
//! with a fleet of monitored hosts. A desired-state configuration declares
//! alert policies and the deployment tags whose servers belong to them;
//! every reconciliation pass recomputes the desired server set per policy
//! from those tags and converges each condition's actual member set to it,
//! after aging non-reporting servers out of the inventory.
//!
//! All requests of a pass go through one credentialed [`ApiClient`] and
//! are issued strictly sequentially; pages, servers, policies, and
//! conditions are never processed in parallel.
//!
//! # Example
//!
//! ```no_run
//! use vigil_sync::{ApiClient, PolicyDeclaration, ReconciliationEngine, DEFAULT_RETENTION_HOURS};
//!
//! # async fn example() -> Result<(), vigil_sync::SyncError> {
//! let client = ApiClient::new("https://api.newrelic.com", "my-api-key")?;
//! let declarations = vec![PolicyDeclaration {
//!     name: "Test Policy1".to_string(),
//!     tags: vec!["test1".to_string(), "test".to_string()],
//! }];
//! let summary =
//!     ReconciliationEngine::reconcile(&client, &declarations, DEFAULT_RETENTION_HOURS).await?;
//! println!("added {} entities", summary.entities_added);
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod condition;
pub mod engine;
pub mod error;
pub mod inventory;
pub mod pagination;
pub mod policy;

pub use client::ApiClient;
pub use condition::{Condition, ConditionStore};
pub use engine::{ReconciliationEngine, RunSummary};
pub use error::{SyncError, SyncResult};
pub use inventory::{Server, ServerInventory, DEFAULT_RETENTION_HOURS};
pub use pagination::PagedFetcher;
pub use policy::{Policy, PolicyDeclaration, PolicyStore};
