//! Shared wiremock fixtures and test-data factories.

#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use serde_json::{json, Value};
use vigil_sync::ApiClient;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, Respond, ResponseTemplate};

/// Client pointing at the mock server with a canned API key.
pub fn test_client(server: &MockServer) -> ApiClient {
    ApiClient::new(&server.uri(), "test-api-key").unwrap()
}

/// RFC 3339 timestamp a number of hours (plus `seconds`) in the past.
///
/// Negative `seconds` moves the timestamp closer to now.
pub fn hours_ago(hours: i64, seconds: i64) -> String {
    (chrono::Utc::now() - chrono::Duration::hours(hours) - chrono::Duration::seconds(seconds))
        .to_rfc3339()
}

/// A reporting server in the inventory listing shape.
pub fn reporting_server(id: i64, name: &str, last_reported_at: &str) -> Value {
    json!({
        "id": id,
        "name": name,
        "host": name,
        "health_status": "green",
        "reporting": true,
        "last_reported_at": last_reported_at,
    })
}

/// A server that has stopped reporting.
pub fn silent_server(id: i64, name: &str, last_reported_at: &str) -> Value {
    json!({
        "id": id,
        "name": name,
        "host": name,
        "health_status": "red",
        "reporting": false,
        "last_reported_at": last_reported_at,
    })
}

/// A policy entry in the policies listing shape.
pub fn policy_entry(id: i64, name: &str) -> Value {
    json!({
        "id": id,
        "name": name,
        "incident_preference": "PER_POLICY",
    })
}

/// A condition entry in the conditions listing shape.
pub fn condition_entry(id: i64, name: &str, entities: Vec<i64>) -> Value {
    json!({
        "id": id,
        "type": "servers_metric",
        "name": name,
        "enabled": true,
        "entities": entities,
        "metric": "cpu_percentage",
    })
}

/// Wrap items in the named collection field of a page payload.
pub fn page(field: &str, items: Vec<Value>) -> Value {
    json!({ field: items })
}

/// Mutation response envelope carrying the condition's new entity list.
pub fn condition_envelope(id: i64, name: &str, entities: Vec<i64>) -> Value {
    json!({ "condition": condition_entry(id, name, entities) })
}

/// Mount a single-page listing for `api_path`, matched on one query
/// parameter.
pub async fn mock_listing(server: &MockServer, api_path: &str, filter: (&str, &str), body: Value) {
    Mock::given(method("GET"))
        .and(path(api_path))
        .and(query_param(filter.0, filter.1))
        .respond_with(ResponseTemplate::new(200).set_body_json(body))
        .mount(server)
        .await;
}

/// Serves page payloads in request order, attaching a `Link: rel="next"`
/// header to every page that has a successor.
pub struct PagedResponder {
    pages: Vec<(Value, Option<String>)>,
    position: Arc<AtomicUsize>,
}

impl PagedResponder {
    pub fn new(pages: Vec<(Value, Option<String>)>) -> Self {
        Self {
            pages,
            position: Arc::new(AtomicUsize::new(0)),
        }
    }
}

impl Respond for PagedResponder {
    fn respond(&self, _request: &wiremock::Request) -> ResponseTemplate {
        let idx = self.position.fetch_add(1, Ordering::SeqCst);
        match self.pages.get(idx) {
            Some((body, next)) => {
                let mut template = ResponseTemplate::new(200).set_body_json(body.clone());
                if let Some(next) = next {
                    template = template.insert_header("Link", format!("<{next}>; rel=\"next\""));
                }
                template
            }
            // Extra requests past the last page indicate a cursor bug.
            None => ResponseTemplate::new(500),
        }
    }
}
