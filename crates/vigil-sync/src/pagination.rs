//! Cursor-style pagination over the remote API's `Link` headers.

use reqwest::Response;
use serde_json::Value;
use tracing::debug;

use crate::client::ApiClient;
use crate::error::SyncResult;

/// Lazy, finite, non-restartable sequence of page payloads.
///
/// The first page is fetched with the supplied query parameters; every
/// subsequent page follows the absolute URL named by the previous
/// response's `Link` header relation `next`. The sequence is exhausted
/// once a response carries no such relation, and stays exhausted. Pages
/// are strictly sequential: each fetch depends on the prior response.
pub struct PagedFetcher<'a> {
    client: &'a ApiClient,
    next_url: Option<String>,
    query: Vec<(String, String)>,
    first: bool,
}

impl<'a> PagedFetcher<'a> {
    /// Start a page sequence for an API path.
    pub fn new(client: &'a ApiClient, path: &str, query: &[(&str, &str)]) -> Self {
        Self {
            client,
            next_url: Some(client.url(path)),
            query: query
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
            first: true,
        }
    }

    /// Fetch the next page payload, or `None` once the sequence is
    /// exhausted.
    ///
    /// Each call issues exactly one round trip. Transport failures and
    /// non-success statuses are fatal; no retry is attempted here.
    pub async fn next_page(&mut self) -> SyncResult<Option<Value>> {
        let Some(url) = self.next_url.take() else {
            return Ok(None);
        };
        let query: Vec<(&str, &str)> = if self.first {
            self.query
                .iter()
                .map(|(k, v)| (k.as_str(), v.as_str()))
                .collect()
        } else {
            Vec::new()
        };
        self.first = false;

        let response = self.client.get(&url, &query).await?;
        self.next_url = next_link(&response);

        let body = response.text().await?;
        let payload: Value = serde_json::from_str(&body)?;
        Ok(Some(payload))
    }
}

/// Concatenate the named collection field across every page of a listing.
///
/// A page without the field contributes nothing. A payload that is not
/// valid JSON is surfaced as a decode error; the collection cannot
/// safely continue past it.
pub async fn collect_entities(
    client: &ApiClient,
    path: &str,
    field: &str,
    query: &[(&str, &str)],
) -> SyncResult<Vec<Value>> {
    let mut fetcher = PagedFetcher::new(client, path, query);
    let mut entities = Vec::new();
    let mut pages = 0usize;
    while let Some(page) = fetcher.next_page().await? {
        if let Some(items) = page.get(field).and_then(Value::as_array) {
            entities.extend(items.iter().cloned());
        }
        pages += 1;
    }
    debug!(path, field, pages, count = entities.len(), "collected entities");
    Ok(entities)
}

fn next_link(response: &Response) -> Option<String> {
    let raw = response
        .headers()
        .get(reqwest::header::LINK)?
        .to_str()
        .ok()?;
    parse_next_link(raw)
}

/// Extract the URL of the `next` relation from a `Link` header value.
///
/// Accepts the `<url>; rel="next"` form, comma-separated among other
/// relations; quoting of the rel parameter is optional.
fn parse_next_link(header: &str) -> Option<String> {
    for part in header.split(',') {
        let mut sections = part.split(';');
        let target = sections.next()?.trim();
        if !(target.starts_with('<') && target.ends_with('>')) {
            continue;
        }
        let is_next = sections.any(|param| {
            param
                .trim()
                .strip_prefix("rel=")
                .map(|rel| rel.trim_matches('"') == "next")
                .unwrap_or(false)
        });
        if is_next {
            return Some(target[1..target.len() - 1].to_string());
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_next_relation_among_others() {
        let header = "<https://api.example.com/v2/servers.json?page=2>; rel=\"next\", \
                      <https://api.example.com/v2/servers.json?page=12>; rel=\"last\"";
        assert_eq!(
            parse_next_link(header).as_deref(),
            Some("https://api.example.com/v2/servers.json?page=2")
        );
    }

    #[test]
    fn ignores_header_without_next_relation() {
        assert_eq!(
            parse_next_link("<https://api.example.com/x>; rel=\"prev\""),
            None
        );
    }

    #[test]
    fn accepts_unquoted_rel_parameter() {
        assert_eq!(
            parse_next_link("<https://api.example.com/x?p=2>; rel=next").as_deref(),
            Some("https://api.example.com/x?p=2")
        );
    }

    #[test]
    fn empty_header_yields_none() {
        assert_eq!(parse_next_link(""), None);
    }
}
