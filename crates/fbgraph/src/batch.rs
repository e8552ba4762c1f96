//! Batch Executor
//!
//! Packs up to 50 logical sub-requests into one physical vendor call.
//! The wire format is fixed by the vendor: the sub-request list is
//! JSON-serialized into the `batch` form field of a single POST to the
//! API root, and the response is a positional array of
//! `{code, headers, body}` objects (body itself a JSON-encoded string).

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio_util::sync::CancellationToken;

use crate::client::{GraphClient, GraphError};

/// Vendor-imposed ceiling on sub-requests per batch.
pub const MAX_BATCH_SIZE: usize = 50;

/// One logical sub-request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchItem {
    /// HTTP method: GET, POST, or DELETE.
    pub method: String,

    /// URL relative to the versioned API root, e.g. `act_123/ads?fields=id`.
    pub relative_url: String,

    /// Form-encoded body for POST sub-requests.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub body: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub headers: Option<Vec<BatchHeader>>,

    /// Caller-chosen correlation name, echoed back on the result.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

/// A header on a sub-request or sub-response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchHeader {
    pub name: String,
    pub value: String,
}

/// Result of one sub-request, position-matched to the input.
#[derive(Debug, Clone, Serialize)]
pub struct BatchResult {
    /// Per-item HTTP status code. 0 when the vendor returned null for
    /// this slot (sub-request not completed).
    pub status_code: u16,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub headers: Option<Vec<BatchHeader>>,

    /// Raw response body for this sub-request.
    pub body: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    /// Best-effort JSON decode of `body`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parsed_body: Option<Value>,

    /// True iff `status_code` is 2xx.
    pub success: bool,

    /// Human error message pulled from `body.error.message` on failure.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Deserialize)]
struct WireResult {
    #[serde(default)]
    code: u16,
    headers: Option<Vec<BatchHeader>>,
    body: Option<String>,
}

/// Execute 1-50 sub-requests as one physical call.
///
/// Both bounds are rejected before any network activity. The overall
/// call succeeds as long as the physical request succeeds; per-item
/// failure lives in each [`BatchResult`].
pub async fn execute_batch(
    client: &GraphClient,
    items: &[BatchItem],
    cancel: &CancellationToken,
) -> Result<Vec<BatchResult>, GraphError> {
    if items.is_empty() {
        return Err(GraphError::InvalidInput(
            "batch requires at least one operation".to_string(),
        ));
    }
    if items.len() > MAX_BATCH_SIZE {
        return Err(GraphError::InvalidInput(format!(
            "batch supports at most {} operations, got {}",
            MAX_BATCH_SIZE,
            items.len()
        )));
    }

    let batch_json = serde_json::to_string(items)
        .map_err(|e| GraphError::Transport(format!("failed to encode batch: {}", e)))?;
    let body = client
        .post_form("", &[("batch".to_string(), batch_json)], cancel)
        .await?;

    let wire: Vec<Option<WireResult>> = serde_json::from_slice(&body).map_err(|e| {
        GraphError::Transport(format!("failed to decode batch response: {}", e))
    })?;

    // The vendor answers positionally; missing trailing slots become
    // failed results.
    let mut results = Vec::with_capacity(items.len());
    for (i, item) in items.iter().enumerate() {
        let slot = wire.get(i).and_then(|s| s.as_ref());
        results.push(unpack(slot, item.name.clone()));
    }
    Ok(results)
}

fn unpack(slot: Option<&WireResult>, name: Option<String>) -> BatchResult {
    let Some(wire) = slot else {
        return BatchResult {
            status_code: 0,
            headers: None,
            body: String::new(),
            name,
            parsed_body: None,
            success: false,
            error: Some("no response for this operation".to_string()),
        };
    };

    let body = wire.body.clone().unwrap_or_default();
    let parsed_body: Option<Value> = serde_json::from_str(&body).ok();
    let success = (200..300).contains(&wire.code);
    let error = if success {
        None
    } else {
        let message = parsed_body
            .as_ref()
            .and_then(|v| v.pointer("/error/message"))
            .and_then(|v| v.as_str())
            .map(str::to_string);
        Some(message.unwrap_or_else(|| format!("http status {}", wire.code)))
    };

    BatchResult {
        status_code: wire.code,
        headers: wire.headers.clone(),
        body,
        name,
        parsed_body,
        success,
        error,
    }
}

/// Builder for assembling a batch without positional bookkeeping.
///
/// Names are optional; when given they are echoed back on the matching
/// result so callers can correlate without indexing.
#[derive(Debug, Default)]
pub struct BatchBuilder {
    items: Vec<BatchItem>,
}

impl BatchBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a GET sub-request.
    pub fn get(mut self, relative_url: impl Into<String>) -> Self {
        self.items.push(BatchItem {
            method: "GET".to_string(),
            relative_url: relative_url.into(),
            body: None,
            headers: None,
            name: None,
        });
        self
    }

    /// Queue a POST sub-request with a form-encoded body.
    pub fn post(mut self, relative_url: impl Into<String>, body: impl Into<String>) -> Self {
        self.items.push(BatchItem {
            method: "POST".to_string(),
            relative_url: relative_url.into(),
            body: Some(body.into()),
            headers: None,
            name: None,
        });
        self
    }

    /// Queue a DELETE sub-request.
    pub fn delete(mut self, relative_url: impl Into<String>) -> Self {
        self.items.push(BatchItem {
            method: "DELETE".to_string(),
            relative_url: relative_url.into(),
            body: None,
            headers: None,
            name: None,
        });
        self
    }

    /// Name the most recently queued sub-request.
    pub fn named(mut self, name: impl Into<String>) -> Self {
        if let Some(last) = self.items.last_mut() {
            last.name = Some(name.into());
        }
        self
    }

    /// Number of queued sub-requests.
    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Hand back the assembled item list.
    pub fn build(self) -> Vec<BatchItem> {
        self.items
    }

    /// Execute the assembled batch.
    pub async fn execute(
        self,
        client: &GraphClient,
        cancel: &CancellationToken,
    ) -> Result<Vec<BatchResult>, GraphError> {
        execute_batch(client, &self.items, cancel).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_empty_batch_rejected_before_network() {
        // Client points at a closed port; the bounds check must fire first.
        let client = GraphClient::new("tok").with_host("http://127.0.0.1:1");
        let err = execute_batch(&client, &[], &CancellationToken::new())
            .await
            .unwrap_err();
        assert!(matches!(err, GraphError::InvalidInput(_)));
    }

    #[tokio::test]
    async fn test_oversized_batch_rejected_before_network() {
        let client = GraphClient::new("tok").with_host("http://127.0.0.1:1");
        let items: Vec<BatchItem> = (0..51)
            .map(|i| BatchItem {
                method: "GET".to_string(),
                relative_url: format!("act_{}", i),
                body: None,
                headers: None,
                name: None,
            })
            .collect();
        let err = execute_batch(&client, &items, &CancellationToken::new())
            .await
            .unwrap_err();
        assert!(err.to_string().contains("at most 50"));
    }

    #[test]
    fn test_builder_assembles_in_order() {
        let items = BatchBuilder::new()
            .get("act_123?fields=id,name")
            .named("account")
            .post("act_123/campaigns", "name=Test&objective=OUTCOME_TRAFFIC")
            .delete("120210000000")
            .build();
        assert_eq!(items.len(), 3);
        assert_eq!(items[0].method, "GET");
        assert_eq!(items[0].name.as_deref(), Some("account"));
        assert_eq!(items[1].body.as_deref(), Some("name=Test&objective=OUTCOME_TRAFFIC"));
        assert_eq!(items[2].method, "DELETE");
        assert!(items[2].name.is_none());
    }

    #[test]
    fn test_unpack_error_message_extraction() {
        let wire = WireResult {
            code: 400,
            headers: None,
            body: Some(r#"{"error":{"message":"Invalid object ID"}}"#.to_string()),
        };
        let result = unpack(Some(&wire), Some("bad".to_string()));
        assert!(!result.success);
        assert_eq!(result.error.as_deref(), Some("Invalid object ID"));
        assert_eq!(result.name.as_deref(), Some("bad"));
        assert!(result.parsed_body.is_some());
    }

    #[test]
    fn test_unpack_null_slot() {
        let result = unpack(None, None);
        assert_eq!(result.status_code, 0);
        assert!(!result.success);
    }

    #[test]
    fn test_item_serialization_omits_optionals() {
        let item = BatchItem {
            method: "GET".to_string(),
            relative_url: "me".to_string(),
            body: None,
            headers: None,
            name: None,
        };
        let json = serde_json::to_value(&item).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"method": "GET", "relative_url": "me"})
        );
    }
}
