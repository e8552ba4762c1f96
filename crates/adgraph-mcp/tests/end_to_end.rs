//! Generated handlers and meta tools driven through the registry against
//! a mock vendor.

mod common;

use serde_json::{json, Value};
use tokio_util::sync::CancellationToken;

fn text_json(result: &switchboard::CallToolResult) -> Value {
    let text = result.content[0].as_text().expect("text content");
    serde_json::from_str(text).expect("text body is JSON")
}

#[tokio::test]
async fn test_list_ads_builds_path_and_query() {
    let (_mock, registry, manager) = common::setup().await;
    manager.set(&["adaccount".to_string()]).await.unwrap();

    let result = registry
        .call(
            "ad_account_list_ads",
            json!({
                "id": "123456789",
                "fields": ["id", "name", "status"],
                "limit": 25,
                "date_preset": "last_30d",
            }),
            CancellationToken::new(),
        )
        .await
        .unwrap();

    assert!(!result.is_error, "{:?}", result.content);
    let body = text_json(&result);
    assert_eq!(body["path_id"], "123456789");
    let query = body["received_query"].as_str().unwrap();
    assert!(
        query.contains("fields=id%2Cname%2Cstatus") || query.contains("fields=id,name,status"),
        "{}",
        query
    );
    assert!(query.contains("limit=25"), "{}", query);
    // Undeclared GET parameters flow through to the query string.
    assert!(query.contains("date_preset=last_30d"), "{}", query);
    assert!(query.contains("access_token=test-token"), "{}", query);
}

#[tokio::test]
async fn test_create_business_posts_json_without_id() {
    let (_mock, registry, manager) = common::setup().await;
    manager.set(&["user".to_string()]).await.unwrap();

    let result = registry
        .call(
            "user_create_businesse",
            json!({"id": "1001", "name": "Acme", "vertical": "RETAIL"}),
            CancellationToken::new(),
        )
        .await
        .unwrap();

    assert!(!result.is_error, "{:?}", result.content);
    let body = text_json(&result);
    assert_eq!(body["path_id"], "1001");
    assert_eq!(
        body["received_body"],
        json!({"name": "Acme", "vertical": "RETAIL"}),
        "path id must not leak into the body"
    );
}

#[tokio::test]
async fn test_mutation_rejects_unknown_arguments() {
    let (_mock, registry, manager) = common::setup().await;
    manager.set(&["user".to_string()]).await.unwrap();

    let result = registry
        .call(
            "user_create_businesse",
            json!({"id": "1001", "name": "Acme", "vertical": "RETAIL", "bogus": 1}),
            CancellationToken::new(),
        )
        .await
        .unwrap();

    assert!(result.is_error);
    assert!(result.content[0]
        .as_text()
        .unwrap()
        .contains("invalid arguments"));
}

#[tokio::test]
async fn test_batch_tool_reports_per_item_status() {
    let (_mock, registry, _manager) = common::setup().await;

    let result = registry
        .call(
            "facebook_batch",
            json!({
                "operations": [
                    {"method": "GET", "relative_url": "act_1?fields=id", "name": "good"},
                    {"method": "GET", "relative_url": "invalid_id?fields=id", "name": "bad"},
                ]
            }),
            CancellationToken::new(),
        )
        .await
        .unwrap();

    assert!(!result.is_error, "{:?}", result.content);
    let structured = result.structured_content.as_ref().unwrap();
    assert_eq!(structured["summary"]["total"], 2);
    assert_eq!(structured["summary"]["successful"], 1);
    assert_eq!(structured["summary"]["failed"], 1);
    assert_eq!(structured["results"][0]["name"], "good");
    assert_eq!(structured["results"][0]["success"], true);
    assert_eq!(structured["results"][1]["success"], false);
    assert_eq!(structured["results"][1]["error"], "Invalid object ID");
}

#[tokio::test]
async fn test_oversized_batch_rejected_before_network() {
    let (_mock, registry, _manager) = common::setup().await;

    let operations: Vec<Value> = (0..51)
        .map(|i| json!({"method": "GET", "relative_url": format!("act_{}", i)}))
        .collect();
    let result = registry
        .call(
            "facebook_batch",
            json!({ "operations": operations }),
            CancellationToken::new(),
        )
        .await
        .unwrap();

    assert!(result.is_error);
    assert!(result.content[0].as_text().unwrap().contains("at most 50"));
}

#[tokio::test]
async fn test_tool_manager_renders_catalog_and_sets() {
    let (_mock, registry, _manager) = common::setup().await;

    let result = registry
        .call(
            "tool_manager",
            json!({"action": "get"}),
            CancellationToken::new(),
        )
        .await
        .unwrap();
    assert!(!result.is_error);
    let text = result.content[0].as_text().unwrap();
    assert!(text.contains("Available scopes:"));
    assert!(text.contains("essentials"));

    let result = registry
        .call(
            "tool_manager",
            json!({"action": "set", "scopes": ["essentials"]}),
            CancellationToken::new(),
        )
        .await
        .unwrap();
    assert!(!result.is_error);
    assert!(registry.contains("campaign_get"));

    let result = registry
        .call(
            "tool_manager",
            json!({"action": "set", "scopes": ["nonsense"]}),
            CancellationToken::new(),
        )
        .await
        .unwrap();
    assert!(result.is_error);
    assert!(result.content[0].as_text().unwrap().contains("nonsense"));
    // A rejected set leaves the previous scopes loaded.
    assert!(registry.contains("campaign_get"));
}

#[tokio::test]
async fn test_scope_selector_add_and_remove() {
    let (_mock, registry, _manager) = common::setup().await;

    registry
        .call(
            "scope_selector",
            json!({"action": "set_scopes", "domains": ["essentials"]}),
            CancellationToken::new(),
        )
        .await
        .unwrap();
    registry
        .call(
            "scope_selector",
            json!({"action": "add_scopes", "domains": ["audience"]}),
            CancellationToken::new(),
        )
        .await
        .unwrap();
    assert!(registry.contains("custom_audience_get"));

    registry
        .call(
            "scope_selector",
            json!({"action": "remove_scopes", "domains": ["audience"]}),
            CancellationToken::new(),
        )
        .await
        .unwrap();
    assert!(!registry.contains("custom_audience_get"));
    assert!(registry.contains("campaign_get"));

    let result = registry
        .call(
            "scope_selector",
            json!({"action": "get_scopes"}),
            CancellationToken::new(),
        )
        .await
        .unwrap();
    assert_eq!(
        result.structured_content.as_ref().unwrap()["loaded"],
        json!(["essentials"])
    );
}
