//! Neynar and summarizer clients against a mock HTTP server

use chrono::{Duration, Utc};
use clanker_scout::scout::{
    AnthropicSummarizer, NeynarClient, NeynarConfig, NeynarError, SqliteTokenStore, Summarizer,
    SummarizerConfig, ThemeReducer, TokenStorage,
};
use clanker_scout::types::TokenRecord;
use serde_json::json;
use std::sync::Arc;
use wiremock::matchers::{body_partial_json, body_string_contains, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn neynar_config(server: &MockServer, signer: Option<&str>) -> NeynarConfig {
    NeynarConfig {
        base_url: server.uri(),
        api_key: Some("test-key".to_string()),
        signer_uuid: signer.map(str::to_string),
        timeout_seconds: 5,
    }
}

fn summarizer_config(server: &MockServer) -> SummarizerConfig {
    SummarizerConfig {
        base_url: server.uri(),
        api_key: Some("anthropic-key".to_string()),
        timeout_seconds: 5,
        ..Default::default()
    }
}

fn themed_answer(body: &str) -> serde_json::Value {
    json!({
        "id": "msg_01",
        "type": "message",
        "role": "assistant",
        "content": [{
            "type": "text",
            "text": format!("Here are the themes.\n<themed_dictionary>\n{body}\n</themed_dictionary>")
        }]
    })
}

#[tokio::test]
async fn test_user_lookup_maps_profile() -> anyhow::Result<()> {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/user/by_username"))
        .and(query_param("username", "alice"))
        .and(header("x-api-key", "test-key"))
        .and(header("x-neynar-experimental", "false"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "user": {
                "fid": 42,
                "username": "alice",
                "follower_count": 5000,
                "power_badge": true,
                "verified_addresses": { "eth_addresses": ["0xabc"], "sol_addresses": [] },
                "experimental": { "neynar_user_score": 0.97 }
            }
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = NeynarClient::new(&neynar_config(&server, None))?;
    let profile = client.user_by_username("alice").await?;

    assert_eq!(profile.username, "alice");
    assert_eq!(profile.follower_count, 5000);
    assert_eq!(profile.reputation_score, Some(0.97));
    assert!(profile.has_badge);
    assert_eq!(profile.verified_eth_addresses, vec!["0xabc".to_string()]);
    Ok(())
}

#[tokio::test]
async fn test_user_lookup_surfaces_api_errors() -> anyhow::Result<()> {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/user/by_username"))
        .respond_with(ResponseTemplate::new(404).set_body_string("user not found"))
        .mount(&server)
        .await;

    let client = NeynarClient::new(&neynar_config(&server, None))?;
    match client.user_by_username("ghost").await {
        Err(NeynarError::Api { status, message }) => {
            assert_eq!(status, 404);
            assert_eq!(message, "user not found");
        }
        other => panic!("expected API error, got {other:?}"),
    }
    Ok(())
}

#[tokio::test]
async fn test_cast_is_posted_with_embed() -> anyhow::Result<()> {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/cast"))
        .and(header("x-api-key", "test-key"))
        .and(body_partial_json(json!({
            "signer_uuid": "signer-1",
            "text": "hello",
            "embeds": [{ "url": "https://www.clanker.world/clanker/0xfoo" }]
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "success": true })))
        .expect(1)
        .mount(&server)
        .await;

    let client = NeynarClient::new(&neynar_config(&server, Some("signer-1")))?;
    client
        .post_cast("hello", Some("https://www.clanker.world/clanker/0xfoo"), None)
        .await?;
    Ok(())
}

#[tokio::test]
async fn test_cast_without_signer_is_not_sent() -> anyhow::Result<()> {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/cast"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let client = NeynarClient::new(&neynar_config(&server, None))?;
    let err = client.post_cast("hello", None, None).await.unwrap_err();
    assert!(matches!(err, NeynarError::NotConfigured(_)));
    Ok(())
}

#[tokio::test]
async fn test_summarizer_parses_themes() -> anyhow::Result<()> {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/messages"))
        .and(header("x-api-key", "anthropic-key"))
        .and(header("anthropic-version", "2023-06-01"))
        .and(body_string_contains("<examples>"))
        .and(body_string_contains("ChickenDog,Noodle,Taco,CHID,TACO"))
        .respond_with(ResponseTemplate::new(200).set_body_json(themed_answer(
            r#"{"Dog Tokens": ["ChickenDog", "CHID"], "Food Tokens": ["Noodle", "Taco", "TACO"]}"#,
        )))
        .expect(1)
        .mount(&server)
        .await;

    let summarizer = AnthropicSummarizer::from_config(&summarizer_config(&server))?
        .expect("api key configured");
    let themes = summarizer.summarize("ChickenDog,Noodle,Taco,CHID,TACO").await?;

    assert_eq!(themes.len(), 2);
    assert_eq!(themes[0].name, "Dog Tokens");
    Ok(())
}

#[tokio::test]
async fn test_summarizer_rejects_answer_without_block() -> anyhow::Result<()> {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/messages"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "content": [{ "type": "text", "text": "I could not find any themes." }]
        })))
        .mount(&server)
        .await;

    let summarizer = AnthropicSummarizer::from_config(&summarizer_config(&server))?
        .expect("api key configured");
    assert!(summarizer.summarize("A,B").await.is_err());
    Ok(())
}

#[tokio::test]
async fn test_summarizer_without_key_is_disabled() -> anyhow::Result<()> {
    assert!(AnthropicSummarizer::from_config(&SummarizerConfig::default())?.is_none());
    Ok(())
}

#[tokio::test]
async fn test_theme_reducer_persists_all_and_returns_top() -> anyhow::Result<()> {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/messages"))
        .and(body_string_contains("<examples>"))
        .and(body_string_contains("Noodle,Bar,Foo,NOODLE,BAR,FOO"))
        .respond_with(ResponseTemplate::new(200).set_body_json(themed_answer(
            r#"{"Pairs": ["Foo", "Bar"], "Triples": ["Noodle", "Taco", "Coke"], "Single": ["Solo"]}"#,
        )))
        .expect(1)
        .mount(&server)
        .await;

    let store = SqliteTokenStore::in_memory().await?;
    for (address, name) in [("0x1", "Foo"), ("0x2", "Bar"), ("0x3", "Noodle")] {
        let token = TokenRecord {
            contract_address: Some(address.to_string()),
            name: Some(name.to_string()),
            symbol: Some(name.to_uppercase()),
            ..Default::default()
        };
        store.save_token(&token, None).await?;
    }

    let summarizer = AnthropicSummarizer::from_config(&summarizer_config(&server))?
        .expect("api key configured");
    let reducer = ThemeReducer::new(store.clone(), Arc::new(summarizer));
    let top = reducer
        .reduce_since(Utc::now() - Duration::hours(1), 2, true)
        .await?;

    let names: Vec<_> = top.iter().map(|t| t.name.as_str()).collect();
    assert_eq!(names, vec!["Triples", "Pairs"]);

    let stored = store.get_themes().await?;
    assert_eq!(stored.len(), 3);
    assert_eq!(stored[0].name, "Triples");
    Ok(())
}
