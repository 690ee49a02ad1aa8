/// End-to-end thread loading over HTTP with a SQLite-backed handle cache
use httpmock::prelude::*;
use skythread::{
    store::StoreOptions, ApiClient, HandleCache, SqliteKvStore, ThreadLoader,
};
use std::sync::Arc;

async fn loader_for(server: &MockServer, store: &SqliteKvStore) -> ThreadLoader {
    let api = ApiClient::with_http(&server.base_url(), reqwest::Client::new());
    let handles = Arc::new(HandleCache::new(Arc::new(store.clone())));
    ThreadLoader::new(Arc::new(api), handles)
}

#[tokio::test]
async fn test_resolution_survives_restart() {
    let server = MockServer::start_async().await;
    let resolve = server
        .mock_async(|when, then| {
            when.method(GET)
                .path("/xrpc/com.atproto.identity.resolveHandle")
                .query_param("handle", "alice.test");
            then.status(200)
                .header("content-type", "application/json")
                .body(r#"{"did":"did:plc:alice"}"#);
        })
        .await;
    let thread = server
        .mock_async(|when, then| {
            when.method(GET)
                .path("/xrpc/app.bsky.feed.getPostThread")
                .query_param("uri", "at://did:plc:alice/app.bsky.feed.post/abc123")
                .query_param("depth", "10");
            then.status(200)
                .header("content-type", "application/json")
                .body(r#"{"thread":{"$type":"app.bsky.feed.defs#threadViewPost","replies":[]}}"#);
        })
        .await;

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("skythread.sqlite");

    let store = SqliteKvStore::open(&path, StoreOptions::default()).await.unwrap();
    let loader = loader_for(&server, &store).await;
    let doc = loader
        .load_thread_by_url("https://bsky.app/profile/alice.test/post/abc123")
        .await
        .unwrap();
    assert_eq!(doc["thread"]["replies"], serde_json::json!([]));
    store.close().await;

    // Fresh process: the handle comes from disk, not the network
    let store = SqliteKvStore::open(&path, StoreOptions::default()).await.unwrap();
    let loader = loader_for(&server, &store).await;
    loader.load_thread_by_id("alice.test", "abc123").await.unwrap();

    resolve.assert_hits_async(1).await;
    thread.assert_hits_async(2).await;
}

#[tokio::test]
async fn test_composed_post_over_http() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(GET)
                .path("/xrpc/com.atproto.repo.getRecord")
                .query_param("repo", "did:plc:bob")
                .query_param("collection", "app.bsky.feed.post")
                .query_param("rkey", "3k");
            then.status(200)
                .header("content-type", "application/json")
                .body(r#"{"uri":"at://did:plc:bob/app.bsky.feed.post/3k","value":{"text":"hi"}}"#);
        })
        .await;
    let profile = server
        .mock_async(|when, then| {
            when.method(GET)
                .path("/xrpc/app.bsky.actor.getProfile")
                .query_param("actor", "did:plc:bob");
            then.status(200)
                .header("content-type", "application/json")
                .body(r#"{"did":"did:plc:bob","handle":"bob.test"}"#);
        })
        .await;

    let dir = tempfile::tempdir().unwrap();
    let store = SqliteKvStore::open(&dir.path().join("s.sqlite"), StoreOptions::default())
        .await
        .unwrap();
    let loader = loader_for(&server, &store).await;

    let composed = loader
        .load_raw_post_with_author("at://did:plc:bob/app.bsky.feed.post/3k")
        .await
        .unwrap();
    assert_eq!(composed.record["value"]["text"], "hi");
    assert_eq!(composed.author["handle"], "bob.test");

    // Second composition reuses the cached profile
    loader
        .load_raw_post_with_author("at://did:plc:bob/app.bsky.feed.post/3k")
        .await
        .unwrap();
    profile.assert_hits_async(1).await;

    assert_eq!(
        loader.identity().handle_for_did("did:plc:bob").await.unwrap(),
        Some("bob.test".to_string())
    );
}

#[tokio::test]
async fn test_profile_failure_rejects_composition() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(GET).path("/xrpc/com.atproto.repo.getRecord");
            then.status(200)
                .header("content-type", "application/json")
                .body(r#"{"value":{"text":"hi"}}"#);
        })
        .await;
    server
        .mock_async(|when, then| {
            when.method(GET).path("/xrpc/app.bsky.actor.getProfile");
            then.status(400)
                .header("content-type", "application/json")
                .body(r#"{"error":"AccountTakedown"}"#);
        })
        .await;

    let dir = tempfile::tempdir().unwrap();
    let store = SqliteKvStore::open(&dir.path().join("s.sqlite"), StoreOptions::default())
        .await
        .unwrap();
    let loader = loader_for(&server, &store).await;

    let err = loader
        .load_raw_post_with_author("at://did:plc:carol/app.bsky.feed.post/3k")
        .await
        .unwrap_err();

    assert_eq!(err.as_api().and_then(|e| e.error_name()), Some("AccountTakedown"));
}
