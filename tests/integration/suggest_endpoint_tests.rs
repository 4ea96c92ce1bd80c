//! Integration tests for `POST /suggested-recipes`.
//!
//! Validates generation success, the two-ingredient minimum, and the
//! degrade-to-empty contract on orchestrator failure.

use serde_json::json;

use super::test_helpers::{spawn_server, test_recipe};

#[tokio::test]
async fn generation_returns_recipes_and_populates_cache() {
    let harness = spawn_server().await;
    harness
        .orchestrator
        .push_response(Ok(vec![test_recipe("r1", &["Broccoli", "Salt"])]));

    let resp = reqwest::Client::new()
        .post(format!("{}/suggested-recipes", harness.base_url))
        .json(&json!({"cart_items": ["Broccoli", "Salt"], "session_id": "s1"}))
        .send()
        .await
        .expect("POST /suggested-recipes");

    assert_eq!(resp.status(), 200);
    let recipes: serde_json::Value = resp.json().await.expect("json body");
    assert_eq!(recipes.as_array().expect("array").len(), 1);
    assert_eq!(recipes[0]["recipe_id"], "r1");

    // The generation is now addressable through the cache.
    assert!(harness.state.engine.cache().get("s1", "r1").is_some());

    harness.ct.cancel();
}

#[tokio::test]
async fn fewer_than_two_ingredients_returns_empty_without_calling_orchestrator() {
    let harness = spawn_server().await;

    let resp = reqwest::Client::new()
        .post(format!("{}/suggested-recipes", harness.base_url))
        .json(&json!({"cart_items": ["Broccoli"], "session_id": "s1"}))
        .send()
        .await
        .expect("POST /suggested-recipes");

    assert_eq!(resp.status(), 200);
    let recipes: serde_json::Value = resp.json().await.expect("json body");
    assert!(recipes.as_array().expect("array").is_empty());
    assert_eq!(harness.orchestrator.suggest_calls(), 0);

    harness.ct.cancel();
}

#[tokio::test]
async fn orchestrator_failure_degrades_to_empty_with_200() {
    let harness = spawn_server().await;
    harness
        .orchestrator
        .push_response(Err("model overloaded".to_owned()));

    let resp = reqwest::Client::new()
        .post(format!("{}/suggested-recipes", harness.base_url))
        .json(&json!({"cart_items": ["Broccoli", "Salt"], "session_id": "s1"}))
        .send()
        .await
        .expect("POST /suggested-recipes");

    assert_eq!(resp.status(), 200);
    let recipes: serde_json::Value = resp.json().await.expect("json body");
    assert!(recipes.as_array().expect("array").is_empty());

    harness.ct.cancel();
}

#[tokio::test]
async fn failed_generation_leaves_previous_cache_entry_intact() {
    let harness = spawn_server().await;
    harness
        .orchestrator
        .push_response(Ok(vec![test_recipe("r1", &["Broccoli", "Salt"])]));
    harness
        .orchestrator
        .push_response(Err("model overloaded".to_owned()));

    let client = reqwest::Client::new();
    let body = json!({"cart_items": ["Broccoli", "Salt"], "session_id": "s1"});

    let first = client
        .post(format!("{}/suggested-recipes", harness.base_url))
        .json(&body)
        .send()
        .await
        .expect("first generation");
    assert_eq!(first.status(), 200);

    let second = client
        .post(format!("{}/suggested-recipes", harness.base_url))
        .json(&body)
        .send()
        .await
        .expect("second generation");
    assert_eq!(second.status(), 200);

    // The failed regenerate must not clobber the previous generation.
    assert!(harness.state.engine.cache().get("s1", "r1").is_some());

    harness.ct.cancel();
}
