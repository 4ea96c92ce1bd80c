//! Integration tests for the suggestion schedulers: the image poller and
//! the debounced regenerate view.

use std::time::Duration;

use super::test_helpers::{test_config, test_recipe, test_state};

#[tokio::test]
async fn image_poller_fills_late_arriving_image() {
    let harness = test_state(test_config());
    harness.cart.set_items(vec![("P1", 1), ("P2", 1)]);
    harness.catalog.set_name("P1", "Broccoli");
    harness.catalog.set_name("P2", "Salt");

    // First call (the generation) returns no image; the poller's retry
    // finds one.
    let bare = test_recipe("r1", &["Broccoli", "Salt"]);
    let mut with_image = bare.clone();
    with_image.image_data = Some("aGVsbG8=".to_owned());
    harness.orchestrator.push_response(Ok(vec![bare]));
    harness.orchestrator.push_response(Ok(vec![with_image]));

    let ingredients = vec!["Broccoli".to_owned(), "Salt".to_owned()];
    let recipes = harness.state.engine.generate("s1", &ingredients).await;
    assert_eq!(recipes.len(), 1);
    assert!(recipes[0].image_data.is_none());

    // poll_interval_seconds is 1 in the test config.
    tokio::time::sleep(Duration::from_millis(1600)).await;

    let cached = harness.state.engine.cache().get("s1", "r1").expect("cached");
    assert_eq!(cached.image_data.as_deref(), Some("aGVsbG8="));

    harness.ct.cancel();
}

#[tokio::test]
async fn failed_poll_doubles_next_wait_then_resumes() {
    let harness = test_state(test_config());

    // Generation returns no image, the first poll fails, the second
    // succeeds. With a 1s interval the failure pushes the second poll
    // from ~2s out to ~3s after generation.
    let bare = test_recipe("r1", &["Broccoli", "Salt"]);
    let mut with_image = bare.clone();
    with_image.image_data = Some("aGVsbG8=".to_owned());
    harness.orchestrator.push_response(Ok(vec![bare]));
    harness
        .orchestrator
        .push_response(Err("image pipeline hiccup".to_owned()));
    harness.orchestrator.push_response(Ok(vec![with_image]));

    let ingredients = vec!["Broccoli".to_owned(), "Salt".to_owned()];
    let _ = harness.state.engine.generate("s1", &ingredients).await;

    // At ~2.3s the image must still be missing: the post-failure wait is
    // doubled, so the retry has not run yet.
    tokio::time::sleep(Duration::from_millis(2300)).await;
    assert!(
        harness
            .state
            .engine
            .cache()
            .get("s1", "r1")
            .expect("cached")
            .image_data
            .is_none(),
        "retry after a failure must wait twice the interval"
    );

    // By ~3.8s the retry has run and applied the image.
    tokio::time::sleep(Duration::from_millis(1500)).await;
    let cached = harness.state.engine.cache().get("s1", "r1").expect("cached");
    assert_eq!(cached.image_data.as_deref(), Some("aGVsbG8="));

    harness.ct.cancel();
}

#[tokio::test]
async fn failed_attempts_consume_budget() {
    let harness = test_state(test_config());

    // Every poll fails. poll_attempts is 3, so the poller gives up after
    // three failed attempts: one generation call plus three polls.
    let bare = test_recipe("r1", &["Broccoli", "Salt"]);
    harness.orchestrator.push_response(Ok(vec![bare]));
    for _ in 0..3 {
        harness
            .orchestrator
            .push_response(Err("image pipeline down".to_owned()));
    }

    let ingredients = vec!["Broccoli".to_owned(), "Salt".to_owned()];
    let _ = harness.state.engine.generate("s1", &ingredients).await;

    // Failure-doubled waits put the attempts at ~1s, ~3s, and ~5s.
    tokio::time::sleep(Duration::from_millis(6200)).await;
    assert_eq!(
        harness.orchestrator.suggest_calls(),
        4,
        "each failed attempt must consume budget"
    );

    tokio::time::sleep(Duration::from_millis(1500)).await;
    assert_eq!(
        harness.orchestrator.suggest_calls(),
        4,
        "no further polls after three failed attempts"
    );

    harness.ct.cancel();
}

#[tokio::test]
async fn finished_poller_releases_its_tracking_entry() {
    let harness = test_state(test_config());

    let bare = test_recipe("r1", &["Broccoli", "Salt"]);
    let mut with_image = bare.clone();
    with_image.image_data = Some("aW1n".to_owned());
    harness.orchestrator.push_response(Ok(vec![bare]));
    harness.orchestrator.push_response(Ok(vec![with_image]));

    let ingredients = vec!["Broccoli".to_owned(), "Salt".to_owned()];
    let _ = harness.state.engine.generate("s1", &ingredients).await;
    assert!(harness.state.engine.has_active_poller("s1"));

    // The first poll (~1s) applies the image and the poller exits; its
    // tracking entry must go with it even though the session never
    // regenerates.
    tokio::time::sleep(Duration::from_millis(2000)).await;
    assert!(
        !harness.state.engine.has_active_poller("s1"),
        "a completed poller must not stay tracked"
    );

    harness.ct.cancel();
}

#[tokio::test]
async fn poller_stops_after_attempt_budget() {
    let harness = test_state(test_config());

    // Generation succeeds without an image and every poll keeps returning
    // the imageless recipe (the fallback).
    let bare = test_recipe("r1", &["Broccoli", "Salt"]);
    harness.orchestrator.push_response(Ok(vec![bare.clone()]));
    harness.orchestrator.set_fallback(vec![bare]);

    let ingredients = vec!["Broccoli".to_owned(), "Salt".to_owned()];
    let _ = harness.state.engine.generate("s1", &ingredients).await;

    // poll_attempts is 3: one generation call plus at most three polls.
    tokio::time::sleep(Duration::from_millis(4500)).await;
    let calls_after_budget = harness.orchestrator.suggest_calls();
    assert!(
        calls_after_budget <= 4,
        "poller must stop after its budget, saw {calls_after_budget} calls"
    );

    tokio::time::sleep(Duration::from_millis(1200)).await;
    assert_eq!(
        harness.orchestrator.suggest_calls(),
        calls_after_budget,
        "no further polls after the budget is exhausted"
    );

    harness.ct.cancel();
}

#[tokio::test]
async fn new_generation_cancels_previous_poller() {
    let harness = test_state(test_config());

    let bare = test_recipe("r1", &["Broccoli", "Salt"]);
    let mut with_image = test_recipe("r2", &["Broccoli", "Salt"]);
    with_image.image_data = Some("aW1n".to_owned());
    harness.orchestrator.push_response(Ok(vec![bare]));
    harness.orchestrator.push_response(Ok(vec![with_image]));

    let ingredients = vec!["Broccoli".to_owned(), "Salt".to_owned()];
    let _ = harness.state.engine.generate("s1", &ingredients).await;
    // Second generation is fully imaged: no new poller, and the first
    // generation's poller is cancelled.
    let _ = harness.state.engine.generate("s1", &ingredients).await;

    let calls_now = harness.orchestrator.suggest_calls();
    assert_eq!(calls_now, 2);

    tokio::time::sleep(Duration::from_millis(2500)).await;
    assert_eq!(
        harness.orchestrator.suggest_calls(),
        2,
        "cancelled poller must not keep polling"
    );

    harness.ct.cancel();
}

#[tokio::test]
async fn burst_of_cart_changes_regenerates_once() {
    let harness = test_state(test_config());
    harness.cart.set_items(vec![("P1", 1), ("P2", 1)]);
    harness.catalog.set_name("P1", "Broccoli");
    harness.catalog.set_name("P2", "Salt");

    // Fully imaged so no poller muddies the call count.
    let mut imaged = test_recipe("r1", &["Broccoli", "Salt"]);
    imaged.image_data = Some("aW1n".to_owned());
    harness.orchestrator.set_fallback(vec![imaged]);

    let view_id = harness.state.engine.mount_view("s1");

    // Three changes inside one quiescence window (150ms).
    for _ in 0..3 {
        harness.state.engine.notify_cart_change("s1");
        tokio::time::sleep(Duration::from_millis(30)).await;
    }

    tokio::time::sleep(Duration::from_millis(600)).await;
    assert_eq!(
        harness.orchestrator.suggest_calls(),
        1,
        "a burst of changes must coalesce into one regenerate"
    );

    harness.state.engine.unmount_view("s1", view_id);
    harness.ct.cancel();
}

#[tokio::test]
async fn unmounted_view_ignores_cart_changes() {
    let harness = test_state(test_config());
    harness.cart.set_items(vec![("P1", 1), ("P2", 1)]);
    harness.catalog.set_name("P1", "Broccoli");
    harness.catalog.set_name("P2", "Salt");

    let view_id = harness.state.engine.mount_view("s1");
    harness.state.engine.unmount_view("s1", view_id);

    harness.state.engine.notify_cart_change("s1");
    tokio::time::sleep(Duration::from_millis(400)).await;
    assert_eq!(harness.orchestrator.suggest_calls(), 0);

    harness.ct.cancel();
}

#[tokio::test]
async fn stale_unmount_leaves_new_view_active() {
    let harness = test_state(test_config());
    harness.cart.set_items(vec![("P1", 1), ("P2", 1)]);
    harness.catalog.set_name("P1", "Broccoli");
    harness.catalog.set_name("P2", "Salt");

    let mut imaged = test_recipe("r1", &["Broccoli", "Salt"]);
    imaged.image_data = Some("aW1n".to_owned());
    harness.orchestrator.set_fallback(vec![imaged]);

    let stale_id = harness.state.engine.mount_view("s1");
    let current_id = harness.state.engine.mount_view("s1");

    // A late unmount from the displaced connection must not tear down the
    // replacement view.
    harness.state.engine.unmount_view("s1", stale_id);

    harness.state.engine.notify_cart_change("s1");
    tokio::time::sleep(Duration::from_millis(600)).await;
    assert_eq!(harness.orchestrator.suggest_calls(), 1);

    harness.state.engine.unmount_view("s1", current_id);
    harness.ct.cancel();
}
