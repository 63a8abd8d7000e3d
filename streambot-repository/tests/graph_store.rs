//! Integration tests for the graph store and subscription service.
//!
//! These run the real `GraphStore` against the in-memory backend.

use std::sync::Arc;

use streambot_repository::identity::is_generated_id;
use streambot_repository::{GraphStore, GraphStoreConfig, MemoryGraph, StoreError, SubscriptionService};
use streambot_shared::{Channel, ExternalId, Subscription};

fn setup() -> (Arc<MemoryGraph>, SubscriptionService) {
    let graph = Arc::new(MemoryGraph::new());
    let service = SubscriptionService::new(GraphStore::new(graph.clone()));
    (graph, service)
}

#[tokio::test]
async fn saved_channel_can_be_fetched_by_external_id() {
    let (_graph, service) = setup();

    for name in ["alpha", "Beta Channel", "ünïcødé", "it's \"quoted\""] {
        let id = service.create_channel(name).await.unwrap();
        assert!(is_generated_id(id.as_str()), "unexpected id format: {}", id);

        let channel = service.get_channel(&id).await.unwrap();
        assert_eq!(channel.id, id);
        assert_eq!(channel.name, name);
    }
}

#[tokio::test]
async fn unknown_channel_is_not_found() {
    let (_graph, service) = setup();

    let result = service
        .get_channel(&ExternalId::new("4f7c2f0e-1111-4222-8333-444455556666"))
        .await;

    assert!(matches!(result, Err(StoreError::NotFound(_))));
}

#[tokio::test]
async fn subscribing_twice_creates_one_edge() {
    let (graph, service) = setup();
    let a = service.create_channel("a").await.unwrap();
    let b = service.create_channel("b").await.unwrap();

    service.subscribe(&a, &b, 1000).await.unwrap();
    service.subscribe(&a, &b, 1000).await.unwrap();

    assert_eq!(graph.subscription_count(&a, &b), 1);
    assert_eq!(graph.total_edge_count(), 1);
}

#[tokio::test]
async fn concurrent_subscriptions_for_the_same_pair_create_one_edge() {
    let graph = Arc::new(MemoryGraph::new());
    let service = Arc::new(SubscriptionService::new(GraphStore::new(graph.clone())));
    let a = service.create_channel("a").await.unwrap();
    let b = service.create_channel("b").await.unwrap();

    let handles: Vec<_> = (0..16)
        .map(|i| {
            let service = Arc::clone(&service);
            let (a, b) = (a.clone(), b.clone());
            tokio::spawn(async move { service.subscribe(&a, &b, 1000 + i).await })
        })
        .collect();
    for handle in handles {
        handle.await.unwrap().unwrap();
    }

    assert_eq!(graph.subscription_count(&a, &b), 1);
}

#[tokio::test]
async fn subscription_to_missing_channel_is_dangling_and_writes_nothing() {
    let (graph, service) = setup();
    let a = service.create_channel("a").await.unwrap();
    let missing = ExternalId::new("00000000-0000-4000-8000-000000000000");

    match service.subscribe(&a, &missing, 1000).await {
        Err(StoreError::DanglingReference(id)) => assert_eq!(id, missing),
        other => panic!("expected DanglingReference, got {:?}", other),
    }
    match service.subscribe(&missing, &a, 1000).await {
        Err(StoreError::DanglingReference(id)) => assert_eq!(id, missing),
        other => panic!("expected DanglingReference, got {:?}", other),
    }

    assert_eq!(graph.script_evaluations(), 0);
    assert_eq!(graph.total_edge_count(), 0);
}

#[tokio::test]
async fn channel_without_subscriptions_has_empty_list() {
    let (_graph, service) = setup();
    let a = service.create_channel("lonely").await.unwrap();

    let subscriptions = service.transitive_subscriptions(&a).await.unwrap();

    assert!(subscriptions.is_empty());
}

#[tokio::test]
async fn transitive_subscriptions_of_missing_channel_is_not_found() {
    let (_graph, service) = setup();

    let result = service
        .transitive_subscriptions(&ExternalId::new("missing"))
        .await;

    assert!(matches!(result, Err(StoreError::NotFound(_))));
}

#[tokio::test]
async fn cyclic_subscriptions_terminate_and_list_each_channel_once() {
    let (_graph, service) = setup();
    let a = service.create_channel("a").await.unwrap();
    let b = service.create_channel("b").await.unwrap();
    let c = service.create_channel("c").await.unwrap();
    service.subscribe(&a, &b, 1).await.unwrap();
    service.subscribe(&b, &a, 2).await.unwrap();
    service.subscribe(&b, &c, 3).await.unwrap();
    service.subscribe(&c, &a, 4).await.unwrap();

    let from_a = service.transitive_subscriptions(&a).await.unwrap();
    let from_b = service.transitive_subscriptions(&b).await.unwrap();

    assert_eq!(
        from_a,
        vec![Channel::new(b.clone(), "b"), Channel::new(c.clone(), "c")]
    );
    let mut names: Vec<_> = from_b.into_iter().map(|c| c.name).collect();
    names.sort();
    assert_eq!(names, vec!["a", "c"]);
}

#[tokio::test]
async fn traversal_stops_at_depth_bound() {
    let graph = Arc::new(MemoryGraph::new());
    let store = GraphStore::with_config(graph.clone(), GraphStoreConfig::with_max_traversal_depth(2));
    let ids: Vec<ExternalId> = {
        let mut ids = Vec::new();
        for name in ["a", "b", "c", "d"] {
            ids.push(store.save_channel(name).await.unwrap());
        }
        ids
    };
    for pair in ids.windows(2) {
        store
            .save_subscription(&Subscription::new(pair[0].clone(), pair[1].clone(), 0))
            .await
            .unwrap();
    }

    let reached = store.get_transitive_subscriptions(&ids[0]).await.unwrap();

    let names: Vec<_> = reached.into_iter().map(|c| c.name).collect();
    assert_eq!(names, vec!["b", "c"]);
}

#[tokio::test]
async fn alpha_beta_scenario() {
    let (_graph, service) = setup();

    let x = service.create_channel("alpha").await.unwrap();
    let y = service.create_channel("beta").await.unwrap();
    service.subscribe(&x, &y, 1000).await.unwrap();

    assert_eq!(
        service.transitive_subscriptions(&x).await.unwrap(),
        vec![Channel::new(y.clone(), "beta")]
    );
    assert_eq!(
        service.get_channel(&x).await.unwrap(),
        Channel::new(x.clone(), "alpha")
    );
}

#[tokio::test]
async fn backend_outage_surfaces_as_unreachable() {
    let (graph, service) = setup();
    let a = service.create_channel("a").await.unwrap();
    graph.set_unavailable(true);

    assert!(matches!(
        service.get_channel(&a).await,
        Err(StoreError::BackendUnreachable(_))
    ));
    assert!(matches!(
        service.transitive_subscriptions(&a).await,
        Err(StoreError::BackendUnreachable(_))
    ));
}
