//! Refresh scheduler tests
//!
//! Run on a paused clock so the refresh timers fire as soon as the runtime
//! is idle.

mod common;

use std::sync::Arc;
use std::time::Duration;

use common::*;
use tokio::sync::watch;
use xrtree::relations::{TreeBuilder, TreeOptions};
use xrtree::{NodeStatus, RefreshIntervals, RefreshScheduler, TreeView};

const INTERVALS: RefreshIntervals = RefreshIntervals {
    full: Duration::from_secs(1000),
    targeted: Duration::from_secs(15),
};

fn start(client: &Arc<FakeClient>) -> xrtree::SchedulerHandle {
    let builder = TreeBuilder::new(client.clone(), TreeOptions::default());
    RefreshScheduler::new(builder, INTERVALS).spawn()
}

async fn wait_for(
    view: &mut watch::Receiver<TreeView>,
    done: impl Fn(&TreeView) -> bool,
) -> TreeView {
    tokio::time::timeout(Duration::from_secs(3600), async {
        loop {
            {
                let current = view.borrow_and_update();
                if done(&*current) {
                    return (*current).clone();
                }
            }
            view.changed().await.unwrap();
        }
    })
    .await
    .unwrap()
}

fn has_roots(view: &TreeView) -> bool {
    !view.forest.roots().is_empty()
}

/// One ready root with a single bucket that is still being created
fn seed(client: &FakeClient) {
    client.set(bucket("b1").with_condition("Ready", "False", "Creating"));
    client.set_roots(
        "xinstances",
        vec![
            xinstance("foo")
                .with_condition("Ready", "True", "Available")
                .with_resource_ref(bucket_ref("b1")),
        ],
    );
}

#[tokio::test(start_paused = true)]
async fn test_targeted_refresh_updates_node_in_place() {
    let client = Arc::new(FakeClient::new());
    seed(&client);

    let handle = start(&client);
    let mut view = handle.subscribe();
    let initial = wait_for(&mut view, has_roots).await;

    let root = initial.forest.roots()[0];
    let b1 = initial.forest.entry(root).unwrap().children[0];
    assert_eq!(
        initial.forest.to_tree(b1).unwrap().status().0,
        NodeStatus::NotReady
    );

    assert!(handle.expand(root));
    wait_for(&mut view, |v| v.forest.entry(root).is_some_and(|e| e.expanded)).await;

    client.set(bucket("b1").with_condition("Ready", "True", "Available"));

    let updated = wait_for(&mut view, |v| {
        v.forest
            .to_tree(b1)
            .is_some_and(|n| n.status().0 == NodeStatus::Ok)
    })
    .await;

    assert_eq!(updated.forest.roots(), &[root]);
    assert_eq!(updated.forest.entry(root).unwrap().children, vec![b1]);
    assert!(updated.forest.entry(root).unwrap().expanded);
    assert_eq!(client.list_calls.load(std::sync::atomic::Ordering::SeqCst), 4);
}

#[tokio::test(start_paused = true)]
async fn test_ready_nodes_are_left_alone() {
    let client = Arc::new(FakeClient::new());
    client.set(bucket("b1").with_condition("Ready", "True", "Available"));
    client.set_roots(
        "xinstances",
        vec![
            xinstance("foo")
                .with_condition("Ready", "True", "Available")
                .with_resource_ref(bucket_ref("b1")),
        ],
    );

    let handle = start(&client);
    let mut view = handle.subscribe();
    wait_for(&mut view, has_roots).await;
    assert_eq!(client.total_gets(), 1);

    tokio::time::sleep(INTERVALS.targeted * 4).await;
    assert_eq!(client.total_gets(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_focus_follows_refreshes() {
    let client = Arc::new(FakeClient::new());
    seed(&client);

    let handle = start(&client);
    let mut view = handle.subscribe();
    wait_for(&mut view, has_roots).await;

    let key = bucket_ref("b1").key();
    handle.focus(Some(key.clone()));
    let focused = wait_for(&mut view, |v| v.focused.is_some()).await;
    assert_eq!(focused.focused.as_ref(), Some(&key));
    assert!(!focused.focused_resource.unwrap().is_ready());

    client.set(bucket("b1").with_condition("Ready", "True", "Available"));
    wait_for(&mut view, |v| {
        v.focused_resource.as_ref().is_some_and(|r| r.is_ready())
    })
    .await;

    handle.focus(None);
    let cleared = wait_for(&mut view, |v| v.focused.is_none()).await;
    assert!(cleared.focused_resource.is_none());
}

#[tokio::test(start_paused = true)]
async fn test_collapse_keeps_children() {
    let client = Arc::new(FakeClient::new());
    seed(&client);

    let handle = start(&client);
    let mut view = handle.subscribe();
    let initial = wait_for(&mut view, has_roots).await;
    let root = initial.forest.roots()[0];

    handle.expand(root);
    wait_for(&mut view, |v| v.forest.entry(root).is_some_and(|e| e.expanded)).await;
    handle.collapse(root);
    let collapsed =
        wait_for(&mut view, |v| v.forest.entry(root).is_some_and(|e| !e.expanded)).await;

    assert_eq!(collapsed.forest.entry(root).unwrap().children.len(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_expansion_survives_full_rebuild() {
    let client = Arc::new(FakeClient::new());
    client.set(bucket("b1").with_condition("Ready", "True", "Available"));
    client.set(bucket("b2").with_condition("Ready", "True", "Available"));
    client.set(
        xinstance("shared")
            .with_condition("Ready", "True", "Available")
            .with_resource_ref(bucket_ref("b1")),
    );
    client.set_roots(
        "xinstances",
        vec![
            xinstance("foo")
                .with_condition("Ready", "True", "Available")
                .with_resource_ref(xinstance_ref("shared")),
        ],
    );

    let handle = start(&client);
    let mut view = handle.subscribe();
    let initial = wait_for(&mut view, has_roots).await;
    let root = initial.forest.roots()[0];
    let shared = initial.forest.entry(root).unwrap().children[0];
    assert!(!initial.forest.entry(shared).unwrap().loaded);

    handle.expand(root);
    handle.expand(shared);
    wait_for(&mut view, |v| {
        v.forest
            .entry(shared)
            .is_some_and(|e| e.expanded && e.children.len() == 1)
    })
    .await;

    client.set(
        xinstance("shared")
            .with_condition("Ready", "True", "Available")
            .with_resource_ref(bucket_ref("b1"))
            .with_resource_ref(bucket_ref("b2")),
    );
    handle.refresh_now();

    let rebuilt = wait_for(&mut view, |v| {
        v.forest
            .trees()
            .first()
            .and_then(|t| t.find(&xinstance_ref("shared").key()))
            .is_some_and(|n| n.expanded && n.children.len() == 2)
    })
    .await;

    let trees = rebuilt.forest.trees();
    let tree = &trees[0];
    assert!(tree.expanded);
    let titles: Vec<&str> = tree.children[0].children.iter().map(|c| c.title()).collect();
    assert_eq!(titles, vec!["b1", "b2"]);
}

#[tokio::test(start_paused = true)]
async fn test_expand_finishing_after_rebuild_opens_no_other_node() {
    let client = Arc::new(FakeClient::new());
    client.set(bucket("b1").with_condition("Ready", "True", "Available"));
    client.set(bucket("b2").with_condition("Ready", "True", "Available"));
    client.set(
        xinstance("shared")
            .with_condition("Ready", "True", "Available")
            .with_resource_ref(bucket_ref("b1")),
    );
    client.slow("Bucket", "b1", Duration::from_secs(100));
    client.set_roots(
        "xinstances",
        vec![
            xinstance("foo")
                .with_condition("Ready", "True", "Available")
                .with_resource_ref(xinstance_ref("shared")),
        ],
    );

    let handle = start(&client);
    let mut view = handle.subscribe();
    let initial = wait_for(&mut view, has_roots).await;
    let shared = initial.forest.entry(initial.forest.roots()[0]).unwrap().children[0];

    // The expansion waits on b1 while a rebuild with an extra root lands
    handle.expand(shared);
    client.set_roots(
        "xinstances",
        vec![
            xinstance("bar")
                .with_condition("Ready", "True", "Available")
                .with_resource_ref(bucket_ref("b2")),
            xinstance("foo")
                .with_condition("Ready", "True", "Available")
                .with_resource_ref(xinstance_ref("shared")),
        ],
    );
    handle.refresh_now();
    let rebuilt = wait_for(&mut view, |v| v.forest.roots().len() == 2).await;
    assert!(rebuilt.forest.entry(shared).is_none());

    let expanded = wait_for(&mut view, |v| {
        v.forest
            .trees()
            .iter()
            .find_map(|t| t.find(&xinstance_ref("shared").key()).cloned())
            .is_some_and(|n| n.loaded)
    })
    .await;

    let trees = expanded.forest.trees();
    let titles: Vec<&str> = trees.iter().map(|t| t.title()).collect();
    assert_eq!(titles, vec!["bar", "foo"]);
    for tree in &trees {
        assert!(!tree.expanded, "{} was opened", tree.title());
        for child in &tree.children {
            assert!(!child.expanded, "{} was opened", child.title());
        }
    }
    let spliced = trees[1].find(&xinstance_ref("shared").key()).unwrap();
    assert_eq!(spliced.children[0].title(), "b1");
}

#[tokio::test(start_paused = true)]
async fn test_failed_refetch_in_targeted_tick_is_isolated() {
    let client = Arc::new(FakeClient::new());
    client.set(bucket("b1").with_condition("Ready", "False", "Creating"));
    client.set(
        bucket("b2")
            .with_condition("Ready", "False", "Creating")
            .with_resource_ref(bucket_ref("b3")),
    );
    client.set(bucket("b3").with_condition("Ready", "True", "Available"));
    client.set_roots(
        "xinstances",
        vec![
            xinstance("foo")
                .with_condition("Ready", "True", "Available")
                .with_resource_ref(bucket_ref("b1"))
                .with_resource_ref(bucket_ref("b2")),
        ],
    );

    let handle = start(&client);
    let mut view = handle.subscribe();
    let initial = wait_for(&mut view, has_roots).await;
    let root = initial.forest.roots()[0];
    let children = initial.forest.entry(root).unwrap().children.clone();
    let (b1, b2) = (children[0], children[1]);

    handle.expand(b2);
    wait_for(&mut view, |v| {
        v.forest
            .entry(b2)
            .is_some_and(|e| e.loaded && e.children.len() == 1)
    })
    .await;

    client.set(bucket("b1").with_condition("Ready", "True", "Available"));
    client.fail(
        "Bucket",
        "b2",
        xrtree::FetchError::Network("connection refused".to_string()),
    );

    let after_tick = wait_for(&mut view, |v| {
        v.forest.resource_of(b2).is_some_and(|r| r.is_placeholder())
            && v.forest
                .to_tree(b1)
                .is_some_and(|n| n.status().0 == NodeStatus::Ok)
    })
    .await;
    assert_eq!(after_tick.forest.entry(root).unwrap().children, vec![b1, b2]);

    // Keeps retrying b2 without dropping what was below it
    tokio::time::sleep(INTERVALS.targeted * 5).await;
    let current = handle.current();
    assert!(current.forest.resource_of(b2).unwrap().is_placeholder());
    assert_eq!(current.forest.to_tree(b2).unwrap().children[0].title(), "b3");
    assert!(client.calls_for("Bucket", "b2") >= 6);

    client.set(
        bucket("b2")
            .with_condition("Ready", "True", "Available")
            .with_resource_ref(bucket_ref("b3")),
    );
    let recovered = wait_for(&mut view, |v| {
        v.forest.resource_of(b2).is_some_and(|r| r.is_ready())
    })
    .await;
    let node = recovered.forest.to_tree(b2).unwrap();
    assert_eq!(node.children.len(), 1);
    assert_eq!(node.children[0].title(), "b3");
}

#[tokio::test(start_paused = true)]
async fn test_zero_intervals_fall_back_to_defaults() {
    let client = Arc::new(FakeClient::new());
    seed(&client);

    let builder = TreeBuilder::new(client.clone(), TreeOptions::default());
    let zero = RefreshIntervals {
        full: Duration::ZERO,
        targeted: Duration::ZERO,
    };
    assert_eq!(zero.or_default(), RefreshIntervals::default());

    let handle = RefreshScheduler::new(builder, zero).spawn();
    let mut view = handle.subscribe();
    let ready = wait_for(&mut view, has_roots).await;
    assert_eq!(ready.forest.roots().len(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_shutdown_discards_late_results() {
    let client = Arc::new(FakeClient::new().with_delay(Duration::from_secs(10)));
    seed(&client);

    let handle = start(&client);
    let mut view = handle.subscribe();

    // Let the first rebuild start fetching before stopping
    for _ in 0..5 {
        tokio::task::yield_now().await;
    }
    handle.shutdown();

    tokio::time::sleep(Duration::from_secs(30)).await;
    assert!(view.changed().await.is_err());
    assert!(view.borrow().forest.is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_dropped_handle_stops_scheduler() {
    let client = Arc::new(FakeClient::new());
    seed(&client);

    let handle = start(&client);
    let mut view = handle.subscribe();
    wait_for(&mut view, has_roots).await;
    let gets = client.total_gets();

    drop(handle);
    tokio::time::sleep(INTERVALS.targeted * 4).await;

    assert_eq!(client.total_gets(), gets);
    assert!(view.changed().await.is_err());
}
