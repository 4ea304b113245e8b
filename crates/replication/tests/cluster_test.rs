//! Cluster behavior on the in-process transport.
//!
//! # Test Strategy
//!
//! 1. **Single node**: write, overwrite, read, missing keys
//! 2. **Coordination**: routing to the owner, replicas, cross-node reads
//! 3. **Topology changes**: joins move keys, resize drops stale replicas
//! 4. **Failures**: failed calls mark peers dead, reads and writes continue
//! 5. **Discovery**: transitive joins, idempotent reconciliation
//! 6. **Concurrency**: writes racing handoffs and joins

use async_trait::async_trait;
use corelib::partitioner::default_partitioner;
use corelib::{Error, HashRing, MembershipChange, NodeId, NodeState};
use replication::{
    ClusterNode, ForwardKind, MemoryTransport, NodeOptions, PeerTransport, ReplicationError,
    TransportError, Version, Versioned,
};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, OnceLock, Weak};

type Node = Arc<ClusterNode<MemoryTransport>>;

fn id(s: &str) -> NodeId {
    NodeId::parse(s).unwrap()
}

fn spawn(net: &Arc<MemoryTransport>, name: &str) -> Node {
    net.spawn(NodeOptions::new(id(&format!("http://{name}.test:7000"))))
}

/// Preference list of `key` on a ring made of `members`, as every node with
/// the default ring settings computes it.
fn expected(members: &[&Node], key: &str, n: usize) -> Vec<NodeId> {
    let ring = HashRing::from_nodes(
        members.iter().map(|node| node.local_id().clone()),
        1,
        default_partitioner(),
    );
    ring.preference_list(key, n).unwrap()
}

fn find_key(pred: impl Fn(&str) -> bool) -> String {
    (0..100_000)
        .map(|i| format!("key-{i}"))
        .find(|key| pred(key))
        .expect("no key matches")
}

fn permutations(items: &[usize]) -> Vec<Vec<usize>> {
    if items.len() <= 1 {
        return vec![items.to_vec()];
    }
    let mut out = Vec::new();
    for i in 0..items.len() {
        let mut rest = items.to_vec();
        let first = rest.remove(i);
        for mut tail in permutations(&rest) {
            tail.insert(0, first);
            out.push(tail);
        }
    }
    out
}

/// Assigns roles to `nodes` so that some key satisfies `fits`. Scenarios
/// that need nodes in a given clockwise order depend on where addresses
/// hash to, so every ordering is tried.
fn arrange(nodes: &[Node], fits: impl Fn(&[&Node], &str) -> bool) -> (Vec<Node>, String) {
    let indices: Vec<usize> = (0..nodes.len()).collect();
    for order in permutations(&indices) {
        let roles: Vec<&Node> = order.iter().map(|&i| &nodes[i]).collect();
        let found = (0..20_000)
            .map(|i| format!("key-{i}"))
            .find(|key| fits(&roles, key));
        if let Some(key) = found {
            return (roles.into_iter().cloned().collect(), key);
        }
    }
    panic!("no arrangement of the nodes fits");
}

fn holders(nodes: &[&Node], key: &str) -> Vec<NodeId> {
    nodes
        .iter()
        .filter(|node| node.store().contains(key))
        .map(|node| node.local_id().clone())
        .collect()
}

// ============================================================================
// Single Node
// ============================================================================

#[tokio::test]
async fn test_write_then_read_single_node() {
    let net = MemoryTransport::new();
    let a = spawn(&net, "a");

    let report = a.write("mykey", "bar").await.unwrap();
    assert!(report.stored_locally);
    assert_eq!(report.copies(), 1);
    assert!(report.outcomes.is_empty());
    assert_eq!(a.read("mykey").await.unwrap().as_deref(), Some("bar"));

    a.write("mykey", "baz").await.unwrap();
    assert_eq!(a.read("mykey").await.unwrap().as_deref(), Some("baz"));
    assert_eq!(a.store().len(), 1);
}

#[tokio::test]
async fn test_read_unknown_key() {
    let net = MemoryTransport::new();
    let a = spawn(&net, "a");
    assert_eq!(a.read("mykey").await.unwrap(), None);
}

#[tokio::test]
async fn test_join_self_is_rejected() {
    let net = MemoryTransport::new();
    let a = spawn(&net, "a");

    let err = a.join(&a.local_id().clone()).await.unwrap_err();
    assert!(matches!(err, ReplicationError::Ring(Error::InvalidNode(_))));
    assert_eq!(a.membership().len(), 1);
}

// ============================================================================
// Coordination
// ============================================================================

#[tokio::test]
async fn test_fetches_across_nodes() {
    let net = MemoryTransport::new();
    let a = spawn(&net, "a");
    let b = spawn(&net, "b");
    a.join(b.local_id()).await.unwrap();

    let key = find_key(|k| expected(&[&a, &b], k, 1)[0] == *b.local_id());

    let report = a.write(&key, "bar").await.unwrap();
    assert!(!report.stored_locally);
    assert_eq!(report.outcomes.len(), 1);
    assert_eq!(report.outcomes[0].kind, ForwardKind::Route);
    assert!(report.outcomes[0].is_success());
    assert_eq!(holders(&[&a, &b], &key), vec![b.local_id().clone()]);

    assert_eq!(b.read(&key).await.unwrap().as_deref(), Some("bar"));
    assert_eq!(a.read(&key).await.unwrap().as_deref(), Some("bar"));
}

#[tokio::test]
async fn test_replication_on_put() {
    let net = MemoryTransport::new();
    let a = spawn(&net, "a");
    let b = spawn(&net, "b");
    a.join(b.local_id()).await.unwrap();
    a.set_replication_factor(2).unwrap();

    let key = find_key(|k| expected(&[&a, &b], k, 1)[0] == *b.local_id());
    let report = a.write(&key, "bar").await.unwrap();

    assert!(report.stored_locally);
    assert_eq!(report.copies(), 2);
    assert!(a.store().contains(&key));
    assert!(b.store().contains(&key));
}

#[tokio::test]
async fn test_replicas_follow_preference_list() {
    let net = MemoryTransport::new();
    let nodes: Vec<Node> = ["a", "b", "c", "d"]
        .iter()
        .map(|name| spawn(&net, name))
        .collect();
    for node in &nodes[1..] {
        node.join(nodes[0].local_id()).await.unwrap();
    }
    for node in &nodes {
        node.set_replication_factor(2).unwrap();
    }

    let members: Vec<&Node> = nodes.iter().collect();
    for i in 0..40 {
        let key = format!("user:{i}");
        let entry = &nodes[i % nodes.len()];
        entry.write(&key, "v").await.unwrap();

        let mut want = expected(&members, &key, 2);
        let mut got = holders(&members, &key);
        want.sort();
        got.sort();
        assert_eq!(got, want, "key {key}");
    }
}

#[tokio::test]
async fn test_forwarded_write_is_not_routed_again() {
    let net = MemoryTransport::new();
    let a = spawn(&net, "a");
    let b = spawn(&net, "b");
    a.join(b.local_id()).await.unwrap();

    let key = find_key(|k| expected(&[&a, &b], k, 1)[0] == *b.local_id());
    let entry = Versioned::new("bar", Version::new(1, 0));
    let report = a.write_forwarded(&key, &entry).await.unwrap();

    assert!(!report.stored_locally);
    assert!(report
        .outcomes
        .iter()
        .all(|outcome| outcome.kind == ForwardKind::Replica));
    assert_eq!(holders(&[&a, &b], &key), vec![b.local_id().clone()]);
}

// ============================================================================
// Topology Changes
// ============================================================================

#[tokio::test]
async fn test_join_migrates_keys_to_new_owner() {
    let net = MemoryTransport::new();
    let a = spawn(&net, "a");
    let b = spawn(&net, "b");

    let keys: Vec<String> = (0..50).map(|i| format!("item-{i}")).collect();
    for key in &keys {
        a.write(key, "v").await.unwrap();
    }
    assert_eq!(a.store().len(), keys.len());

    b.join(a.local_id()).await.unwrap();

    for key in &keys {
        let owner = expected(&[&a, &b], key, 1);
        assert_eq!(holders(&[&a, &b], key), owner, "key {key}");
    }
}

#[tokio::test]
async fn test_move_keys() {
    let net = MemoryTransport::new();
    let nodes: Vec<Node> = ["a", "b", "c"].iter().map(|name| spawn(&net, name)).collect();

    // On b first, on c once c joins.
    let (roles, key) = arrange(&nodes, |r, k| {
        expected(&[r[0], r[1]], k, 1)[0] == *r[1].local_id()
            && expected(r, k, 1)[0] == *r[2].local_id()
    });
    let (a, b, c) = (&roles[0], &roles[1], &roles[2]);

    a.join(b.local_id()).await.unwrap();
    a.write(&key, "foo").await.unwrap();
    assert!(b.store().contains(&key));

    a.join(c.local_id()).await.unwrap();

    assert!(!b.store().contains(&key));
    assert_eq!(c.store().get(&key).as_deref(), Some("foo"));
}

#[tokio::test]
async fn test_resize_cleans_up_replicas() {
    let net = MemoryTransport::new();
    let nodes: Vec<Node> = ["a", "b", "c", "d"].iter().map(|name| spawn(&net, name)).collect();

    // Owned by c before and after d joins; the replica moves from a to d.
    let (roles, key) = arrange(&nodes, |r, k| {
        let (a, c, d) = (r[0].local_id(), r[2].local_id(), r[3].local_id());
        expected(&r[..3], k, 2) == vec![c.clone(), a.clone()]
            && expected(r, k, 2) == vec![c.clone(), d.clone()]
    });
    let (a, b, c, d) = (&roles[0], &roles[1], &roles[2], &roles[3]);

    a.join(b.local_id()).await.unwrap();
    a.join(c.local_id()).await.unwrap();
    a.set_replication_factor(2).unwrap();

    a.write(&key, "foo").await.unwrap();
    assert!(a.store().contains(&key));
    assert!(c.store().contains(&key));

    a.join(d.local_id()).await.unwrap();

    assert!(!a.store().contains(&key));
    assert!(c.store().contains(&key));
    assert!(d.store().contains(&key));
}

#[tokio::test]
async fn test_raised_factor_reaches_existing_members() {
    let net = MemoryTransport::new();
    let nodes: Vec<Node> = ["a", "b", "c", "d"].iter().map(|name| spawn(&net, name)).collect();

    // [a, b] with two copies whether or not d is on the ring.
    let (roles, key) = arrange(&nodes, |r, k| {
        let want = vec![r[0].local_id().clone(), r[1].local_id().clone()];
        expected(&r[..3], k, 2) == want && expected(r, k, 2) == want
    });
    let (a, b, c, d) = (&roles[0], &roles[1], &roles[2], &roles[3]);

    a.join(b.local_id()).await.unwrap();
    a.join(c.local_id()).await.unwrap();
    a.write(&key, "v").await.unwrap();
    assert_eq!(holders(&[a, b, c], &key), vec![a.local_id().clone()]);

    for node in [a, b, c] {
        node.set_replication_factor(2).unwrap();
    }
    d.join(a.local_id()).await.unwrap();

    assert_eq!(holders(&[a, b, c, d], &key), expected(&[a, b, c, d], &key, 2));
}

#[tokio::test]
async fn test_reconcile_backfills_after_factor_change() {
    let net = MemoryTransport::new();
    let a = spawn(&net, "a");
    let b = spawn(&net, "b");
    a.join(b.local_id()).await.unwrap();

    let key = find_key(|k| expected(&[&a, &b], k, 1)[0] == *a.local_id());
    a.write(&key, "v").await.unwrap();
    assert!(!b.store().contains(&key));

    a.set_replication_factor(2).unwrap();
    let report = a.reconcile().await.unwrap();

    assert_eq!(report.pushed, 1);
    assert!(b.store().contains(&key));
    assert!(a.reconcile().await.unwrap().is_noop());
}

#[tokio::test]
async fn test_reconcile_is_idempotent() {
    let net = MemoryTransport::new();
    let a = spawn(&net, "a");
    let b = spawn(&net, "b");
    let c = spawn(&net, "c");
    for i in 0..30 {
        a.write(&format!("k{i}"), "v").await.unwrap();
    }
    b.join(a.local_id()).await.unwrap();
    c.join(b.local_id()).await.unwrap();

    let before: Vec<_> = [&a, &b, &c].iter().map(|node| node.store().snapshot()).collect();
    for node in [&a, &b, &c] {
        let report = node.reconcile().await.unwrap();
        assert!(report.is_noop(), "{report:?}");
        assert_eq!(report.passes, 1);
    }
    let after: Vec<_> = [&a, &b, &c].iter().map(|node| node.store().snapshot()).collect();
    assert_eq!(before, after);

    let total: usize = after.iter().map(|snapshot| snapshot.len()).sum();
    assert_eq!(total, 30);
}

// ============================================================================
// Failures
// ============================================================================

#[tokio::test]
async fn test_failed_write_updates_peer_list() {
    let net = MemoryTransport::new();
    let a = spawn(&net, "a");
    let b = spawn(&net, "b");
    a.join(b.local_id()).await.unwrap();
    net.set_down(b.local_id(), true);

    let key = find_key(|k| expected(&[&a, &b], k, 1)[0] == *b.local_id());
    let report = a.write(&key, "foo").await.unwrap();

    assert!(report.stored_locally);
    assert_eq!(report.dead_peers, vec![b.local_id().clone()]);
    assert_eq!(report.failures().count(), 1);
    assert_eq!(a.membership().state(b.local_id()), Some(NodeState::Dead));

    let listing: Vec<String> = a.membership().peers().iter().map(ToString::to_string).collect();
    assert_eq!(listing, vec![format!("dead:{}", b.local_id())]);
    assert_eq!(a.read(&key).await.unwrap().as_deref(), Some("foo"));
}

#[tokio::test]
async fn test_read_falls_back_past_dead_owner() {
    let net = MemoryTransport::new();
    let nodes: Vec<Node> = ["a", "b", "c"].iter().map(|name| spawn(&net, name)).collect();

    let (roles, key) = arrange(&nodes, |r, k| {
        expected(r, k, 2) == vec![r[1].local_id().clone(), r[2].local_id().clone()]
    });
    let (a, b, c) = (&roles[0], &roles[1], &roles[2]);
    a.join(b.local_id()).await.unwrap();
    a.join(c.local_id()).await.unwrap();

    let entry = Versioned::new("v", Version::new(1, 0));
    b.store_replica(&key, entry.clone());
    c.store_replica(&key, entry);
    net.set_down(b.local_id(), true);

    assert_eq!(a.read(&key).await.unwrap().as_deref(), Some("v"));
    assert_eq!(a.membership().state(b.local_id()), Some(NodeState::Dead));
}

#[tokio::test]
async fn test_failure_moves_keys_to_survivors() {
    let net = MemoryTransport::new();
    let nodes: Vec<Node> = ["a", "b", "c"].iter().map(|name| spawn(&net, name)).collect();

    // a holds the replica, b is the owner; once b is gone c becomes the
    // second copy under a's view.
    let (roles, key) = arrange(&nodes, |r, k| {
        let (a, b, c) = (r[0].local_id(), r[1].local_id(), r[2].local_id());
        expected(r, k, 2) == vec![b.clone(), a.clone()]
            && expected(&[r[0], r[2]], k, 2) == vec![a.clone(), c.clone()]
    });
    let (a, b, c) = (&roles[0], &roles[1], &roles[2]);
    a.join(b.local_id()).await.unwrap();
    a.join(c.local_id()).await.unwrap();
    a.set_replication_factor(2).unwrap();

    a.write(&key, "v").await.unwrap();

    net.set_down(b.local_id(), true);
    assert!(a.report_failure(b.local_id()).await);
    assert!(!a.report_failure(b.local_id()).await);

    assert!(a.store().contains(&key));
    assert!(c.store().contains(&key));
}

#[tokio::test]
async fn test_rejoin_revives_dead_peer() {
    let net = MemoryTransport::new();
    let a = spawn(&net, "a");
    let b = spawn(&net, "b");
    a.join(b.local_id()).await.unwrap();

    net.set_down(b.local_id(), true);
    a.report_failure(b.local_id()).await;
    net.set_down(b.local_id(), false);

    let report = a.join(b.local_id()).await.unwrap();
    assert_eq!(report.change, MembershipChange::Revived);
    assert_eq!(a.membership().state(b.local_id()), Some(NodeState::Alive));
}

#[tokio::test]
async fn test_join_unreachable_peer() {
    let net = MemoryTransport::new();
    let a = spawn(&net, "a");
    let ghost = id("http://ghost.test:7000");

    let report = a.join(&ghost).await.unwrap();
    assert_eq!(report.change, MembershipChange::Added);
    assert_eq!(report.unreachable, vec![ghost.clone()]);
    assert_eq!(a.membership().state(&ghost), Some(NodeState::Dead));
}

// ============================================================================
// Discovery
// ============================================================================

#[tokio::test]
async fn test_join_is_transitive() {
    let net = MemoryTransport::new();
    let a = spawn(&net, "a");
    let b = spawn(&net, "b");
    let c = spawn(&net, "c");

    b.join(a.local_id()).await.unwrap();
    let report = c.join(a.local_id()).await.unwrap();
    assert_eq!(report.learned, vec![b.local_id().clone()]);

    for node in [&a, &b, &c] {
        assert_eq!(node.membership().alive().len(), 3, "{node:?}");
    }
}

#[tokio::test]
async fn test_exchange_returns_alive_members() {
    let net = MemoryTransport::new();
    let a = spawn(&net, "a");
    let b = spawn(&net, "b");
    let c = id("http://c.test:7000");

    let answer = a
        .accept_exchange(b.local_id(), &[b.local_id().clone(), c.clone()])
        .await
        .unwrap();

    assert_eq!(answer.len(), 3);
    assert!(answer.contains(a.local_id()));
    assert!(answer.contains(&c));
}

// ============================================================================
// Concurrency
// ============================================================================

/// In-process transport that runs one client write on its own node right
/// before the first replica push leaves, as if the write arrived while the
/// push was on the wire.
struct WriteDuringPush {
    net: Arc<MemoryTransport>,
    node: OnceLock<Weak<ClusterNode<WriteDuringPush>>>,
    pending: (String, String),
    fired: AtomicBool,
}

#[async_trait]
impl PeerTransport for WriteDuringPush {
    async fn replicate(
        &self,
        peer: &NodeId,
        key: &str,
        entry: &Versioned,
    ) -> Result<(), TransportError> {
        if !self.fired.swap(true, Ordering::SeqCst) {
            if let Some(node) = self.node.get().and_then(Weak::upgrade) {
                let (key, value) = &self.pending;
                node.write(key, value).await.unwrap();
            }
        }
        self.net.replicate(peer, key, entry).await
    }

    async fn forward_write(
        &self,
        peer: &NodeId,
        key: &str,
        entry: &Versioned,
    ) -> Result<(), TransportError> {
        self.net.forward_write(peer, key, entry).await
    }

    async fn fetch(&self, peer: &NodeId, key: &str) -> Result<Option<String>, TransportError> {
        self.net.fetch(peer, key).await
    }

    async fn exchange(
        &self,
        peer: &NodeId,
        from: &NodeId,
        known: &[NodeId],
    ) -> Result<Vec<NodeId>, TransportError> {
        self.net.exchange(peer, from, known).await
    }
}

#[tokio::test]
async fn test_handoff_never_overwrites_newer_write() {
    let net = MemoryTransport::new();
    let b = spawn(&net, "b");
    let a_id = id("http://a.test:7000");

    let ring = HashRing::from_nodes([a_id.clone(), b.local_id().clone()], 1, default_partitioner());
    let key = find_key(|k| ring.owner_of(k).unwrap() == *b.local_id());

    let transport = Arc::new(WriteDuringPush {
        net: Arc::clone(&net),
        node: OnceLock::new(),
        pending: (key.clone(), "v2".to_string()),
        fired: AtomicBool::new(false),
    });
    let a = Arc::new(ClusterNode::new(NodeOptions::new(a_id), Arc::clone(&transport)));
    let _ = transport.node.set(Arc::downgrade(&a));

    a.write(&key, "v1").await.unwrap();
    a.join(b.local_id()).await.unwrap();

    assert!(transport.fired.load(Ordering::SeqCst));
    assert!(!a.store().contains(&key));
    assert_eq!(b.store().get(&key).as_deref(), Some("v2"));
    assert_eq!(a.read(&key).await.unwrap().as_deref(), Some("v2"));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_writes_and_joins_settle_on_preference_lists() {
    let net = MemoryTransport::new();
    let nodes: Vec<Node> = ["a", "b", "c", "d", "e"]
        .iter()
        .map(|name| spawn(&net, name))
        .collect();
    nodes[1].join(nodes[0].local_id()).await.unwrap();

    let mut tasks = Vec::new();
    for (newcomer, seed) in [(2, 0), (3, 1), (4, 0)] {
        let newcomer = Arc::clone(&nodes[newcomer]);
        let seed = nodes[seed].local_id().clone();
        tasks.push(tokio::spawn(async move {
            newcomer.join(&seed).await.unwrap();
        }));
    }
    for i in 0..200 {
        let entry = Arc::clone(&nodes[i % 2]);
        tasks.push(tokio::spawn(async move {
            entry.write(&format!("key-{i}"), &format!("value-{i}")).await.unwrap();
        }));
    }
    for task in tasks {
        task.await.unwrap();
    }

    // Writes routed on a view that missed a join are placed by the next
    // reconciliation.
    for node in &nodes {
        assert_eq!(node.membership().alive().len(), nodes.len(), "{node:?}");
        node.reconcile().await.unwrap();
    }

    let members: Vec<&Node> = nodes.iter().collect();
    for i in 0..200 {
        let key = format!("key-{i}");
        assert_eq!(holders(&members, &key), expected(&members, &key, 1), "key {key}");
        for node in &nodes {
            assert_eq!(
                node.read(&key).await.unwrap(),
                Some(format!("value-{i}")),
                "key {key} via {node:?}"
            );
        }
    }
}
