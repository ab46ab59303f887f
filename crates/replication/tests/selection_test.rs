//! Tests for replica-aware node selection.
//!
//! # Test Strategy
//!
//! 1. **Basic functionality**: empty groups, construction, primary-only groups
//! 2. **Rotation**: secondary fairness, round-robin alternation
//! 3. **Degraded groups**: dead secondaries, missing primary
//! 4. **Failover**: candidate promotion and what selection sees afterwards

use std::collections::HashSet;
use std::sync::Arc;

use corelib::{Error, Node, NodeAddress, NodeId, ReplicaRole};
use replication::{PromotionPolicy, ReplicaGroup, ReplicaPick, StandardTopology};

fn node(id: u64, role: ReplicaRole) -> Arc<Node> {
    Arc::new(Node::new(
        NodeId(id),
        NodeAddress::replicated("shard-7", role, format!("cache-{}:11211", id)),
    ))
}

fn group() -> ReplicaGroup {
    ReplicaGroup::new("shard-7", Arc::new(StandardTopology::default())).unwrap()
}

/// Primary 1, secondaries 2 and 3, all live.
fn three_node_group() -> (ReplicaGroup, Arc<Node>, Arc<Node>, Arc<Node>) {
    let mut g = group();
    let p = node(1, ReplicaRole::Primary);
    let s1 = node(2, ReplicaRole::Secondary);
    let s2 = node(3, ReplicaRole::Secondary);
    g.set_node(Arc::clone(&p));
    g.set_node(Arc::clone(&s1));
    g.set_node(Arc::clone(&s2));
    (g, p, s1, s2)
}

// ============================================================================
// Basic Functionality Tests
// ============================================================================

#[test]
fn test_construction() {
    assert_eq!(
        ReplicaGroup::new("", Arc::new(StandardTopology::default())).unwrap_err(),
        Error::EmptyGroupName
    );

    let g = group();
    assert!(g.is_empty_group());
    assert_eq!(g.name(), "shard-7");
    assert!(g.primary().is_none());
    assert!(g.secondaries().is_empty());
}

#[test]
fn test_adding_any_node_makes_group_non_empty() {
    let mut g = group();
    g.set_node(node(2, ReplicaRole::Secondary));
    assert!(!g.is_empty_group());

    let mut g = group();
    g.set_node(node(1, ReplicaRole::Primary));
    assert!(!g.is_empty_group());
}

#[test]
fn test_primary_only_group_always_yields_primary() {
    let mut g = group();
    let p = node(1, ReplicaRole::Primary);
    g.set_node(Arc::clone(&p));

    for pick in [ReplicaPick::Primary, ReplicaPick::Secondary, ReplicaPick::RoundRobin] {
        for _ in 0..5 {
            assert_eq!(g.select(pick), Some(Arc::clone(&p)), "pick {}", pick);
        }
    }
}

#[test]
fn test_secondary_index_out_of_range() {
    let (g, _, _, _) = three_node_group();
    assert!(g.secondary_at(1).is_ok());
    assert_eq!(
        g.secondary_at(5).unwrap_err(),
        Error::SecondaryIndexOutOfRange { index: 5, len: 2 }
    );
}

// ============================================================================
// Rotation Tests
// ============================================================================

#[test]
fn test_secondary_visits_every_live_secondary_before_repeating() {
    let (mut g, _, s1, s2) = three_node_group();
    for _ in 0..3 {
        let mut seen = HashSet::new();
        for _ in 0..2 {
            let picked = g.select(ReplicaPick::Secondary).unwrap();
            assert!(seen.insert(picked.id), "secondary repeated within a revolution");
        }
        assert_eq!(seen, HashSet::from([s1.id, s2.id]));
    }
}

#[test]
fn test_round_robin_sequence() {
    let (mut g, p, s1, s2) = three_node_group();
    let picks: Vec<NodeId> = (0..7)
        .map(|_| g.select(ReplicaPick::RoundRobin).unwrap().id)
        .collect();
    assert_eq!(picks, vec![p.id, s1.id, p.id, s2.id, p.id, s1.id, p.id]);
}

#[test]
fn test_round_robin_with_one_dead_secondary() {
    let (mut g, p, s1, s2) = three_node_group();
    s1.set_active(false);
    let picks: Vec<NodeId> = (0..6)
        .map(|_| g.select(ReplicaPick::RoundRobin).unwrap().id)
        .collect();
    assert_eq!(picks, vec![p.id, s2.id, p.id, s2.id, p.id, s2.id]);
}

#[test]
fn test_recovered_secondary_rejoins_rotation() {
    let (mut g, _, s1, s2) = three_node_group();
    s1.set_active(false);
    assert_eq!(g.select(ReplicaPick::Secondary), Some(Arc::clone(&s2)));
    assert_eq!(g.select(ReplicaPick::Secondary), Some(Arc::clone(&s2)));

    s1.set_active(true);
    assert_eq!(g.select(ReplicaPick::Secondary), Some(s1));
    assert_eq!(g.select(ReplicaPick::Secondary), Some(s2));
}

// ============================================================================
// Degraded Groups
// ============================================================================

#[test]
fn test_all_secondaries_dead_falls_back_to_primary() {
    let (mut g, p, s1, s2) = three_node_group();
    s1.set_active(false);
    s2.set_active(false);
    for _ in 0..4 {
        assert_eq!(g.select(ReplicaPick::Secondary), Some(Arc::clone(&p)));
        assert_eq!(g.select(ReplicaPick::RoundRobin), Some(Arc::clone(&p)));
    }
}

#[test]
fn test_no_primary_and_dead_secondaries_yields_none() {
    let (mut g, p, s1, s2) = three_node_group();
    g.delete_node(&p);
    s1.set_active(false);
    s2.set_active(false);
    assert_eq!(g.select(ReplicaPick::Primary), None);
    assert_eq!(g.select(ReplicaPick::Secondary), None);
    assert_eq!(g.select(ReplicaPick::RoundRobin), None);
}

#[test]
fn test_secondary_pick_never_none_while_primary_exists() {
    let (mut g, p, s1, s2) = three_node_group();
    for mask in 0..4u8 {
        s1.set_active(mask & 1 != 0);
        s2.set_active(mask & 2 != 0);
        p.set_active(mask & 1 == 0);
        assert!(g.select(ReplicaPick::Secondary).is_some());
    }
}

// ============================================================================
// Failover Tests
// ============================================================================

#[test]
fn test_failover_moves_reads() {
    let (mut g, p, s1, s2) = three_node_group();
    p.set_active(false);

    g.set_primary_candidate(Some(Arc::clone(&s1)));
    assert!(g.change_role());

    assert_eq!(g.select(ReplicaPick::Primary), Some(Arc::clone(&s1)));
    // Demoted primary is dead, so secondary reads stick to s2.
    for _ in 0..3 {
        assert_eq!(g.select(ReplicaPick::Secondary), Some(Arc::clone(&s2)));
    }
    assert!(g.secondaries().contains(&p));
}

#[test]
fn test_failover_with_eviction() {
    let mut g = ReplicaGroup::new(
        "shard-7",
        Arc::new(StandardTopology::new(PromotionPolicy::Evict)),
    )
    .unwrap();
    let p = node(1, ReplicaRole::Primary);
    let s1 = node(2, ReplicaRole::Secondary);
    g.set_node(Arc::clone(&p));
    g.set_node(Arc::clone(&s1));

    g.set_primary_candidate(Some(Arc::clone(&s1)));
    assert!(g.change_role());
    assert_eq!(g.to_string(), "[shard-7^S^cache-2:11211]");
    assert_eq!(g.select(ReplicaPick::RoundRobin), Some(s1));
}
