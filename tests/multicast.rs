mod common;

use std::collections::{BTreeMap, BTreeSet};

use omolsr::{Bandwidth, NodeId};

#[allow(unused_imports)]
use crate::common::{addr, enable_tracing, Mesh, GROUP};

fn join(mesh: &Mesh, members: &[usize]) {
    for &member in members {
        mesh.nodes[member].join(GROUP);
    }
}

fn ids(mesh: &Mesh, node: usize, members: &[usize]) -> BTreeSet<NodeId> {
    members
        .iter()
        .map(|&member| mesh.nodes[node].arena().intern(addr(member)))
        .collect()
}

#[test]
fn line_of_three_members() {
    // enable_tracing();

    let mesh = Mesh::line(3);
    join(&mesh, &[0, 1, 2]);
    mesh.converge();

    let a = &mesh.nodes[0];
    let overlay = a.overlay(GROUP).unwrap();

    // No relays to contract away, the contracted graph is the topology itself.
    let graph = overlay.graph();
    assert_eq!(graph.nodes(), &ids(&mesh, 0, &[0, 1, 2]));
    assert_eq!(graph.edge_count(), 4);

    let tree = overlay.tree();
    let mut edges: Vec<_> = tree
        .edges()
        .into_iter()
        .map(|(parent, child, _)| {
            (
                a.arena().addr(parent).unwrap(),
                a.arena().addr(child).unwrap(),
            )
        })
        .collect();
    edges.sort();
    assert_eq!(edges, vec![(addr(0), addr(1)), (addr(1), addr(2))]);

    let sent = mesh.multicast(0, GROUP, "hello");
    assert_eq!(sent.len(), 3);

    let to_b = &sent[0];
    assert_eq!((to_b.from, to_b.to), (addr(0), addr(1)));
    assert_eq!(
        to_b.message.header,
        BTreeMap::from([(addr(1), BTreeSet::from([addr(2)]))])
    );

    let to_self = &sent[1];
    assert_eq!((to_self.from, to_self.to), (addr(0), addr(0)));
    assert!(to_self.message.header.is_empty());

    let to_c = &sent[2];
    assert_eq!((to_c.from, to_c.to), (addr(1), addr(2)));
    assert!(to_c.message.header.is_empty());

    for node in 0..3 {
        assert_eq!(mesh.received(node), vec!["hello".to_owned()]);
    }
}

#[test]
fn relays_are_contracted() {
    let mesh = Mesh::line(4);
    join(&mesh, &[0, 3]);
    mesh.converge();

    let overlay = mesh.nodes[0].overlay(GROUP).unwrap();
    let graph = overlay.graph();
    assert_eq!(graph.nodes(), &ids(&mesh, 0, &[0, 3]));

    let first = mesh.nodes[0].arena().intern(addr(0));
    let last = mesh.nodes[0].arena().intern(addr(3));
    assert_eq!(graph.weight(first, last), Some(3));

    let sent = mesh.multicast(0, GROUP, "across");
    let recipients: Vec<_> = sent.iter().map(|sent| sent.to).collect();
    assert_eq!(recipients, vec![addr(3), addr(0)]);

    // The relays in between route the unicast copy but don't deliver it.
    assert_eq!(mesh.received(3), vec!["across".to_owned()]);
    assert!(mesh.received(1).is_empty());
    assert!(mesh.received(2).is_empty());
}

#[test]
fn every_member_receives_once() {
    //     1 - 2
    //    /     \
    //   0       3 - 4
    //    \     /
    //     5 - 6
    let mut mesh = Mesh::new(7);
    for (a, b) in [(0, 1), (1, 2), (2, 3), (3, 4), (0, 5), (5, 6), (6, 3)] {
        mesh.link(a, b);
    }
    join(&mesh, &[0, 2, 4, 5, 6]);
    mesh.converge();

    for source in [0, 4] {
        mesh.multicast(source, GROUP, "ping");
    }

    for member in [0, 2, 4, 5, 6] {
        assert_eq!(mesh.received(member), vec!["ping", "ping"]);
    }
    for relay in [1, 3] {
        assert!(mesh.received(relay).is_empty());
    }
}

#[test]
fn departed_member_keeps_receiving_for_grace_period() {
    let mesh = Mesh::line(3);
    join(&mesh, &[0, 1, 2]);
    mesh.converge();

    mesh.nodes[2].leave(GROUP);
    mesh.tcs();
    for node in &mesh.nodes {
        node.recompute();
    }

    let source = &mesh.nodes[0];
    let overlay = source.overlay(GROUP).unwrap();
    let departed = source.arena().intern(addr(2));
    assert!(!overlay.tree().contains(departed));
    assert!(overlay.grace_nodes().contains(&departed));

    let sent = mesh.multicast(0, GROUP, "late");
    assert!(sent.iter().any(|sent| sent.to == addr(2)));
    // The payload still reaches the node, it just isn't delivered upwards any more.
    assert!(mesh.received(2).is_empty());

    for _ in 0..source.config().grace_ticks {
        source.tick_grace();
    }
    assert!(overlay.grace_nodes().is_empty());

    let sent = mesh.multicast(0, GROUP, "later");
    assert!(sent.iter().all(|sent| sent.to != addr(2)));
}

#[test]
fn bandwidth_on_overlay_route() {
    let mesh = Mesh::line(3);
    join(&mesh, &[0, 1, 2]);
    mesh.converge();

    let source = &mesh.nodes[0];
    let narrow = Bandwidth {
        max_in_bytes: 1_000,
        max_in_messages: 50,
    };
    let wide = Bandwidth {
        max_in_bytes: 10_000,
        max_in_messages: 10,
    };
    source.set_bandwidth(addr(1), narrow);
    source.set_bandwidth(addr(2), wide);

    let info = source.topology_information();
    assert_eq!(info.bandwidth_capacity_of(addr(1)), Some(narrow));
    assert_eq!(
        info.lowest_bandwidth_on_route_to(GROUP, addr(2)),
        Some(Bandwidth {
            max_in_bytes: 1_000,
            max_in_messages: 10,
        })
    );
    let overlay = info.overlay(GROUP).unwrap();
    assert_eq!(overlay.hop_count_to(source.arena().intern(addr(2))), Some(2));
    assert_eq!(info.groups().collect::<Vec<_>>(), vec![GROUP]);
}

#[test]
fn non_member_sender() {
    let mesh = Mesh::line(3);
    join(&mesh, &[2]);
    mesh.converge();

    let sent = mesh.multicast(0, GROUP, "from outside");
    assert!(sent.iter().any(|sent| sent.to == addr(2)));

    assert_eq!(mesh.received(2), vec!["from outside".to_owned()]);
    // The source always gets its own copy.
    assert_eq!(mesh.received(0), vec!["from outside".to_owned()]);
    assert!(mesh.received(1).is_empty());
}
