use crate::sdk::{Peer, REGULAR_SOURCE, Track, TrackKind};

/// A renderable tile: one peer paired with at most one video track.
///
/// Lists of nodes are treated as values. Every function below takes the
/// current list and returns a fresh one; at most one node per `id`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PeerTrackNode {
    pub id: String,
    pub peer: Peer,
    pub track: Option<Track>,
}

/// Tile id: peer id followed by the track source, `regular` without a track.
pub fn node_id(peer: &Peer, track: Option<&Track>) -> String {
    let source = track.map(|t| t.source.as_str()).unwrap_or(REGULAR_SOURCE);
    format!("{}{}", peer.id, source)
}

pub fn create_node(peer: &Peer, track: Option<&Track>) -> PeerTrackNode {
    PeerTrackNode {
        id: node_id(peer, track),
        peer: peer.clone(),
        track: track.filter(|t| t.kind == TrackKind::Video).cloned(),
    }
}

fn insert_node(nodes: &[PeerTrackNode], node: PeerTrackNode) -> Vec<PeerTrackNode> {
    let mut out = Vec::with_capacity(nodes.len() + 1);
    if node.peer.is_local {
        out.push(node);
        out.extend_from_slice(nodes);
    } else {
        out.extend_from_slice(nodes);
        out.push(node);
    }
    out
}

/// Upsert keyed on the (peer, track) tile id.
///
/// Existing nodes keep their position and get the new peer and track.
/// New nodes go first for the local peer and last otherwise.
pub fn update_node(
    nodes: &[PeerTrackNode],
    peer: &Peer,
    track: Option<&Track>,
    create_new: bool,
) -> Vec<PeerTrackNode> {
    let id = node_id(peer, track);
    if nodes.iter().any(|n| n.id == id) {
        return nodes
            .iter()
            .map(|n| {
                if n.id == id {
                    PeerTrackNode {
                        id: n.id.clone(),
                        peer: peer.clone(),
                        track: track.cloned(),
                    }
                } else {
                    n.clone()
                }
            })
            .collect();
    }
    if !create_new {
        return nodes.to_vec();
    }
    insert_node(nodes, create_node(peer, track))
}

/// Upsert keyed on the peer id alone. Matching nodes keep their track.
///
/// Matching ignores tracks, but a freshly created node takes the peer's
/// own video track, so a local peer seen first through a metadata update
/// renders its camera right away.
pub fn update_node_with_peer(
    nodes: &[PeerTrackNode],
    peer: &Peer,
    create_new: bool,
) -> Vec<PeerTrackNode> {
    if nodes.iter().any(|n| n.peer.id == peer.id) {
        return nodes
            .iter()
            .map(|n| {
                if n.peer.id == peer.id {
                    PeerTrackNode {
                        peer: peer.clone(),
                        ..n.clone()
                    }
                } else {
                    n.clone()
                }
            })
            .collect();
    }
    if !create_new {
        return nodes.to_vec();
    }
    insert_node(nodes, create_node(peer, peer.video_track.as_ref()))
}

pub fn remove_node(nodes: &[PeerTrackNode], id: &str) -> Vec<PeerTrackNode> {
    nodes.iter().filter(|n| n.id != id).cloned().collect()
}

/// Drop every tile owned by `peer_id` (one per track source).
pub fn remove_node_with_peer_id(nodes: &[PeerTrackNode], peer_id: &str) -> Vec<PeerTrackNode> {
    nodes.iter().filter(|n| n.peer.id != peer_id).cloned().collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sdk::TrackSource;

    fn make_track(id: &str, kind: TrackKind, source: TrackSource) -> Track {
        Track {
            id: id.to_string(),
            kind,
            source,
            is_muted: false,
        }
    }

    fn make_peer(id: &str, is_local: bool) -> Peer {
        Peer {
            id: id.to_string(),
            name: format!("name-{id}"),
            is_local,
            video_track: None,
            audio_track: None,
        }
    }

    #[test]
    fn node_id_defaults_to_regular() {
        let p = make_peer("p1", false);
        assert_eq!(node_id(&p, None), "p1regular");
        let screen = make_track("t1", TrackKind::Video, TrackSource::Screen);
        assert_eq!(node_id(&p, Some(&screen)), "p1screen");
    }

    #[test]
    fn node_id_is_stable_and_distinguishes_components() {
        let p1 = make_peer("p1", false);
        let p2 = make_peer("p2", false);
        let cam = make_track("t1", TrackKind::Video, TrackSource::Regular);
        let screen = make_track("t2", TrackKind::Video, TrackSource::Screen);
        assert_eq!(node_id(&p1, Some(&cam)), node_id(&p1, Some(&cam)));
        assert_ne!(node_id(&p1, Some(&cam)), node_id(&p2, Some(&cam)));
        assert_ne!(node_id(&p1, Some(&cam)), node_id(&p1, Some(&screen)));
    }

    #[test]
    fn create_node_drops_audio_track() {
        let p = make_peer("p1", false);
        let mic = make_track("a1", TrackKind::Audio, TrackSource::Regular);
        let node = create_node(&p, Some(&mic));
        assert!(node.track.is_none());
        assert_eq!(node.id, "p1regular");
    }

    #[test]
    fn insert_into_empty_list() {
        let p1 = make_peer("p1", true);
        let t1 = make_track("t1", TrackKind::Video, TrackSource::Regular);
        let nodes = update_node(&[], &p1, Some(&t1), true);
        assert_eq!(
            nodes,
            vec![PeerTrackNode {
                id: "p1regular".to_string(),
                peer: p1,
                track: Some(t1),
            }]
        );
    }

    #[test]
    fn local_goes_first_remote_goes_last() {
        let remote_a = make_peer("a", false);
        let remote_b = make_peer("b", false);
        let local = make_peer("me", true);

        let nodes = update_node(&[], &remote_a, None, true);
        let nodes = update_node(&nodes, &remote_b, None, true);
        let nodes = update_node(&nodes, &local, None, true);

        let ids: Vec<&str> = nodes.iter().map(|n| n.id.as_str()).collect();
        assert_eq!(ids, ["meregular", "aregular", "bregular"]);
    }

    #[test]
    fn upsert_is_idempotent() {
        let p = make_peer("p1", false);
        let t = make_track("t1", TrackKind::Video, TrackSource::Regular);
        let once = update_node(&[], &p, Some(&t), true);
        let twice = update_node(&once, &p, Some(&t), true);
        assert_eq!(once, twice);
    }

    #[test]
    fn update_replaces_track_in_place() {
        let a = make_peer("a", false);
        let b = make_peer("b", false);
        let c = make_peer("c", false);
        let t = make_track("tb", TrackKind::Video, TrackSource::Regular);
        let nodes = update_node(&[], &a, None, true);
        let nodes = update_node(&nodes, &b, Some(&t), true);
        let nodes = update_node(&nodes, &c, None, true);

        let muted = Track { is_muted: true, ..t };
        let updated = update_node(&nodes, &b, Some(&muted), false);

        assert_eq!(updated.len(), 3);
        assert_eq!(updated[1].id, "bregular");
        assert_eq!(updated[1].track.as_ref().map(|t| t.is_muted), Some(true));
    }

    #[test]
    fn update_without_create_leaves_list_alone() {
        let a = make_peer("a", false);
        let nodes = update_node(&[], &a, None, true);
        let b = make_peer("b", false);
        assert_eq!(update_node(&nodes, &b, None, false), nodes);
    }

    #[test]
    fn update_with_peer_keeps_track() {
        let p = make_peer("p1", false);
        let t = make_track("t1", TrackKind::Video, TrackSource::Regular);
        let nodes = update_node(&[], &p, Some(&t), true);

        let renamed = Peer {
            name: "Renamed".to_string(),
            ..p
        };
        let updated = update_node_with_peer(&nodes, &renamed, false);
        assert_eq!(updated.len(), 1);
        assert_eq!(updated[0].peer.name, "Renamed");
        assert_eq!(updated[0].track.as_ref(), Some(&t));
    }

    #[test]
    fn update_with_peer_touches_every_tile_of_that_peer() {
        let p = make_peer("p1", false);
        let cam = make_track("t1", TrackKind::Video, TrackSource::Regular);
        let screen = make_track("t2", TrackKind::Video, TrackSource::Screen);
        let nodes = update_node(&[], &p, Some(&cam), true);
        let nodes = update_node(&nodes, &p, Some(&screen), true);

        let renamed = Peer {
            name: "Renamed".to_string(),
            ..p
        };
        let updated = update_node_with_peer(&nodes, &renamed, false);
        assert!(updated.iter().all(|n| n.peer.name == "Renamed"));
        assert_eq!(updated[1].track.as_ref(), Some(&screen));
    }

    #[test]
    fn update_with_peer_is_idempotent() {
        let remote = make_peer("a", false);
        let nodes = update_node(&[], &remote, None, true);

        let mut local = make_peer("me", true);
        local.video_track = Some(make_track("cam", TrackKind::Video, TrackSource::Regular));
        let once = update_node_with_peer(&nodes, &local, true);
        let twice = update_node_with_peer(&once, &local, true);
        assert_eq!(once, twice);
        assert_eq!(twice.len(), 2);
    }

    #[test]
    fn update_with_peer_without_match_or_create_is_noop() {
        let a = make_peer("a", false);
        let nodes = update_node(&[], &a, None, true);
        let stranger = make_peer("z", false);
        assert_eq!(update_node_with_peer(&nodes, &stranger, false), nodes);
    }

    #[test]
    fn update_with_peer_creates_from_peer_video_track() {
        let remote = make_peer("a", false);
        let nodes = update_node(&[], &remote, None, true);

        let mut local = make_peer("me", true);
        local.video_track = Some(make_track("cam", TrackKind::Video, TrackSource::Regular));
        let nodes = update_node_with_peer(&nodes, &local, true);

        assert_eq!(nodes[0].id, "meregular");
        assert_eq!(nodes[0].track.as_ref().map(|t| t.id.as_str()), Some("cam"));
    }

    #[test]
    fn remove_node_by_id() {
        let a = make_peer("a", false);
        let b = make_peer("b", false);
        let nodes = update_node(&[], &a, None, true);
        let nodes = update_node(&nodes, &b, None, true);
        let nodes = remove_node(&nodes, "aregular");
        assert_eq!(nodes.len(), 1);
        assert_eq!(nodes[0].peer.id, "b");
    }

    #[test]
    fn remove_by_peer_id_drops_all_tiles_of_peer() {
        let me = make_peer("me", true);
        let other = make_peer("other", false);
        let cam = make_track("t1", TrackKind::Video, TrackSource::Regular);
        let screen = make_track("t2", TrackKind::Video, TrackSource::Screen);

        let nodes = update_node(&[], &other, Some(&cam), true);
        let nodes = update_node(&nodes, &me, None, true);
        let nodes = update_node(&nodes, &other, Some(&screen), true);
        assert_eq!(nodes.len(), 3);

        let nodes = remove_node_with_peer_id(&nodes, "other");
        assert_eq!(nodes.len(), 1);
        assert_eq!(nodes[0].peer.id, "me");
    }
}
