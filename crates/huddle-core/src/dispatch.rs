//! Maps one inbound SDK event onto one tile reconciliation.
//!
//! Several update types are deliberately ignored: a peer that joined gets
//! no tile until a video track arrives, and removed/degraded/restored
//! tracks leave the tiles as they are.

use crate::sdk::{PeerUpdateType, SdkEvent, TrackKind, TrackUpdateType};
use crate::tiles::{self, PeerTrackNode};

/// UI state container: the ordered tiles and the loading flag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoomState {
    pub nodes: Vec<PeerTrackNode>,
    pub loading: bool,
}

impl RoomState {
    pub fn new() -> Self {
        Self {
            nodes: Vec::new(),
            loading: true,
        }
    }
}

impl Default for RoomState {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reaction {
    Applied,
    Ignored,
}

/// Derive the next state from `state` and `event`.
pub fn reduce(state: &RoomState, event: &SdkEvent) -> (RoomState, Reaction) {
    match event {
        SdkEvent::JoinSuccess(info) => {
            let peer = &info.local_peer;
            let nodes = tiles::update_node(&state.nodes, peer, peer.video_track.as_ref(), true);
            (RoomState { nodes, loading: false }, Reaction::Applied)
        }

        SdkEvent::PeerUpdate { peer, update } => match update {
            PeerUpdateType::Joined => (state.clone(), Reaction::Ignored),
            PeerUpdateType::Left => {
                let nodes = tiles::remove_node_with_peer_id(&state.nodes, &peer.id);
                (with_nodes(state, nodes), Reaction::Applied)
            }
            _ if peer.is_local => {
                let nodes = tiles::update_node_with_peer(&state.nodes, peer, true);
                (with_nodes(state, nodes), Reaction::Applied)
            }
            PeerUpdateType::RoleChanged
            | PeerUpdateType::MetadataChanged
            | PeerUpdateType::NameChanged
            | PeerUpdateType::NetworkQualityUpdated => (state.clone(), Reaction::Ignored),
            _ => (state.clone(), Reaction::Ignored),
        },

        SdkEvent::TrackUpdate { peer, track, update } => {
            let is_video = track.kind == TrackKind::Video;
            match update {
                TrackUpdateType::Added if is_video => {
                    let nodes = tiles::update_node(&state.nodes, peer, Some(track), true);
                    (with_nodes(state, nodes), Reaction::Applied)
                }
                TrackUpdateType::Muted | TrackUpdateType::Unmuted if is_video => {
                    let nodes = tiles::update_node(&state.nodes, peer, Some(track), false);
                    (with_nodes(state, nodes), Reaction::Applied)
                }
                TrackUpdateType::Muted | TrackUpdateType::Unmuted => {
                    let nodes = tiles::update_node_with_peer(&state.nodes, peer, false);
                    (with_nodes(state, nodes), Reaction::Applied)
                }
                TrackUpdateType::Removed => (state.clone(), Reaction::Ignored),
                TrackUpdateType::Restored | TrackUpdateType::Degraded => {
                    (state.clone(), Reaction::Ignored)
                }
                TrackUpdateType::Added => (state.clone(), Reaction::Ignored),
            }
        }

        SdkEvent::Error(err) => {
            tracing::error!("sdk error {}: {}", err.code, err.description);
            (
                RoomState {
                    nodes: state.nodes.clone(),
                    loading: false,
                },
                Reaction::Applied,
            )
        }
    }
}

fn with_nodes(state: &RoomState, nodes: Vec<PeerTrackNode>) -> RoomState {
    RoomState {
        nodes,
        loading: state.loading,
    }
}
