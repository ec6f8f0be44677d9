//! Boundary with the embedded video SDK.
//!
//! The SDK owns peers, tracks and media transport. The core only sees
//! snapshots delivered through [`SdkObserver`] callbacks and drives the
//! session through [`SdkSession`]. Both traits are object safe so tests
//! can inject a scripted session instead of a real SDK.

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;

use crate::errors::HuddleError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrackKind {
    Audio,
    Video,
}

/// Source string of camera/microphone tracks, and of tiles without a track.
pub const REGULAR_SOURCE: &str = "regular";

/// Where a track comes from. Rendered as the string used in tile ids.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum TrackSource {
    #[default]
    Regular,
    Screen,
    Other(String),
}

impl TrackSource {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Regular => REGULAR_SOURCE,
            Self::Screen => "screen",
            Self::Other(s) => s,
        }
    }
}

impl fmt::Display for TrackSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Track {
    pub id: String,
    pub kind: TrackKind,
    pub source: TrackSource,
    pub is_muted: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Peer {
    pub id: String,
    pub name: String,
    pub is_local: bool,
    pub video_track: Option<Track>,
    pub audio_track: Option<Track>,
}

/// Payload of a successful join.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JoinInfo {
    pub room_id: String,
    pub local_peer: Peer,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SdkError {
    pub code: i32,
    pub description: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PeerUpdateType {
    Joined,
    Left,
    RoleChanged,
    MetadataChanged,
    NameChanged,
    NetworkQualityUpdated,
    HandRaisedChanged,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrackUpdateType {
    Added,
    Removed,
    Muted,
    Unmuted,
    Degraded,
    Restored,
}

/// The four observer slots a session exposes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SdkEventKind {
    OnJoin,
    OnPeerUpdate,
    OnTrackUpdate,
    OnError,
}

impl SdkEventKind {
    pub const ALL: [SdkEventKind; 4] = [
        SdkEventKind::OnJoin,
        SdkEventKind::OnPeerUpdate,
        SdkEventKind::OnTrackUpdate,
        SdkEventKind::OnError,
    ];
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SdkEvent {
    JoinSuccess(JoinInfo),
    PeerUpdate {
        peer: Peer,
        update: PeerUpdateType,
    },
    TrackUpdate {
        peer: Peer,
        track: Track,
        update: TrackUpdateType,
    },
    Error(SdkError),
}

impl SdkEvent {
    pub fn kind(&self) -> SdkEventKind {
        match self {
            Self::JoinSuccess(_) => SdkEventKind::OnJoin,
            Self::PeerUpdate { .. } => SdkEventKind::OnPeerUpdate,
            Self::TrackUpdate { .. } => SdkEventKind::OnTrackUpdate,
            Self::Error(_) => SdkEventKind::OnError,
        }
    }
}

/// Credentials handed to [`SdkSession::join`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JoinConfig {
    pub auth_token: String,
    pub user_name: String,
}

/// Callback registered on a session for one [`SdkEventKind`].
/// Implementations must be Send + Sync (the SDK calls from its own threads).
pub trait SdkObserver: Send + Sync {
    fn on_sdk_event(&self, event: SdkEvent);
}

/// Factory for sessions.
#[async_trait]
pub trait VideoSdk: Send + Sync {
    async fn build(&self) -> Result<Arc<dyn SdkSession>, HuddleError>;
}

/// A single SDK session: one room join from build to destroy.
#[async_trait]
pub trait SdkSession: Send + Sync {
    /// Exchange a room code for a join token.
    async fn auth_token_by_room_code(
        &self,
        room_code: &str,
        user_id: Option<&str>,
    ) -> Result<String, HuddleError>;

    async fn join(&self, config: &JoinConfig) -> Result<(), HuddleError>;

    async fn leave(&self) -> Result<(), HuddleError>;

    /// Release everything the session holds. The session is unusable afterwards.
    async fn destroy(&self) -> Result<(), HuddleError>;

    /// Register `observer` for `kind`, replacing any previous one.
    fn add_event_listener(&self, kind: SdkEventKind, observer: Arc<dyn SdkObserver>);

    fn remove_event_listener(&self, kind: SdkEventKind);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn track_source_strings() {
        assert_eq!(TrackSource::Regular.as_str(), "regular");
        assert_eq!(TrackSource::Screen.to_string(), "screen");
        assert_eq!(TrackSource::Other("plugin".into()).as_str(), "plugin");
        assert_eq!(TrackSource::default(), TrackSource::Regular);
    }

    #[test]
    fn event_kind_matches_variant() {
        let err = SdkEvent::Error(SdkError { code: 1, description: "x".into() });
        assert_eq!(err.kind(), SdkEventKind::OnError);
        assert_eq!(SdkEventKind::ALL.len(), 4);
    }
}
