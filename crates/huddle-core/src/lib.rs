//! Huddle core business logic.
//!
//! Turns video SDK callbacks into an ordered list of peer/track tiles and
//! owns the SDK session while the room screen is shown.
//! Consumed by native UI shells via UniFFI bindings.

pub mod auth;
pub mod dispatch;
pub mod errors;
pub mod events;
#[cfg(feature = "livekit")]
pub mod livekit_sdk;
pub mod navigation;
pub mod room;
pub mod sdk;
pub mod settings;
pub mod tiles;

pub use auth::{AuthService, TokenInfo};
pub use dispatch::{Reaction, RoomState, reduce};
pub use errors::HuddleError;
pub use events::{EventEmitter, HuddleEvent, HuddleEventListener};
#[cfg(feature = "livekit")]
pub use livekit_sdk::LiveKitSdk;
pub use navigation::{Navigator, Screen};
pub use room::{MeetingConfig, RoomGuard, RoomManager};
pub use sdk::{
    JoinConfig, JoinInfo, Peer, PeerUpdateType, SdkError, SdkEvent, SdkEventKind, SdkObserver,
    SdkSession, Track, TrackKind, TrackSource, TrackUpdateType, VideoSdk,
};
pub use settings::{Settings, SettingsStore};
pub use tiles::PeerTrackNode;
