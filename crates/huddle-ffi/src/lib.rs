//! UniFFI bindings for huddle-core.
//!
//! Provides a HuddleClient object that wraps RoomManager, the LiveKit
//! session factory and SettingsStore into a single FFI-safe interface.

use std::sync::Arc;

use huddle_core::{
    self, HuddleEvent as CoreHuddleEvent, LiveKitSdk, PeerTrackNode as CorePeerTrackNode,
    Screen as CoreScreen, Track as CoreTrack, TrackKind as CoreTrackKind,
};

uniffi::include_scaffolding!("huddle");

// ── Android WebRTC initialization ────────────────────────────────────
//
// Must be called from Kotlin AFTER System.loadLibrary, before start_meeting().
// webrtc::InitAndroid needs a valid JNI class loader context, which is
// NOT available inside JNI_OnLoad.

#[cfg(target_os = "android")]
#[unsafe(no_mangle)]
pub extern "C" fn Java_io_huddle_mobile_HuddleApplication_nativeInitWebrtc(
    env: *mut std::ffi::c_void,
    _class: *mut std::ffi::c_void,
) {
    let Ok(env) = (unsafe { jni::JNIEnv::from_raw(env as *mut jni::sys::JNIEnv) }) else {
        huddle_log("HUDDLE FFI: nativeInitWebrtc got an invalid JNIEnv");
        return;
    };
    let Ok(jvm) = env.get_java_vm() else {
        huddle_log("HUDDLE FFI: nativeInitWebrtc could not get the JavaVM");
        return;
    };

    libwebrtc::android::initialize_android(&jvm);

    // Prevent Drop from calling DestroyJavaVM
    std::mem::forget(jvm);
    huddle_log("HUDDLE FFI: WebRTC initialized");
}

/// Write a message to logcat on Android, or stderr elsewhere.
/// Used before tracing is initialised.
fn huddle_log(msg: &str) {
    #[cfg(target_os = "android")]
    {
        use std::ffi::CString;
        unsafe extern "C" {
            fn __android_log_write(
                prio: i32,
                tag: *const std::ffi::c_char,
                text: *const std::ffi::c_char,
            ) -> i32;
        }
        let Ok(tag) = CString::new("HUDDLE_FFI") else { return };
        let Ok(text) = CString::new(msg) else { return };
        unsafe { __android_log_write(4 /* INFO */, tag.as_ptr(), text.as_ptr()); }
    }
    #[cfg(not(target_os = "android"))]
    eprintln!("{msg}");
}

// ── Namespace functions ──────────────────────────────────────────────

/// Initialize tracing/logging. Call once from the host before using HuddleClient.
fn init_logging() {
    use std::sync::Once;
    static INIT: Once = Once::new();
    INIT.call_once(|| {
        let filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            tracing_subscriber::EnvFilter::new("huddle_core=debug,huddle_ffi=debug")
        });
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_ansi(false)
            .init();
    });
}

// ── FFI-safe type conversions ──────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Screen {
    Welcome,
    Meeting,
}

impl From<CoreScreen> for Screen {
    fn from(s: CoreScreen) -> Self {
        match s {
            CoreScreen::Welcome => Self::Welcome,
            CoreScreen::Meeting => Self::Meeting,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrackKind {
    Audio,
    Video,
}

impl From<CoreTrackKind> for TrackKind {
    fn from(k: CoreTrackKind) -> Self {
        match k {
            CoreTrackKind::Audio => Self::Audio,
            CoreTrackKind::Video => Self::Video,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Track {
    pub id: String,
    pub kind: TrackKind,
    pub source: String,
    pub is_muted: bool,
}

impl From<CoreTrack> for Track {
    fn from(t: CoreTrack) -> Self {
        Self {
            id: t.id,
            kind: t.kind.into(),
            source: t.source.as_str().to_string(),
            is_muted: t.is_muted,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Peer {
    pub id: String,
    pub name: String,
    pub is_local: bool,
    pub video_track: Option<Track>,
    pub audio_track: Option<Track>,
}

impl From<huddle_core::Peer> for Peer {
    fn from(p: huddle_core::Peer) -> Self {
        Self {
            id: p.id,
            name: p.name,
            is_local: p.is_local,
            video_track: p.video_track.map(Track::from),
            audio_track: p.audio_track.map(Track::from),
        }
    }
}

#[derive(Debug, Clone)]
pub struct PeerTrackNode {
    pub id: String,
    pub peer: Peer,
    pub track: Option<Track>,
}

impl From<CorePeerTrackNode> for PeerTrackNode {
    fn from(n: CorePeerTrackNode) -> Self {
        Self {
            id: n.id,
            peer: n.peer.into(),
            track: n.track.map(Track::from),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Settings {
    pub display_name: String,
    pub room_code: String,
    pub auth_token: Option<String>,
    pub token_endpoint: Option<String>,
    pub server_url: Option<String>,
}

impl From<huddle_core::Settings> for Settings {
    fn from(s: huddle_core::Settings) -> Self {
        Self {
            display_name: s.display_name,
            room_code: s.room_code,
            auth_token: s.auth_token,
            token_endpoint: s.token_endpoint,
            server_url: s.server_url,
        }
    }
}

#[derive(Debug, Clone)]
pub enum RoomCodeValidation {
    Valid { room_code: String },
    InvalidFormat { message: String },
}

#[derive(Debug, Clone)]
pub enum HuddleEvent {
    ScreenChanged { screen: Screen },
    LoadingChanged { loading: bool },
    TilesChanged { tiles: Vec<PeerTrackNode> },
    Alert { message: String },
    SessionError { code: i32, description: String },
}

impl From<CoreHuddleEvent> for HuddleEvent {
    fn from(e: CoreHuddleEvent) -> Self {
        match e {
            CoreHuddleEvent::ScreenChanged(s) => Self::ScreenChanged { screen: s.into() },
            CoreHuddleEvent::LoadingChanged(loading) => Self::LoadingChanged { loading },
            CoreHuddleEvent::TilesChanged(nodes) => Self::TilesChanged {
                tiles: nodes.into_iter().map(PeerTrackNode::from).collect(),
            },
            CoreHuddleEvent::Alert(message) => Self::Alert { message },
            CoreHuddleEvent::SessionError(err) => Self::SessionError {
                code: err.code,
                description: err.description,
            },
        }
    }
}

// ── Error conversion ──────────────────────────────────────────────────

#[derive(Debug, thiserror::Error)]
pub enum HuddleError {
    #[error("Connection error: {msg}")]
    Connection { msg: String },
    #[error("Room error: {msg}")]
    Room { msg: String },
    #[error("Auth error: {msg}")]
    Auth { msg: String },
    #[error("HTTP error: {msg}")]
    Http { msg: String },
    #[error("Invalid room code: {msg}")]
    InvalidRoomCode { msg: String },
    #[error("No session: {msg}")]
    NoSession { msg: String },
}

impl From<huddle_core::HuddleError> for HuddleError {
    fn from(e: huddle_core::HuddleError) -> Self {
        tracing::error!("HuddleError: {e}");
        match e {
            huddle_core::HuddleError::Connection(msg) => Self::Connection { msg },
            huddle_core::HuddleError::Room(msg) => Self::Room { msg },
            huddle_core::HuddleError::Auth(msg) => Self::Auth { msg },
            huddle_core::HuddleError::Http(msg) => Self::Http { msg },
            huddle_core::HuddleError::InvalidRoomCode(msg) => Self::InvalidRoomCode { msg },
            huddle_core::HuddleError::NoSession => Self::NoSession {
                msg: "no active session".to_string(),
            },
        }
    }
}

// ── Callback interface ────────────────────────────────────────────────

pub trait HuddleEventListener: Send + Sync {
    fn on_event(&self, event: HuddleEvent);
}

struct BridgeListener {
    ffi_listener: Arc<dyn HuddleEventListener>,
}

impl huddle_core::HuddleEventListener for BridgeListener {
    fn on_event(&self, event: CoreHuddleEvent) {
        self.ffi_listener.on_event(event.into());
    }
}

// ── HuddleClient: main FFI object ─────────────────────────────────────

pub struct HuddleClient {
    room_manager: huddle_core::RoomManager,
    sdk: Arc<LiveKitSdk>,
    settings: huddle_core::SettingsStore,
    rt: tokio::runtime::Runtime,
}

impl HuddleClient {
    pub fn new(data_dir: String) -> Self {
        huddle_log("HUDDLE FFI: HuddleClient::new() called");
        let rt = tokio::runtime::Runtime::new().expect("failed to create tokio runtime");
        let settings = huddle_core::SettingsStore::new(&data_dir);
        let current = settings.get();
        let sdk = Arc::new(LiveKitSdk::new(current.token_endpoint, current.server_url));
        let room_manager = huddle_core::RoomManager::new(sdk.clone());

        Self {
            room_manager,
            sdk,
            settings,
            rt,
        }
    }

    /// Enter the meeting screen and join with the stored settings.
    pub fn start_meeting(&self) -> Result<(), HuddleError> {
        let current = self.settings.get();
        self.sdk
            .configure(current.token_endpoint.clone(), current.server_url.clone());
        let config = current.meeting_config();
        tracing::info!("start_meeting as {}", config.user_name);

        // Keep panics from crossing the FFI boundary.
        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            self.rt.block_on(self.room_manager.enter(config))
        }));

        match result {
            Ok(res) => res.map_err(HuddleError::from),
            Err(panic_info) => {
                let msg = if let Some(s) = panic_info.downcast_ref::<&str>() {
                    s.to_string()
                } else if let Some(s) = panic_info.downcast_ref::<String>() {
                    s.clone()
                } else {
                    "unknown panic".to_string()
                };
                tracing::error!("start_meeting panicked: {msg}");
                Err(HuddleError::Connection {
                    msg: format!("panic in start_meeting: {msg}"),
                })
            }
        }
    }

    pub fn leave_meeting(&self) -> Result<(), HuddleError> {
        self.rt
            .block_on(self.room_manager.leave_room())
            .map_err(HuddleError::from)
    }

    pub fn tiles(&self) -> Vec<PeerTrackNode> {
        self.rt
            .block_on(self.room_manager.tiles())
            .into_iter()
            .map(PeerTrackNode::from)
            .collect()
    }

    pub fn is_loading(&self) -> bool {
        self.rt.block_on(self.room_manager.is_loading())
    }

    pub fn current_screen(&self) -> Screen {
        self.room_manager.current_screen().into()
    }

    pub fn add_listener(&self, listener: Box<dyn HuddleEventListener>) {
        let bridge = Arc::new(BridgeListener {
            ffi_listener: Arc::from(listener),
        });
        self.room_manager.add_listener(bridge);
    }

    pub fn get_settings(&self) -> Settings {
        self.settings.get().into()
    }

    pub fn set_display_name(&self, name: String) {
        self.settings.set_display_name(name);
    }

    pub fn set_room_code(&self, code: String) {
        self.settings.set_room_code(code);
    }

    pub fn set_auth_token(&self, token: Option<String>) {
        self.settings.set_auth_token(token);
    }

    pub fn set_token_endpoint(&self, endpoint: Option<String>) {
        self.settings.set_token_endpoint(endpoint);
    }

    pub fn set_server_url(&self, url: Option<String>) {
        self.settings.set_server_url(url);
    }

    pub fn validate_room_code(&self, input: String) -> RoomCodeValidation {
        match huddle_core::AuthService::extract_room_code(&input) {
            Ok(room_code) => RoomCodeValidation::Valid { room_code },
            Err(e) => RoomCodeValidation::InvalidFormat {
                message: e.to_string(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client() -> (HuddleClient, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let client = HuddleClient::new(dir.path().to_str().unwrap().to_string());
        (client, dir)
    }

    #[test]
    fn new_client_starts_on_welcome_with_no_tiles() {
        let (client, _dir) = client();
        assert_eq!(client.current_screen(), Screen::Welcome);
        assert!(client.tiles().is_empty());
        assert!(!client.is_loading());
    }

    #[test]
    fn leave_without_session_reports_no_session() {
        let (client, _dir) = client();
        assert!(matches!(client.leave_meeting(), Err(HuddleError::NoSession { .. })));
    }

    #[test]
    fn start_without_endpoint_fails_back_to_welcome() {
        let (client, _dir) = client();
        let err = client.start_meeting().unwrap_err();
        assert!(matches!(err, HuddleError::Auth { .. }));
        assert_eq!(client.current_screen(), Screen::Welcome);
    }

    #[test]
    fn settings_round_trip_through_ffi_types() {
        let (client, _dir) = client();
        client.set_display_name("Alice".to_string());
        client.set_auth_token(Some("jwt".to_string()));
        let s = client.get_settings();
        assert_eq!(s.display_name, "Alice");
        assert_eq!(s.auth_token.as_deref(), Some("jwt"));
        assert_eq!(s.room_code, "abc-lmno-xyz");
    }

    #[test]
    fn validate_room_code_classifies_input() {
        let (client, _dir) = client();
        assert!(matches!(
            client.validate_room_code("https://meet.example.com/abc-lmno-xyz".to_string()),
            RoomCodeValidation::Valid { room_code } if room_code == "abc-lmno-xyz"
        ));
        assert!(matches!(
            client.validate_room_code("nope".to_string()),
            RoomCodeValidation::InvalidFormat { .. }
        ));
    }

    #[test]
    fn core_events_convert_to_ffi_events() {
        let event: HuddleEvent = CoreHuddleEvent::SessionError(huddle_core::SdkError {
            code: 7,
            description: "boom".to_string(),
        })
        .into();
        assert!(matches!(event, HuddleEvent::SessionError { code: 7, .. }));
    }
}
