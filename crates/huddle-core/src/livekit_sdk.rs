//! [`VideoSdk`] backed by a LiveKit room.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use livekit::participant::{LocalParticipant, Participant, RemoteParticipant};
use livekit::prelude::{Room, RoomEvent, RoomOptions};
use livekit::track::{TrackKind as LkTrackKind, TrackSource as LkTrackSource};
use tokio::sync::{Mutex, mpsc};
use tokio::task::JoinHandle;

use crate::auth::AuthService;
use crate::errors::HuddleError;
use crate::sdk::{
    JoinConfig, JoinInfo, Peer, PeerUpdateType, SdkError, SdkEvent, SdkEventKind, SdkObserver,
    SdkSession, Track, TrackKind, TrackSource, TrackUpdateType, VideoSdk,
};

/// Error code reported when the server drops the room.
const ERROR_DISCONNECTED: i32 = 2000;

type Observers = Arc<RwLock<HashMap<SdkEventKind, Arc<dyn SdkObserver>>>>;

pub struct LiveKitSdk {
    token_endpoint: RwLock<Option<String>>,
    server_url: RwLock<Option<String>>,
}

impl LiveKitSdk {
    pub fn new(token_endpoint: Option<String>, server_url: Option<String>) -> Self {
        Self {
            token_endpoint: RwLock::new(token_endpoint),
            server_url: RwLock::new(server_url),
        }
    }

    /// Endpoints used by sessions built after this call.
    pub fn configure(&self, token_endpoint: Option<String>, server_url: Option<String>) {
        *self.token_endpoint.write().unwrap_or_else(|e| e.into_inner()) = token_endpoint;
        *self.server_url.write().unwrap_or_else(|e| e.into_inner()) = server_url;
    }
}

#[async_trait]
impl VideoSdk for LiveKitSdk {
    async fn build(&self) -> Result<Arc<dyn SdkSession>, HuddleError> {
        let token_endpoint = self.token_endpoint.read().unwrap_or_else(|e| e.into_inner()).clone();
        let server_url = self.server_url.read().unwrap_or_else(|e| e.into_inner()).clone();
        Ok(Arc::new(LiveKitSession {
            token_endpoint,
            server_url: Mutex::new(server_url),
            room: Mutex::new(None),
            observers: Arc::new(RwLock::new(HashMap::new())),
            pump: Mutex::new(None),
        }))
    }
}

pub struct LiveKitSession {
    token_endpoint: Option<String>,
    server_url: Mutex<Option<String>>,
    room: Mutex<Option<Arc<Room>>>,
    observers: Observers,
    pump: Mutex<Option<JoinHandle<()>>>,
}

#[async_trait]
impl SdkSession for LiveKitSession {
    async fn auth_token_by_room_code(
        &self,
        room_code: &str,
        user_id: Option<&str>,
    ) -> Result<String, HuddleError> {
        let endpoint = self
            .token_endpoint
            .as_deref()
            .ok_or_else(|| HuddleError::Auth("no token endpoint configured".into()))?;

        let info = AuthService::request_token(endpoint, room_code, user_id).await?;
        if let Some(url) = info.server_url {
            *self.server_url.lock().await = Some(url);
        }
        Ok(info.token)
    }

    async fn join(&self, config: &JoinConfig) -> Result<(), HuddleError> {
        let url = self
            .server_url
            .lock()
            .await
            .clone()
            .ok_or_else(|| HuddleError::Connection("no server url".into()))?;

        let mut options = RoomOptions::default();
        options.auto_subscribe = true;

        let (room, events) = Room::connect(&url, &config.auth_token, options)
            .await
            .map_err(|e| HuddleError::Connection(e.to_string()))?;
        let room = Arc::new(room);
        tracing::info!("connected to {url} as {}", config.user_name);

        let info = JoinInfo {
            room_id: room.name().to_string(),
            local_peer: local_peer(&room.local_participant()),
        };
        *self.room.lock().await = Some(room);

        notify(&self.observers, SdkEvent::JoinSuccess(info));

        let observers = self.observers.clone();
        *self.pump.lock().await = Some(tokio::spawn(pump(events, observers)));
        Ok(())
    }

    async fn leave(&self) -> Result<(), HuddleError> {
        let room = self
            .room
            .lock()
            .await
            .take()
            .ok_or_else(|| HuddleError::Room("not connected".into()))?;
        room.close()
            .await
            .map_err(|e| HuddleError::Room(format!("close: {e}")))
    }

    async fn destroy(&self) -> Result<(), HuddleError> {
        if let Some(handle) = self.pump.lock().await.take() {
            handle.abort();
        }
        self.observers
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .clear();
        self.room.lock().await.take();
        Ok(())
    }

    fn add_event_listener(&self, kind: SdkEventKind, observer: Arc<dyn SdkObserver>) {
        self.observers
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .insert(kind, observer);
    }

    fn remove_event_listener(&self, kind: SdkEventKind) {
        self.observers
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .remove(&kind);
    }
}

fn notify(observers: &Observers, event: SdkEvent) {
    let observer = observers
        .read()
        .unwrap_or_else(|e| e.into_inner())
        .get(&event.kind())
        .cloned();
    match observer {
        Some(observer) => observer.on_sdk_event(event),
        None => tracing::debug!("no observer for {:?}", event.kind()),
    }
}

async fn pump(mut events: mpsc::UnboundedReceiver<RoomEvent>, observers: Observers) {
    while let Some(event) = events.recv().await {
        let translated = match event {
            RoomEvent::ParticipantConnected(participant) => SdkEvent::PeerUpdate {
                peer: remote_peer(&participant),
                update: PeerUpdateType::Joined,
            },
            RoomEvent::ParticipantDisconnected(participant) => SdkEvent::PeerUpdate {
                peer: remote_peer(&participant),
                update: PeerUpdateType::Left,
            },
            RoomEvent::TrackSubscribed { publication, participant, .. } => SdkEvent::TrackUpdate {
                peer: remote_peer(&participant),
                track: to_track(
                    publication.sid().to_string(),
                    publication.kind(),
                    publication.source(),
                    publication.is_muted(),
                ),
                update: TrackUpdateType::Added,
            },
            RoomEvent::TrackUnsubscribed { publication, participant, .. } => {
                SdkEvent::TrackUpdate {
                    peer: remote_peer(&participant),
                    track: to_track(
                        publication.sid().to_string(),
                        publication.kind(),
                        publication.source(),
                        publication.is_muted(),
                    ),
                    update: TrackUpdateType::Removed,
                }
            }
            RoomEvent::LocalTrackPublished { publication, participant, .. } => {
                SdkEvent::TrackUpdate {
                    peer: local_peer(&participant),
                    track: to_track(
                        publication.sid().to_string(),
                        publication.kind(),
                        publication.source(),
                        publication.is_muted(),
                    ),
                    update: TrackUpdateType::Added,
                }
            }
            RoomEvent::LocalTrackUnpublished { publication, participant } => {
                SdkEvent::TrackUpdate {
                    peer: local_peer(&participant),
                    track: to_track(
                        publication.sid().to_string(),
                        publication.kind(),
                        publication.source(),
                        publication.is_muted(),
                    ),
                    update: TrackUpdateType::Removed,
                }
            }
            RoomEvent::TrackMuted { participant, publication } => SdkEvent::TrackUpdate {
                peer: participant_peer(&participant),
                track: to_track(
                    publication.sid().to_string(),
                    publication.kind(),
                    publication.source(),
                    true,
                ),
                update: TrackUpdateType::Muted,
            },
            RoomEvent::TrackUnmuted { participant, publication } => SdkEvent::TrackUpdate {
                peer: participant_peer(&participant),
                track: to_track(
                    publication.sid().to_string(),
                    publication.kind(),
                    publication.source(),
                    false,
                ),
                update: TrackUpdateType::Unmuted,
            },
            RoomEvent::ParticipantNameChanged { participant, .. } => SdkEvent::PeerUpdate {
                peer: participant_peer(&participant),
                update: PeerUpdateType::NameChanged,
            },
            RoomEvent::ParticipantMetadataChanged { participant, .. } => SdkEvent::PeerUpdate {
                peer: participant_peer(&participant),
                update: PeerUpdateType::MetadataChanged,
            },
            RoomEvent::ConnectionQualityChanged { participant, .. } => SdkEvent::PeerUpdate {
                peer: participant_peer(&participant),
                update: PeerUpdateType::NetworkQualityUpdated,
            },
            RoomEvent::Disconnected { reason } => {
                notify(
                    &observers,
                    SdkEvent::Error(SdkError {
                        code: ERROR_DISCONNECTED,
                        description: format!("disconnected: {reason:?}"),
                    }),
                );
                break;
            }
            other => {
                tracing::debug!("unhandled room event: {other:?}");
                continue;
            }
        };
        notify(&observers, translated);
    }

    tracing::info!("livekit event pump ended");
}

fn to_source(source: LkTrackSource) -> TrackSource {
    match source {
        LkTrackSource::Camera | LkTrackSource::Microphone => TrackSource::Regular,
        LkTrackSource::Screenshare | LkTrackSource::ScreenshareAudio => TrackSource::Screen,
        other => TrackSource::Other(format!("{other:?}").to_lowercase()),
    }
}

fn to_track(sid: String, kind: LkTrackKind, source: LkTrackSource, is_muted: bool) -> Track {
    Track {
        id: sid,
        kind: match kind {
            LkTrackKind::Audio => TrackKind::Audio,
            LkTrackKind::Video => TrackKind::Video,
        },
        source: to_source(source),
        is_muted,
    }
}

fn build_peer(
    id: String,
    name: String,
    identity: String,
    is_local: bool,
    tracks: Vec<Track>,
) -> Peer {
    let pick = |kind: TrackKind| {
        tracks
            .iter()
            .find(|t| t.kind == kind && t.source == TrackSource::Regular)
            .cloned()
    };
    Peer {
        id,
        name: if name.is_empty() { identity } else { name },
        is_local,
        video_track: pick(TrackKind::Video),
        audio_track: pick(TrackKind::Audio),
    }
}

fn remote_peer(p: &RemoteParticipant) -> Peer {
    let tracks = p
        .track_publications()
        .values()
        .map(|pub_| to_track(pub_.sid().to_string(), pub_.kind(), pub_.source(), pub_.is_muted()))
        .collect();
    build_peer(
        p.sid().to_string(),
        p.name().to_string(),
        p.identity().to_string(),
        false,
        tracks,
    )
}

fn local_peer(p: &LocalParticipant) -> Peer {
    let tracks = p
        .track_publications()
        .values()
        .map(|pub_| to_track(pub_.sid().to_string(), pub_.kind(), pub_.source(), pub_.is_muted()))
        .collect();
    build_peer(
        p.sid().to_string(),
        p.name().to_string(),
        p.identity().to_string(),
        true,
        tracks,
    )
}

fn participant_peer(participant: &Participant) -> Peer {
    match participant {
        Participant::Local(p) => local_peer(p),
        Participant::Remote(p) => remote_peer(p),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sources_map_to_tile_sources() {
        assert_eq!(to_source(LkTrackSource::Camera), TrackSource::Regular);
        assert_eq!(to_source(LkTrackSource::Screenshare), TrackSource::Screen);
    }

    #[test]
    fn peer_prefers_name_and_picks_regular_video() {
        let tracks = vec![
            to_track("s".into(), LkTrackKind::Video, LkTrackSource::Screenshare, false),
            to_track("c".into(), LkTrackKind::Video, LkTrackSource::Camera, false),
            to_track("m".into(), LkTrackKind::Audio, LkTrackSource::Microphone, true),
        ];
        let peer = build_peer("PA_1".into(), String::new(), "alice".into(), false, tracks);
        assert_eq!(peer.name, "alice");
        assert_eq!(peer.video_track.map(|t| t.id), Some("c".to_string()));
        assert_eq!(peer.audio_track.map(|t| t.is_muted), Some(true));
    }
}
