use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use tokio::sync::{Mutex, mpsc};
use tokio::task::JoinHandle;

use crate::auth::AuthService;
use crate::dispatch::{self, Reaction, RoomState};
use crate::errors::HuddleError;
use crate::events::{EventEmitter, HuddleEvent, HuddleEventListener};
use crate::navigation::{Navigator, Screen};
use crate::sdk::{JoinConfig, SdkEvent, SdkEventKind, SdkObserver, SdkSession, VideoSdk};
use crate::tiles::PeerTrackNode;

/// What the room screen needs to join.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MeetingConfig {
    pub room_code: Option<String>,
    /// Takes precedence over `room_code` when present.
    pub auth_token: Option<String>,
    pub user_name: String,
}

/// A session handle plus the machinery feeding its events into the state.
struct ActiveSession {
    generation: u64,
    session: Arc<dyn SdkSession>,
    active: Arc<AtomicBool>,
    event_loop: Option<JoinHandle<()>>,
}

/// Forwards SDK callbacks into the event loop channel until deactivated.
struct ChannelObserver {
    events: mpsc::UnboundedSender<SdkEvent>,
    active: Arc<AtomicBool>,
}

impl SdkObserver for ChannelObserver {
    fn on_sdk_event(&self, event: SdkEvent) {
        if !self.active.load(Ordering::SeqCst) {
            tracing::debug!("dropping sdk event after teardown: {:?}", event.kind());
            return;
        }
        if self.events.send(event).is_err() {
            tracing::debug!("sdk event loop already closed");
        }
    }
}

/// Owns the SDK session for as long as the room screen is shown.
///
/// `enter` builds and joins, `leave_room` is the single teardown path.
/// Both are serialized, so a leave requested while a join is in flight
/// runs once the join settles.
#[derive(Clone)]
pub struct RoomManager {
    sdk: Arc<dyn VideoSdk>,
    session: Arc<Mutex<Option<ActiveSession>>>,
    lifecycle: Arc<Mutex<()>>,
    generations: Arc<AtomicU64>,
    state: Arc<Mutex<RoomState>>,
    emitter: EventEmitter,
    navigator: Navigator,
}

impl RoomManager {
    pub fn new(sdk: Arc<dyn VideoSdk>) -> Self {
        let emitter = EventEmitter::new();
        Self {
            sdk,
            session: Arc::new(Mutex::new(None)),
            lifecycle: Arc::new(Mutex::new(())),
            generations: Arc::new(AtomicU64::new(0)),
            state: Arc::new(Mutex::new(RoomState {
                nodes: Vec::new(),
                loading: false,
            })),
            navigator: Navigator::new(emitter.clone()),
            emitter,
        }
    }

    /// Register a listener for UI events.
    pub fn add_listener(&self, listener: Arc<dyn HuddleEventListener>) {
        self.emitter.add_listener(listener);
    }

    pub fn navigator(&self) -> &Navigator {
        &self.navigator
    }

    pub fn current_screen(&self) -> Screen {
        self.navigator.current()
    }

    /// Snapshot of the tiles to render, in display order.
    pub async fn tiles(&self) -> Vec<PeerTrackNode> {
        self.state.lock().await.nodes.clone()
    }

    pub async fn is_loading(&self) -> bool {
        self.state.lock().await.loading
    }

    pub async fn room_state(&self) -> RoomState {
        self.state.lock().await.clone()
    }

    pub async fn has_session(&self) -> bool {
        self.session.lock().await.is_some()
    }

    /// Enter the room screen and join.
    ///
    /// On failure the session is torn down, an alert is emitted and the
    /// welcome screen is shown again before the error is returned.
    pub async fn enter(&self, config: MeetingConfig) -> Result<(), HuddleError> {
        self.enter_session(config).await.map(|_| ())
    }

    /// Joins and returns the generation of the session it created.
    async fn enter_session(&self, config: MeetingConfig) -> Result<u64, HuddleError> {
        let _lifecycle = self.lifecycle.lock().await;

        if self.session.lock().await.is_some() {
            return Err(HuddleError::Room("already in a room".into()));
        }

        self.navigator.navigate(Screen::Meeting);
        self.replace_state(RoomState::new()).await;

        let generation = self.generations.fetch_add(1, Ordering::SeqCst) + 1;
        match self.join_sequence(&config, generation).await {
            Ok(()) => {
                tracing::info!("join requested as {} (session {generation})", config.user_name);
                Ok(generation)
            }
            Err(e) => {
                tracing::error!("join failed: {e}");
                if let Err(teardown) = self.teardown().await {
                    tracing::warn!("teardown after failed join: {teardown}");
                }
                self.emitter
                    .emit(HuddleEvent::Alert(format!("Unable to join the room: {e}")));
                self.navigator.navigate(Screen::Welcome);
                Err(e)
            }
        }
    }

    /// Enter the room and return a guard that leaves when dropped.
    ///
    /// The guard only ever releases the session it was created for.
    pub async fn enter_scoped(&self, config: MeetingConfig) -> Result<RoomGuard, HuddleError> {
        let generation = self.enter_session(config).await?;
        Ok(RoomGuard {
            manager: Some(self.clone()),
            generation,
        })
    }

    /// Leave the room and release the session.
    ///
    /// Leave and destroy failures are logged, not returned. The only
    /// error is [`HuddleError::NoSession`] when nothing was joined.
    pub async fn leave_room(&self) -> Result<(), HuddleError> {
        let _lifecycle = self.lifecycle.lock().await;
        let result = self.teardown().await;
        self.navigator.navigate(Screen::Welcome);
        result
    }

    /// Leave only if `generation` is still the current session.
    async fn leave_session(&self, generation: u64) -> Result<(), HuddleError> {
        let _lifecycle = self.lifecycle.lock().await;
        let current = self.session.lock().await.as_ref().map(|s| s.generation);
        if current != Some(generation) {
            tracing::debug!("session {generation} already released");
            return Err(HuddleError::NoSession);
        }
        let result = self.teardown().await;
        self.navigator.navigate(Screen::Welcome);
        result
    }

    async fn join_sequence(
        &self,
        config: &MeetingConfig,
        generation: u64,
    ) -> Result<(), HuddleError> {
        let session = self.sdk.build().await?;
        tracing::info!("sdk session built");

        let (tx, rx) = mpsc::unbounded_channel();
        let active = Arc::new(AtomicBool::new(true));
        let event_loop = tokio::spawn(Self::event_loop(
            rx,
            active.clone(),
            self.state.clone(),
            self.emitter.clone(),
        ));
        *self.session.lock().await = Some(ActiveSession {
            generation,
            session: session.clone(),
            active: active.clone(),
            event_loop: Some(event_loop),
        });

        let auth_token = match &config.auth_token {
            Some(token) => token.clone(),
            None => {
                let code = config
                    .room_code
                    .as_deref()
                    .ok_or_else(|| HuddleError::InvalidRoomCode("no room code or token".into()))?;
                let code = AuthService::extract_room_code(code)?;
                session
                    .auth_token_by_room_code(&code, Some(&config.user_name))
                    .await?
            }
        };

        let observer: Arc<dyn SdkObserver> = Arc::new(ChannelObserver { events: tx, active });
        for kind in SdkEventKind::ALL {
            session.add_event_listener(kind, observer.clone());
        }

        session
            .join(&JoinConfig {
                auth_token,
                user_name: config.user_name.clone(),
            })
            .await
    }

    async fn teardown(&self) -> Result<(), HuddleError> {
        let Some(mut active) = self.session.lock().await.take() else {
            tracing::warn!("leave requested without an active session");
            return Err(HuddleError::NoSession);
        };

        active.active.store(false, Ordering::SeqCst);
        for kind in SdkEventKind::ALL {
            active.session.remove_event_listener(kind);
        }
        if let Some(handle) = active.event_loop.take() {
            handle.abort();
            let _ = handle.await;
        }

        if let Err(e) = active.session.leave().await {
            tracing::warn!("error leaving room: {e}");
        }
        if let Err(e) = active.session.destroy().await {
            tracing::warn!("error destroying session: {e}");
        }

        self.replace_state(RoomState {
            nodes: Vec::new(),
            loading: false,
        })
        .await;
        tracing::info!("session released");
        Ok(())
    }

    async fn replace_state(&self, next: RoomState) {
        let prev = {
            let mut state = self.state.lock().await;
            std::mem::replace(&mut *state, next.clone())
        };
        Self::emit_diff(&self.emitter, &prev, &next);
    }

    fn emit_diff(emitter: &EventEmitter, prev: &RoomState, next: &RoomState) {
        if prev.loading != next.loading {
            emitter.emit(HuddleEvent::LoadingChanged(next.loading));
        }
        if prev.nodes != next.nodes {
            emitter.emit(HuddleEvent::TilesChanged(next.nodes.clone()));
        }
    }

    async fn event_loop(
        mut events: mpsc::UnboundedReceiver<SdkEvent>,
        active: Arc<AtomicBool>,
        state: Arc<Mutex<RoomState>>,
        emitter: EventEmitter,
    ) {
        while let Some(event) = events.recv().await {
            if !active.load(Ordering::SeqCst) {
                break;
            }

            let (prev, next) = {
                let mut state = state.lock().await;
                let (next, reaction) = dispatch::reduce(&state, &event);
                if reaction == Reaction::Ignored {
                    tracing::debug!("ignored sdk event: {event:?}");
                    continue;
                }
                let prev = std::mem::replace(&mut *state, next.clone());
                (prev, next)
            };

            Self::emit_diff(&emitter, &prev, &next);
            if let SdkEvent::Error(err) = event {
                emitter.emit(HuddleEvent::SessionError(err));
            }
        }

        tracing::info!("sdk event loop ended");
    }
}

/// Scoped room membership. Leaves the room when dropped unless
/// [`RoomGuard::leave`] already did.
pub struct RoomGuard {
    manager: Option<RoomManager>,
    generation: u64,
}

impl RoomGuard {
    pub async fn leave(mut self) -> Result<(), HuddleError> {
        match self.manager.take() {
            Some(manager) => manager.leave_session(self.generation).await,
            None => Err(HuddleError::NoSession),
        }
    }
}

impl Drop for RoomGuard {
    fn drop(&mut self) {
        let Some(manager) = self.manager.take() else {
            return;
        };
        let generation = self.generation;
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                handle.spawn(async move {
                    match manager.leave_session(generation).await {
                        Ok(()) | Err(HuddleError::NoSession) => {}
                        Err(e) => tracing::warn!("leave on drop: {e}"),
                    }
                });
            }
            Err(_) => tracing::warn!("room guard dropped outside a runtime, session not released"),
        }
    }
}
