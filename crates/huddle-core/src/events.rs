use std::sync::{Arc, RwLock};

use crate::navigation::Screen;
use crate::sdk::SdkError;
use crate::tiles::PeerTrackNode;

/// Events emitted by the core to native UI listeners.
#[derive(Debug, Clone)]
pub enum HuddleEvent {
    ScreenChanged(Screen),
    LoadingChanged(bool),
    TilesChanged(Vec<PeerTrackNode>),
    /// User-visible failure message (join aborted).
    Alert(String),
    SessionError(SdkError),
}

/// Trait for receiving events from the core.
/// Implementations must be Send + Sync (called from tokio tasks).
pub trait HuddleEventListener: Send + Sync {
    fn on_event(&self, event: HuddleEvent);
}

/// Internal event emitter that dispatches to registered listeners.
#[derive(Clone)]
pub struct EventEmitter {
    listeners: Arc<RwLock<Vec<Arc<dyn HuddleEventListener>>>>,
}

impl EventEmitter {
    pub fn new() -> Self {
        Self {
            listeners: Arc::new(RwLock::new(Vec::new())),
        }
    }

    pub fn add_listener(&self, listener: Arc<dyn HuddleEventListener>) {
        self.listeners
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .push(listener);
    }

    pub fn emit(&self, event: HuddleEvent) {
        let listeners = self.listeners.read().unwrap_or_else(|e| e.into_inner());
        for listener in listeners.iter() {
            listener.on_event(event.clone());
        }
    }
}

impl Default for EventEmitter {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingListener {
        count: Arc<AtomicUsize>,
    }

    impl HuddleEventListener for CountingListener {
        fn on_event(&self, _event: HuddleEvent) {
            self.count.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[test]
    fn emitter_dispatches_to_multiple_listeners() {
        let emitter = EventEmitter::new();
        let count1 = Arc::new(AtomicUsize::new(0));
        let count2 = Arc::new(AtomicUsize::new(0));

        emitter.add_listener(Arc::new(CountingListener { count: count1.clone() }));
        emitter.add_listener(Arc::new(CountingListener { count: count2.clone() }));

        emitter.emit(HuddleEvent::LoadingChanged(false));

        assert_eq!(count1.load(Ordering::SeqCst), 1);
        assert_eq!(count2.load(Ordering::SeqCst), 1);
    }

    struct EventCapture {
        events: Arc<std::sync::Mutex<Vec<HuddleEvent>>>,
    }

    impl HuddleEventListener for EventCapture {
        fn on_event(&self, event: HuddleEvent) {
            self.events.lock().unwrap().push(event);
        }
    }

    #[test]
    fn emitter_delivers_correct_events() {
        let emitter = EventEmitter::new();
        let events = Arc::new(std::sync::Mutex::new(Vec::new()));
        emitter.add_listener(Arc::new(EventCapture { events: events.clone() }));

        emitter.emit(HuddleEvent::Alert("join failed".to_string()));

        let captured = events.lock().unwrap();
        assert_eq!(captured.len(), 1);
        match &captured[0] {
            HuddleEvent::Alert(msg) => assert_eq!(msg, "join failed"),
            _ => panic!("expected Alert"),
        }
    }
}
