use std::fmt;
use std::str::FromStr;
use std::sync::{Arc, RwLock};

use crate::errors::HuddleError;
use crate::events::{EventEmitter, HuddleEvent};

/// The two screens of the app shell: pre-join and in-room.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Screen {
    #[default]
    Welcome,
    Meeting,
}

impl Screen {
    pub fn token(self) -> &'static str {
        match self {
            Self::Welcome => "WelcomeScreen",
            Self::Meeting => "MeetingScreen",
        }
    }
}

impl fmt::Display for Screen {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.token())
    }
}

impl FromStr for Screen {
    type Err = HuddleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "WelcomeScreen" => Ok(Self::Welcome),
            "MeetingScreen" => Ok(Self::Meeting),
            other => Err(HuddleError::Room(format!("unknown screen '{other}'"))),
        }
    }
}

/// Tracks the current screen and tells listeners when it changes.
#[derive(Clone)]
pub struct Navigator {
    current: Arc<RwLock<Screen>>,
    emitter: EventEmitter,
}

impl Navigator {
    pub fn new(emitter: EventEmitter) -> Self {
        Self {
            current: Arc::new(RwLock::new(Screen::Welcome)),
            emitter,
        }
    }

    pub fn current(&self) -> Screen {
        *self.current.read().unwrap_or_else(|e| e.into_inner())
    }

    /// Switch to `screen`. Re-navigating to the current screen is silent.
    pub fn navigate(&self, screen: Screen) {
        {
            let mut current = self.current.write().unwrap_or_else(|e| e.into_inner());
            if *current == screen {
                return;
            }
            *current = screen;
        }
        tracing::info!("navigate to {screen}");
        self.emitter.emit(HuddleEvent::ScreenChanged(screen));
    }
}
