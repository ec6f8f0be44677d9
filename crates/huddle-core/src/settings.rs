use std::path::{Path, PathBuf};
use std::sync::Mutex;

use serde::{Deserialize, Serialize};

use crate::room::MeetingConfig;

pub const DEFAULT_DISPLAY_NAME: &str = "John Appleseed";
pub const DEFAULT_ROOM_CODE: &str = "abc-lmno-xyz";

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct Settings {
    #[serde(default = "default_display_name")]
    pub display_name: String,
    #[serde(default = "default_room_code")]
    pub room_code: String,
    /// Pre-supplied join token; when set the room code is not exchanged.
    #[serde(default)]
    pub auth_token: Option<String>,
    #[serde(default)]
    pub token_endpoint: Option<String>,
    #[serde(default)]
    pub server_url: Option<String>,
}

fn default_display_name() -> String {
    DEFAULT_DISPLAY_NAME.to_string()
}

fn default_room_code() -> String {
    DEFAULT_ROOM_CODE.to_string()
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            display_name: default_display_name(),
            room_code: default_room_code(),
            auth_token: None,
            token_endpoint: None,
            server_url: None,
        }
    }
}

impl Settings {
    pub fn meeting_config(&self) -> MeetingConfig {
        MeetingConfig {
            room_code: Some(self.room_code.clone()).filter(|c| !c.trim().is_empty()),
            auth_token: self.auth_token.clone().filter(|t| !t.trim().is_empty()),
            user_name: self.display_name.clone(),
        }
    }
}

pub struct SettingsStore {
    settings: Mutex<Settings>,
    file_path: PathBuf,
}

impl SettingsStore {
    pub fn new(data_dir: &str) -> Self {
        let file_path = PathBuf::from(data_dir).join("settings.json");
        let settings = Self::load(&file_path);
        Self {
            settings: Mutex::new(settings),
            file_path,
        }
    }

    pub fn get(&self) -> Settings {
        self.lock().clone()
    }

    pub fn set_display_name(&self, name: String) {
        self.lock().display_name = name;
        self.save();
    }

    pub fn set_room_code(&self, code: String) {
        self.lock().room_code = code;
        self.save();
    }

    pub fn set_auth_token(&self, token: Option<String>) {
        self.lock().auth_token = token;
        self.save();
    }

    pub fn set_token_endpoint(&self, endpoint: Option<String>) {
        self.lock().token_endpoint = endpoint;
        self.save();
    }

    pub fn set_server_url(&self, url: Option<String>) {
        self.lock().server_url = url;
        self.save();
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Settings> {
        self.settings.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn save(&self) {
        let settings = self.get();
        if let Some(parent) = self.file_path.parent() {
            let _ = std::fs::create_dir_all(parent);
        }
        match serde_json::to_string_pretty(&settings) {
            Ok(json) => {
                if let Err(e) = std::fs::write(&self.file_path, json) {
                    tracing::warn!("failed to write settings: {e}");
                }
            }
            Err(e) => tracing::warn!("failed to serialize settings: {e}"),
        }
    }

    fn load(path: &Path) -> Settings {
        match std::fs::read_to_string(path) {
            Ok(contents) => serde_json::from_str(&contents).unwrap_or_else(|e| {
                tracing::warn!("settings file unreadable, using defaults: {e}");
                Settings::default()
            }),
            Err(_) => Settings::default(),
        }
    }
}
