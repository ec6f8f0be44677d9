use std::sync::LazyLock;

use regex::Regex;
use serde::Deserialize;
use url::Url;

use crate::errors::HuddleError;

static ROOM_CODE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[a-z]{3}-[a-z]{4}-[a-z]{3}$").expect("room code pattern is valid")
});

/// Response from the token endpoint.
#[derive(Debug, Deserialize)]
struct TokenResponse {
    token: String,
    #[serde(default)]
    url: Option<String>,
}

/// Token and, when the endpoint provides one, the media server URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenInfo {
    pub token: String,
    /// WebSocket URL (ws:// or wss://)
    pub server_url: Option<String>,
}

/// Room code handling and code-for-token exchange.
pub struct AuthService;

impl AuthService {
    /// Extract and validate the room code from user input.
    /// Accepts a full URL (`https://meet.example.com/abc-lmno-xyz`) or a bare code.
    /// Code format: 3 lowercase + dash + 4 lowercase + dash + 3 lowercase.
    pub fn extract_room_code(input: &str) -> Result<String, HuddleError> {
        let input = input.trim().trim_end_matches('/');
        let candidate = input.rsplit('/').next().unwrap_or("");
        if ROOM_CODE.is_match(candidate) {
            Ok(candidate.to_string())
        } else {
            Err(HuddleError::InvalidRoomCode(format!(
                "invalid room code format: '{candidate}'"
            )))
        }
    }

    /// Build the exchange URL for `room_code` under `endpoint`.
    pub fn token_url(
        endpoint: &str,
        room_code: &str,
        user_id: Option<&str>,
    ) -> Result<Url, HuddleError> {
        let endpoint = endpoint.trim().trim_end_matches('/');
        let endpoint = if endpoint.contains("://") {
            endpoint.to_string()
        } else {
            format!("https://{endpoint}")
        };

        let mut raw = format!("{endpoint}/api/v1/rooms/{room_code}/token");
        if let Some(user) = user_id {
            raw.push_str(&format!("?user_id={}", urlencoding::encode(user)));
        }

        Url::parse(&raw).map_err(|e| HuddleError::Http(format!("bad token endpoint '{raw}': {e}")))
    }

    /// Exchange a room code for a join token over HTTP.
    pub async fn request_token(
        endpoint: &str,
        room_code: &str,
        user_id: Option<&str>,
    ) -> Result<TokenInfo, HuddleError> {
        let room_code = Self::extract_room_code(room_code)?;
        let url = Self::token_url(endpoint, &room_code, user_id)?;

        tracing::info!("requesting token: {url}");

        let resp = reqwest::get(url)
            .await
            .map_err(|e| HuddleError::Http(e.to_string()))?;

        if !resp.status().is_success() {
            return Err(HuddleError::Auth(format!(
                "token endpoint returned status {}",
                resp.status()
            )));
        }

        let body = resp
            .text()
            .await
            .map_err(|e| HuddleError::Http(e.to_string()))?;
        Self::parse_token_response(&body)
    }

    fn parse_token_response(body: &str) -> Result<TokenInfo, HuddleError> {
        let data: TokenResponse = serde_json::from_str(body)
            .map_err(|e| HuddleError::Auth(format!("invalid token response: {e}")))?;

        if data.token.is_empty() {
            return Err(HuddleError::Auth("token endpoint returned an empty token".into()));
        }

        Ok(TokenInfo {
            token: data.token,
            server_url: data.url.map(|u| to_websocket_url(&u)),
        })
    }
}

fn to_websocket_url(url: &str) -> String {
    url.replace("https://", "wss://").replace("http://", "ws://")
}
