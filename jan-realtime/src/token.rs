//! LiveKit access-token minting (spec §4.3.1): a JWT carrying `video` grants
//! (`roomJoin`, `room`, `canPublish`, `canSubscribe`, `canPublishData`),
//! signed locally with the configured API key/secret, identity = user id.

use jsonwebtoken::{encode, EncodingKey, Header};
use serde::Serialize;

#[derive(Serialize)]
struct VideoGrant {
    #[serde(rename = "roomJoin")]
    room_join: bool,
    room: String,
    #[serde(rename = "canPublish")]
    can_publish: bool,
    #[serde(rename = "canSubscribe")]
    can_subscribe: bool,
    #[serde(rename = "canPublishData")]
    can_publish_data: bool,
}

#[derive(Serialize)]
struct Claims {
    iss: String,
    sub: String,
    exp: i64,
    nbf: i64,
    video: VideoGrant,
}

pub struct LiveKitTokenMinter {
    api_key: String,
    api_secret: String,
}

impl LiveKitTokenMinter {
    pub fn new(api_key: impl Into<String>, api_secret: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            api_secret: api_secret.into(),
        }
    }

    /// Mints a token granting `user_id` join/publish/subscribe access to
    /// `room`, valid for `ttl` from now (spec §4.3.1: `LiveKitTokenTTL`).
    pub fn mint(&self, room: &str, user_id: &str, ttl: std::time::Duration) -> jan_core::JanResult<String> {
        let now = jan_core::now().timestamp();
        let claims = Claims {
            iss: self.api_key.clone(),
            sub: user_id.to_string(),
            nbf: now,
            exp: now + ttl.as_secs() as i64,
            video: VideoGrant {
                room_join: true,
                room: room.to_string(),
                can_publish: true,
                can_subscribe: true,
                can_publish_data: true,
            },
        };
        encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(self.api_secret.as_bytes()),
        )
        .map_err(|e| crate::error::external(format!("token signing failed: {e}")))
    }
}
