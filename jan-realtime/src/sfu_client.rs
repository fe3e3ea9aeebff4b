//! SFU control-plane client (spec §4.3.2 step 1): asks LiveKit's room-listing
//! endpoint for the set of active rooms and their observed participant count.
//! The control plane itself is an external collaborator (spec.md §1); this is
//! the thin client the reconciler needs to reach it.

use std::collections::HashMap;

use jan_core::{JanError, JanResult};
use serde::Deserialize;

const LAYER: &str = "realtime_sfu_client";

#[derive(Debug, Clone, Copy)]
pub struct RoomInfo {
    pub num_participants: u32,
}

#[async_trait::async_trait]
pub trait SfuClient: Send + Sync {
    /// Returns `{name -> {numParticipants}}` for every currently active room,
    /// or an error if the control plane is unreachable (spec §4.3.2 "Fallback").
    async fn list_rooms(&self) -> JanResult<HashMap<String, RoomInfo>>;
}

#[derive(Deserialize)]
struct ListRoomsResponse {
    rooms: Vec<RoomEntry>,
}

#[derive(Deserialize)]
struct RoomEntry {
    name: String,
    #[serde(default, rename = "numParticipants")]
    num_participants: u32,
}

pub struct HttpSfuClient {
    client: reqwest::Client,
    base_url: String,
}

impl HttpSfuClient {
    pub fn new(client: reqwest::Client, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into(),
        }
    }
}

#[async_trait::async_trait]
impl SfuClient for HttpSfuClient {
    async fn list_rooms(&self) -> JanResult<HashMap<String, RoomInfo>> {
        let url = format!("{}/twirp/livekit.RoomService/ListRooms", self.base_url);
        let response = self
            .client
            .post(&url)
            .json(&serde_json::json!({}))
            .send()
            .await
            .map_err(|e| JanError::external(LAYER, format!("list rooms request failed: {e}")))?;

        if !response.status().is_success() {
            return Err(JanError::external(
                LAYER,
                format!("list rooms returned {}", response.status()),
            ));
        }

        let body: ListRoomsResponse = response
            .json()
            .await
            .map_err(|e| JanError::external(LAYER, format!("list rooms response malformed: {e}")))?;
        Ok(body
            .rooms
            .into_iter()
            .map(|r| {
                (
                    r.name,
                    RoomInfo {
                        num_participants: r.num_participants,
                    },
                )
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::method;
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn list_rooms_maps_name_to_participant_count() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "rooms": [
                    {"name": "jan-realtime-1", "numParticipants": 2},
                    {"name": "jan-realtime-2", "numParticipants": 0},
                ]
            })))
            .mount(&server)
            .await;

        let client = HttpSfuClient::new(reqwest::Client::new(), server.uri());
        let rooms = client.list_rooms().await.unwrap();
        assert_eq!(rooms["jan-realtime-1"].num_participants, 2);
        assert_eq!(rooms["jan-realtime-2"].num_participants, 0);
    }
}
