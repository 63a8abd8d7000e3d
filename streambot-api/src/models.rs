//! Request and response bodies.

use serde::{Deserialize, Serialize};
use streambot_shared::ExternalId;

/// Body of `PUT /channels`.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateChannelRequest {
    pub name: String,
}

/// Answer to `PUT /channels`.
#[derive(Debug, Clone, Serialize)]
pub struct CreateChannelResponse {
    pub id: ExternalId,
}

/// Body of `POST /channels/{id}/subscriptions`.
///
/// `created_at` defaults to 0 when omitted.
#[derive(Debug, Clone, Deserialize)]
pub struct SubscribeRequest {
    pub channel_id: String,
    #[serde(default)]
    pub created_at: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_subscribe_request_defaults_created_at() {
        let request: SubscribeRequest =
            serde_json::from_str(r#"{"channel_id": "abc"}"#).unwrap();

        assert_eq!(request.channel_id, "abc");
        assert_eq!(request.created_at, 0);
    }
}
