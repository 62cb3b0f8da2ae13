use reqwest::Client;
use url::Url;
use warboard_common::models::{BoardParams, CreateResponse};

use crate::Result;

/// HTTP client for the warboard server API
pub struct WarboardClient {
    client: Client,
    base_url: Url,
}

impl WarboardClient {
    pub fn new(base_url: &str) -> Result<Self> {
        Ok(Self {
            client: Client::new(),
            base_url: Url::parse(base_url)?,
        })
    }

    /// Create a board on the server, returning its id
    pub async fn create_board(&self, params: BoardParams) -> Result<String> {
        let response = self
            .client
            .post(self.base_url.join("/create")?)
            .json(&params)
            .send()
            .await?
            .error_for_status()?;

        let created: CreateResponse = response.json().await?;
        Ok(created.id)
    }

    /// WebSocket URL for joining a board, with the scheme mapped to ws/wss
    pub fn websocket_url(&self, board_id: &str) -> Result<String> {
        let mut url = self.base_url.join("/ws")?;
        let scheme = if self.base_url.scheme() == "https" {
            "wss"
        } else {
            "ws"
        };
        url.set_scheme(scheme)
            .map_err(|_| "unsupported base URL scheme")?;
        url.set_query(Some(&format!("id={}", board_id)));

        Ok(url.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn websocket_urls_follow_the_http_scheme() {
        let client = WarboardClient::new("http://localhost:8000").unwrap();
        assert_eq!(
            client.websocket_url("abc12").unwrap(),
            "ws://localhost:8000/ws?id=abc12"
        );

        let client = WarboardClient::new("https://boards.example.com").unwrap();
        assert_eq!(
            client.websocket_url("abc12").unwrap(),
            "wss://boards.example.com/ws?id=abc12"
        );
    }
}
