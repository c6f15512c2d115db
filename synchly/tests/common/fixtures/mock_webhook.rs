//! Mock webhook endpoint for notification delivery

use serde_json::Value;
use wiremock::{
    matchers::{method, path},
    Mock, MockServer, ResponseTemplate,
};

pub struct MockWebhookServer {
    pub server: MockServer,
}

impl MockWebhookServer {
    pub async fn start() -> Self {
        Self {
            server: MockServer::start().await,
        }
    }

    pub fn url(&self) -> String {
        format!("{}/webhook", self.server.uri())
    }

    /// Accept deliveries with the given status, expecting exactly `times` of them
    pub async fn respond_with(&self, status: u16, times: u64) {
        Mock::given(method("POST"))
            .and(path("/webhook"))
            .respond_with(ResponseTemplate::new(status))
            .expect(times)
            .mount(&self.server)
            .await;
    }

    pub async fn received_bodies(&self) -> Vec<Value> {
        self.server
            .received_requests()
            .await
            .unwrap_or_default()
            .iter()
            .filter_map(|request| request.body_json::<Value>().ok())
            .collect()
    }
}
