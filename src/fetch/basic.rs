use super::client::HttpClient;
use async_trait::async_trait;
use std::time::Duration;

pub struct BasicClient(reqwest::Client);

impl BasicClient {
    pub fn new() -> Self {
        Self(reqwest::Client::new())
    }

    pub fn with_timeouts(timeout: Duration, connect_timeout: Duration) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .connect_timeout(connect_timeout)
            .build()?;
        Ok(Self(client))
    }
}

impl Default for BasicClient {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl HttpClient for BasicClient {
    async fn execute(&self, req: reqwest::Request) -> reqwest::Result<reqwest::Response> {
        self.0.execute(req).await
    }
}
