use anyhow::{bail, Context};
use dotrelay_compose::ToolDescriptor;
use dotrelay_core::ExecutionResult;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use serde_json::{json, Map, Value};

/// Thin HTTP client for a running dotrelay-server.
pub struct ServerClient {
    client: Client,
    base_url: String,
}

#[derive(Deserialize)]
struct ErrorBody {
    error: String,
}

impl ServerClient {
    pub fn new(base_url: &str) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    pub async fn health(&self) -> anyhow::Result<bool> {
        let url = format!("{}/health", self.base_url);
        let response = self.client.get(&url).send().await?;
        Ok(response.status().is_success())
    }

    pub async fn tools(&self) -> anyhow::Result<Vec<ToolDescriptor>> {
        let url = format!("{}/api/v1/tools", self.base_url);
        let response = self.client.get(&url).send().await?;
        if !response.status().is_success() {
            bail!("Failed to list tools: {}", response.status());
        }
        Ok(response.json().await?)
    }

    pub async fn describe(&self, name: &str) -> anyhow::Result<ToolDescriptor> {
        let url = format!("{}/api/v1/tools/{}", self.base_url, name);
        let response = self.client.get(&url).send().await?;
        match response.status() {
            StatusCode::NOT_FOUND => bail!("Unknown tool: {}", name),
            status if !status.is_success() => bail!("Failed to describe {}: {}", name, status),
            _ => Ok(response.json().await?),
        }
    }

    pub async fn call(
        &self,
        name: &str,
        arguments: Map<String, Value>,
        working_directory: Option<&str>,
        timeout_seconds: Option<u64>,
    ) -> anyhow::Result<ExecutionResult> {
        let url = format!("{}/api/v1/tools/{}?format=json", self.base_url, name);
        let payload = json!({
            "arguments": arguments,
            "workingDirectory": working_directory,
            "timeoutSeconds": timeout_seconds,
        });

        let response = self
            .client
            .post(&url)
            .json(&payload)
            .send()
            .await
            .with_context(|| format!("Failed to reach server at {}", self.base_url))?;

        let status = response.status();
        if status.is_success() {
            return Ok(response.json().await?);
        }
        let message = match response.json::<ErrorBody>().await {
            Ok(body) => body.error,
            Err(_) => status.to_string(),
        };
        bail!("{} rejected ({}): {}", name, status.as_u16(), message)
    }
}
