use crate::config::Config;
use crate::error::{ReportError, Result};
use super::types::*;
use super::TextGenerator;
use async_trait::async_trait;
use log::{debug, info};
use reqwest::Client;
use std::time::Duration;

/// Client for a hosted text-generation endpoint
pub struct HttpTextGenerator {
    client: Client,
    endpoint: String,
    model_name: String,
    api_token: Option<String>,
}

impl HttpTextGenerator {
    /// Builds a client from the `[model]` section
    pub fn new(config: &Config) -> Result<Self> {
        let mut builder = Client::builder();
        if let Some(secs) = config.model.timeout_seconds {
            builder = builder.timeout(Duration::from_secs(secs));
        }
        let client = builder
            .build()
            .map_err(|e| ReportError::Model(e.to_string()))?;

        Ok(Self {
            client,
            endpoint: config.model.endpoint.clone(),
            model_name: config.model.model_name.clone(),
            api_token: config.model_token(),
        })
    }
}

#[async_trait]
impl TextGenerator for HttpTextGenerator {
    async fn generate(&self, prompt: &str, max_length: usize) -> Result<String> {
        info!("Requesting generation from {} ({} prompt bytes)", self.model_name, prompt.len());

        let body = GenerationRequest {
            inputs: prompt.to_string(),
            parameters: GenerationParameters {
                max_length,
                num_return_sequences: 1,
                return_full_text: true,
            },
        };

        let mut request = self.client.post(&self.endpoint).json(&body);
        if let Some(token) = &self.api_token {
            request = request.bearer_auth(token);
        }

        let response = request
            .send()
            .await
            .map_err(|e| ReportError::Network(e.to_string()))?;

        let status = response.status();
        let text = response.text().await?;
        if !status.is_success() {
            return Err(ReportError::Model(format!(
                "Generation failed: HTTP {}: {}", status, text.trim()
            )));
        }

        let parsed: GenerationResponse = serde_json::from_str(&text)
            .map_err(|e| ReportError::Model(format!("Unexpected generation response: {}", e)))?;

        let generated = match parsed {
            GenerationResponse::Sequences(mut sequences) => {
                if sequences.is_empty() {
                    return Err(ReportError::Model("Generation returned no sequences".into()));
                }
                sequences.swap_remove(0).generated_text
            }
            GenerationResponse::Single(sequence) => sequence.generated_text,
            GenerationResponse::Error { error } => return Err(ReportError::Model(error)),
        };

        debug!("Model returned {} bytes", generated.len());
        Ok(generated)
    }

    fn name(&self) -> &str {
        &self.model_name
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::{Matcher, Server};
    use serde_json::json;

    fn config_for(url: String) -> Config {
        let mut config = Config::default();
        config.model.endpoint = url;
        config.model.api_token = Some("hf_test".to_string());
        config
    }

    #[tokio::test]
    async fn test_generate_sends_one_sequence_request() -> Result<()> {
        let mut server = Server::new_async().await;
        let mock = server.mock("POST", "/models/distilgpt2")
            .match_header("authorization", "Bearer hf_test")
            .match_body(Matcher::PartialJson(json!({
                "inputs": "Organize this",
                "parameters": {"max_length": 500, "num_return_sequences": 1}
            })))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"[{"generated_text": "Organize this and more"}]"#)
            .create_async()
            .await;

        let generator = HttpTextGenerator::new(&config_for(format!("{}/models/distilgpt2", server.url())))?;
        let text = generator.generate("Organize this", 500).await?;

        assert_eq!(text, "Organize this and more");
        mock.assert_async().await;
        Ok(())
    }

    #[tokio::test]
    async fn test_single_object_response() -> Result<()> {
        let mut server = Server::new_async().await;
        let _mock = server.mock("POST", "/generate")
            .with_status(200)
            .with_body(r#"{"generated_text": "hello"}"#)
            .create_async()
            .await;

        let generator = HttpTextGenerator::new(&config_for(format!("{}/generate", server.url())))?;
        assert_eq!(generator.generate("hi", 20).await?, "hello");
        Ok(())
    }

    #[tokio::test]
    async fn test_http_error_propagates() {
        let mut server = Server::new_async().await;
        let _mock = server.mock("POST", "/generate")
            .with_status(503)
            .with_body(r#"{"error": "Model distilgpt2 is currently loading"}"#)
            .create_async()
            .await;

        let generator = HttpTextGenerator::new(&config_for(format!("{}/generate", server.url()))).unwrap();
        let err = generator.generate("hi", 20).await.unwrap_err();
        assert!(matches!(err, ReportError::Model(ref msg) if msg.contains("503")));
    }

    #[tokio::test]
    async fn test_error_object_with_ok_status() {
        let mut server = Server::new_async().await;
        let _mock = server.mock("POST", "/generate")
            .with_status(200)
            .with_body(r#"{"error": "rate limited"}"#)
            .create_async()
            .await;

        let generator = HttpTextGenerator::new(&config_for(format!("{}/generate", server.url()))).unwrap();
        let err = generator.generate("hi", 20).await.unwrap_err();
        assert!(matches!(err, ReportError::Model(ref msg) if msg == "rate limited"));
    }

    #[tokio::test]
    async fn test_empty_sequence_list() {
        let mut server = Server::new_async().await;
        let _mock = server.mock("POST", "/generate")
            .with_status(200)
            .with_body("[]")
            .create_async()
            .await;

        let generator = HttpTextGenerator::new(&config_for(format!("{}/generate", server.url()))).unwrap();
        assert!(generator.generate("hi", 20).await.is_err());
    }
}
