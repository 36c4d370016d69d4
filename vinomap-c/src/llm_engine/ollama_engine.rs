use super::{InferenceError, InferenceResult, OllamaEngine, RetryPolicy, StreamAggregator, TransportKind};

use anyhow::Result;
use common::config::InferenceConfig;
use common::{GenerateChunk, GenerateRequest};
use futures_util::StreamExt;
use reqwest::{Client, Response};
use std::time::{Duration, Instant};
use tokio::time::sleep;
use tracing::{debug, error, info, warn};

impl OllamaEngine {
    pub fn new(config: &InferenceConfig) -> Result<Self> {
        let client = Client::builder()
            .pool_max_idle_per_host(config.pool_max_idle_per_host.max(10))
            .build()?;

        Ok(OllamaEngine {
            client,
            url: config.url.clone(),
            retry: RetryPolicy {
                max_retries: config.max_retries,
                backoff_base: config.backoff_base(),
            },
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        self.retry
    }

    /// Send `prompt` to `model` and return the full answer.
    ///
    /// `timeout` bounds the whole call, retries and body read included.
    pub async fn generate(
        &self,
        model: &str,
        prompt: &str,
        streaming: bool,
        timeout: Duration,
    ) -> InferenceResult<String> {
        info!(
            "Sending generate request to {} (model={}, stream={})",
            self.url, model, streaming
        );
        debug!("Prompt: {}", prompt);

        let request = GenerateRequest::new(model, prompt, streaming);
        let start = Instant::now();
        let result = match tokio::time::timeout(timeout, self.generate_inner(&request)).await {
            Ok(result) => result,
            Err(_) => Err(InferenceError::transport(
                TransportKind::Timeout,
                format!("request timeout after {:?}", timeout),
            )),
        };

        match &result {
            Ok(text) => info!(
                "Generate request finished: {} chars in {}ms",
                text.len(),
                start.elapsed().as_millis()
            ),
            Err(e) => error!(
                "Generate request failed after {}ms: {}",
                start.elapsed().as_millis(),
                e
            ),
        }
        result
    }

    async fn generate_inner(&self, request: &GenerateRequest) -> InferenceResult<String> {
        let response = self.send_with_retry(request).await?;
        if request.stream {
            read_stream(response).await
        } else {
            read_single(response).await
        }
    }

    async fn send_with_retry(&self, request: &GenerateRequest) -> InferenceResult<Response> {
        let mut attempt = 0;
        loop {
            let response = self.client.post(&self.url).json(request).send().await?;
            let status = response.status();
            if status.is_success() {
                return Ok(response);
            }

            if self.retry.should_retry(status) && attempt < self.retry.max_retries {
                let delay = self.retry.backoff(attempt);
                attempt += 1;
                warn!(
                    "Inference endpoint returned {}, retrying in {:?} (attempt {}/{})",
                    status, delay, attempt, self.retry.max_retries
                );
                sleep(delay).await;
                continue;
            }

            let body = match response.text().await {
                Ok(body) => body,
                Err(e) => {
                    warn!("Failed to read error body from inference endpoint: {}", e);
                    String::new()
                }
            };
            return Err(InferenceError::transport(
                TransportKind::Other,
                format!("inference endpoint returned {}: {}", status, body.trim()),
            ));
        }
    }
}

async fn read_stream(response: Response) -> InferenceResult<String> {
    let mut aggregator = StreamAggregator::new();
    let mut body = response.bytes_stream();
    while let Some(chunk) = body.next().await {
        aggregator.push(&chunk?);
    }
    aggregator.finish()
}

async fn read_single(response: Response) -> InferenceResult<String> {
    let body = response.bytes().await?;
    let chunk: GenerateChunk =
        serde_json::from_slice(&body).map_err(|e| InferenceError::Decode(e.to_string()))?;
    if let Some(err) = &chunk.error {
        warn!("Inference endpoint reported an error: {}", err);
    }
    chunk
        .fragment()
        .map(str::to_string)
        .ok_or(InferenceError::EmptyResponse)
}
