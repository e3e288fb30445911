/*!
 * HTTP client for a remote recognition service.
 *
 * The service contract is narrow by design: POST the normalized image,
 * receive a JSON list of (polygon, text, confidence) detections. Everything
 * the service does internally (detection, recognition, model choice) is
 * opaque to the pipeline.
 */

use base64::{Engine as _, engine::general_purpose};
use log::error;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::errors::EngineError;
use crate::recognition::{NormalizedImage, RawDetection, RecognitionEngine};

/// HTTP recognition engine client
#[derive(Debug)]
pub struct RemoteEngine {
    /// Recognition endpoint URL
    endpoint: String,
    /// HTTP client for making requests
    client: Client,
    /// Maximum number of retry attempts
    max_retries: u32,
    /// Base backoff time in milliseconds for exponential backoff
    backoff_base_ms: u64,
}

/// Recognition request body
#[derive(Debug, Serialize)]
struct RecognizeRequest<'a> {
    /// Base64-encoded image bytes
    image: String,
    /// MIME type of the encoding
    mime_type: &'a str,
}

/// One detection in the service response
#[derive(Debug, Deserialize)]
struct DetectionDto {
    polygon: Vec<(f32, f32)>,
    text: String,
    confidence: f32,
}

/// Recognition service response body
#[derive(Debug, Deserialize)]
struct RecognizeResponse {
    detections: Vec<DetectionDto>,
}

impl RemoteEngine {
    /// Create a client for the given endpoint URL
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            client: Client::builder()
                .timeout(Duration::from_secs(60))
                .build()
                .unwrap_or_default(),
            max_retries: 2,
            backoff_base_ms: 500,
        }
    }

    /// Create a client with explicit retry configuration
    pub fn with_retries(
        endpoint: impl Into<String>,
        max_retries: u32,
        backoff_base_ms: u64,
    ) -> Self {
        Self {
            endpoint: endpoint.into(),
            client: Client::builder()
                .timeout(Duration::from_secs(60))
                .pool_idle_timeout(Duration::from_secs(90))
                .tcp_keepalive(Duration::from_secs(60))
                .build()
                .unwrap_or_default(),
            max_retries,
            backoff_base_ms,
        }
    }

    async fn post_once(&self, image: &NormalizedImage) -> Result<Vec<RawDetection>, EngineError> {
        let request = RecognizeRequest {
            image: general_purpose::STANDARD.encode(&image.bytes),
            mime_type: &image.mime_type,
        };

        let response = self
            .client
            .post(&self.endpoint)
            .json(&request)
            .send()
            .await
            .map_err(|e| EngineError::RequestFailed(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let message = response
                .text()
                .await
                .unwrap_or_else(|_| "Failed to get error response text".to_string());
            return Err(EngineError::ApiError {
                status_code: status.as_u16(),
                message,
            });
        }

        let body: RecognizeResponse = response
            .json()
            .await
            .map_err(|e| EngineError::ParseError(e.to_string()))?;

        Ok(body
            .detections
            .into_iter()
            .map(|d| RawDetection {
                polygon: d.polygon,
                text: d.text,
                confidence: d.confidence,
            })
            .collect())
    }
}

#[async_trait::async_trait]
impl RecognitionEngine for RemoteEngine {
    async fn recognize(&self, image: &NormalizedImage) -> Result<Vec<RawDetection>, EngineError> {
        let mut attempt = 0;
        let mut last_error = None;

        while attempt <= self.max_retries {
            match self.post_once(image).await {
                Ok(detections) => return Ok(detections),
                // Client-side API errors are not retried
                Err(EngineError::ApiError {
                    status_code,
                    message,
                }) if status_code < 500 => {
                    error!("Recognition API error ({}): {}", status_code, message);
                    return Err(EngineError::ApiError {
                        status_code,
                        message,
                    });
                }
                Err(e) => {
                    error!(
                        "Recognition request failed: {} - attempt {}/{}",
                        e,
                        attempt + 1,
                        self.max_retries + 1
                    );
                    last_error = Some(e);
                }
            }

            attempt += 1;
            if attempt <= self.max_retries {
                let backoff_ms = self.backoff_base_ms * (1u64 << (attempt - 1));
                tokio::time::sleep(Duration::from_millis(backoff_ms)).await;
            }
        }

        Err(last_error
            .unwrap_or_else(|| EngineError::RequestFailed("no attempts were made".to_string())))
    }
}
