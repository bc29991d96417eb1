//! HTTP client for the object-detection inference service.

use std::time::Duration;

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use optrack_models::{BoundingBox, Detection};
use optrack_vision::{Detector, Frame, VisionError, VisionResult};

use crate::error::{MlClientError, MlClientResult};

/// Configuration for the detector service client.
#[derive(Debug, Clone)]
pub struct DetectorClientConfig {
    /// Base URL of the inference service
    pub base_url: String,
    /// Request timeout
    pub timeout: Duration,
}

impl Default for DetectorClientConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8001".to_string(),
            timeout: Duration::from_secs(10),
        }
    }
}

impl DetectorClientConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Self {
        Self {
            base_url: std::env::var("DETECTOR_SERVICE_URL")
                .unwrap_or_else(|_| "http://localhost:8001".to_string()),
            timeout: Duration::from_secs(
                std::env::var("DETECTOR_SERVICE_TIMEOUT")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(10),
            ),
        }
    }
}

/// Detection request body.
#[derive(Debug, Serialize)]
struct DetectRequest {
    /// Base64 JPEG frame
    image: String,
    confidence_threshold: f32,
}

/// One raw detection row from the service.
///
/// Kept raw on purpose: class ids are validated into [`Detection`] here, and
/// malformed rows drop individually without failing the frame.
#[derive(Debug, Deserialize)]
struct RawDetection {
    class_id: usize,
    confidence: f32,
    bbox: [f32; 4],
}

#[derive(Debug, Deserialize)]
struct DetectResponse {
    detections: Vec<RawDetection>,
}

/// Client for the object-detection inference service.
pub struct RemoteDetector {
    http: Client,
    config: DetectorClientConfig,
}

impl RemoteDetector {
    /// Create a new detector client.
    pub fn new(config: DetectorClientConfig) -> MlClientResult<Self> {
        let http = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(MlClientError::Network)?;
        Ok(Self { http, config })
    }

    /// Create from environment variables.
    pub fn from_env() -> MlClientResult<Self> {
        Self::new(DetectorClientConfig::from_env())
    }

    async fn request_detections(
        &self,
        frame: &Frame,
        confidence_threshold: f32,
    ) -> MlClientResult<Vec<Detection>> {
        let url = format!("{}/detect", self.config.base_url);
        let request = DetectRequest {
            image: BASE64.encode(frame.jpeg()),
            confidence_threshold,
        };

        let response = self
            .http
            .post(&url)
            .json(&request)
            .send()
            .await
            .map_err(MlClientError::Network)?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(MlClientError::detector_failed(format!(
                "detector service returned {}: {}",
                status, body
            )));
        }

        let parsed: DetectResponse = response
            .json()
            .await
            .map_err(|e| MlClientError::invalid_response(e.to_string()))?;

        let total = parsed.detections.len();
        let detections: Vec<Detection> = parsed
            .detections
            .into_iter()
            .filter_map(|raw| {
                let bbox = BoundingBox::new(raw.bbox[0], raw.bbox[1], raw.bbox[2], raw.bbox[3]);
                Detection::from_raw(raw.class_id, raw.confidence, bbox)
            })
            .collect();

        if detections.len() < total {
            warn!(
                frame = frame.index,
                dropped = total - detections.len(),
                "Dropped malformed detection rows"
            );
        }
        debug!(frame = frame.index, count = detections.len(), "Detections received");

        Ok(detections)
    }
}

#[async_trait]
impl Detector for RemoteDetector {
    fn name(&self) -> &'static str {
        "remote"
    }

    async fn detect(
        &self,
        frame: &Frame,
        confidence_threshold: f32,
    ) -> VisionResult<Vec<Detection>> {
        self.request_detections(frame, confidence_threshold)
            .await
            .map_err(|e| VisionError::detection_failed(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::RgbImage;
    use optrack_models::ToolClass;
    use serde_json::json;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn config_for(server: &MockServer) -> DetectorClientConfig {
        DetectorClientConfig {
            base_url: server.uri(),
            timeout: Duration::from_secs(2),
        }
    }

    fn test_frame() -> Frame {
        Frame::from_image(0, RgbImage::new(16, 16)).unwrap()
    }

    #[tokio::test]
    async fn test_detect_parses_rows() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/detect"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "detections": [
                    {"class_id": 0, "confidence": 0.91, "bbox": [10.0, 12.0, 80.0, 90.0]},
                    {"class_id": 2, "confidence": 0.55, "bbox": [100.0, 20.0, 160.0, 70.0]}
                ]
            })))
            .mount(&server)
            .await;

        let detector = RemoteDetector::new(config_for(&server)).unwrap();
        let detections = detector.detect(&test_frame(), 0.4).await.unwrap();
        assert_eq!(detections.len(), 2);
        assert_eq!(detections[0].tool, ToolClass::Forceps);
        assert_eq!(detections[1].tool, ToolClass::Scissors);
        assert_eq!(detections[0].bbox.x2, 80.0);
    }

    #[tokio::test]
    async fn test_detect_drops_malformed_rows_only() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/detect"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "detections": [
                    {"class_id": 42, "confidence": 0.9, "bbox": [0.0, 0.0, 1.0, 1.0]},
                    {"class_id": 1, "confidence": 0.8, "bbox": [5.0, 5.0, 9.0, 9.0]}
                ]
            })))
            .mount(&server)
            .await;

        let detector = RemoteDetector::new(config_for(&server)).unwrap();
        let detections = detector.detect(&test_frame(), 0.4).await.unwrap();
        assert_eq!(detections.len(), 1);
        assert_eq!(detections[0].tool, ToolClass::Gauze);
    }

    #[tokio::test]
    async fn test_detect_surfaces_service_errors() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/detect"))
            .respond_with(ResponseTemplate::new(500).set_body_string("inference crashed"))
            .mount(&server)
            .await;

        let detector = RemoteDetector::new(config_for(&server)).unwrap();
        let err = detector.detect(&test_frame(), 0.4).await.unwrap_err();
        assert!(err.to_string().contains("500"));
    }
}
