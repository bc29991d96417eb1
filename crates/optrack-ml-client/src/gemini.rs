//! Gemini vision-language placement classifier.
//!
//! The semantic alternative to mask corner sampling: the representative frame
//! (with segmentation overlays already rendered) goes to Gemini, which
//! answers per tool whether it is in place, out of place, or missing. The
//! contract to callers is identical to `MaskPlacement`.

use std::str::FromStr;
use std::time::Duration;

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use optrack_models::{Detection, PlacementStatus, ToolClass};
use optrack_vision::{Frame, PlacementStrategy, StatusMap, VisionError, VisionResult};

use crate::error::{MlClientError, MlClientResult};

/// Models to try in order; first success wins.
const FALLBACK_MODELS: &[&str] = &["gemini-2.5-flash", "gemini-2.5-flash-lite", "gemini-2.5-pro"];

/// Configuration for the Gemini placement classifier.
#[derive(Debug, Clone)]
pub struct GeminiConfig {
    pub api_key: String,
    /// API base URL (overridable for tests)
    pub base_url: String,
    pub timeout: Duration,
}

impl GeminiConfig {
    /// Create config from environment variables.
    pub fn from_env() -> MlClientResult<Self> {
        Ok(Self {
            api_key: std::env::var("GEMINI_API_KEY")
                .map_err(|_| MlClientError::config_error("GEMINI_API_KEY not set"))?,
            base_url: std::env::var("GEMINI_BASE_URL").unwrap_or_else(|_| {
                "https://generativelanguage.googleapis.com/v1beta".to_string()
            }),
            timeout: Duration::from_secs(60),
        })
    }
}

/// Gemini API request.
#[derive(Debug, Serialize)]
struct GeminiRequest {
    contents: Vec<Content>,
    #[serde(rename = "generationConfig")]
    generation_config: GenerationConfig,
}

#[derive(Debug, Serialize)]
struct Content {
    parts: Vec<Part>,
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
enum Part {
    Text {
        text: String,
    },
    InlineData {
        #[serde(rename = "inlineData")]
        inline_data: InlineData,
    },
}

#[derive(Debug, Serialize)]
struct InlineData {
    #[serde(rename = "mimeType")]
    mime_type: String,
    data: String,
}

#[derive(Debug, Serialize)]
struct GenerationConfig {
    temperature: f32,
    #[serde(rename = "responseMimeType")]
    response_mime_type: String,
}

/// Gemini API response.
#[derive(Debug, Deserialize)]
struct GeminiResponse {
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: ResponseContent,
}

#[derive(Debug, Deserialize)]
struct ResponseContent {
    parts: Vec<ResponsePart>,
}

#[derive(Debug, Deserialize)]
struct ResponsePart {
    text: String,
}

/// Expected classification payload: `{"context": [{"tool", "status"}]}`.
#[derive(Debug, Deserialize)]
struct ContextResponse {
    context: Vec<ObjectContext>,
}

#[derive(Debug, Deserialize)]
struct ObjectContext {
    tool: String,
    status: String,
}

/// Gemini-backed placement classifier.
pub struct GeminiPlacement {
    http: Client,
    config: GeminiConfig,
}

impl GeminiPlacement {
    /// Create a new classifier.
    pub fn new(config: GeminiConfig) -> MlClientResult<Self> {
        let http = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(MlClientError::Network)?;
        Ok(Self { http, config })
    }

    /// Create from environment variables.
    pub fn from_env() -> MlClientResult<Self> {
        Self::new(GeminiConfig::from_env()?)
    }

    /// Classify one frame, trying each fallback model in turn.
    pub async fn classify_frame(&self, frame: &Frame) -> MlClientResult<StatusMap> {
        let image_b64 = BASE64.encode(frame.jpeg());
        let prompt = build_prompt();

        let mut last_error = None;
        for model in FALLBACK_MODELS {
            match self.call_model(model, &image_b64, &prompt).await {
                Ok(statuses) => {
                    info!(model, "Placement classification succeeded");
                    return Ok(statuses);
                }
                Err(e) => {
                    warn!(model, error = %e, "Placement classification failed");
                    last_error = Some(e);
                }
            }
        }

        Err(last_error
            .unwrap_or_else(|| MlClientError::classify_failed("all Gemini models failed")))
    }

    async fn call_model(
        &self,
        model: &str,
        image_b64: &str,
        prompt: &str,
    ) -> MlClientResult<StatusMap> {
        let url = format!(
            "{}/models/{}:generateContent?key={}",
            self.config.base_url, model, self.config.api_key
        );

        let request = GeminiRequest {
            contents: vec![Content {
                parts: vec![
                    Part::InlineData {
                        inline_data: InlineData {
                            mime_type: "image/jpeg".to_string(),
                            data: image_b64.to_string(),
                        },
                    },
                    Part::Text {
                        text: prompt.to_string(),
                    },
                ],
            }],
            generation_config: GenerationConfig {
                temperature: 0.0,
                response_mime_type: "application/json".to_string(),
            },
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
            return Err(MlClientError::classify_failed(format!(
                "Gemini returned {}: {}",
                status, body
            )));
        }

        let gemini_response: GeminiResponse = response
            .json()
            .await
            .map_err(|e| MlClientError::invalid_response(e.to_string()))?;

        let text = gemini_response
            .candidates
            .first()
            .and_then(|c| c.content.parts.first())
            .map(|p| p.text.as_str())
            .ok_or_else(|| MlClientError::invalid_response("no content in Gemini response"))?;

        parse_context(text)
    }
}

/// Parse the model's JSON answer into a status map.
///
/// Handles markdown code fences, unknown tool names (skipped with a warning)
/// and missing tools (reported `missing`).
fn parse_context(text: &str) -> MlClientResult<StatusMap> {
    let text = text.trim();
    let text = text.strip_prefix("```json").unwrap_or(text);
    let text = text.strip_suffix("```").unwrap_or(text);

    let parsed: ContextResponse = serde_json::from_str(text.trim())
        .map_err(|e| MlClientError::invalid_response(format!("context JSON: {}", e)))?;

    let mut statuses: StatusMap = ToolClass::ALL
        .iter()
        .map(|&tool| (tool, PlacementStatus::Missing))
        .collect();

    for entry in parsed.context {
        let Ok(tool) = ToolClass::from_str(&entry.tool) else {
            warn!(tool = %entry.tool, "Unknown tool in classification response");
            continue;
        };
        let Ok(status) = PlacementStatus::from_str(&entry.status) else {
            warn!(status = %entry.status, "Unknown status in classification response");
            continue;
        };
        statuses.insert(tool, status);
    }

    Ok(statuses)
}

fn build_prompt() -> String {
    format!(
        r#"You are given an image containing segmented (highlighted and labeled) surgical tools.
The surgical site is in the center of the image and it is surrounded by a blue colored cloth.

Use the image content and segmentation to determine the position of the cloth and the objects.
A tool placed fully on the cloth is in place. A tool partially on the cloth or in the surgical
site is out of place. A tool not visible in the image is missing.

Return ONLY a single JSON object with this schema:
{{
  "context": [
    {{"tool": "<one of: {}>", "status": "<in_place | out_of_place | missing>"}}
  ]
}}

Include one entry for every tool class listed above.
"#,
        ToolClass::ALL
            .iter()
            .map(|t| t.as_str())
            .collect::<Vec<_>>()
            .join(", ")
    )
}

#[async_trait]
impl PlacementStrategy for GeminiPlacement {
    async fn classify(&self, frame: &Frame, _detections: &[Detection]) -> VisionResult<StatusMap> {
        self.classify_frame(frame)
            .await
            .map_err(|e| VisionError::placement_failed(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::RgbImage;
    use serde_json::json;
    use wiremock::matchers::{method, path_regex};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[test]
    fn test_parse_context_full() {
        let statuses = parse_context(
            r#"{"context": [
                {"tool": "forceps", "status": "in place"},
                {"tool": "gauze", "status": "out_of_place"},
                {"tool": "scissors", "status": "missing"}
            ]}"#,
        )
        .unwrap();
        assert_eq!(statuses[&ToolClass::Forceps], PlacementStatus::InPlace);
        assert_eq!(statuses[&ToolClass::Gauze], PlacementStatus::OutOfPlace);
        assert_eq!(statuses[&ToolClass::Scissors], PlacementStatus::Missing);
    }

    #[test]
    fn test_parse_context_defaults_to_missing() {
        let statuses =
            parse_context(r#"{"context": [{"tool": "forceps", "status": "in_place"}]}"#).unwrap();
        assert_eq!(statuses[&ToolClass::Gauze], PlacementStatus::Missing);
        assert_eq!(statuses[&ToolClass::Scissors], PlacementStatus::Missing);
    }

    #[test]
    fn test_parse_context_strips_markdown_fences() {
        let statuses = parse_context(
            "```json\n{\"context\": [{\"tool\": \"gauze\", \"status\": \"in_place\"}]}\n```",
        )
        .unwrap();
        assert_eq!(statuses[&ToolClass::Gauze], PlacementStatus::InPlace);
    }

    #[test]
    fn test_parse_context_skips_unknown_entries() {
        let statuses = parse_context(
            r#"{"context": [
                {"tool": "scalpel", "status": "in_place"},
                {"tool": "scissors", "status": "levitating"},
                {"tool": "forceps", "status": "out_of_place"}
            ]}"#,
        )
        .unwrap();
        assert_eq!(statuses[&ToolClass::Forceps], PlacementStatus::OutOfPlace);
        assert_eq!(statuses[&ToolClass::Scissors], PlacementStatus::Missing);
    }

    #[tokio::test]
    async fn test_classify_frame_against_mock_api() {
        let server = MockServer::start().await;
        let answer = json!({"context": [
            {"tool": "forceps", "status": "in_place"},
            {"tool": "gauze", "status": "missing"},
            {"tool": "scissors", "status": "out_of_place"}
        ]});
        Mock::given(method("POST"))
            .and(path_regex(r"^/models/.*:generateContent$"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "candidates": [{"content": {"parts": [{"text": answer.to_string()}]}}]
            })))
            .mount(&server)
            .await;

        let classifier = GeminiPlacement::new(GeminiConfig {
            api_key: "test-key".to_string(),
            base_url: server.uri(),
            timeout: Duration::from_secs(2),
        })
        .unwrap();

        let frame = Frame::from_image(0, RgbImage::new(16, 16)).unwrap();
        let statuses = classifier.classify_frame(&frame).await.unwrap();
        assert_eq!(statuses[&ToolClass::Forceps], PlacementStatus::InPlace);
        assert_eq!(statuses[&ToolClass::Scissors], PlacementStatus::OutOfPlace);
    }
}
