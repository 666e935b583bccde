//! Google Gemini `generateContent` client.
//!
//! The image travels inline as base64 next to the fixed meter prompt; the
//! answer is the concatenated text of the first candidate.

use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde_json::{json, Value};
use tracing::{debug, instrument};

use super::{MeterReader, MeterReading, VisionError, METER_PROMPT};

#[derive(Debug, Clone)]
pub struct GeminiMeterReader {
    client: reqwest::Client,
    base_url: String,
    model: String,
    api_key: Option<String>,
}

impl GeminiMeterReader {
    pub fn from_config(cfg: &configs::VisionConfig) -> Result<Self, VisionError> {
        let client = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(cfg.connect_timeout_secs))
            .timeout(Duration::from_secs(cfg.timeout_secs))
            .build()
            .map_err(|e| VisionError::Transport(format!("failed to build HTTP client: {e}")))?;
        Ok(Self {
            client,
            base_url: cfg.base_url.trim_end_matches('/').to_string(),
            model: cfg.model.clone(),
            api_key: cfg.api_key.clone().filter(|k| !k.trim().is_empty()),
        })
    }

    pub fn is_configured(&self) -> bool {
        self.api_key.is_some()
    }

    fn endpoint(&self) -> String {
        format!("{}/v1beta/models/{}:generateContent", self.base_url, self.model)
    }

    fn build_body(mime: &str, image_b64: &str) -> Value {
        json!({
            "contents": [{
                "role": "user",
                "parts": [
                    { "text": METER_PROMPT },
                    { "inline_data": { "mime_type": mime, "data": image_b64 } }
                ]
            }]
        })
    }

    /// Text parts of the first candidate, joined; `None` when there is no text at all.
    fn response_text(body: &Value) -> Option<String> {
        let parts = body
            .get("candidates")?
            .get(0)?
            .get("content")?
            .get("parts")?
            .as_array()?;
        let text: Vec<&str> = parts
            .iter()
            .filter_map(|p| p.get("text").and_then(|t| t.as_str()))
            .collect();
        if text.is_empty() { None } else { Some(text.join("")) }
    }
}

#[async_trait]
impl MeterReader for GeminiMeterReader {
    #[instrument(skip(self), fields(model = %self.model))]
    async fn read_meter(&self, image: &Path, mime: &str) -> Result<MeterReading, VisionError> {
        let key = self.api_key.as_deref().ok_or(VisionError::NotConfigured)?;
        let bytes = tokio::fs::read(image).await?;
        let body = Self::build_body(mime, &STANDARD.encode(&bytes));

        let response = self
            .client
            .post(self.endpoint())
            .header("x-goog-api-key", key)
            .json(&body)
            .send()
            .await
            .map_err(|e| VisionError::Transport(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "<unreadable>".to_string());
            return Err(VisionError::Status { status, body });
        }

        let payload: Value = response
            .json()
            .await
            .map_err(|e| VisionError::Decode(e.to_string()))?;
        let text = Self::response_text(&payload)
            .ok_or_else(|| VisionError::Decode("response carries no text parts".into()))?;
        debug!(answer = %text, "vision answer received");
        Ok(MeterReading::from_text(&text))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(api_key: Option<&str>) -> configs::VisionConfig {
        configs::VisionConfig {
            api_key: api_key.map(str::to_string),
            base_url: "http://127.0.0.1:9/".into(),
            ..configs::VisionConfig::default()
        }
    }

    #[test]
    fn endpoint_includes_model() {
        let reader = GeminiMeterReader::from_config(&config(Some("k"))).unwrap();
        assert_eq!(reader.endpoint(), "http://127.0.0.1:9/v1beta/models/gemini-1.5-pro:generateContent");
        assert!(reader.is_configured());
    }

    #[test]
    fn body_carries_prompt_and_inline_image() {
        let body = GeminiMeterReader::build_body("image/jpeg", "AAAA");
        let parts = &body["contents"][0]["parts"];
        assert_eq!(parts[0]["text"], METER_PROMPT);
        assert_eq!(parts[1]["inline_data"]["mime_type"], "image/jpeg");
        assert_eq!(parts[1]["inline_data"]["data"], "AAAA");
    }

    #[test]
    fn parses_candidate_text() {
        let payload = json!({
            "candidates": [{
                "content": { "parts": [ { "text": "Reading: " }, { "text": "1234 m³" } ], "role": "model" }
            }]
        });
        let text = GeminiMeterReader::response_text(&payload).unwrap();
        assert_eq!(text, "Reading: 1234 m³");
        assert_eq!(MeterReading::from_text(&text), MeterReading::Value(1234));
    }

    #[test]
    fn missing_text_is_none() {
        assert!(GeminiMeterReader::response_text(&json!({})).is_none());
        assert!(GeminiMeterReader::response_text(&json!({ "candidates": [] })).is_none());
        let blocked = json!({ "candidates": [{ "content": { "parts": [ { "inline_data": {} } ] } }] });
        assert!(GeminiMeterReader::response_text(&blocked).is_none());
    }

    #[tokio::test]
    async fn missing_key_is_a_service_error() {
        let reader = GeminiMeterReader::from_config(&config(Some("  "))).unwrap();
        assert!(!reader.is_configured());
        let err = reader.read_meter(Path::new("/nonexistent.jpg"), "image/jpeg").await.unwrap_err();
        assert!(matches!(err, VisionError::NotConfigured));
    }
}
