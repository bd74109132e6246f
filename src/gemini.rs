use std::sync::mpsc::Sender;
use std::time::Duration;

use base64::Engine as _;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::runtime::Handle;
use tracing::{debug, warn};

use crate::conversation::{Attachment, OutboundRequest, Responder};
use crate::event::AppEvent;
use crate::settings::Settings;

const ENDPOINT_BASE: &str = "https://generativelanguage.googleapis.com/v1beta/models";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Failures surfaced by a `generateContent` call. The messages are written
/// for the chat window, not for logs: the controller turns them into an
/// assistant bubble verbatim.
#[derive(Debug, Error)]
pub enum GeminiError {
    #[error("the request timed out, try again")]
    Timeout,
    #[error("network error: {0}")]
    Network(String),
    #[error("{0}")]
    Api(String),
    #[error("unexpected API response: {0}")]
    Malformed(String),
    #[error("the API returned an empty response")]
    Empty,
}

// --- generateContent request structs ---

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateRequest {
    contents: Vec<Content>,
    generation_config: GenerationConfig,
}

#[derive(Serialize)]
struct Content {
    role: &'static str,
    parts: Vec<Part>,
}

#[derive(Serialize)]
#[serde(untagged)]
enum Part {
    Text { text: String },
    InlineData { inline_data: InlineData },
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct InlineData {
    mime_type: String,
    data: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    max_output_tokens: u32,
}

// --- generateContent response structs ---

#[derive(Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Deserialize)]
struct Candidate {
    content: CandidateContent,
}

#[derive(Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Deserialize)]
struct ResponsePart {
    text: Option<String>,
}

fn build_request(
    prompt: &str,
    attachment: Option<&Attachment>,
    max_output_tokens: u32,
) -> GenerateRequest {
    let mut parts = vec![Part::Text {
        text: prompt.to_string(),
    }];
    if let Some(image) = attachment {
        parts.push(Part::InlineData {
            inline_data: InlineData {
                mime_type: image.mime.clone(),
                data: base64::engine::general_purpose::STANDARD.encode(&image.data),
            },
        });
    }

    GenerateRequest {
        contents: vec![Content {
            role: "user",
            parts,
        }],
        generation_config: GenerationConfig { max_output_tokens },
    }
}

fn extract_text(response: GenerateResponse) -> Result<String, GeminiError> {
    let text = response
        .candidates
        .into_iter()
        .flat_map(|candidate| candidate.content.parts)
        .filter_map(|part| part.text)
        .collect::<Vec<_>>()
        .join("\n");

    if text.is_empty() {
        Err(GeminiError::Empty)
    } else {
        Ok(text)
    }
}

fn api_error_for_status(status: reqwest::StatusCode) -> GeminiError {
    GeminiError::Api(match status.as_u16() {
        400 => "the API rejected the request, try a shorter message".into(),
        401 | 403 => "the API key was rejected, check it in Settings".into(),
        429 => "rate limited by the API, wait a moment before retrying".into(),
        500..=599 => "the API had a server error, try again".into(),
        code => format!("the API returned HTTP {code}"),
    })
}

async fn generate(
    http: &reqwest::Client,
    api_key: &str,
    model: &str,
    max_output_tokens: u32,
    prompt: &str,
    attachment: Option<Attachment>,
) -> Result<String, GeminiError> {
    let url = format!("{ENDPOINT_BASE}/{model}:generateContent");
    let request = build_request(prompt, attachment.as_ref(), max_output_tokens);

    let response = http
        .post(&url)
        .header("x-goog-api-key", api_key)
        .header("content-type", "application/json")
        .json(&request)
        .send()
        .await
        .map_err(|err| {
            if err.is_timeout() {
                GeminiError::Timeout
            } else {
                GeminiError::Network(err.to_string())
            }
        })?;

    let status = response.status();
    if !status.is_success() {
        return Err(api_error_for_status(status));
    }

    let body: GenerateResponse = response
        .json()
        .await
        .map_err(|err| GeminiError::Malformed(err.to_string()))?;

    extract_text(body)
}

/// Runs `generateContent` calls on the tokio runtime and reports each outcome
/// back to the UI thread as exactly one `AppEvent`, then wakes the event loop
/// so the reply shows up without waiting for user input.
pub struct GeminiClient {
    http: reqwest::Client,
    runtime: Handle,
    tx: Sender<AppEvent>,
    egui_ctx: egui::Context,
    api_key: Option<String>,
    model: String,
    max_output_tokens: u32,
}

impl GeminiClient {
    pub fn new(
        runtime: Handle,
        tx: Sender<AppEvent>,
        egui_ctx: egui::Context,
        settings: &Settings,
    ) -> Self {
        let http = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());

        let mut client = Self {
            http,
            runtime,
            tx,
            egui_ctx,
            api_key: None,
            model: String::new(),
            max_output_tokens: 0,
        };
        client.apply_settings(settings);
        client
    }

    pub fn apply_settings(&mut self, settings: &Settings) {
        self.api_key = settings
            .api_key
            .clone()
            .filter(|key| !key.trim().is_empty());
        self.model = settings.model.clone();
        self.max_output_tokens = settings.max_output_tokens;
    }
}

impl Responder for GeminiClient {
    fn has_credential(&self) -> bool {
        self.api_key.is_some()
    }

    fn dispatch(&mut self, request: OutboundRequest) {
        let OutboundRequest {
            request_id,
            prompt,
            attachment,
        } = request;

        let Some(api_key) = self.api_key.clone() else {
            // The controller checks the credential before dispatching; if a
            // dispatch slips through anyway, fail it rather than strand the
            // pending bubble.
            let _ = self.tx.send(AppEvent::ResponseFailed {
                request_id,
                message: "no API key configured".into(),
            });
            self.egui_ctx.request_repaint();
            return;
        };

        let http = self.http.clone();
        let model = self.model.clone();
        let max_output_tokens = self.max_output_tokens;
        let tx = self.tx.clone();
        let egui_ctx = self.egui_ctx.clone();

        self.runtime.spawn(async move {
            debug!(request_id, model = %model, "sending generateContent request");
            let event = match generate(
                &http,
                &api_key,
                &model,
                max_output_tokens,
                &prompt,
                attachment,
            )
            .await
            {
                Ok(text) => AppEvent::ResponseReady { request_id, text },
                Err(err) => {
                    warn!(request_id, error = %err, "generateContent request failed");
                    AppEvent::ResponseFailed {
                        request_id,
                        message: err.to_string(),
                    }
                }
            };

            // A dead channel just means the window is gone and nobody is
            // listening anymore.
            let _ = tx.send(event);
            egui_ctx.request_repaint();
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn text_only_request_is_a_single_user_part() {
        let request = build_request("hello", None, 1024);
        let value = serde_json::to_value(&request).unwrap();

        assert_eq!(
            value,
            json!({
                "contents": [{
                    "role": "user",
                    "parts": [{ "text": "hello" }]
                }],
                "generationConfig": { "maxOutputTokens": 1024 }
            })
        );
    }

    #[test]
    fn attachment_becomes_an_inline_data_part() {
        let attachment = Attachment {
            data: b"abc".to_vec(),
            mime: "image/png".to_string(),
        };
        let request = build_request("what is this?", Some(&attachment), 256);
        let value = serde_json::to_value(&request).unwrap();

        let parts = &value["contents"][0]["parts"];
        assert_eq!(parts[0]["text"], "what is this?");
        assert_eq!(parts[1]["inline_data"]["mimeType"], "image/png");
        assert_eq!(parts[1]["inline_data"]["data"], "YWJj");
    }

    #[test]
    fn response_text_joins_all_candidate_parts() {
        let response: GenerateResponse = serde_json::from_value(json!({
            "candidates": [{
                "content": {
                    "parts": [
                        { "text": "first" },
                        { "text": "second" }
                    ]
                }
            }]
        }))
        .unwrap();

        assert_eq!(extract_text(response).unwrap(), "first\nsecond");
    }

    #[test]
    fn missing_candidates_is_an_empty_response() {
        let response: GenerateResponse = serde_json::from_value(json!({})).unwrap();
        assert!(matches!(extract_text(response), Err(GeminiError::Empty)));
    }

    #[test]
    fn status_codes_map_to_readable_messages() {
        let forbidden = api_error_for_status(reqwest::StatusCode::FORBIDDEN);
        assert!(forbidden.to_string().contains("API key"));

        let throttled = api_error_for_status(reqwest::StatusCode::TOO_MANY_REQUESTS);
        assert!(throttled.to_string().contains("rate limited"));

        let teapot = api_error_for_status(reqwest::StatusCode::IM_A_TEAPOT);
        assert!(teapot.to_string().contains("HTTP 418"));
    }
}
