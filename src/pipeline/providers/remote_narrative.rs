use super::{NarrativeProvider, NarrativeRequest};
use crate::config::NarrativeSettings;
use crate::error::{AppError, DependencyError};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

const API_KEY_HEADER: &str = "x-goog-api-key";

#[derive(Debug, Serialize)]
struct GenerateRequest {
    contents: Vec<Content>,
    #[serde(rename = "generationConfig")]
    generation_config: GenerationConfig,
}

#[derive(Debug, Serialize, Deserialize)]
struct Content {
    parts: Vec<Part>,
}

#[derive(Debug, Serialize, Deserialize)]
struct Part {
    text: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    temperature: f32,
    top_k: u32,
    top_p: f32,
    max_output_tokens: u32,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<Content>,
}

/// Narrative generator backed by a Gemini-style `generateContent` endpoint.
///
/// Only a connect timeout is set on the client; the per-attempt deadline and retries are
/// applied by the narration layer around this provider.
pub struct RemoteNarrativeProvider {
    client: Client,
    endpoint: String,
    api_key: Option<String>,
}

impl RemoteNarrativeProvider {
    pub fn new(endpoint: impl Into<String>, api_key: Option<String>) -> Result<Self, AppError> {
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(5))
            .build()
            .map_err(|e| AppError::Config(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            endpoint: endpoint.into(),
            api_key,
        })
    }

    pub fn from_settings(settings: &NarrativeSettings) -> Result<Self, AppError> {
        Self::new(settings.endpoint.clone(), settings.api_key.clone())
    }

    async fn generate(&self, api_key: &str, prompt: String) -> Result<String, DependencyError> {
        let body = GenerateRequest {
            contents: vec![Content {
                parts: vec![Part { text: prompt }],
            }],
            generation_config: GenerationConfig {
                temperature: 0.7,
                top_k: 40,
                top_p: 0.95,
                max_output_tokens: 1024,
            },
        };

        let response = self
            .client
            .post(&self.endpoint)
            .header(API_KEY_HEADER, api_key)
            .json(&body)
            .send()
            .await
            .map_err(classify_transport_error)?;

        let status = response.status();
        if !status.is_success() {
            let message = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(DependencyError::Status {
                status: status.as_u16(),
                message,
            });
        }

        let parsed: GenerateResponse = response.json().await.map_err(|e| {
            DependencyError::InvalidResponse(format!(
                "Failed to parse narrative response: {}",
                e.without_url()
            ))
        })?;
        extract_text(parsed)
    }
}

#[async_trait]
impl NarrativeProvider for RemoteNarrativeProvider {
    async fn narrate(&self, request: &NarrativeRequest) -> Result<String, DependencyError> {
        let Some(api_key) = self.api_key.as_deref() else {
            return Err(DependencyError::NotConfigured(
                "no narrative API key was provided".to_string(),
            ));
        };
        debug!("Requesting narrative for '{}'", request.label);
        self.generate(api_key, build_prompt(request)).await
    }

    fn name(&self) -> &'static str {
        "RemoteNarrativeProvider"
    }
}

// Error text ends up in retry warnings, so the request URL is stripped from it.
fn classify_transport_error(error: reqwest::Error) -> DependencyError {
    let error = error.without_url();
    if error.is_timeout() {
        DependencyError::Timeout
    } else if error.is_connect() || error.is_request() {
        DependencyError::Connection(error.to_string())
    } else {
        DependencyError::InvalidResponse(error.to_string())
    }
}

/// Prompt sent to the generator: the subject, every fact, then the writing brief.
pub fn build_prompt(request: &NarrativeRequest) -> String {
    let mut prompt = String::from("**Animal information**\n");
    prompt.push_str(&format!(
        "Name: {} ({})\n",
        request.display_name, request.label
    ));
    for (key, value) in &request.facts {
        prompt.push_str(&format!("{}: {}\n", key, value));
    }
    prompt.push_str(
        "\n**Request**\n\
         Describe this animal for the reader:\n\
         1. Use a natural, warm tone that is not childish\n\
         2. Cover its key traits, ecology and habitat\n\
         3. Mention its conservation status if it is at risk\n\
         4. Finish with one interesting question\n",
    );
    prompt
}

fn extract_text(response: GenerateResponse) -> Result<String, DependencyError> {
    let text = response
        .candidates
        .into_iter()
        .filter_map(|candidate| candidate.content)
        .flat_map(|content| content.parts)
        .map(|part| part.text)
        .find(|text| !text.trim().is_empty());

    text.ok_or_else(|| {
        DependencyError::InvalidResponse("the response contained no text candidates".to_string())
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use indexmap::IndexMap;

    fn deer_request() -> NarrativeRequest {
        let mut facts = IndexMap::new();
        facts.insert("description".to_string(), "A graceful herbivore.".to_string());
        facts.insert("habitat".to_string(), "forests".to_string());
        NarrativeRequest {
            label: "deer".to_string(),
            display_name: "사슴".to_string(),
            facts,
        }
    }

    #[test]
    fn prompt_lists_name_and_facts_in_order() {
        let prompt = build_prompt(&deer_request());
        assert!(prompt.contains("Name: 사슴 (deer)"));
        let description = prompt.find("description: A graceful herbivore.").unwrap();
        let habitat = prompt.find("habitat: forests").unwrap();
        assert!(description < habitat);
    }

    #[test]
    fn extracts_first_non_empty_candidate() {
        let response: GenerateResponse = serde_json::from_value(serde_json::json!({
            "candidates": [
                { "content": { "parts": [{ "text": "  " }] } },
                { "content": { "parts": [{ "text": "Deer are lovely." }] } }
            ]
        }))
        .unwrap();
        assert_eq!(extract_text(response).unwrap(), "Deer are lovely.");
    }

    #[test]
    fn missing_candidates_are_not_transient() {
        let response: GenerateResponse = serde_json::from_value(serde_json::json!({})).unwrap();
        let error = extract_text(response).unwrap_err();
        assert!(matches!(error, DependencyError::InvalidResponse(_)));
        assert!(!error.is_transient());
    }

    #[tokio::test]
    async fn missing_api_key_fails_without_a_request() {
        let provider = RemoteNarrativeProvider::new("http://127.0.0.1:9/unused", None).unwrap();
        let error = provider.narrate(&deer_request()).await.unwrap_err();
        assert!(matches!(error, DependencyError::NotConfigured(_)));
    }

    #[tokio::test]
    async fn connection_errors_do_not_carry_the_api_key() {
        let provider =
            RemoteNarrativeProvider::new("http://127.0.0.1:9/generate", Some("SECRET".to_string()))
                .unwrap();
        let error = provider.narrate(&deer_request()).await.unwrap_err();
        assert!(error.is_transient());
        assert!(!error.to_string().contains("SECRET"));
        assert!(!format!("{:?}", error).contains("SECRET"));
    }
}
