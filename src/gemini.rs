use futures::future::BoxFuture;
use futures::FutureExt;
use log::{debug, info};
use reqwest::header::CONTENT_TYPE;
use serde::{Deserialize, Serialize};

use crate::{
    error::GenerationError,
    generation::{ScriptGenerator, SpeechGenerator, SpeechPayload, Voice},
};

pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";
pub const DEFAULT_SCRIPT_MODEL: &str = "gemini-2.5-flash";
pub const DEFAULT_SPEECH_MODEL: &str = "gemini-2.5-flash-preview-tts";

const SCRIPT_PROMPT: &str = "You are a professional Marathi news anchor. Rewrite the following news \
into a clear, engaging Marathi news bulletin script suitable for reading aloud. Use formal, \
broadcast-style Marathi. Return only the script text, without headings, notes or stage directions.\n\n";

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Part {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(rename = "inlineData", skip_serializing_if = "Option::is_none")]
    pub inline_data: Option<InlineData>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct InlineData {
    #[serde(default)]
    pub mime_type: Option<String>,
    pub data: String,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Content {
    #[serde(default)]
    pub parts: Vec<Part>,
}

#[derive(Serialize, Debug)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest<'a> {
    contents: Vec<Content>,
    #[serde(skip_serializing_if = "Option::is_none")]
    generation_config: Option<GenerationConfig<'a>>,
}

#[derive(Serialize, Debug)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig<'a> {
    response_modalities: Vec<&'a str>,
    speech_config: SpeechConfig<'a>,
}

#[derive(Serialize, Debug)]
#[serde(rename_all = "camelCase")]
struct SpeechConfig<'a> {
    voice_config: VoiceConfig<'a>,
}

#[derive(Serialize, Debug)]
#[serde(rename_all = "camelCase")]
struct VoiceConfig<'a> {
    prebuilt_voice_config: PrebuiltVoiceConfig<'a>,
}

#[derive(Serialize, Debug)]
#[serde(rename_all = "camelCase")]
struct PrebuiltVoiceConfig<'a> {
    voice_name: &'a str,
}

#[derive(Deserialize, Debug, Default)]
pub struct GenerateContentResponse {
    #[serde(default)]
    pub candidates: Vec<Candidate>,
}

#[derive(Deserialize, Debug)]
pub struct Candidate {
    pub content: Option<Content>,
}

impl GenerateContentResponse {
    fn parts(&self) -> impl Iterator<Item = &Part> {
        self.candidates
            .iter()
            .take(1)
            .filter_map(|c| c.content.as_ref())
            .flat_map(|c| c.parts.iter())
    }

    /// Concatenated text of the first candidate.
    pub fn text(&self) -> Option<String> {
        let text: String = self.parts().filter_map(|p| p.text.as_deref()).collect();
        let text = text.trim();
        if text.is_empty() {
            None
        } else {
            Some(text.to_string())
        }
    }

    /// Base64 audio of the first candidate's first inline part.
    pub fn audio_base64(&self) -> Option<String> {
        self.parts()
            .find_map(|p| p.inline_data.as_ref())
            .map(|d| d.data.clone())
    }
}

fn text_contents(text: String) -> Vec<Content> {
    vec![Content {
        parts: vec![Part {
            text: Some(text),
            inline_data: None,
        }],
    }]
}

fn script_request(raw_text: &str) -> GenerateContentRequest<'static> {
    GenerateContentRequest {
        contents: text_contents(format!("{}{}", SCRIPT_PROMPT, raw_text)),
        generation_config: None,
    }
}

fn speech_request<'a>(text: &str, voice: &'a Voice) -> GenerateContentRequest<'a> {
    GenerateContentRequest {
        contents: text_contents(text.to_string()),
        generation_config: Some(GenerationConfig {
            response_modalities: vec!["AUDIO"],
            speech_config: SpeechConfig {
                voice_config: VoiceConfig {
                    prebuilt_voice_config: PrebuiltVoiceConfig {
                        voice_name: voice.as_str(),
                    },
                },
            },
        }),
    }
}

/// Both generation capabilities backed by the Gemini `generateContent` API.
pub struct GeminiClient {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
    script_model: String,
    speech_model: String,
}

impl GeminiClient {
    pub fn new(api_key: impl Into<String>) -> GeminiClient {
        GeminiClient {
            client: reqwest::Client::new(),
            api_key: api_key.into(),
            base_url: DEFAULT_BASE_URL.into(),
            script_model: DEFAULT_SCRIPT_MODEL.into(),
            speech_model: DEFAULT_SPEECH_MODEL.into(),
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn with_models(mut self, script_model: impl Into<String>, speech_model: impl Into<String>) -> Self {
        self.script_model = script_model.into();
        self.speech_model = speech_model.into();
        self
    }

    fn endpoint(&self, model: &str) -> String {
        format!("{}/models/{}:generateContent", self.base_url.trim_end_matches('/'), model)
    }

    async fn generate_content(
        &self,
        model: &str,
        request: &GenerateContentRequest<'_>,
    ) -> Result<GenerateContentResponse, GenerationError> {
        let url = self.endpoint(model);
        debug!("POST {}", url);

        let res = self
            .client
            .post(&url)
            .header("x-goog-api-key", &self.api_key)
            .header(CONTENT_TYPE, "application/json")
            .body(serde_json::to_string(request)?)
            .send()
            .await?;

        let status = res.status();
        let body = res.text().await?;
        if !status.is_success() {
            return Err(GenerationError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let res: GenerateContentResponse = serde_json::from_str(&body)?;
        Ok(res)
    }
}

impl ScriptGenerator for GeminiClient {
    fn generate<'a>(&'a self, raw_text: &'a str) -> BoxFuture<'a, Result<String, GenerationError>> {
        async move {
            let res = self
                .generate_content(&self.script_model, &script_request(raw_text))
                .await?;
            let script = res
                .text()
                .ok_or_else(|| GenerationError::Service("empty script in response".into()))?;
            info!("received script of {} chars", script.chars().count());
            Ok(script)
        }
        .boxed()
    }
}

impl SpeechGenerator for GeminiClient {
    fn generate<'a>(&'a self, text: &'a str, voice: &'a Voice) -> BoxFuture<'a, Result<SpeechPayload, GenerationError>> {
        async move {
            let res = self
                .generate_content(&self.speech_model, &speech_request(text, voice))
                .await?;
            Ok(SpeechPayload {
                audio_base64: res.audio_base64(),
            })
        }
        .boxed()
    }
}
