// src/clients/chat.rs

use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use serde::Deserialize;
use serde_json::json;

use crate::{common::error::AppError, models::conversation::ChatMessage};

/// Provedor de IA: completude de chat, visão e transcrição.
///
/// Erros sobem; quem chama decide o texto de contingência.
#[async_trait]
pub trait ChatModel: Send + Sync {
    async fn complete(
        &self,
        messages: &[ChatMessage],
        api_key: Option<&str>,
    ) -> Result<String, AppError>;

    async fn describe_image(
        &self,
        prompt: &str,
        image_base64: &str,
        mime: &str,
        api_key: Option<&str>,
    ) -> Result<String, AppError>;

    async fn transcribe(
        &self,
        audio: Vec<u8>,
        filename: &str,
        mime: &str,
        api_key: Option<&str>,
    ) -> Result<String, AppError>;
}

#[derive(Clone)]
pub struct OpenAiClient {
    http: reqwest::Client,
    base_url: String,
    model: String,
}

#[derive(Deserialize)]
struct CompletionResponse {
    choices: Vec<CompletionChoice>,
}

#[derive(Deserialize)]
struct CompletionChoice {
    message: CompletionMessage,
}

#[derive(Deserialize)]
struct CompletionMessage {
    content: Option<String>,
}

#[derive(Deserialize)]
struct TranscriptionResponse {
    text: String,
}

impl OpenAiClient {
    pub fn new(http: reqwest::Client, base_url: &str, model: &str) -> Self {
        Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            model: model.to_string(),
        }
    }

    fn key<'a>(api_key: Option<&'a str>) -> Result<&'a str, AppError> {
        api_key
            .filter(|k| !k.is_empty())
            .ok_or(AppError::MissingConfig("OPENAI_API_KEY"))
    }

    async fn post_completion(
        &self,
        body: serde_json::Value,
        api_key: Option<&str>,
    ) -> Result<String, AppError> {
        let response = self
            .http
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(Self::key(api_key)?)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(AppError::ProviderError {
                provider: "openai",
                status: status.as_u16(),
                body: response.text().await.unwrap_or_default(),
            });
        }

        let parsed: CompletionResponse = response.json().await?;
        parsed
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or_else(|| anyhow::anyhow!("Resposta da OpenAI sem conteúdo").into())
    }
}

#[async_trait]
impl ChatModel for OpenAiClient {
    async fn complete(
        &self,
        messages: &[ChatMessage],
        api_key: Option<&str>,
    ) -> Result<String, AppError> {
        let body = json!({
            "model": self.model,
            "messages": messages,
            "temperature": 0.7,
        });
        self.post_completion(body, api_key).await
    }

    async fn describe_image(
        &self,
        prompt: &str,
        image_base64: &str,
        mime: &str,
        api_key: Option<&str>,
    ) -> Result<String, AppError> {
        let body = json!({
            "model": self.model,
            "max_tokens": 500,
            "messages": [{
                "role": "user",
                "content": [
                    { "type": "text", "text": prompt },
                    {
                        "type": "image_url",
                        "image_url": { "url": format!("data:{};base64,{}", mime, image_base64) }
                    }
                ]
            }],
        });
        self.post_completion(body, api_key).await
    }

    async fn transcribe(
        &self,
        audio: Vec<u8>,
        filename: &str,
        mime: &str,
        api_key: Option<&str>,
    ) -> Result<String, AppError> {
        let part = Part::bytes(audio)
            .file_name(filename.to_string())
            .mime_str(mime)?;

        let form = Form::new()
            .text("model", "whisper-1")
            .text("language", "es")
            .part("file", part);

        let response = self
            .http
            .post(format!("{}/audio/transcriptions", self.base_url))
            .bearer_auth(Self::key(api_key)?)
            .multipart(form)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(AppError::ProviderError {
                provider: "openai-whisper",
                status: status.as_u16(),
                body: response.text().await.unwrap_or_default(),
            });
        }

        let parsed: TranscriptionResponse = response.json().await?;
        Ok(parsed.text)
    }
}
