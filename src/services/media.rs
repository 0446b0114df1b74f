// src/services/media.rs

use std::time::Duration;

use base64::{engine::general_purpose::STANDARD, Engine as _};

use crate::models::webhook::{InboundMessage, MediaMessage};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaKind {
    Audio,
    Image,
}

/// Confere os "magic bytes" do conteúdo.
pub fn is_valid_media(data: &[u8], kind: MediaKind) -> bool {
    if data.len() < 12 {
        return false;
    }

    match kind {
        MediaKind::Audio => {
            data.starts_with(b"OggS")
                || data.starts_with(b"RIFF")
                || data.starts_with(b"ID3")
                || data.starts_with(&[0xFF, 0xFB])
        }
        MediaKind::Image => {
            data.starts_with(&[0xFF, 0xD8, 0xFF])
                || data.starts_with(b"\x89PNG\r\n\x1a\n")
                || data.starts_with(b"GIF87a")
                || data.starts_with(b"GIF89a")
                || (data.starts_with(b"RIFF") && &data[8..12] == b"WEBP")
        }
    }
}

fn media_part(message: &InboundMessage, kind: MediaKind) -> Option<&MediaMessage> {
    match kind {
        MediaKind::Audio => message.message.audio_message.as_ref(),
        MediaKind::Image => message.message.image_message.as_ref(),
    }
}

fn non_empty(value: Option<&String>) -> Option<&str> {
    value.map(String::as_str).filter(|v| !v.is_empty())
}

/// MIME declarado pelo gateway; na falta, o formato mais comum do WhatsApp.
pub fn mime_type(message: &InboundMessage, kind: MediaKind) -> &str {
    media_part(message, kind)
        .and_then(|p| p.mimetype.as_deref())
        .map(str::trim)
        .filter(|m| !m.is_empty())
        .unwrap_or(match kind {
            MediaKind::Audio => "audio/ogg",
            MediaKind::Image => "image/jpeg",
        })
}

/// Base64 embutido no payload, na ordem em que o gateway costuma mandar.
fn inline_base64(message: &InboundMessage, kind: MediaKind) -> Option<&str> {
    let part = media_part(message, kind);
    non_empty(part.and_then(|p| p.base64.as_ref()))
        .or_else(|| non_empty(message.base64.as_ref()))
        .or_else(|| non_empty(message.message.base64.as_ref()))
}

fn media_url(message: &InboundMessage, kind: MediaKind) -> Option<&str> {
    let part = media_part(message, kind);
    non_empty(part.and_then(|p| p.url.as_ref()))
        .or_else(|| non_empty(message.media_url.as_ref()))
        .or_else(|| non_empty(part.and_then(|p| p.media_url.as_ref())))
}

/// Normaliza áudio/imagem recebidos em bytes ou base64.
///
/// Nunca falha: `None` significa "não deu para extrair a mídia".
#[derive(Clone)]
pub struct MediaExtractor {
    http: reqwest::Client,
    timeout: Duration,
}

impl MediaExtractor {
    pub fn new(http: reqwest::Client, timeout: Duration) -> Self {
        Self { http, timeout }
    }

    pub async fn extract_bytes(
        &self,
        message: &InboundMessage,
        kind: MediaKind,
        api_key: Option<&str>,
    ) -> Option<Vec<u8>> {
        if let Some(encoded) = inline_base64(message, kind) {
            match STANDARD.decode(encoded) {
                Ok(bytes) => return Some(self.checked(bytes, kind)),
                Err(e) => tracing::warn!("Base64 de mídia inválido, tentando URL: {}", e),
            }
        }

        let url = media_url(message, kind)?;
        let bytes = self.fetch(url, api_key).await?;
        Some(self.checked(bytes, kind))
    }

    pub async fn extract_base64(
        &self,
        message: &InboundMessage,
        kind: MediaKind,
        api_key: Option<&str>,
    ) -> Option<String> {
        if let Some(encoded) = inline_base64(message, kind) {
            return Some(encoded.to_string());
        }

        let url = media_url(message, kind)?;
        let bytes = self.fetch(url, api_key).await?;
        Some(STANDARD.encode(self.checked(bytes, kind)))
    }

    fn checked(&self, bytes: Vec<u8>, kind: MediaKind) -> Vec<u8> {
        if !is_valid_media(&bytes, kind) {
            tracing::warn!(
                "⚠️ Mídia {:?} com cabeçalho desconhecido ({} bytes)",
                kind,
                bytes.len()
            );
        }
        bytes
    }

    async fn fetch(&self, url: &str, api_key: Option<&str>) -> Option<Vec<u8>> {
        let mut request = self.http.get(url).timeout(self.timeout);
        if let Some(key) = api_key {
            request = request.header("apikey", key);
        }

        let response = match request.send().await {
            Ok(response) => response,
            Err(e) => {
                tracing::error!("❌ Erro baixando mídia: {}", e);
                return None;
            }
        };

        if !response.status().is_success() {
            tracing::error!("❌ Download de mídia respondeu {}", response.status());
            return None;
        }

        match response.bytes().await {
            Ok(bytes) => Some(bytes.to_vec()),
            Err(e) => {
                tracing::error!("❌ Erro lendo corpo da mídia: {}", e);
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{http::HeaderMap, routing::get, Router};
    use serde_json::json;

    const OGG: &[u8] = b"OggS\x00\x02\x00\x00\x00\x00\x00\x00\x00\x00";

    fn extractor() -> MediaExtractor {
        MediaExtractor::new(reqwest::Client::new(), Duration::from_secs(2))
    }

    #[test]
    fn sniffs_known_headers() {
        assert!(is_valid_media(OGG, MediaKind::Audio));
        assert!(is_valid_media(b"RIFF\x00\x00\x00\x00WEBPVP8 ", MediaKind::Image));
        assert!(is_valid_media(b"\x89PNG\r\n\x1a\n\x00\x00\x00\x0d", MediaKind::Image));
        assert!(!is_valid_media(OGG, MediaKind::Image));
        assert!(!is_valid_media(b"OggS", MediaKind::Audio));
    }

    #[tokio::test]
    async fn inline_base64_wins_over_url() {
        let payload = json!({
            "messageType": "audioMessage",
            "message": { "audioMessage": {
                "base64": STANDARD.encode(OGG),
                "url": "http://127.0.0.1:9/nunca"
            }}
        });
        let message = InboundMessage::from_payload(&payload).unwrap();

        let bytes = extractor().extract_bytes(&message, MediaKind::Audio, None).await;
        assert_eq!(bytes.as_deref(), Some(OGG));

        let encoded = extractor().extract_base64(&message, MediaKind::Audio, None).await;
        assert_eq!(encoded, Some(STANDARD.encode(OGG)));
    }

    #[tokio::test]
    async fn missing_payload_is_none() {
        let payload = json!({ "messageType": "imageMessage", "message": { "imageMessage": {} } });
        let message = InboundMessage::from_payload(&payload).unwrap();
        assert!(extractor().extract_base64(&message, MediaKind::Image, None).await.is_none());
    }

    #[tokio::test]
    async fn fetches_url_with_api_key_header() {
        let app = Router::new().route(
            "/media",
            get(|headers: HeaderMap| async move {
                match headers.get("apikey").and_then(|v| v.to_str().ok()) {
                    Some("evo-key") => (axum::http::StatusCode::OK, OGG.to_vec()),
                    _ => (axum::http::StatusCode::UNAUTHORIZED, Vec::new()),
                }
            }),
        );
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move { axum::serve(listener, app).await.unwrap() });

        let payload = json!({
            "messageType": "audioMessage",
            "mediaUrl": format!("http://{}/media", addr),
            "message": { "audioMessage": {} }
        });
        let message = InboundMessage::from_payload(&payload).unwrap();

        let ok = extractor()
            .extract_bytes(&message, MediaKind::Audio, Some("evo-key"))
            .await;
        assert_eq!(ok.as_deref(), Some(OGG));

        let denied = extractor().extract_bytes(&message, MediaKind::Audio, None).await;
        assert!(denied.is_none());
    }
}
