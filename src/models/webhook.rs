// src/models/webhook.rs

use serde::{Deserialize, Serialize};
use serde_json::Value;
use utoipa::ToSchema;

// =============================================================================
//  PAYLOAD DE ENTRADA (Evolution API)
// =============================================================================
// O formato muda conforme a versão do evento: às vezes a mensagem vem no
// topo, às vezes dentro de `data`. Todos os campos são opcionais.

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InboundMessage {
    #[serde(default)]
    pub key: MessageKey,
    pub push_name: Option<String>,
    pub message_type: Option<String>,
    #[serde(default)]
    pub message: MessageBody,
    pub base64: Option<String>,
    pub media_url: Option<String>,
    pub phone: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageKey {
    pub remote_jid: Option<String>,
    #[serde(default)]
    pub from_me: bool,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageBody {
    pub conversation: Option<String>,
    pub extended_text_message: Option<ExtendedText>,
    pub audio_message: Option<MediaMessage>,
    pub image_message: Option<MediaMessage>,
    pub base64: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ExtendedText {
    pub text: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MediaMessage {
    pub url: Option<String>,
    pub media_url: Option<String>,
    pub base64: Option<String>,
    pub mimetype: Option<String>,
}

/// O que a mensagem carrega, já roteado pelo `messageType`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MessageKind {
    Text(String),
    Audio,
    Image,
    Unsupported,
}

impl InboundMessage {
    /// Aceita tanto `{ "data": {...} }` quanto a mensagem no topo.
    pub fn from_payload(body: &Value) -> Result<Self, serde_json::Error> {
        let inner = match body.get("data") {
            Some(data) if data.is_object() => data,
            _ => body,
        };
        serde_json::from_value(inner.clone())
    }

    /// Telefone normalizado (só dígitos), tirado do `remoteJid` ou do campo `phone`.
    pub fn phone(&self) -> Option<String> {
        let raw = self
            .key
            .remote_jid
            .as_deref()
            .and_then(|jid| jid.split('@').next())
            .filter(|p| !p.is_empty())
            .or(self.phone.as_deref())?;

        let digits: String = raw.chars().filter(|c| c.is_ascii_digit()).collect();
        if digits.is_empty() { None } else { Some(digits) }
    }

    pub fn sender_name(&self) -> &str {
        self.push_name
            .as_deref()
            .filter(|n| !n.trim().is_empty())
            .unwrap_or("Usuario")
    }

    pub fn kind(&self) -> MessageKind {
        match self.message_type.as_deref() {
            Some("conversation") => {
                MessageKind::Text(self.message.conversation.clone().unwrap_or_default())
            }
            Some("extendedTextMessage") => MessageKind::Text(
                self.message
                    .extended_text_message
                    .as_ref()
                    .and_then(|e| e.text.clone())
                    .unwrap_or_default(),
            ),
            Some("audioMessage") => MessageKind::Audio,
            Some("imageMessage") => MessageKind::Image,
            _ => MessageKind::Unsupported,
        }
    }
}

// =============================================================================
//  RESPOSTA AO GATEWAY
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum AckStatus {
    Ok,
    Ignored,
    Forbidden,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct WebhookAck {
    #[schema(example = "ok")]
    pub status: AckStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[schema(example = "org_not_found")]
    pub reason: Option<String>,
}

impl WebhookAck {
    pub fn ok() -> Self {
        Self { status: AckStatus::Ok, reason: None }
    }

    pub fn ignored(reason: &'static str) -> Self {
        Self { status: AckStatus::Ignored, reason: Some(reason.to_string()) }
    }

    pub fn forbidden() -> Self {
        Self { status: AckStatus::Forbidden, reason: Some("invalid_secret".to_string()) }
    }

    pub fn error(reason: &'static str) -> Self {
        Self { status: AckStatus::Error, reason: Some(reason.to_string()) }
    }
}
