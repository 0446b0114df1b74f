// src/models/conversation.rs

use serde::{Deserialize, Serialize};
use validator::Validate;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

/// Uma entrada do histórico, no formato que o modelo de chat espera.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self { role: Role::System, content: content.into() }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self { role: Role::User, content: content.into() }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self { role: Role::Assistant, content: content.into() }
    }
}

/// Chave do contexto onde guardamos o nome da mascota.
pub const CONTEXT_PET_NAME: &str = "pet_name";

/// Pedido de agendamento extraído da tag `[[CONFIRMADO:...]]`.
///
/// O modelo só preenche mascota, motivo e data; nome do dono e telefone
/// vêm do remetente da mensagem.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Validate)]
pub struct BookingIntent {
    #[serde(default = "default_pet_name")]
    #[validate(length(min = 1, message = "O nome da mascota é obrigatório."))]
    pub pet_name: String,

    #[serde(default = "default_reason")]
    pub reason: String,

    #[serde(default)]
    pub date_time: String,

    #[serde(default)]
    pub owner_name: Option<String>,

    #[serde(default)]
    pub phone: String,
}

fn default_pet_name() -> String {
    "Mascota".to_string()
}

fn default_reason() -> String {
    "Consulta".to_string()
}

impl BookingIntent {
    pub fn with_sender(mut self, owner_name: &str, phone: &str) -> Self {
        self.owner_name = Some(owner_name.to_string());
        self.phone = phone.to_string();
        self
    }
}
