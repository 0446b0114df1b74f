// src/services/memory.rs

use std::{collections::HashMap, sync::Arc, time::Duration};

use uuid::Uuid;

use crate::{clients::CacheBackend, models::conversation::ChatMessage};

pub const HISTORY_LIMIT: usize = 10;

fn history_key(phone: &str) -> String {
    format!("user:{}:history", phone)
}

fn context_key(phone: &str) -> String {
    format!("user:{}:context", phone)
}

fn state_key(phone: &str) -> String {
    format!("user:{}:state", phone)
}

fn services_key(org_id: Uuid) -> String {
    format!("org:{}:services_text", org_id)
}

/// Memória de conversa por telefone.
///
/// É só cache: leitura que falha devolve vazio, escrita que falha é logada
/// e engolida. Nada aqui derruba o turno.
#[derive(Clone)]
pub struct ConversationMemory {
    cache: Arc<dyn CacheBackend>,
    session_ttl: Duration,
    services_ttl: Duration,
}

impl ConversationMemory {
    pub fn new(cache: Arc<dyn CacheBackend>, session_ttl: Duration, services_ttl: Duration) -> Self {
        Self { cache, session_ttl, services_ttl }
    }

    pub async fn history(&self, phone: &str) -> Vec<ChatMessage> {
        let raw = match self.cache.get(&history_key(phone)).await {
            Ok(Some(raw)) => raw,
            Ok(None) => return Vec::new(),
            Err(e) => {
                tracing::warn!("⚠️ Cache indisponível lendo histórico: {}", e);
                return Vec::new();
            }
        };

        serde_json::from_str(&raw).unwrap_or_else(|e| {
            tracing::warn!("Histórico corrompido para {}, descartando: {}", phone, e);
            Vec::new()
        })
    }

    /// Guarda só as últimas 10 entradas, na ordem original.
    pub async fn save_history(&self, phone: &str, history: &[ChatMessage]) {
        let start = history.len().saturating_sub(HISTORY_LIMIT);
        let payload = match serde_json::to_string(&history[start..]) {
            Ok(payload) => payload,
            Err(e) => {
                tracing::error!("Falha ao serializar histórico: {}", e);
                return;
            }
        };

        if let Err(e) = self
            .cache
            .set(&history_key(phone), &payload, self.session_ttl)
            .await
        {
            tracing::warn!("⚠️ Cache indisponível salvando histórico: {}", e);
        }
    }

    pub async fn context(&self, phone: &str) -> HashMap<String, String> {
        self.cache
            .hgetall(&context_key(phone))
            .await
            .unwrap_or_else(|e| {
                tracing::warn!("⚠️ Cache indisponível lendo contexto: {}", e);
                HashMap::new()
            })
    }

    /// Grava um campo do contexto e renova a expiração do hash inteiro.
    pub async fn save_context(&self, phone: &str, field: &str, value: &str) {
        let key = context_key(phone);
        if let Err(e) = self.cache.hset(&key, field, value).await {
            tracing::warn!("⚠️ Cache indisponível salvando contexto: {}", e);
            return;
        }
        if let Err(e) = self.cache.expire(&key, self.session_ttl).await {
            tracing::warn!("⚠️ Falha ao renovar expiração do contexto: {}", e);
        }
    }

    pub async fn services_text(&self, org_id: Uuid) -> Option<String> {
        match self.cache.get(&services_key(org_id)).await {
            Ok(text) => text.filter(|t| !t.is_empty()),
            Err(e) => {
                tracing::warn!("⚠️ Cache indisponível lendo preços: {}", e);
                None
            }
        }
    }

    pub async fn set_services_text(&self, org_id: Uuid, text: &str) {
        if let Err(e) = self
            .cache
            .set(&services_key(org_id), text, self.services_ttl)
            .await
        {
            tracing::warn!("⚠️ Cache indisponível salvando preços: {}", e);
        }
    }

    /// Esquece tudo do telefone: estado, contexto e histórico.
    pub async fn clear_session(&self, phone: &str) {
        for key in [state_key(phone), context_key(phone), history_key(phone)] {
            if let Err(e) = self.cache.delete(&key).await {
                tracing::warn!("⚠️ Falha ao apagar {}: {}", key, e);
            }
        }
    }
}
