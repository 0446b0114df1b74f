// src/clients/cache.rs

use std::{collections::HashMap, time::Duration};

use async_trait::async_trait;
use redis::{aio::ConnectionManager, Client};
use tokio::{sync::RwLock, time::Instant};

use crate::common::error::AppError;

/// Backend chave-valor com TTL por chave e campos de hash.
///
/// Os chamadores (memória de conversa, cache de configuração) tratam
/// qualquer erro daqui como cache frio; o trait em si propaga.
#[async_trait]
pub trait CacheBackend: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>, AppError>;
    async fn set(&self, key: &str, value: &str, ttl: Duration) -> Result<(), AppError>;
    async fn delete(&self, key: &str) -> Result<(), AppError>;
    async fn hset(&self, key: &str, field: &str, value: &str) -> Result<(), AppError>;
    async fn hgetall(&self, key: &str) -> Result<HashMap<String, String>, AppError>;
    async fn expire(&self, key: &str, ttl: Duration) -> Result<(), AppError>;
}

// =============================================================================
//  REDIS
// =============================================================================

#[derive(Clone)]
pub struct RedisCache {
    conn: ConnectionManager,
}

impl RedisCache {
    /// Conecta com prazo curto: se o Redis não responder em `timeout`, o
    /// chamador decide o que fazer (o main cai para o cache em memória).
    pub async fn connect(url: &str, timeout: Duration) -> Result<Self, AppError> {
        let client = Client::open(url)?;
        let conn = tokio::time::timeout(timeout, ConnectionManager::new(client))
            .await
            .map_err(|_| anyhow::anyhow!("Tempo esgotado conectando ao Redis"))??;
        Ok(Self { conn })
    }
}

#[async_trait]
impl CacheBackend for RedisCache {
    async fn get(&self, key: &str) -> Result<Option<String>, AppError> {
        let mut conn = self.conn.clone();
        let value: Option<String> = redis::cmd("GET").arg(key).query_async(&mut conn).await?;
        Ok(value)
    }

    async fn set(&self, key: &str, value: &str, ttl: Duration) -> Result<(), AppError> {
        let mut conn = self.conn.clone();
        let _: () = redis::cmd("SET")
            .arg(key)
            .arg(value)
            .arg("EX")
            .arg(ttl.as_secs().max(1))
            .query_async(&mut conn)
            .await?;
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), AppError> {
        let mut conn = self.conn.clone();
        let _: i64 = redis::cmd("DEL").arg(key).query_async(&mut conn).await?;
        Ok(())
    }

    async fn hset(&self, key: &str, field: &str, value: &str) -> Result<(), AppError> {
        let mut conn = self.conn.clone();
        let _: i64 = redis::cmd("HSET")
            .arg(key)
            .arg(field)
            .arg(value)
            .query_async(&mut conn)
            .await?;
        Ok(())
    }

    async fn hgetall(&self, key: &str) -> Result<HashMap<String, String>, AppError> {
        let mut conn = self.conn.clone();
        let map: HashMap<String, String> =
            redis::cmd("HGETALL").arg(key).query_async(&mut conn).await?;
        Ok(map)
    }

    async fn expire(&self, key: &str, ttl: Duration) -> Result<(), AppError> {
        let mut conn = self.conn.clone();
        let _: i64 = redis::cmd("EXPIRE")
            .arg(key)
            .arg(ttl.as_secs().max(1))
            .query_async(&mut conn)
            .await?;
        Ok(())
    }
}

// =============================================================================
//  EM MEMÓRIA (sem REDIS_URL, e nos testes)
// =============================================================================

#[derive(Debug, Clone)]
enum Stored {
    Text(String),
    Hash(HashMap<String, String>),
}

#[derive(Debug, Clone)]
struct Entry {
    value: Stored,
    expires_at: Option<Instant>,
}

impl Entry {
    fn is_live(&self, now: Instant) -> bool {
        self.expires_at.is_none_or(|at| at > now)
    }
}

// Intervalo mínimo entre varreduras de chaves vencidas
const SWEEP_INTERVAL: Duration = Duration::from_secs(60);

#[derive(Default)]
struct Entries {
    map: HashMap<String, Entry>,
    next_sweep: Option<Instant>,
}

impl Entries {
    /// Remove tudo que já venceu, no máximo uma vez por `SWEEP_INTERVAL`.
    /// Chamado só nos caminhos de escrita, que já seguram o lock exclusivo.
    fn sweep(&mut self, now: Instant) {
        if self.next_sweep.is_some_and(|at| at > now) {
            return;
        }
        self.map.retain(|_, entry| entry.is_live(now));
        self.next_sweep = Some(now + SWEEP_INTERVAL);
    }
}

/// Cache de processo único com a mesma semântica de TTL do Redis.
///
/// Chave vencida sai do mapa ao ser lida; as que ninguém lê mais saem na
/// varredura periódica feita pelas escritas.
#[derive(Default)]
pub struct InMemoryCache {
    entries: RwLock<Entries>,
}

impl InMemoryCache {
    pub fn new() -> Self {
        Self::default()
    }

    async fn live(&self, key: &str) -> Option<Entry> {
        let now = Instant::now();
        {
            let entries = self.entries.read().await;
            match entries.map.get(key) {
                None => return None,
                Some(entry) if entry.is_live(now) => return Some(entry.clone()),
                Some(_) => {}
            }
        }

        // Vencida: sobe para o lock de escrita e remove
        let mut entries = self.entries.write().await;
        if entries.map.get(key).is_some_and(|e| !e.is_live(now)) {
            entries.map.remove(key);
        }
        None
    }

    #[cfg(test)]
    async fn len(&self) -> usize {
        self.entries.read().await.map.len()
    }
}

#[async_trait]
impl CacheBackend for InMemoryCache {
    async fn get(&self, key: &str) -> Result<Option<String>, AppError> {
        Ok(match self.live(key).await {
            Some(Entry { value: Stored::Text(text), .. }) => Some(text),
            _ => None,
        })
    }

    async fn set(&self, key: &str, value: &str, ttl: Duration) -> Result<(), AppError> {
        let now = Instant::now();
        let mut entries = self.entries.write().await;
        entries.sweep(now);
        entries.map.insert(
            key.to_string(),
            Entry {
                value: Stored::Text(value.to_string()),
                expires_at: Some(now + ttl),
            },
        );
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), AppError> {
        self.entries.write().await.map.remove(key);
        Ok(())
    }

    async fn hset(&self, key: &str, field: &str, value: &str) -> Result<(), AppError> {
        let now = Instant::now();
        let mut entries = self.entries.write().await;
        entries.sweep(now);

        let entry = entries
            .map
            .entry(key.to_string())
            .or_insert_with(|| Entry { value: Stored::Hash(HashMap::new()), expires_at: None });

        // Chave vencida ou de outro tipo recomeça como hash vazio
        if !entry.is_live(now) || !matches!(entry.value, Stored::Hash(_)) {
            *entry = Entry { value: Stored::Hash(HashMap::new()), expires_at: None };
        }

        if let Stored::Hash(map) = &mut entry.value {
            map.insert(field.to_string(), value.to_string());
        }
        Ok(())
    }

    async fn hgetall(&self, key: &str) -> Result<HashMap<String, String>, AppError> {
        Ok(match self.live(key).await {
            Some(Entry { value: Stored::Hash(map), .. }) => map,
            _ => HashMap::new(),
        })
    }

    async fn expire(&self, key: &str, ttl: Duration) -> Result<(), AppError> {
        let mut entries = self.entries.write().await;
        if let Some(entry) = entries.map.get_mut(key) {
            entry.expires_at = Some(Instant::now() + ttl);
        }
        Ok(())
    }
}
