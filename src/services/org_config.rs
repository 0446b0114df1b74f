// src/services/org_config.rs

use std::{sync::Arc, time::Duration};

use crate::{
    clients::CacheBackend,
    common::error::AppError,
    db::ClinicStore,
    models::tenancy::{CredentialFallbacks, TenantConfig},
};

fn config_key(slug: &str) -> String {
    format!("org:config:{}", slug)
}

/// Snapshot de configuração por clínica, em cache.
///
/// Toda mudança administrativa de plano ou status precisa chamar
/// `invalidate`, senão o núcleo só vê a mudança depois do TTL.
#[derive(Clone)]
pub struct OrgConfigCache {
    cache: Arc<dyn CacheBackend>,
    store: Arc<dyn ClinicStore>,
    fallbacks: Arc<CredentialFallbacks>,
    ttl: Duration,
}

impl OrgConfigCache {
    pub fn new(
        cache: Arc<dyn CacheBackend>,
        store: Arc<dyn ClinicStore>,
        fallbacks: CredentialFallbacks,
        ttl: Duration,
    ) -> Self {
        Self { cache, store, fallbacks: Arc::new(fallbacks), ttl }
    }

    pub async fn get_config(&self, slug: &str) -> Option<TenantConfig> {
        let raw = match self.cache.get(&config_key(slug)).await {
            Ok(raw) => raw?,
            Err(e) => {
                tracing::warn!("⚠️ Cache indisponível lendo config de {}: {}", slug, e);
                return None;
            }
        };

        match serde_json::from_str(&raw) {
            Ok(config) => Some(config),
            Err(e) => {
                tracing::warn!("Config em cache inválida para {}: {}", slug, e);
                None
            }
        }
    }

    pub async fn set_config(&self, slug: &str, config: &TenantConfig, ttl: Duration) {
        let payload = match serde_json::to_string(config) {
            Ok(payload) => payload,
            Err(e) => {
                tracing::error!("Falha ao serializar config de {}: {}", slug, e);
                return;
            }
        };

        if let Err(e) = self.cache.set(&config_key(slug), &payload, ttl).await {
            tracing::warn!("⚠️ Cache indisponível salvando config de {}: {}", slug, e);
        }
    }

    pub async fn invalidate(&self, slug: &str) {
        match self.cache.delete(&config_key(slug)).await {
            Ok(()) => tracing::info!("🔄 Config da clínica '{}' invalidada", slug),
            Err(e) => tracing::warn!("⚠️ Falha ao invalidar config de {}: {}", slug, e),
        }
    }

    /// Cache primeiro; na falta, carrega do banco, aplica os fallbacks de
    /// ambiente e popula o cache. `None` = clínica inexistente.
    pub async fn resolve(&self, slug: &str) -> Result<Option<TenantConfig>, AppError> {
        if let Some(config) = self.get_config(slug).await {
            return Ok(Some(config));
        }

        let Some(org) = self.store.find_organization(slug).await? else {
            return Ok(None);
        };

        let config = TenantConfig::resolve(org, &self.fallbacks);
        self.set_config(slug, &config, self.ttl).await;
        Ok(Some(config))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        clients::InMemoryCache,
        models::tenancy::PlanTier,
        testing::{organization, FailingCache, FakeStore},
    };

    fn fallbacks() -> CredentialFallbacks {
        CredentialFallbacks {
            evolution_api_key: Some("env-key".into()),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn miss_loads_from_store_and_populates_cache() {
        let store = Arc::new(FakeStore::default());
        // Sem chave própria: vale a do ambiente
        let mut org = organization("central", Some("basic"));
        org.evolution_api_key = None;
        store.add_organization(org);
        let cache: Arc<dyn CacheBackend> = Arc::new(InMemoryCache::new());
        let configs = OrgConfigCache::new(cache, store.clone(), fallbacks(), Duration::from_secs(3600));

        let config = configs.resolve("central").await.unwrap().unwrap();
        assert_eq!(config.plan, PlanTier::Basic);
        assert_eq!(config.gateway.api_key.as_deref(), Some("env-key"));

        // A segunda leitura vem do cache, mesmo que o banco mude
        store.set_plan("central", "pro");
        let cached = configs.resolve("central").await.unwrap().unwrap();
        assert_eq!(cached.plan, PlanTier::Basic);

        configs.invalidate("central").await;
        let fresh = configs.resolve("central").await.unwrap().unwrap();
        assert_eq!(fresh.plan, PlanTier::Pro);
    }

    #[tokio::test]
    async fn unknown_slug_is_none() {
        let configs = OrgConfigCache::new(
            Arc::new(InMemoryCache::new()),
            Arc::new(FakeStore::default()),
            fallbacks(),
            Duration::from_secs(3600),
        );
        assert!(configs.resolve("nadie").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn broken_cache_still_resolves_from_store() {
        let store = Arc::new(FakeStore::default());
        store.add_organization(organization("central", None));
        let configs = OrgConfigCache::new(
            Arc::new(FailingCache),
            store,
            fallbacks(),
            Duration::from_secs(3600),
        );

        let config = configs.resolve("central").await.unwrap().unwrap();
        assert_eq!(config.plan, PlanTier::Pro);
    }
}
