// src/services/admin.rs

use std::sync::Arc;

use crate::{
    common::error::AppError,
    db::ClinicStore,
    models::tenancy::{Organization, PlanTier, TenantStatusResponse},
    services::{memory::ConversationMemory, org_config::OrgConfigCache},
};

fn status_of(org: Organization) -> TenantStatusResponse {
    TenantStatusResponse {
        plan: PlanTier::from_column(org.plan_type.as_deref()),
        slug: org.slug,
        is_active: org.is_active,
    }
}

/// Mutações administrativas de clínica. Toda escrita termina invalidando
/// o snapshot em cache, para o próximo webhook já ver o valor novo.
#[derive(Clone)]
pub struct TenantAdminService {
    store: Arc<dyn ClinicStore>,
    configs: OrgConfigCache,
    memory: ConversationMemory,
}

impl TenantAdminService {
    pub fn new(store: Arc<dyn ClinicStore>, configs: OrgConfigCache, memory: ConversationMemory) -> Self {
        Self { store, configs, memory }
    }

    pub async fn change_plan(&self, slug: &str, plan: &str) -> Result<TenantStatusResponse, AppError> {
        let plan: PlanTier = plan.parse()?;

        let org = self
            .store
            .update_plan(slug, plan)
            .await?
            .ok_or_else(|| AppError::TenantNotFound(slug.to_string()))?;

        self.configs.invalidate(slug).await;
        tracing::info!("💳 Plano da clínica '{}' alterado para {}", slug, plan);

        Ok(status_of(org))
    }

    pub async fn set_active(&self, slug: &str, active: bool) -> Result<TenantStatusResponse, AppError> {
        let org = self
            .store
            .set_active(slug, active)
            .await?
            .ok_or_else(|| AppError::TenantNotFound(slug.to_string()))?;

        self.configs.invalidate(slug).await;
        tracing::info!("Clínica '{}' agora está {}", slug, if active { "ativa" } else { "inativa" });

        Ok(status_of(org))
    }

    /// Zera a conversa de um telefone (histórico, contexto e estado).
    pub async fn reset_session(&self, phone: &str) {
        let digits: String = phone.chars().filter(|c| c.is_ascii_digit()).collect();
        self.memory.clear_session(&digits).await;
        tracing::info!("🧹 Sessão de {} reiniciada", digits);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use crate::{
        clients::{CacheBackend, InMemoryCache},
        models::{conversation::ChatMessage, tenancy::CredentialFallbacks},
        testing::{organization, FakeStore},
    };

    fn service(store: Arc<FakeStore>, cache: Arc<dyn CacheBackend>) -> (TenantAdminService, OrgConfigCache, ConversationMemory) {
        let configs = OrgConfigCache::new(
            cache.clone(),
            store.clone(),
            CredentialFallbacks::default(),
            Duration::from_secs(3600),
        );
        let memory = ConversationMemory::new(cache, Duration::from_secs(60), Duration::from_secs(60));
        (
            TenantAdminService::new(store, configs.clone(), memory.clone()),
            configs,
            memory,
        )
    }

    #[tokio::test]
    async fn plan_change_is_visible_on_next_resolve() {
        let store = Arc::new(FakeStore::default());
        store.add_organization(organization("central", Some("lite")));
        let (admin, configs, _) = service(store, Arc::new(InMemoryCache::new()));

        // Aquece o cache com o plano antigo
        let before = configs.resolve("central").await.unwrap().unwrap();
        assert_eq!(before.plan, PlanTier::Lite);

        let status = admin.change_plan("central", "premium").await.unwrap();
        assert_eq!(status.plan, PlanTier::Premium);

        let after = configs.resolve("central").await.unwrap().unwrap();
        assert_eq!(after.plan, PlanTier::Premium);
    }

    #[tokio::test]
    async fn deactivation_is_visible_on_next_resolve() {
        let store = Arc::new(FakeStore::default());
        store.add_organization(organization("central", None));
        let (admin, configs, _) = service(store, Arc::new(InMemoryCache::new()));

        assert!(configs.resolve("central").await.unwrap().unwrap().is_active);
        let status = admin.set_active("central", false).await.unwrap();
        assert!(!status.is_active);
        assert!(!configs.resolve("central").await.unwrap().unwrap().is_active);
    }

    #[tokio::test]
    async fn unknown_plan_and_tenant_are_errors() {
        let store = Arc::new(FakeStore::default());
        store.add_organization(organization("central", None));
        let (admin, _, _) = service(store, Arc::new(InMemoryCache::new()));

        assert!(matches!(
            admin.change_plan("central", "gold").await,
            Err(AppError::UnknownPlan(_))
        ));
        assert!(matches!(
            admin.set_active("nadie", true).await,
            Err(AppError::TenantNotFound(_))
        ));
    }

    #[tokio::test]
    async fn reset_session_normalizes_phone() {
        let store = Arc::new(FakeStore::default());
        let (admin, _, memory) = service(store, Arc::new(InMemoryCache::new()));
        memory.save_history("5491100000000", &[ChatMessage::user("hola")]).await;

        admin.reset_session("+54 9 11 0000-0000").await;

        assert!(memory.history("5491100000000").await.is_empty());
    }
}
