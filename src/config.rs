// src/config.rs

use std::{env, sync::Arc, time::Duration};

use anyhow::Context;
use sqlx::{postgres::PgPoolOptions, PgPool};

use crate::{
    clients::{
        CacheBackend, CalendarProvider, ChatModel, EvolutionClient, GoogleCalendarClient,
        InMemoryCache, MessagingGateway, OpenAiClient, RedisCache,
    },
    common::{
        clock::{Clock, SystemClock},
        tasks::TaskSupervisor,
    },
    db::{ClinicStore, PgClinicStore},
    models::tenancy::CredentialFallbacks,
    services::{
        admin::TenantAdminService,
        availability::AvailabilityService,
        booking::BookingCoordinator,
        dialogue::{DialogueDeps, DialogueEngine},
        dispatcher::InboundDispatcher,
        media::MediaExtractor,
        memory::ConversationMemory,
        org_config::OrgConfigCache,
    },
};

const HTTP_TIMEOUT: Duration = Duration::from_secs(10);
const REDIS_CONNECT_TIMEOUT: Duration = Duration::from_secs(2);

// ---
// 1. Settings (lidas uma vez, do ambiente)
// ---
#[derive(Debug, Clone)]
pub struct Settings {
    pub database_url: String,
    pub redis_url: Option<String>,
    pub port: u16,
    pub fallbacks: CredentialFallbacks,
    pub openai_base_url: String,
    pub openai_model: String,
    pub google_service_account_file: String,
    pub clinic_owner_phone: Option<String>,
    pub admin_jwt_secret: String,
    pub default_tenant_slug: String,
    pub history_ttl: Duration,
    pub config_ttl: Duration,
    pub services_ttl: Duration,
}

impl Settings {
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Lê as variáveis por uma função de busca; valores em branco contam
    /// como ausentes.
    pub fn from_lookup<F>(lookup: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let secs = |key: &str, default: u64| -> anyhow::Result<Duration> {
            match get(key) {
                Some(raw) => raw
                    .parse::<u64>()
                    .map(Duration::from_secs)
                    .with_context(|| format!("{} deve ser um número de segundos", key)),
                None => Ok(Duration::from_secs(default)),
            }
        };

        let port: u16 = match get("PORT") {
            Some(raw) => raw.parse().context("PORT inválida")?,
            None => 3000,
        };

        Ok(Self {
            database_url: get("DATABASE_URL").context("DATABASE_URL deve ser definida")?,
            redis_url: get("REDIS_URL"),
            port,
            fallbacks: CredentialFallbacks {
                evolution_api_url: get("EVOLUTION_API_URL"),
                evolution_api_key: get("EVOLUTION_API_KEY").or_else(|| get("EVOLUTION_API_TOKEN")),
                evolution_instance: Some(get("INSTANCE_NAME").unwrap_or_else(|| "DogBot".to_string())),
                openai_api_key: get("OPENAI_API_KEY"),
            },
            openai_base_url: get("OPENAI_BASE_URL")
                .unwrap_or_else(|| "https://api.openai.com/v1".to_string()),
            openai_model: get("OPENAI_MODEL").unwrap_or_else(|| "gpt-4o".to_string()),
            google_service_account_file: get("GOOGLE_SERVICE_ACCOUNT_FILE")
                .unwrap_or_else(|| "service_account.json".to_string()),
            clinic_owner_phone: get("CLINIC_OWNER_PHONE"),
            admin_jwt_secret: get("ADMIN_JWT_SECRET").context("ADMIN_JWT_SECRET deve ser definido")?,
            default_tenant_slug: get("DEFAULT_TENANT_SLUG").unwrap_or_else(|| "central".to_string()),
            history_ttl: secs("HISTORY_TTL_SECS", 7200)?,
            config_ttl: secs("CONFIG_TTL_SECS", 3600)?,
            services_ttl: secs("SERVICES_TTL_SECS", 3600)?,
        })
    }
}

// ---
// 2. Colaboradores externos (trocados por dublês nos testes)
// ---
pub struct Collaborators {
    pub store: Arc<dyn ClinicStore>,
    pub cache: Arc<dyn CacheBackend>,
    pub chat: Arc<dyn ChatModel>,
    pub gateway: Arc<dyn MessagingGateway>,
    pub calendar: Arc<dyn CalendarProvider>,
    pub clock: Arc<dyn Clock>,
    pub http: reqwest::Client,
}

// ---
// 3. AppState
// ---
#[derive(Clone)]
pub struct AppState {
    pub db_pool: PgPool,
    pub settings: Arc<Settings>,
    pub dispatcher: InboundDispatcher,
    pub admin_service: TenantAdminService,
    pub tasks: TaskSupervisor,
}

impl AppState {
    pub async fn new(settings: Settings) -> anyhow::Result<Self> {
        // Conecta ao banco de dados, usando '?' para propagar erros
        let db_pool = PgPoolOptions::new()
            .max_connections(10)
            .acquire_timeout(Duration::from_secs(3))
            .connect(&settings.database_url)
            .await
            .context("Falha ao conectar no Postgres")?;

        tracing::info!("✅ Conexão com o banco de dados estabelecida com sucesso!");

        let cache = connect_cache(settings.redis_url.as_deref()).await;

        let http = reqwest::Client::builder()
            .timeout(HTTP_TIMEOUT)
            .build()
            .context("Falha ao criar o cliente HTTP")?;

        let collaborators = Collaborators {
            store: Arc::new(PgClinicStore::new(db_pool.clone())),
            cache,
            chat: Arc::new(OpenAiClient::new(
                http.clone(),
                &settings.openai_base_url,
                &settings.openai_model,
            )),
            gateway: Arc::new(EvolutionClient::new(http.clone())),
            calendar: Arc::new(GoogleCalendarClient::from_file(
                http.clone(),
                &settings.google_service_account_file,
            )),
            clock: Arc::new(SystemClock),
            http,
        };

        Ok(Self::assemble(settings, db_pool, collaborators))
    }

    /// Monta os serviços a partir dos colaboradores. Sem I/O.
    pub fn assemble(settings: Settings, db_pool: PgPool, deps: Collaborators) -> Self {
        let tasks = TaskSupervisor::new();

        let memory = ConversationMemory::new(
            deps.cache.clone(),
            settings.history_ttl,
            settings.services_ttl,
        );
        let configs = OrgConfigCache::new(
            deps.cache.clone(),
            deps.store.clone(),
            settings.fallbacks.clone(),
            settings.config_ttl,
        );
        let booking = BookingCoordinator::new(
            deps.store.clone(),
            deps.calendar,
            deps.gateway.clone(),
            deps.clock.clone(),
            settings.clinic_owner_phone.clone(),
        );

        let engine = DialogueEngine::new(DialogueDeps {
            memory: memory.clone(),
            availability: AvailabilityService::new(deps.store.clone(), deps.clock.clone()),
            store: deps.store.clone(),
            chat: deps.chat,
            gateway: deps.gateway,
            media: MediaExtractor::new(deps.http, HTTP_TIMEOUT),
            booking,
            tasks: tasks.clone(),
            clock: deps.clock,
        });

        Self {
            db_pool,
            dispatcher: InboundDispatcher::new(configs.clone(), engine, tasks.clone()),
            admin_service: TenantAdminService::new(deps.store, configs, memory),
            settings: Arc::new(settings),
            tasks,
        }
    }
}

/// Redis quando configurado e acessível; senão, cache em memória.
async fn connect_cache(redis_url: Option<&str>) -> Arc<dyn CacheBackend> {
    let Some(url) = redis_url else {
        tracing::info!("REDIS_URL ausente, usando cache em memória");
        return Arc::new(InMemoryCache::new());
    };

    match RedisCache::connect(url, REDIS_CONNECT_TIMEOUT).await {
        Ok(cache) => {
            tracing::info!("✅ Conectado ao Redis");
            Arc::new(cache)
        }
        Err(e) => {
            tracing::warn!("⚠️ Redis indisponível ({}), usando cache em memória", e);
            Arc::new(InMemoryCache::new())
        }
    }
}
