// src/services/dialogue.rs

use std::sync::Arc;

use serde_json::Value;
use tracing::instrument;

use crate::{
    clients::{ChatModel, MessagingGateway},
    common::{clock::Clock, tasks::TaskSupervisor},
    db::ClinicStore,
    models::{
        conversation::{ChatMessage, CONTEXT_PET_NAME},
        tenancy::{Feature, TenantConfig},
        webhook::{InboundMessage, MessageKind},
    },
    services::{
        availability::{AvailabilityService, DEFAULT_DAYS_AHEAD, NO_AVAILABILITY},
        booking::BookingCoordinator,
        booking_tag::parse_reply,
        media::{self, MediaExtractor, MediaKind},
        memory::ConversationMemory,
        prompts::{self, PromptContext},
    },
};

/// O motor de conversa: um turno por mensagem recebida.
///
/// Nada aqui devolve erro para cima. Falhas de provedor viram texto padrão
/// e falhas de cache viram sessão vazia.
#[derive(Clone)]
pub struct DialogueEngine {
    memory: ConversationMemory,
    availability: AvailabilityService,
    store: Arc<dyn ClinicStore>,
    chat: Arc<dyn ChatModel>,
    gateway: Arc<dyn MessagingGateway>,
    media: MediaExtractor,
    booking: BookingCoordinator,
    tasks: TaskSupervisor,
    clock: Arc<dyn Clock>,
}

/// Dependências do motor, agrupadas para o construtor não virar uma lista
/// de nove argumentos.
pub struct DialogueDeps {
    pub memory: ConversationMemory,
    pub availability: AvailabilityService,
    pub store: Arc<dyn ClinicStore>,
    pub chat: Arc<dyn ChatModel>,
    pub gateway: Arc<dyn MessagingGateway>,
    pub media: MediaExtractor,
    pub booking: BookingCoordinator,
    pub tasks: TaskSupervisor,
    pub clock: Arc<dyn Clock>,
}

impl DialogueEngine {
    pub fn new(deps: DialogueDeps) -> Self {
        Self {
            memory: deps.memory,
            availability: deps.availability,
            store: deps.store,
            chat: deps.chat,
            gateway: deps.gateway,
            media: deps.media,
            booking: deps.booking,
            tasks: deps.tasks,
            clock: deps.clock,
        }
    }

    /// Ponto de entrada do despachante: interpreta o payload cru e roda o turno.
    pub async fn process_payload(&self, tenant: &TenantConfig, payload: &Value) {
        let message = match InboundMessage::from_payload(payload) {
            Ok(message) => message,
            Err(e) => {
                tracing::error!("❌ Payload de webhook ilegível para {}: {}", tenant.slug, e);
                return;
            }
        };

        // Eco das mensagens que o próprio bot enviou
        if message.key.from_me {
            tracing::debug!("Mensagem própria ignorada");
            return;
        }

        let Some(phone) = message.phone() else {
            tracing::debug!("Mensagem sem telefone, ignorada");
            return;
        };

        self.handle_message(tenant, &phone, message.sender_name(), &message)
            .await;
    }

    #[instrument(skip_all, fields(tenant = %tenant.slug, phone = %phone))]
    pub async fn handle_message(
        &self,
        tenant: &TenantConfig,
        phone: &str,
        sender_name: &str,
        message: &InboundMessage,
    ) {
        // 1. Conteúdo (texto, transcrição ou descrição da imagem)
        let Some(user_input) = self.resolve_input(tenant, phone, message).await else {
            return;
        };
        if user_input.trim().is_empty() {
            tracing::debug!("Nada para responder");
            return;
        }

        // 2. Sessão
        let mut history = self.memory.history(phone).await;
        let context = self.memory.context(phone).await;

        // 3. Saudação no primeiro turno: menu fixo, sem chamar o modelo
        if history.is_empty() && prompts::is_greeting(&user_input) {
            let welcome = prompts::welcome_menu(&tenant.name);
            self.reply(tenant, phone, &welcome).await;
            self.memory
                .save_history(phone, &[ChatMessage::user(user_input), ChatMessage::assistant(welcome)])
                .await;
            return;
        }

        // 4. Prompt de sistema
        let pet_name = context.get(CONTEXT_PET_NAME).map(String::as_str);
        let system = self.system_instruction(tenant, phone, pet_name).await;

        // 5. Modelo
        let mut messages = Vec::with_capacity(history.len() + 2);
        messages.push(ChatMessage::system(system));
        messages.extend(history.iter().cloned());
        messages.push(ChatMessage::user(user_input.clone()));

        let raw_reply = match self
            .chat
            .complete(&messages, tenant.openai_api_key.as_deref())
            .await
        {
            Ok(reply) => reply,
            Err(e) => {
                tracing::error!("❌ Falha no modelo de chat: {}", e);
                prompts::CHAT_FALLBACK.to_string()
            }
        };

        // 6. Tag de confirmação
        let parsed = parse_reply(&raw_reply);
        if let Some(intent) = parsed.booking {
            let intent = intent.with_sender(sender_name, phone);
            self.memory
                .save_context(phone, CONTEXT_PET_NAME, &intent.pet_name)
                .await;

            let coordinator = self.booking.clone();
            let owned_tenant = tenant.clone();
            let owned_intent = intent.clone();
            let scheduled = self.tasks.spawn_child("booking", async move {
                coordinator.execute(&owned_tenant, &owned_intent).await;
            });

            // Supervisor já parado: o agendamento roda aqui mesmo
            if !scheduled {
                self.booking.execute(tenant, &intent).await;
            }
        }

        // 7. Resposta
        self.reply(tenant, phone, &parsed.text).await;

        // 8. Histórico
        history.push(ChatMessage::user(user_input));
        history.push(ChatMessage::assistant(parsed.text));
        self.memory.save_history(phone, &history).await;
    }

    /// `None` encerra o turno (o aviso de plano já foi enviado).
    async fn resolve_input(
        &self,
        tenant: &TenantConfig,
        phone: &str,
        message: &InboundMessage,
    ) -> Option<String> {
        let openai_key = tenant.openai_api_key.as_deref();
        let gateway_key = tenant.gateway.api_key.as_deref();

        match message.kind() {
            MessageKind::Text(text) => Some(text),

            MessageKind::Audio => {
                if !tenant.plan.allows(Feature::VoiceNotes) {
                    self.reply(tenant, phone, prompts::VOICE_UPSELL).await;
                    return None;
                }

                let audio = self
                    .media
                    .extract_bytes(message, MediaKind::Audio, gateway_key)
                    .await?;
                let filename = format!("{}_{}.ogg", phone, self.clock.now().timestamp());
                let mime = media::mime_type(message, MediaKind::Audio);

                match self.chat.transcribe(audio, &filename, mime, openai_key).await {
                    Ok(text) => Some(text),
                    Err(e) => {
                        tracing::error!("❌ Falha na transcrição: {}", e);
                        Some(String::new())
                    }
                }
            }

            MessageKind::Image => {
                if !tenant.plan.allows(Feature::ImageAnalysis) {
                    self.reply(tenant, phone, prompts::IMAGE_UPSELL).await;
                    return None;
                }

                let image = self
                    .media
                    .extract_base64(message, MediaKind::Image, gateway_key)
                    .await?;

                match self
                    .chat
                    .describe_image(
                        prompts::VISION_PROMPT,
                        &image,
                        media::mime_type(message, MediaKind::Image),
                        openai_key,
                    )
                    .await
                {
                    Ok(description) => Some(description),
                    Err(e) => {
                        tracing::error!("❌ Falha na análise de imagem: {}", e);
                        Some(prompts::VISION_FALLBACK.to_string())
                    }
                }
            }

            MessageKind::Unsupported => {
                tracing::debug!(message_type = ?message.message_type, "Tipo de mensagem não suportado");
                None
            }
        }
    }

    async fn system_instruction(
        &self,
        tenant: &TenantConfig,
        phone: &str,
        pet_name: Option<&str>,
    ) -> String {
        let vaccines = match pet_name {
            Some(pet) => match self.store.vaccination_history(tenant.id, phone, pet).await {
                Ok(list) => prompts::vaccine_digest(pet, &list),
                Err(e) => {
                    tracing::warn!("Falha ao buscar vacinas de {}: {}", pet, e);
                    String::new()
                }
            },
            None => String::new(),
        };

        let services = self.services_text(tenant).await;

        let availability = self
            .availability
            .formatted_availability(tenant.id, DEFAULT_DAYS_AHEAD)
            .await
            .unwrap_or_else(|e| {
                tracing::warn!("Falha ao calcular disponibilidade: {}", e);
                NO_AVAILABILITY.to_string()
            });

        prompts::system_instruction(&PromptContext {
            clinic_name: &tenant.name,
            today: self.clock.local_now().date(),
            availability: &availability,
            services: &services,
            vaccines: &vaccines,
        })
    }

    /// Lista de preços: cache por clínica, refeita do catálogo na falta.
    async fn services_text(&self, tenant: &TenantConfig) -> String {
        if let Some(text) = self.memory.services_text(tenant.id).await {
            return text;
        }

        match self.store.list_services(tenant.id).await {
            Ok(services) => {
                let text = prompts::services_text(&services);
                self.memory.set_services_text(tenant.id, &text).await;
                text
            }
            Err(e) => {
                tracing::warn!("Falha ao carregar catálogo: {}", e);
                prompts::services_text(&[])
            }
        }
    }

    async fn reply(&self, tenant: &TenantConfig, phone: &str, text: &str) {
        if let Err(e) = self.gateway.send_text(&tenant.gateway, phone, text).await {
            tracing::error!("❌ Falha ao enviar resposta pelo WhatsApp: {}", e);
        }
    }
}
