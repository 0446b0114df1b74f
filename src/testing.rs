// src/testing.rs
//
// Dublês em memória para os traits de borda. Só existem em `cargo test`.

use std::{
    collections::HashMap,
    sync::{
        atomic::{AtomicUsize, Ordering},
        Mutex,
    },
    time::Duration,
};

use async_trait::async_trait;
use chrono::{NaiveDate, NaiveDateTime, NaiveTime, Utc};
use uuid::Uuid;

use crate::{
    clients::{CacheBackend, CalendarEvent, CalendarProvider, ChatModel, MessagingGateway},
    common::error::AppError,
    db::{BookingRecord, ClinicStore},
    models::{
        clinic::{Appointment, AppointmentStatus, Owner, Patient, ServiceItem, Vaccination},
        conversation::{BookingIntent, ChatMessage},
        tenancy::{
            CredentialFallbacks, GatewayCredentials, Organization, PlanTier, TenantConfig,
        },
    },
};

// =============================================================================
//  FÁBRICAS
// =============================================================================

pub fn organization(slug: &str, plan: Option<&str>) -> Organization {
    Organization {
        id: Uuid::new_v4(),
        name: format!("Veterinaria {}", slug),
        slug: slug.to_string(),
        is_active: true,
        evolution_api_url: Some("https://evo.test".into()),
        evolution_api_key: Some("evo-key".into()),
        evolution_instance: Some("DogBot".into()),
        openai_api_key: Some("sk-test".into()),
        webhook_secret: None,
        google_calendar_id: None,
        plan_type: plan.map(str::to_string),
        created_at: Utc::now(),
    }
}

pub fn tenant_config(slug: &str) -> TenantConfig {
    let mut config = TenantConfig::resolve(organization(slug, None), &CredentialFallbacks::default());
    config.plan = PlanTier::Pro;
    config
}

pub fn booking_intent(pet_name: &str, date_time: &str) -> BookingIntent {
    BookingIntent {
        pet_name: pet_name.to_string(),
        reason: "Consulta".to_string(),
        date_time: date_time.to_string(),
        owner_name: None,
        phone: String::new(),
    }
    .with_sender("Juan", "5491100000000")
}

// =============================================================================
//  BANCO
// =============================================================================

struct StoredVaccination {
    phone: String,
    pet_name: String,
    record: Vaccination,
}

#[derive(Default)]
struct StoreState {
    organizations: Vec<Organization>,
    owners: Vec<Owner>,
    patients: Vec<Patient>,
    appointments: Vec<Appointment>,
    services: Vec<ServiceItem>,
    vaccinations: Vec<StoredVaccination>,
}

/// Banco em memória com as mesmas regras de unicidade das migrações.
#[derive(Default)]
pub struct FakeStore {
    state: Mutex<StoreState>,
}

impl FakeStore {
    pub fn add_organization(&self, org: Organization) {
        self.state.lock().unwrap().organizations.push(org);
    }

    pub fn set_plan(&self, slug: &str, plan: &str) {
        let mut state = self.state.lock().unwrap();
        if let Some(org) = state.organizations.iter_mut().find(|o| o.slug == slug) {
            org.plan_type = Some(plan.to_string());
        }
    }

    /// Turno confirmado avulso, só para ocupar um horário.
    pub fn add_confirmed(&self, org_id: Uuid, date: NaiveDateTime) {
        self.state.lock().unwrap().appointments.push(Appointment {
            id: Uuid::new_v4(),
            org_id,
            owner_id: Uuid::new_v4(),
            pet_name: "Ocupado".into(),
            reason: None,
            date,
            status: AppointmentStatus::Confirmed,
            created_at: Utc::now(),
        });
    }

    pub fn add_vaccination(&self, org_id: Uuid, phone: &str, pet_name: &str, vaccine: &str) {
        self.state.lock().unwrap().vaccinations.push(StoredVaccination {
            phone: phone.to_string(),
            pet_name: pet_name.to_lowercase(),
            record: Vaccination {
                id: Uuid::new_v4(),
                org_id,
                patient_id: Uuid::new_v4(),
                vaccine_name: vaccine.to_string(),
                date_administered: Utc::now(),
                next_dose_date: None,
            },
        });
    }

    pub fn appointments(&self) -> Vec<Appointment> {
        self.state.lock().unwrap().appointments.clone()
    }

    pub fn owner_count(&self) -> usize {
        self.state.lock().unwrap().owners.len()
    }

    pub fn patient_count(&self) -> usize {
        self.state.lock().unwrap().patients.len()
    }
}

#[async_trait]
impl ClinicStore for FakeStore {
    async fn find_organization(&self, slug: &str) -> Result<Option<Organization>, AppError> {
        let state = self.state.lock().unwrap();
        Ok(state.organizations.iter().find(|o| o.slug == slug).cloned())
    }

    async fn update_plan(&self, slug: &str, plan: PlanTier) -> Result<Option<Organization>, AppError> {
        let mut state = self.state.lock().unwrap();
        Ok(state.organizations.iter_mut().find(|o| o.slug == slug).map(|org| {
            org.plan_type = Some(plan.as_str().to_string());
            org.clone()
        }))
    }

    async fn set_active(&self, slug: &str, active: bool) -> Result<Option<Organization>, AppError> {
        let mut state = self.state.lock().unwrap();
        Ok(state.organizations.iter_mut().find(|o| o.slug == slug).map(|org| {
            org.is_active = active;
            org.clone()
        }))
    }

    async fn confirmed_times(&self, org_id: Uuid, day: NaiveDate) -> Result<Vec<NaiveTime>, AppError> {
        let state = self.state.lock().unwrap();
        Ok(state
            .appointments
            .iter()
            .filter(|a| a.org_id == org_id && a.date.date() == day)
            .filter(|a| a.status == AppointmentStatus::Confirmed)
            .map(|a| a.date.time())
            .collect())
    }

    async fn list_services(&self, org_id: Uuid) -> Result<Vec<ServiceItem>, AppError> {
        let state = self.state.lock().unwrap();
        Ok(state.services.iter().filter(|s| s.org_id == org_id).cloned().collect())
    }

    async fn vaccination_history(
        &self,
        org_id: Uuid,
        phone: &str,
        pet_name: &str,
    ) -> Result<Vec<Vaccination>, AppError> {
        let state = self.state.lock().unwrap();
        let pet_name = pet_name.to_lowercase();
        Ok(state
            .vaccinations
            .iter()
            .filter(|v| v.record.org_id == org_id && v.phone == phone && v.pet_name == pet_name)
            .map(|v| v.record.clone())
            .collect())
    }

    async fn record_booking(&self, booking: &BookingRecord) -> Result<Appointment, AppError> {
        let mut state = self.state.lock().unwrap();

        // Mesmo efeito do índice parcial: nada é gravado se o horário já existe
        let taken = state.appointments.iter().any(|a| {
            a.org_id == booking.org_id
                && a.date == booking.date
                && a.status == AppointmentStatus::Confirmed
        });
        if taken {
            return Err(AppError::SlotAlreadyBooked);
        }

        let existing_owner = state
            .owners
            .iter()
            .find(|o| o.org_id == booking.org_id && o.phone_number == booking.phone)
            .map(|o| o.id);
        let owner_id = match existing_owner {
            Some(id) => id,
            None => {
                let owner = Owner {
                    id: Uuid::new_v4(),
                    org_id: booking.org_id,
                    phone_number: booking.phone.clone(),
                    name: booking.owner_name.clone(),
                    created_at: Utc::now(),
                };
                let id = owner.id;
                state.owners.push(owner);
                id
            }
        };

        let pet_lower = booking.pet_name.to_lowercase();
        let existing_patient = state
            .patients
            .iter()
            .find(|p| p.org_id == booking.org_id && p.owner_id == owner_id && p.name.to_lowercase() == pet_lower)
            .map(|p| p.name.clone());
        let pet_name = match existing_patient {
            Some(name) => name,
            None => {
                state.patients.push(Patient {
                    id: Uuid::new_v4(),
                    org_id: booking.org_id,
                    owner_id,
                    name: booking.pet_name.clone(),
                    species: "Perro/Gato".into(),
                });
                booking.pet_name.clone()
            }
        };

        let appointment = Appointment {
            id: Uuid::new_v4(),
            org_id: booking.org_id,
            owner_id,
            pet_name,
            reason: Some(booking.reason.clone()),
            date: booking.date,
            status: AppointmentStatus::Confirmed,
            created_at: Utc::now(),
        };
        state.appointments.push(appointment.clone());
        Ok(appointment)
    }
}

// =============================================================================
//  PROVEDORES
// =============================================================================

fn provider_down(provider: &'static str) -> AppError {
    AppError::ProviderError { provider, status: 503, body: "indisponível".into() }
}

pub struct FakeChat {
    reply: Option<String>,
    transcript: String,
    description: String,
    media_down: bool,
    completions: AtomicUsize,
    transcriptions: AtomicUsize,
    descriptions: AtomicUsize,
    last_request: Mutex<Vec<ChatMessage>>,
    last_mime: Mutex<Option<String>>,
}

impl FakeChat {
    pub fn replying(reply: &str) -> Self {
        Self {
            reply: Some(reply.to_string()),
            transcript: String::new(),
            description: String::new(),
            media_down: false,
            completions: AtomicUsize::new(0),
            transcriptions: AtomicUsize::new(0),
            descriptions: AtomicUsize::new(0),
            last_request: Mutex::new(Vec::new()),
            last_mime: Mutex::new(None),
        }
    }

    pub fn failing() -> Self {
        Self { reply: None, ..Self::replying("") }
    }

    pub fn with_transcript(mut self, transcript: &str) -> Self {
        self.transcript = transcript.to_string();
        self
    }

    pub fn with_description(mut self, description: &str) -> Self {
        self.description = description.to_string();
        self
    }

    /// Chat responde, mas transcrição e visão falham.
    pub fn with_media_down(mut self) -> Self {
        self.media_down = true;
        self
    }

    pub fn descriptions(&self) -> usize {
        self.descriptions.load(Ordering::SeqCst)
    }

    pub fn last_mime(&self) -> Option<String> {
        self.last_mime.lock().unwrap().clone()
    }

    pub fn completions(&self) -> usize {
        self.completions.load(Ordering::SeqCst)
    }

    pub fn transcriptions(&self) -> usize {
        self.transcriptions.load(Ordering::SeqCst)
    }

    pub fn last_request(&self) -> Vec<ChatMessage> {
        self.last_request.lock().unwrap().clone()
    }
}

#[async_trait]
impl ChatModel for FakeChat {
    async fn complete(&self, messages: &[ChatMessage], _api_key: Option<&str>) -> Result<String, AppError> {
        self.completions.fetch_add(1, Ordering::SeqCst);
        *self.last_request.lock().unwrap() = messages.to_vec();
        self.reply.clone().ok_or_else(|| provider_down("openai"))
    }

    async fn describe_image(&self, _prompt: &str, _image: &str, mime: &str, _api_key: Option<&str>) -> Result<String, AppError> {
        self.descriptions.fetch_add(1, Ordering::SeqCst);
        *self.last_mime.lock().unwrap() = Some(mime.to_string());
        match self.reply {
            Some(_) if !self.media_down => Ok(self.description.clone()),
            _ => Err(provider_down("openai-vision")),
        }
    }

    async fn transcribe(&self, _audio: Vec<u8>, _filename: &str, mime: &str, _api_key: Option<&str>) -> Result<String, AppError> {
        self.transcriptions.fetch_add(1, Ordering::SeqCst);
        *self.last_mime.lock().unwrap() = Some(mime.to_string());
        match self.reply {
            Some(_) if !self.media_down => Ok(self.transcript.clone()),
            _ => Err(provider_down("whisper")),
        }
    }
}

#[derive(Default)]
pub struct FakeGateway {
    sent: Mutex<Vec<(String, String)>>,
}

impl FakeGateway {
    /// Mensagens enviadas, como (telefone, texto).
    pub fn sent(&self) -> Vec<(String, String)> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl MessagingGateway for FakeGateway {
    async fn send_text(&self, _creds: &GatewayCredentials, phone: &str, text: &str) -> Result<(), AppError> {
        self.sent.lock().unwrap().push((phone.to_string(), text.to_string()));
        Ok(())
    }
}

#[derive(Default)]
pub struct FakeCalendar {
    fail: bool,
    events: Mutex<Vec<(String, CalendarEvent)>>,
}

impl FakeCalendar {
    pub fn failing() -> Self {
        Self { fail: true, ..Self::default() }
    }

    pub fn events(&self) -> Vec<(String, CalendarEvent)> {
        self.events.lock().unwrap().clone()
    }
}

#[async_trait]
impl CalendarProvider for FakeCalendar {
    async fn insert_event(&self, calendar_id: &str, event: &CalendarEvent) -> Result<(), AppError> {
        if self.fail {
            return Err(provider_down("google-calendar"));
        }
        self.events.lock().unwrap().push((calendar_id.to_string(), event.clone()));
        Ok(())
    }
}

// =============================================================================
//  CACHE FORA DO AR
// =============================================================================

pub struct FailingCache;

fn cache_down() -> AppError {
    AppError::CacheError(redis::RedisError::from((redis::ErrorKind::IoError, "conexão recusada")))
}

#[async_trait]
impl CacheBackend for FailingCache {
    async fn get(&self, _key: &str) -> Result<Option<String>, AppError> {
        Err(cache_down())
    }
    async fn set(&self, _key: &str, _value: &str, _ttl: Duration) -> Result<(), AppError> {
        Err(cache_down())
    }
    async fn delete(&self, _key: &str) -> Result<(), AppError> {
        Err(cache_down())
    }
    async fn hset(&self, _key: &str, _field: &str, _value: &str) -> Result<(), AppError> {
        Err(cache_down())
    }
    async fn hgetall(&self, _key: &str) -> Result<HashMap<String, String>, AppError> {
        Err(cache_down())
    }
    async fn expire(&self, _key: &str, _ttl: Duration) -> Result<(), AppError> {
        Err(cache_down())
    }
}
