// src/services/booking.rs

use std::sync::{Arc, LazyLock};

use chrono::{Datelike, Duration, NaiveDate, NaiveDateTime};
use regex::Regex;
use tracing::instrument;

use crate::{
    clients::{CalendarEvent, CalendarProvider, MessagingGateway},
    common::clock::Clock,
    db::{BookingRecord, ClinicStore},
    models::{conversation::BookingIntent, tenancy::TenantConfig},
    services::availability::SLOT_MINUTES,
};

static LOOSE_DATE_TIME: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(\d{4}-\d{2}-\d{2}|\d{2}-\d{2})[ T](\d{2}:\d{2})")
        .expect("regex de data do agendamento é válida")
});

/// Lê a data livre que o modelo escreveu.
///
/// Aceita `YYYY-MM-DD HH:MM` ou `MM-DD HH:MM` (ano corrente) em qualquer
/// parte do texto, depois ISO puro. Se nada servir, usa `now`.
pub fn parse_booking_datetime(raw: &str, now: NaiveDateTime) -> NaiveDateTime {
    let parsed = match LOOSE_DATE_TIME.captures(raw) {
        Some(caps) => {
            let date = &caps[1];
            let date = if date.len() == 5 {
                format!("{}-{}", now.year(), date)
            } else {
                date.to_string()
            };
            NaiveDateTime::parse_from_str(&format!("{} {}", date, &caps[2]), "%Y-%m-%d %H:%M").ok()
        }
        None => parse_iso(raw),
    };

    parsed.unwrap_or_else(|| {
        tracing::warn!("Data '{}' ilegível, usando o horário atual", raw);
        now
    })
}

fn parse_iso(raw: &str) -> Option<NaiveDateTime> {
    let iso = raw.trim().replace(' ', "T");
    ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%dT%H:%M"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(&iso, fmt).ok())
        .or_else(|| {
            NaiveDate::parse_from_str(&iso, "%Y-%m-%d")
                .ok()
                .and_then(|d| d.and_hms_opt(0, 0, 0))
        })
}

pub fn staff_notification(clinic_name: &str, intent: &BookingIntent) -> String {
    format!(
        "🚨 *NUEVO TURNO CONFIRMADO* 🚨\n\
         🏥 *Clínica:* {}\n\
         🐶 *Paciente:* {}\n\
         👤 *Dueño:* {}\n\
         📅 *Fecha:* {}\n",
        clinic_name,
        intent.pet_name,
        owner_label(intent),
        intent.date_time
    )
}

fn owner_label(intent: &BookingIntent) -> &str {
    intent.owner_name.as_deref().unwrap_or("Usuario")
}

fn calendar_event(intent: &BookingIntent, start: NaiveDateTime) -> CalendarEvent {
    let owner = owner_label(intent);
    CalendarEvent {
        summary: format!("Cita: {} ({})", intent.pet_name, owner),
        description: format!("Cita médica para la mascota {}. Dueño: {}", intent.pet_name, owner),
        start,
        end: start + Duration::minutes(SLOT_MINUTES),
    }
}

/// O que aconteceu com cada perna do agendamento.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BookingOutcome {
    pub persisted: bool,
    pub calendar: bool,
    pub notified: bool,
}

/// Executa as três pernas do agendamento em paralelo: banco, calendário e
/// aviso para a equipe. Cada perna trata e loga o próprio erro; nenhuma
/// desfaz ou bloqueia as outras.
#[derive(Clone)]
pub struct BookingCoordinator {
    store: Arc<dyn ClinicStore>,
    calendar: Arc<dyn CalendarProvider>,
    gateway: Arc<dyn MessagingGateway>,
    clock: Arc<dyn Clock>,
    staff_phone: Option<String>,
}

impl BookingCoordinator {
    pub fn new(
        store: Arc<dyn ClinicStore>,
        calendar: Arc<dyn CalendarProvider>,
        gateway: Arc<dyn MessagingGateway>,
        clock: Arc<dyn Clock>,
        staff_phone: Option<String>,
    ) -> Self {
        Self { store, calendar, gateway, clock, staff_phone }
    }

    #[instrument(skip_all, fields(tenant = %tenant.slug, phone = %intent.phone))]
    pub async fn execute(&self, tenant: &TenantConfig, intent: &BookingIntent) -> BookingOutcome {
        let start = parse_booking_datetime(&intent.date_time, self.clock.local_now());

        let (persisted, calendar, notified) = tokio::join!(
            self.persist(tenant, intent, start),
            self.add_to_calendar(tenant, intent, start),
            self.notify_staff(tenant, intent),
        );

        let outcome = BookingOutcome { persisted, calendar, notified };
        tracing::info!(?outcome, "📅 Agendamento processado para {}", intent.pet_name);
        outcome
    }

    async fn persist(&self, tenant: &TenantConfig, intent: &BookingIntent, start: NaiveDateTime) -> bool {
        if intent.phone.is_empty() {
            tracing::warn!("Agendamento sem telefone, nada a persistir");
            return false;
        }

        let record = BookingRecord {
            org_id: tenant.id,
            phone: intent.phone.clone(),
            owner_name: intent.owner_name.clone(),
            pet_name: intent.pet_name.clone(),
            reason: intent.reason.clone(),
            date: start,
        };

        match self.store.record_booking(&record).await {
            Ok(appointment) => {
                tracing::info!("✅ Turno {} salvo para {}", appointment.id, appointment.date);
                true
            }
            Err(e) => {
                tracing::error!("❌ Falha ao salvar turno: {}", e);
                false
            }
        }
    }

    async fn add_to_calendar(
        &self,
        tenant: &TenantConfig,
        intent: &BookingIntent,
        start: NaiveDateTime,
    ) -> bool {
        let Some(calendar_id) = tenant.calendar_id.as_deref() else {
            tracing::debug!("Clínica sem calendário configurado");
            return false;
        };

        match self
            .calendar
            .insert_event(calendar_id, &calendar_event(intent, start))
            .await
        {
            Ok(()) => true,
            Err(e) => {
                tracing::error!("❌ Falha ao criar evento no calendário: {}", e);
                false
            }
        }
    }

    async fn notify_staff(&self, tenant: &TenantConfig, intent: &BookingIntent) -> bool {
        let Some(phone) = self.staff_phone.as_deref() else {
            return false;
        };

        let message = staff_notification(&tenant.name, intent);
        match self.gateway.send_text(&tenant.gateway, phone, &message).await {
            Ok(()) => true,
            Err(e) => {
                tracing::error!("❌ Falha ao avisar a clínica: {}", e);
                false
            }
        }
    }
}
