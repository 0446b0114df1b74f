// src/models/clinic.rs

use chrono::{DateTime, NaiveDateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

// --- ENUMS ---

// Mapeia o CREATE TYPE appointment_status do banco
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "appointment_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum AppointmentStatus {
    Confirmed,
    Attended,
    Waiting,
    Cancelled,
}

// --- DONO E PACIENTE ---

// Único por clínica + telefone
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Owner {
    pub id: Uuid,
    pub org_id: Uuid,
    pub phone_number: String,
    pub name: Option<String>,
    pub created_at: DateTime<Utc>,
}

// Único por clínica + dono + nome (sem diferenciar maiúsculas)
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Patient {
    pub id: Uuid,
    pub org_id: Uuid,
    pub owner_id: Uuid,
    pub name: String,
    pub species: String,
}

// --- AGENDA ---

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Appointment {
    pub id: Uuid,
    pub org_id: Uuid,
    pub owner_id: Uuid,
    pub pet_name: String,
    pub reason: Option<String>,
    // Horário local da clínica (UTC-3), sem fuso
    pub date: NaiveDateTime,
    pub status: AppointmentStatus,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewAppointment {
    pub org_id: Uuid,
    pub owner_id: Uuid,
    pub pet_name: String,
    pub reason: String,
    pub date: NaiveDateTime,
}

// --- CATÁLOGO E VACINAS ---

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct ServiceItem {
    pub id: Uuid,
    pub org_id: Uuid,
    pub name: String,
    pub price: Decimal,
    pub description: Option<String>,
    pub category: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Vaccination {
    pub id: Uuid,
    pub org_id: Uuid,
    pub patient_id: Uuid,
    pub vaccine_name: String,
    pub date_administered: DateTime<Utc>,
    pub next_dose_date: Option<DateTime<Utc>>,
}
