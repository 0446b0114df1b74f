// src/db/clinic_repo.rs

use chrono::NaiveDateTime;
use sqlx::{Executor, PgPool, Postgres};
use uuid::Uuid;

use crate::{
    common::error::{map_booking_conflict, AppError},
    models::clinic::{Appointment, AppointmentStatus, NewAppointment, Owner, Patient, ServiceItem, Vaccination},
};

#[derive(Clone)]
pub struct ClinicRepository {
    pool: PgPool,
}

impl ClinicRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    // =========================================================================
    //  DONOS E PACIENTES
    // =========================================================================

    pub async fn find_owner_by_phone<'e, E>(
        &self,
        executor: E,
        org_id: Uuid,
        phone: &str,
    ) -> Result<Option<Owner>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let owner = sqlx::query_as::<_, Owner>(
            r#"
            SELECT id, org_id, phone_number, name, created_at
            FROM owners
            WHERE org_id = $1 AND phone_number = $2
            "#,
        )
            .bind(org_id)
            .bind(phone)
            .fetch_optional(executor)
            .await?;

        Ok(owner)
    }

    /// Cria o dono ou devolve o existente. O índice único (org, telefone)
    /// resolve a corrida entre dois webhooks duplicados.
    pub async fn upsert_owner<'e, E>(
        &self,
        executor: E,
        org_id: Uuid,
        phone: &str,
        name: Option<&str>,
    ) -> Result<Owner, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let owner = sqlx::query_as::<_, Owner>(
            r#"
            INSERT INTO owners (org_id, phone_number, name)
            VALUES ($1, $2, $3)
            ON CONFLICT (org_id, phone_number)
            DO UPDATE SET name = COALESCE(owners.name, EXCLUDED.name)
            RETURNING id, org_id, phone_number, name, created_at
            "#,
        )
            .bind(org_id)
            .bind(phone)
            .bind(name)
            .fetch_one(executor)
            .await?;

        Ok(owner)
    }

    pub async fn find_patient<'e, E>(
        &self,
        executor: E,
        org_id: Uuid,
        owner_id: Uuid,
        pet_name: &str,
    ) -> Result<Option<Patient>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let patient = sqlx::query_as::<_, Patient>(
            r#"
            SELECT id, org_id, owner_id, name, species
            FROM patients
            WHERE org_id = $1 AND owner_id = $2 AND lower(name) = lower($3)
            "#,
        )
            .bind(org_id)
            .bind(owner_id)
            .bind(pet_name)
            .fetch_optional(executor)
            .await?;

        Ok(patient)
    }

    /// Mesmo padrão do dono: nome comparado sem maiúsculas.
    pub async fn upsert_patient<'e, E>(
        &self,
        executor: E,
        org_id: Uuid,
        owner_id: Uuid,
        pet_name: &str,
    ) -> Result<Patient, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let patient = sqlx::query_as::<_, Patient>(
            r#"
            INSERT INTO patients (org_id, owner_id, name)
            VALUES ($1, $2, $3)
            ON CONFLICT (org_id, owner_id, lower(name))
            DO UPDATE SET name = patients.name
            RETURNING id, org_id, owner_id, name, species
            "#,
        )
            .bind(org_id)
            .bind(owner_id)
            .bind(pet_name)
            .fetch_one(executor)
            .await?;

        Ok(patient)
    }

    // =========================================================================
    //  AGENDA
    // =========================================================================

    pub async fn insert_appointment<'e, E>(
        &self,
        executor: E,
        input: &NewAppointment,
    ) -> Result<Appointment, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query_as::<_, Appointment>(
            r#"
            INSERT INTO appointments (org_id, owner_id, pet_name, reason, date, status)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING id, org_id, owner_id, pet_name, reason, date, status, created_at
            "#,
        )
            .bind(input.org_id)
            .bind(input.owner_id)
            .bind(&input.pet_name)
            .bind(&input.reason)
            .bind(input.date)
            .bind(AppointmentStatus::Confirmed)
            .fetch_one(executor)
            .await
            .map_err(map_booking_conflict)
    }

    /// Horários dos turnos confirmados entre `from` (inclusive) e `to` (exclusive).
    pub async fn confirmed_times_between(
        &self,
        org_id: Uuid,
        from: NaiveDateTime,
        to: NaiveDateTime,
    ) -> Result<Vec<NaiveDateTime>, AppError> {
        let rows: Vec<(NaiveDateTime,)> = sqlx::query_as(
            r#"
            SELECT date FROM appointments
            WHERE org_id = $1
              AND date >= $2 AND date < $3
              AND status = 'confirmed'
            ORDER BY date
            "#,
        )
            .bind(org_id)
            .bind(from)
            .bind(to)
            .fetch_all(&self.pool)
            .await?;

        Ok(rows.into_iter().map(|(date,)| date).collect())
    }

    // =========================================================================
    //  CATÁLOGO E VACINAS
    // =========================================================================

    pub async fn list_services(&self, org_id: Uuid) -> Result<Vec<ServiceItem>, AppError> {
        let services = sqlx::query_as::<_, ServiceItem>(
            r#"
            SELECT id, org_id, name, price, description, category
            FROM services
            WHERE org_id = $1
            ORDER BY category, name
            "#,
        )
            .bind(org_id)
            .fetch_all(&self.pool)
            .await?;

        Ok(services)
    }

    pub async fn list_vaccinations<'e, E>(
        &self,
        executor: E,
        org_id: Uuid,
        patient_id: Uuid,
    ) -> Result<Vec<Vaccination>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let vaccinations = sqlx::query_as::<_, Vaccination>(
            r#"
            SELECT id, org_id, patient_id, vaccine_name, date_administered, next_dose_date
            FROM vaccinations
            WHERE org_id = $1 AND patient_id = $2
            ORDER BY date_administered DESC
            "#,
        )
            .bind(org_id)
            .bind(patient_id)
            .fetch_all(executor)
            .await?;

        Ok(vaccinations)
    }
}
