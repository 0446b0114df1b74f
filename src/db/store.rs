// src/db/store.rs

use async_trait::async_trait;
use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use sqlx::PgPool;
use uuid::Uuid;

use crate::{
    common::error::AppError,
    db::{ClinicRepository, OrganizationRepository},
    models::{
        clinic::{Appointment, NewAppointment, ServiceItem, Vaccination},
        tenancy::{Organization, PlanTier},
    },
};

/// Dados de um agendamento já validado, prontos para persistir.
#[derive(Debug, Clone)]
pub struct BookingRecord {
    pub org_id: Uuid,
    pub phone: String,
    pub owner_name: Option<String>,
    pub pet_name: String,
    pub reason: String,
    pub date: NaiveDateTime,
}

/// O armazenamento canônico visto pelo núcleo de conversa.
///
/// Cada operação é uma unidade lógica com sua própria transação curta.
#[async_trait]
pub trait ClinicStore: Send + Sync {
    async fn find_organization(&self, slug: &str) -> Result<Option<Organization>, AppError>;

    async fn update_plan(&self, slug: &str, plan: PlanTier)
        -> Result<Option<Organization>, AppError>;

    async fn set_active(&self, slug: &str, active: bool)
        -> Result<Option<Organization>, AppError>;

    /// Horários de início dos turnos `confirmed` do dia.
    async fn confirmed_times(&self, org_id: Uuid, day: NaiveDate)
        -> Result<Vec<NaiveTime>, AppError>;

    async fn list_services(&self, org_id: Uuid) -> Result<Vec<ServiceItem>, AppError>;

    async fn vaccination_history(
        &self,
        org_id: Uuid,
        phone: &str,
        pet_name: &str,
    ) -> Result<Vec<Vaccination>, AppError>;

    /// Busca-ou-cria dono e paciente e insere o turno, tudo ou nada.
    async fn record_booking(&self, booking: &BookingRecord) -> Result<Appointment, AppError>;
}

#[derive(Clone)]
pub struct PgClinicStore {
    pool: PgPool,
    org_repo: OrganizationRepository,
    clinic_repo: ClinicRepository,
}

impl PgClinicStore {
    pub fn new(pool: PgPool) -> Self {
        Self {
            org_repo: OrganizationRepository::new(pool.clone()),
            clinic_repo: ClinicRepository::new(pool.clone()),
            pool,
        }
    }
}

#[async_trait]
impl ClinicStore for PgClinicStore {
    async fn find_organization(&self, slug: &str) -> Result<Option<Organization>, AppError> {
        self.org_repo.find_by_slug(slug).await
    }

    async fn update_plan(
        &self,
        slug: &str,
        plan: PlanTier,
    ) -> Result<Option<Organization>, AppError> {
        self.org_repo.update_plan(&self.pool, slug, plan).await
    }

    async fn set_active(&self, slug: &str, active: bool) -> Result<Option<Organization>, AppError> {
        self.org_repo.set_active(&self.pool, slug, active).await
    }

    async fn confirmed_times(
        &self,
        org_id: Uuid,
        day: NaiveDate,
    ) -> Result<Vec<NaiveTime>, AppError> {
        let from = day.and_time(NaiveTime::MIN);
        let to = from + chrono::Duration::days(1);

        let times = self
            .clinic_repo
            .confirmed_times_between(org_id, from, to)
            .await?;

        Ok(times.into_iter().map(|dt| dt.time()).collect())
    }

    async fn list_services(&self, org_id: Uuid) -> Result<Vec<ServiceItem>, AppError> {
        self.clinic_repo.list_services(org_id).await
    }

    async fn vaccination_history(
        &self,
        org_id: Uuid,
        phone: &str,
        pet_name: &str,
    ) -> Result<Vec<Vaccination>, AppError> {
        let Some(owner) = self
            .clinic_repo
            .find_owner_by_phone(&self.pool, org_id, phone)
            .await?
        else {
            return Ok(Vec::new());
        };

        let Some(patient) = self
            .clinic_repo
            .find_patient(&self.pool, org_id, owner.id, pet_name)
            .await?
        else {
            return Ok(Vec::new());
        };

        self.clinic_repo
            .list_vaccinations(&self.pool, org_id, patient.id)
            .await
    }

    async fn record_booking(&self, booking: &BookingRecord) -> Result<Appointment, AppError> {
        // 1. Inicia a transação
        let mut tx = self.pool.begin().await?;

        // 2. Dono (telefone é a identidade)
        let owner = self
            .clinic_repo
            .upsert_owner(&mut *tx, booking.org_id, &booking.phone, booking.owner_name.as_deref())
            .await?;

        // 3. Paciente (nome sem diferenciar maiúsculas)
        let patient = self
            .clinic_repo
            .upsert_patient(&mut *tx, booking.org_id, owner.id, &booking.pet_name)
            .await?;

        // 4. O turno. Violação do índice de horário desfaz tudo acima.
        let appointment = self
            .clinic_repo
            .insert_appointment(
                &mut *tx,
                &NewAppointment {
                    org_id: booking.org_id,
                    owner_id: owner.id,
                    pet_name: patient.name,
                    reason: booking.reason.clone(),
                    date: booking.date,
                },
            )
            .await?;

        // 5. Commit
        tx.commit().await?;

        Ok(appointment)
    }
}
