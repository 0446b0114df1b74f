pub mod tenancy_repo;
pub use tenancy_repo::OrganizationRepository;
pub mod clinic_repo;
pub use clinic_repo::ClinicRepository;
pub mod store;
pub use store::{BookingRecord, ClinicStore, PgClinicStore};
