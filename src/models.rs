pub mod clinic;
pub mod conversation;
pub mod tenancy;
pub mod webhook;
