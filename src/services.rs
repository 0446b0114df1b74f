pub mod admin;
pub mod availability;
pub mod booking;
pub mod booking_tag;
pub mod dialogue;
pub mod dispatcher;
pub mod media;
pub mod memory;
pub mod org_config;
pub mod prompts;
