pub mod cache;
pub mod calendar;
pub mod chat;
pub mod messaging;

pub use cache::{CacheBackend, InMemoryCache, RedisCache};
pub use calendar::{CalendarEvent, CalendarProvider, GoogleCalendarClient};
pub use chat::{ChatModel, OpenAiClient};
pub use messaging::{EvolutionClient, MessagingGateway};
