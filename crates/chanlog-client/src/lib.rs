pub mod discord;

pub use discord::{DEFAULT_API_BASE, DiscordClient};
