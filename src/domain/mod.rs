//! Cross-cutting domain types shared by the services layer and the CLI.

pub mod events;

pub use events::NotificationEvent;
