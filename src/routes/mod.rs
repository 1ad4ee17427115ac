pub mod activity;
pub mod contacts;
pub mod events;
pub mod health;
pub mod messages;
pub mod settings;
pub mod templates;
