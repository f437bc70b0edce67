// Persisted application settings

pub mod settings;

pub use settings::{AppSettings, Surface};
