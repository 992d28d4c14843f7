pub mod core;
pub mod geocoding;
pub mod heat_wave;
pub mod inspections;
pub mod main_module;
pub mod projects;
pub mod security;
pub mod tbm;

#[cfg(feature = "ai")]
pub mod ai;
#[cfg(feature = "ai")]
pub mod llm;
#[cfg(feature = "export")]
pub mod reports;
#[cfg(feature = "telegram")]
pub mod telegram;
#[cfg(feature = "weather")]
pub mod weather;
