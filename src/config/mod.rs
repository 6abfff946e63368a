//! Optional `vultitool.toml` configuration.

pub mod settings;

pub use settings::Settings;
