// Configuration management module
// TOML settings plus the interactive editor used by `code-rag config`

pub mod interactive;
pub mod settings;

pub use interactive::{run_interactive_config, show_config};
pub use settings::{Config, ConfigError, IndexConfig, OllamaConfig, ScanConfig};
