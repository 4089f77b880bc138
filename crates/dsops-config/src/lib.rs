mod loader;
mod raw;
mod uri;
pub mod error;

pub use error::ConfigError;
pub use loader::Config;
pub use uri::parse_reference_uri;
