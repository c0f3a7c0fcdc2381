pub mod cli;
pub mod compat_source;
pub mod load_config;
pub mod remote_settings;
pub mod schema_fetch;

pub use cli::{run, Cli, Commands};
