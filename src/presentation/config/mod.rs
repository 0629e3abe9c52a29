mod environment;
mod settings;

pub use environment::{ENVIRONMENT_VAR, Environment};
pub use settings::{
    DatabaseSettings, LoggingSettings, MessagingSettings, ServerSettings, Settings,
};
