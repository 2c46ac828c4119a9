use thiserror::Error;

#[derive(Debug, Error)]
pub enum DorguError {
    #[error("application name is required: set app.name in .dorgu.yaml or pass --name")]
    MissingName,

    #[error("unknown config key: {0}")]
    UnknownConfigKey(String),

    #[error("invalid value '{value}' for {key}: {reason}")]
    InvalidConfigValue {
        key: String,
        value: String,
        reason: String,
    },

    #[error("unsupported CI provider '{0}': only github-actions is supported")]
    UnsupportedCiProvider(String),

    #[error("persona writer failed: {0}")]
    PersonaWriter(String),

    #[error("home directory not found: set HOME or XDG_CONFIG_HOME")]
    HomeNotFound,

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Yaml(#[from] serde_yaml::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, DorguError>;
