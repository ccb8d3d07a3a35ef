use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Config directory not found")]
    ConfigDirNotFound,

    #[error(
        "Manifest not found. Looked in:\n\
        - current directory: natgate.local.yaml, .natgate.local.yaml, natgate.yaml, .natgate.yaml\n\
        - ./.natgate/ directory\n\
        - ~/.config/natgate/natgate.yaml\n\
        Set NATGATE_CONFIG_PATH to point at a manifest directly"
    )]
    ManifestNotFound,

    #[error("Failed to parse {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("Invalid manifest: {0}")]
    Invalid(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, ConfigError>;
