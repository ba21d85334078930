use std::fmt;
use std::path::{Path, PathBuf};

pub const HOST_VAR: &str = "ATLASSIAN_HOST";
pub const EMAIL_VAR: &str = "ATLASSIAN_EMAIL";
pub const TOKEN_VAR: &str = "ATLASSIAN_TOKEN";
pub const READ_ONLY_VAR: &str = "READ_ONLY";

/// Configuration errors raised at startup
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{} are required, please set them in the MCP config or an env file", .0.join(", "))]
    MissingCredentials(Vec<&'static str>),

    #[error("failed to load env file {}: {source}", path.display())]
    EnvFile {
        path: PathBuf,
        #[source]
        source: dotenv::Error,
    },
}

/// Atlassian credentials, read once at startup and never refreshed
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub host: String,
    pub email: String,
    pub token: String,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("host", &self.host)
            .field("email", &self.email)
            .field("token", &"<redacted>")
            .finish()
    }
}

impl Credentials {
    /// Read credentials from the process environment
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Read credentials through an arbitrary lookup. Blank values count as missing,
    /// and every missing name is reported at once.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut missing = Vec::new();
        let mut read = |name: &'static str| match lookup(name) {
            Some(value) if !value.trim().is_empty() => value.trim().to_string(),
            _ => {
                missing.push(name);
                String::new()
            }
        };

        let host = read(HOST_VAR);
        let email = read(EMAIL_VAR);
        let token = read(TOKEN_VAR);

        if !missing.is_empty() {
            return Err(ConfigError::MissingCredentials(missing));
        }

        Ok(Self { host, email, token })
    }
}

/// Whether mutating tools should be left unregistered
pub fn read_only_from_env() -> bool {
    is_read_only(std::env::var(READ_ONLY_VAR).ok().as_deref())
}

/// Only the exact value "true" enables read-only mode
pub fn is_read_only(value: Option<&str>) -> bool {
    value == Some("true")
}

/// Load variables from an env file into the process environment.
/// Variables that are already set keep their values.
pub fn load_env_file(path: &Path) -> Result<(), ConfigError> {
    dotenv::from_path(path).map_err(|source| ConfigError::EnvFile {
        path: path.to_path_buf(),
        source,
    })
}
