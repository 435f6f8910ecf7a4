use std::path::{Path, PathBuf};

use serde::Serialize;
use thiserror::Error;
use tracing::{debug, instrument};

use super::options::InvocationConfig;

pub const DEFAULT_PORT: &str = "3306";

/// Characters that cannot appear in an inline `user:pass@host:port/schema` DSN.
const UNSAFE_PASSWORD_CHARS: &[char] = &['@', ':', '/'];

#[derive(Debug, Error)]
pub enum DsnError {
    #[error("Failed to serialize credentials file: {0}")]
    Serialize(#[from] serde_yaml::Error),

    #[error("Failed to write credentials file {}: {source}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Connection parameters of the test database the analyzer may inspect.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credentials {
    pub host: String,
    pub user: String,
    pub password: String,
    pub port: String,
    pub schema: String,
}

impl Credentials {
    pub fn new(
        host: impl Into<String>,
        user: impl Into<String>,
        password: impl Into<String>,
        port: Option<String>,
        schema: impl Into<String>,
    ) -> Self {
        Self {
            host: host.into(),
            user: user.into(),
            password: password.into(),
            port: port
                .filter(|p| !p.is_empty())
                .unwrap_or_else(|| DEFAULT_PORT.to_string()),
            schema: schema.into(),
        }
    }

    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// How credentials reach the analyzer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DsnMode {
    /// Passed as `-test-dsn=user:pass@host:port/schema`.
    Inline(String),
    /// The password cannot be inlined; write a YAML side file instead.
    SideFile,
}

impl DsnMode {
    pub fn select(credentials: &Credentials) -> Self {
        if credentials.password.contains(UNSAFE_PASSWORD_CHARS) {
            DsnMode::SideFile
        } else {
            DsnMode::Inline(format!(
                "{}:{}@{}/{}",
                credentials.user,
                credentials.password,
                credentials.addr(),
                credentials.schema
            ))
        }
    }
}

#[derive(Serialize)]
struct SideFile<'a> {
    #[serde(rename = "test-dsn")]
    test_dsn: TestDsn<'a>,
}

#[derive(Serialize)]
struct TestDsn<'a> {
    addr: String,
    schema: &'a str,
    user: &'a str,
    password: &'a str,
    disable: bool,
}

/// Render the analyzer's YAML config carrying the test DSN.
pub fn side_file_contents(credentials: &Credentials) -> Result<String, DsnError> {
    let doc = SideFile {
        test_dsn: TestDsn {
            addr: credentials.addr(),
            schema: &credentials.schema,
            user: &credentials.user,
            password: &credentials.password,
            disable: false,
        },
    };
    Ok(serde_yaml::to_string(&doc)?)
}

/// Point `config` at the test database, inline or through `side_file`.
///
/// The side file is written before returning, i.e. before any launch.
/// Concurrent callers sharing one side-file path with different
/// credentials race on it and must serialize among themselves.
#[instrument(skip(credentials, config), fields(host = %credentials.host, schema = %credentials.schema))]
pub fn apply(
    credentials: &Credentials,
    side_file: &Path,
    config: &mut InvocationConfig,
) -> Result<DsnMode, DsnError> {
    let mode = DsnMode::select(credentials);
    match &mode {
        DsnMode::Inline(dsn) => {
            debug!("passing test DSN inline");
            config.set("test-dsn", dsn.clone());
        }
        DsnMode::SideFile => {
            debug!(path = %side_file.display(), "writing test DSN side file");
            let contents = side_file_contents(credentials)?;
            std::fs::write(side_file, contents).map_err(|source| DsnError::Write {
                path: side_file.to_path_buf(),
                source,
            })?;
            config.set("config", side_file.display().to_string());
        }
    }
    Ok(mode)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn creds(password: &str) -> Credentials {
        Credentials::new("db.local", "app", password, None, "shop")
    }

    #[test]
    fn test_default_port() {
        assert_eq!(creds("pw").port, "3306");
        let custom = Credentials::new("h", "u", "p", Some("3307".to_string()), "s");
        assert_eq!(custom.addr(), "h:3307");
    }

    #[test]
    fn test_inline_mode_for_plain_password() {
        assert_eq!(
            DsnMode::select(&creds("s3cret")),
            DsnMode::Inline("app:s3cret@db.local:3306/shop".to_string())
        );
    }

    #[test]
    fn test_side_file_mode_for_unsafe_password() {
        for pw in ["a@b", "a:b", "a/b"] {
            assert_eq!(DsnMode::select(&creds(pw)), DsnMode::SideFile);
        }
    }

    #[test]
    fn test_side_file_contents() {
        let yaml = side_file_contents(&creds("p@ss:w/rd")).unwrap();
        let parsed: serde_yaml::Value = serde_yaml::from_str(&yaml).unwrap();
        let dsn = &parsed["test-dsn"];
        assert_eq!(dsn["addr"].as_str(), Some("db.local:3306"));
        assert_eq!(dsn["schema"].as_str(), Some("shop"));
        assert_eq!(dsn["user"].as_str(), Some("app"));
        assert_eq!(dsn["password"].as_str(), Some("p@ss:w/rd"));
        assert_eq!(dsn["disable"].as_bool(), Some(false));
    }

    #[test]
    fn test_apply_inline_sets_option() {
        let dir = tempfile::tempdir().unwrap();
        let side = dir.path().join("soar.yaml");
        let mut config = InvocationConfig::default();
        apply(&creds("pw"), &side, &mut config).unwrap();
        assert_eq!(config.get("test-dsn"), Some("app:pw@db.local:3306/shop"));
        assert!(!side.exists());
    }

    #[test]
    fn test_apply_side_file_writes_before_launch() {
        let dir = tempfile::tempdir().unwrap();
        let side = dir.path().join("soar.yaml");
        let mut config = InvocationConfig::default();
        let mode = apply(&creds("p@ss"), &side, &mut config).unwrap();
        assert_eq!(mode, DsnMode::SideFile);
        assert!(std::fs::read_to_string(&side).unwrap().contains("test-dsn"));
        assert_eq!(config.get("config"), Some(side.display().to_string().as_str()));
        assert_eq!(config.get("test-dsn"), None);
    }
}
