//! Origin and engine configuration

use std::time::Duration;

/// Default deadline for every remote call made through the facade
pub const DEFAULT_WAIT: Duration = Duration::from_millis(7500);

/// Default idle period after which a connection is closed
pub const DEFAULT_IDLE_RECYCLE: Duration = Duration::from_secs(55);

/// A news server as seen by the reader
///
/// Several origins may point at the same physical server with different
/// credentials; they are told apart by [`Origin::key`] only.
///
/// # Example
///
/// ```
/// use nntp_reader::Origin;
///
/// let origin = Origin::tls("news.example.com").with_credentials("user", "pass");
/// assert_eq!(origin.port, 563);
/// assert_eq!(origin.key(), "user@news.example.com");
///
/// let aliased = Origin::new("news.example.com").with_alias("home");
/// assert_eq!(aliased.key(), "home");
/// ```
#[must_use]
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Origin {
    /// Server hostname
    pub host: String,

    /// Server port (119 plain, 563 TLS)
    pub port: u16,

    /// Use TLS
    #[cfg_attr(feature = "serde", serde(default))]
    pub tls: bool,

    /// Username for AUTHINFO, if the server requires one
    #[cfg_attr(feature = "serde", serde(default))]
    pub username: Option<String>,

    /// Password for AUTHINFO
    #[cfg_attr(feature = "serde", serde(default))]
    pub password: Option<String>,

    /// Optional display alias, used instead of the host in the key
    #[cfg_attr(feature = "serde", serde(default))]
    pub alias: Option<String>,
}

impl Origin {
    /// Plain connection on the standard port (119)
    pub fn new(host: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            port: 119,
            tls: false,
            username: None,
            password: None,
            alias: None,
        }
    }

    /// TLS connection on the standard secure port (563)
    pub fn tls(host: impl Into<String>) -> Self {
        Self {
            port: 563,
            tls: true,
            ..Self::new(host)
        }
    }

    /// Override the port
    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    /// Attach AUTHINFO credentials
    pub fn with_credentials(
        mut self,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        self.username = Some(username.into());
        self.password = Some(password.into());
        self
    }

    /// Attach a display alias
    pub fn with_alias(mut self, alias: impl Into<String>) -> Self {
        self.alias = Some(alias.into());
        self
    }

    /// Identity key: `alias || host`, prefixed by `username@` when present
    ///
    /// The password is not part of the key, so two origins that differ only
    /// in password share one connection.
    #[must_use]
    pub fn key(&self) -> String {
        let name = match self.alias.as_deref() {
            Some(alias) if !alias.is_empty() => alias,
            _ if !self.host.is_empty() => self.host.as_str(),
            _ => "localhost",
        };
        match self.username.as_deref() {
            Some(user) if !user.is_empty() => format!("{user}@{name}"),
            _ => name.to_string(),
        }
    }

    /// Whether AUTHINFO should be attempted after connecting
    pub fn has_credentials(&self) -> bool {
        self.username.as_deref().is_some_and(|u| !u.is_empty())
    }

    /// Wire-level configuration for the `nntp-rs` client
    pub fn server_config(&self) -> nntp_rs::ServerConfig {
        nntp_rs::ServerConfig::new(
            self.host.clone(),
            self.port,
            self.tls,
            self.username.clone().unwrap_or_default(),
            self.password.clone().unwrap_or_default(),
        )
    }
}

/// Engine-wide tuning
#[must_use]
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct EngineConfig {
    /// Deadline applied to every facade call
    pub wait: Duration,

    /// Close a connection after this long without use (`None` keeps it open)
    pub idle_recycle: Option<Duration>,

    /// User-Agent header added to posted articles
    pub user_agent: String,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            wait: DEFAULT_WAIT,
            idle_recycle: Some(DEFAULT_IDLE_RECYCLE),
            user_agent: concat!("nntp-reader/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}

impl EngineConfig {
    /// Override the facade deadline
    pub fn with_wait(mut self, wait: Duration) -> Self {
        self.wait = wait;
        self
    }

    /// Override (or disable, with `None`) idle recycling
    pub fn with_idle_recycle(mut self, idle: Option<Duration>) -> Self {
        self.idle_recycle = idle;
        self
    }
}
