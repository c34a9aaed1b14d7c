use std::time::Duration;

/// UserPass holds username/password credentials as dictated
/// server-side
#[derive(Clone, PartialEq, Eq)]
pub struct UserPass {
    pub username: String,
    pub password: String,
}

impl UserPass {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }
}

// Keep the password out of logs
impl std::fmt::Debug for UserPass {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UserPass")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// RetryPolicy governs how a relay direction reacts to a connection
/// reset or broken pipe
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_backoff: Duration,
}

impl RetryPolicy {
    /// backoff returns the linear wait before the next try: base * (attempt + 1)
    pub fn backoff(&self, attempt: u32) -> Duration {
        self.base_backoff * (attempt + 1)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_backoff: Duration::from_secs(1),
        }
    }
}

/// ProxyConfig is the read-only configuration shared by every session
#[derive(Debug, Clone)]
pub struct ProxyConfig {
    pub host: String,
    pub port: u16,
    pub auth: Option<UserPass>,
    /// Bound on the auth + request phases, none by default
    pub handshake_timeout: Option<Duration>,
    /// Bound on dialing the target, none by default
    pub connect_timeout: Option<Duration>,
    pub retry: RetryPolicy,
}

/// ProxyConfig implementation block
impl ProxyConfig {
    /// new is a constructor for the ProxyConfig type
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
            auth: None,
            handshake_timeout: None,
            connect_timeout: None,
            retry: RetryPolicy::default(),
        }
    }

    /// with_auth applies the desired authentication
    pub fn with_auth(mut self, auth: Option<UserPass>) -> Self {
        self.auth = auth;
        self
    }

    pub fn with_handshake_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.handshake_timeout = timeout;
        self
    }

    pub fn with_connect_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.connect_timeout = timeout;
        self
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// listen_addr joins host and port, bracketing IPv6 literals
    pub fn listen_addr(&self) -> String {
        if self.host.contains(':') && !self.host.starts_with('[') {
            format!("[{}]:{}", self.host, self.port)
        } else {
            format!("{}:{}", self.host, self.port)
        }
    }
}

impl Default for ProxyConfig {
    fn default() -> Self {
        Self::new("127.0.0.1", 1080)
    }
}
