use std::time::Duration;

/// Default end-to-end request timeout. This also bounds the refresh call,
/// so a hung refresh cannot strand queued waiters forever.
const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

const DEFAULT_BASE_URL: &str = "http://localhost:5000/api";

/// Connection settings for the AccessGuard API.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    /// Full URL prefix, including the `/api` segment the server mounts
    /// its routes under. No trailing slash.
    pub base_url: String,
    pub request_timeout: Duration,
}

impl ClientConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        let mut base_url = base_url.into();
        while base_url.ends_with('/') {
            base_url.pop();
        }
        Self {
            base_url,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
        }
    }

    /// Read configuration from the environment, falling back to defaults.
    ///
    /// - `ACCESSGUARD_API_URL` — base URL (default `http://localhost:5000/api`)
    /// - `ACCESSGUARD_REQUEST_TIMEOUT_SECS` — timeout in seconds (default 30)
    pub fn from_env() -> Self {
        let base_url =
            std::env::var("ACCESSGUARD_API_URL").unwrap_or_else(|_| DEFAULT_BASE_URL.to_string());

        let mut config = Self::new(base_url);
        if let Some(secs) = std::env::var("ACCESSGUARD_REQUEST_TIMEOUT_SECS")
            .ok()
            .and_then(|v| v.parse::<u64>().ok())
        {
            config.request_timeout = Duration::from_secs(secs);
        }
        config
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self::new(DEFAULT_BASE_URL)
    }
}
