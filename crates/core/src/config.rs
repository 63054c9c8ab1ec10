//! Session configuration

use crate::error::{CoreError, CoreResult};
use serde::{Deserialize, Serialize};

/// Routes the session layer redirects to
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RouteConfig {
    /// Login entry point
    pub login: String,
    /// Landing route for authenticated clients
    pub client_home: String,
    /// Application root
    pub root: String,
}

impl Default for RouteConfig {
    fn default() -> Self {
        Self {
            login: "/auth/login".to_string(),
            client_home: "/shop".to_string(),
            root: "/".to_string(),
        }
    }
}

/// Main session configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Base URL of the storefront API
    pub api_base_url: String,

    /// Identity provider path, relative to `api_base_url`
    pub auth_path: String,

    /// Storage key holding the raw credential
    pub token_key: String,

    /// Storage key holding the claim snapshot
    pub user_info_key: String,

    /// Path fragments reachable without a credential
    pub public_endpoints: Vec<String>,

    /// Minutes before expiry at which a rejected request attempts renewal
    pub renewal_threshold_minutes: i64,

    /// Minutes before expiry at which route guards advise renewal
    pub guard_renewal_threshold_minutes: i64,

    /// Store a credential returned by registration
    pub auto_login_on_register: bool,

    /// Renew in the background when a guard advises it
    pub proactive_renewal: bool,

    pub routes: RouteConfig,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            api_base_url: "http://localhost:8080/api/".to_string(),
            auth_path: "auth/".to_string(),
            token_key: "token".to_string(),
            user_info_key: "user_info".to_string(),
            public_endpoints: vec![
                "/auth/login".to_string(),
                "/auth/registro".to_string(),
                "/auth/refresh".to_string(),
            ],
            renewal_threshold_minutes: 5,
            guard_renewal_threshold_minutes: 10,
            auto_login_on_register: true,
            proactive_renewal: false,
            routes: RouteConfig::default(),
        }
    }
}

impl SessionConfig {
    /// Load configuration from defaults, an optional file and `TIENDA_*`
    /// environment variables (nested keys use `__`, e.g.
    /// `TIENDA_ROUTES__LOGIN`)
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed, or if the
    /// merged configuration is invalid
    #[cfg(not(target_arch = "wasm32"))]
    pub fn load(path: Option<&std::path::Path>) -> CoreResult<Self> {
        let defaults = config::Config::try_from(&Self::default())?;
        let mut builder = config::Config::builder().add_source(defaults);

        if let Some(path) = path {
            builder = builder.add_source(config::File::from(path));
        }

        let settings = builder
            .add_source(
                config::Environment::with_prefix("TIENDA")
                    .prefix_separator("_")
                    .separator("__")
                    .list_separator(",")
                    .with_list_parse_key("public_endpoints")
                    .try_parsing(true),
            )
            .build()?;

        let config: Self = settings.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    /// Check the configuration for values the session layer cannot work with
    pub fn validate(&self) -> CoreResult<()> {
        if self.api_base_url.trim().is_empty() {
            return Err(CoreError::invalid_config("api_base_url must not be empty"));
        }
        if self.renewal_threshold_minutes <= 0 || self.guard_renewal_threshold_minutes <= 0 {
            return Err(CoreError::invalid_config(
                "renewal thresholds must be positive minute counts",
            ));
        }
        if self.public_endpoints.is_empty() {
            return Err(CoreError::invalid_config(
                "public_endpoints must list the identity provider paths",
            ));
        }
        if self.token_key == self.user_info_key {
            return Err(CoreError::invalid_config(
                "token_key and user_info_key must differ",
            ));
        }
        Ok(())
    }

    /// Absolute URL of an identity provider operation (`login`, `registro`, `refresh`)
    pub fn auth_url(&self, operation: &str) -> String {
        let base = if self.api_base_url.ends_with('/') {
            self.api_base_url.clone()
        } else {
            format!("{}/", self.api_base_url)
        };
        format!("{base}{}{operation}", self.auth_path)
    }

    /// Whether a request path is reachable without a credential
    pub fn is_public_endpoint(&self, path: &str) -> bool {
        self.public_endpoints
            .iter()
            .any(|endpoint| path.contains(endpoint.as_str()))
    }
}
