//! Layered settings: built-in defaults, then `config.toml`, then `CIVICOS_*`
//! environment variables with nested keys split on `__`
//! (`CIVICOS_AUTH__SESSION_SECRET` sets `auth.session_secret`).
//!
//! Secrets like the JWT signing secret and AI API keys should be kept in
//! environment variables, not in the config file.

use config::{Config, ConfigError, Environment, File};
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};

pub static APP_CONFIG: Lazy<AppConfig> = Lazy::new(|| {
    AppConfig::load().unwrap_or_else(|e| {
        log::warn!("Failed to load config file, using defaults: {}", e);
        AppConfig::default()
    })
});

/// Site configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SiteConfig {
    pub name: String,
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            name: "CivicOS".to_string(),
        }
    }
}

/// HTTP server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub bind: String,
    /// Database URL (should be in env var DATABASE_URL)
    pub database_url: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: "0.0.0.0:8080".to_string(),
            database_url: String::new(),
        }
    }
}

/// Token authentication configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthConfig {
    /// HMAC secret for signing tokens (should be in env var SESSION_SECRET)
    pub session_secret: String,
    /// Lifetime of issued tokens in hours
    pub token_ttl_hours: u32,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            session_secret: String::new(),
            token_ttl_hours: 24 * 7,
        }
    }
}

/// Content and listing limits
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LimitsConfig {
    /// Page size used when a request omits `limit`
    pub default_page_size: u64,
    /// Upper bound applied to any requested `limit`
    pub max_page_size: u64,
    pub max_post_length: u32,
    pub max_message_length: u32,
    pub max_statement_length: u32,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            default_page_size: 20,
            max_page_size: 100,
            max_post_length: 5_000,
            max_message_length: 2_000,
            max_statement_length: 10_000,
        }
    }
}

/// Rate limiting configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RateLimitConfig {
    /// Login attempts per window
    pub login_max_attempts: u32,
    /// Login rate limit window in seconds
    pub login_window_seconds: u32,
    /// Registration attempts per hour
    pub registration_per_hour: u32,
    /// Social posts per minute per user
    pub posts_per_minute: u32,
    /// Direct messages per minute per user
    pub messages_per_minute: u32,
    /// Friend requests per hour per user
    pub friend_requests_per_hour: u32,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            login_max_attempts: 5,
            login_window_seconds: 300,
            registration_per_hour: 5,
            posts_per_minute: 10,
            messages_per_minute: 30,
            friend_requests_per_hour: 30,
        }
    }
}

/// Fetch layer configuration shared by every scraped source
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScraperConfig {
    pub user_agent: String,
    pub timeout_secs: u64,
    /// Total attempts per URL, including the first
    pub max_attempts: u32,
    /// Fixed pause between attempts
    pub retry_delay_ms: u64,
    pub max_body_bytes: usize,
}

impl Default for ScraperConfig {
    fn default() -> Self {
        Self {
            user_agent: "Mozilla/5.0 (compatible; CivicOSBot/1.0)".to_string(),
            timeout_secs: 15,
            max_attempts: 2,
            retry_delay_ms: 500,
            max_body_bytes: 4 * 1024 * 1024,
        }
    }
}

/// CSS selectors locating one record and its fields inside a page.
/// Field selectors are evaluated relative to the matched item.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SourceSelectors {
    pub item: String,
    pub title: String,
    pub date: String,
    pub detail: String,
    pub region: String,
    pub link: String,
}

/// One scraped page feeding the ingestion pipeline
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SourceConfig {
    /// Human-readable source name, stored with elections
    pub name: String,
    pub url: String,
    /// federal | provincial | municipal
    pub level: String,
    pub jurisdiction: String,
    pub selectors: SourceSelectors,
}

/// Ingestion pipeline configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct IngestConfig {
    /// Run the pipeline on an interval inside the server. 0 disables.
    pub schedule_minutes: u64,
    pub federal_elections: SourceConfig,
    pub provincial_elections: SourceConfig,
    pub municipal_elections: SourceConfig,
    pub politicians: SourceConfig,
    pub legal_acts: SourceConfig,
}

impl Default for IngestConfig {
    fn default() -> Self {
        let election_selectors = SourceSelectors {
            item: "table.table tbody tr".to_string(),
            title: "td:nth-child(1)".to_string(),
            date: "td:nth-child(2)".to_string(),
            detail: "td:nth-child(3)".to_string(),
            region: "td:nth-child(4)".to_string(),
            link: "a".to_string(),
        };

        Self {
            schedule_minutes: 0,
            federal_elections: SourceConfig {
                name: "Elections Canada".to_string(),
                url: "https://www.elections.ca/content.aspx?section=ele&dir=pas&document=index&lang=e"
                    .to_string(),
                level: "federal".to_string(),
                jurisdiction: "Canada".to_string(),
                selectors: election_selectors.clone(),
            },
            provincial_elections: SourceConfig {
                name: "Elections Ontario".to_string(),
                url: "https://www.elections.on.ca/en/resource-centre/elections-results.html"
                    .to_string(),
                level: "provincial".to_string(),
                jurisdiction: "Ontario".to_string(),
                selectors: election_selectors.clone(),
            },
            municipal_elections: SourceConfig {
                name: "City of Toronto".to_string(),
                url: "https://www.toronto.ca/city-government/elections/".to_string(),
                level: "municipal".to_string(),
                jurisdiction: "Toronto".to_string(),
                selectors: election_selectors,
            },
            politicians: SourceConfig {
                name: "House of Commons".to_string(),
                url: "https://www.ourcommons.ca/members/en/search".to_string(),
                level: "federal".to_string(),
                jurisdiction: "Canada".to_string(),
                selectors: SourceSelectors {
                    item: ".ce-mip-mp-tile".to_string(),
                    title: ".ce-mip-mp-name".to_string(),
                    date: String::new(),
                    detail: ".ce-mip-mp-party".to_string(),
                    region: ".ce-mip-mp-constituency".to_string(),
                    link: "a".to_string(),
                },
            },
            legal_acts: SourceConfig {
                name: "Justice Laws".to_string(),
                url: "https://laws-lois.justice.gc.ca/eng/acts/".to_string(),
                level: "federal".to_string(),
                jurisdiction: "Canada".to_string(),
                selectors: SourceSelectors {
                    item: "#alphaList li".to_string(),
                    title: "a".to_string(),
                    date: String::new(),
                    detail: "span.htmlLink".to_string(),
                    region: String::new(),
                    link: "a".to_string(),
                },
            },
        }
    }
}

/// Generative AI configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AiConfig {
    /// API key (should be in env var CIVICOS_AI__API_KEY). Empty disables live calls.
    pub api_key: String,
    pub endpoint: String,
    pub model: String,
    pub timeout_secs: u64,
}

impl Default for AiConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            endpoint: "https://generativelanguage.googleapis.com/v1beta/models".to_string(),
            model: "gemini-1.5-flash".to_string(),
            timeout_secs: 20,
        }
    }
}

/// Main application configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct AppConfig {
    pub site: SiteConfig,
    pub server: ServerConfig,
    pub auth: AuthConfig,
    pub limits: LimitsConfig,
    pub rate_limit: RateLimitConfig,
    pub scraper: ScraperConfig,
    pub ingest: IngestConfig,
    pub ai: AiConfig,
}

impl AppConfig {
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from_path("config.toml")
    }

    /// Defaults, overlaid with the TOML file at `path` if it exists, then the environment.
    pub fn load_from_path(path: &str) -> Result<Self, ConfigError> {
        use config::FileFormat;

        let config = Config::builder()
            .add_source(config::Config::try_from(&AppConfig::default())?)
            .add_source(File::new(path, FileFormat::Toml).required(false))
            .add_source(
                Environment::with_prefix("CIVICOS")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        let mut app_config: AppConfig = config.try_deserialize()?;

        // Legacy variable names shared with the web client's deployment
        if app_config.auth.session_secret.is_empty() {
            app_config.auth.session_secret = std::env::var("SESSION_SECRET").unwrap_or_default();
        }
        if app_config.server.database_url.is_empty() {
            app_config.server.database_url = std::env::var("DATABASE_URL").unwrap_or_default();
        }

        Ok(app_config)
    }
}

/// Forces the first load so config errors surface at startup.
pub fn init() {
    let config = get_config();
    log::info!("Configuration loaded: site.name = {}", config.site.name);
}

pub fn get_config() -> AppConfig {
    (*APP_CONFIG).clone()
}

pub fn limits() -> LimitsConfig {
    get_config().limits
}

pub fn rate_limit() -> RateLimitConfig {
    get_config().rate_limit
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.site.name, "CivicOS");
        assert_eq!(config.limits.max_page_size, 100);
        assert_eq!(config.limits.default_page_size, 20);
        assert_eq!(config.scraper.max_attempts, 2);
        assert_eq!(config.ingest.schedule_minutes, 0);
    }

    #[test]
    fn test_default_sources_have_levels() {
        let ingest = IngestConfig::default();
        assert_eq!(ingest.federal_elections.level, "federal");
        assert_eq!(ingest.provincial_elections.level, "provincial");
        assert_eq!(ingest.municipal_elections.level, "municipal");
        assert!(!ingest.politicians.selectors.item.is_empty());
    }

    #[test]
    fn test_load_from_toml_file() {
        let mut temp_file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            temp_file,
            r#"
[site]
name = "Test Civic"

[limits]
max_page_size = 50

[scraper]
timeout_secs = 3

[ingest]
schedule_minutes = 60

[ingest.politicians]
url = "http://localhost:9999/members"
"#
        )
        .unwrap();

        let config = AppConfig::load_from_path(temp_file.path().to_str().unwrap()).unwrap();

        assert_eq!(config.site.name, "Test Civic");
        assert_eq!(config.limits.max_page_size, 50);
        assert_eq!(config.scraper.timeout_secs, 3);
        assert_eq!(config.ingest.schedule_minutes, 60);
        assert_eq!(config.ingest.politicians.url, "http://localhost:9999/members");
        // Defaults should still apply for unspecified values
        assert_eq!(config.limits.default_page_size, 20);
        assert_eq!(config.ingest.politicians.selectors.item, ".ce-mip-mp-tile");
    }

    #[test]
    fn test_missing_config_file_uses_defaults() {
        let config = AppConfig::load_from_path("/nonexistent/config.toml").unwrap();
        assert_eq!(config.site.name, "CivicOS");
        assert_eq!(config.rate_limit.login_max_attempts, 5);
    }
}
