use std::env;
use std::path::PathBuf;
use std::time::Duration;

use chrono_tz::Tz;
use google_geocoding_client::ClientOptions;

/// Service configuration parsed from environment variables
#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub cors_origins: Vec<String>,
    pub google_places_key: Option<String>,
    pub google_places_language: Option<String>,
    pub google_places_region: Option<String>,
    pub geocoding_base_url: Option<String>,
    pub geocoding_timeout_secs: u64,
    /// IANA zone the form's date and time fields are entered in
    pub timezone: String,
    /// JSON array of entries to start the path with
    pub seed_file: Option<PathBuf>,
}

impl Config {
    /// Parse configuration from environment variables
    pub fn from_env() -> Self {
        let port = env::var("PORT")
            .ok()
            .and_then(|p| p.parse().ok())
            .unwrap_or(3005);

        let cors_origins = env::var("CORS_ORIGINS")
            .map(|s| s.split(',').map(|o| o.trim().to_string()).collect())
            .unwrap_or_else(|_| {
                vec![
                    "http://localhost:3000".to_string(),
                    "http://localhost:5173".to_string(),
                ]
            });

        let geocoding_timeout_secs = env::var("GEOCODING_TIMEOUT_SECS")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(30);

        Self {
            port,
            cors_origins,
            google_places_key: non_empty_var("GOOGLE_PLACES_KEY"),
            google_places_language: non_empty_var("GOOGLE_PLACES_LANGUAGE"),
            google_places_region: non_empty_var("GOOGLE_PLACES_REGION"),
            geocoding_base_url: non_empty_var("GEOCODING_BASE_URL"),
            geocoding_timeout_secs,
            timezone: non_empty_var("ENTRY_TIMEZONE").unwrap_or_else(|| "UTC".to_string()),
            seed_file: non_empty_var("PATH_SEED_FILE").map(PathBuf::from),
        }
    }

    /// Falls back to UTC when the configured zone is unknown
    pub fn tz(&self) -> Tz {
        self.timezone.trim().parse().unwrap_or(Tz::UTC)
    }

    pub fn geocoding_options(&self) -> ClientOptions {
        let defaults = ClientOptions::default();
        ClientOptions {
            base_url: self
                .geocoding_base_url
                .clone()
                .unwrap_or(defaults.base_url),
            api_key: self.google_places_key.clone(),
            language: self.google_places_language.clone(),
            region: self.google_places_region.clone(),
            timeout: Duration::from_secs(self.geocoding_timeout_secs),
        }
    }
}

fn non_empty_var(name: &str) -> Option<String> {
    env::var(name).ok().filter(|v| !v.trim().is_empty())
}
