use std::time::Duration;

use moka::future::Cache;
use tracing::{debug, warn};

use crate::error::{GeocodingError, Result};
use crate::types::GeocodeResponse;

const DEFAULT_BASE_URL: &str = "https://maps.googleapis.com";
const GEOCODE_PATH: &str = "/maps/api/geocode/json";
const CACHE_TTL_SECS: u64 = 86400; // 24 hours

/// Settings for [`GoogleGeocodingClient`]
#[derive(Debug, Clone)]
pub struct ClientOptions {
    pub base_url: String,
    pub api_key: Option<String>,
    /// Response language, e.g. `"de"`
    pub language: Option<String>,
    /// Region bias as a ccTLD, e.g. `"ch"`
    pub region: Option<String>,
    pub timeout: Duration,
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            api_key: None,
            language: None,
            region: None,
            timeout: Duration::from_secs(30),
        }
    }
}

/// Google Geocoding API client with response caching
pub struct GoogleGeocodingClient {
    client: reqwest::Client,
    options: ClientOptions,
    cache: Cache<String, GeocodeResponse>,
}

impl GoogleGeocodingClient {
    /// Create a client against the public endpoint
    pub fn new(api_key: Option<String>) -> Result<Self> {
        Self::with_options(ClientOptions {
            api_key,
            ..ClientOptions::default()
        })
    }

    pub fn with_options(options: ClientOptions) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(options.timeout)
            .build()?;

        let cache = Cache::builder()
            .max_capacity(10_000)
            .time_to_live(Duration::from_secs(CACHE_TTL_SECS))
            .build();

        Ok(Self {
            client,
            options,
            cache,
        })
    }

    /// Reverse geocode coordinates into address results
    pub async fn from_lat_lng(&self, latitude: f64, longitude: f64) -> Result<GeocodeResponse> {
        if !latitude.is_finite()
            || !longitude.is_finite()
            || !(-90.0..=90.0).contains(&latitude)
            || !(-180.0..=180.0).contains(&longitude)
        {
            return Err(GeocodingError::InvalidCoordinates(latitude, longitude));
        }

        // Round to 6 decimal places for cache key (~0.1m precision)
        let latlng = format!("{:.6},{:.6}", latitude, longitude);
        let cache_key = format!("latlng:{latlng}");

        if let Some(cached) = self.cache.get(&cache_key).await {
            return Ok(cached);
        }

        let url = self.request_url("latlng", &latlng);
        let response = self.fetch(&url).await?;

        debug!(
            lat = latitude,
            lon = longitude,
            results = response.results.len(),
            "Reverse geocoded coordinates"
        );

        self.cache.insert(cache_key, response.clone()).await;
        Ok(response)
    }

    /// Forward geocode a free-form address into coordinate results
    pub async fn from_address(&self, address: &str) -> Result<GeocodeResponse> {
        let address = address.split_whitespace().collect::<Vec<_>>().join(" ");
        if address.is_empty() {
            return Err(GeocodingError::EmptyAddress);
        }

        let cache_key = format!("address:{}", address.to_lowercase());

        if let Some(cached) = self.cache.get(&cache_key).await {
            return Ok(cached);
        }

        let url = self.request_url("address", &address);
        let response = self.fetch(&url).await?;

        debug!(
            address = %address,
            results = response.results.len(),
            "Geocoded address"
        );

        self.cache.insert(cache_key, response.clone()).await;
        Ok(response)
    }

    fn request_url(&self, param: &str, value: &str) -> String {
        let mut url = format!(
            "{}{}?{}={}",
            self.options.base_url.trim_end_matches('/'),
            GEOCODE_PATH,
            param,
            urlencoding::encode(value)
        );
        if let Some(ref key) = self.options.api_key {
            url.push_str(&format!("&key={}", urlencoding::encode(key)));
        }
        if let Some(ref language) = self.options.language {
            url.push_str(&format!("&language={}", urlencoding::encode(language)));
        }
        if let Some(ref region) = self.options.region {
            url.push_str(&format!("&region={}", urlencoding::encode(region)));
        }
        url
    }

    async fn fetch(&self, url: &str) -> Result<GeocodeResponse> {
        let response = self
            .client
            .get(url)
            .header("Accept", "application/json")
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(GeocodingError::Api {
                status: response.status().to_string(),
                message: None,
            });
        }

        let data: GeocodeResponse = response.json().await?;

        match data.status.as_str() {
            "OK" => Ok(data),
            "ZERO_RESULTS" => Err(GeocodingError::NoResults),
            _ => {
                warn!(
                    status = %data.status,
                    error = data.error_message.as_deref().unwrap_or(""),
                    "Geocoding provider returned error"
                );
                Err(GeocodingError::Api {
                    status: data.status,
                    message: data.error_message,
                })
            }
        }
    }
}
