//! Google Geocoding Client
//!
//! A Rust client for the [Google Geocoding API](https://developers.google.com/maps/documentation/geocoding)
//! covering forward (address to coordinates) and reverse (coordinates to
//! address) lookups, with moka async caching of successful responses.

mod client;
mod error;
mod types;

pub use client::{ClientOptions, GoogleGeocodingClient};
pub use error::{GeocodingError, Result};
pub use types::{AddressComponent, GeocodeResponse, GeocodeResult, Geometry, LatLng};
