//! Translation between the form's address fields and its coordinates

use async_trait::async_trait;
use google_geocoding_client::{GeocodeResponse, GeocodeResult, GoogleGeocodingClient, LatLng};
use serde::Serialize;
use ts_rs::TS;

use crate::form::FormValues;

/// Geocoding provider seam
#[async_trait]
pub trait Geocoder: Send + Sync {
    async fn from_lat_lng(
        &self,
        latitude: f64,
        longitude: f64,
    ) -> google_geocoding_client::Result<GeocodeResponse>;

    async fn from_address(&self, address: &str) -> google_geocoding_client::Result<GeocodeResponse>;
}

#[async_trait]
impl Geocoder for GoogleGeocodingClient {
    async fn from_lat_lng(
        &self,
        latitude: f64,
        longitude: f64,
    ) -> google_geocoding_client::Result<GeocodeResponse> {
        GoogleGeocodingClient::from_lat_lng(self, latitude, longitude).await
    }

    async fn from_address(&self, address: &str) -> google_geocoding_client::Result<GeocodeResponse> {
        GoogleGeocodingClient::from_address(self, address).await
    }
}

/// What happened to a geocoding lookup
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export, export_to = "bindings/")]
pub enum ReconcileOutcome {
    /// The result was written into the form
    Applied,
    /// A newer lookup or a user edit replaced this one; the result was dropped
    Superseded,
    /// The lookup failed and the form was left unchanged
    Failed,
}

/// Address fields produced by a reverse lookup
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AddressFields {
    pub street: String,
    pub postal: String,
    pub town: String,
}

impl AddressFields {
    /// Street is `"<route> <street number>"`; missing components are empty
    pub fn from_result(result: &GeocodeResult) -> Self {
        let street = [result.component("route"), result.component("street_number")]
            .into_iter()
            .flatten()
            .filter(|part| !part.trim().is_empty())
            .collect::<Vec<_>>()
            .join(" ");

        Self {
            street,
            postal: result.component("postal_code").unwrap_or_default().to_string(),
            town: result.component("locality").unwrap_or_default().to_string(),
        }
    }

    pub(crate) fn write_into(self, values: &mut FormValues) {
        values.street = self.street;
        values.postal = self.postal;
        values.town = self.town;
    }
}

/// Query for a forward lookup: street, other, town and postal code in that
/// order, blank parts skipped
pub fn address_query(values: &FormValues) -> String {
    [&values.street, &values.other, &values.town, &values.postal]
        .into_iter()
        .map(|part| part.trim())
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

pub(crate) fn write_location(location: LatLng, values: &mut FormValues) {
    values.latitude = location.lat.to_string();
    values.longitude = location.lng.to_string();
}
