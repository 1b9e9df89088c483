//! One open instance of the entry form

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use chrono_tz::Tz;
use tokio::sync::RwLock;
use tracing::{debug, error, warn};

use crate::form::{BoundTime, Field, FormAction, FormPatch, FormRoute, FormValues};
use crate::reconcile::{address_query, write_location, AddressFields, Geocoder, ReconcileOutcome};
use crate::store::EntryStore;
use crate::submit::{submit_entry, Submission};
use crate::validation::{
    validate_form, validate_latitude, validate_longitude, FieldErrors, ValidatedForm,
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OpenError {
    /// The route does not show the form
    NotVisible,
    EntryNotFound(usize),
}

impl fmt::Display for OpenError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotVisible => write!(f, "Form is not shown on this page"),
            Self::EntryNotFound(index) => write!(f, "Entry {index} not found"),
        }
    }
}

impl std::error::Error for OpenError {}

/// Form state plus the geocoding lookups running against it.
///
/// Lookups are sequenced per direction: a result is written only while its
/// ticket is the newest one, so a slow response never overwrites a newer
/// lookup or a later user edit of the same fields.
pub struct EntryFormSession {
    route: FormRoute,
    tz: Tz,
    geocoder: Arc<dyn Geocoder>,
    values: RwLock<FormValues>,
    bound_time: Option<BoundTime>,
    /// Guards street, postal and town
    reverse_seq: AtomicU64,
    /// Guards latitude and longitude
    forward_seq: AtomicU64,
}

impl EntryFormSession {
    /// Open the form for `route`, bound to the entry it edits
    pub async fn open(
        route: FormRoute,
        store: &dyn EntryStore,
        geocoder: Arc<dyn Geocoder>,
        tz: Tz,
    ) -> Result<Self, OpenError> {
        if !route.is_visible() {
            return Err(OpenError::NotVisible);
        }

        let initial = match route.action {
            FormAction::New => None,
            FormAction::Existing(index) => Some(
                store
                    .entry(index)
                    .await
                    .ok_or(OpenError::EntryNotFound(index))?,
            ),
        };

        let values = FormValues::bind(route.action, initial.as_ref(), tz);
        let bound_time = initial.as_ref().map(|entry| BoundTime::new(&values, entry));
        Ok(Self {
            bound_time,
            ..Self::with_values(route, values, geocoder, tz)
        })
    }

    pub fn with_values(
        route: FormRoute,
        values: FormValues,
        geocoder: Arc<dyn Geocoder>,
        tz: Tz,
    ) -> Self {
        Self {
            route,
            tz,
            geocoder,
            values: RwLock::new(values),
            bound_time: None,
            reverse_seq: AtomicU64::new(0),
            forward_seq: AtomicU64::new(0),
        }
    }

    pub fn route(&self) -> &FormRoute {
        &self.route
    }

    pub async fn values(&self) -> FormValues {
        self.values.read().await.clone()
    }

    /// Apply user edits. Editing a field a lookup would write cancels that
    /// lookup's pending result.
    pub async fn apply_patch(&self, patch: FormPatch) -> FormValues {
        let mut values = self.values.write().await;
        for (field, value) in patch.into_updates() {
            match field {
                Field::Street | Field::Postal | Field::Town => {
                    self.reverse_seq.fetch_add(1, Ordering::SeqCst);
                }
                Field::Latitude | Field::Longitude => {
                    self.forward_seq.fetch_add(1, Ordering::SeqCst);
                }
                _ => {}
            }
            values.set(field, value);
        }
        values.clone()
    }

    pub async fn validate(&self) -> Result<ValidatedForm, FieldErrors> {
        validate_form(&*self.values.read().await, self.tz)
    }

    /// Fill street, postal code and town from the current coordinates
    pub async fn reverse_geocode(&self) -> ReconcileOutcome {
        let (ticket, latitude, longitude) = {
            let values = self.values.read().await;
            let ticket = self.reverse_seq.fetch_add(1, Ordering::SeqCst) + 1;
            (
                ticket,
                validate_latitude(&values.latitude),
                validate_longitude(&values.longitude),
            )
        };

        let (latitude, longitude) = match (latitude, longitude) {
            (Ok(lat), Ok(lng)) => (lat, lng),
            _ => {
                warn!("Skipping reverse geocode of invalid coordinates");
                return ReconcileOutcome::Failed;
            }
        };

        let response = match self.geocoder.from_lat_lng(latitude, longitude).await {
            Ok(response) => response,
            Err(e) => {
                error!(lat = latitude, lon = longitude, error = %e, "Reverse geocoding failed");
                return ReconcileOutcome::Failed;
            }
        };

        let Some(result) = response.first() else {
            error!(lat = latitude, lon = longitude, "Reverse geocoding returned no results");
            return ReconcileOutcome::Failed;
        };
        let fields = AddressFields::from_result(result);

        let mut values = self.values.write().await;
        if self.reverse_seq.load(Ordering::SeqCst) != ticket {
            debug!(ticket, "Dropping superseded reverse geocode result");
            return ReconcileOutcome::Superseded;
        }
        fields.write_into(&mut values);
        ReconcileOutcome::Applied
    }

    /// Fill latitude and longitude from the current address fields
    pub async fn forward_geocode(&self) -> ReconcileOutcome {
        let (ticket, address) = {
            let values = self.values.read().await;
            let ticket = self.forward_seq.fetch_add(1, Ordering::SeqCst) + 1;
            (ticket, address_query(&values))
        };

        if address.is_empty() {
            warn!("Skipping forward geocode of empty address");
            return ReconcileOutcome::Failed;
        }

        let response = match self.geocoder.from_address(&address).await {
            Ok(response) => response,
            Err(e) => {
                error!(address = %address, error = %e, "Forward geocoding failed");
                return ReconcileOutcome::Failed;
            }
        };

        let Some(location) = response.first().map(|r| r.geometry.location) else {
            error!(address = %address, "Forward geocoding returned no results");
            return ReconcileOutcome::Failed;
        };

        let mut values = self.values.write().await;
        if self.forward_seq.load(Ordering::SeqCst) != ticket {
            debug!(ticket, "Dropping superseded forward geocode result");
            return ReconcileOutcome::Superseded;
        }
        write_location(location, &mut values);
        ReconcileOutcome::Applied
    }

    pub async fn submit(&self, store: &dyn EntryStore) -> Result<Submission, FieldErrors> {
        let values = self.values().await;
        submit_entry(
            store,
            self.route.action,
            &values,
            self.tz,
            self.bound_time.as_ref(),
        )
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entry::Entry;
    use crate::store::InMemoryPathStore;
    use async_trait::async_trait;
    use google_geocoding_client::{GeocodeResponse, GeocodingError};
    use serde_json::json;
    use std::sync::atomic::AtomicUsize;
    use std::time::Duration;

    /// Answers the n-th call with the n-th scripted step after its delay
    struct ScriptedGeocoder {
        calls: AtomicUsize,
        script: Vec<(u64, Option<GeocodeResponse>)>,
    }

    impl ScriptedGeocoder {
        fn new(script: Vec<(u64, Option<GeocodeResponse>)>) -> Arc<Self> {
            Arc::new(Self {
                calls: AtomicUsize::new(0),
                script,
            })
        }

        async fn next(&self) -> google_geocoding_client::Result<GeocodeResponse> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst);
            let (delay_ms, response) = self.script[call.min(self.script.len() - 1)].clone();
            tokio::time::sleep(Duration::from_millis(delay_ms)).await;
            response.ok_or(GeocodingError::NoResults)
        }
    }

    #[async_trait]
    impl Geocoder for ScriptedGeocoder {
        async fn from_lat_lng(
            &self,
            _latitude: f64,
            _longitude: f64,
        ) -> google_geocoding_client::Result<GeocodeResponse> {
            self.next().await
        }

        async fn from_address(
            &self,
            _address: &str,
        ) -> google_geocoding_client::Result<GeocodeResponse> {
            self.next().await
        }
    }

    fn address_response(route: &str, number: &str, postal: &str, town: &str) -> GeocodeResponse {
        serde_json::from_value(json!({
            "status": "OK",
            "results": [{
                "address_components": [
                    { "long_name": route, "types": ["route"] },
                    { "long_name": number, "types": ["street_number"] },
                    { "long_name": postal, "types": ["postal_code"] },
                    { "long_name": town, "types": ["locality", "political"] }
                ],
                "geometry": { "location": { "lat": 0.0, "lng": 0.0 } }
            }]
        }))
        .unwrap()
    }

    fn location_response(lat: f64, lng: f64) -> GeocodeResponse {
        serde_json::from_value(json!({
            "status": "OK",
            "results": [{
                "address_components": [],
                "geometry": { "location": { "lat": lat, "lng": lng } }
            }]
        }))
        .unwrap()
    }

    fn utc() -> Tz {
        Tz::UTC
    }

    fn empty_response() -> GeocodeResponse {
        serde_json::from_value(json!({ "status": "OK", "results": [] })).unwrap()
    }

    fn session_with(values: FormValues, geocoder: Arc<ScriptedGeocoder>) -> EntryFormSession {
        EntryFormSession::with_values(
            FormRoute::new(FormAction::New, Some("edit".to_string()), false),
            values,
            geocoder,
            utc(),
        )
    }

    fn at_coordinates(lat: &str, lng: &str) -> FormValues {
        FormValues {
            latitude: lat.to_string(),
            longitude: lng.to_string(),
            ..FormValues::default()
        }
    }

    #[tokio::test]
    async fn test_open_existing_binds_entry() {
        let store = InMemoryPathStore::with_entries(vec![Entry {
            time: 1_704_105_000_000,
            latitude: 48.2082,
            longitude: 16.3738,
            street: "Stephansplatz 1".to_string(),
            other: String::new(),
            town: "Wien".to_string(),
            postal: "1010".to_string(),
            comment: String::new(),
        }]);
        let route = FormRoute::new(FormAction::Existing(0), Some("edit".to_string()), false);

        let session = EntryFormSession::open(route, &store, ScriptedGeocoder::new(vec![]), utc())
            .await
            .unwrap();
        let values = session.values().await;
        assert_eq!(values.date, "2024-01-01");
        assert_eq!(values.time, "10:30");
        assert_eq!(values.town, "Wien");
    }

    #[tokio::test]
    async fn test_open_rejects_hidden_and_missing() {
        let store = InMemoryPathStore::new();

        let hidden = FormRoute::new(FormAction::New, Some("list".to_string()), false);
        let result =
            EntryFormSession::open(hidden, &store, ScriptedGeocoder::new(vec![]), utc()).await;
        assert_eq!(result.err(), Some(OpenError::NotVisible));

        let missing = FormRoute::new(FormAction::Existing(2), None, true);
        let result =
            EntryFormSession::open(missing, &store, ScriptedGeocoder::new(vec![]), utc()).await;
        assert_eq!(result.err(), Some(OpenError::EntryNotFound(2)));
    }

    #[tokio::test]
    async fn test_reverse_geocode_populates_address() {
        let geocoder = ScriptedGeocoder::new(vec![(
            0,
            Some(address_response("Via del Corso", "18", "00186", "Roma")),
        )]);
        let session = session_with(at_coordinates("41.9028", "12.4964"), geocoder);

        assert_eq!(session.reverse_geocode().await, ReconcileOutcome::Applied);
        let values = session.values().await;
        assert_eq!(values.street, "Via del Corso 18");
        assert_eq!(values.postal, "00186");
        assert_eq!(values.town, "Roma");
        assert_eq!(values.latitude, "41.9028");
    }

    #[tokio::test]
    async fn test_reverse_geocode_failure_leaves_form_untouched() {
        let geocoder = ScriptedGeocoder::new(vec![(0, None)]);
        let mut values = at_coordinates("41.9028", "12.4964");
        values.street = "Old street".to_string();
        let session = session_with(values.clone(), geocoder);

        assert_eq!(session.reverse_geocode().await, ReconcileOutcome::Failed);
        assert_eq!(session.values().await, values);
    }

    #[tokio::test]
    async fn test_empty_result_list_fails_both_directions() {
        let geocoder = ScriptedGeocoder::new(vec![(0, Some(empty_response()))]);
        let values = FormValues {
            latitude: "41.9028".to_string(),
            longitude: "12.4964".to_string(),
            street: "Old street".to_string(),
            town: "Roma".to_string(),
            ..FormValues::default()
        };
        let session = session_with(values.clone(), geocoder.clone());

        assert_eq!(session.reverse_geocode().await, ReconcileOutcome::Failed);
        assert_eq!(session.forward_geocode().await, ReconcileOutcome::Failed);
        assert_eq!(geocoder.calls.load(Ordering::SeqCst), 2);
        assert_eq!(session.values().await, values);
    }

    #[tokio::test]
    async fn test_reverse_geocode_skips_invalid_coordinates() {
        let geocoder = ScriptedGeocoder::new(vec![(
            0,
            Some(address_response("Nowhere", "1", "0000", "Void")),
        )]);
        let session = session_with(at_coordinates("123", "12"), geocoder.clone());

        assert_eq!(session.reverse_geocode().await, ReconcileOutcome::Failed);
        assert_eq!(geocoder.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_slow_reverse_result_does_not_overwrite_newer() {
        let geocoder = ScriptedGeocoder::new(vec![
            (50, Some(address_response("First", "1", "1111", "Slowtown"))),
            (10, Some(address_response("Second", "2", "2222", "Fastville"))),
        ]);
        let session = session_with(at_coordinates("10", "10"), geocoder);

        let (first, second) = tokio::join!(session.reverse_geocode(), session.reverse_geocode());
        assert_eq!(first, ReconcileOutcome::Superseded);
        assert_eq!(second, ReconcileOutcome::Applied);

        let values = session.values().await;
        assert_eq!(values.street, "Second 2");
        assert_eq!(values.town, "Fastville");
    }

    #[tokio::test(start_paused = true)]
    async fn test_user_edit_supersedes_pending_reverse() {
        let geocoder = ScriptedGeocoder::new(vec![(
            50,
            Some(address_response("Lookup", "9", "9999", "Lookupville")),
        )]);
        let session = session_with(at_coordinates("10", "10"), geocoder);

        let edit = async {
            tokio::time::sleep(Duration::from_millis(5)).await;
            session
                .apply_patch(FormPatch {
                    town: Some("Typed by hand".to_string()),
                    ..FormPatch::default()
                })
                .await
        };
        let (outcome, _) = tokio::join!(session.reverse_geocode(), edit);

        assert_eq!(outcome, ReconcileOutcome::Superseded);
        let values = session.values().await;
        assert_eq!(values.town, "Typed by hand");
        assert_eq!(values.street, "");
    }

    #[tokio::test]
    async fn test_forward_geocode_populates_coordinates() {
        let geocoder = ScriptedGeocoder::new(vec![(0, Some(location_response(59.3293, 18.0686)))]);
        let values = FormValues {
            street: "Drottninggatan 1".to_string(),
            town: "Stockholm".to_string(),
            ..FormValues::default()
        };
        let session = session_with(values, geocoder);

        assert_eq!(session.forward_geocode().await, ReconcileOutcome::Applied);
        let values = session.values().await;
        assert_eq!(values.latitude, "59.3293");
        assert_eq!(values.longitude, "18.0686");
    }

    #[tokio::test]
    async fn test_forward_geocode_empty_address_is_skipped() {
        let geocoder = ScriptedGeocoder::new(vec![(0, Some(location_response(1.0, 1.0)))]);
        let session = session_with(FormValues::default(), geocoder.clone());

        assert_eq!(session.forward_geocode().await, ReconcileOutcome::Failed);
        assert_eq!(geocoder.calls.load(Ordering::SeqCst), 0);
        assert_eq!(session.values().await.latitude, "");
    }

    #[tokio::test(start_paused = true)]
    async fn test_coordinate_edit_supersedes_pending_forward() {
        let geocoder = ScriptedGeocoder::new(vec![(50, Some(location_response(1.0, 2.0)))]);
        let values = FormValues {
            town: "Oslo".to_string(),
            ..FormValues::default()
        };
        let session = session_with(values, geocoder);

        let edit = async {
            tokio::time::sleep(Duration::from_millis(5)).await;
            session
                .apply_patch(FormPatch {
                    latitude: Some("59.91".to_string()),
                    longitude: Some("10.75".to_string()),
                    ..FormPatch::default()
                })
                .await
        };
        let (outcome, _) = tokio::join!(session.forward_geocode(), edit);

        assert_eq!(outcome, ReconcileOutcome::Superseded);
        let values = session.values().await;
        assert_eq!(values.latitude, "59.91");
        assert_eq!(values.longitude, "10.75");
    }

    #[tokio::test]
    async fn test_submit_coerces_and_dispatches() {
        let store = InMemoryPathStore::new();
        let session = session_with(FormValues::default(), ScriptedGeocoder::new(vec![]));
        session
            .apply_patch(FormPatch {
                date: Some("2024-01-01".to_string()),
                time: Some("10:30".to_string()),
                latitude: Some("60.1699".to_string()),
                longitude: Some("24.9384".to_string()),
                comment: Some("Harbour".to_string()),
                ..FormPatch::default()
            })
            .await;

        let submission = session.submit(&store).await.unwrap();
        assert_eq!(submission.entry.time, 1_704_105_000_000);
        assert_eq!(submission.entry.latitude, 60.1699);
        assert_eq!(submission.entry.longitude, 24.9384);
        assert_eq!(submission.redirect_to, "/");
        assert_eq!(store.entries().await.len(), 1);
    }

    #[tokio::test]
    async fn test_resubmit_keeps_exact_time_of_existing_entry() {
        let entry = Entry {
            // 2024-01-01T10:30:15.500Z
            time: 1_704_105_015_500,
            latitude: 48.2082,
            longitude: 16.3738,
            street: "Stephansplatz 1".to_string(),
            other: String::new(),
            town: "Wien".to_string(),
            postal: "1010".to_string(),
            comment: String::new(),
        };
        let store = InMemoryPathStore::with_entries(vec![entry]);
        let route = FormRoute::new(FormAction::Existing(0), Some("edit".to_string()), false);
        let session = EntryFormSession::open(route, &store, ScriptedGeocoder::new(vec![]), utc())
            .await
            .unwrap();

        session
            .apply_patch(FormPatch {
                comment: Some("Cathedral".to_string()),
                ..FormPatch::default()
            })
            .await;
        session.submit(&store).await.unwrap();

        let stored = store.entry(0).await.unwrap();
        assert_eq!(stored.time, 1_704_105_015_500);
        assert_eq!(stored.comment, "Cathedral");
    }
}
