//! Path Entry Editor
//!
//! Form model for creating and editing one entry of a tracked path: binding
//! the form from a stored entry, validating coordinates, reconciling address
//! and coordinates through a geocoding provider, and submitting the result
//! back to the entry store.

pub mod entry;
pub mod form;
pub mod reconcile;
pub mod session;
pub mod store;
pub mod submit;
pub mod validation;

pub use entry::Entry;
pub use form::{BoundTime, Field, FormAction, FormPatch, FormRoute, FormValues};
pub use reconcile::{AddressFields, Geocoder, ReconcileOutcome};
pub use session::{EntryFormSession, OpenError};
pub use store::{EntryStore, InMemoryPathStore, StoreError};
pub use submit::{Submission, HOME_ROUTE};
pub use validation::{FieldError, FieldErrors, ValidatedForm};
