use chrono_tz::Tz;
use tracing::{error, info};

use crate::entry::Entry;
use crate::form::{BoundTime, FormAction, FormValues};
use crate::store::EntryStore;
use crate::validation::{validate_form, FieldErrors};

/// Where the editor goes after every submit
pub const HOME_ROUTE: &str = "/";

/// Result of a submit that passed validation
#[derive(Debug, Clone, PartialEq)]
pub struct Submission {
    pub entry: Entry,
    /// Whether the store accepted the entry
    pub stored: bool,
    pub redirect_to: &'static str,
}

/// Build the record the store receives: date and time folded into one
/// timestamp, coordinates coerced to numbers.
///
/// `bound` keeps the seconds of an edited entry whose date and time were
/// left as bound.
pub fn assemble_entry(
    values: &FormValues,
    tz: Tz,
    bound: Option<&BoundTime>,
) -> Result<Entry, FieldErrors> {
    let validated = validate_form(values, tz)?;
    let time = bound
        .and_then(|b| b.resolve(values))
        .unwrap_or(validated.time);

    Ok(Entry {
        time,
        latitude: validated.latitude,
        longitude: validated.longitude,
        street: values.street.clone(),
        other: values.other.clone(),
        town: values.town.clone(),
        postal: values.postal.clone(),
        comment: values.comment.clone(),
    })
}

/// Validate, dispatch to `store`, then navigate home.
///
/// Validation errors stop before dispatch. A store failure is logged and the
/// editor still navigates away.
pub async fn submit_entry(
    store: &dyn EntryStore,
    action: FormAction,
    values: &FormValues,
    tz: Tz,
    bound: Option<&BoundTime>,
) -> Result<Submission, FieldErrors> {
    let entry = assemble_entry(values, tz, bound)?;

    let stored = match store.edit_path_entry(action, entry.clone()).await {
        Ok(()) => {
            info!(%action, time = entry.time, "Path entry saved");
            true
        }
        Err(e) => {
            error!(%action, error = %e, "Failed to save path entry");
            false
        }
    };

    Ok(Submission {
        entry,
        stored,
        redirect_to: HOME_ROUTE,
    })
}
