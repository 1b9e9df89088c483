//! Form buffer and routing context for the entry editor

use std::fmt;
use std::str::FromStr;

use chrono::DateTime;
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use tracing::warn;
use ts_rs::TS;

use crate::entry::Entry;

pub const DATE_FORMAT: &str = "%Y-%m-%d";
pub const TIME_FORMAT: &str = "%H:%M";

/// Which entry the form is editing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormAction {
    New,
    /// Position of the entry in the path
    Existing(usize),
}

impl FromStr for FormAction {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s == "new" {
            return Ok(Self::New);
        }
        s.parse::<usize>()
            .map(Self::Existing)
            .map_err(|_| format!("Invalid form action: {s}"))
    }
}

impl fmt::Display for FormAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::New => write!(f, "new"),
            Self::Existing(index) => write!(f, "{index}"),
        }
    }
}

/// Route parameters the form is opened with
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormRoute {
    pub action: FormAction,
    pub page: Option<String>,
    /// Rendered inside another view rather than on its own page
    pub inline: bool,
}

impl FormRoute {
    pub fn new(action: FormAction, page: Option<String>, inline: bool) -> Self {
        Self {
            action,
            page,
            inline,
        }
    }

    /// Only the edit page or an inline embedding shows the form
    pub fn is_visible(&self) -> bool {
        self.inline || self.page.as_deref() == Some("edit")
    }

    pub fn submit_label(&self) -> &'static str {
        match self.action {
            FormAction::New => "Add to tracks",
            FormAction::Existing(_) => "Update",
        }
    }
}

/// Field names as they appear in the form and in field errors
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, TS)]
#[serde(rename_all = "lowercase")]
#[ts(export, export_to = "bindings/")]
pub enum Field {
    Date,
    Time,
    Latitude,
    Longitude,
    Street,
    Other,
    Town,
    Postal,
    Comment,
}

impl Field {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Date => "date",
            Self::Time => "time",
            Self::Latitude => "latitude",
            Self::Longitude => "longitude",
            Self::Street => "street",
            Self::Other => "other",
            Self::Town => "town",
            Self::Postal => "postal",
            Self::Comment => "comment",
        }
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Transient form buffer. Every field holds the raw user input.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase", default)]
#[ts(export, export_to = "bindings/")]
pub struct FormValues {
    pub date: String,
    pub time: String,
    pub latitude: String,
    pub longitude: String,
    pub street: String,
    pub other: String,
    pub town: String,
    pub postal: String,
    pub comment: String,
}

impl FormValues {
    /// Initial form contents for `action`.
    ///
    /// Editing an existing entry splits its timestamp into a date and a time
    /// field in `tz`. A new entry starts blank even when a record is
    /// supplied.
    pub fn bind(action: FormAction, initial: Option<&Entry>, tz: Tz) -> Self {
        let entry = match (action, initial) {
            (FormAction::Existing(_), Some(entry)) => entry,
            _ => return Self::default(),
        };

        let (date, time) = match DateTime::from_timestamp_millis(entry.time) {
            Some(utc) => {
                let local = utc.with_timezone(&tz);
                (
                    local.format(DATE_FORMAT).to_string(),
                    local.format(TIME_FORMAT).to_string(),
                )
            }
            None => {
                warn!(time = entry.time, "Entry timestamp out of range");
                (String::new(), String::new())
            }
        };

        Self {
            date,
            time,
            latitude: entry.latitude.to_string(),
            longitude: entry.longitude.to_string(),
            street: entry.street.clone(),
            other: entry.other.clone(),
            town: entry.town.clone(),
            postal: entry.postal.clone(),
            comment: entry.comment.clone(),
        }
    }

    pub fn get(&self, field: Field) -> &str {
        match field {
            Field::Date => &self.date,
            Field::Time => &self.time,
            Field::Latitude => &self.latitude,
            Field::Longitude => &self.longitude,
            Field::Street => &self.street,
            Field::Other => &self.other,
            Field::Town => &self.town,
            Field::Postal => &self.postal,
            Field::Comment => &self.comment,
        }
    }

    pub fn set(&mut self, field: Field, value: String) {
        let slot = match field {
            Field::Date => &mut self.date,
            Field::Time => &mut self.time,
            Field::Latitude => &mut self.latitude,
            Field::Longitude => &mut self.longitude,
            Field::Street => &mut self.street,
            Field::Other => &mut self.other,
            Field::Town => &mut self.town,
            Field::Postal => &mut self.postal,
            Field::Comment => &mut self.comment,
        };
        *slot = value;
    }
}

/// Exact timestamp of the entry a form was bound from.
///
/// The time field only shows minutes. While the date and time fields still
/// read what was bound, submitting keeps this instant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BoundTime {
    date: String,
    time: String,
    millis: i64,
}

impl BoundTime {
    pub fn new(values: &FormValues, entry: &Entry) -> Self {
        Self {
            date: values.date.clone(),
            time: values.time.clone(),
            millis: entry.time,
        }
    }

    /// The bound instant, if `values` still shows the bound date and time
    pub fn resolve(&self, values: &FormValues) -> Option<i64> {
        let unchanged = !self.date.is_empty()
            && values.date.trim() == self.date
            && values.time.trim() == self.time;
        unchanged.then_some(self.millis)
    }
}

/// Partial update of the form; absent fields are left untouched
#[derive(Debug, Clone, Default, Deserialize, TS)]
#[serde(rename_all = "camelCase", default)]
#[ts(export, export_to = "bindings/")]
pub struct FormPatch {
    #[ts(optional)]
    pub date: Option<String>,
    #[ts(optional)]
    pub time: Option<String>,
    #[ts(optional)]
    pub latitude: Option<String>,
    #[ts(optional)]
    pub longitude: Option<String>,
    #[ts(optional)]
    pub street: Option<String>,
    #[ts(optional)]
    pub other: Option<String>,
    #[ts(optional)]
    pub town: Option<String>,
    #[ts(optional)]
    pub postal: Option<String>,
    #[ts(optional)]
    pub comment: Option<String>,
}

impl FormPatch {
    /// Fields this patch sets, paired with their new values
    pub fn into_updates(self) -> Vec<(Field, String)> {
        [
            (Field::Date, self.date),
            (Field::Time, self.time),
            (Field::Latitude, self.latitude),
            (Field::Longitude, self.longitude),
            (Field::Street, self.street),
            (Field::Other, self.other),
            (Field::Town, self.town),
            (Field::Postal, self.postal),
            (Field::Comment, self.comment),
        ]
        .into_iter()
        .filter_map(|(field, value)| value.map(|v| (field, v)))
        .collect()
    }
}
