use std::fmt;

/// Errors from the Google geocoding client
#[derive(Debug)]
pub enum GeocodingError {
    InvalidCoordinates(f64, f64),
    EmptyAddress,
    Http(reqwest::Error),
    /// Provider answered `ZERO_RESULTS`
    NoResults,
    /// Non-success HTTP status or a provider status other than `OK`
    Api {
        status: String,
        message: Option<String>,
    },
}

impl fmt::Display for GeocodingError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidCoordinates(lat, lng) => {
                write!(f, "Invalid coordinates: {lat}, {lng}")
            }
            Self::EmptyAddress => write!(f, "Address is empty"),
            Self::Http(e) => write!(f, "HTTP error: {e}"),
            Self::NoResults => write!(f, "No geocoding results"),
            Self::Api {
                status,
                message: Some(msg),
            } => write!(f, "API error: {status}: {msg}"),
            Self::Api {
                status,
                message: None,
            } => write!(f, "API error: {status}"),
        }
    }
}

impl std::error::Error for GeocodingError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Http(e) => Some(e),
            _ => None,
        }
    }
}

impl From<reqwest::Error> for GeocodingError {
    fn from(err: reqwest::Error) -> Self {
        Self::Http(err)
    }
}

pub type Result<T> = std::result::Result<T, GeocodingError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_api_error_display() {
        let err = GeocodingError::Api {
            status: "REQUEST_DENIED".to_string(),
            message: Some("The provided API key is invalid.".to_string()),
        };
        assert_eq!(
            err.to_string(),
            "API error: REQUEST_DENIED: The provided API key is invalid."
        );

        let err = GeocodingError::Api {
            status: "OVER_QUERY_LIMIT".to_string(),
            message: None,
        };
        assert_eq!(err.to_string(), "API error: OVER_QUERY_LIMIT");
    }

    #[test]
    fn test_invalid_coordinates_display() {
        let err = GeocodingError::InvalidCoordinates(91.0, 10.5);
        assert_eq!(err.to_string(), "Invalid coordinates: 91, 10.5");
    }
}
