use std::fmt::{self, Debug, Display};
use std::io;

use crate::hospital::{PersonId, WardId};

/// Provides `SimError` and maps other errors to
/// convert to a `SimError`
#[derive(Debug)]
#[allow(clippy::module_name_repetitions)]
pub enum SimError {
    IoError(io::Error),
    JsonError(serde_json::Error),
    CsvError(csv::Error),
    UnknownWard(WardId),
    UnknownWardName(String),
    UnknownPerson(PersonId),
    InvalidParameter(String),
    ReportError(String),
    ConfigError(String),
}

impl From<io::Error> for SimError {
    fn from(error: io::Error) -> Self {
        SimError::IoError(error)
    }
}

impl From<serde_json::Error> for SimError {
    fn from(error: serde_json::Error) -> Self {
        SimError::JsonError(error)
    }
}

impl From<csv::Error> for SimError {
    fn from(error: csv::Error) -> Self {
        SimError::CsvError(error)
    }
}

impl From<String> for SimError {
    fn from(error: String) -> Self {
        SimError::ConfigError(error)
    }
}

impl From<&str> for SimError {
    fn from(error: &str) -> Self {
        SimError::ConfigError(error.to_string())
    }
}

impl std::error::Error for SimError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            SimError::IoError(error) => Some(error),
            SimError::JsonError(error) => Some(error),
            SimError::CsvError(error) => Some(error),
            _ => None,
        }
    }
}

impl Display for SimError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            SimError::IoError(error) => write!(f, "I/O error: {error}"),
            SimError::JsonError(error) => write!(f, "JSON error: {error}"),
            SimError::CsvError(error) => write!(f, "CSV error: {error}"),
            SimError::UnknownWard(ward_id) => write!(f, "unknown ward: {ward_id}"),
            SimError::UnknownWardName(name) => write!(f, "no ward named {name:?}"),
            SimError::UnknownPerson(person_id) => write!(f, "unknown person: {person_id}"),
            SimError::InvalidParameter(message) => write!(f, "invalid parameter: {message}"),
            SimError::ReportError(message) => write!(f, "report error: {message}"),
            SimError::ConfigError(message) => write!(f, "configuration error: {message}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_names_the_ward() {
        let error = SimError::UnknownWard(WardId(3));
        assert_eq!(error.to_string(), "unknown ward: Ward 3");
    }

    #[test]
    fn io_errors_keep_their_source() {
        let error: SimError = io::Error::new(io::ErrorKind::NotFound, "missing").into();
        assert!(std::error::Error::source(&error).is_some());
        assert!(matches!(error, SimError::IoError(_)));
    }

    #[test]
    fn strings_become_config_errors() {
        let error: SimError = "no wards".into();
        assert_eq!(error.to_string(), "configuration error: no wards");
    }
}
