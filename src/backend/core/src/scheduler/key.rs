//! Job and trigger identities.
//!
//! Both keys are `(name, group)` pairs. The textual form is `group.name`;
//! parsing splits on the first `.` and falls back to [`DEFAULT_GROUP`] when
//! no group is given, so `"SampleJob"` and `"DEFAULT.SampleJob"` name the same
//! job.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

use crate::error::{CadenceError, ErrorCode};

/// Group used when a key does not name one.
pub const DEFAULT_GROUP: &str = "DEFAULT";

const SEPARATOR: char = '.';

/// Failure to parse a key string.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum KeyError {
    #[error("{kind} key must not be empty")]
    Empty { kind: &'static str },

    #[error("{kind} key '{raw}' has an empty {part}")]
    EmptyPart {
        kind: &'static str,
        raw: String,
        part: &'static str,
    },
}

impl KeyError {
    fn kind(&self) -> &'static str {
        match self {
            Self::Empty { kind } | Self::EmptyPart { kind, .. } => kind,
        }
    }
}

impl From<KeyError> for CadenceError {
    fn from(error: KeyError) -> Self {
        let code = if error.kind() == "trigger" {
            ErrorCode::InvalidTriggerKey
        } else {
            ErrorCode::InvalidJobKey
        };
        CadenceError::new(code, error.to_string()).with_source(error)
    }
}

fn split_key(raw: &str, kind: &'static str) -> Result<(String, String), KeyError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(KeyError::Empty { kind });
    }

    let (group, name) = match trimmed.split_once(SEPARATOR) {
        Some((group, name)) => (group.trim(), name.trim()),
        None => (DEFAULT_GROUP, trimmed),
    };

    if group.is_empty() {
        return Err(KeyError::EmptyPart {
            kind,
            raw: raw.to_string(),
            part: "group",
        });
    }
    if name.is_empty() {
        return Err(KeyError::EmptyPart {
            kind,
            raw: raw.to_string(),
            part: "name",
        });
    }

    Ok((name.to_string(), group.to_string()))
}

macro_rules! define_key {
    ($(#[$meta:meta])* $name:ident, $kind:literal) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        pub struct $name {
            // Field order gives (group, name) sorting.
            pub group: String,
            pub name: String,
        }

        impl $name {
            pub fn new(name: impl Into<String>, group: impl Into<String>) -> Self {
                Self {
                    group: group.into(),
                    name: name.into(),
                }
            }

            /// Key in the default group.
            pub fn with_default_group(name: impl Into<String>) -> Self {
                Self::new(name, DEFAULT_GROUP)
            }

            /// Parse `group.name` or a bare `name`.
            pub fn parse(raw: &str) -> Result<Self, KeyError> {
                let (name, group) = split_key(raw, $kind)?;
                Ok(Self { group, name })
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}{}{}", self.group, SEPARATOR, self.name)
            }
        }

        impl FromStr for $name {
            type Err = KeyError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Self::parse(s)
            }
        }
    };
}

define_key!(
    /// Identity of a job.
    JobKey,
    "job"
);

define_key!(
    /// Identity of a trigger.
    TriggerKey,
    "trigger"
);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bare_name_uses_default_group() {
        let key = JobKey::parse("SampleJob").unwrap();
        assert_eq!(key, JobKey::new("SampleJob", DEFAULT_GROUP));
        assert_eq!(key.to_string(), "DEFAULT.SampleJob");
    }

    #[test]
    fn test_qualified_key() {
        let key = TriggerKey::parse("reports.nightly-trigger").unwrap();
        assert_eq!(key.group, "reports");
        assert_eq!(key.name, "nightly-trigger");
    }

    #[test]
    fn test_split_on_first_separator() {
        let key = JobKey::parse("etl.daily.load").unwrap();
        assert_eq!(key.group, "etl");
        assert_eq!(key.name, "daily.load");
    }

    #[test]
    fn test_display_round_trips() {
        let key = JobKey::new("SampleJob", "DEFAULT");
        assert_eq!(key.to_string().parse::<JobKey>().unwrap(), key);
    }

    #[test]
    fn test_invalid_keys() {
        assert_eq!(JobKey::parse("  "), Err(KeyError::Empty { kind: "job" }));
        assert!(matches!(
            JobKey::parse(".SampleJob"),
            Err(KeyError::EmptyPart { part: "group", .. })
        ));
        assert!(matches!(
            TriggerKey::parse("DEFAULT."),
            Err(KeyError::EmptyPart { part: "name", .. })
        ));
    }

    #[test]
    fn test_key_error_maps_to_validation() {
        let error: CadenceError = TriggerKey::parse("").unwrap_err().into();
        assert_eq!(error.code(), ErrorCode::InvalidTriggerKey);
        assert_eq!(error.http_status().as_u16(), 400);
    }

    #[test]
    fn test_keys_sort_by_group_then_name() {
        let mut keys = vec![
            JobKey::new("b", "DEFAULT"),
            JobKey::new("a", "reports"),
            JobKey::new("a", "DEFAULT"),
        ];
        keys.sort();
        let rendered: Vec<String> = keys.iter().map(|k| k.to_string()).collect();
        assert_eq!(rendered, vec!["DEFAULT.a", "DEFAULT.b", "reports.a"]);
    }
}
