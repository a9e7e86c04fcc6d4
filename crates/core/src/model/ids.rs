use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Error type for parsing an ID from a string
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseIdError {
    kind: &'static str,
}

impl fmt::Display for ParseIdError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "failed to parse {} from string", self.kind)
    }
}

impl std::error::Error for ParseIdError {}

// Rows in the hosted store are keyed by UUID strings, but lesson content also
// carries short hand-written ids ("1", "2", ...) for options, so ids stay opaque.
macro_rules! string_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            #[must_use]
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            /// Creates a fresh random (v4 UUID) id.
            #[must_use]
            pub fn generate() -> Self {
                Self(uuid::Uuid::new_v4().to_string())
            }

            #[must_use]
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}({})", stringify!($name), self.0)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl FromStr for $name {
            type Err = ParseIdError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                let trimmed = s.trim();
                if trimmed.is_empty() {
                    return Err(ParseIdError {
                        kind: stringify!($name),
                    });
                }
                Ok(Self(trimmed.to_string()))
            }
        }

        impl From<&str> for $name {
            fn from(value: &str) -> Self {
                Self::new(value)
            }
        }

        impl From<String> for $name {
            fn from(value: String) -> Self {
                Self(value)
            }
        }
    };
}

string_id! {
    /// Unique identifier for an Activity
    ActivityId
}

string_id! {
    /// Identifier of a choice option, unique within one activity
    OptionId
}

string_id! {
    /// Unique identifier for a Lesson
    LessonId
}

string_id! {
    /// Unique identifier for a Level (a lesson group inside a branch)
    LevelId
}

string_id! {
    /// Unique identifier for a child profile
    ChildId
}

string_id! {
    /// Unique identifier for a Family
    FamilyId
}

string_id! {
    /// Auth user id; doubles as the `profiles` row id
    ProfileId
}

string_id! {
    /// Unique identifier for a Skill
    SkillId
}

// ─── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn activity_id_display() {
        let id = ActivityId::new("a-42");
        assert_eq!(id.to_string(), "a-42");
        assert_eq!(format!("{id:?}"), "ActivityId(a-42)");
    }

    #[test]
    fn lesson_id_from_str_trims() {
        let id: LessonId = "  lesson-1 ".parse().unwrap();
        assert_eq!(id, LessonId::new("lesson-1"));
    }

    #[test]
    fn empty_id_is_rejected() {
        let result = "   ".parse::<ChildId>();
        assert!(result.is_err());
        assert_eq!(
            result.unwrap_err().to_string(),
            "failed to parse ChildId from string"
        );
    }

    #[test]
    fn generated_ids_are_distinct() {
        assert_ne!(FamilyId::generate(), FamilyId::generate());
    }

    #[test]
    fn ids_serialize_as_plain_strings() {
        let json = serde_json::to_string(&OptionId::new("2")).unwrap();
        assert_eq!(json, "\"2\"");
        let back: OptionId = serde_json::from_str(&json).unwrap();
        assert_eq!(back, OptionId::new("2"));
    }
}
