//! Status enums mapping to SMALLINT lookup tables.
//!
//! Each variant's discriminant matches the seed data in the corresponding
//! `*_statuses` table, and its name matches the `name` column.

use serde::{Deserialize, Serialize};

/// Status ID type matching SMALLINT in the database.
pub type StatusId = i16;

macro_rules! define_status_enum {
    (
        $(#[$meta:meta])*
        $name:ident {
            $( $(#[$vmeta:meta])* $variant:ident = $val:expr ),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[repr(i16)]
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        pub enum $name {
            $( $(#[$vmeta])* $variant = $val ),+
        }

        impl $name {
            /// Return the database status ID.
            pub fn id(self) -> StatusId {
                self as StatusId
            }

            /// Return the seeded status name.
            pub fn name(self) -> &'static str {
                match self {
                    $( $name::$variant => stringify!($variant) ),+
                }
            }

            /// Look up a variant by its database status ID.
            pub fn from_id(id: StatusId) -> Option<Self> {
                match id {
                    $( x if x == $val => Some($name::$variant), )+
                    _ => None,
                }
            }
        }

        impl From<$name> for StatusId {
            fn from(value: $name) -> Self {
                value as StatusId
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.name())
            }
        }

        impl std::str::FromStr for $name {
            type Err = crate::error::CoreError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $( stringify!($variant) => Ok($name::$variant), )+
                    other => Err(crate::error::CoreError::Validation(format!(
                        "Unknown {} '{other}'",
                        stringify!($name)
                    ))),
                }
            }
        }
    };
}

define_status_enum! {
    /// Lifecycle of an enrollment row.
    EnrollmentStatus {
        Enrolled = 1,
        Waitlisted = 2,
        Dropped = 3,
    }
}

impl EnrollmentStatus {
    /// Enrolled and Waitlisted rows count towards the one-active-row rule.
    pub fn is_active(self) -> bool {
        matches!(self, EnrollmentStatus::Enrolled | EnrollmentStatus::Waitlisted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_match_seed_order() {
        assert_eq!(EnrollmentStatus::Enrolled.id(), 1);
        assert_eq!(EnrollmentStatus::Waitlisted.id(), 2);
        assert_eq!(EnrollmentStatus::Dropped.id(), 3);
        assert_eq!(EnrollmentStatus::from_id(2), Some(EnrollmentStatus::Waitlisted));
        assert_eq!(EnrollmentStatus::from_id(0), None);
    }

    #[test]
    fn parses_seeded_names() {
        assert_eq!(
            "Dropped".parse::<EnrollmentStatus>().unwrap(),
            EnrollmentStatus::Dropped
        );
        assert!("dropped".parse::<EnrollmentStatus>().is_err());
    }

    #[test]
    fn display_matches_seed_name() {
        assert_eq!(EnrollmentStatus::Waitlisted.to_string(), "Waitlisted");
    }

    #[test]
    fn only_enrolled_and_waitlisted_are_active() {
        assert!(EnrollmentStatus::Enrolled.is_active());
        assert!(EnrollmentStatus::Waitlisted.is_active());
        assert!(!EnrollmentStatus::Dropped.is_active());
    }
}
