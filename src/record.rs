//! Shared plumbing for the data containers: symbolic field access, JSON
//! rendering and the `Report<T>` aggregate.

use std::fmt;
use std::str::FromStr;

use serde::ser::SerializeStruct;
use serde::{Serialize, Serializer};

use crate::error::AurionError;

/// Declare a closed field enum with its wire names.
macro_rules! field_enum {
    ($(#[$meta:meta])* $vis:vis enum $name:ident { $($variant:ident => $key:literal),+ $(,)? }) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        $vis enum $name {
            $($variant),+
        }

        impl $name {
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            pub fn as_str(self) -> &'static str {
                match self {
                    $($name::$variant => $key),+
                }
            }
        }

        impl ::std::str::FromStr for $name {
            type Err = $crate::error::AurionError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($key => Ok($name::$variant),)+
                    other => Err($crate::error::AurionError::UnknownField(format!(
                        "{other} (expected one of: {})",
                        [$($key),+].join(", ")
                    ))),
                }
            }
        }

        impl ::std::fmt::Display for $name {
            fn fmt(&self, f: &mut ::std::fmt::Formatter<'_>) -> ::std::fmt::Result {
                f.write_str(self.as_str())
            }
        }
    };
}

pub(crate) use field_enum;

/// A container whose fields can be read by symbolic name.
pub trait Record: Serialize {
    type Field: FromStr<Err = AurionError> + Copy;

    fn get(&self, field: Self::Field) -> String;

    fn get_named(&self, name: &str) -> Result<String, AurionError> {
        let field = name.parse::<Self::Field>()?;
        Ok(self.get(field))
    }

    /// Pretty-printed JSON.
    fn to_json(&self) -> Result<String, AurionError> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

/// Ordered entries of one fetch. The total is always the number of
/// entries; it is computed, never stored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Report<T> {
    entries: Vec<T>,
}

impl<T> Report<T> {
    pub fn new(entries: Vec<T>) -> Self {
        Self { entries }
    }

    pub fn total_entries(&self) -> usize {
        self.entries.len()
    }

    pub fn entries(&self) -> &[T] {
        &self.entries
    }

    pub fn into_entries(self) -> Vec<T> {
        self.entries
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, T> {
        self.entries.iter()
    }

    /// Append the entries of another page.
    pub fn merge(&mut self, other: Report<T>) {
        self.entries.extend(other.entries);
    }
}

impl<T> Default for Report<T> {
    fn default() -> Self {
        Self::new(Vec::new())
    }
}

impl<T> From<Vec<T>> for Report<T> {
    fn from(entries: Vec<T>) -> Self {
        Self::new(entries)
    }
}

impl<T> FromIterator<T> for Report<T> {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}

impl<'a, T> IntoIterator for &'a Report<T> {
    type Item = &'a T;
    type IntoIter = std::slice::Iter<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}

impl<T: Serialize> Serialize for Report<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut state = serializer.serialize_struct("Report", 2)?;
        state.serialize_field("totalEntries", &self.total_entries())?;
        state.serialize_field("entries", &self.entries)?;
        state.end()
    }
}

impl<T: Serialize> Report<T> {
    pub fn to_json(&self) -> Result<String, AurionError> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

field_enum! {
    pub enum ReportField {
        TotalEntries => "totalEntries",
        Entries => "entries",
    }
}

impl<T: Serialize> Record for Report<T> {
    type Field = ReportField;

    /// `entries` renders as a compact JSON array.
    fn get(&self, field: ReportField) -> String {
        match field {
            ReportField::TotalEntries => self.total_entries().to_string(),
            // Entry containers only hold strings and flags, so this cannot fail.
            ReportField::Entries => serde_json::to_string(&self.entries).unwrap_or_default(),
        }
    }
}

impl<T: fmt::Display> fmt::Display for Report<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Report(totalEntries={}, entries=[", self.total_entries())?;
        for (i, entry) in self.entries.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{entry}")?;
        }
        f.write_str("])")
    }
}
