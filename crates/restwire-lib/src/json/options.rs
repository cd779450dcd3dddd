//! Mapper options: leniency flags, null inclusion and the date format.

use serde::{Deserialize, Serialize};

use crate::timepoint::{self, TimepointError, TIME_POINT_OUTPUT_FORMAT};

/// Which struct fields are written on output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Inclusion {
    /// Write every field, nulls included.
    Always,
    /// Omit struct fields whose value is null.
    #[default]
    NonNull,
}

/// Options consulted by a [`Mapper`](super::Mapper) on every call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MapperOptions {
    /// An empty string bound to a non-textual target yields null instead of failing.
    pub accept_empty_string_as_null: bool,
    /// Fail when a value has no properties instead of writing `{}`.
    pub fail_on_empty_beans: bool,
    /// Fail when the input names a property the target struct does not declare.
    pub fail_on_unknown_properties: bool,
    pub inclusion: Inclusion,
    /// `strftime` pattern for time points, rendered in UTC.
    pub date_format: String,
    /// Pretty-print output.
    pub indent_output: bool,
}

impl Default for MapperOptions {
    fn default() -> Self {
        Self {
            accept_empty_string_as_null: true,
            fail_on_empty_beans: false,
            fail_on_unknown_properties: false,
            inclusion: Inclusion::NonNull,
            date_format: TIME_POINT_OUTPUT_FORMAT.into(),
            indent_output: false,
        }
    }
}

impl MapperOptions {
    /// Reject a date format that cannot render a time point.
    pub fn validate(&self) -> Result<(), TimepointError> {
        timepoint::validate_format(&self.date_format)
    }

    pub(crate) fn omit_nulls(&self) -> bool {
        self.inclusion == Inclusion::NonNull
    }
}
