use std::fmt;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::enums::Term;
use crate::errors::DomainError;

/// Academic year plus term. Conflicts are only ever checked within one period.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, JsonSchema)]
pub struct AcademicPeriod {
    pub year: i32,
    pub term: Term,
}

impl AcademicPeriod {
    #[must_use]
    pub const fn of(year: i32, term: Term) -> Self {
        Self { year, term }
    }

    /// Build a period from a raw term number.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Validation` unless `term` is 1 or 2.
    pub fn new(year: i32, term: i64) -> Result<Self, DomainError> {
        Ok(Self {
            year,
            term: Term::from_number(term)?,
        })
    }
}

impl fmt::Display for AcademicPeriod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/T{}", self.year, self.term)
    }
}
