//! Input validation utilities.
//!
//! The cohort form constrains ages to 0-120. An inverted range (`min > max`) is rejected rather
//! than silently swapped or submitted.

use crate::constants::MAX_AGE;
use crate::{CohortError, CohortResult};

/// Validates a single age bound.
///
/// # Errors
///
/// Returns [`CohortError::AgeOutOfBounds`] if `age` exceeds [`MAX_AGE`].
pub fn validate_age(age: u32) -> CohortResult<()> {
    if age > MAX_AGE {
        return Err(CohortError::AgeOutOfBounds(age));
    }
    Ok(())
}

/// Validates an age range.
///
/// # Errors
///
/// Returns a `CohortError` if:
/// - either bound exceeds [`MAX_AGE`] ([`CohortError::AgeOutOfBounds`]),
/// - `min` is greater than `max` ([`CohortError::InvalidAgeRange`]).
pub fn validate_age_range(min: u32, max: u32) -> CohortResult<()> {
    validate_age(min)?;
    validate_age(max)?;

    if min > max {
        return Err(CohortError::InvalidAgeRange { min, max });
    }

    Ok(())
}
