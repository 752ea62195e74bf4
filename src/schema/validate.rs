use super::types::{CsvColumnSet, CRSID, EMAIL, FIRST_NAME, LAST_NAME, NAME};
use crate::error::ValidationError;

/// Check that a CSV column set identifies people exactly one way and names them exactly one way.
///
/// - exactly one of `email` / `crsid`
/// - either `name`, or both `first_name` and `last_name`, never a mix
pub fn validate(columns: &CsvColumnSet) -> Result<(), ValidationError> {
    if columns.contains(EMAIL) == columns.contains(CRSID) {
        return Err(ValidationError::MissingOrDuplicateIdentifier);
    }

    let combined = columns.contains(NAME);
    let first = columns.contains(FIRST_NAME);
    let last = columns.contains(LAST_NAME);
    if !(combined ^ first) || !(combined ^ last) {
        return Err(ValidationError::MissingOrDuplicateName);
    }

    Ok(())
}
