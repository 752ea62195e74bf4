use std::collections::HashSet;

use tracing::debug;

use super::types::{
    CsvColumnSet, TableColumnList, CRSID, EMAIL, FIRST_NAME, IDENTITY_COLUMN, LAST_NAME,
    MAX_IDENTIFIER_LEN, NAME,
};
use crate::error::SchemaError;

/// On create the file defines the table: its columns are taken as-is.
pub fn resolve_create_columns(csv_columns: &CsvColumnSet) -> Vec<String> {
    csv_columns.ordered().to_vec()
}

/// On update the table defines what gets written: every column it already has
/// must be fillable from the CSV, otherwise the whole import is refused.
pub fn resolve_update_columns(
    table_columns: &TableColumnList,
    csv_columns: &CsvColumnSet,
) -> Result<Vec<String>, SchemaError> {
    let mut resolved = Vec::with_capacity(table_columns.columns().len());

    for column in table_columns.columns() {
        let satisfiable = match column.as_str() {
            EMAIL => csv_columns.contains(EMAIL) || csv_columns.contains(CRSID),
            FIRST_NAME | LAST_NAME => csv_columns.contains(column) || csv_columns.contains(NAME),
            other => csv_columns.contains(other),
        };
        if !satisfiable {
            return Err(SchemaError::UnsatisfiableColumn(column.clone()));
        }
        resolved.push(column.clone());
    }

    debug!(columns = ?resolved, "resolved update columns");
    Ok(resolved)
}

/// Physical table columns produced from logical CSV columns, identity column excluded.
///
/// `crsid`/`email` become a single `email`, `name` becomes `first_name` + `last_name`.
/// The result is ordered `email`, `first_name`, `last_name`, then every other
/// column in CSV order. Names longer than PostgreSQL stores unchanged are rejected.
pub fn table_columns_for(logical: &[String]) -> Result<Vec<String>, SchemaError> {
    let mut identity: Vec<&str> = Vec::new();
    let mut names: Vec<&str> = Vec::new();
    let mut rest: Vec<&str> = Vec::new();

    for column in logical {
        match column.as_str() {
            EMAIL | CRSID => identity.push(EMAIL),
            NAME => names.extend([FIRST_NAME, LAST_NAME]),
            FIRST_NAME => names.push(FIRST_NAME),
            LAST_NAME => names.push(LAST_NAME),
            other => rest.push(other),
        }
    }
    names.sort_by_key(|n| *n != FIRST_NAME);

    let mut seen = HashSet::new();
    let mut out = Vec::with_capacity(identity.len() + names.len() + rest.len());
    for column in identity.into_iter().chain(names).chain(rest) {
        if column.len() > MAX_IDENTIFIER_LEN {
            return Err(SchemaError::IdentifierTooLong(column.to_string()));
        }
        if column == IDENTITY_COLUMN || !seen.insert(column) {
            return Err(SchemaError::DuplicateColumn(column.to_string()));
        }
        out.push(column.to_string());
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn csv(names: &[&str]) -> CsvColumnSet {
        names.iter().copied().collect()
    }

    fn table(names: &[&str]) -> TableColumnList {
        TableColumnList::from_catalog(names.iter().map(|s| s.to_string()))
    }

    fn strings(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn create_columns_are_verbatim() {
        let cols = csv(&["first_name", "last_name", "crsid", "College"]);
        assert_eq!(
            resolve_create_columns(&cols),
            strings(&["first_name", "last_name", "crsid", "College"])
        );
    }

    #[test]
    fn update_email_from_crsid_and_names_from_combined() {
        let resolved = resolve_update_columns(
            &table(&["id", "email", "first_name", "last_name", "college"]),
            &csv(&["crsid", "name", "college", "ignored"]),
        )
        .unwrap();
        assert_eq!(
            resolved,
            strings(&["email", "first_name", "last_name", "college"])
        );
    }

    #[test]
    fn update_follows_table_order_not_csv_order() {
        let resolved = resolve_update_columns(
            &table(&["id", "college", "email", "last_name", "first_name"]),
            &csv(&["first_name", "last_name", "email", "college"]),
        )
        .unwrap();
        assert_eq!(
            resolved,
            strings(&["college", "email", "last_name", "first_name"])
        );
    }

    #[test]
    fn update_reports_first_unsatisfiable_column() {
        let err = resolve_update_columns(
            &table(&["id", "email", "first_name", "last_name", "college", "year"]),
            &csv(&["email", "name"]),
        )
        .unwrap_err();
        assert_eq!(err, SchemaError::UnsatisfiableColumn("college".into()));
    }

    #[test]
    fn update_email_needs_an_identifier() {
        let err =
            resolve_update_columns(&table(&["email"]), &csv(&["name", "college"])).unwrap_err();
        assert_eq!(err, SchemaError::UnsatisfiableColumn("email".into()));
    }

    #[test]
    fn update_pass_through_is_case_sensitive() {
        let err = resolve_update_columns(&table(&["id", "college"]), &csv(&["College"]))
            .unwrap_err();
        assert_eq!(err, SchemaError::UnsatisfiableColumn("college".into()));
    }

    #[test]
    fn table_columns_are_canonically_ordered() {
        assert_eq!(
            table_columns_for(&strings(&["first_name", "last_name", "crsid"])).unwrap(),
            strings(&["email", "first_name", "last_name"])
        );
        assert_eq!(
            table_columns_for(&strings(&["college", "name", "email", "year"])).unwrap(),
            strings(&["email", "first_name", "last_name", "college", "year"])
        );
        assert_eq!(
            table_columns_for(&strings(&["crsid", "last_name", "first_name"])).unwrap(),
            strings(&["email", "first_name", "last_name"])
        );
    }

    #[test]
    fn table_columns_reject_duplicates_and_identity() {
        assert_eq!(
            table_columns_for(&strings(&["email", "crsid", "name"])),
            Err(SchemaError::DuplicateColumn("email".into()))
        );
        assert_eq!(
            table_columns_for(&strings(&["email", "name", "id"])),
            Err(SchemaError::DuplicateColumn("id".into()))
        );
        assert_eq!(
            table_columns_for(&strings(&["email", "name", "year", "year"])),
            Err(SchemaError::DuplicateColumn("year".into()))
        );
    }

    #[test]
    fn table_columns_reject_names_postgres_would_truncate() {
        let question = "Do you have any dietary requirements or allergies we should know about?";
        assert_eq!(
            table_columns_for(&strings(&["crsid", "name", question])),
            Err(SchemaError::IdentifierTooLong(question.into()))
        );

        let longest = "q".repeat(MAX_IDENTIFIER_LEN);
        let cols = table_columns_for(&strings(&["email", "name", &longest])).unwrap();
        assert_eq!(cols.last(), Some(&longest));

        // the limit is in bytes, not characters
        let accented = "é".repeat(32);
        assert_eq!(
            table_columns_for(&strings(&["email", "name", &accented])),
            Err(SchemaError::IdentifierTooLong(accented.clone()))
        );
    }
}
