use std::io::{BufRead, Write};
use std::path::{Component, Path};

use crate::error::InputError;
use crate::import::Operation;
use crate::schema::types::MAX_IDENTIFIER_LEN;

/// What the user asked for at the prompt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    pub operation: Operation,
    /// Table name, also the event key naming the CSV file.
    pub table: String,
}

/// Ask for the operation and the table name.
pub fn prompt<R: BufRead, W: Write>(mut input: R, mut output: W) -> Result<Request, InputError> {
    write!(
        output,
        "Enter the operation you want to perform (create or update): "
    )?;
    output.flush()?;
    let operation: Operation = read_line(&mut input)?.parse()?;

    write!(
        output,
        "Enter the name of the table you want to {}: ",
        operation
    )?;
    output.flush()?;
    let table = read_line(&mut input)?;
    check_table_name(&table)?;
    writeln!(output)?;

    Ok(Request { operation, table })
}

/// A table name doubles as a directory under `events/`, so it must be a single
/// plain path component. It must also fit PostgreSQL's identifier length.
pub fn check_table_name(name: &str) -> Result<(), InputError> {
    let mut components = Path::new(name).components();
    match (components.next(), components.next()) {
        (Some(Component::Normal(c)), None) if c == name && !name.contains('\\') => {}
        _ => return Err(InputError::InvalidTableName(name.to_string())),
    }
    if name.len() > MAX_IDENTIFIER_LEN {
        return Err(InputError::TableNameTooLong(name.to_string()));
    }
    Ok(())
}

fn read_line<R: BufRead>(input: &mut R) -> Result<String, InputError> {
    let mut line = String::new();
    input.read_line(&mut line)?;
    Ok(line.trim().to_string())
}
