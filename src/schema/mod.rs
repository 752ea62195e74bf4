pub mod mapper;
pub mod types;
pub mod validate;

pub use mapper::{resolve_create_columns, resolve_update_columns, table_columns_for};
pub use types::{CsvColumnSet, TableColumnList};
pub use validate::validate;
