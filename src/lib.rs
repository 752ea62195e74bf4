pub mod config;
pub mod db;
pub mod error;
pub mod import;
pub mod input;
pub mod query;
pub mod schema;
pub mod source;

pub use error::ImportError;
