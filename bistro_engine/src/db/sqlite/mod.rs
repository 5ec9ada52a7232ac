mod db;
mod errors;
mod orders;

pub use db::SqliteDatabase;
pub use errors::SqliteDatabaseError;
