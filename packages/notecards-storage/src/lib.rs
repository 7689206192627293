pub mod attempts;
pub mod blob;
pub mod cards;
pub mod db;
pub mod files;
pub mod models;
pub mod schema;
pub mod sessions;
pub mod tags;
pub mod users;

mod error;

pub use error::Error;

pub type Result<T, E = Error> = std::result::Result<T, E>;
