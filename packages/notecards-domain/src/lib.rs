pub mod account;
pub mod due;
pub mod filter;
pub mod fingerprint;
pub mod ids;
pub mod page;
pub mod patch;
pub mod spacing;
pub mod tag;

mod error;

pub use error::{Error, Result};
