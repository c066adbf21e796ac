pub mod catalog;
pub mod classify;
pub mod error;
pub mod report;
pub mod settings;
pub mod stats;
pub mod store;
pub mod util;

pub use error::{Result, TallyError};

#[cfg(test)]
mod tests;
