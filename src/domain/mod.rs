//! Pure view-composition helpers: no I/O except the CSV export writer.

pub mod export;
pub mod hours;
pub mod messages;
pub mod requests;
pub mod stats;
pub mod time;
pub mod validation;
pub mod window;
