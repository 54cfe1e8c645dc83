//! Business configuration: services, opening hours, and the snapshot provider.

pub mod directory;
pub mod model;

pub use directory::{BusinessDirectory, InMemoryDirectory};
pub use model::{BusinessSnapshot, DAY_NAMES, OpeningHour, Service, day_name};
