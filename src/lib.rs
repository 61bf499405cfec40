#![allow(async_fn_in_trait)]

// Re-export modules
pub mod collected;
pub mod config;
pub mod driver;
pub mod extract;
pub mod harvest;
pub mod paginate;
pub mod persist;
pub mod stagnation;
pub mod utils;

// Re-export commonly used types for convenience
pub use collected::CollectedSet;
pub use driver::{DriverError, LocatorSpec, PageDriver, PageElement, WebDriverPage};
pub use extract::{ExtractionResult, FieldSpec};
pub use harvest::{ContentRecord, HarvestReport};
pub use stagnation::StagnationTracker;
