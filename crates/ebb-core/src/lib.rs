//! # ebb-core
//! Foundation types, traits and in-memory collaborators for the Ebb vault engine.

pub mod assets;
pub mod clock;
pub mod constants;
pub mod error;
pub mod factory;
pub mod math;
pub mod set;
pub mod traits;
pub mod types;

pub use assets::MemoryAssets;
pub use clock::{ManualClock, SystemClock};
pub use factory::MemoryFactory;
pub use set::IndexedSet;
