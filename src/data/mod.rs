//! Price history input.

mod loader;

pub use loader::load_bars;
