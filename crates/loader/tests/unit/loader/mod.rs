//! Loader tests: address resolution, segment writing, per-tile loads, and simulator setup.





/// Program memory bursts, bank splitting, and zero fill.
pub mod writer;
