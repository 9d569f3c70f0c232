pub mod change;
pub mod snapshot;
