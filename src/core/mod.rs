/// Execution context used to save and restore reader positions
pub mod execution;

pub mod item;

/// Input resources readers are opened against
pub mod resource;
