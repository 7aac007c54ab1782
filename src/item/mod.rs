/// This module provides a reader decorator counting items so a run can be restarted.
pub mod counting;

/// This module provides the XML fragment item reader and its building blocks.
pub mod xml;
