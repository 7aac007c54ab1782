use log::debug;

use crate::error::BatchError;

use super::event::{EventSource, ParseEvent};

/// Moves an event source to the start of the next fragment.
///
/// Implementations must leave the source positioned *at* the fragment's `StartElement`
/// so that it is the next event returned by [`EventSource::next_event`].
pub trait FragmentCursor {
    /// Returns `Ok(true)` when a fragment root was found, `Ok(false)` at end of input.
    fn move_to_next_fragment(
        &self,
        source: &mut dyn EventSource,
        fragment_root_element_name: &str,
    ) -> Result<bool, BatchError>;
}

/// Finds the next start element whose local name matches the fragment root name.
///
/// The scan ignores nesting: every start element is inspected whatever its ancestors are,
/// and namespaces are ignored. A same-named element nested inside an unrelated subtree is
/// therefore picked up as a fragment. Composite fragments, where the root element contains
/// descendants with the same name, need a different cursor.
#[derive(Debug, Default, Clone, Copy)]
pub struct LocalNameCursor;

impl FragmentCursor for LocalNameCursor {
    fn move_to_next_fragment(
        &self,
        source: &mut dyn EventSource,
        fragment_root_element_name: &str,
    ) -> Result<bool, BatchError> {
        loop {
            let found = match source.peek()? {
                None => {
                    debug!("No more '{}' fragment", fragment_root_element_name);
                    return Ok(false);
                }
                Some(ParseEvent::StartElement { name, .. }) => {
                    name.local_name == fragment_root_element_name
                }
                Some(_) => false,
            };

            if found {
                debug!("Found start tag: '{}'", fragment_root_element_name);
                return Ok(true);
            }

            source.next_event()?;
        }
    }
}
