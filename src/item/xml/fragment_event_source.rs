use log::debug;

use crate::error::BatchError;

use super::event::{EventSource, ParseEvent, QualifiedName};

static START_DOCUMENT: ParseEvent = ParseEvent::StartDocument;
static END_DOCUMENT: ParseEvent = ParseEvent::EndDocument;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Window {
    /// No fragment is being delivered.
    Closed,
    /// The synthetic `StartDocument` is the next event.
    StartPending,
    /// Real events of the fragment are delivered.
    Inside,
    /// The fragment root was closed, the synthetic `EndDocument` is the next event.
    EndPending,
    /// The synthetic `EndDocument` was delivered.
    Exhausted,
}

/// Presents one fragment of an ambient event stream as a standalone document.
///
/// The decorator wraps the source the fragments are extracted from. Once the cursor has been
/// moved to a fragment root, [`mark_fragment_start`](Self::mark_fragment_start) opens a
/// window: consumers then see a synthetic `StartDocument`, the real events of the fragment
/// and a synthetic `EndDocument` right after the end element that closes the fragment root.
/// The inner source is left positioned just after that end element.
///
/// The window closes at the first end element carrying the root's name, or when the nesting
/// depth returns to zero. For a root with a same-named descendant the descendant's end element
/// wins: the window is closed early and the rest of the outer element stays in the ambient
/// stream.
///
/// Nothing is copied or re-parsed: fragment events are taken straight from the inner source.
///
/// Reading outside a window is an error. After the synthetic `EndDocument` reads return
/// `None` until [`mark_fragment_processed`](Self::mark_fragment_processed) is called.
///
/// # Examples
///
/// ```
/// use fragment_batch_rs::item::xml::event::{EventSource, ParseEvent, VecEventSource};
/// use fragment_batch_rs::item::xml::FragmentEventSource;
///
/// let inner = VecEventSource::new(vec![
///     ParseEvent::start("rec"),
///     ParseEvent::end("rec"),
///     ParseEvent::end("root"),
/// ]);
/// let mut source = FragmentEventSource::new(inner);
///
/// source.mark_fragment_start().unwrap();
/// assert_eq!(source.next_event().unwrap(), Some(ParseEvent::StartDocument));
/// assert_eq!(source.next_event().unwrap(), Some(ParseEvent::start("rec")));
/// assert_eq!(source.next_event().unwrap(), Some(ParseEvent::end("rec")));
/// assert_eq!(source.next_event().unwrap(), Some(ParseEvent::EndDocument));
/// assert_eq!(source.next_event().unwrap(), None);
/// source.mark_fragment_processed().unwrap();
///
/// assert_eq!(source.inner_mut().next_event().unwrap(), Some(ParseEvent::end("root")));
/// ```
pub struct FragmentEventSource<S> {
    inner: S,
    window: Window,
    depth: usize,
    root: Option<QualifiedName>,
}

impl<S: EventSource> FragmentEventSource<S> {
    pub fn new(inner: S) -> Self {
        Self {
            inner,
            window: Window::Closed,
            depth: 0,
            root: None,
        }
    }

    /// The ambient source, used to move the cursor between fragments.
    pub fn inner_mut(&mut self) -> &mut S {
        &mut self.inner
    }

    pub fn into_inner(self) -> S {
        self.inner
    }

    /// Current nesting depth inside the fragment window.
    pub fn depth(&self) -> usize {
        self.depth
    }

    /// Returns `true` until the end element closing the fragment root has been delivered.
    pub fn is_in_fragment(&self) -> bool {
        matches!(self.window, Window::StartPending | Window::Inside)
    }

    /// Opens a fragment window.
    ///
    /// Must be called right after the cursor found a fragment root, before any of its
    /// events is consumed.
    pub fn mark_fragment_start(&mut self) -> Result<(), BatchError> {
        if self.window != Window::Closed {
            return Err(BatchError::ItemReader(
                "Previous fragment has not been marked as processed".to_string(),
            ));
        }
        let root = match self.inner.peek()? {
            Some(ParseEvent::StartElement { name, .. }) => name.clone(),
            Some(other) => {
                return Err(BatchError::ItemReader(format!(
                    "Fragment must begin with a start element, found {:?}",
                    other
                )));
            }
            None => return Err(self.incomplete()),
        };
        debug!("Fragment '{}' started", root);

        self.root = Some(root);
        self.depth = 0;
        self.window = Window::StartPending;
        Ok(())
    }

    /// Closes the current window.
    ///
    /// Events of the fragment the consumer did not read are skipped so the inner source ends
    /// up past the fragment. The window is reset even if skipping fails; the failure is
    /// returned afterwards.
    pub fn mark_fragment_processed(&mut self) -> Result<(), BatchError> {
        let drained = self.drain();
        self.window = Window::Closed;
        self.depth = 0;
        self.root = None;
        drained
    }

    fn drain(&mut self) -> Result<(), BatchError> {
        let mut skipped = 0;
        while matches!(
            self.window,
            Window::StartPending | Window::Inside | Window::EndPending
        ) {
            self.next_event()?;
            skipped += 1;
        }
        if skipped > 0 {
            debug!("Skipped {} unread events of the fragment", skipped);
        }
        Ok(())
    }

    fn closes_root(&self, name: &QualifiedName) -> bool {
        self.root.as_ref().is_some_and(|root| {
            root.local_name == name.local_name && root.namespace == name.namespace
        })
    }

    fn incomplete(&self) -> BatchError {
        BatchError::FragmentIncomplete(format!(
            "Input ended inside a fragment at depth {}",
            self.depth
        ))
    }

    fn outside_window() -> BatchError {
        BatchError::ItemReader("Read outside of a fragment window".to_string())
    }
}

impl<S: EventSource> EventSource for FragmentEventSource<S> {
    fn peek(&mut self) -> Result<Option<&ParseEvent>, BatchError> {
        match self.window {
            Window::Closed => Err(Self::outside_window()),
            Window::StartPending => Ok(Some(&START_DOCUMENT)),
            Window::Inside => {
                if matches!(self.inner.peek()?, None | Some(ParseEvent::EndDocument)) {
                    return Err(self.incomplete());
                }
                self.inner.peek()
            }
            Window::EndPending => Ok(Some(&END_DOCUMENT)),
            Window::Exhausted => Ok(None),
        }
    }

    fn next_event(&mut self) -> Result<Option<ParseEvent>, BatchError> {
        match self.window {
            Window::Closed => Err(Self::outside_window()),
            Window::StartPending => {
                self.window = Window::Inside;
                Ok(Some(ParseEvent::StartDocument))
            }
            Window::Inside => {
                let event = match self.inner.next_event()? {
                    None | Some(ParseEvent::EndDocument) => return Err(self.incomplete()),
                    Some(event) => event,
                };
                match event {
                    ParseEvent::StartElement { .. } => self.depth += 1,
                    ParseEvent::EndElement { ref name } => {
                        self.depth = self.depth.saturating_sub(1);
                        if self.depth == 0 || self.closes_root(name) {
                            self.window = Window::EndPending;
                        }
                    }
                    _ => {}
                }
                Ok(Some(event))
            }
            Window::EndPending => {
                self.window = Window::Exhausted;
                Ok(Some(ParseEvent::EndDocument))
            }
            Window::Exhausted => Ok(None),
        }
    }

    fn close(&mut self) -> Result<(), BatchError> {
        self.window = Window::Closed;
        self.depth = 0;
        self.root = None;
        self.inner.close()
    }
}
