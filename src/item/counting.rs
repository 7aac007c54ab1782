use std::{cell::Cell, marker::PhantomData};

use log::{debug, info};

use crate::{
    core::{
        execution::ExecutionContext,
        item::{ItemReader, ItemReaderResult, ItemStream},
    },
    error::BatchError,
};

/// Counts the items returned by a reader so a failed run can be resumed.
///
/// `update` stores the number of items returned so far under `<name>.read.count`. When
/// `open` finds that key in the context, the inner reader is opened again and the first
/// `count` items are read and discarded before control returns to the caller.
///
/// The decorator knows nothing about the inner reader's format: restart correctness and
/// record extraction are tested separately.
///
/// # Examples
///
/// ```
/// use fragment_batch_rs::core::execution::ExecutionContext;
/// use fragment_batch_rs::core::item::{ItemReader, ItemStream};
/// use fragment_batch_rs::item::counting::ItemCountingReader;
/// use fragment_batch_rs::item::xml::{EventCollector, ParseEvent, XmlFragmentItemReaderBuilder};
///
/// let xml = "<r><rec>1</rec><rec>2</rec><rec>3</rec></r>";
/// let build = || {
///     XmlFragmentItemReaderBuilder::<Vec<ParseEvent>>::new()
///         .fragment_root_element_name("rec")
///         .converter(EventCollector)
///         .from_bytes(xml)
///         .build()
///         .unwrap()
/// };
///
/// let mut context = ExecutionContext::new();
/// let reader = ItemCountingReader::new("recs", build());
/// reader.open(&context).unwrap();
/// reader.read().unwrap();
/// reader.update(&mut context).unwrap();
/// ItemStream::close(&reader).unwrap();
///
/// let restarted = ItemCountingReader::new("recs", build());
/// restarted.open(&context).unwrap();
/// assert_eq!(restarted.current_item_count(), 1);
/// assert!(restarted.read().unwrap().is_some());
/// assert!(restarted.read().unwrap().is_some());
/// assert!(restarted.read().unwrap().is_none());
/// ```
pub struct ItemCountingReader<I, R> {
    name: String,
    inner: R,
    current_item_count: Cell<usize>,
    max_item_count: usize,
    save_state: bool,
    _marker: PhantomData<I>,
}

impl<I, R: ItemReader<I> + ItemStream> ItemCountingReader<I, R> {
    pub fn new<S: Into<String>>(name: S, inner: R) -> Self {
        Self {
            name: name.into(),
            inner,
            current_item_count: Cell::new(0),
            max_item_count: usize::MAX,
            save_state: true,
            _marker: PhantomData,
        }
    }

    /// Stops reading after `max_item_count` items, counting the ones skipped on restart.
    pub fn max_item_count(mut self, max_item_count: usize) -> Self {
        self.max_item_count = max_item_count;
        self
    }

    /// When `false`, `update` leaves the context untouched.
    pub fn save_state(mut self, save_state: bool) -> Self {
        self.save_state = save_state;
        self
    }

    pub fn current_item_count(&self) -> usize {
        self.current_item_count.get()
    }

    pub fn inner(&self) -> &R {
        &self.inner
    }

    fn read_count_key(&self) -> String {
        format!("{}.read.count", self.name)
    }

    fn read_count_max_key(&self) -> String {
        format!("{}.read.count.max", self.name)
    }

    fn jump_to_item(&self, item_index: usize) -> Result<(), BatchError> {
        while self.current_item_count.get() < item_index {
            if self.inner.read()?.is_none() {
                debug!(
                    "Input of '{}' ended after {} items while restarting",
                    self.name,
                    self.current_item_count.get()
                );
                break;
            }
            self.current_item_count.set(self.current_item_count.get() + 1);
        }
        Ok(())
    }
}

impl<I, R: ItemReader<I> + ItemStream> ItemReader<I> for ItemCountingReader<I, R> {
    fn read(&self) -> ItemReaderResult<I> {
        if self.current_item_count.get() >= self.max_item_count {
            return Ok(None);
        }
        let item = self.inner.read()?;
        if item.is_some() {
            self.current_item_count.set(self.current_item_count.get() + 1);
        }
        Ok(item)
    }
}

impl<I, R: ItemReader<I> + ItemStream> ItemStream for ItemCountingReader<I, R> {
    fn open(&self, execution_context: &ExecutionContext) -> Result<(), BatchError> {
        self.current_item_count.set(0);
        self.inner.open(execution_context)?;

        let mut max_item_count = self.max_item_count;
        if let Some(max) = execution_context.get(&self.read_count_max_key()) {
            max_item_count = max;
        }

        if let Some(item_count) = execution_context.get(&self.read_count_key()) {
            let target = item_count.min(max_item_count);
            info!("Restarting '{}' after {} items", self.name, target);
            self.jump_to_item(target)?;
        }
        Ok(())
    }

    fn update(&self, execution_context: &mut ExecutionContext) -> Result<(), BatchError> {
        self.inner.update(execution_context)?;
        if self.save_state {
            execution_context.put(self.read_count_key(), self.current_item_count.get());
            if self.max_item_count < usize::MAX {
                execution_context.put(self.read_count_max_key(), self.max_item_count);
            }
        }
        Ok(())
    }

    fn close(&self) -> Result<(), BatchError> {
        self.current_item_count.set(0);
        self.inner.close()
    }
}

#[cfg(test)]
mod tests {
    use std::cell::{Cell, RefCell};

    use crate::core::execution::ExecutionContext;
    use crate::core::item::{ItemReader, ItemReaderResult, ItemStream};
    use crate::error::BatchError;

    use super::ItemCountingReader;

    struct NumberReader {
        next: Cell<u32>,
        last: u32,
        opened: Cell<usize>,
        closed: RefCell<bool>,
    }

    impl NumberReader {
        fn new(last: u32) -> Self {
            Self {
                next: Cell::new(1),
                last,
                opened: Cell::new(0),
                closed: RefCell::new(false),
            }
        }
    }

    impl ItemReader<u32> for NumberReader {
        fn read(&self) -> ItemReaderResult<u32> {
            let next = self.next.get();
            if next > self.last {
                return Ok(None);
            }
            self.next.set(next + 1);
            Ok(Some(next))
        }
    }

    impl ItemStream for NumberReader {
        fn open(&self, _: &ExecutionContext) -> Result<(), BatchError> {
            self.next.set(1);
            self.opened.set(self.opened.get() + 1);
            Ok(())
        }

        fn close(&self) -> Result<(), BatchError> {
            *self.closed.borrow_mut() = true;
            Ok(())
        }
    }

    #[test]
    fn update_should_save_read_count() {
        let reader = ItemCountingReader::new("numbers", NumberReader::new(5));
        let mut context = ExecutionContext::new();
        reader.open(&context).unwrap();

        reader.read().unwrap();
        reader.read().unwrap();
        reader.update(&mut context).unwrap();

        assert_eq!(context.get("numbers.read.count"), Some(2));
        assert!(!context.contains_key("numbers.read.count.max"));
    }

    #[test]
    fn open_should_skip_already_read_items() {
        let mut context = ExecutionContext::new();
        context.put("numbers.read.count", 3);

        let reader = ItemCountingReader::new("numbers", NumberReader::new(5));
        reader.open(&context).unwrap();

        assert_eq!(reader.current_item_count(), 3);
        assert_eq!(reader.read().unwrap(), Some(4));
        assert_eq!(reader.read().unwrap(), Some(5));
        assert_eq!(reader.read().unwrap(), None);
        assert_eq!(reader.current_item_count(), 5);
        assert_eq!(reader.inner().opened.get(), 1);
    }

    #[test]
    fn restart_beyond_end_should_read_nothing() {
        let mut context = ExecutionContext::new();
        context.put("numbers.read.count", 10);

        let reader = ItemCountingReader::new("numbers", NumberReader::new(2));
        reader.open(&context).unwrap();

        assert_eq!(reader.current_item_count(), 2);
        assert_eq!(reader.read().unwrap(), None);
    }

    #[test]
    fn max_item_count_should_stop_reading() {
        let reader = ItemCountingReader::new("numbers", NumberReader::new(5)).max_item_count(2);
        let mut context = ExecutionContext::new();
        reader.open(&context).unwrap();

        assert_eq!(reader.read().unwrap(), Some(1));
        assert_eq!(reader.read().unwrap(), Some(2));
        assert_eq!(reader.read().unwrap(), None);

        reader.update(&mut context).unwrap();
        assert_eq!(context.get("numbers.read.count.max"), Some(2));
    }

    #[test]
    fn save_state_disabled_should_leave_context_untouched() {
        let reader = ItemCountingReader::new("numbers", NumberReader::new(5)).save_state(false);
        let mut context = ExecutionContext::new();
        reader.open(&context).unwrap();
        reader.read().unwrap();

        reader.update(&mut context).unwrap();

        assert!(context.is_empty());
    }

    #[test]
    fn close_should_reset_count_and_close_inner() {
        let reader = ItemCountingReader::new("numbers", NumberReader::new(5));
        reader.open(&ExecutionContext::new()).unwrap();
        reader.read().unwrap();

        reader.close().unwrap();

        assert_eq!(reader.current_item_count(), 0);
        assert!(*reader.inner().closed.borrow());
    }
}
