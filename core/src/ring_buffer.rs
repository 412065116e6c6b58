//! Fixed-capacity circular history with overwrite-on-full semantics.

/// Circular container that never grows and never rejects a push.
///
/// The slot under the write cursor is the *latest* value. Callers mutate it in
/// place through [`RingBuffer::latest`] and commit it by calling
/// [`RingBuffer::push`], which moves the cursor to a fresh slot. Once every
/// slot is occupied the oldest one is evicted to make room.
#[derive(Clone, Debug)]
pub struct RingBuffer<T> {
    slots: Vec<Option<T>>,
    current: usize,
    read: usize,
    len: usize,
}

impl<T: Default> RingBuffer<T> {
    /// Creates an empty buffer holding at most `capacity` values.
    ///
    /// A capacity of zero is raised to one.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        let mut slots = Vec::with_capacity(capacity);
        slots.resize_with(capacity, || None);
        Self {
            slots,
            current: 0,
            read: 0,
            len: 0,
        }
    }

    /// Commits the latest slot and installs `value` in the next one.
    ///
    /// Without a value the new slot holds `T::default()`. When the buffer is
    /// full the oldest value is evicted.
    pub fn push(&mut self, value: Option<T>) {
        if self.slots[self.current].is_some() {
            self.current = self.advance(self.current);
            if self.slots[self.current].take().is_some() {
                self.len -= 1;
                self.read = self.advance(self.read);
            }
        }
        if self.len == 0 {
            self.read = self.current;
        }
        self.slots[self.current] = Some(value.unwrap_or_default());
        self.len += 1;
    }

    /// Mutable reference to the slot under the write cursor.
    ///
    /// An empty slot is default-constructed first.
    pub fn latest(&mut self) -> &mut T {
        if self.slots[self.current].is_none() {
            if self.len == 0 {
                self.read = self.current;
            }
            self.len += 1;
        }
        self.slots[self.current].get_or_insert_with(T::default)
    }
}

impl<T> RingBuffer<T> {
    /// Latest value, without constructing one.
    #[must_use]
    pub fn peek_latest(&self) -> Option<&T> {
        self.slots[self.current].as_ref()
    }

    /// Value committed immediately before the latest one.
    #[must_use]
    pub fn previous(&self) -> Option<&T> {
        if self.len < 2 {
            return None;
        }
        let index = (self.current + self.capacity() - 1) % self.capacity();
        self.slots[index].as_ref()
    }

    /// Oldest retained value.
    #[must_use]
    pub fn oldest(&self) -> Option<&T> {
        if self.len == 0 {
            return None;
        }
        self.slots[self.read].as_ref()
    }

    /// Removes and returns the oldest retained value.
    pub fn discard(&mut self) -> Option<T> {
        if self.len == 0 {
            return None;
        }
        let value = self.slots[self.read].take();
        self.len -= 1;
        self.read = if self.len == 0 {
            self.current
        } else {
            self.advance(self.read)
        };
        value
    }

    /// Values from oldest to latest.
    pub fn iter(&self) -> impl Iterator<Item = &T> + '_ {
        (0..self.len).filter_map(move |offset| {
            self.slots[(self.read + offset) % self.capacity()].as_ref()
        })
    }

    /// Number of occupied slots.
    #[must_use]
    pub fn len(&self) -> usize {
        self.len
    }

    /// Reports whether no slot is occupied.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Maximum number of retained values.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    fn advance(&self, index: usize) -> usize {
        (index + 1) % self.capacity()
    }
}
