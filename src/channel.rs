//! Bounded, ordered, thread-safe channels.
//!
//! Please see the documentation for [`Channel`].
use super::*;

/// Thread-safe bounded FIFO queue with blocking send and receive.
///
/// A channel is registered with exactly one [`Controller`]. Unless one is
/// supplied through [`ChannelBuilder::controller`] or [`Controller::channel`],
/// the channel creates a private controller of its own.
///
/// Share a channel between threads by reference (for example with
/// [`std::thread::scope`]) or wrap it in an [`Arc`].
///
/// Dropping a channel closes it.
pub struct Channel<T> {
    controller: Controller,
    key: usize,
    capacity: usize,
    name: String,
    _marker: PhantomData<fn(T) -> T>,
}

/// Construction-time configuration for a [`Channel`].
#[derive(Debug, Clone)]
pub struct ChannelBuilder {
    capacity: usize,
    name: String,
    controller: Option<Controller>,
}

impl ChannelBuilder {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Default for ChannelBuilder {
    fn default() -> Self {
        Self {
            capacity: 1,
            name: String::new(),
            controller: None,
        }
    }
}

impl ChannelBuilder {
    /// Maximum number of values buffered. Defaults to 1.
    ///
    /// A capacity of 0 is raised to 1.
    pub fn capacity(mut self, capacity: usize) -> Self {
        if capacity == 0 {
            warn!("Channel capacity must be at least 1, using 1");
        }
        self.capacity = capacity.max(1);
        self
    }

    /// Never block senders on capacity.
    pub fn unbounded(mut self) -> Self {
        self.capacity = usize::MAX;
        self
    }

    /// Diagnostic name, never semantic.
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Register the channel with a shared controller instead of a private one.
    pub fn controller(mut self, controller: &Controller) -> Self {
        self.controller = Some(controller.clone());
        self
    }

    pub fn build<T: Send + 'static>(self) -> Channel<T> {
        let controller = self.controller.unwrap_or_default();
        let key = controller.lock().register::<T>();
        Channel {
            controller,
            key,
            capacity: self.capacity,
            name: self.name,
            _marker: PhantomData,
        }
    }
}

impl<T: Send + 'static> Channel<T> {
    /// A channel with its own private controller.
    pub fn new(capacity: usize) -> Self {
        ChannelBuilder::new().capacity(capacity).build()
    }

    pub fn unbounded() -> Self {
        ChannelBuilder::new().unbounded().build()
    }

    /// Send a value, blocking while the channel is full.
    ///
    /// If the channel is closing, or its controller is terminating, by the
    /// time the value could be enqueued, the value is not enqueued and is
    /// handed back in the error, even if there is room.
    pub fn send(&self, value: T) -> Result<(), SendError<T>> {
        let mut state = self.controller.lock();
        loop {
            if state.slot(self.key).closing || state.terminating() {
                return Err(SendError(value));
            }
            if state.pending(self.key) < self.capacity {
                break;
            }
            self.controller.wait(&mut state);
        }
        state
            .slot_mut(self.key)
            .queue_mut::<T>()
            .push_back(value);
        self.controller.notify_all();
        Ok(())
    }

    /// Send a value without blocking.
    pub fn try_send(&self, value: T) -> Result<(), TrySendError<T>> {
        let mut state = self.controller.lock();
        if state.slot(self.key).closing || state.terminating() {
            return Err(TrySendError::Closed(value));
        }
        if state.pending(self.key) >= self.capacity {
            return Err(TrySendError::Full(value));
        }
        state
            .slot_mut(self.key)
            .queue_mut::<T>()
            .push_back(value);
        self.controller.notify_all();
        Ok(())
    }

    /// Receive the oldest value, blocking while the channel is empty.
    ///
    /// Returns `None` once the channel is closing (or its controller
    /// terminating) and no value is left. Values sent before the close are
    /// still delivered.
    pub fn receive(&self) -> Option<T> {
        let mut state = self.controller.lock();
        loop {
            let slot = state.slot_mut(self.key);
            if let Some(value) = slot.queue_mut::<T>().pop_front() {
                self.controller.notify_all();
                return Some(value);
            }
            if slot.closing || state.terminating() {
                return None;
            }
            self.controller.wait(&mut state);
        }
    }

    /// Receive the oldest value if there is one, without blocking.
    pub fn try_receive(&self) -> Option<T> {
        let mut state = self.controller.lock();
        let value = state.slot_mut(self.key).queue_mut::<T>().pop_front();
        if value.is_some() {
            self.controller.notify_all();
        }
        value
    }

    /// Blocking iterator over received values, ending at the first `None`
    /// from [`Channel::receive`].
    pub fn iter(&self) -> Iter<'_, T> {
        Iter { channel: self }
    }
}

impl<T> Channel<T> {
    /// Close the channel and wake every waiter. Idempotent.
    pub fn close(&self) {
        let closed = self.controller.lock().close(self.key);
        if closed {
            debug!(name = %self.name, "Closed channel");
            self.controller.notify_all();
        }
    }

    pub fn is_closed(&self) -> bool {
        self.controller.lock().slot(self.key).closing
    }

    pub fn controller(&self) -> &Controller {
        &self.controller
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Number of values currently buffered.
    pub fn len(&self) -> usize {
        self.controller.lock().pending(self.key)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Discard every buffered value and wake blocked senders.
    pub(crate) fn clear(&self) {
        let discarded = self.controller.lock().slot_mut(self.key).take_queued();
        self.controller.notify_all();
        drop(discarded);
    }
}

impl<T: Send + 'static> Default for Channel<T> {
    fn default() -> Self {
        ChannelBuilder::new().build()
    }
}

impl<T> Drop for Channel<T> {
    fn drop(&mut self) {
        self.close();
        self.controller.lock().release(self.key);
    }
}

impl<T> fmt::Debug for Channel<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Channel")
            .field("name", &self.name)
            .field("capacity", &self.capacity)
            .field("controller", &self.controller)
            .finish_non_exhaustive()
    }
}

impl<T> controller::sealed::Sealed for Channel<T> {}

impl<T> Selectable for Channel<T> {
    fn controller(&self) -> &Controller {
        &self.controller
    }

    fn slot_key(&self) -> usize {
        self.key
    }
}

/// Iterator returned by [`Channel::iter`].
#[derive(Debug)]
pub struct Iter<'a, T> {
    channel: &'a Channel<T>,
}

impl<T: Send + 'static> Iterator for Iter<'_, T> {
    type Item = T;

    fn next(&mut self) -> Option<T> {
        self.channel.receive()
    }
}

impl<'a, T: Send + 'static> IntoIterator for &'a Channel<T> {
    type Item = T;
    type IntoIter = Iter<'a, T>;

    fn into_iter(self) -> Iter<'a, T> {
        self.iter()
    }
}
