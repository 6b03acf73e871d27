//! Shared coordination context for a group of channels.
//!
//! Please see the documentation for [`Controller`].
use super::*;

/// Shared synchronization state for a group of channels that must be waited
/// on together.
///
/// A controller owns one lock and one condition variable. The queues of every
/// channel registered with it live behind that single lock, which lets
/// [`Controller::select`] decide atomically across the whole group.
///
/// Cloning a controller is cheap and yields a handle to the same instance.
#[derive(Clone, Default)]
pub struct Controller {
    shared: Arc<Shared>,
}

#[derive(Default)]
struct Shared {
    state: Mutex<State>,
    condition: Condvar,
}

/// Everything guarded by the controller lock.
#[derive(Default)]
pub(crate) struct State {
    slots: Vec<Option<Slot>>,
    vacant: Vec<usize>,
    live: usize,
    terminating: bool,
}

pub(crate) struct Slot {
    queue: Box<dyn Pending>,
    pub(crate) closing: bool,
}

/// A channel queue with its element type erased, so one controller can hold
/// queues of unrelated types.
trait Pending: Send {
    fn len(&self) -> usize;
    fn as_any_mut(&mut self) -> &mut dyn Any;
    fn take_all(&mut self) -> Box<dyn Any + Send>;
}

impl<T: Send + 'static> Pending for VecDeque<T> {
    fn len(&self) -> usize {
        VecDeque::len(self)
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }

    fn take_all(&mut self) -> Box<dyn Any + Send> {
        Box::new(mem::take(self))
    }
}

impl State {
    /// Allocate a slot for a new open channel of `T`.
    pub(crate) fn register<T: Send + 'static>(&mut self) -> usize {
        let slot = Slot {
            queue: Box::new(VecDeque::<T>::new()),
            closing: false,
        };
        self.live += 1;
        match self.vacant.pop() {
            Some(key) => {
                self.slots[key] = Some(slot);
                key
            }
            None => {
                self.slots.push(Some(slot));
                self.slots.len() - 1
            }
        }
    }

    /// Drop the queue of a channel that is going away.
    pub(crate) fn release(&mut self, key: usize) {
        if let Some(slot) = self.slots.get_mut(key) {
            if slot.take().is_some() {
                self.vacant.push(key);
            }
        }
    }

    pub(crate) fn slot(&self, key: usize) -> &Slot {
        match self.slots.get(key) {
            Some(Some(slot)) => slot,
            _ => unreachable!("slot {key} released while its channel is alive"),
        }
    }

    pub(crate) fn slot_mut(&mut self, key: usize) -> &mut Slot {
        match self.slots.get_mut(key) {
            Some(Some(slot)) => slot,
            _ => unreachable!("slot {key} released while its channel is alive"),
        }
    }

    pub(crate) fn pending(&self, key: usize) -> usize {
        self.slot(key).queue.len()
    }

    /// Mark the slot closing. Returns `false` if it already was.
    pub(crate) fn close(&mut self, key: usize) -> bool {
        let slot = self.slot_mut(key);
        if slot.closing {
            return false;
        }
        slot.closing = true;
        self.live -= 1;
        true
    }

    pub(crate) fn terminating(&self) -> bool {
        self.terminating
    }

    /// Record the argument position of every channel once per pending value.
    fn scan(&self, channels: &[&dyn Selectable], ready: &mut Vec<usize>) {
        ready.clear();
        for (position, channel) in channels.iter().enumerate() {
            let pending = self.pending(channel.slot_key());
            ready.extend(std::iter::repeat(position).take(pending));
        }
    }
}

impl Slot {
    pub(crate) fn queue_mut<T: Send + 'static>(&mut self) -> &mut VecDeque<T> {
        match self.queue.as_any_mut().downcast_mut::<VecDeque<T>>() {
            Some(queue) => queue,
            None => unreachable!("channel slot holds a queue of another type"),
        }
    }

    /// Move every queued value out, leaving the queue empty. The caller
    /// drops the result after releasing the lock.
    pub(crate) fn take_queued(&mut self) -> Box<dyn Any + Send> {
        self.queue.take_all()
    }
}

pub(crate) mod sealed {
    pub trait Sealed {}
}

/// A handle [`Controller::select`] can poll for readiness.
///
/// Implemented by [`Channel`]; the trait is sealed.
pub trait Selectable: sealed::Sealed {
    /// The controller this handle is registered with.
    fn controller(&self) -> &Controller;

    #[doc(hidden)]
    fn slot_key(&self) -> usize;
}

impl Controller {
    pub fn new() -> Self {
        Self::default()
    }

    /// Construct a [`Channel`] registered with this controller.
    pub fn channel<T: Send + 'static>(
        &self,
        capacity: usize,
        name: impl Into<String>,
    ) -> Channel<T> {
        ChannelBuilder::new()
            .capacity(capacity)
            .name(name)
            .controller(self)
            .build()
    }

    /// Start a [`Selector`] dispatching to per-channel handlers.
    pub fn selector(&self) -> Selector<'_> {
        Selector::new(self)
    }

    /// Whether some channel registered with this controller is still open.
    pub fn is_alive(&self) -> bool {
        self.lock().live > 0
    }

    pub fn is_terminating(&self) -> bool {
        self.lock().terminating
    }

    /// Number of open channels registered with this controller.
    pub fn live_channels(&self) -> usize {
        self.lock().live
    }

    /// Whether `other` is a handle to this same controller.
    pub fn same_as(&self, other: &Controller) -> bool {
        Arc::ptr_eq(&self.shared, &other.shared)
    }

    /// Shut down the whole channel group: wake every waiter and make every
    /// later wait on this controller return without blocking.
    pub fn terminate(&self) {
        self.lock().terminating = true;
        debug!(controller = ?self, "Terminating controller");
        self.notify_all();
    }

    /// Block until at least one of `channels` holds a value.
    ///
    /// Returns the argument position of each ready channel, repeated once per
    /// pending value. The result is empty when the wait ended without
    /// readiness: the controller was terminated or no open channel is left.
    ///
    /// The result is a snapshot. A racing consumer may drain a reported
    /// channel before the caller gets to it.
    pub fn select(&self, channels: &[&dyn Selectable]) -> Result<Vec<usize>> {
        self.select_until(None, channels)
    }

    /// Same as [`Controller::select`] but gives up after `timeout`, returning
    /// an empty result.
    pub fn select_for(
        &self,
        timeout: Duration,
        channels: &[&dyn Selectable],
    ) -> Result<Vec<usize>> {
        self.select_until(Instant::now().checked_add(timeout), channels)
    }

    pub(crate) fn select_until(
        &self,
        deadline: Option<Instant>,
        channels: &[&dyn Selectable],
    ) -> Result<Vec<usize>> {
        self.check_membership(channels)?;

        let mut ready = Vec::new();
        let mut state = self.lock();
        if state.terminating {
            return Ok(ready);
        }
        loop {
            state.scan(channels, &mut ready);
            if !ready.is_empty() || state.live == 0 || state.terminating {
                break;
            }
            match deadline {
                None => self.shared.condition.wait(&mut state),
                Some(deadline) => {
                    if self
                        .shared
                        .condition
                        .wait_until(&mut state, deadline)
                        .timed_out()
                    {
                        state.scan(channels, &mut ready);
                        break;
                    }
                }
            }
        }
        Ok(ready)
    }

    fn check_membership(&self, channels: &[&dyn Selectable]) -> Result<()> {
        match channels
            .iter()
            .position(|channel| !channel.controller().same_as(self))
        {
            Some(position) => {
                warn!(position, "Select over a channel of another controller");
                Err(Error::ControllerMismatch { position })
            }
            None => Ok(()),
        }
    }

    pub(crate) fn lock(&self) -> MutexGuard<'_, State> {
        self.shared.state.lock()
    }

    /// Release the lock held by `state` and suspend until notified.
    pub(crate) fn wait(&self, state: &mut MutexGuard<'_, State>) {
        self.shared.condition.wait(state);
    }

    // Senders and receivers of different channels share one condition
    // variable, so a single notification could land on a waiter whose
    // predicate is still false.
    pub(crate) fn notify_all(&self) {
        self.shared.condition.notify_all();
    }
}

impl fmt::Debug for Controller {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Controller")
            .field(&Arc::as_ptr(&self.shared))
            .finish()
    }
}
