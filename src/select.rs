//! Select with per-channel handlers.
use super::*;

/// Runs [`Controller::select`] over a fixed set of channels and hands each
/// ready channel to the handler registered for it.
///
/// Each channel gets its own handler, so channels of different value types can
/// be dispatched in one select. Handlers run after the controller lock is
/// released; they typically call [`Channel::try_receive`].
///
/// ```
/// use chanplex::Controller;
///
/// let controller = Controller::new();
/// let numbers = controller.channel::<i32>(1, "numbers");
/// let words = controller.channel::<String>(1, "words");
/// numbers.send(7).unwrap();
///
/// let mut seen = Vec::new();
/// let mut selector = controller
///     .selector()
///     .on(&numbers, |ch| seen.extend(ch.try_receive().map(|n| n.to_string())))
///     .on(&words, |ch| drop(ch.try_receive()));
/// assert!(selector.wait().unwrap());
/// drop(selector);
/// assert_eq!(seen, ["7"]);
/// ```
#[must_use = "a selector does nothing until `wait` is called"]
pub struct Selector<'a> {
    controller: &'a Controller,
    arms: Vec<Arm<'a>>,
}

struct Arm<'a> {
    source: &'a dyn Selectable,
    handler: Box<dyn FnMut() + 'a>,
}

impl<'a> Selector<'a> {
    pub(crate) fn new(controller: &'a Controller) -> Self {
        Self {
            controller,
            arms: Vec::new(),
        }
    }

    /// Add `channel` to the select set, calling `handler` with it each time it
    /// is reported ready.
    pub fn on<T, F>(mut self, channel: &'a Channel<T>, mut handler: F) -> Self
    where
        T: Send + 'static,
        F: FnMut(&Channel<T>) + 'a,
    {
        self.arms.push(Arm {
            source: channel,
            handler: Box::new(move || handler(channel)),
        });
        self
    }

    /// Block until some channel is ready, then dispatch.
    ///
    /// A channel with N pending values has its handler called N times.
    /// Returns whether any channel was ready; `false` means the controller was
    /// terminated or has no open channel left.
    pub fn wait(&mut self) -> Result<bool> {
        self.dispatch(None)
    }

    /// Same as [`Selector::wait`] but gives up after `timeout`.
    pub fn wait_for(&mut self, timeout: Duration) -> Result<bool> {
        self.dispatch(Instant::now().checked_add(timeout))
    }

    fn dispatch(&mut self, deadline: Option<Instant>) -> Result<bool> {
        let sources: Vec<&dyn Selectable> = self.arms.iter().map(|arm| arm.source).collect();
        let ready = self.controller.select_until(deadline, &sources)?;
        for &position in &ready {
            (self.arms[position].handler)();
        }
        Ok(!ready.is_empty())
    }
}

impl fmt::Debug for Selector<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Selector")
            .field("controller", self.controller)
            .field("arms", &self.arms.len())
            .finish()
    }
}
