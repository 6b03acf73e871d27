//! Please see the documentation for [`Actor`].
use super::*;

static NEXT_ACTOR_ID: AtomicUsize = AtomicUsize::new(1);

/// A worker thread with a private unbounded mailbox.
///
/// The handler given at spawn time runs once, on the actor's own thread, and
/// drains the mailbox through a [`Receiver`]. Dropping the actor, or calling
/// [`Actor::stop`], kills it: the mailbox stops accepting messages, the worker
/// is woken, and the caller blocks until the worker has exited.
///
/// Messages sent before the kill are still delivered, so a handler that
/// iterates its receiver observes the whole backlog before the iteration ends.
/// A handler that returns or panics early closes the mailbox on its way out;
/// later sends fail and unread calls fail their callers.
///
/// ```
/// use chanplex::{Actor, Message, Receiver};
/// use std::sync::mpsc;
///
/// let (report, reports) = mpsc::channel();
/// let logger = Actor::spawn(move |receiver: Receiver<Message>| {
///     for mut msg in &receiver {
///         msg.on::<i32>(|n| report.send(format!("num: {n}")).unwrap())
///             .on::<&str>(|s| report.send(format!("str: {s}")).unwrap())
///             .otherwise(|| report.send("?".to_owned()).unwrap());
///     }
/// })
/// .unwrap();
///
/// logger.send(Message::new(42)).unwrap();
/// logger.send(Message::new("hello")).unwrap();
/// logger.send(Message::new(2.5)).unwrap();
/// logger.stop().unwrap();
/// assert_eq!(reports.iter().collect::<Vec<_>>(), ["num: 42", "str: hello", "?"]);
/// ```
pub struct Actor<M = Message> {
    mailbox: Arc<Channel<M>>,
    worker: Option<JoinHandle<()>>,
    name: String,
}

/// Construction-time configuration for an [`Actor`].
#[derive(Debug, Clone, Default)]
pub struct ActorBuilder {
    name: Option<String>,
}

impl ActorBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Name of the worker thread. Defaults to `actor-<n>`.
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Start the worker thread running `handler`.
    pub fn spawn<M, F>(self, handler: F) -> Result<Actor<M>>
    where
        M: Send + 'static,
        F: FnOnce(Receiver<M>) + Send + 'static,
    {
        let name = self.name.unwrap_or_else(|| {
            format!("actor-{}", NEXT_ACTOR_ID.fetch_add(1, Ordering::Relaxed))
        });
        let mailbox = Arc::new(
            ChannelBuilder::new()
                .unbounded()
                .name(name.as_str())
                .build(),
        );
        let receiver = Receiver {
            mailbox: Arc::clone(&mailbox),
        };
        let worker = thread::Builder::new()
            .name(name.clone())
            .spawn(move || handler(receiver))
            .map_err(|source| Error::Spawn {
                name: name.clone(),
                source,
            })?;
        debug!(actor = %name, "Spawned actor");
        Ok(Actor {
            mailbox,
            worker: Some(worker),
            name,
        })
    }
}

impl<M: Send + 'static> Actor<M> {
    /// Spawn an actor with default configuration.
    pub fn spawn<F>(handler: F) -> Result<Self>
    where
        F: FnOnce(Receiver<M>) + Send + 'static,
    {
        ActorBuilder::default().spawn(handler)
    }

    /// Enqueue a message and wake the worker. Never blocks.
    pub fn send(&self, msg: M) -> Result<(), SendError<M>> {
        self.mailbox.send(msg)
    }

    /// A cloneable handle for sending to this actor from elsewhere,
    /// including from inside messages to other actors.
    pub fn address(&self) -> Address<M> {
        Address {
            mailbox: Arc::clone(&self.mailbox),
        }
    }

    /// Send a request and block until the actor replies.
    ///
    /// # Panics
    ///
    /// This function panics if called within an asynchronous execution context.
    pub fn call<Q, R>(&self, request: Q) -> anyhow::Result<R>
    where
        Q: Send + 'static,
        R: Send + 'static,
        M: From<Call<Q, R>>,
    {
        self.address().call(request)
    }
}

impl<M> Actor<M> {
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Whether the mailbox stopped accepting messages, because the actor was
    /// told to stop or its handler exited.
    pub fn is_killing(&self) -> bool {
        self.mailbox.is_closed()
    }

    /// Kill the actor and wait for its worker to exit.
    pub fn stop(mut self) -> Result<()> {
        self.shutdown()
    }

    fn shutdown(&mut self) -> Result<()> {
        let Some(worker) = self.worker.take() else {
            return Ok(());
        };
        self.mailbox.close();
        if worker.thread().id() == thread::current().id() {
            debug!(actor = %self.name, "Actor dropped on its own worker, not joining");
            return Ok(());
        }
        let joined = worker.join();
        debug!(actor = %self.name, "Actor exited");
        joined.map_err(|_| Error::ActorPanicked {
            name: self.name.clone(),
        })
    }
}

impl<M> Drop for Actor<M> {
    fn drop(&mut self) {
        if let Err(why) = self.shutdown() {
            error!(actor = %self.name, "{why}");
        }
    }
}

impl<M> fmt::Debug for Actor<M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Actor")
            .field("name", &self.name)
            .field("killing", &self.is_killing())
            .finish_non_exhaustive()
    }
}

/// `&actor << msg` sends `msg`. A rejected message is logged and dropped.
impl<'a, M: Send + 'static> Shl<M> for &'a Actor<M> {
    type Output = &'a Actor<M>;

    fn shl(self, msg: M) -> Self::Output {
        if self.send(msg).is_err() {
            warn!(actor = %self.name, "Dropped message sent to a stopping actor");
        }
        self
    }
}

/// The consuming end of an actor's mailbox, handed to the actor's handler.
///
/// Iterate it to process messages until the actor is killed and its backlog
/// is drained.
pub struct Receiver<M> {
    mailbox: Arc<Channel<M>>,
}

impl<M: Send + 'static> Receiver<M> {
    /// Block until a message arrives. Returns `None` once the actor is killed
    /// and its mailbox is empty.
    pub fn receive(&self) -> Option<M> {
        self.mailbox.receive()
    }

    pub fn try_receive(&self) -> Option<M> {
        self.mailbox.try_receive()
    }

    pub fn iter(&self) -> channel::Iter<'_, M> {
        self.mailbox.iter()
    }

    /// Handle for the actor to send to itself or pass its address on.
    pub fn address(&self) -> Address<M> {
        Address {
            mailbox: Arc::clone(&self.mailbox),
        }
    }
}

impl<M> Receiver<M> {
    pub fn is_killing(&self) -> bool {
        self.mailbox.is_closed()
    }
}

/// Once the handler is done with its receiver, the mailbox is closed and any
/// leftover messages are dropped, failing pending calls.
impl<M> Drop for Receiver<M> {
    fn drop(&mut self) {
        self.mailbox.close();
        self.mailbox.clear();
    }
}

impl<M> fmt::Debug for Receiver<M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Receiver")
            .field("actor", &self.mailbox.name())
            .finish()
    }
}

impl<'a, M: Send + 'static> IntoIterator for &'a Receiver<M> {
    type Item = M;
    type IntoIter = channel::Iter<'a, M>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl<M: Send + 'static> IntoIterator for Receiver<M> {
    type Item = M;
    type IntoIter = IntoIter<M>;

    fn into_iter(self) -> Self::IntoIter {
        IntoIter { receiver: self }
    }
}

/// Owning iterator over a [`Receiver`].
#[derive(Debug)]
pub struct IntoIter<M> {
    receiver: Receiver<M>,
}

impl<M: Send + 'static> Iterator for IntoIter<M> {
    type Item = M;

    fn next(&mut self) -> Option<M> {
        self.receiver.receive()
    }
}

/// A cloneable sending handle to an [`Actor`].
///
/// Unlike the actor itself, an address may outlive the worker; sending to a
/// killed actor fails.
pub struct Address<M> {
    mailbox: Arc<Channel<M>>,
}

impl<M: Send + 'static> Address<M> {
    /// Enqueue a message. Never blocks; fails once the actor is killed.
    pub fn send(&self, msg: M) -> Result<(), SendError<M>> {
        self.mailbox.send(msg)
    }

    /// Send a request and block until the actor replies.
    ///
    /// To bound the wait, have the actor reply within its own time limits;
    /// this call has no timeout.
    ///
    /// # Panics
    ///
    /// This function panics if called within an asynchronous execution context.
    pub fn call<Q, R>(&self, request: Q) -> anyhow::Result<R>
    where
        Q: Send + 'static,
        R: Send + 'static,
        M: From<Call<Q, R>>,
    {
        // NB: A `oneshot` channel is a single allocation, cheaper than
        // registering a reply `Channel` with its own controller.
        let (reply_sender, reply_receiver) = oneshot::channel();
        self.send(M::from(Call {
            request,
            reply_sender,
        }))
        .map_err(|_| anyhow!("Actor `{}` is not accepting calls", self.mailbox.name()))?;
        reply_receiver
            .blocking_recv()
            .with_context(|| {
                format!("Failed to receive reply from actor `{}`", self.mailbox.name())
            })
    }
}

impl<M> Address<M> {
    pub fn is_killing(&self) -> bool {
        self.mailbox.is_closed()
    }

    pub fn name(&self) -> &str {
        self.mailbox.name()
    }
}

impl<M> Clone for Address<M> {
    fn clone(&self) -> Self {
        Self {
            mailbox: Arc::clone(&self.mailbox),
        }
    }
}

impl<M> fmt::Debug for Address<M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Address")
            .field("actor", &self.mailbox.name())
            .finish()
    }
}

/// A request expecting a reply, as sent by [`Address::call`].
///
/// The actor answers with [`Call::reply`]. Dropping a call without replying
/// makes the caller's `call` fail instead of hang.
#[derive(Debug)]
pub struct Call<Q, R> {
    request: Q,
    reply_sender: oneshot::Sender<R>,
}

impl<Q, R> Call<Q, R> {
    pub fn request(&self) -> &Q {
        &self.request
    }

    /// Answer the call. Hands the reply back if the caller stopped waiting.
    pub fn reply(self, reply: R) -> Result<(), R> {
        self.reply_sender.send(reply)
    }

    /// Split into the request and a sender for relaying the reply elsewhere.
    pub fn into_parts(self) -> (Q, oneshot::Sender<R>) {
        (self.request, self.reply_sender)
    }
}

impl<Q: Send + Sync + 'static, R: Send + 'static> From<Call<Q, R>> for Message {
    fn from(call: Call<Q, R>) -> Self {
        Message::new(call)
    }
}

#[cfg(test)]
mod tests;
