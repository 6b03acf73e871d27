//! Bounded channels with multiplexed select, and thread-per-actor mailboxes.
//!
//! - [`Channel`]: typed, bounded FIFO with blocking and non-blocking
//!   send/receive.
//! - [`Controller`]: coordination context shared by a group of channels, so
//!   [`Controller::select`] can wait on all of them at once even though they
//!   carry different types.
//! - [`Actor`]: a dedicated worker thread draining a private unbounded
//!   mailbox, by default of type-erased [`Message`]s dispatched with
//!   [`Message::on`].
//!
//! ```
//! use chanplex::Controller;
//! use std::thread;
//!
//! let controller = Controller::new();
//! let numbers = controller.channel::<i32>(1, "numbers");
//! let names = controller.channel::<&str>(1, "names");
//!
//! thread::scope(|s| {
//!     s.spawn(|| {
//!         for n in 1..=3 {
//!             numbers.send(n).unwrap();
//!         }
//!         numbers.close();
//!     });
//!     s.spawn(|| {
//!         for name in ["Alice", "Bob"] {
//!             names.send(name).unwrap();
//!         }
//!         names.close();
//!     });
//!
//!     let mut received = 0;
//!     loop {
//!         let ready = controller.select(&[&numbers, &names]).unwrap();
//!         if ready.is_empty() {
//!             break;
//!         }
//!         for position in ready {
//!             match position {
//!                 0 => received += numbers.try_receive().is_some() as usize,
//!                 _ => received += names.try_receive().is_some() as usize,
//!             }
//!         }
//!     }
//!     assert_eq!(received, 5);
//! });
//! ```

use std::{
    any::{type_name, Any, TypeId},
    collections::VecDeque,
    fmt,
    marker::PhantomData,
    mem,
    ops::Shl,
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc,
    },
    thread::{self, JoinHandle},
    time::{Duration, Instant},
};

use anyhow::{anyhow, Context};
use parking_lot::{Condvar, Mutex, MutexGuard};
use tokio::sync::oneshot;
use tracing::{debug, error, warn};

pub mod actor;
pub mod channel;
pub mod controller;
pub mod error;
pub mod message;
pub mod select;

#[doc(inline)]
pub use self::{
    actor::{Actor, ActorBuilder, Address, Call, Receiver},
    channel::{Channel, ChannelBuilder},
    controller::{Controller, Selectable},
    error::{Error, Result, SendError, TrySendError},
    message::Message,
    select::Selector,
};

pub mod prelude {
    #[doc(inline)]
    pub use super::{
        Actor, ActorBuilder, Address, Call, Channel, ChannelBuilder, Controller, Message,
        Receiver, Selectable, Selector,
    };
}
