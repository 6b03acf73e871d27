//! Type-erased messages with once-only pattern dispatch.
use super::*;

/// One value of any `Send + Sync + 'static` type, boxed for transport through
/// a mailbox whose receiver does not know the type at compile time.
///
/// Being `Sync` lets a rejected [`SendError<Message>`](crate::SendError)
/// propagate into `anyhow::Error` with `?`.
///
/// Dispatch by type with chained [`Message::on`] calls. The first handler
/// whose type equals the boxed type fires and consumes the value; every later
/// attempt is a no-op.
///
/// ```
/// use chanplex::Message;
///
/// let mut log = Vec::new();
/// Message::new(42_i32)
///     .on::<String>(|s| log.push(format!("str: {s}")))
///     .on::<i32>(|n| log.push(format!("num: {n}")))
///     .otherwise(|| log.push("unhandled".to_owned()));
/// assert_eq!(log, ["num: 42"]);
/// ```
pub struct Message {
    value: Option<Box<dyn Any + Send + Sync>>,
    type_id: TypeId,
    type_name: &'static str,
}

impl Message {
    pub fn new<T: Any + Send + Sync>(value: T) -> Self {
        Self {
            value: Some(Box::new(value)),
            type_id: TypeId::of::<T>(),
            type_name: type_name::<T>(),
        }
    }

    /// Whether the message holds a `T`. No coercion between types is done, so
    /// a message holding an `i32` is not an `i64`.
    ///
    /// Answers from the type the message was created with, so it stays `true`
    /// after a match consumed the value.
    pub fn is<T: Any>(&self) -> bool {
        self.type_id == TypeId::of::<T>()
    }

    /// Name of the type the message was created with.
    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    /// Whether a [`Message::on`] handler already fired.
    pub fn is_matched(&self) -> bool {
        self.value.is_none()
    }

    /// Extract the value as `T`.
    pub fn get<T: Any>(mut self) -> Result<T> {
        self.take::<T>()
    }

    /// Borrow the value as `T`.
    pub fn get_ref<T: Any>(&self) -> Result<&T> {
        let value = self.value.as_ref().ok_or(Error::AlreadyMatched {
            type_name: self.type_name,
        })?;
        value.downcast_ref::<T>().ok_or(Error::TypeMismatch {
            expected: type_name::<T>(),
            found: self.type_name,
        })
    }

    /// Call `handler` with the value if it is a `T` and no earlier match fired.
    pub fn on<T: Any>(&mut self, handler: impl FnOnce(T)) -> &mut Self {
        if self.is::<T>() && !self.is_matched() {
            if let Ok(value) = self.take::<T>() {
                handler(value);
            }
        }
        self
    }

    /// Call `handler` if no earlier [`Message::on`] fired.
    pub fn otherwise(&mut self, handler: impl FnOnce()) {
        if !self.is_matched() {
            handler();
        }
    }

    /// Extract the value as `T`, which the caller knows from protocol context,
    /// and pass it to `handler`.
    pub fn expect<T: Any, R>(self, handler: impl FnOnce(T) -> R) -> Result<R> {
        self.get::<T>().map(handler)
    }

    fn take<T: Any>(&mut self) -> Result<T> {
        let value = self.value.take().ok_or(Error::AlreadyMatched {
            type_name: self.type_name,
        })?;
        match value.downcast::<T>() {
            Ok(value) => Ok(*value),
            Err(value) => {
                self.value = Some(value);
                Err(Error::TypeMismatch {
                    expected: type_name::<T>(),
                    found: self.type_name,
                })
            }
        }
    }
}

impl fmt::Debug for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Message")
            .field("type_name", &self.type_name)
            .field("matched", &self.is_matched())
            .finish()
    }
}
