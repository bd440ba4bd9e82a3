use std::any::Any;
use std::fmt;

// Type aliases for common types
pub type Payload = Box<dyn Any + Send>;

/// Process-local address of a service.
///
/// Handle `0` is reserved and means "no service"; it is used as the source of
/// messages that originate outside any service and as the idle marker in a
/// [`StallDetector`](crate::monitor::StallDetector).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ServiceHandle(pub u32);

impl ServiceHandle {
    /// The reserved "no service" handle.
    pub const NONE: ServiceHandle = ServiceHandle(0);

    pub fn is_none(self) -> bool {
        self.0 == 0
    }
}

impl fmt::Display for ServiceHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, ":{:08x}", self.0)
    }
}

/// A message queued for a service.
pub struct Message {
    /// Sender of the message, [`ServiceHandle::NONE`] for external input.
    pub source: ServiceHandle,
    /// Request/response correlation id chosen by the sender.
    pub session: u32,
    /// Opaque body; its format belongs to the services exchanging it.
    pub payload: Payload,
}

impl Message {
    pub fn new(source: ServiceHandle, session: u32, payload: Payload) -> Self {
        Self { source, session, payload }
    }

    /// Attempts to view the payload as a concrete type.
    pub fn payload_ref<T: Any>(&self) -> Option<&T> {
        self.payload.downcast_ref::<T>()
    }
}

impl fmt::Debug for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Message")
            .field("source", &self.source)
            .field("session", &self.session)
            .finish_non_exhaustive()
    }
}
