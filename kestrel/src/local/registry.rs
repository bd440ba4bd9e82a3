use std::collections::{HashMap, VecDeque};
use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU32, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, RwLock};

use crossbeam_queue::SegQueue;
use tracing::{debug, warn};

use kestrel_api::errors::{SystemError, SystemResult};
use kestrel_api::monitor::{Stall, StallDetector};
use kestrel_api::registry::{DispatchOutcome, ServiceRegistry};
use kestrel_api::types::{Message, Payload, ServiceHandle};

/// What a handler wants to happen to its service after a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServiceControl {
    Continue,
    /// Retire the service; pending messages are dropped.
    Exit,
}

/// Message handler for one service.
pub type Handler = Box<dyn FnMut(Message) -> ServiceControl + Send>;

/// Pending messages plus the flag telling whether the service currently
/// sits in the ready queue. Both change under the same lock.
#[derive(Default)]
struct Mailbox {
    messages: VecDeque<Message>,
    scheduled: bool,
    retired: bool,
}

struct Service {
    handle: ServiceHandle,
    mailbox: Mutex<Mailbox>,
    handler: Mutex<Handler>,
    endless: AtomicBool,
}

/// In-process service registry.
///
/// Services with pending messages sit in a lock-free ready queue, each at
/// most once. [`dispatch`](ServiceRegistry::dispatch) takes one service off
/// the queue, delivers a single message and puts the service back if it
/// still has work, so a busy service cannot starve the others.
///
/// # Thread Safety
/// - The ready queue is a `SegQueue`, safe for concurrent producers and
///   consumers
/// - A service is dispatched by at most one worker at a time, because it is
///   in the ready queue at most once
pub struct LocalRegistry {
    services: RwLock<HashMap<ServiceHandle, Arc<Service>>>,
    ready: SegQueue<Arc<Service>>,
    next_handle: AtomicU32,
    live: AtomicUsize,
}

impl fmt::Debug for LocalRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LocalRegistry")
            .field("live", &self.live.load(Ordering::Relaxed))
            .field("ready", &self.ready.len())
            .finish()
    }
}

impl Default for LocalRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl LocalRegistry {
    pub fn new() -> Self {
        Self {
            services: RwLock::new(HashMap::new()),
            ready: SegQueue::new(),
            next_handle: AtomicU32::new(1),
            live: AtomicUsize::new(0),
        }
    }

    /// Registers a service and returns its handle.
    pub fn register<F>(&self, handler: F) -> ServiceHandle
    where
        F: FnMut(Message) -> ServiceControl + Send + 'static,
    {
        let handle = ServiceHandle(self.next_handle.fetch_add(1, Ordering::Relaxed));
        let service = Arc::new(Service {
            handle,
            mailbox: Mutex::new(Mailbox::default()),
            handler: Mutex::new(Box::new(handler)),
            endless: AtomicBool::new(false),
        });
        self.write_services().insert(handle, service);
        self.live.fetch_add(1, Ordering::SeqCst);
        debug!(service = %handle, "service registered");
        handle
    }

    /// Queues a message for `destination`.
    ///
    /// No worker is woken here; a parked pool picks the message up on the
    /// next timer tick at the latest.
    pub fn send(
        &self,
        source: ServiceHandle,
        destination: ServiceHandle,
        session: u32,
        payload: Payload,
    ) -> SystemResult<()> {
        let service = self
            .lookup(destination)
            .ok_or(SystemError::ServiceNotFound(destination))?;

        let mut mailbox = lock(&service.mailbox);
        if mailbox.retired {
            return Err(SystemError::ServiceNotFound(destination));
        }
        mailbox.messages.push_back(Message::new(source, session, payload));
        if !mailbox.scheduled {
            mailbox.scheduled = true;
            self.ready.push(service.clone());
        }
        Ok(())
    }

    /// Removes a service. Pending messages are dropped.
    ///
    /// Returns `false` if the handle was unknown or already retired.
    pub fn retire(&self, handle: ServiceHandle) -> bool {
        let Some(service) = self.write_services().remove(&handle) else {
            return false;
        };
        let dropped = {
            let mut mailbox = lock(&service.mailbox);
            mailbox.retired = true;
            std::mem::take(&mut mailbox.messages).len()
        };
        self.live.fetch_sub(1, Ordering::SeqCst);
        debug!(service = %handle, dropped = dropped, "service retired");
        true
    }

    /// Whether the watchdog flagged `handle` as possibly stuck.
    pub fn is_endless(&self, handle: ServiceHandle) -> bool {
        self.lookup(handle)
            .is_some_and(|service| service.endless.load(Ordering::Relaxed))
    }

    /// Number of messages waiting for `handle`, if it is registered.
    pub fn pending(&self, handle: ServiceHandle) -> Option<usize> {
        self.lookup(handle)
            .map(|service| lock(&service.mailbox).messages.len())
    }

    fn lookup(&self, handle: ServiceHandle) -> Option<Arc<Service>> {
        self.services
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .get(&handle)
            .cloned()
    }

    fn write_services(&self) -> std::sync::RwLockWriteGuard<'_, HashMap<ServiceHandle, Arc<Service>>> {
        self.services
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn deliver(&self, service: &Arc<Service>, message: Message, detector: &StallDetector) {
        detector.begin(message.source, service.handle);
        let control = {
            let mut handler = lock(&service.handler);
            (*handler)(message)
        };
        detector.finish();

        if control == ServiceControl::Exit {
            self.retire(service.handle);
        }
    }
}

impl ServiceRegistry for LocalRegistry {
    fn dispatch(&self, detector: &StallDetector) -> DispatchOutcome {
        let (service, message) = loop {
            let Some(service) = self.ready.pop() else {
                return DispatchOutcome::Idle;
            };
            let mut mailbox = lock(&service.mailbox);
            match mailbox.messages.pop_front() {
                Some(message) => {
                    drop(mailbox);
                    break (service, message);
                }
                // Emptied by retire while queued
                None => mailbox.scheduled = false,
            }
        };

        self.deliver(&service, message, detector);

        let mut mailbox = lock(&service.mailbox);
        if mailbox.messages.is_empty() || mailbox.retired {
            mailbox.scheduled = false;
        } else {
            self.ready.push(service.clone());
        }
        DispatchOutcome::Dispatched
    }

    fn live_service_count(&self) -> usize {
        self.live.load(Ordering::SeqCst)
    }

    fn report_stall(&self, worker: usize, stall: &Stall) {
        if let Some(service) = self.lookup(stall.destination) {
            if !service.endless.swap(true, Ordering::Relaxed) {
                warn!(worker = worker, service = %stall.destination, "service marked endless");
            }
        }
    }
}

fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    // A panicking handler must not take the whole registry down with it
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}
