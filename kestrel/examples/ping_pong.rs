//! Two services bouncing a counter back and forth on a scheduler pool.
//!
//! The pool shuts itself down once both services have exited.
//!
//! ```text
//! RUST_LOG=kestrel=debug cargo run --example ping_pong
//! ```

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, OnceLock};

use kestrel::config::SchedulerConfig;
use kestrel::local::{ChannelPoller, LocalRegistry, MonotonicClock, ServiceControl};
use kestrel::scheduler::{Collaborators, Scheduler};
use kestrel::logging;
use kestrel_api::types::{Message, ServiceHandle};
use tracing::info;

const ROUNDS: u32 = 10_000;
const STOP: u32 = u32::MAX;

fn main() -> anyhow::Result<()> {
    logging::init_development();

    let registry = Arc::new(LocalRegistry::new());
    let rallies = Arc::new(AtomicU32::new(0));

    let pong_handle = Arc::new(OnceLock::new());
    let pong = {
        let weak = Arc::downgrade(&registry);
        let me = pong_handle.clone();
        registry.register(move |message: Message| {
            let Some(&n) = message.payload_ref::<u32>() else {
                return ServiceControl::Continue;
            };
            if n == STOP {
                return ServiceControl::Exit;
            }
            if let (Some(registry), Some(&me)) = (weak.upgrade(), me.get()) {
                let _ = registry.send(me, message.source, message.session, Box::new(n + 1));
            }
            ServiceControl::Continue
        })
    };
    let _ = pong_handle.set(pong);

    let ping_handle = Arc::new(OnceLock::new());
    let ping = {
        let weak = Arc::downgrade(&registry);
        let me = ping_handle.clone();
        let rallies = rallies.clone();
        registry.register(move |message: Message| {
            let Some(&n) = message.payload_ref::<u32>() else {
                return ServiceControl::Continue;
            };
            rallies.store(n, Ordering::Relaxed);
            let (Some(registry), Some(&me)) = (weak.upgrade(), me.get()) else {
                return ServiceControl::Exit;
            };
            if n >= ROUNDS {
                let _ = registry.send(me, pong, 0, Box::new(STOP));
                return ServiceControl::Exit;
            }
            let _ = registry.send(me, pong, message.session, Box::new(n + 1));
            ServiceControl::Continue
        })
    };
    let _ = ping_handle.set(ping);

    registry.send(ServiceHandle::NONE, ping, 1, Box::new(0u32))?;

    let collaborators = Collaborators::new(
        registry.clone(),
        Arc::new(ChannelPoller::new()),
        Arc::new(MonotonicClock::new()),
    );
    let scheduler = Scheduler::new(SchedulerConfig::with_workers(4), collaborators)?;
    let report = scheduler.run()?;

    info!(
        rallies = rallies.load(Ordering::Relaxed),
        dispatched = report.dispatched,
        ticks = report.ticks,
        "ping pong finished"
    );
    anyhow::ensure!(report.is_clean(), "pool threads panicked: {:?}", report.panicked);
    Ok(())
}
