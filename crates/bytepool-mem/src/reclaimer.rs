//! Background thread that trims idle pool memory.
//!
//! Every tick it swaps at most one filled ledger slot for a placeholder, so
//! under low demand resident memory drains by one buffer per interval while
//! the slot count stays at `max_count`. Abandoned handles need no help here:
//! their drop guard has already restored a placeholder.
//!
//! The thread keeps only a weak reference to the pool. It exits when the
//! pool's shared state is dropped, which disconnects `stop`.

use std::sync::Weak;
use std::thread;
use std::time::Duration;

use crossbeam_channel::{select, Receiver};

use crate::error::Result;
use crate::pool::Shared;

pub(crate) fn spawn(shared: Weak<Shared>, stop: Receiver<()>, interval: Duration) -> Result<()> {
    thread::Builder::new()
        .name("bytepool-reclaimer".into())
        .spawn(move || run(shared, stop, interval))?;
    Ok(())
}

fn run(shared: Weak<Shared>, stop: Receiver<()>, interval: Duration) {
    #[cfg(feature = "tracing")]
    tracing::debug!(
        interval_ms = u64::try_from(interval.as_millis()).unwrap_or(u64::MAX),
        "reclaimer started"
    );

    let ticker = crossbeam_channel::tick(interval);
    loop {
        select! {
            recv(stop) -> _ => break,
            recv(ticker) -> _ => {
                let Some(shared) = shared.upgrade() else { break };
                shared.sweep();
            }
        }
    }

    #[cfg(feature = "tracing")]
    tracing::debug!("reclaimer stopped");
}
