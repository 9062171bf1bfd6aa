//! One-shot deferred tasks for proactive refresh
//!
//! Native builds sleep in a spawned tokio task; browser builds use a
//! `setTimeout` handle. Cancelling only stops a timer that has not fired yet.

use std::future::Future;
use std::time::Duration;

#[cfg(not(target_arch = "wasm32"))]
type Handle = tokio::task::JoinHandle<()>;

#[cfg(target_arch = "wasm32")]
type Handle = gloo_timers::callback::Timeout;

/// A scheduled refresh, tagged with the generation it was created for
pub struct RefreshTimer {
    generation: u64,
    handle: Handle,
}

impl RefreshTimer {
    pub const fn generation(&self) -> u64 {
        self.generation
    }

    /// Stop the timer if it has not fired
    pub fn cancel(self) {
        #[cfg(not(target_arch = "wasm32"))]
        self.handle.abort();

        // Dropping a Timeout clears it
        #[cfg(target_arch = "wasm32")]
        drop(self.handle);
    }
}

/// Run `task` once after `delay`.
///
/// Returns `None` when called outside a tokio runtime.
#[cfg(not(target_arch = "wasm32"))]
pub fn schedule<F>(delay: Duration, generation: u64, task: F) -> Option<RefreshTimer>
where
    F: Future<Output = ()> + Send + 'static,
{
    let runtime = tokio::runtime::Handle::try_current().ok()?;
    let handle = runtime.spawn(async move {
        tokio::time::sleep(delay).await;
        task.await;
    });
    Some(RefreshTimer { generation, handle })
}

/// Run `task` once after `delay`.
#[cfg(target_arch = "wasm32")]
pub fn schedule<F>(delay: Duration, generation: u64, task: F) -> Option<RefreshTimer>
where
    F: Future<Output = ()> + 'static,
{
    let millis = u32::try_from(delay.as_millis()).unwrap_or(u32::MAX);
    let handle = gloo_timers::callback::Timeout::new(millis, move || {
        wasm_bindgen_futures::spawn_local(task);
    });
    Some(RefreshTimer { generation, handle })
}
