use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};

use anyhow::{Context, Result};

pub mod run;
pub mod test_game;
pub mod test_referee;
pub mod test_vision;

/// A flag the blocking loops poll to know when to stop.
#[derive(Clone, Default)]
pub struct StopFlag(Arc<AtomicBool>);

impl StopFlag {
    pub fn is_set(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }

    fn set(&self) {
        self.0.store(true, Ordering::Relaxed);
    }
}

/// Run a blocking loop on the blocking thread pool until it returns or ctrl-c is
/// pressed. On ctrl-c the loop is asked to stop and awaited.
async fn run_until_ctrl_c<F>(body: F) -> Result<()>
where
    F: FnOnce(StopFlag) -> Result<()> + Send + 'static,
{
    let stop = StopFlag::default();
    let loop_stop = stop.clone();
    let mut task = tokio::task::spawn_blocking(move || body(loop_stop));

    tokio::select! {
        result = &mut task => return result.context("Main loop panicked")?,
        signal = tokio::signal::ctrl_c() => signal.context("Failed to listen for ctrl-c")?,
    }

    tracing::info!("Shutting down");
    stop.set();
    task.await.context("Main loop panicked")?
}
