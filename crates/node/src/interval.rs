use std::sync::Arc;

use devnet_state_api::StateManager;
use tokio::{
    runtime,
    sync::{Mutex, oneshot},
    task::JoinHandle,
    time::Instant,
};

use crate::{IntervalConfig, Node, NodeError, executor::Executor, time::TimeSinceEpoch};

/// Type for interval mining on a separate task.
pub struct IntervalMiner {
    inner: Option<Inner>,
    runtime: runtime::Handle,
}

/// Inner type for interval mining on a separate task, required for
/// implementation of `Drop`.
struct Inner {
    cancellation_sender: oneshot::Sender<()>,
    background_task: JoinHandle<Result<(), NodeError>>,
}

impl IntervalMiner {
    /// Spawns a task on the provided runtime that mines a block whenever an
    /// interval generated from the configuration elapses.
    pub fn new<StateT, ExecutorT, TimerT>(
        runtime: runtime::Handle,
        config: IntervalConfig,
        node: Arc<Mutex<Node<StateT, ExecutorT, TimerT>>>,
    ) -> Self
    where
        StateT: StateManager + Send + 'static,
        ExecutorT: Executor<StateT> + 'static,
        TimerT: TimeSinceEpoch + 'static,
    {
        let (cancellation_sender, cancellation_receiver) = oneshot::channel();
        let background_task = runtime
            .spawn(async move { interval_mining_loop(config, node, cancellation_receiver).await });

        Self {
            inner: Some(Inner {
                cancellation_sender,
                background_task,
            }),
            runtime,
        }
    }
}

#[cfg_attr(feature = "tracing", tracing::instrument(skip_all))]
async fn interval_mining_loop<StateT, ExecutorT, TimerT>(
    config: IntervalConfig,
    node: Arc<Mutex<Node<StateT, ExecutorT, TimerT>>>,
    mut cancellation_receiver: oneshot::Receiver<()>,
) -> Result<(), NodeError>
where
    StateT: StateManager,
    ExecutorT: Executor<StateT>,
    TimerT: TimeSinceEpoch,
{
    let mut now = Instant::now();
    loop {
        let delay = config.generate_interval();
        let deadline = now + std::time::Duration::from_millis(delay);

        tokio::select! {
            _ = &mut cancellation_receiver => return Ok(()),
            _ = tokio::time::sleep_until(deadline) => {
                tokio::select! {
                    // Check whether the interval miner needs to be destroyed
                    _ = &mut cancellation_receiver => return Ok(()),
                    mut node = node.lock() => {
                        now = Instant::now();

                        if let Err(error) = node.interval_mine() {
                            log::error!("Unexpected error while performing interval mining: {error}");
                            return Err(error);
                        }

                        Result::<(), NodeError>::Ok(())
                    }
                }
            },
        }?;
    }
}

impl Drop for IntervalMiner {
    #[cfg_attr(feature = "tracing", tracing::instrument(skip_all))]
    fn drop(&mut self) {
        if let Some(Inner {
            cancellation_sender,
            background_task: task,
        }) = self.inner.take()
        {
            // The task has already stopped if the receiver was dropped
            if cancellation_sender.send(()).is_err() {
                log::debug!("Interval mining task stopped before cancellation");
            }

            match tokio::task::block_in_place(move || self.runtime.block_on(task)) {
                Ok(Ok(())) => (),
                Ok(Err(error)) => log::error!("Interval mining stopped with an error: {error}"),
                Err(error) => log::error!("Failed to join interval mining task: {error}"),
            }
        }
    }
}
