//! A two-level supervision tree.
//!
//! ```text
//! root (ONE_FOR_ALL)
//!   ├─ counter   actor with a bounded mailbox
//!   └─ api       nested supervisor (ONE_FOR_ONE, 3 restarts / 10s)
//!        ├─ client   looks up `counter` in the registry and feeds it
//!        └─ flaky    fails every few seconds
//! ```
//!
//! Run with `RUST_LOG=treevisor=debug cargo run --example supervision_tree`, stop with Ctrl-C.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::{Mutex, mpsc};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

use treevisor::{
    ChildSpec, LogWriter, Registry, RestartStrategy, Subscribe, Supervisor, SupervisorConfig,
    Worker, WorkerError, WorkerFn,
};

/// Actor summing the numbers it receives.
struct Counter {
    tx: mpsc::Sender<u64>,
    rx: Mutex<mpsc::Receiver<u64>>,
    total: AtomicU64,
}

impl Counter {
    fn new(max_queue_len: usize) -> Self {
        let (tx, rx) = mpsc::channel(max_queue_len.max(1));
        Self {
            tx,
            rx: Mutex::new(rx),
            total: AtomicU64::new(0),
        }
    }

    fn add(&self, n: u64) -> Result<(), WorkerError> {
        self.tx
            .try_send(n)
            .map_err(|e| WorkerError::fail(format!("counter mailbox: {e}")))
    }
}

#[async_trait]
impl Worker for Counter {
    async fn run(&self, ctx: CancellationToken) -> Result<(), WorkerError> {
        let mut rx = self.rx.lock().await;
        loop {
            tokio::select! {
                _ = ctx.cancelled() => return Ok(()),
                msg = rx.recv() => match msg {
                    Some(n) => {
                        let total = self.total.fetch_add(n, Ordering::Relaxed) + n;
                        tracing::info!(total, "counter updated");
                    }
                    None => return Err(WorkerError::fail("mailbox closed")),
                },
            }
        }
    }
}

#[tokio::main(flavor = "multi_thread")]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let registry = Registry::new();
    let subs: Vec<Arc<dyn Subscribe>> = vec![Arc::new(LogWriter::new())];

    let counter = ChildSpec::actor("counter", (), |_name: &str, max_queue_len: usize, _: &()| {
        Ok(Counter::new(max_queue_len))
    })
    .with_max_queue_len(16);

    let client = ChildSpec::worker(
        "client",
        Arc::clone(&registry),
        |_name: &str, registry: &Arc<Registry>| {
            let registry = Arc::clone(registry);
            Ok(WorkerFn::new(move |ctx: CancellationToken| {
                let registry = Arc::clone(&registry);
                async move {
                    let mut tick = tokio::time::interval(Duration::from_millis(500));
                    let mut n = 0;
                    loop {
                        tokio::select! {
                            _ = ctx.cancelled() => return Ok(()),
                            _ = tick.tick() => {}
                        }
                        n += 1;
                        let counter = registry
                            .get_actor("counter")
                            .map_err(|e| WorkerError::fail(e.to_string()))?
                            .downcast::<Counter>()
                            .ok_or_else(|| WorkerError::fail("counter has unexpected type"))?;
                        counter.add(n)?;
                    }
                }
            }))
        },
    );

    let flaky = ChildSpec::worker("flaky", 3u64, |_name: &str, every: &u64| {
        let every = Duration::from_secs(*every);
        Ok(WorkerFn::new(move |ctx: CancellationToken| async move {
            tokio::select! {
                _ = ctx.cancelled() => Ok(()),
                _ = tokio::time::sleep(every) => Err(WorkerError::fail("simulated crash")),
            }
        }))
    });

    let api = Supervisor::builder("api", RestartStrategy::OneForOne)
        .with_registry(Arc::clone(&registry))
        .with_subscribers(subs.clone())
        .with_config(SupervisorConfig::default().with_restart_intensity(3, Duration::from_secs(10)))
        .with_child(client)
        .with_child(flaky);

    let root = Supervisor::builder("root", RestartStrategy::OneForAll)
        .with_registry(Arc::clone(&registry))
        .with_subscribers(subs)
        .with_config(SupervisorConfig::default().with_grace(Duration::from_secs(10)))
        .with_child(counter)
        .with_child(ChildSpec::supervisor(api))
        .start()?;

    tracing::info!(registered = ?registry.names(), "tree started");

    if let Err(e) = root.run_until_signal().await {
        tracing::warn!(error = %e, label = e.as_label(), "shutdown incomplete");
    }
    tracing::info!(exit = %root.wait().await, "root exited");
    Ok(())
}
