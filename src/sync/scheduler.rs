//! Task scheduler
//!
//! One-off tasks (interval zero) run first, in configuration order. Each
//! recurring task then gets a timer that fires immediately and every
//! `interval` afterwards, posting the task's index onto a shared queue. A
//! single loop drains the queue, so at most one task runs at any time.
//!
//! Ticks are coalesced per task: while a task is pending in the queue further
//! ticks for it are dropped. The pending mark is cleared when the task is
//! taken off the queue, so a tick arriving during a run queues exactly one
//! more run after it.

use crate::sync::engine::Syncer;
use crate::sync::task::Task;
use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinSet;
use tokio::time::MissedTickBehavior;

/// How long to wait for the container daemon before the first task
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PingPolicy {
    pub attempts: u32,
    pub interval: Duration,
}

impl Default for PingPolicy {
    fn default() -> Self {
        Self {
            attempts: 30,
            interval: Duration::from_secs(10),
        }
    }
}

pub struct Scheduler {
    syncer: Syncer,
    ping: PingPolicy,
}

impl Scheduler {
    pub fn new(syncer: Syncer) -> Self {
        Self {
            syncer,
            ping: PingPolicy::default(),
        }
    }

    pub fn with_ping_policy(mut self, ping: PingPolicy) -> Self {
        self.ping = ping;
        self
    }

    pub fn syncer(&self) -> &Syncer {
        &self.syncer
    }

    /// Run all tasks; never returns while recurring tasks exist
    pub async fn run_all(&self, tasks: Vec<Task>) {
        self.run(tasks, futures::future::pending::<()>()).await
    }

    /// Like [`Scheduler::run_all`], but stops waiting for ticks once
    /// `shutdown` completes. A task already running is finished first.
    pub async fn run<F>(&self, tasks: Vec<Task>, shutdown: F)
    where
        F: Future<Output = ()>,
    {
        let output = self.syncer.logger();

        // the daemon may still be starting up, e.g. when run next to a
        // docker-in-docker sidecar
        output.blank();
        output.info("pinging Docker daemon...");
        match self
            .syncer
            .client()
            .ping(self.ping.attempts, self.ping.interval)
            .await
        {
            Ok(()) => output.info("ok"),
            Err(e) => output.error(&e.to_string()),
        }

        let (one_off, recurring): (Vec<Task>, Vec<Task>) =
            tasks.into_iter().partition(|task| !task.is_recurring());

        for task in &one_off {
            self.run_task(task).await;
        }

        if !recurring.is_empty() {
            self.run_recurring(recurring, shutdown).await;
        }

        output.info("all done");
    }

    async fn run_recurring<F>(&self, tasks: Vec<Task>, shutdown: F)
    where
        F: Future<Output = ()>,
    {
        let output = self.syncer.logger();
        let (tx, mut rx) = mpsc::channel::<usize>(tasks.len());
        let pending: Vec<Arc<AtomicBool>> = tasks.iter().map(|_| Arc::new(AtomicBool::new(false))).collect();

        let mut timers = JoinSet::new();
        for (index, task) in tasks.iter().enumerate() {
            timers.spawn(tick(index, task.interval, pending[index].clone(), tx.clone()));
        }
        drop(tx);

        tokio::pin!(shutdown);
        loop {
            output.blank();
            output.info("waiting for next sync task...");
            output.blank();

            let index = tokio::select! {
                biased;
                _ = &mut shutdown => {
                    output.info("shutdown requested");
                    break;
                }
                next = rx.recv() => match next {
                    Some(index) => index,
                    None => break,
                },
            };

            pending[index].store(false, Ordering::SeqCst);
            self.run_task(&tasks[index]).await;
        }

        timers.abort_all();
    }

    async fn run_task(&self, task: &Task) {
        let failed = self.syncer.sync_task(task).await;
        if failed > 0 {
            self.syncer.logger().warning(&format!(
                "task '{}' finished with {} failed mapping(s)",
                task.name, failed
            ));
        } else {
            self.syncer.logger().info(&format!("task '{}' done", task.name));
        }
    }
}

/// Post `index` on every tick unless it is still pending
async fn tick(index: usize, interval: Duration, pending: Arc<AtomicBool>, tx: mpsc::Sender<usize>) {
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        ticker.tick().await;
        if pending.swap(true, Ordering::SeqCst) {
            continue;
        }
        if tx.send(index).await.is_err() {
            break;
        }
    }
}
