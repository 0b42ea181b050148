//! Idle auto-lock timer.
//!
//! A tokio task holding a resettable deadline. It fires at most once per
//! armed period: after firing it stays idle until the next `arm`.

use std::sync::Arc;
use std::time::Duration;

use tokio::runtime::Handle;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{sleep_until, Instant};
use tracing::debug;

#[derive(Debug, Clone, Copy)]
enum Signal {
    Arm,
    Activity,
    Disarm,
}

pub(crate) struct IdleTimer {
    signals: mpsc::UnboundedSender<Signal>,
    task: JoinHandle<()>,
}

impl IdleTimer {
    pub(crate) fn spawn(handle: &Handle, timeout: Duration, on_idle: Arc<dyn Fn() + Send + Sync>) -> Self {
        let (signals, mut rx) = mpsc::unbounded_channel();

        let task = handle.spawn(async move {
            let mut deadline: Option<Instant> = None;

            loop {
                let signal = match deadline {
                    Some(at) => tokio::select! {
                        signal = rx.recv() => signal,
                        _ = sleep_until(at) => {
                            deadline = None;
                            debug!("Idle timeout elapsed");
                            on_idle();
                            continue;
                        }
                    },
                    None => rx.recv().await,
                };

                match signal {
                    Some(Signal::Arm) => deadline = Some(Instant::now() + timeout),
                    Some(Signal::Activity) => {
                        if deadline.is_some() {
                            deadline = Some(Instant::now() + timeout);
                        }
                    }
                    Some(Signal::Disarm) => deadline = None,
                    None => break,
                }
            }
        });

        Self { signals, task }
    }

    pub(crate) fn arm(&self) {
        let _ = self.signals.send(Signal::Arm);
    }

    /// Push the deadline back. No effect while disarmed.
    pub(crate) fn activity(&self) {
        let _ = self.signals.send(Signal::Activity);
    }

    pub(crate) fn disarm(&self) {
        let _ = self.signals.send(Signal::Disarm);
    }
}

impl Drop for IdleTimer {
    fn drop(&mut self) {
        self.task.abort();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn counting_timer(timeout: Duration) -> (IdleTimer, Arc<AtomicUsize>) {
        let fired = Arc::new(AtomicUsize::new(0));
        let counter = fired.clone();
        let timer = IdleTimer::spawn(
            &Handle::current(),
            timeout,
            Arc::new(move || {
                counter.fetch_add(1, Ordering::SeqCst);
            }),
        );
        (timer, fired)
    }

    #[tokio::test]
    async fn test_fires_once_per_arm() {
        let (timer, fired) = counting_timer(Duration::from_millis(50));

        timer.arm();
        tokio::time::sleep(Duration::from_millis(200)).await;
        assert_eq!(fired.load(Ordering::SeqCst), 1);

        timer.activity();
        tokio::time::sleep(Duration::from_millis(150)).await;
        assert_eq!(fired.load(Ordering::SeqCst), 1);

        timer.arm();
        tokio::time::sleep(Duration::from_millis(200)).await;
        assert_eq!(fired.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_activity_postpones() {
        let (timer, fired) = counting_timer(Duration::from_millis(150));

        timer.arm();
        for _ in 0..4 {
            tokio::time::sleep(Duration::from_millis(60)).await;
            timer.activity();
        }
        assert_eq!(fired.load(Ordering::SeqCst), 0);

        tokio::time::sleep(Duration::from_millis(300)).await;
        assert_eq!(fired.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_disarm_cancels() {
        let (timer, fired) = counting_timer(Duration::from_millis(50));

        timer.arm();
        timer.disarm();
        tokio::time::sleep(Duration::from_millis(150)).await;
        assert_eq!(fired.load(Ordering::SeqCst), 0);
    }
}
