//! Cooperative cancellation for the polling loop.
//!
//! The loop only observes a shutdown request between targets and while it
//! sleeps; in-flight requests run to completion.
use std::time::Duration;
use tokio::sync::watch;

/// Returned by waits that were cut short by a shutdown request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Cancelled;

/// Requests shutdown. Dropping it without triggering leaves the loop running.
pub struct ShutdownTrigger {
    tx: watch::Sender<bool>,
}

impl ShutdownTrigger {
    pub fn trigger(&self) {
        let _ = self.tx.send(true);
    }
}

#[derive(Clone)]
pub struct ShutdownSignal {
    rx: watch::Receiver<bool>,
}

pub fn channel() -> (ShutdownTrigger, ShutdownSignal) {
    let (tx, rx) = watch::channel(false);
    (ShutdownTrigger { tx }, ShutdownSignal { rx })
}

impl ShutdownSignal {
    pub fn is_triggered(&self) -> bool {
        *self.rx.borrow()
    }

    pub fn check(&self) -> Result<(), Cancelled> {
        if self.is_triggered() {
            Err(Cancelled)
        } else {
            Ok(())
        }
    }

    /// Sleeps for `duration` unless shutdown is requested first.
    pub async fn sleep(&mut self, duration: Duration) -> Result<(), Cancelled> {
        self.check()?;
        tokio::select! {
            _ = tokio::time::sleep(duration) => Ok(()),
            _ = wait_for_trigger(&mut self.rx) => Err(Cancelled),
        }
    }
}

async fn wait_for_trigger(rx: &mut watch::Receiver<bool>) {
    loop {
        if rx.changed().await.is_err() {
            // Trigger dropped: nobody can ask for shutdown any more.
            std::future::pending::<()>().await;
        }
        if *rx.borrow() {
            return;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn sleep_completes_without_trigger() {
        let (_trigger, mut signal) = channel();
        assert_eq!(signal.sleep(Duration::from_millis(5)).await, Ok(()));
    }

    #[tokio::test]
    async fn trigger_interrupts_sleep() {
        let (trigger, mut signal) = channel();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(10)).await;
            trigger.trigger();
        });
        let result = signal.sleep(Duration::from_secs(3600)).await;
        assert_eq!(result, Err(Cancelled));
        assert!(signal.is_triggered());
    }

    #[tokio::test]
    async fn dropped_trigger_never_cancels() {
        let (trigger, mut signal) = channel();
        drop(trigger);
        assert_eq!(signal.sleep(Duration::from_millis(5)).await, Ok(()));
        assert_eq!(signal.check(), Ok(()));
    }
}
