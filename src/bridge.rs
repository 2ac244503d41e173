use std::time::Duration;

use thiserror::Error;
use tokio::runtime::{Handle, RuntimeFlavor};
use tokio::sync::oneshot;
use tracing::debug;

#[derive(Debug, Error)]
pub enum WaitError {
    #[error("cannot block the thread of a current-thread runtime")]
    CurrentThreadRuntime,

    #[error("timer context shut down before the wait elapsed")]
    TimerDropped,
}

/// Block the calling thread for `duration` while tasks on `context` keep
/// running.
///
/// The timer lives on `context` and signals a channel the caller blocks on.
/// On a multi-thread runtime worker the block goes through `block_in_place`,
/// so the worker's other tasks move elsewhere instead of stalling. The
/// thread of a current-thread runtime cannot be blocked at all.
pub fn wait(context: &Handle, duration: Duration) -> Result<(), WaitError> {
    let inside_runtime = match Handle::try_current() {
        Ok(current) if current.runtime_flavor() == RuntimeFlavor::CurrentThread => {
            return Err(WaitError::CurrentThreadRuntime);
        }
        Ok(_) => true,
        Err(_) => false,
    };

    let (tx, rx) = oneshot::channel::<()>();
    context.spawn(async move {
        tokio::time::sleep(duration).await;
        if tx.send(()).is_err() {
            debug!("Waiter went away before the timer fired");
        }
    });

    debug!("Blocking for {:?}", duration);
    let block = move || rx.blocking_recv().map_err(|_| WaitError::TimerDropped);
    if inside_runtime {
        tokio::task::block_in_place(block)
    } else {
        block()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;
    use std::time::Instant;

    #[test]
    fn test_wait_from_plain_thread_lets_callbacks_run() {
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(1)
            .enable_all()
            .build()
            .unwrap();
        let done = Arc::new(AtomicBool::new(false));
        let flag = done.clone();
        runtime.spawn(async move {
            tokio::time::sleep(Duration::from_millis(10)).await;
            flag.store(true, Ordering::SeqCst);
        });

        let started = Instant::now();
        wait(runtime.handle(), Duration::from_millis(100)).unwrap();

        assert!(started.elapsed() >= Duration::from_millis(100));
        assert!(done.load(Ordering::SeqCst));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 1)]
    async fn test_wait_on_worker_does_not_starve_tasks() {
        let done = Arc::new(AtomicBool::new(false));
        let flag = done.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(10)).await;
            flag.store(true, Ordering::SeqCst);
        });

        wait(&Handle::current(), Duration::from_millis(100)).unwrap();

        assert!(done.load(Ordering::SeqCst));
    }

    #[test]
    fn test_wait_on_shut_down_context_reports_dropped_timer() {
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(1)
            .enable_all()
            .build()
            .unwrap();
        let handle = runtime.handle().clone();
        runtime.shutdown_background();

        let result = wait(&handle, Duration::from_secs(5));
        assert!(matches!(result, Err(WaitError::TimerDropped)));
    }

    #[tokio::test]
    async fn test_wait_refuses_current_thread_runtime() {
        let result = wait(&Handle::current(), Duration::from_millis(1));
        assert!(matches!(result, Err(WaitError::CurrentThreadRuntime)));
    }
}
