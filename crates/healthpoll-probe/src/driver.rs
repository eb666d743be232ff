//! The polling loop: round, delay, repeat.

use tokio::sync::watch;
use tracing::{debug, info};

use crate::client::LivenessCheck;
use crate::jitter::JitterScheduler;
use crate::poller::HealthPoller;

/// Poll until `shutdown` flips to `true`.
///
/// Each round runs to completion before its delay is drawn. Shutdown is
/// checked before every round and interrupts the delay, never a round.
pub async fn run_polling<C: LivenessCheck>(
    poller: &HealthPoller<C>,
    scheduler: &mut JitterScheduler,
    mut shutdown: watch::Receiver<bool>,
) {
    info!(
        endpoints = poller.clients().len(),
        service = %poller.service(),
        max_delay_ms = scheduler.max_delay().as_millis() as u64,
        "polling started"
    );

    // Cleared once the sender is gone; nothing can signal after that.
    let mut signal_open = true;

    loop {
        if *shutdown.borrow() {
            break;
        }

        let report = poller.run_round().await;
        debug!(checked = report.checked, failed = report.failed, "round complete");

        if *shutdown.borrow() {
            break;
        }

        let delay = scheduler.next_delay();
        debug!(sleep_ms = delay.as_secs_f64() * 1000.0, "sleeping");

        let sleep = tokio::time::sleep(delay);
        tokio::pin!(sleep);
        loop {
            tokio::select! {
                _ = &mut sleep => break,
                changed = shutdown.changed(), if signal_open => match changed {
                    Ok(()) if *shutdown.borrow() => break,
                    Ok(()) => {}
                    Err(_) => signal_open = false,
                },
            }
        }
    }

    info!("polling stopped");
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::time::Duration;

    use crate::error::{CheckError, CheckResult};
    use crate::jitter::RandomSource;
    use crate::poller::DEFAULT_SERVICE;

    /// Counts calls and requests shutdown after `stop_after` of them.
    struct Counting {
        calls: Arc<AtomicUsize>,
        stop_after: usize,
        shutdown: watch::Sender<bool>,
        fail: bool,
    }

    impl LivenessCheck for Counting {
        fn endpoint(&self) -> &str {
            "counting"
        }

        async fn check_liveness(&self, _service: &str) -> CheckResult {
            let n = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
            if n >= self.stop_after {
                let _ = self.shutdown.send(true);
            }
            if self.fail {
                Err(CheckError::Unavailable("down".into()))
            } else {
                Ok(())
            }
        }
    }

    struct Half;

    impl RandomSource for Half {
        fn next_below(&mut self, bound: u32) -> Result<u32, getrandom::Error> {
            Ok(bound / 2)
        }
    }

    fn counting(stop_after: usize, fail: bool) -> (Counting, Arc<AtomicUsize>, watch::Receiver<bool>) {
        let (tx, rx) = watch::channel(false);
        let calls = Arc::new(AtomicUsize::new(0));
        let check = Counting {
            calls: calls.clone(),
            stop_after,
            shutdown: tx,
            fail,
        };
        (check, calls, rx)
    }

    #[tokio::test(start_paused = true)]
    async fn loops_until_shutdown() {
        let (check, calls, rx) = counting(3, false);
        let poller = HealthPoller::new(vec![check], DEFAULT_SERVICE);
        let mut scheduler =
            JitterScheduler::with_source(Duration::from_secs(4), Box::new(Half));

        let started = tokio::time::Instant::now();
        run_polling(&poller, &mut scheduler, rx).await;

        assert_eq!(calls.load(Ordering::SeqCst), 3);
        // Two 1s delays between three rounds, none after the last.
        let elapsed = started.elapsed();
        assert!(elapsed >= Duration::from_secs(2), "elapsed {elapsed:?}");
        assert!(elapsed < Duration::from_secs(3), "elapsed {elapsed:?}");
    }

    #[tokio::test(start_paused = true)]
    async fn failing_endpoint_keeps_the_loop_going() {
        let (check, calls, rx) = counting(4, true);
        let poller = HealthPoller::new(vec![check], DEFAULT_SERVICE);
        let mut scheduler = JitterScheduler::with_source(Duration::from_secs(1), Box::new(Half));

        run_polling(&poller, &mut scheduler, rx).await;
        assert_eq!(calls.load(Ordering::SeqCst), 4);
    }

    #[tokio::test(start_paused = true)]
    async fn shutdown_interrupts_the_delay() {
        let (tx, rx) = watch::channel(false);
        let poller: HealthPoller<Counting> = HealthPoller::new(Vec::new(), DEFAULT_SERVICE);
        let mut scheduler = JitterScheduler::with_source(Duration::from_secs(3600), Box::new(Half));

        let stopper = tokio::spawn(async move {
            tokio::time::sleep(Duration::from_secs(5)).await;
            tx.send(true).unwrap();
        });

        let started = tokio::time::Instant::now();
        run_polling(&poller, &mut scheduler, rx).await;
        stopper.await.unwrap();

        assert!(started.elapsed() < Duration::from_secs(900));
    }

    /// Counts calls, nothing else.
    struct Tally(Arc<AtomicUsize>);

    impl LivenessCheck for Tally {
        fn endpoint(&self) -> &str {
            "tally"
        }

        async fn check_liveness(&self, _service: &str) -> CheckResult {
            self.0.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    #[tokio::test(start_paused = true)]
    async fn dropped_sender_keeps_the_drawn_delay() {
        let (tx, rx) = watch::channel(false);
        let calls = Arc::new(AtomicUsize::new(0));
        let poller = HealthPoller::new(vec![Tally(calls.clone())], DEFAULT_SERVICE);
        // Half of the draw range: 40s × 0.25 = 10s between rounds.
        let mut scheduler = JitterScheduler::with_source(Duration::from_secs(40), Box::new(Half));

        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_secs(9)).await;
            drop(tx);
        });

        let polling = run_polling(&poller, &mut scheduler, rx);
        let _ = tokio::time::timeout(Duration::from_secs(15), polling).await;

        // Rounds at 0s and 10s; a restarted sleep would push the second to 19s.
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn unchanged_signal_does_not_cut_the_delay_short() {
        let (tx, rx) = watch::channel(false);
        let calls = Arc::new(AtomicUsize::new(0));
        let poller = HealthPoller::new(vec![Tally(calls.clone())], DEFAULT_SERVICE);
        let mut scheduler = JitterScheduler::with_source(Duration::from_secs(40), Box::new(Half));

        let notifier = tokio::spawn(async move {
            tokio::time::sleep(Duration::from_secs(5)).await;
            tx.send(false).unwrap();
            tokio::time::sleep(Duration::from_secs(60)).await;
        });

        let polling = run_polling(&poller, &mut scheduler, rx);
        let _ = tokio::time::timeout(Duration::from_secs(8), polling).await;
        notifier.abort();

        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn already_shut_down_runs_no_round() {
        let (check, calls, rx) = counting(1, false);
        check.shutdown.send(true).unwrap();
        let poller = HealthPoller::new(vec![check], DEFAULT_SERVICE);

        run_polling(&poller, &mut JitterScheduler::default(), rx).await;
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }
}
