use std::sync::mpsc::{self, RecvTimeoutError, Sender};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

/// Receives the generation of the timer that fired. Returning `false` tells
/// the timer nobody is listening any more and it stops on its own.
pub type TickSink = Arc<dyn Fn(u64) -> bool + Send + Sync>;

/// Periodic auto-refresh timer. The worker thread lives exactly as long as
/// this handle: dropping it wakes the worker and joins it, so no tick is
/// delivered after the handle is gone.
pub struct AutoRefresh {
    generation: u64,
    stop: Option<Sender<()>>,
    worker: Option<JoinHandle<()>>,
}

impl AutoRefresh {
    pub fn start(interval: Duration, generation: u64, sink: TickSink) -> std::io::Result<Self> {
        let (stop_tx, stop_rx) = mpsc::channel::<()>();
        let worker = thread::Builder::new()
            .name(format!("auto-refresh-{}", generation))
            .spawn(move || loop {
                match stop_rx.recv_timeout(interval) {
                    Err(RecvTimeoutError::Timeout) => {
                        if !sink(generation) {
                            break;
                        }
                    }
                    Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
                }
            })?;
        tracing::debug!(generation, ?interval, "auto refresh started");
        Ok(Self {
            generation,
            stop: Some(stop_tx),
            worker: Some(worker),
        })
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }
}

impl Drop for AutoRefresh {
    fn drop(&mut self) {
        drop(self.stop.take());
        if let Some(worker) = self.worker.take() {
            if worker.join().is_err() {
                tracing::warn!(generation = self.generation, "auto refresh worker panicked");
            }
        }
        tracing::debug!(generation = self.generation, "auto refresh stopped");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn counting_sink() -> (TickSink, Arc<AtomicUsize>) {
        let count = Arc::new(AtomicUsize::new(0));
        let seen = count.clone();
        let sink: TickSink = Arc::new(move |_| {
            seen.fetch_add(1, Ordering::SeqCst);
            true
        });
        (sink, count)
    }

    #[test]
    fn ticks_until_dropped() {
        let (sink, count) = counting_sink();
        let timer = AutoRefresh::start(Duration::from_millis(5), 1, sink).expect("start");
        thread::sleep(Duration::from_millis(80));
        drop(timer);
        let after_drop = count.load(Ordering::SeqCst);
        assert!(after_drop > 0);
        thread::sleep(Duration::from_millis(40));
        assert_eq!(count.load(Ordering::SeqCst), after_drop);
    }

    #[test]
    fn stops_when_sink_hangs_up() {
        let sink: TickSink = Arc::new(|_| false);
        let timer = AutoRefresh::start(Duration::from_millis(5), 7, sink).expect("start");
        thread::sleep(Duration::from_millis(30));
        assert_eq!(timer.generation(), 7);
        // Joining a worker that already exited must not hang.
        drop(timer);
    }

    #[test]
    fn drop_is_prompt_with_long_interval() {
        let (sink, count) = counting_sink();
        let timer = AutoRefresh::start(Duration::from_secs(3600), 2, sink).expect("start");
        let started = std::time::Instant::now();
        drop(timer);
        assert!(started.elapsed() < Duration::from_secs(5));
        assert_eq!(count.load(Ordering::SeqCst), 0);
    }
}
