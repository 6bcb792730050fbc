use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

/// Sending half of a trailing-edge debouncer.
#[derive(Debug, Clone)]
pub struct Debouncer<T> {
    tx: mpsc::UnboundedSender<T>,
}

impl<T: Send + 'static> Debouncer<T> {
    /// Every value pushed within `delay` of the previous one replaces it; only
    /// the last value of a burst comes out once input has paused for `delay`.
    pub fn spawn(delay: Duration) -> (Self, mpsc::UnboundedReceiver<T>, JoinHandle<()>) {
        let (tx, input) = mpsc::unbounded_channel();
        let (output, rx) = mpsc::unbounded_channel();
        let handle = tokio::spawn(run(delay, input, output));
        (Self { tx }, rx, handle)
    }

    pub fn push(&self, value: T) {
        // The worker only stops once every receiver is gone.
        let _ = self.tx.send(value);
    }
}

async fn run<T>(delay: Duration, mut input: mpsc::UnboundedReceiver<T>, output: mpsc::UnboundedSender<T>) {
    while let Some(mut pending) = input.recv().await {
        loop {
            tokio::select! {
                next = input.recv() => match next {
                    Some(value) => pending = value,
                    None => {
                        let _ = output.send(pending);
                        return;
                    }
                },
                _ = tokio::time::sleep(delay) => {
                    if output.send(pending).is_err() {
                        return;
                    }
                    break;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::time::{advance, timeout};

    const DELAY: Duration = Duration::from_millis(500);

    #[tokio::test(start_paused = true)]
    async fn burst_emits_only_last_value() {
        let (debouncer, mut out, _task) = Debouncer::spawn(DELAY);
        debouncer.push("a");
        advance(Duration::from_millis(100)).await;
        debouncer.push("ab");
        advance(Duration::from_millis(100)).await;
        debouncer.push("abc");

        assert_eq!(out.recv().await, Some("abc"));
        assert!(timeout(Duration::from_secs(5), out.recv()).await.is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn separated_inputs_each_emit() {
        let (debouncer, mut out, _task) = Debouncer::spawn(DELAY);
        debouncer.push(1);
        assert_eq!(out.recv().await, Some(1));
        debouncer.push(2);
        assert_eq!(out.recv().await, Some(2));
    }

    #[tokio::test(start_paused = true)]
    async fn pending_value_flushes_when_input_closes() {
        let (debouncer, mut out, task) = Debouncer::spawn(DELAY);
        debouncer.push("x");
        drop(debouncer);
        assert_eq!(out.recv().await, Some("x"));
        task.await.expect("worker exits cleanly");
    }
}
