//! Debounced Values
//!
//! Converts a rapidly changing input (search text) into a value that changes
//! only after the input has been quiet for a fixed period.
//!
//! ```text
//! set("a") set("an") set("ann")        (quiet period)
//!    │        │         │ ──────────────────────────▶ publish "ann"
//! ```

use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::sleep;

/// A value whose published copy trails its input by a quiet period
///
/// Must be created inside a tokio runtime. Dropping it aborts the timer task,
/// so no update is published after the owner is gone.
pub struct Debounced<T> {
    input: watch::Sender<T>,
    output: watch::Receiver<T>,
    quiet: Duration,
    task: JoinHandle<()>,
}

impl<T> Debounced<T>
where
    T: Clone + PartialEq + Send + Sync + 'static,
{
    /// Create a debouncer whose published value starts at `initial`
    pub fn new(initial: T, quiet: Duration) -> Self {
        let (input, input_rx) = watch::channel(initial.clone());
        let (output_tx, output) = watch::channel(initial);
        let task = tokio::spawn(run(input_rx, output_tx, quiet));
        Self {
            input,
            output,
            quiet,
            task,
        }
    }

    /// Feed a new raw value; restarts the quiet period
    pub fn set(&self, value: T) {
        // send_replace never fails, even when the task has already stopped
        self.input.send_replace(value);
    }

    /// Latest raw input, published or not
    pub fn pending(&self) -> T {
        self.input.borrow().clone()
    }

    /// Latest published value
    pub fn current(&self) -> T {
        self.output.borrow().clone()
    }

    /// Whether the raw input differs from what has been published
    pub fn is_settling(&self) -> bool {
        *self.input.borrow() != *self.output.borrow()
    }

    /// Receiver that observes each published value
    pub fn subscribe(&self) -> watch::Receiver<T> {
        self.output.clone()
    }

    pub fn quiet_period(&self) -> Duration {
        self.quiet
    }
}

impl<T> Drop for Debounced<T> {
    fn drop(&mut self) {
        self.task.abort();
    }
}

impl<T: std::fmt::Debug> std::fmt::Debug for Debounced<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Debounced")
            .field("pending", &*self.input.borrow())
            .field("current", &*self.output.borrow())
            .field("quiet", &self.quiet)
            .finish()
    }
}

async fn run<T>(mut input: watch::Receiver<T>, output: watch::Sender<T>, quiet: Duration)
where
    T: Clone + PartialEq + Send + Sync + 'static,
{
    loop {
        if input.changed().await.is_err() {
            return;
        }

        // Restart the timer on every change until the input stays put
        loop {
            tokio::select! {
                changed = input.changed() => {
                    if changed.is_err() {
                        return;
                    }
                }
                _ = sleep(quiet) => break,
            }
        }

        let value = input.borrow_and_update().clone();
        output.send_if_modified(|published| {
            if *published == value {
                false
            } else {
                *published = value;
                true
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const QUIET: Duration = Duration::from_millis(300);

    #[tokio::test(start_paused = true)]
    async fn test_only_final_value_is_published() {
        let search = Debounced::new(String::new(), QUIET);
        let mut rx = search.subscribe();

        search.set("a".into());
        sleep(Duration::from_millis(50)).await;
        search.set("an".into());
        sleep(Duration::from_millis(50)).await;
        search.set("ann".into());
        sleep(Duration::from_millis(100)).await;
        search.set("anna".into());

        sleep(Duration::from_millis(299)).await;
        assert!(!rx.has_changed().expect("sender alive"));
        assert_eq!(search.current(), "");
        assert!(search.is_settling());

        sleep(Duration::from_millis(2)).await;
        assert!(rx.has_changed().expect("sender alive"));
        assert_eq!(*rx.borrow_and_update(), "anna");

        // Nothing else follows
        sleep(Duration::from_secs(5)).await;
        assert!(!rx.has_changed().expect("sender alive"));
        assert!(!search.is_settling());
    }

    #[tokio::test(start_paused = true)]
    async fn test_changed_resolves_once_per_burst() {
        let search = Debounced::new(String::new(), QUIET);
        let mut rx = search.subscribe();

        search.set("ann".into());
        sleep(Duration::from_millis(100)).await;
        search.set("anna".into());

        let start = tokio::time::Instant::now();
        rx.changed().await.expect("published");
        assert_eq!(*rx.borrow_and_update(), "anna");
        assert!(start.elapsed() >= QUIET);
    }

    #[tokio::test(start_paused = true)]
    async fn test_returning_to_published_value_is_silent() {
        let search = Debounced::new("x".to_string(), QUIET);
        let mut rx = search.subscribe();

        search.set("xy".into());
        sleep(Duration::from_millis(100)).await;
        search.set("x".into());
        sleep(Duration::from_secs(1)).await;

        assert!(!rx.has_changed().expect("sender alive"));
        assert_eq!(search.current(), "x");
    }

    #[tokio::test(start_paused = true)]
    async fn test_drop_cancels_pending_publish() {
        let search = Debounced::new(String::new(), QUIET);
        let mut rx = search.subscribe();

        search.set("late".into());
        sleep(Duration::from_millis(10)).await;
        drop(search);
        sleep(Duration::from_secs(1)).await;

        // Sender side is gone and the pending value never arrived
        assert!(rx.changed().await.is_err());
        assert_eq!(*rx.borrow(), "");
    }
}
