//! Observable single-writer container.
//!
//! `Store` wraps a `tokio::sync::watch` sender: the owning reducer mutates
//! in place, every reader sees the most recent value. Readers only ever get
//! a [`StoreReader`], which has no mutation API.

use tokio::sync::watch;

/// Writable handle to one slice of view state
#[derive(Debug)]
pub struct Store<T> {
    tx: watch::Sender<T>,
}

impl<T: Clone> Store<T> {
    pub fn new(initial: T) -> Self {
        let (tx, _) = watch::channel(initial);
        Self { tx }
    }

    /// Mutate in place and notify readers.
    pub fn update<F>(&self, modify: F)
    where
        F: FnOnce(&mut T),
    {
        self.tx.send_modify(modify);
    }

    /// Clone of the current value
    pub fn snapshot(&self) -> T {
        self.tx.borrow().clone()
    }

    /// Read-only handle for presentation consumers
    pub fn reader(&self) -> StoreReader<T> {
        StoreReader {
            rx: self.tx.subscribe(),
        }
    }
}

impl<T: Clone + Default> Default for Store<T> {
    fn default() -> Self {
        Self::new(T::default())
    }
}

/// Read-only handle to a store
#[derive(Debug, Clone)]
pub struct StoreReader<T> {
    rx: watch::Receiver<T>,
}

impl<T: Clone> StoreReader<T> {
    /// Clone of the most recent value, marking it as seen
    pub fn snapshot(&mut self) -> T {
        self.rx.borrow_and_update().clone()
    }

    /// Clone of the most recent value without touching the seen marker
    pub fn peek(&self) -> T {
        self.rx.borrow().clone()
    }

    pub fn has_changed(&self) -> bool {
        self.rx.has_changed().unwrap_or(false)
    }

    /// Wait until the writer publishes a value not yet seen.
    ///
    /// Returns `false` once the owning store has been dropped.
    pub async fn changed(&mut self) -> bool {
        self.rx.changed().await.is_ok()
    }
}
