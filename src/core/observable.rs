//! Observable scalar with a single writer.
//!
//! Readers either poll [`Observable::get`] or hold a receiver from
//! [`Observable::subscribe`] that yields every new value. Only the owning
//! module can write, through the crate-private `set`.

use crossbeam_channel::{unbounded, Receiver, Sender};

/// A value that notifies subscribers when it changes.
#[derive(Debug)]
pub struct Observable<T> {
    value: T,
    subscribers: Vec<Sender<T>>,
}

impl<T: Copy + PartialEq> Observable<T> {
    pub fn new(initial: T) -> Self {
        Self {
            value: initial,
            subscribers: Vec::new(),
        }
    }

    /// Get the current value.
    pub fn get(&self) -> T {
        self.value
    }

    /// Subscribe to future changes. The current value is not replayed.
    pub fn subscribe(&mut self) -> Receiver<T> {
        let (sender, receiver) = unbounded();
        self.subscribers.push(sender);
        receiver
    }

    /// Number of live subscribers.
    pub fn subscriber_count(&self) -> usize {
        self.subscribers.len()
    }

    /// Replace the value, notifying subscribers if it changed.
    ///
    /// Returns `true` when the value changed.
    pub(crate) fn set(&mut self, value: T) -> bool {
        if self.value == value {
            return false;
        }
        self.value = value;
        // Dropped receivers unsubscribe implicitly
        self.subscribers.retain(|s| s.send(value).is_ok());
        true
    }
}

impl<T: Copy + PartialEq + Default> Default for Observable<T> {
    fn default() -> Self {
        Self::new(T::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_subscribers_see_changes() {
        let mut cell = Observable::new(0.0_f32);
        let rx = cell.subscribe();

        assert!(cell.set(5.0));
        assert!(cell.set(7.0));

        assert_eq!(rx.try_recv().unwrap(), 5.0);
        assert_eq!(rx.try_recv().unwrap(), 7.0);
        assert_eq!(cell.get(), 7.0);
    }

    #[test]
    fn test_unchanged_value_not_published() {
        let mut cell = Observable::new(3.0_f32);
        let rx = cell.subscribe();

        assert!(!cell.set(3.0));
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_dropped_subscriber_pruned() {
        let mut cell = Observable::new(0_i32);
        let rx = cell.subscribe();
        let _keep = cell.subscribe();
        drop(rx);

        cell.set(1);
        assert_eq!(cell.subscriber_count(), 1);
    }
}
