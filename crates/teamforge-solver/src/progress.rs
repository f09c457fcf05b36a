//! Latest-wins progress publishing.
//!
//! A single-producer single-consumer channel with two slots: a capacity-1
//! progress slot and a dedicated terminal slot. The producer never blocks;
//! publishing over an unread progress record replaces it. The consumer
//! therefore sees a strictly ordered subsequence of the published progress
//! records, and always sees the terminal record, delivered last and
//! exactly once.
//!
//! Progress is advisory and strictly monotone in the objective, so
//! dropping stale records never misleads the subscriber; the terminal
//! record is the one that must not be lossy.
//!
//! # Example
//!
//! ```
//! use teamforge_solver::{progress_channel, Delivery};
//!
//! let (tx, rx) = progress_channel::<u32, &str>();
//! tx.publish(1);
//! tx.publish(2); // replaces the unread 1
//! tx.finish("done");
//!
//! assert_eq!(rx.recv(), Some(Delivery::Progress(2)));
//! assert_eq!(rx.recv(), Some(Delivery::Terminal("done")));
//! assert_eq!(rx.recv(), None);
//! ```

use std::sync::{Arc, Condvar, Mutex, PoisonError};

/// One record handed to the subscriber.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Delivery<P, T> {
    Progress(P),
    Terminal(T),
}

struct Shared<P, T> {
    progress: Option<P>,
    terminal: Option<T>,
    finished: bool,
    sender_alive: bool,
}

struct Channel<P, T> {
    shared: Mutex<Shared<P, T>>,
    signal: Condvar,
}

/// Producer half; owned by the solve worker.
pub struct ProgressSender<P, T> {
    channel: Arc<Channel<P, T>>,
}

/// Consumer half; owned by the subscriber.
pub struct ProgressReceiver<P, T> {
    channel: Arc<Channel<P, T>>,
}

/// Creates a connected sender/receiver pair.
pub fn progress_channel<P, T>() -> (ProgressSender<P, T>, ProgressReceiver<P, T>) {
    let channel = Arc::new(Channel {
        shared: Mutex::new(Shared {
            progress: None,
            terminal: None,
            finished: false,
            sender_alive: true,
        }),
        signal: Condvar::new(),
    });
    (
        ProgressSender {
            channel: Arc::clone(&channel),
        },
        ProgressReceiver { channel },
    )
}

impl<P, T> ProgressSender<P, T> {
    /// Publishes a progress record, replacing any unread one.
    pub fn publish(&self, record: P) {
        let mut shared = self
            .channel
            .shared
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        shared.progress = Some(record);
        drop(shared);
        self.channel.signal.notify_one();
    }

    /// Publishes the terminal record and closes the channel.
    pub fn finish(self, record: T) {
        let mut shared = self
            .channel
            .shared
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        shared.terminal = Some(record);
        drop(shared);
        self.channel.signal.notify_one();
    }
}

impl<P, T> Drop for ProgressSender<P, T> {
    fn drop(&mut self) {
        let mut shared = self
            .channel
            .shared
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        shared.sender_alive = false;
        drop(shared);
        self.channel.signal.notify_one();
    }
}

impl<P, T> ProgressReceiver<P, T> {
    /// Blocks until a record is available. Returns `None` once the
    /// terminal record has been delivered, or when the sender went away
    /// without finishing.
    pub fn recv(&self) -> Option<Delivery<P, T>> {
        let mut shared = self
            .channel
            .shared
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        loop {
            if let Some(progress) = shared.progress.take() {
                return Some(Delivery::Progress(progress));
            }
            if let Some(terminal) = shared.terminal.take() {
                shared.finished = true;
                return Some(Delivery::Terminal(terminal));
            }
            if shared.finished || !shared.sender_alive {
                return None;
            }
            shared = self
                .channel
                .signal
                .wait(shared)
                .unwrap_or_else(PoisonError::into_inner);
        }
    }

    /// Non-blocking variant of [`ProgressReceiver::recv`]; returns `None`
    /// when nothing is pending right now.
    pub fn try_recv(&self) -> Option<Delivery<P, T>> {
        let mut shared = self
            .channel
            .shared
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        if let Some(progress) = shared.progress.take() {
            return Some(Delivery::Progress(progress));
        }
        if let Some(terminal) = shared.terminal.take() {
            shared.finished = true;
            return Some(Delivery::Terminal(terminal));
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;
    use std::time::Duration;

    #[test]
    fn lagging_consumer_sees_only_the_latest_progress() {
        let (tx, rx) = progress_channel::<u32, ()>();
        for n in 1..=5 {
            tx.publish(n);
        }
        tx.finish(());
        assert_eq!(rx.recv(), Some(Delivery::Progress(5)));
        assert_eq!(rx.recv(), Some(Delivery::Terminal(())));
        assert_eq!(rx.recv(), None);
    }

    #[test]
    fn terminal_is_delivered_after_pending_progress() {
        let (tx, rx) = progress_channel::<u32, &str>();
        tx.publish(7);
        tx.finish("end");
        assert_eq!(rx.recv(), Some(Delivery::Progress(7)));
        assert_eq!(rx.recv(), Some(Delivery::Terminal("end")));
    }

    #[test]
    fn terminal_is_delivered_exactly_once() {
        let (tx, rx) = progress_channel::<u32, &str>();
        tx.finish("end");
        assert_eq!(rx.recv(), Some(Delivery::Terminal("end")));
        assert_eq!(rx.recv(), None);
        assert_eq!(rx.recv(), None);
    }

    #[test]
    fn dropped_sender_unblocks_the_receiver() {
        let (tx, rx) = progress_channel::<u32, ()>();
        drop(tx);
        assert_eq!(rx.recv(), None);
    }

    #[test]
    fn try_recv_never_blocks() {
        let (tx, rx) = progress_channel::<u32, ()>();
        assert_eq!(rx.try_recv(), None);
        tx.publish(3);
        assert_eq!(rx.try_recv(), Some(Delivery::Progress(3)));
        assert_eq!(rx.try_recv(), None);
    }

    #[test]
    fn records_cross_threads_in_order() {
        let (tx, rx) = progress_channel::<u64, u64>();
        let producer = thread::spawn(move || {
            for n in 1..=100 {
                tx.publish(n);
                if n % 10 == 0 {
                    thread::sleep(Duration::from_millis(1));
                }
            }
            tx.finish(100);
        });
        let mut last = 0;
        let mut terminal = None;
        while let Some(delivery) = rx.recv() {
            match delivery {
                Delivery::Progress(n) => {
                    assert!(n > last, "progress went backwards: {n} after {last}");
                    last = n;
                }
                Delivery::Terminal(n) => terminal = Some(n),
            }
        }
        producer.join().expect("producer thread panicked");
        assert_eq!(terminal, Some(100));
    }
}
