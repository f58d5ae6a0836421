use std::sync::mpsc;

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
enum State {
    Waiting,
    Done,
    Dead,
}

/// Poll-able handle for an asynchronous operation. The main loop checks
/// [`Pending::poll`] each tick and never blocks; [`Pending::wait`] exists
/// for startup paths and tests where blocking is acceptable.
pub struct Pending<T> {
    rx: mpsc::Receiver<T>,
    state: State,
}

impl<T> Pending<T> {
    /// Wraps the receiving half of a one-shot channel.
    pub fn new(rx: mpsc::Receiver<T>) -> Self {
        Self {
            rx,
            state: State::Waiting,
        }
    }

    /// A handle that is already resolved with `value`.
    pub fn ready(value: T) -> Self {
        let (tx, rx) = mpsc::channel();
        let _ = tx.send(value);
        Self {
            rx,
            state: State::Waiting,
        }
    }

    /// Returns the result once, the first time it is available. Subsequent
    /// polls return `None`.
    pub fn poll(&mut self) -> Option<T> {
        if self.state != State::Waiting {
            return None;
        }
        match self.rx.try_recv() {
            Ok(v) => {
                self.state = State::Done;
                Some(v)
            }
            Err(mpsc::TryRecvError::Empty) => None,
            Err(mpsc::TryRecvError::Disconnected) => {
                self.state = State::Dead;
                None
            }
        }
    }

    /// Whether the producer went away without ever delivering a value.
    pub fn is_dead(&self) -> bool {
        self.state == State::Dead
    }

    /// Blocks until the value arrives; `None` if the producer went away.
    pub fn wait(self) -> Option<T> {
        self.rx.recv().ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ready_resolves_exactly_once() {
        let mut p = Pending::ready(7);
        assert_eq!(p.poll(), Some(7));
        assert_eq!(p.poll(), None);
        assert!(!p.is_dead());
    }

    #[test]
    fn dropped_producer_reads_as_dead() {
        let (tx, rx) = mpsc::channel::<u32>();
        let mut p = Pending::new(rx);
        assert_eq!(p.poll(), None);
        assert!(!p.is_dead());
        drop(tx);
        assert_eq!(p.poll(), None);
        assert!(p.is_dead());
    }

    #[test]
    fn late_value_arrives_through_poll() {
        let (tx, rx) = mpsc::channel();
        let mut p = Pending::new(rx);
        assert_eq!(p.poll(), None);
        tx.send("done").unwrap();
        assert_eq!(p.poll(), Some("done"));
    }
}
