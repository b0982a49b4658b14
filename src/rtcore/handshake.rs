/// Bounded circular queue modelled on a synchronous hardware FIFO.
/// `head` is the registered downstream valid/data, `can_push` the registered upstream ready;
/// both only change on `clock`.
#[derive(Clone, Debug)]
pub struct Fifo<T> {
    /// One slot more than the capacity, so that full and empty can be told apart
    slots: Box<[Option<T>]>,
    front: usize,
    back: usize,
}

impl<T: Copy> Fifo<T> {
    pub fn new(capacity: usize) -> Fifo<T> {
        Fifo {
            slots: vec![None; capacity + 1].into_boxed_slice(),
            front: 0,
            back: 0,
        }
    }

    /// FIFO holding `items` in order, as after a reset that preloads it.
    pub fn filled(items: impl IntoIterator<Item = T>, capacity: usize) -> Fifo<T> {
        let mut fifo = Fifo::new(capacity);
        for item in items {
            fifo.clock(Some(item), false);
        }
        fifo
    }

    pub fn capacity(&self) -> usize {
        self.slots.len() - 1
    }

    pub fn len(&self) -> usize {
        (self.back + self.slots.len() - self.front) % self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.front == self.back
    }

    pub fn can_push(&self) -> bool {
        self.len() < self.capacity()
    }

    pub fn head(&self) -> Option<T> {
        if self.is_empty() {
            None
        } else {
            self.slots[self.front]
        }
    }

    /// One clock edge: optionally pops the head and pushes a new entry at the back.
    /// Readiness is the one sampled before the edge, a full FIFO refuses a push even when it
    /// pops in the same cycle.
    pub fn clock(&mut self, push: Option<T>, pop: bool) {
        assert!(push.is_none() || self.can_push(), "push into a full FIFO");
        assert!(!pop || !self.is_empty(), "pop from an empty FIFO");

        if pop {
            self.slots[self.front] = None;
            self.front = (self.front + 1) % self.slots.len();
        }
        if let Some(item) = push {
            self.slots[self.back] = Some(item);
            self.back = (self.back + 1) % self.slots.len();
        }
    }
}

/// Outcome of priority arbitration between two valid/ready sources.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Grant<T> {
    pub output: Option<T>,
    pub high_ready: bool,
    pub low_ready: bool,
}

/// Fixed priority arbiter: the high priority source always wins.
/// A source's ready is only raised when its request actually transfers, so a request is
/// never dropped while the sink is stalled.
pub fn arbitrate<T>(high: Option<T>, low: Option<T>, downstream_ready: bool) -> Grant<T> {
    let high_valid = high.is_some();
    Grant {
        output: high.or(low),
        high_ready: downstream_ready,
        low_ready: downstream_ready && !high_valid,
    }
}
