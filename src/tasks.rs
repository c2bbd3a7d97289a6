use poll_promise::Promise;

/// Hands out tickets so only the answer to the latest request gets applied.
#[derive(Debug, Default, Clone)]
pub struct RequestGuard {
    latest: u64,
}

impl RequestGuard {
    pub fn issue(&mut self) -> u64 {
        self.latest += 1;
        self.latest
    }

    pub fn is_current(&self, ticket: u64) -> bool {
        ticket == self.latest
    }

    pub fn invalidate(&mut self) {
        self.latest += 1;
    }
}

pub struct Task<T: Send + 'static> {
    pub ticket: u64,
    promise: Promise<Result<T, String>>,
}

impl<T: Send + 'static> Task<T> {
    pub fn spawn<F>(name: &str, ticket: u64, work: F) -> Self
    where
        F: FnOnce() -> Result<T, String> + Send + 'static,
    {
        Self {
            ticket,
            promise: Promise::spawn_thread(name, work),
        }
    }

    pub fn is_ready(&self) -> bool {
        self.promise.ready().is_some()
    }

    /// Takes the result out of `slot` once the promise has resolved.
    pub fn poll(slot: &mut Option<Task<T>>) -> Option<(u64, Result<T, String>)> {
        if !slot.as_ref().is_some_and(|task| task.is_ready()) {
            return None;
        }
        let task = slot.take()?;
        let ticket = task.ticket;
        match task.promise.try_take() {
            Ok(result) => Some((ticket, result)),
            Err(promise) => {
                *slot = Some(Task { ticket, promise });
                None
            }
        }
    }
}

/// In-flight tasks, each kept next to the request that started it.
pub struct Jobs<R, T: Send + 'static> {
    items: Vec<(R, Option<Task<T>>)>,
}

impl<R, T: Send + 'static> Default for Jobs<R, T> {
    fn default() -> Self {
        Self { items: Vec::new() }
    }
}

impl<R, T: Send + 'static> Jobs<R, T> {
    pub fn push(&mut self, request: R, task: Task<T>) {
        self.items.push((request, Some(task)));
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn drain_ready(&mut self) -> Vec<(R, Result<T, String>)> {
        let mut done = Vec::new();
        let mut pending = Vec::with_capacity(self.items.len());
        for (request, mut slot) in self.items.drain(..) {
            match Task::poll(&mut slot) {
                Some((_, result)) => done.push((request, result)),
                None => pending.push((request, slot)),
            }
        }
        self.items = pending;
        done
    }
}
