//! A read-preferring async lock guarding collection swaps.
//!
//! `tokio::sync::RwLock` queues new readers behind a waiting writer. Here a
//! pending swap never blocks new searches: the writer waits until no reader
//! holds the lock, and readers only wait while the swap itself runs.

use std::sync::{Mutex, MutexGuard, PoisonError};

use tokio::sync::Notify;

#[derive(Debug, Default)]
struct State {
    readers: usize,
    writing: bool,
}

#[derive(Debug, Default)]
pub(crate) struct SwapLock {
    state: Mutex<State>,
    changed: Notify,
}

impl SwapLock {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub(crate) async fn read(&self) -> ReadGuard<'_> {
        loop {
            let notified = self.changed.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();
            {
                let mut state = self.state();
                if !state.writing {
                    state.readers += 1;
                    return ReadGuard { lock: self };
                }
            }
            notified.await;
        }
    }

    pub(crate) async fn write(&self) -> WriteGuard<'_> {
        loop {
            let notified = self.changed.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();
            {
                let mut state = self.state();
                if !state.writing && state.readers == 0 {
                    state.writing = true;
                    return WriteGuard { lock: self };
                }
            }
            notified.await;
        }
    }
}

pub(crate) struct ReadGuard<'a> {
    lock: &'a SwapLock,
}

impl Drop for ReadGuard<'_> {
    fn drop(&mut self) {
        let mut state = self.lock.state();
        state.readers -= 1;
        if state.readers == 0 {
            self.lock.changed.notify_waiters();
        }
    }
}

pub(crate) struct WriteGuard<'a> {
    lock: &'a SwapLock,
}

impl Drop for WriteGuard<'_> {
    fn drop(&mut self) {
        self.lock.state().writing = false;
        self.lock.changed.notify_waiters();
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use super::*;

    #[tokio::test]
    async fn pending_writer_does_not_block_new_readers() {
        let lock = Arc::new(SwapLock::new());
        let first = lock.read().await;

        let writer = tokio::spawn({
            let lock = lock.clone();
            async move {
                let _guard = lock.write().await;
            }
        });
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!writer.is_finished());

        let second = tokio::time::timeout(Duration::from_millis(50), lock.read()).await;
        assert!(second.is_ok(), "new reader waited behind a pending writer");
        drop(second);
        assert!(!writer.is_finished());

        drop(first);
        tokio::time::timeout(Duration::from_secs(1), writer).await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn readers_wait_while_the_swap_runs() {
        let lock = Arc::new(SwapLock::new());
        let guard = lock.write().await;
        assert!(tokio::time::timeout(Duration::from_millis(20), lock.read()).await.is_err());
        drop(guard);
        assert!(tokio::time::timeout(Duration::from_millis(20), lock.read()).await.is_ok());
    }
}
