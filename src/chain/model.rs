use std::sync::RwLock;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

use super::Block;

struct Inner {
    height: u64,
    latest_block: Option<Block>,
    running: bool,
    cancel: CancellationToken,
}

/// The chain engine: a height counter, the most recent block and a
/// running/stopped flag behind one reader/writer lock. Block production
/// itself lives in [`super::producer`]; this type only owns the state.
pub struct Chain {
    inner: RwLock<Inner>,
    block_time: Duration,
}

impl Chain {
    /// Construct a stopped chain with the given block interval.
    pub fn new(block_time: Duration) -> Self {
        Self {
            inner: RwLock::new(Inner {
                height: 0,
                latest_block: None,
                running: false,
                cancel: CancellationToken::new(),
            }),
            block_time,
        }
    }

    /// Transition stopped -> running. A no-op when already running.
    /// Allocates a fresh cancellation token for the new run.
    ///
    /// Returns whether this call performed the transition, decided under
    /// the write lock; exactly one of any set of racing callers sees
    /// `true`, so only that caller spawns a producer loop.
    pub fn start(&self) -> bool {
        let mut inner = self.inner.write().expect("chain lock poisoned");
        if inner.running {
            return false;
        }
        inner.running = true;
        inner.cancel = CancellationToken::new();
        true
    }

    /// Transition running -> stopped. A no-op when already stopped.
    /// Fires the cancellation token; the producer loop observes it at its
    /// next iteration, so at most one in-flight tick may still land.
    pub fn stop(&self) {
        let mut inner = self.inner.write().expect("chain lock poisoned");
        if !inner.running {
            return;
        }
        inner.running = false;
        inner.cancel.cancel();
    }

    pub fn is_running(&self) -> bool {
        self.inner.read().expect("chain lock poisoned").running
    }

    pub fn height(&self) -> u64 {
        self.inner.read().expect("chain lock poisoned").height
    }

    pub fn latest_block(&self) -> Option<Block> {
        self.inner
            .read()
            .expect("chain lock poisoned")
            .latest_block
            .clone()
    }

    /// Timestamp of the latest block, or 0 before genesis.
    pub fn last_block_time(&self) -> i64 {
        self.inner
            .read()
            .expect("chain lock poisoned")
            .latest_block
            .as_ref()
            .map_or(0, |b| b.timestamp)
    }

    /// Cancellation token for the current run; cloned by the producer loop.
    pub fn cancel_token(&self) -> CancellationToken {
        self.inner
            .read()
            .expect("chain lock poisoned")
            .cancel
            .clone()
    }

    pub fn block_time(&self) -> Duration {
        self.block_time
    }

    /// Increment the height and replace the latest block, both under the
    /// exclusive lock so readers never see a torn height/block pair.
    pub fn create_block(&self) -> Block {
        let mut inner = self.inner.write().expect("chain lock poisoned");
        inner.height += 1;
        let block = Block::new(inner.height);
        inner.latest_block = Some(block.clone());
        block
    }
}

#[cfg(test)]
mod tests {
    use super::Chain;
    use std::time::Duration;

    fn chain() -> Chain {
        Chain::new(Duration::from_millis(10))
    }

    #[test]
    fn starts_stopped_at_height_zero() {
        let c = chain();
        assert!(!c.is_running());
        assert_eq!(c.height(), 0);
        assert!(c.latest_block().is_none());
        assert_eq!(c.last_block_time(), 0);
    }

    #[test]
    fn start_is_idempotent() {
        let c = chain();
        assert!(c.start());
        let token = c.cancel_token();
        assert!(!c.start());
        assert!(c.is_running());
        assert_eq!(c.height(), 0);
        // Second start must not replace the run's token.
        assert!(!token.is_cancelled());
        c.stop();
        assert!(token.is_cancelled());
    }

    #[test]
    fn racing_starts_grant_the_transition_to_exactly_one_caller() {
        use std::sync::Arc;
        use std::sync::atomic::{AtomicUsize, Ordering};
        use std::thread;

        let c = Arc::new(chain());
        let wins = Arc::new(AtomicUsize::new(0));

        let mut handles = Vec::new();
        for _ in 0..8 {
            let c = Arc::clone(&c);
            let wins = Arc::clone(&wins);
            handles.push(thread::spawn(move || {
                if c.start() {
                    wins.fetch_add(1, Ordering::SeqCst);
                }
            }));
        }
        for h in handles {
            h.join().unwrap();
        }

        assert_eq!(wins.load(Ordering::SeqCst), 1);
        assert!(c.is_running());
    }

    #[test]
    fn stop_on_stopped_chain_is_a_noop() {
        let c = chain();
        c.stop();
        assert!(!c.is_running());

        c.start();
        c.stop();
        c.stop();
        assert!(!c.is_running());
    }

    #[test]
    fn restart_allocates_fresh_token() {
        let c = chain();
        c.start();
        let first = c.cancel_token();
        c.stop();
        assert!(first.is_cancelled());

        c.start();
        let second = c.cancel_token();
        assert!(!second.is_cancelled());
    }

    #[test]
    fn create_block_increments_height_and_replaces_latest() {
        let c = chain();
        let b1 = c.create_block();
        assert_eq!(b1.number, 1);
        assert_eq!(c.height(), 1);

        let b2 = c.create_block();
        assert_eq!(b2.number, 2);
        assert_eq!(c.latest_block().unwrap().number, 2);
        assert_eq!(c.last_block_time(), b2.timestamp);
    }
}
