use std::sync::Arc;

use tokio::sync::watch;

/// Generation counter shared by all tokens of one session.
///
/// Advancing the clock supersedes every token handed out before.
#[derive(Debug, Clone)]
pub struct CycleClock {
    tx: Arc<watch::Sender<u64>>,
}

impl CycleClock {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(0);
        Self { tx: Arc::new(tx) }
    }

    /// Start a new cycle and return its token.
    pub fn advance(&self) -> CycleToken {
        let mut next = 0;
        self.tx.send_modify(|v| {
            *v += 1;
            next = *v;
        });
        self.token_for(next)
    }

    /// Token for the cycle that is current right now.
    pub fn current(&self) -> CycleToken {
        let id = *self.tx.borrow();
        self.token_for(id)
    }

    fn token_for(&self, id: u64) -> CycleToken {
        CycleToken {
            id,
            rx: self.tx.subscribe(),
            _clock: Arc::clone(&self.tx),
        }
    }
}

impl Default for CycleClock {
    fn default() -> Self {
        Self::new()
    }
}

/// Identifies one ingestion cycle; results are applied only while it is current.
#[derive(Debug, Clone)]
pub struct CycleToken {
    id: u64,
    rx: watch::Receiver<u64>,
    _clock: Arc<watch::Sender<u64>>,
}

impl CycleToken {
    /// A token on a private clock. It stays current forever.
    pub fn detached() -> Self {
        CycleClock::new().current()
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn is_current(&self) -> bool {
        *self.rx.borrow() == self.id
    }

    /// Resolves once the clock has moved past this token's cycle.
    pub async fn superseded(&mut self) {
        let id = self.id;
        let _ = self.rx.wait_for(|v| *v != id).await;
    }
}
