use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock};
use std::time::{Duration, Instant};

use crate::cleaner::Sweep;

/// Remembers recent xids per client so a retransmitted request is executed
/// at most once.
#[derive(Debug)]
pub struct TransactionTracker {
    retention_period: Duration,
    clients: RwLock<HashMap<String, Arc<Mutex<ClientHistory>>>>,
    max_in_flight: u16,
    trim_limit: usize,
}

impl TransactionTracker {
    /// `max_in_flight` bounds the requests a client may have in progress,
    /// `trim_limit` the completed ones remembered per client.
    #[must_use]
    pub fn new(retention_period: Duration, max_in_flight: u16, trim_limit: usize) -> Self {
        Self {
            retention_period,
            clients: RwLock::new(HashMap::new()),
            max_in_flight,
            trim_limit: trim_limit.max(usize::from(max_in_flight) + 1),
        }
    }

    pub(crate) fn start_transaction(
        &self,
        client_addr: &str,
        xid: u32,
        now: Instant,
    ) -> Result<TransactionLock, TransactionError> {
        let existing = self
            .clients
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(client_addr)
            .cloned();

        let history = match existing {
            Some(history) => history,
            None => {
                // another connection may have registered the client meanwhile
                let mut clients = self.clients.write().unwrap_or_else(PoisonError::into_inner);
                Arc::clone(clients.entry(client_addr.to_owned()).or_insert_with(|| {
                    Arc::new(Mutex::new(ClientHistory::new(
                        now,
                        self.max_in_flight,
                        self.trim_limit,
                    )))
                }))
            }
        };

        lock(&history).add(xid, now)?;
        Ok(TransactionLock {
            history,
            xid,
            retention_period: self.retention_period,
        })
    }

    pub(crate) fn cleanup(&self, now: Instant) {
        let mut clients = self.clients.write().unwrap_or_else(PoisonError::into_inner);
        clients.retain(|_, history| {
            let mut history = lock(history);
            if history.is_active(now, self.retention_period) {
                history.remove_expired(now, self.retention_period);
                true
            } else {
                false
            }
        });
    }

    #[cfg(test)]
    fn client_count(&self) -> usize {
        self.clients.read().unwrap_or_else(PoisonError::into_inner).len()
    }
}

impl Sweep for TransactionTracker {
    fn sweep(&self, now: Instant) {
        self.cleanup(now);
    }
}

fn lock(history: &Mutex<ClientHistory>) -> MutexGuard<'_, ClientHistory> {
    history.lock().unwrap_or_else(PoisonError::into_inner)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum TransactionError {
    /// The xid is in progress or was answered recently.
    Retransmission,
    TooManyRequests,
}

impl std::fmt::Display for TransactionError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Retransmission => write!(f, "retransmitted request"),
            Self::TooManyRequests => write!(f, "too many requests in flight"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TransactionState {
    InProgress,
    Completed(Instant),
}

#[derive(Debug)]
struct Transaction {
    xid: u32,
    state: TransactionState,
}

impl Transaction {
    fn is_expired(&self, now: Instant, max_age: Duration) -> bool {
        match self.state {
            TransactionState::InProgress => false,
            TransactionState::Completed(at) => now.saturating_duration_since(at) > max_age,
        }
    }
}

#[derive(Debug)]
struct ClientHistory {
    // ordered by xid; clients usually send increasing xids
    transactions: VecDeque<Transaction>,
    last_active: Instant,
    in_flight: u16,
    max_in_flight: u16,
    trim_limit: usize,
}

impl ClientHistory {
    const fn new(now: Instant, max_in_flight: u16, trim_limit: usize) -> Self {
        Self {
            transactions: VecDeque::new(),
            last_active: now,
            in_flight: 0,
            max_in_flight,
            trim_limit,
        }
    }

    fn position(&self, xid: u32) -> Result<usize, usize> {
        match self.transactions.back() {
            Some(last) if last.xid == xid => Ok(self.transactions.len() - 1),
            Some(last) if last.xid < xid => Err(self.transactions.len()),
            Some(_) => self.transactions.binary_search_by_key(&xid, |tx| tx.xid),
            None => Err(0),
        }
    }

    fn add(&mut self, xid: u32, now: Instant) -> Result<(), TransactionError> {
        self.last_active = now;
        let Err(position) = self.position(xid) else {
            return Err(TransactionError::Retransmission);
        };
        if self.in_flight >= self.max_in_flight {
            return Err(TransactionError::TooManyRequests);
        }
        self.in_flight += 1;
        self.transactions.insert(
            position,
            Transaction {
                xid,
                state: TransactionState::InProgress,
            },
        );
        self.trim();
        Ok(())
    }

    fn complete(&mut self, xid: u32, now: Instant) {
        self.last_active = now;
        if let Ok(position) = self.position(xid) {
            let tx = &mut self.transactions[position];
            if tx.state == TransactionState::InProgress {
                tx.state = TransactionState::Completed(now);
                self.in_flight = self.in_flight.saturating_sub(1);
            }
        }
    }

    /// Drops completed transactions from the front that are past `max_age`.
    fn remove_expired(&mut self, now: Instant, max_age: Duration) {
        while self
            .transactions
            .front()
            .is_some_and(|tx| tx.is_expired(now, max_age))
        {
            self.transactions.pop_front();
        }
    }

    fn is_active(&self, now: Instant, max_age: Duration) -> bool {
        now.saturating_duration_since(self.last_active) < max_age
            || self.transactions.iter().any(|tx| !tx.is_expired(now, max_age))
    }

    fn trim(&mut self) {
        while self.transactions.len() > self.trim_limit {
            match self.transactions.front() {
                Some(tx) if tx.state != TransactionState::InProgress => {
                    self.transactions.pop_front();
                }
                _ => break,
            }
        }
    }
}

/// Marks the transaction completed when dropped.
#[derive(Debug)]
pub(crate) struct TransactionLock {
    history: Arc<Mutex<ClientHistory>>,
    xid: u32,
    retention_period: Duration,
}

impl Drop for TransactionLock {
    fn drop(&mut self) {
        let now = Instant::now();
        let mut history = lock(&self.history);
        history.complete(self.xid, now);
        history.remove_expired(now, self.retention_period);
    }
}
