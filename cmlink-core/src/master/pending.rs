//! Pending command table
//!
//! Bounded table of requests awaiting a response. Entries are keyed by
//! sequence number and retired only by a matching response, by a NAK, or by
//! running out of retries.

use heapless::Vec;

use cmlink_protocol::{Frame, Timestamp};

/// Maximum concurrently pending requests
pub const MAX_PENDING: usize = 4;

/// One in-flight request
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct PendingEntry {
    /// Frame as last transmitted, re-sent verbatim on retry
    pub frame: Frame,
    /// Retransmissions so far
    pub retry_count: u8,
    /// Time of the last transmission
    pub sent_at: Timestamp,
    /// ACK/NAK expected rather than a typed response
    pub awaits_ack: bool,
}

impl PendingEntry {
    pub fn new(frame: Frame, sent_at: Timestamp, awaits_ack: bool) -> Self {
        Self {
            frame,
            retry_count: 0,
            sent_at,
            awaits_ack,
        }
    }

    /// Sequence number of the request
    pub fn seq(&self) -> u8 {
        self.frame.seq
    }
}

/// Result of one timeout sweep over the table
#[derive(Debug, Clone, Default)]
pub struct Expiry {
    /// Frames to transmit again
    pub retransmit: Vec<Frame, MAX_PENDING>,
    /// Entries removed after exhausting their retries
    pub abandoned: Vec<PendingEntry, MAX_PENDING>,
}

/// Bounded table of pending requests
#[derive(Debug, Clone, Default)]
pub struct PendingTable {
    entries: Vec<PendingEntry, MAX_PENDING>,
}

impl PendingTable {
    pub const fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.entries.is_full()
    }

    /// Whether a request with this sequence number is pending
    pub fn contains(&self, seq: u8) -> bool {
        self.get(seq).is_some()
    }

    pub fn get(&self, seq: u8) -> Option<&PendingEntry> {
        self.entries.iter().find(|entry| entry.seq() == seq)
    }

    pub fn iter(&self) -> impl Iterator<Item = &PendingEntry> {
        self.entries.iter()
    }

    /// Add an entry
    ///
    /// Hands the entry back if the table is full or its sequence number is
    /// already in use.
    pub fn insert(&mut self, entry: PendingEntry) -> Result<(), PendingEntry> {
        if self.contains(entry.seq()) {
            return Err(entry);
        }
        self.entries.push(entry)
    }

    /// Remove and return the entry with this sequence number
    pub fn take(&mut self, seq: u8) -> Option<PendingEntry> {
        let index = self.entries.iter().position(|entry| entry.seq() == seq)?;
        Some(self.entries.swap_remove(index))
    }

    /// Retransmit or abandon every entry older than `timeout_ms`
    ///
    /// An expired entry with retries left is stamped with `now` and its frame
    /// queued for retransmission; one without is removed.
    pub fn expire(&mut self, now: Timestamp, timeout_ms: u32, max_retries: u8) -> Expiry {
        let mut expiry = Expiry::default();
        let mut index = 0;

        while index < self.entries.len() {
            let entry = &mut self.entries[index];
            if now.millis_since(entry.sent_at) <= timeout_ms as u64 {
                index += 1;
                continue;
            }

            if entry.retry_count < max_retries {
                entry.retry_count += 1;
                entry.sent_at = now;
                // Both vectors hold at most MAX_PENDING items
                let _ = expiry.retransmit.push(entry.frame.clone());
                index += 1;
            } else {
                let _ = expiry.abandoned.push(self.entries.swap_remove(index));
            }
        }

        expiry
    }
}
