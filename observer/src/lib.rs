//! The propagation observer (component G): records, per observed block, the
//! first-arrival delay at every node that has received it, retains only the
//! `window` most recently *first-observed* blocks, and flushes evicted
//! records as plain text.

use blocksim_consensus_core::{Block, BlockId, NodeId};
use blocksim_core::SimResult;
use indexmap::IndexMap;
use std::io::Write;
use std::sync::Arc;

const DEFAULT_WINDOW: usize = 10;

struct PropagationRecord {
    /// Insertion-ordered `nodeId -> (firstArrival - mintTime)`, preserved so
    /// that first-seen semantics are visible in iteration order too.
    arrivals: IndexMap<NodeId, u64>,
}

/// Bookkeeping plus an output sink. `sink` is any `Write` implementor; the
/// simulator crate hands it an output file, tests hand it an in-memory
/// buffer.
pub struct PropagationObserver<W: Write> {
    window: usize,
    tracked: IndexMap<BlockId, PropagationRecord>,
    sink: W,
}

impl<W: Write> PropagationObserver<W> {
    pub fn new(sink: W) -> Self {
        Self::with_window(DEFAULT_WINDOW, sink)
    }

    pub fn with_window(window: usize, sink: W) -> Self {
        assert!(window > 0, "observer window must be positive");
        Self { window, tracked: IndexMap::new(), sink }
    }

    /// Records that `block` was first seen by `node` at virtual time `now`.
    /// Idempotent per `(block, node)` pair: a second arrival for a node
    /// already present in the mapping is ignored (first-seen, not
    /// last-seen).
    pub fn arrive_block(&mut self, block: &Arc<Block>, node: NodeId, now: u64) -> SimResult<()> {
        let delay = now.saturating_sub(block.mint_time());
        if let Some(record) = self.tracked.get_mut(&block.id()) {
            record.arrivals.entry(node).or_insert(delay);
            return Ok(());
        }

        if self.tracked.len() >= self.window {
            let (_, oldest) = self.tracked.shift_remove_index(0).expect("len >= window > 0 implies non-empty");
            self.flush_record(&oldest)?;
        }
        let mut arrivals = IndexMap::new();
        arrivals.insert(node, delay);
        self.tracked.insert(block.id(), PropagationRecord { arrivals });
        Ok(())
    }

    /// Flushes every remaining tracked record, oldest first. Called once at
    /// simulation shutdown.
    pub fn flush_all(&mut self) -> SimResult<()> {
        while let Some((_, record)) = self.tracked.shift_remove_index(0) {
            self.flush_record(&record)?;
        }
        Ok(())
    }

    fn flush_record(&mut self, record: &PropagationRecord) -> SimResult<()> {
        for delay in record.arrivals.values() {
            if *delay == 0 {
                continue; // the minter-of-record line
            }
            writeln!(self.sink, "{delay}")?;
        }
        Ok(())
    }

    /// Direct access to the output sink, e.g. so a caller can inspect an
    /// in-memory buffer after a run without having to drop the observer.
    pub fn sink(&self) -> &W {
        &self.sink
    }

    #[cfg(test)]
    fn tracked_len(&self) -> usize {
        self.tracked.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use num::BigUint;

    fn block(id: BlockId, mint_time: u64) -> Arc<Block> {
        Block::genesis(id, 0, mint_time, BigUint::from(1u32))
    }

    #[test]
    fn first_seen_wins_over_later_arrivals() {
        let mut buf = Vec::new();
        let mut observer = PropagationObserver::with_window(10, &mut buf);
        let b = block(1, 100);
        observer.arrive_block(&b, 5, 150).unwrap(); // delay 50
        observer.arrive_block(&b, 5, 9000).unwrap(); // must not overwrite
        observer.flush_all().unwrap();
        let out = String::from_utf8(buf).unwrap();
        assert_eq!(out, "50\n");
    }

    #[test]
    fn zero_delay_minter_line_is_suppressed() {
        let mut buf = Vec::new();
        let mut observer = PropagationObserver::with_window(10, &mut buf);
        let b = block(1, 100);
        observer.arrive_block(&b, 0, 100).unwrap(); // minter, delay 0
        observer.arrive_block(&b, 1, 220).unwrap(); // delay 120
        observer.flush_all().unwrap();
        let out = String::from_utf8(buf).unwrap();
        assert_eq!(out, "120\n");
    }

    #[test]
    fn eviction_is_fifo_when_window_is_full() {
        let mut buf = Vec::new();
        let mut observer = PropagationObserver::with_window(2, &mut buf);
        observer.arrive_block(&block(1, 0), 1, 10).unwrap();
        observer.arrive_block(&block(2, 0), 1, 20).unwrap();
        assert_eq!(observer.tracked_len(), 2);
        // Third distinct block evicts block 1 (oldest), flushing its record.
        observer.arrive_block(&block(3, 0), 1, 30).unwrap();
        assert_eq!(observer.tracked_len(), 2);
        observer.flush_all().unwrap();
        let out = String::from_utf8(buf).unwrap();
        // Flushed order: block 1 (evicted), then blocks 2 and 3 (final flush).
        assert_eq!(out, "10\n20\n30\n");
    }
}
