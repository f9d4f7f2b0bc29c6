//! Thread-safe, arrival-ordered storage for captured frames

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::SystemTime;

use crate::types::{DmxFrame, channel_index};

/// Frames captured by a receiver, in arrival order.
///
/// The store never reorders or deduplicates frames, even when sequence numbers
/// repeat or go backwards. The lock is held only for a push or a copy of the
/// frame handles, never across I/O.
#[derive(Debug, Default)]
pub struct FrameStore {
    frames: Mutex<Vec<Arc<DmxFrame>>>,
}

impl FrameStore {
    pub fn new() -> Self {
        Self::default()
    }

    // A poisoned lock still guards a consistent vector of immutable frames.
    fn lock(&self) -> MutexGuard<'_, Vec<Arc<DmxFrame>>> {
        self.frames.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Append a frame to the end of the store.
    pub fn append(&self, frame: impl Into<Arc<DmxFrame>>) {
        let frame = frame.into();
        self.lock().push(frame);
    }

    /// Independent copy of every stored frame.
    pub fn snapshot(&self) -> Vec<Arc<DmxFrame>> {
        self.lock().clone()
    }

    /// Discard all stored frames.
    pub fn clear(&self) {
        self.lock().clear();
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Most recently appended frame for a wire universe.
    pub fn latest(&self, universe: u16) -> Option<Arc<DmxFrame>> {
        self.lock().iter().rev().find(|frame| frame.universe == universe).cloned()
    }

    /// Level of a 1-indexed channel in the latest frame of a wire universe.
    pub fn channel_value(&self, universe: u16, channel: u16) -> Option<u8> {
        let index = channel_index(channel)?;
        self.latest(universe).map(|frame| frame.channels[index])
    }

    /// Every stored frame of one wire universe, in arrival order.
    pub fn frames_for(&self, universe: u16) -> Vec<Arc<DmxFrame>> {
        self.lock().iter().filter(|frame| frame.universe == universe).cloned().collect()
    }

    /// Frames captured at or after `since`, in arrival order.
    pub fn frames_since(&self, since: SystemTime) -> Vec<Arc<DmxFrame>> {
        self.lock().iter().filter(|frame| frame.timestamp >= since).cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::DMX_CHANNELS;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::{Duration, UNIX_EPOCH};

    fn frame(universe: u16, sequence: u8, fill: u8) -> DmxFrame {
        DmxFrame::new(universe, sequence, [fill; DMX_CHANNELS], SystemTime::now())
    }

    #[test]
    fn latest_scans_from_the_tail_per_universe() {
        let store = FrameStore::new();
        store.append(frame(0, 1, 10));
        store.append(frame(1, 1, 20));
        store.append(frame(0, 2, 30));

        assert_eq!(store.latest(0).map(|f| f.channels[0]), Some(30));
        assert_eq!(store.latest(1).map(|f| f.channels[0]), Some(20));
        assert!(store.latest(2).is_none());
    }

    #[test]
    fn channel_value_is_bounds_checked_and_one_indexed() {
        let store = FrameStore::new();
        let mut channels = [0u8; DMX_CHANNELS];
        channels[0] = 177;
        channels[511] = 5;
        store.append(DmxFrame::new(0, 0, channels, SystemTime::now()));

        assert_eq!(store.channel_value(0, 1), Some(177));
        assert_eq!(store.channel_value(0, 512), Some(5));
        assert_eq!(store.channel_value(0, 0), None);
        assert_eq!(store.channel_value(0, 513), None);
        assert_eq!(store.channel_value(1, 1), None);
    }

    #[test]
    fn keeps_arrival_order_with_backwards_sequences() {
        let store = FrameStore::new();
        for sequence in [5u8, 3, 3, 255, 0] {
            store.append(frame(0, sequence, sequence));
        }

        let sequences: Vec<u8> = store.snapshot().iter().map(|f| f.sequence).collect();
        assert_eq!(sequences, vec![5, 3, 3, 255, 0]);
        assert_eq!(store.latest(0).map(|f| f.sequence), Some(0));
    }

    #[test]
    fn snapshot_is_independent_of_later_changes() {
        let store = FrameStore::new();
        store.append(frame(0, 1, 1));
        let snapshot = store.snapshot();

        store.append(frame(0, 2, 2));
        store.clear();

        assert_eq!(snapshot.len(), 1);
        assert!(store.is_empty());
        assert!(store.latest(0).is_none());
    }

    #[test]
    fn time_window_and_universe_filters() {
        let store = FrameStore::new();
        let base = UNIX_EPOCH + Duration::from_secs(1_000);
        for (offset, universe) in [(0u64, 0u16), (10, 1), (20, 0), (30, 0)] {
            let stamp = base + Duration::from_millis(offset);
            store.append(DmxFrame::new(universe, offset as u8, [0; DMX_CHANNELS], stamp));
        }

        let window = store.frames_since(base + Duration::from_millis(10));
        assert_eq!(window.iter().map(|f| f.sequence).collect::<Vec<_>>(), vec![10, 20, 30]);

        let universe_zero = store.frames_for(0);
        assert_eq!(universe_zero.iter().map(|f| f.sequence).collect::<Vec<_>>(), vec![0, 20, 30]);
    }

    #[test]
    fn concurrent_append_and_snapshot_never_lose_completed_frames() {
        const FRAMES: usize = 2_000;

        let store = Arc::new(FrameStore::new());
        let completed = Arc::new(AtomicUsize::new(0));

        let writer = {
            let store = Arc::clone(&store);
            let completed = Arc::clone(&completed);
            std::thread::spawn(move || {
                for i in 0..FRAMES {
                    let fill = (i % 256) as u8;
                    store.append(DmxFrame::new(0, fill, [fill; DMX_CHANNELS], SystemTime::now()));
                    completed.store(i + 1, Ordering::SeqCst);
                }
            })
        };

        let mut last_len = 0;
        while last_len < FRAMES {
            let appended_before = completed.load(Ordering::SeqCst);
            let snapshot = store.snapshot();

            assert!(snapshot.len() >= appended_before, "snapshot lost a completed append");
            assert!(snapshot.len() >= last_len, "snapshot shrank without a clear");
            for (i, frame) in snapshot.iter().enumerate().skip(last_len) {
                let fill = (i % 256) as u8;
                assert_eq!(frame.sequence, fill);
                assert!(frame.channels.iter().all(|&v| v == fill), "partially written frame");
            }
            last_len = snapshot.len();
        }

        writer.join().expect("writer thread panicked");
        assert_eq!(store.len(), FRAMES);
    }
}
