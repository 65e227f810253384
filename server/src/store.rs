use cam_grid_common::frame::ClientId;
use dashmap::DashMap;
use image::RgbImage;
use std::sync::Arc;

/// Latest decoded frame per client.
///
/// Synchronization lives entirely inside the store: callers never see a
/// lock. `put` and `snapshot` may race freely; per-entry atomicity comes
/// from the map (an entry is always one whole image, never a splice of
/// two), and concurrent puts to the same id resolve to whichever insert
/// lands second under the shard lock — last write wins by the map's own
/// ordering, not by real-time arrival.
///
/// Entries are never removed; a client that disconnects keeps its last
/// frame on screen until the process exits.
pub struct FrameStore {
    frames: DashMap<ClientId, Arc<RgbImage>>,
}

impl FrameStore {
    pub fn new() -> Self {
        Self {
            frames: DashMap::new(),
        }
    }

    /// Insert or replace the frame for `id`.
    pub fn put(&self, id: ClientId, frame: RgbImage) {
        self.frames.insert(id, Arc::new(frame));
    }

    /// Point-in-time copy of the mapping, one `Arc` clone per entry, sorted
    /// by client id so tiles keep their position between compositor cycles.
    /// The returned vector never mutates; `put` is blocked only for the
    /// duration of a shard lock.
    pub fn snapshot(&self) -> Vec<(ClientId, Arc<RgbImage>)> {
        let mut entries: Vec<_> = self
            .frames
            .iter()
            .map(|entry| (entry.key().clone(), Arc::clone(entry.value())))
            .collect();
        entries.sort_by(|a, b| a.0.cmp(&b.0));
        entries
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }
}

impl Default for FrameStore {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;

    fn solid(r: u8, g: u8, b: u8) -> RgbImage {
        RgbImage::from_pixel(8, 8, Rgb([r, g, b]))
    }

    #[test]
    fn snapshot_contains_latest_put_per_id() {
        let store = FrameStore::new();
        store.put("a".into(), solid(1, 1, 1));
        store.put("b".into(), solid(2, 2, 2));
        store.put("a".into(), solid(9, 9, 9));

        let snap = store.snapshot();
        assert_eq!(snap.len(), 2);
        let a = snap.iter().find(|(id, _)| id.as_str() == "a").unwrap();
        assert_eq!(a.1.get_pixel(0, 0), &Rgb([9, 9, 9]));
    }

    #[test]
    fn replace_does_not_add_entries() {
        let store = FrameStore::new();
        store.put("x".into(), solid(1, 0, 0));
        store.put("y".into(), solid(0, 1, 0));
        store.put("x".into(), solid(0, 0, 1));
        assert_eq!(store.len(), 2);
    }

    #[test]
    fn empty_store_snapshot_is_empty() {
        let store = FrameStore::new();
        assert!(store.is_empty());
        assert!(store.snapshot().is_empty());
    }

    #[test]
    fn snapshot_is_sorted_by_client_id() {
        let store = FrameStore::new();
        store.put("c".into(), solid(3, 3, 3));
        store.put("a".into(), solid(1, 1, 1));
        store.put("b".into(), solid(2, 2, 2));

        let ids: Vec<_> = store
            .snapshot()
            .iter()
            .map(|(id, _)| id.as_str().to_owned())
            .collect();
        assert_eq!(ids, ["a", "b", "c"]);
    }

    #[test]
    fn snapshot_survives_later_puts() {
        let store = FrameStore::new();
        store.put("a".into(), solid(1, 1, 1));
        let snap = store.snapshot();
        store.put("a".into(), solid(200, 200, 200));
        // The copy taken earlier must not change under the caller.
        assert_eq!(snap[0].1.get_pixel(0, 0), &Rgb([1, 1, 1]));
    }

    #[test]
    fn concurrent_puts_never_splice_images() {
        let store = Arc::new(FrameStore::new());
        let mut handles = Vec::new();

        // Two writers hammer the same id with distinct uniform images while
        // a reader keeps snapshotting. Every observed frame must be wholly
        // one color or the other.
        for color in [10u8, 250u8] {
            let store = Arc::clone(&store);
            handles.push(std::thread::spawn(move || {
                for _ in 0..200 {
                    store.put("shared".into(), RgbImage::from_pixel(16, 16, Rgb([color; 3])));
                }
            }));
        }

        let reader = {
            let store = Arc::clone(&store);
            std::thread::spawn(move || {
                for _ in 0..200 {
                    for (_, frame) in store.snapshot() {
                        let first = *frame.get_pixel(0, 0);
                        assert!(frame.pixels().all(|p| *p == first));
                    }
                }
            })
        };

        for h in handles {
            h.join().unwrap();
        }
        reader.join().unwrap();
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn concurrent_puts_distinct_ids() {
        let store = Arc::new(FrameStore::new());
        let handles: Vec<_> = (0..8)
            .map(|i| {
                let store = Arc::clone(&store);
                std::thread::spawn(move || {
                    for _ in 0..50 {
                        store.put(format!("client-{i}").into(), solid(i as u8, 0, 0));
                    }
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }
        assert_eq!(store.len(), 8);
    }
}
