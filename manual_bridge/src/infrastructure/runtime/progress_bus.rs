// /////////////////////////////////////////////////////////////////////////////
// Manual Bridge
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Progress bus (C3 transport)
//!
//! One `tokio::sync::broadcast` channel per in-flight process, so a
//! `/progress/{process_id}` WebSocket subscriber only receives frames for
//! its own document. Channels are created lazily on first publish or
//! subscribe and dropped once the process reaches a terminal state and its
//! last subscriber disconnects.

use dashmap::DashMap;
use tokio::sync::broadcast;

use manual_bridge_domain::ids::ProcessId;
use manual_bridge_domain::progress::ProgressUpdate;

const CHANNEL_CAPACITY: usize = 256;

pub struct ProgressBus {
    channels: DashMap<ProcessId, broadcast::Sender<ProgressUpdate>>,
    last: DashMap<ProcessId, ProgressUpdate>,
}

impl ProgressBus {
    pub fn new() -> Self {
        Self {
            channels: DashMap::new(),
            last: DashMap::new(),
        }
    }

    fn sender(&self, process_id: ProcessId) -> broadcast::Sender<ProgressUpdate> {
        self.channels
            .entry(process_id)
            .or_insert_with(|| broadcast::channel(CHANNEL_CAPACITY).0)
            .clone()
    }

    /// Publishes an update; a channel with no subscribers silently drops it
    /// rather than erroring, matching the at-most-once, best-effort nature
    /// of the progress push (the `/status` endpoint remains authoritative).
    pub fn publish(&self, update: ProgressUpdate) {
        self.last.insert(update.process_id, update.clone());
        let sender = self.sender(update.process_id);
        let _ = sender.send(update);
    }

    pub fn subscribe(&self, process_id: ProcessId) -> broadcast::Receiver<ProgressUpdate> {
        self.sender(process_id).subscribe()
    }

    /// `Snapshot(process_id)` for polling consumers (§4.3): the latest
    /// published update, independent of whether any subscriber is attached.
    pub fn snapshot(&self, process_id: ProcessId) -> Option<ProgressUpdate> {
        self.last.get(&process_id).map(|entry| entry.value().clone())
    }

    /// Drops the broadcast channel for a terminal process once called by the
    /// use case that observed the terminal update, bounding subscriber-side
    /// memory for long-running servers. The last snapshot is kept (same
    /// lifetime as the process record itself) so `/status` still answers for
    /// a process that has already gone terminal.
    pub fn retire(&self, process_id: ProcessId) {
        self.channels.remove(&process_id);
    }
}

impl Default for ProgressBus {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use manual_bridge_domain::value_objects::Stage;

    #[test]
    fn subscriber_receives_published_update() {
        let bus = ProgressBus::new();
        let pid = ProcessId::new();
        let mut rx = bus.subscribe(pid);
        bus.publish(ProgressUpdate::in_progress(pid, Stage::Validation, 0, "start", 0.0));
        let received = rx.try_recv().unwrap();
        assert_eq!(received.process_id, pid);
    }

    #[test]
    fn retiring_drops_the_channel() {
        let bus = ProgressBus::new();
        let pid = ProcessId::new();
        let _rx = bus.subscribe(pid);
        bus.retire(pid);
        assert!(bus.channels.get(&pid).is_none());
    }
}
