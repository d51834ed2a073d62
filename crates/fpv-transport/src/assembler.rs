//! Slotted frame assembler: reconstructs access units from out-of-order
//! fragments, tracks the single newest completed AU, and detects the
//! conditions (timeout, overflow, supersede) that the session driver turns
//! into `IDR_REQUEST`s or drop counters.

use fpv_core::serial::{is_newer, is_older};
use fpv_core::types::AccessUnit;
use fpv_core::FpvError;
use fpv_proto::{VideoFragment, MAX_AU_SIZE, MAX_FRAGMENTS, MAX_INFLIGHT_FRAMES};

use crate::mailbox::SingleSlotMailbox;

struct FrameSlot {
    active: bool,
    frame_id: u32,
    ts_ms: u32,
    first_seen_us: u64,
    frag_count: u16,
    flags: u8,
    data: Vec<u8>,
    frag_offsets: [u32; MAX_FRAGMENTS],
    frag_lengths: [u32; MAX_FRAGMENTS],
    received_mask: u64,
    frags_received: u16,
}

impl FrameSlot {
    fn empty() -> Self {
        Self {
            active: false,
            frame_id: 0,
            ts_ms: 0,
            first_seen_us: 0,
            frag_count: 0,
            flags: 0,
            data: Vec::new(),
            frag_offsets: [0; MAX_FRAGMENTS],
            frag_lengths: [0; MAX_FRAGMENTS],
            received_mask: 0,
            frags_received: 0,
        }
    }

    fn reset_for(&mut self, frag: &VideoFragment, now_us: u64) {
        self.active = true;
        self.frame_id = frag.frame_id;
        self.ts_ms = frag.ts_ms;
        self.first_seen_us = now_us;
        self.frag_count = frag.frag_count;
        self.flags = 0;
        self.data.clear();
        self.frag_offsets = [0; MAX_FRAGMENTS];
        self.frag_lengths = [0; MAX_FRAGMENTS];
        self.received_mask = 0;
        self.frags_received = 0;
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AssemblerStats {
    pub fragments_received: u64,
    pub duplicate_fragments: u64,
    pub frames_completed: u64,
    pub dropped_superseded: u64,
    pub dropped_overflow: u64,
    pub dropped_timeout: u64,
}

pub struct Assembler {
    slots: Vec<FrameSlot>,
    newest_frame_id: u32,
    have_newest: bool,
    latest_au: SingleSlotMailbox<AccessUnit>,
    needs_idr: bool,
    stats: AssemblerStats,
}

impl Assembler {
    pub fn new() -> Self {
        Self {
            slots: (0..MAX_INFLIGHT_FRAMES).map(|_| FrameSlot::empty()).collect(),
            newest_frame_id: 0,
            have_newest: false,
            latest_au: SingleSlotMailbox::new(),
            needs_idr: false,
            stats: AssemblerStats::default(),
        }
    }

    pub fn stats(&self) -> AssemblerStats {
        self.stats
    }

    pub fn needs_idr(&self) -> bool {
        self.needs_idr
    }

    pub fn clear_idr_request(&mut self) {
        self.needs_idr = false;
    }

    /// Feeds one fragment into the assembler at time `now_us`. Errors are
    /// non-fatal per the caller contract: the datagram is dropped and a
    /// counter incremented.
    pub fn add_fragment(&mut self, frag: &VideoFragment, now_us: u64) -> Result<(), FpvError> {
        self.stats.fragments_received += 1;

        if self.have_newest && is_older(frag.frame_id, self.newest_frame_id) {
            let distance = self.newest_frame_id.wrapping_sub(frag.frame_id) as i32;
            if distance > 1 {
                return Ok(());
            }
        }

        if !self.have_newest || is_newer(frag.frame_id, self.newest_frame_id) {
            if self.have_newest {
                self.drop_older_frames(frag.frame_id);
            }
            self.newest_frame_id = frag.frame_id;
            self.have_newest = true;
        }

        if frag.frag_count as usize > MAX_FRAGMENTS || frag.frag_index >= frag.frag_count {
            return Err(FpvError::Proto("fragment index out of range".into()));
        }

        let slot_idx = self.find_or_create_slot(frag.frame_id);
        let slot = &mut self.slots[slot_idx];
        if !slot.active || slot.frame_id != frag.frame_id {
            slot.reset_for(frag, now_us);
        }

        let frag_index = frag.frag_index as usize;
        if slot.received_mask & (1u64 << frag_index) != 0 {
            self.stats.duplicate_fragments += 1;
            return Ok(());
        }

        let offset = slot.data.len();
        if offset + frag.payload.len() > MAX_AU_SIZE {
            slot.active = false;
            return Err(FpvError::AccessUnitTooLarge);
        }

        slot.data.extend_from_slice(&frag.payload);
        slot.frag_offsets[frag_index] = offset as u32;
        slot.frag_lengths[frag_index] = frag.payload.len() as u32;
        slot.received_mask |= 1u64 << frag_index;
        slot.frags_received += 1;
        slot.flags |= frag.flags;

        if slot.frags_received == slot.frag_count {
            self.complete_frame(slot_idx, now_us);
        }

        Ok(())
    }

    /// Deactivates any slot that has been assembling for longer than
    /// `timeout_us` as of `now_us`, marking `needs_idr`.
    pub fn check_timeouts(&mut self, now_us: u64, timeout_us: u64) {
        for slot in self.slots.iter_mut() {
            if slot.active && now_us.saturating_sub(slot.first_seen_us) > timeout_us {
                slot.active = false;
                self.stats.dropped_timeout += 1;
                self.needs_idr = true;
            }
        }
    }

    /// Takes ownership of the latest completed access unit, if any,
    /// clearing readiness.
    pub fn take_latest_au(&self) -> Option<AccessUnit> {
        self.latest_au.take()
    }

    fn find_or_create_slot(&mut self, frame_id: u32) -> usize {
        if let Some(i) = self.slots.iter().position(|s| s.active && s.frame_id == frame_id) {
            return i;
        }
        if let Some(i) = self.slots.iter().position(|s| !s.active) {
            return i;
        }

        let mut oldest = 0usize;
        for i in 1..self.slots.len() {
            if is_older(self.slots[i].frame_id, self.slots[oldest].frame_id) {
                oldest = i;
            }
        }
        if self.slots[oldest].active {
            self.stats.dropped_overflow += 1;
        }
        self.slots[oldest].active = false;
        oldest
    }

    fn drop_older_frames(&mut self, frame_id: u32) {
        for slot in self.slots.iter_mut() {
            if slot.active && is_older(slot.frame_id, frame_id) {
                slot.active = false;
                self.stats.dropped_superseded += 1;
            }
        }
    }

    fn complete_frame(&mut self, slot_idx: usize, now_us: u64) {
        let slot = &mut self.slots[slot_idx];

        let mut data = Vec::with_capacity(slot.data.len());
        for i in 0..slot.frag_count as usize {
            let offset = slot.frag_offsets[i] as usize;
            let len = slot.frag_lengths[i] as usize;
            data.extend_from_slice(&slot.data[offset..offset + len]);
        }

        let au = AccessUnit {
            frame_id: slot.frame_id,
            ts_ms: slot.ts_ms,
            is_keyframe: slot.flags & fpv_proto::FLAG_KEYFRAME != 0,
            has_spspps: slot.flags & fpv_proto::FLAG_SPSPPS != 0,
            data: bytes::Bytes::from(data),
            first_packet_time_us: slot.first_seen_us,
            assembly_complete_us: now_us,
        };

        self.latest_au.put(au);
        self.stats.frames_completed += 1;
        slot.active = false;
    }
}

impl Default for Assembler {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;
    use fpv_proto::CODEC_H264;

    fn frag(frame_id: u32, idx: u16, count: u16, flags: u8, payload: &[u8]) -> VideoFragment {
        VideoFragment {
            session_id: 0xDEADBEEF,
            stream_id: 1,
            frame_id,
            frag_index: idx,
            frag_count: count,
            ts_ms: 1000,
            flags,
            codec: CODEC_H264,
            payload: Bytes::copy_from_slice(payload),
        }
    }

    /// Fragments arriving out of order still reassemble correctly.
    #[test]
    fn scenario_single_fragment_keyframe() {
        let mut asm = Assembler::new();
        let f = frag(42, 0, 1, 0x03, &[0, 0, 0, 1, 0x67]);
        asm.add_fragment(&f, 10).unwrap();

        let au = asm.take_latest_au().unwrap();
        assert_eq!(au.frame_id, 42);
        assert_eq!(au.ts_ms, 1000);
        assert!(au.is_keyframe);
        assert!(au.has_spspps);
        assert_eq!(au.data.as_ref(), &[0, 0, 0, 1, 0x67]);
    }

    /// A duplicate fragment is counted and does not corrupt reassembly.
    #[test]
    fn scenario_two_fragment_reversed_order() {
        let mut asm = Assembler::new();
        asm.add_fragment(&frag(100, 1, 2, 0, &[0xBB, 0xCC]), 0).unwrap();
        asm.add_fragment(&frag(100, 0, 2, 0, &[0xAA]), 1).unwrap();

        let au = asm.take_latest_au().unwrap();
        assert_eq!(au.data.as_ref(), &[0xAA, 0xBB, 0xCC]);
    }

    /// A newer frame_id supersedes an incomplete in-flight frame.
    #[test]
    fn scenario_supersede_does_not_request_idr() {
        let mut asm = Assembler::new();
        asm.add_fragment(&frag(10, 0, 2, 0, &[1]), 0).unwrap();
        asm.add_fragment(&frag(11, 0, 1, 0, &[2]), 1).unwrap();

        assert_eq!(asm.stats().dropped_superseded, 1);
        assert!(!asm.needs_idr());
        let au = asm.take_latest_au().unwrap();
        assert_eq!(au.frame_id, 11);
    }

    /// An access unit that never completes is evicted after its timeout.
    #[test]
    fn scenario_timeout_sets_needs_idr() {
        let mut asm = Assembler::new();
        asm.add_fragment(&frag(20, 0, 2, 0, &[1]), 0).unwrap();
        asm.check_timeouts(100_000, fpv_proto::FRAME_TIMEOUT_MS as u64 * 1000);

        assert_eq!(asm.stats().dropped_timeout, 1);
        assert!(asm.needs_idr());
    }

    #[test]
    fn duplicate_fragment_is_counted_and_ignored() {
        let mut asm = Assembler::new();
        asm.add_fragment(&frag(5, 0, 2, 0, &[1]), 0).unwrap();
        asm.add_fragment(&frag(5, 0, 2, 0, &[9, 9, 9]), 1).unwrap();
        asm.add_fragment(&frag(5, 1, 2, 0, &[2]), 2).unwrap();

        assert_eq!(asm.stats().duplicate_fragments, 1);
        let au = asm.take_latest_au().unwrap();
        assert_eq!(au.data.as_ref(), &[1, 2]);
    }

    #[test]
    fn overflow_evicts_oldest_incomplete_slot() {
        let mut asm = Assembler::new();
        for id in 0..(fpv_proto::MAX_INFLIGHT_FRAMES as u32) {
            asm.add_fragment(&frag(id, 0, 2, 0, &[id as u8]), id as u64).unwrap();
        }
        // One more distinct incomplete frame should evict frame 0.
        asm.add_fragment(&frag(fpv_proto::MAX_INFLIGHT_FRAMES as u32, 0, 2, 0, &[0xFF]), 999).unwrap();
        assert_eq!(asm.stats().dropped_overflow, 1);
    }

    #[test]
    fn take_latest_au_clears_readiness() {
        let mut asm = Assembler::new();
        asm.add_fragment(&frag(1, 0, 1, 0x01, &[7]), 0).unwrap();
        assert!(asm.take_latest_au().is_some());
        assert!(asm.take_latest_au().is_none());
    }
}
