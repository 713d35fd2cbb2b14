//! `FrameAssembler` — turns a stream of entity deltas into a ring of
//! complete [`Frame`]s (§4.3).

use crate::entity::{bits::U_REMOVE, decode_entity_delta, read_entity_bits, EntityState, MAX_EDICTS};
use crate::errors::WireError;
use crate::math::vector_copy;
use crate::msg::MsgBuf;
use crate::player::{decode_playerstate_delta, PlayerState};

/// Size of the ring both for whole frames and for parsed entity states.
/// Must be a power of two; indices are masked, never modulo'd.
pub const UPDATE_BACKUP: usize = 16;
pub const MAX_PARSE_ENTITIES: usize = 1024;

const EV_PLAYER_TELEPORT: i32 = 1;
const EV_OTHER_TELEPORT: i32 = 2;

/// One parsed server frame: a player state and the set of entities visible
/// to it, referencing a slice of the shared parsed-entity ring.
#[derive(Debug, Clone, Default)]
pub struct Frame {
    pub valid: bool,
    pub serverframe: i32,
    pub servertime: i32,
    pub delta_frame: i32,
    pub areabits: Vec<u8>,
    pub playerstate: PlayerState,
    pub num_entities: i32,
    /// index into the shared parsed-entity ring where this frame's entities begin
    pub parse_entities: i32,
}

/// Baseline plus interpolation bookkeeping for one entity slot, carried
/// across frames by its entity number (§4.3's `CEntity`). Everything the
/// teacher's smoothing subsystem layers on top (spline history, dead
/// reckoning, velocity extrapolation) is out of scope here — interpolation
/// works from `prev`/`current` alone.
#[derive(Debug, Clone, Default)]
pub struct CEntity {
    pub baseline: EntityState,
    pub current: EntityState,
    pub prev: EntityState,
    /// server frame this entity was last updated on, or -99 if the next
    /// update should skip interpolation entirely (teleport, see §4.3)
    pub serverframe: i32,
}

#[derive(Debug)]
pub struct FrameAssembler {
    /// per-entity-number tracking state, indexed by entity number
    entities: Vec<CEntity>,
    /// ring of parsed `EntityState`s shared across all frames, indexed by
    /// `(parse_entities + i) & (MAX_PARSE_ENTITIES - 1)`
    parsed: Vec<EntityState>,
    /// running write cursor into `parsed`, never wrapped until indexed
    parse_entities: i32,
    /// ring of recently assembled frames, indexed by `serverframe & (UPDATE_BACKUP - 1)`;
    /// this is what a later frame's `delta_frame` looks itself up in (§4.3 step 2)
    frames: Vec<Frame>,
}

impl Default for FrameAssembler {
    fn default() -> Self {
        Self::new()
    }
}

impl FrameAssembler {
    pub fn new() -> Self {
        Self {
            entities: vec![CEntity::default(); MAX_EDICTS],
            parsed: vec![EntityState::default(); MAX_PARSE_ENTITIES],
            parse_entities: 0,
            frames: vec![Frame::default(); UPDATE_BACKUP],
        }
    }

    pub fn baseline(&self, number: usize) -> &EntityState {
        &self.entities[number].baseline
    }

    pub fn set_baseline(&mut self, number: usize, state: EntityState) {
        self.entities[number].baseline = state;
    }

    pub fn tracked(&self, number: usize) -> &CEntity {
        &self.entities[number]
    }

    /// Entity state written to this frame's `i`-th parsed-entity slot, in
    /// the order `parse_packet_entities` resolved it. Lets a caller walk a
    /// frame's full entity set (in ring order) rather than just look one
    /// number up by its last-known state.
    pub fn entity_at(&self, frame: &Frame, i: i32) -> EntityState {
        self.parsed_at(frame, i)
    }

    fn parsed_at(&self, frame: &Frame, i: i32) -> EntityState {
        let idx = ((frame.parse_entities + i) as usize) & (MAX_PARSE_ENTITIES - 1);
        self.parsed[idx].clone()
    }

    fn oldstate_at(&self, oldframe: Option<&Frame>, oldindex: i32) -> (i32, EntityState) {
        match oldframe {
            Some(of) if oldindex < of.num_entities => {
                let s = self.parsed_at(of, oldindex);
                (s.number, s)
            }
            _ => (i32::MAX, EntityState::default()),
        }
    }

    /// Records one resolved entity state into the parsed ring for
    /// `newframe`, updates the per-number tracked `CEntity`, and flags a
    /// forced-no-lerp cut (teleport, model swap, or a >512-unit jump).
    fn commit(&mut self, newframe: &mut Frame, number: i32, state: EntityState) -> Result<(), WireError> {
        if number <= 0 || number as usize >= MAX_EDICTS {
            return Err(WireError::Invalid("entity number out of range"));
        }

        let slot = ((self.parse_entities + newframe.num_entities) as usize) & (MAX_PARSE_ENTITIES - 1);
        self.parsed[slot] = state.clone();
        newframe.num_entities += 1;

        let ent = &mut self.entities[number as usize];

        let teleported = state.modelindex != ent.current.modelindex
            || state.modelindex2 != ent.current.modelindex2
            || state.modelindex3 != ent.current.modelindex3
            || state.modelindex4 != ent.current.modelindex4
            || (state.origin[0] - ent.current.origin[0]).abs() > 512.0
            || (state.origin[1] - ent.current.origin[1]).abs() > 512.0
            || (state.origin[2] - ent.current.origin[2]).abs() > 512.0
            || state.event == EV_PLAYER_TELEPORT
            || state.event == EV_OTHER_TELEPORT;

        if teleported {
            ent.serverframe = -99;
        }

        if ent.serverframe != newframe.serverframe - 1 {
            ent.prev = state.clone();
            if state.event == EV_OTHER_TELEPORT || state.event == EV_PLAYER_TELEPORT {
                ent.prev.origin = vector_copy(&state.origin);
            } else {
                ent.prev.origin = vector_copy(&state.old_origin);
            }
        } else {
            ent.prev = ent.current.clone();
        }

        ent.serverframe = newframe.serverframe;
        ent.current = state;

        Ok(())
    }

    /// Consumes the `packetentities`/`deltapacketentities` body from `msg`,
    /// filling in `newframe`'s entity set. `oldframe` is `None` for a
    /// keyframe or when its `delta_frame` pointer has aged out of the ring
    /// (the caller is responsible for the stale-delta check against its own
    /// frame history; by the time it's `None` here it just means "start
    /// from nothing").
    ///
    /// This is the two-pointer sorted merge from §4.3: `oldnum` walks the
    /// previous frame's entity list, `newnum` walks the wire stream, and
    /// whichever is smaller is resolved first.
    pub fn parse_packet_entities(&mut self, oldframe: Option<&Frame>, newframe: &mut Frame, msg: &mut MsgBuf) -> Result<(), WireError> {
        newframe.parse_entities = self.parse_entities;
        newframe.num_entities = 0;

        let mut oldindex: i32 = 0;
        let (mut oldnum, mut oldstate) = self.oldstate_at(oldframe, oldindex);

        loop {
            let (newnum, bits) = read_entity_bits(msg)?;

            if newnum == 0 {
                break;
            }
            if newnum >= MAX_EDICTS as i32 {
                return Err(WireError::Invalid("entity number too large"));
            }

            while oldnum < newnum {
                let carried = oldstate.clone();
                self.commit(newframe, oldnum, carried)?;
                oldindex += 1;
                (oldnum, oldstate) = self.oldstate_at(oldframe, oldindex);
            }

            if bits & U_REMOVE != 0 {
                // entity present in oldframe left the PVS. The protocol
                // guarantees oldnum == newnum here; if it doesn't, the
                // stream is inconsistent but we still advance past the
                // removed slot rather than aborting the whole frame.
                if oldnum != newnum {
                    log::warn!(
                        "parse_packet_entities: REMOVE for entity {} but old frame points at {}",
                        newnum, oldnum
                    );
                }
                oldindex += 1;
                (oldnum, oldstate) = self.oldstate_at(oldframe, oldindex);
                continue;
            }

            let reference = if oldnum == newnum { oldstate.clone() } else { self.entities[newnum as usize].baseline.clone() };

            let mut resolved = EntityState::default();
            decode_entity_delta(&reference, &mut resolved, newnum, bits, msg)?;
            self.commit(newframe, newnum, resolved)?;

            if oldnum == newnum {
                oldindex += 1;
                (oldnum, oldstate) = self.oldstate_at(oldframe, oldindex);
            }
        }

        // anything left over in the old frame carries forward unchanged
        while oldnum != i32::MAX {
            let carried = oldstate.clone();
            self.commit(newframe, oldnum, carried)?;
            oldindex += 1;
            (oldnum, oldstate) = self.oldstate_at(oldframe, oldindex);
        }

        self.parse_entities += newframe.num_entities;

        Ok(())
    }

    /// Looks up the frame `delta_frame` refers to, per §4.3 step 2.
    /// `Ok(None)` means "no reference, start from baselines" (a keyframe,
    /// `delta_frame <= 0`). `Err(StaleDeltaBase)` means the referenced frame
    /// either was never stored at that ring slot or its parsed-entity range
    /// has since been overwritten by newer frames.
    fn resolve_reference(&self, delta_frame: i32) -> Result<Option<Frame>, WireError> {
        if delta_frame <= 0 {
            return Ok(None);
        }
        let slot = (delta_frame as usize) & (UPDATE_BACKUP - 1);
        let old = &self.frames[slot];
        if old.serverframe != delta_frame {
            return Err(WireError::StaleDeltaBase);
        }
        if self.parse_entities - old.parse_entities > (MAX_PARSE_ENTITIES as i32 - 128) {
            return Err(WireError::StaleDeltaBase);
        }
        Ok(Some(old.clone()))
    }

    /// Consumes one whole `frame` command from the wire: header, resolved
    /// delta base, `area_bits`, `playerinfo`, then `packetentities` (§4.3).
    /// Stores the assembled frame into the ring and returns it.
    ///
    /// A stale delta base is not fatal: the returned frame has
    /// `valid == false` and its entities are decoded against baselines
    /// (the caller should request a keyframe and skip interpolation this
    /// tick, but the connection stays up).
    pub fn parse_frame(&mut self, msg: &mut MsgBuf, demo_playback: bool) -> Result<Frame, WireError> {
        let serverframe = msg.read_long();
        let delta_frame = msg.read_long();
        let _surpress_count = msg.read_byte();
        if msg.overflowed {
            return Err(WireError::Overflow("frame header"));
        }

        let mut newframe = Frame {
            serverframe,
            delta_frame,
            servertime: serverframe * 100,
            valid: true,
            ..Default::default()
        };

        let reference = match self.resolve_reference(delta_frame) {
            Ok(r) => r,
            Err(WireError::StaleDeltaBase) => {
                newframe.valid = false;
                None
            }
            Err(e) => return Err(e),
        };

        let arealen = msg.read_byte() as usize;
        if arealen > msg.remaining() {
            return Err(WireError::Invalid("area_bits length overruns packet"));
        }
        newframe.areabits = msg.read_data(arealen);

        let old_playerstate = reference.as_ref().map(|f| f.playerstate.clone()).unwrap_or_default();
        let mut playerstate = PlayerState::default();
        decode_playerstate_delta(&old_playerstate, &mut playerstate, msg, demo_playback)?;
        newframe.playerstate = playerstate;

        self.parse_packet_entities(reference.as_ref(), &mut newframe, msg)?;

        if msg.overflowed {
            return Err(WireError::Overflow("frame body"));
        }

        let slot = (serverframe as usize) & (UPDATE_BACKUP - 1);
        self.frames[slot] = newframe.clone();

        Ok(newframe)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::encode_entity_delta;

    fn encode_packetentities(deltas: &[(EntityState, EntityState)]) -> MsgBuf {
        let mut msg = MsgBuf::new();
        for (from, to) in deltas {
            encode_entity_delta(from, to, &mut msg, true, false);
        }
        msg.write_byte(0); // terminator
        msg.begin_reading();
        msg
    }

    #[test]
    fn ring_index_monotonic_across_frames() {
        let mut asm = FrameAssembler::new();
        let e1 = EntityState { number: 1, origin: [10.0, 0.0, 0.0], ..Default::default() };
        let mut msg = encode_packetentities(&[(EntityState::default(), e1.clone())]);
        let mut frame1 = Frame { serverframe: 1, ..Default::default() };
        asm.parse_packet_entities(None, &mut frame1, &mut msg).unwrap();
        assert_eq!(frame1.num_entities, 1);
        assert_eq!(frame1.parse_entities, 0);

        let e1b = EntityState { number: 1, origin: [20.0, 0.0, 0.0], ..Default::default() };
        let mut msg2 = encode_packetentities(&[(e1.clone(), e1b.clone())]);
        let mut frame2 = Frame { serverframe: 2, ..Default::default() };
        asm.parse_packet_entities(Some(&frame1), &mut frame2, &mut msg2).unwrap();

        assert_eq!(frame2.parse_entities, frame1.parse_entities + frame1.num_entities);
        assert_eq!(asm.tracked(1).current.origin, e1b.origin);
        assert_eq!(asm.tracked(1).prev.origin, e1.origin);
    }

    #[test]
    fn teleport_sets_sentinel_serverframe() {
        let mut asm = FrameAssembler::new();
        let e1 = EntityState { number: 1, origin: [0.0, 0.0, 0.0], ..Default::default() };
        let mut msg = encode_packetentities(&[(EntityState::default(), e1.clone())]);
        let mut frame1 = Frame { serverframe: 1, ..Default::default() };
        asm.parse_packet_entities(None, &mut frame1, &mut msg).unwrap();

        let teleported = EntityState { number: 1, origin: [1000.0, 0.0, 0.0], ..Default::default() };
        let mut msg2 = encode_packetentities(&[(e1.clone(), teleported.clone())]);
        let mut frame2 = Frame { serverframe: 2, ..Default::default() };
        asm.parse_packet_entities(Some(&frame1), &mut frame2, &mut msg2).unwrap();

        assert_eq!(asm.tracked(1).serverframe, 2);
        // a subsequent identical frame must see the sentinel from before commit
        let again = EntityState { number: 1, origin: [1000.0, 0.0, 0.0], ..Default::default() };
        let mut msg3 = encode_packetentities(&[(teleported.clone(), again)]);
        let mut frame3 = Frame { serverframe: 3, ..Default::default() };
        asm.parse_packet_entities(Some(&frame2), &mut frame3, &mut msg3).unwrap();
        assert_eq!(asm.tracked(1).prev.origin, teleported.origin);
    }

    #[test]
    fn unchanged_entity_carries_forward_without_wire_bits() {
        let mut asm = FrameAssembler::new();
        let e1 = EntityState { number: 1, origin: [5.0, 0.0, 0.0], ..Default::default() };
        let mut msg = encode_packetentities(&[(EntityState::default(), e1.clone())]);
        let mut frame1 = Frame { serverframe: 1, ..Default::default() };
        asm.parse_packet_entities(None, &mut frame1, &mut msg).unwrap();

        // frame2's wire stream mentions nothing; entity 1 must still carry forward
        let mut msg2 = MsgBuf::new();
        msg2.write_byte(0);
        msg2.begin_reading();
        let mut frame2 = Frame { serverframe: 2, ..Default::default() };
        asm.parse_packet_entities(Some(&frame1), &mut frame2, &mut msg2).unwrap();

        assert_eq!(frame2.num_entities, 1);
        assert_eq!(asm.tracked(1).current.origin, e1.origin);
    }

    #[test]
    fn malformed_entity_number_reports_error_not_panic() {
        let mut asm = FrameAssembler::new();
        let mut msg = MsgBuf::new();
        msg.write_byte(crate::entity::bits::U_NUMBER16 as i32);
        msg.write_short(99999); // far beyond MAX_EDICTS
        msg.begin_reading();
        let mut frame = Frame::default();
        let result = asm.parse_packet_entities(None, &mut frame, &mut msg);
        assert!(result.is_err());
    }

    fn encode_frame(serverframe: i32, delta_frame: i32, deltas: &[(EntityState, EntityState)]) -> MsgBuf {
        let mut msg = MsgBuf::new();
        msg.write_long(serverframe);
        msg.write_long(delta_frame);
        msg.write_byte(0); // surpress_count
        msg.write_byte(0); // area_bits length
        msg.write_short(0); // playerstate flags: no bits set
        msg.write_long(0); // statbits
        for (from, to) in deltas {
            encode_entity_delta(from, to, &mut msg, true, false);
        }
        msg.write_byte(0); // packetentities terminator
        msg.begin_reading();
        msg
    }

    #[test]
    fn scenario_a_baseline_then_delta() {
        let mut asm = FrameAssembler::new();
        let e5 = EntityState { number: 5, origin: [100.0, 0.0, 64.0], modelindex: 1, ..Default::default() };
        let mut msg1 = encode_frame(10, 0, &[(EntityState::default(), e5.clone())]);
        let frame1 = asm.parse_frame(&mut msg1, false).unwrap();
        assert!(frame1.valid);
        assert_eq!(frame1.serverframe, 10);

        let e5_delta = EntityState { number: 5, origin: [108.0, 0.0, 64.0], modelindex: 1, ..Default::default() };
        let mut msg2 = encode_frame(11, 10, &[(e5.clone(), e5_delta.clone())]);
        let frame2 = asm.parse_frame(&mut msg2, false).unwrap();

        assert!(frame2.valid);
        assert_eq!(asm.tracked(5).current.origin, [108.0, 0.0, 64.0]);
        assert_eq!(asm.tracked(5).prev.origin, [100.0, 0.0, 64.0]);
        assert_eq!(asm.tracked(5).current.modelindex, 1);
        assert_eq!(asm.tracked(5).serverframe, 11);
    }

    #[test]
    fn scenario_b_stale_delta_base_marks_frame_invalid() {
        let mut asm = FrameAssembler::new();
        let mut msg1 = encode_frame(1, 0, &[]);
        asm.parse_frame(&mut msg1, false).unwrap();

        // advance the ring past frame 1's slot with enough real frames that
        // the frame-ring slot itself gets overwritten by an unrelated frame
        let mut msg_overwrite = encode_frame(1 + UPDATE_BACKUP as i32, 0, &[]);
        asm.parse_frame(&mut msg_overwrite, false).unwrap();

        // now request a delta against frame 1, whose ring slot no longer holds it
        let mut msg2 = encode_frame(200, 1, &[]);
        let frame2 = asm.parse_frame(&mut msg2, false).unwrap();

        assert!(!frame2.valid);
    }
}
