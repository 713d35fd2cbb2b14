//! `PlayerStateCodec` — the local player's movement state and view (§4.4).

use crate::errors::WireError;
use crate::math::Vec3;
use crate::msg::MsgBuf;

pub const MAX_STATS: usize = 32;

mod flag {
    pub const PS_M_TYPE: u32 = 1 << 0;
    pub const PS_M_ORIGIN: u32 = 1 << 1;
    pub const PS_M_VELOCITY: u32 = 1 << 2;
    pub const PS_M_TIME: u32 = 1 << 3;
    pub const PS_M_FLAGS: u32 = 1 << 4;
    pub const PS_M_GRAVITY: u32 = 1 << 5;
    pub const PS_M_DELTA_ANGLES: u32 = 1 << 6;
    pub const PS_VIEWOFFSET: u32 = 1 << 7;
    pub const PS_VIEWANGLES: u32 = 1 << 8;
    pub const PS_KICKANGLES: u32 = 1 << 9;
    pub const PS_BLEND: u32 = 1 << 10;
    pub const PS_FOV: u32 = 1 << 11;
    pub const PS_WEAPONINDEX: u32 = 1 << 12;
    pub const PS_WEAPONFRAME: u32 = 1 << 13;
    pub const PS_RDFLAGS: u32 = 1 << 14;
}
use flag::*;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PmType {
    Normal = 0,
    Spectator = 1,
    Dead = 2,
    Gib = 3,
    Freeze = 4,
}

impl PmType {
    fn from_wire(b: i32) -> Self {
        match b {
            1 => PmType::Spectator,
            2 => PmType::Dead,
            3 => PmType::Gib,
            4 => PmType::Freeze,
            _ => PmType::Normal,
        }
    }
}

pub const PMF_DUCKED: u8 = 1;
pub const PMF_JUMP_HELD: u8 = 2;
pub const PMF_ON_GROUND: u8 = 4;
pub const PMF_TIME_WATERJUMP: u8 = 8;
pub const PMF_TIME_LAND: u8 = 16;
pub const PMF_TIME_TELEPORT: u8 = 32;
pub const PMF_NO_PREDICTION: u8 = 64;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PmoveState {
    pub pm_type: PmType,
    pub origin: [i16; 3],
    pub velocity: [i16; 3],
    pub pm_flags: u8,
    pub pm_time: u8,
    pub gravity: i16,
    pub delta_angles: [i16; 3],
}

impl Default for PmoveState {
    fn default() -> Self {
        Self {
            pm_type: PmType::Normal,
            origin: [0; 3],
            velocity: [0; 3],
            pm_flags: 0,
            pm_time: 0,
            gravity: 0,
            delta_angles: [0; 3],
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PlayerState {
    pub pmove: PmoveState,
    pub viewangles: Vec3,
    pub viewoffset: Vec3,
    pub kick_angles: Vec3,
    pub gunangles: Vec3,
    pub gunoffset: Vec3,
    pub gunindex: i32,
    pub gunframe: i32,
    pub blend: [f32; 4],
    pub fov: f32,
    pub rdflags: i32,
    pub stats: [i16; MAX_STATS],
}

impl Default for PlayerState {
    fn default() -> Self {
        Self {
            pmove: PmoveState::default(),
            viewangles: [0.0; 3],
            viewoffset: [0.0; 3],
            kick_angles: [0.0; 3],
            gunangles: [0.0; 3],
            gunoffset: [0.0; 3],
            gunindex: 0,
            gunframe: 0,
            blend: [0.0; 4],
            fov: 90.0,
            rdflags: 0,
            stats: [0; MAX_STATS],
        }
    }
}

/// Decodes a player state delta against `from` into `to`. `demo_playback`
/// forces `pm_type` to `Freeze` regardless of what's on the wire, matching
/// how a recorded demo disables local movement.
pub fn decode_playerstate_delta(from: &PlayerState, to: &mut PlayerState, msg: &mut MsgBuf, demo_playback: bool) -> Result<(), WireError> {
    *to = from.clone();

    let flags = msg.read_short() as u32;

    if flags & PS_M_TYPE != 0 {
        to.pmove.pm_type = PmType::from_wire(msg.read_byte());
    }
    if flags & PS_M_ORIGIN != 0 {
        to.pmove.origin = [msg.read_short() as i16, msg.read_short() as i16, msg.read_short() as i16];
    }
    if flags & PS_M_VELOCITY != 0 {
        to.pmove.velocity = [msg.read_short() as i16, msg.read_short() as i16, msg.read_short() as i16];
    }
    if flags & PS_M_TIME != 0 {
        to.pmove.pm_time = msg.read_byte() as u8;
    }
    if flags & PS_M_FLAGS != 0 {
        to.pmove.pm_flags = msg.read_byte() as u8;
    }
    if flags & PS_M_GRAVITY != 0 {
        to.pmove.gravity = msg.read_short() as i16;
    }
    if flags & PS_M_DELTA_ANGLES != 0 {
        to.pmove.delta_angles = [msg.read_short() as i16, msg.read_short() as i16, msg.read_short() as i16];
    }

    if demo_playback {
        to.pmove.pm_type = PmType::Freeze;
    }

    if flags & PS_VIEWOFFSET != 0 {
        to.viewoffset = [msg.read_char() as f32 * 0.25, msg.read_char() as f32 * 0.25, msg.read_char() as f32 * 0.25];
    }
    if flags & PS_VIEWANGLES != 0 {
        to.viewangles = [msg.read_angle16(), msg.read_angle16(), msg.read_angle16()];
    }
    if flags & PS_KICKANGLES != 0 {
        to.kick_angles = [msg.read_char() as f32 * 0.25, msg.read_char() as f32 * 0.25, msg.read_char() as f32 * 0.25];
    }
    if flags & PS_WEAPONINDEX != 0 {
        to.gunindex = msg.read_byte();
    }
    if flags & PS_WEAPONFRAME != 0 {
        to.gunframe = msg.read_byte();
        to.gunoffset = [msg.read_char() as f32 * 0.25, msg.read_char() as f32 * 0.25, msg.read_char() as f32 * 0.25];
        to.gunangles = [msg.read_char() as f32 * 0.25, msg.read_char() as f32 * 0.25, msg.read_char() as f32 * 0.25];
    }
    if flags & PS_BLEND != 0 {
        to.blend = [
            msg.read_byte() as f32 / 255.0,
            msg.read_byte() as f32 / 255.0,
            msg.read_byte() as f32 / 255.0,
            msg.read_byte() as f32 / 255.0,
        ];
    }
    if flags & PS_FOV != 0 {
        to.fov = msg.read_byte() as f32;
    }
    if flags & PS_RDFLAGS != 0 {
        to.rdflags = msg.read_byte();
    }

    let statbits = msg.read_long();
    for (i, stat) in to.stats.iter_mut().enumerate() {
        if statbits & (1 << i) != 0 {
            *stat = msg.read_short() as i16;
        }
    }

    if msg.overflowed {
        return Err(WireError::Overflow("playerstate delta"));
    }

    Ok(())
}

/// Encodes the delta from `from` to `to`, mirroring [`decode_playerstate_delta`]
/// field-for-field so the two stay in lock step.
pub fn encode_playerstate_delta(from: &PlayerState, to: &PlayerState, msg: &mut MsgBuf) {
    let mut flags: u32 = 0;

    if to.pmove.pm_type != from.pmove.pm_type {
        flags |= PS_M_TYPE;
    }
    if to.pmove.origin != from.pmove.origin {
        flags |= PS_M_ORIGIN;
    }
    if to.pmove.velocity != from.pmove.velocity {
        flags |= PS_M_VELOCITY;
    }
    if to.pmove.pm_time != from.pmove.pm_time {
        flags |= PS_M_TIME;
    }
    if to.pmove.pm_flags != from.pmove.pm_flags {
        flags |= PS_M_FLAGS;
    }
    if to.pmove.gravity != from.pmove.gravity {
        flags |= PS_M_GRAVITY;
    }
    if to.pmove.delta_angles != from.pmove.delta_angles {
        flags |= PS_M_DELTA_ANGLES;
    }
    if to.viewoffset != from.viewoffset {
        flags |= PS_VIEWOFFSET;
    }
    if to.viewangles != from.viewangles {
        flags |= PS_VIEWANGLES;
    }
    if to.kick_angles != from.kick_angles {
        flags |= PS_KICKANGLES;
    }
    if to.gunindex != from.gunindex {
        flags |= PS_WEAPONINDEX;
    }
    if to.gunframe != from.gunframe || to.gunoffset != from.gunoffset || to.gunangles != from.gunangles {
        flags |= PS_WEAPONFRAME;
    }
    if to.blend != from.blend {
        flags |= PS_BLEND;
    }
    if to.fov != from.fov {
        flags |= PS_FOV;
    }
    if to.rdflags != from.rdflags {
        flags |= PS_RDFLAGS;
    }

    msg.write_short(flags as i32);

    if flags & PS_M_TYPE != 0 {
        msg.write_byte(to.pmove.pm_type as i32);
    }
    if flags & PS_M_ORIGIN != 0 {
        for v in to.pmove.origin {
            msg.write_short(v as i32);
        }
    }
    if flags & PS_M_VELOCITY != 0 {
        for v in to.pmove.velocity {
            msg.write_short(v as i32);
        }
    }
    if flags & PS_M_TIME != 0 {
        msg.write_byte(to.pmove.pm_time as i32);
    }
    if flags & PS_M_FLAGS != 0 {
        msg.write_byte(to.pmove.pm_flags as i32);
    }
    if flags & PS_M_GRAVITY != 0 {
        msg.write_short(to.pmove.gravity as i32);
    }
    if flags & PS_M_DELTA_ANGLES != 0 {
        for v in to.pmove.delta_angles {
            msg.write_short(v as i32);
        }
    }
    if flags & PS_VIEWOFFSET != 0 {
        for v in to.viewoffset {
            msg.write_char((v * 4.0) as i32);
        }
    }
    if flags & PS_VIEWANGLES != 0 {
        for v in to.viewangles {
            msg.write_angle16(v);
        }
    }
    if flags & PS_KICKANGLES != 0 {
        for v in to.kick_angles {
            msg.write_char((v * 4.0) as i32);
        }
    }
    if flags & PS_WEAPONINDEX != 0 {
        msg.write_byte(to.gunindex);
    }
    if flags & PS_WEAPONFRAME != 0 {
        msg.write_byte(to.gunframe);
        for v in to.gunoffset {
            msg.write_char((v * 4.0) as i32);
        }
        for v in to.gunangles {
            msg.write_char((v * 4.0) as i32);
        }
    }
    if flags & PS_BLEND != 0 {
        for v in to.blend {
            msg.write_byte((v * 255.0) as i32);
        }
    }
    if flags & PS_FOV != 0 {
        msg.write_byte(to.fov as i32);
    }
    if flags & PS_RDFLAGS != 0 {
        msg.write_byte(to.rdflags);
    }

    let mut statbits: u32 = 0;
    for i in 0..MAX_STATS {
        if to.stats[i] != from.stats[i] {
            statbits |= 1 << i;
        }
    }
    msg.write_long(statbits as i32);
    for i in 0..MAX_STATS {
        if statbits & (1 << i) != 0 {
            msg.write_short(to.stats[i] as i32);
        }
    }
}

pub const BUTTON_ATTACK: u8 = 1;
pub const BUTTON_USE: u8 = 2;
pub const BUTTON_ANY: u8 = 128;

/// One tick of client input, as queued by the predictor and sent to the
/// server (§4.6).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UserCmd {
    pub msec: u8,
    pub buttons: u8,
    pub angles: [i16; 3],
    pub forwardmove: i16,
    pub sidemove: i16,
    pub upmove: i16,
    pub impulse: u8,
    pub lightlevel: u8,
}

/// Encodes `to` as a delta against `from` (§4.6's wire-level usercmd delta,
/// used both for the outgoing move queue and for re-reading demo data).
pub fn write_delta_usercmd(msg: &mut MsgBuf, from: &UserCmd, to: &UserCmd) {
    let mut bits = 0u8;
    if to.angles[0] != from.angles[0] {
        bits |= 1;
    }
    if to.angles[1] != from.angles[1] {
        bits |= 2;
    }
    if to.angles[2] != from.angles[2] {
        bits |= 4;
    }
    if to.forwardmove != from.forwardmove {
        bits |= 8;
    }
    if to.sidemove != from.sidemove {
        bits |= 16;
    }
    if to.upmove != from.upmove {
        bits |= 32;
    }
    if to.buttons != from.buttons {
        bits |= 64;
    }
    if to.impulse != from.impulse {
        bits |= 128;
    }

    msg.write_byte(bits as i32);

    if bits & 1 != 0 {
        msg.write_short(to.angles[0] as i32);
    }
    if bits & 2 != 0 {
        msg.write_short(to.angles[1] as i32);
    }
    if bits & 4 != 0 {
        msg.write_short(to.angles[2] as i32);
    }
    if bits & 8 != 0 {
        msg.write_short(to.forwardmove as i32);
    }
    if bits & 16 != 0 {
        msg.write_short(to.sidemove as i32);
    }
    if bits & 32 != 0 {
        msg.write_short(to.upmove as i32);
    }
    if bits & 64 != 0 {
        msg.write_byte(to.buttons as i32);
    }
    if bits & 128 != 0 {
        msg.write_byte(to.impulse as i32);
    }

    msg.write_byte(to.msec as i32);
    msg.write_byte(to.lightlevel as i32);
}

pub fn read_delta_usercmd(msg: &mut MsgBuf, from: &UserCmd) -> UserCmd {
    let mut to = *from;
    let bits = msg.read_byte() as u8;

    if bits & 1 != 0 {
        to.angles[0] = msg.read_short() as i16;
    }
    if bits & 2 != 0 {
        to.angles[1] = msg.read_short() as i16;
    }
    if bits & 4 != 0 {
        to.angles[2] = msg.read_short() as i16;
    }
    if bits & 8 != 0 {
        to.forwardmove = msg.read_short() as i16;
    }
    if bits & 16 != 0 {
        to.sidemove = msg.read_short() as i16;
    }
    if bits & 32 != 0 {
        to.upmove = msg.read_short() as i16;
    }
    if bits & 64 != 0 {
        to.buttons = msg.read_byte() as u8;
    }
    if bits & 128 != 0 {
        to.impulse = msg.read_byte() as u8;
    }

    to.msec = msg.read_byte() as u8;
    to.lightlevel = msg.read_byte() as u8;

    to
}

/// A 256-pmove-unit (32 world unit) jump between two pmove origins is a
/// teleport, not movement to interpolate across (§4.5).
pub fn is_teleport(from: &PmoveState, to: &PmoveState) -> bool {
    (0..3).any(|i| (from.origin[i] as i32 - to.origin[i] as i32).unsigned_abs() > 256 * 8)
}

/// Blends the view offset between two player states for the in-between
/// render frame (§4.5).
pub fn lerp_view_offset(from: &PlayerState, to: &PlayerState, frac: f32) -> Vec3 {
    let mut out = [0.0f32; 3];
    for i in 0..3 {
        out[i] = from.viewoffset[i] + frac * (to.viewoffset[i] - from.viewoffset[i]);
    }
    out
}

/// Blends view angles between two player states, taking the shortest way
/// around the circle per axis (§4.5).
pub fn lerp_view_angles(from: &PlayerState, to: &PlayerState, frac: f32) -> Vec3 {
    let mut out = [0.0f32; 3];
    for i in 0..3 {
        out[i] = crate::math::lerp_angle(from.viewangles[i], to.viewangles[i], frac);
    }
    out
}

/// World-unit delta between a reported pmove origin and a previously
/// predicted one, used to size a prediction miss (§4.6). Callers compare
/// the 16.16-fixed result against a teleport threshold before applying it.
pub fn prediction_delta(reported: &PmoveState, predicted_origin: [i16; 3]) -> [i32; 3] {
    let mut delta = [0i32; 3];
    for i in 0..3 {
        delta[i] = reported.origin[i] as i32 - predicted_origin[i] as i32;
    }
    delta
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn roundtrip_playerstate_delta() {
        let from = PlayerState::default();
        let mut to = PlayerState { fov: 100.0, ..PlayerState::default() };
        to.pmove.origin = [800, 0, 256];
        to.stats[3] = 42;

        let mut msg = MsgBuf::new();
        encode_playerstate_delta(&from, &to, &mut msg);
        msg.begin_reading();
        let mut decoded = PlayerState::default();
        decode_playerstate_delta(&from, &mut decoded, &mut msg, false).unwrap();

        assert_eq!(decoded, to);
    }

    #[test]
    fn demo_playback_forces_freeze() {
        let from = PlayerState::default();
        let to = PlayerState { pmove: PmoveState { pm_type: PmType::Normal, ..Default::default() }, ..PlayerState::default() };
        let mut msg = MsgBuf::new();
        encode_playerstate_delta(&from, &to, &mut msg);
        msg.begin_reading();
        let mut decoded = PlayerState::default();
        decode_playerstate_delta(&from, &mut decoded, &mut msg, true).unwrap();
        assert_eq!(decoded.pmove.pm_type, PmType::Freeze);
    }

    #[test]
    fn roundtrip_usercmd_delta() {
        let from = UserCmd::default();
        let to = UserCmd { msec: 16, buttons: BUTTON_ATTACK, angles: [100, -200, 0], forwardmove: 400, ..Default::default() };
        let mut msg = MsgBuf::new();
        write_delta_usercmd(&mut msg, &from, &to);
        msg.begin_reading();
        let decoded = read_delta_usercmd(&mut msg, &from);
        assert_eq!(decoded, to);
    }

    #[test]
    fn unset_fields_inherit_from_base() {
        let from = PlayerState { fov: 75.0, ..PlayerState::default() };
        let to = from.clone();
        let mut msg = MsgBuf::new();
        encode_playerstate_delta(&from, &to, &mut msg);
        msg.begin_reading();
        let mut decoded = PlayerState::default();
        decode_playerstate_delta(&from, &mut decoded, &mut msg, false).unwrap();
        assert_eq!(decoded.fov, 75.0);
    }

    #[test]
    fn is_teleport_detects_large_origin_jump() {
        let from = PmoveState { origin: [0, 0, 0], ..Default::default() };
        let to = PmoveState { origin: [300 * 8, 0, 0], ..Default::default() };
        assert!(is_teleport(&from, &to));
    }

    #[test]
    fn is_teleport_false_for_ordinary_movement() {
        let from = PmoveState { origin: [0, 0, 0], ..Default::default() };
        let to = PmoveState { origin: [100, 0, 0], ..Default::default() };
        assert!(!is_teleport(&from, &to));
    }

    #[test]
    fn lerp_view_offset_and_angles_halfway() {
        let from = PlayerState { viewoffset: [0.0, 0.0, 20.0], viewangles: [0.0, 0.0, 0.0], ..Default::default() };
        let to = PlayerState { viewoffset: [0.0, 0.0, 24.0], viewangles: [0.0, 90.0, 0.0], ..Default::default() };
        assert_eq!(lerp_view_offset(&from, &to, 0.5), [0.0, 0.0, 22.0]);
        assert_eq!(lerp_view_angles(&from, &to, 0.5), [0.0, 45.0, 0.0]);
    }

    #[test]
    fn prediction_delta_is_reported_minus_predicted() {
        let reported = PmoveState { origin: [100, 50, -20], ..Default::default() };
        assert_eq!(prediction_delta(&reported, [90, 50, -20]), [10, 0, 0]);
    }
}
