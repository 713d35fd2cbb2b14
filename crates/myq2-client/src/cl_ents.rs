// cl_ents.rs -- entity parsing and management
// Converted from: myq2-original/client/cl_ents.c
//
// Copyright (C) 1997-2001 Id Software, Inc.
// Licensed under the GNU General Public License v2 or later.

use crate::client::*;
use myq2_common::q_shared::*;
use rayon::prelude::*;
use std::sync::{LazyLock, Mutex};
use myq2_common::qcommon::{SizeBuf, UPDATE_BACKUP, MAX_PROJECTILES};
use myq2_common::common::{com_printf, com_dprintf, msg_read_byte};
use myq2_common::msg::MsgBuf;

// =========================================================================
// Global state
// =========================================================================

// The actual cl_entities and cl_parse_entities arrays live in the client
// module's global state. They are passed in by reference to the functions
// below via the ClientEntState parameter.

/// Mutable entity state passed into functions that need the global arrays.
pub struct ClientEntState {
    pub cl_entities: Vec<CEntity>,
    pub cl_parse_entities: Vec<EntityState>,
}

impl Default for ClientEntState {
    fn default() -> Self {
        Self::new()
    }
}

impl ClientEntState {
    pub fn new() -> Self {
        // Parallel initialization of entity arrays - beneficial for MAX_EDICTS (1024) entities
        let cl_entities: Vec<CEntity> = (0..MAX_EDICTS)
            .into_par_iter()
            .map(|_| CEntity::default())
            .collect();
        let cl_parse_entities: Vec<EntityState> = (0..MAX_PARSE_ENTITIES)
            .into_par_iter()
            .map(|_| EntityState::default())
            .collect();
        Self {
            cl_entities,
            cl_parse_entities,
        }
    }
}

// =========================================================================
// Callback trait — functions defined in other modules that this module calls
// =========================================================================

pub trait ClientCallbacks {
    fn cl_entity_event(&mut self, ent: &EntityState);
    fn cl_teleporter_particles(&mut self, ent: &EntityState);
    fn add_stain(&mut self, org: &Vec3, intensity: f32, r: f32, g: f32, b: f32, a: f32, stain_type: StainType);
    fn shownet(&self, s: &str);
    fn scr_end_loading_plaque(&mut self, clear: bool);
    fn cl_check_prediction_error(&mut self);
    fn v_add_entity(&mut self, ent: &Entity);
    fn v_add_light(&mut self, org: &Vec3, intensity: f32, r: f32, g: f32, b: f32);
    fn r_register_model(&self, name: &str) -> i32;
    fn r_register_skin(&self, name: &str) -> i32;
    fn get_skin_name(&self, skin: i32) -> Option<String>;
    fn developer_searchpath(&self, who: i32) -> i32;
    fn cl_rocket_trail(&mut self, start: &Vec3, end: &Vec3, old: &mut CEntity);
    fn cl_blaster_trail(&mut self, start: &Vec3, end: &Vec3);
    fn cl_blaster_trail2(&mut self, start: &Vec3, end: &Vec3);
    fn cl_diminishing_trail(&mut self, start: &Vec3, end: &Vec3, old: &mut CEntity, flags: u32);
    fn cl_fly_effect(&mut self, ent: &mut CEntity, origin: &Vec3);
    fn cl_bfg_particles(&mut self, ent: &Entity);
    fn cl_trap_particles(&mut self, ent: &Entity);
    fn cl_flag_trail(&mut self, start: &Vec3, end: &Vec3, color: f32);
    fn cl_tag_trail(&mut self, start: &Vec3, end: &Vec3, color: f32);
    fn cl_tracker_trail(&mut self, start: &Vec3, end: &Vec3, particle_color: i32);
    fn cl_tracker_shell(&mut self, origin: &Vec3);
    fn cl_ionripper_trail(&mut self, start: &Vec3, end: &Vec3);
    fn cl_add_tents(&mut self);
    fn cl_add_particles(&mut self);
    fn cl_add_dlights(&mut self);
    fn cl_add_light_styles(&mut self);
    /// Play a predicted footstep sound at the given position
    fn cl_play_footstep(&mut self, origin: &Vec3, entity_num: i32);
}

// =========================================================================
// FRAME PARSING
// =========================================================================

/// Shared per-connection frame/entity-delta decoder. Keeps the baseline
/// table and the parsed-entity ring that `cl_parse_baseline` and
/// `cl_parse_frame` both need to stay consistent across packets.
static FRAME_ASSEMBLER: LazyLock<Mutex<myq2_common::frame::FrameAssembler>> =
    LazyLock::new(|| Mutex::new(myq2_common::frame::FrameAssembler::new()));

/// Builds a `MsgBuf` over the unread tail of `net_message` so it can be
/// handed to the wire decoders in `myq2_common`, which own their own
/// cursor rather than sharing the old `SizeBuf`'s.
fn msgbuf_from_remaining(net_message: &SizeBuf) -> MsgBuf {
    let start = net_message.readcount as usize;
    let end = net_message.cursize as usize;
    MsgBuf::from_bytes(net_message.data[start..end].to_vec())
}

/// Advances `net_message` past whatever `msg` consumed.
fn advance_past(net_message: &mut SizeBuf, msg: &MsgBuf) {
    net_message.readcount += msg.readcount as i32;
}

fn bridge_pmove_state(src: &myq2_common::player::PmoveState) -> PmoveState {
    PmoveState {
        pm_type: match src.pm_type {
            myq2_common::player::PmType::Normal => PmType::Normal,
            myq2_common::player::PmType::Spectator => PmType::Spectator,
            myq2_common::player::PmType::Dead => PmType::Dead,
            myq2_common::player::PmType::Gib => PmType::Gib,
            myq2_common::player::PmType::Freeze => PmType::Freeze,
        },
        origin: src.origin,
        velocity: src.velocity,
        pm_flags: src.pm_flags,
        pm_time: src.pm_time,
        gravity: src.gravity,
        delta_angles: src.delta_angles,
    }
}

fn bridge_player_state(src: &myq2_common::player::PlayerState) -> PlayerState {
    PlayerState {
        pmove: bridge_pmove_state(&src.pmove),
        viewangles: src.viewangles,
        viewoffset: src.viewoffset,
        kick_angles: src.kick_angles,
        gunangles: src.gunangles,
        gunoffset: src.gunoffset,
        gunindex: src.gunindex,
        gunframe: src.gunframe,
        blend: src.blend,
        fov: src.fov,
        rdflags: src.rdflags,
        stats: src.stats,
    }
}

fn bridge_entity_state(src: &myq2_common::entity::EntityState) -> EntityState {
    EntityState {
        number: src.number,
        origin: src.origin,
        angles: src.angles,
        old_origin: src.old_origin,
        modelindex: src.modelindex,
        modelindex2: src.modelindex2,
        modelindex3: src.modelindex3,
        modelindex4: src.modelindex4,
        frame: src.frame,
        skinnum: src.skinnum,
        effects: src.effects,
        renderfx: src.renderfx,
        solid: src.solid,
        sound: src.sound,
        event: src.event,
    }
}

fn unbridge_pmove_state(src: &PmoveState) -> myq2_common::player::PmoveState {
    myq2_common::player::PmoveState {
        pm_type: match src.pm_type {
            PmType::Normal => myq2_common::player::PmType::Normal,
            PmType::Spectator => myq2_common::player::PmType::Spectator,
            PmType::Dead => myq2_common::player::PmType::Dead,
            PmType::Gib => myq2_common::player::PmType::Gib,
            PmType::Freeze => myq2_common::player::PmType::Freeze,
        },
        origin: src.origin,
        velocity: src.velocity,
        pm_flags: src.pm_flags,
        pm_time: src.pm_time,
        gravity: src.gravity,
        delta_angles: src.delta_angles,
    }
}

fn unbridge_player_state(src: &PlayerState) -> myq2_common::player::PlayerState {
    myq2_common::player::PlayerState {
        pmove: unbridge_pmove_state(&src.pmove),
        viewangles: src.viewangles,
        viewoffset: src.viewoffset,
        kick_angles: src.kick_angles,
        gunangles: src.gunangles,
        gunoffset: src.gunoffset,
        gunindex: src.gunindex,
        gunframe: src.gunframe,
        blend: src.blend,
        fov: src.fov,
        rdflags: src.rdflags,
        stats: src.stats,
    }
}

fn unbridge_entity_state(src: &EntityState) -> myq2_common::entity::EntityState {
    myq2_common::entity::EntityState {
        number: src.number,
        origin: src.origin,
        angles: src.angles,
        old_origin: src.old_origin,
        modelindex: src.modelindex,
        modelindex2: src.modelindex2,
        modelindex3: src.modelindex3,
        modelindex4: src.modelindex4,
        frame: src.frame,
        skinnum: src.skinnum,
        effects: src.effects,
        renderfx: src.renderfx,
        solid: src.solid,
        sound: src.sound,
        event: src.event,
    }
}

/// Records a baseline entity's decoded state into the frame assembler so
/// later `packetentities` deltas that reference it by number resolve
/// correctly. Called by `cl_parse_baseline` once it has decoded the old
/// (bridged) state.
pub fn cl_set_baseline(number: usize, state: &EntityState) {
    FRAME_ASSEMBLER.lock().unwrap().set_baseline(number, unbridge_entity_state(state));
}

/// Decodes one baseline entity delta off the wire through the shared
/// entity codec, returning the entity number and its decoded state.
pub fn cl_parse_baseline_entity(net_message: &mut SizeBuf) -> (i32, EntityState) {
    let mut msg = msgbuf_from_remaining(net_message);
    let (number, bits) = myq2_common::entity::read_entity_bits(&mut msg)
        .unwrap_or((0, 0));
    let from = myq2_common::entity::EntityState::default();
    let mut to = myq2_common::entity::EntityState::default();
    let _ = myq2_common::entity::decode_entity_delta(&from, &mut to, number, bits, &mut msg);
    advance_past(net_message, &msg);
    (number, bridge_entity_state(&to))
}

/// Applies one newly-resolved entity state to `ent_state.cl_entities`,
/// updating interpolation bookkeeping the same way the wire decoder used
/// to while it walked `packetentities` itself. `state` already comes out
/// of the frame assembler fully resolved; this only carries forward the
/// teacher's smoothing/trail/velocity side state that the assembler
/// doesn't track.
fn cl_apply_entity_state(
    cl: &mut ClientState,
    ent_state: &mut ClientEntState,
    state: EntityState,
) {
    let newnum = state.number as usize;
    let ent = &mut ent_state.cl_entities[newnum];

    // some data changes will force no lerping
    if state.modelindex != ent.current.modelindex
        || state.modelindex2 != ent.current.modelindex2
        || state.modelindex3 != ent.current.modelindex3
        || state.modelindex4 != ent.current.modelindex4
        || (state.origin[0] - ent.current.origin[0]).abs() > 512.0
        || (state.origin[1] - ent.current.origin[1]).abs() > 512.0
        || (state.origin[2] - ent.current.origin[2]).abs() > 512.0
        || state.event == EV_PLAYER_TELEPORT
        || state.event == EV_OTHER_TELEPORT
    {
        ent.serverframe = -99;
    }

    if ent.serverframe != cl.frame.serverframe - 1 {
        // wasn't in last update, so initialize some things
        ent.trailcount = 1024; // for diminishing rocket / grenade trails
        // duplicate the current state so lerping doesn't hurt anything
        ent.prev = state.clone();
        if state.event == EV_OTHER_TELEPORT || state.event == EV_PLAYER_TELEPORT {
            ent.prev.origin = vector_copy(&state.origin);
            ent.lerp_origin = vector_copy(&state.origin);
            // Teleporting entities appear instantly (no fade-in)
            ent.spawn_time = 0;
        } else {
            ent.prev.origin = vector_copy(&state.old_origin);
            ent.lerp_origin = vector_copy(&state.old_origin);
            // Set spawn time for fade-in effect on newly appearing entities
            ent.spawn_time = cl.frame.servertime;
        }
        // Reset velocity tracking on gap
        ent.velocity.valid = false;
        ent.velocity.angular_valid = false;
        ent.missed_frames = 0;
    } else {
        // shuffle the last state to previous
        ent.prev = ent.current.clone();

        // === Velocity tracking for extrapolation ===
        // Calculate velocity from position delta between frames.
        // Use actual time delta when available, otherwise fall back to
        // SERVER_FRAMETIME_SEC (100ms = 0.1s, the standard Q2 server tick rate).
        let actual_delta_ms = cl.frame.servertime - ent.velocity.prev_time;
        let frame_time = if actual_delta_ms > 0 && actual_delta_ms <= SERVER_FRAMETIME_MS * 3 {
            // Use actual measured delta (convert ms to seconds)
            actual_delta_ms as f32 / 1000.0
        } else {
            // Fall back to standard server frame time
            SERVER_FRAMETIME_SEC
        };
        for i in 0..3 {
            ent.velocity.velocity[i] = (state.origin[i] - ent.prev.origin[i]) / frame_time;
        }
        ent.velocity.prev_origin = ent.prev.origin;
        ent.velocity.prev_time = cl.frame.servertime - SERVER_FRAMETIME_MS;
        ent.velocity.last_update_time = cl.frame.servertime;
        ent.velocity.valid = true;

        // === Calculate angular velocity for rotation extrapolation ===
        // This allows smooth rotation continuation during packet loss
        for i in 0..3 {
            // Calculate angle delta with proper wrapping (-180 to 180)
            let mut angle_delta = state.angles[i] - ent.prev.angles[i];
            // Normalize to -180..180 range
            while angle_delta > 180.0 { angle_delta -= 360.0; }
            while angle_delta < -180.0 { angle_delta += 360.0; }
            ent.velocity.angular_velocity[i] = angle_delta / frame_time;
        }
        ent.velocity.prev_angles = ent.prev.angles;
        ent.velocity.angular_valid = true;

        // Reset missed frames counter on successful update
        ent.missed_frames = 0;

        // === Update smoothing state for enhanced interpolation ===
        // Add to spline history for Catmull-Rom interpolation
        if cl.smoothing.cubic_interp_enabled && newnum < cl.smoothing.spline_histories.len() {
            cl.smoothing.spline_histories[newnum].add(cl.frame.servertime, state.origin);
        }

        // Update dead reckoning state for player entities (modelindex 255 = player model)
        if state.modelindex == 255 && newnum < cl.smoothing.dead_reckoning.len() {
            cl.smoothing.dead_reckoning[newnum].update(state.origin, cl.frame.servertime);
        }

        // === Update mover/platform velocity tracking ===
        // Track brush entity velocities for platform prediction
        cl.smoothing.mover_prediction.update_entity(
            newnum,
            &state.origin,
            cl.frame.servertime,
            state.solid,
        );
    }

    // Update animation state tracking
    if state.frame != ent.current.frame {
        ent.anim_state.oldframe = ent.current.frame;
        ent.anim_state.frame = state.frame;
        // Calculate actual frame duration from time since last animation change.
        // This adapts to different animation rates (10fps, 20fps, etc.).
        let time_since_last_change = cl.frame.servertime - ent.last_update_time;
        ent.anim_state.frame_duration = if time_since_last_change > 0 && time_since_last_change <= SERVER_FRAMETIME_MS * 5 {
            // Use actual measured duration
            time_since_last_change as f32
        } else {
            // Fall back to standard server frame time (100ms)
            SERVER_FRAMETIME_MS as f32
        };
        ent.anim_state.frame_time = 0.0;
        ent.anim_state.animating = true;

        // Add frame sample to history for spline interpolation
        ent.anim_state.add_frame_sample(state.frame, cl.frame.servertime);
    }
    ent.anim_state.last_server_frame = cl.frame.serverframe;
    ent.last_update_time = cl.frame.servertime;

    ent.serverframe = cl.frame.serverframe;

    // Store effects for persistence during packet loss
    // Only store non-zero effects (when player has a powerup/shell)
    if state.effects != 0 {
        ent.last_effects = state.effects as i32;
    }
    if state.renderfx != 0 {
        ent.last_renderfx = state.renderfx as i32;
    }

    ent.current = state;
}

/// CL_FireEntityEvents
pub fn cl_fire_entity_events(
    frame: &Frame,
    ent_state: &ClientEntState,
    callbacks: &mut dyn ClientCallbacks,
) {
    for pnum in 0..frame.num_entities {
        let num = ((frame.parse_entities + pnum) & (MAX_PARSE_ENTITIES as i32 - 1)) as usize;
        let s1 = &ent_state.cl_parse_entities[num];

        if s1.event != 0 {
            callbacks.cl_entity_event(s1);
        }

        // add stains if moving...
        if s1.origin[0] != s1.old_origin[0]
            || s1.origin[1] != s1.old_origin[1]
            || s1.origin[2] != s1.old_origin[2]
        {
            let num_val = 20 + (rand::random::<i32>().unsigned_abs() as i32 % 75);
            if s1.effects & EF_GIB != 0 {
                callbacks.add_stain(
                    &s1.origin,
                    (20 + (num_val / 10)) as f32,
                    (num_val / 2) as f32,
                    0.0,
                    0.0,
                    (num_val * 2) as f32,
                    StainType::Modulate,
                );
            }
            if s1.effects & EF_GREENGIB != 0 {
                callbacks.add_stain(
                    &s1.origin,
                    (20 + (num_val / 10)) as f32,
                    0.0,
                    (num_val / 2) as f32,
                    0.0,
                    (num_val * 2) as f32,
                    StainType::Modulate,
                );
            }
        }

        // EF_TELEPORTER acts like an event, but is not cleared each frame
        if s1.effects & EF_TELEPORTER != 0 {
            callbacks.cl_teleporter_particles(s1);
        }
    }
}

/// CL_ParseFrame — reads one whole `frame` command off the wire through
/// the shared `MsgBuf`/`FrameAssembler` codec (header, delta resolution,
/// areabits, playerstate delta, packetentities all happen inside
/// `parse_frame`), then bridges the result into the old per-connection
/// state the rendering/prediction code still reads.
pub fn cl_parse_frame(
    cl: &mut ClientState,
    cls: &mut ClientStatic,
    ent_state: &mut ClientEntState,
    net_message: &mut SizeBuf,
    cl_shownet_value: f32,
    _svc_strings: &[&str; 256],
    callbacks: &mut dyn ClientCallbacks,
) {
    let mut msg = msgbuf_from_remaining(net_message);
    let result = FRAME_ASSEMBLER.lock().unwrap().parse_frame(&mut msg, cl.attractloop);
    advance_past(net_message, &msg);

    let new_frame = match result {
        Ok(f) => f,
        Err(e) => {
            com_printf(&format!("CL_ParseFrame: {}\n", e));
            cl.packet_loss_frames += 1;
            cl.smoothing.network_stats.packets_lost += 1;
            return;
        }
    };

    if cl_shownet_value == 3.0 {
        com_dprintf(&format!(
            "   frame:{}  delta:{}\n",
            new_frame.serverframe, new_frame.delta_frame
        ));
    }

    cl.frame = Frame::default();
    cl.frame.valid = new_frame.valid;
    cl.frame.serverframe = new_frame.serverframe;
    cl.frame.servertime = new_frame.servertime;
    cl.frame.deltaframe = new_frame.delta_frame;
    cl.frame.num_entities = new_frame.num_entities;
    cl.frame.parse_entities = new_frame.parse_entities;
    cl.frame.playerstate = bridge_player_state(&new_frame.playerstate);
    for (i, b) in new_frame.areabits.iter().enumerate().take(cl.frame.areabits.len()) {
        cl.frame.areabits[i] = *b;
    }

    if new_frame.deltaframe <= 0 {
        cls.demo_waiting = false; // we can start recording now
    }

    // Clamp client time to be within one server frame of the last received frame.
    // This prevents interpolation from going too far ahead (future) or too far
    // behind (past) the server's reported time. The window is SERVER_FRAMETIME_MS
    // because that's the expected time between server updates at 10Hz.
    if cl.time > cl.frame.servertime {
        cl.time = cl.frame.servertime;
    } else if cl.time < cl.frame.servertime - SERVER_FRAMETIME_MS {
        cl.time = cl.frame.servertime - SERVER_FRAMETIME_MS;
    }

    // bridge the resolved entity set into the old ring, driving the same
    // interpolation side-effects the hand-rolled merge used to compute
    {
        let assembler = FRAME_ASSEMBLER.lock().unwrap();
        for pnum in 0..new_frame.num_entities {
            let resolved = assembler.entity_at(&new_frame, pnum);
            let bridged = bridge_entity_state(&resolved);
            let slot = ((new_frame.parse_entities + pnum) as usize) & (MAX_PARSE_ENTITIES - 1);
            ent_state.cl_parse_entities[slot] = bridged.clone();
            cl.parse_entities += 1;
            cl_apply_entity_state(cl, ent_state, bridged);
        }
    }

    // save the frame off in the backup array for later delta comparisons
    let idx = (cl.frame.serverframe as usize) & (UPDATE_BACKUP as usize - 1);
    cl.frames[idx] = cl.frame.clone();

    if cl.frame.valid {
        // getting a valid frame message ends the connection process
        if cls.state != ConnState::Active {
            cls.state = ConnState::Active;
            cl.force_refdef = true;
            // Notify auto-reconnect system of successful connection
            crate::cl_main::cl_auto_reconnect_success();
            cl.predicted_origin[0] = cl.frame.playerstate.pmove.origin[0] as f32 * 0.125;
            cl.predicted_origin[1] = cl.frame.playerstate.pmove.origin[1] as f32 * 0.125;
            cl.predicted_origin[2] = cl.frame.playerstate.pmove.origin[2] as f32 * 0.125;
            cl.predicted_angles = vector_copy(&cl.frame.playerstate.viewangles);
            if cls.disable_servercount != cl.servercount && cl.refresh_prepped {
                callbacks.scr_end_loading_plaque(true);
            }
        }
        cl.sound_prepped = true; // can start mixing ambient sounds

        // === Calculate and record ping from server frame acknowledgment ===
        // The server frame number corresponds to the command it processed
        // Find when that command was sent and calculate round-trip time
        let cmd_idx = (cl.frame.serverframe as usize) & (crate::client::CMD_BACKUP - 1);
        let cmd_time = cl.cmd_time[cmd_idx];
        if cmd_time > 0 {
            let ping = cls.realtime - cmd_time;
            if ping > 0 && ping < 1000 {
                cl.smoothing.network_stats.record_ping(ping, cls.realtime);
            }
        }

        // Update valid frame tracking for packet loss detection
        cl.last_valid_frame_time = cls.realtime;
        cl.packet_loss_frames = 0;

        // === Add snapshot to buffer for improved interpolation ===
        cl.smoothing.snapshot_buffer.add_snapshot(
            cl.frame.servertime,
            cl.frame.serverframe,
            cls.realtime,
        );

        // === Track packet loss by sequence gaps ===
        // If deltaframe is valid, check for gaps
        if cl.frame.deltaframe > 0 {
            let expected_frame = cl.frame.deltaframe + 1;
            if cl.frame.serverframe > expected_frame {
                // We missed some frames
                let missed = cl.frame.serverframe - expected_frame;
                cl.smoothing.network_stats.record_loss(expected_frame, cl.frame.serverframe);

                // Track this for stats display
                if missed > 0 {
                    cl.smoothing.network_stats.packets_lost += missed as u64;
                }
            }
        }

        // fire entity events
        cl_fire_entity_events(&cl.frame, ent_state, callbacks);
        callbacks.cl_check_prediction_error();
    } else {
        // Invalid frame - increment packet loss counter
        cl.packet_loss_frames += 1;

        // Also track in network stats
        cl.smoothing.network_stats.packets_lost += 1;
    }
}

// =========================================================================
// INTERPOLATE BETWEEN FRAMES TO GET RENDERING PARMS
// =========================================================================

/// S_RegisterSexedModel — determine the correct player model path for
/// gendered model/skin combinations.
pub fn s_register_sexed_model(
    ent: &EntityState,
    base: &str,
    configstrings: &[String],
    callbacks: &dyn ClientCallbacks,
) -> i32 {
    // determine what model the client is using
    let mut model = String::new();
    let n = CS_PLAYERSKINS + (ent.number as usize) - 1;
    if n < configstrings.len() && !configstrings[n].is_empty() {
        if let Some(pos) = configstrings[n].find('\\') {
            let after = &configstrings[n][pos + 1..];
            if let Some(slash) = after.find('/') {
                model = after[..slash].to_string();
            } else {
                model = after.to_string();
            }
        }
    }

    // if we can't figure it out, they're male
    if model.is_empty() {
        model = "male".to_string();
    }

    let buffer = format!("players/{}/{}", model, &base[1..]);
    let mut mdl = callbacks.r_register_model(&buffer);

    if mdl == 0 {
        // not found, try default weapon model
        let buffer2 = format!("players/{}/weapon.md2", model);
        mdl = callbacks.r_register_model(&buffer2);
        if mdl == 0 {
            // no, revert to the male model
            let buffer3 = format!("players/{}/{}", "male", &base[1..]);
            mdl = callbacks.r_register_model(&buffer3);
            if mdl == 0 {
                // last try, default male weapon.md2
                mdl = callbacks.r_register_model("players/male/weapon.md2");
            }
        }
    }

    mdl
}

/// CL_AddPacketEntities
pub fn cl_add_packet_entities(
    frame: &Frame,
    cl: &mut ClientState,
    ent_state: &mut ClientEntState,
    callbacks: &mut dyn ClientCallbacks,
) {
    // bonus items rotate at a fixed rate
    let autorotate = anglemod(cl.time as f32 / 10.0);

    // brush models can auto animate their frames
    let autoanim = 2 * cl.time / 1000;

    for pnum in 0..frame.num_entities {
        let s1 = &ent_state.cl_parse_entities
            [((frame.parse_entities + pnum) & (MAX_PARSE_ENTITIES as i32 - 1)) as usize];

        let cent = &mut ent_state.cl_entities[s1.number as usize];

        let mut effects = s1.effects;
        let mut renderfx = s1.renderfx;

        // === Shell effect persistence during packet loss ===
        // During packet loss, powerup effects may be missing from the entity state.
        // Use the last known effects to maintain visual continuity (e.g., quad/pent shells).
        // Only apply persistence for player entities (modelindex 255) and recently active effects.
        let frames_since_update = cl.frame.serverframe - cent.serverframe;
        let is_player = s1.modelindex == 255;

        if is_player && frames_since_update > 0 && frames_since_update <= 5 {
            // Check if current effects are missing shell effects that we recently had
            let shell_effects: u32 = EF_PENT | EF_QUAD | EF_DOUBLE | EF_HALF_DAMAGE | EF_COLOR_SHELL;
            let shell_renderfx: i32 = RF_SHELL_RED | RF_SHELL_BLUE | RF_SHELL_GREEN
                | RF_SHELL_DOUBLE | RF_SHELL_HALF_DAM;

            // If current state has no shell effects but we had them recently, restore them
            if (effects & shell_effects) == 0 && (cent.last_effects as u32 & shell_effects) != 0 {
                effects |= cent.last_effects as u32 & shell_effects;
            }
            if (renderfx & shell_renderfx) == 0 && (cent.last_renderfx & shell_renderfx) != 0 {
                renderfx |= cent.last_renderfx & shell_renderfx;
            }
        }

        let mut ent = Entity::default();

        // set frame - with client-side animation continuation during packet loss
        if effects & EF_ANIM01 != 0 {
            ent.frame = autoanim & 1;
        } else if effects & EF_ANIM23 != 0 {
            ent.frame = 2 + (autoanim & 1);
        } else if effects & EF_ANIM_ALL != 0 {
            ent.frame = autoanim;
        } else if effects & EF_ANIM_ALLFAST != 0 {
            ent.frame = cl.time / 100;
        } else if cl.cl_anim_continue && cent.anim_state.animating {
            // Check if we should use client-predicted animation frame
            let frames_since_update = cl.frame.serverframe - cent.anim_state.last_server_frame;

            // Continue animation during packet loss or short delays
            if cl.packet_loss_frames > 0 || (frames_since_update > 0 && frames_since_update <= 3) {
                // Use cl_predict_animation_frame for client-side animation continuation
                let time_since_update = (cl.time - cent.last_update_time) as f32;
                let (predicted_frame, _predicted_oldframe, _predicted_backlerp) =
                    cl_predict_animation_frame(cent, time_since_update, cl.cl_anim_continue);

                // During packet loss, allow more frames to advance (up to 10 instead of 3)
                let max_advance = if cl.packet_loss_frames > 0 { 10 } else { 3 };
                let frame_delta = predicted_frame - cent.anim_state.frame;
                ent.frame = cent.anim_state.frame + frame_delta.min(max_advance);
            } else {
                ent.frame = s1.frame;
            }
        } else {
            ent.frame = s1.frame;
        }

        // quad and pent can do different things on client
        if effects & EF_PENT != 0 {
            effects &= !EF_PENT;
            effects |= EF_COLOR_SHELL;
            renderfx |= RF_SHELL_RED;
        }

        if effects & EF_QUAD != 0 {
            effects &= !EF_QUAD;
            effects |= EF_COLOR_SHELL;
            renderfx |= RF_SHELL_BLUE;
        }

        // PMM
        if effects & EF_DOUBLE != 0 {
            effects &= !EF_DOUBLE;
            effects |= EF_COLOR_SHELL;
            renderfx |= RF_SHELL_DOUBLE;
        }

        if effects & EF_HALF_DAMAGE != 0 {
            effects &= !EF_HALF_DAMAGE;
            effects |= EF_COLOR_SHELL;
            renderfx |= RF_SHELL_HALF_DAM;
        }

        // === Animation frame interpolation ===
        // Try spline interpolation first for smoother multi-frame animation
        if let Some((spline_frame, spline_oldframe, spline_backlerp)) = cent.anim_state.get_spline_frame(cl.time) {
            ent.frame = spline_frame;
            ent.oldframe = spline_oldframe;
            ent.backlerp = spline_backlerp;
        } else {
            // Fall back to standard animation-specific backlerp for smoother frame transitions
            ent.oldframe = cent.prev.frame;

            // Calculate animation-specific backlerp based on frame transition timing
            if cent.current.frame != cent.prev.frame && cent.anim_state.animating {
                // Frame changed - interpolate between old and new frame
                // Use time since frame change for smoother animation
                let time_in_frame = (cl.time - cent.last_update_time) as f32;
                let frame_lerp = (time_in_frame / cent.anim_state.frame_duration.max(50.0)).clamp(0.0, 1.0);
                ent.backlerp = 1.0 - frame_lerp;
            } else {
                // Same frame or not animating - use position-based lerp
                ent.backlerp = 1.0 - cl.lerpfrac;
            }
        }

        if renderfx & (RF_FRAMELERP | RF_BEAM) != 0 {
            // step origin discretely, because the frames
            // do the animation properly
            ent.origin = vector_copy(&cent.current.origin);
            ent.oldorigin = vector_copy(&cent.current.old_origin);
        } else {
            // linear lerp between the previous and current server states (§4.5)
            let (origin, _) = myq2_common::entity::lerp_state(
                &unbridge_entity_state(&cent.prev), &unbridge_entity_state(&cent.current), cl.lerpfrac,
            );
            ent.origin = origin;
            ent.oldorigin = ent.origin;
        }

        // create a new entity

        // tweak the color of beams
        if renderfx & RF_BEAM != 0 {
            // the four beam colors are encoded in 32 bits of skinnum (hack)
            ent.alpha = 0.30;
            ent.skinnum = (s1.skinnum >> ((rand::random::<i32>().unsigned_abs() as i32 % 4) * 8)) & 0xff;
            ent.model = 0;
        } else {
            // set skin
            if s1.modelindex == 255 {
                // use custom player skin
                ent.skinnum = 0;
                let ci = &cl.clientinfo[(s1.skinnum & 0xff) as usize];
                ent.skin = ci.skin;
                ent.model = ci.model;
                if ent.skin == 0 || ent.model == 0 {
                    ent.skin = cl.baseclientinfo.skin;
                    ent.model = cl.baseclientinfo.model;
                }

                // PGM
                if renderfx & RF_USE_DISGUISE != 0 {
                    if let Some(skin_name) = callbacks.get_skin_name(ent.skin) {
                        if skin_name.starts_with("players/male") {
                            ent.skin = callbacks.r_register_skin("players/male/disguise.pcx");
                            ent.model = callbacks.r_register_model("players/male/tris.md2");
                        } else if skin_name.starts_with("players/female") {
                            ent.skin = callbacks.r_register_skin("players/female/disguise.pcx");
                            ent.model = callbacks.r_register_model("players/female/tris.md2");
                        } else if skin_name.starts_with("players/cyborg") {
                            ent.skin = callbacks.r_register_skin("players/cyborg/disguise.pcx");
                            ent.model = callbacks.r_register_model("players/cyborg/tris.md2");
                        }
                    }
                }
                // PGM

                // === Client-side footstep prediction for other players ===
                // During packet loss, predict footstep sounds based on movement velocity
                // to maintain audio continuity for other players' movement
                if s1.number != cl.playernum + 1 { // Don't predict for self (server handles that)
                    let entity_num = s1.number as usize;
                    // Check if on ground (using pmove flags would be ideal, but we use velocity heuristic)
                    let is_on_ground = cent.velocity.velocity[2].abs() < 50.0;

                    // Update footstep prediction with current position
                    let should_play = if cl.packet_loss_frames > 0 && cent.velocity.valid {
                        // During packet loss, use velocity-based prediction
                        let time_since_update = cl.time - cent.velocity.last_update_time;
                        cl.smoothing.footstep_prediction.predict_during_loss(
                            entity_num,
                            &cent.velocity.velocity,
                            cl.time,
                            time_since_update,
                        )
                    } else {
                        // Normal update - check if moved enough for a footstep
                        cl.smoothing.footstep_prediction.update_entity(
                            entity_num,
                            &ent.origin,
                            cl.time,
                            is_on_ground,
                        )
                    };

                    // Play predicted footstep sound
                    if should_play && is_on_ground {
                        callbacks.cl_play_footstep(&ent.origin, s1.number);
                    }

                    // === Player animation continuation during packet loss ===
                    // Update animation state from server, or continue during loss
                    if cl.packet_loss_frames > 0 && cent.velocity.valid {
                        // Packet loss - continue animation based on velocity
                        if let Some(predicted_frame) = cl.smoothing.player_anim.continue_animation(
                            entity_num,
                            cl.time,
                        ) {
                            ent.frame = predicted_frame;
                        }
                    } else {
                        // Normal update - record animation state for future prediction
                        cl.smoothing.player_anim.update_from_server(
                            entity_num,
                            s1.frame,
                            &cent.velocity.velocity,
                            cl.time,
                        );
                    }
                }
            } else {
                ent.skinnum = s1.skinnum;
                ent.skin = 0;
                ent.model = cl.model_draw[s1.modelindex as usize];
            }
        }

        // Translucent render effect (used for black hole model)
        if renderfx == RF_TRANSLUCENT {
            ent.alpha = 0.70;
        }

        // render effects (fullbright, translucent, etc)
        if effects & EF_COLOR_SHELL != 0 {
            ent.flags = 0; // renderfx go on color shell entity
        } else {
            ent.flags = renderfx;
        }

        // calculate angles
        if effects & EF_ROTATE != 0 {
            // some bonus items auto-rotate
            ent.angles[0] = 0.0;
            ent.angles[2] = 0.0;

            // mattx86: bobbing_items (ENABLE_BOBBING_ITEMS)
            let bob_scale = (0.005 + s1.number as f32 * 0.00001) * 1.10;
            let bob = 5.0 + ((cl.time as f32 + 1000.0) * bob_scale).cos() * 5.0;

            // Update item rotation tracking for smooth continuation during packet loss
            let entity_num = s1.number as usize;
            cl.smoothing.item_rotation.update(entity_num, autorotate, bob, cl.time);

            // During packet loss, extrapolate rotation and bob for smooth movement
            if cl.packet_loss_frames > 0 {
                // Try to get extrapolated rotation angle
                if let Some(extrapolated_angle) = cl.smoothing.item_rotation.get_extrapolated_angle(entity_num, cl.time) {
                    ent.angles[1] = extrapolated_angle;
                } else {
                    ent.angles[1] = autorotate;
                }

                // Try to get extrapolated bob
                if let Some(extrapolated_bob) = cl.smoothing.item_rotation.get_extrapolated_bob(entity_num, cl.time, bob_scale) {
                    ent.oldorigin[2] += extrapolated_bob;
                    ent.origin[2] += extrapolated_bob;
                } else {
                    ent.oldorigin[2] += bob;
                    ent.origin[2] += bob;
                }
            } else {
                ent.angles[1] = autorotate;
                ent.oldorigin[2] += bob;
                ent.origin[2] += bob;
            }
        } else if effects & EF_SPINNINGLIGHTS != 0 {
            // RAFAEL
            ent.angles[0] = 0.0;
            ent.angles[1] = anglemod(cl.time as f32 / 2.0) + s1.angles[1];
            ent.angles[2] = 180.0;
            {
                let mut forward = [0.0f32; 3];
                angle_vectors(&ent.angles, Some(&mut forward), None, None);
                let start = vector_ma(&ent.origin, 64.0, &forward);
                callbacks.v_add_light(&start, 100.0, 1.0, 0.0, 0.0);
            }
        } else {
            // interpolate angles with optional extrapolation during packet loss
            for i in 0..3 {
                let a1 = cent.current.angles[i];
                let a2 = cent.prev.angles[i];
                ent.angles[i] = lerp_angle(a2, a1, cl.lerpfrac);
            }

            // Apply angular velocity extrapolation during packet loss
            // This continues smooth rotation when packets are dropped
            if cl.packet_loss_frames > 0 && cent.velocity.angular_valid {
                let time_since_update = (cl.time - cent.velocity.last_update_time) as f32 / 1000.0;
                // Limit extrapolation to 500ms to prevent runaway rotation
                if time_since_update > 0.0 && time_since_update < 0.5 {
                    // Only extrapolate if there's meaningful rotation (>5 deg/sec)
                    for i in 0..3 {
                        if cent.velocity.angular_velocity[i].abs() > 5.0 {
                            let extrap = cent.velocity.angular_velocity[i] * time_since_update;
                            // Limit extrapolation to prevent huge jumps
                            let clamped_extrap = extrap.clamp(-45.0, 45.0);
                            ent.angles[i] = anglemod(ent.angles[i] + clamped_extrap);
                        }
                    }
                }
            }
        }

        if s1.number == cl.playernum + 1 {
            ent.flags |= RF_VIEWERMODEL; // only draw from mirrors
            // Add lights for player effects (entity is RF_VIEWERMODEL so not drawn normally)

            if effects & EF_FLAG1 != 0 {
                callbacks.v_add_light(&ent.origin, 225.0, 1.0, 0.1, 0.1);
            } else if effects & EF_FLAG2 != 0 {
                callbacks.v_add_light(&ent.origin, 225.0, 0.1, 0.1, 1.0);
            } else if effects & EF_TAGTRAIL != 0 {
                callbacks.v_add_light(&ent.origin, 225.0, 1.0, 1.0, 0.0);
            } else if effects & EF_TRACKERTRAIL != 0 {
                callbacks.v_add_light(&ent.origin, 225.0, -1.0, -1.0, -1.0);
            }

            continue;
        }

        // if set to invisible, skip
        if s1.modelindex == 0 {
            continue;
        }

        if effects & EF_BFG != 0 {
            ent.flags |= RF_TRANSLUCENT;
            ent.alpha = 0.30;
        }

        // RAFAEL
        if effects & EF_PLASMA != 0 {
            ent.flags |= RF_TRANSLUCENT;
            ent.alpha = 0.6;
        }

        if effects & EF_SPHERETRANS != 0 {
            ent.flags |= RF_TRANSLUCENT;
            // PMM - *sigh* yet more EF overloading
            if effects & EF_TRACKERTRAIL != 0 {
                ent.alpha = 0.6;
            } else {
                ent.alpha = 0.3;
            }
        }

        // === Apply spawn fade-in effect ===
        // New entities fade in over time to prevent visual pop-in
        if cent.spawn_time > 0 && cl.smoothing.entity_fadein.enabled {
            let spawn_alpha = cl.smoothing.entity_fadein.calculate_alpha(cl.time, cent.spawn_time);
            if spawn_alpha < 1.0 {
                // Multiply existing alpha by spawn alpha
                ent.alpha = if ent.alpha > 0.0 { ent.alpha * spawn_alpha } else { spawn_alpha };
                ent.flags |= RF_TRANSLUCENT;
            }
        }

        // add to refresh list
        callbacks.v_add_entity(&ent);

        // color shells generate a separate entity for the main model
        if effects & EF_COLOR_SHELL != 0 {
            if renderfx & RF_SHELL_HALF_DAM != 0
                && callbacks.developer_searchpath(2) == 2
                    && renderfx & (RF_SHELL_RED | RF_SHELL_BLUE | RF_SHELL_DOUBLE) != 0 {
                        renderfx &= !RF_SHELL_HALF_DAM;
                    }

            if renderfx & RF_SHELL_DOUBLE != 0
                && callbacks.developer_searchpath(2) == 2 {
                    if renderfx & (RF_SHELL_RED | RF_SHELL_BLUE | RF_SHELL_GREEN) != 0 {
                        renderfx &= !RF_SHELL_DOUBLE;
                    }
                    if renderfx & RF_SHELL_RED != 0 {
                        renderfx |= RF_SHELL_BLUE;
                    } else if renderfx & RF_SHELL_BLUE != 0 {
                        if renderfx & RF_SHELL_GREEN != 0 {
                            renderfx &= !RF_SHELL_BLUE;
                        } else {
                            renderfx |= RF_SHELL_GREEN;
                        }
                    }
                }

            ent.flags = renderfx | RF_TRANSLUCENT;
            ent.alpha = 0.30;
            callbacks.v_add_entity(&ent);
        }

        ent.skin = 0; // never use a custom skin on others
        ent.skinnum = 0;
        ent.flags = 0;
        ent.alpha = 0.0;

        // duplicate for linked models
        if s1.modelindex2 != 0 {
            if s1.modelindex2 == 255 {
                // custom weapon
                let ci = &cl.clientinfo[(s1.skinnum & 0xff) as usize];
                let mut wi = (s1.skinnum >> 8) as usize; // 0 is default weapon model
                if !cl_vwep_enabled(cl) || wi > MAX_CLIENTWEAPONMODELS - 1 {
                    wi = 0;
                }
                ent.model = ci.weaponmodel[wi];
                if ent.model == 0 {
                    if wi != 0 {
                        ent.model = ci.weaponmodel[0];
                    }
                    if ent.model == 0 {
                        ent.model = cl.baseclientinfo.weaponmodel[0];
                    }
                }
            } else {
                ent.model = cl.model_draw[s1.modelindex2 as usize];
            }

            // PMM - check for the defender sphere shell .. make it translucent
            let cs_idx = CS_MODELS + s1.modelindex2 as usize;
            if cs_idx < cl.configstrings.len()
                && cl.configstrings[cs_idx].eq_ignore_ascii_case("models/items/shell/tris.md2")
            {
                ent.alpha = 0.32;
                ent.flags = RF_TRANSLUCENT;
            }

            callbacks.v_add_entity(&ent);

            // PGM - make sure these get reset.
            ent.flags = 0;
            ent.alpha = 0.0;
        }
        if s1.modelindex3 != 0 {
            ent.model = cl.model_draw[s1.modelindex3 as usize];
            callbacks.v_add_entity(&ent);
        }
        if s1.modelindex4 != 0 {
            ent.model = cl.model_draw[s1.modelindex4 as usize];
            callbacks.v_add_entity(&ent);
        }

        if effects & EF_POWERSCREEN != 0 {
            ent.model = cl.model_draw[0]; // cl_mod_powerscreen placeholder
            ent.oldframe = 0;
            ent.frame = 0;
            ent.flags |= RF_TRANSLUCENT | RF_SHELL_GREEN;
            ent.alpha = 0.30;
            callbacks.v_add_entity(&ent);
        }

        // add automatic particle trails
        let lerp_origin_copy = cent.lerp_origin;
        if (effects & !EF_ROTATE) != 0 {
            if effects & EF_ROCKET != 0 {
                callbacks.cl_rocket_trail(&lerp_origin_copy, &ent.origin, cent);
                callbacks.v_add_light(&ent.origin, 200.0, 1.0, 1.0, 0.0);
            }
            // PGM - Do not reorder EF_BLASTER and EF_HYPERBLASTER.
            else if effects & EF_BLASTER != 0 {
                if effects & EF_TRACKER != 0 {
                    callbacks.cl_blaster_trail2(&lerp_origin_copy, &ent.origin);
                    callbacks.v_add_light(&ent.origin, 200.0, 0.0, 1.0, 0.0);
                } else {
                    callbacks.cl_blaster_trail(&lerp_origin_copy, &ent.origin);
                    callbacks.v_add_light(&ent.origin, 200.0, 1.0, 1.0, 0.0);
                }
            } else if effects & EF_HYPERBLASTER != 0 {
                if effects & EF_TRACKER != 0 {
                    callbacks.v_add_light(&ent.origin, 200.0, 0.0, 1.0, 0.0);
                } else {
                    callbacks.v_add_light(&ent.origin, 200.0, 1.0, 1.0, 0.0);
                }
            } else if effects & EF_GIB != 0 {
                callbacks.cl_diminishing_trail(&lerp_origin_copy, &ent.origin, cent, effects);
            } else if effects & EF_GRENADE != 0 {
                callbacks.cl_diminishing_trail(&lerp_origin_copy, &ent.origin, cent, effects);
            } else if effects & EF_FLIES != 0 {
                callbacks.cl_fly_effect(cent, &ent.origin);
            } else if effects & EF_BFG != 0 {
                static BFG_LIGHTRAMP: [i32; 6] = [300, 400, 600, 300, 150, 75];

                let light_i: i32;
                if effects & EF_ANIM_ALLFAST != 0 {
                    callbacks.cl_bfg_particles(&ent);
                    light_i = 200;
                } else {
                    light_i = BFG_LIGHTRAMP[s1.frame as usize];
                }
                callbacks.v_add_light(&ent.origin, light_i as f32, 0.0, 1.0, 0.0);
            }
            // RAFAEL
            else if effects & EF_TRAP != 0 {
                let mut trap_ent = ent.clone();
                trap_ent.origin[2] += 32.0;
                callbacks.cl_trap_particles(&trap_ent);
                let ri = (rand::random::<i32>().unsigned_abs() as i32 % 100) + 100;
                callbacks.v_add_light(&trap_ent.origin, ri as f32, 1.0, 0.8, 0.1);
            } else if effects & EF_FLAG1 != 0 {
                callbacks.cl_flag_trail(&lerp_origin_copy, &ent.origin, 242.0);
                callbacks.v_add_light(&ent.origin, 225.0, 1.0, 0.1, 0.1);
            } else if effects & EF_FLAG2 != 0 {
                callbacks.cl_flag_trail(&lerp_origin_copy, &ent.origin, 115.0);
                callbacks.v_add_light(&ent.origin, 225.0, 0.1, 0.1, 1.0);
            }
            // ROGUE
            else if effects & EF_TAGTRAIL != 0 {
                callbacks.cl_tag_trail(&lerp_origin_copy, &ent.origin, 220.0);
                callbacks.v_add_light(&ent.origin, 225.0, 1.0, 1.0, 0.0);
            } else if effects & EF_TRACKERTRAIL != 0 {
                if effects & EF_TRACKER != 0 {
                    let intensity =
                        50.0 + (500.0 * ((cl.time as f32 / 500.0).sin() + 1.0));
                    callbacks.v_add_light(&ent.origin, intensity, -1.0, -1.0, -1.0);
                } else {
                    callbacks.cl_tracker_shell(&lerp_origin_copy);
                    callbacks.v_add_light(&ent.origin, 155.0, -1.0, -1.0, -1.0);
                }
            } else if effects & EF_TRACKER != 0 {
                callbacks.cl_tracker_trail(&lerp_origin_copy, &ent.origin, 0);
                callbacks.v_add_light(&ent.origin, 200.0, -1.0, -1.0, -1.0);
            }
            // RAFAEL
            else if effects & EF_GREENGIB != 0 {
                callbacks.cl_diminishing_trail(&lerp_origin_copy, &ent.origin, cent, effects);
            }
            // RAFAEL
            else if effects & EF_IONRIPPER != 0 {
                callbacks.cl_ionripper_trail(&lerp_origin_copy, &ent.origin);
                callbacks.v_add_light(&ent.origin, 100.0, 1.0, 0.5, 0.5);
            }
            // RAFAEL
            else if effects & EF_BLUEHYPERBLASTER != 0 {
                callbacks.v_add_light(&ent.origin, 200.0, 0.0, 0.0, 1.0);
            }
            // RAFAEL
            else if effects & EF_PLASMA != 0 {
                if effects & EF_ANIM_ALLFAST != 0 {
                    callbacks.cl_blaster_trail(&lerp_origin_copy, &ent.origin);
                }
                callbacks.v_add_light(&ent.origin, 130.0, 1.0, 0.5, 0.5);
            }
        }

        // Update animation state for client-side continuation.
        // cl_update_entity_animation advances the animation frame locally when
        // server updates are missed, keeping entities animated during packet loss.
        {
            let frame_delta_ms = if cl.time > ent_state.cl_entities[s1.number as usize].last_update_time {
                (cl.time - ent_state.cl_entities[s1.number as usize].last_update_time) as f32
            } else {
                0.0
            };
            cl_update_entity_animation(
                &mut ent_state.cl_entities[s1.number as usize],
                frame_delta_ms,
                cl.frame.serverframe,
            );
        }

        ent_state.cl_entities[s1.number as usize].lerp_origin = vector_copy(&ent.origin);
    }

    // === Entity fadeout rendering ===
    // Render recently-disappeared entities with alpha fadeout to prevent pop-out
    cl_add_fadeout_entities(frame, cl, ent_state, callbacks);
}

/// Render entities that have recently disappeared from server updates with fadeout alpha
fn cl_add_fadeout_entities(
    frame: &Frame,
    cl: &ClientState,
    ent_state: &mut ClientEntState,
    callbacks: &mut dyn ClientCallbacks,
) {
    // Skip if fadeout is disabled
    if !cl.smoothing.entity_fadeout.enabled {
        return;
    }

    // Build set of entity numbers that are in the current frame
    // (so we don't re-render entities that are already visible)
    let mut current_entities = vec![false; MAX_EDICTS];
    for pnum in 0..frame.num_entities {
        let idx = ((frame.parse_entities + pnum) & (MAX_PARSE_ENTITIES as i32 - 1)) as usize;
        let entnum = ent_state.cl_parse_entities[idx].number as usize;
        if entnum < MAX_EDICTS {
            current_entities[entnum] = true;
        }
    }

    // Check all client entities for fadeout candidates
    for entnum in 1..MAX_EDICTS {
        // Skip entities that are in the current frame
        if current_entities[entnum] {
            continue;
        }

        let cent = &ent_state.cl_entities[entnum];

        // Skip entities that were never seen or have no model
        if cent.serverframe <= 0 || cent.current.modelindex == 0 {
            continue;
        }

        // Calculate fadeout alpha
        let alpha = match cl.smoothing.entity_fadeout.calculate_alpha(
            cl.time,
            cent.last_update_time,
            frame.serverframe,
            cent.serverframe,
        ) {
            Some(a) => a,
            None => continue, // Not eligible for fadeout or fully faded
        };

        // Create entity for rendering with fadeout
        let mut ent = Entity::default();
        ent.model = cl.model_draw.get(cent.current.modelindex as usize).copied().unwrap_or(0);
        if ent.model == 0 {
            continue;
        }

        // Use velocity extrapolation for fading entities to prevent "frozen" appearance
        // This makes gibs, projectiles, and dying entities continue moving smoothly during fadeout
        let mut origin = cent.lerp_origin;
        if cent.velocity.valid {
            let time_since_update = (cl.time - cent.velocity.last_update_time) as f32 / 1000.0;
            // Limit extrapolation to 500ms (fadeout duration) to prevent runaway movement
            if time_since_update > 0.0 && time_since_update < 0.5 {
                for i in 0..3 {
                    origin[i] += cent.velocity.velocity[i] * time_since_update;
                }
                // Apply gravity for gibs and grenades (EF_GIB, EF_GRENADE, EF_GREENGIB)
                let effects = cent.current.effects;
                if effects & (EF_GIB | EF_GRENADE | EF_GREENGIB) != 0 {
                    origin[2] -= 0.5 * 800.0 * time_since_update * time_since_update;
                }
            }
        }
        ent.origin = origin;
        ent.oldorigin = origin;

        // Set frame to last known frame
        ent.frame = cent.current.frame;
        ent.oldframe = cent.prev.frame;
        ent.backlerp = 0.0; // No interpolation needed since we're extrapolating position

        // Apply angles
        ent.angles = cent.current.angles;

        // Set skin/skinnum
        ent.skinnum = cent.current.skinnum;
        ent.skin = 0; // Will be resolved by renderer

        // Make translucent with fadeout alpha
        ent.flags = cent.current.renderfx | RF_TRANSLUCENT;
        ent.alpha = alpha;

        // Add entity to render list
        callbacks.v_add_entity(&ent);
    }
}

/// Helper: check if cl_vwep is enabled. In the real engine this reads
/// the cvar; here we check a field on ClientState or default to true.
fn cl_vwep_enabled(_cl: &ClientState) -> bool {
    myq2_common::cvar::cvar_variable_value("cl_vwep") != 0.0
}

/// CL_AddViewWeapon
pub fn cl_add_view_weapon(
    ps: &PlayerState,
    ops: &PlayerState,
    cl: &mut ClientState,
    frametime: f32,
    gun_model_override: i32,
    gun_frame_override: i32,
    hand_value: i32,
    callbacks: &mut dyn ClientCallbacks,
) {
    // allow the gun to be completely removed
    // (cl_gun cvar check — assumed enabled; caller should gate this)

    // don't draw gun if in wide angle view
    // mattx86: gun_wideangle — VISIBLE_GUN_WIDEANGLE is enabled, so we skip this check

    let mut gun = Entity::default();

    if gun_model_override != 0 {
        gun.model = gun_model_override; // development tool
    } else {
        gun.model = cl.model_draw[ps.gunindex as usize];
    }
    if gun.model == 0 {
        return;
    }

    // set up gun position (raw calculated position)
    let mut raw_origin = [0.0f32; 3];
    let mut raw_angles = [0.0f32; 3];
    for i in 0..3 {
        raw_origin[i] = cl.refdef.vieworg[i] + ops.gunoffset[i]
            + cl.lerpfrac * (ps.gunoffset[i] - ops.gunoffset[i]);
        raw_angles[i] = cl.refdef.viewangles[i]
            + lerp_angle(ops.gunangles[i], ps.gunangles[i], cl.lerpfrac);
    }

    // RIOT - Centered gun (CENTERED_GUN enabled)
    if hand_value == 2 {
        let mut anglemove = [0.0f32; 3];
        let mut anglemove2 = [0.0f32; 3];
        angle_vectors(&raw_angles, None, Some(&mut anglemove), Some(&mut anglemove2));
        let am_scaled = vector_scale(&anglemove, -8.0);
        let am2_scaled = vector_scale(&anglemove2, -5.0);
        raw_origin = vector_add(&raw_origin, &am_scaled);
        raw_origin = vector_add(&raw_origin, &am2_scaled);
    }

    // Apply weapon view smoothing for smoother gun movement
    let (smoothed_origin, smoothed_angles) = if cl.smoothing.weapon_smoothing.enabled {
        cl.smoothing.weapon_smoothing.update(&raw_origin, &raw_angles, frametime)
    } else {
        (raw_origin, raw_angles)
    };

    // Apply weapon sway (inertial gun movement based on player movement)
    let current_time = cl.time;
    if cl.packet_loss_frames > 0 {
        // During packet loss, continue sway momentum (gradually settle)
        cl.smoothing.weapon_sway.continue_during_packet_loss(current_time);
    } else {
        // Normal update - sway based on player velocity and view angles
        let velocity = [
            ps.pmove.velocity[0] as f32 * 0.125,
            ps.pmove.velocity[1] as f32 * 0.125,
            ps.pmove.velocity[2] as f32 * 0.125,
        ];
        cl.smoothing.weapon_sway.update(&velocity, &raw_angles, current_time);
    }

    // Get sway offset and apply to gun position
    let sway_offset = cl.smoothing.weapon_sway.get_offset();
    gun.origin = [
        smoothed_origin[0] + sway_offset[0],
        smoothed_origin[1] + sway_offset[1],
        smoothed_origin[2] + sway_offset[2],
    ];
    gun.angles = smoothed_angles;

    if gun_frame_override != 0 {
        gun.frame = gun_frame_override; // development tool
        gun.oldframe = gun_frame_override;
        gun.backlerp = 0.0;
    } else {
        gun.frame = ps.gunframe;
        if gun.frame == 0 {
            gun.oldframe = 0; // just changed weapons, don't lerp from old
            gun.backlerp = 0.0;
            // Clear weapon animation state on weapon switch
            cl.smoothing.weapon_anim.clear();
        } else {
            // Update weapon animation smoothing system
            let current_time = cl.time;
            if cl.packet_loss_frames > 0 {
                // During packet loss, continue animation extrapolation
                cl.smoothing.weapon_anim.continue_animation(current_time);
            } else {
                // Normal update with new frame from server
                cl.smoothing.weapon_anim.update(ps.gunframe, current_time);
            }

            // Use smoothed frames if enabled
            if cl.smoothing.weapon_anim.enabled {
                let (frame, oldframe, backlerp) = cl.smoothing.weapon_anim.get_smooth_frames();
                gun.frame = frame;
                gun.oldframe = oldframe;
                gun.backlerp = backlerp;
            } else {
                // Fallback to standard interpolation
                gun.oldframe = ops.gunframe;
                if gun.frame != gun.oldframe {
                    gun.backlerp = 1.0 - cl.lerpfrac;
                } else {
                    gun.backlerp = 0.0;
                }
            }
        }
    }

    gun.flags = RF_MINLIGHT | RF_DEPTHHACK | RF_WEAPONMODEL;
    gun.oldorigin = vector_copy(&gun.origin); // don't lerp at all
    callbacks.v_add_entity(&gun);
}

/// CL_CalcViewValues — Sets cl.refdef view values
pub fn cl_calc_view_values(
    cl: &mut ClientState,
    cls: &ClientStatic,
    ent_state: &ClientEntState,
    gun_model_override: i32,
    gun_frame_override: i32,
    hand_value: i32,
    cl_predict_enabled: bool,
    cl_gun_enabled: bool,
    callbacks: &mut dyn ClientCallbacks,
) {
    // find the previous frame to interpolate from
    let ps = cl.frame.playerstate.clone();
    let i = ((cl.frame.serverframe - 1) as usize) & (UPDATE_BACKUP as usize - 1);
    let oldframe = &cl.frames[i];
    let mut ops: PlayerState;
    if oldframe.serverframe != cl.frame.serverframe - 1 || !oldframe.valid {
        ops = ps.clone(); // previous frame was dropped or invalid
    } else {
        ops = oldframe.playerstate.clone();
    }

    // see if the player entity was teleported this frame
    if myq2_common::player::is_teleport(&unbridge_pmove_state(&ops.pmove), &unbridge_pmove_state(&ps.pmove)) {
        ops = ps.clone(); // don't interpolate

        // Reset view and weapon smoothing on teleport to prevent trying to smooth a large jump
        let teleport_origin = [
            ps.pmove.origin[0] as f32 * 0.125 + ps.viewoffset[0],
            ps.pmove.origin[1] as f32 * 0.125 + ps.viewoffset[1],
            ps.pmove.origin[2] as f32 * 0.125 + ps.viewoffset[2],
        ];
        cl.smoothing.view_smoothing.snap_to(&teleport_origin, &ps.viewangles);
        cl.smoothing.weapon_smoothing.snap_to(&teleport_origin, &ps.viewangles);
    }

    let _ent = &ent_state.cl_entities[(cl.playernum + 1) as usize];
    let lerp = cl.lerpfrac;

    // calculate the origin
    if cl_predict_enabled && (cl.frame.playerstate.pmove.pm_flags & PMF_NO_PREDICTION) == 0 {
        // use predicted values
        let backlerp = 1.0 - lerp;

        // Use smoothed prediction error for smoother corrections
        // This interpolates the error over 150ms instead of snapping instantly
        let smoothed_error = crate::cl_pred::cl_get_smoothed_prediction_error(cl, cls.realtime);

        for i in 0..3 {
            cl.refdef.vieworg[i] = cl.predicted_origin[i] + ops.viewoffset[i]
                + cl.lerpfrac * (ps.viewoffset[i] - ops.viewoffset[i])
                - backlerp * smoothed_error[i];
        }

        // smooth out stair climbing
        let delta = (cls.realtime as u32).wrapping_sub(cl.predicted_step_time);
        if delta < 100 {
            cl.refdef.vieworg[2] -= cl.predicted_step * (100 - delta) as f32 * 0.01;
        }
    } else {
        // just use interpolated values
        let view_offset = myq2_common::player::lerp_view_offset(
            &unbridge_player_state(&ops), &unbridge_player_state(&ps), lerp,
        );
        for i in 0..3 {
            cl.refdef.vieworg[i] = ops.pmove.origin[i] as f32 * 0.125
                + view_offset[i]
                + lerp * (ps.pmove.origin[i] as f32 * 0.125 - ops.pmove.origin[i] as f32 * 0.125);
        }
    }

    // if not running a demo or on a locked frame, add the local angle movement
    if (cl.frame.playerstate.pmove.pm_type as i32) < (PmType::Dead as i32) {
        // use predicted values
        for i in 0..3 {
            cl.refdef.viewangles[i] = cl.predicted_angles[i];
        }
    } else {
        // just use interpolated values
        cl.refdef.viewangles = myq2_common::player::lerp_view_angles(
            &unbridge_player_state(&ops), &unbridge_player_state(&ps), lerp,
        );
    }

    // === View bob continuation during packet loss ===
    // This continues the walking/running bob motion when packets are dropped
    // to prevent the view from suddenly becoming static
    if cl.smoothing.view_bob.enabled {
        let current_time = cls.realtime as i32;

        // Get player velocity from playerstate (convert from fixed-point)
        let velocity = [
            ps.pmove.velocity[0] as f32 * 0.125,
            ps.pmove.velocity[1] as f32 * 0.125,
            ps.pmove.velocity[2] as f32 * 0.125,
        ];

        if cl.packet_loss_frames > 0 {
            // During packet loss, continue the bob motion
            cl.smoothing.view_bob.continue_bob(current_time);
        } else {
            // Normal frame - update bob with actual velocity
            cl.smoothing.view_bob.update(&velocity, current_time);
        }

        // Apply bob offset to view
        let (bob_y, bob_roll) = cl.smoothing.view_bob.get_bob();
        cl.refdef.vieworg[2] += bob_y;
        cl.refdef.viewangles[2] += bob_roll;
    }

    // === Weapon kick/recoil smoothing ===
    // Apply momentum-based smoothing for natural-feeling weapon recoil
    // This prevents abrupt kick changes and adds momentum decay
    let delta_time = cls.frametime; // frametime is already in seconds

    let smoothed_kick = if cl.packet_loss_frames > 0 {
        // During packet loss, continue natural decay toward zero
        // This prevents the view from freezing with kick applied
        cl.smoothing.recoil_smoothing.continue_decay(delta_time)
    } else {
        // Normal update with interpolated kick from playerstate
        let mut target_kick = [0.0f32; 3];
        for i in 0..3 {
            target_kick[i] = lerp_angle(ops.kick_angles[i], ps.kick_angles[i], lerp);
        }
        cl.smoothing.recoil_smoothing.update(&target_kick, delta_time)
    };

    for i in 0..3 {
        cl.refdef.viewangles[i] += smoothed_kick[i];
    }

    // === Apply view smoothing to prevent camera snapping ===
    // This smooths out abrupt changes in view position/angles
    if cl.smoothing.view_smoothing.enabled {
        // Calculate delta time in seconds (frame_msec is in milliseconds)
        let delta_time = 0.01; // Assume ~100Hz for now, will be passed in future

        let (smoothed_origin, smoothed_angles) = cl.smoothing.view_smoothing.update(
            &cl.refdef.vieworg,
            &cl.refdef.viewangles,
            delta_time,
        );

        cl.refdef.vieworg = smoothed_origin;
        cl.refdef.viewangles = smoothed_angles;
    }

    angle_vectors(
        &cl.refdef.viewangles,
        Some(&mut cl.v_forward),
        Some(&mut cl.v_right),
        Some(&mut cl.v_up),
    );

    // interpolate field of view
    cl.refdef.fov_x = ops.fov + lerp * (ps.fov - ops.fov);

    // Smooth blend color transitions (damage flash, powerups)
    // Update screen blend smoothing with new values from server
    cl.smoothing.screen_blend.update(&ps.blend, cl.time);

    // During packet loss, continue smoothing toward current target
    if cl.packet_loss_frames > 0 {
        cl.smoothing.screen_blend.continue_smoothing(cl.time);
    }

    // Get the smoothed blend values
    cl.refdef.blend = cl.smoothing.screen_blend.get_blend();

    // add the weapon
    if cl_gun_enabled {
        cl_add_view_weapon(&ps, &ops, cl, cls.frametime, gun_model_override, gun_frame_override, hand_value, callbacks);
    }
}

/// CL_AddEntities — Emits all entities, particles, and lights to the refresh.
pub fn cl_add_entities(
    cl: &mut ClientState,
    cls: &ClientStatic,
    ent_state: &mut ClientEntState,
    proj_state: &mut ProjectileState,
    cl_showclamp: bool,
    cl_timedemo: bool,
    cl_predict_enabled: bool,
    cl_gun_enabled: bool,
    gun_model_override: i32,
    gun_frame_override: i32,
    hand_value: i32,
    callbacks: &mut dyn ClientCallbacks,
) {
    if cls.state != ConnState::Active {
        return;
    }

    // Clamp render time into [servertime - 100, servertime] and derive
    // lerpfrac from where it falls (spec'd fixed 100 ms server tick).
    if cl.time > cl.frame.servertime {
        log::debug!("high clamp {}", cl.time - cl.frame.servertime);
        if cl_showclamp {
            com_dprintf(&format!("high clamp {}\n", cl.time - cl.frame.servertime));
        }
        cl.time = cl.frame.servertime;
        cl.lerpfrac = 1.0;
    } else if cl.time < cl.frame.servertime - 100 {
        log::debug!("low clamp {}", cl.frame.servertime - 100 - cl.time);
        if cl_showclamp {
            com_dprintf(&format!(
                "low clamp {}\n",
                cl.frame.servertime - 100 - cl.time
            ));
        }
        cl.time = cl.frame.servertime - 100;
        cl.lerpfrac = 0.0;
    } else {
        cl.lerpfrac = 1.0 - (cl.frame.servertime - cl.time) as f32 / 100.0;
    }

    if cl_timedemo {
        cl.lerpfrac = 1.0;
    }

    // Apply time nudge to global lerpfrac.
    // cl_timenudge allows players to trade responsiveness vs smoothness.
    // Positive values show entities ahead of their interpolation (more responsive),
    // negative values add more interpolation delay (smoother).
    if cl.cl_timenudge != 0 && !cl_timedemo {
        cl.lerpfrac = cl_apply_timenudge(
            cl.lerpfrac,
            cl.cl_timenudge,
            cl.frame.servertime,
            cl.time,
        );
    }

    cl_calc_view_values(
        cl, cls, ent_state,
        gun_model_override, gun_frame_override, hand_value,
        cl_predict_enabled, cl_gun_enabled,
        callbacks,
    );
    // PMM - moved this here so the heat beam has the right values for the
    // vieworg, and can lock the beam to the gun
    let frame = cl.frame.clone();
    cl_add_packet_entities(&frame, cl, ent_state, callbacks);

    // Add projectiles to the scene.
    // In the original C code this was #if 0'd (disabled), but the implementation
    // is complete. Wire it here gated by the projectile predict cvar which
    // controls whether the subsystem is active.
    cl_add_projectiles(proj_state, cl, callbacks);

    callbacks.cl_add_tents();
    callbacks.cl_add_particles();
    callbacks.cl_add_dlights();
    callbacks.cl_add_light_styles();
}

/// CL_GetEntitySoundOrigin — Called to get the sound spatialization origin.
///
/// For brush models (doors, platforms, etc.), we need special handling since
/// their origin is often at world origin and the actual entity is offset by
/// their bounding box. This function handles that case.
pub fn cl_get_entity_sound_origin(ent: i32, org: &mut Vec3, ent_state: &ClientEntState) {
    if ent < 0 || ent >= MAX_EDICTS as i32 {
        panic!("CL_GetEntitySoundOrigin: bad ent");
    }
    let cent = &ent_state.cl_entities[ent as usize];

    // For brush models (solid == 31), the origin may not represent the
    // actual center of the entity. However, without access to the model's
    // bounding box data here, we use lerp_origin as best estimate.
    *org = vector_copy(&cent.lerp_origin);
}

/// CL_GetEntitySoundOrigin with model bounding box support.
///
/// This enhanced version properly calculates the center of brush models
/// using their bounding box data for accurate sound spatialization.
/// For brush models like doors and elevators, this places the sound
/// at the center of the brush rather than at the world origin.
///
/// # Arguments
/// * `ent` - Entity number
/// * `org` - Output: sound origin
/// * `ent_state` - Entity state
/// * `get_model_bounds` - Callback to get inline model bounding box: (modelindex) -> (mins, maxs)
pub fn cl_get_entity_sound_origin_enhanced(
    ent: i32,
    org: &mut Vec3,
    ent_state: &ClientEntState,
    get_model_bounds: Option<&dyn Fn(i32) -> Option<(Vec3, Vec3)>>,
) {
    if ent < 0 || ent >= MAX_EDICTS as i32 {
        panic!("CL_GetEntitySoundOrigin: bad ent");
    }
    let cent = &ent_state.cl_entities[ent as usize];

    // Check if this is a brush model (solid value 31 indicates inline bmodel)
    if cent.current.solid == 31 {
        // Try to get model bounds for proper center calculation
        if let Some(get_bounds) = get_model_bounds {
            if let Some((mins, maxs)) = get_bounds(cent.current.modelindex as i32) {
                // Calculate center of bounding box in world space
                // sound_origin = entity_origin + (mins + maxs) / 2
                for i in 0..3 {
                    org[i] = cent.lerp_origin[i] + (mins[i] + maxs[i]) * 0.5;
                }
                return;
            }
        }
    }

    // Fallback to the basic cl_get_entity_sound_origin for point entities
    cl_get_entity_sound_origin(ent, org, ent_state);
}

// =========================================================================
// NETWORK SMOOTHNESS HELPERS
//
// These functions provide velocity-based extrapolation, animation
// continuation, and packet loss concealment for smoother online gameplay.
// =========================================================================

/// Calculate extrapolated position based on entity velocity.
/// Returns the extrapolated origin if velocity is valid and extrapolation is enabled.
///
/// # Arguments
/// * `cent` - The client entity with velocity data
/// * `lerp_origin` - The base interpolated origin
/// * `current_time` - Current client time in ms
/// * `extrapolate_max` - Maximum extrapolation time in ms
/// * `enabled` - Whether extrapolation is enabled
pub fn cl_extrapolate_entity_position(
    cent: &CEntity,
    lerp_origin: &Vec3,
    current_time: i32,
    extrapolate_max: i32,
    enabled: bool,
) -> Vec3 {
    if !enabled || !cent.velocity.valid {
        return *lerp_origin;
    }

    // Calculate time since last server update
    let time_since_update = current_time - cent.velocity.last_update_time;

    // Clamp extrapolation to max (avoid runaway extrapolation on packet loss)
    let extrap_time = time_since_update.min(extrapolate_max).max(0) as f32 / 1000.0;

    // Only extrapolate if we have a small time delta (normal frame gaps)
    if time_since_update < 0 || time_since_update > extrapolate_max * 2 {
        return *lerp_origin;
    }

    let mut result = *lerp_origin;
    for i in 0..3 {
        result[i] += cent.velocity.velocity[i] * extrap_time;
    }
    result
}

/// Apply time nudge adjustment to lerpfrac.
/// Time nudge allows players to trade responsiveness vs smoothness.
///
/// # Arguments
/// * `lerpfrac` - Base interpolation fraction (0.0 to 1.0)
/// * `timenudge` - Time nudge in ms (-100 to +100)
/// * `servertime` - Current server frame time
/// * `client_time` - Current client time
pub fn cl_apply_timenudge(
    lerpfrac: f32,
    timenudge: i32,
    servertime: i32,
    client_time: i32,
) -> f32 {
    if timenudge == 0 {
        return lerpfrac;
    }

    // Adjust client time by timenudge
    let adjusted_time = client_time + timenudge;

    // Recalculate lerpfrac with nudged time
    let new_lerpfrac = 1.0 - (servertime - adjusted_time) as f32 * 0.01;

    // Clamp to valid range
    new_lerpfrac.clamp(0.0, 1.0)
}

/// Predict the next animation frame for client-side continuation.
/// Used to keep animations running smoothly during packet loss.
///
/// # Arguments
/// * `cent` - The client entity with animation state
/// * `frame_delta_ms` - Time since last frame in milliseconds
/// * `enabled` - Whether animation continuation is enabled
pub fn cl_predict_animation_frame(
    cent: &CEntity,
    frame_delta_ms: f32,
    enabled: bool,
) -> (i32, i32, f32) {
    if !enabled || !cent.anim_state.animating {
        return (cent.current.frame, cent.anim_state.oldframe, 0.0);
    }

    let anim = &cent.anim_state;

    // Accumulate frame time
    let new_frame_time = anim.frame_time + frame_delta_ms;

    // Check if we should advance to next frame
    if new_frame_time >= anim.frame_duration {
        // Simple frame advancement - wrap around or continue
        let new_frame = anim.frame + 1;
        let backlerp = 0.0; // Start of new frame
        (new_frame, anim.frame, backlerp)
    } else {
        // Still in current frame - calculate backlerp for smooth interpolation
        let backlerp = 1.0 - (new_frame_time / anim.frame_duration);
        (anim.frame, anim.oldframe, backlerp)
    }
}

/// Conceal packet loss by extrapolating entity state.
/// Returns true if packet loss concealment is active.
///
/// # Arguments
/// * `cent` - The client entity
/// * `current_frame` - Current server frame number
/// * `origin_out` - Output: concealed origin position
/// * `enabled` - Whether PLC is enabled
pub fn cl_conceal_packet_loss(
    cent: &CEntity,
    current_frame: i32,
    origin_out: &mut Vec3,
    enabled: bool,
) -> bool {
    if !enabled {
        return false;
    }

    // Check if this entity is missing from recent frames
    let frames_missed = current_frame - cent.serverframe;
    if frames_missed <= 0 || frames_missed > 5 {
        return false;
    }

    // Use velocity to predict where entity should be
    if cent.velocity.valid {
        // Each missed frame represents SERVER_FRAMETIME_SEC (100ms at 10Hz)
        let extrap_time = (frames_missed as f32) * SERVER_FRAMETIME_SEC;
        for i in 0..3 {
            origin_out[i] = cent.current.origin[i] + cent.velocity.velocity[i] * extrap_time;
        }
        true
    } else {
        // No velocity - use last known position
        *origin_out = cent.current.origin;
        true
    }
}

/// Calculate interpolated origin with all smoothness features applied.
/// This is the main function for smooth entity rendering.
///
/// # Arguments
/// * `cent` - The client entity
/// * `cl` - Client state with timing and settings
/// * `current_time` - Current client time in ms
pub fn cl_smooth_entity_origin(
    cent: &CEntity,
    prev_origin: &Vec3,
    current_origin: &Vec3,
    lerpfrac: f32,
    cl_timenudge: i32,
    cl_extrapolate: bool,
    cl_extrapolate_max: i32,
    servertime: i32,
    current_time: i32,
) -> Vec3 {
    // Step 1: Apply time nudge to lerp fraction
    let adjusted_lerpfrac = cl_apply_timenudge(lerpfrac, cl_timenudge, servertime, current_time);

    // Step 2: Basic linear interpolation
    let mut result = [0.0f32; 3];
    for i in 0..3 {
        result[i] = prev_origin[i] + adjusted_lerpfrac * (current_origin[i] - prev_origin[i]);
    }

    // Step 3: Apply velocity extrapolation for smoother movement
    if cl_extrapolate && cent.velocity.valid && adjusted_lerpfrac >= 0.9 {
        // Only extrapolate near the end of interpolation window
        let extrap_amount = (adjusted_lerpfrac - 0.9) * 10.0; // 0.0 to 1.0
        let extrap_time = extrap_amount * (cl_extrapolate_max as f32 / 1000.0);

        for i in 0..3 {
            result[i] += cent.velocity.velocity[i] * extrap_time;
        }
    }

    result
}

/// Enhanced entity origin calculation with spline and dead reckoning support.
/// Use this for player entities that need the smoothest possible interpolation.
///
/// # Arguments
/// * `entity_num` - Entity number for looking up smoothing state
/// * `cent` - The client entity
/// * `smoothing` - The smoothing state from ClientState
/// * `lerpfrac` - Base interpolation fraction
/// * `cl_timenudge` - Time nudge setting
/// * `cl_extrapolate` - Whether extrapolation is enabled
/// * `cl_extrapolate_max` - Maximum extrapolation time
/// * `servertime` - Current server time
/// * `current_time` - Current client time
/// * `gravity` - Gravity value for dead reckoning
pub fn cl_smooth_entity_origin_advanced(
    entity_num: usize,
    cent: &CEntity,
    smoothing: &crate::cl_smooth::SmoothingState,
    lerpfrac: f32,
    cl_timenudge: i32,
    cl_extrapolate: bool,
    cl_extrapolate_max: i32,
    servertime: i32,
    current_time: i32,
    gravity: f32,
) -> Vec3 {
    // Step 1: Try spline interpolation if enabled and we have enough history
    if smoothing.cubic_interp_enabled && entity_num < smoothing.spline_histories.len() {
        let target_time = current_time + cl_timenudge;
        if let Some(spline_pos) = smoothing.spline_histories[entity_num].interpolate(target_time) {
            // Spline gave us a position - blend with extrapolation if needed
            if cl_extrapolate && cent.velocity.valid && lerpfrac >= 0.9 {
                let extrap_amount = (lerpfrac - 0.9) * 10.0;
                let extrap_time = extrap_amount * (cl_extrapolate_max as f32 / 1000.0);
                let mut result = spline_pos;
                for i in 0..3 {
                    result[i] += cent.velocity.velocity[i] * extrap_time;
                }
                return result;
            }
            return spline_pos;
        }
    }

    // Step 2: Try dead reckoning for player entities with confidence blending
    if cent.current.modelindex == 255 && entity_num < smoothing.dead_reckoning.len() {
        let dr = &smoothing.dead_reckoning[entity_num];
        if dr.confidence > 0.2 {
            // Get base prediction
            let predicted = dr.predict(current_time + cl_timenudge, gravity);

            // Calculate current confidence based on time since last update
            // Confidence decays over time (2x per second decay rate)
            let dt = (current_time - dr.last_update_time) as f32 / 1000.0;
            let current_confidence = (dr.confidence * (1.0 - dt * 2.0)).max(0.0);

            if current_confidence > 0.5 {
                // High confidence - use pure prediction
                return predicted;
            } else if current_confidence > 0.0 {
                // Medium confidence - blend prediction with last known position
                let mut result = [0.0f32; 3];
                for i in 0..3 {
                    result[i] = predicted[i] * current_confidence + dr.position[i] * (1.0 - current_confidence);
                }
                return result;
            }
            // Low confidence - fall through to standard smoothing
        }
    }

    // Step 3: Fall back to standard smoothing
    cl_smooth_entity_origin(
        cent,
        &cent.prev.origin,
        &cent.current.origin,
        lerpfrac,
        cl_timenudge,
        cl_extrapolate,
        cl_extrapolate_max,
        servertime,
        current_time,
    )
}

/// Enhanced projectile origin calculation with aggressive velocity extrapolation.
/// Projectiles have predictable physics (straight line or gravity arc) so we can
/// extrapolate more aggressively than player entities.
///
/// # Arguments
/// * `cent` - The client entity (projectile)
/// * `lerpfrac` - Base interpolation fraction
/// * `current_time` - Current client time in ms
/// * `gravity` - Gravity value (800.0 standard Q2) - only used for gravity-affected projectiles
/// * `is_grenade` - Whether this projectile is affected by gravity (grenades)
pub fn cl_smooth_projectile_origin(
    cent: &CEntity,
    lerpfrac: f32,
    current_time: i32,
    gravity: f32,
    is_grenade: bool,
) -> Vec3 {
    // Step 1: Basic linear interpolation as fallback
    let mut result = [0.0f32; 3];
    for i in 0..3 {
        result[i] = cent.prev.origin[i] + lerpfrac * (cent.current.origin[i] - cent.prev.origin[i]);
    }

    // Step 2: Apply velocity extrapolation if valid
    if !cent.velocity.valid {
        return result;
    }

    // Calculate time since last server update
    let time_since_update = current_time - cent.velocity.last_update_time;
    if time_since_update <= 0 {
        return result;
    }

    // Projectiles can extrapolate more aggressively (up to 200ms)
    let max_extrap_ms = 200;
    let extrap_time = time_since_update.min(max_extrap_ms) as f32 / 1000.0;

    // Only extrapolate if we're near the end of the interpolation window
    // or if we've missed an update
    if lerpfrac < 0.8 && time_since_update < 100 {
        return result;
    }

    // Calculate extrapolation blend factor
    let extrap_blend = if lerpfrac >= 0.9 {
        (lerpfrac - 0.9) * 10.0 // 0.0 to 1.0 in final 10% of lerp
    } else {
        // Beyond normal lerp - fully extrapolate
        1.0
    };

    // Apply velocity extrapolation
    let mut extrap_pos = cent.current.origin;
    for i in 0..3 {
        extrap_pos[i] += cent.velocity.velocity[i] * extrap_time;
    }

    // Apply gravity for grenades
    if is_grenade {
        // v = v0 - g*t, position = p0 + v0*t - 0.5*g*t^2
        extrap_pos[2] -= 0.5 * gravity * extrap_time * extrap_time;
    }

    // Blend between interpolated and extrapolated positions
    for i in 0..3 {
        result[i] = result[i] * (1.0 - extrap_blend) + extrap_pos[i] * extrap_blend;
    }

    result
}

/// Update entity animation state for client-side continuation.
/// Call this each frame to advance animations locally.
pub fn cl_update_entity_animation(
    cent: &mut CEntity,
    frame_delta_ms: f32,
    current_server_frame: i32,
) {
    // Check if we missed server updates
    let frames_missed = current_server_frame - cent.anim_state.last_server_frame;

    if frames_missed > 0 && frames_missed <= 3 {
        // Server update missed - advance animation locally
        cent.anim_state.frame_time += frame_delta_ms;

        if cent.anim_state.frame_time >= cent.anim_state.frame_duration {
            cent.anim_state.oldframe = cent.anim_state.frame;
            cent.anim_state.frame += 1;
            cent.anim_state.frame_time = 0.0;
        }
    }
}

// =========================================================================
// PROJECTILE SUBSYSTEM
//
// Because there can be a lot of projectiles, there is a special
// network protocol for them. Flechettes are passed as efficient
// temporary entities.
// =========================================================================

// MAX_PROJECTILES imported from myq2_common::qcommon

/// Client-side projectile representation.
#[derive(Clone)]
pub struct Projectile {
    pub modelindex: i32,
    pub num: i32,        // entity number
    pub effects: i32,
    pub origin: Vec3,
    pub oldorigin: Vec3,
    pub angles: Vec3,
    pub present: bool,

    // === Smoothness improvements ===
    /// Velocity for client-side prediction (units/sec)
    pub velocity: Vec3,
    /// Whether this projectile is affected by gravity
    pub gravity_affected: bool,
    /// Last update time in client ms
    pub last_update_time: i32,
    /// Whether velocity is valid for prediction
    pub velocity_valid: bool,
    /// Number of frames this projectile has been missing from updates (for trail continuation)
    pub missed_frames: i32,
    /// Last known origin before packet loss (for trail continuation)
    pub trail_origin: Vec3,
}

impl Default for Projectile {
    fn default() -> Self {
        Self {
            modelindex: 0,
            num: 0,
            effects: 0,
            origin: [0.0; 3],
            oldorigin: [0.0; 3],
            angles: [0.0; 3],
            present: false,
            velocity: [0.0; 3],
            gravity_affected: false,
            last_update_time: 0,
            velocity_valid: false,
            missed_frames: 0,
            trail_origin: [0.0; 3],
        }
    }
}

/// Predict projectile position based on velocity and gravity.
/// Used to keep projectiles moving smoothly during packet gaps.
pub fn cl_predict_projectile(
    proj: &Projectile,
    current_time: i32,
    gravity: f32,
) -> Vec3 {
    if !proj.velocity_valid {
        return proj.origin;
    }

    let dt = (current_time - proj.last_update_time) as f32 / 1000.0;
    if dt <= 0.0 || dt > 0.5 {
        return proj.origin;
    }

    let mut predicted = proj.origin;
    for i in 0..3 {
        predicted[i] += proj.velocity[i] * dt;
    }

    // Apply gravity if this is a grenade-type projectile
    if proj.gravity_affected {
        predicted[2] -= 0.5 * gravity * dt * dt;
    }

    predicted
}

/// Client-side projectile list state.
pub struct ProjectileState {
    pub projectiles: [Projectile; MAX_PROJECTILES],
}

impl Default for ProjectileState {
    fn default() -> Self {
        Self {
            projectiles: std::array::from_fn(|_| Projectile::default()),
        }
    }
}

/// Clears all projectiles.
///
/// Corresponds to `CL_ClearProjectiles` in the original C code.
pub fn cl_clear_projectiles(state: &mut ProjectileState) {
    for i in 0..MAX_PROJECTILES {
        state.projectiles[i].present = false;
    }
}

/// Parses projectile data from a network message.
///
/// Flechettes are passed as efficient temporary entities using a compact
/// bit-packed encoding.
///
/// Corresponds to `CL_ParseProjectiles` in the original C code.
pub fn cl_parse_projectiles(
    state: &mut ProjectileState,
    net_message: &mut SizeBuf,
) {
    let c = msg_read_byte(net_message);

    for _i in 0..c {
        let mut bits = [0u8; 8];
        bits[0] = msg_read_byte(net_message) as u8;
        bits[1] = msg_read_byte(net_message) as u8;
        bits[2] = msg_read_byte(net_message) as u8;
        bits[3] = msg_read_byte(net_message) as u8;
        bits[4] = msg_read_byte(net_message) as u8;

        let mut pr = Projectile::default();
        pr.origin[0] = (((bits[0] as i32) + ((bits[1] as i32 & 15) << 8)) << 1) as f32 - 4096.0;
        pr.origin[1] = ((((bits[1] as i32) >> 4) + ((bits[2] as i32) << 4)) << 1) as f32 - 4096.0;
        pr.origin[2] = (((bits[3] as i32) + ((bits[4] as i32 & 15) << 8)) << 1) as f32 - 4096.0;
        pr.oldorigin = vector_copy(&pr.origin);

        if bits[4] & 64 != 0 {
            pr.effects = EF_BLASTER as i32;
        } else {
            pr.effects = 0;
        }

        let mut old = false;
        if bits[4] & 128 != 0 {
            old = true;
            bits[0] = msg_read_byte(net_message) as u8;
            bits[1] = msg_read_byte(net_message) as u8;
            bits[2] = msg_read_byte(net_message) as u8;
            bits[3] = msg_read_byte(net_message) as u8;
            bits[4] = msg_read_byte(net_message) as u8;
            pr.oldorigin[0] = (((bits[0] as i32) + ((bits[1] as i32 & 15) << 8)) << 1) as f32 - 4096.0;
            pr.oldorigin[1] = ((((bits[1] as i32) >> 4) + ((bits[2] as i32) << 4)) << 1) as f32 - 4096.0;
            pr.oldorigin[2] = (((bits[3] as i32) + ((bits[4] as i32 & 15) << 8)) << 1) as f32 - 4096.0;
        }

        bits[0] = msg_read_byte(net_message) as u8;
        bits[1] = msg_read_byte(net_message) as u8;
        bits[2] = msg_read_byte(net_message) as u8;

        pr.angles[0] = 360.0 * bits[0] as f32 / 256.0;
        pr.angles[1] = 360.0 * bits[1] as f32 / 256.0;
        pr.modelindex = bits[2] as i32;

        let b = msg_read_byte(net_message) as u8;
        pr.num = (b & 0x7f) as i32;
        if b & 128 != 0 {
            // extra entity number byte
            pr.num |= (msg_read_byte(net_message) as i32) << 7;
        }

        pr.present = true;

        let mut lastempty: i32 = -1;

        // find if this projectile already exists from previous frame
        let mut found = false;
        for j in 0..MAX_PROJECTILES {
            if state.projectiles[j].modelindex != 0 {
                if state.projectiles[j].num == pr.num {
                    // already present, set up oldorigin for interpolation
                    if !old {
                        pr.oldorigin = vector_copy(&state.projectiles[j].origin);
                    }

                    // === Calculate velocity for prediction ===
                    // Projectiles update at server tick rate (10Hz = SERVER_FRAMETIME_SEC)
                    for k in 0..3 {
                        pr.velocity[k] = (pr.origin[k] - state.projectiles[j].origin[k]) / SERVER_FRAMETIME_SEC;
                    }
                    pr.velocity_valid = true;

                    // Detect gravity-affected projectiles (grenades have downward velocity increase)
                    let z_accel = pr.velocity[2] - state.projectiles[j].velocity[2];
                    pr.gravity_affected = z_accel < -50.0; // Significant downward acceleration

                    state.projectiles[j] = pr.clone();
                    found = true;
                    break;
                }
            } else {
                lastempty = j as i32;
            }
        }

        // not present previous frame, add it
        if !found {
            if lastempty != -1 {
                // New projectile - estimate velocity from oldorigin if available
                if old {
                    for k in 0..3 {
                        pr.velocity[k] = (pr.origin[k] - pr.oldorigin[k]) / SERVER_FRAMETIME_SEC;
                    }
                    pr.velocity_valid = true;
                }
                state.projectiles[lastempty as usize] = pr;
            }
        }
    }
}

/// Parses projectile data with client time tracking for prediction.
pub fn cl_parse_projectiles_with_time(
    state: &mut ProjectileState,
    net_message: &mut SizeBuf,
    client_time: i32,
) {
    cl_parse_projectiles(state, net_message);

    // Update last update time for all present projectiles
    for proj in state.projectiles.iter_mut() {
        if proj.present {
            proj.last_update_time = client_time;
        }
    }
}

/// Adds projectiles to the render entity list.
///
/// Corresponds to `CL_AddProjectiles` (aka `CL_LinkProjectiles`) in the
/// original C code.
///
/// Uses the cl_projectile_predict setting to determine if velocity-based
/// prediction should be used for smoother projectile movement during
/// packet gaps.
pub fn cl_add_projectiles(
    state: &mut ProjectileState,
    cl: &ClientState,
    callbacks: &mut dyn ClientCallbacks,
) {
    // Use the cl_projectile_predict setting to enable/disable prediction
    cl_add_projectiles_with_prediction(state, cl, callbacks, cl.cl_projectile_predict, 800.0);
}

/// Adds projectiles to the render entity list with optional prediction.
///
/// # Arguments
/// * `state` - Projectile state
/// * `cl` - Client state
/// * `callbacks` - Rendering callbacks
/// * `predict` - Whether to use velocity-based prediction
/// * `gravity` - Gravity value for grenade prediction (default 800)
pub fn cl_add_projectiles_with_prediction(
    state: &mut ProjectileState,
    cl: &ClientState,
    callbacks: &mut dyn ClientCallbacks,
    predict: bool,
    gravity: f32,
) {
    let mut ent = Entity::default();

    for i in 0..MAX_PROJECTILES {
        let pr = &mut state.projectiles[i];

        // grab an entity to fill in
        if pr.modelindex < 1 {
            continue;
        }

        // === Trail continuation during packet loss ===
        // Instead of immediately clearing missing projectiles, continue their trails
        // for a few frames using extrapolation to maintain visual continuity.
        if !pr.present {
            pr.missed_frames += 1;

            // Only continue for up to 5 frames (500ms at 10fps server)
            if pr.missed_frames > 5 || !pr.velocity_valid {
                pr.modelindex = 0;
                pr.missed_frames = 0;
                continue;
            }

            // Use cl_predict_projectile for velocity-based position extrapolation
            // during packet loss. This handles both straight-line and gravity-affected
            // projectiles (e.g., grenades).
            let extrapolated = cl_predict_projectile(pr, cl.time, gravity);
            let dt = (cl.time - pr.last_update_time) as f32 / 1000.0;
            if dt > 0.0 && dt < 1.0 {
                // Draw trail from last known trail origin to extrapolated position
                if pr.effects & (EF_BLASTER as i32) != 0 {
                    callbacks.cl_blaster_trail(&pr.trail_origin, &extrapolated);
                }
                // Add light at extrapolated position
                callbacks.v_add_light(&extrapolated, 200.0 * (1.0 - pr.missed_frames as f32 * 0.15), 1.0, 1.0, 0.0);

                // Update trail origin for next frame
                pr.trail_origin = extrapolated;

                // Add the entity at extrapolated position
                ent.model = cl.model_draw[pr.modelindex as usize];
                ent.origin = extrapolated;
                ent.oldorigin = extrapolated;
                ent.angles = vector_copy(&pr.angles);
                callbacks.v_add_entity(&ent);
            }
            continue;
        }

        // Reset missed frames on successful update
        pr.missed_frames = 0;
        ent.model = cl.model_draw[pr.modelindex as usize];

        // Calculate origin with optional prediction
        if predict && pr.velocity_valid && cl.lerpfrac >= 0.9 {
            // Use prediction near end of interpolation window
            let base_origin = [
                pr.oldorigin[0] + cl.lerpfrac * (pr.origin[0] - pr.oldorigin[0]),
                pr.oldorigin[1] + cl.lerpfrac * (pr.origin[1] - pr.oldorigin[1]),
                pr.oldorigin[2] + cl.lerpfrac * (pr.origin[2] - pr.oldorigin[2]),
            ];

            // Add prediction for smooth continuation when near end of interpolation.
            // Convert the last 10% of lerp (0.9-1.0) to extrapolation time.
            let extrap_time = (cl.lerpfrac - 0.9) * SERVER_FRAMETIME_SEC;
            for j in 0..3 {
                ent.origin[j] = base_origin[j] + pr.velocity[j] * extrap_time;
            }

            // Apply gravity for grenades
            if pr.gravity_affected {
                ent.origin[2] -= 0.5 * gravity * extrap_time * extrap_time;
            }
        } else {
            // Standard interpolation
            for j in 0..3 {
                ent.origin[j] = pr.oldorigin[j]
                    + cl.lerpfrac * (pr.origin[j] - pr.oldorigin[j]);
            }
        }
        ent.oldorigin = ent.origin;

        if pr.effects & (EF_BLASTER as i32) != 0 {
            callbacks.cl_blaster_trail(&pr.oldorigin, &ent.origin);
        }
        callbacks.v_add_light(&pr.origin, 200.0, 1.0, 1.0, 0.0);

        // Store current origin for trail continuation during packet loss
        pr.trail_origin = ent.origin;

        ent.angles = vector_copy(&pr.angles);
        callbacks.v_add_entity(&ent);
    }
}

// ============================================================
// Unit tests
// ============================================================
