// snd_dma.rs — Sound system dispatch and channel management
// Converted from: myq2-original/client/snd_dma.c
//
// Audio mixing/output is a collaborator out of scope here: the core
// cares that sounds get registered and precached, not how they are
// spatialized or mixed. Dispatches to an AudioBackend trait (no local
// mixer); Doppler, room-reverb detection, and position extrapolation
// during packet loss are dropped along with it.

#![allow(non_snake_case, non_upper_case_globals, unused)]

use myq2_common::q_shared::*;
use myq2_common::common::{com_printf, com_dprintf};

// ============================================================
// Constants
// ============================================================

pub const SOUND_LOOPATTENUATE: f32 = 0.003;

pub const MAX_SFX: usize = MAX_SOUNDS * 2;
pub const MAX_PLAYSOUNDS: usize = 128;
pub const MAX_CHANNELS: usize = 32;

// ============================================================
// Types
// ============================================================

/// Audio format descriptor for buffer uploads to the backend.
pub struct AudioFormat {
    pub sample_rate: u32,
    pub bits_per_sample: u16,
    pub channels: u16,
}

// SfxCache is defined in sound_types.rs (canonical location)
pub use crate::sound_types::SfxCache;

// Sfx is defined in sound_types.rs (canonical location)
pub use crate::sound_types::Sfx;

#[derive(Clone, Default)]
pub struct Playsound {
    pub prev: usize,
    pub next: usize,
    pub sfx_index: Option<usize>,
    pub volume: f32,
    pub attenuation: f32,
    pub entnum: i32,
    pub entchannel: i32,
    pub fixed_origin: bool,
    pub origin: Vec3,
    pub begin: u32,
}

#[derive(Clone, Default)]
pub struct Channel {
    pub sfx_index: Option<usize>,
    pub entnum: i32,
    pub entchannel: i32,
    pub origin: Vec3,
    pub dist_mult: f32,
    pub master_vol: i32,
    pub fixed_origin: bool,
    pub autosound: bool,
}

#[derive(Clone, Default)]
pub struct WavInfo {
    pub rate: i32,
    pub width: i32,
    pub channels: i32,
    pub loopstart: i32,
    pub samples: i32,
    pub dataofs: i32,
}

// ============================================================
// Sound system state
// ============================================================

pub struct SoundState {
    pub s_registration_sequence: i32,
    pub channels: [Channel; MAX_CHANNELS],
    pub snd_initialized: bool,
    pub sound_started: bool,

    pub listener_origin: Vec3,
    pub listener_forward: Vec3,
    pub listener_right: Vec3,
    pub listener_up: Vec3,

    pub s_registering: bool,

    pub known_sfx: Vec<Sfx>,
    pub num_sfx: usize,

    pub s_playsounds: Vec<Playsound>,
    pub s_freeplays_head: usize,
    pub s_pendingplays_head: usize,

    // Cvar values
    pub s_verbose: bool,
    pub s_volume: f32,
    pub s_volume_modified: bool,
    pub s_loadas8bit: bool,
    pub s_khz: i32,
    pub s_show: bool,
}

impl Default for SoundState {
    fn default() -> Self {
        Self {
            s_registration_sequence: 0,
            channels: std::array::from_fn(|_| Channel::default()),
            snd_initialized: false,
            sound_started: false,
            listener_origin: [0.0; 3],
            listener_forward: [0.0; 3],
            listener_right: [0.0; 3],
            listener_up: [0.0; 3],
            s_registering: false,
            known_sfx: Vec::with_capacity(MAX_SFX),
            num_sfx: 0,
            s_playsounds: vec![Playsound::default(); MAX_PLAYSOUNDS + 2],
            s_freeplays_head: MAX_PLAYSOUNDS,
            s_pendingplays_head: MAX_PLAYSOUNDS + 1,
            s_verbose: false,
            s_volume: 0.5,
            s_volume_modified: false,
            s_loadas8bit: false,
            s_khz: 22,
            s_show: false,
        }
    }
}

// ============================================================
// Audio backend trait (implemented by OpenAL in myq2-sys)
// ============================================================

pub trait AudioBackend {
    fn init(&mut self) -> bool;
    fn shutdown(&mut self);
    fn play_sound(
        &mut self,
        channel: usize,
        sfx_data: &[u8],
        format: &AudioFormat,
        origin: &[f32; 3],
        volume: f32,
        attenuation: f32,
        looping: bool,
    );
    fn stop_channel(&mut self, channel: usize);
    fn update_listener(&mut self, origin: &[f32; 3], forward: &[f32; 3], up: &[f32; 3]);
    fn update_channel_position(&mut self, channel: usize, origin: &[f32; 3]);
    fn is_channel_playing(&self, channel: usize) -> bool;
    fn activate(&mut self, active: bool);

    // ---- Streaming audio for cinematics ----

    /// Queue raw audio samples for streaming playback (used by cinematics).
    fn queue_streaming_samples(&mut self, _samples: &[i16], _rate: i32, _channels: i32) {}

    /// Check if streaming audio is currently playing.
    fn is_streaming_active(&self) -> bool {
        false
    }

    /// Stop streaming audio playback and clear queued buffers.
    fn stop_streaming(&mut self) {}
}

// ============================================================
// Functions
// ============================================================

impl SoundState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn s_init(&mut self, backend: &mut dyn AudioBackend) {
        com_printf("\n------- sound initialization -------\n");

        myq2_common::cvar::cvar_get("s_khz", "48", myq2_common::q_shared::CVAR_ARCHIVE);

        if !backend.init() {
            com_printf("OpenAL: not initializing.\n");
            com_printf("------------------------------------\n");
            return;
        }

        self.sound_started = true;
        self.num_sfx = 0;

        self.s_stop_all_sounds(Some(backend));

        com_printf("------------------------------------\n");
    }

    pub fn s_shutdown(&mut self, backend: &mut dyn AudioBackend) {
        if !self.sound_started {
            return;
        }

        for i in 0..MAX_CHANNELS {
            backend.stop_channel(i);
        }

        backend.shutdown();
        self.sound_started = false;

        for sfx in self.known_sfx.iter_mut() {
            if sfx.name.is_empty() {
                continue;
            }
            sfx.cache = None;
            *sfx = Sfx::default();
        }
        self.num_sfx = 0;
    }

    pub fn s_find_name(&mut self, name: &str, create: bool) -> Option<usize> {
        if name.is_empty() {
            panic!("S_FindName: empty name");
        }
        if name.len() >= MAX_QPATH {
            panic!("Sound name too long: {}", name);
        }

        for i in 0..self.num_sfx {
            if self.known_sfx[i].name == name {
                return Some(i);
            }
        }

        if !create {
            return None;
        }

        let mut slot = None;
        for i in 0..self.num_sfx {
            if self.known_sfx[i].name.is_empty() {
                slot = Some(i);
                break;
            }
        }

        let idx = if let Some(i) = slot {
            i
        } else {
            if self.num_sfx >= MAX_SFX {
                panic!("S_FindName: out of sfx_t");
            }
            let i = self.num_sfx;
            self.known_sfx.push(Sfx::default());
            self.num_sfx += 1;
            i
        };

        self.known_sfx[idx] = Sfx::default();
        self.known_sfx[idx].name = name.to_string();
        self.known_sfx[idx].registration_sequence = self.s_registration_sequence;

        Some(idx)
    }

    pub fn s_alias_name(&mut self, aliasname: &str, truename: &str) -> Option<usize> {
        let mut slot = None;
        for i in 0..self.num_sfx {
            if self.known_sfx[i].name.is_empty() {
                slot = Some(i);
                break;
            }
        }

        let idx = if let Some(i) = slot {
            i
        } else {
            if self.num_sfx >= MAX_SFX {
                panic!("S_FindName: out of sfx_t");
            }
            let i = self.num_sfx;
            self.known_sfx.push(Sfx::default());
            self.num_sfx += 1;
            i
        };

        self.known_sfx[idx] = Sfx::default();
        self.known_sfx[idx].name = aliasname.to_string();
        self.known_sfx[idx].registration_sequence = self.s_registration_sequence;
        self.known_sfx[idx].truename = Some(truename.to_string());

        Some(idx)
    }

    pub fn s_begin_registration(&mut self) {
        self.s_registration_sequence += 1;
        self.s_registering = true;
    }

    pub fn s_register_sound(&mut self, name: &str, load_file: &dyn Fn(&str) -> Option<Vec<u8>>) -> Option<usize> {
        if !self.sound_started {
            return None;
        }

        let idx = self.s_find_name(name, true)?;
        self.known_sfx[idx].registration_sequence = self.s_registration_sequence;

        if !self.s_registering {
            crate::snd_mem::s_load_sound(&mut self.known_sfx[idx], load_file);
        }

        Some(idx)
    }

    pub fn s_register_sexed_sound(
        &mut self,
        ent_number: i32,
        base: &str,
        configstrings: &[String],
        load_file: &dyn Fn(&str) -> Option<Vec<u8>>,
    ) -> Option<usize> {
        let mut model = String::new();
        let n = myq2_common::q_shared::CS_PLAYERSKINS + (ent_number as usize) - 1;
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

        if model.is_empty() {
            model = "male".to_string();
        }

        let sexed_filename = format!("#players/{}/{}", model, &base[1..]);

        if load_file(&format!("players/{}/{}", model, &base[1..])).is_some() {
            return self.s_register_sound(&sexed_filename, load_file);
        }

        if model.starts_with("female") {
            let female_filename = format!("player/female/{}", &base[1..]);
            if load_file(&female_filename).is_some() {
                return self.s_register_sound(&format!("#{}", female_filename), load_file);
            }
        }

        let male_filename = format!("player/male/{}", &base[1..]);
        self.s_register_sound(&format!("#{}", male_filename), load_file)
    }

    /// End sound registration and load all registered sounds.
    pub fn s_end_registration<F>(&mut self, load_file: F)
    where
        F: Fn(&str) -> Option<Vec<u8>>,
    {
        for i in 0..self.num_sfx {
            if self.known_sfx[i].name.is_empty() {
                continue;
            }
            if self.known_sfx[i].registration_sequence != self.s_registration_sequence {
                self.known_sfx[i].cache = None;
                self.known_sfx[i] = Sfx::default();
            } else {
                crate::snd_mem::s_load_sound(&mut self.known_sfx[i], &load_file);
            }
        }

        self.s_registering = false;
    }

    pub fn s_pick_channel(&mut self, entnum: i32, entchannel: i32, playernum: i32) -> Option<usize> {
        if entchannel < 0 {
            panic!("S_PickChannel: entchannel<0");
        }

        let mut first_to_die: i32 = -1;

        for ch_idx in 0..MAX_CHANNELS {
            if entchannel != 0
                && self.channels[ch_idx].entnum == entnum
                && self.channels[ch_idx].entchannel == entchannel
            {
                first_to_die = ch_idx as i32;
                break;
            }

            if self.channels[ch_idx].sfx_index.is_none() {
                first_to_die = ch_idx as i32;
                break;
            }

            if self.channels[ch_idx].entnum == playernum + 1
                && entnum != playernum + 1
                && self.channels[ch_idx].sfx_index.is_some()
            {
                continue;
            }

            if first_to_die == -1 {
                first_to_die = ch_idx as i32;
            }
        }

        if first_to_die == -1 {
            return None;
        }

        self.channels[first_to_die as usize] = Channel::default();
        Some(first_to_die as usize)
    }

    pub fn s_alloc_playsound(&mut self) -> Option<usize> {
        let sentinel = self.s_freeplays_head;
        let ps_idx = self.s_playsounds[sentinel].next;
        if ps_idx == sentinel {
            return None;
        }

        let prev = self.s_playsounds[ps_idx].prev;
        let next = self.s_playsounds[ps_idx].next;
        self.s_playsounds[prev].next = next;
        self.s_playsounds[next].prev = prev;

        Some(ps_idx)
    }

    pub fn s_free_playsound(&mut self, ps_idx: usize) {
        let prev = self.s_playsounds[ps_idx].prev;
        let next = self.s_playsounds[ps_idx].next;
        self.s_playsounds[prev].next = next;
        self.s_playsounds[next].prev = prev;

        let sentinel = self.s_freeplays_head;
        let old_next = self.s_playsounds[sentinel].next;
        self.s_playsounds[ps_idx].next = old_next;
        self.s_playsounds[old_next].prev = ps_idx;
        self.s_playsounds[ps_idx].prev = sentinel;
        self.s_playsounds[sentinel].next = ps_idx;
    }

    pub fn s_issue_playsound(
        &mut self,
        ps_idx: usize,
        playernum: i32,
        backend: &mut dyn AudioBackend,
        load_file: &dyn Fn(&str) -> Option<Vec<u8>>,
    ) {
        if self.s_show {
            com_dprintf(&format!("Issue {}\n", self.s_playsounds[ps_idx].begin));
        }

        let ps = &self.s_playsounds[ps_idx];
        let entnum = ps.entnum;
        let entchannel = ps.entchannel;
        let attenuation = ps.attenuation;
        let volume = ps.volume;
        let sfx_index = ps.sfx_index;
        let origin = ps.origin;
        let fixed_origin = ps.fixed_origin;

        let ch_idx = match self.s_pick_channel(entnum, entchannel, playernum) {
            Some(idx) => idx,
            None => {
                self.s_free_playsound(ps_idx);
                return;
            }
        };

        backend.stop_channel(ch_idx);

        self.channels[ch_idx].entnum = entnum;
        self.channels[ch_idx].entchannel = entchannel;
        self.channels[ch_idx].sfx_index = sfx_index;
        self.channels[ch_idx].origin = origin;
        self.channels[ch_idx].fixed_origin = fixed_origin;
        self.channels[ch_idx].master_vol = volume as i32;
        self.channels[ch_idx].dist_mult = if attenuation == ATTN_STATIC {
            attenuation * 0.001
        } else {
            attenuation * 0.0005
        };
        self.channels[ch_idx].autosound = false;

        if let Some(sfx_idx) = sfx_index {
            crate::snd_mem::s_load_sound(&mut self.known_sfx[sfx_idx], load_file);
            if let Some(ref sc) = self.known_sfx[sfx_idx].cache {
                let format = AudioFormat {
                    sample_rate: sc.speed as u32,
                    bits_per_sample: (sc.width * 8) as u16,
                    channels: 1,
                };
                let looping = sc.loopstart >= 0;
                backend.play_sound(
                    ch_idx,
                    &sc.data,
                    &format,
                    &origin,
                    (volume / 255.0) * self.s_volume,
                    attenuation,
                    looping,
                );
            }
        }

        self.s_free_playsound(ps_idx);
    }

    pub fn s_start_sound(
        &mut self,
        origin: Option<Vec3>,
        entnum: i32,
        entchannel: i32,
        sfx_index: usize,
        fvol: f32,
        attenuation: f32,
        _timeofs: f32,
        _server_time: i32,
    ) {
        if !self.sound_started {
            return;
        }

        let vol = (fvol * 255.0) as i32;

        let ps_idx = match self.s_alloc_playsound() {
            Some(idx) => idx,
            None => return,
        };

        if let Some(orig) = origin {
            self.s_playsounds[ps_idx].origin = orig;
            self.s_playsounds[ps_idx].fixed_origin = true;
        } else {
            self.s_playsounds[ps_idx].fixed_origin = false;
        }

        self.s_playsounds[ps_idx].entnum = entnum;
        self.s_playsounds[ps_idx].entchannel = entchannel;
        self.s_playsounds[ps_idx].attenuation = attenuation;
        self.s_playsounds[ps_idx].volume = vol as f32;
        self.s_playsounds[ps_idx].sfx_index = Some(sfx_index);
        self.s_playsounds[ps_idx].begin = 0;

        // Insert into pending list
        let sentinel = self.s_pendingplays_head;
        let sort = self.s_playsounds[sentinel].next;
        let sort_prev = self.s_playsounds[sort].prev;
        self.s_playsounds[ps_idx].next = sort;
        self.s_playsounds[ps_idx].prev = sort_prev;
        self.s_playsounds[sort].prev = ps_idx;
        self.s_playsounds[sort_prev].next = ps_idx;
    }

    pub fn s_start_local_sound(
        &mut self,
        sound: &str,
        playernum: i32,
        server_time: i32,
        load_file: &dyn Fn(&str) -> Option<Vec<u8>>,
    ) {
        if !self.sound_started {
            return;
        }

        let sfx_idx = match self.s_register_sound(sound, load_file) {
            Some(idx) => idx,
            None => {
                com_printf(&format!("S_StartLocalSound: can't cache {}\n", sound));
                return;
            }
        };
        self.s_start_sound(None, playernum + 1, 0, sfx_idx, 1.0, 1.0, 0.0, server_time);
    }

    pub fn s_stop_all_sounds(&mut self, backend: Option<&mut dyn AudioBackend>) {
        if !self.sound_started {
            return;
        }

        if let Some(be) = backend {
            for i in 0..MAX_CHANNELS {
                be.stop_channel(i);
            }
        }

        for ps in self.s_playsounds.iter_mut() {
            *ps = Playsound::default();
        }

        let free_sentinel = self.s_freeplays_head;
        self.s_playsounds[free_sentinel].next = free_sentinel;
        self.s_playsounds[free_sentinel].prev = free_sentinel;

        let pending_sentinel = self.s_pendingplays_head;
        self.s_playsounds[pending_sentinel].next = pending_sentinel;
        self.s_playsounds[pending_sentinel].prev = pending_sentinel;

        for i in 0..MAX_PLAYSOUNDS {
            self.s_playsounds[i].prev = free_sentinel;
            self.s_playsounds[i].next = self.s_playsounds[free_sentinel].next;
            let old_next = self.s_playsounds[free_sentinel].next;
            self.s_playsounds[old_next].prev = i;
            self.s_playsounds[free_sentinel].next = i;
        }

        for ch in self.channels.iter_mut() {
            *ch = Channel::default();
        }
    }

    pub fn s_add_loop_sounds(
        &mut self,
        paused: bool,
        active: bool,
        sound_prepped: bool,
        frame_num_entities: i32,
        frame_parse_entities: i32,
        parse_entities: &[EntitySoundInfo],
        sound_precache: &[Option<usize>],
        playernum: i32,
        backend: &mut dyn AudioBackend,
        load_file: &dyn Fn(&str) -> Option<Vec<u8>>,
    ) {
        if paused || !active || !sound_prepped {
            return;
        }

        let max_parse = parse_entities.len();

        for i in 0..frame_num_entities as usize {
            let num = (frame_parse_entities as usize + i) & (max_parse - 1);
            let sound = parse_entities[num].sound;
            if sound == 0 {
                continue;
            }

            let sfx_idx = match sound_precache.get(sound as usize) {
                Some(Some(idx)) => *idx,
                _ => continue,
            };

            crate::snd_mem::s_load_sound(&mut self.known_sfx[sfx_idx], load_file);
            if self.known_sfx[sfx_idx].cache.is_none() {
                continue;
            }

            let origin = parse_entities[num].origin;

            let ch_idx = match self.s_pick_channel(0, 0, playernum) {
                Some(idx) => idx,
                None => return,
            };

            self.channels[ch_idx].autosound = true;
            self.channels[ch_idx].sfx_index = Some(sfx_idx);
            self.channels[ch_idx].origin = origin;

            if let Some(ref sc) = self.known_sfx[sfx_idx].cache {
                let format = AudioFormat {
                    sample_rate: sc.speed as u32,
                    bits_per_sample: (sc.width * 8) as u16,
                    channels: 1,
                };
                let looping = sc.loopstart >= 0;
                backend.play_sound(
                    ch_idx,
                    &sc.data,
                    &format,
                    &origin,
                    self.s_volume,
                    SOUND_LOOPATTENUATE,
                    looping,
                );
            }
        }
    }

    /// Queue raw audio samples for streaming playback (used by cinematics).
    /// Converts to 16-bit signed PCM and resamples to 44100 Hz if necessary.
    pub fn s_raw_samples(
        &mut self,
        samples: i32,
        rate: i32,
        width: i32,
        channels: i32,
        data: &[u8],
        backend: &mut dyn AudioBackend,
    ) {
        if !self.sound_started || samples <= 0 {
            return;
        }

        const TARGET_RATE: i32 = 44100;

        let samples = samples as usize;
        let channels = channels as usize;

        let samples_16: Vec<i16> = if width == 1 {
            data.iter()
                .take(samples * channels)
                .map(|&s| ((s as i16 - 128) * 256) as i16)
                .collect()
        } else {
            data.chunks_exact(2)
                .take(samples * channels)
                .map(|chunk| i16::from_le_bytes([chunk[0], chunk[1]]))
                .collect()
        };

        let resampled: Vec<i16> = if rate != TARGET_RATE && rate > 0 {
            let ratio = rate as f64 / TARGET_RATE as f64;
            let output_samples = ((samples as f64 / ratio) as usize).max(1);
            let mut output = Vec::with_capacity(output_samples * channels);

            for i in 0..output_samples {
                let src_pos = i as f64 * ratio;
                let src_idx = src_pos as usize;
                let frac = (src_pos - src_idx as f64) as f32;

                for ch in 0..channels {
                    let idx0 = src_idx * channels + ch;
                    let idx1 = ((src_idx + 1).min(samples - 1)) * channels + ch;

                    if idx0 < samples_16.len() && idx1 < samples_16.len() {
                        let s0 = samples_16[idx0] as f32;
                        let s1 = samples_16[idx1] as f32;
                        let interpolated = s0 + (s1 - s0) * frac;
                        output.push(interpolated as i16);
                    } else if idx0 < samples_16.len() {
                        output.push(samples_16[idx0]);
                    }
                }
            }
            output
        } else {
            samples_16
        };

        backend.queue_streaming_samples(&resampled, TARGET_RATE, channels as i32);
    }

    /// Update listener orientation, issue pending sounds, retire dead channels.
    pub fn s_update(
        &mut self,
        origin: Vec3,
        forward: Vec3,
        right: Vec3,
        up: Vec3,
        playernum: i32,
        _disable_screen: bool,
        backend: &mut dyn AudioBackend,
        get_entity_origin: &dyn Fn(i32) -> Vec3,
        load_file: &dyn Fn(&str) -> Option<Vec<u8>>,
    ) {
        if !self.sound_started {
            return;
        }

        self.listener_origin = origin;
        self.listener_forward = forward;
        self.listener_right = right;
        self.listener_up = up;
        backend.update_listener(&origin, &forward, &up);

        let sentinel = self.s_pendingplays_head;
        loop {
            let ps_idx = self.s_playsounds[sentinel].next;
            if ps_idx == sentinel {
                break;
            }
            self.s_issue_playsound(ps_idx, playernum, backend, load_file);
        }

        for i in 0..MAX_CHANNELS {
            if self.channels[i].sfx_index.is_none() {
                continue;
            }
            if !backend.is_channel_playing(i) {
                self.channels[i] = Channel::default();
                continue;
            }
            if !self.channels[i].fixed_origin {
                let new_origin = get_entity_origin(self.channels[i].entnum);
                self.channels[i].origin = new_origin;
                backend.update_channel_position(i, &new_origin);
            }
        }

        if self.s_show {
            let mut total = 0;
            for i in 0..MAX_CHANNELS {
                if self.channels[i].sfx_index.is_some() && backend.is_channel_playing(i) {
                    if let Some(sfx_idx) = self.channels[i].sfx_index {
                        com_printf(&format!(
                            "{:3} {}\n",
                            self.channels[i].master_vol, self.known_sfx[sfx_idx].name
                        ));
                    }
                    total += 1;
                }
            }
            com_printf(&format!("----({})----\n", total));
        }
    }

    pub fn s_play(
        &mut self,
        args: &[String],
        playernum: i32,
        server_time: i32,
        load_file: &dyn Fn(&str) -> Option<Vec<u8>>,
    ) {
        for arg in args.iter().skip(1) {
            let name = if !arg.contains('.') {
                format!("{}.wav", arg)
            } else {
                arg.clone()
            };
            if let Some(sfx_idx) = self.s_register_sound(&name, load_file) {
                self.s_start_sound(None, playernum + 1, 0, sfx_idx, 1.0, 1.0, 0.0, server_time);
            }
        }
    }

    pub fn s_sound_list(&self) {
        let mut total = 0;
        for i in 0..self.num_sfx {
            let sfx = &self.known_sfx[i];
            if sfx.registration_sequence == 0 {
                continue;
            }
            if let Some(ref sc) = sfx.cache {
                let size = sc.length * sc.width * (sc.stereo + 1);
                total += size;
                if sc.loopstart >= 0 {
                    com_printf("L");
                } else {
                    com_printf(" ");
                }
                com_printf(&format!("({:2}b) {:6} : {}\n", sc.width * 8, size, sfx.name));
            } else if sfx.name.starts_with('*') {
                com_printf(&format!("  placeholder : {}\n", sfx.name));
            } else {
                com_printf(&format!("  not loaded  : {}\n", sfx.name));
            }
        }
        com_printf(&format!("Total resident: {}\n", total));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sound_state_s_find_name_create() {
        let mut ss = SoundState::new();
        let idx = ss.s_find_name("weapons/blaster.wav", true);
        assert!(idx.is_some());
        assert_eq!(ss.known_sfx[idx.unwrap()].name, "weapons/blaster.wav");
        assert_eq!(ss.num_sfx, 1);
    }

    #[test]
    fn sound_state_s_find_name_find_existing() {
        let mut ss = SoundState::new();
        let idx1 = ss.s_find_name("weapons/blaster.wav", true).unwrap();
        let idx2 = ss.s_find_name("weapons/blaster.wav", true).unwrap();
        assert_eq!(idx1, idx2);
        assert_eq!(ss.num_sfx, 1);
    }

    #[test]
    fn sound_state_s_find_name_no_create() {
        let mut ss = SoundState::new();
        let idx = ss.s_find_name("weapons/blaster.wav", false);
        assert!(idx.is_none());
    }

    #[test]
    #[should_panic(expected = "S_FindName: empty name")]
    fn sound_state_s_find_name_empty_panics() {
        let mut ss = SoundState::new();
        ss.s_find_name("", true);
    }

    #[test]
    fn sound_state_s_find_name_multiple() {
        let mut ss = SoundState::new();
        let idx1 = ss.s_find_name("a.wav", true).unwrap();
        let idx2 = ss.s_find_name("b.wav", true).unwrap();
        assert_ne!(idx1, idx2);
        assert_eq!(ss.num_sfx, 2);
    }

    #[test]
    fn sound_state_s_alias_name() {
        let mut ss = SoundState::new();
        let idx = ss.s_alias_name("alias.wav", "real.wav").unwrap();
        assert_eq!(ss.known_sfx[idx].name, "alias.wav");
        assert_eq!(ss.known_sfx[idx].truename.as_deref(), Some("real.wav"));
    }

    #[test]
    fn sound_state_s_pick_channel_empty() {
        let mut ss = SoundState::new();
        let idx = ss.s_pick_channel(1, 1, 0);
        assert!(idx.is_some());
    }

    #[test]
    fn sound_state_s_pick_channel_replaces_same_entity_channel() {
        let mut ss = SoundState::new();
        ss.channels[0].entnum = 5;
        ss.channels[0].entchannel = 2;
        ss.channels[0].sfx_index = Some(1);

        let idx = ss.s_pick_channel(5, 2, 0);
        assert_eq!(idx, Some(0));
    }

    #[test]
    fn sound_state_s_pick_channel_finds_empty_slot() {
        let mut ss = SoundState::new();
        ss.channels[0].sfx_index = Some(1);
        ss.channels[0].entnum = 1;
        ss.channels[1].sfx_index = None; // empty

        let idx = ss.s_pick_channel(5, 3, 0);
        assert_eq!(idx, Some(1));
    }

    #[test]
    #[should_panic(expected = "entchannel<0")]
    fn sound_state_s_pick_channel_negative_entchannel_panics() {
        let mut ss = SoundState::new();
        ss.s_pick_channel(1, -1, 0);
    }

    #[test]
    fn sound_state_begin_registration_increments_sequence() {
        let mut ss = SoundState::new();
        assert_eq!(ss.s_registration_sequence, 0);
        ss.s_begin_registration();
        assert_eq!(ss.s_registration_sequence, 1);
        assert!(ss.s_registering);
        ss.s_begin_registration();
        assert_eq!(ss.s_registration_sequence, 2);
    }

    #[test]
    fn sound_state_stop_all_sounds_clears_channels() {
        let mut ss = SoundState::new();
        ss.sound_started = true;
        ss.channels[0].sfx_index = Some(1);
        ss.channels[0].entnum = 5;
        ss.channels[5].sfx_index = Some(2);

        ss.s_stop_all_sounds(None);

        assert!(ss.channels[0].sfx_index.is_none());
        assert_eq!(ss.channels[0].entnum, 0);
        assert!(ss.channels[5].sfx_index.is_none());
    }

    #[test]
    fn sound_state_stop_all_sounds_not_started_noop() {
        let mut ss = SoundState::new();
        ss.sound_started = false;
        ss.channels[0].sfx_index = Some(1);
        ss.s_stop_all_sounds(None);
        assert!(ss.channels[0].sfx_index.is_some());
    }

    #[test]
    fn sound_state_playsound_alloc_and_free() {
        let mut ss = SoundState::new();
        ss.sound_started = true;
        ss.s_stop_all_sounds(None); // Initialize linked lists

        let ps = ss.s_alloc_playsound();
        assert!(ps.is_some());
        let ps_idx = ps.unwrap();

        ss.s_free_playsound(ps_idx);

        let ps2 = ss.s_alloc_playsound();
        assert!(ps2.is_some());
    }

    #[test]
    fn sound_constants() {
        assert_eq!(SOUND_LOOPATTENUATE, 0.003);
        assert_eq!(MAX_CHANNELS, 32);
        assert_eq!(MAX_PLAYSOUNDS, 128);
    }

    #[test]
    fn sound_state_default_values() {
        let ss = SoundState::new();
        assert!(!ss.snd_initialized);
        assert!(!ss.sound_started);
        assert_eq!(ss.s_volume, 0.5);
        assert_eq!(ss.s_khz, 22);
        assert!(!ss.s_registering);
        assert_eq!(ss.num_sfx, 0);
        assert_eq!(ss.s_playsounds.len(), MAX_PLAYSOUNDS + 2);
    }

    #[test]
    fn wavinfo_default() {
        let wi = WavInfo::default();
        assert_eq!(wi.rate, 0);
        assert_eq!(wi.width, 0);
        assert_eq!(wi.channels, 0);
        assert_eq!(wi.loopstart, 0);
        assert_eq!(wi.samples, 0);
        assert_eq!(wi.dataofs, 0);
    }
}

pub fn snd_load_file(filename: &str) -> Option<Vec<u8>> {
    myq2_common::files::fs_load_file(filename)
}

/// Minimal entity sound info needed for loop sounds
#[derive(Clone, Default)]
pub struct EntitySoundInfo {
    pub origin: Vec3,
    pub sound: i32,
}
