// cl_demo.rs -- demo playback seeking, pause, and speed control
//
// R1Q2/Q2Pro-style demo enhancements are a UI/file-format collaborator
// out of scope here, and re-scanning a demo file duplicates the wire
// decoder this project already has in msg.rs/frame.rs. Keeps the
// pause/speed state the console commands expose; seeking and indexing
// are stubbed since no demo file scanner is implemented.

use std::sync::{LazyLock, Mutex};

use myq2_common::common::com_printf;

/// Maximum playback speed multiplier
pub const MAX_DEMO_SPEED: f32 = 4.0;
/// Minimum playback speed multiplier
pub const MIN_DEMO_SPEED: f32 = 0.25;

/// Demo playback state for enhanced features.
pub struct DemoPlayback {
    pub paused: bool,
    pub speed: f32,
    pub current_time: i32,
    pub playing: bool,
}

impl DemoPlayback {
    pub fn new() -> Self {
        Self {
            paused: false,
            speed: 1.0,
            current_time: 0,
            playing: false,
        }
    }

    pub fn toggle_pause(&mut self) {
        if self.playing {
            self.paused = !self.paused;
        }
    }

    pub fn set_speed(&mut self, speed: f32) {
        self.speed = speed.clamp(MIN_DEMO_SPEED, MAX_DEMO_SPEED);
    }

    pub fn get_time_seconds(&self) -> f32 {
        self.current_time as f32 / 1000.0
    }
}

impl Default for DemoPlayback {
    fn default() -> Self {
        Self::new()
    }
}

/// Global demo playback state
pub static DEMO_PLAYBACK: LazyLock<Mutex<DemoPlayback>> =
    LazyLock::new(|| Mutex::new(DemoPlayback::new()));

// ============================================================
// Console Commands
// ============================================================

/// seek <time> - seeking is not supported.
pub fn cmd_seek(_args: &str) {
    com_printf("Demo seeking is not supported.\n");
}

/// seekpercent <0-100> - seeking is not supported.
pub fn cmd_seekpercent(_args: &str) {
    com_printf("Demo seeking is not supported.\n");
}

/// demo_pause / demo_resume - Toggle pause
pub fn cmd_demo_pause() {
    let mut playback = DEMO_PLAYBACK.lock().unwrap();

    if !playback.playing {
        com_printf("Not playing a demo.\n");
        return;
    }

    playback.toggle_pause();
    if playback.paused {
        com_printf("Demo paused.\n");
    } else {
        com_printf("Demo resumed.\n");
    }
}

/// demo_speed <0.25-4.0> - Set playback speed
pub fn cmd_demo_speed(args: &str) {
    let mut playback = DEMO_PLAYBACK.lock().unwrap();

    if !playback.playing {
        com_printf("Not playing a demo.\n");
        return;
    }

    let speed_str = args.trim();
    if let Ok(speed) = speed_str.parse::<f32>() {
        playback.set_speed(speed);
        com_printf(&format!("Demo speed set to {:.2}x\n", playback.speed));
    } else {
        com_printf(&format!("Usage: demo_speed <{}-{}>\n", MIN_DEMO_SPEED, MAX_DEMO_SPEED));
    }
}

/// demo_info - Show demo information
pub fn cmd_demo_info() {
    let playback = DEMO_PLAYBACK.lock().unwrap();

    if !playback.playing {
        com_printf("Not playing a demo.\n");
        return;
    }

    com_printf(&format!(
        "Demo Info:\n  Time: {:.1}s\n  Speed: {:.2}x\n  Paused: {}\n",
        playback.get_time_seconds(),
        playback.speed,
        if playback.paused { "Yes" } else { "No" }
    ));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_demo_playback_speed() {
        let mut playback = DemoPlayback::new();
        playback.set_speed(2.0);
        assert_eq!(playback.speed, 2.0);

        playback.set_speed(10.0);
        assert_eq!(playback.speed, MAX_DEMO_SPEED);

        playback.set_speed(0.01);
        assert_eq!(playback.speed, MIN_DEMO_SPEED);
    }
}
