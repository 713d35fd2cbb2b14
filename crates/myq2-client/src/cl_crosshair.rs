// cl_crosshair.rs -- crosshair customization (R1Q2/Q2Pro feature)
//
// A HUD-rendering collaborator: the drawing itself goes through
// draw_fill, an out-of-scope renderer call, so only the cvar-driven
// configuration state is kept here; the shapes are stubbed.

use std::sync::{LazyLock, Mutex};

use myq2_common::common::com_printf;

/// Crosshair styles
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i32)]
pub enum CrosshairStyle {
    None = 0,
    Cross = 1,
    Dot = 2,
    Circle = 3,
    CrossDot = 4,
    XShape = 5,
    Image = 6,
}

impl From<i32> for CrosshairStyle {
    fn from(value: i32) -> Self {
        match value {
            0 => CrosshairStyle::None,
            1 => CrosshairStyle::Cross,
            2 => CrosshairStyle::Dot,
            3 => CrosshairStyle::Circle,
            4 => CrosshairStyle::CrossDot,
            5 => CrosshairStyle::XShape,
            _ => CrosshairStyle::Image,
        }
    }
}

/// Crosshair configuration
#[derive(Clone)]
pub struct CrosshairConfig {
    pub style: CrosshairStyle,
    pub size: f32,
    pub color: i32,
    pub alpha: f32,
    pub gap: i32,
    pub thickness: i32,
    pub dynamic: bool,
    pub expansion: f32,
    /// Enable health-based crosshair color (R1Q2/Q2Pro ch_health)
    pub ch_health: bool,
}

impl Default for CrosshairConfig {
    fn default() -> Self {
        Self {
            style: CrosshairStyle::Cross,
            size: 1.0,
            color: 0xf0,
            alpha: 1.0,
            gap: 2,
            thickness: 2,
            dynamic: false,
            expansion: 0.0,
            ch_health: false,
        }
    }
}

impl CrosshairConfig {
    /// Update configuration from cvar values
    pub fn update_from_cvars(&mut self) {
        use myq2_common::cvar::cvar_variable_value;

        let style_val = cvar_variable_value("crosshair") as i32;
        if style_val >= 1 && style_val <= 5 {
            self.style = CrosshairStyle::from(style_val);
        } else if style_val > 5 {
            self.style = CrosshairStyle::Image;
        } else {
            self.style = CrosshairStyle::None;
        }

        self.size = cvar_variable_value("crosshair_size").clamp(0.5, 4.0);
        self.color = cvar_variable_value("crosshair_color") as i32;
        self.alpha = cvar_variable_value("crosshair_alpha").clamp(0.0, 1.0);
        self.gap = cvar_variable_value("crosshair_gap") as i32;
        self.thickness = (cvar_variable_value("crosshair_thickness") as i32).clamp(1, 8);
        self.dynamic = cvar_variable_value("crosshair_dynamic") != 0.0;
        self.ch_health = cvar_variable_value("ch_health") != 0.0;
    }

    /// Health-based colors (R1Q2/Q2Pro ch_health): green >66, yellow 33-66, red <33
    pub fn get_effective_color(&self, health: Option<i32>) -> i32 {
        if !self.ch_health {
            return self.color;
        }
        match health {
            Some(h) if h > 66 => 0xd0,
            Some(h) if h >= 33 => 0xe0,
            Some(_) => 0xf2,
            None => self.color,
        }
    }

    pub fn update_dynamic(&mut self, moving: bool, attacking: bool, delta_time: f32) {
        if !self.dynamic {
            self.expansion = 0.0;
            return;
        }
        let target = if attacking { 1.0 } else if moving { 0.5 } else { 0.0 };
        let speed = if target > self.expansion { 15.0 } else { 8.0 };
        self.expansion += (target - self.expansion) * speed * delta_time;
        self.expansion = self.expansion.clamp(0.0, 1.0);
    }

    fn effective_gap(&self) -> i32 {
        let base = (self.gap as f32 * self.size) as i32;
        let expansion_add = (self.expansion * 8.0 * self.size) as i32;
        base + expansion_add
    }

    fn effective_thickness(&self) -> i32 {
        ((self.thickness as f32) * self.size).max(1.0) as i32
    }

    /// Draw the crosshair at the given center position. Rendering is an
    /// out-of-scope collaborator; this is a no-op stub.
    pub fn draw(&self, _center_x: i32, _center_y: i32) {}

    pub fn draw_with_health(&self, _center_x: i32, _center_y: i32, _health: Option<i32>) {}
}

/// Global crosshair configuration
pub static CROSSHAIR_CONFIG: LazyLock<Mutex<CrosshairConfig>> =
    LazyLock::new(|| Mutex::new(CrosshairConfig::default()));

/// Check if the current crosshair style is procedural (not image-based)
pub fn crosshair_is_procedural() -> bool {
    let config = CROSSHAIR_CONFIG.lock().unwrap();
    config.style != CrosshairStyle::None && config.style != CrosshairStyle::Image
}

pub fn crosshair_update_config() {
    let mut config = CROSSHAIR_CONFIG.lock().unwrap();
    config.update_from_cvars();
}

pub fn crosshair_update_dynamic(moving: bool, attacking: bool, delta_time: f32) {
    let mut config = CROSSHAIR_CONFIG.lock().unwrap();
    config.update_dynamic(moving, attacking, delta_time);
}

pub fn crosshair_draw(center_x: i32, center_y: i32) {
    let config = CROSSHAIR_CONFIG.lock().unwrap();
    config.draw(center_x, center_y);
}

pub fn crosshair_draw_with_health(center_x: i32, center_y: i32, health: i32) {
    let config = CROSSHAIR_CONFIG.lock().unwrap();
    config.draw_with_health(center_x, center_y, Some(health));
}

pub fn crosshair_health_enabled() -> bool {
    let config = CROSSHAIR_CONFIG.lock().unwrap();
    config.ch_health
}

pub fn cmd_crosshair_info() {
    let config = CROSSHAIR_CONFIG.lock().unwrap();
    com_printf(&format!(
        "Crosshair Info:\n  Style: {:?}\n  Size: {:.1}x\n  Color: {}\n  Alpha: {:.2}\n  Gap: {}\n  Thickness: {}\n  Dynamic: {}\n  Health-based (ch_health): {}\n",
        config.style,
        config.size,
        config.color,
        config.alpha,
        config.gap,
        config.thickness,
        if config.dynamic { "yes" } else { "no" },
        if config.ch_health { "yes" } else { "no" }
    ));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_crosshair_style_from_int() {
        assert_eq!(CrosshairStyle::from(0), CrosshairStyle::None);
        assert_eq!(CrosshairStyle::from(1), CrosshairStyle::Cross);
        assert_eq!(CrosshairStyle::from(2), CrosshairStyle::Dot);
        assert_eq!(CrosshairStyle::from(5), CrosshairStyle::XShape);
        assert_eq!(CrosshairStyle::from(10), CrosshairStyle::Image);
    }

    #[test]
    fn test_effective_values() {
        let mut config = CrosshairConfig::default();
        assert_eq!(config.effective_gap(), 2);
        assert_eq!(config.effective_thickness(), 2);
        config.size = 2.0;
        assert_eq!(config.effective_gap(), 4);
        assert_eq!(config.effective_thickness(), 4);
    }

    #[test]
    fn test_dynamic_expansion() {
        let mut config = CrosshairConfig::default();
        config.dynamic = true;
        config.update_dynamic(false, true, 0.1);
        assert!(config.expansion > 0.0);
        config.update_dynamic(false, false, 1.0);
    }

    #[test]
    fn test_ch_health_color() {
        let mut config = CrosshairConfig::default();
        assert_eq!(config.get_effective_color(Some(100)), config.color);
        assert_eq!(config.get_effective_color(Some(50)), config.color);
        assert_eq!(config.get_effective_color(Some(10)), config.color);

        config.ch_health = true;
        assert_eq!(config.get_effective_color(Some(100)), 0xd0);
        assert_eq!(config.get_effective_color(Some(67)), 0xd0);
        assert_eq!(config.get_effective_color(Some(66)), 0xe0);
        assert_eq!(config.get_effective_color(Some(50)), 0xe0);
        assert_eq!(config.get_effective_color(Some(33)), 0xe0);
        assert_eq!(config.get_effective_color(Some(32)), 0xf2);
        assert_eq!(config.get_effective_color(Some(10)), 0xf2);
        assert_eq!(config.get_effective_color(Some(0)), 0xf2);
        assert_eq!(config.get_effective_color(None), config.color);
    }
}
