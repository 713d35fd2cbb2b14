// menu.rs — Menu system
//
// The in-game UI (main menu, load/save, server browser, options screens)
// is a display/input collaborator out of scope here; the qmenu widget
// toolkit and every per-screen draw/key handler are dropped. What's kept
// is the call surface cl_main.rs/console.rs/keys.rs use: menu state stays
// "off" (key_dest never enters Menu), server list tracking still works
// since nothing else reads it through rendering, and all `menu_*` console
// commands remain registered so typing them doesn't error, just reports
// that the menu is unavailable.

use crate::client::KeyDest;
use crate::console::{cmd_add_command, cvar_set, CLS};
use crate::keys::key_clear_states;

pub const MAX_LOCAL_SERVERS: usize = 8;

/// Force the menu off.
pub fn m_force_menu_off() {
    // SAFETY: single-threaded engine
    unsafe {
        CLS.key_dest = KeyDest::Game;
        key_clear_states();
        cvar_set("paused", "0");
    }
}

// ============================================================
// Server list for the Join Server menu
// ============================================================

static mut M_NUM_SERVERS: usize = 0;
static mut LOCAL_SERVER_NAMES: [[u8; 80]; MAX_LOCAL_SERVERS] = [[0u8; 80]; MAX_LOCAL_SERVERS];

/// Add a server to the local server list (used by the Join Server menu).
pub fn m_add_to_server_list(info: &str) {
    // SAFETY: single-threaded engine, mirrors original C static globals
    unsafe {
        if M_NUM_SERVERS == MAX_LOCAL_SERVERS {
            return;
        }

        let trimmed = info.trim_start();

        // ignore if duplicated
        for i in 0..M_NUM_SERVERS {
            let existing = std::str::from_utf8(&LOCAL_SERVER_NAMES[i])
                .unwrap_or("")
                .trim_end_matches('\0');
            if existing == trimmed {
                return;
            }
        }

        let bytes = trimmed.as_bytes();
        let copy_len = bytes.len().min(79);
        LOCAL_SERVER_NAMES[M_NUM_SERVERS][..copy_len].copy_from_slice(&bytes[..copy_len]);
        LOCAL_SERVER_NAMES[M_NUM_SERVERS][copy_len] = 0;
        M_NUM_SERVERS += 1;
    }
}

// ============================================================
// Menu commands — all screens are unavailable, but the commands
// stay registered so binds/scripts referencing them don't error.
// ============================================================

fn menu_unavailable() {
    myq2_common::common::com_printf("Menu UI is not supported.\n");
}

pub fn m_menu_main_f() { menu_unavailable(); }
fn m_menu_game_f() { menu_unavailable(); }
fn m_menu_load_game_f() { menu_unavailable(); }
fn m_menu_save_game_f() { menu_unavailable(); }
fn m_menu_join_server_f() { menu_unavailable(); }
fn m_menu_address_book_f() { menu_unavailable(); }
fn m_menu_start_server_f() { menu_unavailable(); }
fn m_menu_dm_options_f() { menu_unavailable(); }
fn m_menu_player_config_f() { menu_unavailable(); }
fn m_menu_download_options_f() { menu_unavailable(); }
fn m_menu_credits_f() { menu_unavailable(); }
fn m_menu_multiplayer_f() { menu_unavailable(); }
fn m_menu_video_f() { menu_unavailable(); }
fn m_menu_options_f() { menu_unavailable(); }
fn m_menu_keys_f() { menu_unavailable(); }
fn m_menu_quit_f() { crate::cl_main::cl_quit_f(); }

/// Initialize the menu subsystem.
pub fn m_init() {
    cmd_add_command("menu_main", m_menu_main_f);
    cmd_add_command("menu_game", m_menu_game_f);
    cmd_add_command("menu_loadgame", m_menu_load_game_f);
    cmd_add_command("menu_savegame", m_menu_save_game_f);
    cmd_add_command("menu_joinserver", m_menu_join_server_f);
    cmd_add_command("menu_addressbook", m_menu_address_book_f);
    cmd_add_command("menu_startserver", m_menu_start_server_f);
    cmd_add_command("menu_dmoptions", m_menu_dm_options_f);
    cmd_add_command("menu_playerconfig", m_menu_player_config_f);
    cmd_add_command("menu_downloadoptions", m_menu_download_options_f);
    cmd_add_command("menu_credits", m_menu_credits_f);
    cmd_add_command("menu_multiplayer", m_menu_multiplayer_f);
    cmd_add_command("menu_video", m_menu_video_f);
    cmd_add_command("menu_options", m_menu_options_f);
    cmd_add_command("menu_keys", m_menu_keys_f);
    cmd_add_command("menu_quit", m_menu_quit_f);
}

/// Draw the current menu. Nothing is ever pushed onto the menu stack, so
/// this is a no-op; kept as the call surface console.rs's m_draw wrapper uses.
pub fn m_draw() {}

/// Handle a key press while in menu mode. No menu is ever active.
pub fn m_keydown(_key: i32) {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_add_to_server_list_dedup() {
        unsafe {
            M_NUM_SERVERS = 0;
            LOCAL_SERVER_NAMES = [[0u8; 80]; MAX_LOCAL_SERVERS];
        }
        m_add_to_server_list("10.0.0.1:27910");
        m_add_to_server_list("10.0.0.1:27910");
        unsafe {
            assert_eq!(M_NUM_SERVERS, 1);
        }
    }

    #[test]
    fn test_add_to_server_list_caps_at_max() {
        unsafe {
            M_NUM_SERVERS = 0;
            LOCAL_SERVER_NAMES = [[0u8; 80]; MAX_LOCAL_SERVERS];
        }
        for i in 0..(MAX_LOCAL_SERVERS + 3) {
            m_add_to_server_list(&format!("10.0.0.{}:27910", i));
        }
        unsafe {
            assert_eq!(M_NUM_SERVERS, MAX_LOCAL_SERVERS);
        }
    }

    #[test]
    fn test_m_draw_noop_outside_menu() {
        m_draw();
    }
}
