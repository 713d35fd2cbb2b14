// cl_loc.rs -- named map locations for chat macros
//
// A UI/chat collaborator, not part of the game-state pipeline: loads
// locs/<mapname>.loc files and answers "what's the nearest named spot"
// for $loc_here expansion and the loc* console commands. Stubbed to the
// interface the core calls; no file I/O or lookup logic survives here.

use myq2_common::common::com_printf;
use myq2_common::q_shared::Vec3;

/// Load locations for the given map. No-op: location files are not read.
pub fn loc_load_map(_mapname: &str, _gamedir: &str) {}

/// Clear the location database. Call this on disconnect.
pub fn loc_clear() {}

/// loc - Show location info
pub fn cmd_loc(_player_pos: Vec3) {
    com_printf("No locations loaded.\n");
}

/// loclist - List all locations on current map
pub fn cmd_loclist() {
    com_printf("No locations loaded.\n");
}

/// locadd <name> - Add a location at the player's current position
pub fn cmd_locadd(_name: &str, _player_pos: Vec3, _gamedir: &str) {
    com_printf("Locations are not supported.\n");
}

/// locdel <index> - Delete a location by index (1-based)
pub fn cmd_locdel(_index_str: &str) {
    com_printf("Locations are not supported.\n");
}

/// locsave - Save all locations to file
pub fn cmd_locsave(_gamedir: &str) {
    com_printf("Locations are not supported.\n");
}
