// cl_inv.rs -- client inventory screen
// Converted from: myq2-original/client/cl_inv.c

use crate::cl_scrn::ScrState;
use crate::client::*;
use crate::console::{msg_read_short, VidDef};
use myq2_common::q_shared::*;

pub const DISPLAY_ITEMS: i32 = 17;

// ============================================================
// CL_ParseInventory
// ============================================================

pub fn cl_parse_inventory(cl: &mut ClientState) {
    for i in 0..MAX_ITEMS {
        cl.inventory[i] = msg_read_short();
    }
}

// ============================================================
// CL_DrawInventory
//
// Inventory HUD rendering is an out-of-scope UI collaborator; this stub
// preserves the call site in cl_scrn.rs without the teacher's drawing.
// ============================================================

pub fn cl_draw_inventory(
    _scr: &mut ScrState,
    _cls: &ClientStatic,
    _cl: &ClientState,
    _viddef: &VidDef,
) {
}
