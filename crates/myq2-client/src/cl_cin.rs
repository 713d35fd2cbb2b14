// cl_cin.rs — client cinematics (.cin video playback)
//
// Decoding and rendering .cin video/audio is a UI/media collaborator
// out of scope here; kept as the interface cl_main.rs/cl_parse.rs call.
// Nothing is ever actually playing, so the draw/run/stop/finish paths
// are no-ops against cl.cinematictime.

use myq2_common::common::{com_printf, msg_write_byte};

use crate::client::{ClientState, ClientStatic};

/// SCR_StopCinematic
pub fn scr_stop_cinematic(cl: &mut ClientState, _cls: &mut ClientStatic) {
    cl.cinematictime = 0;
    cl.cinematic_file = None;
    cl.cinematicpalette_active = false;
}

/// SCR_FinishCinematic — tell the server to advance to the next map/cinematic.
pub fn scr_finish_cinematic(cls: &mut ClientStatic, cl: &ClientState) {
    msg_write_byte(&mut cls.netchan.message, myq2_common::qcommon::CLC_STRINGCMD as i32);
    cls.netchan.message.print(&format!("nextserver {}\n", cl.servercount));
}

/// SCR_RunCinematic — cinematic playback is not implemented; always stops.
pub fn scr_run_cinematic(cl: &mut ClientState, cls: &mut ClientStatic) {
    if cl.cinematictime > 0 {
        scr_stop_cinematic(cl, cls);
    }
}

/// SCR_DrawCinematic — returns true while a cinematic slot is active, meaning
/// view rendering should be skipped (even though nothing is drawn for it).
pub fn scr_draw_cinematic(cl: &mut ClientState, _cls: &ClientStatic) -> bool {
    cl.cinematictime > 0
}

/// SCR_PlayCinematic — cinematics are not supported; immediately advance.
pub fn scr_play_cinematic(arg: &str, cl: &mut ClientState, cls: &mut ClientStatic) {
    com_printf(&format!("Cinematics are not supported: {}\n", arg));
    cl.cinematictime = 0;
    scr_finish_cinematic(cls, cl);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stop_cinematic_resets_state() {
        let mut cl = ClientState::default();
        let mut cls = ClientStatic::default();
        cl.cinematictime = 5000;
        cl.cinematicpalette_active = true;

        scr_stop_cinematic(&mut cl, &mut cls);

        assert_eq!(cl.cinematictime, 0);
        assert!(!cl.cinematicpalette_active);
    }

    #[test]
    fn test_draw_cinematic_reflects_time() {
        let mut cl = ClientState::default();
        let cls = ClientStatic::default();

        cl.cinematictime = 0;
        assert!(!scr_draw_cinematic(&mut cl, &cls));

        cl.cinematictime = 1000;
        assert!(scr_draw_cinematic(&mut cl, &cls));
    }

    #[test]
    fn test_play_cinematic_advances_immediately() {
        let mut cl = ClientState::default();
        let mut cls = ClientStatic::default();

        scr_play_cinematic("intro.cin", &mut cl, &mut cls);
        assert_eq!(cl.cinematictime, 0);
    }
}
