// cl_part.rs — Particle type constants
// Converted from: myq2-original/client/cl_part.c
//
// The particle system implementation lives in cl_fx.rs (ClFxState).
// This module re-exports the particle type constants for backward compatibility.

pub use myq2_common::q_shared::{PT_DEFAULT, PT_FIRE, PT_SMOKE, PT_BUBBLE, PT_BLOOD, PT_MAX};
