//! Historical `anorms.h` table, re-derived.
//!
//! `common.rs` reaches the 162-entry unit-direction table through this path
//! for API compatibility with the teacher's old global `bytedirs[]`; `msg.rs`
//! includes the same generator for its own `Dir` codec. Both instantiate the
//! identical deterministic Fibonacci-lattice table from `bytedirs.rs`, so the
//! two copies always agree bit-for-bit.

use crate::math::Vec3;

pub const NUMVERTEXNORMALS: usize = 162;

include!("bytedirs.rs");
