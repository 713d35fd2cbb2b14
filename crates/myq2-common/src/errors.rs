// Typed error kinds for the wire protocol and map loader.
//
// The core never panics on data that arrived over the network or was read
// from a map file someone else generated; it reports one of these instead.
// A decoder that hits a genuinely impossible internal state (a caller
// passing an index the loader itself never produced) may still panic —
// that's a programmer bug, not a WireError.

use thiserror::Error;

/// Failure decoding a single packet or entity delta. Fatal for the frame
/// (`Overflow`, `Invalid`) or merely advisory (`StaleDeltaBase`) — see
/// the frame assembler for how each variant is handled.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum WireError {
    /// A decoder was asked for more bytes than remain in the buffer.
    #[error("message overflow while reading {0}")]
    Overflow(&'static str),

    /// A value arrived within range syntactically but violates a protocol
    /// invariant (entity number out of range, unexpected command byte,
    /// area_bits length overruns the packet, portal index out of range).
    #[error("invalid wire data: {0}")]
    Invalid(&'static str),

    /// The frame's delta base is missing or has been overwritten in the
    /// frame ring. Not fatal: the frame is marked invalid and a keyframe
    /// is requested.
    #[error("stale delta base (reference frame no longer available)")]
    StaleDeltaBase,
}

/// Failure loading a BSP map file. Always fatal for the load; the caller
/// that initiated it decides what to do next (usually disconnect).
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum MapLoadError {
    #[error("bad BSP ident (expected IBSP or QBSP)")]
    BadIdent,

    #[error("bad BSP version: found {found}, want {want}")]
    BadVersion { found: i32, want: i32 },

    #[error("lump '{lump}' malformed: {reason}")]
    LumpMalformed { lump: &'static str, reason: String },

    #[error("lump '{lump}' index out of range")]
    LumpOutOfRange { lump: &'static str },

    #[error("map leaf 0 is not solid")]
    Leaf0NotSolid,

    #[error("map has no empty leaf")]
    NoEmptyLeaf,

    #[error("not enough room to append the box hull to the loaded map")]
    TooManyBoxHullEntries,

    #[error("truncated BSP file (header too short)")]
    Truncated,
}
