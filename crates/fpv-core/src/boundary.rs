//! Trait boundaries between the wire-transport core and the opaque
//! collaborators this repo excludes from its scope: camera
//! capture, the hardware H.264 encoder/decoder, and GPU-side presentation.
//!
//! Each trait is the *contract* at that boundary only — the transport core
//! depends on nothing beyond these method signatures. `fpv-sender` and
//! `fpv-receiver` carry minimal software stand-ins (see their `camera`,
//! `encoder`, `decoder`, and `presenter` modules) so the workspace builds
//! and its tests exercise the core end to end without real capture or
//! codec hardware.

use bytes::Bytes;

use crate::errors::FpvError;
use crate::types::{AccessUnit, DecodedFrame, EncodedAccessUnit};

/// One raw frame handed from a `Camera` to an `Encoder`. Pixel layout is
/// an agreement between the two; the core never inspects `data`.
#[derive(Debug, Clone)]
pub struct CapturedFrame {
    pub data: Bytes,
    pub width: u32,
    pub height: u32,
    pub timestamp_us: u64,
}

/// Produces raw frames. The spec documents two deployment variants (direct
/// V4L2 capture vs. spawning an external process that pipes H.264) as an
/// open question with no recommendation; both satisfy this single trait.
pub trait Camera: Send {
    fn capture(&mut self) -> Result<CapturedFrame, FpvError>;
}

/// Hardware-backed (or software stand-in) H.264 encoder. `force_idr` is set
/// by the sender's pacing loop in response to a received `IDR_REQUEST`.
pub trait Encoder: Send {
    fn encode(&mut self, frame: &CapturedFrame, force_idr: bool) -> Result<EncodedAccessUnit, FpvError>;
}

/// Hardware-backed (or software stand-in) H.264 decoder. The core's one
/// hard requirement: callers MUST feed every assembled `AccessUnit` in
/// receipt order, never just the keyframes, since P-frame decode depends
/// on contiguous reference state.
pub trait Decoder: Send {
    fn decode(&mut self, au: &AccessUnit) -> Result<DecodedFrame, FpvError>;
}

/// Consumes decoded frames for display. Driven by the presenter's own
/// cadence (e.g. a display refresh callback), not by packet arrival.
pub trait Presenter: Send {
    fn submit(&mut self, frame: DecodedFrame) -> Result<(), FpvError>;
}
