//! Transport layer: wire framing, request settlement, and the stdio loop.

pub mod framing;
pub mod router;
pub mod stdio;

pub use framing::{encode_frame, FrameCodec, MAX_FRAME_BYTES};
pub use router::{Outbound, RequestRouter, REQUEST_TIMEOUT};
pub use stdio::StdioTransport;
