//! Audio output and frame decoding

pub mod decode;
pub mod output;

pub use decode::FrameDecoder;
pub use output::{AudioSink, CpalOutput, DeviceInfo};
