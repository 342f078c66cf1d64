//! The sample-with-NAL-units record the driver emits downstream.

use crate::nal::NalUnit;

/// One decoded video sample: its timestamps, keyframe flag, and the NAL
/// units the [`crate::nal`] framer split it into.
#[derive(Debug, Clone)]
pub struct Sample {
    pub dts: i64,
    pub pts: i64,
    pub cts: i32,
    pub is_keyframe: bool,
    pub length: u32,
    pub nal_units: Vec<NalUnit>,
}
