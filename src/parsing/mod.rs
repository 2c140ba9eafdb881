pub mod decoder;
pub mod timestamp;

pub use decoder::{
    DecodedBlock, SamplingRateWarning, calibrate_axis, decode_payload, light_value,
    reconcile_sampling_rate, signed_axis,
};
pub use timestamp::{BlockTime, TimeOfDay, block_timestamps, expand_timestamps};
