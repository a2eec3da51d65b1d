//! Trigger resolution: which block a run starts from and with what input.

pub mod input;
mod resolver;

pub use input::{input_from_format, mock_payload, INPUT_FORMAT_FIELD, SAMPLE_PAYLOAD_FIELD};
pub use resolver::{ExecutionSource, ResolvedTrigger, TriggerResolver};
