// Protobuf types generated from `proto/frames.proto` (package `pipecat`)

include!(concat!(env!("OUT_DIR"), "/pipecat.rs"));

/// Encoded `FileDescriptorSet` the types above were generated from
pub const FILE_DESCRIPTOR_SET: &[u8] =
    include_bytes!(concat!(env!("OUT_DIR"), "/frames_descriptor.bin"));

pub(crate) const PACKAGE: &str = "pipecat";
