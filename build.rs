use prost::Message;
use std::path::PathBuf;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let out_dir = PathBuf::from(std::env::var("OUT_DIR")?);

    let descriptors = protox::compile(["frames.proto"], ["proto"])?;
    std::fs::write(
        out_dir.join("frames_descriptor.bin"),
        descriptors.encode_to_vec(),
    )?;

    prost_build::Config::new().compile_fds(descriptors)?;

    println!("cargo:rerun-if-changed=proto/frames.proto");
    Ok(())
}
