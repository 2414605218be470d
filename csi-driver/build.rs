fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Identity and Node services of CSI v1, server side only
    tonic_prost_build::configure()
        .build_server(true)
        .build_client(false)
        .compile_protos(&["../proto/csi.proto"], &["../proto"])?;

    Ok(())
}
