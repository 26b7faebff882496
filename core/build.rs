fn main() -> Result<(), Box<dyn std::error::Error>> {
    tonic_build::configure().compile_protos(
        &["../proto/info.proto", "../proto/api_v1alpha2.proto"],
        &["../proto"],
    )?;
    Ok(())
}
