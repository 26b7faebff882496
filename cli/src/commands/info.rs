use cmdline_core::connect_unix;
use cmdline_core::info::info_client::InfoClient;
use cmdline_core::info::InfoParams;
use cmdline_core::HOOK_VERSION;
use std::path::Path;

pub async fn info(socket: &Path) -> Result<(), Box<dyn std::error::Error>> {
    let channel = connect_unix(socket).await.map_err(|e| {
        format!(
            "Failed to connect to hook at {}: {}. Is the sidecar running?",
            socket.display(),
            e
        )
    })?;

    let response = InfoClient::new(channel)
        .info(InfoParams {
            supported_info_versions: vec![HOOK_VERSION.to_string()],
        })
        .await
        .map_err(|e| format!("Info call failed: {}", e))?;

    let info = response.into_inner();

    println!("Hook: {}", info.name);
    println!("  Versions: {}", info.versions.join(", "));
    println!("  Hook points:");
    for point in info.hook_points {
        println!("    {} (priority {})", point.name, point.priority);
    }

    Ok(())
}
