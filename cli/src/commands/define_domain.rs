use cmdline_core::connect_unix;
use cmdline_core::v1alpha2::callbacks_client::CallbacksClient;
use cmdline_core::v1alpha2::OnDefineDomainParams;
use std::path::Path;

pub async fn define_domain(
    socket: &Path,
    vmi: &Path,
    domain: &Path,
) -> Result<(), Box<dyn std::error::Error>> {
    let vmi = tokio::fs::read(vmi)
        .await
        .map_err(|e| format!("Failed to read {}: {}", vmi.display(), e))?;
    let domain_xml = tokio::fs::read(domain)
        .await
        .map_err(|e| format!("Failed to read {}: {}", domain.display(), e))?;

    let channel = connect_unix(socket).await.map_err(|e| {
        format!(
            "Failed to connect to hook at {}: {}. Is the sidecar running?",
            socket.display(),
            e
        )
    })?;

    tracing::debug!("Sending {} bytes of domain XML", domain_xml.len());
    let response = CallbacksClient::new(channel)
        .on_define_domain(OnDefineDomainParams { domain_xml, vmi })
        .await
        .map_err(|e| format!("OnDefineDomain failed: {}", e.message()))?;

    println!("{}", String::from_utf8_lossy(&response.into_inner().domain_xml));

    Ok(())
}
