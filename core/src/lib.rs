//! gRPC definitions of the KubeVirt hook protocol.

pub mod info {
    tonic::include_proto!("kubevirt.hooks.info");
}

pub mod v1alpha2 {
    tonic::include_proto!("kubevirt.hooks.v1alpha2");
}

mod transport;

pub use transport::connect_unix;

/// Directory virt-launcher scans for hook sockets.
pub const HOOK_SOCKETS_DIR: &str = "/var/run/kubevirt-hooks";

/// Callback API version implemented by this sidecar.
pub const HOOK_VERSION: &str = "v1alpha2";

pub const ON_DEFINE_DOMAIN_HOOK_POINT: &str = "OnDefineDomain";
