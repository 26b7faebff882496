use cmdline_core::info::info_server::Info;
use cmdline_core::info::{HookPoint, InfoParams, InfoResult};
use cmdline_core::{HOOK_VERSION, ON_DEFINE_DOMAIN_HOOK_POINT};
use tonic::{Request, Response, Status};

pub const HOOK_NAME: &str = "commandline";

const HOOK_PRIORITY: i32 = 0;

#[derive(Default)]
pub struct InfoService;

#[tonic::async_trait]
impl Info for InfoService {
    async fn info(&self, request: Request<InfoParams>) -> Result<Response<InfoResult>, Status> {
        tracing::debug!(
            "Info hook callback method has been called (host supports {:?})",
            request.get_ref().supported_info_versions
        );

        let response = InfoResult {
            name: HOOK_NAME.to_string(),
            versions: vec![HOOK_VERSION.to_string()],
            hook_points: vec![HookPoint {
                name: ON_DEFINE_DOMAIN_HOOK_POINT.to_string(),
                priority: HOOK_PRIORITY,
            }],
        };
        Ok(Response::new(response))
    }
}
