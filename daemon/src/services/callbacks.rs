use cmdline_core::v1alpha2::callbacks_server::Callbacks;
use cmdline_core::v1alpha2::{
    OnDefineDomainParams, OnDefineDomainResult, PreCloudInitIsoParams, PreCloudInitIsoResult,
};
use cmdline_domain::InjectionError;
use tonic::{Request, Response, Status};

#[derive(Default)]
pub struct CallbacksService;

#[tonic::async_trait]
impl Callbacks for CallbacksService {
    async fn on_define_domain(
        &self,
        request: Request<OnDefineDomainParams>,
    ) -> Result<Response<OnDefineDomainResult>, Status> {
        tracing::info!("OnDefineDomain hook callback method has been called");
        let req = request.into_inner();

        let injection = cmdline_domain::define_domain(&req.vmi, &req.domain_xml).map_err(|e| {
            tracing::error!("Failed to update domain XML: {}", e);
            into_status(e)
        })?;

        let vmi = injection.vmi.as_deref().unwrap_or("<unknown>");
        if injection.injected.is_empty() {
            tracing::info!(
                "No command-line annotations on VMI {}, domain XML left unchanged",
                vmi
            );
        } else {
            tracing::info!(
                "Appended {} QEMU argument(s) for VMI {} after {} existing: {:?}",
                injection.injected.len(),
                vmi,
                injection.existing,
                injection.injected
            );
        }

        Ok(Response::new(OnDefineDomainResult {
            domain_xml: injection.domain_xml.into_bytes(),
        }))
    }

    async fn pre_cloud_init_iso(
        &self,
        request: Request<PreCloudInitIsoParams>,
    ) -> Result<Response<PreCloudInitIsoResult>, Status> {
        tracing::info!("PreCloudInitIso hook callback method has been called");
        let req = request.into_inner();

        Ok(Response::new(PreCloudInitIsoResult {
            cloud_init_data: req.cloud_init_data,
        }))
    }
}

fn into_status(e: InjectionError) -> Status {
    match e {
        InjectionError::Parse(_) | InjectionError::Decoding(_) => {
            Status::invalid_argument(e.to_string())
        }
        InjectionError::Path(_) => Status::failed_precondition(e.to_string()),
    }
}
