use crate::features::transport::{ApiRequest, ApiService};
use crate::shared::context::RequestContext;
use crate::shared::error::{MachinesError, MachinesResult};
use crate::shared::types::{
    CreateMachineRequest, DeleteMachineRequest, ListMachinesRequest, Machine, StopMachineRequest,
};
use std::sync::Arc;
use tracing::info;

/// CRUD calls for machines. Every call is a fresh remote read or write;
/// nothing is cached between calls.
pub struct MachineService {
    api: Arc<ApiService>,
}

impl MachineService {
    pub fn new(api: Arc<ApiService>) -> Self {
        Self { api }
    }

    /// List machines in the app, optionally keeping only those in one state.
    pub async fn list(
        &self,
        ctx: &RequestContext,
        request: ListMachinesRequest,
    ) -> MachinesResult<Vec<Machine>> {
        let machines: Vec<Machine> = self
            .api
            .fetch_json(ctx, ApiRequest::get(&["machines"]))
            .await?;

        Ok(match request.state {
            Some(state) => machines.into_iter().filter(|m| m.state == state).collect(),
            None => machines,
        })
    }

    pub async fn get(&self, ctx: &RequestContext, machine_id: &str) -> MachinesResult<Machine> {
        if machine_id.is_empty() {
            return Err(MachinesError::MachineIdRequired);
        }

        self.api
            .fetch_json(ctx, ApiRequest::get(&["machines", machine_id]))
            .await
    }

    pub async fn create(
        &self,
        ctx: &RequestContext,
        request: CreateMachineRequest,
    ) -> MachinesResult<Machine> {
        let api_request = ApiRequest::post(&["machines"]).json(&request)?;
        let machine: Machine = self.api.fetch_json(ctx, api_request).await?;

        info!(
            machine_id = %machine.id,
            instance_id = %machine.instance_id,
            region = %machine.region,
            "Machine created"
        );

        Ok(machine)
    }

    pub async fn stop(&self, ctx: &RequestContext, request: StopMachineRequest) -> MachinesResult<()> {
        request.validate()?;

        let api_request =
            ApiRequest::post(&["machines", request.machine_id.as_str(), "stop"])
                .json(&request.body())?;
        self.api.fetch_empty(ctx, api_request).await?;

        info!(machine_id = %request.machine_id, "Machine stop requested");

        Ok(())
    }

    pub async fn delete(
        &self,
        ctx: &RequestContext,
        request: DeleteMachineRequest,
    ) -> MachinesResult<()> {
        request.validate()?;

        let mut api_request = ApiRequest::delete(&["machines", request.machine_id.as_str()]);
        if request.kill {
            api_request = api_request.query("kill", "true");
        }
        self.api.fetch_empty(ctx, api_request).await?;

        info!(machine_id = %request.machine_id, kill = request.kill, "Machine deleted");

        Ok(())
    }
}
