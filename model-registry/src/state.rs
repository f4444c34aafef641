use std::sync::Arc;

use crate::{observe::Telemetry, service::ModelService};

/// Shared state handed to every REST handler.
#[derive(Clone)]
pub struct AppState {
    pub service: Arc<dyn ModelService>,
    pub telemetry: Telemetry,
}

impl AppState {
    pub fn new(service: Arc<dyn ModelService>, telemetry: Telemetry) -> Self {
        Self { service, telemetry }
    }
}
