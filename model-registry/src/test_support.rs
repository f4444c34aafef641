//! Fixtures shared by the adapter tests.

use std::sync::Arc;

use axum::Router;

use crate::{
    observe::Telemetry,
    repository::InMemoryModelRepository,
    router,
    service::{ModelService, RegistryService},
    state::AppState,
};

pub fn registry_service() -> (Arc<dyn ModelService>, Telemetry) {
    let telemetry = Telemetry::detached();
    let repo = Arc::new(InMemoryModelRepository::new());
    let service = Arc::new(RegistryService::new(repo, telemetry.clone()));
    (service, telemetry)
}

/// The full REST stack over an in-memory repository.
pub fn rest_app() -> (Router, AppState) {
    let (service, telemetry) = registry_service();
    let state = AppState::new(service, telemetry);
    let app = router::app_router(&state).with_state(state.clone());
    (app, state)
}
