use std::sync::Arc;

use axum::{extract::State, routing::get, Json, Router};
use csas_netbanking::{BindingProvider, CycleState};
use serde::Serialize;
use tower_http::trace::TraceLayer;

use crate::{
    bus::ItemState,
    main_lib::{AppState, LastCycle},
};

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct HealthStatus {
    status: &'static str,
    authenticated: bool,
    cycle_state: CycleState,
    entities: usize,
    bound_items: usize,
    last_cycle: Option<LastCycle>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct EntityView {
    id: String,
    label: String,
    bound: bool,
}

async fn health(State(state): State<Arc<AppState>>) -> Json<HealthStatus> {
    Json(HealthStatus {
        status: "ok",
        authenticated: state.engine.tokens().is_authenticated(),
        cycle_state: state.engine.state(),
        entities: state.engine.entities().len(),
        bound_items: state.items.len(),
        last_cycle: state.last_cycle(),
    })
}

async fn list_items(State(state): State<Arc<AppState>>) -> Json<Vec<ItemState>> {
    Json(state.bus.snapshot())
}

async fn list_entities(State(state): State<Arc<AppState>>) -> Json<Vec<EntityView>> {
    let entities = state
        .engine
        .entities()
        .entities()
        .into_iter()
        .map(|entity| EntityView {
            bound: state.items.is_bound(&entity.id),
            id: entity.id,
            label: entity.label,
        })
        .collect();
    Json(entities)
}

pub fn app_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/api/v1/health", get(health))
        .route("/api/v1/items", get(list_items))
        .route("/api/v1/entities", get(list_entities))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
