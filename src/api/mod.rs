// HTTP API routes over the build optimizer.

use std::time::Duration;

use axum::{
    extract::{Json, Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::get,
    Router,
};
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::catalog::{Catalog, ItemId, SlotType, TokenCost};
use crate::error::OptimizeError;
use crate::metrics;
use crate::optimizer::{Build, Optimizer, Ranking};

// ── Request types ─────────────────────────────────────────────────────

#[derive(Deserialize)]
pub struct OptimizeParams {
    pub archetype: String,
    #[serde(default)]
    pub query: String,
}

// ── Response types ────────────────────────────────────────────────────

#[derive(Serialize)]
struct ArchetypeView {
    name: String,
    slots: Vec<SlotType>,
    cards: usize,
}

#[derive(Serialize)]
struct ItemView {
    id: ItemId,
    name: String,
    slot: SlotType,
    tokens: TokenCost,
    cards: Vec<String>,
}

#[derive(Serialize)]
struct SlotView {
    slot: SlotType,
    tokens: TokenCost,
    traits: u8,
    score: f64,
    items: Vec<String>,
}

#[derive(Serialize)]
struct BuildView {
    score: f64,
    num_traits: u32,
    deck_size: u32,
    avg: f64,
    combinations: usize,
    slots: Vec<SlotView>,
}

#[derive(Serialize)]
struct RankingView {
    archetype: String,
    avg: Option<f64>,
    distributions: usize,
    builds: Vec<BuildView>,
}

impl ItemView {
    fn new(catalog: &Catalog, id: ItemId) -> Self {
        let item = catalog.item(id);
        Self {
            id,
            name: item.name.clone(),
            slot: item.slot,
            tokens: item.cost,
            cards: item
                .cards
                .iter()
                .map(|card| catalog.card(*card).name.clone())
                .collect(),
        }
    }
}

impl BuildView {
    fn new(catalog: &Catalog, build: &Build) -> Self {
        Self {
            score: build.score,
            num_traits: build.num_traits,
            deck_size: build.deck_size(),
            avg: build.avg,
            combinations: build.combinations(),
            slots: build
                .slots
                .iter()
                .map(|slot| SlotView {
                    slot: slot.slot,
                    tokens: slot.cost,
                    traits: slot.traits,
                    score: slot.score,
                    items: slot
                        .options
                        .iter()
                        .map(|id| catalog.item(*id).name.clone())
                        .collect(),
                })
                .collect(),
        }
    }
}

impl RankingView {
    fn new(catalog: &Catalog, ranking: &Ranking) -> Self {
        Self {
            archetype: ranking.archetype.clone(),
            avg: ranking.avg,
            distributions: ranking.distributions,
            builds: ranking
                .builds
                .iter()
                .map(|b| BuildView::new(catalog, b))
                .collect(),
        }
    }
}

// ── Shared application state ─────────────────────────────────────────

#[derive(Clone)]
pub struct AppState {
    pub optimizer: Optimizer,
    pub optimize_timeout: Duration,
}

// ── Error helper ──────────────────────────────────────────────────────

fn json_error(status: StatusCode, msg: &str) -> impl IntoResponse {
    (status, Json(json!({ "error": msg })))
}

/// HTTP status and metric label for an optimizer error.
fn classify(e: &OptimizeError) -> (StatusCode, &'static str) {
    match e {
        OptimizeError::UnknownArchetype(_)
        | OptimizeError::UnknownCard(_)
        | OptimizeError::UnknownItem(_)
        | OptimizeError::UnknownPack(_) => (StatusCode::NOT_FOUND, "not_found"),
        OptimizeError::InvalidWeight(_) | OptimizeError::EmptyQuery => {
            (StatusCode::BAD_REQUEST, "bad_request")
        }
        OptimizeError::InfeasibleBudget(_) => (StatusCode::UNPROCESSABLE_ENTITY, "infeasible"),
        OptimizeError::Cancelled => (StatusCode::GATEWAY_TIMEOUT, "cancelled"),
        OptimizeError::NotComputed(_) | OptimizeError::UnknownSlot(_) => {
            (StatusCode::INTERNAL_SERVER_ERROR, "error")
        }
    }
}

fn optimize_error(e: OptimizeError) -> impl IntoResponse {
    let (status, outcome) = classify(&e);
    metrics::OPTIMIZE_REQUESTS_TOTAL
        .with_label_values(&[outcome])
        .inc();
    if status.is_server_error() {
        tracing::error!("Optimizer error: {e}");
    } else {
        tracing::debug!("Rejected optimize request: {e}");
    }
    json_error(status, &e.to_string())
}

// ── Router ────────────────────────────────────────────────────────────

pub fn router(optimizer: Optimizer, optimize_timeout: Duration) -> Router {
    let state = AppState {
        optimizer,
        optimize_timeout,
    };

    Router::new()
        .route("/api/archetypes", get(list_archetypes))
        .route("/api/packs", get(list_packs))
        .route("/api/items/{name}", get(get_item))
        .route("/api/optimize", get(optimize))
        .with_state(state)
}

// ── Catalog handlers ──────────────────────────────────────────────────

async fn list_archetypes(State(state): State<AppState>) -> impl IntoResponse {
    let archetypes: Vec<ArchetypeView> = state
        .optimizer
        .catalog()
        .archetypes()
        .iter()
        .map(|a| ArchetypeView {
            name: a.name.clone(),
            slots: a.slots.clone(),
            cards: a.card_count(),
        })
        .collect();
    (StatusCode::OK, Json(json!(archetypes))).into_response()
}

async fn list_packs(State(state): State<AppState>) -> impl IntoResponse {
    (StatusCode::OK, Json(json!(state.optimizer.packs().list()))).into_response()
}

async fn get_item(State(state): State<AppState>, Path(name): Path<String>) -> impl IntoResponse {
    let catalog = state.optimizer.catalog();
    match catalog.item_by_name(&name) {
        Ok(item) => (StatusCode::OK, Json(json!(ItemView::new(catalog, item.id)))).into_response(),
        Err(e) => json_error(StatusCode::NOT_FOUND, &e.to_string()).into_response(),
    }
}

// ── Optimizer handler ─────────────────────────────────────────────────

async fn optimize(
    State(state): State<AppState>,
    Query(params): Query<OptimizeParams>,
) -> impl IntoResponse {
    metrics::OPTIMIZATIONS_IN_FLIGHT.inc();
    let timer = metrics::OPTIMIZE_DURATION_SECONDS.start_timer();
    let result = state
        .optimizer
        .optimize_with_timeout(&params.archetype, &params.query, state.optimize_timeout)
        .await;
    timer.observe_duration();
    metrics::OPTIMIZATIONS_IN_FLIGHT.dec();

    match result {
        Ok(ranking) => {
            let outcome = if ranking.builds.is_empty() { "empty" } else { "ok" };
            metrics::OPTIMIZE_REQUESTS_TOTAL
                .with_label_values(&[outcome])
                .inc();
            metrics::DISTRIBUTIONS_EVALUATED_TOTAL.inc_by(ranking.distributions as u64);
            metrics::BUILDS_RETURNED.observe(ranking.builds.len() as f64);
            tracing::info!(
                archetype = %ranking.archetype,
                builds = ranking.builds.len(),
                distributions = ranking.distributions,
                "Optimized build"
            );
            let view = RankingView::new(state.optimizer.catalog(), &ranking);
            (StatusCode::OK, Json(json!(view))).into_response()
        }
        Err(e) => optimize_error(e).into_response(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use axum::body::Body;
    use axum::http::Request;
    use serde_json::Value;
    use tower::ServiceExt;

    use crate::packs::PackRegistry;

    fn app() -> Router {
        let catalog = Catalog::from_json(include_str!("../../data/catalog.json")).unwrap();
        let packs = PackRegistry::from_catalog(&catalog)
            .with_user_packs_json(&catalog, include_str!("../../data/packs.json"))
            .unwrap();
        let optimizer = Optimizer::new(Arc::new(catalog), Arc::new(packs));
        router(optimizer, Duration::from_secs(30))
    }

    async fn get_json(uri: &str) -> (StatusCode, Value) {
        let response = app()
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, serde_json::from_slice(&body).unwrap())
    }

    #[tokio::test]
    async fn test_list_archetypes() {
        let (status, body) = get_json("/api/archetypes").await;
        assert_eq!(status, StatusCode::OK);
        let list = body.as_array().unwrap();
        assert_eq!(list.len(), 2);
        assert_eq!(list[0]["name"], "Human Warrior");
        assert_eq!(list[0]["cards"], 36);
        assert_eq!(list[0]["slots"][3], "Heavy Armor");
    }

    #[tokio::test]
    async fn test_list_packs_includes_user_packs() {
        let (status, body) = get_json("/api/packs").await;
        assert_eq!(status, StatusCode::OK);
        let names: Vec<&str> = body
            .as_array()
            .unwrap()
            .iter()
            .map(|p| p["name"].as_str().unwrap())
            .collect();
        assert!(names.contains(&"damage"));
        assert!(names.contains(&"tank"));
    }

    #[tokio::test]
    async fn test_get_item() {
        let (status, body) = get_json("/api/items/war%20hammer").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["name"], "War Hammer");
        assert_eq!(body["tokens"], json!([2, 1]));
        assert_eq!(body["cards"].as_array().unwrap().len(), 6);

        let (status, _) = get_json("/api/items/excalibur").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_optimize_route() {
        let (status, body) = get_json("/api/optimize?archetype=human%20warrior&query=damage").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["archetype"], "Human Warrior");
        let builds = body["builds"].as_array().unwrap();
        assert!(!builds.is_empty());
        assert_eq!(builds[0]["slots"].as_array().unwrap().len(), 10);
        assert!(body["avg"].as_f64().unwrap() > 0.0);
    }

    #[tokio::test]
    async fn test_optimize_errors() {
        let (status, body) = get_json("/api/optimize?archetype=dwarf%20priest&query=damage").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert!(body["error"].as_str().unwrap().contains("dwarf priest"));

        let (status, _) = get_json("/api/optimize?archetype=human%20warrior&query=speed").await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (status, _) = get_json("/api/optimize?archetype=human%20warrior&query=damage%3Dx").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_optimize_empty_query_returns_no_builds() {
        let (status, body) = get_json("/api/optimize?archetype=elf%20wizard&query=").await;
        assert_eq!(status, StatusCode::OK);
        assert!(body["builds"].as_array().unwrap().is_empty());
        assert!(body["avg"].is_null());
    }

    #[test]
    fn test_classify() {
        assert_eq!(
            classify(&OptimizeError::Cancelled).0,
            StatusCode::GATEWAY_TIMEOUT
        );
        assert_eq!(
            classify(&OptimizeError::InfeasibleBudget("x".into())).0,
            StatusCode::UNPROCESSABLE_ENTITY
        );
        assert_eq!(
            classify(&OptimizeError::UnknownPack("x".into())).1,
            "not_found"
        );
    }
}
