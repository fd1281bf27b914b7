//! `agent` crate — HTTP agent layer, spec.md §4.7/§6.4: fixed status
//! endpoints plus one axum route per `aci`/`add_route` node, each serving
//! its reachable sub-DAG as a request handler.

pub mod dispatch;
pub mod handlers;
pub mod routes;
pub mod sql_convention;

use std::sync::Arc;

use axum::routing::{any, get, post};
use axum::Router;
use chrono::{DateTime, Utc};
use nodes::NodeRegistry;
use parser::Workflow;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::routes::RouteDef;

const DEFAULT_MAX_EXECUTION_DEPTH: usize = 50;

#[derive(Clone)]
pub struct AppState {
    pub agent_name: String,
    pub version: String,
    pub workflow: Arc<Workflow>,
    pub registry: Arc<NodeRegistry>,
    pub routes: Arc<Vec<RouteDef>>,
    pub max_execution_depth: usize,
    pub started_at: DateTime<Utc>,
}

/// Owns a loaded workflow and its node registry for the lifetime of the
/// process; one `Agent` serves one Actfile.
pub struct Agent {
    state: AppState,
}

impl Agent {
    pub fn from_workflow(workflow: Workflow, registry: NodeRegistry) -> Self {
        let routes = routes::discover_routes(&workflow);
        tracing::info!("discovered {} dynamic route(s) from aci nodes", routes.len());
        let state = AppState {
            agent_name: workflow.name.clone(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            workflow: Arc::new(workflow),
            registry: Arc::new(registry),
            routes: Arc::new(routes),
            max_execution_depth: DEFAULT_MAX_EXECUTION_DEPTH,
            started_at: Utc::now(),
        };
        Self { state }
    }

    pub fn router(&self) -> Router {
        let cors = CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any);

        Router::new()
            .route("/health", get(handlers::health))
            .route("/", get(handlers::health))
            .route("/api/status", get(handlers::status))
            .route("/admin/dashboard", get(handlers::admin_dashboard))
            .route("/admin/nodes", get(handlers::admin_nodes))
            .route("/admin/edges", get(handlers::admin_edges))
            .route("/admin/execute", post(handlers::admin_execute))
            .route("/admin/nodes/:id/execute", post(handlers::admin_execute_node))
            .route("/aci/info", get(handlers::aci_info))
            .route("/*path", any(handlers::dynamic_dispatch))
            .layer(cors)
            .layer(TraceLayer::new_for_http())
            .with_state(self.state.clone())
    }

    pub async fn serve(self, bind: &str) -> Result<(), std::io::Error> {
        let app = self.router();
        let listener = tokio::net::TcpListener::bind(bind).await?;
        tracing::info!("agent '{}' listening on {}", self.state.agent_name, listener.local_addr()?);
        axum::serve(listener, app).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nodes::registry::RegistryBuilder;

    #[test]
    fn from_workflow_discovers_routes_and_exposes_fixed_state() {
        let mut wf = Workflow::empty("demo", "start");
        let mut node = parser::NodeDef::new("start", "aci");
        node.params.insert("operation".to_string(), value::Value::String("add_route".to_string()));
        node.params.insert("route_path".to_string(), value::Value::String("/api/ping".to_string()));
        node.params.insert("methods".to_string(), value::Value::List(vec![value::Value::String("GET".to_string())]));
        wf.nodes.insert("start".to_string(), node);

        let agent = Agent::from_workflow(wf, RegistryBuilder::new().build());
        assert_eq!(agent.state.routes.len(), 1);
        assert_eq!(agent.state.agent_name, "demo");
    }
}
