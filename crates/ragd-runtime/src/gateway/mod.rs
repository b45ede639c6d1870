mod routes;
mod server;
mod tracing;

pub use routes::{RouteBuilder, RouteProvider, RouteRegistry};
pub use server::{
    GatewayServer, GatewayState, HealthResponse, ProgressStatusResponse, SYSTEM_ROUTES,
};
pub use tracing::{tracing_middleware, TracingState, REQUEST_ID_HEADER, TRACE_ID_HEADER};
