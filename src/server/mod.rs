//! HTTP server layer.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                         HTTP Layer                              │
//! │        GET /iiif/[{v}/]{id}[/info.json | /{r}/{s}/{rot}/{q}]    │
//! │                                                                 │
//! │  ┌──────────────────────────┐  ┌─────────────────────────────┐  │
//! │  │        handlers          │  │           routes            │  │
//! │  │ (redirect, info, image)  │  │   (router, CORS, tracing)   │  │
//! │  └──────────────────────────┘  └─────────────────────────────┘  │
//! └─────────────────────────────────────────────────────────────────┘
//! ```

pub mod handlers;
pub mod routes;

pub use handlers::{
    health_handler, iiif_handler, list_handler, AppState, ErrorResponse, HealthResponse,
    ImagesResponse, IIIF_PREFIX,
};
pub use routes::{create_router, RouterConfig};
