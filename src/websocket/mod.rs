// WebSocket module: HTTP routes and channel upgrade handling

pub mod handler;
pub mod routes;

pub use routes::create_router;
