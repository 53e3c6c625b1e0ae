pub mod media;
pub mod routes;
pub mod system;

pub use routes::create_router;
