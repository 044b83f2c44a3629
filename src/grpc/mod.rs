pub mod client_service;
pub mod convert;
pub mod server;
pub mod worker_service;

pub use server::GrpcServer;
