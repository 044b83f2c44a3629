pub mod clock;
pub mod config;
pub mod dashboard;
pub mod error;
pub mod grpc;
pub mod master;
pub mod plan;
pub mod shutdown;
pub mod wire;

// Re-export generated protobuf types
pub mod proto {
    tonic::include_proto!("foreman");
}
