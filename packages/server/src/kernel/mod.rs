//! Kernel module - server infrastructure and dependencies.

pub mod deps;
pub mod extraction_backend;
pub mod synthesis_client;

pub use deps::ServerDeps;
pub use extraction_backend::HttpExtractionBackend;
pub use synthesis_client::{
    create_synthesis_service, DigestSynthesisService, HttpSynthesisService,
};
