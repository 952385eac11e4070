//! Core request and response types shared by the client, transport and services.

pub mod envelope;
pub mod request;

pub use envelope::Envelope;
pub use request::{Headers, Method, QueryParams, RequestDescriptor, RequestOptions};
