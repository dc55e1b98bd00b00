pub mod catalog;
pub mod events;
pub mod request;
pub mod result;

pub use request::{AspectRatio, BusinessContext, GenerationRequest};
pub use result::{AttemptRecord, GenerationResult};
