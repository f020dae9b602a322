pub mod client;
pub mod messages;

pub use client::{HttpSubmitter, Submitter};
pub use messages::{MediaBlob, ResponseEnvelope, SubmissionPayload};
