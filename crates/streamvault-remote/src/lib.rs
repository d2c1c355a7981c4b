//! Remote-side collaborator implementations.
//!
//! `ScpTransfer` ships finished captures to the transcode host over scp with
//! a pre-provisioned key; `HttpAcknowledgeClient` posts the "new replay"
//! notification and hands the raw status back to the pipeline for
//! interpretation.

pub mod acknowledge;
pub mod transfer;

pub use acknowledge::HttpAcknowledgeClient;
pub use transfer::ScpTransfer;
