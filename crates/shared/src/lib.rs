//! Types shared between the ingestion core, the analysis collaborator and
//! whatever presentation layer renders workflow snapshots.

pub mod domain;
pub mod error;
pub mod protocol;
