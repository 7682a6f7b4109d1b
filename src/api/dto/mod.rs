//! Data Transfer Objects for REST request/response serialization.
//!
//! Field names are camelCase on the wire; enums use their upper-case
//! names.

pub mod auth_dto;
pub mod common_dto;
pub mod event_dto;
pub mod location_dto;
pub mod participant_dto;
pub mod report_dto;
pub mod zone_dto;

pub use auth_dto::*;
pub use common_dto::*;
pub use event_dto::*;
pub use location_dto::*;
pub use participant_dto::*;
pub use report_dto::*;
pub use zone_dto::*;
