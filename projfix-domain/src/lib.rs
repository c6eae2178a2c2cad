//! Domain logic: reshape a legacy project document into SDK-style item and property groups.
//!
//! This crate owns *what* gets rewritten and records every edit in a [`ChangeLog`]. Reading and
//! writing files is the job of `projfix-core`; the tree itself lives in `projfix-xml`.

mod changes;
mod engine;
mod entity;
mod error;
mod property_groups;
pub mod schema;

pub use changes::ChangeLog;
pub use engine::{InsertionCursor, NormalizeOptions, SdkNormalizer};
pub use entity::ItemGroupEntity;
pub use error::{NormalizeError, NormalizeResult};
pub use property_groups::{fix_property_groups, sort_property_groups};
