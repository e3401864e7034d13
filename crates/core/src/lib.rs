//! `portal-core`: domain foundation building blocks.
//!
//! This crate contains **pure domain** primitives (no infrastructure concerns):
//! roster members, content collections, attendance summaries and the
//! identifiers that key them.

pub mod attendance;
pub mod content;
pub mod error;
pub mod id;
pub mod member;

pub use attendance::{AttendanceStatus, AttendanceSummary, LevelFilter};
pub use content::{ContentCollection, Document};
pub use error::{DomainError, DomainResult};
pub use id::{DocumentId, MemberCode, PortalUid};
pub use member::{Fields, Member};
