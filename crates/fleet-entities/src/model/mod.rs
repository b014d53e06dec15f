//! The entity shapes specified in spec §3. Plain data: no behavior beyond
//! small constructors and constants lives here, matching the out-of-scope
//! boundary with the relational schema/DAOs (spec §1).

mod backup;
mod cluster;
mod common;
mod hierarchy;
mod import;
mod installer;
mod violation;

pub use backup::*;
pub use cluster::*;
pub use common::*;
pub use hierarchy::*;
pub use import::*;
pub use installer::*;
pub use violation::*;
