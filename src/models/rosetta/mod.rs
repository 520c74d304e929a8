//! Rosetta data-access API types.

mod construction;
pub use construction::*;

mod data;
pub use data::*;

mod identifiers;
pub use identifiers::*;

mod network;
pub use network::*;

mod operation;
pub use operation::*;
