mod api;
pub use api::*;

mod construction;
pub use construction::*;
