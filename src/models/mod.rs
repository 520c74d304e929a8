mod app_state;
pub use app_state::*;

mod construction;
pub use construction::*;

mod error;
pub use error::*;

mod ledger;
pub use ledger::*;

mod rosetta;
pub use rosetta::*;
