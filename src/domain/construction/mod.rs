//! Construction pipeline.
//!
//! Operations are matched into intents, compiled into instructions and
//! assembled into an unsigned transaction. Parsing runs the other way: a
//! decoded transaction is decompiled into operations.

mod assembler;
pub use assembler::*;

mod compiler;
pub use compiler::*;

mod decompiler;
pub use decompiler::*;

mod matcher;
pub use matcher::*;
