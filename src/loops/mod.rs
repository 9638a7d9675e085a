//! Loop metadata construction.
//!
//! [`chain`] turns one loop's attributes into a chain of `llvm.loop` nodes;
//! [`stack`] tracks the loops that are open during code generation, tags the
//! emitted instructions and finalizes each loop's metadata when it closes.

pub mod chain;
pub mod stack;

pub use chain::{ChainBuilder, LoopChain, Stage, StageDecision};
pub use stack::{LoopInfo, LoopInfoStack};
