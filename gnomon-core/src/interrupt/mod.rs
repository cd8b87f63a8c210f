//! Interrupt line management

pub mod deferred;

pub use deferred::{
    precedes, DeferredIrqQueue, DeferredRequest, GateOp, SharedDeferredQueue, DEFERRED_CAPACITY,
    NO_DEADLINE,
};
pub use gnomon_hal::IrqLine;
