//! Display channel: transport, completion handling, and panel operations

pub mod completion;
pub mod panel;
pub mod transport;

pub use completion::complete_transfer;
pub use panel::Panel;
pub use transport::{
    DisplayTransport, SendStrategy, TransmitError, BUSY_SPIN_LIMIT, DEFAULT_BULK_THRESHOLD,
};
