//! Testing utilities and harness for Weft

pub mod clock;
pub mod driver;
pub mod harness;
pub mod host;

pub use clock::ManualClock;
pub use driver::{run_slice, run_until_idle, test_scheduler};
pub use harness::TestRenderer;
pub use host::{HostOp, RecordingHost};

pub mod prelude {
    pub use crate::clock::*;
    pub use crate::driver::*;
    pub use crate::harness::*;
    pub use crate::host::*;
}
