//! Frame Protocol
//!
//! On the wire a frame is a sequence of held duty levels:
//!
//! ```text
//! IDLE x2 | START | [LEN] | unit .. unit | CHK | STOP | IDLE x1
//! ```
//!
//! - [`frame`]: builds that sequence for a payload
//! - [`classify`]: labels a measured duty as control, data or noise
//! - [`receiver`]: explicit-state machine turning labelled duties into frames

pub mod classify;
pub mod frame;
pub mod receiver;

pub use classify::{classify, Classified, ControlSet};
pub use frame::{FrameSchedule, Segment, SegmentKind};
pub use receiver::{step, ReceivedFrame, Receiver, RxOutcome, RxState};
