#![forbid(unsafe_code)]

//! Test harness for navseq.
//!
//! - [`sim`] - In-memory stack manager with scripted completion timing
//! - [`schedule`] - Step-by-step schedule runner and seeded storm generator
//! - [`capture`] - Tracing capture for log assertions

pub mod capture;
pub mod schedule;
pub mod sim;

pub use capture::{CaptureLayer, CapturedEvent, LogCapture, capture};
pub use schedule::{ScheduleReport, ScheduleStep, run_schedule, transition_storm};
pub use sim::{Delivery, JournalEntry, SimController, SimulatedStackManager};
