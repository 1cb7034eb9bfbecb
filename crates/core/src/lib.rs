//! Bring-up orchestration for an FPGA-hosted SoC prototype.
//!
//! The orchestrator programs the FPGA fabric, starts the debug-probe bridge,
//! drives a debugger to load firmware (and optionally a kernel) into target
//! memory, waits for the operating system to reach a login prompt on the
//! serial console, and finally hands the console to the operator. Every
//! stage is gated on expect-style milestones; a pretend mode walks the same
//! control flow without touching hardware.

pub mod boot;
pub mod bridge;
pub mod config;
pub mod console;
pub mod debugger;
pub mod discovery;
pub mod error;
pub mod image;
pub mod milestone;
pub mod orchestrator;
pub mod programmer;
pub mod scripts;

pub use config::BringupConfig;
pub use error::{BringupError, Result};
pub use image::TargetImage;
pub use orchestrator::{BringupStage, Orchestrator, TargetConnection};
