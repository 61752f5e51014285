//! Pod mutating admission webhook for FPGA resources.
//!
//! Pods ask for FPGA functions by generic names such as
//! `fpga.intel.com/arria10-nlb0`. The webhook rewrites those requests into the
//! resources the FPGA device plugins advertise, using the
//! `AcceleratorFunction` and `FpgaRegion` objects of the pod's namespace, and
//! adds the environment the CRI hook needs to program regions.

pub mod admission;
pub mod app;
pub mod config;
pub mod controller;
pub mod infrastructure;
pub mod patcher;
