//! freightopt: Logistics Cost Optimization Library
//!
//! Learns a cost model from weekly shipment records and reallocates each
//! supplier's volume across weeks to minimize total predicted cost, while
//! keeping every supplier's total volume and every week's capacity intact.

pub mod cli;
pub mod optimizer;
pub mod pipeline;
pub mod report;
pub mod utils;
