//! Pulse-oximeter monitoring core: PPG sampling, heart-rate and SpO2
//! estimation, threshold alerts and a bounded vitals history.

pub mod alerts;
pub mod beat;
pub mod collaborators;
pub mod config;
pub mod console;
pub mod error;
pub mod history;
pub mod monitor;
pub mod notify;
pub mod sample_buffer;
pub mod sensor;
pub mod spo2;
pub mod timeseries;
pub mod vitals;
