//! InfluxDB writer for whisperflux.
//!
//! This crate provides the destination side of a migration:
//!
//! - [`InfluxConfig`] - Connection and write parameters
//! - [`InfluxWriter`] - Pooled HTTP client implementing [`PointWriter`](whisperflux_types::PointWriter)
//! - [`encode_series`] - Line-protocol encoding of a series

#![doc = include_str!("../README.md")]
#![doc(issue_tracker_base_url = "https://github.com/factordynamics/whisperflux/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod client;
mod config;
mod line;

pub use client::{InfluxWriter, WriteError};
pub use config::{InfluxConfig, Precision};
pub use line::{EncodedSeries, encode_series};
