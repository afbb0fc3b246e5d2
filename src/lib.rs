//! Strategy signal generation and backtest metrics over historical OHLCV bars.
//!
//! Bars come from a Parquet cache or a market-data provider ([`data`]). Each
//! [`strategy`] turns them into entry/exit signals, a [`simulation`] engine
//! turns signals into an equity curve and trade statistics, and the
//! [`report`] module appends a metrics row to the CSV ledger and writes an
//! equity screenshot. [`runner::BatchRunner`] drives the fixed batch.

pub mod config;
pub mod data;
pub mod error;
pub mod indicators;
pub mod report;
pub mod runner;
pub mod simulation;
pub mod strategy;
pub mod types;

pub use crate::config::BacktestConfig;
pub use crate::report::{MetricsRecord, MetricsReporter};
pub use crate::runner::{BatchReport, BatchRunner, FailurePolicy};
pub use crate::simulation::{SignalPortfolio, SimulationEngine};
