//! Sales analytics dashboard.
//!
//! Two CSV tables are loaded once into an immutable [`DatasetStore`]. Every
//! figure is a pure function of that store and a [`FilterSpec`]: filter,
//! group and reduce through [`aggregation::Pipeline`], then shape the result
//! into a declarative [`ChartSpec`]. [`bindings`] maps input controls onto
//! the figures they invalidate and [`server`] exposes it all over HTTP.

pub mod aggregation;
pub mod bindings;
pub mod chart_spec;
pub mod config;
pub mod error;
pub mod figures;
pub mod filters;
pub mod schema;
pub mod server;
pub mod stats;
pub mod store;

pub use bindings::{BindingTable, ControlValue, Session};
pub use chart_spec::ChartSpec;
pub use error::{DashboardError, Result};
pub use figures::Figure;
pub use filters::FilterSpec;
pub use store::{DatasetStore, Summary};
