//! # CLI Module
//!
//! Command-line tooling for controller manifests.
//!
//! ## Commands
//!
//! ### `inspect`
//!
//! Resolve every controller in a manifest to an echo controller, run route
//! registration and print the resulting table:
//!
//! ```bash
//! routeforge inspect --manifest controllers.yaml --config app.yaml
//! ```
//!
//! Each line shows the verb, full pattern, route name (`-` if unnamed) and
//! the middleware chain in execution order. `--json` prints the same data
//! as a JSON array.
//!
//! ### `check`
//!
//! Run the same registration without printing routes. Exits non-zero on
//! any configuration error (bad verb, unknown filter, ambiguous or
//! duplicate route name, conflicting prefix).
//!
//! ```bash
//! routeforge check --manifest controllers.yaml
//! ```
//!
//! ## Usage from Code
//!
//! ```rust,ignore
//! use routeforge::cli::{run_cli, Cli};
//! use clap::Parser;
//!
//! run_cli(Cli::parse())?;
//! ```

mod commands;


pub use commands::{build_routes, render_table, run_cli, Cli, Commands, RouteSummary};
