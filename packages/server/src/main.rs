#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Standalone entry point for the Tombo dashboard API server.
//!
//! Loads from the export named by `TOMBO_EXPORT` when set, from the
//! backend configured by `TOMBO_BACKEND_URL`/`TOMBO_BACKEND_KEY`
//! otherwise.

use tombo_source::DataSource;
use tombo_source::progress::LogProgress;

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    pretty_env_logger::init_custom_env("RUST_LOG");

    tombo_server::run_server(async {
        let source = DataSource::from_env()?;
        tombo_source::load(&source, &LogProgress).await
    })
    .await
}
