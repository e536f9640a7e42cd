//! Docker Image Syncer
//!
//! Mirrors container images between registries on a schedule, using a
//! Docker daemon to pull, re-tag and push them.

use docker_image_syncer::cli::{Args, Runner};
use std::process;

#[tokio::main]
async fn main() {
    let args = Args::parse_args().from_env();

    let runner = match Runner::new(args) {
        Ok(runner) => runner,
        Err(e) => {
            eprintln!("Error: {}", e);
            Args::print_examples();
            process::exit(1);
        }
    };

    if let Err(e) = runner.run().await {
        eprintln!("Error: {}", e);
        process::exit(1);
    }
}
