//! Audiosource CLI entry point.

#![allow(clippy::print_stdout)]
#![allow(clippy::print_stderr)]

use audiosource::constants::ENGINE_NAME;

fn main() {
    if let Err(e) = audiosource::run() {
        eprintln!("error: {ENGINE_NAME}: {}", e.chain_message());
        std::process::exit(1);
    }
}
