//! Entry point for the `suitec` binary.
#![forbid(unsafe_code)]

fn main() {
    suitec_cli::init_logging();
    if let Err(err) = suitec_cli::run() {
        eprintln!("suitec: {err}");
        std::process::exit(1);
    }
}
