//! `schoolfix` - school facility issue reporting.

fn main() {
    if let Err(e) = schoolfix::run() {
        eprintln!("Error: {e:#}");
        std::process::exit(1);
    }
}
