fn main() {
    if let Err(err) = superstore_dash::run() {
        eprintln!("error: {err:#}");
        std::process::exit(1);
    }
}
