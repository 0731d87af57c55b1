fn main() {
    if let Err(err) = rerx_filing_cli::run() {
        eprintln!("application error: {err}");
        std::process::exit(1);
    }
}
