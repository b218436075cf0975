fn main() {
    if let Err(err) = bronze_customers::run() {
        eprintln!("error: {err:#}");
        std::process::exit(1);
    }
}
