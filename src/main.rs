use fincalc::cli::run;

#[tokio::main]
async fn main() {
    if let Err(err) = run().await {
        eprintln!("fincalc error: {err}");
        std::process::exit(1);
    }
}
