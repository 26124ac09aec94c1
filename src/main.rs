#[tokio::main]
async fn main() {
    if let Err(e) = bedboard_lib::run().await {
        eprintln!("bedboard: {e}");
        std::process::exit(1);
    }
}
