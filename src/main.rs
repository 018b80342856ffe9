#[tokio::main]
async fn main() -> anyhow::Result<()> {
    if let Err(e) = examwatch::run().await {
        eprintln!("examwatch fatal: {e:#}");
        std::process::exit(1);
    }
    Ok(())
}
