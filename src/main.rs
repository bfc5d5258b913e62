#[tokio::main]
async fn main() {
    if let Err(error) = live_dashboard_lib::run().await {
        tracing::error!(%error, "dashboard exited with error");
        eprintln!("live-dashboard: {error}");
        std::process::exit(1);
    }
}
