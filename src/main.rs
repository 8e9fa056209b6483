#[tokio::main]
async fn main() -> std::io::Result<()> {
    // Delegate to the server framework entry point.
    arena_server::frameworks::server::run_with_config().await
}
