#[tokio::main]
async fn main() -> std::process::ExitCode {
    xooa_cli::start(std::env::args()).await
}
