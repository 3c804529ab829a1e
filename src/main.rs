#[tokio::main]
async fn main() {
    std::process::exit(social_downloader_lib::run().await)
}
