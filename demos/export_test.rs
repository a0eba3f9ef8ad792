use mms_scraper::{ExportRequest, MmsService};
use tower::Service;

#[tokio::main]
async fn main() {
    // log setup
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .init();

    // credentials from the environment
    let username = std::env::var("USER").expect("USER environment variable not set");
    let password = std::env::var("PASSWORD").expect("PASSWORD environment variable not set");

    let request = ExportRequest::new("ENERGY_CENTRE - PROD", &username, &password)
        .with_download_root("./data")
        .with_headless(false) // visible browser for debugging
        .with_debug(true);

    let mut service = MmsService::new();

    println!("=== MMS Export Test ===");

    match service.call(request).await {
        Ok(result) => {
            println!("done! account: {}", result.account);
            for event in &result.report.downloads {
                println!("  {} -> {:?}", event.group, event.file);
            }
        }
        Err(e) => {
            eprintln!("error: {}", e);
        }
    }
}
