/// Smoke-test for `ChromiumLauncher`.
///
/// Runs the acquisition chain against the locally installed browsers, then
/// crawls <https://example.com> with the accepted driver.
///
/// Run with:
///   cargo run -p scout-client --example driver_check --features browser
use scout_client::{ChromiumLauncher, PageCrawler};
use scout_core::driver::{DriverChain, DriverConfig};
use scout_core::traits::{CompanyCrawler, Driver};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt().with_env_filter("info").init();

    let chain = DriverChain::new(ChromiumLauncher::new(), DriverConfig::default());
    let Some(mut driver) = chain.acquire().await else {
        anyhow::bail!("no browser candidate passed its smoke test");
    };
    println!("Driver ready: {}", driver.engine());

    let info = PageCrawler::new()
        .crawl(&mut driver, "Example", "https://example.com")
        .await?;
    assert_eq!(info.name, "Example Domain");
    println!("OK, crawled '{}' ({} chars of text)", info.name, info.about_us.len());

    driver.close().await?;
    Ok(())
}
