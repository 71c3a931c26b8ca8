use clap::Parser;
use site_probe::SiteProbe;
use std::process::ExitCode;

mod args;
use args::Args;

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();

    // RUST_LOG still wins when set
    env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or(args.log_level.as_filter()),
    )
    .init();

    let probe = match build(&args) {
        Ok(probe) => probe,
        Err(e) => {
            ::log::error!("{}", e);
            return ExitCode::FAILURE;
        }
    };

    println!("Note: page rendering requires a WebDriver server (e.g., ChromeDriver).");
    println!(
        "Set WEBDRIVER_URL environment variable if not using the default http://localhost:4444"
    );

    let start_time = std::time::Instant::now();
    match probe.run().await {
        Ok(report) => {
            ::log::info!(
                "Run complete in {:.2} seconds, report: {}",
                start_time.elapsed().as_secs_f64(),
                report.display()
            );
            println!("Report generated: {}", report.display());
            ExitCode::SUCCESS
        }
        Err(e) => {
            ::log::error!("Run failed: {}", e);
            ExitCode::FAILURE
        }
    }
}

/// Applies configuration file and flag overrides; any problem here is fatal
fn build(args: &Args) -> site_probe::Result<SiteProbe> {
    let mut probe = SiteProbe::new(&args.url)
        .with_recursive(args.recursive)
        .with_max_depth(args.max_depth)
        .with_no_cache(args.no_cache);

    if let Some(path) = &args.config {
        probe = probe.with_config_file(path)?;
    }

    let config = probe.config_mut();
    if let Some(tool) = &args.testing_tool {
        config.testing_tool = tool.parse()?;
    }
    if let Some(language) = &args.language {
        config.language = language.parse()?;
    }
    if let Some(version) = &args.selenium_version {
        config.selenium_version = version.clone();
    }
    if let Some(wait_time) = &args.wait_time {
        config.captcha_wait_time = wait_time.clone();
    }
    config.validate()?;

    probe.with_llm_config_file(&args.llm_config)
}
