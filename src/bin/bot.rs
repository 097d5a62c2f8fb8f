use clap::Parser;
use topnodes::{
    bot::Bot,
    chart::PngRenderer,
    config::{Config, read_config_file},
    conversation::Controller,
    swis::SwisClient,
    telegram::TelegramClient,
    util::{get_credentials, get_telegram_token},
};
use tracing::{info, level_filters::LevelFilter, trace};
use tracing_subscriber::{filter, layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Debug, Clone, Parser)]
struct Args {
    /// Config file (JSON), defaults are used when omitted
    #[arg(short)]
    file: Option<String>,
}

fn init() {
    dotenv::dotenv().ok();

    let filter = filter::Targets::new().with_targets(vec![
        ("topnodes", LevelFilter::TRACE),
        ("topnodes_bot", LevelFilter::TRACE),
    ]);
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .compact()
                .with_ansi(false),
        )
        .with(filter)
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init();
    let args = Args::parse();
    trace!("started with args: {args:?}");

    let config = match &args.file {
        Some(file) => read_config_file(file)?,
        None => Config::default(),
    };

    let credentials = get_credentials()?;
    let token = get_telegram_token()?;

    let source = SwisClient::new(&config.swis, credentials)?;
    let renderer = PngRenderer::new(&config.chart)?;
    let telegram = TelegramClient::new(&config.telegram, &token);

    info!(
        "charts are written to {}, node data from {}",
        config.chart.output_dir.display(),
        config.swis.base_url
    );

    let bot = Bot::new(Controller::new(source, renderer, telegram.clone()));
    bot.run(telegram).await;

    Ok(())
}
