use clap::Parser as ClapParser;
use device_event::{Config, DeviceEventCodec, Error, InFlightEvents};
use std::{fs, path::PathBuf};
use tokio::fs::File;
use tokio_stream::StreamExt;
use tokio_util::codec::FramedRead;
use tracing::{error, info};

/// Newline-delimited device event reader example
#[derive(Debug, clap::Parser)]
struct Opts {
    /// Optional validation configuration yaml file
    #[arg(long, short = 'c')]
    pub config: Option<PathBuf>,

    /// The newline-delimited JSON device events file
    pub events: PathBuf,
}

#[tokio::main]
async fn main() -> Result<(), Error> {
    tracing_subscriber::fmt::init();

    let opts = Opts::parse();

    let cfg = match opts.config.as_ref() {
        Some(path) => Config::from_yaml(&fs::read_to_string(path)?)?,
        None => Config::default(),
    };

    let stream = File::open(&opts.events).await?;

    let mut reader = FramedRead::new(stream, DeviceEventCodec::new(&cfg));
    let mut inflight = InFlightEvents::new();

    while let Some(value) = reader.next().await {
        let event = match value {
            Ok(e) => e,
            Err(e) => {
                error!("{e}");
                break;
            }
        };
        if let Err(e) = inflight.track(&event) {
            error!("{e}");
            continue;
        }
        println!("{event:#?}");
    }

    info!(in_flight = inflight.len(), "Done");

    Ok(())
}
