use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info};

use thai_id_card::{
    CardReader, FnSink, ProgressEvent, ReadOptions, ReadSession, ReaderConfig,
};

#[derive(Parser, Debug)]
#[command(author, version, about = "Read a Thai national ID card over PC/SC", long_about = None)]
struct Args {
    /// Reader name (defaults to the configured reader, then the first one found)
    #[arg(short, long)]
    reader: Option<String>,

    /// Also read the photo
    #[arg(long)]
    photo: bool,

    /// Path to a JSON reader config
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Wait up to this many seconds for a card to be inserted
    #[arg(long)]
    wait: Option<u64>,

    /// List readers and exit
    #[arg(long)]
    list: bool,

    /// Write the record JSON to this file instead of stdout
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

fn main() {
    let args = Args::parse();

    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::builder()
                .with_default_directive(if args.verbose {
                    tracing::Level::DEBUG.into()
                } else {
                    tracing::Level::INFO.into()
                })
                .from_env_lossy(),
        )
        .with_writer(std::io::stderr)
        .finish();

    tracing::subscriber::set_global_default(subscriber).expect("setting default subscriber failed");

    if let Err(e) = run(args) {
        error!("Error: {}", e);
        std::process::exit(1);
    }
}

fn run(args: Args) -> Result<(), Box<dyn std::error::Error>> {
    let config = match &args.config {
        Some(path) => ReaderConfig::load(path)?,
        None => ReaderConfig::default(),
    };

    let reader = CardReader::new()?;

    if args.list {
        for name in reader.list_readers()? {
            println!("{}", name);
        }
        return Ok(());
    }

    let reader_name = match args.reader.or_else(|| config.reader.clone()) {
        Some(name) => name,
        None => reader
            .list_readers()?
            .into_iter()
            .next()
            .ok_or("no card readers found")?,
    };

    if let Some(secs) = args.wait {
        info!(reader = %reader_name, "Waiting for card...");
        let status = reader.wait_for_card(&reader_name, Duration::from_secs(secs))?;
        if !status.present {
            return Err(format!("no card in {} after {}s", reader_name, secs).into());
        }
    }

    let transport = reader.connect(&reader_name, config.share_mode, config.protocol)?;
    match transport.atr() {
        Some(atr) => info!(reader = %reader_name, atr = %hex::encode_upper(&atr), "Card connected"),
        None => info!(reader = %reader_name, "Card connected"),
    }
    let options = ReadOptions {
        with_photo: args.photo || config.with_photo,
        exchange: config.exchange(),
    };
    let session = ReadSession::new(transport, Arc::new(config.catalog.clone()), options);

    let mut outcome = None;
    session.run(&mut FnSink(|event: ProgressEvent| match event {
        ProgressEvent::Start => info!(reader = %reader_name, "Reading card"),
        ProgressEvent::Reading(progress) => {
            info!("[{}/{}] {}", progress.step, progress.of, progress.message);
        }
        ProgressEvent::Complete(record) => outcome = Some(Ok(record)),
        ProgressEvent::Error(e) => outcome = Some(Err(e)),
    }));

    let record = match outcome {
        Some(Ok(record)) => record,
        Some(Err(e)) => return Err(e.into()),
        None => return Err("session ended without a result".into()),
    };

    let json = serde_json::to_string_pretty(&record)?;
    match args.output {
        Some(path) => {
            std::fs::write(&path, json)?;
            info!(path = %path.display(), "Record written");
        }
        None => println!("{}", json),
    }
    Ok(())
}
