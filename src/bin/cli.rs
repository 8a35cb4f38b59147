//! ledgerstore CLI
//!
//! Drives a buffered channel or a write cache from the command line.

use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use ledgerstore::{BufferedChannel, Config, FileHandle, HeapAllocator, WriteCache};
use tracing_subscriber::{fmt, EnvFilter};

/// ledgerstore CLI
#[derive(Parser, Debug)]
#[command(name = "ledgerstore-cli")]
#[command(about = "Exercise the ledgerstore write path")]
#[command(version)]
struct Args {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Append the contents of a file through a buffered channel
    Append {
        /// Log file to append to (created if missing)
        #[arg(short, long)]
        file: PathBuf,

        /// Write buffer capacity in bytes
        #[arg(short, long, default_value = "65536")]
        capacity: usize,

        /// Sync the log file before exiting
        #[arg(long)]
        sync: bool,

        /// File whose bytes are appended
        input: PathBuf,
    },

    /// Read a byte range from a log file and hex-dump it
    Read {
        /// Log file to read from
        #[arg(short, long)]
        file: PathBuf,

        /// Start offset
        #[arg(short, long, default_value = "0")]
        position: i64,

        /// Number of bytes
        #[arg(short, long)]
        length: i64,
    },

    /// Fill a write cache and report how many records it admitted
    CacheFill {
        /// Cache capacity in bytes
        #[arg(short, long, default_value = "1048576")]
        capacity: usize,

        /// Segment size in bytes (defaults to the capacity)
        #[arg(short, long)]
        segment_size: Option<usize>,

        /// Number of records to put
        #[arg(short, long, default_value = "1000")]
        records: i64,

        /// Size of each record in bytes
        #[arg(long, default_value = "1024")]
        record_size: usize,
    },
}

fn main() {
    // Initialize tracing/logging
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,ledgerstore=debug"));

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(true)
        .init();

    let args = Args::parse();

    if let Err(e) = run(args.command) {
        tracing::error!("Command failed: {}", e);
        std::process::exit(1);
    }
}

fn run(command: Commands) -> ledgerstore::Result<()> {
    let allocator = Arc::new(HeapAllocator);

    match command {
        Commands::Append { file, capacity, sync, input } => {
            let data = std::fs::read(&input)?;
            let config = Config::builder().write_buffer_capacity(capacity).build();
            let channel = BufferedChannel::from_config(allocator, FileHandle::open(&file)?, &config)?;

            let written = channel.write(Some(&data))?;
            if sync {
                channel.sync()?;
            }
            let position = channel.position();
            channel.close()?;

            println!("appended {} bytes, position {}", written, position);
        }

        Commands::Read { file, position, length } => {
            let channel = BufferedChannel::new(allocator, FileHandle::open(&file)?, 0)?;
            channel.check_range(position, length)?;
            let mut dest = vec![0u8; length as usize];
            channel.read(&mut dest, position, length)?;
            channel.close()?;

            for (i, line) in dest.chunks(16).enumerate() {
                let hex: Vec<String> = line.iter().map(|b| format!("{:02x}", b)).collect();
                println!("{:08x}  {}", position as usize + i * 16, hex.join(" "));
            }
        }

        Commands::CacheFill { capacity, segment_size, records, record_size } => {
            let cache = WriteCache::with_segment_size(
                allocator,
                capacity,
                segment_size.unwrap_or(capacity),
            )?;

            let record = vec![0xA5u8; record_size];
            let mut accepted = 0;
            let mut rejected = 0;
            for record_id in 0..records {
                if cache.put(0, record_id, &record)? {
                    accepted += 1;
                } else {
                    rejected += 1;
                }
            }

            println!(
                "accepted {} rejected {} size {}/{} segments {}",
                accepted,
                rejected,
                cache.size(),
                cache.capacity(),
                cache.segment_count()
            );
            cache.close()?;
        }
    }

    Ok(())
}
