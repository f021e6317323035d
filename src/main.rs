use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use tapedrive::label;
use tapedrive::{DeviceInfo, TapeDrive};

/// Poke a tape drive: identity, position, alerts, compression counters.
#[derive(Parser)]
#[command(name = "tapectl", version)]
struct Args {
    /// Generic SCSI device file of the drive
    #[arg(long, default_value = "/dev/sg0")]
    sg: PathBuf,

    /// No-rewind tape device file of the drive
    #[arg(long, default_value = "/dev/nst0")]
    nst: PathBuf,

    /// Rewind tape device file of the drive
    #[arg(long, default_value = "/dev/st0")]
    st: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Print vendor, product, revision and serial number
    Info,
    /// Print the logical position and the drive buffer state
    Position,
    /// Print the active TapeAlert conditions
    Alerts,
    /// Print the cumulative compression counters
    Compression {
        /// Reset the drive's counters after reading them
        #[arg(long)]
        clear: bool,
    },
    /// Rewind the tape
    Rewind,
    /// Unload the tape from the drive
    Unload,
    /// Write a fresh volume label set (VOL1 + prelabel). Rewinds first.
    Label {
        /// Volume serial number, up to 6 characters
        vsn: String,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let args = Args::parse();
    let info = DeviceInfo {
        device_type: 1,
        sg_dev: args.sg,
        st_dev: args.st,
        nst_dev: args.nst,
        sg_major_minor: (0, 0),
        st_major_minor: (0, 0),
        nst_major_minor: (0, 0),
    };
    let drive = TapeDrive::open(info)?;

    match args.command {
        Command::Info => {
            let identity = drive.device_info()?;
            println!("vendor:   {}", identity.vendor);
            println!("product:  {}", identity.product);
            println!("revision: {}", identity.product_revision_level);
            println!("serial:   {}", identity.serial_number);
            println!("family:   {:?}", drive.family());
        }
        Command::Position => {
            let pos = drive.position_info()?;
            println!("position:      {}", pos.current_position);
            println!("oldest dirty:  {}", pos.oldest_dirty_object);
            println!("dirty objects: {}", pos.dirty_objects_count);
            println!("dirty bytes:   {}", pos.dirty_bytes_count);
        }
        Command::Alerts => {
            let alerts = drive.tape_alerts()?;
            if alerts.is_empty() {
                println!("no active tape alerts");
            }
            for alert in alerts {
                println!("{alert}");
            }
        }
        Command::Compression { clear } => {
            let stats = drive.compression_stats()?;
            println!("from host: {}", stats.from_host);
            println!("to tape:   {}", stats.to_tape);
            println!("from tape: {}", stats.from_tape);
            println!("to host:   {}", stats.to_host);
            if clear {
                drive.clear_compression_stats()?;
            }
        }
        Command::Rewind => drive.rewind()?,
        Command::Unload => drive.unload_tape()?,
        Command::Label { vsn } => {
            drive.rewind()?;
            label::label_tape(&drive, &vsn)?;
        }
    }
    Ok(())
}
