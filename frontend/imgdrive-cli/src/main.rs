mod verify;

use anyhow::{Context, anyhow, bail};
use clap::{Parser, Subcommand};
use drive_core::catalog::{CatalogConfig, ImageCatalog};
use drive_core::drive::{Drive, MediaEvent};
use drive_core::media::DirectoryMedia;
use env_logger::Env;
use imgfile::device::BlockDevice;
use imgfile::resolve::{RequestFlags, SectorClass};
use imgfile::{BYTES_PER_SECTOR, UNITS_PER_BLOCK, UNITS_PER_SECTOR};
use serde::Deserialize;
use std::fs::{self, File};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use verify::VerifySummary;

const CATALOG_OPTIONS_HEADING: &str = "Image Catalog Options";

#[derive(Parser)]
struct Args {
    /// Directory standing in for the root of the removable media
    #[arg(short = 'm', long)]
    media_dir: PathBuf,

    /// TOML config file; command-line options override it
    #[arg(long)]
    config: Option<PathBuf>,

    /// Image file name prefix (default "disc")
    #[arg(long, help_heading = CATALOG_OPTIONS_HEADING)]
    name_prefix: Option<String>,

    /// Image file name suffix (default ".img")
    #[arg(long, help_heading = CATALOG_OPTIONS_HEADING)]
    name_suffix: Option<String>,

    /// Zero-padded width of image numbers in log output (default 3)
    #[arg(long, help_heading = CATALOG_OPTIONS_HEADING)]
    number_width: Option<usize>,

    /// Number of the image to load
    #[arg(long, help_heading = CATALOG_OPTIONS_HEADING)]
    image: Option<u32>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Print the image header and region map
    Info,
    /// Dump one of the image's tables of contents
    Toc {
        #[arg(long, default_value_t = 0)]
        index: u8,
    },
    /// Read logical sectors through the data path
    Read {
        #[arg(long)]
        sector: u32,
        /// Request flag byte, decimal or 0x-prefixed hex
        #[arg(long, value_parser = parse_flags, default_value = "0x20")]
        flags: u8,
        #[arg(long, default_value_t = 1)]
        count: u32,
        /// Write delivered bytes here instead of hex dumping them
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Stream raw audio blocks through the CDDA buffer
    Cdda {
        #[arg(long)]
        sector: u32,
        #[arg(long, default_value_t = 16)]
        blocks: u32,
        #[arg(short, long)]
        output: PathBuf,
    },
    /// Check the EDC of every sector in every data region
    Verify,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct FileConfig {
    catalog: CatalogConfig,
}

impl Args {
    fn catalog_config(&self) -> anyhow::Result<CatalogConfig> {
        let mut config = match &self.config {
            Some(path) => {
                let config_str = fs::read_to_string(path)
                    .with_context(|| format!("Unable to read config file '{}'", path.display()))?;
                let file_config: FileConfig = toml::from_str(&config_str)
                    .with_context(|| format!("Invalid config file '{}'", path.display()))?;
                file_config.catalog
            }
            None => CatalogConfig::default(),
        };

        if let Some(name_prefix) = &self.name_prefix {
            config.name_prefix.clone_from(name_prefix);
        }
        if let Some(name_suffix) = &self.name_suffix {
            config.name_suffix.clone_from(name_suffix);
        }
        if let Some(number_width) = self.number_width {
            config.number_width = number_width;
        }
        if let Some(image) = self.image {
            config.first_number = image;
        }

        Ok(config)
    }
}

fn parse_flags(s: &str) -> Result<u8, String> {
    let result = match s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        Some(hex) => u8::from_str_radix(hex, 16),
        None => s.parse(),
    };
    result.map_err(|err| format!("invalid flag byte '{s}': {err}"))
}

type DirectoryDrive = Drive<DirectoryMedia>;

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();

    let args = Args::parse();
    let catalog = ImageCatalog::new(args.catalog_config()?)?;
    log::info!("Looking for image '{}' in '{}'", catalog.current_name(), args.media_dir.display());

    let mut drive = Drive::new(DirectoryMedia::new(&args.media_dir), catalog);
    match drive.service()? {
        Some(MediaEvent::Inserted { image_number }) => log::info!("Loaded image {image_number}"),
        _ => bail!("No media found at '{}'", args.media_dir.display()),
    }

    match args.command {
        Command::Info => print_info(&drive),
        Command::Toc { index } => print_toc(&drive, index),
        Command::Read { sector, flags, count, output } => {
            read_sectors(&mut drive, sector, flags, count, output.as_deref())
        }
        Command::Cdda { sector, blocks, output } => {
            stream_cdda(&mut drive, sector, blocks, &output)
        }
        Command::Verify => verify_image(&mut drive),
    }
}

fn print_info(drive: &DirectoryDrive) -> anyhow::Result<()> {
    let session = drive.session().ok_or(drive_core::DriveError::NoMedia)?;
    let header = session.header();

    println!("Disk type: {:02X}{}", header.disk_type, if header.is_xa() { " (XA)" } else { "" });
    println!("TOCs: {}", header.num_tocs);
    println!("Image blocks: {}", session.device().block_count());
    println!("Regions:");
    for (i, region) in header.regions.iter().enumerate() {
        println!(
            "  {i:2}: start sector {:6}  mode {:02X}  block {:7}  {}{}",
            region.start_sector,
            region.raw_mode,
            region.file_offset,
            if region.is_data() { "data" } else { "audio" },
            if region.is_lead_in() { ", lead-in" } else { "" }
        );
    }

    Ok(())
}

fn print_toc(drive: &DirectoryDrive, index: u8) -> anyhow::Result<()> {
    let toc = drive
        .get_toc(index)
        .map_err(|status| anyhow!("TOC {index} unavailable (status {status:02X})"))?;
    hex_dump(toc.as_bytes(), &mut io::stdout().lock())?;
    Ok(())
}

fn hex_dump<W: Write>(bytes: &[u8], out: &mut W) -> io::Result<()> {
    for (i, line) in bytes.chunks(16).enumerate() {
        write!(out, "{:06X}:", i * 16)?;
        for byte in line {
            write!(out, " {byte:02X}")?;
        }
        writeln!(out)?;
    }
    Ok(())
}

fn read_sectors(
    drive: &mut DirectoryDrive,
    sector: u32,
    flags: u8,
    count: u32,
    output: Option<&Path>,
) -> anyhow::Result<()> {
    if !drive.seek_data(sector, flags) {
        bail!("Seek to sector {sector} with flags {flags:02X} failed");
    }

    let mut out = Vec::new();
    for i in 0..count {
        if !drive.read_data_sector(&mut out) {
            bail!("Data read failed in sector {}", sector + i);
        }
    }
    log::info!("Read {count} sector(s), {} bytes", out.len());

    match output {
        Some(path) => fs::write(path, &out)
            .with_context(|| format!("Unable to write '{}'", path.display()))?,
        None => hex_dump(&out, &mut io::stdout().lock())?,
    }

    Ok(())
}

fn stream_cdda(
    drive: &mut DirectoryDrive,
    sector: u32,
    blocks: u32,
    output: &Path,
) -> anyhow::Result<()> {
    if !drive.play_cdda(sector) {
        bail!("Unable to start CDDA playback at sector {sector}");
    }

    let file = File::create(output)
        .with_context(|| format!("Unable to create '{}'", output.display()))?;
    let mut writer = BufWriter::new(file);

    drive.service_cdda();
    for written in 0..blocks {
        let samples = drive
            .cdda_samples()
            .ok_or_else(|| anyhow!("CDDA playback stopped after {written} block(s)"))?;
        writer.write_all(samples)?;
        drive.release_cdda_samples();
        drive.service_cdda();
    }
    drive.stop_cdda();
    writer.flush()?;

    log::info!("Wrote {blocks} CDDA block(s) to '{}'", output.display());

    Ok(())
}

fn verify_image(drive: &mut DirectoryDrive) -> anyhow::Result<()> {
    let session = drive.session().ok_or(drive_core::DriveError::NoMedia)?;
    let block_count = session.device().block_count();
    let regions = session.header().regions.clone();

    let mut summary = VerifySummary::default();
    let raw_flags = RequestFlags::new(SectorClass::Raw, RequestFlags::RAW_PASSTHROUGH);
    let mut sector_buf = Vec::with_capacity(BYTES_PER_SECTOR);

    for (i, region) in regions.iter().enumerate() {
        if !region.is_data() {
            continue;
        }

        let sector_count = match regions.get(i + 1) {
            Some(next) => next.start_sector.saturating_sub(region.start_sector),
            None => {
                let units = u64::from(block_count.saturating_sub(region.file_offset))
                    * u64::from(UNITS_PER_BLOCK);
                (units / u64::from(UNITS_PER_SECTOR)) as u32
            }
        };
        log::info!("Verifying {sector_count} sector(s) from sector {}", region.start_sector);
        if sector_count == 0 {
            continue;
        }

        if !drive.seek_data(region.start_sector, raw_flags.0) {
            bail!("Seek to sector {} failed", region.start_sector);
        }
        for sector in region.start_sector..region.start_sector + sector_count {
            sector_buf.clear();
            if !drive.read_data_sector(&mut sector_buf) {
                bail!("Data read failed in sector {sector}");
            }

            let raw: &[u8; BYTES_PER_SECTOR] = sector_buf
                .as_slice()
                .try_into()
                .with_context(|| format!("Sector {sector} is {} bytes", sector_buf.len()))?;
            summary.record(sector, verify::check_edc(raw));
        }
    }

    println!(
        "{} valid, {} without EDC, {} unchecked, {} mismatched",
        summary.valid, summary.absent, summary.unchecked, summary.mismatched
    );
    if summary.mismatched != 0 {
        bail!("{} sector(s) failed EDC verification", summary.mismatched);
    }

    Ok(())
}
