//! The `lumen prep` command for downloading and converting corpora.
//!
//! `prep iaprtc12` streams the corpus archive to disk, unpacks the gzipped
//! tar, walks the annotation directory, and writes the text-feature JSONL the
//! train command consumes. `prep mscoco` converts an already-extracted
//! captions JSON file the same way.

use clap::{Args, Subcommand};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use lumen_core::dataset::{iaprtc12, mscoco, TextRecord};
use lumen_core::Config;

/// Arguments for the `prep` command.
#[derive(Args, Debug)]
pub struct PrepArgs {
    #[command(subcommand)]
    pub command: PrepCommand,
}

/// Corpora that can be prepared.
#[derive(Subcommand, Debug)]
pub enum PrepCommand {
    /// Download and convert the IAPR TC-12 annotation corpus
    Iaprtc12 {
        /// Working directory (defaults to `<data_dir>/iaprtc12`)
        #[arg(long)]
        data_dir: Option<PathBuf>,

        /// Convert an existing extraction instead of downloading
        #[arg(long)]
        skip_download: bool,

        /// Output text-feature file (defaults to `<data_dir>/iaprtc12_text.jsonl`)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Convert an extracted MSCOCO captions JSON file
    Mscoco {
        /// Path to a captions file (e.g. captions_train2014.json)
        captions: PathBuf,

        /// Output text-feature file (defaults next to the captions file)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

/// Execute the prep command.
pub async fn execute(args: PrepArgs, config: &Config) -> anyhow::Result<()> {
    match args.command {
        PrepCommand::Iaprtc12 {
            data_dir,
            skip_download,
            output,
        } => {
            let work_dir = data_dir.unwrap_or_else(|| config.data_dir().join("iaprtc12"));
            std::fs::create_dir_all(&work_dir)?;

            if !skip_download {
                let archive = work_dir.join("iaprtc12.tgz");
                if archive.exists() {
                    tracing::info!("Archive already exists at {:?}", archive);
                } else {
                    let client = reqwest::Client::new();
                    download_file(&client, iaprtc12::IAPRTC12_URL, &archive).await?;
                }
                tracing::info!("Extracting {:?}", archive);
                extract_tgz(&archive, &work_dir)?;
            }

            let annotations_dir = work_dir.join("annotations");
            if !annotations_dir.exists() {
                anyhow::bail!(
                    "No annotations directory at {:?} — download the corpus first \
                     or point --data-dir at an extraction.",
                    annotations_dir
                );
            }

            let records = iaprtc12::convert_annotations(&annotations_dir)?;
            let output = output.unwrap_or_else(|| work_dir.join("iaprtc12_text.jsonl"));
            write_records(&records, &output)?;
        }

        PrepCommand::Mscoco { captions, output } => {
            let parsed = mscoco::read_captions(&captions)?;
            let records = mscoco::convert_captions(&parsed);
            let output = output.unwrap_or_else(|| captions.with_extension("jsonl"));
            write_records(&records, &output)?;
        }
    }

    Ok(())
}

/// Write text-feature records as JSON Lines.
fn write_records(records: &[TextRecord], path: &Path) -> anyhow::Result<()> {
    let file = File::create(path)?;
    let mut writer = BufWriter::new(file);
    for record in records {
        serde_json::to_writer(&mut writer, record)?;
        writeln!(writer)?;
    }
    writer.flush()?;
    tracing::info!("Wrote {} record(s) to {:?}", records.len(), path);
    Ok(())
}

/// Download a file from a URL to a local path, streaming to disk with a
/// progress bar.
async fn download_file(client: &reqwest::Client, url: &str, dest: &Path) -> anyhow::Result<()> {
    use futures_util::StreamExt;
    use tokio::io::AsyncWriteExt;

    tracing::info!("Downloading {}", url);
    tracing::info!("  Destination: {:?}", dest);

    let response = client
        .get(url)
        .send()
        .await?
        .error_for_status()
        .map_err(|e| anyhow::anyhow!("Download failed: {e}"))?;

    let progress = create_progress_bar(response.content_length());

    let mut file = tokio::fs::File::create(dest).await?;
    let mut stream = response.bytes_stream();
    while let Some(chunk) = stream.next().await {
        let chunk = chunk?;
        file.write_all(&chunk).await?;
        progress.inc(chunk.len() as u64);
    }
    file.flush().await?;
    progress.finish_and_clear();

    let size = std::fs::metadata(dest)?.len();
    tracing::info!("  Download complete ({:.1} MB)", size as f64 / (1024.0 * 1024.0));
    Ok(())
}

/// Create a byte-counting progress bar, or a spinner when the server did not
/// declare a content length.
fn create_progress_bar(total: Option<u64>) -> indicatif::ProgressBar {
    use indicatif::{ProgressBar, ProgressStyle};

    match total {
        Some(total) => {
            let pb = ProgressBar::new(total);
            pb.set_style(
                ProgressStyle::default_bar()
                    .template(
                        "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {bytes}/{total_bytes} ({eta})",
                    )
                    .unwrap()
                    .progress_chars("##-"),
            );
            pb
        }
        None => {
            let pb = ProgressBar::new_spinner();
            pb.set_style(
                ProgressStyle::default_spinner()
                    .template("{spinner:.green} {bytes} downloaded")
                    .unwrap(),
            );
            pb
        }
    }
}

/// Unpack a gzipped tar archive into `dest`.
fn extract_tgz(archive_path: &Path, dest: &Path) -> anyhow::Result<()> {
    let file = File::open(archive_path)?;
    let decoder = flate2::read::GzDecoder::new(file);
    let mut archive = tar::Archive::new(decoder);
    archive.unpack(dest)?;
    Ok(())
}
