use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{bail, Context};
use chrono::{DateTime, Duration, Utc};
use futures::TryStreamExt;
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tokio_util::io::ReaderStream;
use tracing::{info, warn};

use swiftfs_common::{ByteStream, Config, FilesystemAdapter, Payload};
use swiftfs_swift::{DeleteDirOutcome, MemoryStore, SwiftAdapter, SwiftClient, SwiftConfig};

use crate::cli::{Cli, Command, PutArgs};

const MEMORY_CONTAINER: &str = "swiftfs";

pub async fn run(cli: Cli) -> anyhow::Result<()> {
    if cli.memory {
        let adapter = SwiftAdapter::new(Arc::new(MemoryStore::new(MEMORY_CONTAINER)), "");
        return execute(&adapter, cli.command).await;
    }

    let config = SwiftConfig::load(&cli.config)?;

    if let Command::Init = cli.command {
        let client = SwiftClient::connect(&config)
            .await
            .context("Failed to connect to Swift")?;
        client
            .ensure_container()
            .await
            .with_context(|| format!("Failed to create container '{}'", config.container))?;
        info!(container = %config.container, "Container ready");
        return Ok(());
    }

    let adapter = SwiftAdapter::connect(&config)
        .await
        .context("Failed to connect to Swift")?;
    execute(&adapter, cli.command).await
}

async fn execute(adapter: &SwiftAdapter, command: Command) -> anyhow::Result<()> {
    match command {
        Command::Init => {
            info!(container = %adapter.container_name(), "In-memory container ready");
        }
        Command::Put(args) => put(adapter, args).await?,
        Command::Get { path, out } => {
            let out = out.unwrap_or_else(|| default_output(&path));
            let mut file = tokio::fs::File::create(&out)
                .await
                .with_context(|| format!("Failed to create {}", out.display()))?;
            let size = download(adapter, &path, &mut file).await?;
            info!(path = %path, out = %out.display(), size, "Downloaded");
        }
        Command::Cat { path } => {
            download(adapter, &path, &mut tokio::io::stdout()).await?;
        }
        Command::Rm { path } => {
            adapter.delete(&path).await?;
            info!(path = %path, "Deleted");
        }
        Command::Rmdir { path } => match adapter.delete_dir(&path).await? {
            DeleteDirOutcome::Refused => bail!("Refusing to delete the container root"),
            DeleteDirOutcome::Completed { deleted } => {
                info!(path = %path, deleted, "Directory deleted");
            }
            DeleteDirOutcome::Aborted {
                deleted,
                failed_key,
                error,
            } => {
                warn!(deleted, "Objects deleted before the failure are not restored");
                bail!("Failed to delete {}: {}", failed_key, error);
            }
        },
        Command::Mv {
            source,
            destination,
        } => {
            adapter
                .move_file(&source, &destination, &Config::default())
                .await?;
            info!(from = %source, to = %destination, "Moved");
        }
        Command::Ls { path } => {
            let mut entries = adapter.list_contents(&path, true);
            while let Some(attrs) = entries.try_next().await? {
                println!(
                    "{:>12}  {}  {}",
                    attrs.file_size.unwrap_or(0),
                    format_timestamp(attrs.last_modified),
                    attrs.path
                );
            }
        }
        Command::Stat { path } => {
            let attrs = adapter.mime_type(&path).await?;
            println!("{}", serde_json::to_string_pretty(&attrs)?);
        }
        Command::Exists { path } => {
            println!("{}", adapter.file_exists(&path).await?);
        }
        Command::Url { path, ttl } => {
            let url = adapter.temporary_url(&path, expiry(Utc::now(), ttl)?)?;
            println!("{}", url);
        }
    }
    Ok(())
}

async fn put(adapter: &SwiftAdapter, args: PutArgs) -> anyhow::Result<()> {
    let file = tokio::fs::File::open(&args.file)
        .await
        .with_context(|| format!("Failed to open {}", args.file.display()))?;
    let size = file.metadata().await?.len();
    let stream: ByteStream = Box::pin(ReaderStream::new(file));

    let config = Config {
        swift_large_object_threshold: args.threshold,
        swift_segment_size: args.segment_size,
        swift_segment_container: args.segment_container,
    };
    adapter
        .write(&args.path, Payload::sized_stream(stream, size), &config)
        .await?;
    info!(path = %args.path, size, "Uploaded");
    Ok(())
}

/// Copy a file's contents into `writer`, returning the number of bytes.
async fn download<W>(adapter: &SwiftAdapter, path: &str, writer: &mut W) -> anyhow::Result<u64>
where
    W: AsyncWrite + Unpin,
{
    let (_, mut stream) = adapter.read_stream(path).await?;
    let mut written = 0u64;
    while let Some(chunk) = stream.try_next().await? {
        writer.write_all(&chunk).await?;
        written += chunk.len() as u64;
    }
    writer.flush().await?;
    Ok(written)
}

/// The instant `ttl` seconds after `now`.
fn expiry(now: DateTime<Utc>, ttl: i64) -> anyhow::Result<DateTime<Utc>> {
    if ttl <= 0 {
        bail!("--ttl must be positive");
    }
    let Some(expires_at) = Duration::try_seconds(ttl).and_then(|d| now.checked_add_signed(d)) else {
        bail!("--ttl {} is out of range", ttl);
    };
    Ok(expires_at)
}

fn default_output(path: &str) -> PathBuf {
    let name = path
        .rsplit('/')
        .find(|segment| !segment.is_empty())
        .unwrap_or("download");
    Path::new(name).to_path_buf()
}

fn format_timestamp(timestamp: Option<i64>) -> String {
    timestamp
        .and_then(|ts| DateTime::<Utc>::from_timestamp(ts, 0))
        .map(|d| d.format("%Y-%m-%d %H:%M:%S").to_string())
        .unwrap_or_else(|| "-".to_string())
}
