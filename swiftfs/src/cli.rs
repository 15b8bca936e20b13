//! Command-line arguments.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

pub const DEFAULT_CONFIG_PATH: &str = "swiftfs.toml";

/// swiftfs - work with files stored in an OpenStack Swift container
#[derive(Parser, Debug)]
#[command(name = "swiftfs", version, about)]
pub struct Cli {
    /// Connection settings (container, prefix, credentials)
    #[arg(short = 'c', long = "config", value_name = "FILE", default_value = DEFAULT_CONFIG_PATH)]
    pub config: PathBuf,

    /// Use an in-process store instead of connecting to Swift. Nothing
    /// outlives the invocation.
    #[arg(long = "memory")]
    pub memory: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Create the configured container if it does not exist
    Init,
    /// Upload a local file
    Put(PutArgs),
    /// Download a file
    Get {
        path: String,
        /// Output file (defaults to the last path segment)
        #[arg(short = 'o', long = "out", value_name = "FILE")]
        out: Option<PathBuf>,
    },
    /// Write a file's contents to stdout
    Cat { path: String },
    /// Delete a file
    Rm { path: String },
    /// Delete every object under a directory
    Rmdir { path: String },
    /// Move a file
    Mv { source: String, destination: String },
    /// List files under a directory
    Ls {
        #[arg(default_value = "")]
        path: String,
    },
    /// Print a file's attributes as JSON
    Stat { path: String },
    /// Print whether a file exists
    Exists { path: String },
    /// Print a signed temporary download URL
    Url {
        path: String,
        /// Lifetime in seconds
        #[arg(long = "ttl", default_value_t = 3600)]
        ttl: i64,
    },
}

#[derive(Args, Debug)]
pub struct PutArgs {
    /// Destination path in the container
    pub path: String,
    /// Local file to upload
    pub file: PathBuf,
    /// Size in bytes above which the file is uploaded in segments
    #[arg(long = "threshold", value_name = "BYTES")]
    pub threshold: Option<u64>,
    /// Segment size in bytes for segmented uploads
    #[arg(long = "segment-size", value_name = "BYTES")]
    pub segment_size: Option<u64>,
    /// Container that receives the segments
    #[arg(long = "segment-container", value_name = "NAME")]
    pub segment_container: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let cli = Cli::try_parse_from(["swiftfs", "ls"]).unwrap();
        assert_eq!(cli.config, PathBuf::from(DEFAULT_CONFIG_PATH));
        assert!(!cli.memory);
        assert!(matches!(cli.command, Command::Ls { ref path } if path.is_empty()));
    }

    #[test]
    fn test_put_flags() {
        let cli = Cli::try_parse_from([
            "swiftfs",
            "--memory",
            "put",
            "a/b.bin",
            "local.bin",
            "--threshold",
            "1024",
            "--segment-container",
            "segments",
        ])
        .unwrap();
        assert!(cli.memory);
        let Command::Put(args) = cli.command else {
            panic!("expected put");
        };
        assert_eq!(args.path, "a/b.bin");
        assert_eq!(args.file, PathBuf::from("local.bin"));
        assert_eq!(args.threshold, Some(1024));
        assert_eq!(args.segment_size, None);
        assert_eq!(args.segment_container.as_deref(), Some("segments"));
    }

    #[test]
    fn test_url_ttl() {
        let cli = Cli::try_parse_from(["swiftfs", "url", "a.txt"]).unwrap();
        assert!(matches!(cli.command, Command::Url { ttl: 3600, .. }));
        let cli = Cli::try_parse_from(["swiftfs", "url", "a.txt", "--ttl", "60"]).unwrap();
        assert!(matches!(cli.command, Command::Url { ttl: 60, .. }));
    }

    #[test]
    fn test_missing_arguments_rejected() {
        assert!(Cli::try_parse_from(["swiftfs", "mv", "a"]).is_err());
        assert!(Cli::try_parse_from(["swiftfs"]).is_err());
    }
}
