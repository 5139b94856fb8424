//! Command line and environment configuration

use clap::Parser;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};

const BYTES_PER_MB: usize = 1024 * 1024;

#[derive(Parser, Debug, Clone)]
#[command(
    name = "qrstamp",
    version,
    about = "Stamp uploaded PDF documents with a verification QR code"
)]
pub struct Args {
    /// Address to listen on.
    #[arg(long, env = "QRSTAMP_BIND", default_value = "127.0.0.1:8000")]
    pub bind: SocketAddr,

    /// Directory holding `uploads/` and `output/`.
    #[arg(long, env = "QRSTAMP_BASE_DIR", default_value = ".")]
    pub base_dir: PathBuf,

    /// Largest accepted request body, in megabytes.
    #[arg(long, env = "QRSTAMP_MAX_UPLOAD_MB", default_value_t = 50,
          value_parser = clap::value_parser!(u64).range(1..=4096))]
    pub max_upload_mb: u64,
}

/// Resolved runtime configuration shared by the handlers
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    /// Raw uploads, stored as `<uuid>.pdf`
    pub upload_dir: PathBuf,
    /// Stamped documents, served under `/files`
    pub output_dir: PathBuf,
    pub max_upload_bytes: usize,
}

impl AppConfig {
    /// Lay out `uploads/` and `output/` below `base_dir`
    pub fn new<P: AsRef<Path>>(base_dir: P, max_upload_bytes: usize) -> Self {
        let base_dir = base_dir.as_ref();
        Self {
            upload_dir: base_dir.join("uploads"),
            output_dir: base_dir.join("output"),
            max_upload_bytes,
        }
    }

    pub fn from_args(args: &Args) -> Self {
        Self::new(&args.base_dir, args.max_upload_mb as usize * BYTES_PER_MB)
    }

    /// Create the storage directories if they are missing
    pub fn ensure_dirs(&self) -> std::io::Result<()> {
        std::fs::create_dir_all(&self.upload_dir)?;
        std::fs::create_dir_all(&self.output_dir)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_defaults() {
        let args = Args::try_parse_from(["qrstamp"]).unwrap();
        assert_eq!(args.bind, "127.0.0.1:8000".parse().unwrap());
        assert_eq!(args.base_dir, PathBuf::from("."));
        assert_eq!(args.max_upload_mb, 50);
    }

    #[test]
    fn test_flags() {
        let args = Args::try_parse_from([
            "qrstamp",
            "--bind",
            "0.0.0.0:9000",
            "--base-dir",
            "/srv/qrstamp",
            "--max-upload-mb",
            "5",
        ])
        .unwrap();

        let config = AppConfig::from_args(&args);
        assert_eq!(config.upload_dir, PathBuf::from("/srv/qrstamp/uploads"));
        assert_eq!(config.output_dir, PathBuf::from("/srv/qrstamp/output"));
        assert_eq!(config.max_upload_bytes, 5 * 1024 * 1024);
    }

    #[test]
    fn test_zero_upload_limit_rejected() {
        assert!(Args::try_parse_from(["qrstamp", "--max-upload-mb", "0"]).is_err());
    }

    #[test]
    fn test_ensure_dirs() {
        let dir = tempfile::tempdir().unwrap();
        let config = AppConfig::new(dir.path().join("data"), 1024);

        config.ensure_dirs().unwrap();
        assert!(config.upload_dir.is_dir());
        assert!(config.output_dir.is_dir());

        // idempotent
        config.ensure_dirs().unwrap();
    }
}
