use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

#[derive(Debug, Clone, Parser)]
#[command(name = "classpath-scanner")]
#[command(about = "Scan a classpath and query class, interface and annotation relations")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Classpath root (directory or jar/zip archive); repeat to add more,
    /// scanned in the order given.
    #[arg(long = "root", value_name = "PATH", required = true)]
    pub roots: Vec<PathBuf>,

    /// Package filter; prefix with '-' to blacklist a subtree. No filter
    /// means scan everything.
    #[arg(long = "package", value_name = "PKG")]
    pub packages: Vec<String>,

    /// Trust per-entry timestamps inside archives instead of the archive
    /// file's own modification time.
    #[arg(long)]
    pub archive_entry_timestamps: bool,
}

#[derive(Debug, Clone, Subcommand)]
pub enum Commands {
    /// List every class and interface found on the classpath.
    Classes {
        #[arg(short = 'f', long, value_enum, default_value_t = OutputFormat::Json)]
        format: OutputFormat,
    },
    /// List classes that transitively extend the given class.
    Subclasses { superclass: String },
    /// List classes the given class transitively extends.
    Superclasses { subclass: String },
    /// List interfaces that transitively extend the given interface.
    Subinterfaces { superinterface: String },
    /// List interfaces the given interface transitively extends.
    Superinterfaces { subinterface: String },
    /// List classes implementing the given interface, directly or through
    /// a superclass or subinterface.
    Implementors { interface: String },
    /// List classes carrying the given annotation.
    Annotated { annotation: String },
}

#[derive(Debug, Copy, Clone, ValueEnum)]
pub enum OutputFormat {
    Json,
    Text,
}
