use clap::{Parser, Subcommand, ValueEnum};
use std::path::{Path, PathBuf};

use crate::formats::FormatDescriptor;
use crate::shell::{AssocMode, OpenMode};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Clone, Debug)]
pub enum Commands {
    /// Compress files or directories into an archive.
    #[command(name = "c", alias = "compress")]
    Compress {
        /// One or more input files or directories.
        #[arg(required = true)]
        inputs: Vec<PathBuf>,

        /// Output archive path. Defaults to the first input's name plus the
        /// format's extension, next to the input.
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Archive format: zip, tar, tar.gz, tar.bz2, tar.xz, tar.zst, gz,
        /// bz2, xz, zst, 7z.
        #[arg(short, long, default_value = "zip")]
        format: String,

        /// Compression level; bounds depend on the format (see `formats`).
        #[arg(short, long)]
        level: Option<u32>,

        /// Encrypt the archive (zip and 7z only).
        #[arg(short, long)]
        password: Option<String>,
    },

    /// Decompress one or more archives.
    #[command(name = "d", alias = "decompress")]
    Decompress {
        /// Archive files to extract.
        #[arg(required = true)]
        inputs: Vec<PathBuf>,

        /// Target directory. Defaults to the current directory.
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Force a format instead of inferring it per archive.
        #[arg(short, long)]
        format: Option<String>,

        /// Password for encrypted archives.
        #[arg(short, long)]
        password: Option<String>,

        /// Extract each archive into its own subfolder of the target.
        #[arg(long)]
        separate: bool,
    },

    /// List the supported formats and their capabilities.
    Formats {
        /// Emit the registry as JSON instead of a table.
        #[arg(long)]
        json: bool,
    },

    /// Manage shell integration (Windows only).
    Config {
        /// Add the context-menu entry.
        #[arg(long)]
        add_context_menu: bool,

        /// Remove the context-menu entry.
        #[arg(long)]
        remove_context_menu: bool,

        /// Open mode for the context-menu entry.
        #[arg(long, value_enum, default_value_t = MenuMode::Gui)]
        context_menu_mode: MenuMode,

        /// Associate archive extensions with this application.
        #[arg(long)]
        set_association: bool,

        /// Remove the file associations.
        #[arg(long)]
        remove_association: bool,

        /// Formats to (de)associate: `all` or a comma-separated id list.
        #[arg(long, default_value = "all")]
        formats: String,

        /// Open mode for associated files.
        #[arg(long, value_enum, default_value_t = AssociationMode::Gui)]
        association_mode: AssociationMode,
    },

    /// Print version and build information.
    Version,
}

#[derive(ValueEnum, Copy, Clone, Debug, PartialEq, Eq)]
pub enum MenuMode {
    Cli,
    Gui,
}

impl From<MenuMode> for OpenMode {
    fn from(mode: MenuMode) -> Self {
        match mode {
            MenuMode::Cli => OpenMode::Cli,
            MenuMode::Gui => OpenMode::Gui,
        }
    }
}

#[derive(ValueEnum, Copy, Clone, Debug, PartialEq, Eq)]
pub enum AssociationMode {
    Gui,
    Viewer,
}

impl From<AssociationMode> for AssocMode {
    fn from(mode: AssociationMode) -> Self {
        match mode {
            AssociationMode::Gui => AssocMode::Gui,
            AssociationMode::Viewer => AssocMode::Viewer,
        }
    }
}

/// Gets the password from the command-line option or the `MULTIARC_PASSWORD`
/// environment variable.
pub fn get_password_from_opt_or_env(password_opt: Option<String>) -> Option<String> {
    password_opt.or_else(|| std::env::var("MULTIARC_PASSWORD").ok())
}

/// Default archive path when `--output` is omitted: the first input's file
/// name plus the format extension, placed next to that input.
pub fn default_archive_path(first_input: &Path, desc: &FormatDescriptor) -> PathBuf {
    let stem = first_input
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "archive".to_string());
    let parent = first_input.parent().unwrap_or_else(|| Path::new("."));
    parent.join(format!("{}.{}", stem, desc.extension))
}

/// Parses command-line arguments and returns the command to execute.
pub fn run() -> Result<Commands, Box<dyn std::error::Error>> {
    let args = Args::parse();
    Ok(args.command)
}
