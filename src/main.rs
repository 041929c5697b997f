//! Main entry point for the multiarc CLI app.

use std::path::PathBuf;

use multiarc::cli::{self, Commands};
use multiarc::shell::FormatSelection;
use multiarc::{api, formats, CancelToken, CompressOptions, DecompressOptions};

#[tokio::main]
async fn main() -> std::process::ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    match run_app().await {
        Ok(()) => std::process::ExitCode::SUCCESS,
        Err(e) => {
            if e.downcast_ref::<clap::Error>().is_none() {
                eprintln!("Error: {}", e);
            }
            std::process::ExitCode::FAILURE
        }
    }
}

async fn run_app() -> Result<(), Box<dyn std::error::Error>> {
    let command = cli::run()?;

    match command {
        Commands::Compress {
            inputs,
            output,
            format,
            level,
            password,
        } => {
            let desc = formats::get_format(&format)?;
            let output =
                output.unwrap_or_else(|| cli::default_archive_path(&inputs[0], desc));
            let password = cli::get_password_from_opt_or_env(password);
            let outcome = api::compress_files(
                inputs,
                output.clone(),
                CompressOptions {
                    format,
                    level,
                    password,
                },
                CancelToken::new(),
            )
            .await?;
            println!(
                "Created {} ({} entries, {} bytes in)",
                output.display(),
                outcome.entries_written,
                outcome.bytes_processed
            );
        }

        Commands::Decompress {
            inputs,
            output,
            format,
            password,
            separate,
        } => {
            let base = match output {
                Some(dir) => dir,
                None => std::env::current_dir()?,
            };
            let password = cli::get_password_from_opt_or_env(password);
            let mut any_failed = false;

            if separate {
                // One subfolder per archive; layout is our policy as the
                // caller, not the engine's.
                for input in inputs {
                    let subdir = base.join(archive_stem(&input));
                    any_failed |= decompress_batch(
                        vec![input],
                        subdir,
                        format.clone(),
                        password.clone(),
                    )
                    .await?;
                }
            } else {
                any_failed |=
                    decompress_batch(inputs, base, format, password).await?;
            }

            if any_failed {
                return Err("one or more archives failed to extract".into());
            }
        }

        Commands::Formats { json } => {
            if json {
                println!("{}", serde_json::to_string_pretty(formats::list_formats())?);
                return Ok(());
            }
            println!(
                "{:<8} {:<10} {:>9} {:>10} {:>9} {:>8}",
                "id", "name", "compress", "decompress", "password", "levels"
            );
            for desc in formats::list_formats() {
                let levels = if desc.supports_level {
                    format!(
                        "{}-{}",
                        desc.min_level.unwrap_or(0),
                        desc.max_level.unwrap_or(0)
                    )
                } else {
                    "-".to_string()
                };
                println!(
                    "{:<8} {:<10} {:>9} {:>10} {:>9} {:>8}",
                    desc.id,
                    desc.name,
                    desc.can_compress,
                    desc.can_decompress,
                    desc.supports_password,
                    levels
                );
            }
        }

        Commands::Config {
            add_context_menu,
            remove_context_menu,
            context_menu_mode,
            set_association,
            remove_association,
            formats: format_list,
            association_mode,
        } => {
            if add_context_menu {
                api::add_context_menu(context_menu_mode.into()).await?;
                println!("Context menu added.");
            }
            if remove_context_menu {
                api::remove_context_menu().await?;
                println!("Context menu removed.");
            }
            if set_association {
                let selection: FormatSelection = format_list.parse()?;
                api::set_file_association(selection, association_mode.into()).await?;
                println!("File associations set.");
            } else if remove_association {
                let selection: FormatSelection = format_list.parse()?;
                api::remove_file_association(selection).await?;
                println!("File associations removed.");
            }
        }

        Commands::Version => {
            let info = api::version_info();
            println!("{} {}", env!("CARGO_PKG_NAME"), info.version);
            println!("built:  {}", info.build_time);
            println!("author: {}", info.author);
            println!("{}", info.description);
        }
    }

    Ok(())
}

/// Runs one decompression batch and prints per-archive results. Returns
/// whether any archive failed.
async fn decompress_batch(
    inputs: Vec<PathBuf>,
    output_dir: PathBuf,
    format: Option<String>,
    password: Option<String>,
) -> Result<bool, Box<dyn std::error::Error>> {
    let batch = api::decompress_files(
        inputs,
        output_dir,
        format,
        Some(DecompressOptions { password }),
        CancelToken::new(),
    )
    .await?;

    let mut any_failed = false;
    for report in &batch.reports {
        match &report.result {
            Ok(outcome) => println!(
                "Extracted {} ({} entries)",
                report.archive.display(),
                outcome.entries_written
            ),
            Err(e) => {
                any_failed = true;
                eprintln!("Failed {}: {}", report.archive.display(), e);
            }
        }
    }
    Ok(any_failed)
}

/// Archive file name without its format suffix, for per-archive subfolders.
fn archive_stem(input: &PathBuf) -> String {
    let name = input
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "archive".to_string());
    match multiarc::formats::infer_format(input) {
        Some(desc) => name
            .strip_suffix(&format!(".{}", desc.extension))
            .map(|s| s.to_string())
            .unwrap_or_else(|| {
                // Alias suffixes (.tgz, .tbz2, .txz, .tzst) differ from the
                // canonical extension; fall back to the last dot.
                name.rsplit_once('.')
                    .map(|(stem, _)| stem.to_string())
                    .unwrap_or(name.clone())
            }),
        None => name,
    }
}
