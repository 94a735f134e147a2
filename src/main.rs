use anyhow::Result;
use clap::Parser;
use classpath_scanner::cli::{Cli, Commands, OutputFormat};
use classpath_scanner::matcher::NameLoader;
use classpath_scanner::scanner::ClasspathScanner;
use serde::Serialize;

#[derive(Debug, Serialize)]
struct ScanReport {
    roots: Vec<String>,
    class_count: usize,
    classes: Vec<String>,
}

fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();

    let mut scanner = ClasspathScanner::new(cli.roots.clone(), &cli.packages, NameLoader)
        .use_archive_entry_timestamps(cli.archive_entry_timestamps);
    scanner.scan()?;

    match cli.command {
        Commands::Classes { format } => {
            let classes = scanner.names_of_all_classes();
            match format {
                OutputFormat::Json => {
                    let report = ScanReport {
                        roots: cli
                            .roots
                            .iter()
                            .map(|r| r.to_string_lossy().to_string())
                            .collect(),
                        class_count: classes.len(),
                        classes,
                    };
                    println!("{}", serde_json::to_string_pretty(&report)?);
                }
                OutputFormat::Text => {
                    for name in classes {
                        println!("{name}");
                    }
                }
            }
        }
        Commands::Subclasses { superclass } => {
            print_names(&scanner.names_of_subclasses_of(&superclass))?;
        }
        Commands::Superclasses { subclass } => {
            print_names(&scanner.names_of_superclasses_of(&subclass))?;
        }
        Commands::Subinterfaces { superinterface } => {
            print_names(&scanner.names_of_subinterfaces_of(&superinterface))?;
        }
        Commands::Superinterfaces { subinterface } => {
            print_names(&scanner.names_of_superinterfaces_of(&subinterface))?;
        }
        Commands::Implementors { interface } => {
            print_names(&scanner.names_of_classes_implementing(&interface))?;
        }
        Commands::Annotated { annotation } => {
            print_names(&scanner.names_of_classes_with_annotation(&annotation))?;
        }
    }

    Ok(())
}

fn print_names(names: &[String]) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(names)?);
    Ok(())
}

fn init_tracing() {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}
