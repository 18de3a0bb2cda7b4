//! TIDEFLOW CLI
//!
//! Inspector for declaration catalogs: validate declaration sources,
//! show one variable's metadata, list the built-in structure kinds.

#![warn(missing_docs)]
#![warn(clippy::all)]

use clap::{Parser, Subcommand};
use color_eyre::Result;
use tideflow_catalog::{DataCatalog, DeclarationSource, StructureRegistry};
use tideflow_core::VariableId;

#[derive(Parser)]
#[command(name = "tideflow")]
#[command(about = "TIDEFLOW - declarative data-flow engine", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate declaration sources and report the resulting catalog
    Validate {
        /// Declaration source files (JSON)
        #[arg(required = true)]
        files: Vec<String>,
    },
    /// Show one declared variable's metadata
    Show {
        /// Declaration source files (JSON)
        #[arg(short, long, required = true)]
        files: Vec<String>,
        /// Variable key (group:theme:name)
        #[arg(short, long)]
        id: String,
    },
    /// List the built-in structure kinds
    Structures,
}

fn load_catalog(files: &[String]) -> Result<DataCatalog> {
    let structures = StructureRegistry::with_defaults();
    let mut sources = Vec::new();
    for file in files {
        sources.push(DeclarationSource::from_path(file)?);
    }
    Ok(DataCatalog::build(&sources, &structures)?)
}

fn main() -> Result<()> {
    color_eyre::install()?;
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    match cli.command {
        Commands::Validate { files } => {
            let catalog = load_catalog(&files)?;
            for (id, meta) in catalog.iter() {
                println!("{}  [{}]  {}", id, meta.structure, meta.title);
            }
            println!("{} variables declared", catalog.len());
            Ok(())
        }
        Commands::Show { files, id } => {
            let catalog = load_catalog(&files)?;
            let key = VariableId::new(&id)?;
            let meta = catalog.get(&key)?;
            println!("identifier: {}", meta.identifier);
            println!("structure:  {}", meta.structure);
            println!("title:      {}", meta.title);
            if let Some(units) = &meta.units {
                println!("units:      {}", units);
            }
            if let Some(types) = &meta.types {
                println!("types:      {}", types.join(", "));
            }
            for (name, value) in &meta.extra {
                println!("{}: {}", name, value);
            }
            Ok(())
        }
        Commands::Structures => {
            for kind in StructureRegistry::with_defaults().kinds() {
                println!("{}", kind);
            }
            Ok(())
        }
    }
}
