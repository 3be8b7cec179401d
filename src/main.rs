//! Entry point for the cube_helper application.
//! Handles CLI parsing and logging setup, loads the requested files as one
//! cube, and dispatches categorical derivation, aggregation and output.

use clap::Parser;
use cube_helper::netcdf_io::{discover_dir, filter_filelist};
use cube_helper::parallel::ParallelInfo;
use cube_helper::prelude::*;
use tracing::Level;
use tracing_subscriber::EnvFilter;

mod cli;

use cli::Args;

fn main() -> std::result::Result<(), Box<dyn std::error::Error>> {
    // Parse command-line arguments
    let args = Args::parse();

    let default_level = if args.verbose { Level::DEBUG } else { Level::INFO };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive(default_level.into()))
        .with_target(false)
        .init();

    println!(
        r#"
------------------------------------------------------------------
                    ___      _          _        _
          __ _  _| |__  ___  | |_  ___| |_ __  ___ _ _
         / _| || | '_ \/ -_) | ' \/ -_) | '_ \/ -_) '_|
         \__|\_,_|_.__/\___| |_||_\___|_| .__/\___|_|
                                        |_|
              Equalise, merge and aggregate cubes
------------------------------------------------------------------
                        "#
    );

    ParallelConfig::new(args.threads).setup_global_pool()?;
    if args.verbose {
        ParallelInfo::current().print_info();
    }

    let options = LoadOptions {
        filetype: args.filetype.clone(),
        variable: args.variable.clone(),
    };
    let source = match &args.dir {
        Some(dir) => LoadSource::Directory(dir.clone()),
        None => LoadSource::Files(args.files.clone()),
    };

    if args.probe {
        let paths = match &source {
            LoadSource::Directory(dir) => discover_dir(dir, &options.filetype)?,
            LoadSource::Files(files) => filter_filelist(files, &options.filetype)?,
        };
        println!(" Files in chronological order:");
        for descriptor in sort_files_by_earliest(&paths)? {
            println!(
                "    {}  {}",
                descriptor.earliest.datetime,
                descriptor.path.display()
            );
        }
        return Ok(());
    }

    let mut cube = load(&source, &options)?;
    println!("✅ Loaded {}", cube.summary());

    if !args.categorical.is_empty() {
        let names: Vec<&str> = args.categorical.iter().map(String::as_str).collect();
        add_categoricals(&mut cube, &names)?;
        println!("✅ Added categoricals: {}", names.join(", "));
    }

    if let Some(name) = &args.aggregate {
        let reducer: Reducer = args.reducer.parse()?;
        cube = aggregate_categorical(&mut cube, name, reducer)?;
        println!("✅ Aggregated over '{name}' ({reducer}): {}", cube.summary());
    }

    match &args.output {
        Some(output_path) => {
            save_cube(&cube, output_path)?;
            println!("✅ Saved result to {}", output_path.display());
        }
        None => {
            for coord in &cube.dim_coords {
                println!("    {} ({}): {} points", coord.name, coord.unit, coord.len());
            }
            for aux in &cube.aux_coords {
                println!("    {} (axis {}): {} points", aux.coord.name, aux.axis, aux.coord.len());
            }
            for (key, value) in &cube.attributes {
                println!("    {key}: {value}");
            }
        }
    }

    Ok(())
}
