//! Entry point for the parasub tool.
//! Handles CLI parsing, dataset opening, and dispatches subsetting or listing.

use clap::Parser;
use parasub::cli::Args;
use parasub::comm::ProcessGroup;
use parasub::dataset::Dataset;
use parasub::metadata::list_dataset;
use parasub::netcdf_io::write_subset;
use std::sync::Arc;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let workers = args.workers.unwrap_or_else(num_cpus::get);
    let group = Arc::new(ProcessGroup::new(workers)?);
    if args.verbose {
        println!("Using {} worker threads", group.nprocs());
    }

    let mut dataset = Dataset::open(&args.inputs, &group)?;
    if args.verbose {
        println!(
            "Opened {} input file(s): {} dimensions, {} variables",
            args.inputs.len(),
            dataset.dims().len(),
            dataset.vars().len()
        );
    }

    for slice in &args.dimensions {
        dataset.adjust_masks(std::slice::from_ref(slice))?;
    }
    if let Some(bbox) = &args.bbox {
        dataset.adjust_masks_box(bbox)?;
    }

    if args.verbose {
        let dim_names: Vec<String> = dataset
            .dims()
            .iter()
            .map(|d| d.name().to_string())
            .collect();
        for name in dim_names {
            if dataset.masks().has_mask(&name) {
                let dim = dataset
                    .find_dim(&name)
                    .map(|d| d.size())
                    .unwrap_or_default();
                let kept = dataset.masked_size(&name)?;
                println!("Dimension {}: keeping {} of {}", name, kept, dim);
            }
        }
    }

    if args.list {
        list_dataset(&mut dataset)?;
        return Ok(());
    }

    match &args.output {
        Some(output) => {
            write_subset(&mut dataset, output)?;
            println!("Saved subset to {}", output.display());
        }
        None => {
            println!("No output file given (use --output); nothing written.");
            list_dataset(&mut dataset)?;
        }
    }

    Ok(())
}
