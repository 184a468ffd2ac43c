//! Dataset structure inspection
//!
//! Listing functions for examining a logical dataset: its dimensions (with
//! current mask counts), variables, and global attributes. Used by the
//! `--list` mode of the command-line tool.

use crate::dataset::{Dataset, VarKind};
use crate::errors::Result;
use netcdf::AttributeValue;

/// Prints the global attributes of the dataset's primary file.
pub fn print_global_attributes(dataset: &Dataset) -> Result<()> {
    println!("\n===== Global Attributes =====");
    let mut attrs: Vec<_> = dataset.input_file().attributes().collect();
    attrs.sort_by(|a, b| a.name().cmp(b.name()));
    if attrs.is_empty() {
        println!("   (No global attributes found)");
    }
    for attr in attrs {
        match attr.value() {
            Ok(AttributeValue::Str(s)) => println!("- {}: \"{}\"", attr.name(), s),
            Ok(value) => println!("- {}: {:?}", attr.name(), value),
            Err(e) => println!("- {}: (error reading value: {})", attr.name(), e),
        }
    }
    Ok(())
}

/// Lists dimensions and variables of the logical dataset.
///
/// Dimension lines show the aggregated size; dimensions with an active mask
/// also show how many indices the current selection keeps.
pub fn list_dataset(dataset: &mut Dataset) -> Result<()> {
    println!("\n Dimensions");
    println!("==============");

    let mut dims: Vec<_> = dataset.dims().to_vec();
    dims.sort_by(|a, b| a.name().cmp(b.name()));

    if dims.is_empty() {
        println!("   (No dimensions found)");
    } else {
        for dim in dims {
            let mut length_info = if dim.is_unlimited() {
                format!("{} (unlimited)", dim.size())
            } else {
                dim.size().to_string()
            };
            if dataset.masks().has_mask(dim.name()) {
                let kept = dataset.masked_size(dim.name())?;
                length_info.push_str(&format!(", {} selected", kept));
            }
            println!("    {} = {}", dim.name(), length_info);
        }
    }

    println!("\n Variables");
    println!("=============");

    let mut vars: Vec<_> = dataset.vars().to_vec();
    vars.sort_by(|a, b| a.name().cmp(b.name()));

    if vars.is_empty() {
        println!("   (No variables found)");
    } else {
        for var in vars {
            let kind = match var.kind() {
                VarKind::Coordinate => "coordinate",
                VarKind::Data => "data",
            };
            if var.dims().is_empty() {
                println!("    {} ({}): scalar", var.name(), kind);
            } else {
                let shape: Vec<String> = var
                    .dims()
                    .iter()
                    .map(|d| {
                        dataset
                            .find_dim(d)
                            .map(|dim| dim.size().to_string())
                            .unwrap_or_else(|| "?".to_string())
                    })
                    .collect();
                println!(
                    "    {} ({}): [{}] = ({})",
                    var.name(),
                    kind,
                    var.dims().join(", "),
                    shape.join(" x ")
                );
            }

            let mut key_attrs = Vec::new();
            if let Some(nc_var) = dataset.input_file().variable(var.name()) {
                let data_type = format!("{:?}", nc_var.vartype()).to_lowercase();
                key_attrs.push(format!("type: {}", data_type));
                for name in ["units", "long_name"] {
                    if let Some(attr) = nc_var.attribute(name) {
                        if let Ok(AttributeValue::Str(s)) = attr.value() {
                            key_attrs.push(format!("{}: {}", name, s));
                        }
                    }
                }
            }
            if !key_attrs.is_empty() {
                println!("      - {}", key_attrs.join(", "));
            }
        }
    }

    print_global_attributes(dataset)?;
    Ok(())
}
