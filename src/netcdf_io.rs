//! NetCDF output for subset datasets
//!
//! The writer materializes every variable of a dataset with its current
//! masks applied and writes the result to a new NetCDF file. Output
//! dimensions are created at their reduced sizes as fixed dimensions, so the
//! file records exactly what the subset contains. Global and per-variable
//! attributes are copied from the primary input file and a `history`
//! attribute documents the run.

use crate::dataset::Dataset;
use crate::errors::{Result, SubsetError};
use chrono::Utc;
use ndarray::{ArrayD, IxDyn};
use netcdf::{create, AttributeValue};
use std::{fs, path::Path};

/// Writer producing one subset file from a dataset.
pub struct SubsetWriter<'a> {
    output_path: &'a Path,
}

impl<'a> SubsetWriter<'a> {
    pub fn new(output_path: &'a Path) -> Self {
        Self { output_path }
    }

    /// Write all variables of the dataset, masks applied, to the output
    /// path. An existing file at that path is replaced.
    pub fn write(&self, dataset: &mut Dataset) -> Result<()> {
        if self.output_path.exists() {
            fs::remove_file(self.output_path)?;
        }

        let mut file = create(self.output_path)?;

        // Dimensions at their reduced sizes. The record dimension is written
        // fixed as well; the subset length is final.
        for dim in dataset.dims().to_vec() {
            let len = if dataset.masks().has_mask(dim.name()) {
                dataset.masked_size(dim.name())?
            } else {
                dim.size()
            };
            file.add_dimension(dim.name(), len as usize)?;
        }

        for attr in dataset.input_file().attributes() {
            if attr.name() == "history" {
                continue;
            }
            file.add_attribute(attr.name(), attr.value()?)?;
        }
        file.add_attribute(
            "history",
            format!("Created by parasub on {}", Utc::now().to_rfc3339()),
        )?;

        let var_names: Vec<String> =
            dataset.vars().iter().map(|v| v.name().to_string()).collect();
        for name in var_names {
            self.write_var(&mut file, dataset, &name)?;
        }

        Ok(())
    }

    fn write_var(
        &self,
        file: &mut netcdf::FileMut,
        dataset: &mut Dataset,
        name: &str,
    ) -> Result<()> {
        let var = dataset
            .find_var(name)
            .ok_or_else(|| SubsetError::VariableNotFound { var: name.to_string() })?
            .clone();

        if var.dims().is_empty() {
            let source = dataset
                .input_file()
                .variable(name)
                .ok_or_else(|| SubsetError::VariableNotFound { var: name.to_string() })?;
            let values = source.get_values::<f64, _>(..)?;
            let mut new_var = file.add_variable::<f64>(name, &[])?;
            copy_var_attributes(&mut new_var, dataset, name)?;
            new_var.put_values(&values, ..)?;
            return Ok(());
        }

        let packed = dataset.read_var(name)?;
        let shape: Vec<usize> = packed.shape().iter().map(|&s| s as usize).collect();
        let data = ArrayD::from_shape_vec(IxDyn(&shape), packed.to_vec())?;

        let dim_refs: Vec<&str> = var.dims().iter().map(|s| s.as_str()).collect();
        let mut new_var = file.add_variable::<f64>(name, &dim_refs)?;
        copy_var_attributes(&mut new_var, dataset, name)?;
        if data.len() > 0 {
            new_var.put(data.view(), ..)?;
        }
        Ok(())
    }
}

/// Copy attributes from the input variable. Output data is double
/// precision, so `_FillValue` is rewritten as a double to keep its type
/// consistent with the variable.
fn copy_var_attributes(
    new_var: &mut netcdf::VariableMut<'_>,
    dataset: &Dataset,
    name: &str,
) -> Result<()> {
    let source = match dataset.input_file().variable(name) {
        Some(v) => v,
        None => return Ok(()),
    };

    let fill_value = source
        .attribute("_FillValue")
        .and_then(|attr| match attr.value().ok()? {
            AttributeValue::Float(v) => Some(v as f64),
            AttributeValue::Double(v) => Some(v),
            AttributeValue::Int(v) => Some(v as f64),
            AttributeValue::Short(v) => Some(v as f64),
            _ => None,
        });
    if let Some(fv) = fill_value {
        new_var.put_attribute("_FillValue", fv)?;
    }

    for attr in source.attributes().filter(|a| a.name() != "_FillValue") {
        new_var.put_attribute(attr.name(), attr.value()?)?;
    }
    Ok(())
}

/// Writes the subset of a dataset to a new NetCDF file.
pub fn write_subset(dataset: &mut Dataset, output_path: &Path) -> Result<()> {
    let writer = SubsetWriter::new(output_path);
    writer.write(dataset)
}
