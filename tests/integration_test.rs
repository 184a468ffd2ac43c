use netcdf::open;
use parasub::dataset::Dataset;
use parasub::errors::SubsetError;
use parasub::comm::ProcessGroup;
use parasub::geobox::LatLonBox;
use parasub::netcdf_io::write_subset;
use parasub::slice::DimSlice;
use std::path::Path;
use std::sync::Arc;
use tempfile::tempdir;

const LATS: [f64; 3] = [-60.0, 0.0, 60.0];
const LONS: [f64; 4] = [0.0, 90.0, 180.0, 270.0];

/// Writes a test file with an unlimited `time` dimension, `lat`/`lon`
/// coordinate variables, and a `temp(time, lat, lon)` variable whose value
/// encodes its indices as `time*100 + lat*10 + lon`.
fn write_test_file(path: &Path, time_len: usize, time_offset: usize) {
    let mut file = netcdf::create(path).expect("Failed to create NetCDF file");

    file.add_unlimited_dimension("time")
        .expect("Failed to add dimension time");
    file.add_dimension("lat", LATS.len())
        .expect("Failed to add dimension lat");
    file.add_dimension("lon", LONS.len())
        .expect("Failed to add dimension lon");

    let mut time_var = file
        .add_variable::<f64>("time", &["time"])
        .expect("Failed to add variable time");
    let times: Vec<f64> = (0..time_len).map(|t| (time_offset + t) as f64).collect();
    time_var
        .put_values(&times, 0..time_len)
        .expect("Failed to write time");

    let mut lat_var = file
        .add_variable::<f64>("lat", &["lat"])
        .expect("Failed to add variable lat");
    lat_var
        .put_attribute("units", "degrees_north")
        .expect("Failed to add units");
    lat_var.put_values(&LATS, ..).expect("Failed to write lat");

    let mut lon_var = file
        .add_variable::<f64>("lon", &["lon"])
        .expect("Failed to add variable lon");
    lon_var
        .put_attribute("units", "degrees_east")
        .expect("Failed to add units");
    lon_var.put_values(&LONS, ..).expect("Failed to write lon");

    let mut temp_var = file
        .add_variable::<f64>("temp", &["time", "lat", "lon"])
        .expect("Failed to add variable temp");
    temp_var
        .put_attribute("units", "K")
        .expect("Failed to add units");
    let values: Vec<f64> = (0..time_len)
        .flat_map(|t| {
            (0..LATS.len()).flat_map(move |la| {
                (0..LONS.len()).map(move |lo| ((time_offset + t) * 100 + la * 10 + lo) as f64)
            })
        })
        .collect();
    temp_var
        .put_values(&values, (0..time_len, 0..LATS.len(), 0..LONS.len()))
        .expect("Failed to write temp");

    file.add_attribute("title", "parasub test data")
        .expect("Failed to add title");
}

fn group(n: usize) -> Arc<ProcessGroup> {
    Arc::new(ProcessGroup::new(n).expect("Failed to build worker group"))
}

#[test]
fn subset_by_slice_end_to_end() {
    let temp_dir = tempdir().expect("Failed to create temp dir");
    let input = temp_dir.path().join("input.nc");
    let output = temp_dir.path().join("subset.nc");
    write_test_file(&input, 5, 0);

    let g = group(2);
    let mut dataset = Dataset::open(&[&input], &g).expect("Failed to open dataset");
    assert_eq!(dataset.record_dim(), Some("time"));

    // keep time indices 1..4 and every second longitude
    dataset
        .adjust_masks(&[
            DimSlice::new("time", 1, 4, 1),
            DimSlice::new("lon", 0, 4, 2),
        ])
        .expect("Failed to adjust masks");
    write_subset(&mut dataset, &output).expect("Failed to write subset");

    let result = open(&output).expect("Failed to open subset file");
    assert_eq!(result.dimension("time").expect("time dim").len(), 3);
    assert_eq!(result.dimension("lat").expect("lat dim").len(), 3);
    assert_eq!(result.dimension("lon").expect("lon dim").len(), 2);

    let temp = result.variable("temp").expect("temp variable");
    let values = temp.get_values::<f64, _>(..).expect("temp values");
    assert_eq!(values.len(), 3 * 3 * 2);
    // first kept element is time=1, lat=0, lon=0; its lon neighbor is lon=2
    assert_eq!(values[0], 100.0);
    assert_eq!(values[1], 102.0);
    assert_eq!(values[5], 122.0);
    assert_eq!(*values.last().expect("last"), 322.0);

    // longitudes were masked in the coordinate variable too
    let lons = result
        .variable("lon")
        .expect("lon variable")
        .get_values::<f64, _>(..)
        .expect("lon values");
    assert_eq!(lons, vec![0.0, 180.0]);

    // attributes survive the rewrite
    let units = temp.attribute("units").expect("units").value().expect("value");
    assert!(matches!(units, netcdf::AttributeValue::Str(s) if s == "K"));
    assert!(result.attribute("title").is_some());
    assert!(result.attribute("history").is_some());
}

#[test]
fn subset_by_latlon_box() {
    let temp_dir = tempdir().expect("Failed to create temp dir");
    let input = temp_dir.path().join("input.nc");
    let output = temp_dir.path().join("subset.nc");
    write_test_file(&input, 2, 0);

    let g = group(3);
    let mut dataset = Dataset::open(&[&input], &g).expect("Failed to open dataset");
    let bbox = LatLonBox::new(45.0, -45.0, 120.0, -30.0).expect("box");
    dataset.adjust_masks_box(&bbox).expect("Failed to apply box");

    // lat keeps only 0.0; lon keeps 0.0 and 90.0
    assert_eq!(dataset.masked_size("lat").expect("lat"), 1);
    assert_eq!(dataset.masked_size("lon").expect("lon"), 2);

    write_subset(&mut dataset, &output).expect("Failed to write subset");
    let result = open(&output).expect("Failed to open subset file");
    let values = result
        .variable("temp")
        .expect("temp variable")
        .get_values::<f64, _>(..)
        .expect("temp values");
    assert_eq!(values, vec![10.0, 11.0, 110.0, 111.0]);
}

#[test]
fn box_wrapping_the_antimeridian_selects_both_edges() {
    let temp_dir = tempdir().expect("Failed to create temp dir");
    let input = temp_dir.path().join("input.nc");
    write_test_file(&input, 1, 0);

    let g = group(2);
    let mut dataset = Dataset::open(&[&input], &g).expect("Failed to open dataset");
    // west of 250 or east of 80: keeps lon 0.0 and 270.0
    let bbox = LatLonBox::new(90.0, -90.0, 80.0, 250.0).expect("box");
    dataset.adjust_masks_box(&bbox).expect("Failed to apply box");
    assert_eq!(dataset.masked_size("lon").expect("lon"), 2);
}

#[test]
fn aggregation_concatenates_along_the_record_dimension() {
    let temp_dir = tempdir().expect("Failed to create temp dir");
    let part_a = temp_dir.path().join("a.nc");
    let part_b = temp_dir.path().join("b.nc");
    write_test_file(&part_a, 3, 0);
    write_test_file(&part_b, 4, 3);

    let g = group(2);
    let dataset = Dataset::open(&[&part_a, &part_b], &g).expect("Failed to open dataset");

    let time = dataset.find_dim("time").expect("time dim");
    assert_eq!(time.size(), 7);
    assert!(time.is_unlimited());

    let temp = dataset.read_var_raw("temp").expect("temp");
    assert_eq!(temp.shape(), &[7, 3, 4]);
    let values = temp.to_vec();
    assert_eq!(values[0], 0.0);
    // first element of the second part: time=3, lat=0, lon=0
    assert_eq!(values[3 * 12], 300.0);
    assert_eq!(*values.last().expect("last"), 623.0);

    // a fixed variable comes from the primary file only
    let lat = dataset.read_var_raw("lat").expect("lat");
    assert_eq!(lat.to_vec(), LATS.to_vec());
}

#[test]
fn aggregation_rejects_mismatched_parts() {
    let temp_dir = tempdir().expect("Failed to create temp dir");
    let part_a = temp_dir.path().join("a.nc");
    let part_b = temp_dir.path().join("b.nc");
    write_test_file(&part_a, 3, 0);

    {
        let mut file = netcdf::create(&part_b).expect("Failed to create NetCDF file");
        file.add_unlimited_dimension("time").expect("time");
        file.add_dimension("lat", 5).expect("lat");
        file.add_dimension("lon", LONS.len()).expect("lon");
    }

    let g = group(2);
    assert!(matches!(
        Dataset::open(&[&part_a, &part_b], &g),
        Err(SubsetError::AggregationError { .. })
    ));
}

#[test]
fn datasets_with_identical_structure_compare_equal() {
    let temp_dir = tempdir().expect("Failed to create temp dir");
    let first = temp_dir.path().join("a.nc");
    let second = temp_dir.path().join("b.nc");
    let third = temp_dir.path().join("c.nc");
    write_test_file(&first, 4, 0);
    write_test_file(&second, 4, 100);
    write_test_file(&third, 6, 0);

    let g = group(2);
    let a = Dataset::open(&[&first], &g).expect("open a");
    let b = Dataset::open(&[&second], &g).expect("open b");
    let c = Dataset::open(&[&third], &g).expect("open c");

    assert!(a.equal(&b));
    // differing record length means differing dimension lists
    assert!(!a.equal(&c));
}

#[test]
fn unknown_sliced_dimension_is_skipped() {
    let temp_dir = tempdir().expect("Failed to create temp dir");
    let input = temp_dir.path().join("input.nc");
    write_test_file(&input, 3, 0);

    let g = group(2);
    let mut dataset = Dataset::open(&[&input], &g).expect("Failed to open dataset");
    dataset
        .adjust_masks(&[DimSlice::index("bogus", 0), DimSlice::index("time", 1)])
        .expect("Failed to adjust masks");
    assert_eq!(dataset.masked_size("time").expect("time"), 1);
    assert!(!dataset.masks().has_mask("bogus"));
}
