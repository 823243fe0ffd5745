use std::path::Path;

use chrono::NaiveDate;
use geo::{Area, BooleanOps};
use pretty_assertions::assert_eq;
use shapefile::dbase::{FieldName, FieldValue, Record, TableWriterBuilder};
use tempfile::TempDir;

use firegrid::models::Province;
use firegrid::processors::{DatasetMerger, FireDatasetBuilder, GridBuilder};
use firegrid::readers::grid as grid_reader;
use firegrid::utils::dates;
use firegrid::writers::csv_writer;

/// Statistics Canada Lambert, the CRS family of the national boundary file.
const LAMBERT_WKT: &str = r#"PROJCS["NAD83_Statistics_Canada_Lambert",GEOGCS["GCS_North_American_1983",DATUM["D_North_American_1983",SPHEROID["GRS_1980",6378137.0,298.257222101]],PRIMEM["Greenwich",0.0],UNIT["Degree",0.0174532925199433]],PROJECTION["Lambert_Conformal_Conic"],PARAMETER["False_Easting",6200000.0],PARAMETER["False_Northing",3000000.0],PARAMETER["Central_Meridian",-91.866667],PARAMETER["Standard_Parallel_1",49.0],PARAMETER["Standard_Parallel_2",77.0],PARAMETER["Latitude_Of_Origin",63.390675],UNIT["Meter",1.0]]"#;

/// Write a small "national" boundary shapefile: Alberta as a 50 km square
/// with its north-east corner cut away, plus a second feature that must be
/// filtered out.
fn write_boundary(path: &Path) {
    let table = TableWriterBuilder::new()
        .add_character_field(FieldName::try_from("PRENAME").unwrap(), 60);
    let mut writer = shapefile::Writer::from_path(path, table).unwrap();

    let x0 = 4_000_000.0;
    let y0 = 2_000_000.0;
    // outer rings are clockwise per the ESRI convention
    let alberta = shapefile::Polygon::with_rings(vec![shapefile::PolygonRing::Outer(vec![
        shapefile::Point::new(x0, y0),
        shapefile::Point::new(x0, y0 + 50_000.0),
        shapefile::Point::new(x0 + 25_000.0, y0 + 50_000.0),
        shapefile::Point::new(x0 + 50_000.0, y0 + 25_000.0),
        shapefile::Point::new(x0 + 50_000.0, y0),
        shapefile::Point::new(x0, y0),
    ])]);
    let mut record = Record::default();
    record.insert(
        "PRENAME".to_string(),
        FieldValue::Character(Some("Alberta".to_string())),
    );
    writer.write_shape_and_record(&alberta, &record).unwrap();

    let other = shapefile::Polygon::with_rings(vec![shapefile::PolygonRing::Outer(vec![
        shapefile::Point::new(x0 + 200_000.0, y0),
        shapefile::Point::new(x0 + 200_000.0, y0 + 50_000.0),
        shapefile::Point::new(x0 + 250_000.0, y0 + 50_000.0),
        shapefile::Point::new(x0 + 250_000.0, y0),
        shapefile::Point::new(x0 + 200_000.0, y0),
    ])]);
    let mut record = Record::default();
    record.insert(
        "PRENAME".to_string(),
        FieldValue::Character(Some("Saskatchewan".to_string())),
    );
    writer.write_shape_and_record(&other, &record).unwrap();
    drop(writer);

    std::fs::write(path.with_extension("prj"), LAMBERT_WKT).unwrap();
}

/// Write a provincial fire dataset with one dated point per entry.
fn write_fire_data(path: &Path, points: &[(f64, f64, i32, i32, i32)]) {
    let table = TableWriterBuilder::new()
        .add_character_field(FieldName::try_from("SRC_AGENCY").unwrap(), 4)
        .add_numeric_field(FieldName::try_from("YEAR").unwrap(), 6, 0)
        .add_numeric_field(FieldName::try_from("MONTH").unwrap(), 4, 0)
        .add_numeric_field(FieldName::try_from("DAY").unwrap(), 4, 0)
        .add_character_field(FieldName::try_from("REP_DATE").unwrap(), 24);
    let mut writer = shapefile::Writer::from_path(path, table).unwrap();

    for &(x, y, year, month, day) in points {
        let mut record = Record::default();
        record.insert(
            "SRC_AGENCY".to_string(),
            FieldValue::Character(Some("AB".to_string())),
        );
        record.insert("YEAR".to_string(), FieldValue::Numeric(Some(year as f64)));
        record.insert("MONTH".to_string(), FieldValue::Numeric(Some(month as f64)));
        record.insert("DAY".to_string(), FieldValue::Numeric(Some(day as f64)));
        record.insert("REP_DATE".to_string(), FieldValue::Character(None));
        writer
            .write_shape_and_record(&shapefile::Point::new(x, y), &record)
            .unwrap();
    }
}

fn build_grid(dir: &TempDir) -> std::path::PathBuf {
    let boundary = dir.path().join("canada.shp");
    write_boundary(&boundary);

    let province_dir = dir.path().join(Province::Alberta.dir_name());
    GridBuilder::new(Province::Alberta, &boundary)
        .build(&province_dir)
        .unwrap();
    province_dir
}

#[test]
fn test_grid_ids_unique_and_cells_within_boundary() {
    let dir = TempDir::new().unwrap();
    let province_dir = build_grid(&dir);

    let grid = grid_reader::load_grid(&province_dir).unwrap();
    assert!(grid.crs.is_projected());

    // the 50 km notched square tiles into fewer than 25 full cells but
    // keeps clipped boundary cells
    assert!(grid.len() >= 20, "unexpectedly few cells: {}", grid.len());

    let mut ids: Vec<u32> = grid.grid_ids().collect();
    ids.sort_unstable();
    ids.dedup();
    assert_eq!(ids.len(), grid.len(), "grid ids are not unique");

    // every clipped cell lies within the province polygon
    let (boundary, _) = firegrid::readers::boundary::read_saved_boundary(
        &province_dir.join("Province.shp"),
    )
    .unwrap();
    for cell in &grid.cells {
        let outside = cell.geometry.difference(&boundary).unsigned_area();
        let area = cell.geometry.unsigned_area();
        assert!(
            outside <= area * 1e-6,
            "cell {} spills {} m2 outside the boundary",
            cell.id,
            outside
        );
    }
}

#[test]
fn test_grid_build_is_idempotent() {
    let dir = TempDir::new().unwrap();
    let province_dir = build_grid(&dir);
    let first = std::fs::metadata(province_dir.join("clippedGrid.shp"))
        .unwrap()
        .modified()
        .unwrap();

    // second run is a no-op
    let boundary = dir.path().join("canada.shp");
    GridBuilder::new(Province::Alberta, &boundary)
        .build(&province_dir)
        .unwrap();
    let second = std::fs::metadata(province_dir.join("clippedGrid.shp"))
        .unwrap()
        .modified()
        .unwrap();
    assert_eq!(first, second);
}

#[test]
fn test_fire_only_dataset_end_to_end() {
    let dir = TempDir::new().unwrap();
    let province_dir = build_grid(&dir);
    let grid = grid_reader::load_grid(&province_dir).unwrap();

    // no fire record falls in the requested period
    write_fire_data(
        &province_dir.join("FireData.shp"),
        &[(4_005_000.0, 2_005_000.0, 2016, 8, 1)],
    );

    let builder = FireDatasetBuilder::new(Province::Alberta, 2017, vec![1]);
    let fire_table = builder.build(&province_dir, &grid).unwrap();
    assert!(fire_table.is_empty());

    let days = dates::days_in_months(2017, &[1]);
    let merger = DatasetMerger::new(grid.grid_ids().collect(), days.clone());
    let merged = merger.merge(Vec::new(), None, fire_table).unwrap();

    assert_eq!(merged.len(), grid.len() * days.len());

    let output = province_dir.join("Final_Dataset_2017.csv");
    csv_writer::write_final_dataset(&output, &merged).unwrap();

    let mut reader = csv::Reader::from_path(&output).unwrap();
    let header: Vec<String> = reader
        .headers()
        .unwrap()
        .iter()
        .map(|s| s.to_string())
        .collect();
    assert_eq!(header, vec!["Grid_id", "date", "ignition"]);

    let mut rows = 0;
    for record in reader.records() {
        let record = record.unwrap();
        assert_eq!(&record[2], "0");
        rows += 1;
    }
    assert_eq!(rows, grid.len() * days.len());
}

#[test]
fn test_fire_record_in_range_sets_ignition() {
    let dir = TempDir::new().unwrap();
    let province_dir = build_grid(&dir);
    let grid = grid_reader::load_grid(&province_dir).unwrap();

    // one fire inside the grid on Jan 12 2017, one outside the period
    write_fire_data(
        &province_dir.join("FireData.shp"),
        &[
            (4_005_000.0, 2_005_000.0, 2017, 1, 12),
            (4_005_000.0, 2_005_000.0, 2017, 6, 1),
        ],
    );

    let builder = FireDatasetBuilder::new(Province::Alberta, 2017, vec![1]);
    let fire_table = builder.build(&province_dir, &grid).unwrap();
    assert_eq!(fire_table.len(), 1);

    let days = dates::days_in_months(2017, &[1]);
    let merger = DatasetMerger::new(grid.grid_ids().collect(), days.clone());
    let merged = merger.merge(Vec::new(), None, fire_table).unwrap();

    let burn_day = NaiveDate::from_ymd_opt(2017, 1, 12).unwrap();
    let ignited: Vec<u32> = merged
        .rows()
        .filter(|((_, date), row)| *date == burn_day && row[0] == Some(1.0))
        .map(|((id, _), _)| *id)
        .collect();
    assert_eq!(ignited.len(), 1);

    // every other row is 0, and the unburned cells are present, not absent
    let zeros = merged
        .rows()
        .filter(|(_, row)| row[0] == Some(0.0))
        .count();
    assert_eq!(zeros, grid.len() * days.len() - 1);
}

#[test]
fn test_merge_layer_idempotent_end_to_end() {
    let dir = TempDir::new().unwrap();
    let province_dir = build_grid(&dir);
    let grid = grid_reader::load_grid(&province_dir).unwrap();

    write_fire_data(
        &province_dir.join("FireData.shp"),
        &[(4_005_000.0, 2_005_000.0, 2017, 1, 12)],
    );

    let builder = FireDatasetBuilder::new(Province::Alberta, 2017, vec![1]);
    let days = dates::days_in_months(2017, &[1]);
    let merger = DatasetMerger::new(grid.grid_ids().collect(), days);

    let first = merger
        .merge(Vec::new(), None, builder.build(&province_dir, &grid).unwrap())
        .unwrap();
    let second = merger
        .merge(Vec::new(), None, builder.build(&province_dir, &grid).unwrap())
        .unwrap();
    assert_eq!(first, second);
}
