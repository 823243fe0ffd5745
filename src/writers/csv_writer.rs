//! Final dataset CSV output.

use std::path::Path;

use crate::error::Result;
use crate::models::table::DailyTable;

/// Write the merged dataset: `Grid_id`, `date`, one column per feature, with
/// empty fields for missing values. The ignition flag is written as an
/// integer.
pub fn write_final_dataset(path: &Path, table: &DailyTable) -> Result<()> {
    if path.exists() {
        std::fs::remove_file(path)?;
    }
    let mut writer = csv::Writer::from_path(path)?;

    let mut header = vec!["Grid_id".to_string(), "date".to_string()];
    header.extend(table.columns().iter().cloned());
    writer.write_record(&header)?;

    for ((grid_id, date), values) in table.rows() {
        let mut record = vec![grid_id.to_string(), date.format("%Y-%m-%d").to_string()];
        for (column, value) in table.columns().iter().zip(values) {
            record.push(match value {
                Some(v) if column == "ignition" => format!("{}", *v as i64),
                Some(v) => format!("{}", v),
                None => String::new(),
            });
        }
        writer.write_record(&record)?;
    }

    writer.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use std::collections::BTreeMap;
    use tempfile::TempDir;

    #[test]
    fn test_header_and_ignition_formatting() {
        let day = NaiveDate::from_ymd_opt(2017, 1, 1).unwrap();
        let mut values = BTreeMap::new();
        values.insert((3, day), 1.0);
        let mut table = DailyTable::skeleton([3, 4], &[day]);
        table = table.left_join(DailyTable::from_column("ignition", values));
        table.fill_null("ignition", 0.0);

        let dir = TempDir::new().unwrap();
        let path = dir.path().join("Final_Dataset_2017.csv");
        write_final_dataset(&path, &table).unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        let mut lines = content.lines();
        assert_eq!(lines.next().unwrap(), "Grid_id,date,ignition");
        assert_eq!(lines.next().unwrap(), "3,2017-01-01,1");
        assert_eq!(lines.next().unwrap(), "4,2017-01-01,0");
    }
}
