//! Fire-event shapefile access: provincial subsetting of the national
//! database and date resolution for individual records.

use std::path::Path;

use chrono::NaiveDate;
use geo_types::Geometry;
use shapefile::dbase::{FieldName, FieldValue, Record, TableWriterBuilder};

use crate::error::Result;
use crate::models::Province;
use crate::readers::vector;
use crate::utils::constants::{
    FIRE_AGENCY_FIELD, FIRE_DAY_FIELD, FIRE_MONTH_FIELD, FIRE_REPORT_DATE_FIELD, FIRE_YEAR_FIELD,
};

/// One fire event with its resolved date (None when neither the structured
/// fields nor the reported date yield one).
#[derive(Debug, Clone)]
pub struct FireRecord {
    pub geometry: Geometry<f64>,
    pub date: Option<NaiveDate>,
}

fn numeric_field(record: &Record, name: &str) -> Option<i32> {
    match record.get(name) {
        Some(FieldValue::Numeric(Some(v))) => Some(*v as i32),
        Some(FieldValue::Integer(v)) => Some(*v),
        _ => None,
    }
}

fn report_date(record: &Record) -> Option<NaiveDate> {
    match record.get(FIRE_REPORT_DATE_FIELD) {
        Some(FieldValue::Date(Some(date))) => {
            NaiveDate::from_ymd_opt(date.year() as i32, date.month(), date.day())
        }
        Some(FieldValue::Character(Some(text))) => {
            let head = text.trim();
            let head = head.split_whitespace().next().unwrap_or(head);
            NaiveDate::parse_from_str(head, "%Y-%m-%d")
                .or_else(|_| NaiveDate::parse_from_str(head, "%Y/%m/%d"))
                .ok()
        }
        _ => None,
    }
}

/// Resolve the event date: structured year/month/day fields first, the
/// reported date as fallback when they are absent or out of range.
fn resolve_date(record: &Record) -> Option<NaiveDate> {
    let structured = match (
        numeric_field(record, FIRE_YEAR_FIELD),
        numeric_field(record, FIRE_MONTH_FIELD),
        numeric_field(record, FIRE_DAY_FIELD),
    ) {
        (Some(y), Some(m), Some(d)) if y > 0 && m > 0 && d > 0 => {
            NaiveDate::from_ymd_opt(y, m as u32, d as u32)
        }
        _ => None,
    };
    structured.or_else(|| report_date(record))
}

/// Read the provincial fire dataset with resolved dates.
pub fn read_fire_records(path: &Path) -> Result<Vec<FireRecord>> {
    let records = vector::read_shapes(path)?
        .into_iter()
        .map(|(geometry, record)| FireRecord {
            geometry,
            date: resolve_date(&record),
        })
        .collect();
    Ok(records)
}

/// Read the `.prj` of the fire dataset, if any.
pub fn read_fire_crs(path: &Path) -> Option<String> {
    vector::read_prj(path).ok()
}

/// Filter the national fire database to one province's agency code and write
/// the provincial subset with the attributes the pipeline consumes.
pub fn write_provincial_subset(
    national_path: &Path,
    output_path: &Path,
    province: Province,
) -> Result<usize> {
    let table = TableWriterBuilder::new()
        .add_character_field(FieldName::try_from(FIRE_AGENCY_FIELD).unwrap(), 4)
        .add_numeric_field(FieldName::try_from(FIRE_YEAR_FIELD).unwrap(), 6, 0)
        .add_numeric_field(FieldName::try_from(FIRE_MONTH_FIELD).unwrap(), 4, 0)
        .add_numeric_field(FieldName::try_from(FIRE_DAY_FIELD).unwrap(), 4, 0)
        .add_character_field(FieldName::try_from(FIRE_REPORT_DATE_FIELD).unwrap(), 24);
    let mut writer = shapefile::Writer::from_path(output_path, table)?;

    let code = province.agency_code();
    let mut written = 0;
    for (geometry, record) in vector::read_shapes(national_path)? {
        let agency = match record.get(FIRE_AGENCY_FIELD) {
            Some(FieldValue::Character(Some(agency))) => agency.trim(),
            _ => continue,
        };
        if agency != code {
            continue;
        }

        let mut out = Record::default();
        out.insert(
            FIRE_AGENCY_FIELD.to_string(),
            FieldValue::Character(Some(agency.to_string())),
        );
        for field in [FIRE_YEAR_FIELD, FIRE_MONTH_FIELD, FIRE_DAY_FIELD] {
            let value = numeric_field(&record, field).map(f64::from);
            out.insert(field.to_string(), FieldValue::Numeric(value));
        }
        let rep = match resolve_date(&record) {
            Some(date) => Some(date.format("%Y-%m-%d").to_string()),
            None => match record.get(FIRE_REPORT_DATE_FIELD) {
                Some(FieldValue::Character(Some(text))) => Some(text.clone()),
                _ => None,
            },
        };
        out.insert(
            FIRE_REPORT_DATE_FIELD.to_string(),
            FieldValue::Character(rep),
        );

        match &geometry {
            Geometry::Point(p) => {
                writer.write_shape_and_record(&shapefile::Point::new(p.x(), p.y()), &out)?
            }
            Geometry::Polygon(p) => {
                let mp = geo_types::MultiPolygon::new(vec![p.clone()]);
                writer.write_shape_and_record(&vector::to_shp_polygon(&mp), &out)?
            }
            Geometry::MultiPolygon(mp) => {
                writer.write_shape_and_record(&vector::to_shp_polygon(mp), &out)?
            }
            _ => continue,
        }
        written += 1;
    }

    if let Ok(wkt) = vector::read_prj(national_path) {
        vector::write_prj(output_path, &wkt)?;
    }

    Ok(written)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record_with(fields: Vec<(&str, FieldValue)>) -> Record {
        let mut record = Record::default();
        for (name, value) in fields {
            record.insert(name.to_string(), value);
        }
        record
    }

    #[test]
    fn test_structured_date_preferred() {
        let record = record_with(vec![
            (FIRE_YEAR_FIELD, FieldValue::Numeric(Some(2017.0))),
            (FIRE_MONTH_FIELD, FieldValue::Numeric(Some(7.0))),
            (FIRE_DAY_FIELD, FieldValue::Numeric(Some(12.0))),
            (
                FIRE_REPORT_DATE_FIELD,
                FieldValue::Character(Some("2018-01-01".to_string())),
            ),
        ]);
        assert_eq!(
            resolve_date(&record),
            NaiveDate::from_ymd_opt(2017, 7, 12)
        );
    }

    #[test]
    fn test_report_date_fallback() {
        let record = record_with(vec![
            (FIRE_YEAR_FIELD, FieldValue::Numeric(Some(-999.0))),
            (FIRE_MONTH_FIELD, FieldValue::Numeric(Some(0.0))),
            (FIRE_DAY_FIELD, FieldValue::Numeric(Some(0.0))),
            (
                FIRE_REPORT_DATE_FIELD,
                FieldValue::Character(Some("2017-06-03 00:00:00".to_string())),
            ),
        ]);
        assert_eq!(
            resolve_date(&record),
            NaiveDate::from_ymd_opt(2017, 6, 3)
        );
    }

    #[test]
    fn test_unresolvable_date_is_none() {
        let record = record_with(vec![(
            FIRE_REPORT_DATE_FIELD,
            FieldValue::Character(Some("unknown".to_string())),
        )]);
        assert_eq!(resolve_date(&record), None);
    }
}
