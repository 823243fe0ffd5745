//! The deterministic join cascade producing the final dataset table.

use chrono::NaiveDate;

use crate::error::{PipelineError, Result};
use crate::models::table::{DailyTable, GridId, StaticTable};

/// Merges the per-feature tables: climate and vegetation inner-join on
/// (grid id, date); terrain inner-joins on grid id; fire left-joins on
/// (grid id, date) with missing ignition filled as 0. Feature categories
/// absent from the request are skipped. With no daily feature table at all,
/// the base is the full (grid id × date) skeleton so a fire-only request
/// still yields one row per cell and day.
pub struct DatasetMerger {
    grid_ids: Vec<GridId>,
    dates: Vec<NaiveDate>,
}

impl DatasetMerger {
    pub fn new(grid_ids: Vec<GridId>, dates: Vec<NaiveDate>) -> Self {
        Self { grid_ids, dates }
    }

    pub fn merge(
        &self,
        daily_tables: Vec<DailyTable>,
        terrain: Option<StaticTable>,
        fire: DailyTable,
    ) -> Result<DailyTable> {
        let base = match daily_tables.into_iter().reduce(DailyTable::inner_join) {
            Some(table) => table,
            None => DailyTable::skeleton(self.grid_ids.iter().copied(), &self.dates),
        };

        let base = match terrain {
            Some(terrain) => base.join_static(&terrain),
            None => base,
        };

        if base.is_empty() {
            return Err(PipelineError::DataMerge(
                "merged feature tables share no rows".to_string(),
            ));
        }

        let mut merged = base.left_join(fire);
        merged.fill_null("ignition", 0.0);
        Ok(merged)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2017, 1, d).unwrap()
    }

    fn column(name: &str, entries: &[(GridId, u32, f64)]) -> DailyTable {
        DailyTable::from_column(
            name,
            entries
                .iter()
                .map(|&(id, d, v)| ((id, day(d)), v))
                .collect(),
        )
    }

    fn fire_rows(entries: &[(GridId, u32)]) -> DailyTable {
        DailyTable::from_column(
            "ignition",
            entries.iter().map(|&(id, d)| ((id, day(d)), 1.0)).collect(),
        )
    }

    #[test]
    fn test_fire_only_uses_full_skeleton() {
        let merger = DatasetMerger::new(vec![0, 1], vec![day(1), day(2)]);
        let merged = merger.merge(Vec::new(), None, fire_rows(&[])).unwrap();

        assert_eq!(merged.len(), 4);
        assert_eq!(merged.columns(), &["ignition".to_string()]);
        for (_, row) in merged.rows() {
            assert_eq!(row, &vec![Some(0.0)]);
        }
    }

    #[test]
    fn test_unburned_cell_gets_zero_not_absence() {
        let merger = DatasetMerger::new(vec![0, 1], vec![day(1)]);
        let merged = merger
            .merge(Vec::new(), None, fire_rows(&[(0, 1)]))
            .unwrap();

        assert_eq!(merged.get(&(0, day(1))), Some(&vec![Some(1.0)]));
        assert_eq!(merged.get(&(1, day(1))), Some(&vec![Some(0.0)]));
    }

    #[test]
    fn test_climate_vegetation_inner_join() {
        let climate = column("T", &[(0, 1, 270.0), (1, 1, 271.0)]);
        let ndvi = column("NDVI", &[(0, 1, 0.5)]);

        let merger = DatasetMerger::new(vec![0, 1], vec![day(1)]);
        let merged = merger
            .merge(vec![climate, ndvi], None, fire_rows(&[]))
            .unwrap();

        // cell 1 had no NDVI pixel, so it drops out of the joined base
        assert_eq!(merged.len(), 1);
        assert_eq!(
            merged.columns(),
            &["T".to_string(), "NDVI".to_string(), "ignition".to_string()]
        );
    }

    #[test]
    fn test_terrain_joins_on_grid_id_only() {
        let climate = column("T", &[(0, 1, 270.0), (0, 2, 272.0), (1, 1, 268.0)]);
        let mut terrain = StaticTable::new(vec!["elevation".to_string()]);
        terrain.insert(0, vec![Some(1.2)]);
        terrain.insert(1, vec![Some(0.8)]);

        let merger = DatasetMerger::new(vec![0, 1], vec![day(1), day(2)]);
        let merged = merger
            .merge(vec![climate], Some(terrain), fire_rows(&[(1, 1)]))
            .unwrap();

        assert_eq!(merged.len(), 3);
        assert_eq!(
            merged.get(&(0, day(2))),
            Some(&vec![Some(272.0), Some(1.2), Some(0.0)])
        );
        assert_eq!(
            merged.get(&(1, day(1))),
            Some(&vec![Some(268.0), Some(0.8), Some(1.0)])
        );
    }

    #[test]
    fn test_merge_is_idempotent() {
        let climate = column("T", &[(0, 1, 270.0), (1, 1, 271.0)]);
        let merger = DatasetMerger::new(vec![0, 1], vec![day(1)]);

        let once = merger
            .merge(vec![climate.clone()], None, fire_rows(&[(0, 1)]))
            .unwrap();
        let twice = merger
            .merge(vec![climate], None, fire_rows(&[(0, 1)]))
            .unwrap();
        assert_eq!(once, twice);
    }

    #[test]
    fn test_disjoint_tables_error() {
        let climate = column("T", &[(0, 1, 270.0)]);
        let ndvi = column("NDVI", &[(1, 1, 0.5)]);
        let merger = DatasetMerger::new(vec![0, 1], vec![day(1)]);
        assert!(merger
            .merge(vec![climate, ndvi], None, fire_rows(&[]))
            .is_err());
    }
}
