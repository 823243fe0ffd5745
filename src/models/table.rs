//! Wide feature tables keyed by (grid cell id, date) — or grid cell id alone
//! for static terrain data — with the join operations the merge layer needs.

use std::collections::BTreeMap;

use chrono::NaiveDate;

/// Stable grid cell identifier.
pub type GridId = u32;

/// Key of a daily feature row.
pub type DailyKey = (GridId, NaiveDate);

/// A table keyed by (grid id, date), one value column per feature.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct DailyTable {
    columns: Vec<String>,
    rows: BTreeMap<DailyKey, Vec<Option<f64>>>,
}

impl DailyTable {
    pub fn new(columns: Vec<String>) -> Self {
        Self {
            columns,
            rows: BTreeMap::new(),
        }
    }

    /// Single-column table from a dense value map.
    pub fn from_column(name: &str, values: BTreeMap<DailyKey, f64>) -> Self {
        Self {
            columns: vec![name.to_string()],
            rows: values.into_iter().map(|(k, v)| (k, vec![Some(v)])).collect(),
        }
    }

    /// Key-only table covering every (grid id, date) combination; the merge
    /// base when no daily feature table exists.
    pub fn skeleton(grid_ids: impl IntoIterator<Item = GridId>, dates: &[NaiveDate]) -> Self {
        let mut rows = BTreeMap::new();
        for id in grid_ids {
            for &date in dates {
                rows.insert((id, date), Vec::new());
            }
        }
        Self {
            columns: Vec::new(),
            rows,
        }
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    pub fn insert(&mut self, key: DailyKey, values: Vec<Option<f64>>) {
        debug_assert_eq!(values.len(), self.columns.len());
        self.rows.insert(key, values);
    }

    pub fn rows(&self) -> impl Iterator<Item = (&DailyKey, &Vec<Option<f64>>)> {
        self.rows.iter()
    }

    pub fn get(&self, key: &DailyKey) -> Option<&Vec<Option<f64>>> {
        self.rows.get(key)
    }

    /// Keep only rows whose key appears in both tables.
    pub fn inner_join(self, other: DailyTable) -> DailyTable {
        let mut columns = self.columns;
        columns.extend(other.columns);

        let mut rows = BTreeMap::new();
        for (key, mut left) in self.rows {
            if let Some(right) = other.rows.get(&key) {
                left.extend(right.iter().cloned());
                rows.insert(key, left);
            }
        }
        DailyTable { columns, rows }
    }

    /// Keep the union of keys, padding the missing side with nulls.
    pub fn outer_join(self, other: DailyTable) -> DailyTable {
        let left_width = self.columns.len();
        let right_width = other.columns.len();
        let mut columns = self.columns;
        columns.extend(other.columns);

        let mut rows: BTreeMap<DailyKey, Vec<Option<f64>>> = BTreeMap::new();
        for (key, mut left) in self.rows {
            left.resize(left_width + right_width, None);
            rows.insert(key, left);
        }
        for (key, right) in other.rows {
            let row = rows
                .entry(key)
                .or_insert_with(|| vec![None; left_width + right_width]);
            row[left_width..].clone_from_slice(&right);
        }
        DailyTable { columns, rows }
    }

    /// Keep every left row, taking right values where the key matches.
    pub fn left_join(self, other: DailyTable) -> DailyTable {
        let right_width = other.columns.len();
        let mut columns = self.columns;
        columns.extend(other.columns);

        let mut rows = BTreeMap::new();
        for (key, mut left) in self.rows {
            match other.rows.get(&key) {
                Some(right) => left.extend(right.iter().cloned()),
                None => left.extend(std::iter::repeat(None).take(right_width)),
            }
            rows.insert(key, left);
        }
        DailyTable { columns, rows }
    }

    /// Inner join on grid id with a static (dateless) table.
    pub fn join_static(self, terrain: &StaticTable) -> DailyTable {
        let mut columns = self.columns;
        columns.extend(terrain.columns.iter().cloned());

        let mut rows = BTreeMap::new();
        for ((grid_id, date), mut left) in self.rows {
            if let Some(right) = terrain.rows.get(&grid_id) {
                left.extend(right.iter().cloned());
                rows.insert((grid_id, date), left);
            }
        }
        DailyTable { columns, rows }
    }

    /// Replace nulls in one column with a constant.
    pub fn fill_null(&mut self, column: &str, value: f64) {
        if let Some(idx) = self.column_index(column) {
            for row in self.rows.values_mut() {
                if row[idx].is_none() {
                    row[idx] = Some(value);
                }
            }
        }
    }
}

/// A table keyed by grid id only (terrain has no date dimension).
#[derive(Debug, Clone, PartialEq, Default)]
pub struct StaticTable {
    columns: Vec<String>,
    rows: BTreeMap<GridId, Vec<Option<f64>>>,
}

impl StaticTable {
    pub fn new(columns: Vec<String>) -> Self {
        Self {
            columns,
            rows: BTreeMap::new(),
        }
    }

    pub fn from_column(name: &str, values: BTreeMap<GridId, Option<f64>>) -> Self {
        Self {
            columns: vec![name.to_string()],
            rows: values.into_iter().map(|(k, v)| (k, vec![v])).collect(),
        }
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn insert(&mut self, grid_id: GridId, values: Vec<Option<f64>>) {
        debug_assert_eq!(values.len(), self.columns.len());
        self.rows.insert(grid_id, values);
    }

    pub fn rows(&self) -> impl Iterator<Item = (&GridId, &Vec<Option<f64>>)> {
        self.rows.iter()
    }

    pub fn get(&self, grid_id: GridId) -> Option<&Vec<Option<f64>>> {
        self.rows.get(&grid_id)
    }

    /// Inner join on grid id.
    pub fn inner_join(self, other: StaticTable) -> StaticTable {
        let mut columns = self.columns;
        columns.extend(other.columns);

        let mut rows = BTreeMap::new();
        for (key, mut left) in self.rows {
            if let Some(right) = other.rows.get(&key) {
                left.extend(right.iter().cloned());
                rows.insert(key, left);
            }
        }
        StaticTable { columns, rows }
    }
}
