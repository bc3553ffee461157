use crate::regions::region::RegionTable;
use crate::series::row::{ColumnValue, MergedRow, RegionExtreme};
use crate::validation::range::RegionSelection;

/// Fills in each row's overall maximum and minimum across the selected regions.
///
/// Only columns of regions in `selection` are considered, so a region that was
/// deselected after its data arrived does not contribute. Absent columns are
/// skipped. Ties go to the first region in key order. A row without any
/// selected value keeps both extremes unset.
pub fn annotate(
    rows: Vec<MergedRow>,
    selection: &RegionSelection,
    regions: &RegionTable,
) -> Vec<MergedRow> {
    rows.into_iter()
        .map(|mut row| {
            let cells = selection
                .iter()
                .filter_map(|key| row.get(key).map(|value| (key, value)));
            let (max, min) = overall_extremes(cells, regions);
            row.max_overall = max;
            row.min_overall = min;
            row
        })
        .collect()
}

/// Scans `(region, value)` cells in the given order and returns the
/// `(maximum, minimum)` holders. Non-finite values are ignored.
///
/// Comparisons are strict, so on a tie the earlier cell wins.
pub fn overall_extremes<'a>(
    cells: impl IntoIterator<Item = (&'a str, ColumnValue)>,
    regions: &RegionTable,
) -> (Option<RegionExtreme>, Option<RegionExtreme>) {
    let mut max: Option<(f64, &str)> = None;
    let mut min: Option<(f64, &str)> = None;

    for (region, value) in cells {
        let high = value.high();
        if high.is_finite() && max.map_or(true, |(current, _)| high > current) {
            max = Some((high, region));
        }
        let low = value.low();
        if low.is_finite() && min.map_or(true, |(current, _)| low < current) {
            min = Some((low, region));
        }
    }

    let to_extreme = |(value, region): (f64, &str)| RegionExtreme {
        value,
        region: region.to_string(),
        display_name: regions.display_name(region).to_string(),
    };
    (max.map(to_extreme), min.map(to_extreme))
}
