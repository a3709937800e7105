//! Compatibility with results produced by older engine versions.
//!
//! Before engine 0.13 tables and rows had different names (`mY_dec`,
//! `perc0-10`, `fiscal_tots`) and the difference tables listed their
//! columns in another order. [`upgrade`] rewrites such a bundle into the
//! current layout.

use std::collections::BTreeMap;

use semver::Version;

use crate::bundle::{CellInput, ResultBundle, TableSeries};
use crate::taxonomy::TableId;

/// Old table and row names and their current equivalents.
pub const LEGACY_KEY_MAP: &[(&str, &str)] = &[
    ("all", "all"),
    ("fifty_seventyfive", "$50-75K"),
    ("fivehundred_thousand", "$500-1000K"),
    ("forty_fifty", "$40-50K"),
    ("hundred_twohundred", "$100-200K"),
    ("less_than_10", "<$10K"),
    ("perc0-10", "0-10"),
    ("perc10-20", "10-20"),
    ("perc20-30", "20-30"),
    ("perc30-40", "30-40"),
    ("perc40-50", "40-50"),
    ("perc50-60", "50-60"),
    ("perc60-70", "60-70"),
    ("perc70-80", "70-80"),
    ("perc80-90", "80-90"),
    ("perc90-100", "90-100"),
    ("seventyfive_hundred", "$75-100K"),
    ("ten_twenty", "$10-20K"),
    ("thirty_forty", "$30-40K"),
    ("thousand_up", ">$1000K"),
    ("twenty_thirty", "$20-30K"),
    ("twohundred_fivehundred", "$200-500K"),
    ("mY_dec", "dist2_xdec"),
    ("mX_dec", "dist1_xdec"),
    ("df_dec", "diff_itax_xdec"),
    ("pdf_dec", "diff_ptax_xdec"),
    ("cdf_dec", "diff_comb_xdec"),
    ("mY_bin", "dist2_xbin"),
    ("mX_bin", "dist1_xbin"),
    ("df_bin", "diff_itax_xbin"),
    ("pdf_bin", "diff_ptax_xbin"),
    ("cdf_bin", "diff_comb_xbin"),
    ("fiscal_tot_diffs", "aggr_d"),
    ("fiscal_tot_base", "aggr_1"),
    ("fiscal_tot_ref", "aggr_2"),
];

/// `LEGACY_DIFF_ORDER[i]` is where old column `i` belongs.
pub const LEGACY_DIFF_ORDER: [usize; 8] = [1, 3, 0, 5, 6, 4, 2, 7];

/// Engines before this version emit the old difference-column order.
pub const REORDERED_SINCE: Version = Version::new(0, 13, 0);

/// Single aggregate table of very old results, standing for all three.
const FISCAL_TOTALS: &str = "fiscal_tots";

fn lookup(key: &str) -> Option<&'static str> {
    LEGACY_KEY_MAP
        .iter()
        .find(|(old, _)| *old == key)
        .map(|(_, new)| *new)
}

/// Current name of `key`. A two-character year suffix (`"_0"`) is kept.
pub fn rename_key(key: &str) -> String {
    if let Some(new) = lookup(key) {
        return new.to_string();
    }
    if key.len() > 2 && key.is_char_boundary(key.len() - 2) {
        let (stem, suffix) = key.split_at(key.len() - 2);
        if let Some(new) = lookup(stem) {
            return format!("{new}{suffix}");
        }
    }
    key.to_string()
}

/// Parse an engine version leniently: missing or non-numeric components
/// count as zero, so `"0.12"` and `"0.12.0.dev1"` both work.
pub fn engine_version(text: &str) -> Version {
    if let Ok(version) = Version::parse(text.trim()) {
        return version;
    }
    let mut parts = text.trim().split('.').map(|part| {
        part.chars()
            .take_while(char::is_ascii_digit)
            .collect::<String>()
            .parse::<u64>()
            .unwrap_or(0)
    });
    Version::new(
        parts.next().unwrap_or(0),
        parts.next().unwrap_or(0),
        parts.next().unwrap_or(0),
    )
}

/// Whether the difference tables of a bundle use the old column order.
pub fn needs_reorder(bundle: &ResultBundle) -> bool {
    bundle
        .engine_version
        .as_deref()
        .is_some_and(|v| engine_version(v) < REORDERED_SINCE)
}

fn reorder(row: &mut [CellInput]) {
    if row.len() < LEGACY_DIFF_ORDER.len() {
        return;
    }
    let old = row[..LEGACY_DIFF_ORDER.len()].to_vec();
    for (from, to) in LEGACY_DIFF_ORDER.iter().enumerate() {
        row[*to] = old[from].clone();
    }
}

fn rename_series(series: TableSeries) -> TableSeries {
    series
        .into_iter()
        .map(|(key, values)| (rename_key(&key), values))
        .collect()
}

/// Rewrite a bundle from an older engine into the current layout. Bundles
/// already in the current layout pass through unchanged.
pub fn upgrade(mut bundle: ResultBundle) -> ResultBundle {
    if let Some(totals) = bundle.tables.remove(FISCAL_TOTALS) {
        for id in [TableId::AggrD, TableId::Aggr1, TableId::Aggr2] {
            bundle
                .tables
                .entry(id.as_str().to_string())
                .or_insert_with(|| totals.clone());
        }
    }

    let reorder_diff = needs_reorder(&bundle);
    let mut tables = BTreeMap::new();
    for (name, series) in std::mem::take(&mut bundle.tables) {
        let name = rename_key(&name);
        let mut series = rename_series(series);
        if reorder_diff && TableId::DIFFERENCE.iter().any(|id| id.as_str() == name) {
            for row in series.values_mut() {
                reorder(row);
            }
        }
        tables.insert(name, series);
    }

    #[cfg(feature = "tracing")]
    {
        if reorder_diff {
            tracing::debug!(
                engine_version = bundle.engine_version.as_deref().unwrap_or_default(),
                "reordered difference-table columns of legacy results"
            );
        }
    }

    bundle.tables = tables;
    bundle
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn year_suffixed_keys_are_renamed() {
        assert_eq!(rename_key("perc0-10_1"), "0-10_1");
        assert_eq!(rename_key("thousand_up_0"), ">$1000K_0");
        assert_eq!(rename_key("mY_dec"), "dist2_xdec");
        assert_eq!(rename_key("0-10_1"), "0-10_1");
    }

    #[test]
    fn versions_parse_leniently() {
        assert_eq!(engine_version("0.12"), Version::new(0, 12, 0));
        assert_eq!(engine_version("0.12.0.dev1"), Version::new(0, 12, 0));
        assert_eq!(engine_version("0.13.2"), Version::new(0, 13, 2));
    }

    #[test]
    fn reorder_moves_columns_to_new_positions() {
        let mut row: Vec<CellInput> = (0..8).map(|i| CellInput::Number(i as f64)).collect();
        reorder(&mut row);
        let got: Vec<f64> = row.iter().filter_map(CellInput::numeric).collect();
        assert_eq!(got, vec![2.0, 0.0, 6.0, 1.0, 5.0, 3.0, 4.0, 7.0]);
    }
}
