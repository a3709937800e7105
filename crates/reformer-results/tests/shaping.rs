use reformer_results::{
    CsvExportOptions, ResultBundle, ResultCell, ResultsError, ResultsShaper, RowSpec, TableId,
    TableSeries, Taxonomy, export_csv, legacy,
};
use reformer_testkit::{LEGACY_RESULTS_JSON, RESULTS_JSON};

fn bundle() -> ResultBundle {
    ResultBundle::from_json_str(RESULTS_JSON).expect("fixture")
}

#[test]
fn four_year_offsets_give_four_ascending_years() {
    let taxonomy = Taxonomy::default();
    let shaper = ResultsShaper::new(&taxonomy, 2019);
    let mut series = TableSeries::new();
    for row in &taxonomy.decile_rows {
        for offset in 0..4 {
            series.insert(
                format!("{}_{offset}", row.key),
                vec![format!("{}", offset + 1).as_str().into(); 19],
            );
        }
    }
    let table = shaper.shape(TableId::Dist2Xdec, &series, 4).unwrap();
    let all = table.rows.last().unwrap();
    assert_eq!(all.label, "All");
    match &all.cells[0] {
        ResultCell::Years {
            year_values,
            first_value,
            ..
        } => {
            let years: Vec<i32> = year_values.keys().copied().collect();
            assert_eq!(years, vec![2019, 2020, 2021, 2022]);
            assert_eq!(*first_value, 1.0);
        }
        other => panic!("expected a multi-year cell, got {other:?}"),
    }
}

#[test]
fn single_row_series_gives_four_years_per_cell() {
    let taxonomy = Taxonomy {
        decile_rows: vec![RowSpec {
            key: "all".into(),
            label: "All".into(),
        }],
        ..Taxonomy::default()
    };
    let width = taxonomy.distribution_columns.len();
    let mut series = TableSeries::new();
    for offset in 0..4 {
        series.insert(
            format!("all_{offset}"),
            vec![format!("{}", offset + 1).as_str().into(); width],
        );
    }
    assert_eq!(series.len(), 4);

    let table = ResultsShaper::new(&taxonomy, 2019)
        .shape(TableId::Dist2Xdec, &series, 4)
        .unwrap();
    assert_eq!(table.rows.len(), 1);
    assert_eq!(table.rows[0].cells.len(), width);
    for cell in &table.rows[0].cells {
        match cell {
            ResultCell::Years {
                year_values,
                first_value,
                ..
            } => {
                let years: Vec<i32> = year_values.keys().copied().collect();
                assert_eq!(years, vec![2019, 2020, 2021, 2022]);
                let values: Vec<f64> = year_values.values().copied().collect();
                assert_eq!(values, vec![1.0, 2.0, 3.0, 4.0]);
                assert_eq!(*first_value, 1.0);
            }
            other => panic!("expected a multi-year cell, got {other:?}"),
        }
    }
}

#[test]
fn fixture_shapes_every_table_with_aliases() {
    let taxonomy = Taxonomy::default();
    let results = bundle();
    assert_eq!(results.num_years(), 3);
    let shaped = ResultsShaper::new(&taxonomy, 2017)
        .shape_all(&results)
        .unwrap();

    assert_eq!(shaped.result_years, vec![2017, 2018, 2019]);
    assert_eq!(shaped.get("fiscal_change"), shaped.get("aggr_d"));
    assert_eq!(shaped.get("fiscal_currentlaw"), shaped.get("aggr_1"));
    assert_eq!(shaped.get("fiscal_reform"), shaped.get("aggr_2"));

    let diff = shaped.get("diff_itax_xdec").unwrap();
    assert_eq!(diff.cols.len(), 8);
    assert_eq!(diff.cols[2].format.units.as_deref(), Some("%"));
    // "0.2%" in the fixture: the percent sign is dropped.
    assert_eq!(diff.rows[0].cells[2].value_for(2017), Some(0.2));

    let json = serde_json::to_value(&shaped).unwrap();
    assert_eq!(json["result_years"], serde_json::json!([2017, 2018, 2019]));
    assert_eq!(json["aggr_d"]["rows"][0]["cells"][0]["value"], serde_json::json!(10.0));
}

#[test]
fn unknown_table_in_bundle_is_fatal() {
    let taxonomy = Taxonomy::default();
    let results = ResultBundle::from_json_str(r#"{"mystery": {"all_0": ["1"]}}"#).unwrap();
    let err = ResultsShaper::new(&taxonomy, 2017)
        .shape_all(&results)
        .unwrap_err();
    match err {
        ResultsError::UnknownTable { id, .. } => assert_eq!(id, "mystery"),
        other => panic!("unexpected error: {other:?}"),
    }
}

#[test]
fn non_numeric_value_is_reported() {
    let taxonomy = Taxonomy::default();
    let mut series = TableSeries::new();
    series.insert("ind_tax".into(), vec!["n/a".into()]);
    series.insert("payroll_tax".into(), vec!["1".into()]);
    series.insert("combined_tax".into(), vec!["1".into()]);
    let err = ResultsShaper::new(&taxonomy, 2017)
        .shape(TableId::Aggr1, &series, 1)
        .unwrap_err();
    assert!(matches!(err, ResultsError::NotNumeric { .. }), "{err:?}");
}

#[test]
fn legacy_bundle_is_renamed_split_and_reordered() {
    let old = ResultBundle::from_json_str(LEGACY_RESULTS_JSON).unwrap();
    assert!(legacy::needs_reorder(&old));
    let upgraded = legacy::upgrade(old);

    for id in [TableId::AggrD, TableId::Aggr1, TableId::Aggr2] {
        assert!(upgraded.table(id).is_some(), "missing {id}");
    }
    assert!(!upgraded.tables.contains_key("fiscal_tots"));
    let dist = upgraded.table(TableId::Dist2Xdec).unwrap();
    assert!(dist.contains_key("0-10_0"));
    assert!(dist.contains_key("90-100_1"));

    let diff = upgraded.table(TableId::DiffItaxXdec).unwrap();
    let row: Vec<String> = diff["all_0"].iter().map(ToString::to_string).collect();
    assert_eq!(row, vec!["2", "0", "6", "1", "5", "3", "4", "7"]);

    let shaped = ResultsShaper::new(&Taxonomy::default(), 2017)
        .shape_all(&upgraded)
        .unwrap();
    assert_eq!(shaped.result_years, vec![2017, 2018]);
}

#[test]
fn current_bundle_passes_through_upgrade() {
    let current = bundle();
    assert!(!legacy::needs_reorder(&current));
    assert_eq!(legacy::upgrade(current.clone()), current);
}

#[test]
fn csv_export_follows_section_layout() {
    let options = CsvExportOptions::default().with_url_id("1234");
    let text = export_csv(&bundle(), &Taxonomy::default(), 2017, &options).unwrap();
    let lines: Vec<&str> = text.lines().collect();

    assert_eq!(lines[0], "#URL: http://www.ospc.org/taxbrain/1234/");
    assert_eq!(lines[1], "#aggr_2");
    assert_eq!(lines[2], "2017,2018,2019");
    assert_eq!(lines[3], "payroll_tax");
    assert_eq!(lines[4], "5.0,5.0,5.0");
    assert_eq!(lines[5], "combined_tax");
    assert_eq!(lines[7], "ind_tax");
    assert_eq!(lines[9], "#dist1_xdec");
    // dist1_xdec is absent from the fixture, so its section is empty.
    assert_eq!(lines[10], "#dist2_xdec");
    assert_eq!(lines[11], "2017");
    assert!(lines[12].starts_with("Returns,AGI,"));
    assert_eq!(lines[13].split(',').count(), 19);

    let sections: Vec<&str> = lines.iter().copied().filter(|l| l.starts_with('#')).collect();
    assert_eq!(
        sections,
        vec![
            "#URL: http://www.ospc.org/taxbrain/1234/",
            "#aggr_2",
            "#dist1_xdec",
            "#dist2_xdec",
            "#diff_itax_xdec",
            "#dist1_xbin",
            "#dist2_xbin",
            "#diff_itax_xbin",
        ]
    );
}
