use reformer_common::{FieldErrorKind, ParamScalar};
use reformer_expand::{
    AssemblerConfig, Diagnostic, ExpandedValues, FormInput, JsonReformFile, OverrideSet,
    ReformAssembler, ReformError, SeriesEntry,
};
use reformer_schema::{DataSource, LoadOptions, ParameterSet, SchemaSnapshot};
use reformer_testkit::{
    ASSUMPTIONS_FILE_JSON, FORM_FIELDS_JSON, POLICY_SNAPSHOT_JSON, REFORM_FILE_JSON,
    fixture_value,
};

fn policy_set() -> ParameterSet {
    let snapshot = SchemaSnapshot::from_json_str(POLICY_SNAPSHOT_JSON).expect("fixture");
    ParameterSet::from_snapshot(&snapshot, &LoadOptions::default()).expect("fixture loads")
}

fn series(values: &ExpandedValues) -> &[ParamScalar] {
    match values {
        ExpandedValues::Series(v) => v,
        other => panic!("expected a series, got {other:?}"),
    }
}

fn matrix(values: &ExpandedValues) -> &[Vec<ParamScalar>] {
    match values {
        ExpandedValues::Matrix(rows) => rows,
        other => panic!("expected a matrix, got {other:?}"),
    }
}

fn form_reform(set: &ParameterSet, fields: &[(&str, &str)]) -> reformer_expand::AssembledReform {
    let mut form = FormInput::new();
    for (key, text) in fields {
        form.insert(*key, *text);
    }
    ReformAssembler::new(set).assemble_form(form).expect("form assembles")
}

#[test]
fn length_is_longest_of_defaults_and_overrides() {
    let set = policy_set();
    let reform = form_reform(&set, &[("II_em", "5000,*,6000,7000"), ("FICA_ss_trt", "0.13")]);
    assert_eq!(reform.policy["_II_em"].values.len(), 4);
    assert_eq!(reform.policy["_FICA_ss_trt"].values.len(), 2);
    assert_eq!(
        &series(&reform.policy["_II_em"].values)[..3],
        &[
            ParamScalar::Number(5000.0),
            ParamScalar::Int(4150),
            ParamScalar::Number(6000.0)
        ]
    );
}

#[test]
fn non_cpi_single_value_copies_forward() {
    let set = policy_set();
    let reform = form_reform(&set, &[("FICA_ss_trt", "0.15")]);
    assert_eq!(
        series(&reform.policy["_FICA_ss_trt"].values),
        &[ParamScalar::Number(0.15); 2]
    );
    assert!(!reform.policy["_FICA_ss_trt"].cpi_flag);
}

#[test]
fn fractional_values_are_never_rounded() {
    let set = policy_set();
    let reform = form_reform(&set, &[("II_em", "0.35")]);
    let values = series(&reform.policy["_II_em"].values);
    assert_eq!(values[0], ParamScalar::Number(0.35));
    match values[1] {
        ParamScalar::Number(n) => assert!(n > 0.35 && n < 0.4, "inflated rate {n}"),
        other => panic!("rate was rounded to {other:?}"),
    }
}

#[test]
fn all_wildcards_reproduce_defaults() {
    let set = policy_set();
    let reform = form_reform(
        &set,
        &[
            ("II_em", "*,*"),
            ("II_brk2_0", "*,*"),
            ("II_brk2_3", "*"),
            ("DependentCredit_before_CTC", "*,*"),
        ],
    );
    let em = set.get("II_em").unwrap();
    assert_eq!(series(&reform.policy["_II_em"].values), em.defaults(0));
    let brk2 = set.get("II_brk2").unwrap();
    assert_eq!(matrix(&reform.policy["_II_brk2"].values), brk2.default_rows().as_slice());
    assert_eq!(
        series(&reform.policy["_DependentCredit_before_CTC"].values),
        &[ParamScalar::Boolean(false); 2]
    );
}

#[test]
fn single_sub_column_fills_the_rest_from_defaults() {
    let set = policy_set();
    let reform = form_reform(&set, &[("EITC_rt_0", "0.4,0.7")]);
    let rows = matrix(&reform.policy["_EITC_rt"].values);
    assert_eq!(rows.len(), 2);
    assert!(rows.iter().all(|r| r.len() == 4));
    assert_eq!(rows[0][0], ParamScalar::Number(0.4));
    assert_eq!(rows[1][0], ParamScalar::Number(0.7));
    for row in rows {
        assert_eq!(row[1], ParamScalar::Number(0.34));
        assert_eq!(row[2], ParamScalar::Number(0.4));
        assert_eq!(row[3], ParamScalar::Number(0.45));
    }
}

#[test]
fn sibling_sub_columns_form_one_row() {
    let snapshot = SchemaSnapshot::from_json_str(
        r#"{
            "first_year": 2020,
            "parameters": {
                "_X": {
                    "long_name": "Two-column parameter",
                    "value": [[1.0, 2.0], [3.0, 4.0]],
                    "col_label": ["a", "b"]
                }
            }
        }"#,
    )
    .unwrap();
    let set = ParameterSet::from_snapshot(&snapshot, &LoadOptions::default()).unwrap();
    let mut overrides = OverrideSet::new();
    overrides.insert_values("X_0", [10_i64]);
    overrides.insert_values("X_1", [20_i64]);
    let reform = ReformAssembler::new(&set).assemble(overrides).unwrap();
    assert_eq!(reform.policy.len(), 1);
    let rows = matrix(&reform.policy["_X"].values);
    assert_eq!(rows[0], vec![ParamScalar::Int(10), ParamScalar::Int(20)]);
    assert_eq!(rows[1], vec![ParamScalar::Int(10), ParamScalar::Int(20)]);
}

#[test]
fn zero_suffix_on_single_column_parameter_is_the_series() {
    let set = policy_set();
    let reform = form_reform(&set, &[("II_em_0", "5000")]);
    let values = series(&reform.policy["_II_em"].values);
    assert_eq!(values.len(), 2);
    assert_eq!(values[0], ParamScalar::Number(5000.0));
    assert!(reform.diagnostics.is_empty(), "{:?}", reform.diagnostics);

    let err = ReformAssembler::new(&set)
        .assemble_form(FormInput::new().with_field("II_em_1", "5000"))
        .unwrap_err();
    assert!(
        matches!(err, ReformError::SubColumnOutOfRange { index: 1, count: 1, .. }),
        "{err:?}"
    );
}

#[test]
fn reassembling_the_output_is_idempotent() {
    let set = policy_set();
    let assembler = ReformAssembler::new(&set);
    let form = FormInput::from_json_str(FORM_FIELDS_JSON).unwrap();
    let first = assembler.assemble_form(form).unwrap();
    let second = assembler.assemble(first.to_overrides()).unwrap();
    assert_eq!(first.policy, second.policy);
    assert_eq!(first.assumptions, second.assumptions);
    assert_eq!(first.cpi_flags, second.cpi_flags);
}

#[test]
fn form_fixture_assembles() {
    let set = policy_set();
    let form = FormInput::from_json_str(FORM_FIELDS_JSON).unwrap();
    let reform = ReformAssembler::new(&set).assemble_form(form).unwrap();

    assert_eq!(reform.cpi_flags.get("_II_brk2"), Some(&false));
    let brk2 = matrix(&reform.policy["_II_brk2"].values);
    assert_eq!(brk2[0][1], ParamScalar::Int(80000));
    assert_eq!(brk2[1][1], ParamScalar::Int(80000));
    assert_eq!(brk2[1][0], ParamScalar::Int(38700));

    assert_eq!(
        series(&reform.policy["_DependentCredit_before_CTC"].values),
        &[ParamScalar::Boolean(true); 2]
    );
    assert!(!reform.policy.contains_key("_PT_exclusion_rt"));
    assert_eq!(
        reform.diagnostics,
        vec![Diagnostic::DroppedKey {
            key: "mystery_field".into()
        }]
    );
}

#[test]
fn bare_cpi_flag_beats_underscored_flag() {
    let set = policy_set();
    let reform = form_reform(
        &set,
        &[("II_em", "5000"), ("II_em_cpi", "false"), ("_II_em_cpi", "true")],
    );
    assert_eq!(reform.cpi_flags.get("_II_em"), Some(&false));
    assert_eq!(
        series(&reform.policy["_II_em"].values),
        &[ParamScalar::Number(5000.0); 2]
    );
}

#[test]
fn cpi_flag_defaults_to_schema_value() {
    let set = policy_set();
    let reform = form_reform(&set, &[("II_em", "5000")]);
    assert!(reform.cpi_flags.is_empty());
    assert!(reform.policy["_II_em"].cpi_flag);
    let values = series(&reform.policy["_II_em"].values);
    assert_eq!(values[1], ParamScalar::Number(5000.0 * (1.0 + 0.0185)).truncated());
}

#[test]
fn wage_indexed_parameters_use_wage_rates() {
    let set = policy_set();
    let reform = form_reform(&set, &[("SS_Earnings_c", "100000")]);
    let values = series(&reform.policy["_SS_Earnings_c"].values);
    let wage = ParamScalar::Number(100000.0 * (1.0 + 0.0311)).truncated();
    let price = ParamScalar::Number(100000.0 * (1.0 + 0.0185)).truncated();
    assert_eq!(values[1], wage);
    assert_ne!(values[1], price);
}

#[test]
fn misplaced_reverse_marker_is_a_field_error() {
    let set = policy_set();
    let form = FormInput::new().with_field("II_em", "5000,<");
    let err = ReformAssembler::new(&set).assemble_form(form).unwrap_err();
    match err {
        ReformError::Parse(parse) => {
            assert_eq!(parse.kind, FieldErrorKind::MisplacedReverse);
            assert_eq!(parse.field, "II_em");
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[test]
fn leading_blank_is_rejected() {
    let set = policy_set();
    let mut overrides = OverrideSet::new();
    overrides.insert("II_em", vec![SeriesEntry::Gap, SeriesEntry::Value(ParamScalar::Int(1))]);
    let err = ReformAssembler::new(&set).assemble(overrides).unwrap_err();
    assert!(matches!(err, ReformError::BlankLeadingValue { .. }), "{err:?}");
}

#[test]
fn flat_value_for_multi_column_parameter_is_rejected() {
    let set = policy_set();
    let err = ReformAssembler::new(&set)
        .assemble_form(FormInput::new().with_field("II_brk2", "1000"))
        .unwrap_err();
    assert!(matches!(err, ReformError::NotScalar { count: 4, .. }), "{err:?}");
}

#[test]
fn data_source_and_bounds_produce_diagnostics() {
    let set = policy_set();
    let config = AssemblerConfig::default().with_data_source(DataSource::Cps);
    let form = FormInput::new()
        .with_field("PT_exclusion_rt", "0.1")
        .with_field("II_em", "-5");
    let reform = ReformAssembler::with_config(&set, config)
        .assemble_form(form)
        .unwrap();
    assert!(reform.diagnostics.contains(&Diagnostic::IncompatibleData {
        key: "PT_exclusion_rt".into(),
        data_source: DataSource::Cps.to_string(),
    }));
    let bounds: Vec<&Diagnostic> = reform
        .diagnostics
        .iter()
        .filter(|d| matches!(d, Diagnostic::OutOfBounds { .. }))
        .collect();
    assert_eq!(bounds.len(), 2, "{bounds:?}");
    assert_eq!(bounds[0].key(), "II_em");
    assert!(bounds[0].to_string().contains("less than the min value 0"));
}

#[test]
fn reform_file_with_assumptions_assembles() {
    let set = policy_set();
    let file = JsonReformFile::from_strs(REFORM_FILE_JSON, Some(ASSUMPTIONS_FILE_JSON)).unwrap();
    let reform = ReformAssembler::new(&set).assemble_file(&file).unwrap();

    assert_eq!(reform.cpi_flags.get("_II_em"), Some(&false));
    assert_eq!(
        series(&reform.policy["_II_em"].values),
        &[ParamScalar::Int(4050), ParamScalar::Int(5000)]
    );
    assert_eq!(
        series(&reform.policy["_FICA_ss_trt"].values),
        &[
            ParamScalar::Number(0.13),
            ParamScalar::Number(0.13),
            ParamScalar::Number(0.14)
        ]
    );
    assert_eq!(
        matrix(&reform.policy["_II_brk2"].values)[0],
        vec![
            ParamScalar::Int(38000),
            ParamScalar::Int(76000),
            ParamScalar::Int(38000),
            ParamScalar::Int(51000)
        ]
    );
    assert_eq!(
        series(&reform.assumption("behavior", "_BE_sub").unwrap().values),
        &[ParamScalar::Number(0.0), ParamScalar::Number(0.25)]
    );

    let json = reform.to_engine_json().unwrap();
    assert_eq!(json["policy"]["_II_em_cpi"], serde_json::json!(false));
    assert_eq!(json["policy"]["_II_em"], serde_json::json!([4050, 5000]));
    assert_eq!(json["behavior"]["_BE_sub"], serde_json::json!([0.0, 0.25]));
    assert!(fixture_value(REFORM_FILE_JSON)["policy"]["_II_em"].is_object());
}

#[test]
fn bounds_compare_against_overridden_reference() {
    let set = policy_set();
    // Both values are within the default brackets, but II_brk1 now exceeds
    // the II_brk2 set in the same reform.
    let reform = form_reform(&set, &[("II_brk2_0", "5000"), ("II_brk1_0", "8000")]);
    let brk1: Vec<String> = reform
        .diagnostics
        .iter()
        .filter(|d| matches!(d, Diagnostic::OutOfBounds { .. }) && d.key() == "II_brk1_0")
        .map(ToString::to_string)
        .collect();
    assert_eq!(brk1.len(), 2, "{:?}", reform.diagnostics);
    assert!(brk1[0].contains("max value 5000 (II_brk2) for 2017"), "{}", brk1[0]);

    let untouched = form_reform(&set, &[("II_brk1_0", "8000")]);
    assert!(untouched.diagnostics.is_empty(), "{:?}", untouched.diagnostics);
}

#[test]
fn growdiff_groups_stay_apart() {
    let snapshot = SchemaSnapshot::from_json_str(
        r#"{
            "first_year": 2017,
            "parameters": {
                "_ABOOK": {
                    "long_name": "ABOOK growth difference",
                    "kind": "growdiff",
                    "value": [0.0, 0.0]
                }
            }
        }"#,
    )
    .unwrap();
    let set = ParameterSet::from_snapshot(&snapshot, &LoadOptions::default()).unwrap();
    let file = JsonReformFile::from_strs(
        r#"{"policy": {}}"#,
        Some(
            r#"{
                "growdiff_baseline": {"_ABOOK": {"2018": [0.01]}},
                "growdiff_response": {"_ABOOK": {"2018": [0.02]}}
            }"#,
        ),
    )
    .unwrap();
    let reform = ReformAssembler::new(&set).assemble_file(&file).unwrap();

    assert_eq!(
        series(&reform.assumption("growdiff_baseline", "_ABOOK").unwrap().values),
        &[ParamScalar::Number(0.0), ParamScalar::Number(0.01)]
    );
    assert_eq!(
        series(&reform.assumption("growdiff_response", "_ABOOK").unwrap().values),
        &[ParamScalar::Number(0.0), ParamScalar::Number(0.02)]
    );

    let json = reform.to_engine_json().unwrap();
    assert_eq!(json["growdiff_baseline"]["_ABOOK"], serde_json::json!([0.0, 0.01]));
    assert_eq!(json["growdiff_response"]["_ABOOK"], serde_json::json!([0.0, 0.02]));
    assert!(json.get("growdiff").is_none());
}

#[test]
fn ungrouped_growdiff_lands_in_response() {
    let snapshot = SchemaSnapshot::from_json_str(
        r#"{
            "first_year": 2017,
            "parameters": {
                "_ABOOK": {
                    "long_name": "ABOOK growth difference",
                    "kind": "growdiff",
                    "value": [0.0]
                }
            }
        }"#,
    )
    .unwrap();
    let set = ParameterSet::from_snapshot(&snapshot, &LoadOptions::default()).unwrap();
    let reform = form_reform(&set, &[("ABOOK", "0.03")]);
    assert!(reform.assumption("growdiff_response", "_ABOOK").is_some());
    assert!(reform.assumption("growdiff_baseline", "_ABOOK").is_none());
}

#[test]
fn year_past_the_horizon_is_rejected() {
    let set = policy_set();
    let file = JsonReformFile::from_json_str(r#"{"policy": {"_II_em": {"2147483647": [5000]}}}"#)
        .unwrap();
    let err = ReformAssembler::new(&set).assemble_file(&file).unwrap_err();
    match err {
        ReformError::YearBeyondHorizon {
            key,
            year,
            last_year,
        } => {
            assert_eq!(key, "_II_em");
            assert_eq!(year, 2147483647);
            assert_eq!(last_year, 2026);
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

const CAPITAL_GAINS_SNAPSHOT_JSON: &str = r#"{
    "first_year": 2017,
    "price_inflation_rates": {"2017": 0.0185, "2018": 0.0212},
    "parameters": {
        "_CG_rt1": {"long_name": "Capital gain rate 1", "value": [0.0, 0.0]},
        "_AMT_CG_rt1": {"long_name": "AMT capital gain rate 1", "value": [0.0, 0.0]},
        "_CG_brk1": {
            "long_name": "Top of capital gain rate 1 bracket",
            "value": [[37950.0, 75900.0, 37950.0, 50800.0],
                      [38600.0, 77200.0, 38600.0, 51700.0]],
            "col_label": ["single", "joint", "separate", "headhousehold"],
            "cpi_inflatable": true,
            "cpi_inflated": true
        },
        "_AMT_CG_brk1": {
            "long_name": "Top of AMT capital gain rate 1 bracket",
            "value": [[37950.0, 75900.0, 37950.0, 50800.0],
                      [38600.0, 77200.0, 38600.0, 51700.0]],
            "col_label": ["single", "joint", "separate", "headhousehold"],
            "cpi_inflatable": true,
            "cpi_inflated": true
        },
        "_ID_BenefitSurtax_Switch": {
            "long_name": "Deductions subject to the surtax on itemized deduction benefits",
            "value": [[0, 0, 0, 0, 0, 0, 0]],
            "col_label": ["medical", "sltx", "retax", "casualty", "misc", "interest", "charity"],
            "boolean": true
        }
    }
}"#;

fn capital_gains_set() -> ParameterSet {
    let snapshot = SchemaSnapshot::from_json_str(CAPITAL_GAINS_SNAPSHOT_JSON).unwrap();
    ParameterSet::from_snapshot(&snapshot, &LoadOptions::default()).unwrap()
}

#[test]
fn capital_gains_fields_carry_onto_amt() {
    let set = capital_gains_set();
    let reform = form_reform(
        &set,
        &[
            ("CG_rt1", "0.2"),
            ("CG_brk1_0", "40000"),
            ("CG_brk1_cpi", "false"),
            ("AMT_CG_rt1", "0.5"),
        ],
    );
    assert_eq!(reform.policy["_AMT_CG_rt1"].values, reform.policy["_CG_rt1"].values);
    assert_eq!(
        series(&reform.policy["_AMT_CG_rt1"].values),
        &[ParamScalar::Number(0.2); 2]
    );
    assert_eq!(reform.cpi_flags.get("_AMT_CG_brk1"), Some(&false));
    let amt = matrix(&reform.policy["_AMT_CG_brk1"].values);
    assert_eq!(amt, matrix(&reform.policy["_CG_brk1"].values));
    assert_eq!(amt[0][0], ParamScalar::Int(40000));
    assert_eq!(amt[1][0], ParamScalar::Int(40000));
}

#[test]
fn benefit_surtax_checkboxes_form_one_row() {
    let set = capital_gains_set();
    let reform = form_reform(
        &set,
        &[
            ("ID_BenefitSurtax_Switch_2", "on"),
            ("ID_BenefitSurtax_Switch_5", "False"),
        ],
    );
    let rows = matrix(&reform.policy["_ID_BenefitSurtax_Switch"].values);
    assert_eq!(rows.len(), 1);
    let on: Vec<bool> = rows[0].iter().map(ParamScalar::is_truthy).collect();
    assert_eq!(on, [false, false, true, false, false, false, false]);
    assert!(rows[0].iter().all(ParamScalar::is_boolean));
}
