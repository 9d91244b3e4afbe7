use super::cell::CellValue;
use super::grid::DecodedSheet;
use super::raw_loader::{RawSheet, RawWorkbook, load_workbook};
use super::report::TableOutcome;
use super::*;

fn text(value: &str) -> CellValue {
    CellValue::text(value)
}

fn int(value: i64) -> CellValue {
    CellValue::Integer(value)
}

fn tabular(config: HeuristicConfig) -> TabularParser {
    TabularParser::new(config, GridFormat::Spreadsheet).unwrap()
}

fn indicator_sheet(name: &str, countries: &[&str]) -> RawSheet {
    let mut grid = vec![
        vec![text("World development indicators"), CellValue::Null, CellValue::Null, CellValue::Null],
        vec![text("Country"), text("Indicator"), text("2019"), text("2020")],
    ];
    for (index, country) in countries.iter().enumerate() {
        let base = index as i64 * 10;
        grid.push(vec![text(country), text("GDP"), int(base + 1), int(base + 2)]);
    }
    RawSheet {
        name: name.to_string(),
        grid,
    }
}

const FIVE_COUNTRIES: &[&str] = &["Canada", "Mexico", "Peru", "Chile", "Brazil"];

#[test]
fn canada_mexico_yields_two_distinct_facts() {
    let config = HeuristicConfig {
        min_rows_per_table: 1,
        ..HeuristicConfig::default()
    };
    let workbook = RawWorkbook {
        sheets: vec![RawSheet {
            name: "Data".to_string(),
            grid: vec![
                vec![text("Country"), text("2019"), text("2020")],
                vec![text("Canada"), int(10), CellValue::Null],
                vec![text("Mexico"), CellValue::Null, int(20)],
            ],
        }],
    };

    let (facts, reports) = tabular(config).parse_workbook("doc-1", &workbook);

    assert_eq!(facts.len(), 2);
    assert_ne!(facts[0].entity_id, facts[1].entity_id);

    let canada = &facts[0].payload;
    assert_eq!(canada["country"], text("Canada"));
    assert_eq!(canada["year"], int(2019));
    assert_eq!(canada["value"], CellValue::Number(10.0));
    let mexico = &facts[1].payload;
    assert_eq!(mexico["country"], text("Mexico"));
    assert_eq!(mexico["year"], int(2020));
    assert_eq!(mexico["value"], CellValue::Number(20.0));

    assert_eq!(facts[0].source.sheet, "Data");
    assert_eq!(facts[0].source.parser, "excel");
    assert_eq!(facts[0].source.row, 0);
    assert_eq!(facts[1].source.row, 1);

    assert_eq!(reports.len(), 1);
    assert_eq!(reports[0].table.as_deref(), Some("Data_table"));
    assert_eq!(reports[0].header_row, Some(0));
    assert_eq!(reports[0].outcome, TableOutcome::Emitted { facts: 2 });
    assert_eq!(reports[0].rows.data_rows, 2);
    assert_eq!(reports[0].rows.unpivoted_rows, 2);
}

#[test]
fn default_size_gate_drops_the_two_row_table() {
    let workbook = RawWorkbook {
        sheets: vec![RawSheet {
            name: "Data".to_string(),
            grid: vec![
                vec![text("Country"), text("2019"), text("2020")],
                vec![text("Canada"), int(10), CellValue::Null],
                vec![text("Mexico"), CellValue::Null, int(20)],
            ],
        }],
    };

    let (facts, reports) = tabular(HeuristicConfig::default()).parse_workbook("doc-1", &workbook);
    assert!(facts.is_empty());
    assert!(matches!(
        reports[0].outcome,
        TableOutcome::LowQualityTable { .. }
    ));
}

#[test]
fn parsing_is_deterministic() {
    let content = "Country,Indicator,2019,2020\n\
                   Canada,GDP,1,2\n\
                   Mexico,GDP,3,4\n\
                   Peru,GDP,5,6\n";
    let parser = parser_for("gdp.csv", &HeuristicConfig::default()).unwrap();
    let document = SourceDocument {
        document_id: "doc-1",
        content: content.as_bytes(),
        filename: "gdp.csv",
    };

    let first = parser.parse(&document).unwrap();
    let second = parser.parse(&document).unwrap();
    assert_eq!(first.facts.len(), 6);
    assert_eq!(first.facts, second.facts);
    assert_eq!(first.report, second.report);
}

#[test]
fn prebuilt_workbooks_parse_the_same_twice() {
    let parser = tabular(HeuristicConfig::default());
    let workbook = RawWorkbook {
        sheets: vec![indicator_sheet("Data", FIVE_COUNTRIES)],
    };

    let (first, first_reports) = parser.parse_workbook("doc-1", &workbook);
    let (second, second_reports) = parser.parse_workbook("doc-1", &workbook);
    assert_eq!(first.len(), 10);
    assert_eq!(first, second);
    assert_eq!(first_reports, second_reports);
}

#[test]
fn static_value_column_survives_unpivot() {
    let config = HeuristicConfig {
        min_rows_per_table: 1,
        ..HeuristicConfig::default()
    };
    let workbook = RawWorkbook {
        sheets: vec![RawSheet {
            name: "Data".to_string(),
            grid: vec![
                vec![text("Country"), text("Indicator"), text("Value"), text("2019")],
                vec![text("Canada"), text("GDP"), text("baseline-A"), int(10)],
            ],
        }],
    };

    let (facts, _) = tabular(config).parse_workbook("doc-1", &workbook);

    assert_eq!(facts.len(), 1);
    let payload = &facts[0].payload;
    assert_eq!(payload.len(), 5);
    assert_eq!(payload["country"], text("Canada"));
    assert_eq!(payload["indicator"], text("GDP"));
    assert_eq!(payload["value_2"], text("baseline-A"));
    assert_eq!(payload["year"], int(2019));
    assert_eq!(payload["value"], CellValue::Number(10.0));
}

#[test]
fn csv_title_row_does_not_shadow_the_header() {
    let content = "GDP table,World Bank\n\
                   Country,2019,2020,2021\n\
                   Canada,1,2,3\n\
                   Mexico,4,5,6\n";
    let parser = TabularParser::new(HeuristicConfig::default(), GridFormat::Csv).unwrap();

    let inspection = parser.inspect(content.as_bytes(), "gdp.csv").unwrap();
    assert_eq!(inspection.tables.len(), 1);
    assert_eq!(inspection.tables[0].header_row, 1);
    assert_eq!(inspection.tables[0].data_start_row, 2);
    assert_eq!(
        inspection.tables[0].columns,
        vec!["Country", "2019", "2020", "2021"]
    );
}

#[test]
fn a_failing_sheet_does_not_affect_its_neighbours() {
    let parser = tabular(HeuristicConfig::default());
    let good = indicator_sheet("Good", FIVE_COUNTRIES);
    let small = indicator_sheet("Small", &["Canada"]);
    let headerless = RawSheet {
        name: "Scalars".to_string(),
        grid: vec![vec![int(1)], vec![int(2)]],
    };

    let (alone, _) = parser.parse_workbook(
        "doc-1",
        &RawWorkbook {
            sheets: vec![good.clone()],
        },
    );
    let (together, reports) = parser.parse_workbook(
        "doc-1",
        &RawWorkbook {
            sheets: vec![small, good, headerless],
        },
    );

    assert_eq!(alone, together);
    assert_eq!(reports.len(), 3);
    assert!(matches!(
        reports[0].outcome,
        TableOutcome::LowQualityTable { .. }
    ));
    assert_eq!(reports[1].outcome, TableOutcome::Emitted { facts: 10 });
    assert_eq!(reports[2].outcome, TableOutcome::NoDetectableTable);
}

#[test]
fn every_fact_has_its_required_values() {
    let config = HeuristicConfig {
        min_rows_per_table: 1,
        ..HeuristicConfig::default()
    };
    let mut sheet = indicator_sheet("Data", FIVE_COUNTRIES);
    sheet.grid.push(vec![CellValue::Null, text("GDP"), int(7), int(8)]);
    sheet.grid.push(vec![text("Uruguay"), CellValue::Null, int(7), int(8)]);

    let (facts, reports) = tabular(config).parse_workbook(
        "doc-1",
        &RawWorkbook {
            sheets: vec![sheet],
        },
    );

    assert_eq!(facts.len(), 10);
    assert_eq!(reports[0].rows.required_role_dropped, 4);
    for fact in &facts {
        for column in ["country", "indicator", "value"] {
            assert!(!fact.payload[column].is_null(), "{column} is null");
        }
    }
}

#[test]
fn ignored_sheets_never_reach_the_pipeline() {
    let config = HeuristicConfig::default();
    let decoded = vec![
        DecodedSheet {
            name: "Read Me".to_string(),
            rows: vec![
                vec![text("Country"), text("Indicator")],
                vec![text("Canada"), text("GDP")],
            ],
        },
        DecodedSheet {
            name: "Data".to_string(),
            rows: indicator_sheet("Data", FIVE_COUNTRIES).grid,
        },
    ];

    let workbook = load_workbook(&decoded, &config);
    let (facts, reports) = tabular(config).parse_workbook("doc-1", &workbook);
    assert_eq!(reports.len(), 1);
    assert_eq!(reports[0].sheet, "Data");
    assert!(facts.iter().all(|fact| fact.source.sheet == "Data"));
}

#[test]
fn csv_documents_run_end_to_end() {
    let content = "Country,Indicator,2019,2020\n\
                   Canada,GDP,10,12\n\
                   Mexico,GDP,5,..\n\
                   Peru,GDP,3,4\n";
    let config = HeuristicConfig {
        min_rows_per_table: 1,
        ..HeuristicConfig::default()
    };
    let parser = parser_for("gdp.csv", &config).unwrap();
    assert_eq!(parser.parser_tag(), "excel");

    let parsed = parser
        .parse(&SourceDocument {
            document_id: "doc-csv",
            content: content.as_bytes(),
            filename: "gdp.csv",
        })
        .unwrap();

    assert_eq!(parsed.facts.len(), 5);
    assert_eq!(parsed.report.fact_count, 5);
    assert_eq!(parsed.report.parser, "excel");
    assert!(parsed.facts.iter().all(|fact| fact.source.sheet == "gdp"));
    assert_eq!(parsed.facts[0].payload["value"], CellValue::Number(10.0));
    let introspection = parsed.report.introspection.unwrap();
    assert_eq!(introspection.file_size, content.len());
    assert_eq!(introspection.sheets[0].rows, 4);
}

#[test]
fn factory_dispatches_on_extension() {
    let config = HeuristicConfig::default();

    let tag = |filename: &str| parser_for(filename, &config).map(|parser| parser.parser_tag());

    assert_eq!(tag("book.XLSX").unwrap(), "excel");
    assert_eq!(tag("legacy.xls").unwrap(), "excel");
    assert_eq!(tag("sheet.ods").unwrap(), "excel");
    assert_eq!(tag("notes.md").unwrap(), "text");
    assert_eq!(tag("notes.txt").unwrap(), "text");
    assert!(matches!(
        tag("scan.pdf"),
        Err(ParseError::UnsupportedFormat { extension }) if extension == "pdf"
    ));
    assert!(matches!(
        tag("no_extension"),
        Err(ParseError::UnsupportedFormat { .. })
    ));
    assert!(is_supported("data.csv"));
    assert!(!is_supported("data.json"));
}

#[test]
fn invalid_config_is_rejected_by_the_factory() {
    let config = HeuristicConfig {
        header_threshold: 1.5,
        ..HeuristicConfig::default()
    };
    assert!(matches!(
        parser_for("book.xlsx", &config),
        Err(ParseError::InvalidConfig(_))
    ));
}

#[test]
fn corrupt_workbooks_are_unreadable() {
    let config = HeuristicConfig::default();
    let parser = parser_for("book.xlsx", &config).unwrap();
    let result = parser.parse(&SourceDocument {
        document_id: "doc-bad",
        content: b"definitely not a zip archive",
        filename: "book.xlsx",
    });
    assert!(matches!(result, Err(ParseError::UnreadableInput { .. })));
}
