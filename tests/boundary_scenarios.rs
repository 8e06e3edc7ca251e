//! End-to-end boundary scenarios driven through the real PDF byte path.
//!
//! Each fixture is a hand-built, xref-less PDF (reconstructed via the
//! `N G obj` scanner in `pdf::xref`) whose content streams are plain
//! `BT ... Tj ... ET` sequences, run through `StatementPipeline::run`
//! exactly as a caller would. Column positions are spaced far enough
//! apart (100 units at 12pt, against a ~6-unit-per-character advance)
//! that block segmentation never has to guess, and row baselines are
//! 20 units apart against a 12pt line height so lines never merge.

use statement_oxide::config::{DocumentContext, PipelineConfig};
use statement_oxide::error::Error;
use statement_oxide::pipeline::StatementPipeline;
use statement_oxide::reconstruct::format::CellValue;
use statement_oxide::taxonomy::Statement;

fn pdf_cell(text: &str) -> String {
    text.replace('\\', "\\\\").replace('(', "\\(").replace(')', "\\)")
}

/// One `BT ... ET` line: `cells[0]` at `x0`, each subsequent cell `gap`
/// units further right.
fn text_line(x0: f32, y: f32, gap: f32, cells: &[&str]) -> String {
    let mut out = format!("BT /F1 12 Tf {x0} {y} Td ({}) Tj", pdf_cell(cells[0]));
    for cell in &cells[1..] {
        out.push_str(&format!(" {gap} 0 Td ({}) Tj", pdf_cell(cell)));
    }
    out.push_str(" ET\n");
    out
}

/// A title line, an optional units line, a header row (date cells only,
/// starting at `x0`), and the value rows (label at `x0`, values at
/// `x0 + gap`, `x0 + 2*gap`, ...), stacked 20 units apart starting at
/// `start_y`.
fn table_page(title: &str, units_line: Option<&str>, dates: &[&str], rows: &[(&str, &[&str])]) -> String {
    let mut y = 760.0;
    let mut out = String::new();
    out.push_str(&text_line(0.0, y, 0.0, &[title]));
    y -= 20.0;
    if let Some(units) = units_line {
        out.push_str(&text_line(0.0, y, 0.0, &[units]));
        y -= 20.0;
    }
    out.push_str(&text_line(100.0, y, 100.0, dates));
    y -= 20.0;
    for (label, values) in rows {
        let mut cells = vec![*label];
        cells.extend_from_slice(values);
        out.push_str(&text_line(0.0, y, 100.0, &cells));
        y -= 20.0;
    }
    out
}

/// A two-line-label row: the first line carries only the label (no
/// numeric cells drawn), the second carries the rest of the label plus
/// the real values. Used for S6's wrapped-label scenario.
fn wrapped_row_page(title: &str, dates: &[&str], label_line_1: &str, label_line_2: &str, values: &[&str]) -> String {
    let mut y = 760.0;
    let mut out = String::new();
    out.push_str(&text_line(0.0, y, 0.0, &[title]));
    y -= 20.0;
    out.push_str(&text_line(100.0, y, 100.0, dates));
    y -= 20.0;
    out.push_str(&text_line(0.0, y, 0.0, &[label_line_1]));
    y -= 20.0;
    let mut cells = vec![label_line_2];
    cells.extend_from_slice(values);
    out.push_str(&text_line(0.0, y, 100.0, &cells));
    out
}

fn build_pdf(pages: &[String]) -> Vec<u8> {
    let mut pdf = String::new();
    pdf.push_str("%PDF-1.4\n");

    let n = pages.len();
    let mut obj_num = 3u32;
    let mut content_objs = Vec::with_capacity(n);
    let mut page_objs = Vec::with_capacity(n);
    for _ in 0..n {
        content_objs.push(obj_num);
        obj_num += 1;
        page_objs.push(obj_num);
        obj_num += 1;
    }

    pdf.push_str("1 0 obj\n<< /Type /Catalog /Pages 2 0 R >>\nendobj\n");
    let kids: String = page_objs.iter().map(|n| format!("{n} 0 R")).collect::<Vec<_>>().join(" ");
    pdf.push_str(&format!("2 0 obj\n<< /Type /Pages /Kids [{kids}] /Count {n} >>\nendobj\n"));

    for (i, content) in pages.iter().enumerate() {
        let content_obj = content_objs[i];
        let page_obj = page_objs[i];
        pdf.push_str(&format!(
            "{content_obj} 0 obj\n<< /Length {} >>\nstream\n{}\nendstream\nendobj\n",
            content.len() + 1,
            content
        ));
        pdf.push_str(&format!(
            "{page_obj} 0 obj\n<< /Type /Page /Parent 2 0 R /Contents {content_obj} 0 R /Resources << >> /MediaBox [0 0 612 792] >>\nendobj\n"
        ));
    }
    pdf.push_str("trailer\n<< /Root 1 0 R >>\n");
    pdf.into_bytes()
}

fn pipeline() -> StatementPipeline {
    StatementPipeline::new().expect("embedded resources must load")
}

fn context() -> DocumentContext {
    DocumentContext { reporting_date: "2023-12-31".to_string(), source_url: "https://example.com/report.pdf".to_string() }
}

fn number(row: &statement_oxide::reconstruct::format::FormattedRow, key: &str) -> Option<f64> {
    match row.get(key) {
        Some(CellValue::Number(v)) => *v,
        _ => None,
    }
}

fn date_of(row: &statement_oxide::reconstruct::format::FormattedRow) -> &str {
    match row.get("date") {
        Some(CellValue::Text(d)) => d.as_str(),
        _ => "",
    }
}

fn filler_pages(dates: &[&str]) -> Vec<String> {
    vec![
        table_page(
            "Balance Sheet",
            None,
            dates,
            &[("Total assets", &["5000", "4800"]), ("Total liabilities", &["3000", "2900"])],
        ),
        table_page(
            "Cash Flow Statement",
            None,
            dates,
            &[("Operating cash flow", &["400", "380"]), ("Investing cash flow", &["-100", "-90"])],
        ),
    ]
}

/// S1: a two-column income statement with a "in millions of euros" unit
/// line, values scaled accordingly.
#[test]
fn s1_two_column_income_statement_in_millions_of_euros() {
    let income = table_page(
        "Income Statement",
        Some("in millions of euros"),
        &["2022", "2021"],
        &[("Revenue", &["1,234.5", "1,100.0"]), ("Net income", &["200", "150"])],
    );
    let mut pages = vec![income];
    pages.extend(filler_pages(&["2022", "2021"]));
    let bytes = build_pdf(&pages);

    let output = pipeline().run(&bytes, &context()).unwrap();
    let income_rows = &output.statements[&Statement::Income];
    assert_eq!(income_rows.len(), 2);

    let row_2022 = income_rows.iter().find(|r| date_of(r) == "2022-12-31").unwrap();
    assert_eq!(row_2022.get("units"), Some(&CellValue::Text("EUR".to_string())));
    assert_eq!(number(row_2022, "revenue"), Some(1_234_500_000.0));
    assert_eq!(number(row_2022, "net_income"), Some(200_000_000.0));

    let row_2021 = income_rows.iter().find(|r| date_of(r) == "2021-12-31").unwrap();
    assert_eq!(number(row_2021, "revenue"), Some(1_100_000_000.0));
}

/// S2: a half-year, single-column report with a parenthesized negative
/// net income and "EUR thousands".
#[test]
fn s2_half_year_single_column_parenthesized_negative() {
    let income = table_page(
        "Income Statement",
        Some("EUR thousands"),
        &["S1 2023"],
        &[("Revenue", &["120"]), ("Net income", &["(45.2)"])],
    );
    let mut pages = vec![income];
    pages.extend(filler_pages(&["S1 2023"]));
    let bytes = build_pdf(&pages);

    let output = pipeline().run(&bytes, &context()).unwrap();
    let income_rows = &output.statements[&Statement::Income];
    assert_eq!(income_rows.len(), 1);
    let row = &income_rows[0];
    assert_eq!(date_of(row), "2023-06-30");
    assert_eq!(row.get("units"), Some(&CellValue::Text("EUR".to_string())));
    assert_eq!(number(row, "net_income"), Some(-45_200.0));
    assert_eq!(number(row, "revenue"), Some(120_000.0));
}

/// S3: a balance sheet missing `current_assets`, repaired from
/// `total_assets - non_current_assets`.
#[test]
fn s3_balance_sheet_repair_fills_current_assets() {
    let balance = table_page(
        "Balance Sheet",
        None,
        &["2023", "2022"],
        &[("Total assets", &["1000", "900"]), ("Non-current assets", &["700", "600"])],
    );
    let income = table_page(
        "Income Statement",
        None,
        &["2023", "2022"],
        &[("Revenue", &["100", "90"]), ("Net income", &["20", "18"])],
    );
    let cash_flow = table_page(
        "Cash Flow Statement",
        None,
        &["2023", "2022"],
        &[("Operating cash flow", &["50", "45"]), ("Investing cash flow", &["-10", "-9"])],
    );
    let bytes = build_pdf(&[income, balance, cash_flow]);

    let output = pipeline().run(&bytes, &context()).unwrap();
    let balance_rows = &output.statements[&Statement::Balance];
    assert_eq!(balance_rows.len(), 2);

    let row_2023 = balance_rows.iter().find(|r| date_of(r) == "2023-12-31").unwrap();
    assert_eq!(number(row_2023, "total_assets"), Some(1000.0));
    assert_eq!(number(row_2023, "non_current_assets"), Some(700.0));
    assert_eq!(number(row_2023, "current_assets"), Some(300.0));

    let row_2022 = balance_rows.iter().find(|r| date_of(r) == "2022-12-31").unwrap();
    assert_eq!(number(row_2022, "current_assets"), Some(300.0));
}

/// S4: dates intersect across all three statements; a cash flow
/// statement dated a year off one of the other two drops that date
/// from every statement's output.
#[test]
fn s4_date_intersection_drops_mismatched_cash_flow_year() {
    let income = table_page(
        "Income Statement",
        None,
        &["2023", "2022"],
        &[("Revenue", &["100", "90"]), ("Net income", &["20", "18"])],
    );
    let balance = table_page(
        "Balance Sheet",
        None,
        &["2023", "2022"],
        &[("Total assets", &["5000", "4800"]), ("Total liabilities", &["3000", "2900"])],
    );
    let cash_flow = table_page(
        "Cash Flow Statement",
        None,
        &["2023", "2021"],
        &[("Operating cash flow", &["50", "40"]), ("Investing cash flow", &["-10", "-8"])],
    );
    let bytes = build_pdf(&[income, balance, cash_flow]);

    let output = pipeline().run(&bytes, &context()).unwrap();
    let income_rows = &output.statements[&Statement::Income];
    let balance_rows = &output.statements[&Statement::Balance];
    let cash_flow_rows = &output.statements[&Statement::CashFlow];

    assert_eq!(income_rows.len(), 1);
    assert_eq!(date_of(&income_rows[0]), "2023-12-31");
    assert_eq!(balance_rows.len(), 1);
    assert_eq!(date_of(&balance_rows[0]), "2023-12-31");
    assert_eq!(cash_flow_rows.len(), 1);
    assert_eq!(date_of(&cash_flow_rows[0]), "2023-12-31");
}

/// S5: the document never mentions the balance sheet title anywhere;
/// the whole document is dropped as "no key pages", yielding all three
/// statement lists empty with no error (spec §8 takes priority over the
/// more ambiguous §7 error-kind table here — see DESIGN.md).
#[test]
fn s5_missing_one_statement_title_yields_all_empty_without_error() {
    let income = table_page(
        "Income Statement",
        None,
        &["2023", "2022"],
        &[("Revenue", &["100", "90"]), ("Net income", &["20", "18"])],
    );
    let cash_flow = table_page(
        "Cash Flow Statement",
        None,
        &["2023", "2022"],
        &[("Operating cash flow", &["50", "45"]), ("Investing cash flow", &["-10", "-9"])],
    );
    let bytes = build_pdf(&[income, cash_flow]);

    let output = pipeline().run(&bytes, &context()).unwrap();
    assert!(output.statements.values().all(|rows| rows.is_empty()));
}

/// S6: a row label wrapped over two lines ("Non-current" then
/// "liabilities", numeric cells only on the second line) merges into a
/// single row with the combined label and the numbers intact.
#[test]
fn s6_wrapped_row_label_merges_with_numeric_cells_intact() {
    let balance = wrapped_row_page("Balance Sheet", &["2023", "2022"], "Non-current", "liabilities", &["3000", "2900"]);
    let mut pages = vec![balance];
    pages.extend(vec![
        table_page(
            "Income Statement",
            None,
            &["2023", "2022"],
            &[("Revenue", &["100", "90"]), ("Net income", &["20", "18"])],
        ),
        table_page(
            "Cash Flow Statement",
            None,
            &["2023", "2022"],
            &[("Operating cash flow", &["50", "45"]), ("Investing cash flow", &["-10", "-9"])],
        ),
    ]);
    let bytes = build_pdf(&pages);

    let output = pipeline().run(&bytes, &context()).unwrap();
    let balance_rows = &output.statements[&Statement::Balance];
    assert_eq!(balance_rows.len(), 2);

    let row_2023 = balance_rows.iter().find(|r| date_of(r) == "2023-12-31").unwrap();
    assert_eq!(number(row_2023, "non_current_liabilities"), Some(3000.0));
    let row_2022 = balance_rows.iter().find(|r| date_of(r) == "2022-12-31").unwrap();
    assert_eq!(number(row_2022, "non_current_liabilities"), Some(2900.0));
}

/// Universal invariant: a malformed document never partially succeeds.
#[test]
fn malformed_bytes_reject_cleanly() {
    let err = pipeline().run(b"definitely not a pdf", &context()).unwrap_err();
    assert!(matches!(err, Error::PdfOpenError(_)));
}
