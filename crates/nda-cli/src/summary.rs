use comfy_table::modifiers::{UTF8_ROUND_CORNERS, UTF8_SOLID_INNER_BORDERS};
use comfy_table::presets::{UTF8_FULL, UTF8_FULL_CONDENSED};
use comfy_table::{Attribute, Cell, CellAlignment, Color, ContentArrangement, Table};

use nda_cli::types::ConversionReport;

pub fn print_summary(report: &ConversionReport) {
    println!("Output: {}", report.output_dir.display());
    println!("Table: {}", report.table_path.display());
    println!(
        "Scans: {} discovered, {} without a GUID",
        report.discovered, report.unmapped
    );

    let mut table = Table::new();
    table.set_header(vec![
        header_cell("Suffix"),
        header_cell("Scan type"),
        header_cell("Records"),
        header_cell("Archives"),
    ]);
    apply_summary_table_style(&mut table);
    align_column(&mut table, 2, CellAlignment::Right);
    align_column(&mut table, 3, CellAlignment::Right);
    for summary in &report.scan_types {
        table.add_row(vec![
            Cell::new(&summary.suffix)
                .fg(Color::Blue)
                .add_attribute(Attribute::Bold),
            Cell::new(&summary.scan_type),
            Cell::new(summary.records),
            count_cell(summary.archives),
        ]);
    }
    table.add_row(vec![
        Cell::new("TOTAL")
            .fg(Color::Cyan)
            .add_attribute(Attribute::Bold),
        dim_cell("-"),
        Cell::new(report.records).add_attribute(Attribute::Bold),
        count_cell(report.archives).add_attribute(Attribute::Bold),
    ]);
    println!("{table}");
    print_skipped_table(report);
}

fn print_skipped_table(report: &ConversionReport) {
    if !report.has_skipped() {
        return;
    }
    let mut table = Table::new();
    table.set_header(vec![header_cell("Skipped scan"), header_cell("Reason")]);
    apply_summary_table_style(&mut table);
    for skipped in &report.skipped {
        table.add_row(vec![
            Cell::new(skipped.path.display()).fg(Color::Yellow),
            Cell::new(&skipped.reason),
        ]);
    }
    eprintln!("{table}");
}

pub fn apply_table_style(table: &mut Table) {
    table
        .load_preset(UTF8_FULL_CONDENSED)
        .apply_modifier(UTF8_ROUND_CORNERS)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_width(120);
}

fn apply_summary_table_style(table: &mut Table) {
    table
        .load_preset(UTF8_FULL)
        .apply_modifier(UTF8_ROUND_CORNERS)
        .apply_modifier(UTF8_SOLID_INNER_BORDERS)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_width(140);
}

fn align_column(table: &mut Table, index: usize, alignment: CellAlignment) {
    if let Some(column) = table.column_mut(index) {
        column.set_cell_alignment(alignment);
    }
}

fn header_cell(label: &str) -> Cell {
    Cell::new(label)
        .fg(Color::Cyan)
        .add_attribute(Attribute::Bold)
}

fn count_cell(count: usize) -> Cell {
    if count > 0 {
        Cell::new(count).fg(Color::Green)
    } else {
        dim_cell(count)
    }
}

fn dim_cell<T: ToString>(value: T) -> Cell {
    Cell::new(value).fg(Color::DarkGrey)
}
