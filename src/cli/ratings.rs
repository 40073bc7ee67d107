use super::ui;
use crate::core::rating::Rating;
use crate::keeper::CycleReport;
use comfy_table::Cell;

pub fn rating_table(rating: &Rating) -> String {
    let mut table =
        ui::table_with_headers(&["Symbol", "Rating", "Technical", "Fundamental", "Last Updated"]);
    table.add_row(vec![
        Cell::new(&rating.symbol),
        ui::score_cell(rating.rating),
        ui::score_cell(rating.technical),
        ui::score_cell(rating.fundamental),
        Cell::new(rating.last_updated.format("%Y-%m-%d %H:%M:%S UTC")),
    ]);
    table.to_string()
}

pub fn symbols_list(symbols: &[String]) -> String {
    if symbols.is_empty() {
        return ui::paint("No ratings recorded yet", ui::Tone::Muted);
    }

    let mut table = ui::table_with_headers(&["#", "Symbol"]);
    for (index, symbol) in symbols.iter().enumerate() {
        table.add_row(vec![Cell::new(index + 1), Cell::new(symbol)]);
    }
    table.to_string()
}

pub fn cycle_report(report: &CycleReport) -> String {
    let mut output = format!(
        "{}\n\n",
        ui::paint("Rating update cycle", ui::Tone::Heading)
    );

    if !report.updated.is_empty() {
        let mut table =
            ui::table_with_headers(&["Symbol", "Rating", "Technical", "Fundamental", "Sequence"]);
        for receipt in &report.updated {
            table.add_row(vec![
                Cell::new(&receipt.symbol),
                ui::score_cell(receipt.scores.rating),
                ui::score_cell(receipt.scores.technical),
                ui::score_cell(receipt.scores.fundamental),
                Cell::new(receipt.sequence),
            ]);
        }
        output.push_str(&table.to_string());
        output.push('\n');
    }

    for err in &report.failed {
        output.push_str(&format!(
            "\n{} {}",
            ui::paint("failed:", ui::Tone::Bad),
            err
        ));
    }

    let summary = format!(
        "{} updated, {} failed",
        report.updated.len(),
        report.failed.len()
    );
    let tone = if report.is_complete() {
        ui::Tone::Good
    } else {
        ui::Tone::Bad
    };
    output.push_str(&format!("\n\n{}", ui::paint(&summary, tone)));
    output
}
