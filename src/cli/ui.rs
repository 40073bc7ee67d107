use comfy_table::modifiers::UTF8_ROUND_CORNERS;
use comfy_table::presets::UTF8_FULL;
use comfy_table::{Attribute, Cell, CellAlignment, Color, ContentArrangement, Table};
use console::style;

/// Score bands used for coloring.
const STRONG: u32 = 7_000;
const NEUTRAL: u32 = 4_000;

pub enum Tone {
    Heading,
    Good,
    Bad,
    Muted,
}

pub fn paint(text: &str, tone: Tone) -> String {
    let styled = match tone {
        Tone::Heading => style(text).bold().underlined(),
        Tone::Good => style(text).green().bold(),
        Tone::Bad => style(text).red(),
        Tone::Muted => style(text).dim(),
    };
    styled.to_string()
}

/// Rounded table with bold cyan headers.
pub fn table_with_headers(headers: &[&str]) -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .apply_modifier(UTF8_ROUND_CORNERS)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(headers.iter().map(|h| {
            Cell::new(h)
                .fg(Color::Cyan)
                .add_attribute(Attribute::Bold)
        }));
    table
}

/// Renders a fixed-point score with its two implied decimals.
pub fn format_score(score: u32) -> String {
    format!("{}.{:02}", score / 100, score % 100)
}

pub fn score_cell(score: u32) -> Cell {
    let color = if score >= STRONG {
        Color::Green
    } else if score >= NEUTRAL {
        Color::Yellow
    } else {
        Color::Red
    };
    Cell::new(format_score(score))
        .fg(color)
        .set_alignment(CellAlignment::Right)
}
