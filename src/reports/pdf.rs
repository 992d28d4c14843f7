use printpdf::path::PaintMode;
use printpdf::{
    Color, Greyscale, IndirectFontRef, Mm, PdfDocument, PdfLayerReference, Rect, Rgb,
};

use super::export::{Cell, Column, ExportError, Table};

const PAGE_WIDTH: f32 = 297.0;
const PAGE_HEIGHT: f32 = 210.0;
const MARGIN: f32 = 10.0;
const TITLE_SIZE: f32 = 12.0;
const FONT_SIZE: f32 = 8.0;
const PT_TO_MM: f32 = 0.352_778;
const LINE_HEIGHT: f32 = FONT_SIZE * 1.4 * PT_TO_MM;
const CELL_PADDING: f32 = 1.2;
const MAX_CELL_LINES: usize = 6;
const LAYER: &str = "table";

/// Rough advance width in mm. Hangul and other wide glyphs take a full em.
fn char_width(c: char) -> f32 {
    let em = FONT_SIZE * PT_TO_MM;
    if c.is_ascii() {
        em * 0.55
    } else {
        em
    }
}

/// Greedy line breaking to `width` mm, keeping explicit newlines and capping
/// the cell at `MAX_CELL_LINES`.
pub(crate) fn wrap(text: &str, width: f32) -> Vec<String> {
    let usable = (width - 2.0 * CELL_PADDING).max(char_width('W'));
    let mut lines = Vec::new();

    for paragraph in text.lines() {
        let mut line = String::new();
        let mut line_width = 0.0;
        for c in paragraph.chars() {
            let w = char_width(c);
            if line_width + w > usable && !line.is_empty() {
                lines.push(std::mem::take(&mut line));
                line_width = 0.0;
            }
            line.push(c);
            line_width += w;
        }
        lines.push(line);
    }

    if lines.len() > MAX_CELL_LINES {
        lines.truncate(MAX_CELL_LINES);
        if let Some(last) = lines.last_mut() {
            last.pop();
            last.push('…');
        }
    }
    if lines.is_empty() {
        lines.push(String::new());
    }
    lines
}

/// Column widths in mm, scaled from the spreadsheet widths to fill the page.
fn column_widths(columns: &[Column]) -> Vec<f32> {
    let available = PAGE_WIDTH - 2.0 * MARGIN;
    let total: f64 = columns.iter().map(|c| c.width).sum();
    if total <= 0.0 {
        let each = available / columns.len().max(1) as f32;
        return vec![each; columns.len()];
    }
    columns
        .iter()
        .map(|c| (c.width / total) as f32 * available)
        .collect()
}

fn row_height(cells: &[Vec<String>]) -> f32 {
    let lines = cells.iter().map(Vec::len).max().unwrap_or(1).max(1);
    lines as f32 * LINE_HEIGHT + 2.0 * CELL_PADDING
}

fn black() -> Color {
    Color::Greyscale(Greyscale::new(0.0, None))
}

fn header_fill() -> Color {
    Color::Rgb(Rgb::new(0.867, 0.922, 0.969, None))
}

/// Draws one row with its top edge at `top` and returns the next row's top.
fn draw_row(
    layer: &PdfLayerReference,
    font: &IndirectFontRef,
    widths: &[f32],
    cells: &[Vec<String>],
    top: f32,
    header: bool,
) -> f32 {
    let height = row_height(cells);
    let mut x = MARGIN;

    for (width, lines) in widths.iter().zip(cells) {
        let rect = Rect::new(Mm(x), Mm(top - height), Mm(x + width), Mm(top));
        if header {
            layer.set_fill_color(header_fill());
            layer.add_rect(rect.with_mode(PaintMode::FillStroke));
            layer.set_fill_color(black());
        } else {
            layer.add_rect(rect.with_mode(PaintMode::Stroke));
        }

        for (i, line) in lines.iter().enumerate().filter(|(_, l)| !l.is_empty()) {
            let baseline = top - CELL_PADDING - (i as f32 + 0.8) * LINE_HEIGHT;
            layer.use_text(line.as_str(), FONT_SIZE, Mm(x + CELL_PADDING), Mm(baseline), font);
        }
        x += width;
    }

    top - height
}

fn cell_text(cell: Option<&Cell>) -> String {
    cell.map(Cell::display).unwrap_or_default()
}

/// A4 landscape table. The header row repeats on every page. `font` is a
/// TrueType/OpenType font embedded into the document; it must cover Hangul
/// for Korean reports.
pub fn to_pdf(table: &Table, font: &[u8]) -> Result<Vec<u8>, ExportError> {
    let (doc, page, layer) =
        PdfDocument::new(table.sheet_name, Mm(PAGE_WIDTH), Mm(PAGE_HEIGHT), LAYER);
    let font = doc.add_external_font(font)?;
    let widths = column_widths(&table.columns);

    let header: Vec<Vec<String>> = table
        .columns
        .iter()
        .zip(&widths)
        .map(|(column, width)| wrap(column.header, *width))
        .collect();

    let mut layer = doc.get_page(page).get_layer(layer);
    layer.set_outline_color(black());
    layer.set_outline_thickness(0.3);

    let mut top = PAGE_HEIGHT - MARGIN;
    layer.use_text(
        table.sheet_name,
        TITLE_SIZE,
        Mm(MARGIN),
        Mm(top - TITLE_SIZE * PT_TO_MM),
        &font,
    );
    top -= TITLE_SIZE * PT_TO_MM + 4.0;
    top = draw_row(&layer, &font, &widths, &header, top, true);

    for row in &table.rows {
        let cells: Vec<Vec<String>> = widths
            .iter()
            .enumerate()
            .map(|(i, width)| wrap(&cell_text(row.get(i)), *width))
            .collect();

        if top - row_height(&cells) < MARGIN {
            let (page, next) = doc.add_page(Mm(PAGE_WIDTH), Mm(PAGE_HEIGHT), LAYER);
            layer = doc.get_page(page).get_layer(next);
            layer.set_outline_color(black());
            layer.set_outline_thickness(0.3);
            top = draw_row(&layer, &font, &widths, &header, PAGE_HEIGHT - MARGIN, true);
        }
        top = draw_row(&layer, &font, &widths, &cells, top, false);
    }

    Ok(doc.save_to_bytes()?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reports::export::col;

    fn font() -> &'static [u8] {
        epaint_default_fonts::UBUNTU_LIGHT
    }

    #[test]
    fn test_wrap_breaks_long_text() {
        let lines = wrap(&"가".repeat(40), 20.0);
        assert!(lines.len() > 1);
        assert!(lines.iter().all(|l| !l.is_empty()));
        assert_eq!(lines.concat(), "가".repeat(40));
    }

    #[test]
    fn test_wrap_keeps_newlines_and_caps_lines() {
        assert_eq!(wrap("a\nb", 50.0), vec!["a", "b"]);
        let capped = wrap(&"x\n".repeat(20), 50.0);
        assert_eq!(capped.len(), MAX_CELL_LINES);
        assert!(capped[MAX_CELL_LINES - 1].ends_with('…'));
        assert_eq!(wrap("", 50.0), vec![String::new()]);
    }

    #[test]
    fn test_column_widths_fill_page() {
        let widths = column_widths(&[col("a", 10.0), col("b", 30.0)]);
        let total: f32 = widths.iter().sum();
        assert!((total - (PAGE_WIDTH - 2.0 * MARGIN)).abs() < 0.01);
        assert!((widths[1] - 3.0 * widths[0]).abs() < 0.01);
    }

    #[test]
    fn test_pdf_document_header() {
        let mut table = Table::new("TBM", vec![col("Site", 20.0), col("Workers", 10.0)]);
        table.push(vec!["Gangnam A".into(), Cell::Number(12.0)]);
        table.push(vec!["서울 현장".into(), Cell::Empty]);
        let bytes = to_pdf(&table, font()).unwrap();
        assert!(bytes.starts_with(b"%PDF"));
    }

    #[test]
    fn test_pdf_paginates_long_tables() {
        let mut table = Table::new("TBM", vec![col("No", 10.0), col("Note", 40.0)]);
        for i in 0..200 {
            table.push(vec![Cell::Number(i as f64), "line one\nline two".into()]);
        }
        let single = {
            let mut t = Table::new("TBM", table.columns.clone());
            t.push(table.rows[0].clone());
            to_pdf(&t, font()).unwrap()
        };
        let bytes = to_pdf(&table, font()).unwrap();
        assert!(bytes.starts_with(b"%PDF"));
        assert!(bytes.len() > single.len());
    }

    #[test]
    fn test_invalid_font_is_an_error() {
        let table = Table::new("TBM", vec![col("Site", 20.0)]);
        assert!(to_pdf(&table, b"not a font").is_err());
    }
}
