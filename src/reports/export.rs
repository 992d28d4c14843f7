use rust_xlsxwriter::{Color, Format, FormatAlign, FormatBorder, Workbook, XlsxError};
use serde::Deserialize;

use crate::core::shared::error::ApiError;

use super::pdf::to_pdf;

const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

#[derive(Debug, thiserror::Error)]
pub enum ExportError {
    #[error("xlsx: {0}")]
    Xlsx(#[from] XlsxError),
    #[error("csv: {0}")]
    Csv(#[from] csv::Error),
    #[error("csv buffer: {0}")]
    Buffer(String),
    #[error("pdf: {0}")]
    Pdf(#[from] printpdf::Error),
    #[error("no font configured for PDF export")]
    MissingFont,
}

impl From<ExportError> for ApiError {
    fn from(e: ExportError) -> Self {
        match e {
            ExportError::MissingFont => ApiError::NotConfigured("PDF 글꼴".to_string()),
            other => ApiError::Internal(other.to_string()),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    #[default]
    Xlsx,
    Csv,
    Pdf,
}

impl ExportFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            Self::Xlsx => "xlsx",
            Self::Csv => "csv",
            Self::Pdf => "pdf",
        }
    }

    pub fn content_type(&self) -> &'static str {
        match self {
            Self::Xlsx => "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
            Self::Csv => "text/csv; charset=utf-8",
            Self::Pdf => "application/pdf",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    Text(String),
    Number(f64),
    Empty,
}

impl Cell {
    pub(crate) fn display(&self) -> String {
        match self {
            Self::Text(s) => s.clone(),
            Self::Number(n) => n.to_string(),
            Self::Empty => String::new(),
        }
    }
}

impl From<String> for Cell {
    fn from(s: String) -> Self {
        Self::Text(s)
    }
}

impl From<&str> for Cell {
    fn from(s: &str) -> Self {
        Self::Text(s.to_string())
    }
}

impl From<Option<String>> for Cell {
    fn from(s: Option<String>) -> Self {
        s.map_or(Self::Empty, Self::Text)
    }
}

impl From<f64> for Cell {
    fn from(n: f64) -> Self {
        Self::Number(n)
    }
}

impl From<Option<f64>> for Cell {
    fn from(n: Option<f64>) -> Self {
        n.map_or(Self::Empty, Self::Number)
    }
}

impl From<i32> for Cell {
    fn from(n: i32) -> Self {
        Self::Number(f64::from(n))
    }
}

#[derive(Debug, Clone)]
pub struct Column {
    pub header: &'static str,
    pub width: f64,
}

pub const fn col(header: &'static str, width: f64) -> Column {
    Column { header, width }
}

#[derive(Debug, Clone)]
pub struct Table {
    pub sheet_name: &'static str,
    pub columns: Vec<Column>,
    pub rows: Vec<Vec<Cell>>,
}

impl Table {
    pub fn new(sheet_name: &'static str, columns: Vec<Column>) -> Self {
        Self {
            sheet_name,
            columns,
            rows: Vec::new(),
        }
    }

    pub fn push(&mut self, row: Vec<Cell>) {
        self.rows.push(row);
    }

    /// `pdf_font` is only read for PDF output.
    pub fn render(
        &self,
        format: ExportFormat,
        pdf_font: Option<&[u8]>,
    ) -> Result<Vec<u8>, ExportError> {
        match format {
            ExportFormat::Xlsx => to_xlsx(self),
            ExportFormat::Csv => to_csv(self),
            ExportFormat::Pdf => to_pdf(self, pdf_font.ok_or(ExportError::MissingFont)?),
        }
    }
}

pub fn to_xlsx(table: &Table) -> Result<Vec<u8>, ExportError> {
    let mut workbook = Workbook::new();
    let worksheet = workbook.add_worksheet();
    worksheet.set_name(table.sheet_name)?;

    let header = Format::new()
        .set_bold()
        .set_align(FormatAlign::Center)
        .set_background_color(Color::RGB(0xDDEBF7))
        .set_border(FormatBorder::Thin);
    let body = Format::new().set_text_wrap().set_border(FormatBorder::Thin);

    for (col, column) in table.columns.iter().enumerate() {
        let col = col as u16;
        worksheet.write_string_with_format(0, col, column.header, &header)?;
        worksheet.set_column_width(col, column.width)?;
    }

    for (row, cells) in table.rows.iter().enumerate() {
        let row = row as u32 + 1;
        for (col, cell) in cells.iter().enumerate() {
            let col = col as u16;
            match cell {
                Cell::Text(s) => worksheet.write_string_with_format(row, col, s, &body)?,
                Cell::Number(n) => worksheet.write_number_with_format(row, col, *n, &body)?,
                Cell::Empty => worksheet.write_blank(row, col, &body)?,
            };
        }
    }

    worksheet.set_freeze_panes(1, 0)?;
    Ok(workbook.save_to_buffer()?)
}

/// CSV with a UTF-8 BOM so spreadsheet apps detect the encoding of Korean text.
pub fn to_csv(table: &Table) -> Result<Vec<u8>, ExportError> {
    let mut csv_writer = csv::Writer::from_writer(UTF8_BOM.to_vec());
    csv_writer.write_record(table.columns.iter().map(|c| c.header))?;
    for cells in &table.rows {
        csv_writer.write_record(cells.iter().map(Cell::display))?;
    }
    csv_writer
        .into_inner()
        .map_err(|e| ExportError::Buffer(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Table {
        let mut table = Table::new("TBM", vec![col("현장명", 20.0), col("참석인원", 10.0)]);
        table.push(vec!["서울 A현장".into(), Cell::Number(12.0)]);
        table.push(vec!["부산, B현장".into(), Cell::Empty]);
        table
    }

    #[test]
    fn test_csv_has_bom_and_quotes() {
        let bytes = to_csv(&sample()).unwrap();
        assert!(bytes.starts_with(UTF8_BOM));
        let text = String::from_utf8(bytes[UTF8_BOM.len()..].to_vec()).unwrap();
        assert_eq!(text, "현장명,참석인원\n서울 A현장,12\n\"부산, B현장\",\n");
    }

    #[test]
    fn test_xlsx_is_zip_container() {
        let bytes = to_xlsx(&sample()).unwrap();
        assert!(bytes.len() > 100);
        assert_eq!(&bytes[..2], b"PK");
    }

    #[test]
    fn test_format_metadata() {
        assert_eq!(ExportFormat::default(), ExportFormat::Xlsx);
        assert_eq!(ExportFormat::Csv.extension(), "csv");
        assert!(ExportFormat::Csv.content_type().starts_with("text/csv"));
        assert_eq!(ExportFormat::Pdf.content_type(), "application/pdf");
    }

    #[test]
    fn test_format_parses_from_query_value() {
        let format: ExportFormat = serde_json::from_value(serde_json::json!("pdf")).unwrap();
        assert_eq!(format, ExportFormat::Pdf);
    }

    #[test]
    fn test_pdf_without_font_is_not_configured() {
        let err = sample().render(ExportFormat::Pdf, None).unwrap_err();
        assert!(matches!(err, ExportError::MissingFont));
        assert!(matches!(ApiError::from(err), ApiError::NotConfigured(_)));
    }

    #[test]
    fn test_render_pdf_with_font() {
        let bytes = sample()
            .render(ExportFormat::Pdf, Some(epaint_default_fonts::HACK_REGULAR))
            .unwrap();
        assert_eq!(&bytes[..4], b"%PDF");
    }
}
