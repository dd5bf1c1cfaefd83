//! Stock spreadsheet (CSV) parsing.
//!
//! Turns an uploaded sheet into product records. Only structural problems
//! (encoding, CSV syntax, missing `COD` header) fail the whole sheet; a bad row
//! is reported in [`StockSheet::rejected`] and parsing continues.

use csv::{ReaderBuilder, StringRecord};
use thiserror::Error;

use estoque_core::ProductCode;

use crate::product::Product;
use crate::quantity::{lenient_quantity, strip_digit_separators, truncate_to_i64};

pub const COL_CODE: &str = "COD";
pub const COL_NAME: &str = "NOME DO PRODUTO";
pub const COL_BRAND: &str = "MARCA";
pub const COL_CEARA: &str = "CEARÁ";
pub const COL_SANTA_CATARINA: &str = "SANTA CATARINA";
pub const COL_SAO_PAULO: &str = "SÃO PAULO";
pub const COL_TOTAL: &str = "TOTAL";
pub const COL_RESERVED: &str = "RESERVA";

/// Sheet-level failure: nothing from the sheet may be applied.
#[derive(Debug, Error)]
pub enum ImportError {
    #[error("file is not valid UTF-8: {0}")]
    InvalidEncoding(#[from] std::str::Utf8Error),

    #[error("malformed CSV: {0}")]
    Csv(#[from] csv::Error),

    #[error("missing required column `{0}`")]
    MissingColumn(&'static str),
}

/// A row that parsed into a product.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SheetRecord {
    /// Line in the file where the row starts (the header is line 1).
    pub line: u64,
    pub product: Product,
}

/// A row that was skipped, with the reason.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RejectedRow {
    pub line: u64,
    pub raw_code: String,
    pub reason: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StockSheet {
    pub records: Vec<SheetRecord>,
    pub rejected: Vec<RejectedRow>,
    /// Rows dropped because `COD` was empty. Not reported individually.
    pub blank_codes: usize,
}

/// Header positions. Only `COD` is mandatory.
#[derive(Debug)]
struct Columns {
    code: usize,
    name: Option<usize>,
    brand: Option<usize>,
    ceara: Option<usize>,
    santa_catarina: Option<usize>,
    sao_paulo: Option<usize>,
    total: Option<usize>,
    reserved: Option<usize>,
}

impl Columns {
    fn locate(headers: &StringRecord) -> Result<Self, ImportError> {
        let find = |name: &str| headers.iter().position(|h| h == name);
        Ok(Self {
            code: find(COL_CODE).ok_or(ImportError::MissingColumn(COL_CODE))?,
            name: find(COL_NAME),
            brand: find(COL_BRAND),
            ceara: find(COL_CEARA),
            santa_catarina: find(COL_SANTA_CATARINA),
            sao_paulo: find(COL_SAO_PAULO),
            total: find(COL_TOTAL),
            reserved: find(COL_RESERVED),
        })
    }
}

/// Parse an uploaded CSV sheet. Header names must match exactly.
pub fn parse_stock_sheet(bytes: &[u8]) -> Result<StockSheet, ImportError> {
    let text = std::str::from_utf8(bytes)?;
    let text = text.strip_prefix('\u{feff}').unwrap_or(text);

    let mut reader = ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(text.as_bytes());

    let columns = Columns::locate(reader.headers()?)?;
    let mut sheet = StockSheet::default();

    for result in reader.records() {
        let record = result?;
        let line = record.position().map(|p| p.line()).unwrap_or_default();

        let raw_code = cell(&record, Some(columns.code)).unwrap_or_default().trim();
        if raw_code.is_empty() {
            sheet.blank_codes += 1;
            continue;
        }

        let Some(code) = parse_code(raw_code) else {
            tracing::warn!(line, raw_code, "skipping row: product code is not a number");
            sheet.rejected.push(RejectedRow {
                line,
                raw_code: raw_code.to_string(),
                reason: format!("invalid product code {raw_code:?}"),
            });
            continue;
        };

        let mut product = Product::new(code);
        product.name = cell(&record, columns.name).unwrap_or_default().to_string();
        product.brand = cell(&record, columns.brand).unwrap_or_default().to_string();
        product.stock_ceara = quantity(&record, columns.ceara, COL_CEARA, line);
        product.stock_santa_catarina =
            quantity(&record, columns.santa_catarina, COL_SANTA_CATARINA, line);
        product.stock_sao_paulo = quantity(&record, columns.sao_paulo, COL_SAO_PAULO, line);
        product.total = quantity(&record, columns.total, COL_TOTAL, line);
        product.reserved = quantity(&record, columns.reserved, COL_RESERVED, line);

        sheet.records.push(SheetRecord { line, product });
    }

    Ok(sheet)
}

fn cell(record: &StringRecord, idx: Option<usize>) -> Option<&str> {
    idx.and_then(|i| record.get(i))
}

fn quantity(record: &StringRecord, idx: Option<usize>, column: &str, line: u64) -> i64 {
    let raw = cell(record, idx);
    let coerced = lenient_quantity(raw);
    if let Some(fallback) = coerced.fallback {
        tracing::debug!(line, column, ?raw, ?fallback, "quantity coerced to zero");
    }
    coerced.value
}

/// Integer first; spreadsheet tools also export codes as `"123.0"`.
fn parse_code(raw: &str) -> Option<ProductCode> {
    let raw = strip_digit_separators(raw)?;
    if let Ok(v) = raw.parse::<i64>() {
        return Some(ProductCode::new(v));
    }
    raw.parse::<f64>().ok().and_then(truncate_to_i64).map(ProductCode::new)
}
