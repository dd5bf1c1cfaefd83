use std::fmt;

use serde::de::{self, Deserializer, Unexpected, Visitor};
use serde::Deserialize;
use serde_json::{json, Value};

use estoque_core::{DomainError, DomainResult, ProductCode};
use estoque_infra::{ImportOutcome, Page};
use estoque_products::{NewProduct, Product, ProductChanges, RejectedRow};

pub const PRODUCT_CODE_REQUIRED: &str = "product code required";
pub const INVALID_REQUEST_BODY: &str = "invalid request body";

// -------------------------
// Request DTOs
// -------------------------

/// Every writable product field, keyed by its wire name.
///
/// Absent and `null` both come through as `None`. Quantities accept a JSON
/// integer or a string holding one (form inputs send text).
#[derive(Debug, Default, Deserialize)]
pub struct ProductFieldsRequest {
    #[serde(default)]
    pub nome_do_produto: Option<String>,
    #[serde(default)]
    pub marca: Option<String>,
    #[serde(default, deserialize_with = "lenient_i64")]
    pub ceara: Option<i64>,
    #[serde(default, deserialize_with = "lenient_i64")]
    pub santa_catarina: Option<i64>,
    #[serde(default, deserialize_with = "lenient_i64")]
    pub sao_paulo: Option<i64>,
    #[serde(default, deserialize_with = "lenient_i64")]
    pub total: Option<i64>,
    #[serde(default, deserialize_with = "lenient_i64")]
    pub reserva: Option<i64>,
}

impl ProductFieldsRequest {
    pub fn into_changes(self) -> ProductChanges {
        ProductChanges {
            name: self.nome_do_produto,
            brand: self.marca,
            stock_ceara: self.ceara,
            stock_santa_catarina: self.santa_catarina,
            stock_sao_paulo: self.sao_paulo,
            total: self.total,
            reserved: self.reserva,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct SearchParams {
    pub termo: Option<String>,
}

/// Raw list parameters. Kept as text so a malformed value falls back to the
/// default instead of rejecting the request.
#[derive(Debug, Deserialize)]
pub struct ListParams {
    pub page: Option<String>,
    pub per_page: Option<String>,
}

impl ListParams {
    pub fn page(&self) -> Option<i64> {
        lenient_query_int(self.page.as_deref())
    }

    pub fn per_page(&self) -> Option<i64> {
        lenient_query_int(self.per_page.as_deref())
    }
}

fn lenient_query_int(raw: Option<&str>) -> Option<i64> {
    raw.and_then(|s| s.trim().parse().ok())
}

/// Parse a create body: `cod` is required, everything else optional.
pub fn parse_create_request(body: Value) -> DomainResult<NewProduct> {
    let Value::Object(mut map) = body else {
        return Err(DomainError::validation(PRODUCT_CODE_REQUIRED));
    };

    let code = match map.remove("cod") {
        None | Some(Value::Null) => return Err(DomainError::validation(PRODUCT_CODE_REQUIRED)),
        Some(raw) => code_from_json(&raw)?,
    };

    let fields: ProductFieldsRequest = serde_json::from_value(Value::Object(map))
        .map_err(|e| DomainError::validation(e.to_string()))?;

    Ok(NewProduct {
        code,
        fields: fields.into_changes(),
    })
}

/// Parse an update body. Any `cod` in it is ignored.
pub fn parse_update_request(body: Value) -> DomainResult<ProductChanges> {
    if !body.is_object() {
        return Err(DomainError::validation(INVALID_REQUEST_BODY));
    }
    let fields: ProductFieldsRequest =
        serde_json::from_value(body).map_err(|e| DomainError::validation(e.to_string()))?;
    Ok(fields.into_changes())
}

fn code_from_json(raw: &Value) -> DomainResult<ProductCode> {
    let code = match raw {
        Value::Number(n) => n.as_i64().or_else(|| n.as_f64().and_then(whole_number)),
        Value::String(s) => parse_whole(s),
        _ => None,
    };
    code.map(ProductCode::new)
        .ok_or_else(|| DomainError::invalid_id(raw.to_string()))
}

/// Integer text, or float text with no fractional part (`"12.0"`).
fn parse_whole(raw: &str) -> Option<i64> {
    let trimmed = raw.trim();
    trimmed
        .parse()
        .ok()
        .or_else(|| trimmed.parse().ok().and_then(whole_number))
}

fn whole_number(v: f64) -> Option<i64> {
    // 2^63; the upper bound is exclusive.
    const LIMIT: f64 = 9_223_372_036_854_775_808.0;
    (v.fract() == 0.0 && v >= -LIMIT && v < LIMIT).then_some(v as i64)
}

fn lenient_i64<'de, D>(deserializer: D) -> Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    struct LenientI64;

    impl<'de> Visitor<'de> for LenientI64 {
        type Value = Option<i64>;

        fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
            f.write_str("an integer or a string holding an integer")
        }

        fn visit_unit<E: de::Error>(self) -> Result<Self::Value, E> {
            Ok(None)
        }

        fn visit_none<E: de::Error>(self) -> Result<Self::Value, E> {
            Ok(None)
        }

        fn visit_some<D2: Deserializer<'de>>(self, d: D2) -> Result<Self::Value, D2::Error> {
            d.deserialize_any(LenientI64)
        }

        fn visit_i64<E: de::Error>(self, v: i64) -> Result<Self::Value, E> {
            Ok(Some(v))
        }

        fn visit_u64<E: de::Error>(self, v: u64) -> Result<Self::Value, E> {
            i64::try_from(v)
                .map(Some)
                .map_err(|_| E::invalid_value(Unexpected::Unsigned(v), &self))
        }

        fn visit_f64<E: de::Error>(self, v: f64) -> Result<Self::Value, E> {
            whole_number(v)
                .map(Some)
                .ok_or_else(|| E::invalid_value(Unexpected::Float(v), &self))
        }

        fn visit_str<E: de::Error>(self, v: &str) -> Result<Self::Value, E> {
            let trimmed = v.trim();
            if trimmed.is_empty() {
                return Ok(None);
            }
            parse_whole(trimmed)
                .map(Some)
                .ok_or_else(|| E::invalid_value(Unexpected::Str(v), &self))
        }
    }

    deserializer.deserialize_any(LenientI64)
}

// -------------------------
// Response projections
// -------------------------

pub fn product_to_json(product: &Product) -> Value {
    json!({
        "cod": product.code().get(),
        "nome_do_produto": product.name,
        "marca": product.brand,
        "ceara": product.stock_ceara,
        "santa_catarina": product.stock_santa_catarina,
        "sao_paulo": product.stock_sao_paulo,
        "total": product.total,
        "reserva": product.reserved,
    })
}

pub fn products_to_json(products: &[Product]) -> Value {
    Value::Array(products.iter().map(product_to_json).collect())
}

pub fn page_to_json(page: &Page<Product>) -> Value {
    json!({
        "produtos": products_to_json(&page.items),
        "total": page.total,
        "pages": page.pages,
        "current_page": page.page,
    })
}

pub fn rejected_row_to_json(row: &RejectedRow) -> Value {
    json!({
        "linha": row.line,
        "cod": row.raw_code,
        "motivo": row.reason,
    })
}

/// Import summary. `rejected` holds every skipped row, parse and store
/// failures alike, in file order.
pub fn import_summary_to_json(outcome: &ImportOutcome, rejected: &[RejectedRow]) -> Value {
    json!({
        "message": "spreadsheet processed successfully",
        "produtos_inseridos": outcome.inserted,
        "produtos_atualizados": outcome.updated,
        "linhas_ignoradas": rejected.iter().map(rejected_row_to_json).collect::<Vec<_>>(),
    })
}
