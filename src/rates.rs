use std::collections::HashSet;
use std::str::FromStr;

use quick_xml::Reader;
use quick_xml::events::Event;
use rust_decimal::Decimal;
use serde::Deserialize;

use crate::exchange_rate::RateRecord;

#[derive(Debug, Clone, thiserror::Error, PartialEq)]
pub enum ParseError {
    #[error("malformed feed document: {0}")]
    Malformed(String),
    #[error("invalid value {value:?} for {code}")]
    InvalidValue { code: String, value: String },
}

#[derive(Debug, Deserialize, PartialEq)]
pub struct Item {
    pub fullname: String,
    #[serde(rename = "title")]
    pub code: String,
    #[serde(rename = "description")]
    pub value: String,
}

#[derive(Debug, Deserialize, PartialEq)]
pub struct Rates {
    pub date: String,
    #[serde(rename = "item", default)]
    pub items: Vec<Item>,
}

/// Decodes a `<rates>` document into records, preserving feed order.
///
/// A document with no `<item>` elements yields an empty vector.
pub fn parse(bytes: &[u8]) -> Result<Vec<RateRecord>, ParseError> {
    let text = std::str::from_utf8(bytes)
        .map_err(|e| ParseError::Malformed(format!("body is not UTF-8: {e}")))?;
    check_document(text)?;
    let rates: Rates =
        quick_xml::de::from_str(text).map_err(|e| ParseError::Malformed(e.to_string()))?;

    let mut seen = HashSet::new();
    let mut records = Vec::with_capacity(rates.items.len());

    for item in rates.items {
        let code = item.code.trim().to_string();
        if code.is_empty() {
            return Err(ParseError::Malformed("item without a code".to_string()));
        }
        if !seen.insert(code.clone()) {
            return Err(ParseError::Malformed(format!("duplicate code {code}")));
        }

        let value = parse_value(&item.value).ok_or_else(|| ParseError::InvalidValue {
            code: code.clone(),
            value: item.value.clone(),
        })?;

        records.push(RateRecord {
            fullname: item.fullname.trim().to_string(),
            code,
            value,
        });
    }

    Ok(records)
}

/// Walks the whole document: exactly one root element, named `rates`, and nothing but
/// whitespace, comments or processing instructions around it.
fn check_document(text: &str) -> Result<(), ParseError> {
    let mut reader = Reader::from_str(text);
    let mut depth = 0usize;
    let mut seen_root = false;

    loop {
        let event = reader.read_event().map_err(|e| malformed(e.to_string()))?;
        match event {
            Event::Eof if seen_root && depth == 0 => return Ok(()),
            Event::Eof => return Err(malformed("unexpected end of document")),
            Event::Start(ref e) | Event::Empty(ref e) if depth == 0 => {
                if seen_root {
                    return Err(malformed("content after the root element"));
                }
                if e.name().as_ref() != b"rates" {
                    let name = String::from_utf8_lossy(e.name().as_ref()).into_owned();
                    return Err(malformed(format!("unexpected root element <{name}>")));
                }
                seen_root = true;
                if matches!(event, Event::Start(_)) {
                    depth += 1;
                }
            }
            Event::Start(_) => depth += 1,
            Event::End(_) => {
                depth = depth
                    .checked_sub(1)
                    .ok_or_else(|| malformed("unmatched closing tag"))?;
            }
            Event::Text(ref e) if depth == 0 => {
                if !e.iter().all(u8::is_ascii_whitespace) {
                    return Err(malformed("text outside the root element"));
                }
            }
            Event::Decl(_) | Event::PI(_) | Event::Comment(_) | Event::DocType(_) => {}
            _ if depth == 0 => {
                return Err(malformed("content outside the root element"));
            }
            _ => {}
        }
    }
}

fn malformed(msg: impl Into<String>) -> ParseError {
    ParseError::Malformed(msg.into())
}

fn parse_value(s: &str) -> Option<Decimal> {
    let normalized_string = normalize_decimal_string(s.trim());
    let digits = normalized_string.chars().filter(char::is_ascii_digit).count();
    let points = normalized_string.chars().filter(|&c| c == '.').count();
    if digits == 0 || points > 1 || digits + points != normalized_string.len() {
        return None;
    }

    Decimal::from_str(&normalized_string)
        .ok()
        .filter(|value| value.is_sign_positive() && !value.is_zero())
}

fn normalize_decimal_string(s: &str) -> String {
    s.replace(',', ".")
}
