//! Forgiving decoders for stored card metadata.
//!
//! Older documents may omit the tag or cross-reference field, store `null`,
//! or hold a non-list value. Every read path goes through these helpers so a
//! caller always sees a (possibly empty) set. Scalar fields of the wrong type
//! decode to their default so one bad value never discards a whole document.

use std::collections::BTreeSet;

use serde::de::IgnoredAny;
use serde::{Deserialize, Deserializer};
use time::format_description::well_known::{Iso8601, Rfc3339};
use time::{OffsetDateTime, PrimitiveDateTime};

#[derive(Deserialize)]
#[serde(untagged)]
enum MaybeList<T> {
    List(Vec<T>),
    Other(IgnoredAny),
}

#[derive(Deserialize)]
#[serde(untagged)]
enum MaybeValue<T> {
    Value(T),
    Other(IgnoredAny),
}

#[derive(Deserialize)]
#[serde(untagged)]
enum MaybeText {
    Text(String),
    Other(IgnoredAny),
}

/// Deserializes a list into a set, treating `null` or any non-list value as empty.
///
/// Pair with `#[serde(default)]` to also cover a missing field.
pub fn set_or_empty<'de, D, T>(deserializer: D) -> Result<BTreeSet<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de> + Ord,
{
    Ok(match MaybeList::<T>::deserialize(deserializer)? {
        MaybeList::List(items) => items.into_iter().collect(),
        MaybeList::Other(_) => BTreeSet::new(),
    })
}

/// Deserializes a value of the expected shape, treating anything else
/// (`null`, a string where a number belongs, ...) as the type's default.
///
/// Pair with `#[serde(default)]` to also cover a missing field.
pub fn value_or_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de> + Default,
{
    Ok(match MaybeValue::<T>::deserialize(deserializer)? {
        MaybeValue::Value(value) => value,
        MaybeValue::Other(_) => T::default(),
    })
}

/// Decodes a JSON list stored as text (as in the search projection).
///
/// Malformed text yields an empty set.
pub fn decode_set<T>(text: &str) -> BTreeSet<T>
where
    T: for<'de> Deserialize<'de> + Ord,
{
    let mut deserializer = serde_json::Deserializer::from_str(text);
    set_or_empty(&mut deserializer).unwrap_or_default()
}

/// Deserializes an optional timestamp.
///
/// Accepts RFC 3339 and offset-less ISO 8601 (assumed UTC); anything else,
/// including `null`, becomes `None`.
pub fn timestamp_or_none<'de, D>(deserializer: D) -> Result<Option<OffsetDateTime>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match MaybeText::deserialize(deserializer)? {
        MaybeText::Text(text) => parse_timestamp(&text),
        MaybeText::Other(_) => None,
    })
}

fn parse_timestamp(text: &str) -> Option<OffsetDateTime> {
    OffsetDateTime::parse(text, &Rfc3339)
        .ok()
        .or_else(|| {
            PrimitiveDateTime::parse(text, &Iso8601::DEFAULT)
                .ok()
                .map(PrimitiveDateTime::assume_utc)
        })
}
