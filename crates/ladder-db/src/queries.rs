//! Database query functions organized by table.

pub mod admin;
pub mod audit;
pub mod purchases;
pub mod transactions;
pub mod users;

use std::str::FromStr;

use ladder_types::TypeError;

/// Parse a stored enum tag, surfacing unknown tags as a column conversion
/// failure.
pub(crate) fn parse_tag<T>(idx: usize, text: String) -> rusqlite::Result<T>
where
    T: FromStr<Err = TypeError>,
{
    text.parse().map_err(|e: TypeError| {
        rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, Box::new(e))
    })
}
