//! Per-entity extractors
//!
//! Pure mappings from one source record to the natural key and typed field
//! set of each entity. One module per source format:
//! - **basic_dataset** - eBird Basic Dataset rows (tab delimited)
//! - **api** - eBird API 2.0 checklist payloads
//! - **personal** - "Download My Data" export rows (comma delimited)
//!
//! Extractors never touch the database. Foreign entities are resolved by the
//! loader first and passed in as ids: Location and Observer before
//! Checklist, Species and Checklist before Observation.

pub mod api;
pub mod basic_dataset;
pub mod personal;

use ebird_common::values::to_decimal;
use ebird_common::Result;
use rust_decimal::prelude::ToPrimitive;

fn text(value: &str) -> Option<String> {
    Some(value.to_string())
}

/// Taxonomic order as an integer.
///
/// The taxonomy publishes some orders as floats (`28470.0`); whole values
/// are kept, fractional ones (issf and hybrid slots) are treated as unknown.
pub(crate) fn taxon_order(raw: Option<&str>) -> Result<Option<i64>> {
    let Some(order) = to_decimal(raw)? else {
        return Ok(None);
    };

    if order.fract().is_zero() {
        Ok(order.trunc().to_i64())
    } else {
        Ok(None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_taxon_order() {
        assert_eq!(taxon_order(Some("20213")).unwrap(), Some(20213));
        assert_eq!(taxon_order(Some("28470.0")).unwrap(), Some(28470));
        assert_eq!(taxon_order(Some("28470.5")).unwrap(), None);
        assert_eq!(taxon_order(Some("")).unwrap(), None);
        assert!(taxon_order(Some("robin")).is_err());
    }
}
