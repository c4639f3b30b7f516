use tracing::debug;

use crate::counts::{AggregateCountMap, PartialCountMap};
use crate::error::{Error, Result};

/// Combine partial tallies into the nested URL -> date aggregate.
///
/// Keys are split at the first `,`. The result does not depend on the order
/// of `partials`.
pub fn merge<I>(partials: I) -> Result<AggregateCountMap>
where
    I: IntoIterator<Item = PartialCountMap>,
{
    let mut combined = PartialCountMap::new();
    let mut merged = 0usize;
    for partial in partials {
        combined.absorb(partial);
        merged += 1;
    }
    debug!(partials = merged, keys = combined.len(), "merging partial counts");

    let mut aggregate = AggregateCountMap::new();
    for (key, count) in combined {
        let (url, date) = split_key(&key)?;
        aggregate.add(url, date, count);
    }
    Ok(aggregate)
}

fn split_key(key: &[u8]) -> Result<(&str, &str)> {
    let text = std::str::from_utf8(key).map_err(|_| Error::Format {
        key: String::from_utf8_lossy(key).into_owned(),
        reason: "key is not valid UTF-8",
    })?;
    text.split_once(',').ok_or_else(|| Error::Format {
        key: text.to_owned(),
        reason: "missing ',' separator",
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn partial(entries: &[(&str, u64)]) -> PartialCountMap {
        let mut map = PartialCountMap::new();
        for (key, count) in entries {
            map.add(key.as_bytes(), *count);
        }
        map
    }

    #[test]
    fn splits_on_first_comma_only() {
        let aggregate = merge(vec![partial(&[("/a,b,c", 2)])]).unwrap();
        assert_eq!(aggregate.get("/a", "b,c"), Some(2));
    }

    #[test]
    fn sums_across_partials() {
        let aggregate = merge(vec![
            partial(&[("urlA,2024-01-01", 1), ("urlB,2024-01-01", 1)]),
            partial(&[("urlA,2024-01-01", 1), ("urlA,2023-06-30", 4)]),
        ])
        .unwrap();
        assert_eq!(aggregate.get("urlA", "2024-01-01"), Some(2));
        assert_eq!(aggregate.get("urlA", "2023-06-30"), Some(4));
        assert_eq!(aggregate.get("urlB", "2024-01-01"), Some(1));
        assert_eq!(aggregate.len(), 2);
    }

    #[test]
    fn missing_separator_is_fatal() {
        let err = merge(vec![partial(&[("urlA,2024-01-01", 1), ("garbage", 1)])]).unwrap_err();
        match err {
            Error::Format { key, .. } => assert_eq!(key, "garbage"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn empty_key_is_fatal() {
        let err = merge(vec![partial(&[("", 1)])]).unwrap_err();
        assert!(matches!(err, Error::Format { .. }));
    }

    #[test]
    fn invalid_utf8_is_fatal() {
        let mut map = PartialCountMap::new();
        map.record(b"/\xff,2024-01-01");
        assert!(matches!(merge(vec![map]), Err(Error::Format { .. })));
    }

    #[test]
    fn no_partials_yield_empty_aggregate() {
        assert!(merge(Vec::new()).unwrap().is_empty());
    }

    fn arb_partial() -> impl Strategy<Value = PartialCountMap> {
        prop::collection::vec(("/[a-c]{1,2}", "2024-0[1-3]-0[1-2]", 1u64..5), 0..12).prop_map(
            |entries| {
                let mut map = PartialCountMap::new();
                for (url, date, count) in entries {
                    map.add(format!("{url},{date}").as_bytes(), count);
                }
                map
            },
        )
    }

    proptest! {
        #[test]
        fn merge_is_order_independent(parts in prop::collection::vec(arb_partial(), 0..6)) {
            let forward = merge(parts.clone()).unwrap();
            let mut reversed = parts.clone();
            reversed.reverse();
            prop_assert_eq!(&forward, &merge(reversed).unwrap());
        }

        #[test]
        fn merge_is_associative(a in arb_partial(), b in arb_partial(), c in arb_partial()) {
            let mut ab = a.clone();
            ab.absorb(b.clone());
            let mut bc = b;
            bc.absorb(c.clone());
            prop_assert_eq!(merge(vec![ab, c]).unwrap(), merge(vec![a, bc]).unwrap());
        }
    }
}
