//! Temporal assignment over sorted annotation lists.
//!
//! Two lookups tie loosely time-stamped annotations to the turn timeline:
//! interval membership for blocks and topics, and exact-instant matching for
//! mentions, proposals and claims.

/// Position of the interval containing `t` in a list sorted by start.
///
/// Intervals are half-open `[start_i, start_{i+1})` and the last one is
/// unbounded above. A query earlier than the first start wraps to the last
/// interval, so the lookup is total once the list is non-empty. With
/// duplicate starts the later entry wins.
pub fn assign_interval_index<L, T: PartialOrd>(t: &T, intervals: &[(L, T)]) -> Option<usize> {
    if intervals.is_empty() {
        return None;
    }

    let after = intervals.partition_point(|(_, start)| start <= t);
    Some(if after == 0 { intervals.len() - 1 } else { after - 1 })
}

/// Label of the interval containing `t`, see [`assign_interval_index`]
pub fn assign_interval<'a, L, T: PartialOrd>(t: &T, intervals: &'a [(L, T)]) -> Option<&'a L> {
    assign_interval_index(t, intervals).map(|i| &intervals[i].0)
}

/// Payload recorded at exactly `t`; the first matching entry wins
pub fn lookup_exact<'a, T: PartialEq, P>(t: &T, entries: &'a [(T, P)]) -> Option<&'a P> {
    entries
        .iter()
        .find(|(time, _)| time == t)
        .map(|(_, payload)| payload)
}
