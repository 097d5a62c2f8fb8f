use std::cmp::Ordering;

use crate::{Metric, NodeRecord};

/// Number of nodes shown on a chart.
pub const TOP_N: usize = 5;

/// Pick the `n` nodes with the highest value of `metric`, highest first.
///
/// Missing values count as zero and ties keep their input order. Returns
/// `None` for an empty input since there is nothing to chart.
pub fn top_nodes(nodes: &[NodeRecord], metric: Metric, n: usize) -> Option<Vec<NodeRecord>> {
    if nodes.is_empty() {
        return None;
    }

    let mut ranked = nodes.to_vec();
    // `sort_by` is stable, equal values keep the backend's order
    ranked.sort_by(|a, b| descending(a.value(metric), b.value(metric)));
    ranked.truncate(n);
    Some(ranked)
}

pub fn top_five(nodes: &[NodeRecord], metric: Metric) -> Option<Vec<NodeRecord>> {
    top_nodes(nodes, metric, TOP_N)
}

// NaN sorts after every real value
fn descending(a: f64, b: f64) -> Ordering {
    match (a.is_nan(), b.is_nan()) {
        (true, true) => Ordering::Equal,
        (true, false) => Ordering::Greater,
        (false, true) => Ordering::Less,
        (false, false) => b.partial_cmp(&a).unwrap_or(Ordering::Equal),
    }
}
