//! Feature importance aggregation across trees.

/// A feature with its forest-level importance and rank.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct RankedFeature {
    pub name: String,
    /// Normalized MDI importance; all features together sum to 1.0.
    pub importance: f64,
    /// 1-based rank (1 = most important).
    pub rank: usize,
}

/// Average per-tree MDI vectors, renormalize, and rank descending.
///
/// Ties keep their column order.
pub(crate) fn aggregate_importances(per_tree: &[Vec<f64>], names: &[String]) -> Vec<RankedFeature> {
    if per_tree.is_empty() || names.is_empty() {
        return Vec::new();
    }

    let mut totals = vec![0.0f64; names.len()];
    for tree_imp in per_tree {
        for (total, val) in totals.iter_mut().zip(tree_imp) {
            *total += val;
        }
    }
    let sum: f64 = totals.iter().sum();
    if sum > 0.0 {
        totals.iter_mut().for_each(|v| *v /= sum);
    }

    let mut ranked: Vec<RankedFeature> = names
        .iter()
        .zip(totals)
        .map(|(name, importance)| RankedFeature {
            name: name.clone(),
            importance,
            rank: 0,
        })
        .collect();
    ranked.sort_by(|a, b| b.importance.total_cmp(&a.importance));
    for (i, feat) in ranked.iter_mut().enumerate() {
        feat.rank = i + 1;
    }
    ranked
}
