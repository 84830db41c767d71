use super::{NodeId, Tree};
use rayon::prelude::*;
use rustc_hash::FxHashMap;
use std::collections::BTreeSet;
use std::sync::Arc;
use tracing::debug;

type Clade = BTreeSet<Arc<str>>;

const MISSING_SUPPORT: &str = "-";

/// Combines the support values of several trees over the same taxa.
///
/// Returns a copy of `base` in which every internal non-root node carries
/// its own support followed by the support each tree in `others` gives to
/// the same split of tips, joined with `/` (e.g. `100/95`). A split that a
/// tree does not contain contributes `-`. Splits are compared on tip names,
/// either side of the split matching, so differently rooted inputs line up.
pub fn merge_support_values(base: &Tree, others: &[Tree]) -> Tree {
    let lookups: Vec<FxHashMap<Clade, Option<Arc<str>>>> =
        others.par_iter().map(clade_supports).collect();

    let mut merged = base.clone();
    let Some(first_node_id) = merged.first_node_id() else {
        return merged;
    };
    let all_tips = clade_of(&merged, &first_node_id);

    let mut merged_count: usize = 0;
    for node_id in merged.descendants(first_node_id) {
        if node_id == first_node_id || merged.is_tip(&node_id) {
            continue;
        }
        let clade = clade_of(&merged, &node_id);
        let complement: Clade = all_tips.difference(&clade).cloned().collect();

        let mut values: Vec<String> = Vec::with_capacity(lookups.len() + 1);
        values.push(support_text(merged.support(&node_id)));
        for lookup in &lookups {
            let found = lookup.get(&clade).or_else(|| lookup.get(&complement));
            values.push(support_text(found.cloned().flatten()));
        }

        if let Some(node) = merged.node_mut(Some(node_id)) {
            node.set_support(Some(values.join("/").into()));
            merged_count += 1;
        }
    }

    debug!(nodes = merged_count, trees = others.len() + 1, "merged support values");
    merged
}

fn support_text(support: Option<Arc<str>>) -> String {
    support
        .map(|s| s.to_string())
        .unwrap_or_else(|| MISSING_SUPPORT.to_string())
}

fn clade_of(tree: &Tree, node_id: &NodeId) -> Clade {
    tree.tip_names(node_id).into_iter().collect()
}

fn clade_supports(tree: &Tree) -> FxHashMap<Clade, Option<Arc<str>>> {
    let Some(first_node_id) = tree.first_node_id() else {
        return FxHashMap::default();
    };
    tree.descendants(first_node_id)
        .into_iter()
        .filter(|id| *id != first_node_id && !tree.is_tip(id))
        .map(|id| (clade_of(tree, &id), tree.support(&id)))
        .collect()
}
