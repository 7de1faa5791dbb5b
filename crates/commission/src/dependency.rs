//! Children-first ordering of a dependency graph.

use std::collections::{BTreeMap, BTreeSet};

/// Order `nodes` so that every node comes after the nodes it depends on.
///
/// `dependencies(n)` lists the nodes `n` depends on; dependencies outside
/// `nodes` are ignored. On a cycle, returns the node where it was detected.
pub fn topological_order<K, F, I>(nodes: &[K], dependencies: F) -> Result<Vec<K>, K>
where
    K: Ord + Copy,
    F: Fn(K) -> I,
    I: IntoIterator<Item = K>,
{
    #[derive(Clone, Copy, PartialEq, Eq)]
    enum Mark {
        Visiting,
        Done,
    }

    let known: BTreeSet<K> = nodes.iter().copied().collect();
    let mut marks: BTreeMap<K, Mark> = BTreeMap::new();
    let mut order = Vec::with_capacity(nodes.len());

    for &root in nodes {
        if marks.contains_key(&root) {
            continue;
        }

        // Explicit stack: (node, dependencies still to visit).
        let mut stack: Vec<(K, std::vec::IntoIter<K>)> = Vec::new();
        marks.insert(root, Mark::Visiting);
        stack.push((root, collect_known(&known, dependencies(root))));

        while let Some((node, pending)) = stack.last_mut() {
            match pending.next() {
                Some(dep) => match marks.get(&dep) {
                    Some(Mark::Done) => {}
                    Some(Mark::Visiting) => return Err(dep),
                    None => {
                        marks.insert(dep, Mark::Visiting);
                        let next = collect_known(&known, dependencies(dep));
                        stack.push((dep, next));
                    }
                },
                None => {
                    let node = *node;
                    marks.insert(node, Mark::Done);
                    order.push(node);
                    stack.pop();
                }
            }
        }
    }

    Ok(order)
}

fn collect_known<K: Ord + Copy>(
    known: &BTreeSet<K>,
    deps: impl IntoIterator<Item = K>,
) -> std::vec::IntoIter<K> {
    deps.into_iter()
        .filter(|d| known.contains(d))
        .collect::<Vec<_>>()
        .into_iter()
}
