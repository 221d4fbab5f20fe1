//! Stable topological ordering of providers
//!
//! Descriptors are processed in registration order. A descriptor is deferred
//! until every declared predecessor in the same group has been placed. When
//! nothing can be placed (a cycle), the first pending descriptor in
//! registration order is placed anyway so construction always terminates with
//! every provider present.

use mill_action_api::{ProviderDescriptor, ProviderId};
use std::collections::{BTreeSet, HashMap};
use tracing::warn;

/// Linearize `descriptors`, returning indices into the slice.
///
/// Predecessors of `X` are the providers named in `X.after` plus every
/// provider whose `before` names `X`. Hints that name providers outside the
/// slice are ignored.
pub fn linearize(descriptors: &[&ProviderDescriptor]) -> Vec<usize> {
    let count = descriptors.len();

    let mut index_of: HashMap<&ProviderId, usize> = HashMap::with_capacity(count);
    for (index, descriptor) in descriptors.iter().enumerate() {
        index_of.entry(descriptor.id()).or_insert(index);
    }

    let mut predecessors: Vec<BTreeSet<usize>> = vec![BTreeSet::new(); count];
    for (index, descriptor) in descriptors.iter().enumerate() {
        for name in descriptor.runs_after() {
            if let Some(&other) = index_of.get(name) {
                if other != index {
                    predecessors[index].insert(other);
                }
            }
        }
        for name in descriptor.runs_before() {
            if let Some(&other) = index_of.get(name) {
                if other != index {
                    predecessors[other].insert(index);
                }
            }
        }
    }

    let mut placed = vec![false; count];
    let mut order = Vec::with_capacity(count);

    while order.len() < count {
        let ready = (0..count)
            .find(|&i| !placed[i] && predecessors[i].iter().all(|&p| placed[p]));

        let next = match ready {
            Some(index) => index,
            None => {
                let Some(index) = (0..count).find(|&i| !placed[i]) else {
                    break;
                };
                let involved: Vec<&str> = (0..count)
                    .filter(|&i| !placed[i])
                    .map(|i| descriptors[i].name())
                    .collect();
                warn!(
                    provider = %descriptors[index].name(),
                    involved = ?involved,
                    "Cyclic ordering constraints, falling back to registration order"
                );
                index
            }
        };

        placed[next] = true;
        order.push(next);
    }

    order
}
