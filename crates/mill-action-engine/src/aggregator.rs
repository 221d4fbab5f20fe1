//! Restores provider order on completion-ordered results

use crate::engine::CollectedAction;

/// Sort `buffer` by the position of the provider that produced each item.
///
/// Each entry carries its provider's index in the scheduled list, so two
/// providers sharing a name still keep distinct keys. The sort is stable:
/// items from one provider keep their report order.
pub fn aggregate(mut buffer: Vec<(usize, CollectedAction)>) -> Vec<CollectedAction> {
    buffer.sort_by_key(|(position, _)| *position);
    buffer.into_iter().map(|(_, collected)| collected).collect()
}
