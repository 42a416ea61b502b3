/// Priority ordering
///
/// Weights are High 3, Medium 2, Low 1. Higher weight first; ties go to the
/// newer task, then the earlier due date (undated last). The sort is stable,
/// so anything still tied keeps its input order.
///
/// ```
/// use taskboard_client::ordering::priority_weight;
/// use taskboard_shared::models::task::Priority;
///
/// assert!(priority_weight(Priority::High) > priority_weight(Priority::Low));
/// ```

use std::cmp::Ordering;
use taskboard_shared::models::task::{AssignedTask, Priority, Task};

pub fn priority_weight(priority: Priority) -> u8 {
    match priority {
        Priority::High => 3,
        Priority::Medium => 2,
        Priority::Low => 1,
    }
}

/// Anything that carries a task
pub trait Prioritized {
    fn task(&self) -> &Task;
}

impl Prioritized for Task {
    fn task(&self) -> &Task {
        self
    }
}

impl Prioritized for AssignedTask {
    fn task(&self) -> &Task {
        &self.task
    }
}

pub fn compare_priority<T: Prioritized>(a: &T, b: &T) -> Ordering {
    let (a, b) = (a.task(), b.task());

    priority_weight(b.priority)
        .cmp(&priority_weight(a.priority))
        .then_with(|| b.created_at.cmp(&a.created_at))
        .then_with(|| match (a.due_date, b.due_date) {
            (Some(x), Some(y)) => x.cmp(&y),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => Ordering::Equal,
        })
}

/// Sorts in place, highest priority first
pub fn sort_by_priority<T: Prioritized>(items: &mut [T]) {
    items.sort_by(compare_priority);
}
