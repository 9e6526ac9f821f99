/// Predicts the next list index worth preloading from the scroll direction.
///
/// `previous` is `None` right after a directory change, which counts as
/// scrolling forward from before the first item.
pub fn hint_index(current: usize, previous: Option<usize>, total: usize) -> Option<usize> {
    if total == 0 || previous == Some(current) {
        return None;
    }

    let forward = previous.map_or(true, |prev| current > prev);
    let candidate = if forward {
        current.checked_add(1)?
    } else {
        current.checked_sub(1)?
    };

    (candidate < total).then_some(candidate)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scrolling_down_hints_next_item() {
        assert_eq!(hint_index(10, Some(9), 100), Some(11));
    }

    #[test]
    fn scrolling_up_hints_previous_item() {
        assert_eq!(hint_index(10, Some(11), 100), Some(9));
    }

    #[test]
    fn no_hint_past_either_end() {
        assert_eq!(hint_index(99, Some(98), 100), None);
        assert_eq!(hint_index(0, Some(1), 100), None);
    }

    #[test]
    fn no_hint_without_movement() {
        for total in [0, 1, 2, 50] {
            assert_eq!(hint_index(0, Some(0), total), None);
        }
        assert_eq!(hint_index(10, Some(10), 100), None);
    }

    #[test]
    fn no_hint_for_empty_list() {
        assert_eq!(hint_index(0, None, 0), None);
        assert_eq!(hint_index(3, Some(2), 0), None);
    }

    #[test]
    fn forward_step_hints_following_item_everywhere_but_the_end() {
        let total: usize = 8;
        for i in 0..total - 1 {
            let previous = i.checked_sub(1);
            assert_eq!(hint_index(i, previous, total), Some(i + 1), "index {i}");
        }
        assert_eq!(hint_index(total - 1, Some(total - 2), total), None);
    }

    #[test]
    fn fresh_listing_counts_as_forward() {
        assert_eq!(hint_index(0, None, 3), Some(1));
        assert_eq!(hint_index(0, None, 1), None);
    }
}
