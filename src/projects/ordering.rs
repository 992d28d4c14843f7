/// Moves the item at `from` to `to`, shifting the items in between.
///
/// `to` is clamped to the last position. Returns `false` when `from` is out of
/// range, leaving `items` untouched.
pub fn move_item<T>(items: &mut Vec<T>, from: usize, to: usize) -> bool {
    if from >= items.len() {
        return false;
    }
    let to = to.min(items.len() - 1);
    let item = items.remove(from);
    items.insert(to, item);
    true
}

/// `(position, item)` pairs whose position differs from `current_order`.
pub fn changed_positions<T: Copy, K: PartialEq>(
    items: &[T],
    current_order: impl Fn(&T) -> K,
    position_key: impl Fn(usize) -> K,
) -> Vec<(usize, T)> {
    items
        .iter()
        .enumerate()
        .filter(|&(index, item)| current_order(item) != position_key(index))
        .map(|(index, item)| (index, *item))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_move_down() {
        let mut items = vec!['a', 'b', 'c', 'd'];
        assert!(move_item(&mut items, 0, 2));
        assert_eq!(items, vec!['b', 'c', 'a', 'd']);
    }

    #[test]
    fn test_move_up() {
        let mut items = vec!['a', 'b', 'c', 'd'];
        assert!(move_item(&mut items, 3, 1));
        assert_eq!(items, vec!['a', 'd', 'b', 'c']);
    }

    #[test]
    fn test_move_clamps_target() {
        let mut items = vec![1, 2, 3];
        assert!(move_item(&mut items, 0, 99));
        assert_eq!(items, vec![2, 3, 1]);
    }

    #[test]
    fn test_move_out_of_range_is_noop() {
        let mut items = vec![1, 2, 3];
        assert!(!move_item(&mut items, 5, 0));
        assert_eq!(items, vec![1, 2, 3]);
    }

    #[test]
    fn test_changed_positions_skips_unchanged() {
        // (id, stored display_order)
        let items = [(10, 0), (30, 2), (20, 1)];
        let changed = changed_positions(&items, |item| item.1, |index| index as i32);
        assert_eq!(changed, vec![(1, (30, 2)), (2, (20, 1))]);
    }
}
