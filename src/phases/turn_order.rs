//! Turn-order arithmetic.
//!
//! `order` is the eligible players for a phase; `seating` is the full
//! turn order (eliminated players included). The seating is only consulted
//! when the current player has dropped out of `order` mid-turn.

use crate::core::player::PlayerColor;

/// Next player after `current`, or `None` once the order is exhausted.
#[must_use]
pub fn next_in_order(order: &[PlayerColor], seating: &[PlayerColor], current: PlayerColor) -> Option<PlayerColor> {
    if let Some(pos) = order.iter().position(|c| *c == current) {
        return order.get(pos + 1).copied();
    }
    let current_seat = seat(seating, current)?;
    order
        .iter()
        .copied()
        .find(|c| seat(seating, *c).is_some_and(|s| s > current_seat))
}

/// Next player after `current`, wrapping to the start of the order.
///
/// `None` only when the order is empty.
#[must_use]
pub fn next_cyclic(order: &[PlayerColor], seating: &[PlayerColor], current: PlayerColor) -> Option<PlayerColor> {
    if order.is_empty() {
        return None;
    }
    if let Some(pos) = order.iter().position(|c| *c == current) {
        return Some(order[(pos + 1) % order.len()]);
    }
    next_in_order(order, seating, current).or_else(|| order.first().copied())
}

fn seat(seating: &[PlayerColor], color: PlayerColor) -> Option<usize> {
    seating.iter().position(|c| *c == color)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use PlayerColor::*;

    #[test]
    fn test_next_in_order() {
        let order = [Red, Blue, Green];
        assert_eq!(next_in_order(&order, &order, Red), Some(Blue));
        assert_eq!(next_in_order(&order, &order, Green), None);
    }

    #[test]
    fn test_next_skips_dropped_current() {
        let seating = [Red, Blue, Green, Yellow];
        let order = [Red, Green, Yellow];

        // Blue was eliminated during its own turn.
        assert_eq!(next_in_order(&order, &seating, Blue), Some(Green));
        assert_eq!(next_cyclic(&[Red, Green], &seating, Yellow), Some(Red));
    }

    #[test]
    fn test_next_cyclic_wraps() {
        let order = [Red, Blue, Green];
        assert_eq!(next_cyclic(&order, &order, Green), Some(Red));
        assert_eq!(next_cyclic(&[Red], &order, Red), Some(Red));
        assert_eq!(next_cyclic(&[], &order, Red), None);
    }

    fn seating_strategy() -> impl Strategy<Value = Vec<PlayerColor>> {
        (2usize..=6).prop_flat_map(|n| Just(PlayerColor::ALL[..n].to_vec()).prop_shuffle())
    }

    proptest! {
        #[test]
        fn cyclic_visits_everyone_once(order in seating_strategy(), start in 0usize..6) {
            let start = order[start % order.len()];
            let mut seen = vec![start];
            let mut current = start;
            for _ in 1..order.len() {
                current = next_cyclic(&order, &order, current).unwrap();
                prop_assert!(!seen.contains(&current));
                seen.push(current);
            }
            prop_assert_eq!(next_cyclic(&order, &order, current), Some(start));
        }

        #[test]
        fn in_order_terminates(order in seating_strategy()) {
            let mut current = order[0];
            let mut steps = 1;
            while let Some(next) = next_in_order(&order, &order, current) {
                current = next;
                steps += 1;
                prop_assert!(steps <= order.len());
            }
            prop_assert_eq!(steps, order.len());
        }
    }
}
