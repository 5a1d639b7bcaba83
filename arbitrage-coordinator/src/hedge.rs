//! Hedge Rebalancer: keeps the hedge leg's size equal to the combined
//! source + dest + in-flight-transfer exposure.

use arb_common::Qty;

/// `(source_qty + dest_qty + in_flight_base_qty) - hedge_qty`. Positive means
/// the hedge is under-sized relative to spot/futures exposure (sell more
/// hedge to bring it up); negative means it is over-sized (buy back).
#[must_use]
pub fn hedge_delta(combined_qty: Qty, in_flight_base_qty: Qty, hedge_qty: Qty) -> Qty {
    combined_qty.add(in_flight_base_qty).sub(hedge_qty)
}

/// The correction the hedge leg should place this cycle.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum HedgeAction {
    /// Sell `Qty` of hedge exposure.
    Sell(Qty),
    /// Buy `Qty` of hedge exposure.
    Buy(Qty),
}

/// Translate a raw delta into an action, or `None` if it is within `min_qty`
/// of balanced and not worth acting on.
#[must_use]
pub fn hedge_correction(delta: Qty, min_qty: Qty) -> Option<HedgeAction> {
    if delta.abs().as_i64() < min_qty.as_i64() {
        return None;
    }
    if delta.is_positive() {
        Some(HedgeAction::Sell(delta.abs()))
    } else {
        Some(HedgeAction::Buy(delta.abs()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn delta_sums_source_dest_and_in_flight_against_hedge() {
        let delta = hedge_delta(Qty::new(1.5), Qty::new(0.5), Qty::new(1.0));
        assert_eq!(delta, Qty::new(1.0));
    }

    #[test]
    fn correction_below_min_qty_is_none() {
        assert_eq!(hedge_correction(Qty::new(0.001), Qty::new(0.01)), None);
    }

    #[test]
    fn positive_delta_sells_the_hedge() {
        assert_eq!(
            hedge_correction(Qty::new(0.5), Qty::new(0.01)),
            Some(HedgeAction::Sell(Qty::new(0.5)))
        );
    }

    #[test]
    fn negative_delta_buys_the_hedge() {
        assert_eq!(
            hedge_correction(Qty::new(-0.5), Qty::new(0.01)),
            Some(HedgeAction::Buy(Qty::new(0.5)))
        );
    }

    proptest::proptest! {
        /// A correction's sign always opposes the delta that caused it: a
        /// positive imbalance sells the hedge, a negative one buys it, and
        /// the corrected quantity always exactly cancels the imbalance.
        #[test]
        fn correction_sign_always_opposes_delta(raw_delta in -1_000_000i64..1_000_000i64, min_qty in 0i64..1000i64) {
            let delta = Qty::from_i64(raw_delta);
            let min_qty = Qty::from_i64(min_qty);
            match hedge_correction(delta, min_qty) {
                None => prop_assert!(delta.abs().as_i64() < min_qty.as_i64()),
                Some(HedgeAction::Sell(qty)) => {
                    prop_assert!(delta.is_positive());
                    prop_assert_eq!(qty, delta.abs());
                }
                Some(HedgeAction::Buy(qty)) => {
                    prop_assert!(!delta.is_positive());
                    prop_assert_eq!(qty, delta.abs());
                }
            }
        }
    }
}
