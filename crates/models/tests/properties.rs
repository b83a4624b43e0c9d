//! Property tests for model invariants.
//!
//! Uses proptest to verify:
//! 1. Quantity validation: non-positive quantities never build an order
//! 2. Sentinels: no real price is ever mistaken for UNSET_DOUBLE
//! 3. Fill accounting: filled + remaining == totalQuantity after any fill
//!    sequence, oversized fills rejected without panicking
//! 4. Terminal states: Filled and Cancelled reject every transition
//! 5. Bar validation: constructed bars always satisfy low <= open, close <= high

use chrono::{Duration, TimeZone, Utc};
use proptest::prelude::*;
use rust_decimal::Decimal;
use xtrading_models::{
    Action, BarData, CommissionReport, Contract, ExecSide, Execution, Fill, Order, Sentinel,
    Status, Trade,
};

// ── Strategies ───────────────────────────────────────────────────────

/// Two-decimal price between 0.01 and 10,000.00
fn arb_price() -> impl Strategy<Value = Decimal> {
    (1_i64..1_000_000).prop_map(|cents| Decimal::new(cents, 2))
}

fn arb_action() -> impl Strategy<Value = Action> {
    prop_oneof![Just(Action::Buy), Just(Action::Sell)]
}

fn arb_status() -> impl Strategy<Value = Status> {
    prop_oneof![
        Just(Status::PendingSubmit),
        Just(Status::Submitted),
        Just(Status::PartiallyFilled),
        Just(Status::Filled),
        Just(Status::Cancelled),
        Just(Status::Inactive),
    ]
}

fn fill(n: usize, order_id: i32, shares: Decimal, price: Decimal) -> Fill {
    let exec_id = format!("exec-{n}");
    let time = Utc.with_ymd_and_hms(2024, 1, 15, 14, 30, 0).unwrap() + Duration::seconds(n as i64);
    let execution = Execution::new(exec_id.as_str(), time, ExecSide::Bought, shares, price)
        .unwrap()
        .with_order_id(order_id);
    let report = CommissionReport::new(exec_id, Decimal::ZERO, "USD").unwrap();
    Fill::new(Contract::stock("SPY"), execution, report).unwrap()
}

// ── 1. Quantity validation ───────────────────────────────────────────

proptest! {
    #[test]
    fn non_positive_quantity_rejected(qty in -1_000_000_i64..=0, action in arb_action()) {
        let qty = Decimal::new(qty, 2);
        prop_assert!(Order::market(action, qty).is_err());
        prop_assert!(Order::limit(action, qty, Decimal::ONE).is_err());
    }

    #[test]
    fn positive_quantity_accepted(qty in 1_i64..1_000_000, price in arb_price()) {
        let order = Order::limit(Action::Buy, Decimal::new(qty, 2), price).unwrap();
        prop_assert_eq!(order.lmt_price(), price);
    }
}

// ── 2. Sentinels ─────────────────────────────────────────────────────

proptest! {
    #[test]
    fn real_values_never_unset(
        mantissa in any::<i64>(),
        scale in 0_u32..=28,
        int in i32::MIN..i32::MAX,
    ) {
        prop_assert!(Decimal::new(mantissa, scale).is_set());
        prop_assert!(int.is_set());
    }
}

// ── 3. Fill accounting ───────────────────────────────────────────────

proptest! {
    /// Any sequence of fills, including overfills, keeps the quantities
    /// balanced; rejected fills leave the trade untouched.
    #[test]
    fn fills_keep_quantities_balanced(
        total in 1_i64..500,
        fills in prop::collection::vec((1_i64..200, arb_price()), 1..20),
    ) {
        let total = Decimal::from(total);
        let order = Order::market(Action::Buy, total).unwrap().with_order_id(1);
        let mut trade = Trade::new(order);

        let mut last_filled = Decimal::ZERO;
        for (n, (shares, price)) in fills.into_iter().enumerate() {
            let before = trade.clone();
            let result = trade.apply_fill(fill(n, 1, Decimal::from(shares), price));

            prop_assert_eq!(trade.filled() + trade.remaining(), total);
            prop_assert!(trade.filled() >= last_filled);
            prop_assert!(trade.remaining() >= Decimal::ZERO);
            if result.is_err() {
                prop_assert_eq!(&trade, &before);
            }
            last_filled = trade.filled();
        }

        let fill_sum: Decimal = trade.fills().iter().map(Fill::shares).sum();
        prop_assert_eq!(fill_sum, trade.filled());
        prop_assert_eq!(trade.status() == Status::Filled, trade.remaining().is_zero());
    }

    /// Fills near the decimal limit are rejected with the trade untouched
    #[test]
    fn oversized_fills_rejected(filled in 1_i64..100, gap in 0_i64..1_000) {
        let order = Order::market(Action::Buy, Decimal::from(100)).unwrap().with_order_id(1);
        let mut trade = Trade::new(order);
        trade.apply_fill(fill(0, 1, Decimal::from(filled), Decimal::ONE)).unwrap();
        let before = trade.clone();

        let shares = Decimal::MAX - Decimal::from(gap + 1);
        prop_assert!(trade.apply_fill(fill(1, 1, shares, Decimal::ONE)).is_err());
        prop_assert_eq!(&trade, &before);
    }

    /// The average fill price stays within the range of fill prices
    #[test]
    fn avg_fill_price_bounded(prices in prop::collection::vec(arb_price(), 1..10)) {
        let total = Decimal::from(prices.len() as i64);
        let order = Order::market(Action::Buy, total).unwrap().with_order_id(1);
        let mut trade = Trade::new(order);
        for (n, price) in prices.iter().enumerate() {
            trade.apply_fill(fill(n, 1, Decimal::ONE, *price)).unwrap();
        }

        let min = prices.iter().min().copied().unwrap();
        let max = prices.iter().max().copied().unwrap();
        let avg = trade.order_status().avg_fill_price;
        prop_assert!(avg >= min && avg <= max, "avg {} outside [{}, {}]", avg, min, max);
    }
}

// ── 4. Terminal states ───────────────────────────────────────────────

proptest! {
    #[test]
    fn terminal_states_reject_transitions(next in arb_status(), cancel in any::<bool>()) {
        let order = Order::market(Action::Buy, Decimal::ONE).unwrap().with_order_id(1);
        let mut trade = Trade::new(order);
        if cancel {
            trade.cancel("test").unwrap();
        } else {
            trade.apply_fill(fill(0, 1, Decimal::ONE, Decimal::TEN)).unwrap();
        }
        let log_len = trade.log().len();

        prop_assert!(trade.status().is_done());
        prop_assert!(trade.transition_status(next).is_err());
        prop_assert_eq!(trade.log().len(), log_len);
    }

    /// Every status allowed by the table is accepted when its preconditions
    /// hold
    #[test]
    fn table_matches_can_transition(from in arb_status(), to in arb_status()) {
        prop_assert_eq!(from.can_transition_to(to), from.successors().contains(&to));
        if from.is_done() {
            prop_assert!(from.successors().is_empty());
        }
    }
}

// ── 5. Bar validation ────────────────────────────────────────────────

proptest! {
    #[test]
    fn bars_respect_ohlc_ordering(
        open in arb_price(),
        high in arb_price(),
        low in arb_price(),
        close in arb_price(),
        volume in 0_i64..1_000_000,
    ) {
        let date = Utc.with_ymd_and_hms(2024, 1, 15, 0, 0, 0).unwrap();
        let result = BarData::new(date, open, high, low, close, Decimal::from(volume));
        let consistent = low <= open && low <= close && open <= high && close <= high;
        prop_assert_eq!(result.is_ok(), consistent);
        if let Ok(bar) = result {
            prop_assert!(bar.range().unwrap() >= Decimal::ZERO);
            let typical = bar.typical_price().unwrap();
            prop_assert!(typical >= low && typical <= high);
        }
    }
}
