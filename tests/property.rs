use feedbook::models::BookSide;
use feedbook::orderbook::checksum::{checksum_input, crc32_signed};
use feedbook::orderbook::{BookMessage, CHECKSUM_DEPTH, OrderBookEngine, RawLevel};
use proptest::prelude::*;

fn any_level() -> impl Strategy<Value = RawLevel> {
    // ticks of 0.5 so prices collide often
    (1u32..400, 0u64..4, -50i32..50).prop_map(|(tick, count, lots)| {
        RawLevel::new(tick as f64 * 0.5, count, lots as f64 * 0.25)
    })
}

proptest! {
    #[test]
    fn price_snapshots_mirror_each_side(
        snapshot in prop::collection::vec(any_level(), 0..60),
        updates in prop::collection::vec(any_level(), 0..300),
    ) {
        let mut engine = OrderBookEngine::new("prop");
        engine.reset_for_connection();
        engine.apply(BookMessage::Snapshot(snapshot)).unwrap();

        for update in updates {
            engine.apply(BookMessage::Update(update)).unwrap();

            let book = engine.book();
            let bids = book.prices(BookSide::Bids);
            let asks = book.prices(BookSide::Asks);
            prop_assert_eq!(bids.len(), book.len(BookSide::Bids));
            prop_assert_eq!(asks.len(), book.len(BookSide::Asks));
            prop_assert!(bids.windows(2).all(|w| w[0] > w[1]));
            prop_assert!(asks.windows(2).all(|w| w[0] < w[1]));
            prop_assert!(bids.iter().all(|p| book.get(BookSide::Bids, *p).is_some()));
            prop_assert!(asks.iter().all(|p| book.get(BookSide::Asks, *p).is_some()));
        }
    }

    #[test]
    fn checksum_is_deterministic_and_self_consistent(
        snapshot in prop::collection::vec(any_level(), 0..80),
    ) {
        let mut engine = OrderBookEngine::new("prop");
        engine.apply(BookMessage::Snapshot(snapshot)).unwrap();

        let first = checksum_input(engine.book(), CHECKSUM_DEPTH);
        let second = checksum_input(engine.book(), CHECKSUM_DEPTH);
        prop_assert_eq!(&first, &second);

        let expected = crc32_signed(&first);
        prop_assert_eq!(engine.verify_checksum(expected), Ok(expected));
        prop_assert!(engine.verify_checksum(expected.wrapping_add(1)).is_err());
    }

    #[test]
    fn upsert_then_delete_leaves_other_levels_untouched(
        snapshot in prop::collection::vec(any_level(), 1..40),
        price_tick in 1u32..400,
        lots in 1i32..50,
        bid in any::<bool>(),
    ) {
        let mut engine = OrderBookEngine::new("prop");
        engine.apply(BookMessage::Snapshot(snapshot)).unwrap();

        let price = price_tick as f64 * 0.5 + 0.25;
        let amount = if bid { lots as f64 } else { -(lots as f64) };
        let side = if bid { BookSide::Bids } else { BookSide::Asks };
        let before = engine.book().clone();

        engine.apply(BookMessage::Update(RawLevel::new(price, 2, amount))).unwrap();
        prop_assert_eq!(engine.book().get(side, price).map(|p| p.count), Some(2));

        engine.apply(BookMessage::Update(RawLevel::new(price, 0, amount.signum()))).unwrap();
        prop_assert!(engine.book().get(side, price).is_none());
        prop_assert_eq!(engine.book().prices(BookSide::Bids), before.prices(BookSide::Bids));
        prop_assert_eq!(engine.book().prices(BookSide::Asks), before.prices(BookSide::Asks));
    }
}
