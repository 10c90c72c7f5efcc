//! End-to-end scenarios for the full stack: build, settle, funding,
//! price moves, exits, liquidation and the periodic sweeps.

use torsion_core::EngineError;
use torsion_integration::*;

#[test]
fn scenario_leveraged_build_settles_and_takes_profit() {
    let mut h = Harness::new(HarnessConfig::default());

    // 1 token of collateral at 10x: 10 shares, 9 debt, 1 cost
    let id = h.build(ALICE, WAD, 10, true);
    let pos = h.manager.position(id).unwrap();
    assert_eq!(pos.oi_shares, 10 * WAD);
    assert_eq!(pos.debt, 9 * WAD);
    assert_eq!(pos.cost, WAD);

    h.update(); // settle at entry price 1.0
    assert_eq!(h.market.oi(), (10 * WAD, 0));

    // reference moves to 1.5, both TWAP windows catch up
    h.feed.set_price(1100, 3 * WAD / 2);
    h.advance(800);

    // value = 10 * 1.5 - 9 = 6
    assert_eq!(h.manager.value(&h.market, id).unwrap(), 6 * WAD);

    let supply_before = h.token.total_supply();
    let payout = h.unwind(ALICE, id, 10 * WAD);
    assert_eq!(payout, 6 * WAD);

    // profit of 5 over the 1 cost was minted
    assert_eq!(h.token.total_supply(), supply_before + 5 * WAD);
    assert_eq!(h.token.balance(ALICE), 10_000 * WAD + 5 * WAD);
    assert_eq!(h.market.oi(), (0, 0));
}

#[test]
fn scenario_losses_burn_supply() {
    let mut h = Harness::new(HarnessConfig::default());
    let id = h.build(ALICE, WAD, 5, true);
    h.update();

    h.feed.set_price(1100, 9 * WAD / 10);
    h.advance(800);

    // value = 5 * 0.9 - 4 = 0.5; the other 0.5 of cost burns
    let supply_before = h.token.total_supply();
    let payout = h.unwind(ALICE, id, 5 * WAD);
    assert_eq!(payout, WAD / 2);
    assert_eq!(supply_before - h.token.total_supply(), WAD / 2);
    assert_eq!(h.token.balance(ALICE), 10_000 * WAD - WAD / 2);
}

#[test]
fn scenario_pooled_position_pays_proportionally() {
    let mut h = Harness::new(HarnessConfig::default());

    let id_a = h.build(ALICE, WAD, 10, true);
    let id_b = h.build(BOB, 3 * WAD, 10, true);
    assert_eq!(id_a, id_b);

    h.update();
    h.feed.set_price(1100, 2 * WAD);
    h.advance(800);

    // pool: 40 shares, 36 debt; value = 40 * 2 - 36 = 44
    let payout_a = h.unwind(ALICE, id_a, 10 * WAD);
    let payout_b = h.unwind(BOB, id_b, 30 * WAD);
    assert_eq!(payout_a, 11 * WAD);
    assert_eq!(payout_b, 33 * WAD);
    assert_eq!(h.market.oi(), (0, 0));
}

#[test]
fn scenario_share_transfer_carries_the_claim() {
    let mut h = Harness::new(HarnessConfig::default());
    let id = h.build(ALICE, WAD, 10, true);
    h.update();

    h.manager
        .transfer_shares(&h.market, ALICE, CAROL, id, 10 * WAD)
        .unwrap();

    h.feed.set_price(1100, 2 * WAD);
    h.advance(800);

    // Carol owns the whole payoff now
    let payout = h.unwind(CAROL, id, 10 * WAD);
    assert_eq!(payout, 11 * WAD);
    assert_eq!(
        h.manager
            .unwind(
                &h.registry,
                &mut h.market,
                &mut h.token,
                ALICE,
                id,
                WAD,
                h.now
            )
            .unwrap_err(),
        EngineError::InsufficientShares
    );
}

#[test]
fn scenario_funding_drains_the_crowded_side() {
    let mut h = Harness::new(HarnessConfig {
        k: WAD / 100,
        ..HarnessConfig::default()
    });

    h.build(ALICE, 10 * WAD, 10, true); // 100 long
    h.build(BOB, 4 * WAD, 10, false); // 40 short
    h.update();

    let (long0, short0) = h.market.oi();
    h.advance(500); // five compounding periods
    let (long1, short1) = h.market.oi();

    assert!(long1 < long0);
    assert!(short1 > short0);
    assert!((long0 + short0).abs_diff(long1 + short1) <= 1);

    // imbalance decayed by (1 - 2k)^5
    let imbalance = (long1 - short1) as f64 / WAD as f64;
    let expected = 60.0 * (0.98f64).powi(5);
    assert!((imbalance - expected).abs() < 1e-6);
}

#[test]
fn scenario_liquidation_rewards_caller_and_sweeps_pot() {
    let mut h = Harness::new(HarnessConfig::default());
    let id = h.build(ALICE, WAD, 10, true);
    h.update();

    h.feed.set_price(1100, 92 * WAD / 100);
    h.advance(800);

    // value 0.2 below maintenance 0.5
    let reward = h
        .manager
        .liquidate(
            &h.registry,
            &mut h.market,
            &mut h.token,
            CAROL,
            id,
            h.now,
        )
        .unwrap();
    assert_eq!(reward, WAD / 10);
    assert_eq!(h.token.balance(CAROL), 10_000 * WAD + WAD / 10);
    assert_eq!(h.manager.liquidations(), WAD / 10);

    // next settlement sweeps the pot: half burned, half to fee_to
    let supply_before = h.token.total_supply();
    h.advance(100);
    assert_eq!(h.manager.liquidations(), 0);
    assert_eq!(h.token.balance(FEE_TO), WAD / 20);
    assert_eq!(supply_before - h.token.total_supply(), WAD / 20);
}

#[test]
fn scenario_trade_fees_accrue_then_sweep() {
    let mut h = Harness::new(HarnessConfig {
        fee_rate: WAD / 100,
        ..HarnessConfig::default()
    });

    h.build(ALICE, WAD, 10, true); // fee 1% of 10 notional
    h.build(BOB, WAD, 10, false);
    assert_eq!(h.manager.fees(), 2 * WAD / 10);

    let supply_before = h.token.total_supply();
    h.update();

    assert_eq!(h.manager.fees(), 0);
    assert_eq!(h.token.balance(FEE_TO), WAD / 10);
    assert_eq!(supply_before - h.token.total_supply(), WAD / 10);
}

#[test]
fn scenario_impact_fee_rises_with_one_sided_pressure() {
    let mut h = Harness::new(HarnessConfig {
        lambda: WAD / 2,
        static_cap: 1_000 * WAD,
        ..HarnessConfig::default()
    });

    h.advance(100);
    let supply0 = h.token.total_supply();
    let id_first = h.build(ALICE, 10 * WAD, 10, true);
    let burned_first = supply0 - h.token.total_supply();

    h.advance(100);
    let supply1 = h.token.total_supply();
    let id_second = h.build(BOB, 10 * WAD, 10, true);
    let burned_second = supply1 - h.token.total_supply();

    // second build hits the pressure the first one left behind
    assert!(burned_second > burned_first);
    assert!(burned_first > 0);

    // and the impact came out of adjusted collateral, so fewer shares
    let first = h.manager.shares_of(id_first, ALICE);
    let second = h.manager.shares_of(id_second, BOB);
    assert!(second < first);

    // pressure decays: a build after the window pays like the first
    h.advance(700);
    let supply2 = h.token.total_supply();
    h.build(CAROL, 10 * WAD, 10, true);
    let burned_third = supply2 - h.token.total_supply();
    assert!(burned_third <= burned_first);
}

#[test]
fn scenario_dynamic_cap_fades_after_heavy_minting() {
    let mut h = Harness::new(HarnessConfig {
        static_cap: 2_000 * WAD,
        ..HarnessConfig::default()
    });

    // expected tolerance is static_cap / 4 = 500 minted
    let id = h.build(ALICE, 100 * WAD, 10, true);
    h.update();

    // a 3x move mints 2000 - cost on exit, far past expected
    h.feed.set_price(1100, 3 * WAD);
    h.advance(800);
    h.unwind(ALICE, id, 1_000 * WAD);

    let faded = h.market.oi_cap(h.now);
    assert!(faded < 2_000 * WAD);

    // the cap recovers once the minting ages out of both windows
    h.advance(4_000);
    assert_eq!(h.market.oi_cap(h.now), 2_000 * WAD);
}

#[test]
fn scenario_cap_breach_rejects_build_entirely() {
    let mut h = Harness::new(HarnessConfig {
        static_cap: 50 * WAD,
        ..HarnessConfig::default()
    });

    let err = h.manager.build(
        &h.registry,
        &mut h.market,
        &mut h.token,
        ALICE,
        10 * WAD,
        10,
        true,
        0,
        h.now,
    );
    assert_eq!(err, Err(EngineError::OiCapExceeded));
    assert_eq!(h.market.queued_oi(), (0, 0));
    assert_eq!(h.token.balance(ALICE), 10_000 * WAD);

    // the short side has its own headroom
    h.build(BOB, 5 * WAD, 10, false);
    assert_eq!(h.market.queued_oi(), (0, 50 * WAD));
}

#[test]
fn scenario_queued_exit_before_settlement_is_flat() {
    let mut h = Harness::new(HarnessConfig::default());
    let id = h.build(ALICE, WAD, 10, true);

    // price moves while the position is still queued
    h.feed.set_price(1001, 5 * WAD);

    let payout = h.unwind(ALICE, id, 10 * WAD);
    assert_eq!(payout, WAD);
    assert_eq!(h.token.balance(ALICE), 10_000 * WAD);
    assert_eq!(h.market.queued_oi(), (0, 0));
}

#[test]
fn scenario_supply_matches_balances_throughout() {
    let mut h = Harness::new(HarnessConfig {
        fee_rate: WAD / 200,
        lambda: WAD / 4,
        k: WAD / 200,
        ..HarnessConfig::default()
    });

    let all = [ALICE, BOB, CAROL, FEE_TO, MANAGER];
    let check = |h: &Harness| {
        let sum: u128 = all.iter().map(|&a| h.token.balance(a)).sum();
        assert_eq!(sum, h.token.total_supply());
    };

    let id_a = h.build(ALICE, 2 * WAD, 10, true);
    let id_b = h.build(BOB, WAD, 20, false);
    check(&h);

    h.update();
    check(&h);

    h.feed.set_price(1100, 11 * WAD / 10);
    h.advance(800);
    check(&h);

    h.unwind(ALICE, id_a, h.manager.shares_of(id_a, ALICE));
    check(&h);
    h.unwind(BOB, id_b, h.manager.shares_of(id_b, BOB));
    check(&h);

    h.advance(100); // sweeps
    check(&h);
}
