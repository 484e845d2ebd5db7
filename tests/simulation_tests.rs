#[cfg(test)]
mod tests {
    use std::ops::ControlFlow;

    use approx::assert_relative_eq;
    use depeg_engine::bank_run;
    use depeg_engine::liquidity::Depth;
    use depeg_engine::oracle::HISTORY_CAPACITY;
    use depeg_engine::queue::QUEUE_DUST;
    use depeg_engine::{scenarios, Params, PresetBuilder, Session, Simulation, State};

    fn session(preset: &depeg_engine::ScenarioPreset, params: Params, seed: u64) -> Session {
        Session::new(preset, params, seed).expect("test: session builds")
    }

    fn same_economy(a: &State, b: &State) -> bool {
        a.stable_price == b.stable_price
            && a.volatile_price == b.volatile_price
            && a.stable_supply == b.stable_supply
            && a.volatile_supply == b.volatile_supply
            && a.pool == b.pool
            && a.reserve_usd == b.reserve_usd
            && a.pending_volatile_queue == b.pending_volatile_queue
    }

    // ========== Test Suite A: Invariants ==========

    #[test]
    fn test_invariants_hold_through_noisy_collapse() {
        for seed in 0..5 {
            let mut s = session(&scenarios::terra_may_2022(), Params::default(), seed);
            for _ in 0..600 {
                s.step();
                if let Err(msg) = s.state().check_invariants() {
                    panic!("seed {} tick {}: {}", seed, s.state().tick, msg);
                }
            }
        }
    }

    #[test]
    fn test_reserve_never_increases() {
        let mut s = session(&scenarios::terra_may_2022(), Params::default(), 42);
        let mut last = s.state().reserve_usd;
        for _ in 0..300 {
            let m = s.step();
            assert!(m.reserve_usd <= last, "reserve grew at tick {}", m.tick);
            assert!(m.reserve_spent >= 0.0);
            last = m.reserve_usd;
        }
        assert!(last < s.state().reserve_usd_initial, "reserve was never spent");
    }

    #[test]
    fn test_history_stays_bounded() {
        let mut s = session(&scenarios::calm_peg(), Params::default(), 1);
        for _ in 0..(HISTORY_CAPACITY + 200) {
            s.step();
        }
        assert_eq!(s.state().price_history.len(), HISTORY_CAPACITY);
        assert_eq!(s.state().price_history.latest(), Some(s.state().volatile_price));
    }

    // ========== Test Suite B: Determinism ==========

    #[test]
    fn test_same_seed_same_trajectory() {
        for params in [Params::default(), Params::without_noise()] {
            let mut a = session(&scenarios::terra_may_2022(), params.clone(), 7);
            let mut b = session(&scenarios::terra_may_2022(), params, 7);
            for _ in 0..250 {
                assert_eq!(a.step(), b.step());
            }
            assert_eq!(a.state(), b.state());
        }
    }

    #[test]
    fn test_different_seeds_diverge_with_noise() {
        let mut a = session(&scenarios::terra_may_2022(), Params::default(), 1);
        let mut b = session(&scenarios::terra_may_2022(), Params::default(), 2);
        a.run(10, |_| ControlFlow::Continue(()));
        b.run(10, |_| ControlFlow::Continue(()));
        assert_ne!(a.state().stable_price, b.state().stable_price);
    }

    #[test]
    fn test_independent_sessions_across_threads() {
        let serial = {
            let mut s = session(&scenarios::terra_may_2022(), Params::default(), 99);
            s.run(150, |_| ControlFlow::Continue(()))
        };

        let handles: Vec<_> = (0..4)
            .map(|_| {
                std::thread::spawn(|| {
                    let mut s = session(&scenarios::terra_may_2022(), Params::default(), 99);
                    s.run(150, |_| ControlFlow::Continue(()))
                })
            })
            .collect();

        for h in handles {
            let trajectory = h.join().expect("test: thread completes");
            assert_eq!(trajectory, serial);
        }
    }

    // ========== Test Suite C: Scenario Behavior ==========

    #[test]
    fn test_calm_peg_is_a_fixed_point() {
        let mut s = session(&scenarios::calm_peg(), Params::without_noise(), 0);
        let initial = s.state().clone();
        for _ in 0..100 {
            let m = s.step();
            assert_eq!(m.stable_minted + m.stable_burned + m.volatile_minted + m.volatile_burned, 0.0);
            assert_eq!(m.reserve_spent, 0.0);
        }
        assert!(same_economy(s.state(), &initial));
        assert_eq!(s.state().tick, 100);
    }

    #[test]
    fn test_single_shock_is_quiet_until_tick_20() {
        let mut s = session(&scenarios::single_shock(), Params::without_noise(), 0);
        let initial = s.state().clone();
        for _ in 0..19 {
            s.step();
        }
        assert_eq!(s.state().tick, 19);
        assert!(same_economy(s.state(), &initial), "state moved before the shock");

        let params = s.state().params.clone();
        let m = s.step();
        assert_eq!(m.tick, 20);
        assert_eq!(m.events_fired, 1);

        // Events land after arbitrage and the reserve, before the drain: the
        // shock's impact is the only price move on this tick.
        let depth = Depth::compute(&params, 20, 1.0);
        assert_eq!(m.stable_price, params.stable_curve().apply(1.0, -2.5e8, depth.stable_usd));
        assert_eq!(m.bank_run_sell_usd, 0.0);
        assert_eq!(m.stable_burned, 0.0);
        assert_eq!(m.volatile_minted, 0.0);
        assert_eq!(m.reserve_spent, 0.0);
        assert!(m.pool_drain_fraction > 0.0);

        // The tick after the shock: the bank run moves the price first, and
        // arbitrage redeems against the price it left behind.
        let before = s.state().clone();
        let next = s.step();
        let depth = Depth::compute(&params, 21, before.stable_price);
        let (after_run, sold) = bank_run::apply(
            &params,
            &params.stable_curve(),
            21,
            before.stable_price,
            before.stable_supply,
            depth.stable_usd,
        );
        assert!(sold > 0.0);
        assert_eq!(next.bank_run_sell_usd, sold);
        let supply = before.stable_supply;
        let redeem = (params.redeem_alpha * (1.0 - after_run) * supply)
            .clamp(0.0, params.max_redeem_fraction * supply);
        assert_relative_eq!(next.stable_burned, redeem, max_relative = 1e-12);
        assert!(next.volatile_minted > 0.0);
        assert!(next.pending_volatile_queue > 0.0);
    }

    #[test]
    fn test_collapse_mints_volatile_and_spends_reserve() {
        let mut s = session(&scenarios::terra_may_2022(), Params::without_noise(), 0);
        let initial = s.state().clone();
        let trajectory = s.run(200, |_| ControlFlow::Continue(()));
        assert_eq!(trajectory.len(), 200);

        let min_price = trajectory.iter().map(|m| m.stable_price).fold(f64::INFINITY, f64::min);
        assert!(min_price < 1.0);
        assert!(s.state().volatile_supply > initial.volatile_supply);
        assert!(s.state().stable_supply < initial.stable_supply);
        assert!(s.state().reserve_usd < initial.reserve_usd);
        assert!(trajectory.iter().any(|m| m.pool_drain_fraction > 0.0));
        assert!(s.state().pool.k_relative() < 1.0);
    }

    #[test]
    fn test_queue_drains_geometrically_without_minting() {
        let mut state = PresetBuilder::new()
            .pool(800_000_000.0, 10_000_000.0)
            .build(Params::without_noise())
            .expect("test: preset builds");
        state.pending_volatile_queue = 1_000_000.0;
        let mut s = Session::from_state(state, 0).expect("test: state is valid");

        let mut expected = 1_000_000.0;
        let mut ticks = 0;
        while s.state().pending_volatile_queue > 0.0 {
            let m = s.step();
            assert_eq!(m.volatile_minted, 0.0);
            expected *= 0.75;
            if expected < QUEUE_DUST {
                assert_eq!(m.pending_volatile_queue, 0.0);
            } else {
                assert_relative_eq!(m.pending_volatile_queue, expected, max_relative = 1e-9);
            }
            ticks += 1;
            assert!(ticks < 200, "queue never emptied");
        }
        assert!(s.state().volatile_price < 80.0);
    }

    // ========== Test Suite D: Run Control ==========

    #[test]
    fn test_observer_can_stop_and_resume() {
        let mut s = session(&scenarios::single_shock(), Params::without_noise(), 0);
        let trajectory = s.run(500, |m| {
            if m.stable_price < 1.0 {
                ControlFlow::Break(())
            } else {
                ControlFlow::Continue(())
            }
        });
        assert_eq!(trajectory.last().map(|m| m.tick), Some(20));
        assert_eq!(s.state().tick, 20);
        assert!(s.state().check_invariants().is_ok());

        let resumed = s.run(5, |_| ControlFlow::Continue(()));
        assert_eq!(resumed.first().map(|m| m.tick), Some(21));
        assert_eq!(s.state().tick, 25);
    }

    #[test]
    fn test_run_batch_and_reset() {
        let mut sim = Simulation::try_new(scenarios::terra_may_2022(), Params::default(), 5)
            .expect("test: simulation builds");
        sim.run_batch(40);
        assert_eq!(sim.session().state().tick, 40);
        let after_batch = sim.session().state().clone();

        sim.reset_core().expect("test: reset");
        assert_eq!(sim.session().state().tick, 0);
        sim.run_batch(40);
        assert_eq!(sim.session().state(), &after_batch);
    }

    #[test]
    fn test_latest_metrics_keep_tick_activity() {
        let mut sim = Simulation::try_new(scenarios::single_shock(), Params::without_noise(), 0)
            .expect("test: simulation builds");
        assert_eq!(sim.last_metrics().tick, 0);
        sim.run_batch(21);
        let last = sim.last_metrics().clone();
        assert_eq!(last.tick, 21);
        assert!(last.bank_run_sell_usd > 0.0);
        assert!(last.reserve_spent > 0.0);
        assert!(last.depth_stable_usd > 0.0);
        assert_eq!(last.stable_price, sim.session().state().stable_price);
        assert_eq!(sim.session().state().snapshot().reserve_spent, 0.0);

        sim.reset_core().expect("test: reset");
        assert_eq!(sim.last_metrics().tick, 0);
        assert_eq!(sim.last_metrics().reserve_spent, 0.0);
    }

    #[test]
    fn test_overrides_reach_the_engine() {
        let params = Params::from_json_overrides(r#"{"reserve_spend_per_tick": 0.0}"#)
            .expect("test: overrides parse");
        let mut s = session(&scenarios::single_shock(), params, 3);
        s.run(60, |_| ControlFlow::Continue(()));
        assert_eq!(s.state().reserve_usd, s.state().reserve_usd_initial);
    }

    #[test]
    fn test_metrics_serialize_as_named_fields() {
        let mut s = session(&scenarios::calm_peg(), Params::default(), 0);
        let json = serde_json::to_value(s.step()).expect("test: metrics serialize");
        for key in ["tick", "stable_price", "volatile_price", "pool_k_relative", "reserve_usd", "pending_volatile_queue"] {
            assert!(json.get(key).is_some(), "missing {}", key);
        }
    }
}
