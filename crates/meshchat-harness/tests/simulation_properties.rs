//! Property tests: random user scripts and radio behavior through the full
//! runtime. The invariant registry runs on every render, so any violation
//! surfaces as a runtime error.

use meshchat_app::{App, Driver, Runtime};
use meshchat_core::{ConnectionProfile, ConnectionState, DeliveryState};
use meshchat_harness::{
    InvariantRegistry, SessionSnapshot, SimDriver, SimRadio, SimRadioConfig,
};
use proptest::prelude::*;

#[derive(Debug, Clone)]
enum Step {
    Line(String),
    Tick,
    DropLink,
}

fn line() -> impl Strategy<Value = String> {
    prop_oneof![
        Just("connect".to_string()),
        Just("disconnect".to_string()),
        Just("advert".to_string()),
        "#[a-c]".prop_map(|channel| format!("join {channel}")),
        ("#[a-c]|alice|bob|zed", "[a-z]{1,8}").prop_map(|(to, body)| format!("{to} {body}")),
        "[a-z ]{0,6}",
    ]
}

fn step() -> impl Strategy<Value = Step> {
    prop_oneof![
        4 => line().prop_map(Step::Line),
        3 => Just(Step::Tick),
        1 => Just(Step::DropLink),
    ]
}

fn config() -> impl Strategy<Value = SimRadioConfig> {
    (any::<u64>(), 0.0..=1.0f64, 0.0..=1.0f64, prop::bool::weighted(0.1)).prop_map(
        |(seed, failure_rate, chatter_rate, refuse_connect)| SimRadioConfig {
            seed,
            refuse_connect,
            failure_rate,
            chatter_rate,
            ..Default::default()
        },
    )
}

fn simulate(config: SimRadioConfig, steps: &[Step]) -> Result<App, String> {
    let driver = SimDriver::new(SimRadio::new(config)).with_invariants(InvariantRegistry::standard());
    let mut runtime = Runtime::new(driver.clone(), App::new(ConnectionProfile::new("node", "/dev/sim")));

    let rt = tokio::runtime::Builder::new_current_thread().build().map_err(|e| e.to_string())?;
    rt.block_on(async {
        runtime.run().await.map_err(|e| e.to_string())?;
        let mut source = driver.clone();
        for step in steps {
            match step {
                Step::Line(line) => driver.inject_line(line),
                Step::Tick => driver.inject_tick(),
                Step::DropLink => {
                    driver.drop_link("fuzzed");
                },
            }
            while let Some(event) = source.poll_event().await.map_err(|e| e.to_string())? {
                runtime.handle_event(event).await.map_err(|e| e.to_string())?;
            }
        }
        Ok::<_, String>(())
    })?;

    let final_snapshot = driver.snapshot_from_app(runtime.app());
    InvariantRegistry::standard()
        .check_all(&final_snapshot)
        .map_err(|violations| format!("{violations:?}"))?;
    Ok(runtime.into_parts().1)
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn invariants_hold_for_random_scripts(
        config in config(),
        steps in prop::collection::vec(step(), 0..40),
    ) {
        let app = simulate(config, &steps).map_err(TestCaseError::fail)?;

        let snapshot = SessionSnapshot::from_app(&app);
        prop_assert_eq!(snapshot.conversations.len(), app.session().store().len());
    }

    #[test]
    fn nothing_pending_once_disconnected(
        seed in any::<u64>(),
        steps in prop::collection::vec(step(), 0..40),
    ) {
        let mut steps = steps;
        steps.push(Step::Line("disconnect".into()));
        let config = SimRadioConfig { seed, chatter_rate: 0.3, ..Default::default() };
        let app = simulate(config, &steps).map_err(TestCaseError::fail)?;

        prop_assert_eq!(app.connection_state(), ConnectionState::Disconnected);
        prop_assert!(app
            .session()
            .store()
            .unified_view(None)
            .all(|m| m.delivery != DeliveryState::Pending));
    }
}
