//! End-to-end replay of the bundled demo scenario

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use simulator::{Engines, Report, Scenario};
use std::fs;
use std::str::FromStr;
use tempfile::tempdir;
use types::{account, ErrorCategory, U256};

const CONFIG: &str = r#"
[roles]
owner = "0x0000000000000000000000000000000000000001"
admin = "0x0000000000000000000000000000000000000001"
treasury = "0x000000000000000000000000000000000000000a"
operator = "0x0000000000000000000000000000000000000001"

[vault]
performance_fee = 200
call_fee = 25
withdraw_fee = 10
withdraw_fee_period = 259200

[pools.usd3]
coin_decimals = [18, 6, 6]
a = 1000
fee = 4000000
admin_fee = 5000000000

[voting]
weight_vote_delay = 864000

[[voting.gauge_types]]
name = "pools"
weight = 1
"#;

const DEMO: &str = include_str!("../../../scenarios/demo.json");

fn engines(start: u64) -> Engines {
    let dir = tempdir().unwrap();
    let path = dir.path().join("ballast.toml");
    fs::write(&path, CONFIG).unwrap();
    let config = config::load_config(Some(&path), None).unwrap();
    Engines::from_config(&config, start).unwrap()
}

fn decimal(report: &Report, field: &str) -> Decimal {
    let value = report.event.as_ref().unwrap()[field].as_str().unwrap();
    Decimal::from_str(value).unwrap()
}

#[test]
fn test_demo_scenario() {
    let scenario = Scenario::from_json(DEMO).unwrap();
    let mut engines = engines(scenario.start);
    let reports = engines.replay(&scenario.steps);
    assert_eq!(reports.len(), scenario.steps.len());

    let rejected: Vec<usize> = reports
        .iter()
        .filter(|r| !r.is_ok())
        .map(|r| r.step)
        .collect();
    assert_eq!(rejected, vec![7, 9]);

    // A committed swap reports the pool's price alongside the event
    assert!(reports[6].is_ok());
    assert!(decimal(&reports[6], "virtual_price") >= dec!(1));
    assert!(reports[6].event.as_ref().unwrap()["exchange"].is_object());

    assert_eq!(reports[7].op, "exchange");
    assert_eq!(reports[7].category, Some(ErrorCategory::SlippageGuard));
    assert_eq!(reports[9].error.as_deref(), Some("Cannot vote so often"));
    assert_eq!(reports[9].category, Some(ErrorCategory::Lifecycle));

    // Sole gauge with votes holds the full weight once the vote is active
    assert_eq!(decimal(&reports[11], "relative_weight"), dec!(1));

    // The only depositor left after the fee window
    assert!(engines.vault.total_shares().is_zero());
    assert!(engines.vault.user_info(&account(2)).shares.is_zero());
    assert!(engines.pools["usd3"].total_supply() > U256::zero());
}

#[test]
fn test_rejected_step_leaves_state_untouched() {
    let scenario = Scenario::from_json(
        r#"{
            "start": 1699488000,
            "steps": [
                { "at": 1699488000, "sender": "0x0000000000000000000000000000000000000003",
                  "op": "add_liquidity", "pool": "usd3", "amounts": ["100", "100", "100"] },
                { "at": 1699488000, "sender": "0x0000000000000000000000000000000000000003",
                  "op": "add_liquidity", "pool": "usd3", "amounts": ["100", "100"] },
                { "at": 1699488000, "sender": "0x0000000000000000000000000000000000000003",
                  "op": "add_liquidity", "pool": "usd3", "amounts": ["1", "1", "1"],
                  "min_mint": "1000" },
                { "at": 1699488000, "sender": "0x0000000000000000000000000000000000000003",
                  "op": "exchange", "pool": "nope", "i": 0, "j": 1, "dx": "1" }
            ]
        }"#,
    )
    .unwrap();
    let mut engines = engines(scenario.start);

    let first = engines.run(0, &scenario.steps[0]);
    assert!(first.is_ok());
    let supply = engines.pools["usd3"].total_supply();
    let balances = engines.pools["usd3"].balances().to_vec();

    let wrong_count = engines.run(1, &scenario.steps[1]);
    assert_eq!(wrong_count.category, None);
    assert!(wrong_count.error.unwrap().contains("expects 3 amounts"));

    let slippage = engines.run(2, &scenario.steps[2]);
    assert_eq!(slippage.category, Some(ErrorCategory::SlippageGuard));

    let unknown = engines.run(3, &scenario.steps[3]);
    assert_eq!(unknown.error.as_deref(), Some("unknown pool nope"));

    assert_eq!(engines.pools["usd3"].total_supply(), supply);
    assert_eq!(engines.pools["usd3"].balances(), balances.as_slice());
}
