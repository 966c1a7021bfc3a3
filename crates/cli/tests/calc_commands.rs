use assert_cmd::Command;
use serde_json::Value;
use std::fs;
use tempfile::tempdir;

#[allow(deprecated)]
fn site() -> Command {
    let mut cmd = Command::cargo_bin("exchange-site").expect("binary");
    cmd.env_remove("EXCHANGE_CALCULATOR_PROFILE")
        .env_remove("EXCHANGE_GATE_PASSWORD")
        .env_remove("EXCHANGE_GATE_COOKIE")
        .env("EXCHANGE_GATE_SECRET", "cli-test-secret");
    cmd
}

fn run_json(cmd: &mut Command) -> Value {
    let output = cmd.output().expect("command run");
    assert!(
        output.status.success(),
        "stdout: {}\nstderr: {}",
        String::from_utf8_lossy(&output.stdout),
        String::from_utf8_lossy(&output.stderr)
    );
    serde_json::from_slice(&output.stdout).expect("valid json")
}

#[test]
fn calc_savings_prints_reference_estimate() {
    let body = run_json(site().args([
        "calc",
        "savings",
        "--budget",
        "150000",
        "--team-size",
        "10to20",
    ]));
    assert_eq!(body["bracket_id"], "100to250k");
    assert_eq!(body["rate"], 0.45);
    assert_eq!(body["annual_savings_usd"], 67_500.0);
    assert_eq!(body["monthly_savings_usd"], 5_625.0);
}

#[test]
fn calc_cost_compares_spend() {
    let body = run_json(site().args([
        "calc",
        "cost",
        "--budget",
        "40000",
        "--team-size",
        "under10",
    ]));
    assert_eq!(body["bracket_id"], "under50k");
    assert_eq!(body["current_annual_cost_usd"], 40_000.0);
    assert_eq!(body["exchange_annual_cost_usd"], 30_000.0);
}

#[test]
fn calc_earnings_matches_provider_scenario() {
    let body = run_json(site().args([
        "calc",
        "earnings",
        "--phase",
        "strategy",
        "--phase",
        "media",
        "--clients",
        "micro=500",
        "--clients",
        "small=50",
        "--clients",
        "medium=5",
    ]));
    assert_eq!(body["variant"], "providers");
    assert_eq!(body["currency"], "USD");
    assert_eq!(body["expected_monthly_queries"], 11_000.0);
    assert!((body["phase_factor"].as_f64().unwrap() - 0.55).abs() < 1e-9);
    assert!((body["gross_payout"].as_f64().unwrap() - 4_400.0).abs() < 1e-6);
    assert!((body["estimated_monthly"].as_f64().unwrap() - 847.0).abs() < 1e-6);
}

#[test]
fn calc_earnings_rejects_malformed_client_counts() {
    site()
        .args(["calc", "earnings", "--clients", "micro"])
        .assert()
        .failure()
        .stderr(predicates::str::contains("expected <tier>=<count>"));
}

const FLAT_PROFILE: &str = r#"
name = "flat"

[savings]
rates = [[0.25]]

[[savings.brackets]]
id = "all"
label = "Any budget"
min = 0.0

[[savings.team_sizes]]
id = "any"
label = "Any team"

[[phases]]
id = "all"
label = "Everything"
weight = 1.0

[[tiers]]
id = "micro"
label = "Micro"
active_users_per_client = 1.0
avg_queries_per_user_per_month = 1.0
slider = { min = 0, max = 10, step = 1 }

[[earnings]]
id = "flat"
currency = "USD"
payout_per_query = 0.5
useful_data_factor = 1.0
"#;

#[test]
fn custom_profile_is_loaded_from_toml() {
    let temp = tempdir().unwrap();
    let path = temp.path().join("flat.toml");
    fs::write(&path, FLAT_PROFILE).unwrap();

    let body = run_json(
        site()
            .env("EXCHANGE_CALCULATOR_PROFILE", &path)
            .args(["calc", "savings", "--budget", "1000", "--team-size", "any"]),
    );
    assert_eq!(body["bracket_id"], "all");
    assert_eq!(body["annual_savings_usd"], 250.0);
}

#[test]
fn invalid_profile_fails_with_context() {
    let temp = tempdir().unwrap();
    let path = temp.path().join("broken.json");
    fs::write(&path, r#"{"name": "broken", "oops": true}"#).unwrap();

    site()
        .args(["--profile"])
        .arg(&path)
        .args(["calc", "savings", "--budget", "1000", "--team-size", "under10"])
        .assert()
        .failure()
        .stderr(predicates::str::contains("Failed to load calculator profile"));
}

#[test]
fn issued_token_verifies() {
    let issued = run_json(site().args(["token", "issue", "--ttl-seconds", "60"]));
    let token = issued["token"].as_str().unwrap().to_string();
    assert!(issued["set_cookie"]
        .as_str()
        .unwrap()
        .starts_with("xg_gate="));

    let report = run_json(site().args(["token", "verify", &token]));
    assert_eq!(report["signature_valid"], true);
    assert_eq!(report["live"], true);
    assert_eq!(report["exp"], issued["exp"]);

    let rotated = run_json(
        site()
            .env("EXCHANGE_GATE_SECRET", "another-secret")
            .args(["token", "verify", &token]),
    );
    assert_eq!(rotated["signature_valid"], false);
    assert_eq!(rotated["live"], false);
}

#[test]
fn token_issue_without_secret_fails_closed() {
    site()
        .env_remove("EXCHANGE_GATE_SECRET")
        .args(["token", "issue"])
        .assert()
        .failure()
        .stderr(predicates::str::contains("EXCHANGE_GATE_SECRET"));
}
