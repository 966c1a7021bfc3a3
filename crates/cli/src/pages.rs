//! Minimal server-rendered HTML for the gate and the calculator pages.

use exchange_calculator::{
    CalculatorProfile, CostComparison, EarningsEstimate, EarningsInput, SavingsEstimate,
    SavingsInput,
};
use exchange_gate::LoginAttempts;
use std::fmt::Write as _;

pub(crate) const DEFAULT_BUDGET_USD: f64 = 150_000.0;
pub(crate) const DEFAULT_TEAM_SIZE: &str = "10to20";
pub(crate) const DEFAULT_PHASES: &[&str] = &["strategy", "media"];
pub(crate) const DEFAULT_CLIENT_COUNTS: &[(&str, u32)] =
    &[("micro", 500), ("small", 50), ("medium", 5)];

/// Whole currency units with thousands separators: `67500.4` → `$67,500`.
pub(crate) fn format_whole_currency(amount: f64, currency: &str) -> String {
    let amount = if amount.is_finite() { amount.round() } else { 0.0 };
    let sign = if amount < 0.0 { "-" } else { "" };
    let digits = format!("{:.0}", amount.abs());

    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (idx, ch) in digits.chars().enumerate() {
        if idx > 0 && (digits.len() - idx) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }

    match currency {
        "USD" => format!("{sign}${grouped}"),
        "EUR" => format!("{sign}€{grouped}"),
        other => format!("{sign}{grouped} {other}"),
    }
}

pub(crate) fn escape_html(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for ch in raw.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(ch),
        }
    }
    out
}

pub(crate) struct GatePage<'a> {
    pub next: &'a str,
    pub error: Option<&'a str>,
    pub attempts: LoginAttempts,
}

pub(crate) fn render_gate(page: &GatePage<'_>) -> String {
    let mut body = String::new();
    body.push_str("<h1>Private preview</h1>\n<p>Enter the access password to continue.</p>\n");
    if let Some(error) = page.error {
        let _ = writeln!(body, "<p class=\"error\" role=\"alert\">{}</p>", escape_html(error));
    }
    let _ = write!(
        body,
        "<form method=\"post\" action=\"/gate/login\">\n\
         <input type=\"password\" name=\"password\" autocomplete=\"current-password\" required autofocus>\n\
         <input type=\"hidden\" name=\"next\" value=\"{}\">\n\
         <input type=\"hidden\" name=\"attempts\" value=\"{}\">\n\
         <button type=\"submit\">Enter</button>\n</form>\n",
        escape_html(page.next),
        page.attempts.consecutive_failures()
    );
    if page.attempts.offer_assistance() {
        body.push_str(
            "<section class=\"assistance\">\n<h2>Request access</h2>\n\
             <p>Having trouble? Ask your contact at the exchange for a fresh password.</p>\n</section>\n",
        );
    }
    layout("Access", &body, false)
}

pub(crate) fn render_home(profile: &CalculatorProfile) -> String {
    let body = format!(
        "<h1>Data exchange</h1>\n\
         <p>Brands buy audience insight for less. Providers earn from the data they already have.</p>\n\
         <ul>\n<li><a href=\"/brands\">Savings for brands</a></li>\n\
         <li><a href=\"/providers\">Earnings for providers</a></li>\n</ul>\n\
         <p class=\"profile\">Calculator profile: {}</p>\n",
        escape_html(&profile.name)
    );
    layout("Data exchange", &body, true)
}

pub(crate) fn render_brands(
    profile: &CalculatorProfile,
    input: &SavingsInput,
    savings: &SavingsEstimate,
    cost: &CostComparison,
) -> String {
    let mut options = String::new();
    for bucket in &profile.savings.team_sizes {
        let selected = if bucket.id == input.team_size { " selected" } else { "" };
        let _ = writeln!(
            options,
            "<option value=\"{}\"{selected}>{}</option>",
            escape_html(&bucket.id),
            escape_html(&bucket.label)
        );
    }

    let body = format!(
        "<h1>What brands save</h1>\n\
         <form method=\"get\" action=\"/brands\">\n\
         <label>Annual research budget (USD) <input type=\"number\" name=\"budget\" min=\"0\" step=\"1000\" value=\"{budget:.0}\"></label>\n\
         <label>Team size <select name=\"team_size\">\n{options}</select></label>\n\
         <button type=\"submit\">Calculate</button>\n</form>\n\
         <dl>\n\
         <dt>Savings rate</dt><dd>{rate:.0}%</dd>\n\
         <dt>Annual savings</dt><dd>{annual}</dd>\n\
         <dt>Monthly savings</dt><dd>{monthly}</dd>\n\
         <dt>Annual cost on the exchange</dt><dd>{exchange_cost}</dd>\n\
         </dl>\n",
        budget = input.annual_budget_usd,
        rate = savings.rate * 100.0,
        annual = format_whole_currency(savings.annual_savings_usd, "USD"),
        monthly = format_whole_currency(savings.monthly_savings_usd, "USD"),
        exchange_cost = format_whole_currency(cost.exchange_annual_cost_usd, "USD"),
    );
    layout("Brands", &body, true)
}

pub(crate) fn render_providers(
    profile: &CalculatorProfile,
    input: &EarningsInput,
    estimate: &EarningsEstimate,
) -> String {
    let mut controls = String::new();
    for variant in &profile.earnings {
        let selected = if variant.id == estimate.variant { " selected" } else { "" };
        let _ = writeln!(
            controls,
            "<option value=\"{id}\"{selected}>{id} ({currency})</option>",
            id = escape_html(&variant.id),
            currency = escape_html(&variant.currency)
        );
    }
    let mut controls = format!("<label>Payout <select name=\"variant\">\n{controls}</select></label>\n");

    controls.push_str("<fieldset><legend>Workflow phases</legend>\n");
    for phase in &profile.phases {
        let checked = if input.selected_phases.is_selected(&phase.id) {
            " checked"
        } else {
            ""
        };
        let _ = writeln!(
            controls,
            "<label><input type=\"checkbox\" name=\"phase\" value=\"{}\"{checked}> {}</label>",
            escape_html(&phase.id),
            escape_html(&phase.label)
        );
    }
    controls.push_str("</fieldset>\n<fieldset><legend>Clients</legend>\n");
    for tier in &profile.tiers {
        let count = input.client_counts.get(&tier.id).copied().unwrap_or(0);
        let _ = writeln!(
            controls,
            "<label>{label} <input type=\"range\" name=\"{id}\" min=\"{min}\" max=\"{max}\" step=\"{step}\" value=\"{count}\"></label>",
            label = escape_html(&tier.label),
            id = escape_html(&tier.id),
            min = tier.slider.min,
            max = tier.slider.max,
            step = tier.slider.step,
        );
    }
    controls.push_str("</fieldset>\n");

    let body = format!(
        "<h1>What providers earn</h1>\n\
         <form method=\"get\" action=\"/providers\">\n{controls}<button type=\"submit\">Calculate</button>\n</form>\n\
         <dl>\n\
         <dt>Expected queries per month</dt><dd>{queries:.0}</dd>\n\
         <dt>Estimated monthly earnings</dt><dd>{monthly}</dd>\n\
         <dt>Estimated annual earnings</dt><dd>{annual}</dd>\n\
         </dl>\n",
        queries = estimate.expected_monthly_queries,
        monthly = format_whole_currency(estimate.estimated_monthly, &estimate.currency),
        annual = format_whole_currency(estimate.estimated_annual, &estimate.currency),
    );
    layout("Providers", &body, true)
}

pub(crate) fn render_not_found() -> String {
    layout(
        "Not found",
        "<h1>Not found</h1>\n<p><a href=\"/\">Back to the start</a></p>\n",
        false,
    )
}

fn layout(title: &str, body: &str, signed_in: bool) -> String {
    let logout = if signed_in {
        "<form method=\"post\" action=\"/gate/logout\"><button type=\"submit\">Sign out</button></form>\n"
    } else {
        ""
    };
    format!(
        "<!doctype html>\n<html lang=\"en\">\n<head>\n<meta charset=\"utf-8\">\n\
         <meta name=\"viewport\" content=\"width=device-width, initial-scale=1\">\n\
         <meta name=\"robots\" content=\"noindex\">\n<title>{}</title>\n</head>\n\
         <body>\n{logout}<main>\n{body}</main>\n</body>\n</html>\n",
        escape_html(title)
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn formats_whole_units_with_grouping() {
        assert_eq!(format_whole_currency(67_500.0, "USD"), "$67,500");
        assert_eq!(format_whole_currency(5_625.0, "USD"), "$5,625");
        assert_eq!(format_whole_currency(847.000_000_1, "USD"), "$847");
        assert_eq!(format_whole_currency(10_164.4, "EUR"), "€10,164");
        assert_eq!(format_whole_currency(1_234_567.5, "USD"), "$1,234,568");
        assert_eq!(format_whole_currency(999.4, "GBP"), "999 GBP");
        assert_eq!(format_whole_currency(0.0, "USD"), "$0");
        assert_eq!(format_whole_currency(f64::NAN, "USD"), "$0");
    }

    #[test]
    fn escapes_markup() {
        assert_eq!(
            escape_html("/brands?a=1&b=\"<x>\""),
            "/brands?a=1&amp;b=&quot;&lt;x&gt;&quot;"
        );
    }

    #[test]
    fn gate_page_shows_assistance_after_three_failures() {
        let attempts = LoginAttempts::from_form(Some("2")).record_failure();
        let html = render_gate(&GatePage {
            next: "/brands",
            error: Some("Invalid password"),
            attempts,
        });
        assert!(html.contains("Invalid password"));
        assert!(html.contains("name=\"attempts\" value=\"3\""));
        assert!(html.contains("Request access"));

        let html = render_gate(&GatePage {
            next: "/",
            error: None,
            attempts: LoginAttempts::default(),
        });
        assert!(!html.contains("Request access"));
        assert!(!html.contains("Sign out"));
    }

    #[test]
    fn brands_page_renders_reference_scenario() {
        let profile = CalculatorProfile::reference();
        let input = SavingsInput::new(DEFAULT_BUDGET_USD, DEFAULT_TEAM_SIZE);
        let html = render_brands(
            &profile,
            &input,
            &profile.brand_savings(&input),
            &profile.cost_comparison(&input),
        );
        assert!(html.contains("$67,500"));
        assert!(html.contains("$5,625"));
        assert!(html.contains("<option value=\"10to20\" selected>"));
    }

    #[test]
    fn providers_page_renders_reference_scenario() {
        let profile = CalculatorProfile::reference();
        let input = EarningsInput::new(
            DEFAULT_PHASES.iter().copied(),
            DEFAULT_CLIENT_COUNTS.iter().copied(),
        );
        let estimate = profile.earnings("providers", &input);
        let html = render_providers(&profile, &input, &estimate);
        assert!(html.contains("$847"));
        assert!(html.contains("$10,164"));
        assert!(html.contains("value=\"strategy\" checked"));
        assert!(!html.contains("value=\"others\" checked"));
    }
}
