//! Billing-period arithmetic and the English phrases printed on invoices.

use serde::Serialize;

const NEXT_BILLING_AFTER_PAYMENT: &str =
    "Next Billing will be generated after the Payment to Continue the Service.";

/// How an engagement is billed, read from the intake `Period` and `Shift` cells.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum BillingPeriod {
    PerVisit,
    Daily,
    Weekly,
    Monthly,
    /// Unrecognized label, echoed back verbatim.
    Other(String),
}

fn plural(qty: u32, unit: &str) -> String {
    if qty == 1 {
        format!("{} {}", qty, unit)
    } else {
        format!("{} {}s", qty, unit)
    }
}

impl BillingPeriod {
    /// A shift mentioning "per visit" overrides whatever the period says.
    ///
    /// Period labels are matched on their stem, so `Day`, `Daily` and `Days`
    /// are all daily and `Week`/`Weekly`, `Month`/`Monthly` likewise.
    pub fn parse(period: &str, shift: &str) -> Self {
        let period_lower = period.trim().to_lowercase();
        if shift.to_lowercase().contains("per visit") {
            BillingPeriod::PerVisit
        } else if period_lower.contains("dai") || period_lower.contains("day") {
            BillingPeriod::Daily
        } else if period_lower.contains("week") {
            BillingPeriod::Weekly
        } else if period_lower.contains("month") {
            BillingPeriod::Monthly
        } else {
            BillingPeriod::Other(period.trim().to_string())
        }
    }

    /// `Paid for 2 Weeks`; daily quantities that are whole weeks read as weeks.
    pub fn paid_for(&self, qty: u32) -> String {
        let body = match self {
            BillingPeriod::PerVisit => plural(qty, "Visit"),
            BillingPeriod::Daily if qty == 1 => plural(qty, "Day"),
            BillingPeriod::Daily if qty % 7 == 0 => plural(qty / 7, "Week"),
            BillingPeriod::Daily => plural(qty, "Day"),
            BillingPeriod::Monthly => plural(qty, "Month"),
            BillingPeriod::Weekly => plural(qty, "Week"),
            BillingPeriod::Other(label) => format!("{} {}", qty, label),
        };
        format!("Paid for {}", body)
    }

    /// Follow-up note under the total: when the next bill is due, or what the
    /// payment covers.
    pub fn billing_note(&self, visits_needed: u32, qty: u32) -> String {
        match self {
            BillingPeriod::PerVisit => {
                if visits_needed > 1 && qty == 1 {
                    NEXT_BILLING_AFTER_PAYMENT.to_string()
                } else if qty >= visits_needed {
                    format!("Paid for {} Visits.", visits_needed)
                } else if visits_needed == 1 {
                    "Paid for 1 Visit.".to_string()
                } else {
                    format!("Next Bill will be Generated after {} Visits.", qty)
                }
            }
            BillingPeriod::Monthly | BillingPeriod::Weekly => {
                let unit = if *self == BillingPeriod::Monthly { "Month" } else { "Week" };
                let unit = if qty > 1 { format!("{}s", unit) } else { unit.to_string() };
                if visits_needed > 1 && qty == 1 {
                    NEXT_BILLING_AFTER_PAYMENT.to_string()
                } else if visits_needed > qty {
                    format!("Next Bill will be Generated after {} {}.", qty, unit)
                } else {
                    self.paid_for(qty)
                }
            }
            BillingPeriod::Daily => {
                if (2..6).contains(&visits_needed) && qty == 1 {
                    NEXT_BILLING_AFTER_PAYMENT.to_string()
                } else if qty >= visits_needed {
                    format!("Paid for {} Days.", visits_needed)
                } else if visits_needed == 1 {
                    "Paid for 1 Day.".to_string()
                } else {
                    format!("Next Bill will be Generated after {} Days.", qty)
                }
            }
            BillingPeriod::Other(_) => self.paid_for(qty),
        }
    }

    /// Unit shown after the rate: `Month`, `Week`, `Day` or the raw label.
    pub fn unit_display(&self) -> String {
        match self {
            BillingPeriod::Monthly => "Month".to_string(),
            BillingPeriod::Weekly => "Week".to_string(),
            BillingPeriod::Daily => "Day".to_string(),
            BillingPeriod::PerVisit => "Visit".to_string(),
            BillingPeriod::Other(label) => label.clone(),
        }
    }
}

/// The two description lines under the plan name: the shift, then how long
/// the service runs (`For 30 Days`, or open-ended for recurring clients).
pub fn service_description(shift: &str, period: &str, visits: u32, recurring: bool) -> (String, String) {
    let shift = shift_display(shift);
    let period = period.trim();
    if recurring {
        let first = if period.is_empty() {
            shift
        } else {
            format!("{} - {}", shift, period)
        };
        return (first, "Till the Service Required".to_string());
    }

    let unit = match BillingPeriod::parse(period, "") {
        BillingPeriod::Other(label) => label,
        known if visits == 1 => known.unit_display(),
        known => format!("{}s", known.unit_display()),
    };
    (shift, format!("For {} {}", visits, unit))
}

/// Human label for an intake shift code.
pub fn shift_display(shift: &str) -> String {
    let shift = shift.trim();
    let mapped = match shift {
        "12-hr Day" => "12 Hours - Day",
        "12-hr Night" => "12 Hours - Night",
        "24-hr" => "24 Hours",
        other => other,
    };
    if mapped.contains("12") && !mapped.contains("Time") {
        format!("{} (Time)", mapped)
    } else {
        mapped.to_string()
    }
}

/// Whole-rupee amount with thousands separators: `12,600`.
pub fn format_rupees(amount: f64) -> String {
    let rounded = format!("{:.0}", amount.abs());
    let mut grouped = String::with_capacity(rounded.len() + rounded.len() / 3);
    for (i, c) in rounded.chars().enumerate() {
        if i > 0 && (rounded.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(c);
    }
    if amount < 0.0 && rounded != "0" {
        format!("-{}", grouped)
    } else {
        grouped
    }
}

/// Parse a visits cell the way the intake sheet types it (`"6"`, `"6.0"`, blank).
pub fn parse_visits(cell: &str) -> u32 {
    cell.trim()
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite() && *v >= 0.0)
        .map(|v| v.trunc() as u32)
        .unwrap_or(0)
}

/// Everything the amount column of an invoice prints.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BillingLine {
    pub period: BillingPeriod,
    pub shift: String,
    pub unit_rate: f64,
    pub quantity: u32,
    pub visits_needed: u32,
    pub total: f64,
    pub rate_line: String,
    pub paid_for: String,
    pub note: String,
}

impl BillingLine {
    pub fn compute(
        unit_rate: f64,
        quantity: u32,
        visits_needed: u32,
        shift: &str,
        period: &str,
    ) -> Self {
        let billing_period = BillingPeriod::parse(period, shift);
        let shift = shift_display(shift);
        let rate = format_rupees(unit_rate);
        let rate_line = match billing_period {
            BillingPeriod::PerVisit => format!("{} = ₹ {}", shift, rate),
            _ => format!("{} / {} = ₹ {}", shift, billing_period.unit_display(), rate),
        };

        BillingLine {
            paid_for: billing_period.paid_for(quantity),
            note: billing_period.billing_note(visits_needed, quantity),
            total: unit_rate * quantity as f64,
            rate_line,
            shift,
            unit_rate,
            quantity,
            visits_needed,
            period: billing_period,
        }
    }

    pub fn total_display(&self) -> String {
        format_rupees(self.total)
    }
}
