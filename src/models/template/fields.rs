use chrono::{Days, Months, NaiveDate};
use serde::{Deserialize, Serialize};

use super::FieldMap;
use super::words::number_to_words;

const DEFAULT_CURRENCY: &str = "GHS";
const DATE_FORMAT: &str = "%-d %B %Y";

/// Rent payment cadence; also the unit the lease duration is counted in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentFrequency {
    Daily,
    Weekly,
    Monthly,
    Quarterly,
    SemiAnnually,
    Annually,
}

/// Calendar unit a frequency is counted in, with how many of them one period spans.
enum PeriodUnit {
    Days(u32),
    Months(u32),
}

impl PaymentFrequency {
    pub fn label(&self) -> &'static str {
        match self {
            PaymentFrequency::Daily => "Daily",
            PaymentFrequency::Weekly => "Weekly",
            PaymentFrequency::Monthly => "Monthly",
            PaymentFrequency::Quarterly => "Quarterly",
            PaymentFrequency::SemiAnnually => "Semi-annually",
            PaymentFrequency::Annually => "Annually",
        }
    }

    fn unit(&self) -> PeriodUnit {
        match self {
            PaymentFrequency::Daily => PeriodUnit::Days(1),
            PaymentFrequency::Weekly => PeriodUnit::Days(7),
            PaymentFrequency::Monthly => PeriodUnit::Months(1),
            PaymentFrequency::Quarterly => PeriodUnit::Months(3),
            PaymentFrequency::SemiAnnually => PeriodUnit::Months(6),
            PaymentFrequency::Annually => PeriodUnit::Months(12),
        }
    }

    /// `start` advanced by `periods` of this frequency. Month steps clamp to the
    /// last day of the target month.
    pub fn advance(&self, start: NaiveDate, periods: u32) -> Option<NaiveDate> {
        match self.unit() {
            PeriodUnit::Days(days) => start.checked_add_days(Days::new(u64::from(periods) * u64::from(days))),
            PeriodUnit::Months(months) => start.checked_add_months(Months::new(periods.checked_mul(months)?)),
        }
    }

    /// Human duration such as "12 months", "1 year" or "6 weeks".
    pub fn describe_duration(&self, periods: u32) -> String {
        let (count, unit) = match self {
            PaymentFrequency::Daily => (periods, "day"),
            PaymentFrequency::Weekly => (periods, "week"),
            PaymentFrequency::Monthly => (periods, "month"),
            PaymentFrequency::Quarterly => (periods.saturating_mul(3), "month"),
            PaymentFrequency::SemiAnnually => (periods.saturating_mul(6), "month"),
            PaymentFrequency::Annually => (periods, "year"),
        };
        if count == 1 {
            format!("{count} {unit}")
        } else {
            format!("{count} {unit}s")
        }
    }
}

/// Tenancy application data the lease fields are drawn from.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TenancyRecord {
    pub tenant_first_name: Option<String>,
    pub tenant_last_name: Option<String>,
    pub tenant_email: Option<String>,
    pub tenant_phone: Option<String>,
    pub tenant_address: Option<String>,
    pub tenant_occupation: Option<String>,
    pub property_name: Option<String>,
    pub property_address: Option<String>,
    pub unit_name: Option<String>,
    pub unit_type: Option<String>,
    pub property_manager_name: Option<String>,
    pub property_manager_email: Option<String>,
    pub property_manager_phone: Option<String>,
    pub currency: Option<String>,
    pub rent_amount: Option<f64>,
    pub security_deposit: Option<f64>,
    pub payment_frequency: Option<PaymentFrequency>,
    pub lease_duration: Option<u32>,
    pub lease_start_date: Option<NaiveDate>,
    pub guarantor_name: Option<String>,
    pub guarantor_phone: Option<String>,
}

fn currency_symbol(code: &str) -> String {
    match code.to_ascii_uppercase().as_str() {
        "GHS" => "GH₵".to_string(),
        "USD" => "$".to_string(),
        "EUR" => "€".to_string(),
        "GBP" => "£".to_string(),
        other => format!("{other} "),
    }
}

fn group_thousands(n: u64) -> String {
    let digits = n.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}

/// Format an amount the way en-GH renders currency: `GH₵2,500.50`.
pub fn format_currency(amount: f64, currency: &str) -> String {
    let cents = (amount.abs() * 100.0).round() as u64;
    let sign = if amount < 0.0 && cents > 0 { "-" } else { "" };
    format!(
        "{sign}{}{}.{:02}",
        currency_symbol(currency),
        group_thousands(cents / 100),
        cents % 100
    )
}

fn put(fields: &mut FieldMap, key: &str, value: Option<&str>) {
    if let Some(v) = value.map(str::trim).filter(|v| !v.is_empty()) {
        fields.insert(key.to_string(), v.to_string());
    }
}

fn put_amount(fields: &mut FieldMap, key: &str, amount: Option<f64>, currency: &str) {
    if let Some(amount) = amount.filter(|a| a.is_finite()) {
        put(fields, key, Some(&format_currency(amount, currency)));
        put(fields, &format!("{key}InWords"), Some(&number_to_words(amount)));
    }
}

/// Build the field map for a tenancy record. Only non-empty source values
/// produce entries; the rest leave their tokens unresolved.
pub fn build_field_map(record: &TenancyRecord) -> FieldMap {
    let mut fields = FieldMap::new();

    let full_name: Vec<&str> = [&record.tenant_first_name, &record.tenant_last_name]
        .into_iter()
        .filter_map(|part| part.as_deref().map(str::trim))
        .filter(|part| !part.is_empty())
        .collect();
    put(&mut fields, "TenantName", Some(&full_name.join(" ")));
    put(&mut fields, "TenantFirstName", record.tenant_first_name.as_deref());
    put(&mut fields, "TenantLastName", record.tenant_last_name.as_deref());
    put(&mut fields, "TenantEmail", record.tenant_email.as_deref());
    put(&mut fields, "TenantPhone", record.tenant_phone.as_deref());
    put(&mut fields, "TenantAddress", record.tenant_address.as_deref());
    put(&mut fields, "TenantOccupation", record.tenant_occupation.as_deref());

    put(&mut fields, "PropertyName", record.property_name.as_deref());
    put(&mut fields, "PropertyAddress", record.property_address.as_deref());
    put(&mut fields, "UnitName", record.unit_name.as_deref());
    put(&mut fields, "UnitType", record.unit_type.as_deref());

    put(&mut fields, "PropertyManagerName", record.property_manager_name.as_deref());
    put(&mut fields, "PropertyManagerEmail", record.property_manager_email.as_deref());
    put(&mut fields, "PropertyManagerPhone", record.property_manager_phone.as_deref());

    let currency = record
        .currency
        .as_deref()
        .map(str::trim)
        .filter(|c| !c.is_empty())
        .unwrap_or(DEFAULT_CURRENCY);
    put_amount(&mut fields, "RentAmount", record.rent_amount, currency);
    put_amount(&mut fields, "SecurityDeposit", record.security_deposit, currency);

    if let Some(freq) = record.payment_frequency {
        put(&mut fields, "PaymentFrequency", Some(freq.label()));
        if let Some(periods) = record.lease_duration {
            put(&mut fields, "LeaseDuration", Some(&freq.describe_duration(periods)));
        }
    }

    if let Some(start) = record.lease_start_date {
        put(&mut fields, "LeaseStartDate", Some(&start.format(DATE_FORMAT).to_string()));
        let end = match (record.payment_frequency, record.lease_duration) {
            (Some(freq), Some(periods)) => freq.advance(start, periods),
            _ => None,
        };
        if let Some(end) = end {
            put(&mut fields, "LeaseEndDate", Some(&end.format(DATE_FORMAT).to_string()));
        }
    }

    put(&mut fields, "GuarantorName", record.guarantor_name.as_deref());
    put(&mut fields, "GuarantorPhone", record.guarantor_phone.as_deref());

    fields
}
