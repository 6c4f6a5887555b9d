/// Pounds with two decimals and thousands separators, e.g. `£12,500.00`.
/// Negative amounts keep the sign in front of the symbol.
pub fn format_gbp(amount: f64) -> String {
    if !amount.is_finite() {
        return format!("£{amount}");
    }

    let fixed = format!("{:.2}", amount.abs());
    let (whole, pence) = fixed.split_once('.').unwrap_or((fixed.as_str(), "00"));

    let mut grouped = String::with_capacity(whole.len() + whole.len() / 3);
    for (index, digit) in whole.chars().enumerate() {
        if index > 0 && (whole.len() - index) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(digit);
    }

    let sign = if amount < 0.0 && fixed != "0.00" { "-" } else { "" };
    format!("{sign}£{grouped}.{pence}")
}

/// Day/month/year the way the sales team reads dates.
pub fn format_day(value: &chrono::DateTime<chrono::Utc>) -> String {
    value.format("%d/%m/%Y").to_string()
}
