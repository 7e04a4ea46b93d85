//! Small formatting helpers shared by reports and alerts.

/// Format an integer with thousands separators: `1234567` -> `"1,234,567"`.
pub fn thousands(value: i64) -> String {
    let negative = value < 0;
    let digits = value.unsigned_abs().to_string();
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }
    if negative {
        format!("-{grouped}")
    } else {
        grouped
    }
}

/// Format a signed delta with an explicit `+` for increases.
pub fn signed(value: f64) -> String {
    if value >= 0.0 {
        format!("+{}", thousands(value.round() as i64))
    } else {
        thousands(value.round() as i64)
    }
}
