//! Number and date formatting for axis labels, legends, and CSV export.

/// Compact display form: thousands, millions, and billions collapse to
/// K/M/B with one decimal, smaller values keep up to two decimals.
pub fn format_number(value: f64) -> String {
    if !value.is_finite() {
        return String::new();
    }
    let abs = value.abs();
    if abs >= 1e9 {
        return format!("{}B", trim_zeros(format!("{:.1}", value / 1e9)));
    }
    if abs >= 1e6 {
        return format!("{}M", trim_zeros(format!("{:.1}", value / 1e6)));
    }
    if abs >= 1e3 {
        return format!("{}K", trim_zeros(format!("{:.1}", value / 1e3)));
    }
    trim_zeros(format!("{value:.2}"))
}

/// Compact number with its unit attached. `%` and `$` hug the number,
/// other units are spelled out after it.
pub fn format_value(value: f64, unit: Option<&str>) -> String {
    let text = format_number(value);
    match unit {
        Some("%") => format!("{text}%"),
        Some("$") => format!("${text}"),
        Some(unit) if !unit.is_empty() => format!("{text} {unit}"),
        _ => text,
    }
}

fn trim_zeros(text: String) -> String {
    if !text.contains('.') {
        return text;
    }
    text.trim_end_matches('0').trim_end_matches('.').to_string()
}

/// Maps an ISO-8601 date, possibly truncated to a year or month, onto a
/// decimal year for positioning on a time axis. Returns `None` for
/// unparseable input.
pub fn date_to_year(date: &str) -> Option<f64> {
    let mut parts = date.trim().split('-');
    let year: i32 = parts.next()?.parse().ok()?;
    let month: u32 = match parts.next() {
        Some(m) => m.parse().ok()?,
        None => 1,
    };
    let day: u32 = match parts.next() {
        Some(d) => d.parse().ok()?,
        None => 1,
    };
    if !(1..=12).contains(&month) || !(1..=31).contains(&day) {
        return None;
    }
    Some(f64::from(year) + f64::from(month - 1) / 12.0 + f64::from(day - 1) / 365.0)
}

/// Axis label for a decimal-year tick. Spans shorter than about two
/// years get month precision so neighbouring ticks stay distinguishable.
pub fn format_year_tick(value: f64, span: f64) -> String {
    if span < 2.0 {
        let year = value.floor();
        let month = (((value - year) * 12.0).round() as u32).min(11) + 1;
        format!("{year:.0}-{month:02}")
    } else {
        format!("{value:.0}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn compact_suffixes() {
        assert_eq!(format_number(1_200_000_000.0), "1.2B");
        assert_eq!(format_number(3_500_000.0), "3.5M");
        assert_eq!(format_number(12_000.0), "12K");
        assert_eq!(format_number(950.0), "950");
        assert_eq!(format_number(0.126), "0.13");
        assert_eq!(format_number(-42_000.0), "-42K");
    }

    #[test]
    fn units_attach_correctly() {
        assert_eq!(format_value(12.3, Some("%")), "12.3%");
        assert_eq!(format_value(1_500.0, Some("$")), "$1.5K");
        assert_eq!(format_value(7.0, Some("t")), "7 t");
        assert_eq!(format_value(7.0, None), "7");
    }

    #[test]
    fn partial_dates_parse() {
        assert_eq!(date_to_year("2011"), Some(2011.0));
        let mid = date_to_year("2011-07").unwrap();
        assert!(mid > 2011.0 && mid < 2012.0);
        let day = date_to_year("2011-07-15").unwrap();
        assert!(day > mid);
    }

    #[test]
    fn dates_order_chronologically() {
        let a = date_to_year("2019-12").unwrap();
        let b = date_to_year("2020-01").unwrap();
        assert!(b > a);
    }

    #[test]
    fn garbage_dates_are_rejected() {
        assert_eq!(date_to_year("latest"), None);
        assert_eq!(date_to_year("2011-13"), None);
        assert_eq!(date_to_year(""), None);
    }

    #[test]
    fn year_ticks_render_as_integers() {
        assert_eq!(format_year_tick(2014.0, 10.0), "2014");
        assert_eq!(format_year_tick(2015.9999, 10.0), "2016");
    }

    #[test]
    fn short_spans_get_month_labels() {
        assert_eq!(format_year_tick(2020.25, 0.75), "2020-04");
        assert_eq!(format_year_tick(2020.0, 1.5), "2020-01");
        assert_eq!(format_year_tick(2020.97, 0.75), "2020-12");
    }
}
