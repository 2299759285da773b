use scraper::Html;

/// Clean a text field returned by the shopping API.
///
/// Titles come back with highlight markup (`<b>query</b>`) and HTML entities.
/// Tags are dropped, entities decoded, and runs of whitespace collapsed into a
/// single space.
pub fn clean_html_text(raw: &str) -> String {
    if raw.is_empty() {
        return String::new();
    }

    let fragment = Html::parse_fragment(raw);
    let text = fragment.root_element().text().collect::<String>();

    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Parse a price string such as `"1,299,000원"` into a number.
///
/// Everything except ASCII digits and `.` is removed first. Empty or
/// unparsable input yields `0.0`, so the result is never negative.
pub fn parse_price(raw: &str) -> f64 {
    let digits: String = raw
        .chars()
        .filter(|c| c.is_ascii_digit() || *c == '.')
        .collect();

    digits.parse::<f64>().unwrap_or(0.0)
}
