//! Text extraction helpers shared by the provider adapters.

/// Extract the first DOI from a URL or free text.
///
/// Matches the standard DOI lexical form `10.NNNN+/suffix` with a 4-9
/// digit registrant prefix. Running the extraction on an already-extracted
/// DOI yields the same DOI.
pub fn extract_doi(text: &str) -> Option<String> {
    let re = regex::Regex::new(r"10\.\d{4,9}/[-._;()/:a-zA-Z0-9]+").ok()?;
    re.find(text).map(|m| m.as_str().to_string())
}

/// Find the first embedded PDF URL in free text (typically a snippet).
pub fn find_pdf_link(text: &str) -> Option<String> {
    let re = regex::Regex::new(r"(?i)https?://[^\s]+\.pdf").ok()?;
    re.find(text).map(|m| m.as_str().to_string())
}

/// Extract the first plausible 4-digit publication year (1900-2099).
pub fn extract_year(text: &str) -> Option<i32> {
    let re = regex::Regex::new(r"\b(19|20)\d{2}\b").ok()?;
    re.find(text).and_then(|m| m.as_str().parse().ok())
}

/// Truncate preview text to 200 characters, appending an ellipsis.
///
/// Cuts on a character boundary so multi-byte abstracts cannot split a
/// code point.
pub fn truncate_snippet(text: &str) -> String {
    if text.chars().count() <= 200 {
        return text.to_string();
    }
    let cut: String = text.chars().take(200).collect();
    format!("{}...", cut)
}

/// Compose a publication date from separately reported parts.
///
/// Produces "YYYY-MM-DD", "YYYY-MM", or "YYYY" in that preference order,
/// defaulting a missing month or day to "01". An absent year yields an
/// empty string.
pub fn compose_date(year: Option<&str>, month: Option<&str>, day: Option<&str>) -> String {
    let year = match year.filter(|y| !y.is_empty()) {
        Some(y) => y,
        None => return String::new(),
    };
    let month = month.filter(|m| !m.is_empty()).unwrap_or("01");
    let day = day.filter(|d| !d.is_empty()).unwrap_or("01");
    format!("{}-{}-{}", year, month, day)
}

/// Reduce an RFC 3339 / ISO timestamp to its date part.
///
/// Falls back to splitting on 'T' when the timestamp does not parse.
pub fn date_from_timestamp(timestamp: &str) -> String {
    if let Ok(dt) = chrono::DateTime::parse_from_rfc3339(timestamp) {
        return dt.format("%Y-%m-%d").to_string();
    }
    match timestamp.split_once('T') {
        Some((date, _)) => date.to_string(),
        None => timestamp.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_doi_from_url() {
        assert_eq!(
            extract_doi("https://link.springer.com/article/10.1007/s11128-021-03079-z"),
            Some("10.1007/s11128-021-03079-z".to_string())
        );
        assert_eq!(extract_doi("https://example.org/paper.html"), None);
    }

    #[test]
    fn test_extract_doi_idempotent() {
        let first = extract_doi("https://doi.org/10.1000/xyz123").unwrap();
        let second = extract_doi(&first).unwrap();
        assert_eq!(first, second);
        assert_eq!(second, "10.1000/xyz123");
    }

    #[test]
    fn test_find_pdf_link_case_insensitive() {
        let snippet = "Preprint available at HTTPS://EXAMPLE.ORG/Files/Paper.PDF for review";
        assert_eq!(
            find_pdf_link(snippet),
            Some("HTTPS://EXAMPLE.ORG/Files/Paper.PDF".to_string())
        );
        assert_eq!(find_pdf_link("no links here"), None);
    }

    #[test]
    fn test_extract_year_bounds() {
        assert_eq!(extract_year("Smith J - Nature, 2021"), Some(2021));
        assert_eq!(extract_year("published 1899"), None);
        assert_eq!(extract_year("volume 12345"), None);
        assert_eq!(extract_year(""), None);
    }

    #[test]
    fn test_truncate_snippet() {
        let short = "brief abstract";
        assert_eq!(truncate_snippet(short), short);

        let long = "x".repeat(250);
        let truncated = truncate_snippet(&long);
        assert_eq!(truncated.chars().count(), 203);
        assert!(truncated.ends_with("..."));
    }

    #[test]
    fn test_compose_date_defaults() {
        assert_eq!(
            compose_date(Some("2021"), Some("06"), Some("15")),
            "2021-06-15"
        );
        assert_eq!(compose_date(Some("2021"), Some("06"), None), "2021-06-01");
        assert_eq!(compose_date(Some("2021"), None, None), "2021-01-01");
        assert_eq!(compose_date(None, Some("06"), Some("15")), "");
    }

    #[test]
    fn test_date_from_timestamp() {
        assert_eq!(date_from_timestamp("2021-01-05T18:30:00Z"), "2021-01-05");
        assert_eq!(date_from_timestamp("2021-01-05T18:30"), "2021-01-05");
        assert_eq!(date_from_timestamp("2021-01-05"), "2021-01-05");
    }
}
