use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;

use crate::utils::crypto::normalize_phone;

/// Hard cap on stored resume text, in characters.
const MAX_TEXT_CHARS: usize = 15_000;

// Pre-compiled regexes for the extraction cleanup pass
static RE_PROFILE_LINK: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)\b(?:https?://)?(?:www\.)?((?:github\.com|gitlab\.com|bitbucket\.org|linkedin\.com)/[A-Za-z0-9_./%-]+)",
    )
    .unwrap()
});
static RE_IP_LINE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*(?:\d{1,3}\.){3}\d{1,3}(?::\d+)?\s*$").unwrap());
static RE_QUERY_URL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"https?://\S+\?\S+").unwrap());
static RE_PAGE_FOOTER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^\s*(?:страница|page)?\s*\d+\s*(?:из|of)\s*\d+\s*$").unwrap()
});
static RE_PATH_LINE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*/[\w./-]*\s*$").unwrap());
static RE_BLANK_RUN: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\n{3,}").unwrap());
static RE_EMAIL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"[A-Za-z0-9._%+-]+@[A-Za-z0-9.-]+\.[A-Za-z]{2,}").unwrap()
});
static RE_PHONE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\+?\d[\d\s()\-]{8,}\d").unwrap());

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractedContacts {
    pub emails: Vec<String>,
    pub phones: Vec<String>,
    pub links: Vec<String>,
}

/// Normalizes raw converter/OCR output into the text that gets stored and
/// scored. Drops scanner and job-board noise lines while guaranteeing that
/// professional profile links survive: any link present in the raw text but
/// lost during cleanup is re-attached as a trailing block. Running the
/// cleanup over its own output changes nothing.
pub fn clean_extracted_text(raw: &str) -> String {
    let links = capture_profile_links(raw);

    let kept: Vec<&str> = raw
        .lines()
        .map(str::trim_end)
        .filter(|line| !is_noise_line(line))
        .collect();
    let mut body = RE_BLANK_RUN
        .replace_all(&kept.join("\n"), "\n\n")
        .trim()
        .to_string();

    let body_lower = body.to_lowercase();
    let missing: Vec<&String> = links
        .iter()
        .filter(|link| !body_lower.contains(&link.to_lowercase()))
        .collect();
    let block = if missing.is_empty() {
        String::new()
    } else {
        let mut b = String::from("\n\n");
        for (i, link) in missing.iter().enumerate() {
            if i > 0 {
                b.push('\n');
            }
            b.push_str(link);
        }
        b
    };

    let budget = MAX_TEXT_CHARS.saturating_sub(block.chars().count());
    body = truncate_chars(body, budget);
    body.push_str(&block);
    body
}

pub fn extract_contacts(text: &str) -> ExtractedContacts {
    let mut emails: Vec<String> = Vec::new();
    for m in RE_EMAIL.find_iter(text) {
        let found = m.as_str().to_string();
        if !emails.iter().any(|e| e.eq_ignore_ascii_case(&found)) {
            emails.push(found);
        }
    }

    let mut phones: Vec<String> = Vec::new();
    for m in RE_PHONE.find_iter(text) {
        let normalized = normalize_phone(m.as_str());
        let digits = normalized.chars().filter(|c| c.is_ascii_digit()).count();
        if (10..=15).contains(&digits) && !phones.contains(&normalized) {
            phones.push(normalized);
        }
    }

    ExtractedContacts {
        emails,
        phones,
        links: capture_profile_links(text),
    }
}

fn is_noise_line(line: &str) -> bool {
    RE_IP_LINE.is_match(line)
        || RE_PAGE_FOOTER.is_match(line)
        || RE_PATH_LINE.is_match(line)
        || RE_QUERY_URL.is_match(line)
}

fn capture_profile_links(text: &str) -> Vec<String> {
    let mut links: Vec<String> = Vec::new();
    for cap in RE_PROFILE_LINK.captures_iter(text) {
        let trimmed = cap[1].trim_end_matches(['/', '.', ',']);
        let canonical = match trimmed.split_once('/') {
            Some((host, path)) => format!("{}/{}", host.to_lowercase(), path),
            None => trimmed.to_lowercase(),
        };
        if !links.iter().any(|l| l.eq_ignore_ascii_case(&canonical)) {
            links.push(canonical);
        }
    }
    links
}

fn truncate_chars(s: String, max: usize) -> String {
    match s.char_indices().nth(max) {
        Some((idx, _)) => s[..idx].trim_end().to_string(),
        None => s,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_scanner_and_tracking_noise() {
        let raw = "Иван Петров\n192.168.0.14\nОпыт работы: 5 лет\nhttps://hh.ru/vacancy/123?from=share&utm=mail\nСтраница 1 из 2\n/tmp/scan-0001\nPython, Rust";
        let cleaned = clean_extracted_text(raw);
        assert_eq!(cleaned, "Иван Петров\nОпыт работы: 5 лет\nPython, Rust");
    }

    #[test]
    fn profile_link_survives_query_url_stripping() {
        let raw = "Опыт: 3 года\nhttps://github.com/ivanpetrov?tab=repositories\nНавыки: Rust";
        let cleaned = clean_extracted_text(raw);
        assert!(cleaned.contains("github.com/ivanpetrov"));
        assert!(!cleaned.contains("tab=repositories"));
    }

    #[test]
    fn cleanup_is_idempotent() {
        let raw = "Резюме\n\n\n\n10.0.0.1\nPage 2 of 3\ngithub.com/dev-user\n\nКонтакты: dev@example.com\nhttps://board.example.com/apply?src=email";
        let once = clean_extracted_text(raw);
        let twice = clean_extracted_text(&once);
        assert_eq!(once, twice);
    }

    #[test]
    fn collapses_blank_runs() {
        let cleaned = clean_extracted_text("Первая\n\n\n\n\nВторая");
        assert_eq!(cleaned, "Первая\n\nВторая");
    }

    #[test]
    fn extracts_contact_sheet() {
        let text = "Иван Петров\ndev@example.com\n+993 12 34-56-78\nlinkedin.com/in/ivan-petrov";
        let contacts = extract_contacts(text);
        assert_eq!(contacts.emails, vec!["dev@example.com"]);
        assert_eq!(contacts.phones, vec!["+99312345678"]);
        assert_eq!(contacts.links, vec!["linkedin.com/in/ivan-petrov"]);
    }
}
