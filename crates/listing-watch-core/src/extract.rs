//! Listing extraction from the source HTML page.
//!
//! The page is partitioned into `.car-list__item` fragments. Every field is
//! read with a selector scoped to its fragment, and a selector that matches
//! nothing yields `None` rather than an error.
//!
//! # Inclusion predicate
//!
//! A fragment becomes a candidate only when its title is present, its year
//! parses to a positive integer no older than [`ListingFilter::min_year`],
//! and the title contains one of [`ListingFilter::models`]. The predicate is
//! evaluated on the title and year alone; the remaining fields of rejected
//! fragments are never read.
//!
//! # Identity
//!
//! The identity key is the last non-empty path segment of the detail-page
//! href (`/ua/used-cars/cx-5-4821` → `cx-5-4821`). Candidates without an href
//! are dropped because no key can be derived for them.

use scraper::{ElementRef, Html, Selector};
use serde::{Deserialize, Serialize};

use crate::models::Record;

const YEAR_LABEL: &str = "Рік:";
const MILEAGE_LABEL: &str = "Пробіг:";
const PRICE_LABEL: &str = "Ціна:";
const CREDIT_LABEL: &str = "Кредит:";

const PRICE_VALUE_CLASS: &str = "car-list__price--value";

/// Which listings are worth alerting on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListingFilter {
    /// Oldest accepted model year (inclusive).
    pub min_year: u32,
    /// Substrings matched case-sensitively against the title; any one suffices.
    pub models: Vec<String>,
}

impl ListingFilter {
    pub fn accepts(&self, title: &str, year: u32) -> bool {
        year > 0 && year >= self.min_year && self.models.iter().any(|m| title.contains(m.as_str()))
    }
}

struct ListingSelectors {
    item: Selector,
    title: Selector,
    price_key: Selector,
    fuel: Selector,
    engine: Selector,
    drive: Selector,
    power: Selector,
    transmission: Selector,
    body: Selector,
    link: Selector,
}

impl ListingSelectors {
    fn new() -> Self {
        Self {
            item: parse_selector(".car-list__item"),
            title: parse_selector(".car-list__car--title"),
            price_key: parse_selector(".car-list__price--key"),
            fuel: parse_selector(".car-list__option-fuel .car-list__option--key"),
            engine: parse_selector(".car-list__option-fuel .car-list__option--value"),
            drive: parse_selector(".car-list__option-drive .car-list__option--key"),
            power: parse_selector(".car-list__option-drive .car-list__option--value"),
            transmission: parse_selector(".car-list__option-transmission .car-list__option--key"),
            body: parse_selector(".car-list__option-transmission .car-list__option--value"),
            link: parse_selector("a.car-list__item--button"),
        }
    }
}

fn parse_selector(css: &str) -> Selector {
    Selector::parse(css).unwrap_or_else(|e| panic!("invalid built-in selector {css:?}: {e:?}"))
}

/// Reusable extractor holding the parsed selectors, the filter, and the
/// origin used to absolutize detail links.
pub struct ListingExtractor {
    selectors: ListingSelectors,
    filter: ListingFilter,
    base_url: String,
}

impl ListingExtractor {
    pub fn new(filter: ListingFilter, base_url: impl Into<String>) -> Self {
        Self {
            selectors: ListingSelectors::new(),
            filter,
            base_url: base_url.into(),
        }
    }

    /// Extract candidate records from a page, in document order.
    ///
    /// Malformed or empty input yields an empty vector.
    pub fn extract(&self, html: &str) -> Vec<Record> {
        let document = Html::parse_document(html);
        document
            .select(&self.selectors.item)
            .filter_map(|fragment| self.extract_fragment(fragment))
            .collect()
    }

    fn extract_fragment(&self, fragment: ElementRef<'_>) -> Option<Record> {
        let s = &self.selectors;

        let title = select_text(fragment, &s.title)?;
        let year = self.labelled_value(fragment, YEAR_LABEL).and_then(|raw| parse_year(&raw))?;
        if !self.filter.accepts(&title, year) {
            return None;
        }

        let href = match select_attr(fragment, &s.link, "href") {
            Some(href) => href,
            None => {
                tracing::debug!(title = %title, "candidate has no detail link, skipping");
                return None;
            }
        };
        let car_id = match identity_key(&href) {
            Some(id) => id,
            None => {
                tracing::debug!(title = %title, href = %href, "detail link has no usable path segment");
                return None;
            }
        };

        Some(Record {
            car_id,
            title,
            year,
            mileage: self.labelled_value(fragment, MILEAGE_LABEL),
            price: self.labelled_value(fragment, PRICE_LABEL),
            credit: self.labelled_value(fragment, CREDIT_LABEL),
            fuel: select_text(fragment, &s.fuel),
            engine: select_text(fragment, &s.engine),
            drive: select_text(fragment, &s.drive),
            power: select_text(fragment, &s.power),
            transmission: select_text(fragment, &s.transmission),
            body: select_text(fragment, &s.body),
            link: absolutize(&self.base_url, &href),
        })
    }

    /// Text of the `.car-list__price--value` element directly following the
    /// `.car-list__price--key` whose text contains `label`.
    fn labelled_value(&self, fragment: ElementRef<'_>, label: &str) -> Option<String> {
        fragment
            .select(&self.selectors.price_key)
            .filter(|key| key.text().collect::<String>().contains(label))
            .find_map(|key| {
                let next = key.next_siblings().find_map(ElementRef::wrap)?;
                if next.value().classes().any(|c| c == PRICE_VALUE_CLASS) {
                    non_empty(next.text().collect::<String>())
                } else {
                    None
                }
            })
    }
}

/// Convenience wrapper for a one-off extraction.
pub fn extract_records(html: &str, filter: &ListingFilter, base_url: &str) -> Vec<Record> {
    ListingExtractor::new(filter.clone(), base_url).extract(html)
}

/// Derive the identity key from a detail-page href.
///
/// Query strings and fragments are ignored; trailing slashes do not produce
/// an empty key. The host of an absolute href never counts as a segment.
pub fn identity_key(href: &str) -> Option<String> {
    let path = path_of(href.split(['?', '#']).next().unwrap_or(""));
    path.rsplit('/')
        .find(|segment| !segment.is_empty())
        .filter(|segment| !segment.contains(':'))
        .map(str::to_string)
}

/// Drop the scheme and authority of an absolute or protocol-relative href.
fn path_of(href: &str) -> &str {
    let rest = match href.split_once("://") {
        Some((_, rest)) => rest,
        None => match href.strip_prefix("//") {
            Some(rest) => rest,
            None => return href,
        },
    };
    rest.find('/').map_or("", |i| &rest[i..])
}

/// Keep digits only and parse; zero and overflow are rejected.
pub fn parse_year(raw: &str) -> Option<u32> {
    let digits: String = raw.chars().filter(char::is_ascii_digit).collect();
    digits.parse::<u32>().ok().filter(|y| *y > 0)
}

fn absolutize(base_url: &str, href: &str) -> String {
    if href.starts_with("http://") || href.starts_with("https://") {
        href.to_string()
    } else if href.starts_with('/') {
        format!("{}{}", base_url.trim_end_matches('/'), href)
    } else {
        format!("{}/{}", base_url.trim_end_matches('/'), href)
    }
}

fn select_text(fragment: ElementRef<'_>, selector: &Selector) -> Option<String> {
    fragment
        .select(selector)
        .next()
        .and_then(|el| non_empty(el.text().collect::<String>()))
}

fn select_attr(fragment: ElementRef<'_>, selector: &Selector, attr: &str) -> Option<String> {
    fragment
        .select(selector)
        .next()
        .and_then(|el| el.value().attr(attr))
        .and_then(|v| non_empty(v.to_string()))
}

fn non_empty(text: String) -> Option<String> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn filter() -> ListingFilter {
        ListingFilter {
            min_year: 2020,
            models: vec!["CX-5".to_string(), "CX-30".to_string()],
        }
    }

    fn item(title: &str, year: &str, href: Option<&str>) -> String {
        let link = href
            .map(|h| format!(r#"<a class="car-list__item--button" href="{h}">Детальніше</a>"#))
            .unwrap_or_default();
        format!(
            r#"<div class="car-list__item">
                <div class="car-list__car--title"> {title} </div>
                <div class="car-list__price">
                    <span class="car-list__price--key">Рік:</span>
                    <span class="car-list__price--value">{year}</span>
                    <span class="car-list__price--key">Пробіг:</span>
                    <span class="car-list__price--value">12 000 км</span>
                    <span class="car-list__price--key">Ціна:</span>
                    <span class="car-list__price--value">1 250 000 грн</span>
                </div>
                <div class="car-list__option-fuel">
                    <span class="car-list__option--key">Бензин</span>
                    <span class="car-list__option--value">2.5 л</span>
                </div>
                <div class="car-list__option-drive">
                    <span class="car-list__option--key">Повний</span>
                    <span class="car-list__option--value">194 к.с.</span>
                </div>
                {link}
            </div>"#
        )
    }

    fn page(items: &[String]) -> String {
        format!("<html><body><div class=\"car-list\">{}</div></body></html>", items.join("\n"))
    }

    #[test]
    fn test_example_scenario_only_first_qualifies() {
        let html = page(&[
            item("Mazda CX-5 2022", "2022", Some("/ua/used-cars/cx5-1001")),
            item("Mazda CX-30 2019", "2019", Some("/ua/used-cars/cx30-1002")),
            item("Mazda 3 2023", "2023", Some("/ua/used-cars/m3-1003")),
        ]);
        let records = extract_records(&html, &filter(), "https://dealer.example");
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].title, "Mazda CX-5 2022");
        assert_eq!(records[0].car_id, "cx5-1001");
        assert_eq!(records[0].link, "https://dealer.example/ua/used-cars/cx5-1001");
    }

    #[test]
    fn test_fields_are_extracted_and_trimmed() {
        let html = page(&[item("Mazda CX-30", "2021 р.", Some("/cars/abc"))]);
        let records = extract_records(&html, &filter(), "https://dealer.example/");
        let r = &records[0];
        assert_eq!(r.year, 2021);
        assert_eq!(r.title, "Mazda CX-30");
        assert_eq!(r.mileage.as_deref(), Some("12 000 км"));
        assert_eq!(r.price.as_deref(), Some("1 250 000 грн"));
        assert_eq!(r.credit, None);
        assert_eq!(r.fuel.as_deref(), Some("Бензин"));
        assert_eq!(r.engine.as_deref(), Some("2.5 л"));
        assert_eq!(r.drive.as_deref(), Some("Повний"));
        assert_eq!(r.power.as_deref(), Some("194 к.с."));
        assert_eq!(r.transmission, None);
        assert_eq!(r.body, None);
    }

    #[test]
    fn test_candidate_without_link_is_dropped() {
        let html = page(&[item("Mazda CX-5", "2023", None)]);
        assert!(extract_records(&html, &filter(), "https://dealer.example").is_empty());
    }

    #[test]
    fn test_missing_year_rejects_fragment() {
        let html = r#"<div class="car-list__item">
            <div class="car-list__car--title">Mazda CX-5</div>
            <a class="car-list__item--button" href="/cars/x1">go</a>
        </div>"#;
        assert!(extract_records(html, &filter(), "https://dealer.example").is_empty());
    }

    #[test]
    fn test_empty_and_malformed_documents_yield_nothing() {
        assert!(extract_records("", &filter(), "https://d").is_empty());
        assert!(extract_records("<div><<<not html", &filter(), "https://d").is_empty());
    }

    #[test]
    fn test_every_record_satisfies_filter() {
        let html = page(&[
            item("Mazda CX-5", "2020", Some("/a/1")),
            item("Mazda CX-5", "2019", Some("/a/2")),
            item("Mazda CX-30", "2024", Some("/a/3")),
            item("Mazda MX-5", "2024", Some("/a/4")),
            item("Mazda CX-60", "2024", Some("/a/5")),
        ]);
        let f = filter();
        let records = extract_records(&html, &f, "https://d");
        assert_eq!(records.len(), 2);
        for r in &records {
            assert!(r.year >= f.min_year);
            assert!(f.models.iter().any(|m| r.title.contains(m.as_str())));
        }
    }

    #[test]
    fn test_identity_keys_are_stable_across_runs() {
        let html = page(&[
            item("Mazda CX-5", "2022", Some("/a/1")),
            item("Mazda CX-30", "2022", Some("/a/2/")),
        ]);
        let extractor = ListingExtractor::new(filter(), "https://d");
        let first: Vec<String> = extractor.extract(&html).into_iter().map(|r| r.car_id).collect();
        let second: Vec<String> = extractor.extract(&html).into_iter().map(|r| r.car_id).collect();
        assert_eq!(first, vec!["1".to_string(), "2".to_string()]);
        assert_eq!(first, second);
    }

    #[test]
    fn test_identity_key() {
        assert_eq!(identity_key("/ua/used-cars/cx-5-4821"), Some("cx-5-4821".into()));
        assert_eq!(identity_key("/ua/used-cars/cx-5-4821/"), Some("cx-5-4821".into()));
        assert_eq!(identity_key("/cars/77?utm=x#top"), Some("77".into()));
        assert_eq!(identity_key("https://dealer.example/cars/9"), Some("9".into()));
        assert_eq!(identity_key("/"), None);
        assert_eq!(identity_key(""), None);
    }

    #[test]
    fn test_identity_key_ignores_host_of_pathless_href() {
        assert_eq!(identity_key("https://dealer.example"), None);
        assert_eq!(identity_key("https://dealer.example/"), None);
        assert_eq!(identity_key("https://dealer.example?id=4"), None);
        assert_eq!(identity_key("//dealer.example"), None);
        assert_eq!(identity_key("//dealer.example/cars/12"), Some("12".into()));

        let html = page(&[
            item("Mazda CX-5", "2022", Some("https://dealer.example")),
            item("Mazda CX-30", "2022", Some("https://dealer.example/")),
        ]);
        assert!(ListingExtractor::new(filter(), "https://d").extract(&html).is_empty());
    }

    #[test]
    fn test_parse_year() {
        assert_eq!(parse_year("2022"), Some(2022));
        assert_eq!(parse_year(" 2021 р. "), Some(2021));
        assert_eq!(parse_year("н/д"), None);
        assert_eq!(parse_year("0"), None);
        assert_eq!(parse_year("99999999999999"), None);
    }

    #[test]
    fn test_absolute_href_is_kept() {
        assert_eq!(absolutize("https://a.example", "https://b.example/x"), "https://b.example/x");
        assert_eq!(absolutize("https://a.example/", "x/1"), "https://a.example/x/1");
    }
}
