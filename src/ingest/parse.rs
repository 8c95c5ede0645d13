//! Extraction of civic records from scraped HTML.
//!
//! Every function here is pure: HTML text plus the source's selectors in,
//! records out. Selectors that fail to parse are logged and yield no records,
//! which the pipeline reports as `NoRecords`.

use crate::app_config::SourceSelectors;
use chrono::NaiveDate;
use once_cell::sync::Lazy;
use regex::Regex;
use scraper::{ElementRef, Html, Selector};

static WHITESPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").expect("static regex"));

static DATE_FRAGMENT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\d{4}-\d{2}-\d{2}|[A-Z][a-z]+\.? \d{1,2}, \d{4}|\d{1,2} [A-Z][a-z]+ \d{4}")
        .expect("static regex")
});

/// Urban cores. Matched case-insensitively as substrings of a district name.
const URBAN_TOKENS: &[&str] = &[
    "toronto",
    "montreal",
    "montréal",
    "vancouver",
    "calgary",
    "edmonton",
    "ottawa",
    "winnipeg",
    "quebec city",
    "hamilton",
    "halifax",
    "downtown",
    "centre",
];

const SUBURBAN_TOKENS: &[&str] = &[
    "mississauga",
    "brampton",
    "markham",
    "vaughan",
    "richmond hill",
    "oakville",
    "burlington",
    "surrey",
    "burnaby",
    "laval",
    "longueuil",
    "pickering",
    "ajax",
    "whitby",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DistrictType {
    Urban,
    Suburban,
    Rural,
}

impl DistrictType {
    pub fn as_str(&self) -> &'static str {
        match self {
            DistrictType::Urban => "urban",
            DistrictType::Suburban => "suburban",
            DistrictType::Rural => "rural",
        }
    }
}

pub fn classify_district(name: &str) -> DistrictType {
    let lower = name.to_lowercase();
    if URBAN_TOKENS.iter().any(|t| lower.contains(t)) {
        DistrictType::Urban
    } else if SUBURBAN_TOKENS.iter().any(|t| lower.contains(t)) {
        DistrictType::Suburban
    } else {
        DistrictType::Rural
    }
}

/// Parse the first valid date found in `text`. Accepts `2025-04-28`,
/// `April 28, 2025` (also `Apr. 28, 2025`) and `28 April 2025`.
pub fn parse_loose_date(text: &str) -> Option<NaiveDate> {
    DATE_FRAGMENT.find_iter(text).find_map(|m| {
        let fragment = m.as_str().replace('.', "");
        ["%Y-%m-%d", "%B %d, %Y", "%b %d, %Y", "%d %B %Y", "%d %b %Y"]
            .iter()
            .find_map(|fmt| NaiveDate::parse_from_str(&fragment, fmt).ok())
    })
}

/// Collapse runs of whitespace and trim.
pub fn clean_text(text: &str) -> String {
    WHITESPACE.replace_all(text.trim(), " ").into_owned()
}

#[derive(Debug, Clone, PartialEq)]
pub struct ElectionRecord {
    pub title: String,
    pub election_date: NaiveDate,
    pub description: Option<String>,
    pub region: Option<String>,
    pub district_type: Option<DistrictType>,
    pub source_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PoliticianRecord {
    pub name: String,
    pub party: Option<String>,
    pub riding: Option<String>,
    pub district_type: Option<DistrictType>,
    pub source_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LegalActRecord {
    pub title: String,
    pub act_number: Option<String>,
    pub source_url: Option<String>,
}

/// Compiled selector set. Empty field selectors stay `None`.
struct Compiled {
    item: Selector,
    title: Selector,
    date: Option<Selector>,
    detail: Option<Selector>,
    region: Option<Selector>,
    link: Option<Selector>,
}

fn compile_optional(raw: &str) -> Result<Option<Selector>, String> {
    if raw.trim().is_empty() {
        return Ok(None);
    }
    Selector::parse(raw)
        .map(Some)
        .map_err(|e| format!("{}: {:?}", raw, e))
}

fn compile(selectors: &SourceSelectors) -> Option<Compiled> {
    let result = (|| {
        Ok::<_, String>(Compiled {
            item: compile_optional(&selectors.item)?.ok_or("item selector is empty")?,
            title: compile_optional(&selectors.title)?.ok_or("title selector is empty")?,
            date: compile_optional(&selectors.date)?,
            detail: compile_optional(&selectors.detail)?,
            region: compile_optional(&selectors.region)?,
            link: compile_optional(&selectors.link)?,
        })
    })();

    match result {
        Ok(c) => Some(c),
        Err(e) => {
            log::error!("Invalid source selector {}", e);
            None
        }
    }
}

fn field_text(item: &ElementRef, selector: Option<&Selector>) -> Option<String> {
    let el = item.select(selector?).next()?;
    let text = clean_text(&el.text().collect::<String>());
    if text.is_empty() {
        None
    } else {
        Some(text)
    }
}

fn field_link(item: &ElementRef, selector: Option<&Selector>, base: Option<&url::Url>) -> Option<String> {
    let href = item.select(selector?).next()?.value().attr("href")?;
    match base {
        Some(base) => base.join(href).ok().map(|u| u.to_string()),
        None => Some(href.to_string()),
    }
}

fn for_each_item<T>(
    html: &str,
    selectors: &SourceSelectors,
    mut map: impl FnMut(&Compiled, &ElementRef) -> Option<T>,
) -> Vec<T> {
    let compiled = match compile(selectors) {
        Some(c) => c,
        None => return Vec::new(),
    };
    let document = Html::parse_document(html);
    let records = document
        .select(&compiled.item)
        .filter_map(|item| map(&compiled, &item))
        .collect();
    records
}

/// Rows without a title or a recognizable date are dropped.
pub fn parse_elections(html: &str, selectors: &SourceSelectors, page_url: &str) -> Vec<ElectionRecord> {
    let base = url::Url::parse(page_url).ok();

    for_each_item(html, selectors, |c, item| {
        let title = field_text(item, Some(&c.title))?;
        let date_text = field_text(item, c.date.as_ref()).unwrap_or_default();
        let election_date = parse_loose_date(&date_text).or_else(|| parse_loose_date(&title))?;
        let region = field_text(item, c.region.as_ref());

        Some(ElectionRecord {
            district_type: region.as_deref().map(classify_district),
            description: field_text(item, c.detail.as_ref()),
            source_url: field_link(item, c.link.as_ref(), base.as_ref()),
            title,
            election_date,
            region,
        })
    })
}

pub fn parse_politicians(html: &str, selectors: &SourceSelectors, page_url: &str) -> Vec<PoliticianRecord> {
    let base = url::Url::parse(page_url).ok();

    for_each_item(html, selectors, |c, item| {
        let name = field_text(item, Some(&c.title))?;
        let riding = field_text(item, c.region.as_ref());

        Some(PoliticianRecord {
            district_type: riding.as_deref().map(classify_district),
            party: field_text(item, c.detail.as_ref()),
            source_url: field_link(item, c.link.as_ref(), base.as_ref()),
            name,
            riding,
        })
    })
}

pub fn parse_legal_acts(html: &str, selectors: &SourceSelectors, page_url: &str) -> Vec<LegalActRecord> {
    let base = url::Url::parse(page_url).ok();

    for_each_item(html, selectors, |c, item| {
        Some(LegalActRecord {
            title: field_text(item, Some(&c.title))?,
            act_number: field_text(item, c.detail.as_ref()),
            source_url: field_link(item, c.link.as_ref(), base.as_ref()),
        })
    })
}
