use chrono::Utc;
use scout_core::error::AppError;
use scout_core::models::CompanyInfo;
use scout_core::traits::{Cleaner, CompanyCrawler, Driver};
use scraper::{ElementRef, Html, Selector};
use url::Url;

use crate::cleaner::HtmdCleaner;

/// Crawls a company page through the shared browser driver.
///
/// Identity comes from OpenGraph / `<meta>` / `<title>` tags, structured
/// facts from `<dt>`/`<dd>` pairs (the layout of public LinkedIn company
/// pages), and `about_us` from the page body converted to Markdown.
#[derive(Clone, Default)]
pub struct PageCrawler<C: Cleaner = HtmdCleaner> {
    cleaner: C,
}

impl PageCrawler<HtmdCleaner> {
    pub fn new() -> Self {
        Self::default()
    }
}

impl<C: Cleaner> CompanyCrawler for PageCrawler<C> {
    async fn crawl<D: Driver>(
        &self,
        driver: &mut D,
        company_name: &str,
        linkedin_url: &str,
    ) -> Result<CompanyInfo, AppError> {
        let target = validate_url(linkedin_url)?;

        tracing::debug!(company = %company_name, url = %target, "Loading company page");
        let html = driver.load(target.as_str()).await?;
        if html.trim().is_empty() {
            return Err(AppError::BrowserError(format!("Empty page source for {target}")));
        }

        let page = parse_page(&html, &target);
        let name = page.name.ok_or_else(|| {
            AppError::ParseError(format!("No company name found on {target}"))
        })?;

        let about_us = match page.body_html {
            Some(body) => self.cleaner.clean(&body)?,
            None => String::new(),
        };

        Ok(CompanyInfo {
            name,
            description: page.description.unwrap_or_default(),
            logo_url: page.logo_url.unwrap_or_default(),
            website: page.website.unwrap_or_default(),
            about_us,
            company_size: page.facts.company_size,
            headquarters: page.facts.headquarters,
            industry: page.facts.industry,
            specialties: page.facts.specialties,
            linkedin_url: linkedin_url.to_string(),
            last_crawled_at: Utc::now(),
            ..Default::default()
        })
    }
}

/// Only absolute `http`/`https` URLs with a host are crawled.
fn validate_url(url: &str) -> Result<Url, AppError> {
    let parsed = Url::parse(url.trim())
        .map_err(|e| AppError::HttpError(format!("Invalid URL '{url}': {e}")))?;

    match parsed.scheme() {
        "http" | "https" => {}
        scheme => {
            return Err(AppError::HttpError(format!(
                "URL scheme '{scheme}' is not allowed (only http/https)"
            )));
        }
    }

    if parsed.host_str().is_none() {
        return Err(AppError::HttpError("URL has no host".to_string()));
    }

    Ok(parsed)
}

#[derive(Debug, Default)]
struct PageFacts {
    industry: String,
    company_size: String,
    headquarters: String,
    specialties: String,
    website: Option<String>,
}

#[derive(Debug, Default)]
struct ParsedPage {
    name: Option<String>,
    description: Option<String>,
    logo_url: Option<String>,
    website: Option<String>,
    body_html: Option<String>,
    facts: PageFacts,
}

/// Extracts everything the crawler needs in one synchronous pass, so the
/// non-`Send` DOM never lives across an await point.
fn parse_page(html: &str, base: &Url) -> ParsedPage {
    let document = Html::parse_document(html);

    let name = meta_content(&document, "meta[property='og:title']")
        .or_else(|| first_text(&document, "title"))
        .or_else(|| first_text(&document, "h1"))
        .map(|t| strip_site_suffix(&t))
        .filter(|t| !t.is_empty());

    let description = meta_content(&document, "meta[property='og:description']")
        .or_else(|| meta_content(&document, "meta[name='description']"));

    let logo_url = meta_content(&document, "meta[property='og:image']")
        .and_then(|src| absolute_url(base, &src));

    let facts = definition_facts(&document, base);

    // A canonical URL on the crawled host is the page itself, not the
    // company's own site.
    let website = facts.website.clone().or_else(|| {
        meta_content(&document, "meta[property='og:url']")
            .or_else(|| attr_of(&document, "link[rel='canonical']", "href"))
            .and_then(|href| absolute_url(base, &href))
            .filter(|href| !same_host(base, href))
    });

    let body_html = ["main", "article", "[role='main']", "body"]
        .iter()
        .filter_map(|s| Selector::parse(s).ok())
        .find_map(|selector| document.select(&selector).next().map(|el| el.html()));

    ParsedPage {
        name,
        description,
        logo_url,
        website,
        body_html,
        facts,
    }
}

fn meta_content(document: &Html, selector: &str) -> Option<String> {
    attr_of(document, selector, "content")
}

fn attr_of(document: &Html, selector: &str, attr: &str) -> Option<String> {
    let selector = Selector::parse(selector).ok()?;
    document
        .select(&selector)
        .filter_map(|el| el.value().attr(attr))
        .map(|v| v.trim().to_string())
        .find(|v| !v.is_empty())
}

fn first_text(document: &Html, selector: &str) -> Option<String> {
    let selector = Selector::parse(selector).ok()?;
    document
        .select(&selector)
        .map(element_text)
        .find(|t| !t.is_empty())
}

fn element_text(el: ElementRef<'_>) -> String {
    el.text()
        .flat_map(str::split_whitespace)
        .collect::<Vec<_>>()
        .join(" ")
}

/// `"Acme Corp | LinkedIn"` → `"Acme Corp"`.
fn strip_site_suffix(title: &str) -> String {
    let title = title.trim();
    for sep in [" | ", " - ", " – "] {
        if let Some((head, _)) = title.rsplit_once(sep) {
            return head.trim().to_string();
        }
    }
    title.to_string()
}

fn absolute_url(base: &Url, href: &str) -> Option<String> {
    let resolved = base.join(href).ok()?;
    matches!(resolved.scheme(), "http" | "https").then(|| resolved.to_string())
}

fn same_host(base: &Url, href: &str) -> bool {
    Url::parse(href).is_ok_and(|u| u.host_str() == base.host_str())
}

/// Reads `<dt>Label</dt><dd>Value</dd>` pairs.
fn definition_facts(document: &Html, base: &Url) -> PageFacts {
    let mut facts = PageFacts::default();
    let Ok(dt) = Selector::parse("dt") else {
        return facts;
    };

    for term in document.select(&dt) {
        let Some(definition) = term
            .next_siblings()
            .filter_map(ElementRef::wrap)
            .next()
            .filter(|el| el.value().name() == "dd")
        else {
            continue;
        };

        let value = element_text(definition);
        if value.is_empty() {
            continue;
        }

        match element_text(term).to_lowercase().as_str() {
            "industry" | "industries" => facts.industry = value,
            "company size" | "size" => facts.company_size = value,
            "headquarters" => facts.headquarters = value,
            "specialties" => facts.specialties = value,
            "website" => {
                facts.website = absolute_url(base, &value);
            }
            _ => {}
        }
    }

    facts
}
