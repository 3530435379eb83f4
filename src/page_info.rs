use scraper::{Html, Selector};
use serde::Serialize;
use std::time::Duration;

const USER_AGENT: &str = "blogsmith/0.1";
const TIMEOUT_SECS: u64 = 10;
/// A first paragraph used as description is cut to this many chars.
const PARAGRAPH_CHARS: usize = 200;
pub const UNKNOWN_PRODUCT: &str = "Unknown Product";

/// Product entry built from a web page, ready to add to a profile.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PageProduct {
    pub name: String,
    pub url: String,
    pub description: String,
}

/// Downloads the HTML of a page.
pub trait PageFetcher {
    fn fetch(&self, url: &str) -> Result<String, String>;
}

pub struct HttpFetcher;

impl PageFetcher for HttpFetcher {
    fn fetch(&self, url: &str) -> Result<String, String> {
        let parsed = url::Url::parse(url).map_err(|e| format!("Invalid URL: {}", e))?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(format!("Unsupported URL scheme: {}", parsed.scheme()));
        }
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(TIMEOUT_SECS))
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| format!("HTTP client error: {}", e))?;
        log::debug!("[pages] GET {}", parsed);
        client
            .get(parsed)
            .send()
            .and_then(|resp| resp.text())
            .map_err(|e| e.to_string())
    }
}

fn collapse(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Name and description of a product page.
///
/// The name is the page `<title>`. The description is the `description`
/// meta tag, else the first non-empty paragraph cut to 200 chars.
pub fn product_from_html(url: &str, html: &str) -> PageProduct {
    let document = Html::parse_document(html);

    let name = Selector::parse("title")
        .ok()
        .and_then(|sel| document.select(&sel).next())
        .map(|el| collapse(&el.text().collect::<String>()))
        .filter(|t| !t.is_empty())
        .unwrap_or_else(|| UNKNOWN_PRODUCT.to_string());

    let meta = Selector::parse("meta[name][content]").ok().and_then(|sel| {
        document
            .select(&sel)
            .find(|el| {
                el.value()
                    .attr("name")
                    .is_some_and(|n| n.eq_ignore_ascii_case("description"))
            })
            .and_then(|el| el.value().attr("content"))
            .map(collapse)
            .filter(|d| !d.is_empty())
    });

    let description = meta
        .or_else(|| {
            let sel = Selector::parse("p").ok()?;
            document
                .select(&sel)
                .map(|el| collapse(&el.text().collect::<String>()))
                .find(|t| !t.is_empty())
                .map(|t| format!("{}...", t.chars().take(PARAGRAPH_CHARS).collect::<String>()))
        })
        .unwrap_or_default();

    PageProduct {
        name,
        url: url.to_string(),
        description,
    }
}

/// One product per non-empty line of `urls`. A page that cannot be fetched
/// yields an entry describing the error, and the remaining lines continue.
pub fn fetch_products(fetcher: &dyn PageFetcher, urls: &str) -> Vec<PageProduct> {
    urls.lines()
        .map(str::trim)
        .filter(|url| !url.is_empty())
        .map(|url| match fetcher.fetch(url) {
            Ok(html) => product_from_html(url, &html),
            Err(e) => {
                log::warn!("[pages] Fetching {} failed: {}", url, e);
                PageProduct {
                    name: format!("Error fetching: {}", url),
                    url: url.to_string(),
                    description: format!("Error: {}", e),
                }
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    struct CannedPages(HashMap<&'static str, &'static str>);

    impl PageFetcher for CannedPages {
        fn fetch(&self, url: &str) -> Result<String, String> {
            self.0
                .get(url)
                .map(|html| html.to_string())
                .ok_or_else(|| "connection refused".to_string())
        }
    }

    #[test]
    fn test_title_and_meta_description() {
        let html = r#"<html><head>
            <title>  Egetræsbord
              | Møbelhuset </title>
            <meta name="Description" content="Massivt egetræ, plads til otte.">
            </head><body><p>Ignoreret</p></body></html>"#;
        let p = product_from_html("https://moebler.dk/bord", html);
        assert_eq!(p.name, "Egetræsbord | Møbelhuset");
        assert_eq!(p.description, "Massivt egetræ, plads til otte.");
        assert_eq!(p.url, "https://moebler.dk/bord");
    }

    #[test]
    fn test_paragraph_fallback_is_cut() {
        let long = "ord ".repeat(100);
        let html = format!("<html><body><p> </p><p>{}</p></body></html>", long);
        let p = product_from_html("u", &html);
        assert_eq!(p.name, UNKNOWN_PRODUCT);
        assert_eq!(p.description.chars().count(), PARAGRAPH_CHARS + 3);
        assert!(p.description.ends_with("..."));

        assert_eq!(product_from_html("u", "<html></html>").description, "");
    }

    #[test]
    fn test_fetch_products_keeps_going_after_errors() {
        let pages = CannedPages(HashMap::from([(
            "https://moebler.dk/stol",
            "<title>Stol</title><meta name=\"description\" content=\"Let stol\">",
        )]));
        let out = fetch_products(&pages, "https://nede.dk\n\n  https://moebler.dk/stol  \n");
        assert_eq!(out.len(), 2);
        assert_eq!(out[0].name, "Error fetching: https://nede.dk");
        assert_eq!(out[0].description, "Error: connection refused");
        assert_eq!(out[1].name, "Stol");
        assert_eq!(out[1].description, "Let stol");
    }

    #[test]
    fn test_http_fetcher_rejects_other_schemes() {
        assert!(HttpFetcher.fetch("ftp://moebler.dk/x").unwrap_err().contains("scheme"));
        assert!(HttpFetcher.fetch("moebler.dk").unwrap_err().contains("Invalid URL"));
    }
}
