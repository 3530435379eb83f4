use serde::Serialize;
use serde_json::{json, Value};
use std::time::Duration;

use crate::models::profile::{Profile, DEFAULT_SHOPIFY_API_VERSION};
use crate::seo::build_alt_text;

const USER_AGENT: &str = "blogsmith/0.1";
const TIMEOUT_SECS: u64 = 30;
/// Largest page the Admin API returns for products.
const PRODUCT_PAGE_LIMIT: u32 = 250;
pub const DEFAULT_AUTHOR: &str = "SEO Generator App";

/// Store address, Admin API token and version for one shop.
#[derive(Clone, PartialEq)]
pub struct ShopifyCredentials {
    pub store_url: String,
    pub api_token: String,
    pub api_version: String,
}

impl std::fmt::Debug for ShopifyCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ShopifyCredentials")
            .field("store_url", &self.store_url)
            .field("api_token", &crate::ai::redact(&self.api_token))
            .field("api_version", &self.api_version)
            .finish()
    }
}

impl ShopifyCredentials {
    /// Credentials of a profile, `None` unless both URL and token are set.
    pub fn from_profile(profile: &Profile) -> Option<Self> {
        Self::new(
            &profile.shopify_store_url,
            &profile.shopify_api_token,
            profile.api_version(),
        )
    }

    pub fn new(store_url: &str, api_token: &str, api_version: &str) -> Option<Self> {
        let store_url = normalize_store_url(store_url);
        let api_token = api_token.trim();
        if store_url.is_empty() || api_token.is_empty() {
            return None;
        }
        let api_version = match api_version.trim() {
            "" => DEFAULT_SHOPIFY_API_VERSION,
            v => v,
        };
        Some(ShopifyCredentials {
            store_url,
            api_token: api_token.to_string(),
            api_version: api_version.to_string(),
        })
    }

    fn api_url(&self, path: &str) -> String {
        format!(
            "https://{}/admin/api/{}/{}",
            self.store_url, self.api_version, path
        )
    }

    pub fn article_admin_url(&self, blog_id: i64, article_id: i64) -> String {
        format!(
            "https://{}/admin/blogs/{}/articles/{}",
            self.store_url, blog_id, article_id
        )
    }
}

/// Bare `<shop>.myshopify.com` host: no scheme, port, path or query.
/// Any other host gets the `.myshopify.com` suffix.
pub fn normalize_store_url(input: &str) -> String {
    let input = input.trim();
    if input.is_empty() {
        return String::new();
    }
    let with_scheme = if input.contains("://") {
        input.to_string()
    } else {
        format!("https://{}", input)
    };
    let host = match url::Url::parse(&with_scheme) {
        Ok(parsed) => parsed
            .host_str()
            .map(|h| h.trim_end_matches('.').to_string())
            .unwrap_or_default(),
        Err(_) => return String::new(),
    };
    if host.is_empty() || host.ends_with(".myshopify.com") {
        host
    } else {
        format!("{}.myshopify.com", host)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ShopInfo {
    pub shop_name: String,
    pub domain: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Blog {
    pub id: i64,
    pub title: String,
}

/// A product as listed by the Admin API.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ShopifyProduct {
    pub id: i64,
    pub title: String,
    pub handle: String,
    pub vendor: String,
    pub product_type: String,
    pub status: String,
    pub image_url: Option<String>,
}

/// Article payload sent to Shopify. Always created as a draft.
#[derive(Debug, Clone, PartialEq)]
pub struct ArticleDraft {
    pub title: String,
    pub body_html: String,
    pub author: String,
    pub featured_image_url: Option<String>,
}

impl ArticleDraft {
    pub fn to_json(&self) -> Value {
        let mut article = json!({
            "title": self.title,
            "author": self.author,
            "body_html": self.body_html,
            "published": false,
        });
        if let Some(src) = self.featured_image_url.as_deref().filter(|s| !s.trim().is_empty()) {
            article["image"] = json!({
                "src": src.trim(),
                "alt": build_alt_text(&self.title),
            });
        }
        json!({ "article": article })
    }
}

/// The Admin API calls publishing needs.
pub trait ShopifyApi {
    fn shop(&self) -> Result<ShopInfo, String>;
    fn blogs(&self) -> Result<Vec<Blog>, String>;
    /// First page of the shop's products.
    fn products(&self) -> Result<Vec<ShopifyProduct>, String>;
    /// Create the article and return its id.
    fn create_article(&self, blog_id: i64, draft: &ArticleDraft) -> Result<i64, String>;
    fn article_admin_url(&self, blog_id: i64, article_id: i64) -> String;
}

pub struct ShopifyClient {
    credentials: ShopifyCredentials,
}

impl ShopifyClient {
    pub fn new(credentials: ShopifyCredentials) -> Self {
        ShopifyClient { credentials }
    }

    fn http(&self) -> Result<reqwest::blocking::Client, String> {
        reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(TIMEOUT_SECS))
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| format!("HTTP client error: {}", e))
    }

    fn get(&self, path: &str) -> Result<Value, String> {
        let url = self.credentials.api_url(path);
        log::debug!("[shopify] GET {}", url);
        let resp = self
            .http()?
            .get(&url)
            .header("X-Shopify-Access-Token", &self.credentials.api_token)
            .send()
            .map_err(|e| format!("Cannot connect to {}: {}", self.credentials.store_url, e))?;
        read_json(resp)
    }
}

/// Turn a Shopify response into JSON or a readable error.
fn read_json(resp: reqwest::blocking::Response) -> Result<Value, String> {
    let status = resp.status();
    if status.is_success() {
        return resp
            .json()
            .map_err(|e| format!("Shopify JSON parse error: {}", e));
    }
    let text = resp.text().unwrap_or_default();
    let detail = serde_json::from_str::<Value>(&text)
        .ok()
        .and_then(|v| v.get("errors").cloned())
        .map(|e| match e {
            Value::String(s) => s,
            other => other.to_string(),
        })
        .unwrap_or(text);
    Err(match status.as_u16() {
        401 => format!(
            "Authentication failed (401): {}. Check that the API token has the read_content and write_content scopes.",
            detail
        ),
        404 => "Store not found (404): check the store URL.".to_string(),
        code => format!("Shopify returned {}: {}", code, detail),
    })
}

impl ShopifyApi for ShopifyClient {
    fn shop(&self) -> Result<ShopInfo, String> {
        let json = self.get("shop.json")?;
        let shop = json.get("shop").cloned().unwrap_or(Value::Null);
        Ok(ShopInfo {
            shop_name: shop.get("name").and_then(|v| v.as_str()).unwrap_or("").to_string(),
            domain: shop.get("domain").and_then(|v| v.as_str()).unwrap_or("").to_string(),
        })
    }

    fn blogs(&self) -> Result<Vec<Blog>, String> {
        let json = self.get("blogs.json")?;
        Ok(parse_blogs(&json))
    }

    fn products(&self) -> Result<Vec<ShopifyProduct>, String> {
        let json = self.get(&format!("products.json?limit={}", PRODUCT_PAGE_LIMIT))?;
        Ok(parse_products(&json))
    }

    fn create_article(&self, blog_id: i64, draft: &ArticleDraft) -> Result<i64, String> {
        let url = self
            .credentials
            .api_url(&format!("blogs/{}/articles.json", blog_id));
        log::info!("[shopify] Creating draft \"{}\" in blog {}", draft.title, blog_id);
        let resp = self
            .http()?
            .post(&url)
            .header("X-Shopify-Access-Token", &self.credentials.api_token)
            .header("Content-Type", "application/json")
            .json(&draft.to_json())
            .send()
            .map_err(|e| format!("Cannot connect to {}: {}", self.credentials.store_url, e))?;
        let json = read_json(resp)?;
        json.get("article")
            .and_then(|a| a.get("id"))
            .and_then(|id| id.as_i64())
            .ok_or_else(|| "Shopify did not return an article id".to_string())
    }

    fn article_admin_url(&self, blog_id: i64, article_id: i64) -> String {
        self.credentials.article_admin_url(blog_id, article_id)
    }
}

fn parse_blogs(json: &Value) -> Vec<Blog> {
    json.get("blogs")
        .and_then(|b| b.as_array())
        .map(|blogs| {
            blogs
                .iter()
                .filter_map(|b| {
                    let id = b.get("id")?.as_i64()?;
                    let title = b
                        .get("title")
                        .and_then(|t| t.as_str())
                        .map(String::from)
                        .unwrap_or_else(|| format!("Unknown Blog (ID: {})", id));
                    Some(Blog { id, title })
                })
                .collect()
        })
        .unwrap_or_default()
}

fn parse_products(json: &Value) -> Vec<ShopifyProduct> {
    let text = |p: &Value, key: &str| {
        p.get(key)
            .and_then(|v| v.as_str())
            .unwrap_or("")
            .to_string()
    };
    json.get("products")
        .and_then(|p| p.as_array())
        .map(|products| {
            products
                .iter()
                .filter_map(|p| {
                    Some(ShopifyProduct {
                        id: p.get("id")?.as_i64()?,
                        title: text(p, "title"),
                        handle: text(p, "handle"),
                        vendor: text(p, "vendor"),
                        product_type: text(p, "product_type"),
                        status: text(p, "status"),
                        image_url: p
                            .get("image")
                            .and_then(|i| i.get("src"))
                            .and_then(|s| s.as_str())
                            .map(String::from),
                    })
                })
                .collect()
        })
        .unwrap_or_default()
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PublishedArticle {
    pub article_id: i64,
    pub admin_url: String,
    pub blog_id: i64,
    pub blog_title: String,
    pub status: &'static str,
}

#[derive(Debug, Clone, PartialEq)]
pub enum PublishOutcome {
    Published(PublishedArticle),
    /// Several blogs exist and none was picked.
    ChooseBlog(Vec<Blog>),
}

/// Publish a draft article.
///
/// With a `blog_id` the article goes there. Without one it goes to the only
/// blog of the shop, or the blogs are returned for the caller to choose.
pub fn publish(
    api: &dyn ShopifyApi,
    draft: &ArticleDraft,
    blog_id: Option<i64>,
) -> Result<PublishOutcome, String> {
    if draft.title.trim().is_empty() || draft.body_html.trim().is_empty() {
        return Err("Title and body content are required".into());
    }

    let blogs = api.blogs()?;
    let target = match blog_id {
        Some(id) => blogs
            .iter()
            .find(|b| b.id == id)
            .cloned()
            .unwrap_or(Blog {
                id,
                title: format!("Blog {}", id),
            }),
        None => match blogs.len() {
            0 => {
                return Err(
                    "No blogs found in the Shopify store. Create a blog in Shopify admin first."
                        .into(),
                )
            }
            1 => blogs[0].clone(),
            _ => return Ok(PublishOutcome::ChooseBlog(blogs)),
        },
    };

    let article_id = api.create_article(target.id, draft)?;
    Ok(PublishOutcome::Published(PublishedArticle {
        article_id,
        admin_url: api.article_admin_url(target.id, article_id),
        blog_id: target.id,
        blog_title: target.title,
        status: "Kladde",
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[test]
    fn test_normalize_store_url() {
        assert_eq!(normalize_store_url("https://butik.myshopify.com/"), "butik.myshopify.com");
        assert_eq!(normalize_store_url("butik"), "butik.myshopify.com");
        assert_eq!(normalize_store_url(" http://butik/admin "), "butik.myshopify.com");
        assert_eq!(normalize_store_url(""), "");
    }

    #[test]
    fn test_normalize_store_url_messy_input() {
        assert_eq!(normalize_store_url("HTTPS://Butik.myshopify.com"), "butik.myshopify.com");
        assert_eq!(normalize_store_url("butik.myshopify.com?ref=x"), "butik.myshopify.com");
        assert_eq!(
            normalize_store_url("https://butik.myshopify.com:443/admin"),
            "butik.myshopify.com"
        );
    }

    #[test]
    fn test_credentials_require_url_and_token() {
        assert!(ShopifyCredentials::new("butik", "", "").is_none());
        let creds = ShopifyCredentials::new("butik", "shpat_0123456789abcdef", "").unwrap();
        assert_eq!(creds.api_version, DEFAULT_SHOPIFY_API_VERSION);
        assert_eq!(
            creds.api_url("shop.json"),
            "https://butik.myshopify.com/admin/api/2023-10/shop.json"
        );
        assert!(!format!("{:?}", creds).contains("shpat_0123456789abcdef"));
    }

    #[test]
    fn test_draft_payload_with_image() {
        let draft = ArticleDraft {
            title: "Sådan vælger du en vinterjakke? Vores guide".into(),
            body_html: "<p>Tekst</p>".into(),
            author: DEFAULT_AUTHOR.into(),
            featured_image_url: Some("https://cdn.example.com/a.jpg".into()),
        };
        let json = draft.to_json();
        assert_eq!(json["article"]["published"], false);
        assert_eq!(json["article"]["image"]["alt"], "Guide til sådan vælger du en vinterjakke");

        let plain = ArticleDraft { featured_image_url: None, ..draft };
        assert!(plain.to_json()["article"].get("image").is_none());
    }

    #[test]
    fn test_parse_blogs() {
        let json = json!({"blogs": [{"id": 7, "title": "Nyheder"}, {"id": 9}, {"title": "no id"}]});
        let blogs = parse_blogs(&json);
        assert_eq!(blogs.len(), 2);
        assert_eq!(blogs[1].title, "Unknown Blog (ID: 9)");
    }

    #[test]
    fn test_parse_products() {
        let json = json!({"products": [
            {
                "id": 632910392,
                "title": "Egetræsbord",
                "handle": "egetraesbord",
                "vendor": "Møbelhuset",
                "product_type": "Borde",
                "status": "active",
                "image": {"src": "https://cdn.shopify.com/bord.jpg"}
            },
            {"id": 632910393, "title": "Stol", "image": null},
            {"title": "no id"}
        ]});
        let products = parse_products(&json);
        assert_eq!(products.len(), 2);
        assert_eq!(products[0].handle, "egetraesbord");
        assert_eq!(products[0].image_url.as_deref(), Some("https://cdn.shopify.com/bord.jpg"));
        assert_eq!(products[1].vendor, "");
        assert_eq!(products[1].image_url, None);
        assert!(parse_products(&json!({"errors": "Not Found"})).is_empty());
    }

    struct FakeShop {
        blogs: Vec<Blog>,
        created: Mutex<Vec<i64>>,
    }

    impl ShopifyApi for FakeShop {
        fn shop(&self) -> Result<ShopInfo, String> {
            Ok(ShopInfo { shop_name: "Butik".into(), domain: "butik.dk".into() })
        }
        fn blogs(&self) -> Result<Vec<Blog>, String> {
            Ok(self.blogs.clone())
        }
        fn products(&self) -> Result<Vec<ShopifyProduct>, String> {
            Ok(vec![])
        }
        fn create_article(&self, blog_id: i64, _draft: &ArticleDraft) -> Result<i64, String> {
            self.created.lock().unwrap().push(blog_id);
            Ok(1000 + blog_id)
        }
        fn article_admin_url(&self, blog_id: i64, article_id: i64) -> String {
            format!("admin/{}/{}", blog_id, article_id)
        }
    }

    fn draft() -> ArticleDraft {
        ArticleDraft {
            title: "Titel".into(),
            body_html: "<p>x</p>".into(),
            author: DEFAULT_AUTHOR.into(),
            featured_image_url: None,
        }
    }

    fn blog(id: i64, title: &str) -> Blog {
        Blog { id, title: title.into() }
    }

    #[test]
    fn test_publish_single_blog() {
        let shop = FakeShop { blogs: vec![blog(3, "Nyheder")], created: Mutex::new(vec![]) };
        match publish(&shop, &draft(), None).unwrap() {
            PublishOutcome::Published(a) => {
                assert_eq!(a.article_id, 1003);
                assert_eq!(a.blog_title, "Nyheder");
                assert_eq!(a.admin_url, "admin/3/1003");
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_publish_asks_for_blog_when_several() {
        let shop = FakeShop {
            blogs: vec![blog(3, "Nyheder"), blog(4, "Guides")],
            created: Mutex::new(vec![]),
        };
        assert_eq!(
            publish(&shop, &draft(), None).unwrap(),
            PublishOutcome::ChooseBlog(vec![blog(3, "Nyheder"), blog(4, "Guides")])
        );
        assert!(shop.created.lock().unwrap().is_empty());

        publish(&shop, &draft(), Some(4)).unwrap();
        assert_eq!(*shop.created.lock().unwrap(), vec![4]);
    }

    #[test]
    fn test_publish_errors() {
        let shop = FakeShop { blogs: vec![], created: Mutex::new(vec![]) };
        assert!(publish(&shop, &draft(), None).unwrap_err().contains("No blogs"));
        let empty = ArticleDraft { body_html: " ".into(), ..draft() };
        assert!(publish(&shop, &empty, Some(1)).is_err());
    }
}
