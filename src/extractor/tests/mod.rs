use reqwest::StatusCode;
use std::fs;
use url::Url;

use crate::extractor::extract_page;
use crate::fetcher::types::{Charset, PageResponse};

#[test]
fn test_extract_article_fixture() {
    let html = fs::read_to_string("src/extractor/tests/fixtures/article.html")
        .expect("Failed to read test fixture");

    let response = create_test_response(html, "https://example.com/article");
    let page = extract_page(&response, "https://example.com/article");

    assert_eq!(page.title, "Sample Article - News Site");
    assert!(page.text.contains("This is the first paragraph of the article."));
    assert!(page.text.contains("related link"));
    assert!(page.text.contains("© 2024 News Site"));
    assert!(!page.text.contains("analytics"));
    assert!(!page.text.contains("display: flex"));
    assert!(page.text.contains("Please enable JavaScript."));
    assert!(!page.text.contains("  "));
}

#[test]
fn test_record_points_at_requested_url_after_redirect() {
    let html = "<html><body><p>Moved content</p></body></html>".to_string();

    let response = create_test_response(html, "https://example.com/final");
    let page = extract_page(&response, "https://example.com/start");

    assert_eq!(page.url, "https://example.com/start");
    assert_eq!(page.title, "https://example.com/start");
    assert_eq!(page.text, "Moved content");
}

fn create_test_response(html: String, url: &str) -> PageResponse {
    PageResponse {
        url_final: Url::parse(url).unwrap(),
        status: StatusCode::OK,
        body_utf8: html,
        charset: Charset::Utf8,
    }
}
