/// Title and flattened visible text of one page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractedPage {
    /// The URL as requested, before redirects.
    pub url: String,
    pub title: String,
    pub text: String,
}
