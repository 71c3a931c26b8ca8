pub mod facts;
pub mod html;
pub mod response;


use crate::browser::RenderedPage;
use crate::model::PageMetadata;

/// Everything derived from one page snapshot without calling a collaborator
#[derive(Debug, Clone)]
pub struct ParsedPage {
    /// Minimized markup used in prompts and persisted with the page record
    pub minimized: String,
    /// Hash of `minimized`
    pub content_hash: String,
    /// Structural facts as metadata
    pub facts: PageMetadata,
}

/// Main parser entry point for rendered pages
pub struct Parser;

impl Parser {
    /// Minimizes markup and hashes it; cheap enough to run on every visit
    pub fn fingerprint(page: &RenderedPage) -> (String, String) {
        let minimized = html::minimize(&page.source);
        let hash = crate::utils::content_hash(&minimized);
        (minimized, hash)
    }

    /// Minimized markup, content hash and structural facts of a snapshot
    pub fn parse(page: &RenderedPage) -> ParsedPage {
        let (minimized, content_hash) = Self::fingerprint(page);
        let facts = facts::extract(page).to_metadata();
        ParsedPage {
            minimized,
            content_hash,
            facts,
        }
    }

    /// Anchor targets of a snapshot in document order
    pub fn links(page: &RenderedPage) -> Vec<String> {
        html::parse_links_only(&page.source)
    }
}
