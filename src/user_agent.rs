//! User-Agent string sent with every request.
//!
//! Several IIIF image servers answer 403 to anything that does not look like
//! a browser, so requests identify as one.

/// Browser User-Agent used for manifest, image and info.json requests.
pub const BROWSER_USER_AGENT: &str = "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) \
    AppleWebKit/537.36 (KHTML, like Gecko) Chrome/131.0.0.0 Safari/537.36";
