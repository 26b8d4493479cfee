//! Resolves one image candidate to a downloaded file.

use std::collections::HashSet;
use std::path::Path;

use tracing::{debug, info, instrument, warn};

use super::tier::{StrategyState, Tier};
use crate::download::Transfer;
use crate::image_api::{ImageInfo, ImageRequest, info_json_uri};
use crate::manifest::{IiifVersion, ImageCandidate};

/// Everything the engine needs to know about one candidate of one page.
#[derive(Debug, Clone, Copy)]
pub struct PageRequest<'a> {
    pub candidate: &'a ImageCandidate,
    /// Declared (or forced) page width, used by width tiers.
    pub width: Option<u32>,
    pub version: IiifVersion,
    pub dest: &'a Path,
    pub referer: Option<&'a str>,
    /// Whether this is the first page of the manifest that reached the
    /// engine; only its failures clear strategy flags.
    pub first_page: bool,
    /// Ask the image service for its dimensions before the service tiers.
    pub query_image_info: bool,
}

/// How a candidate was resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    /// A URI worked and the file was written.
    Downloaded {
        uri: String,
        bytes: u64,
        tier: Tier,
    },
    /// Every enabled tier failed or none applied.
    Exhausted {
        /// Number of requests made.
        attempts: usize,
        /// Message of the last transfer error, if any request was made.
        last_error: Option<String>,
    },
}

/// Tries the enabled tiers in order until one downloads the image.
///
/// Failed attempts are not retried. When `request.first_page` is set, each
/// tier whose attempt fails is disabled in `state` for the rest of the
/// manifest.
#[instrument(
    level = "debug",
    skip_all,
    fields(id = %request.candidate.id, first_page = request.first_page)
)]
pub async fn resolve_page(
    transfer: &dyn Transfer,
    request: &PageRequest<'_>,
    state: &mut StrategyState,
) -> Resolution {
    let candidate = request.candidate;
    let width = effective_width(transfer, request, state).await;
    let canonical_base = ImageRequest::parse(&candidate.id).map(|parsed| parsed.base);

    let mut attempted: HashSet<String> = HashSet::new();
    let mut attempts = 0;
    let mut last_error = None;

    for tier in Tier::ALL {
        if !state.is_enabled(tier) {
            continue;
        }
        if tier.uses_full_size() && !request.version.supports_full_size() {
            continue;
        }
        let Some(uri) = build_uri(tier, candidate, canonical_base.as_deref(), width) else {
            continue;
        };
        if !attempted.insert(uri.clone()) {
            debug!(%tier, uri = %uri, "already attempted for this page");
            continue;
        }

        attempts += 1;
        debug!(%tier, uri = %uri, "attempting");
        match transfer
            .fetch_to_file(&uri, request.dest, request.referer)
            .await
        {
            Ok(bytes) => {
                info!(%tier, uri = %uri, bytes, "page downloaded");
                return Resolution::Downloaded { uri, bytes, tier };
            }
            Err(error) => {
                debug!(%tier, uri = %uri, error = %error, "attempt failed");
                if request.first_page {
                    state.disable(tier);
                    info!(%tier, "strategy disabled for the rest of the manifest");
                }
                last_error = Some(error.to_string());
            }
        }
    }

    Resolution::Exhausted {
        attempts,
        last_error,
    }
}

/// Builds the URI for `tier`, or `None` when the tier does not apply.
fn build_uri(
    tier: Tier,
    candidate: &ImageCandidate,
    canonical_base: Option<&str>,
    width: Option<u32>,
) -> Option<String> {
    if tier == Tier::RawId {
        return Some(candidate.id.clone());
    }

    let base = match tier {
        Tier::ServiceFull | Tier::ServiceMax | Tier::ServiceWidth => candidate.service_id.as_deref()?,
        Tier::CanonicalFull | Tier::CanonicalMax | Tier::CanonicalWidth => canonical_base?,
        Tier::IdentifierFull | Tier::IdentifierMax | Tier::IdentifierWidth => {
            if candidate.service_id.as_deref() == Some(candidate.id.as_str()) {
                return None;
            }
            candidate.id.as_str()
        }
        Tier::RawId => return None,
    };

    let size = match (tier.uses_width(), width) {
        (true, None) => return None,
        (true, Some(w)) => tier.size(w)?,
        (false, _) => tier.size(0)?,
    };
    Some(ImageRequest::full_image(base, size, &candidate.extension).to_string())
}

/// Width for the width tiers, optionally widened by the service's `info.json`.
async fn effective_width(
    transfer: &dyn Transfer,
    request: &PageRequest<'_>,
    state: &StrategyState,
) -> Option<u32> {
    let declared = request.width.filter(|w| *w > 0);
    if !request.query_image_info || state.is_width_fixed() {
        return declared;
    }
    let Some(service) = request.candidate.service_id.as_deref() else {
        return declared;
    };
    if !Tier::ALL
        .into_iter()
        .any(|tier| tier.uses_service() && state.is_enabled(tier))
    {
        return declared;
    }

    let uri = info_json_uri(service);
    let info: ImageInfo = match transfer.fetch_json(&uri, request.referer).await {
        Ok(doc) => match serde_json::from_value(doc) {
            Ok(info) => info,
            Err(error) => {
                warn!(uri = %uri, error = %error, "unreadable image information");
                return declared;
            }
        },
        Err(error) => {
            debug!(uri = %uri, error = %error, "image information unavailable");
            return declared;
        }
    };

    let widest = match (declared, info.deliverable_width()) {
        (Some(d), Some(i)) => Some(d.max(i)),
        (d, i) => d.or(i),
    };
    let width = match (widest, info.max_width) {
        (Some(w), Some(max)) if max > 0 => Some(w.min(max)),
        (w, _) => w,
    };
    if width != declared {
        debug!(declared = ?declared, width = ?width, "width taken from image information");
    }
    width
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::collections::HashMap;
    use std::sync::Mutex;

    use async_trait::async_trait;
    use serde_json::{Value, json};

    use super::*;
    use crate::download::DownloadError;

    /// Records every request; only listed URIs succeed.
    #[derive(Default)]
    struct FakeTransfer {
        ok: HashSet<String>,
        json: HashMap<String, Value>,
        calls: Mutex<Vec<String>>,
    }

    impl FakeTransfer {
        fn succeeding(uris: &[&str]) -> Self {
            Self {
                ok: uris.iter().map(|u| (*u).to_string()).collect(),
                ..Self::default()
            }
        }

        fn calls(&self) -> Vec<String> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl Transfer for FakeTransfer {
        async fn fetch_json(&self, url: &str, _referer: Option<&str>) -> Result<Value, DownloadError> {
            self.calls.lock().unwrap().push(url.to_string());
            self.json
                .get(url)
                .cloned()
                .ok_or_else(|| DownloadError::http_status(url, 404))
        }

        async fn fetch_to_file(
            &self,
            url: &str,
            _dest: &Path,
            _referer: Option<&str>,
        ) -> Result<u64, DownloadError> {
            self.calls.lock().unwrap().push(url.to_string());
            if self.ok.contains(url) {
                Ok(1024)
            } else {
                Err(DownloadError::http_status(url, 404))
            }
        }
    }

    fn candidate(id: &str, service: Option<&str>) -> ImageCandidate {
        ImageCandidate::new(
            id.to_string(),
            Some("image/jpeg".to_string()),
            service.map(str::to_string),
        )
    }

    fn request<'a>(candidate: &'a ImageCandidate, version: IiifVersion) -> PageRequest<'a> {
        PageRequest {
            candidate,
            width: Some(1200),
            version,
            dest: Path::new("/tmp/unused.jpg"),
            referer: None,
            first_page: false,
            query_image_info: false,
        }
    }

    #[tokio::test]
    async fn test_full_attempt_order_v2() {
        let c = candidate("https://x.org/img/p1.jpg", Some("https://x.org/iiif/p1"));
        let transfer = FakeTransfer::default();
        let mut state = StrategyState::new();

        let result = resolve_page(&transfer, &request(&c, IiifVersion::V2), &mut state).await;

        assert!(matches!(result, Resolution::Exhausted { attempts: 7, .. }));
        assert_eq!(
            transfer.calls(),
            [
                "https://x.org/iiif/p1/full/full/0/default.jpg",
                "https://x.org/iiif/p1/full/max/0/default.jpg",
                "https://x.org/iiif/p1/full/1200,/0/default.jpg",
                "https://x.org/img/p1.jpg",
                "https://x.org/img/p1.jpg/full/full/0/default.jpg",
                "https://x.org/img/p1.jpg/full/max/0/default.jpg",
                "https://x.org/img/p1.jpg/full/1200,/0/default.jpg",
            ]
        );
        // Not the first page: nothing is disabled.
        assert_eq!(state, StrategyState::new());
    }

    #[tokio::test]
    async fn test_v3_never_requests_full_size() {
        let c = candidate("https://x.org/img/p1.jpg", Some("https://x.org/iiif/p1"));
        let transfer = FakeTransfer::default();
        let mut state = StrategyState::new();
        let mut req = request(&c, IiifVersion::V3);
        req.first_page = true;

        resolve_page(&transfer, &req, &mut state).await;

        assert!(transfer.calls().iter().all(|uri| !uri.contains("/full/full/")));
        // Skipped tiers are not disabled.
        assert!(state.is_enabled(Tier::ServiceFull));
        assert!(!state.is_enabled(Tier::ServiceMax));
    }

    #[tokio::test]
    async fn test_stops_at_first_success() {
        let c = candidate("https://x.org/img/p1.jpg", Some("https://x.org/iiif/p1"));
        let transfer = FakeTransfer::succeeding(&["https://x.org/iiif/p1/full/max/0/default.jpg"]);
        let mut state = StrategyState::new();
        let mut req = request(&c, IiifVersion::V2);
        req.first_page = true;

        let result = resolve_page(&transfer, &req, &mut state).await;

        assert_eq!(
            result,
            Resolution::Downloaded {
                uri: "https://x.org/iiif/p1/full/max/0/default.jpg".to_string(),
                bytes: 1024,
                tier: Tier::ServiceMax,
            }
        );
        assert_eq!(transfer.calls().len(), 2);
        assert!(!state.is_enabled(Tier::ServiceFull));
        assert!(state.is_enabled(Tier::ServiceMax));
    }

    #[tokio::test]
    async fn test_first_page_failures_disable_tiers_for_later_pages() {
        let first = candidate("https://x.org/img/p1.jpg", Some("https://x.org/iiif/p1"));
        let second = candidate("https://x.org/img/p2.jpg", Some("https://x.org/iiif/p2"));
        let transfer =
            FakeTransfer::succeeding(&["https://x.org/img/p1.jpg", "https://x.org/img/p2.jpg"]);
        let mut state = StrategyState::new();

        let mut req = request(&first, IiifVersion::V2);
        req.first_page = true;
        resolve_page(&transfer, &req, &mut state).await;
        assert_eq!(transfer.calls().len(), 4);

        let result = resolve_page(&transfer, &request(&second, IiifVersion::V2), &mut state).await;
        assert!(matches!(result, Resolution::Downloaded { tier: Tier::RawId, .. }));
        assert_eq!(transfer.calls().len(), 5);
        assert_eq!(transfer.calls()[4], "https://x.org/img/p2.jpg");
    }

    #[tokio::test]
    async fn test_canonical_identifier_is_rebuilt_and_duplicates_skipped() {
        let id = "https://x.org/iiif/p1/full/max/0/default.jpg";
        let c = candidate(id, Some("https://x.org/iiif/p1"));
        let transfer = FakeTransfer::default();
        let mut state = StrategyState::new();

        let result = resolve_page(&transfer, &request(&c, IiifVersion::V2), &mut state).await;

        // Service tiers already cover the canonical rebuilds and the raw id.
        assert!(matches!(result, Resolution::Exhausted { attempts: 6, .. }));
        let calls = transfer.calls();
        let unique: HashSet<_> = calls.iter().collect();
        assert_eq!(unique.len(), calls.len());
        assert!(calls.contains(&format!("{id}/full/max/0/default.jpg")));
    }

    #[tokio::test]
    async fn test_identifier_tiers_skipped_when_equal_to_service() {
        let c = candidate("https://x.org/iiif/p1", Some("https://x.org/iiif/p1"));
        let transfer = FakeTransfer::default();
        let mut state = StrategyState::new();

        let result = resolve_page(&transfer, &request(&c, IiifVersion::V2), &mut state).await;

        assert!(matches!(result, Resolution::Exhausted { attempts: 4, .. }));
    }

    #[tokio::test]
    async fn test_width_tiers_need_a_width() {
        let c = candidate("https://x.org/img/p1.jpg", None);
        let transfer = FakeTransfer::default();
        let mut state = StrategyState::new();
        let mut req = request(&c, IiifVersion::V3);
        req.width = None;

        let result = resolve_page(&transfer, &req, &mut state).await;

        assert!(matches!(result, Resolution::Exhausted { attempts: 2, .. }));
        assert_eq!(
            transfer.calls(),
            ["https://x.org/img/p1.jpg", "https://x.org/img/p1.jpg/full/max/0/default.jpg"]
        );
    }

    #[tokio::test]
    async fn test_fixed_width_only_uses_width_tiers() {
        let c = candidate("https://x.org/img/p1.jpg", Some("https://x.org/iiif/p1"));
        let transfer = FakeTransfer::default();
        let mut state = StrategyState::with_fixed_width();
        let mut req = request(&c, IiifVersion::V2);
        req.width = Some(600);

        resolve_page(&transfer, &req, &mut state).await;

        assert_eq!(
            transfer.calls(),
            [
                "https://x.org/iiif/p1/full/600,/0/default.jpg",
                "https://x.org/img/p1.jpg/full/600,/0/default.jpg",
            ]
        );
    }

    #[tokio::test]
    async fn test_image_info_widens_declared_width() {
        let c = candidate("https://x.org/img/p1.jpg", Some("https://x.org/iiif/p1"));
        let mut transfer =
            FakeTransfer::succeeding(&["https://x.org/iiif/p1/full/3000,/0/default.jpg"]);
        transfer.json.insert(
            "https://x.org/iiif/p1/info.json".to_string(),
            json!({"width": 4000, "height": 5000, "maxWidth": 3000}),
        );
        let mut state = StrategyState::new();
        state.disable(Tier::ServiceFull);
        state.disable(Tier::ServiceMax);
        let mut req = request(&c, IiifVersion::V2);
        req.query_image_info = true;

        let result = resolve_page(&transfer, &req, &mut state).await;

        assert!(matches!(result, Resolution::Downloaded { tier: Tier::ServiceWidth, .. }));
        assert_eq!(transfer.calls()[0], "https://x.org/iiif/p1/info.json");
    }

    #[tokio::test]
    async fn test_image_info_failure_falls_back_to_declared_width() {
        let c = candidate("https://x.org/img/p1.jpg", Some("https://x.org/iiif/p1"));
        let transfer =
            FakeTransfer::succeeding(&["https://x.org/iiif/p1/full/1200,/0/default.jpg"]);
        let mut state = StrategyState::new();
        let mut req = request(&c, IiifVersion::V3);
        req.query_image_info = true;

        let result = resolve_page(&transfer, &req, &mut state).await;

        assert!(matches!(result, Resolution::Downloaded { tier: Tier::ServiceWidth, .. }));
    }
}
