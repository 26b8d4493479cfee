//! URI construction tiers and the per-manifest flags that gate them.

use std::fmt;

use crate::image_api::SizeParam;

/// One way of building an image URI for a page, in attempt order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Tier {
    /// `{service}/full/full/0/default.{ext}` (Image API 2 only).
    ServiceFull,
    /// `{service}/full/max/0/default.{ext}`
    ServiceMax,
    /// `{service}/full/{width},/0/default.{ext}`
    ServiceWidth,
    /// The image identifier exactly as given.
    RawId,
    /// Base recovered from a canonical identifier, `full` size.
    CanonicalFull,
    /// Base recovered from a canonical identifier, `max` size.
    CanonicalMax,
    /// Base recovered from a canonical identifier, `{width},` size.
    CanonicalWidth,
    /// Identifier used as an Image API base, `full` size.
    IdentifierFull,
    /// Identifier used as an Image API base, `max` size.
    IdentifierMax,
    /// Identifier used as an Image API base, `{width},` size.
    IdentifierWidth,
}

impl Tier {
    /// Number of tiers.
    pub const COUNT: usize = 10;

    /// Every tier in attempt order.
    pub const ALL: [Tier; Self::COUNT] = [
        Tier::ServiceFull,
        Tier::ServiceMax,
        Tier::ServiceWidth,
        Tier::RawId,
        Tier::CanonicalFull,
        Tier::CanonicalMax,
        Tier::CanonicalWidth,
        Tier::IdentifierFull,
        Tier::IdentifierMax,
        Tier::IdentifierWidth,
    ];

    fn index(self) -> usize {
        self as usize
    }

    /// The size parameter this tier requests, `None` for [`Tier::RawId`].
    #[must_use]
    pub fn size(self, width: u32) -> Option<SizeParam> {
        match self {
            Tier::RawId => None,
            Tier::ServiceFull | Tier::CanonicalFull | Tier::IdentifierFull => Some(SizeParam::Full),
            Tier::ServiceMax | Tier::CanonicalMax | Tier::IdentifierMax => Some(SizeParam::Max),
            Tier::ServiceWidth | Tier::CanonicalWidth | Tier::IdentifierWidth => {
                Some(SizeParam::Width(width))
            }
        }
    }

    /// Whether the tier is parameterized by a pixel width.
    #[must_use]
    pub fn uses_width(self) -> bool {
        matches!(
            self,
            Tier::ServiceWidth | Tier::CanonicalWidth | Tier::IdentifierWidth
        )
    }

    /// Whether the tier asks for `full` size, which Image API 3 dropped.
    #[must_use]
    pub fn uses_full_size(self) -> bool {
        matches!(
            self,
            Tier::ServiceFull | Tier::CanonicalFull | Tier::IdentifierFull
        )
    }

    /// Whether the tier builds on the image service.
    #[must_use]
    pub fn uses_service(self) -> bool {
        matches!(
            self,
            Tier::ServiceFull | Tier::ServiceMax | Tier::ServiceWidth
        )
    }

    /// Short stable name used in logs and events.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Tier::ServiceFull => "service-full",
            Tier::ServiceMax => "service-max",
            Tier::ServiceWidth => "service-width",
            Tier::RawId => "raw-id",
            Tier::CanonicalFull => "canonical-full",
            Tier::CanonicalMax => "canonical-max",
            Tier::CanonicalWidth => "canonical-width",
            Tier::IdentifierFull => "identifier-full",
            Tier::IdentifierMax => "identifier-max",
            Tier::IdentifierWidth => "identifier-width",
        }
    }
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which tiers are still worth trying for the current manifest.
///
/// Created per manifest with every tier enabled. Flags are only ever
/// cleared, never set again, until the state is dropped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StrategyState {
    enabled: [bool; Tier::COUNT],
    fixed_width: bool,
}

impl Default for StrategyState {
    fn default() -> Self {
        Self::new()
    }
}

impl StrategyState {
    /// All tiers enabled.
    #[must_use]
    pub fn new() -> Self {
        Self {
            enabled: [true; Tier::COUNT],
            fixed_width: false,
        }
    }

    /// Only width tiers enabled; used when every page is forced to one width.
    #[must_use]
    pub fn with_fixed_width() -> Self {
        let mut state = Self::new();
        for tier in Tier::ALL {
            if !tier.uses_width() {
                state.disable(tier);
            }
        }
        state.fixed_width = true;
        state
    }

    #[must_use]
    pub fn is_enabled(&self, tier: Tier) -> bool {
        self.enabled[tier.index()]
    }

    /// Whether the state was created for a fixed output width.
    #[must_use]
    pub fn is_width_fixed(&self) -> bool {
        self.fixed_width
    }

    /// Clears the flag for `tier` for the rest of the manifest.
    pub fn disable(&mut self, tier: Tier) {
        self.enabled[tier.index()] = false;
    }

    /// Tiers still enabled, in attempt order.
    pub fn enabled_tiers(&self) -> impl Iterator<Item = Tier> + '_ {
        Tier::ALL.into_iter().filter(|tier| self.is_enabled(*tier))
    }
}
