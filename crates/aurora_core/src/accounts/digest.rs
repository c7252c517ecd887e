//! Account digest: the summary the game client shows on its hero screen.

use crate::protocol::d3;

/// Schema version tag carried by every digest.
pub const DIGEST_VERSION: u32 = 99;

/// Banner every account starts with.
pub fn default_banner() -> d3::BannerConfiguration {
    d3::BannerConfiguration {
        background_color_index: 20,
        banner_index: 8,
        pattern: 4,
        pattern_color_index: 11,
        placement_index: 11,
        sigil_accent: 4,
        sigil_main: 3,
        sigil_color_index: 7,
        use_sigil_variant: true,
    }
}
