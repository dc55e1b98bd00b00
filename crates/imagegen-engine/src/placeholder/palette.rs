use std::sync::LazyLock;

use image::Rgb;
use regex::Regex;
use sha2::{Digest, Sha256};

static HEX_COLOR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"#([0-9A-Fa-f]{6})").expect("hex colour pattern is valid"));

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Theme {
    pub name: &'static str,
    pub keywords: &'static [&'static str],
    pub base: [Rgb<u8>; 3],
    pub accent: Rgb<u8>,
}

impl Theme {
    /// Base colours followed by the accent.
    pub fn colors(&self) -> [Rgb<u8>; 4] {
        [self.base[0], self.base[1], self.base[2], self.accent]
    }
}

/// Registration order is priority order.
pub const THEMES: &[Theme] = &[
    Theme {
        name: "tech",
        keywords: &["robot", "ai", "tech"],
        base: [Rgb([0, 100, 200]), Rgb([0, 200, 255]), Rgb([100, 150, 255])],
        accent: Rgb([0, 255, 200]),
    },
    Theme {
        name: "office",
        keywords: &["office", "work"],
        base: [
            Rgb([100, 120, 140]),
            Rgb([150, 170, 190]),
            Rgb([200, 210, 220]),
        ],
        accent: Rgb([70, 130, 180]),
    },
    Theme {
        name: "nature",
        keywords: &["nature", "forest", "tree"],
        base: [Rgb([34, 139, 34]), Rgb([60, 179, 113]), Rgb([144, 238, 144])],
        accent: Rgb([255, 215, 0]),
    },
    Theme {
        name: "sunset",
        keywords: &["sunset", "sunrise"],
        base: [Rgb([255, 94, 77]), Rgb([255, 140, 90]), Rgb([255, 190, 130])],
        accent: Rgb([147, 112, 219]),
    },
    Theme {
        name: "ocean",
        keywords: &["ocean", "water", "sea"],
        base: [Rgb([0, 119, 190]), Rgb([0, 150, 199]), Rgb([72, 202, 228])],
        accent: Rgb([255, 255, 200]),
    },
];

pub const DEFAULT_THEME: Theme = Theme {
    name: "default",
    keywords: &[],
    base: [
        Rgb([102, 126, 234]),
        Rgb([118, 75, 162]),
        Rgb([237, 117, 130]),
    ],
    accent: Rgb([255, 200, 100]),
};

pub const ROBOT_KEYWORD: &str = "robot";

/// Case-insensitive substring test, so "robotic" carries "robot".
pub fn has_keyword(prompt: &str, keyword: &str) -> bool {
    prompt.to_lowercase().contains(keyword)
}

/// First registered theme with a keyword in the prompt, else the default.
pub fn select_theme(prompt: &str) -> &'static Theme {
    let lowered = prompt.to_lowercase();
    THEMES
        .iter()
        .find(|theme| theme.keywords.iter().any(|keyword| lowered.contains(keyword)))
        .unwrap_or(&DEFAULT_THEME)
}

/// Two stable colours derived from the prompt bytes.
pub fn hashed_colors(prompt: &str) -> (Rgb<u8>, Rgb<u8>) {
    let digest = Sha256::digest(prompt.as_bytes());
    (
        Rgb([digest[0], digest[1], digest[2]]),
        Rgb([digest[3], digest[4], digest[5]]),
    )
}

/// Every `#RRGGBB` code in `text`, in order of appearance.
pub fn parse_hex_colors(text: &str) -> Vec<Rgb<u8>> {
    HEX_COLOR
        .captures_iter(text)
        .filter_map(|caps| {
            let bytes = hex::decode(&caps[1]).ok()?;
            Some(Rgb([bytes[0], bytes[1], bytes[2]]))
        })
        .collect()
}

pub fn to_hex(color: Rgb<u8>) -> String {
    format!("#{}", hex::encode(color.0))
}

/// Linear blend, truncating each channel.
pub fn lerp(from: Rgb<u8>, to: Rgb<u8>, ratio: f64) -> Rgb<u8> {
    let ratio = ratio.clamp(0.0, 1.0);
    let channel = |a: u8, b: u8| (a as f64 * (1.0 - ratio) + b as f64 * ratio) as u8;
    Rgb([
        channel(from[0], to[0]),
        channel(from[1], to[1]),
        channel(from[2], to[2]),
    ])
}
