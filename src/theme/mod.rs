//! Editor color themes.

use ratatui::style::Color;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Palette {
    pub background: Color,
    pub foreground: Color,
    pub gutter: Color,
    pub active_line: Color,
    pub accent: Color,
    pub success: Color,
    pub error: Color,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Theme {
    pub id: &'static str,
    pub name: &'static str,
    pub palette: Palette,
}

pub const DEFAULT_THEME: &str = "material";

pub const THEMES: [Theme; 5] = [
    Theme {
        id: "monokai",
        name: "⚫️ Dark",
        palette: Palette {
            background: Color::Rgb(0x27, 0x28, 0x22),
            foreground: Color::Rgb(0xf8, 0xf8, 0xf2),
            gutter: Color::Rgb(0x75, 0x71, 0x5e),
            active_line: Color::Rgb(0x3e, 0x3d, 0x32),
            accent: Color::Rgb(0xf9, 0x26, 0x72),
            success: Color::Rgb(0xa6, 0xe2, 0x2e),
            error: Color::Rgb(0xf9, 0x26, 0x72),
        },
    },
    Theme {
        id: "dracula",
        name: "🌑 Black",
        palette: Palette {
            background: Color::Rgb(0x28, 0x2a, 0x36),
            foreground: Color::Rgb(0xf8, 0xf8, 0xf2),
            gutter: Color::Rgb(0x62, 0x72, 0xa4),
            active_line: Color::Rgb(0x44, 0x47, 0x5a),
            accent: Color::Rgb(0xbd, 0x93, 0xf9),
            success: Color::Rgb(0x50, 0xfa, 0x7b),
            error: Color::Rgb(0xff, 0x55, 0x55),
        },
    },
    Theme {
        id: "material",
        name: "🌘 Gray",
        palette: Palette {
            background: Color::Rgb(0x26, 0x32, 0x38),
            foreground: Color::Rgb(0xee, 0xff, 0xff),
            gutter: Color::Rgb(0x54, 0x6e, 0x7a),
            active_line: Color::Rgb(0x31, 0x40, 0x48),
            accent: Color::Rgb(0x82, 0xaa, 0xff),
            success: Color::Rgb(0xc3, 0xe8, 0x8d),
            error: Color::Rgb(0xf0, 0x71, 0x78),
        },
    },
    Theme {
        id: "nord",
        name: "⭐️ Classic",
        palette: Palette {
            background: Color::Rgb(0x2e, 0x34, 0x40),
            foreground: Color::Rgb(0xd8, 0xde, 0xe9),
            gutter: Color::Rgb(0x4c, 0x56, 0x6a),
            active_line: Color::Rgb(0x3b, 0x42, 0x52),
            accent: Color::Rgb(0x88, 0xc0, 0xd0),
            success: Color::Rgb(0xa3, 0xbe, 0x8c),
            error: Color::Rgb(0xbf, 0x61, 0x6a),
        },
    },
    Theme {
        id: "solarized",
        name: "💫 Contrast",
        palette: Palette {
            background: Color::Rgb(0x00, 0x2b, 0x36),
            foreground: Color::Rgb(0x93, 0xa1, 0xa1),
            gutter: Color::Rgb(0x58, 0x6e, 0x75),
            active_line: Color::Rgb(0x07, 0x36, 0x42),
            accent: Color::Rgb(0x26, 0x8b, 0xd2),
            success: Color::Rgb(0x85, 0x99, 0x00),
            error: Color::Rgb(0xdc, 0x32, 0x2f),
        },
    },
];

pub fn find(id: &str) -> Option<&'static Theme> {
    THEMES.iter().find(|t| t.id.eq_ignore_ascii_case(id.trim()))
}

/// Theme by id, falling back to the default.
pub fn resolve(id: Option<&str>) -> &'static Theme {
    id.and_then(find)
        .or_else(|| find(DEFAULT_THEME))
        .unwrap_or(&THEMES[0])
}

pub fn next(current: &Theme) -> &'static Theme {
    let idx = THEMES.iter().position(|t| t.id == current.id).unwrap_or(0);
    &THEMES[(idx + 1) % THEMES.len()]
}
