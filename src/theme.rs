use crossterm::style::Color;

use crate::highlights::HighlightColor;

// Color palette structure
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Base16Palette {
    pub base_00: Color, // Background
    pub base_02: Color, // Selection background
    pub base_03: Color, // Comments, invisibles
    pub base_05: Color, // Default foreground
    pub base_08: Color, // Red
    pub base_0a: Color, // Yellow
    pub base_0b: Color, // Green
    pub base_0d: Color, // Blue
    pub base_0e: Color, // Purple
}

#[derive(Clone, Copy, PartialEq, Eq, Debug, Default)]
pub enum ThemeId {
    #[default]
    OceanicNext,
    CatppuccinMocha,
}

impl ThemeId {
    pub fn name(&self) -> &'static str {
        match self {
            ThemeId::OceanicNext => "Oceanic Next",
            ThemeId::CatppuccinMocha => "Catppuccin Mocha",
        }
    }

    pub fn all() -> &'static [ThemeId] {
        &[ThemeId::OceanicNext, ThemeId::CatppuccinMocha]
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::all()
            .iter()
            .copied()
            .find(|t| t.name().eq_ignore_ascii_case(name.trim()))
    }

    pub fn palette(&self) -> &'static Base16Palette {
        match self {
            ThemeId::OceanicNext => &OCEANIC_NEXT_PALETTE,
            ThemeId::CatppuccinMocha => &CATPPUCCIN_MOCHA_PALETTE,
        }
    }
}

const fn rgb(hex: u32) -> Color {
    Color::Rgb {
        r: ((hex >> 16) & 0xFF) as u8,
        g: ((hex >> 8) & 0xFF) as u8,
        b: (hex & 0xFF) as u8,
    }
}

static OCEANIC_NEXT_PALETTE: Base16Palette = Base16Palette {
    base_00: rgb(0x1B2B34),
    base_02: rgb(0x4F5B66),
    base_03: rgb(0x65737E),
    base_05: rgb(0xC0C5CE),
    base_08: rgb(0xEC5F67),
    base_0a: rgb(0xFAC863),
    base_0b: rgb(0x99C794),
    base_0d: rgb(0x6699CC),
    base_0e: rgb(0xC594C5),
};

// Catppuccin Mocha: base, surface1, overlay0, subtext0, red, yellow, green, blue, mauve
static CATPPUCCIN_MOCHA_PALETTE: Base16Palette = Base16Palette {
    base_00: rgb(0x1E1E2E),
    base_02: rgb(0x45475A),
    base_03: rgb(0x6C7086),
    base_05: rgb(0xA6ADC8),
    base_08: rgb(0xF38BA8),
    base_0a: rgb(0xF9E2AF),
    base_0b: rgb(0xA6E3A1),
    base_0d: rgb(0x89B4FA),
    base_0e: rgb(0xCBA6F7),
};

/// Style token for one highlight color: a stable class name for markup
/// output plus terminal colors.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct HighlightStyle {
    pub token: &'static str,
    pub background: Color,
    pub foreground: Color,
}

impl Base16Palette {
    pub fn highlight_style(&self, color: HighlightColor) -> HighlightStyle {
        let (token, background) = match color {
            HighlightColor::Yellow => ("highlight-yellow", self.base_0a),
            HighlightColor::Green => ("highlight-green", self.base_0b),
            HighlightColor::Blue => ("highlight-blue", self.base_0d),
            HighlightColor::Pink => ("highlight-pink", self.base_0e),
        };
        HighlightStyle {
            token,
            background,
            foreground: self.base_00,
        }
    }

    pub fn plain_foreground(&self) -> Color {
        self.base_05
    }

    pub fn reference_foreground(&self) -> Color {
        self.base_03
    }

    pub fn error_foreground(&self) -> Color {
        self.base_08
    }
}
