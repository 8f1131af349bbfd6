// ── Theme catalogues ──

use serde::Serialize;

/// A selectable display theme.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Theme {
    pub id: i64,
    pub name: &'static str,
}

const fn theme(id: i64, name: &'static str) -> Theme {
    Theme { id, name }
}

/// Stock SmallTV firmware.
pub const SMALLTV_THEMES: &[Theme] = &[
    theme(1, "Weather Clock Today"),
    theme(2, "Weather Forecast"),
    theme(3, "Photo Album"),
    theme(4, "Time Style 1"),
    theme(5, "Time Style 2"),
    theme(6, "Time Style 3"),
    theme(7, "Simple Weather Clock"),
];

/// Custom firmware builds.
pub const CUSTOM_THEMES: &[Theme] = &[
    theme(1, "Clock"),
    theme(2, "Message"),
    theme(3, "Image"),
    theme(4, "Countdown"),
];

/// Case-insensitive lookup by display name.
pub fn find_by_name<'a>(catalogue: &'a [Theme], name: &str) -> Option<&'a Theme> {
    let name = name.trim();
    catalogue.iter().find(|t| t.name.eq_ignore_ascii_case(name))
}

pub fn find_by_id(catalogue: &[Theme], id: i64) -> Option<&Theme> {
    catalogue.iter().find(|t| t.id == id)
}
