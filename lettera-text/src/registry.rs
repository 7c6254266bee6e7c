//! System font registry: discovery, CSS-style matching and fallback chains.
//!
//! Wraps `font-kit` for OS-level font enumeration. Families are cached by
//! lowercase name; generic families (`serif`, `sans-serif`, `monospace`)
//! are resolved to concrete families once at discovery.
//!
//! ```text
//! FontRegistry
//!   ├── families: HashMap<String, Vec<FaceEntry>>
//!   ├── generic_map: HashMap<GenericFamily, String>
//!   ├── match_family(name, descriptor) ─► FontMatch
//!   └── load_chain("Noto Sans, Noto Sans JP, sans-serif")
//!           ─► FontChain [primary ◄─weak── fallback 1, fallback 2 ...]
//! ```

use std::collections::HashMap;
use std::fmt;
use std::time::Instant;

use font_kit::family_name::FamilyName;
use font_kit::handle::Handle;
use font_kit::properties::{Properties as FkProperties, Style as FkStyle};
use font_kit::source::SystemSource;

use crate::config::FontConfig;
use crate::error::FontError;
use crate::font::Font;

/// Font style (normal, italic, or oblique).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum FontStyle {
    #[default]
    Normal,
    Italic,
    Oblique,
}

/// CSS generic font families that resolve to a system family.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum GenericFamily {
    Serif,
    SansSerif,
    Monospace,
}

/// One installed face and where to load it from.
#[derive(Clone, Debug)]
pub struct FaceEntry {
    pub postscript_name: String,
    /// Weight (100–900).
    pub weight: u16,
    pub style: FontStyle,
    /// Width class as a font-kit stretch factor (1.0 = normal).
    pub stretch: f32,
    pub handle: Handle,
}

/// What to look for: a family chain plus the preferred face.
#[derive(Clone, Debug, PartialEq)]
pub struct FontDescriptor {
    /// Family names in priority order, lowercase.
    pub families: Vec<String>,
    /// Weight (100–900). 400 = normal, 700 = bold.
    pub weight: u16,
    pub style: FontStyle,
    pub stretch: f32,
}

impl Default for FontDescriptor {
    fn default() -> Self {
        Self {
            families: vec!["sans-serif".into()],
            weight: 400,
            style: FontStyle::Normal,
            stretch: 1.0,
        }
    }
}

impl FontDescriptor {
    /// Parse a CSS font-family list such as `"Noto Sans", serif`.
    pub fn from_css(family_str: &str, weight: u16, style: FontStyle) -> Self {
        let families: Vec<String> = family_str
            .split(',')
            .map(|s| s.trim().trim_matches('"').trim_matches('\'').to_lowercase())
            .filter(|s| !s.is_empty())
            .collect();

        Self {
            families: if families.is_empty() {
                vec!["sans-serif".into()]
            } else {
                families
            },
            weight,
            style,
            stretch: 1.0,
        }
    }
}

/// How a family name was matched.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MatchType {
    /// Exact family name.
    Exact,
    /// Through a generic family keyword.
    Generic,
}

/// A resolved face.
#[derive(Clone, Debug)]
pub struct FontMatch {
    pub family: String,
    pub face: FaceEntry,
    pub match_type: MatchType,
}

/// Fonts loaded from one family chain. The first font falls back on the
/// others in order; the chain keeps them all alive.
#[derive(Debug)]
pub struct FontChain {
    fonts: Vec<Font>,
}

impl FontChain {
    pub fn primary(&self) -> &Font {
        &self.fonts[0]
    }

    pub fn fonts(&self) -> &[Font] {
        &self.fonts
    }

    pub fn len(&self) -> usize {
        self.fonts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fonts.is_empty()
    }
}

/// System font registry with cached discovery.
pub struct FontRegistry {
    /// Family name (lowercase) → available faces.
    families: HashMap<String, Vec<FaceEntry>>,
    /// Generic family → concrete family name (lowercase).
    generic_map: HashMap<GenericFamily, String>,
    discovery_time_ms: f64,
    face_count: usize,
}

impl FontRegistry {
    /// Enumerate installed fonts. I/O bound; call once and keep the result.
    pub fn discover() -> Self {
        let start = Instant::now();
        let source = SystemSource::new();

        let mut families: HashMap<String, Vec<FaceEntry>> = HashMap::new();
        let mut face_count = 0usize;

        if let Ok(family_names) = source.all_families() {
            for family_name in &family_names {
                let Ok(family_handle) = source.select_family_by_name(family_name) else {
                    continue;
                };
                let mut faces = Vec::new();
                for handle in family_handle.fonts() {
                    if let Ok(font) = handle.load() {
                        let props = font.properties();
                        faces.push(FaceEntry {
                            postscript_name: font.postscript_name().unwrap_or_default(),
                            weight: props.weight.0 as u16,
                            style: convert_style(props.style),
                            stretch: props.stretch.0,
                            handle: handle.clone(),
                        });
                        face_count += 1;
                    }
                }
                if !faces.is_empty() {
                    families.insert(family_name.to_lowercase(), faces);
                }
            }
        }

        let generic_map = resolve_generics(&source);

        let discovery_time_ms = start.elapsed().as_secs_f64() * 1000.0;
        log::info!(
            "FontRegistry: discovered {} faces in {} families ({:.1}ms)",
            face_count,
            families.len(),
            discovery_time_ms,
        );

        Self {
            families,
            generic_map,
            discovery_time_ms,
            face_count,
        }
    }

    pub fn family_count(&self) -> usize {
        self.families.len()
    }

    pub fn face_count(&self) -> usize {
        self.face_count
    }

    pub fn discovery_time_ms(&self) -> f64 {
        self.discovery_time_ms
    }

    /// All family names, sorted.
    pub fn all_families(&self) -> Vec<String> {
        let mut names: Vec<String> = self.families.keys().cloned().collect();
        names.sort();
        names
    }

    pub fn has_family(&self, name: &str) -> bool {
        self.families.contains_key(&name.to_lowercase())
    }

    pub fn faces(&self, family: &str) -> Option<&[FaceEntry]> {
        self.families.get(&family.to_lowercase()).map(Vec::as_slice)
    }

    pub fn resolve_generic(&self, generic: GenericFamily) -> Option<&str> {
        self.generic_map.get(&generic).map(String::as_str)
    }

    /// Best face of one family (or generic keyword) for `descriptor`.
    pub fn match_family(&self, name: &str, descriptor: &FontDescriptor) -> Option<FontMatch> {
        let name = name.to_lowercase();
        let (family, match_type) = match parse_generic(&name) {
            Some(generic) => (self.generic_map.get(&generic)?.clone(), MatchType::Generic),
            None => (name, MatchType::Exact),
        };
        let faces = self.families.get(&family)?;
        let face = best_match(faces, descriptor)?.clone();
        Some(FontMatch {
            family,
            face,
            match_type,
        })
    }

    /// First family in the descriptor's chain that is installed.
    pub fn match_font(&self, descriptor: &FontDescriptor) -> Option<FontMatch> {
        descriptor
            .families
            .iter()
            .find_map(|name| self.match_family(name, descriptor))
    }

    /// Load the best face for `descriptor`.
    pub fn load(&self, descriptor: &FontDescriptor, config: &FontConfig) -> Result<Font, FontError> {
        let found = self
            .match_font(descriptor)
            .ok_or_else(|| FontError::FamilyNotFound(descriptor.families.join(", ")))?;
        load_face(&found.face, config)
    }

    /// Load every installed family of a CSS family list. The first becomes
    /// the primary font; the rest are registered as its fallbacks in order.
    /// Families that aren't installed or fail to load are skipped.
    pub fn load_chain(&self, css: &str, weight: u16, style: FontStyle, config: &FontConfig) -> Result<FontChain, FontError> {
        let descriptor = FontDescriptor::from_css(css, weight, style);
        let mut seen: Vec<String> = Vec::new();
        let mut fonts: Vec<Font> = Vec::new();
        let mut failed: Vec<String> = Vec::new();

        for name in &descriptor.families {
            let Some(found) = self.match_family(name, &descriptor) else {
                log::debug!("FontRegistry: family {name:?} not installed");
                continue;
            };
            if seen.contains(&found.face.postscript_name) {
                continue;
            }
            match load_face(&found.face, config) {
                Ok(font) => {
                    seen.push(found.face.postscript_name.clone());
                    fonts.push(font);
                }
                Err(err) => {
                    log::warn!("FontRegistry: failed to load {}: {err}", found.family);
                    failed.push(found.face.postscript_name);
                }
            }
        }

        let Some((primary, rest)) = fonts.split_first() else {
            if failed.is_empty() {
                return Err(FontError::FamilyNotFound(css.to_string()));
            }
            return Err(FontError::Selection(format!(
                "no loadable face for {css:?} (tried {})",
                failed.join(", ")
            )));
        };
        for fallback in rest {
            primary.add_fallback(fallback);
        }
        log::info!(
            "FontRegistry: loaded chain {css:?} ({} fonts, {} fallbacks)",
            fonts.len(),
            rest.len()
        );
        Ok(FontChain { fonts })
    }

    #[cfg(test)]
    fn from_parts(families: HashMap<String, Vec<FaceEntry>>, generic_map: HashMap<GenericFamily, String>) -> Self {
        let face_count = families.values().map(Vec::len).sum();
        Self {
            families,
            generic_map,
            discovery_time_ms: 0.0,
            face_count,
        }
    }
}

impl fmt::Display for FontRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "FontRegistry({} families, {} faces, {:.1}ms)",
            self.families.len(),
            self.face_count,
            self.discovery_time_ms,
        )
    }
}

/// Read the face's bytes and build a [`Font`].
pub fn load_face(face: &FaceEntry, config: &FontConfig) -> Result<Font, FontError> {
    match &face.handle {
        Handle::Path { path, font_index } => Font::from_bytes(std::fs::read(path)?, *font_index, config),
        Handle::Memory { bytes, font_index } => Font::from_bytes(bytes.to_vec(), *font_index, config),
    }
}

// ── Matching internals ──────────────────────────────────────────────

fn best_match<'a>(faces: &'a [FaceEntry], desc: &FontDescriptor) -> Option<&'a FaceEntry> {
    faces.iter().min_by_key(|face| match_score(face, desc))
}

/// Match score (lower = better): stretch, then style, then weight.
fn match_score(face: &FaceEntry, desc: &FontDescriptor) -> u32 {
    let stretch_diff = ((face.stretch - desc.stretch).abs() * 10.0).round() as u32;
    let style_diff = style_distance(face.style, desc.style) as u32;
    let weight_diff = (face.weight as i32 - desc.weight as i32).unsigned_abs();

    stretch_diff * 10000 + style_diff * 1000 + weight_diff
}

fn style_distance(a: FontStyle, b: FontStyle) -> u8 {
    match (a, b) {
        _ if a == b => 0,
        (FontStyle::Italic, FontStyle::Oblique) | (FontStyle::Oblique, FontStyle::Italic) => 1,
        _ => 2,
    }
}

fn parse_generic(name: &str) -> Option<GenericFamily> {
    match name {
        "serif" => Some(GenericFamily::Serif),
        "sans-serif" => Some(GenericFamily::SansSerif),
        "monospace" => Some(GenericFamily::Monospace),
        _ => None,
    }
}

fn convert_style(style: FkStyle) -> FontStyle {
    match style {
        FkStyle::Normal => FontStyle::Normal,
        FkStyle::Italic => FontStyle::Italic,
        FkStyle::Oblique => FontStyle::Oblique,
    }
}

fn resolve_generics(source: &SystemSource) -> HashMap<GenericFamily, String> {
    let mut map = HashMap::new();
    let props = FkProperties::new();

    let generics = [
        (GenericFamily::Serif, FamilyName::Serif),
        (GenericFamily::SansSerif, FamilyName::SansSerif),
        (GenericFamily::Monospace, FamilyName::Monospace),
    ];

    for (generic, fk_name) in generics {
        let Ok(handle) = source.select_best_match(&[fk_name], &props) else {
            continue;
        };
        if let Ok(font) = handle.load() {
            let name = font.family_name();
            if !name.is_empty() {
                map.insert(generic, name.to_lowercase());
            }
        }
    }

    map
}

// ===================================================================
// Tests
// ===================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    fn face(name: &str, weight: u16, style: FontStyle) -> FaceEntry {
        FaceEntry {
            postscript_name: name.into(),
            weight,
            style,
            stretch: 1.0,
            handle: Handle::Memory {
                bytes: Arc::new(vec![0u8; 8]),
                font_index: 0,
            },
        }
    }

    fn fake_registry() -> FontRegistry {
        let mut families = HashMap::new();
        families.insert(
            "noto sans".to_string(),
            vec![
                face("NotoSans-Regular", 400, FontStyle::Normal),
                face("NotoSans-Bold", 700, FontStyle::Normal),
                face("NotoSans-Italic", 400, FontStyle::Italic),
            ],
        );
        families.insert("dejavu serif".to_string(), vec![face("DejaVuSerif", 400, FontStyle::Normal)]);
        let mut generics = HashMap::new();
        generics.insert(GenericFamily::SansSerif, "noto sans".to_string());
        FontRegistry::from_parts(families, generics)
    }

    #[test]
    fn test_descriptor_from_css() {
        let desc = FontDescriptor::from_css("Arial, Helvetica, sans-serif", 700, FontStyle::Italic);
        assert_eq!(desc.families, vec!["arial", "helvetica", "sans-serif"]);
        assert_eq!(desc.weight, 700);
        assert_eq!(desc.style, FontStyle::Italic);
    }

    #[test]
    fn test_descriptor_from_css_quoted() {
        let desc = FontDescriptor::from_css("\"Times New Roman\", 'Noto Serif'", 400, FontStyle::Normal);
        assert_eq!(desc.families, vec!["times new roman", "noto serif"]);
    }

    #[test]
    fn test_descriptor_from_css_empty() {
        let desc = FontDescriptor::from_css(" , ", 400, FontStyle::Normal);
        assert_eq!(desc.families, vec!["sans-serif"]);
    }

    #[test]
    fn test_match_exact_and_generic() {
        let reg = fake_registry();
        let desc = FontDescriptor::default();

        let m = reg.match_family("Noto Sans", &desc).unwrap();
        assert_eq!(m.match_type, MatchType::Exact);
        assert_eq!(m.face.postscript_name, "NotoSans-Regular");

        let m = reg.match_family("sans-serif", &desc).unwrap();
        assert_eq!(m.match_type, MatchType::Generic);
        assert_eq!(m.family, "noto sans");

        // Unresolved generic and unknown family.
        assert!(reg.match_family("monospace", &desc).is_none());
        assert!(reg.match_family("Comic Sans", &desc).is_none());
    }

    #[test]
    fn test_match_prefers_weight_and_style() {
        let reg = fake_registry();
        let bold = FontDescriptor::from_css("noto sans", 700, FontStyle::Normal);
        assert_eq!(reg.match_font(&bold).unwrap().face.postscript_name, "NotoSans-Bold");

        let italic = FontDescriptor::from_css("noto sans", 400, FontStyle::Oblique);
        assert_eq!(reg.match_font(&italic).unwrap().face.postscript_name, "NotoSans-Italic");
    }

    #[test]
    fn test_match_font_walks_chain() {
        let reg = fake_registry();
        let desc = FontDescriptor::from_css("Missing, DejaVu Serif, sans-serif", 400, FontStyle::Normal);
        assert_eq!(reg.match_font(&desc).unwrap().family, "dejavu serif");

        let none = FontDescriptor::from_css("Missing, Also Missing", 400, FontStyle::Normal);
        assert!(reg.match_font(&none).is_none());
    }

    #[test]
    fn test_load_reports_missing_family() {
        let reg = fake_registry();
        let desc = FontDescriptor::from_css("Missing", 400, FontStyle::Normal);
        let err = reg.load(&desc, &FontConfig::default());
        assert!(matches!(err, Err(FontError::FamilyNotFound(name)) if name == "missing"));
    }

    #[test]
    fn test_load_invalid_bytes() {
        let reg = fake_registry();
        let err = reg.load(&FontDescriptor::default(), &FontConfig::default());
        assert!(matches!(err, Err(FontError::InvalidFont { index: 0 })));
    }

    #[test]
    fn test_load_chain_nothing_loadable() {
        let reg = fake_registry();
        let err = reg.load_chain("Noto Sans, Missing", 400, FontStyle::Normal, &FontConfig::default());
        match err {
            Err(FontError::Selection(msg)) => assert!(msg.contains("NotoSans-Regular"), "{msg}"),
            other => panic!("expected a selection error, got {other:?}"),
        }
    }

    #[test]
    fn test_load_chain_nothing_installed() {
        let reg = fake_registry();
        let err = reg.load_chain("Missing, Also Missing", 400, FontStyle::Normal, &FontConfig::default());
        assert!(matches!(err, Err(FontError::FamilyNotFound(css)) if css == "Missing, Also Missing"));
    }

    #[test]
    fn test_match_score() {
        let desc = FontDescriptor::default();
        assert_eq!(match_score(&face("A", 400, FontStyle::Normal), &desc), 0);
        assert_eq!(match_score(&face("B", 700, FontStyle::Normal), &desc), 300);
        assert_eq!(match_score(&face("C", 400, FontStyle::Italic), &desc), 2000);

        let mut wide = face("D", 400, FontStyle::Normal);
        wide.stretch = 1.5;
        assert_eq!(match_score(&wide, &desc), 50000);
    }

    #[test]
    fn test_style_distance() {
        assert_eq!(style_distance(FontStyle::Normal, FontStyle::Normal), 0);
        assert_eq!(style_distance(FontStyle::Italic, FontStyle::Oblique), 1);
        assert_eq!(style_distance(FontStyle::Normal, FontStyle::Italic), 2);
    }

    #[test]
    fn test_parse_generic() {
        assert_eq!(parse_generic("serif"), Some(GenericFamily::Serif));
        assert_eq!(parse_generic("sans-serif"), Some(GenericFamily::SansSerif));
        assert_eq!(parse_generic("monospace"), Some(GenericFamily::Monospace));
        assert_eq!(parse_generic("arial"), None);
    }

    #[test]
    fn test_convert_style_variants() {
        assert_eq!(convert_style(FkStyle::Normal), FontStyle::Normal);
        assert_eq!(convert_style(FkStyle::Italic), FontStyle::Italic);
        assert_eq!(convert_style(FkStyle::Oblique), FontStyle::Oblique);
    }

    #[test]
    fn test_display() {
        let reg = fake_registry();
        assert_eq!(reg.to_string(), "FontRegistry(2 families, 4 faces, 0.0ms)");
        assert_eq!(reg.all_families(), vec!["dejavu serif", "noto sans"]);
        assert!(reg.has_family("Noto Sans"));
        assert_eq!(reg.faces("NOTO SANS").map(<[FaceEntry]>::len), Some(3));
    }

    #[test]
    fn test_system_chain() {
        // Machines without fonts have nothing to load.
        let reg = FontRegistry::discover();
        let Some(sans) = reg.resolve_generic(GenericFamily::SansSerif).map(str::to_string) else {
            return;
        };
        let css = format!("{sans}, monospace");
        let Ok(chain) = reg.load_chain(&css, 400, FontStyle::Normal, &FontConfig::default()) else {
            return;
        };
        assert_eq!(chain.primary().fallback_count(), chain.len() - 1);
        assert!(chain.primary().has_glyph("A"));
    }
}
