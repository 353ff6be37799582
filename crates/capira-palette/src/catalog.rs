//! Catalog types, loading, and validation.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::kind::OverlayKind;

const BUILTIN_PALETTE: &str = include_str!("../data/overlays-palette.yaml");

/// The ordered overlay palette: categories of overlay descriptors.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Catalog {
    pub categories: Vec<Category>,
}

/// A named group of overlays ("Quizzes", "Annotations").
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Category {
    #[serde(rename = "category")]
    pub name: String,

    pub overlays: Vec<OverlayDescriptor>,
}

/// One palette entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OverlayDescriptor {
    /// Listed but not offered yet
    #[serde(default, skip_serializing_if = "is_false")]
    pub not_yet: bool,

    pub title: String,

    pub description: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,

    /// Example rendering shown in the palette
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub preview: Option<OverlayData>,

    /// Data instantiated when the overlay is added
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub template: Option<OverlayData>,

    /// Fields outside the known schema, kept for lossless round trips
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Overlay payload: a `type` discriminator plus kind-specific fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OverlayData {
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,

    #[serde(flatten)]
    pub fields: Map<String, Value>,
}

fn is_false(value: &bool) -> bool {
    !*value
}

impl OverlayData {
    /// Resolve the discriminator against the known kinds.
    pub fn overlay_kind(&self) -> Option<OverlayKind> {
        self.kind.as_deref().and_then(OverlayKind::from_id)
    }
}

impl OverlayDescriptor {
    /// Whether the editor should offer this entry.
    pub fn is_offerable(&self) -> bool {
        !self.not_yet
    }

    /// Kind instantiated by this entry's template, if it has a valid one.
    pub fn kind(&self) -> Option<OverlayKind> {
        self.template.as_ref().and_then(OverlayData::overlay_kind)
    }
}

impl Catalog {
    /// The palette shipped with the editor.
    pub fn builtin() -> Result<Self, PaletteError> {
        Self::from_yaml(BUILTIN_PALETTE)
    }

    /// Parse a catalog from YAML.
    pub fn from_yaml(source: &str) -> Result<Self, PaletteError> {
        serde_yaml::from_str(source).map_err(PaletteError::Yaml)
    }

    /// Parse a catalog from JSON.
    pub fn from_json(source: &str) -> Result<Self, PaletteError> {
        serde_json::from_str(source).map_err(PaletteError::Json)
    }

    pub fn to_yaml(&self) -> Result<String, PaletteError> {
        serde_yaml::to_string(self).map_err(PaletteError::Yaml)
    }

    pub fn to_json(&self) -> Result<String, PaletteError> {
        serde_json::to_string_pretty(self).map_err(PaletteError::Json)
    }

    /// Every `(category, overlay)` pair the editor may offer, in order.
    pub fn offerable(&self) -> impl Iterator<Item = (&Category, &OverlayDescriptor)> {
        self.categories.iter().flat_map(|category| {
            category
                .overlays
                .iter()
                .filter(|overlay| overlay.is_offerable())
                .map(move |overlay| (category, overlay))
        })
    }

    /// Find an offerable overlay by the kind its template instantiates.
    pub fn find(&self, kind: OverlayKind) -> Option<&OverlayDescriptor> {
        self.offerable()
            .map(|(_, overlay)| overlay)
            .find(|overlay| overlay.kind() == Some(kind))
    }

    /// Total number of entries, offerable or not.
    pub fn len(&self) -> usize {
        self.categories.iter().map(|c| c.overlays.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Check that every offerable entry has a preview and a template whose
    /// types are known kinds and agree with each other.
    ///
    /// Entries marked `notYet` are placeholders and are not checked.
    pub fn validate(&self) -> Result<(), Vec<CatalogError>> {
        let mut errors = Vec::new();

        for (category, overlay) in self.offerable() {
            let locate = || Location {
                category: category.name.clone(),
                title: overlay.title.clone(),
            };

            let preview = check_section(&overlay.preview, "preview", locate, &mut errors);
            let template = check_section(&overlay.template, "template", locate, &mut errors);

            if let (Some(preview), Some(template)) = (preview, template) {
                if preview != template {
                    errors.push(CatalogError::KindMismatch {
                        at: locate(),
                        preview,
                        template,
                    });
                }
            }
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

fn check_section(
    section: &Option<OverlayData>,
    name: &'static str,
    locate: impl Fn() -> Location,
    errors: &mut Vec<CatalogError>,
) -> Option<OverlayKind> {
    let Some(data) = section else {
        errors.push(CatalogError::MissingSection {
            at: locate(),
            section: name,
        });
        return None;
    };

    let Some(id) = data.kind.as_deref().filter(|id| !id.trim().is_empty()) else {
        errors.push(CatalogError::MissingType {
            at: locate(),
            section: name,
        });
        return None;
    };

    let kind = OverlayKind::from_id(id);
    if kind.is_none() {
        errors.push(CatalogError::UnknownKind {
            at: locate(),
            section: name,
            kind: id.to_string(),
        });
    }
    kind
}

/// Where in the catalog a problem was found.
#[derive(Debug, Clone, PartialEq)]
pub struct Location {
    pub category: String,
    pub title: String,
}

impl std::fmt::Display for Location {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} / {}", self.category, self.title)
    }
}

/// A schema problem in an offerable catalog entry.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum CatalogError {
    #[error("{at}: missing {section}")]
    MissingSection { at: Location, section: &'static str },

    #[error("{at}: {section} has no type")]
    MissingType { at: Location, section: &'static str },

    #[error("{at}: {section} has unknown type '{kind}'")]
    UnknownKind {
        at: Location,
        section: &'static str,
        kind: String,
    },

    #[error("{at}: preview type {preview} does not match template type {template}")]
    KindMismatch {
        at: Location,
        preview: OverlayKind,
        template: OverlayKind,
    },
}

/// Errors loading or writing a catalog.
#[derive(Debug, thiserror::Error)]
pub enum PaletteError {
    #[error("Invalid YAML in palette: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("Invalid JSON in palette: {0}")]
    Json(#[from] serde_json::Error),
}
