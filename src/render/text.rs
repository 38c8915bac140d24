use std::borrow::Cow;
use std::path::Path;
use std::sync::Arc;

use anyhow::Context;

use crate::config::{EngineConfig, TextBackendKind};
use crate::foundation::error::{AutopostError, AutopostResult};

/// Advance of one block glyph relative to the font size.
const BLOCK_ADVANCE_EM: f32 = 0.6;
/// Line box height relative to the font size.
const LINE_HEIGHT_EM: f32 = 1.2;

/// Paint instructions for one shaped line, in line-local coordinates (origin at line top-left).
#[derive(Clone)]
pub enum GlyphPaint {
    /// Outline glyphs positioned on the baseline.
    Outline {
        /// Font the glyph ids refer to.
        font: vello_cpu::peniko::FontData,
        /// Font size in pixels.
        size: f32,
        /// Positioned glyphs.
        glyphs: Vec<vello_cpu::Glyph>,
    },
    /// Solid glyph boxes from the font-free shaper.
    Blocks(Vec<kurbo::Rect>),
}

/// A single shaped line ready to paint.
#[derive(Clone)]
pub struct ShapedLine {
    /// Advance width in pixels.
    pub width: f32,
    /// Line box height in pixels.
    pub height: f32,
    /// Paint runs.
    pub paint: Vec<GlyphPaint>,
}

/// Measures and shapes single lines of text.
///
/// Shapers are cheap to create and owned by one render call.
pub trait TextShaper {
    /// Advance width of `text` at `size_px`.
    fn measure(&mut self, text: &str, size_px: f32) -> f32;

    /// Line box height at `size_px`.
    fn line_height(&self, size_px: f32) -> f32 {
        size_px * LINE_HEIGHT_EM
    }

    /// Shape one line for painting.
    fn shape_line(&mut self, text: &str, size_px: f32) -> AutopostResult<ShapedLine>;
}

/// Text capability selected at startup; hands out per-render shapers.
pub trait TextEngine: Send + Sync {
    /// Short backend name for logs.
    fn name(&self) -> &'static str;
    /// Create a shaper for one render call.
    fn shaper(&self) -> AutopostResult<Box<dyn TextShaper>>;
}

/// Font-free engine: every character advances by `0.6 em` and paints as a box.
#[derive(Debug, Default, Clone, Copy)]
pub struct BlockTextEngine;

impl TextEngine for BlockTextEngine {
    fn name(&self) -> &'static str {
        "block"
    }

    fn shaper(&self) -> AutopostResult<Box<dyn TextShaper>> {
        Ok(Box::new(BlockShaper))
    }
}

/// Fixed-advance shaper used by [`BlockTextEngine`].
#[derive(Debug, Default, Clone, Copy)]
pub struct BlockShaper;

impl TextShaper for BlockShaper {
    fn measure(&mut self, text: &str, size_px: f32) -> f32 {
        text.chars().count() as f32 * size_px * BLOCK_ADVANCE_EM
    }

    fn shape_line(&mut self, text: &str, size_px: f32) -> AutopostResult<ShapedLine> {
        let adv = f64::from(size_px * BLOCK_ADVANCE_EM);
        let size = f64::from(size_px);
        let blocks = text
            .chars()
            .enumerate()
            .filter(|(_, c)| !c.is_whitespace())
            .map(|(i, _)| {
                let x0 = i as f64 * adv + adv * 0.1;
                kurbo::Rect::new(x0, size * 0.3, x0 + adv * 0.8, size * 1.05)
            })
            .collect();
        Ok(ShapedLine {
            width: self.measure(text, size_px),
            height: self.line_height(size_px),
            paint: vec![GlyphPaint::Blocks(blocks)],
        })
    }
}

/// Parley-backed engine holding one font face.
///
/// The font bytes are loaded once; shapers share them through reference-counted blobs.
pub struct ParleyTextEngine {
    layout_blob: parley::fontique::Blob<u8>,
    font: vello_cpu::peniko::FontData,
}

impl ParleyTextEngine {
    fn from_bytes(bytes: Vec<u8>, face_index: u32) -> Self {
        let shared: Arc<Vec<u8>> = Arc::new(bytes);
        Self {
            layout_blob: parley::fontique::Blob::new(shared.clone()),
            font: vello_cpu::peniko::FontData::new(
                vello_cpu::peniko::Blob::new(shared),
                face_index,
            ),
        }
    }

    /// Use the font file at `path`.
    pub fn from_font_file(path: &Path) -> AutopostResult<Self> {
        let bytes = std::fs::read(path)
            .with_context(|| format!("read font file '{}'", path.display()))?;
        Ok(Self::from_bytes(bytes, 0))
    }

    /// Pick a bold sans-serif face from the system font database.
    pub fn from_system_fonts() -> Option<Self> {
        let mut db = usvg::fontdb::Database::new();
        db.load_system_fonts();
        let families = [usvg::fontdb::Family::SansSerif];
        let id = db
            .query(&usvg::fontdb::Query {
                families: &families,
                weight: usvg::fontdb::Weight::BOLD,
                stretch: usvg::fontdb::Stretch::Normal,
                style: usvg::fontdb::Style::Normal,
            })
            .or_else(|| db.faces().next().map(|f| f.id))?;
        db.with_face_data(id, |data, index| Self::from_bytes(data.to_vec(), index))
    }

    fn parley_shaper(&self) -> AutopostResult<ParleyShaper> {
        let mut font_ctx = parley::FontContext::default();
        let families = font_ctx
            .collection
            .register_fonts(self.layout_blob.clone(), None);
        let family_id = families.first().map(|(id, _)| *id).ok_or_else(|| {
            AutopostError::capability("no font families registered from font bytes")
        })?;
        let family_name = font_ctx
            .collection
            .family_name(family_id)
            .ok_or_else(|| AutopostError::capability("registered font family has no name"))?
            .to_string();
        Ok(ParleyShaper {
            font_ctx,
            layout_ctx: parley::LayoutContext::new(),
            family_name,
            font: self.font.clone(),
        })
    }
}

impl TextEngine for ParleyTextEngine {
    fn name(&self) -> &'static str {
        "parley"
    }

    fn shaper(&self) -> AutopostResult<Box<dyn TextShaper>> {
        Ok(Box::new(self.parley_shaper()?))
    }
}

/// Shaper backed by Parley layout.
pub struct ParleyShaper {
    font_ctx: parley::FontContext,
    layout_ctx: parley::LayoutContext<()>,
    family_name: String,
    font: vello_cpu::peniko::FontData,
}

impl ParleyShaper {
    fn layout(&mut self, text: &str, size_px: f32) -> parley::Layout<()> {
        let mut builder = self
            .layout_ctx
            .ranged_builder(&mut self.font_ctx, text, 1.0, true);
        builder.push_default(parley::style::StyleProperty::FontStack(
            parley::style::FontStack::Source(Cow::Borrowed(self.family_name.as_str())),
        ));
        builder.push_default(parley::style::StyleProperty::FontSize(size_px));
        let mut layout: parley::Layout<()> = builder.build(text);
        layout.break_all_lines(None);
        layout
    }
}

impl TextShaper for ParleyShaper {
    fn measure(&mut self, text: &str, size_px: f32) -> f32 {
        if text.is_empty() {
            return 0.0;
        }
        self.layout(text, size_px).width()
    }

    fn shape_line(&mut self, text: &str, size_px: f32) -> AutopostResult<ShapedLine> {
        if !size_px.is_finite() || size_px <= 0.0 {
            return Err(AutopostError::validation(
                "bad_text",
                "text size_px must be finite and > 0",
            ));
        }
        let layout = self.layout(text, size_px);
        let mut paint = Vec::new();
        for line in layout.lines() {
            for item in line.items() {
                let parley::layout::PositionedLayoutItem::GlyphRun(run) = item else {
                    continue;
                };
                let glyphs: Vec<vello_cpu::Glyph> = run
                    .positioned_glyphs()
                    .map(|g| vello_cpu::Glyph {
                        id: g.id,
                        x: g.x,
                        y: g.y,
                    })
                    .collect();
                paint.push(GlyphPaint::Outline {
                    font: self.font.clone(),
                    size: run.run().font_size(),
                    glyphs,
                });
            }
        }
        Ok(ShapedLine {
            width: layout.width(),
            height: layout.height().max(self.line_height(size_px)),
            paint,
        })
    }
}

/// Construct the configured text engine.
///
/// A Parley backend without any usable font degrades to the block engine with a warning.
pub fn text_engine_for(cfg: &EngineConfig) -> AutopostResult<Arc<dyn TextEngine>> {
    match cfg.text_backend {
        TextBackendKind::Block => Ok(Arc::new(BlockTextEngine)),
        TextBackendKind::Parley => {
            if let Some(path) = cfg.font_path.as_deref() {
                return Ok(Arc::new(ParleyTextEngine::from_font_file(path)?));
            }
            match ParleyTextEngine::from_system_fonts() {
                Some(engine) => Ok(Arc::new(engine)),
                None => {
                    tracing::warn!("no system font found; using block text engine");
                    Ok(Arc::new(BlockTextEngine))
                }
            }
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/render/text.rs"]
mod tests;
