use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use image::RgbaImage;
use rand::seq::SliceRandom;

use crate::assemble::carousel::{MIN_FRAMES, SheetLayout, contact_sheet, render_frames};
use crate::assemble::kenburns::{KenBurnsParams, KenBurnsSequence};
use crate::assets::background::{BackgroundRemover, background_remover_for};
use crate::assets::check::{ImageCheck, analyze_image};
use crate::assets::loader::{ImageLoader, LoadedImage};
use crate::config::{BackgroundRemovalKind, EngineConfig};
use crate::encode::still::{save_jpeg, save_webp};
use crate::encode::video::{EncodeStatus, VideoEncoder};
use crate::foundation::core::{Canvas, Mode, PixelRect, Ratio, now_ms};
use crate::foundation::error::{AutopostError, AutopostResult};
use crate::foundation::fs::remove_quietly;
use crate::layout::geometry::safe_area;
use crate::layout::mapping::Mapping;
use crate::ledger::credits::{CreditLedger, FileLedger};
use crate::render::compose::{AppliedFlags, DrawnText, LayoutOutput, LayoutRenderer, SlotsUsed};
use crate::render::text::{TextEngine, TextShaper, text_engine_for};
use crate::session::ids::{
    IdAllocator, belongs_to, committed_name, normalize_preview_id, post_stem, preview_stem,
};
use crate::session::request::{ImageRef, RenderRequest, ValidatedRequest};
use crate::session::sidecar::{ArtifactKind, CommitRecord, Sidecar, meta_path};
use crate::share::qr::{DisabledQr, ModuleQr, QrGenerator, QrStamp, StampedFrames};
use crate::share::shortlink::{ShortlinkStore, validate_target};

/// Response of a successful render.
#[derive(Clone, Debug, serde::Serialize, serde::Deserialize)]
pub struct RenderResponse {
    /// `prev_<ms>`.
    pub preview_id: String,
    /// URL of the primary preview artifact (image, sheet or poster).
    pub preview_url: String,
    /// Canonical mode.
    pub mode: Mode,
    /// Canonical ratio.
    pub ratio: Ratio,
    /// Canvas width.
    pub width: u32,
    /// Canvas height.
    pub height: u32,
    /// Drawn elements.
    #[serde(flatten)]
    pub applied: AppliedFlags,
    /// Geometry of drawn elements (first frame for multi-frame modes).
    pub slots_used: SlotsUsed,
    /// Overlay region.
    pub safe_area: PixelRect,
    /// Text actually drawn (first frame for multi-frame modes).
    pub text: DrawnText,
    /// Credits a commit will charge.
    pub cost: u64,
    /// Carousel frame URLs in order.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub frames: Vec<String>,
    /// Carousel contact sheet URL.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sheet_url: Option<String>,
    /// Video URL when encoding succeeded.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub video_url: Option<String>,
    /// WebM sibling URL.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub webm_url: Option<String>,
    /// Video outcome.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub encode_status: Option<EncodeStatus>,
    /// Short link encoded in the QR code.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub short_url: Option<String>,
    /// Source suitability report (single-image modes).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_check: Option<ImageCheck>,
    /// Sources, logos or music that failed to load and were left out.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub degraded_sources: Vec<String>,
}

/// Response of a commit.
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct CommitResponse {
    /// Always `true`; failures are errors.
    pub ok: bool,
    /// `prev_<ms>`.
    pub preview_id: String,
    /// URL of the primary committed artifact.
    pub committed_url: String,
    /// Balance of the calling account after the commit.
    pub remaining_credits: u64,
    /// The preview had been committed before; nothing was charged.
    pub already_committed: bool,
}

/// Response of a delete.
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct DeleteResponse {
    /// Always `true`.
    pub ok: bool,
    /// `prev_<ms>`.
    pub preview_id: String,
    /// Number of files removed; zero for unknown ids.
    pub removed: usize,
}

/// Preview/commit orchestrator.
///
/// Owns every capability (loader, text engine, QR generator, background remover, encoder,
/// short-link store, credit ledger), built once from [`EngineConfig`]. Render calls share no
/// mutable state apart from the id allocator; commits are serialized.
pub struct Studio {
    cfg: EngineConfig,
    generated: PathBuf,
    loader: ImageLoader,
    text: Arc<dyn TextEngine>,
    qr: Box<dyn QrGenerator>,
    background: Box<dyn BackgroundRemover>,
    renderer: LayoutRenderer,
    encoder: VideoEncoder,
    links: ShortlinkStore,
    ledger: Box<dyn CreditLedger>,
    ids: IdAllocator,
    commit_lock: Mutex<()>,
}

impl Studio {
    /// Build every capability from `cfg`.
    pub fn from_config(cfg: EngineConfig) -> AutopostResult<Self> {
        cfg.validate()?;
        let generated = cfg.generated_dir();
        std::fs::create_dir_all(&generated).map_err(|e| {
            anyhow::Error::new(e).context(format!("create '{}'", generated.display()))
        })?;

        let qr: Box<dyn QrGenerator> = if cfg.qr_enabled {
            Box::new(ModuleQr)
        } else {
            Box::new(DisabledQr)
        };
        let links = ShortlinkStore::open(
            cfg.data_dir().join("shortlinks.json"),
            cfg.logs_dir().join("clicks.jsonl"),
            &cfg.public_base_url,
        )?;
        let ledger = FileLedger::open(cfg.data_dir().join("credits.json"), cfg.initial_credits)?;
        let text = text_engine_for(&cfg)?;
        tracing::info!(
            root = %cfg.static_root.display(),
            text = text.name(),
            qr = qr.name(),
            "studio ready"
        );

        Ok(Self {
            loader: ImageLoader::new(&cfg)?,
            background: background_remover_for(cfg.background_removal),
            renderer: LayoutRenderer,
            encoder: VideoEncoder::from_config(&cfg.video),
            generated,
            text,
            qr,
            links,
            ledger: Box::new(ledger),
            ids: IdAllocator::new(),
            commit_lock: Mutex::new(()),
            cfg,
        })
    }

    /// Replace the credit ledger.
    pub fn with_ledger(mut self, ledger: Box<dyn CreditLedger>) -> Self {
        self.ledger = ledger;
        self
    }

    /// Replace the text engine.
    pub fn with_text_engine(mut self, text: Arc<dyn TextEngine>) -> Self {
        self.text = text;
        self
    }

    /// Active configuration.
    pub fn config(&self) -> &EngineConfig {
        &self.cfg
    }

    /// Directory holding every artifact and sidecar.
    pub fn generated_dir(&self) -> &Path {
        &self.generated
    }

    /// Short-link store.
    pub fn shortlinks(&self) -> &ShortlinkStore {
        &self.links
    }

    /// Render a preview.
    ///
    /// Validation, capability checks and every download happen before a preview id is allocated or
    /// any artifact is written. Nothing is charged.
    #[tracing::instrument(skip_all, fields(mode = tracing::field::Empty, ratio = tracing::field::Empty))]
    pub fn render(&self, req: &RenderRequest) -> AutopostResult<RenderResponse> {
        let v = req.validate()?;
        let span = tracing::Span::current();
        span.record("mode", v.mode.as_str());
        span.record("ratio", v.ratio.as_str());

        if v.remove_background && self.cfg.background_removal == BackgroundRemovalKind::Off {
            return Err(AutopostError::capability("background removal is not configured"));
        }
        let qr_target = self.qr_target(&v.mapping)?;

        let mut degraded = Vec::new();
        let logo = self.load_optional(v.mapping.logo_url(), "logo", &mut degraded);
        let mut shaper = self.text.shaper()?;

        let logo = logo.as_ref();
        let shaper = shaper.as_mut();
        let mut resp = match v.mode {
            Mode::Normal | Mode::Copy => {
                self.render_single(req, &v, logo, shaper, qr_target, &mut degraded)?
            }
            Mode::Carousel => {
                self.render_carousel(req, &v, logo, shaper, qr_target, &mut degraded)?
            }
            Mode::Video => self.render_video(req, &v, logo, shaper, qr_target, &mut degraded)?,
        };
        resp.degraded_sources = degraded;
        Ok(resp)
    }

    /// Promote a preview and charge its recorded cost to `account`.
    ///
    /// Committing an already committed preview returns the existing record and charges nothing.
    /// Insufficient credits leave no committed file behind.
    #[tracing::instrument(skip(self))]
    pub fn commit(&self, account: &str, preview: &str) -> AutopostResult<CommitResponse> {
        let stem = normalize_preview_id(preview)?;
        let post = post_stem(&stem);
        let _guard = self
            .commit_lock
            .lock()
            .map_err(|_| AutopostError::Other(anyhow::anyhow!("commit lock poisoned")))?;

        if let Some(rec) = CommitRecord::read(&self.generated, &post)? {
            tracing::info!(preview = %stem, post = %post, "already committed; not charging");
            return Ok(CommitResponse {
                ok: true,
                preview_id: stem,
                committed_url: rec.committed_url,
                remaining_credits: self.ledger.balance(account)?,
                already_committed: true,
            });
        }

        let sidecar = Sidecar::read(&self.generated, &stem)?
            .ok_or_else(|| AutopostError::not_found(format!("preview '{stem}'")))?;

        let mut staged = ArtifactGuard::default();
        let mut moves = Vec::with_capacity(sidecar.files.len());
        for name in &sidecar.files {
            let src = self.generated.join(name);
            let committed = committed_name(name);
            let part = self.generated.join(format!("{committed}.part"));
            staged.track(part.clone());
            std::fs::copy(&src, &part).map_err(|e| {
                if e.kind() == std::io::ErrorKind::NotFound {
                    AutopostError::not_found(format!("preview artifact '{name}'"))
                } else {
                    anyhow::Error::new(e)
                        .context(format!("stage '{}'", src.display()))
                        .into()
                }
            })?;
            moves.push((part, self.generated.join(&committed), committed));
        }

        let remaining = self.ledger.debit_if_sufficient(account, sidecar.cost)?;

        let promoted = self.promote(&moves).and_then(|files| {
            let primary = files.first().cloned().unwrap_or_default();
            let rec = CommitRecord {
                post_id: post.clone(),
                preview_id: stem.clone(),
                kind: sidecar.kind,
                committed_url: self.cfg.generated_url(&primary),
                cost: sidecar.cost,
                account: account.to_string(),
                committed_ms: now_ms(),
                files,
            };
            rec.write(&self.generated)?;
            Ok(rec)
        });
        let rec = match promoted {
            Ok(rec) => rec,
            Err(e) => {
                for (_, dst, _) in &moves {
                    remove_quietly(dst);
                }
                if let Err(refund) = self.ledger.top_up(account, sidecar.cost) {
                    tracing::error!(account, cost = sidecar.cost, error = %refund, "refund after failed commit failed");
                }
                return Err(e);
            }
        };
        staged.keep();

        tracing::info!(preview = %stem, post = %post, cost = rec.cost, remaining, "committed");
        Ok(CommitResponse {
            ok: true,
            preview_id: stem,
            committed_url: rec.committed_url,
            remaining_credits: remaining,
            already_committed: false,
        })
    }

    /// Remove a preview's artifacts and sidecar; unknown ids are a no-op.
    #[tracing::instrument(skip(self))]
    pub fn delete(&self, preview: &str) -> AutopostResult<DeleteResponse> {
        let stem = normalize_preview_id(preview)?;
        let entries = match std::fs::read_dir(&self.generated) {
            Ok(e) => e,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Ok(DeleteResponse {
                    ok: true,
                    preview_id: stem,
                    removed: 0,
                });
            }
            Err(e) => {
                return Err(anyhow::Error::new(e)
                    .context(format!("list '{}'", self.generated.display()))
                    .into());
            }
        };
        let mut removed = 0;
        for entry in entries.flatten() {
            let name = entry.file_name();
            if name.to_str().is_some_and(|n| belongs_to(n, &stem)) {
                std::fs::remove_file(entry.path()).map_err(|e| {
                    anyhow::Error::new(e).context(format!("remove '{}'", entry.path().display()))
                })?;
                removed += 1;
            }
        }
        tracing::info!(preview = %stem, removed, "preview deleted");
        Ok(DeleteResponse {
            ok: true,
            preview_id: stem,
            removed,
        })
    }

    /// Render a new preview from a stored render context.
    ///
    /// Multi-image sources are shuffled, a missing CTA gets the configured default, and an
    /// explicit discount turns the badge on. The original preview is left untouched.
    #[tracing::instrument(skip(self))]
    pub fn regenerate(&self, preview: &str) -> AutopostResult<RenderResponse> {
        self.regenerate_with(preview, &mut rand::rng())
    }

    /// [`Studio::regenerate`] with a caller-supplied shuffle source.
    pub fn regenerate_with<R: rand::Rng + ?Sized>(
        &self,
        preview: &str,
        rng: &mut R,
    ) -> AutopostResult<RenderResponse> {
        let stem = normalize_preview_id(preview)?;
        let sidecar = Sidecar::read(&self.generated, &stem)?
            .ok_or_else(|| AutopostError::not_found(format!("render context for '{stem}'")))?;

        let mut req = sidecar.render_context;
        // Single-image modes keep their source fields as-is so the same product photo is picked.
        if sidecar.mode.is_multi_image() {
            let mut images = req.collect_images();
            images.shuffle(rng);
            req.images = images.iter().map(|s| ImageRef::from(s.as_str())).collect();
            req.image_url = None;
        }
        perturb_mapping(&mut req.mapping, &self.cfg.default_cta);

        tracing::info!(from = %stem, "regenerating preview");
        self.render(&req)
    }

    /// Committed posts, newest first.
    pub fn list_committed(&self, limit: usize, offset: usize) -> AutopostResult<Vec<CommitRecord>> {
        Ok(CommitRecord::list(&self.generated)?
            .into_iter()
            .skip(offset)
            .take(limit)
            .collect())
    }

    /// Current balance of `account`.
    pub fn credits(&self, account: &str) -> AutopostResult<u64> {
        self.ledger.balance(account)
    }

    /// Add credits to `account` (billing hook).
    pub fn top_up(&self, account: &str, amount: u64) -> AutopostResult<u64> {
        let balance = self.ledger.top_up(account, amount)?;
        tracing::info!(account, amount, balance, "credits topped up");
        Ok(balance)
    }

    fn render_single(
        &self,
        req: &RenderRequest,
        v: &ValidatedRequest,
        logo: Option<&RgbaImage>,
        shaper: &mut dyn TextShaper,
        qr_target: Option<&str>,
        degraded: &mut Vec<String>,
    ) -> AutopostResult<RenderResponse> {
        let canvas = v.ratio.canvas();
        let reference = v.images.first().map(String::as_str).unwrap_or_default();

        let (out, image_check, short_url) = match self.loader.load(reference) {
            Ok(src) => {
                let check = analyze_image(&src.image, &src.reference);
                let base = self.prepare_base(src.image, v.remove_background)?;
                let qr = self.qr_stamp(qr_target, canvas)?;
                let reserved = qr.as_ref().map(|(_, s)| s.rect());
                let mut out = self
                    .renderer
                    .render_around(&base, v.ratio, &v.mapping, logo, reserved, shaper)?;
                let short_url = match qr {
                    Some((url, stamp)) => {
                        stamp.apply(&mut out.image);
                        mark_qr(&mut out.applied, &mut out.slots, stamp.rect());
                        Some(url)
                    }
                    None => None,
                };
                (out, Some(check), short_url)
            }
            Err(e) => {
                tracing::warn!(source = %reference, error = %e, "source failed to load; writing black canvas");
                degraded.push(reference.to_string());
                (black_canvas(v.ratio, canvas), None, None)
            }
        };

        let (ms, stem) = self.allocate()?;
        let mut guard = ArtifactGuard::default();
        let name = format!("{stem}.jpg");
        let path = self.generated.join(&name);
        guard.track(path.clone());
        save_jpeg(&out.image, &path)?;

        self.seal(
            guard,
            Sidecar {
                kind: ArtifactKind::Image,
                preview_id: stem.clone(),
                mode: v.mode,
                ratio: v.ratio,
                frames: 1,
                cost: self.cfg.costs.image,
                files: vec![name.clone()],
                created_ms: ms,
                encode_status: None,
                render_context: req.clone(),
            },
        )?;

        Ok(RenderResponse {
            preview_url: self.cfg.generated_url(&name),
            image_check,
            short_url,
            ..self.response_base(&stem, v, canvas, &out, self.cfg.costs.image)
        })
    }

    fn render_carousel(
        &self,
        req: &RenderRequest,
        v: &ValidatedRequest,
        logo: Option<&RgbaImage>,
        shaper: &mut dyn TextShaper,
        qr_target: Option<&str>,
        degraded: &mut Vec<String>,
    ) -> AutopostResult<RenderResponse> {
        let canvas = v.ratio.canvas();
        let bases = self.load_bases(v, degraded)?;
        let qr = self.qr_stamp(qr_target, canvas)?;
        let reserved = qr.as_ref().map(|(_, s)| s.rect());
        let outputs =
            render_frames(&self.renderer, &bases, v.ratio, &v.mapping, logo, reserved, shaper)?;

        let mut first = summarize(&outputs)?;
        let mut frames: Vec<RgbaImage> = outputs.into_iter().map(|o| o.image).collect();
        if let Some((_, stamp)) = &qr {
            frames.iter_mut().for_each(|f| stamp.apply(f));
            mark_qr(&mut first.applied, &mut first.slots, stamp.rect());
        }
        let sheet = contact_sheet(
            &frames,
            SheetLayout {
                columns: self.cfg.sheet.columns,
                thumb_width: self.cfg.sheet.thumb_width,
                ..SheetLayout::default()
            },
        )?;

        let (ms, stem) = self.allocate()?;
        let mut guard = ArtifactGuard::default();
        let sheet_name = format!("{stem}.webp");
        let mut files = vec![sheet_name.clone()];
        for (i, frame) in frames.iter().enumerate() {
            let name = format!("{stem}_f{}.webp", i + 1);
            let path = self.generated.join(&name);
            guard.track(path.clone());
            save_webp(frame, &path)?;
            files.push(name);
        }
        let sheet_path = self.generated.join(&sheet_name);
        guard.track(sheet_path.clone());
        save_webp(&sheet, &sheet_path)?;

        let cost = self.cfg.costs.carousel_per_frame * frames.len() as u64;
        let frame_urls = files[1..]
            .iter()
            .map(|n| self.cfg.generated_url(n))
            .collect();
        self.seal(
            guard,
            Sidecar {
                kind: ArtifactKind::Carousel,
                preview_id: stem.clone(),
                mode: v.mode,
                ratio: v.ratio,
                frames: frames.len(),
                cost,
                files,
                created_ms: ms,
                encode_status: None,
                render_context: req.clone(),
            },
        )?;

        let sheet_url = self.cfg.generated_url(&sheet_name);
        Ok(RenderResponse {
            preview_url: sheet_url.clone(),
            sheet_url: Some(sheet_url),
            frames: frame_urls,
            short_url: qr.map(|(url, _)| url),
            ..self.response_base(&stem, v, canvas, &first, cost)
        })
    }

    fn render_video(
        &self,
        req: &RenderRequest,
        v: &ValidatedRequest,
        logo: Option<&RgbaImage>,
        shaper: &mut dyn TextShaper,
        qr_target: Option<&str>,
        degraded: &mut Vec<String>,
    ) -> AutopostResult<RenderResponse> {
        let canvas = v.ratio.canvas();
        let bases = self.load_bases(v, degraded)?;
        let bgm = v
            .mapping
            .bgm_url()
            .and_then(|r| match self.loader.materialize(r) {
                Ok(p) => Some(p),
                Err(e) => {
                    tracing::warn!(bgm = %r, error = %e, "background music unavailable; encoding silent video");
                    degraded.push(r.to_string());
                    None
                }
            });
        let qr = self.qr_stamp(qr_target, canvas)?;
        let reserved = qr.as_ref().map(|(_, s)| s.rect());
        let outputs =
            render_frames(&self.renderer, &bases, v.ratio, &v.mapping, logo, reserved, shaper)?;
        drop(bases);

        let mut first = summarize(&outputs)?;
        let frames: Vec<RgbaImage> = outputs.into_iter().map(|o| o.image).collect();
        let sequence = KenBurnsSequence::new(&frames, KenBurnsParams::from(&self.cfg.video))?;
        let stamp = qr.as_ref().map(|(_, s)| s);
        if let Some(stamp) = stamp {
            mark_qr(&mut first.applied, &mut first.slots, stamp.rect());
        }
        let source = StampedFrames::new(&sequence, stamp);

        let (ms, stem) = self.allocate()?;
        let mut guard = ArtifactGuard::default();
        guard.track(self.generated.join(format!("{stem}.jpg")));
        let encoded = self
            .encoder
            .encode(&source, &self.generated, &stem, bgm.as_deref())?;

        let poster = file_name(&encoded.poster);
        let video = encoded.video.as_deref().map(file_name);
        let webm = encoded.webm.as_deref().map(file_name);
        let mut files = Vec::with_capacity(3);
        files.extend(video.clone());
        files.push(poster.clone());
        files.extend(webm.clone());
        for f in &files {
            guard.track(self.generated.join(f));
        }
        if encoded.status == EncodeStatus::Error {
            tracing::warn!(preview = %stem, error = ?encoded.error, "video unavailable; poster only");
        }

        let cost = self.cfg.costs.video;
        self.seal(
            guard,
            Sidecar {
                kind: ArtifactKind::Video,
                preview_id: stem.clone(),
                mode: v.mode,
                ratio: v.ratio,
                frames: frames.len(),
                cost,
                files,
                created_ms: ms,
                encode_status: Some(encoded.status),
                render_context: req.clone(),
            },
        )?;

        Ok(RenderResponse {
            preview_url: self.cfg.generated_url(&poster),
            video_url: video.map(|n| self.cfg.generated_url(&n)),
            webm_url: webm.map(|n| self.cfg.generated_url(&n)),
            encode_status: Some(encoded.status),
            short_url: qr.map(|(url, _)| url),
            ..self.response_base(&stem, v, canvas, &first, cost)
        })
    }

    fn response_base(
        &self,
        stem: &str,
        v: &ValidatedRequest,
        canvas: Canvas,
        out: &LayoutOutput,
        cost: u64,
    ) -> RenderResponse {
        RenderResponse {
            preview_id: stem.to_string(),
            preview_url: String::new(),
            mode: v.mode,
            ratio: v.ratio,
            width: canvas.width,
            height: canvas.height,
            applied: out.applied,
            slots_used: out.slots,
            safe_area: out.safe_area,
            text: out.text.clone(),
            cost,
            frames: Vec::new(),
            sheet_url: None,
            video_url: None,
            webm_url: None,
            encode_status: None,
            short_url: None,
            image_check: None,
            degraded_sources: Vec::new(),
        }
    }

    /// Decide whether the request gets a QR code.
    ///
    /// `qr_enabled: true` is an explicit opt-in and fails loudly when QR output is disabled; a bare
    /// `target_url` asks implicitly and is skipped with a warning instead.
    fn qr_target<'m>(&self, mapping: &'m Mapping) -> AutopostResult<Option<&'m str>> {
        let target = mapping.target_url();
        match (mapping.qr_enabled, target) {
            (Some(false), _) | (None, None) => Ok(None),
            (Some(true), None) => {
                tracing::warn!("qr_enabled without target_url; no QR code");
                Ok(None)
            }
            (Some(true), Some(t)) => {
                if !self.cfg.qr_enabled {
                    return Err(AutopostError::capability("qr generation is disabled"));
                }
                Ok(Some(validate_target(t)?))
            }
            (None, Some(t)) => {
                let t = validate_target(t)?;
                if !self.cfg.qr_enabled {
                    tracing::warn!(url = t, "qr generation disabled; target_url ignored");
                    return Ok(None);
                }
                Ok(Some(t))
            }
        }
    }

    fn qr_stamp(
        &self,
        target: Option<&str>,
        canvas: Canvas,
    ) -> AutopostResult<Option<(String, QrStamp)>> {
        let Some(target) = target else {
            return Ok(None);
        };
        let link = self.links.shorten(target)?;
        let url = self.links.short_url(&link.code);
        let stamp = QrStamp::new(self.qr.as_ref(), &url, canvas.width, canvas.height)?;
        Ok(Some((url, stamp)))
    }

    fn load_optional(
        &self,
        reference: Option<&str>,
        what: &str,
        degraded: &mut Vec<String>,
    ) -> Option<RgbaImage> {
        let reference = reference?;
        match self.loader.load(reference) {
            Ok(img) => Some(img.image),
            Err(e) => {
                tracing::warn!(%what, reference, error = %e, "optional image skipped");
                degraded.push(reference.to_string());
                None
            }
        }
    }

    /// Load multi-image sources, skipping failures while at least two remain.
    fn load_bases(
        &self,
        v: &ValidatedRequest,
        degraded: &mut Vec<String>,
    ) -> AutopostResult<Vec<RgbaImage>> {
        let mut loaded: Vec<LoadedImage> = Vec::with_capacity(v.images.len());
        let mut first_err = None;
        for reference in &v.images {
            match self.loader.load(reference) {
                Ok(img) => loaded.push(img),
                Err(e) => {
                    tracing::warn!(source = %reference, error = %e, "source skipped");
                    degraded.push(reference.clone());
                    if first_err.is_none() {
                        first_err = Some(e);
                    }
                }
            }
        }
        if loaded.len() < MIN_FRAMES {
            return Err(first_err.unwrap_or(AutopostError::InsufficientMedia {
                required: MIN_FRAMES,
                got: loaded.len(),
            }));
        }
        loaded
            .into_iter()
            .map(|l| self.prepare_base(l.image, v.remove_background))
            .collect()
    }

    fn prepare_base(&self, image: RgbaImage, remove_background: bool) -> AutopostResult<RgbaImage> {
        if remove_background {
            self.background.remove(&image)
        } else {
            Ok(image)
        }
    }

    /// Next free `prev_<ms>` stem; skips stamps already used on disk by an earlier process.
    fn allocate(&self) -> AutopostResult<(u64, String)> {
        loop {
            let ms = self.ids.next_ms();
            let stem = preview_stem(ms);
            let taken = meta_path(&self.generated, &stem).exists()
                || meta_path(&self.generated, &post_stem(&stem)).exists();
            if !taken {
                return Ok((ms, stem));
            }
        }
    }

    fn seal(&self, mut guard: ArtifactGuard, sidecar: Sidecar) -> AutopostResult<()> {
        sidecar.write(&self.generated)?;
        guard.keep();
        tracing::info!(
            preview = %sidecar.preview_id,
            kind = ?sidecar.kind,
            frames = sidecar.frames,
            cost = sidecar.cost,
            "preview written"
        );
        Ok(())
    }

    fn promote(&self, moves: &[(PathBuf, PathBuf, String)]) -> AutopostResult<Vec<String>> {
        let mut files = Vec::with_capacity(moves.len());
        for (part, dst, name) in moves {
            std::fs::rename(part, dst).map_err(|e| {
                anyhow::Error::new(e).context(format!("promote '{}'", dst.display()))
            })?;
            files.push(name.clone());
        }
        Ok(files)
    }
}

/// Removes tracked files on drop unless [`ArtifactGuard::keep`] was called.
#[derive(Default)]
struct ArtifactGuard {
    paths: Vec<PathBuf>,
    kept: bool,
}

impl ArtifactGuard {
    fn track(&mut self, path: PathBuf) {
        self.paths.push(path);
    }

    fn keep(&mut self) {
        self.kept = true;
    }
}

impl Drop for ArtifactGuard {
    fn drop(&mut self) {
        if !self.kept {
            self.paths.iter().for_each(|p| remove_quietly(p));
        }
    }
}

fn perturb_mapping(mapping: &mut Mapping, default_cta: &str) {
    if mapping.discount_pct.is_some() && mapping.discount_badge.is_none() {
        mapping.discount_badge = Some(true);
    }
    if mapping.cta().is_none() && !default_cta.trim().is_empty() {
        mapping.cta = Some(default_cta.to_string());
    }
}

fn black_canvas(ratio: Ratio, canvas: Canvas) -> LayoutOutput {
    LayoutOutput {
        image: RgbaImage::from_pixel(canvas.width, canvas.height, image::Rgba([0, 0, 0, 255])),
        applied: AppliedFlags::default(),
        slots: SlotsUsed::default(),
        safe_area: safe_area(ratio),
        text: DrawnText::default(),
    }
}

/// First frame's geometry with flags merged over every frame; the image is left empty.
fn summarize(outputs: &[LayoutOutput]) -> AutopostResult<LayoutOutput> {
    let first = outputs.first().ok_or(AutopostError::InsufficientMedia {
        required: MIN_FRAMES,
        got: 0,
    })?;
    let mut applied = AppliedFlags::default();
    outputs.iter().for_each(|o| applied.merge(o.applied));
    Ok(LayoutOutput {
        image: RgbaImage::new(0, 0),
        applied,
        slots: first.slots,
        safe_area: first.safe_area,
        text: first.text.clone(),
    })
}

fn mark_qr(applied: &mut AppliedFlags, slots: &mut SlotsUsed, rect: PixelRect) {
    applied.qr_applied = true;
    applied.overlay_applied = true;
    slots.qr = Some(rect);
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .and_then(|n| n.to_str())
        .unwrap_or_default()
        .to_string()
}

#[cfg(test)]
#[path = "../../tests/unit/session/studio.rs"]
mod tests;
