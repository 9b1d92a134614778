//! Post-processing of one WireViz build, shared by the CLI and library users.
//! All file access lives here; the BOM and layout modules work on strings.

use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use chrono::{DateTime, Utc};
use regex::Regex;
use serde::Serialize;

use crate::bom::{parse_tsv, write_tsv, BomTable, HtmlBom, PathContext, ReconcileSummary};
use crate::diagnostics::{Diagnostic, DiagnosticKind, DiagnosticStats};
use crate::layout::sheet::{has_layout_style, page_css};
use crate::layout::{
    inject_head_style, resolve, ContentSizes, Length, LayoutResolution, LayoutSpec, PageArea,
    PanelSize, SheetSize,
};
use crate::source::SourceDocument;

#[derive(Debug, thiserror::Error)]
pub enum WiresheetError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),
    #[error("File not found: {}", .0.display())]
    NotFound(PathBuf),
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error("TSV error: {0}")]
    Csv(#[from] csv::Error),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Harness file used when none is given.
pub const DEFAULT_YAML_CANDIDATES: &[&str] = &["drawing.yaml"];
/// Output directory, relative to the harness file.
pub const DEFAULT_OUTPUT_DIR: &str = "output";

/// Options for a post-processing run.
#[derive(Clone, Debug)]
pub struct PostprocessOptions {
    pub output_dir: Option<PathBuf>,
    pub output_name: Option<String>,
    pub apply_layout: bool,
    pub rewrite_image_paths: bool,
}

impl Default for PostprocessOptions {
    fn default() -> Self {
        Self {
            output_dir: None,
            output_name: None,
            apply_layout: true,
            rewrite_image_paths: true,
        }
    }
}

/// Files WireViz produced for one harness.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OutputPaths {
    pub dir: PathBuf,
    pub html: PathBuf,
    pub tsv: PathBuf,
    pub svg: PathBuf,
}

/// `explicit`, or the first default candidate in `cwd`.
pub fn find_source_yaml(explicit: Option<&Path>, cwd: &Path) -> Result<PathBuf, WiresheetError> {
    if let Some(path) = explicit {
        return if path.is_file() {
            Ok(path.to_path_buf())
        } else {
            Err(WiresheetError::NotFound(path.to_path_buf()))
        };
    }
    DEFAULT_YAML_CANDIDATES
        .iter()
        .map(|name| cwd.join(name))
        .find(|p| p.is_file())
        .ok_or_else(|| WiresheetError::NotFound(cwd.join(DEFAULT_YAML_CANDIDATES[0])))
}

fn source_dir(yaml: &Path) -> PathBuf {
    yaml.parent().map(Path::to_path_buf).unwrap_or_default()
}

pub fn resolve_output_paths(yaml: &Path, options: &PostprocessOptions) -> OutputPaths {
    let dir = options
        .output_dir
        .clone()
        .unwrap_or_else(|| source_dir(yaml).join(DEFAULT_OUTPUT_DIR));
    let name = options.output_name.clone().unwrap_or_else(|| {
        yaml.file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "drawing".to_string())
    });
    OutputPaths {
        html: dir.join(format!("{}.html", name)),
        tsv: dir.join(format!("{}.bom.tsv", name)),
        svg: dir.join(format!("{}.svg", name)),
        dir,
    }
}

/// One output file and what was done to it.
#[derive(Debug, Clone, Serialize)]
pub struct FileReport {
    pub path: PathBuf,
    pub notes: Vec<String>,
    /// False when the content was already up to date.
    pub written: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct PostprocessResult {
    pub source: PathBuf,
    pub output_dir: PathBuf,
    pub sheet_size: SheetSize,
    pub files: Vec<FileReport>,
    pub layout: Option<LayoutSpec>,
    pub diagnostics: Vec<Diagnostic>,
    pub stats: DiagnosticStats,
    pub processed_at: DateTime<Utc>,
}

impl PostprocessResult {
    pub fn has_warnings(&self) -> bool {
        self.stats.warnings > 0
    }
}

/// Layout for a harness without touching its outputs.
#[derive(Debug, Clone, Serialize)]
pub struct LayoutPreview {
    pub source: PathBuf,
    pub sheet_size: SheetSize,
    pub page: PageArea,
    pub content: ContentSizes,
    pub spec: LayoutSpec,
    pub diagnostics: Vec<Diagnostic>,
}

static SVG_TAG_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?s)<svg\b[^>]*>").unwrap());
static SVG_WIDTH_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"\swidth\s*=\s*["']([^"']+)["']"#).unwrap());
static SVG_HEIGHT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"\sheight\s*=\s*["']([^"']+)["']"#).unwrap());
static SVG_VIEWBOX_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"\sviewBox\s*=\s*["']([^"']+)["']"#).unwrap());

fn absolute_attr(re: &Regex, tag: &str) -> Option<f64> {
    let value = re.captures(tag)?.get(1)?.as_str().parse::<Length>().ok()?;
    (!value.is_relative()).then(|| value.to_px(0.0))
}

/// Natural drawing size from the root `<svg>` element, in pixels.
pub fn measure_svg(svg: &str) -> Option<PanelSize> {
    let tag = SVG_TAG_RE.find(svg)?.as_str();
    if let (Some(width), Some(height)) = (
        absolute_attr(&SVG_WIDTH_RE, tag),
        absolute_attr(&SVG_HEIGHT_RE, tag),
    ) {
        return Some(PanelSize { width, height });
    }
    let view_box = SVG_VIEWBOX_RE.captures(tag)?;
    let parts: Vec<f64> = view_box[1]
        .split(|c: char| c.is_whitespace() || c == ',')
        .filter(|s| !s.is_empty())
        .filter_map(|s| s.parse().ok())
        .collect();
    match parts.as_slice() {
        [_, _, width, height] => Some(PanelSize {
            width: *width,
            height: *height,
        }),
        _ => None,
    }
}

fn read_optional(path: &Path) -> Result<Option<String>, WiresheetError> {
    if !path.is_file() {
        tracing::info!("Skipping {} (not generated)", path.display());
        return Ok(None);
    }
    Ok(Some(std::fs::read_to_string(path)?))
}

fn reconcile_notes(
    summary: &ReconcileSummary,
    header_renamed: bool,
    paths_changed: bool,
) -> Vec<String> {
    let mut notes = Vec::new();
    if summary.changed() {
        notes.push("photo row merged".to_string());
    }
    if header_renamed {
        notes.push("header normalized".to_string());
    }
    if paths_changed {
        notes.push("image paths normalized".to_string());
    }
    notes
}

/// Drop diagnostics that say the same thing twice (TSV and HTML carry the
/// same BOM).
fn dedupe(diagnostics: Vec<Diagnostic>) -> Vec<Diagnostic> {
    let mut seen = std::collections::HashSet::new();
    diagnostics
        .into_iter()
        .filter(|d| seen.insert((d.kind, d.subject.clone(), d.message.clone())))
        .collect()
}

struct PendingWrite {
    path: PathBuf,
    original: String,
    content: String,
    notes: Vec<String>,
}

/// Post-processing API used by the CLI.
pub struct WiresheetCore;

impl WiresheetCore {
    /// Reconcile the BOM outputs of one harness and inject its sheet layout.
    ///
    /// Nothing is written until every file has been processed, so a fatal
    /// error leaves the outputs untouched.
    pub fn postprocess(
        yaml: &Path,
        options: &PostprocessOptions,
    ) -> Result<PostprocessResult, WiresheetError> {
        let doc = SourceDocument::load(yaml)?;
        let outputs = resolve_output_paths(yaml, options);
        let paths = if options.rewrite_image_paths {
            // Both sides absolute, so a relative YAML path and an absolute
            // output dir still relate.
            let yaml_abs = std::path::absolute(yaml)?;
            PathContext::new(source_dir(&yaml_abs), std::path::absolute(&outputs.dir)?)
        } else {
            PathContext::identity()
        };
        tracing::info!(
            "Post-processing {} into {}",
            yaml.display(),
            outputs.dir.display()
        );

        let mut diagnostics = doc.diagnostics.clone();
        let overflow = doc.notes_overflow_risk();
        let heuristic_overflow = overflow.is_some();
        diagnostics.extend(overflow);

        let mut pending = Vec::new();
        let mut reconcile_diagnostics = Vec::new();
        let mut measured_table: Option<BomTable> = None;

        if let Some(original) = read_optional(&outputs.tsv)? {
            let table = parse_tsv(&original)?;
            let header_renamed = table.has_photo_source_column();
            let (table, summary) = table.reconcile(&paths);
            let content = write_tsv(&table)?;
            pending.push(PendingWrite {
                path: outputs.tsv.clone(),
                notes: reconcile_notes(&summary, header_renamed, summary.rewritten_paths > 0),
                original,
                content,
            });
            reconcile_diagnostics.extend(summary.diagnostics);
            measured_table = Some(table);
        }

        let mut html_pending = None;
        if let Some(original) = read_optional(&outputs.html)? {
            // A document carrying our style block has been processed before;
            // its image paths are already output-relative.
            let processed = has_layout_style(&original);
            let (content, notes) = match HtmlBom::parse(&original)? {
                Some(mut bom) => {
                    let header_renamed = bom.table.has_photo_source_column();
                    let summary = bom.reconcile(&paths);
                    let mut paths_changed = summary.rewritten_paths > 0;
                    if !processed {
                        paths_changed |= bom.rewrite_surroundings(&paths);
                    }
                    let notes = reconcile_notes(&summary, header_renamed, paths_changed);
                    reconcile_diagnostics.extend(summary.diagnostics);
                    measured_table = Some(bom.table.clone());
                    (bom.render(), notes)
                }
                None => {
                    let content = if processed {
                        original.clone()
                    } else {
                        paths.rewrite_markup(&original)
                    };
                    let notes = if content != original {
                        vec!["image paths normalized".to_string()]
                    } else {
                        Vec::new()
                    };
                    (content, notes)
                }
            };
            html_pending = Some(PendingWrite {
                path: outputs.html.clone(),
                original,
                content,
                notes,
            });
        }
        diagnostics.extend(dedupe(reconcile_diagnostics));

        let svg = read_optional(&outputs.svg)?;
        let content = Self::measure_content(&doc, measured_table.as_ref(), svg.as_deref());

        let mut layout = None;
        if options.apply_layout {
            let LayoutResolution {
                spec,
                diagnostics: layout_diagnostics,
            } = resolve(&doc.layout, &content, doc.page_area())?;
            diagnostics.extend(
                layout_diagnostics
                    .into_iter()
                    .filter(|d| !(heuristic_overflow && d.kind == DiagnosticKind::NotesOverflow)),
            );
            layout = Some(spec);
        }

        if let Some(mut write) = html_pending {
            let mut css = page_css(doc.sheet_size);
            if let Some(spec) = &layout {
                css = format!("{}\n{}", css, spec.to_css());
                write.notes.push("layout injected".to_string());
            }
            write.content = inject_head_style(&write.content, &css);
            pending.push(write);
        }

        let mut files = Vec::with_capacity(pending.len());
        for write in pending {
            let changed = write.content != write.original;
            if changed {
                std::fs::write(&write.path, &write.content)?;
            }
            tracing::info!(
                "{}{}",
                write.path.display(),
                if write.notes.is_empty() {
                    String::new()
                } else {
                    format!(" ({})", write.notes.join(", "))
                }
            );
            files.push(FileReport {
                path: write.path,
                notes: write.notes,
                written: changed,
            });
        }

        for d in &diagnostics {
            if d.is_warning() {
                tracing::warn!("{}", d.message);
            }
        }

        let stats = DiagnosticStats::from_diagnostics(&diagnostics);
        Ok(PostprocessResult {
            source: yaml.to_path_buf(),
            output_dir: outputs.dir,
            sheet_size: doc.sheet_size,
            files,
            layout,
            diagnostics,
            stats,
            processed_at: Utc::now(),
        })
    }

    /// Natural panel sizes from the reconciled BOM, the notes and the SVG.
    pub fn measure_content(
        doc: &SourceDocument,
        table: Option<&BomTable>,
        svg: Option<&str>,
    ) -> ContentSizes {
        let (rows, photo_rows) = table
            .map(|t| (t.rows.len(), t.photo_row_count()))
            .unwrap_or((0, 0));
        let sizes =
            ContentSizes::estimate(rows, photo_rows, doc.note_lines(), doc.strip_detail_image);
        match svg.and_then(measure_svg) {
            Some(drawing) => sizes.with_drawing(drawing),
            None => sizes,
        }
    }

    /// Resolve the layout for `yaml` from whatever outputs exist.
    /// `bom_rows` replaces the measured BOM row count.
    pub fn preview_layout(
        yaml: &Path,
        options: &PostprocessOptions,
        bom_rows: Option<usize>,
    ) -> Result<LayoutPreview, WiresheetError> {
        let doc = SourceDocument::load(yaml)?;
        let outputs = resolve_output_paths(yaml, options);

        let table = match bom_rows {
            Some(_) => None,
            None => match read_optional(&outputs.tsv)? {
                Some(tsv) => Some(parse_tsv(&tsv)?.reconcile(&PathContext::identity()).0),
                None => None,
            },
        };
        let svg = read_optional(&outputs.svg)?;
        let mut content = Self::measure_content(&doc, table.as_ref(), svg.as_deref());
        if let Some(rows) = bom_rows {
            content.bom = ContentSizes::estimate(rows, 0, 0, false).bom;
        }

        let page = doc.page_area();
        let resolution = resolve(&doc.layout, &content, page)?;
        let mut diagnostics = doc.diagnostics.clone();
        diagnostics.extend(resolution.diagnostics);

        Ok(LayoutPreview {
            source: yaml.to_path_buf(),
            sheet_size: doc.sheet_size,
            page,
            content,
            spec: resolution.spec,
            diagnostics,
        })
    }
}
