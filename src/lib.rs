mod debug;
mod dims;
mod error;
mod imagesize;
mod matcher;
mod plan;
mod resolve;
mod sheet;

pub use error::AutosizeError;
pub use imagesize::{ImageFormat, ImageMetadata};
pub use sheet::{AtRule, AtRuleBody, Declaration, Rule, SheetItem, Stylesheet};

use debug::{DebugLogger, json_escape};
use matcher::ReferenceMatcher;
use plan::Outputs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

// Walks a style-sheet tree and, for every `background`/`background-image`
// declaration that references a local image file, inserts the declarations
// that pin the element to the image's natural size: `width` and `height`
// ahead of the matched declaration, `background-size` and
// `background-repeat` behind it. `@2x`/`@3x` asset names scale down
// accordingly. Declarations already present in a rule are never duplicated,
// so the transform is idempotent and hand-written overrides win.
pub struct Autosize {
    outputs: Outputs,
    matcher: ReferenceMatcher,
    debug: Option<Arc<DebugLogger>>,
}

impl std::fmt::Debug for Autosize {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Autosize")
            .field("outputs", &self.outputs)
            .field("debug", &self.debug.is_some())
            .finish_non_exhaustive()
    }
}

#[derive(Clone)]
pub struct AutosizeBuilder {
    width: bool,
    height: bool,
    background_size: bool,
    background_repeat: bool,
    image_path: Vec<String>,
    debug_path: Option<PathBuf>,
    capture_diagnostics: bool,
}

impl Autosize {
    pub fn builder() -> AutosizeBuilder {
        AutosizeBuilder::new()
    }

    // Mutates the tree in place. Per-declaration failures (missing files,
    // unknown formats, density mismatches) are skipped with a diagnostic and
    // never abort the walk; the only fatal condition inside the walk is a
    // matched declaration that carries no source file, which the host tree
    // must guarantee.
    pub fn transform(&self, sheet: &mut Stylesheet) -> Result<(), AutosizeError> {
        self.walk_items(&mut sheet.items)?;
        if let Some(debug) = &self.debug {
            debug.emit_summary("transform");
            debug.flush();
        }
        Ok(())
    }

    // Parse, transform and print in one step. `source` is the path of the
    // file the CSS text came from; relative references resolve against its
    // directory.
    pub fn transform_css(
        &self,
        css: &str,
        source: impl AsRef<Path>,
    ) -> Result<String, AutosizeError> {
        let absolute = std::path::absolute(source.as_ref())?;
        let mut sheet = Stylesheet::parse(css, Some(&absolute));
        self.transform(&mut sheet)?;
        Ok(sheet.to_css())
    }

    // Lines captured by an in-memory diagnostics sink; empty without one.
    pub fn debug_lines(&self) -> Vec<String> {
        self.debug
            .as_ref()
            .map(|debug| debug.lines())
            .unwrap_or_default()
    }

    fn walk_items(&self, items: &mut [SheetItem]) -> Result<(), AutosizeError> {
        for item in items {
            match item {
                SheetItem::Rule(rule) => self.process_rule(rule)?,
                SheetItem::AtRule(at_rule) => {
                    if let AtRuleBody::Items(nested) = &mut at_rule.body {
                        self.walk_items(nested)?;
                    }
                }
            }
        }
        Ok(())
    }

    // Matching runs over a snapshot of the rule's declaration list; plans are
    // applied afterwards, last match first, so recorded indices stay valid.
    fn process_rule(&self, rule: &mut Rule) -> Result<(), AutosizeError> {
        let mut planned: Vec<(usize, Vec<plan::Insertion>)> = Vec::new();
        // Properties claimed by an earlier match in this rule; a second
        // background declaration must not insert them again.
        let mut pending: Vec<&'static str> = Vec::new();

        for (index, declaration) in rule.declarations.iter().enumerate() {
            if declaration.property != "background" && declaration.property != "background-image" {
                continue;
            }
            let Some(reference) = self.matcher.first_reference(&declaration.value) else {
                continue;
            };
            let source = declaration.source.as_ref().ok_or_else(|| {
                AutosizeError::MissingSource(format!(
                    "{}: {}",
                    declaration.property, declaration.value
                ))
            })?;
            let Some(source_dir) = source.parent() else {
                return Err(AutosizeError::MissingSource(format!(
                    "{}: {}",
                    declaration.property, declaration.value
                )));
            };

            let absolute = match resolve::fix_absolute_path(source_dir, &reference.raw_path) {
                resolve::Resolved::Path(path) => path,
                resolve::Resolved::NotAnImage(path) => {
                    self.skip("not-an-image", &path);
                    continue;
                }
            };

            let metadata = match imagesize::probe(&absolute) {
                None => {
                    self.skip("file-missing", &absolute);
                    continue;
                }
                Some(imagesize::Probe::UnknownFormat) => {
                    self.skip("unknown-format", &absolute);
                    continue;
                }
                Some(imagesize::Probe::Image(metadata)) => metadata,
            };

            let size = match dims::scaled_size(&metadata, reference.density) {
                Ok(size) => size,
                Err(dims::DensityMismatch) => {
                    self.skip("density-mismatch", &absolute);
                    continue;
                }
            };

            let mut insertions = plan::plan_insertions(&rule.declarations, self.outputs, &size);
            insertions.retain(|entry| !pending.contains(&entry.property));
            if !insertions.is_empty() {
                pending.extend(insertions.iter().map(|entry| entry.property));
                planned.push((index, insertions));
            }
        }

        for (index, insertions) in planned.into_iter().rev() {
            plan::apply(rule, index, insertions);
        }
        Ok(())
    }

    fn skip(&self, reason: &str, path: &Path) {
        if let Some(debug) = &self.debug {
            debug.log_json(&format!(
                "{{\"type\":\"autosize.skip\",\"reason\":\"{}\",\"path\":\"{}\"}}",
                reason,
                json_escape(&path.display().to_string())
            ));
            debug.increment(reason, 1);
        }
    }
}

impl AutosizeBuilder {
    pub fn new() -> Self {
        Self {
            width: true,
            height: true,
            background_size: true,
            background_repeat: true,
            image_path: Vec::new(),
            debug_path: None,
            capture_diagnostics: false,
        }
    }

    pub fn width(mut self, enabled: bool) -> Self {
        self.width = enabled;
        self
    }

    pub fn height(mut self, enabled: bool) -> Self {
        self.height = enabled;
        self
    }

    pub fn background_size(mut self, enabled: bool) -> Self {
        self.background_size = enabled;
        self
    }

    pub fn background_repeat(mut self, enabled: bool) -> Self {
        self.background_repeat = enabled;
        self
    }

    // Restrict eligible references to those starting with one of these path
    // prefixes. Empty list means no restriction.
    pub fn image_path(mut self, prefixes: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.image_path = prefixes.into_iter().map(Into::into).collect();
        self
    }

    // Write JSON-line diagnostics to a file.
    pub fn debug_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.debug_path = Some(path.into());
        self
    }

    // Keep diagnostics in memory, readable via `Autosize::debug_lines`.
    pub fn capture_diagnostics(mut self, enabled: bool) -> Self {
        self.capture_diagnostics = enabled;
        self
    }

    pub fn build(self) -> Result<Autosize, AutosizeError> {
        if self
            .image_path
            .iter()
            .any(|entry| entry.trim().is_empty())
        {
            return Err(AutosizeError::InvalidConfiguration(
                "image_path entries must be non-empty".to_string(),
            ));
        }
        if self.capture_diagnostics && self.debug_path.is_some() {
            return Err(AutosizeError::InvalidConfiguration(
                "capture_diagnostics and debug_path are mutually exclusive".to_string(),
            ));
        }
        let matcher = ReferenceMatcher::new(&self.image_path)?;
        let debug = if self.capture_diagnostics {
            Some(Arc::new(DebugLogger::in_memory()))
        } else if let Some(path) = self.debug_path {
            Some(Arc::new(DebugLogger::new(path)?))
        } else {
            None
        };
        Ok(Autosize {
            outputs: Outputs {
                width: self.width,
                height: self.height,
                background_size: self.background_size,
                background_repeat: self.background_repeat,
            },
            matcher,
            debug,
        })
    }
}

impl Default for AutosizeBuilder {
    fn default() -> Self {
        Self::new()
    }
}
