//! Tera rendering engine: [`MessageKind`] and [`MessageRenderer`].
//!
//! # Templates
//!
//! | Kind     | Template          | Used for                              |
//! |----------|-------------------|---------------------------------------|
//! | PrTitle  | `pr_title.tera`   | reconciliation PR title               |
//! | PrBody   | `pr_body.tera`    | reconciliation PR body                |
//! | Preamble | `preamble.tera`   | first line of every notification      |
//! | Synced   | `synced.tera`     | status line, direct sync succeeded    |
//! | Created  | `created.tera`    | status line, manual merge needed      |
//! | Failed   | `failed.tera`     | status line, run failed               |
//!
//! A `.tera` file with the same name in the user template directory replaces
//! the embedded default.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use tera::Tera;

use forksync_core::SyncOutcome;

use crate::context::MessageContext;
use crate::error::RenderError;

// ---------------------------------------------------------------------------
// Embedded templates, baked into the binary at compile time via include_str!
// ---------------------------------------------------------------------------

const TPLS: &[(&str, &str)] = &[
    ("pr_title.tera", include_str!("templates/pr_title.tera")),
    ("pr_body.tera", include_str!("templates/pr_body.tera")),
    ("preamble.tera", include_str!("templates/preamble.tera")),
    ("synced.tera", include_str!("templates/synced.tera")),
    ("created.tera", include_str!("templates/created.tera")),
    ("failed.tera", include_str!("templates/failed.tera")),
];

// ---------------------------------------------------------------------------
// Template loading helpers
// ---------------------------------------------------------------------------

fn io_err(path: impl Into<PathBuf>, source: std::io::Error) -> RenderError {
    RenderError::Io {
        path: path.into(),
        source,
    }
}

fn normalize_template_name(path: &Path) -> String {
    path.to_string_lossy().replace('\\', "/").to_lowercase()
}

fn load_user_templates(dir: &Path) -> Result<Vec<(String, String)>, RenderError> {
    if !dir.exists() {
        return Ok(vec![]);
    }
    let entries = std::fs::read_dir(dir).map_err(|e| io_err(dir, e))?;
    let mut templates = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|e| io_err(dir, e))?;
        let path = entry.path();
        if !path.is_file() || path.extension().and_then(|s| s.to_str()) != Some("tera") {
            continue;
        }
        let Some(file_name) = path.file_name() else {
            continue;
        };
        let name = normalize_template_name(Path::new(file_name));
        let contents = std::fs::read_to_string(&path).map_err(|e| io_err(&path, e))?;
        templates.push((name, contents));
    }
    Ok(templates)
}

fn build_tera(user_template_dir: Option<&Path>) -> Result<Tera, RenderError> {
    let mut templates: HashMap<String, String> = HashMap::new();
    for (name, content) in TPLS {
        templates.insert((*name).to_string(), (*content).to_string());
    }
    if let Some(dir) = user_template_dir {
        for (name, content) in load_user_templates(dir)? {
            templates.insert(name, content);
        }
    }

    let mut tera = Tera::default();
    let items: Vec<(String, String)> = templates.into_iter().collect();
    tera.add_raw_templates(items)?;
    Ok(tera)
}

// ---------------------------------------------------------------------------
// MessageKind
// ---------------------------------------------------------------------------

/// Every piece of text a run renders.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MessageKind {
    PrTitle,
    PrBody,
    Preamble,
    Synced,
    Created,
    Failed,
}

impl MessageKind {
    /// All kinds in a stable order.
    pub fn all() -> &'static [MessageKind] {
        &[
            MessageKind::PrTitle,
            MessageKind::PrBody,
            MessageKind::Preamble,
            MessageKind::Synced,
            MessageKind::Created,
            MessageKind::Failed,
        ]
    }

    pub fn template_name(&self) -> &'static str {
        match self {
            MessageKind::PrTitle  => "pr_title.tera",
            MessageKind::PrBody   => "pr_body.tera",
            MessageKind::Preamble => "preamble.tera",
            MessageKind::Synced   => "synced.tera",
            MessageKind::Created  => "created.tera",
            MessageKind::Failed   => "failed.tera",
        }
    }

    /// Status-line template for an outcome.
    pub fn for_outcome(outcome: &SyncOutcome) -> MessageKind {
        match outcome {
            SyncOutcome::Synced { .. } => MessageKind::Synced,
            SyncOutcome::Created { .. } => MessageKind::Created,
            SyncOutcome::Failed { .. } => MessageKind::Failed,
        }
    }
}

// ---------------------------------------------------------------------------
// MessageRenderer
// ---------------------------------------------------------------------------

/// Renders PR and notification text. Create once per run and reuse.
pub struct MessageRenderer {
    tera: Tera,
}

impl MessageRenderer {
    /// Load embedded templates plus any overrides in `user_template_dir`.
    pub fn new(user_template_dir: Option<&Path>) -> Result<Self, RenderError> {
        Ok(MessageRenderer {
            tera: build_tera(user_template_dir)?,
        })
    }

    /// Render one template. Output is trimmed and uses LF line endings.
    pub fn render(&self, kind: MessageKind, ctx: &MessageContext) -> Result<String, RenderError> {
        let tera_ctx = ctx.to_tera_context()?;
        let rendered = self.tera.render(kind.template_name(), &tera_ctx)?;
        Ok(rendered.replace("\r\n", "\n").trim().to_owned())
    }

    pub fn pr_title(&self, ctx: &MessageContext) -> Result<String, RenderError> {
        self.render(MessageKind::PrTitle, ctx)
    }

    pub fn pr_body(&self, ctx: &MessageContext) -> Result<String, RenderError> {
        self.render(MessageKind::PrBody, ctx)
    }

    /// Full notification: preamble line, then the status line for `outcome`.
    pub fn notification(
        &self,
        ctx: &MessageContext,
        outcome: &SyncOutcome,
    ) -> Result<String, RenderError> {
        let ctx = ctx.clone().with_outcome(outcome);
        let preamble = self.render(MessageKind::Preamble, &ctx)?;
        let status = self.render(MessageKind::for_outcome(outcome), &ctx)?;
        Ok(format!("{preamble}\n{status}"))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
