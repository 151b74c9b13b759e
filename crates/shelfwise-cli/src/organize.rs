//! The sequential organize loop: resolve, confirm, move, cover, sidecar.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use shelfwise_ai::CompletionClient;
use shelfwise_ai::prompts::{RENAME_SYSTEM, parse_rename_decision, rename_prompt};
use shelfwise_catalog::{Prompter, Resolution, ResolutionPipeline, download_cover};
use shelfwise_core::assemble::ResolvedBook;
use shelfwise_core::config::AppConfig;
use shelfwise_core::organize::OrganizePlan;
use shelfwise_core::storage::write_sidecar;
use tracing::{error, info, warn};

// ─── Confirmation ────────────────────────────────────────────────────────────

/// Who approves a planned rename before any file is touched.
pub enum Confirmer {
    /// Show the plan; only the answer `no` cancels.
    Ask(Arc<dyn Prompter>),
    Auto,
    /// First reply line `APPROVE` proceeds; service failures approve.
    Arbiter(Arc<dyn CompletionClient>),
}

impl Confirmer {
    pub async fn confirm(&self, plan: &OrganizePlan, book: &ResolvedBook, prompter: &dyn Prompter) -> bool {
        let old_name = file_name(&plan.source);
        let new_name = plan.display_target();

        match self {
            Confirmer::Auto => {
                describe_plan(prompter, plan, book);
                true
            }
            Confirmer::Ask(asker) => {
                describe_plan(asker.as_ref(), plan, book);
                match asker.ask("Continue? (type 'no' to cancel, anything else proceeds) ") {
                    Some(answer) if answer.trim().eq_ignore_ascii_case("no") => {
                        info!(file = %old_name, "cancelled by operator");
                        false
                    }
                    Some(_) => true,
                    None => {
                        warn!(file = %old_name, "input closed, cancelling");
                        false
                    }
                }
            }
            Confirmer::Arbiter(client) => {
                let prompt = rename_prompt(&old_name, &new_name, book);
                match client.complete(&prompt, Some(RENAME_SYSTEM)).await {
                    Ok(reply) => {
                        let approved = parse_rename_decision(&reply);
                        if approved {
                            info!(file = %old_name, "rename approved by arbiter");
                            describe_plan(prompter, plan, book);
                        } else {
                            warn!(file = %old_name, reply = %reply.lines().next().unwrap_or_default(), "rename rejected by arbiter");
                        }
                        approved
                    }
                    Err(e) => {
                        warn!(file = %old_name, error = %e, "arbiter unavailable, approving rename");
                        describe_plan(prompter, plan, book);
                        true
                    }
                }
            }
        }
    }
}

fn describe_plan(prompter: &dyn Prompter, plan: &OrganizePlan, book: &ResolvedBook) {
    prompter.say(&format!("Source:     {}", file_name(&plan.source)));
    prompter.say(&format!("New folder: {}", file_name(&plan.folder)));
    prompter.say(&format!("New file:   {}", file_name(&plan.target_file)));
    if book.record.as_ref().is_some_and(|r| r.cover_url.is_some()) {
        prompter.say("Cover:      will be downloaded");
    }
    if book.is_matched() {
        prompter.say(&format!("Sidecar:    {}", file_name(&plan.sidecar_path)));
    }
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}

// ─── Report ──────────────────────────────────────────────────────────────────

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Report {
    /// Matched in the catalog; moved with sidecar.
    pub organized: usize,
    /// No catalog match; moved under the guessed names only.
    pub bare_renamed: usize,
    pub skipped: usize,
    pub failed: usize,
}

impl Report {
    pub fn total(&self) -> usize {
        self.organized + self.bare_renamed + self.skipped + self.failed
    }

    fn record_done(&mut self, book: &ResolvedBook) {
        if book.is_matched() {
            self.organized += 1;
        } else {
            self.bare_renamed += 1;
        }
    }
}

impl std::fmt::Display for Report {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} files: {} organized, {} renamed without catalog data, {} skipped, {} failed",
            self.total(),
            self.organized,
            self.bare_renamed,
            self.skipped,
            self.failed
        )
    }
}

// ─── Loop ────────────────────────────────────────────────────────────────────

pub struct Organizer<'a> {
    pub config: &'a AppConfig,
    pub pipeline: &'a ResolutionPipeline,
    pub confirmer: &'a Confirmer,
    pub console: &'a dyn Prompter,
    pub output_dir: PathBuf,
    pub dry_run: bool,
}

impl Organizer<'_> {
    /// Processes `files` one at a time. A failure on one file never stops the run.
    pub async fn run(&self, files: &[PathBuf]) -> Report {
        let mut report = Report::default();
        for (i, path) in files.iter().enumerate() {
            self.console
                .say(&format!("\n[{}/{}] {}", i + 1, files.len(), file_name(path)));

            let book = match self.pipeline.resolve(path).await {
                Resolution::Resolved(book) => book,
                Resolution::Unresolvable { reason } => {
                    warn!(%reason, "skipping file");
                    self.console.say(&format!("Skipped: {reason}"));
                    report.skipped += 1;
                    continue;
                }
            };

            let plan = OrganizePlan::new(&self.config.library, &self.output_dir, path, &book);
            if self.dry_run {
                self.console
                    .say(&format!("{} -> {}", file_name(path), plan.display_target()));
                report.record_done(&book);
                continue;
            }

            if !self.confirmer.confirm(&plan, &book, self.console).await {
                report.skipped += 1;
                continue;
            }

            match self.apply(&plan, &book).await {
                Ok(()) => {
                    self.console.say(&format!("Done: {}", plan.display_target()));
                    report.record_done(&book);
                }
                Err(e) => {
                    error!(file = %path.display(), error = %e, "could not organize file");
                    self.console.say(&format!("Failed: {e}"));
                    report.failed += 1;
                }
            }
        }
        report
    }

    /// Moves the file, then adds cover and sidecar. Only the move is fatal for the file.
    async fn apply(&self, plan: &OrganizePlan, book: &ResolvedBook) -> shelfwise_core::Result<()> {
        plan.execute_move()?;

        let Some(record) = &book.record else {
            return Ok(());
        };
        if let Some(url) = record.cover_url.as_deref()
            && let Err(e) = download_cover(self.pipeline.catalog().fetcher(), url, &plan.cover_path).await
        {
            warn!(url, error = %e, "cover download failed");
        }
        if let Err(e) = write_sidecar(
            Some(record),
            &plan.sidecar_path,
            &self.config.preferences.sidecar_language,
        ) {
            warn!(path = %plan.sidecar_path.display(), error = %e, "sidecar not written");
        }
        Ok(())
    }
}
