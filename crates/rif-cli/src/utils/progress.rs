use indicatif::{MultiProgress, ProgressBar, ProgressDrawTarget, ProgressStyle};
use rifdock::engine::progress::{Progress, ProgressCallback};
use std::fmt;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tracing::warn;

const SPINNER_TICK_MS: u64 = 100;

/// How one search stage ended.
#[derive(Debug, Clone, PartialEq)]
pub struct StageSummary {
    pub stage: usize,
    pub resolution: f64,
    pub scored: u64,
    pub kept: usize,
    pub min_score: f32,
    pub max_score: f32,
}

impl fmt::Display for StageSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "stage {} ({:.2} Å): {} scored, kept {}",
            self.stage,
            self.resolution,
            self.scored,
            self.kept
        )?;
        if self.kept > 0 {
            write!(f, " in [{:.3}, {:.3}]", self.min_score, self.max_score)?;
        }
        Ok(())
    }
}

struct ActiveStage {
    stage: usize,
    resolution: f64,
    samples: u64,
    bar: ProgressBar,
}

#[derive(Default)]
struct SearchView {
    phase: Option<(&'static str, ProgressBar)>,
    stage: Option<ActiveStage>,
    /// Bar for a task running outside any stage, such as refinement.
    task: Option<ProgressBar>,
    summaries: Vec<StageSummary>,
}

impl SearchView {
    fn handle(&mut self, multi: &MultiProgress, event: Progress) {
        match event {
            Progress::PhaseStart { name } => {
                if let Some((_, old)) = self.phase.take() {
                    old.finish_and_clear();
                }
                let spinner = multi.add(ProgressBar::new_spinner());
                spinner.set_style(spinner_style());
                spinner.enable_steady_tick(Duration::from_millis(SPINNER_TICK_MS));
                spinner.set_message(name);
                self.phase = Some((name, spinner));
            }
            Progress::PhaseFinish => {
                if let Some(task) = self.task.take() {
                    task.finish_and_clear();
                }
                if let Some((name, spinner)) = &self.phase {
                    spinner.finish_with_message(format!("✓ {}", name));
                }
            }
            Progress::StageStart {
                stage,
                resolution,
                samples,
            } => {
                let bar = multi.add(ProgressBar::new(samples));
                bar.set_style(bar_style());
                bar.set_message(format!("stage {} ({:.2} Å)", stage, resolution));
                self.stage = Some(ActiveStage {
                    stage,
                    resolution,
                    samples,
                    bar,
                });
            }
            Progress::StageFinish {
                stage,
                kept,
                min_score,
                max_score,
            } => {
                let Some(active) = self.stage.take() else {
                    warn!(stage, "Stage finished without a matching start.");
                    return;
                };
                if active.stage != stage {
                    warn!(started = active.stage, finished = stage, "Stage events out of order.");
                }
                let summary = StageSummary {
                    stage,
                    resolution: active.resolution,
                    scored: active.samples,
                    kept,
                    min_score,
                    max_score,
                };
                active.bar.finish_with_message(summary.to_string());
                self.summaries.push(summary);
            }
            Progress::TaskStart { total_steps } => match &self.stage {
                Some(active) => active.bar.set_length(total_steps),
                None => {
                    let bar = multi.add(ProgressBar::new(total_steps));
                    bar.set_style(bar_style());
                    bar.set_message(self.phase.as_ref().map_or("working", |(name, _)| *name));
                    self.task = Some(bar);
                }
            },
            Progress::TaskIncrement => {
                if let Some(active) = &self.stage {
                    active.bar.inc(1);
                } else if let Some(task) = &self.task {
                    task.inc(1);
                }
            }
            Progress::TaskFinish => {
                if let Some(active) = &self.stage {
                    active.bar.set_position(active.bar.length().unwrap_or(active.samples));
                } else if let Some(task) = self.task.take() {
                    task.finish_and_clear();
                }
            }
            Progress::Message(msg) => {
                let _ = multi.println(format!("  {}", msg));
            }
        }
    }
}

fn spinner_style() -> ProgressStyle {
    ProgressStyle::with_template("{spinner:.green} {msg}").unwrap_or_else(|_| ProgressStyle::default_spinner())
}

fn bar_style() -> ProgressStyle {
    ProgressStyle::with_template("  {msg:<28} [{bar:36.cyan/blue}] {human_pos}/{human_len} ({per_sec})")
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("=> ")
}

/// Draws a spinner per phase and one bar per search stage, sized to the
/// stage's samples and left on screen with the stage's score range.
#[derive(Clone)]
pub struct CliProgressHandler {
    multi: MultiProgress,
    view: Arc<Mutex<SearchView>>,
}

impl CliProgressHandler {
    pub fn new() -> Self {
        Self::with_draw_target(ProgressDrawTarget::stderr())
    }

    pub fn with_draw_target(target: ProgressDrawTarget) -> Self {
        Self {
            multi: MultiProgress::with_draw_target(target),
            view: Arc::new(Mutex::new(SearchView::default())),
        }
    }

    pub fn get_callback(&self) -> ProgressCallback<'static> {
        let multi = self.multi.clone();
        let view = Arc::clone(&self.view);
        Box::new(move |event: Progress| match view.lock() {
            Ok(mut view) => view.handle(&multi, event),
            Err(_) => warn!("Progress view mutex was poisoned. Cannot update progress."),
        })
    }

    /// Stages finished so far, in order.
    pub fn stage_summaries(&self) -> Vec<StageSummary> {
        self.view
            .lock()
            .map(|view| view.summaries.clone())
            .unwrap_or_default()
    }
}

impl Default for CliProgressHandler {
    fn default() -> Self {
        Self::new()
    }
}
