//! Batch orchestration: classify a listing and join every group.

use crate::join::{JoinFailure, JoinOutcome, Joiner};
use clipjoin_av::TemplateContext;
use clipjoin_common::paths::{sanitize_file_name, strip_extension};
use clipjoin_common::{Classification, Classifier, FragmentGroup, GroupKey};
use std::collections::{BTreeMap, HashMap};
use std::path::Path;

/// Progress notification emitted while a batch runs.
#[derive(Debug)]
pub enum BatchEvent<'a> {
    /// A group is about to be joined. `index` is 0-based.
    Started {
        index: usize,
        total: usize,
        group: &'a FragmentGroup,
        destination: &'a str,
    },
    /// A group finished, successfully or not.
    Finished {
        index: usize,
        total: usize,
        key: &'a GroupKey,
        outcome: &'a JoinOutcome,
    },
}

/// Progress callback type
pub type ProgressCallback = Box<dyn Fn(&BatchEvent<'_>) + Send + Sync>;

/// Renders output names for groups.
#[derive(Debug, Clone)]
pub struct DestinationNaming {
    template: String,
    extension: String,
}

impl DestinationNaming {
    /// `template` may use `{key}`, `{index}` (1-based) and `{count}`.
    pub fn new(template: impl Into<String>, extension: impl Into<String>) -> Self {
        Self {
            template: template.into(),
            extension: extension.into(),
        }
    }

    /// Output name (without extension) for the `index`-th group.
    pub fn render(&self, group: &FragmentGroup, index: usize) -> Result<String, JoinFailure> {
        let ctx = TemplateContext::new()
            .with_var("key", group.key())
            .with_var("index", index + 1)
            .with_var("count", group.len());
        let rendered = ctx.substitute(&self.template);
        let name = strip_extension(rendered.trim(), &self.extension);

        sanitize_file_name(name).map_err(|e| JoinFailure::InvalidRequest(e.to_string()))
    }
}

/// A group together with the name it will be written under.
#[derive(Debug, Clone)]
pub struct PlannedJoin {
    pub group: FragmentGroup,
    /// Output name without extension, or why no usable name exists
    pub destination: Result<String, JoinFailure>,
    /// Numbering irregularities, rendered
    pub warnings: Vec<String>,
}

/// Final state of one group.
#[derive(Debug, Clone)]
pub struct GroupOutcome {
    pub group: FragmentGroup,
    /// Output name the group was assigned, if any
    pub destination: Option<String>,
    pub outcome: JoinOutcome,
}

/// Everything a batch produced, keyed by group.
#[derive(Debug, Clone, Default)]
pub struct BatchReport {
    outcomes: BTreeMap<GroupKey, GroupOutcome>,
    /// Recordings skipped because they are already whole
    pub completed: Vec<String>,
    /// Names skipped because they are not videos
    pub ignored: Vec<String>,
}

impl BatchReport {
    /// Outcomes in group-key order.
    pub fn outcomes(&self) -> &BTreeMap<GroupKey, GroupOutcome> {
        &self.outcomes
    }

    /// Outcome for one group.
    pub fn outcome(&self, key: &str) -> Option<&JoinOutcome> {
        self.outcomes.get(key).map(|g| &g.outcome)
    }

    pub fn len(&self) -> usize {
        self.outcomes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.outcomes.is_empty()
    }

    pub fn successes(&self) -> impl Iterator<Item = &GroupOutcome> {
        self.outcomes.values().filter(|g| g.outcome.is_success())
    }

    pub fn failures(&self) -> impl Iterator<Item = &GroupOutcome> {
        self.outcomes.values().filter(|g| !g.outcome.is_success())
    }

    /// True when no group failed.
    pub fn is_success(&self) -> bool {
        self.failures().next().is_none()
    }

    /// Fragments that ended up in a joined file.
    pub fn joined_fragments(&self) -> usize {
        self.successes().map(|g| g.group.len()).sum()
    }

    /// Total size of all joined files.
    pub fn output_bytes(&self) -> u64 {
        self.successes()
            .filter_map(|g| g.outcome.joined())
            .map(|j| j.size)
            .sum()
    }
}

/// Drives a [`Joiner`] over every group in a listing, one group at a time.
pub struct BatchRunner<'a> {
    classifier: &'a Classifier,
    joiner: &'a dyn Joiner,
    naming: DestinationNaming,
    progress_callback: Option<ProgressCallback>,
}

impl<'a> BatchRunner<'a> {
    pub fn new(classifier: &'a Classifier, joiner: &'a dyn Joiner) -> Self {
        Self {
            classifier,
            joiner,
            naming: DestinationNaming::new("{key}", classifier.extension()),
            progress_callback: None,
        }
    }

    pub fn with_naming(mut self, naming: DestinationNaming) -> Self {
        self.naming = naming;
        self
    }

    pub fn with_progress_callback(mut self, callback: ProgressCallback) -> Self {
        self.progress_callback = Some(callback);
        self
    }

    fn report_progress(&self, event: &BatchEvent<'_>) {
        if let Some(ref cb) = self.progress_callback {
            cb(event);
        }
    }

    /// Assign output names to the groups of `classification` without joining.
    ///
    /// When two groups resolve to the same output name, the later group gets
    /// an invalid-request error. Names are compared after `to_lowercase()`,
    /// so groups whose names differ only in case also collide, even on a
    /// case-sensitive output filesystem.
    pub fn plan(&self, classification: &Classification) -> Vec<PlannedJoin> {
        let mut claimed: HashMap<String, GroupKey> = HashMap::new();

        classification
            .groups
            .iter()
            .enumerate()
            .map(|(index, group)| {
                let destination = self.naming.render(group, index).and_then(|name| {
                    let folded = name.to_lowercase();
                    match claimed.get(&folded) {
                        Some(owner) => Err(JoinFailure::InvalidRequest(format!(
                            "output name '{}' is already used by group {}",
                            name, owner
                        ))),
                        None => {
                            claimed.insert(folded, group.key().clone());
                            Ok(name)
                        }
                    }
                });

                PlannedJoin {
                    group: group.clone(),
                    destination,
                    warnings: group
                        .sequence_issues()
                        .iter()
                        .map(ToString::to_string)
                        .collect(),
                }
            })
            .collect()
    }

    /// Classify `names` (found in `source_dir`) and join every group into
    /// `output_dir`.
    ///
    /// Never stops early: every group gets an outcome.
    pub fn run<I, S>(&self, names: I, source_dir: &Path, output_dir: &Path) -> BatchReport
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let classification = self.classifier.partition(names);
        self.run_classified(classification, source_dir, output_dir)
    }

    /// Join the groups of an existing classification.
    pub fn run_classified(
        &self,
        classification: Classification,
        source_dir: &Path,
        output_dir: &Path,
    ) -> BatchReport {
        let plan = self.plan(&classification);
        let total = plan.len();
        let mut outcomes = BTreeMap::new();

        if !classification.completed.is_empty() {
            tracing::info!(
                "Skipping {} already-joined recording(s)",
                classification.completed.len()
            );
        }

        for (index, planned) in plan.into_iter().enumerate() {
            let PlannedJoin {
                group,
                destination,
                warnings,
            } = planned;

            for warning in &warnings {
                tracing::warn!("Group {}: {}", group.key(), warning);
            }

            let (destination, outcome) = match destination {
                Ok(name) => {
                    self.report_progress(&BatchEvent::Started {
                        index,
                        total,
                        group: &group,
                        destination: &name,
                    });
                    tracing::info!(
                        "[{}/{}] Joining group {} ({} fragment(s)) as {}",
                        index + 1,
                        total,
                        group.key(),
                        group.len(),
                        name
                    );
                    let outcome = self
                        .joiner
                        .join(&group.paths_in(source_dir), &name, output_dir);
                    (Some(name), outcome)
                }
                Err(failure) => (None, JoinOutcome::Failure(failure)),
            };

            match &outcome {
                JoinOutcome::Success(joined) => {
                    tracing::info!("Group {} joined into {:?}", group.key(), joined.path)
                }
                JoinOutcome::Failure(failure) => {
                    tracing::error!("Group {} failed: {}", group.key(), failure)
                }
            }

            self.report_progress(&BatchEvent::Finished {
                index,
                total,
                key: group.key(),
                outcome: &outcome,
            });

            outcomes.insert(
                group.key().clone(),
                GroupOutcome {
                    group,
                    destination,
                    outcome,
                },
            );
        }

        BatchReport {
            outcomes,
            completed: classification.completed,
            ignored: classification.ignored,
        }
    }
}
