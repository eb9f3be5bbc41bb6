//! Step gating: turns a room's flat completion ledger into an ordered
//! sequence of playable steps. Everything here is recomputed from the
//! latest poll snapshot; the only state a client keeps is a `StepCursor`
//! holding the previous observation, so auto-advance is edge-triggered
//! rather than tracked through ad-hoc flags.

use std::collections::BTreeSet;

use contracts::Challenge;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepStatus {
    Locked,
    Unlocked,
    /// Unlocked and currently selected for viewing. Never produced by
    /// `derive_steps`; applied by `StepCursor::presented`.
    Active,
    Completed,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Step {
    pub index: usize,
    pub challenges: Vec<Challenge>,
    pub challenge_ids: Vec<u32>,
    pub completed_count: usize,
    pub status: StepStatus,
    /// Image of the most recently completed challenge in the step,
    /// approximated by list order.
    pub thumbnail_image_url: Option<String>,
}

/// Partition `challenges` into fixed-size groups in their assigned order
/// and gate each group on full completion of the previous one. An empty
/// challenge list yields zero steps.
pub fn derive_steps(
    challenges: &[Challenge],
    completed_ids: &BTreeSet<u32>,
    per_step: usize,
) -> Vec<Step> {
    if per_step == 0 {
        return Vec::new();
    }

    let mut steps: Vec<Step> = Vec::new();

    for (index, group) in challenges.chunks(per_step).enumerate() {
        let completed_in_step: Vec<&Challenge> = group
            .iter()
            .filter(|challenge| completed_ids.contains(&challenge.id))
            .collect();
        let is_complete = !group.is_empty() && completed_in_step.len() == group.len();

        let status = if is_complete {
            StepStatus::Completed
        } else if index == 0 {
            StepStatus::Unlocked
        } else if steps[index - 1].status == StepStatus::Completed {
            StepStatus::Unlocked
        } else {
            StepStatus::Locked
        };

        steps.push(Step {
            index,
            challenges: group.to_vec(),
            challenge_ids: group.iter().map(|challenge| challenge.id).collect(),
            completed_count: completed_in_step.len(),
            status,
            thumbnail_image_url: completed_in_step
                .last()
                .map(|challenge| challenge.image_url.clone()),
        });
    }

    steps
}

/// Tracks which step the viewer is on across recomputations.
///
/// Auto-advance fires only on the transition of the active step into
/// `Completed` between two consecutive observations, and only forward. A
/// manual jump is authoritative: it suppresses the auto-advance check for
/// the observation that follows it.
#[derive(Debug, Default)]
pub struct StepCursor {
    active_index: usize,
    prev_completed: BTreeSet<usize>,
    manual_jump: bool,
}

impl StepCursor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn active_index(&self) -> usize {
        self.active_index
    }

    /// Feed the latest derivation. Returns the active index after any
    /// auto-advance.
    pub fn observe(&mut self, steps: &[Step]) -> usize {
        if self.manual_jump {
            self.manual_jump = false;
        } else if let Some(current) = steps.get(self.active_index) {
            let was_completed = self.prev_completed.contains(&self.active_index);
            let is_completed = current.status == StepStatus::Completed;

            if is_completed && !was_completed {
                let target = steps.iter().position(|step| {
                    step.index > self.active_index
                        && matches!(step.status, StepStatus::Unlocked | StepStatus::Completed)
                });
                if let Some(next) = target {
                    self.active_index = next;
                }
            }
        }

        self.prev_completed = steps
            .iter()
            .filter(|step| step.status == StepStatus::Completed)
            .map(|step| step.index)
            .collect();

        self.active_index
    }

    pub fn can_navigate_to(&self, steps: &[Step], index: usize) -> bool {
        steps
            .get(index)
            .is_some_and(|step| step.status != StepStatus::Locked)
    }

    /// Explicit user navigation, either direction, any non-locked step.
    pub fn navigate_to(&mut self, steps: &[Step], index: usize) -> bool {
        if !self.can_navigate_to(steps, index) {
            return false;
        }
        self.active_index = index;
        self.manual_jump = true;
        true
    }

    /// Presentation view: the active step shows as `Active` unless locked.
    pub fn presented(&self, steps: &[Step]) -> Vec<Step> {
        steps
            .iter()
            .cloned()
            .map(|mut step| {
                if step.index == self.active_index && step.status != StepStatus::Locked {
                    step.status = StepStatus::Active;
                }
                step
            })
            .collect()
    }
}
