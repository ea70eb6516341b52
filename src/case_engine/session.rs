//! One learner's walk through a case.
//!
//! A [`CaseSession`] starts at the manifest's start node and moves only when
//! the learner picks one of the current node's choices or when the node's
//! auto-advance timer fires. History is append-only; there is no undo.
//!
//! Transitions take `&mut self`, so a second choice can never interleave
//! with one that is still being applied.
//!
//! ## Auto-advance
//!
//! Entering a node with an `autoAdvance` rule schedules one timer on the
//! session's [`Scheduler`]. Leaving the node by any route cancels it, and
//! [`CaseSession::fire_timer`] ignores ids that are not the live one. A
//! torn-down session cancels its timer and refuses further transitions.

use std::time::Duration;

use chrono::{DateTime, Utc};

use crate::case_engine::{
    config::EngineConfig,
    error::{EngineError, Result},
    helpers::make_session_id,
    models::*,
    progress::{ProgressTracker, RecordOutcome},
    persistence::KeyValueStore,
    scoring::{Scorecard, ScoringKey},
    timer::{Scheduler, TimerId, VirtualClock},
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransitionCause {
    Choice(ChoiceId),
    AutoAdvance,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transition {
    pub from: NodeId,
    pub to: NodeId,
    pub cause: TransitionCause,
    pub is_terminal: bool,
}

/// Everything the rendering layer needs after a transition.
#[derive(Debug, Clone, Copy)]
pub struct CaseView<'a> {
    pub session_id: &'a str,
    pub node: &'a CaseNode,
    pub available_choices: &'a [CaseChoice],
    pub is_terminal: bool,
    pub score_so_far: i32,
    /// Delay of the live auto-advance, if one is scheduled.
    pub pending_auto_advance: Option<Duration>,
    /// The choice that led here, with its rationale.
    pub last_scored: Option<&'a ScoredChoice>,
}

#[derive(Debug, Clone)]
struct PendingAdvance {
    timer: TimerId,
    next: NodeId,
    delay: Duration,
}

pub struct CaseSession<K: ScoringKey, T: Scheduler> {
    session_id: String,
    manifest: CaseManifest,
    key: K,
    scheduler: T,
    config: EngineConfig,
    current: NodeId,
    history: Vec<ChoiceId>,
    visited: Vec<NodeId>,
    scorecard: Scorecard,
    pending: Option<PendingAdvance>,
    closed: bool,
}

impl<K: ScoringKey, T: Scheduler> CaseSession<K, T> {
    /// Validate `manifest` and enter its start node.
    pub fn start(manifest: CaseManifest, key: K, scheduler: T, config: EngineConfig) -> Result<Self> {
        manifest.validate()?;

        let session_id = make_session_id(&manifest.id, config.session_seed);
        let start = manifest.start_node_id.clone();
        let mut session = Self {
            session_id,
            scorecard: Scorecard::new(&manifest.id),
            manifest,
            key,
            scheduler,
            config,
            current: start.clone(),
            history: Vec::new(),
            visited: vec![start],
            pending: None,
            closed: false,
        };
        session.arm_auto_advance();

        tracing::info!(
            session_id = %session.session_id,
            case_id = %session.manifest.id,
            start = %session.current,
            "case session started"
        );
        Ok(session)
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    pub fn manifest(&self) -> &CaseManifest {
        &self.manifest
    }

    pub fn current_node_id(&self) -> &str {
        &self.current
    }

    pub fn current_node(&self) -> &CaseNode {
        // Every reachable id was checked by `validate` in `start`.
        &self.manifest.nodes[&self.current]
    }

    pub fn is_terminal(&self) -> bool {
        self.current_node().is_terminal()
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// Choice ids taken so far, oldest first.
    pub fn history(&self) -> &[ChoiceId] {
        &self.history
    }

    /// Node ids entered so far, including the start node.
    pub fn visited(&self) -> &[NodeId] {
        &self.visited
    }

    /// Media of every visited node in order, i.e. the segment playlist.
    pub fn segment_trail(&self) -> Vec<&CaseAsset> {
        self.visited.iter().map(|id| &self.manifest.nodes[id].asset).collect()
    }

    pub fn scorecard(&self) -> &Scorecard {
        &self.scorecard
    }

    pub fn scheduler(&self) -> &T {
        &self.scheduler
    }

    pub fn view(&self) -> CaseView<'_> {
        let node = self.current_node();
        CaseView {
            session_id: &self.session_id,
            node,
            available_choices: &node.choices,
            is_terminal: node.is_terminal(),
            score_so_far: self.scorecard.total(),
            pending_auto_advance: self.pending.as_ref().map(|p| p.delay),
            last_scored: self.scorecard.choices().last(),
        }
    }

    /// Take one of the current node's choices.
    ///
    /// An id the current node does not offer is rejected and the session is
    /// left exactly as it was.
    pub fn select_choice(&mut self, choice_id: &str) -> Result<Transition> {
        if self.closed {
            return Err(EngineError::SessionClosed);
        }
        let Some(choice) = self.current_node().choice(choice_id).cloned() else {
            tracing::warn!(
                session_id = %self.session_id,
                node = %self.current,
                choice_id,
                "rejected unavailable choice"
            );
            return Err(EngineError::UnknownChoice {
                node: self.current.clone(),
                choice: choice_id.to_string(),
            });
        };

        self.disarm_auto_advance();
        self.scorecard
            .on_choice(&self.key, &self.current, &choice.id, choice.rationale.as_deref());
        self.history.push(choice.id.clone());
        Ok(self.enter(choice.next, TransitionCause::Choice(choice.id)))
    }

    /// Host callback for an elapsed timer. Stale ids return `None`.
    pub fn fire_timer(&mut self, timer: TimerId) -> Option<Transition> {
        if self.closed {
            tracing::debug!(session_id = %self.session_id, ?timer, "timer after teardown ignored");
            return None;
        }
        match &self.pending {
            Some(p) if p.timer == timer => {}
            _ => {
                tracing::debug!(session_id = %self.session_id, ?timer, "stale timer ignored");
                return None;
            }
        }
        let pending = self.pending.take()?;
        Some(self.enter(pending.next, TransitionCause::AutoAdvance))
    }

    /// Freeze the score. Only valid once, at a terminal node.
    pub fn finalize(&mut self) -> Result<CaseScore> {
        let at_terminal = self.is_terminal();
        let xp = self.config.xp_for(self.scorecard.optimal_count());
        let score = self.scorecard.finalize(at_terminal, xp)?;
        tracing::info!(
            session_id = %self.session_id,
            total_score = score.total_score,
            xp = score.xp_earned,
            "case finalized"
        );
        Ok(score)
    }

    /// Cancel any pending auto-advance and refuse further transitions.
    pub fn teardown(&mut self) {
        if self.closed {
            return;
        }
        self.disarm_auto_advance();
        self.closed = true;
        tracing::debug!(session_id = %self.session_id, "session torn down");
    }

    fn enter(&mut self, next: NodeId, cause: TransitionCause) -> Transition {
        let from = std::mem::replace(&mut self.current, next.clone());
        self.visited.push(next.clone());
        self.arm_auto_advance();

        let is_terminal = self.is_terminal();
        tracing::debug!(
            session_id = %self.session_id,
            %from,
            to = %next,
            ?cause,
            is_terminal,
            "transition"
        );
        Transition { from, to: next, cause, is_terminal }
    }

    fn arm_auto_advance(&mut self) {
        let Some(rule) = self.current_node().auto_advance.clone() else {
            return;
        };
        let delay = rule.delay();
        let timer = self.scheduler.schedule(delay);
        self.pending = Some(PendingAdvance { timer, next: rule.next, delay });
    }

    fn disarm_auto_advance(&mut self) {
        if let Some(p) = self.pending.take() {
            self.scheduler.cancel(p.timer);
        }
    }
}

impl<K: ScoringKey> CaseSession<K, VirtualClock> {
    /// Move the session's virtual clock forward, firing timers as they
    /// come due. Timers armed by a fired transition can fire within the
    /// same call if their own deadline falls inside the window.
    pub fn advance_clock(&mut self, by: Duration) -> Vec<Transition> {
        let target = self.scheduler.now().saturating_add(by);
        let mut fired = Vec::new();
        while let Some(deadline) = self.scheduler.next_deadline() {
            if deadline > target {
                break;
            }
            let step = deadline - self.scheduler.now();
            for id in self.scheduler.advance(step) {
                fired.extend(self.fire_timer(id));
            }
        }
        let rest = target - self.scheduler.now();
        self.scheduler.advance(rest);
        fired
    }
}

impl<K: ScoringKey, T: Scheduler> Drop for CaseSession<K, T> {
    fn drop(&mut self) {
        self.teardown();
    }
}

/// What [`complete_session`] recorded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Completion {
    pub score: CaseScore,
    pub case_outcome: RecordOutcome,
    pub character: Option<(String, RecordOutcome)>,
}

/// Finalize a finished session, record it, and catch the case's character.
pub fn complete_session<K, T, S>(
    session: &mut CaseSession<K, T>,
    tracker: &mut ProgressTracker<S>,
    at: DateTime<Utc>,
) -> Result<Completion>
where
    K: ScoringKey,
    T: Scheduler,
    S: KeyValueStore,
{
    let score = session.finalize()?;
    let case_id = session.manifest().id.clone();
    let case_outcome = tracker.record_completion(&case_id, score.clone(), at);
    let character = session
        .manifest()
        .character_id
        .clone()
        .map(|id| {
            let outcome = tracker.catch_character(&id, &score, at);
            (id, outcome)
        });
    Ok(Completion { score, case_outcome, character })
}
