//! The rotation engine: the single entry point for awards, rankings and
//! roster changes.
//!
//! GRANT ORDER (fixed, one transaction, never reordered):
//!   1. Resolve the participant (must be active).
//!   2. Resolve the tier's point value.
//!   3. Mark the participant awarded in the current cycle.
//!   4. Apply the aggregate update (count, points, last award).
//!   5. Append the award to the history log.
//!   6. Check completion over the full active set; advance at most once.
//!
//! RULES:
//!   - Every mutation holds the store lock and runs in `RotationStore::atomic`.
//!     A failure at any step rolls the whole call back.
//!   - Queries hold the same lock while reading, so they never observe a
//!     partially applied award.
//!   - Ranking queries never create cycle records.
//!   - A blank tier name is rejected before anything else is read.
//!   - Participant errors (NotFound, Inactive) win over tier errors.

use crate::{
    clock::{Clock, SystemClock},
    config::{RotationConfig, UnknownTierPolicy},
    cycle_tracker::CycleTracker,
    error::{RotationError, RotationResult},
    event::{AdvanceReason, EventLogEntry, RotationEvent},
    history::{AwardEvent, AwardStats, HistoryLog},
    ranker::{self, CandidateSummary},
    roster::{
        normalize_name, AggregateUpdate, Participant, ParticipantPatch, RosterStats, RosterStore,
    },
    store::RotationStore,
    tier::{ConfigTierCatalog, Tier, TierCatalog},
    types::{from_millis, to_millis, CycleNumber, Points, Timestamp},
};
use serde::{Deserialize, Serialize};
use std::sync::{Mutex, MutexGuard};
use uuid::Uuid;

/// Result of a successful grant.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AwardOutcome {
    pub award: AwardEvent,
    /// True when this award completed the cycle and a new one was opened.
    pub rollover: bool,
    /// Cycle in effect after the call.
    pub current_cycle: CycleNumber,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RotationStatus {
    pub current_cycle: CycleNumber,
    pub total_active: u64,
    pub awarded_count: u64,
    pub pending_count: u64,
    pub rotation_complete: bool,
    pub next_candidate: Option<CandidateSummary>,
}

pub struct RotationEngine {
    store:   Mutex<RotationStore>,
    catalog: Box<dyn TierCatalog>,
    clock:   Box<dyn Clock>,
    config:  RotationConfig,
}

impl RotationEngine {
    /// Fails with `Validation` when `config` does not pass
    /// `RotationConfig::validate`.
    pub fn new(
        store: RotationStore,
        catalog: Box<dyn TierCatalog>,
        clock: Box<dyn Clock>,
        config: RotationConfig,
    ) -> RotationResult<Self> {
        config
            .validate()
            .map_err(|e| RotationError::Validation(format!("invalid config: {e}")))?;
        Ok(Self {
            store: Mutex::new(store),
            catalog,
            clock,
            config,
        })
    }

    /// Engine with the config's tier catalog and the system clock.
    /// The store must already be migrated.
    pub fn build(store: RotationStore, config: RotationConfig) -> RotationResult<Self> {
        let catalog = ConfigTierCatalog::new(config.tiers.clone());
        Self::new(store, Box::new(catalog), Box::new(SystemClock), config)
    }

    /// In-memory engine with the default test config.
    pub fn build_test() -> RotationResult<Self> {
        let store = RotationStore::in_memory()?;
        store.migrate()?;
        Self::build(store, RotationConfig::default_test())
    }

    pub fn config(&self) -> &RotationConfig {
        &self.config
    }

    fn lock(&self) -> RotationResult<MutexGuard<'_, RotationStore>> {
        self.store
            .lock()
            .map_err(|e| RotationError::Other(anyhow::anyhow!("store lock poisoned: {e}")))
    }

    /// Run `f` against the store while holding the engine lock.
    /// Used by tooling and tests that need direct store access.
    pub fn with_store<T>(
        &self,
        f: impl FnOnce(&RotationStore) -> RotationResult<T>,
    ) -> RotationResult<T> {
        let store = self.lock()?;
        f(&store)
    }

    // ── Awards ─────────────────────────────────────────────────

    /// Grant `tier_name` to a participant at `now`.
    pub fn grant_award(
        &self,
        participant_id: &str,
        tier_name: &str,
        now: Timestamp,
    ) -> RotationResult<AwardOutcome> {
        let tier_name = tier_name.trim();
        if tier_name.is_empty() {
            return Err(RotationError::Validation("tier name is required".into()));
        }
        // Stored at millisecond precision; keep the returned event identical.
        let now = from_millis(to_millis(&now));

        let store = self.lock()?;
        let outcome = store.atomic(|store| {
            let participant = store.active_participant(participant_id)?;
            let points = self.resolve_points(tier_name)?;
            if let Some(last) = participant.last_award_at {
                if now < last {
                    return Err(RotationError::Validation(format!(
                        "award time {now} precedes the last award ({last}) for '{}'",
                        participant.name
                    )));
                }
            }

            let tracker = CycleTracker::new(store);
            let cycle = tracker.mark_awarded(participant_id)?;

            store.apply_aggregate_update(
                participant_id,
                &AggregateUpdate {
                    points,
                    tier: tier_name.to_string(),
                    awarded_at: now,
                },
            )?;

            let award = AwardEvent {
                award_id: Uuid::new_v4().to_string(),
                subject_id: Some(participant.participant_id.clone()),
                subject_name: participant.name.clone(),
                tier: tier_name.to_string(),
                points,
                cycle,
                awarded_at: now,
            };
            HistoryLog::new(store).append(&award)?;
            store.append_event(
                &RotationEvent::AwardGranted {
                    award_id: award.award_id.clone(),
                    participant_id: participant.participant_id.clone(),
                    tier: award.tier.clone(),
                    points,
                    cycle,
                },
                &now,
            )?;

            let (rollover, current_cycle) =
                advance_if_complete(store, &tracker, cycle, &now)?;

            Ok(AwardOutcome { award, rollover, current_cycle })
        })?;

        log::info!(
            "cycle={} awarded {} ({} pts) to '{}'{}",
            outcome.award.cycle,
            outcome.award.tier,
            outcome.award.points,
            outcome.award.subject_name,
            if outcome.rollover { ", rotation advanced" } else { "" }
        );
        Ok(outcome)
    }

    /// Grant at the engine clock's current time.
    pub fn grant_award_now(
        &self,
        participant_id: &str,
        tier_name: &str,
    ) -> RotationResult<AwardOutcome> {
        self.grant_award(participant_id, tier_name, self.clock.now())
    }

    fn resolve_points(&self, tier_name: &str) -> RotationResult<Points> {
        match self.catalog.tier(tier_name) {
            Ok(Some(tier)) => Ok(tier.points),
            Ok(None) => match self.config.unknown_tier_policy {
                UnknownTierPolicy::Strict => Err(RotationError::UnknownTier {
                    name: tier_name.to_string(),
                }),
                UnknownTierPolicy::Permissive => {
                    log::warn!(
                        "unknown tier '{tier_name}' accepted at {} pts (permissive policy)",
                        self.config.fallback_points
                    );
                    Ok(self.config.fallback_points)
                }
            },
            Err(e) => {
                log::warn!(
                    "tier catalog unavailable ({e}); '{tier_name}' falls back to {} pts",
                    self.config.fallback_points
                );
                Ok(self.config.fallback_points)
            }
        }
    }

    /// Operator override: open a new cycle now, whatever the completion
    /// state. History is untouched.
    pub fn reset_rotation(&self) -> RotationResult<CycleNumber> {
        let now = self.clock.now();
        let store = self.lock()?;
        store.atomic(|store| {
            let active = store.active_participant_ids()?;
            let tracker = CycleTracker::new(store);
            let from_cycle = tracker.current_cycle()?;
            let to_cycle = tracker.force_advance(&active)?;
            store.append_event(
                &RotationEvent::RotationAdvanced {
                    from_cycle,
                    to_cycle,
                    reason: AdvanceReason::Manual,
                    participants: active.len(),
                },
                &now,
            )?;
            Ok(to_cycle)
        })
    }

    // ── Queries ────────────────────────────────────────────────

    pub fn current_cycle(&self) -> RotationResult<CycleNumber> {
        let store = self.lock()?;
        CycleTracker::new(&store).current_cycle()
    }

    /// Fairness ordering over the active roster.
    pub fn rank(&self) -> RotationResult<Vec<CandidateSummary>> {
        let (cycle, states) = {
            let store = self.lock()?;
            let cycle = CycleTracker::new(&store).current_cycle()?;
            (cycle, store.candidate_states(cycle)?)
        };
        log::debug!("cycle={cycle} ranking {} active participants", states.len());
        Ok(ranker::rank(states))
    }

    pub fn next_candidate(&self) -> RotationResult<Option<CandidateSummary>> {
        let states = {
            let store = self.lock()?;
            let cycle = CycleTracker::new(&store).current_cycle()?;
            store.candidate_states(cycle)?
        };
        Ok(ranker::next_candidate(states))
    }

    pub fn rotation_status(&self) -> RotationResult<RotationStatus> {
        let (current_cycle, states) = {
            let store = self.lock()?;
            let cycle = CycleTracker::new(&store).current_cycle()?;
            (cycle, store.candidate_states(cycle)?)
        };
        let total_active = states.len() as u64;
        let awarded_count = states.iter().filter(|s| s.awarded_this_cycle).count() as u64;
        let pending_count = total_active - awarded_count;
        Ok(RotationStatus {
            current_cycle,
            total_active,
            awarded_count,
            pending_count,
            rotation_complete: pending_count == 0 && total_active > 0,
            next_candidate: ranker::next_candidate(states),
        })
    }

    /// Awards for one participant, most recent first.
    pub fn history_for(&self, participant_id: &str) -> RotationResult<Vec<AwardEvent>> {
        let store = self.lock()?;
        HistoryLog::new(&store).records_for(participant_id)
    }

    /// Latest awards, bounded by `limit` or the configured default.
    pub fn recent_awards(&self, limit: Option<usize>) -> RotationResult<Vec<AwardEvent>> {
        let limit = limit.unwrap_or(self.config.default_history_limit);
        let store = self.lock()?;
        HistoryLog::new(&store).recent(limit)
    }

    pub fn award(&self, award_id: &str) -> RotationResult<AwardEvent> {
        let store = self.lock()?;
        store.award(award_id)?.ok_or_else(|| RotationError::NotFound {
            entity: "Award",
            id: award_id.to_string(),
        })
    }

    pub fn award_stats(&self) -> RotationResult<AwardStats> {
        let store = self.lock()?;
        HistoryLog::new(&store).stats(self.config.top_awardees_limit)
    }

    pub fn tiers(&self) -> RotationResult<Vec<Tier>> {
        self.catalog.tiers()
    }

    /// Engine audit log in append order.
    pub fn events(&self) -> RotationResult<Vec<EventLogEntry>> {
        self.lock()?.events()
    }

    // ── Roster ─────────────────────────────────────────────────

    pub fn add_participant(&self, name: &str, active: bool) -> RotationResult<Participant> {
        let name = normalize_name(name)?;
        let now = self.clock.now();
        let participant_id = Uuid::new_v4().to_string();

        let store = self.lock()?;
        let participant = store.atomic(|store| {
            store.insert_participant(&participant_id, &name, active, &now)?;
            if active {
                CycleTracker::new(store).ensure_tracked(&participant_id)?;
            }
            store.append_event(
                &RotationEvent::ParticipantAdded {
                    participant_id: participant_id.clone(),
                    name: name.clone(),
                    active,
                },
                &now,
            )?;
            fetch_participant(store, &participant_id)
        })?;
        log::info!("participant '{}' added (active={active})", participant.name);
        Ok(participant)
    }

    /// Apply a partial update. Activation materializes the participant's
    /// current-cycle record; deactivation re-evaluates completion.
    pub fn update_participant(
        &self,
        participant_id: &str,
        patch: ParticipantPatch,
    ) -> RotationResult<Participant> {
        if patch.is_empty() {
            return Err(RotationError::Validation("no fields to update".into()));
        }
        let patch = ParticipantPatch {
            name: patch.name.as_deref().map(normalize_name).transpose()?,
            active: patch.active,
        };
        let now = self.clock.now();

        let store = self.lock()?;
        store.atomic(|store| {
            let before = fetch_participant(store, participant_id)?;
            store.patch_participant(participant_id, &patch)?;

            let tracker = CycleTracker::new(store);
            match (before.active, patch.active) {
                (false, Some(true)) => {
                    tracker.ensure_tracked(participant_id)?;
                }
                (true, Some(false)) => {
                    let cycle = tracker.current_cycle()?;
                    advance_if_complete(store, &tracker, cycle, &now)?;
                }
                _ => {}
            }

            store.append_event(
                &RotationEvent::ParticipantUpdated {
                    participant_id: participant_id.to_string(),
                    name: patch.name.clone(),
                    active: patch.active,
                },
                &now,
            )?;
            fetch_participant(store, participant_id)
        })
    }

    pub fn set_active(&self, participant_id: &str, active: bool) -> RotationResult<Participant> {
        self.update_participant(
            participant_id,
            ParticipantPatch { name: None, active: Some(active) },
        )
    }

    /// Hard-remove a participant. Their awards stay in the ledger with the
    /// subject neutralized. Returns the number of awards anonymized.
    pub fn remove_participant(&self, participant_id: &str) -> RotationResult<u64> {
        let now = self.clock.now();
        let store = self.lock()?;
        let anonymized = store.atomic(|store| {
            let before = fetch_participant(store, participant_id)?;
            let anonymized = store.anonymize_awards(participant_id)?;
            store.delete_participant(participant_id)?;
            if before.active {
                let tracker = CycleTracker::new(store);
                let cycle = tracker.current_cycle()?;
                advance_if_complete(store, &tracker, cycle, &now)?;
            }
            store.append_event(
                &RotationEvent::ParticipantRemoved {
                    participant_id: participant_id.to_string(),
                    anonymized_awards: anonymized,
                },
                &now,
            )?;
            Ok(anonymized)
        })?;
        log::info!("participant {participant_id} removed, {anonymized} award(s) anonymized");
        Ok(anonymized)
    }

    pub fn participant(&self, participant_id: &str) -> RotationResult<Participant> {
        let store = self.lock()?;
        fetch_participant(&store, participant_id)
    }

    pub fn participants(&self) -> RotationResult<Vec<Participant>> {
        self.lock()?.participants()
    }

    pub fn active_participants(&self) -> RotationResult<Vec<Participant>> {
        self.lock()?.active_participants()
    }

    pub fn roster_stats(&self) -> RotationResult<RosterStats> {
        self.lock()?.roster_stats()
    }
}

fn fetch_participant(store: &RotationStore, participant_id: &str) -> RotationResult<Participant> {
    store
        .participant(participant_id)?
        .ok_or_else(|| RotationError::participant_not_found(participant_id))
}

/// Completion check over the current active set, logging the advance.
/// Returns (advanced, cycle now in effect).
fn advance_if_complete(
    store: &RotationStore,
    tracker: &CycleTracker<'_>,
    from_cycle: CycleNumber,
    now: &Timestamp,
) -> RotationResult<(bool, CycleNumber)> {
    let active = store.active_participant_ids()?;
    if !tracker.check_and_advance_if_complete(&active)? {
        return Ok((false, from_cycle));
    }
    let to_cycle = tracker.current_cycle()?;
    store.append_event(
        &RotationEvent::RotationAdvanced {
            from_cycle,
            to_cycle,
            reason: AdvanceReason::Completed,
            participants: active.len(),
        },
        now,
    )?;
    Ok((true, to_cycle))
}
