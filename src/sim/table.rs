//! Table composition root
//!
//! The `Table` is the single mutator of the simulation. It owns the level
//! controller, every element with its group/pool bookkeeping, the scheduler
//! and the seeded RNG. Collaborators are injected once through `TableBuilder`.
//!
//! Every public operation ends with `flush`, which drains the outbox and hands
//! each event to the collaborator that consumes it.

use std::collections::BTreeMap;

use glam::Vec3;
use rand::SeedableRng;
use rand_pcg::Pcg32;

use super::elements::{
    BinarySwitch, Brick, Element, ElementGroup, ElementKind, SingleToggle, TargetPool, Toggleable,
};
use super::impact::ImpactProfile;
use super::level::{LevelController, UpgradePreview};
use super::state::{ElementId, GameEvent, GroupId, Mission, PoolId, UpgradeKind};
use super::timer::Scheduler;
use crate::audio::{AudioCueSink, SilentAudio};
use crate::error::{ConfigError, PurchaseError};
use crate::platform::{InputLock, NoPresentation, PhysicsCollaborator, Presentation};
use crate::settings::Settings;

/// Owner of a deferred task. Removing the owner cancels its tasks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TaskOwner {
    Group(GroupId),
}

/// Deferred actions run by the table clock
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) enum Deferred {
    ReactivateGroup(GroupId),
}

/// Linear time-scale transition, advanced by unscaled dt
#[derive(Debug, Clone, Copy, PartialEq)]
struct TimeScaleEase {
    from: f32,
    to: f32,
    elapsed: f32,
    duration: f32,
}

/// Builder for a `Table`. Physics and input are required.
pub struct TableBuilder {
    settings: Settings,
    physics: Option<Box<dyn PhysicsCollaborator>>,
    input: Option<Box<dyn InputLock>>,
    audio: Option<Box<dyn AudioCueSink>>,
    presentation: Option<Box<dyn Presentation>>,
}

impl TableBuilder {
    pub fn new(settings: Settings) -> Self {
        Self {
            settings,
            physics: None,
            input: None,
            audio: None,
            presentation: None,
        }
    }

    pub fn physics(mut self, physics: impl PhysicsCollaborator + 'static) -> Self {
        self.physics = Some(Box::new(physics));
        self
    }

    pub fn input(mut self, input: impl InputLock + 'static) -> Self {
        self.input = Some(Box::new(input));
        self
    }

    /// Optional; cues are dropped without one
    pub fn audio(mut self, audio: impl AudioCueSink + 'static) -> Self {
        self.audio = Some(Box::new(audio));
        self
    }

    /// Optional; HUD values are dropped without one
    pub fn presentation(mut self, presentation: impl Presentation + 'static) -> Self {
        self.presentation = Some(Box::new(presentation));
        self
    }

    pub fn build(self) -> Result<Table, ConfigError> {
        self.settings.validate()?;
        let physics = self.physics.ok_or(ConfigError::MissingCollaborator("physics"))?;
        let input = self.input.ok_or(ConfigError::MissingCollaborator("input"))?;
        let audio = self.audio.unwrap_or_else(|| Box::new(SilentAudio));
        let presentation = self
            .presentation
            .unwrap_or_else(|| Box::new(NoPresentation));

        log::info!("Table built (seed {:#x})", self.settings.seed);
        Ok(Table {
            level: LevelController::new(&self.settings),
            elements: BTreeMap::new(),
            groups: BTreeMap::new(),
            pools: BTreeMap::new(),
            scheduler: Scheduler::new(),
            now: 0.0,
            time_scale: self.settings.time_scale,
            time_scale_ease: None,
            rng: Pcg32::seed_from_u64(self.settings.seed),
            next_element: 0,
            next_group: 0,
            next_pool: 0,
            physics,
            input,
            audio,
            presentation,
            settings: self.settings,
        })
    }
}

/// A pinball table: progression, elements and their wiring
pub struct Table {
    pub(super) settings: Settings,
    pub(super) level: LevelController,
    pub(super) elements: BTreeMap<ElementId, Element>,
    pub(super) groups: BTreeMap<GroupId, ElementGroup>,
    pub(super) pools: BTreeMap<PoolId, TargetPool>,
    pub(super) scheduler: Scheduler<TaskOwner, Deferred>,
    /// Simulated clock, advanced by scaled dt
    pub(super) now: f64,
    pub(super) time_scale: f32,
    time_scale_ease: Option<TimeScaleEase>,
    pub(super) rng: Pcg32,

    next_element: u32,
    next_group: u32,
    next_pool: u32,

    pub(super) physics: Box<dyn PhysicsCollaborator>,
    input: Box<dyn InputLock>,
    audio: Box<dyn AudioCueSink>,
    presentation: Box<dyn Presentation>,
}

impl Table {
    pub fn builder(settings: Settings) -> TableBuilder {
        TableBuilder::new(settings)
    }

    // === Layout ===

    fn next_element_id(&mut self) -> ElementId {
        let id = ElementId(self.next_element);
        self.next_element += 1;
        id
    }

    fn insert(&mut self, position: Vec3, kind: ElementKind) -> ElementId {
        let id = self.next_element_id();
        self.elements.insert(id, Element::new(id, position, kind));
        id
    }

    /// Always-on bumper
    pub fn add_bumper(&mut self, position: Vec3, profile: ImpactProfile) -> ElementId {
        self.insert(position, ElementKind::Bumper(profile))
    }

    /// Standalone single-hit button. Stays dark once hit.
    pub fn add_button(&mut self, position: Vec3, profile: ImpactProfile) -> ElementId {
        self.insert(
            position,
            ElementKind::Button {
                profile,
                toggle: SingleToggle::default(),
                group: None,
            },
        )
    }

    /// A group of buttons paying `settings.group_reward` once all are hit
    pub fn add_group(&mut self, profile: ImpactProfile, positions: &[Vec3]) -> GroupId {
        let reward = self.settings.group_reward;
        self.add_group_with_reward(profile, positions, reward)
    }

    pub fn add_group_with_reward(
        &mut self,
        profile: ImpactProfile,
        positions: &[Vec3],
        reward: u64,
    ) -> GroupId {
        let group = GroupId(self.next_group);
        self.next_group += 1;

        let members = positions
            .iter()
            .map(|&position| {
                self.insert(
                    position,
                    ElementKind::Button {
                        profile,
                        toggle: SingleToggle::default(),
                        group: Some(group),
                    },
                )
            })
            .collect();
        self.groups
            .insert(group, ElementGroup::new(group, members, reward));
        group
    }

    /// A pool of targets with one lit at a time. Lights the first one immediately.
    pub fn add_target_pool(&mut self, profile: ImpactProfile, positions: &[Vec3]) -> PoolId {
        let pool_id = PoolId(self.next_pool);
        self.next_pool += 1;

        let members: Vec<ElementId> = positions
            .iter()
            .map(|&position| {
                let mut toggle = SingleToggle::default();
                toggle.set_active(false);
                self.insert(
                    position,
                    ElementKind::Target {
                        profile,
                        toggle,
                        pool: pool_id,
                    },
                )
            })
            .collect();

        let mut pool = TargetPool::new(pool_id, members);
        if let Some(first) = pool.init(&mut self.rng) {
            self.set_element_active(first, true);
        }
        self.pools.insert(pool_id, pool);
        self.flush();
        pool_id
    }

    pub fn add_switch(&mut self, position: Vec3, start_on: bool) -> ElementId {
        self.insert(position, ElementKind::Switch(BinarySwitch::new(start_on)))
    }

    pub fn add_brick(&mut self, position: Vec3, profile: ImpactProfile, hp: u32) -> ElementId {
        self.insert(
            position,
            ElementKind::Brick {
                profile,
                brick: Brick::new(hp),
            },
        )
    }

    /// Tear down a group and its buttons. Pending reactivations are cancelled.
    pub fn remove_group(&mut self, group: GroupId) -> bool {
        let Some(removed) = self.groups.remove(&group) else {
            log::warn!("Remove requested for unknown group {}", group.0);
            return false;
        };
        let cancelled = self.scheduler.cancel_owner(&TaskOwner::Group(group));
        for member in removed.members() {
            self.elements.remove(member);
        }
        log::info!(
            "Removed group {} ({} buttons, {} pending tasks cancelled)",
            group.0,
            removed.members().len(),
            cancelled
        );
        true
    }

    /// Set an element's on/off state, reporting only real changes
    pub(super) fn set_element_active(&mut self, id: ElementId, active: bool) {
        let Some(element) = self.elements.get_mut(&id) else {
            log::warn!("State change for unknown element {}", id.0);
            return;
        };
        if element.set_active(active).is_some() {
            self.level
                .emit(GameEvent::ElementChanged { element: id, active });
        }
    }

    // === Level operations ===

    pub fn start_level(&mut self) -> Result<(), ConfigError> {
        let result = self.level.start_level();
        self.flush();
        result
    }

    pub fn select_mission(&mut self, mission: Mission) {
        self.level.select_mission(mission);
        self.flush();
    }

    pub fn upgrade(&mut self, kind: UpgradeKind) {
        self.level.upgrade(kind);
        self.flush();
    }

    pub fn purchase(&mut self, kind: UpgradeKind) -> Result<u64, PurchaseError> {
        let result = self.level.purchase(kind);
        self.flush();
        result
    }

    pub fn upgrade_preview(&self, kind: UpgradeKind) -> UpgradePreview {
        self.level.upgrade_preview(kind)
    }

    /// Scale applied to every future tick's dt. Negative and non-finite values become 0.
    /// Cancels any transition in progress.
    pub fn set_time_scale(&mut self, scale: f32) {
        self.time_scale_ease = None;
        self.time_scale = clamp_scale(scale);
        log::debug!("Time scale set to {}", self.time_scale);
    }

    /// Move the time scale to `target` linearly over `duration` real seconds
    pub fn ease_time_scale(&mut self, target: f32, duration: f32) {
        if !(duration.is_finite() && duration > 0.0) {
            self.set_time_scale(target);
            return;
        }
        self.time_scale_ease = Some(TimeScaleEase {
            from: self.time_scale,
            to: clamp_scale(target),
            elapsed: 0.0,
            duration,
        });
    }

    /// Step a pending transition by unscaled `dt`
    pub(super) fn advance_time_scale(&mut self, dt: f32) {
        let Some(mut ease) = self.time_scale_ease else {
            return;
        };
        ease.elapsed += dt;
        let t = (ease.elapsed / ease.duration).min(1.0);
        self.time_scale = ease.from + (ease.to - ease.from) * t;
        if t >= 1.0 {
            self.time_scale = ease.to;
            self.time_scale_ease = None;
            log::debug!("Time scale reached {}", ease.to);
        } else {
            self.time_scale_ease = Some(ease);
        }
    }

    // === Dispatch ===

    /// Hand every pending event to its collaborator
    pub(super) fn flush(&mut self) {
        for event in self.level.take_events() {
            match event {
                GameEvent::Cue(cue) => self.audio.play(cue),
                GameEvent::Impulse { ball, impulse } => self.physics.apply_impulse(ball, impulse),
                GameEvent::Respawn { ball, at } => self.physics.respawn(ball, at),
                GameEvent::SetMass { ball, mass } => self.physics.set_mass(ball, mass),
                GameEvent::FlipperLock(locked) => self.input.set_flipper_lock(locked),
                other => self.presentation.show(&other),
            }
        }
    }

    // === Accessors ===

    pub fn level(&self) -> &LevelController {
        &self.level
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Simulated time since the table was built
    pub fn now(&self) -> f64 {
        self.now
    }

    pub fn time_scale(&self) -> f32 {
        self.time_scale
    }

    pub fn element(&self, id: ElementId) -> Option<&Element> {
        self.elements.get(&id)
    }

    pub fn elements(&self) -> impl Iterator<Item = &Element> {
        self.elements.values()
    }

    pub fn group(&self, id: GroupId) -> Option<&ElementGroup> {
        self.groups.get(&id)
    }

    pub fn pool(&self, id: PoolId) -> Option<&TargetPool> {
        self.pools.get(&id)
    }

    pub fn pending_tasks(&self) -> usize {
        self.scheduler.len()
    }
}

fn clamp_scale(scale: f32) -> f32 {
    if scale.is_finite() { scale.max(0.0) } else { 0.0 }
}
