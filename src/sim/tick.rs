//! Fixed timestep simulation tick
//!
//! One tick resolves everything physics reported since the last one, then
//! advances the energy model, the level timer and the scheduler.

use glam::Vec3;

use super::elements::{ElementKind, Impactable, ToggleNotice};
use super::impact::{ContactEvent, ImpactProfile};
use super::state::{BallId, ElementId, GameEvent, GroupId};
use super::table::{Deferred, Table, TaskOwner};
use crate::audio::AudioCue;

/// Physics reports for a single tick
#[derive(Debug, Clone, Default)]
pub struct TickInput {
    /// Ball/element contacts, in the order physics detected them
    pub contacts: Vec<ContactEvent>,
    /// Balls that crossed the launcher exit
    pub launched: Vec<BallId>,
    /// Balls that dropped off the table
    pub fallen: Vec<BallId>,
}

/// Advance the table by `dt` real seconds (scaled by the table's time scale)
pub fn tick(table: &mut Table, input: &TickInput, dt: f32) {
    let dt = if dt.is_finite() { dt.max(0.0) } else { 0.0 };
    table.advance_time_scale(dt);
    let scaled_dt = dt * table.time_scale;
    table.now += scaled_dt as f64;

    for contact in &input.contacts {
        resolve_contact(table, contact);
    }

    for &ball in &input.launched {
        table.level.ball_left_launcher(ball);
    }
    for &ball in &input.fallen {
        table.level.ball_fall(ball);
    }

    // Energy follows the ball's current speed
    let ids: Vec<BallId> = table.level.balls().iter().map(|b| b.id).collect();
    for id in ids {
        let speed = table.physics.speed(id);
        if let Some(ball) = table.level.ball_mut(id) {
            ball.decay_energy(&table.settings.energy, speed, scaled_dt);
        }
    }

    table.level.update(scaled_dt, table.now);

    for action in table.scheduler.take_due(table.now) {
        run_deferred(table, action);
    }

    table.flush();
}

impl Table {
    /// Method form of [`tick`]
    pub fn tick(&mut self, input: &TickInput, dt: f32) {
        tick(self, input, dt);
    }
}

fn resolve_contact(table: &mut Table, contact: &ContactEvent) {
    if table.level.ball(contact.ball).is_none() {
        log::warn!("Contact from unknown ball {}", contact.ball.0);
        return;
    }
    let Some(element) = table.elements.get(&contact.element) else {
        log::warn!("Contact with unknown element {}", contact.element.0);
        return;
    };
    let position = element.position;
    let pushes = element.pushes();
    let scores = element.scores();
    let kind = element.kind.clone();

    let ball_pos = table.physics.position(contact.ball);
    // Speed before the impulse lands
    let speed = table.physics.speed(contact.ball);

    match kind {
        ElementKind::Bumper(profile) => {
            push(table, &profile, ball_pos, position, contact);
            score_impact(table, &profile, contact.ball, speed);
        }
        ElementKind::Button { profile, group, .. } => {
            if !scores {
                return;
            }
            score_impact(table, &profile, contact.ball, speed);
            if !hit_single_toggle(table, contact.element) {
                return;
            }
            if let Some(group) = group {
                member_deactivated(table, group, contact.element);
            }
        }
        ElementKind::Target { profile, pool, .. } => {
            if !scores {
                return;
            }
            score_impact(table, &profile, contact.ball, speed);
            table.level.target_struck();

            let next = match table.pools.get_mut(&pool) {
                Some(p) => p.strike(contact.element, &mut table.rng),
                None => {
                    log::warn!("Target {} belongs to unknown pool {}", contact.element.0, pool.0);
                    None
                }
            };
            match next {
                // Pool of one: the struck target stays lit
                Some(next) if next == contact.element => {}
                Some(next) => {
                    hit_single_toggle(table, contact.element);
                    table.set_element_active(next, true);
                }
                None => {
                    hit_single_toggle(table, contact.element);
                }
            }
        }
        ElementKind::Switch(_) => {
            let notice = match table.elements.get_mut(&contact.element).map(|e| &mut e.kind) {
                Some(ElementKind::Switch(switch)) => switch.toggle(),
                _ => return,
            };
            table.level.emit(GameEvent::SwitchChanged {
                element: contact.element,
                on: notice == ToggleNotice::Activated,
            });
            table.level.emit(GameEvent::Cue(AudioCue::Switch));
        }
        ElementKind::Brick { profile, .. } => {
            if !pushes {
                return;
            }
            push(table, &profile, ball_pos, position, contact);
            let broke = match table.elements.get_mut(&contact.element).map(|e| &mut e.kind) {
                Some(ElementKind::Brick { brick, .. }) => brick.hit(),
                _ => false,
            };
            if broke {
                log::debug!("Brick {} broken", contact.element.0);
                table.level.emit(GameEvent::ElementChanged {
                    element: contact.element,
                    active: false,
                });
            }
        }
    }
}

fn push(
    table: &mut Table,
    profile: &ImpactProfile,
    ball_pos: Vec3,
    element_pos: Vec3,
    contact: &ContactEvent,
) {
    let impulse = profile.impulse(ball_pos, element_pos, contact);
    if impulse != Vec3::ZERO {
        table.level.emit(GameEvent::Impulse {
            ball: contact.ball,
            impulse,
        });
    }
}

/// Score, charge and particle effects of a scoring contact
fn score_impact(table: &mut Table, profile: &ImpactProfile, ball: BallId, speed: f32) {
    let Some(b) = table.level.ball(ball) else {
        return;
    };
    let outcome = profile.score(b, speed);
    log::debug!(
        "Impact ball {} speed {:.1} energy {:.2}: +{:.1}",
        ball.0,
        speed,
        b.energy,
        outcome.score
    );

    table.level.add_score(outcome.score as f64, table.now);
    if let Some(b) = table.level.ball_mut(ball) {
        b.charge(outcome.charge);
    }
    if outcome.particles > 0 {
        table.level.emit(GameEvent::Particles {
            ball,
            count: outcome.particles,
        });
    }
    table.level.emit(GameEvent::Cue(AudioCue::Bumper));
}

/// Hit a button or target. Returns true when it went dark.
fn hit_single_toggle(table: &mut Table, id: ElementId) -> bool {
    let went_dark = table
        .elements
        .get_mut(&id)
        .and_then(|e| e.single_toggle_mut())
        .and_then(|t| t.hit())
        .is_some();
    if went_dark {
        table.level.emit(GameEvent::ElementChanged {
            element: id,
            active: false,
        });
    }
    went_dark
}

/// Route a button's deactivation to its group
fn member_deactivated(table: &mut Table, group: GroupId, member: ElementId) {
    let Some(g) = table.groups.get_mut(&group) else {
        log::warn!("Button {} belongs to unknown group {}", member.0, group.0);
        return;
    };
    let Some(reward) = g.on_member_deactivated() else {
        return;
    };

    log::debug!("Group {} cleared", group.0);
    table.level.add_coin(reward);
    table.level.emit(GameEvent::Cue(AudioCue::GroupClear));
    table.level.emit(GameEvent::GroupCleared { group, reward });
    let delay = table.settings.group_reactivate_delay;
    table
        .scheduler
        .schedule(TaskOwner::Group(group), table.now, delay, Deferred::ReactivateGroup(group));
}

fn run_deferred(table: &mut Table, action: Deferred) {
    match action {
        Deferred::ReactivateGroup(group) => {
            let Some(g) = table.groups.get(&group) else {
                log::warn!("Reactivation for removed group {}", group.0);
                return;
            };
            let members = g.members().to_vec();
            for member in members {
                table.set_element_active(member, true);
            }
        }
    }
}
