//! Interactive table elements
//!
//! Elements are composed from two capabilities: `Impactable` (reacts to a ball
//! with an impulse and/or score) and `Toggleable` (has an on/off state). Group
//! and pool bookkeeping lives in `ElementGroup` and `TargetPool`; the table
//! routes element notices to them.

use glam::Vec3;
use rand::Rng;
use serde::{Deserialize, Serialize};

use super::impact::ImpactProfile;
use super::state::{ElementId, GroupId, PoolId};

/// State change reported by a toggleable element
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToggleNotice {
    Activated,
    Deactivated,
}

/// Something with an on/off state
pub trait Toggleable {
    fn is_active(&self) -> bool;

    /// Set the state. Returns a notice only when the state actually changed.
    fn set_active(&mut self, active: bool) -> Option<ToggleNotice>;
}

/// Something that reacts when a ball strikes it
pub trait Impactable {
    fn profile(&self) -> Option<&ImpactProfile>;

    /// Whether a contact right now pushes the ball
    fn pushes(&self) -> bool;

    /// Whether a contact right now scores and charges the ball
    fn scores(&self) -> bool;
}

/// Single-hit toggle: goes dark on the first hit, comes back only when told to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SingleToggle {
    active: bool,
}

impl Default for SingleToggle {
    fn default() -> Self {
        Self { active: true }
    }
}

impl SingleToggle {
    /// Ball hit. Deactivates if active; no-op otherwise.
    pub fn hit(&mut self) -> Option<ToggleNotice> {
        if self.active {
            self.set_active(false)
        } else {
            None
        }
    }

    pub fn reactivate(&mut self) -> Option<ToggleNotice> {
        self.set_active(true)
    }
}

impl Toggleable for SingleToggle {
    fn is_active(&self) -> bool {
        self.active
    }

    fn set_active(&mut self, active: bool) -> Option<ToggleNotice> {
        if self.active == active {
            return None;
        }
        self.active = active;
        Some(if active {
            ToggleNotice::Activated
        } else {
            ToggleNotice::Deactivated
        })
    }
}

/// On/off switch that flips on every hit
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct BinarySwitch {
    on: bool,
}

impl BinarySwitch {
    pub fn new(start_on: bool) -> Self {
        Self { on: start_on }
    }

    pub fn toggle(&mut self) -> ToggleNotice {
        let next = !self.on;
        self.on = next;
        if next {
            ToggleNotice::Activated
        } else {
            ToggleNotice::Deactivated
        }
    }
}

impl Toggleable for BinarySwitch {
    fn is_active(&self) -> bool {
        self.on
    }

    fn set_active(&mut self, active: bool) -> Option<ToggleNotice> {
        if self.on == active {
            None
        } else {
            Some(self.toggle())
        }
    }
}

/// Breakable brick: loses one hit point per contact, disabled at zero
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Brick {
    pub hp: u32,
}

impl Brick {
    pub fn new(hp: u32) -> Self {
        Self { hp }
    }

    pub fn is_broken(&self) -> bool {
        self.hp == 0
    }

    /// Take one hit. Returns true when this hit broke the brick.
    pub fn hit(&mut self) -> bool {
        if self.hp == 0 {
            return false;
        }
        self.hp -= 1;
        self.hp == 0
    }
}

/// Buttons that pay out once every member has been hit
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ElementGroup {
    pub id: GroupId,
    members: Vec<ElementId>,
    hits: usize,
    pub reward: u64,
}

impl ElementGroup {
    pub fn new(id: GroupId, members: Vec<ElementId>, reward: u64) -> Self {
        Self {
            id,
            members,
            hits: 0,
            reward,
        }
    }

    pub fn members(&self) -> &[ElementId] {
        &self.members
    }

    pub fn hits(&self) -> usize {
        self.hits
    }

    /// A member went dark. Returns the reward when that cleared the group.
    pub fn on_member_deactivated(&mut self) -> Option<u64> {
        let total = self.members.len();
        if total == 0 {
            log::warn!("Group {} has no members, ignoring hit", self.id.0);
            return None;
        }
        self.hits += 1;
        if self.hits > total {
            log::warn!(
                "Group {} hit count {} exceeds {} members, clamping",
                self.id.0,
                self.hits,
                total
            );
            self.hits = total;
        }
        if self.hits == total {
            self.hits = 0;
            Some(self.reward)
        } else {
            None
        }
    }
}

/// Pool of targets with exactly one active at a time
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TargetPool {
    pub id: PoolId,
    active: Option<ElementId>,
    inactive: Vec<ElementId>,
}

impl TargetPool {
    /// All members start inactive; call `init` to light the first one
    pub fn new(id: PoolId, members: Vec<ElementId>) -> Self {
        Self {
            id,
            active: None,
            inactive: members,
        }
    }

    pub fn active(&self) -> Option<ElementId> {
        self.active
    }

    pub fn inactive(&self) -> &[ElementId] {
        &self.inactive
    }

    pub fn len(&self) -> usize {
        self.inactive.len() + usize::from(self.active.is_some())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn contains(&self, id: ElementId) -> bool {
        self.active == Some(id) || self.inactive.contains(&id)
    }

    /// Light a uniformly chosen inactive target
    pub fn init<R: Rng>(&mut self, rng: &mut R) -> Option<ElementId> {
        if let Some(current) = self.active.take() {
            self.inactive.push(current);
        }
        self.activate_random(rng)
    }

    /// The active target was struck: choose the next one, then return the struck
    /// target to the inactive set. Returns the newly active target.
    ///
    /// Strikes on anything but the active target are ignored.
    pub fn strike<R: Rng>(&mut self, id: ElementId, rng: &mut R) -> Option<ElementId> {
        if self.active != Some(id) {
            return None;
        }
        self.active = None;
        match self.activate_random(rng) {
            Some(next) => {
                self.inactive.push(id);
                Some(next)
            }
            None => {
                // Single-target pool: the same target comes straight back
                self.active = Some(id);
                Some(id)
            }
        }
    }

    fn activate_random<R: Rng>(&mut self, rng: &mut R) -> Option<ElementId> {
        if self.inactive.is_empty() {
            return None;
        }
        let idx = rng.random_range(0..self.inactive.len());
        let chosen = self.inactive.remove(idx);
        self.active = Some(chosen);
        Some(chosen)
    }
}

/// What an element is and the state it carries
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ElementKind {
    /// Always-on bumper: pushes, scores, charges
    Bumper(ImpactProfile),
    /// Single-hit button, optionally a member of a group
    Button {
        profile: ImpactProfile,
        toggle: SingleToggle,
        group: Option<GroupId>,
    },
    /// Pool-managed target
    Target {
        profile: ImpactProfile,
        toggle: SingleToggle,
        pool: PoolId,
    },
    Switch(BinarySwitch),
    Brick {
        profile: ImpactProfile,
        brick: Brick,
    },
}

/// An interactive element on the table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Element {
    pub id: ElementId,
    pub position: Vec3,
    pub kind: ElementKind,
}

impl Element {
    pub fn new(id: ElementId, position: Vec3, kind: ElementKind) -> Self {
        Self { id, position, kind }
    }

    /// The single-hit toggle of a button or target
    pub fn single_toggle_mut(&mut self) -> Option<&mut SingleToggle> {
        match &mut self.kind {
            ElementKind::Button { toggle, .. } | ElementKind::Target { toggle, .. } => Some(toggle),
            _ => None,
        }
    }
}

impl Impactable for Element {
    fn profile(&self) -> Option<&ImpactProfile> {
        match &self.kind {
            ElementKind::Bumper(profile)
            | ElementKind::Button { profile, .. }
            | ElementKind::Target { profile, .. }
            | ElementKind::Brick { profile, .. } => Some(profile),
            ElementKind::Switch(_) => None,
        }
    }

    fn pushes(&self) -> bool {
        match &self.kind {
            ElementKind::Bumper(_) => true,
            ElementKind::Brick { brick, .. } => !brick.is_broken(),
            _ => false,
        }
    }

    fn scores(&self) -> bool {
        match &self.kind {
            ElementKind::Bumper(_) => true,
            ElementKind::Button { toggle, .. } | ElementKind::Target { toggle, .. } => {
                toggle.is_active()
            }
            _ => false,
        }
    }
}

impl Toggleable for Element {
    fn is_active(&self) -> bool {
        match &self.kind {
            ElementKind::Bumper(_) => true,
            ElementKind::Button { toggle, .. } | ElementKind::Target { toggle, .. } => {
                toggle.is_active()
            }
            ElementKind::Switch(switch) => switch.is_active(),
            ElementKind::Brick { brick, .. } => !brick.is_broken(),
        }
    }

    /// Bumpers and bricks have no externally settable state
    fn set_active(&mut self, active: bool) -> Option<ToggleNotice> {
        match &mut self.kind {
            ElementKind::Button { toggle, .. } | ElementKind::Target { toggle, .. } => {
                toggle.set_active(active)
            }
            ElementKind::Switch(switch) => switch.set_active(active),
            ElementKind::Bumper(_) | ElementKind::Brick { .. } => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_pcg::Pcg32;

    #[test]
    fn test_single_toggle_notifies_once() {
        let mut t = SingleToggle::default();
        assert_eq!(t.hit(), Some(ToggleNotice::Deactivated));
        assert_eq!(t.hit(), None);
        assert_eq!(t.hit(), None);
        assert!(!t.is_active());
        assert_eq!(t.reactivate(), Some(ToggleNotice::Activated));
        assert_eq!(t.reactivate(), None);
        assert_eq!(t.hit(), Some(ToggleNotice::Deactivated));
    }

    #[test]
    fn test_switch_alternates() {
        let mut s = BinarySwitch::new(false);
        assert_eq!(s.toggle(), ToggleNotice::Activated);
        assert_eq!(s.toggle(), ToggleNotice::Deactivated);
        assert!(!s.is_active());
        assert_eq!(s.set_active(false), None);
        assert_eq!(s.set_active(true), Some(ToggleNotice::Activated));
    }

    #[test]
    fn test_brick_breaks_once() {
        let mut b = Brick::new(2);
        assert!(!b.hit());
        assert!(b.hit());
        assert!(b.is_broken());
        assert!(!b.hit());
    }

    #[test]
    fn test_group_rewards_on_last_member() {
        let mut g = ElementGroup::new(GroupId(0), vec![ElementId(0), ElementId(1), ElementId(2)], 1);
        assert_eq!(g.on_member_deactivated(), None);
        assert_eq!(g.on_member_deactivated(), None);
        assert_eq!(g.hits(), 2);
        assert_eq!(g.on_member_deactivated(), Some(1));
        assert_eq!(g.hits(), 0);
    }

    #[test]
    fn test_empty_group_ignores_hits() {
        let mut g = ElementGroup::new(GroupId(0), Vec::new(), 1);
        assert_eq!(g.on_member_deactivated(), None);
        assert_eq!(g.hits(), 0);
    }

    #[test]
    fn test_pool_has_single_active() {
        let mut rng = Pcg32::seed_from_u64(7);
        let ids: Vec<_> = (0..5).map(ElementId).collect();
        let mut pool = TargetPool::new(PoolId(0), ids.clone());
        assert_eq!(pool.active(), None);

        let first = pool.init(&mut rng).unwrap();
        assert_eq!(pool.active(), Some(first));
        assert_eq!(pool.inactive().len(), 4);

        for _ in 0..100 {
            let hit = pool.active().unwrap();
            let next = pool.strike(hit, &mut rng).unwrap();
            assert_ne!(next, hit);
            assert_eq!(pool.active(), Some(next));
            assert!(pool.inactive().contains(&hit));
            assert!(!pool.inactive().contains(&next));
            assert_eq!(pool.len(), 5);
        }
    }

    #[test]
    fn test_pool_ignores_inactive_strikes() {
        let mut rng = Pcg32::seed_from_u64(1);
        let mut pool = TargetPool::new(PoolId(0), vec![ElementId(0), ElementId(1)]);
        let active = pool.init(&mut rng).unwrap();
        let other = if active == ElementId(0) { ElementId(1) } else { ElementId(0) };
        assert_eq!(pool.strike(other, &mut rng), None);
        assert_eq!(pool.active(), Some(active));
    }

    #[test]
    fn test_pool_of_one_reactivates_same_target() {
        let mut rng = Pcg32::seed_from_u64(3);
        let mut pool = TargetPool::new(PoolId(0), vec![ElementId(9)]);
        assert_eq!(pool.init(&mut rng), Some(ElementId(9)));
        assert_eq!(pool.strike(ElementId(9), &mut rng), Some(ElementId(9)));
        assert_eq!(pool.active(), Some(ElementId(9)));
        assert!(pool.inactive().is_empty());
    }

    #[test]
    fn test_pool_selection_is_uniform() {
        let mut rng = Pcg32::seed_from_u64(2024);
        let ids: Vec<_> = (0..4).map(ElementId).collect();
        let mut pool = TargetPool::new(PoolId(0), ids);
        pool.init(&mut rng);

        let trials = 30_000;
        let mut counts = [0u32; 4];
        for _ in 0..trials {
            let hit = pool.active().unwrap();
            let next = pool.strike(hit, &mut rng).unwrap();
            counts[next.0 as usize] += 1;
        }
        // Each target is picked 1/4 of the time in the long run
        let expected = trials as f64 / 4.0;
        for count in counts {
            let deviation = (count as f64 - expected).abs() / expected;
            assert!(deviation < 0.05, "counts {:?}", counts);
        }
    }

    #[test]
    fn test_element_capabilities() {
        let profile = ImpactProfile::default();
        let mut button = Element::new(
            ElementId(0),
            Vec3::ZERO,
            ElementKind::Button {
                profile,
                toggle: SingleToggle::default(),
                group: None,
            },
        );
        assert!(button.scores());
        assert!(!button.pushes());
        assert_eq!(button.set_active(false), Some(ToggleNotice::Deactivated));
        assert!(!button.scores());

        let bumper = Element::new(ElementId(1), Vec3::ZERO, ElementKind::Bumper(profile));
        assert!(bumper.pushes() && bumper.scores() && bumper.is_active());

        let switch = Element::new(ElementId(2), Vec3::ZERO, ElementKind::Switch(BinarySwitch::new(true)));
        assert!(switch.profile().is_none());
        assert!(switch.is_active());
    }
}
