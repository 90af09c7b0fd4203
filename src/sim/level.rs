//! Level lifecycle
//!
//! Owns all per-level and per-run progression state: score, coin, time,
//! reserve balls, missions and upgrades. Every mutation goes through the
//! methods here, and every visible change is reported as a `GameEvent`.

use glam::Vec3;
use serde::Serialize;

use super::state::{
    Ball, BallId, GameEvent, HudUpdate, LevelPhase, Mission, ScoreLog, UpgradeKind, Upgrades,
};
use crate::audio::AudioCue;
use crate::error::{ConfigError, PurchaseError};
use crate::consts::SPIN_SPS_DIVISOR;
use crate::floor_to_count;
use crate::settings::Settings;
use crate::tuning::Tuning;

/// What the next tier of an upgrade would change, for the shop screen
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct UpgradePreview {
    pub kind: UpgradeKind,
    /// Tier after buying
    pub next_tier: u32,
    pub current: f64,
    pub next: f64,
    pub price: u64,
}

/// Level state machine: `Idle -> Running -> {Complete, GameOver} -> Running`
#[derive(Debug, Clone)]
pub struct LevelController {
    tuning: Tuning,
    spawn_point: Vec3,
    low_time_threshold: f32,

    // Carried across levels
    level: u32,
    coin: u64,
    mission: Mission,
    upgrades: Upgrades,
    balls: Vec<Ball>,

    // Reset by start_level
    phase: LevelPhase,
    complete: bool,
    score: u64,
    coin_threshold: u64,
    score_log: ScoreLog,
    score_per_second: f64,
    balls_reserve: u32,
    balls_fallen: u32,
    target_hits: u32,
    time_left: f32,
    max_balls_live: u32,
    active_limit: u32,
    ball_mass: f32,
    in_play: Vec<BallId>,
    flippers_locked: bool,

    events: Vec<GameEvent>,
}

impl LevelController {
    pub fn new(settings: &Settings) -> Self {
        let tuning = settings.tuning.clone();
        let coin_threshold = tuning.bonus_coin_per_score.max(1) as u64;
        let ball_mass = tuning.ball_mass(1);
        Self {
            tuning,
            spawn_point: settings.spawn_point,
            low_time_threshold: settings.low_time_threshold,
            level: 1,
            coin: 0,
            mission: Mission::default(),
            upgrades: Upgrades::default(),
            balls: Vec::new(),
            phase: LevelPhase::Idle,
            complete: false,
            score: 0,
            coin_threshold,
            score_log: ScoreLog::new(),
            score_per_second: 0.0,
            balls_reserve: 0,
            balls_fallen: 0,
            target_hits: 0,
            time_left: 0.0,
            max_balls_live: 0,
            active_limit: 0,
            ball_mass,
            in_play: Vec::new(),
            flippers_locked: false,
            events: Vec::new(),
        }
    }

    // === Lifecycle ===

    /// Reset the level from the current upgrades and start it.
    ///
    /// Refuses to start (and changes nothing) when the upgrade values produce
    /// an invalid ball setup.
    pub fn start_level(&mut self) -> Result<(), ConfigError> {
        let balls_per_level = self.tuning.balls_per_level(self.upgrades.count);
        let active_limit = self.tuning.active_ball_limit(self.upgrades.active);
        if active_limit < 1 {
            log::error!("Refusing to start level {}: active ball limit {}", self.level, active_limit);
            return Err(ConfigError::NoActiveBalls(active_limit));
        }
        let reserve = balls_per_level - active_limit;
        if reserve < 0 {
            log::error!(
                "Refusing to start level {}: {} balls per level < {} active",
                self.level,
                balls_per_level,
                active_limit
            );
            return Err(ConfigError::NegativeReserve {
                balls_per_level,
                active_limit,
            });
        }
        if self.tuning.bonus_coin_per_score < 1 {
            return Err(ConfigError::InvalidSettings(format!(
                "bonus_coin_per_score must be at least 1, got {}",
                self.tuning.bonus_coin_per_score
            )));
        }
        let to_count = |value: i64, what: &str| {
            u32::try_from(value)
                .map_err(|_| ConfigError::InvalidSettings(format!("{} out of range: {}", what, value)))
        };
        let max_balls_live = to_count(balls_per_level, "balls per level")?;
        let active_limit = to_count(active_limit, "active ball limit")?;
        let reserve = to_count(reserve, "ball reserve")?;

        self.emit(GameEvent::Cue(AudioCue::LevelStart));
        self.set_flipper_lock(false);

        self.max_balls_live = max_balls_live;
        self.active_limit = active_limit;
        self.ball_mass = self.tuning.ball_mass(self.upgrades.mass);

        self.complete = false;
        self.set_score(0);
        self.set_reserve(reserve);
        self.balls_fallen = 0;
        self.set_time_left(self.tuning.time_limit(self.level));
        self.in_play.clear();
        self.set_target_hits(0);
        self.coin_threshold = self.tuning.bonus_coin_per_score as u64;
        self.score_log.clear();
        self.score_per_second = 0.0;
        self.emit(GameEvent::Hud(HudUpdate::ScorePerSecond(0.0)));
        self.emit(GameEvent::Hud(HudUpdate::SpinMultiplier(self.spin_multiplier())));

        self.setup_balls();

        self.phase = LevelPhase::Running;
        self.emit(GameEvent::Hud(HudUpdate::Level(self.level)));
        self.emit(GameEvent::Hud(HudUpdate::Mission {
            mission: self.mission,
            requirement: self.mission_requirement(self.mission, self.level),
        }));
        self.emit(GameEvent::LevelStarted { level: self.level });
        log::info!(
            "Level {} started: mission {:?}, {} active, {} reserve, {:.0}s",
            self.level,
            self.mission,
            self.active_limit,
            self.balls_reserve,
            self.time_left
        );
        Ok(())
    }

    /// Grow the pool to the active limit and put every ball back at spawn
    fn setup_balls(&mut self) {
        while self.balls.len() < self.active_limit as usize {
            let id = BallId(self.balls.len() as u32);
            self.balls.push(Ball::new(id, self.ball_mass));
        }
        let mass = self.ball_mass;
        let at = self.spawn_point;
        let mut respawns = Vec::with_capacity(self.balls.len() * 3);
        for ball in &mut self.balls {
            ball.mass = mass;
            ball.reset();
            respawns.push(GameEvent::SetMass { ball: ball.id, mass });
            respawns.push(GameEvent::Respawn { ball: ball.id, at });
            respawns.push(GameEvent::Cue(AudioCue::BallLoad));
        }
        self.events.extend(respawns);
    }

    /// Mission accomplished. Only meaningful while running.
    pub fn complete_level(&mut self) {
        if self.phase != LevelPhase::Running {
            return;
        }
        self.complete = true;
        self.end_level(LevelPhase::Complete);

        let award = floor_to_count(self.tuning.coin_award(self.level) as f64, "coin award");
        self.add_coin(award);
        self.emit(GameEvent::LevelComplete {
            level: self.level,
            award,
        });
        log::info!("Level {} complete: score {}, awarded {}", self.level, self.score, award);

        self.level += 1;
        self.emit(GameEvent::Hud(HudUpdate::Level(self.level)));
        self.emit(GameEvent::Hud(HudUpdate::SpinMultiplier(self.spin_multiplier())));
    }

    /// Out of balls. Suppressed when the level was already completed.
    pub fn game_over(&mut self) {
        if self.complete || self.phase != LevelPhase::Running {
            return;
        }
        self.end_level(LevelPhase::GameOver);
        self.emit(GameEvent::GameOver { level: self.level });
        log::info!("Game over on level {} with score {}", self.level, self.score);
    }

    /// Stop the timer and lock the flippers
    fn end_level(&mut self, phase: LevelPhase) {
        self.phase = phase;
        self.set_flipper_lock(true);
    }

    // === Per tick ===

    /// Advance the level timer and re-evaluate the score-per-second window
    pub fn update(&mut self, dt: f32, now: f64) {
        if self.phase == LevelPhase::Running && self.time_left > 0.0 {
            self.set_time_left((self.time_left - dt).max(0.0));
        }

        self.refresh_score_per_second(now);
    }

    /// Re-sum the trailing window, report changes and run the ScorePerSecond check
    fn refresh_score_per_second(&mut self, now: f64) {
        let sps = self.score_log.per_second(now);
        if sps != self.score_per_second {
            self.score_per_second = sps;
            self.emit(GameEvent::Hud(HudUpdate::ScorePerSecond(sps)));
            self.emit(GameEvent::Hud(HudUpdate::SpinMultiplier(self.spin_multiplier())));
        }

        if self.mission == Mission::ScorePerSecond
            && sps >= self.tuning.sps_requirement(self.level) as f64
        {
            self.complete_level();
        }
    }

    /// Speed factor for the table's spinning centerpiece. Grows with score per
    /// second and reverses direction on even levels.
    pub fn spin_multiplier(&self) -> f64 {
        let direction = if self.level % 2 == 0 { -1.0 } else { 1.0 };
        (1.0 + self.score_per_second / SPIN_SPS_DIVISOR) * direction
    }

    // === Scoring ===

    /// Add impact score. Negative or non-finite amounts are rejected.
    pub fn add_score(&mut self, raw: f64, now: f64) {
        if !raw.is_finite() || raw < 0.0 {
            log::warn!("Ignoring invalid score amount {}", raw);
            return;
        }
        self.set_score(self.score.saturating_add(raw.floor() as u64));

        if self.score >= self.coin_threshold {
            let bonus = self.score / self.coin_threshold;
            self.add_coin(bonus);
            let step = self.tuning.bonus_coin_per_score.max(1) as u64;
            self.coin_threshold = self.coin_threshold.saturating_add(step.saturating_mul(bonus));
        }

        self.score_log.record(raw, now);
        self.score_log.prune(now);

        if self.mission == Mission::Score
            && self.score as i64 >= self.tuning.score_requirement(self.level)
        {
            self.complete_level();
        }
        // Checked here too so a same-tick fall cannot beat it to game over
        self.refresh_score_per_second(now);
    }

    pub fn add_coin(&mut self, amount: u64) {
        if amount == 0 {
            return;
        }
        self.coin = self.coin.saturating_add(amount);
        self.emit(GameEvent::Cue(AudioCue::Coin));
        self.emit(GameEvent::Hud(HudUpdate::Coin(self.coin)));
    }

    /// A pool target was struck
    pub fn target_struck(&mut self) {
        self.set_target_hits(self.target_hits + 1);
        if self.mission == Mission::HitTarget
            && self.target_hits as i64 >= self.tuning.hit_target_requirement(self.level)
        {
            self.complete_level();
        }
    }

    // === Balls ===

    /// A ball passed the launcher exit and is now in play
    pub fn ball_left_launcher(&mut self, ball: BallId) {
        if self.ball(ball).is_none() {
            log::warn!("Launch reported for unknown ball {}", ball.0);
            return;
        }
        if !self.in_play.contains(&ball) {
            self.in_play.push(ball);
        }
    }

    /// A ball dropped off the table
    pub fn ball_fall(&mut self, ball: BallId) {
        let Some(idx) = self.balls.iter().position(|b| b.id == ball) else {
            log::warn!("Fall reported for unknown ball {}", ball.0);
            return;
        };
        self.balls_fallen += 1;
        self.in_play.retain(|&id| id != ball);

        if self.balls_reserve > 0 {
            self.set_reserve(self.balls_reserve - 1);
            self.balls[idx].reset();
            self.emit(GameEvent::Respawn {
                ball,
                at: self.spawn_point,
            });
            self.emit(GameEvent::Cue(AudioCue::BallLoad));
        }

        if self.balls_fallen >= self.max_balls_live {
            self.game_over();
        }
    }

    // === Between levels ===

    /// Takes effect at the next `start_level`
    pub fn select_mission(&mut self, mission: Mission) {
        self.mission = mission;
        self.emit(GameEvent::Hud(HudUpdate::Mission {
            mission,
            requirement: self.mission_requirement(mission, self.level),
        }));
    }

    /// Raise an upgrade tier without paying. Takes effect at the next `start_level`.
    pub fn upgrade(&mut self, kind: UpgradeKind) {
        self.upgrades.bump(kind);
        self.emit(GameEvent::Hud(HudUpdate::Upgrades(self.upgrades)));
    }

    /// Price of the next tier of `kind`
    pub fn upgrade_price(&self, kind: UpgradeKind) -> u64 {
        let tier = self.upgrades.get(kind);
        let price = match kind {
            UpgradeKind::Mass => self.tuning.mass_price(tier),
            UpgradeKind::Count => self.tuning.ball_price(tier),
            UpgradeKind::Active => self.tuning.active_price(tier),
        };
        floor_to_count(price as f64, "upgrade price")
    }

    pub fn can_afford(&self, kind: UpgradeKind) -> bool {
        self.coin >= self.upgrade_price(kind)
    }

    /// Spend coin on the next tier of `kind`. Returns the price paid.
    pub fn purchase(&mut self, kind: UpgradeKind) -> Result<u64, PurchaseError> {
        let price = self.upgrade_price(kind);
        if self.coin < price {
            return Err(PurchaseError::InsufficientCoin {
                kind,
                price,
                coin: self.coin,
            });
        }
        self.coin -= price;
        self.emit(GameEvent::Hud(HudUpdate::Coin(self.coin)));
        self.upgrade(kind);
        log::info!("Bought {:?} tier {} for {}", kind, self.upgrades.get(kind), price);
        Ok(price)
    }

    pub fn upgrade_preview(&self, kind: UpgradeKind) -> UpgradePreview {
        let tier = self.upgrades.get(kind);
        let value = |t: u32| match kind {
            UpgradeKind::Mass => self.tuning.ball_mass(t) as f64,
            UpgradeKind::Count => self.tuning.balls_per_level(t) as f64,
            UpgradeKind::Active => self.tuning.active_ball_limit(t) as f64,
        };
        UpgradePreview {
            kind,
            next_tier: tier + 1,
            current: value(tier),
            next: value(tier + 1),
            price: self.upgrade_price(kind),
        }
    }

    pub fn mission_requirement(&self, mission: Mission, level: u32) -> i64 {
        match mission {
            Mission::Score => self.tuning.score_requirement(level),
            Mission::ScorePerSecond => self.tuning.sps_requirement(level),
            Mission::HitTarget => self.tuning.hit_target_requirement(level),
        }
    }

    // === Setters that report ===

    fn set_score(&mut self, score: u64) {
        self.score = score;
        self.emit(GameEvent::Hud(HudUpdate::Score(score)));
    }

    fn set_reserve(&mut self, reserve: u32) {
        self.balls_reserve = reserve;
        self.emit(GameEvent::Hud(HudUpdate::Reserve(reserve)));
    }

    fn set_target_hits(&mut self, hits: u32) {
        self.target_hits = hits;
        self.emit(GameEvent::Hud(HudUpdate::TargetHits(hits)));
    }

    /// Fires the low-time cue on the downward crossing only; locks at zero
    fn set_time_left(&mut self, value: f32) {
        let threshold = self.low_time_threshold;
        if self.time_left > threshold && value <= threshold {
            self.emit(GameEvent::Cue(AudioCue::LowTime));
        }
        self.time_left = value;
        self.emit(GameEvent::Hud(HudUpdate::TimeLeft(value)));
        if value <= 0.0 {
            // Time out only locks the flippers; the level keeps running
            self.set_flipper_lock(true);
        }
    }

    fn set_flipper_lock(&mut self, locked: bool) {
        self.flippers_locked = locked;
        self.emit(GameEvent::FlipperLock(locked));
    }

    // === Events ===

    pub(crate) fn emit(&mut self, event: GameEvent) {
        self.events.push(event);
    }

    /// Drain everything reported since the last call
    pub fn take_events(&mut self) -> Vec<GameEvent> {
        std::mem::take(&mut self.events)
    }

    // === Accessors ===

    pub fn phase(&self) -> LevelPhase {
        self.phase
    }

    pub fn is_complete(&self) -> bool {
        self.complete
    }

    pub fn level(&self) -> u32 {
        self.level
    }

    pub fn score(&self) -> u64 {
        self.score
    }

    pub fn coin(&self) -> u64 {
        self.coin
    }

    pub fn coin_threshold(&self) -> u64 {
        self.coin_threshold
    }

    pub fn mission(&self) -> Mission {
        self.mission
    }

    pub fn upgrades(&self) -> Upgrades {
        self.upgrades
    }

    pub fn balls_reserve(&self) -> u32 {
        self.balls_reserve
    }

    pub fn balls_fallen(&self) -> u32 {
        self.balls_fallen
    }

    pub fn max_balls_live(&self) -> u32 {
        self.max_balls_live
    }

    pub fn active_limit(&self) -> u32 {
        self.active_limit
    }

    pub fn target_hits(&self) -> u32 {
        self.target_hits
    }

    pub fn time_left(&self) -> f32 {
        self.time_left
    }

    pub fn score_per_second(&self) -> f64 {
        self.score_per_second
    }

    pub fn score_log(&self) -> &ScoreLog {
        &self.score_log
    }

    pub fn flippers_locked(&self) -> bool {
        self.flippers_locked
    }

    pub fn in_play(&self) -> &[BallId] {
        &self.in_play
    }

    pub fn balls(&self) -> &[Ball] {
        &self.balls
    }

    pub fn balls_mut(&mut self) -> &mut [Ball] {
        &mut self.balls
    }

    pub fn ball(&self, id: BallId) -> Option<&Ball> {
        self.balls.iter().find(|b| b.id == id)
    }

    pub fn ball_mut(&mut self, id: BallId) -> Option<&mut Ball> {
        self.balls.iter_mut().find(|b| b.id == id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn settings() -> Settings {
        Settings::default()
    }

    /// Running level whose mission cannot complete by scoring
    fn running() -> LevelController {
        let mut lc = LevelController::new(&settings());
        lc.select_mission(Mission::HitTarget);
        lc.start_level().unwrap();
        lc.take_events();
        lc
    }

    #[test]
    fn test_start_level_resets_and_runs() {
        let mut lc = LevelController::new(&settings());
        assert_eq!(lc.phase(), LevelPhase::Idle);
        lc.start_level().unwrap();

        assert_eq!(lc.phase(), LevelPhase::Running);
        assert_eq!(lc.score(), 0);
        assert_eq!(lc.max_balls_live(), 3);
        assert_eq!(lc.active_limit(), 1);
        assert_eq!(lc.balls_reserve(), 2);
        assert_eq!(lc.time_left(), 300.0);
        assert_eq!(lc.coin_threshold(), 50_000);
        assert_eq!(lc.balls().len(), 1);
        assert!(!lc.flippers_locked());

        let events = lc.take_events();
        assert!(events.contains(&GameEvent::FlipperLock(false)));
        assert!(events.contains(&GameEvent::Cue(AudioCue::LevelStart)));
        assert!(events.contains(&GameEvent::LevelStarted { level: 1 }));
        assert!(events.contains(&GameEvent::Respawn {
            ball: BallId(0),
            at: settings().spawn_point
        }));
    }

    #[test]
    fn test_pool_grows_and_never_shrinks() {
        let mut lc = LevelController::new(&settings());
        lc.upgrade(UpgradeKind::Count);
        lc.upgrade(UpgradeKind::Count);
        lc.upgrade(UpgradeKind::Active);
        lc.upgrade(UpgradeKind::Active);
        lc.start_level().unwrap();
        assert_eq!(lc.balls().len(), 3);
        assert_eq!(lc.balls_reserve(), 2);

        lc.start_level().unwrap();
        assert_eq!(lc.balls().len(), 3);
    }

    #[test]
    fn test_negative_reserve_refuses_to_start() {
        let mut lc = LevelController::new(&settings());
        for _ in 0..3 {
            lc.upgrade(UpgradeKind::Active);
        }
        // 3 balls per level, 4 active
        let err = lc.start_level().unwrap_err();
        assert_eq!(
            err,
            ConfigError::NegativeReserve {
                balls_per_level: 3,
                active_limit: 4
            }
        );
        assert_eq!(lc.phase(), LevelPhase::Idle);
        assert!(lc.balls().is_empty());
    }

    #[test]
    fn test_no_active_balls_refuses_to_start() {
        let mut s = settings();
        s.tuning.starting_active = 0;
        let mut lc = LevelController::new(&s);
        assert_eq!(lc.start_level(), Err(ConfigError::NoActiveBalls(0)));
    }

    #[test]
    fn test_coin_threshold_compounds_once_per_call() {
        let mut lc = running();
        lc.add_score(49_999.0, 0.0);
        assert_eq!(lc.coin(), 0);

        lc.add_score(1.0, 0.1);
        assert_eq!(lc.score(), 50_000);
        assert_eq!(lc.coin(), 1);
        assert_eq!(lc.coin_threshold(), 100_000);

        // Jump far past the threshold: floor(260000 / 100000) = 2, one step only
        lc.add_score(210_000.0, 0.2);
        assert_eq!(lc.coin(), 3);
        assert_eq!(lc.coin_threshold(), 200_000);
    }

    #[test]
    fn test_score_floors_and_rejects_negative() {
        let mut lc = running();
        lc.add_score(10.9, 0.0);
        assert_eq!(lc.score(), 10);
        lc.add_score(-5.0, 0.0);
        lc.add_score(f64::NAN, 0.0);
        assert_eq!(lc.score(), 10);
    }

    #[test]
    fn test_score_mission_completes_level() {
        let mut lc = LevelController::new(&settings());
        lc.start_level().unwrap();
        lc.add_score(99_999.0, 0.0);
        assert_eq!(lc.phase(), LevelPhase::Running);
        lc.add_score(1.0, 0.1);
        assert_eq!(lc.phase(), LevelPhase::Complete);
        assert!(lc.is_complete());
        assert_eq!(lc.level(), 2);
        assert!(lc.flippers_locked());
        // 2 threshold coins + level award of 1
        assert_eq!(lc.coin(), 3);
    }

    #[test]
    fn test_sps_mission_uses_trailing_window() {
        let mut lc = LevelController::new(&settings());
        lc.select_mission(Mission::ScorePerSecond);
        lc.start_level().unwrap();

        lc.add_score(1_500.0, 0.0);
        lc.update(0.5, 0.5);
        assert_eq!(lc.phase(), LevelPhase::Running);
        // First entry has aged out by the time the second lands
        lc.add_score(1_500.0, 1.25);
        lc.update(0.5, 1.25);
        assert_eq!(lc.phase(), LevelPhase::Running);
        assert_eq!(lc.score_per_second(), 1_500.0);

        lc.add_score(1_500.0, 1.5);
        lc.update(0.25, 1.5);
        assert_eq!(lc.phase(), LevelPhase::Complete);
    }

    #[test]
    fn test_hit_target_mission() {
        let mut lc = LevelController::new(&settings());
        lc.select_mission(Mission::HitTarget);
        lc.start_level().unwrap();
        lc.target_struck();
        lc.target_struck();
        assert_eq!(lc.phase(), LevelPhase::Running);
        lc.target_struck();
        assert_eq!(lc.phase(), LevelPhase::Complete);
        assert_eq!(lc.target_hits(), 3);
    }

    #[test]
    fn test_low_time_fires_once_and_timeout_keeps_running() {
        let mut lc = running();
        lc.update(289.5, 0.0);
        let events = lc.take_events();
        assert!(!events.contains(&GameEvent::Cue(AudioCue::LowTime)));

        lc.update(0.5, 0.0);
        assert_eq!(lc.time_left(), 10.0);
        assert!(lc.take_events().contains(&GameEvent::Cue(AudioCue::LowTime)));

        lc.update(1.0, 0.0);
        assert!(!lc.take_events().contains(&GameEvent::Cue(AudioCue::LowTime)));

        lc.update(100.0, 0.0);
        assert_eq!(lc.time_left(), 0.0);
        assert!(lc.flippers_locked());
        assert_eq!(lc.phase(), LevelPhase::Running);

        lc.take_events();
        lc.update(1.0, 0.0);
        assert!(!lc.take_events().contains(&GameEvent::FlipperLock(true)));
        assert_eq!(lc.time_left(), 0.0);
    }

    #[test]
    fn test_short_time_limit_cues_low_time_at_start() {
        let mut s = settings();
        s.tuning.time_removed_per_level = 295.0;
        let mut lc = LevelController::new(&s);
        lc.select_mission(Mission::HitTarget);
        lc.start_level().unwrap();
        assert!(!lc.take_events().contains(&GameEvent::Cue(AudioCue::LowTime)));

        lc.target_struck();
        lc.target_struck();
        lc.target_struck();
        lc.take_events();

        // 300s left over from level 1 drops straight to 5s
        lc.start_level().unwrap();
        assert_eq!(lc.time_left(), 5.0);
        let lows = lc
            .take_events()
            .iter()
            .filter(|e| **e == GameEvent::Cue(AudioCue::LowTime))
            .count();
        assert_eq!(lows, 1);
    }

    #[test]
    fn test_zero_time_limit_locks_at_start() {
        let mut s = settings();
        s.tuning.time_limit = 0.0;
        let mut lc = LevelController::new(&s);
        lc.start_level().unwrap();
        assert!(lc.flippers_locked());
        assert_eq!(lc.phase(), LevelPhase::Running);
    }

    #[test]
    fn test_ball_fall_respawns_from_reserve_then_game_over() {
        let mut lc = running();
        let ball = BallId(0);
        lc.ball_left_launcher(ball);
        lc.ball_mut(ball).unwrap().energy = 9.0;

        lc.ball_fall(ball);
        assert_eq!(lc.balls_reserve(), 1);
        assert!(lc.in_play().is_empty());
        assert_eq!(lc.ball(ball).unwrap().energy, 1.0);
        let events = lc.take_events();
        assert!(events.iter().any(|e| matches!(e, GameEvent::Respawn { .. })));

        lc.ball_fall(ball);
        assert_eq!(lc.balls_reserve(), 0);
        assert_eq!(lc.phase(), LevelPhase::Running);

        lc.ball_fall(ball);
        assert_eq!(lc.phase(), LevelPhase::GameOver);
        let overs = lc
            .take_events()
            .iter()
            .filter(|e| matches!(e, GameEvent::GameOver { .. }))
            .count();
        assert_eq!(overs, 1);

        // Further falls do not re-trigger
        lc.ball_fall(ball);
        assert!(!lc.take_events().iter().any(|e| matches!(e, GameEvent::GameOver { .. })));
    }

    #[test]
    fn test_completion_suppresses_same_tick_game_over() {
        let mut lc = LevelController::new(&settings());
        lc.select_mission(Mission::HitTarget);
        lc.start_level().unwrap();
        lc.ball_fall(BallId(0));
        lc.ball_fall(BallId(0));

        lc.target_struck();
        lc.target_struck();
        lc.target_struck();
        lc.ball_fall(BallId(0));

        assert_eq!(lc.phase(), LevelPhase::Complete);
        assert!(!lc.take_events().iter().any(|e| matches!(e, GameEvent::GameOver { .. })));
    }

    #[test]
    fn test_sps_completion_beats_same_tick_game_over() {
        let mut lc = LevelController::new(&settings());
        lc.select_mission(Mission::ScorePerSecond);
        lc.start_level().unwrap();
        lc.ball_fall(BallId(0));
        lc.ball_fall(BallId(0));

        // Impact lands the requirement, then the last ball drains before update runs
        lc.add_score(3_000.0, 0.5);
        lc.ball_fall(BallId(0));
        lc.update(0.0, 0.5);

        assert_eq!(lc.phase(), LevelPhase::Complete);
        assert!(!lc.take_events().iter().any(|e| matches!(e, GameEvent::GameOver { .. })));
    }

    #[test]
    fn test_spin_multiplier_follows_sps_and_level() {
        let mut lc = running();
        assert_eq!(lc.spin_multiplier(), 1.0);
        lc.add_score(500.0, 0.0);
        assert_eq!(lc.score_per_second(), 500.0);
        assert_eq!(lc.spin_multiplier(), 1.5);
        assert!(
            lc.take_events()
                .contains(&GameEvent::Hud(HudUpdate::SpinMultiplier(1.5)))
        );

        lc.target_struck();
        lc.target_struck();
        lc.target_struck();
        assert_eq!(lc.level(), 2);
        assert_eq!(lc.spin_multiplier(), -1.5);
    }

    #[test]
    fn test_unknown_ball_is_ignored() {
        let mut lc = running();
        lc.ball_fall(BallId(42));
        lc.ball_left_launcher(BallId(42));
        assert_eq!(lc.balls_fallen(), 0);
        assert!(lc.in_play().is_empty());
    }

    #[test]
    fn test_start_after_complete_round_trip() {
        let mut lc = LevelController::new(&settings());
        lc.select_mission(Mission::HitTarget);
        lc.start_level().unwrap();
        lc.add_score(60_000.0, 0.0);
        lc.ball_fall(BallId(0));
        lc.target_struck();
        lc.target_struck();
        lc.target_struck();
        assert_eq!(lc.phase(), LevelPhase::Complete);
        lc.upgrade(UpgradeKind::Mass);

        let coin = lc.coin();
        let upgrades = lc.upgrades();
        lc.start_level().unwrap();

        assert_eq!(lc.phase(), LevelPhase::Running);
        assert_eq!(lc.level(), 2);
        assert_eq!(lc.score(), 0);
        assert_eq!(lc.target_hits(), 0);
        assert_eq!(lc.balls_fallen(), 0);
        assert!(lc.score_log().is_empty());
        assert_eq!(lc.coin_threshold(), 50_000);
        assert!(!lc.is_complete());
        assert_eq!(lc.coin(), coin);
        assert_eq!(lc.upgrades(), upgrades);
        assert_eq!(lc.time_left(), 240.0);
        assert!((lc.balls()[0].mass - 0.36).abs() < 1e-6);
    }

    #[test]
    fn test_complete_is_noop_unless_running() {
        let mut lc = LevelController::new(&settings());
        lc.complete_level();
        assert_eq!(lc.phase(), LevelPhase::Idle);
        assert_eq!(lc.level(), 1);
        lc.game_over();
        assert_eq!(lc.phase(), LevelPhase::Idle);
    }

    #[test]
    fn test_purchase_spends_coin() {
        let mut lc = running();
        assert!(!lc.can_afford(UpgradeKind::Mass));
        assert_eq!(
            lc.purchase(UpgradeKind::Mass),
            Err(PurchaseError::InsufficientCoin {
                kind: UpgradeKind::Mass,
                price: 1,
                coin: 0
            })
        );

        lc.add_coin(10);
        assert_eq!(lc.purchase(UpgradeKind::Count), Ok(3));
        assert_eq!(lc.coin(), 7);
        assert_eq!(lc.upgrades().count, 2);
        assert_eq!(lc.upgrade_price(UpgradeKind::Count), 6);
        assert_eq!(lc.purchase(UpgradeKind::Count), Ok(6));
        assert_eq!(lc.coin(), 1);
        assert_eq!(lc.upgrades().count, 3);
    }

    #[test]
    fn test_upgrade_preview() {
        let lc = LevelController::new(&settings());
        let preview = lc.upgrade_preview(UpgradeKind::Active);
        assert_eq!(preview.next_tier, 2);
        assert_eq!(preview.current, 1.0);
        assert_eq!(preview.next, 2.0);
        assert_eq!(preview.price, 5);
    }

    proptest! {
        #[test]
        fn prop_score_never_decreases(amounts in proptest::collection::vec(-1_000.0f64..30_000.0, 1..60)) {
            let mut lc = LevelController::new(&settings());
            lc.select_mission(Mission::HitTarget);
            lc.start_level().unwrap();
            let mut last = lc.score();
            let mut coin = lc.coin();
            for (i, amount) in amounts.iter().enumerate() {
                lc.add_score(*amount, i as f64 * 0.1);
                prop_assert!(lc.score() >= last);
                prop_assert!(lc.coin() >= coin);
                last = lc.score();
                coin = lc.coin();
            }
        }
    }
}
