//! Pinball Core demo session
//!
//! Runs a headless session against a toy physics world: a few levels of
//! scripted play, buying upgrades between levels. Pass a settings JSON path
//! as the first argument to override the defaults.

#[cfg(not(target_arch = "wasm32"))]
mod demo {
    use std::cell::RefCell;
    use std::collections::{HashMap, HashSet};
    use std::rc::Rc;

    use glam::Vec3;
    use rand::{Rng, SeedableRng};
    use rand_pcg::Pcg32;

    use pinball_core::audio::LogAudio;
    use pinball_core::consts::{MAX_SUBSTEPS, SIM_DT};
    use pinball_core::platform::{InputLock, LogPresentation, PhysicsCollaborator};
    use pinball_core::sim::{
        BallId, ContactEvent, ElementId, ImpactProfile, LevelPhase, Mission, Table, TickInput,
        UpgradeKind,
    };
    use pinball_core::{ConfigError, Settings};

    const GRAVITY: f32 = 20.0;
    const HALF_WIDTH: f32 = 5.0;
    const TOP: f32 = 10.0;
    const FLIPPER_LINE: f32 = -8.5;
    const DRAIN_LINE: f32 = -10.0;
    const CONTACT_RADIUS: f32 = 1.0;
    const LEVELS: u32 = 4;
    /// Upper bound on simulated seconds per level
    const LEVEL_CAP: f32 = 900.0;

    #[derive(Debug, Clone, Copy)]
    struct ToyBall {
        position: Vec3,
        velocity: Vec3,
        mass: f32,
        in_launcher: bool,
        drained: bool,
    }

    /// Point-mass balls on a tilted box with a lazy flipper
    struct ToyWorld {
        balls: HashMap<BallId, ToyBall>,
        touching: HashSet<(BallId, ElementId)>,
        flippers_locked: bool,
        rng: Pcg32,
    }

    impl ToyWorld {
        fn new(seed: u64) -> Self {
            Self {
                balls: HashMap::new(),
                touching: HashSet::new(),
                flippers_locked: true,
                rng: Pcg32::seed_from_u64(seed),
            }
        }

        /// Integrate one step and report what happened
        fn step(&mut self, dt: f32, elements: &[(ElementId, Vec3)]) -> TickInput {
            let mut input = TickInput::default();
            let mut ids: Vec<BallId> = self.balls.keys().copied().collect();
            ids.sort();

            for id in ids {
                let Some(mut ball) = self.balls.get(&id).copied() else {
                    continue;
                };
                if ball.drained {
                    continue;
                }

                if ball.in_launcher {
                    if ball.velocity == Vec3::ZERO {
                        let aim = self.rng.random_range(-3.0..-1.0);
                        ball.velocity = Vec3::new(aim, 0.0, 30.0);
                    }
                    if ball.position.z > 0.0 {
                        ball.in_launcher = false;
                        input.launched.push(id);
                    }
                }

                ball.velocity.z -= GRAVITY * dt;
                ball.position += ball.velocity * dt;

                if ball.position.x.abs() > HALF_WIDTH {
                    ball.position.x = ball.position.x.clamp(-HALF_WIDTH, HALF_WIDTH);
                    ball.velocity.x = -ball.velocity.x;
                }
                if ball.position.z > TOP {
                    ball.position.z = TOP;
                    ball.velocity.z = -ball.velocity.z.abs();
                }

                if !ball.in_launcher && ball.position.z < FLIPPER_LINE && ball.velocity.z < 0.0 {
                    let saved = !self.flippers_locked && self.rng.random_bool(0.8);
                    if saved {
                        ball.velocity = Vec3::new(
                            self.rng.random_range(-6.0..6.0),
                            0.0,
                            self.rng.random_range(22.0..32.0),
                        );
                    }
                }

                if ball.position.z < DRAIN_LINE {
                    input.fallen.push(id);
                    // Parked until the table respawns it
                    ball.velocity = Vec3::ZERO;
                    ball.drained = true;
                    self.balls.insert(id, ball);
                    continue;
                }

                for &(element, at) in elements {
                    let key = (id, element);
                    let offset = at - ball.position;
                    if offset.length() < CONTACT_RADIUS {
                        if self.touching.insert(key) {
                            input.contacts.push(ContactEvent {
                                ball: id,
                                element,
                                point: ball.position + offset * 0.5,
                                normal: offset.normalize_or_zero(),
                                relative_speed: ball.velocity.length(),
                            });
                        }
                    } else {
                        self.touching.remove(&key);
                    }
                }

                self.balls.insert(id, ball);
            }
            input
        }
    }

    #[derive(Clone)]
    struct ToyPhysics(Rc<RefCell<ToyWorld>>);

    impl PhysicsCollaborator for ToyPhysics {
        fn position(&self, ball: BallId) -> Vec3 {
            self.0
                .borrow()
                .balls
                .get(&ball)
                .map_or(Vec3::ZERO, |b| b.position)
        }

        fn speed(&self, ball: BallId) -> f32 {
            self.0
                .borrow()
                .balls
                .get(&ball)
                .map_or(0.0, |b| b.velocity.length())
        }

        fn apply_impulse(&mut self, ball: BallId, impulse: Vec3) {
            if let Some(b) = self.0.borrow_mut().balls.get_mut(&ball) {
                b.velocity += impulse / b.mass.max(0.01);
            }
        }

        fn respawn(&mut self, ball: BallId, at: Vec3) {
            let mut world = self.0.borrow_mut();
            let mass = world.balls.get(&ball).map_or(1.0, |b| b.mass);
            world.balls.insert(
                ball,
                ToyBall {
                    position: at,
                    velocity: Vec3::ZERO,
                    mass,
                    in_launcher: true,
                    drained: false,
                },
            );
            world.touching.retain(|(id, _)| *id != ball);
        }

        fn set_mass(&mut self, ball: BallId, mass: f32) {
            let mut world = self.0.borrow_mut();
            let entry = world.balls.entry(ball).or_insert(ToyBall {
                position: Vec3::ZERO,
                velocity: Vec3::ZERO,
                mass,
                in_launcher: true,
                drained: false,
            });
            entry.mass = mass;
        }
    }

    struct ToyFlippers(Rc<RefCell<ToyWorld>>);

    impl InputLock for ToyFlippers {
        fn set_flipper_lock(&mut self, locked: bool) {
            self.0.borrow_mut().flippers_locked = locked;
        }
    }

    /// Fixed-step accumulator fed by variable frame times
    struct Accumulator {
        pending: f32,
    }

    impl Accumulator {
        /// Number of fixed steps to run for this frame
        fn steps(&mut self, frame_dt: f32) -> u32 {
            self.pending += frame_dt.min(0.1);
            let mut steps = 0;
            while self.pending >= SIM_DT && steps < MAX_SUBSTEPS {
                self.pending -= SIM_DT;
                steps += 1;
            }
            steps
        }
    }

    fn lay_out(table: &mut Table) {
        for x in [-2.0, 0.0, 2.0] {
            table.add_bumper(Vec3::new(x, 0.0, 5.0), ImpactProfile::default());
        }
        table.add_group(
            ImpactProfile::default(),
            &[
                Vec3::new(-3.5, 0.0, 2.0),
                Vec3::new(-3.5, 0.0, 0.5),
                Vec3::new(-3.5, 0.0, -1.0),
            ],
        );
        table.add_target_pool(
            ImpactProfile::surface(6.0, 20.0),
            &[
                Vec3::new(-1.5, 0.0, 8.5),
                Vec3::new(0.0, 0.0, 9.0),
                Vec3::new(1.5, 0.0, 8.5),
                Vec3::new(3.0, 0.0, 2.0),
            ],
        );
        table.add_switch(Vec3::new(4.5, 0.0, 0.0), false);
    }

    /// Spend coin on the cheapest affordable upgrades
    fn shop(table: &mut Table) {
        loop {
            let kinds = [UpgradeKind::Mass, UpgradeKind::Count, UpgradeKind::Active];
            let Some(kind) = kinds
                .into_iter()
                .filter(|&k| table.level().can_afford(k))
                .min_by_key(|&k| table.upgrade_preview(k).price)
            else {
                break;
            };
            let preview = table.upgrade_preview(kind);
            // Never buy more active balls than the reserve can cover
            if kind == UpgradeKind::Active {
                let count = table.upgrade_preview(UpgradeKind::Count).current;
                if preview.next > count {
                    break;
                }
            }
            match table.purchase(kind) {
                Ok(price) => log::info!(
                    "Shop: {:?} {} -> {} for {}",
                    kind,
                    preview.current,
                    preview.next,
                    price
                ),
                Err(e) => {
                    log::warn!("Shop: {}", e);
                    break;
                }
            }
        }
    }

    pub fn run(settings: Settings) -> Result<(), ConfigError> {
        let world = Rc::new(RefCell::new(ToyWorld::new(settings.seed ^ 0xba11)));
        let mut table = Table::builder(settings)
            .physics(ToyPhysics(world.clone()))
            .input(ToyFlippers(world.clone()))
            .audio(LogAudio)
            .presentation(LogPresentation)
            .build()?;
        lay_out(&mut table);

        let elements: Vec<(ElementId, Vec3)> =
            table.elements().map(|e| (e.id, e.position)).collect();
        let missions = [Mission::HitTarget, Mission::Score, Mission::HitTarget];
        let mut frame_rng = Pcg32::seed_from_u64(7);
        let mut clock = Accumulator { pending: 0.0 };

        for round in 0..LEVELS {
            table.select_mission(missions[round as usize % missions.len()]);
            table.start_level()?;

            let mut elapsed = 0.0;
            while table.level().phase() == LevelPhase::Running && elapsed < LEVEL_CAP {
                // Jittery ~60 Hz frames
                let frame_dt = frame_rng.random_range(0.012..0.022);
                for _ in 0..clock.steps(frame_dt) {
                    let input = world.borrow_mut().step(SIM_DT, &elements);
                    table.tick(&input, SIM_DT);
                    elapsed += SIM_DT;
                }
            }

            let level = table.level();
            log::info!(
                "Round {}: {:?} after {:.1}s, score {}, coin {}, {} target hits",
                round + 1,
                level.phase(),
                elapsed,
                level.score(),
                level.coin(),
                level.target_hits()
            );
            if level.phase() != LevelPhase::Complete {
                break;
            }
            shop(&mut table);
        }

        log::info!(
            "Session over on level {} with {} coin, upgrades {:?}",
            table.level().level(),
            table.level().coin(),
            table.level().upgrades()
        );
        Ok(())
    }
}

#[cfg(not(target_arch = "wasm32"))]
fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    log::info!("Pinball Core demo starting...");

    let settings = match std::env::args().nth(1) {
        Some(path) => match pinball_core::Settings::load(&path) {
            Ok(settings) => settings,
            Err(e) => {
                log::error!("{}", e);
                std::process::exit(1);
            }
        },
        None => pinball_core::Settings::default(),
    };

    if let Err(e) = demo::run(settings) {
        log::error!("{}", e);
        std::process::exit(1);
    }
}

#[cfg(target_arch = "wasm32")]
fn main() {
    // Library-only on the web; embedders drive the Table themselves
}
