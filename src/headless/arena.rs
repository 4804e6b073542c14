//! Foraging arena driven by an evolved controller
//!
//! A single agent roams an open field with food, vitamins and enemies. Each
//! tick the controller receives a 15-value observation and picks one of eight
//! compass directions by arg-max over its outputs.

use forage_neat::{EpisodeOutcome, EvaluationMode, Genome, NeatRng};
use glam::Vec2;
use serde::{Deserialize, Serialize};

/// Number of values in one observation
pub const OBSERVATION_SIZE: usize = 15;

/// Movement choices, in controller output order
pub const DIRECTIONS: [Direction; 8] = [
    Direction::Up,
    Direction::Down,
    Direction::Left,
    Direction::Right,
    Direction::UpLeft,
    Direction::UpRight,
    Direction::DownRight,
    Direction::DownLeft,
];

/// Compass direction in screen coordinates (y grows downward)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Up,
    Down,
    Left,
    Right,
    UpLeft,
    UpRight,
    DownRight,
    DownLeft,
}

impl Direction {
    /// Unit vector pointing in this direction
    pub fn vector(self) -> Vec2 {
        let raw = match self {
            Self::Up => Vec2::new(0.0, -1.0),
            Self::Down => Vec2::new(0.0, 1.0),
            Self::Left => Vec2::new(-1.0, 0.0),
            Self::Right => Vec2::new(1.0, 0.0),
            Self::UpLeft => Vec2::new(-1.0, -1.0),
            Self::UpRight => Vec2::new(1.0, -1.0),
            Self::DownRight => Vec2::new(1.0, 1.0),
            Self::DownLeft => Vec2::new(-1.0, 1.0),
        };
        raw.normalize()
    }

    /// Direction of the highest output; first index wins ties
    ///
    /// Returns None when fewer than eight outputs are available.
    pub fn from_outputs(outputs: &[f64]) -> Option<Self> {
        if outputs.len() < DIRECTIONS.len() {
            return None;
        }

        let mut best = 0;
        for (index, value) in outputs.iter().enumerate().take(DIRECTIONS.len()) {
            if *value > outputs[best] {
                best = index;
            }
        }
        Some(DIRECTIONS[best])
    }
}

/// Arena layout and agent/enemy stats
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ArenaConfig {
    pub width: f32,
    pub height: f32,
    pub food_count: usize,
    pub vitamin_count: usize,
    pub enemy_count: usize,
    /// Distance at which the agent touches an item or enemy
    pub contact_radius: f32,
    /// Items farther than this are not observed
    pub sense_radius: f32,
    /// Enemies closer than this chase the agent
    pub enemy_vision: f32,
    pub enemy_speed: f32,
    pub enemy_health: f64,
    pub enemy_attack: f64,
    /// Ticks between two hits of the same attacker
    pub attack_cooldown: u32,
    pub player_health: f64,
    pub player_damage: f64,
    pub player_speed: f64,
    pub player_efficiency: f64,
    pub starting_calories: f64,
    /// Health lost per tick while starving
    pub starvation_damage: f64,
    pub vitamin_ticks: u32,
    pub vitamin_speed_multiplier: f64,
}

impl Default for ArenaConfig {
    fn default() -> Self {
        Self {
            width: 4800.0,
            height: 4600.0,
            food_count: 100,
            vitamin_count: 10,
            enemy_count: 20,
            contact_radius: 32.0,
            sense_radius: 500.0,
            enemy_vision: 300.0,
            enemy_speed: 0.8,
            enemy_health: 3.0,
            enemy_attack: 1.0,
            attack_cooldown: 60,
            player_health: 10.0,
            player_damage: 1.0,
            player_speed: 1.0,
            player_efficiency: 1.0,
            starting_calories: 500.0,
            starvation_damage: 0.01,
            vitamin_ticks: 300,
            vitamin_speed_multiplier: 1.5,
        }
    }
}

#[derive(Debug, Clone)]
struct Enemy {
    position: Vec2,
    health: f64,
    cooldown: u32,
}

/// Agent state for one episode
#[derive(Debug, Clone)]
pub struct Agent {
    pub position: Vec2,
    pub health: f64,
    pub damage: f64,
    pub speed: f64,
    pub efficiency: f64,
    pub calories: f64,
    pub speed_multiplier: f64,
    vitamin_left: u32,
    cooldown: u32,
}

/// One episode of the foraging game
pub struct ForagingArena {
    config: ArenaConfig,
    pub agent: Agent,
    food: Vec<Vec2>,
    vitamins: Vec<Vec2>,
    enemies: Vec<Enemy>,
    score: u32,
    food_eaten: u32,
    enemies_killed: u32,
    ticks: u32,
}

impl ForagingArena {
    /// Lay out a fresh arena with the agent in the centre
    pub fn new<R: NeatRng + ?Sized>(config: &ArenaConfig, rng: &mut R) -> Self {
        let mut arena = Self {
            config: config.clone(),
            agent: Agent {
                position: Vec2::new(config.width / 2.0, config.height / 2.0),
                health: config.player_health,
                damage: config.player_damage,
                speed: config.player_speed,
                efficiency: config.player_efficiency,
                calories: config.starting_calories,
                speed_multiplier: 1.0,
                vitamin_left: 0,
                cooldown: 0,
            },
            food: Vec::with_capacity(config.food_count),
            vitamins: Vec::with_capacity(config.vitamin_count),
            enemies: Vec::with_capacity(config.enemy_count),
            score: 0,
            food_eaten: 0,
            enemies_killed: 0,
            ticks: 0,
        };

        for _ in 0..config.food_count {
            let position = arena.random_position(rng);
            arena.food.push(position);
        }
        for _ in 0..config.vitamin_count {
            let position = arena.random_position(rng);
            arena.vitamins.push(position);
        }
        for _ in 0..config.enemy_count {
            let enemy = arena.spawn_enemy(rng);
            arena.enemies.push(enemy);
        }

        arena
    }

    fn random_position<R: NeatRng + ?Sized>(&self, rng: &mut R) -> Vec2 {
        Vec2::new(
            rng.unit_weight() as f32 * self.config.width,
            rng.unit_weight() as f32 * self.config.height,
        )
    }

    fn spawn_enemy<R: NeatRng + ?Sized>(&self, rng: &mut R) -> Enemy {
        Enemy {
            position: self.random_position(rng),
            health: self.config.enemy_health,
            cooldown: 0,
        }
    }

    pub fn is_over(&self) -> bool {
        self.agent.health <= 0.0
    }

    pub fn ticks(&self) -> u32 {
        self.ticks
    }

    pub fn add_food(&mut self, position: Vec2) {
        self.food.push(position);
    }

    /// Nearest position within sense range: (distance, angle in degrees)
    fn nearest(&self, positions: impl Iterator<Item = Vec2>) -> Option<(f32, f32, usize)> {
        positions
            .enumerate()
            .map(|(index, p)| {
                let delta = p - self.agent.position;
                (delta.length(), delta.y.atan2(delta.x).to_degrees(), index)
            })
            .filter(|(distance, _, _)| *distance <= self.config.sense_radius)
            .min_by(|a, b| a.0.total_cmp(&b.0))
    }

    /// Build the controller's observation vector
    ///
    /// Distances are scaled by 1/500 and angles by 1/180; absent objects read
    /// as zeros.
    pub fn observe(&self) -> [f64; OBSERVATION_SIZE] {
        let agent = &self.agent;
        let mut observation = [0.0; OBSERVATION_SIZE];
        observation[0] = self.score as f64 / 10.0;
        observation[1] = agent.health / 10.0;
        observation[2] = agent.damage / 10.0;
        observation[3] = agent.speed / 10.0;
        observation[4] = agent.efficiency / 10.0;
        observation[5] = (agent.position.x / self.config.width) as f64;
        observation[6] = (agent.position.y / self.config.height) as f64;
        observation[7] = agent.calories / 10.0;

        if let Some((distance, angle, _)) = self.nearest(self.food.iter().copied()) {
            observation[8] = distance as f64 / 500.0;
            observation[9] = angle as f64 / 180.0;
        }
        if let Some((distance, angle, _)) = self.nearest(self.vitamins.iter().copied()) {
            observation[10] = distance as f64 / 500.0;
            observation[11] = angle as f64 / 180.0;
        }
        let nearest_enemy = self.nearest(self.enemies.iter().map(|e| e.position));
        if let Some((distance, angle, index)) = nearest_enemy {
            observation[12] = distance as f64 / 500.0;
            observation[13] = angle as f64 / 180.0;
            observation[14] = self.enemies[index].health / 10.0;
        }

        observation
    }

    /// Advance one tick with the agent moving in `direction`
    pub fn step<R: NeatRng + ?Sized>(&mut self, direction: Option<Direction>, rng: &mut R) {
        if self.is_over() {
            return;
        }
        self.ticks += 1;

        // Movement
        if let Some(direction) = direction {
            let scale = (0.1 + 2.0 * (1.0 + self.agent.speed).ln()) * self.agent.speed_multiplier;
            let next = self.agent.position + direction.vector() * scale as f32;
            let bounds = Vec2::new(self.config.width, self.config.height);
            self.agent.position = next.clamp(Vec2::ZERO, bounds);
        }

        // Metabolism
        self.agent.calories -= 0.1 * self.agent.efficiency;
        if self.agent.calories <= 0.0 {
            self.agent.calories = 0.0;
            self.agent.health -= self.config.starvation_damage;
        }
        if self.agent.vitamin_left > 0 {
            self.agent.vitamin_left -= 1;
            if self.agent.vitamin_left == 0 {
                self.agent.speed_multiplier = 1.0;
            }
        }

        self.collect_items(rng);
        self.update_enemies(rng);
    }

    fn collect_items<R: NeatRng + ?Sized>(&mut self, rng: &mut R) {
        let radius = self.config.contact_radius;
        let position = self.agent.position;

        let mut eaten = 0;
        self.food.retain(|food| {
            let touched = food.distance(position) <= radius;
            if touched {
                eaten += 1;
            }
            !touched
        });
        for _ in 0..eaten {
            self.food_eaten += 1;
            self.score += 25;
            self.agent.calories += 25.0;
            let respawn = self.random_position(rng);
            self.food.push(respawn);
        }

        let before = self.vitamins.len();
        self.vitamins.retain(|vitamin| vitamin.distance(position) > radius);
        let picked = before - self.vitamins.len();
        if picked > 0 {
            self.score += 10 * picked as u32;
            self.agent.vitamin_left = self.config.vitamin_ticks;
            self.agent.speed_multiplier = self.config.vitamin_speed_multiplier;
            for _ in 0..picked {
                let respawn = self.random_position(rng);
                self.vitamins.push(respawn);
            }
        }
    }

    fn update_enemies<R: NeatRng + ?Sized>(&mut self, rng: &mut R) {
        let config = &self.config;
        let agent = &mut self.agent;
        agent.cooldown = agent.cooldown.saturating_sub(1);

        let mut killed = Vec::new();
        for (index, enemy) in self.enemies.iter_mut().enumerate() {
            enemy.cooldown = enemy.cooldown.saturating_sub(1);
            let distance = enemy.position.distance(agent.position);

            if distance <= config.enemy_vision && distance > 0.0 {
                let toward = (agent.position - enemy.position).normalize_or_zero();
                enemy.position += toward * config.enemy_speed.min(distance);
            }

            if enemy.position.distance(agent.position) <= config.contact_radius {
                if agent.cooldown == 0 {
                    enemy.health -= agent.damage;
                    agent.cooldown = config.attack_cooldown / 2;
                }
                if enemy.health <= 0.0 {
                    killed.push(index);
                    continue;
                }
                if enemy.cooldown == 0 {
                    agent.health -= config.enemy_attack;
                    enemy.cooldown = config.attack_cooldown;
                }
            }
        }

        for index in killed.into_iter().rev() {
            self.enemies.swap_remove(index);
            self.enemies_killed += 1;
            self.score += 100;
            self.agent.calories += 100.0;
            let enemy = self.spawn_enemy(rng);
            self.enemies.push(enemy);
        }
    }

    /// Let `genome` control the agent until it dies or `max_ticks` pass
    pub fn run_episode<R: NeatRng + ?Sized>(
        &mut self,
        genome: &Genome,
        mode: EvaluationMode,
        max_ticks: u32,
        rng: &mut R,
    ) -> EpisodeOutcome {
        while self.ticks < max_ticks && !self.is_over() {
            let observation = self.observe();
            let (outputs, _) = genome.evaluate_with(&observation, mode);
            self.step(Direction::from_outputs(&outputs), rng);
        }

        self.outcome()
    }

    pub fn outcome(&self) -> EpisodeOutcome {
        EpisodeOutcome {
            score: self.score,
            food_eaten: self.food_eaten,
            enemies_killed: self.enemies_killed,
            ticks_survived: self.ticks,
            final_health: self.agent.health.max(0.0),
        }
    }
}
