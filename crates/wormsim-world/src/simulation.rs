//! Simulation engine: owns the board and the worms and advances them one tick at a time.

use crate::board::Board;
use crate::registry::{type_info, Aggression};
use crate::square::Square;
use crate::worm::{Worm, WormData};
use rand::distributions::{Distribution, WeightedIndex};
use rand::Rng;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use tracing::{debug, event, info, instrument, trace, warn, Level};
use wormsim_core::{
    Direction, Error, Position, RemnantPolicy, Result, SimConfig, Terrain, WormCensus, WormId,
    WormKind, WormStatus,
};

/// What happened to one worm during the movement phase of a tick
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Outcome {
    /// Not alive, nothing to do
    Idle,
    Moved,
    AteCarrot,
    Bounced,
    Blocked,
    Devoured,
    /// Cut another worm in two without moving
    Sliced,
}

/// Summary of a single tick
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TickReport {
    pub tick: u64,
    pub moved: usize,
    pub bounced: usize,
    pub blocked: usize,
    pub carrots_eaten: usize,
    pub worms_eaten: usize,
    pub slices: usize,
    pub worms_born: usize,
    pub starved: usize,
    /// Worms whose move failed and were skipped for the rest of the tick
    pub skipped: usize,
    /// Living worms after the tick
    pub alive: usize,
}

impl TickReport {
    fn record(&mut self, outcome: Outcome) {
        match outcome {
            Outcome::Idle => {}
            Outcome::Moved => self.moved += 1,
            Outcome::AteCarrot => {
                self.moved += 1;
                self.carrots_eaten += 1;
            }
            Outcome::Bounced => self.bounced += 1,
            Outcome::Blocked => self.blocked += 1,
            Outcome::Devoured => {
                self.moved += 1;
                self.worms_eaten += 1;
            }
            Outcome::Sliced => {
                self.slices += 1;
                self.worms_born += 1;
            }
        }
    }
}

/// Final state of a run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimulationResult {
    pub ticks_run: u64,
    pub final_tick: u64,
    pub high_water_mark: usize,
    pub census: WormCensus,
    pub carrots_remaining: usize,
    pub survivors: Vec<WormData>,
}

pub struct Simulation {
    board: Board,
    /// Keyed by id, so iteration order is creation order
    worms: BTreeMap<WormId, Worm>,
    /// Square -> worm covering it, kept current while a tick is being resolved
    occupancy: HashMap<Position, WormId>,
    /// Worms swept at the end of the most recent tick
    retired: Vec<Worm>,
    census: WormCensus,
    config: SimConfig,
    turn_distribution: WeightedIndex<u32>,
    kind_distribution: WeightedIndex<u32>,
    rng: ChaCha8Rng,
    next_id: WormId,
    tick: u64,
}

impl Simulation {
    /// Build a simulation whose random generator is seeded from `config.seed`
    pub fn new(config: SimConfig) -> Result<Self> {
        let rng = ChaCha8Rng::seed_from_u64(config.seed);
        Self::with_rng(config, rng)
    }

    /// Build a simulation around an existing random generator and set up the initial
    /// population and carrots. `ChaCha8Rng` is the only supported source so that a seed
    /// reproduces a run on every platform; pass one seeded differently, or advanced
    /// beforehand, to vary a run without touching the config.
    pub fn with_rng(config: SimConfig, rng: ChaCha8Rng) -> Result<Self> {
        config.validate()?;

        let turn_distribution = WeightedIndex::new(config.movement.turn_weights)
            .map_err(|e| Error::Validation(format!("turn_weights: {}", e)))?;
        let kind_distribution = WeightedIndex::new(
            WormKind::all()
                .iter()
                .map(|&kind| config.population.type_mix.weight_of(kind)),
        )
        .map_err(|e| Error::Validation(format!("type_mix: {}", e)))?;

        let mut sim = Self {
            board: Board::new(&config.board),
            worms: BTreeMap::new(),
            occupancy: HashMap::new(),
            retired: Vec::new(),
            census: WormCensus::new(),
            config,
            turn_distribution,
            kind_distribution,
            rng,
            next_id: WormId(1),
            tick: 0,
        };
        sim.restart()?;

        Ok(sim)
    }

    /// Throw away every worm and all terrain, then lay out a fresh population and carrots.
    /// Worm ids keep counting up across restarts.
    pub fn restart(&mut self) -> Result<()> {
        self.worms.clear();
        self.occupancy.clear();
        self.retired.clear();
        self.tick = 0;
        self.reset_worm_counters();
        self.board.clear_passive();
        self.board.update_board_with_worms_and_carrots(self.worms.values());

        let population = &self.config.population;
        let num_worms = match population.initial_worms {
            Some(count) => count,
            None if population.worm_variation > 0 => {
                population.min_worms + self.rng.gen_range(0..population.worm_variation)
            }
            None => population.min_worms,
        };

        for _ in 0..num_worms {
            match self.create_worm(None) {
                Ok(_) => {}
                Err(Error::BoardFull) => {
                    warn!(
                        event = "initial_population_truncated",
                        requested = num_worms,
                        created = self.worms.len(),
                        "Board full before the initial population was placed"
                    );
                    break;
                }
                Err(e) => return Err(e),
            }
        }

        let carrots = self
            .board
            .sprinkle_carrots_by_density(self.config.board.carrot_density, &mut self.rng);
        self.republish_board();

        info!(
            event = "simulation_restart",
            width = self.board.width(),
            height = self.board.height(),
            worms = self.worms.len(),
            carrots = carrots,
            "Simulation restarted"
        );
        Ok(())
    }

    /// Run up to `steps` ticks, stopping early once no worm is alive
    #[instrument(skip(self), fields(seed = self.config.seed))]
    pub fn run_simulation(&mut self, steps: u64) -> Result<SimulationResult> {
        info!("Starting simulation for up to {} ticks", steps);

        let mut ticks_run = 0;
        for _ in 0..steps {
            if self.live_count() == 0 {
                info!(
                    event = "population_extinct",
                    tick = self.tick,
                    "No living worms left, stopping early"
                );
                break;
            }
            self.run_simulation_step()?;
            ticks_run += 1;
        }

        self.emit_run_summary(ticks_run);
        Ok(self.collect_results(ticks_run))
    }

    /// Run for the configured number of ticks
    pub fn run(&mut self) -> Result<SimulationResult> {
        self.run_simulation(self.config.num_ticks)
    }

    /// Execute one tick: move and resolve collisions in creation order, apply metabolism,
    /// sweep dead and eaten worms, then rebuild the screen board.
    pub fn run_simulation_step(&mut self) -> Result<TickReport> {
        self.tick += 1;
        self.retired.clear();
        let mut report = TickReport {
            tick: self.tick,
            ..Default::default()
        };

        self.rebuild_occupancy();

        // Snapshot the order so worms born this tick wait until the next one
        let order: Vec<WormId> = self.worms.keys().copied().collect();
        for id in order {
            match self.resolve_worm(id) {
                Ok(outcome) => report.record(outcome),
                Err(e) => {
                    report.skipped += 1;
                    warn!(
                        event = "worm_skipped",
                        worm_id = %id,
                        tick = self.tick,
                        error = %e,
                        "Worm skipped for the rest of the tick"
                    );
                }
            }
        }

        report.starved = self.make_all_worms_live();
        self.sweep_retired_worms()?;
        self.republish_board();

        let regrowth = self.config.board.carrot_regrowth_per_tick;
        if regrowth > 0 {
            self.sprinkle_carrots(regrowth);
        }

        report.alive = self.live_count();

        let interval = self.config.report_interval;
        if interval > 0 && self.tick % interval == 0 {
            self.emit_population_metrics(&report);
        }

        Ok(report)
    }

    /// Apply one tick of metabolism to every worm. Returns how many starved.
    /// Worms that are already dead or eaten stay that way.
    pub fn make_all_worms_live(&mut self) -> usize {
        let metabolism = &self.config.metabolism;
        let mut starved = 0;
        for worm in self.worms.values_mut() {
            if worm.live(metabolism) {
                starved += 1;
                debug!(
                    event = "worm_starved",
                    worm_id = %worm.id(),
                    kind = %worm.kind(),
                    length = worm.len(),
                    tick = self.tick,
                    "Worm starved"
                );
            }
        }
        self.census.worms_starved += starved as u64;
        starved
    }

    /// Add a worm of `kind` (random when `None`) on a random free square
    pub fn create_worm(&mut self, kind: Option<WormKind>) -> Result<WormId> {
        let kind = match kind {
            Some(kind) => kind,
            None => WormKind::all()[self.kind_distribution.sample(&mut self.rng)],
        };
        let position = self.board.find_slot(&mut self.rng)?;
        let direction: Direction = self.rng.gen();
        self.create_worm_at(position, direction, kind)
    }

    /// Add a single-segment worm at a chosen square
    pub fn create_worm_at(
        &mut self,
        position: Position,
        direction: Direction,
        kind: WormKind,
    ) -> Result<WormId> {
        let id = self.next_id;
        let worm = Worm::spawn(
            id,
            position,
            direction,
            type_info(kind),
            self.config.metabolism.spawn_stomach,
            &self.board,
        )?;
        self.next_id = id.next();
        self.register(worm);

        debug!(
            event = "worm_created",
            worm_id = %id,
            kind = %kind,
            x = position.x,
            y = position.y,
            "Worm created"
        );
        Ok(id)
    }

    /// Remove the carrot at `pos`. Returns true iff one was there.
    pub fn try_to_eat_carrot_at(&mut self, pos: Position) -> Result<bool> {
        self.board.try_to_eat_carrot_at(pos)
    }

    /// Place up to `count` carrots on free squares and republish the board
    pub fn sprinkle_carrots(&mut self, count: usize) -> usize {
        let placed = self.board.sprinkle_carrots(count, &mut self.rng);
        self.republish_board();
        placed
    }

    /// Set the terrain of one square and republish the board
    pub fn set_passive_square_at(&mut self, pos: Position, terrain: Terrain) -> Result<()> {
        self.board.set_passive_square_at(pos, terrain)?;
        self.republish_board();
        Ok(())
    }

    /// Find a live worm other than `attacker` with a segment at `position`.
    /// Returns the victim and the index of the struck segment.
    pub fn get_victim_worm(&self, attacker: WormId, position: Position) -> Option<(WormId, usize)> {
        let victim_id = *self.occupancy.get(&position)?;
        if victim_id == attacker {
            return None;
        }
        let victim = self.worms.get(&victim_id).filter(|w| w.is_alive())?;
        victim
            .segment_index_at(position)
            .map(|segment| (victim_id, segment))
    }

    /// Let `eater` devour whichever worm covers `position`.
    /// Returns the food gained, or `None` when there was nothing to eat.
    pub fn eat_victim_for_worm(&mut self, eater: WormId, position: Position) -> Result<Option<i32>> {
        let Some((victim_id, segment)) = self.get_victim_worm(eater, position) else {
            return Ok(None);
        };

        let victim = self.worm_mut(victim_id)?;
        let food = victim.food_value();
        let victim_kind = victim.kind();
        let released = victim.on_was_eaten();
        if released.is_empty() {
            return Ok(None);
        }

        for pos in &released {
            if self.occupancy.get(pos) == Some(&victim_id) {
                self.occupancy.remove(pos);
            }
        }
        if self.config.board.eaten_remnant == RemnantPolicy::Carrot {
            for &pos in released.iter().filter(|&&pos| pos != position) {
                self.board.set_passive_square_at(pos, Terrain::Carrot)?;
            }
        }

        self.worm_mut(eater)?.feed(food);
        self.census.worms_eaten += 1;

        debug!(
            event = "worm_eaten",
            eater_id = %eater,
            victim_id = %victim_id,
            victim_kind = %victim_kind,
            struck_segment = segment,
            food = food,
            tick = self.tick,
            "Worm eaten"
        );
        Ok(Some(food))
    }

    /// Let `slicer` cut whichever worm covers `position`.
    /// Returns the id of the worm formed by the cut-off tail, if any.
    pub fn slice_victim_for_worm(
        &mut self,
        slicer: WormId,
        position: Position,
    ) -> Result<Option<WormId>> {
        let Some((victim_id, segment)) = self.get_victim_worm(slicer, position) else {
            return Ok(None);
        };
        let offspring = self.slice_victim(victim_id, segment)?;

        debug!(
            event = "worm_sliced",
            slicer_id = %slicer,
            victim_id = %victim_id,
            struck_segment = segment,
            offspring_id = ?offspring,
            tick = self.tick,
            "Worm sliced"
        );
        Ok(offspring)
    }

    /// Cut `victim_id` behind `segment` and register the tail half as a new worm
    pub fn slice_victim(&mut self, victim_id: WormId, segment: usize) -> Result<Option<WormId>> {
        let spawn_stomach = self.config.metabolism.spawn_stomach;
        let victim = self.worm_mut(victim_id)?;
        let Some(remainder) = victim.on_was_sliced_at_segment_index(segment, spawn_stomach)? else {
            return Ok(None);
        };
        victim.check_contiguity()?;

        let id = self.next_id;
        self.next_id = id.next();
        let offspring = Worm::from_remainder(id, remainder);
        offspring.check_contiguity()?;

        self.census.slices += 1;
        self.register(offspring);
        Ok(Some(id))
    }

    // Query surface for presentation layers

    pub fn width(&self) -> i32 {
        self.board.width()
    }

    pub fn height(&self) -> i32 {
        self.board.height()
    }

    pub fn board(&self) -> &Board {
        &self.board
    }

    pub fn get_screen_square_at(&self, pos: Position) -> Result<&Square> {
        self.board.get_screen_square_at(pos)
    }

    pub fn get_attr_at(&self, pos: Position) -> Result<Terrain> {
        self.board.get_attr_at(pos)
    }

    /// Worms in creation order
    pub fn worms(&self) -> impl Iterator<Item = &Worm> + '_ {
        self.worms.values()
    }

    pub fn worm(&self, id: WormId) -> Option<&Worm> {
        self.worms.get(&id)
    }

    /// Worms swept from the simulation at the end of the last tick
    pub fn retired_last_tick(&self) -> &[Worm] {
        &self.retired
    }

    pub fn high_water_mark(&self) -> usize {
        self.board.high_water_mark()
    }

    pub fn census(&self) -> &WormCensus {
        &self.census
    }

    pub fn num_vegetarians(&self) -> usize {
        self.census.num_vegetarians()
    }

    pub fn num_canibals(&self) -> usize {
        self.census.num_canibals()
    }

    pub fn num_scissorheads(&self) -> usize {
        self.census.num_scissorheads()
    }

    /// Zero the per-kind counters, event totals and the high-water mark
    pub fn reset_worm_counters(&mut self) {
        self.census.reset_worm_counters();
        self.board.reset_high_water_mark();
    }

    pub fn tick(&self) -> u64 {
        self.tick
    }

    pub fn config(&self) -> &SimConfig {
        &self.config
    }

    pub fn live_count(&self) -> usize {
        self.worms.values().filter(|w| w.is_alive()).count()
    }

    fn worm_mut(&mut self, id: WormId) -> Result<&mut Worm> {
        self.worms.get_mut(&id).ok_or(Error::WormNotFound(id))
    }

    /// Add a worm to the live collection and the counters, then republish the board
    pub(crate) fn register(&mut self, worm: Worm) {
        self.census.record_created(worm.kind());
        for &pos in worm.body() {
            self.occupancy.insert(pos, worm.id());
        }
        self.worms.insert(worm.id(), worm);
        self.republish_board();
    }

    fn rebuild_occupancy(&mut self) {
        self.occupancy.clear();
        for worm in self.worms.values().filter(|w| w.is_alive()) {
            for &pos in worm.body() {
                self.occupancy.insert(pos, worm.id());
            }
        }
    }

    fn resolve_worm(&mut self, id: WormId) -> Result<Outcome> {
        let (head, direction, aggression, hungry) = {
            let worm = self.worms.get(&id).ok_or(Error::WormNotFound(id))?;
            if !worm.is_alive() {
                return Ok(Outcome::Idle);
            }
            let head = worm.head().ok_or_else(|| {
                Error::InvariantViolation(format!("{} is alive with an empty body", id))
            })?;
            let hungry = worm.is_hungry(&self.config.metabolism);
            (head, worm.direction(), worm.type_info().aggression, hungry)
        };

        let heading = direction.turned(self.turn_distribution.sample(&mut self.rng));
        let target = head.step(heading);
        self.worm_mut(id)?.turn(heading);

        if !self.board.contains(target) {
            let flip_x = target.x < 0 || target.x >= self.board.width();
            let flip_y = target.y < 0 || target.y >= self.board.height();
            let bounced = heading.reflected(flip_x, flip_y);
            self.worm_mut(id)?.turn(bounced);
            trace!(worm_id = %id, ?heading, ?bounced, "Worm bounced off the edge");
            return Ok(Outcome::Bounced);
        }

        match self.occupancy.get(&target).copied() {
            Some(owner) if owner == id => {
                trace!(worm_id = %id, x = target.x, y = target.y, "Worm blocked by itself");
                Ok(Outcome::Blocked)
            }
            Some(_) => match aggression {
                _ if !hungry => {
                    trace!(worm_id = %id, x = target.x, y = target.y, "Sated worm blocked by another worm");
                    Ok(Outcome::Blocked)
                }
                Aggression::Passive => {
                    trace!(worm_id = %id, x = target.x, y = target.y, "Worm blocked by another worm");
                    Ok(Outcome::Blocked)
                }
                Aggression::Devour => match self.eat_victim_for_worm(id, target)? {
                    Some(_) => {
                        self.advance_worm(id, target, false)?;
                        Ok(Outcome::Devoured)
                    }
                    None => Ok(Outcome::Blocked),
                },
                // Striking a head or a tail end cuts nothing and the slicer stays put
                Aggression::Slice => match self.slice_victim_for_worm(id, target)? {
                    Some(_) => Ok(Outcome::Sliced),
                    None => Ok(Outcome::Blocked),
                },
            },
            // A sated worm crawls over carrots and leaves them in place
            None => {
                if hungry && self.try_to_eat_carrot_at(target)? {
                    self.advance_worm(id, target, true)?;
                    let food = self.config.metabolism.carrot_food_value;
                    self.worm_mut(id)?.feed(food);
                    self.census.carrots_eaten += 1;
                    Ok(Outcome::AteCarrot)
                } else {
                    self.advance_worm(id, target, false)?;
                    Ok(Outcome::Moved)
                }
            }
        }
    }

    fn advance_worm(&mut self, id: WormId, target: Position, grow: bool) -> Result<()> {
        let worm = self.worm_mut(id)?;
        let vacated = worm.advance_to(target, grow);
        worm.check_contiguity()?;

        self.occupancy.insert(target, id);
        if let Some(tail) = vacated {
            if self.occupancy.get(&tail) == Some(&id) {
                self.occupancy.remove(&tail);
            }
        }
        Ok(())
    }

    fn sweep_retired_worms(&mut self) -> Result<()> {
        let retired: Vec<WormId> = self
            .worms
            .values()
            .filter(|w| w.status().is_terminal())
            .map(|w| w.id())
            .collect();

        for id in retired {
            let Some(worm) = self.worms.remove(&id) else {
                continue;
            };
            if worm.status() == WormStatus::Dead {
                for &pos in worm.body() {
                    self.board.set_passive_square_at(pos, Terrain::DeadMarker)?;
                }
            }
            self.census.record_retired(worm.kind());
            debug!(
                event = "worm_retired",
                worm_id = %id,
                kind = %worm.kind(),
                status = ?worm.status(),
                tick = self.tick,
                "Worm removed from the simulation"
            );
            self.retired.push(worm);
        }
        Ok(())
    }

    /// Rebuild the screen board from terrain and worms, then update the high-water mark
    fn republish_board(&mut self) {
        self.board
            .update_board_with_worms_and_carrots(self.worms.values());
        let alive = self.live_count();
        self.board.note_population(alive);
    }

    fn emit_population_metrics(&self, report: &TickReport) {
        let lengths: Vec<usize> = self.worms.values().map(|w| w.len()).collect();
        let avg_length = if lengths.is_empty() {
            0.0
        } else {
            lengths.iter().sum::<usize>() as f64 / lengths.len() as f64
        };
        let max_length = lengths.iter().max().copied().unwrap_or(0);

        info!(
            event = "population_metrics",
            tick = self.tick,
            alive = report.alive,
            vegetarians = self.census.num_vegetarians(),
            cannibals = self.census.num_canibals(),
            scissorheads = self.census.num_scissorheads(),
            high_water_mark = self.board.high_water_mark(),
            avg_length = avg_length,
            max_length = max_length,
            carrots = self.board.carrot_count(),
            "Population metrics snapshot"
        );

        event!(
            Level::INFO,
            gauge_name = "population_total",
            gauge_value = report.alive,
            tick = self.tick,
            "Population gauge"
        );
    }

    fn emit_run_summary(&self, ticks_run: u64) {
        info!(
            event = "run_summary",
            ticks_run = ticks_run,
            final_tick = self.tick,
            survivors = self.live_count(),
            high_water_mark = self.board.high_water_mark(),
            total_created = self.census.total_created,
            carrots_eaten = self.census.carrots_eaten,
            worms_eaten = self.census.worms_eaten,
            worms_starved = self.census.worms_starved,
            slices = self.census.slices,
            "Simulation run complete"
        );
    }

    fn collect_results(&self, ticks_run: u64) -> SimulationResult {
        SimulationResult {
            ticks_run,
            final_tick: self.tick,
            high_water_mark: self.board.high_water_mark(),
            census: self.census.clone(),
            carrots_remaining: self.board.carrot_count(),
            survivors: self.worms.values().map(WormData::from).collect(),
        }
    }
}
