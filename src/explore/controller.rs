// Top-level exploration state machine
//
// Owns every piece of mutable core state (pose, map, nest, turn timer,
// line detector) and is the only thing that writes to it. Hardware is
// borrowed per cycle.

use std::sync::atomic::{AtomicBool, Ordering};

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use super::follower::{self, FollowerTurn};
use super::line::{LineCrossingDetector, LineEvent};
use super::maze::{MazeMap, RelativeOpenings};
use super::pose::{GridPosition, Pose};
use super::sensors::SensorSnapshot;
use super::timer::TurnTimer;
use super::victory;
use crate::config::ControllerConfig;
use crate::error::{Error, Result};
use crate::hardware::Hardware;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    /// Wall following while mapping cells and watching for the nest
    Exploring,
    /// Map complete; wall following until the nest's darkness shows up
    SeekingNest,
    /// Driving straight into the nest until the back wall is close
    EnteringNest,
    Done,
}

/// Core state shared by the behaviours
#[derive(Debug, Clone)]
pub struct ExplorationContext {
    pub pose: Pose,
    pub map: MazeMap,
    pub nest: Option<GridPosition>,
    pub timer: TurnTimer,
    pub line: LineCrossingDetector,
}

impl ExplorationContext {
    pub fn new(config: &ControllerConfig) -> Self {
        Self {
            pose: Pose::new(
                GridPosition::new(config.start_x, config.start_y),
                config.start_orientation,
            ),
            map: MazeMap::new(),
            nest: None,
            timer: TurnTimer::new(),
            line: LineCrossingDetector::new(),
        }
    }
}

pub struct ExplorationController {
    config: ControllerConfig,
    context: ExplorationContext,
    phase: Phase,
    cycle: u64,
}

impl ExplorationController {
    pub fn new(config: ControllerConfig) -> Self {
        let context = ExplorationContext::new(&config);
        Self::with_context(config, context)
    }

    /// Resume from an existing context, still exploring
    pub fn with_context(config: ControllerConfig, context: ExplorationContext) -> Self {
        Self {
            config,
            context,
            phase: Phase::Exploring,
            cycle: 0,
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn context(&self) -> &ExplorationContext {
        &self.context
    }

    pub fn config(&self) -> &ControllerConfig {
        &self.config
    }

    /// Control cycles run so far
    pub fn cycle(&self) -> u64 {
        self.cycle
    }

    /// Every cell mapped and the nest located
    pub fn exploration_complete(&self) -> bool {
        self.context.map.is_complete() && self.context.nest.is_some()
    }

    /// Run cycles until `Done`, calling `observer` after each one. On a
    /// hardware failure the motors are stopped best-effort before the
    /// error is returned.
    pub fn run<H, F>(&mut self, hw: &mut H, observer: F) -> Result<()>
    where
        H: Hardware + ?Sized,
        F: FnMut(&Self),
    {
        self.run_until_cancelled(hw, &AtomicBool::new(false), observer)
    }

    /// Like `run`, but also checks `cancel` before every cycle. Once it is
    /// set the motors are stopped and `Error::Cancelled` is returned.
    pub fn run_until_cancelled<H, F>(
        &mut self,
        hw: &mut H,
        cancel: &AtomicBool,
        mut observer: F,
    ) -> Result<()>
    where
        H: Hardware + ?Sized,
        F: FnMut(&Self),
    {
        info!(
            "Exploring from {} facing {:?}",
            self.context.pose.position(),
            self.context.pose.orientation()
        );
        while self.phase != Phase::Done {
            if cancel.load(Ordering::Acquire) {
                warn!("Cancelled at cycle {}, stopping", self.cycle);
                hw.stop()?;
                return Err(Error::Cancelled);
            }
            if let Some(max) = self.config.max_cycles {
                if self.cycle >= max {
                    let _ = hw.stop();
                    return Err(Error::CycleBudgetExhausted(max));
                }
            }
            if let Err(e) = self.step(hw) {
                let _ = hw.stop();
                return Err(e);
            }
            observer(self);
        }
        info!("Done after {} cycles", self.cycle);
        Ok(())
    }

    /// One control cycle of the current phase
    pub fn step<H: Hardware + ?Sized>(&mut self, hw: &mut H) -> Result<Phase> {
        match self.phase {
            Phase::Exploring => {
                if self.exploration_complete() {
                    info!(
                        "All {} cells visited, nest at {}",
                        self.context.map.visited_count(),
                        self.context.nest.map_or("?".to_string(), |n| n.to_string())
                    );
                    victory::perform(hw)?;
                    self.enter(Phase::SeekingNest);
                } else {
                    self.explore_cycle(hw)?;
                }
            }
            Phase::SeekingNest => {
                let snapshot = SensorSnapshot::sample(hw)?;
                if snapshot.light <= self.config.nest_seek_at_or_below {
                    self.enter(Phase::EnteringNest);
                } else {
                    self.follow_cycle(hw, &snapshot)?;
                }
            }
            Phase::EnteringNest => {
                let snapshot = SensorSnapshot::sample(hw)?;
                if snapshot.proximity.front >= self.config.nest_stop_at_or_above {
                    hw.stop()?;
                    self.enter(Phase::Done);
                } else {
                    hw.set_motors(follower::cruise(&self.config))?;
                }
            }
            Phase::Done => {}
        }
        self.cycle += 1;
        Ok(self.phase)
    }

    fn enter(&mut self, phase: Phase) {
        info!("Phase {:?} -> {:?} at cycle {}", self.phase, phase, self.cycle);
        self.phase = phase;
    }

    fn explore_cycle<H: Hardware + ?Sized>(&mut self, hw: &mut H) -> Result<()> {
        let snapshot = SensorSnapshot::sample(hw)?;
        self.record_cell(&snapshot);

        let after = self.follow_cycle(hw, &snapshot)?;

        if after.light < self.config.nest_dark_below && self.context.nest.is_none() {
            let nest = self.context.pose.position();
            info!("Nest found at {} (light {})", nest, after.light);
            self.context.nest = Some(nest);
        }
        Ok(())
    }

    fn record_cell(&mut self, snapshot: &SensorSnapshot) {
        let pose = self.context.pose;
        let openings = RelativeOpenings::from_proximity(&snapshot.proximity, self.config.wall_above);
        if self
            .context
            .map
            .record_if_unvisited(pose.position(), pose.orientation(), openings)
        {
            info!(
                "Mapped cell {} ({}/16): {:?}",
                pose.position(),
                self.context.map.visited_count(),
                self.context.map.cell(pose.position()).sides()
            );
        }
    }

    /// Wall follower, corrector and line detector. `snapshot` is the
    /// reading taken at the start of the cycle; returns the one taken
    /// after the wall follower acted.
    fn follow_cycle<H: Hardware + ?Sized>(
        &mut self,
        hw: &mut H,
        snapshot: &SensorSnapshot,
    ) -> Result<SensorSnapshot> {
        hw.set_motors(follower::cruise(&self.config))?;
        if let Some(turn) = follower::wall_follow(snapshot, &self.context.timer, &self.config) {
            self.execute_turn(hw, turn)?;
        }

        let after = SensorSnapshot::sample(hw)?;
        if let Some(nudge) = follower::straighten(&after, self.context.line.is_on_line(), &self.config)
        {
            hw.turn(nudge)?;
        }

        let event = self
            .context
            .line
            .update(&after, &mut self.context.timer, &self.config);
        if event == Some(LineEvent::Crossed) {
            self.context.pose.advance();
            hw.reset_encoders()?;
            info!("Crossed into {}", self.context.pose.position());
        }
        Ok(after)
    }

    fn execute_turn<H: Hardware + ?Sized>(&mut self, hw: &mut H, turn: FollowerTurn) -> Result<()> {
        hw.turn(turn.request(&self.config))?;

        // The turn has completed; only now does the heading change
        match turn {
            FollowerTurn::GapLeft => {
                self.context.timer.clear();
                hw.reset_encoders()?;
                self.context.pose.turn_left();
            }
            FollowerTurn::EmergencyLeft => {
                self.context.timer.clear();
                self.context.pose.turn_left();
            }
            FollowerTurn::WallRight => self.context.pose.turn_right(),
        }
        info!(
            "{:?} at {}, now facing {}",
            turn,
            self.context.pose.position(),
            self.context.pose.orientation().letter()
        );
        Ok(())
    }
}
