use std::{fmt::Display, time::Instant};

use anyhow::Context;
use flax::{Schedule, ScheduleBuilder, World};

/// A unit of installable functionality, adding systems to a scheduled layer.
pub trait Plugin<T: TimeStep> {
    fn install(
        &self,
        world: &mut World,
        schedule: &mut ScheduleBuilder,
        time_step: &T,
    ) -> anyhow::Result<()>;
}

impl<T: TimeStep, U> Plugin<T> for Box<U>
where
    U: Plugin<T>,
{
    fn install(
        &self,
        world: &mut World,
        schedule: &mut ScheduleBuilder,
        time_step: &T,
    ) -> Result<(), anyhow::Error> {
        (**self).install(world, schedule, time_step)
    }
}

pub trait TimeStep: 'static + Display {
    fn step(&mut self, world: &mut World, schedule: &mut Schedule) -> anyhow::Result<()>;
}

/// Executes the schedule once for every tick of the application loop.
pub struct PerTick;

impl TimeStep for PerTick {
    fn step(&mut self, world: &mut World, schedule: &mut Schedule) -> anyhow::Result<()> {
        schedule.execute_par(world)
    }
}

impl Display for PerTick {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("PerTick").finish()
    }
}

/// Executes the schedule at a fixed rate independent of the tick rate.
///
/// Systems reading simulation state can rely on a constant delta time.
pub struct FixedTimeStep {
    delta_time: f64,
    current_time: Instant,
    acc: f64,
}

impl FixedTimeStep {
    pub fn new(dt: f64) -> Self {
        Self {
            delta_time: dt,
            current_time: Instant::now(),
            acc: 0.0,
        }
    }

    pub fn delta_time(&self) -> f64 {
        self.delta_time
    }
}

impl TimeStep for FixedTimeStep {
    fn step(&mut self, world: &mut World, schedule: &mut Schedule) -> anyhow::Result<()> {
        let now = Instant::now();

        let elapsed = now.duration_since(self.current_time);
        self.current_time = now;

        self.acc += elapsed.as_secs_f64();

        while self.acc > self.delta_time {
            schedule.execute_seq(world)?;
            self.acc -= self.delta_time;
        }

        Ok(())
    }
}

impl Display for FixedTimeStep {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("FixedTimeStep")
            .field(&self.delta_time)
            .finish()
    }
}

/// Executes a schedule using the provided time step
pub struct ScheduledLayer<T> {
    time_step: T,
    schedule: Option<Schedule>,
    plugins: Vec<Box<dyn Plugin<T>>>,
}

impl<T: TimeStep> ScheduledLayer<T> {
    pub fn new(time_step: T) -> Self {
        Self {
            schedule: None,
            time_step,
            plugins: Vec::new(),
        }
    }

    pub fn with_plugin(mut self, plugin: impl 'static + Plugin<T>) -> Self {
        self.plugins.push(Box::new(plugin));
        self
    }

    /// Installs all plugins and builds the schedule.
    ///
    /// Must be called once before [`Self::tick`].
    pub fn register(&mut self, world: &mut World) -> anyhow::Result<()> {
        assert!(self.schedule.is_none());

        let mut schedule = Schedule::builder();
        for plugin in &self.plugins {
            plugin.install(world, &mut schedule, &self.time_step)?;
        }

        tracing::debug!(
            time_step = %self.time_step,
            plugins = self.plugins.len(),
            "registered scheduled layer"
        );

        self.schedule = Some(schedule.build());
        Ok(())
    }

    pub fn tick(&mut self, world: &mut World) -> anyhow::Result<()> {
        let Some(schedule) = &mut self.schedule else {
            return Ok(());
        };

        self.time_step
            .step(world, schedule)
            .with_context(|| format!("Failed to execute schedule {}", self.time_step))?;

        Ok(())
    }
}
