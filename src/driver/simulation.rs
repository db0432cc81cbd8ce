use std::fmt::Debug;
use std::future::Future;
use std::time::Duration;

use serde::Serialize;
use tokio::time::Instant;
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::errors::DriverError;
use crate::config::{DriverConfig, ResetAction};
use crate::control::Controller;
use crate::env::{CartPole, Env, EnvError, EpisodeSummary, Space, TimeLimit};

/// Builds the step-limited cart-pole described by `cfg`.
pub fn build_env(cfg: &DriverConfig) -> Result<TimeLimit<CartPole>, EnvError> {
    let mut env = CartPole::new(cfg.cartpole.clone(), cfg.render_mode)?;
    if let Some(seed) = cfg.seed {
        env.seed(seed);
    }
    Ok(TimeLimit::new(env, cfg.max_episode_steps))
}

/// What a single loop iteration did.
#[derive(Debug, Clone, PartialEq)]
pub enum Tick {
    /// The episode goes on; the controller chose the next action.
    Continued { reward: f64 },
    /// The episode ended and the environment was reset.
    EpisodeEnded(EpisodeSummary),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StopReason {
    Cancelled,
    MaxSteps,
    MaxEpisodes,
}

#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub stop_reason: StopReason,
    pub total_steps: u64,
    pub episodes: u64,
    pub mean_episode_reward: Option<f64>,
    pub last_episode: Option<EpisodeSummary>,
    pub elapsed: Duration,
}

struct Running<O, A> {
    obs: O,
    action: A,
    obs_dim: usize,
}

struct EpisodeTracker {
    id: Uuid,
    index: u64,
    steps: u64,
    reward: f64,
}

impl EpisodeTracker {
    fn new(index: u64) -> Self {
        Self {
            id: Uuid::new_v4(),
            index,
            steps: 0,
            reward: 0.0,
        }
    }

    fn record(&mut self, reward: f64) {
        self.steps += 1;
        self.reward += reward;
    }

    fn finish(&self, terminated: bool, truncated: bool) -> EpisodeSummary {
        EpisodeSummary {
            id: self.id,
            index: self.index,
            steps: self.steps,
            total_reward: self.reward,
            terminated,
            truncated,
        }
    }
}

/// Runs the control loop between one environment and one controller.
///
/// The first action comes from the environment's action space. After every
/// step the driver either resets the environment (episode over) or asks the
/// controller for the next action. By default the action in effect when an
/// episode ends is also the first action of the next episode; set
/// [`ResetAction::Resample`] to draw a fresh one instead.
pub struct Driver<E: Env, C> {
    env: E,
    controller: C,
    reset_action: ResetAction,
    max_steps: Option<u64>,
    max_episodes: Option<u64>,
    running: Option<Running<E::Obs, E::Act>>,
    episode: EpisodeTracker,
    total_steps: u64,
    episodes_done: u64,
    finished_reward: f64,
    last_episode: Option<EpisodeSummary>,
}

impl<E, C> Driver<E, C>
where
    E: Env,
    E::Obs: AsRef<[f64]>,
    E::Act: TryFrom<i64> + Debug,
    C: Controller,
{
    pub fn new(env: E, controller: C) -> Self {
        Self {
            env,
            controller,
            reset_action: ResetAction::default(),
            max_steps: None,
            max_episodes: None,
            running: None,
            episode: EpisodeTracker::new(0),
            total_steps: 0,
            episodes_done: 0,
            finished_reward: 0.0,
            last_episode: None,
        }
    }

    pub fn with_config(env: E, controller: C, cfg: &DriverConfig) -> Self {
        let mut driver = Self::new(env, controller);
        driver.reset_action = cfg.reset_action;
        driver.max_steps = cfg.max_steps;
        driver.max_episodes = cfg.max_episodes;
        driver
    }

    /// Resets the environment and samples the first action.
    pub fn start(&mut self) -> Result<(), DriverError> {
        let (obs, _info) = self.env.reset()?;
        let obs_dim = obs.as_ref().len();
        let action = self.env.action_space_mut().sample();

        self.episode = EpisodeTracker::new(self.episodes_done);
        info!(episode = %self.episode.id, ?action, obs_dim, "driver started");

        self.running = Some(Running {
            obs,
            action,
            obs_dim,
        });
        Ok(())
    }

    /// Applies the current action and prepares the next one.
    pub fn tick(&mut self) -> Result<Tick, DriverError> {
        let running = self.running.as_mut().ok_or(DriverError::NotStarted)?;

        let step = self.env.step(running.action.clone())?;
        self.total_steps += 1;
        self.episode.record(step.reward);
        debug!(
            step = self.total_steps,
            action = ?running.action,
            reward = step.reward,
            terminated = step.terminated,
            truncated = step.truncated,
            "tick"
        );

        if step.is_done() {
            let summary = self.episode.finish(step.terminated, step.truncated);

            let (obs, _info) = self.env.reset()?;
            running.obs = obs;
            if self.reset_action == ResetAction::Resample {
                running.action = self.env.action_space_mut().sample();
            }

            info!(
                episode = %summary.id,
                index = summary.index,
                steps = summary.steps,
                reward = summary.total_reward,
                terminated = summary.terminated,
                truncated = summary.truncated,
                "episode finished"
            );

            self.episodes_done += 1;
            self.finished_reward += summary.total_reward;
            self.last_episode = Some(summary.clone());
            self.episode = EpisodeTracker::new(self.episodes_done);
            return Ok(Tick::EpisodeEnded(summary));
        }

        running.obs = step.obs;
        let obs = running.obs.as_ref();
        if obs.len() != running.obs_dim {
            return Err(DriverError::ObservationShape {
                expected: running.obs_dim,
                actual: obs.len(),
            });
        }

        let raw = self.controller.get_action(obs)?;
        running.action = E::Act::try_from(raw).map_err(|_| DriverError::InvalidAction(raw))?;

        Ok(Tick::Continued {
            reward: step.reward,
        })
    }

    /// Runs until `shutdown` resolves or a configured limit is reached, then
    /// closes the environment.
    ///
    /// Cancellation is only observed between ticks.
    pub async fn run<F>(&mut self, shutdown: F) -> Result<RunSummary, DriverError>
    where
        F: Future<Output = ()>,
    {
        if self.running.is_none() {
            self.start()?;
        }

        let frame = self
            .env
            .render_fps()
            .filter(|fps| *fps > 0)
            .map(|fps| Duration::from_secs_f64(1.0 / f64::from(fps)));
        let started = Instant::now();
        tokio::pin!(shutdown);

        let stop_reason = loop {
            if let Some(reason) = self.limit_reached() {
                break reason;
            }
            tokio::select! {
                biased;
                _ = &mut shutdown => break StopReason::Cancelled,
                result = self.paced_tick(frame) => {
                    if let Err(err) = result {
                        if let Err(close_err) = self.env.close() {
                            warn!(error = %close_err, "close after failed tick also failed");
                        }
                        return Err(err);
                    }
                }
            }
        };

        self.env.close()?;
        let summary = self.summary(stop_reason, started.elapsed());
        info!(
            reason = ?summary.stop_reason,
            steps = summary.total_steps,
            episodes = summary.episodes,
            "driver stopped"
        );
        Ok(summary)
    }

    async fn paced_tick(&mut self, frame: Option<Duration>) -> Result<(), DriverError> {
        self.tick()?;
        match frame {
            Some(frame) => tokio::time::sleep(frame).await,
            None => tokio::task::yield_now().await,
        }
        Ok(())
    }

    fn limit_reached(&self) -> Option<StopReason> {
        if self.max_steps.is_some_and(|max| self.total_steps >= max) {
            return Some(StopReason::MaxSteps);
        }
        if self.max_episodes.is_some_and(|max| self.episodes_done >= max) {
            return Some(StopReason::MaxEpisodes);
        }
        None
    }

    fn summary(&self, stop_reason: StopReason, elapsed: Duration) -> RunSummary {
        RunSummary {
            stop_reason,
            total_steps: self.total_steps,
            episodes: self.episodes_done,
            mean_episode_reward: (self.episodes_done > 0)
                .then(|| self.finished_reward / self.episodes_done as f64),
            last_episode: self.last_episode.clone(),
            elapsed,
        }
    }

    /// Observation the next controller call (or the carried action) follows.
    pub fn observation(&self) -> Option<&E::Obs> {
        self.running.as_ref().map(|r| &r.obs)
    }

    /// Action the next tick will apply.
    pub fn action(&self) -> Option<&E::Act> {
        self.running.as_ref().map(|r| &r.action)
    }

    pub fn total_steps(&self) -> u64 {
        self.total_steps
    }

    pub fn episodes(&self) -> u64 {
        self.episodes_done
    }

    pub fn env(&self) -> &E {
        &self.env
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use super::*;
    use crate::control::{ControlError, PoleVelocityController};
    use crate::env::Step;

    #[derive(Debug, Clone, PartialEq)]
    enum Event {
        Reset,
        Sample(usize),
        Step(usize),
        Control(Vec<f64>),
        Close,
    }

    type Log = Arc<Mutex<Vec<Event>>>;

    fn events(log: &Log) -> Vec<Event> {
        log.lock().unwrap().clone()
    }

    struct ScriptedSpace {
        value: usize,
        log: Log,
    }

    impl Space<usize> for ScriptedSpace {
        fn sample(&mut self) -> usize {
            self.log.lock().unwrap().push(Event::Sample(self.value));
            self.value
        }

        fn contains(&self, value: &usize) -> bool {
            *value < 2
        }

        fn seed(&mut self, _seed: u64) {}
    }

    /// Reset `k` yields `[100 * k, 0, 0, 0]`; step `n` yields `[n, 0, 0, 0]`
    /// unless `step_obs` overrides it.
    struct ScriptedEnv {
        log: Log,
        space: ScriptedSpace,
        resets: usize,
        steps: usize,
        terminate_at: Vec<usize>,
        truncate_at: Vec<usize>,
        step_obs: Option<Vec<f64>>,
        fail_at: Option<usize>,
        fps: Option<u32>,
    }

    impl ScriptedEnv {
        fn new(log: &Log, sampled: usize) -> Self {
            Self {
                log: log.clone(),
                space: ScriptedSpace {
                    value: sampled,
                    log: log.clone(),
                },
                resets: 0,
                steps: 0,
                terminate_at: Vec::new(),
                truncate_at: Vec::new(),
                step_obs: None,
                fail_at: None,
                fps: None,
            }
        }
    }

    impl Env for ScriptedEnv {
        type Obs = Vec<f64>;
        type Act = usize;
        type Info = ();
        type ActSpace = ScriptedSpace;

        fn reset(&mut self) -> Result<(Self::Obs, Self::Info), EnvError> {
            self.resets += 1;
            self.log.lock().unwrap().push(Event::Reset);
            Ok((vec![100.0 * self.resets as f64, 0.0, 0.0, 0.0], ()))
        }

        fn step(&mut self, act: Self::Act) -> Result<Step<Self::Obs, Self::Info>, EnvError> {
            self.steps += 1;
            self.log.lock().unwrap().push(Event::Step(act));
            if self.fail_at == Some(self.steps) {
                return Err(EnvError::Other("scripted failure".into()));
            }
            let obs = self
                .step_obs
                .clone()
                .unwrap_or_else(|| vec![self.steps as f64, 0.0, 0.0, 0.0]);
            Ok(Step {
                obs,
                reward: 1.0,
                terminated: self.terminate_at.contains(&self.steps),
                truncated: self.truncate_at.contains(&self.steps),
                info: (),
            })
        }

        fn action_space(&self) -> &Self::ActSpace {
            &self.space
        }

        fn action_space_mut(&mut self) -> &mut Self::ActSpace {
            &mut self.space
        }

        fn render(&mut self) -> Result<Option<String>, EnvError> {
            Ok(None)
        }

        fn render_fps(&self) -> Option<u32> {
            self.fps
        }

        fn close(&mut self) -> Result<(), EnvError> {
            self.log.lock().unwrap().push(Event::Close);
            Ok(())
        }
    }

    struct Recorder {
        log: Log,
        action: i64,
    }

    impl Recorder {
        fn new(log: &Log, action: i64) -> Self {
            Self {
                log: log.clone(),
                action,
            }
        }
    }

    impl Controller for Recorder {
        fn get_action(&self, obs: &[f64]) -> Result<i64, ControlError> {
            self.log.lock().unwrap().push(Event::Control(obs.to_vec()));
            Ok(self.action)
        }
    }

    #[test]
    fn test_first_action_comes_from_sampler() {
        let log = Log::default();
        let mut driver = Driver::new(ScriptedEnv::new(&log, 1), Recorder::new(&log, 0));

        driver.start().unwrap();
        assert_eq!(events(&log), vec![Event::Reset, Event::Sample(1)]);
        assert_eq!(driver.action(), Some(&1));

        driver.tick().unwrap();
        driver.tick().unwrap();
        assert_eq!(
            events(&log),
            vec![
                Event::Reset,
                Event::Sample(1),
                Event::Step(1),
                Event::Control(vec![1.0, 0.0, 0.0, 0.0]),
                Event::Step(0),
                Event::Control(vec![2.0, 0.0, 0.0, 0.0]),
            ]
        );
    }

    #[test]
    fn test_termination_resets_without_consulting_controller() {
        let log = Log::default();
        let mut env = ScriptedEnv::new(&log, 1);
        env.terminate_at = vec![2];
        let mut driver = Driver::new(env, Recorder::new(&log, 0));

        driver.start().unwrap();
        assert!(matches!(driver.tick().unwrap(), Tick::Continued { .. }));
        let Tick::EpisodeEnded(summary) = driver.tick().unwrap() else {
            panic!("expected episode end");
        };
        assert!(summary.terminated);
        assert!(!summary.truncated);
        assert_eq!(summary.steps, 2);
        assert_eq!(summary.total_reward, 2.0);
        assert_eq!(summary.index, 0);

        // The observation now in effect is the one from the second reset.
        assert_eq!(driver.observation(), Some(&vec![200.0, 0.0, 0.0, 0.0]));

        driver.tick().unwrap();
        assert_eq!(
            events(&log),
            vec![
                Event::Reset,
                Event::Sample(1),
                Event::Step(1),
                Event::Control(vec![1.0, 0.0, 0.0, 0.0]),
                Event::Step(0),
                Event::Reset,
                // Carried over from before the reset.
                Event::Step(0),
                Event::Control(vec![3.0, 0.0, 0.0, 0.0]),
            ]
        );
        assert_eq!(driver.episodes(), 1);
        assert_eq!(driver.total_steps(), 3);
    }

    #[test]
    fn test_truncation_also_ends_episode() {
        let log = Log::default();
        let mut env = ScriptedEnv::new(&log, 0);
        env.truncate_at = vec![1];
        let mut driver = Driver::new(env, Recorder::new(&log, 1));

        driver.start().unwrap();
        let Tick::EpisodeEnded(summary) = driver.tick().unwrap() else {
            panic!("expected episode end");
        };
        assert!(summary.truncated);
        assert!(!summary.terminated);
        assert!(!events(&log).iter().any(|e| matches!(e, Event::Control(_))));
    }

    #[test]
    fn test_resample_policy_draws_after_reset() {
        let log = Log::default();
        let mut env = ScriptedEnv::new(&log, 1);
        env.terminate_at = vec![1];
        let cfg = DriverConfig {
            reset_action: ResetAction::Resample,
            ..DriverConfig::default()
        };
        let mut driver = Driver::with_config(env, Recorder::new(&log, 0), &cfg);

        driver.start().unwrap();
        driver.tick().unwrap();
        assert_eq!(
            events(&log),
            vec![
                Event::Reset,
                Event::Sample(1),
                Event::Step(1),
                Event::Reset,
                Event::Sample(1),
            ]
        );
    }

    #[test]
    fn test_upright_observation_action_is_applied_unchanged() {
        let log = Log::default();
        let mut env = ScriptedEnv::new(&log, 1);
        env.step_obs = Some(vec![0.0; 4]);
        let mut driver = Driver::new(env, PoleVelocityController);

        driver.start().unwrap();
        driver.tick().unwrap();
        assert_eq!(driver.action(), Some(&0));
        driver.tick().unwrap();

        assert_eq!(
            events(&log),
            vec![Event::Reset, Event::Sample(1), Event::Step(1), Event::Step(0)]
        );
    }

    #[test]
    fn test_out_of_range_controller_output_is_rejected() {
        let log = Log::default();
        let mut driver = Driver::new(ScriptedEnv::new(&log, 0), Recorder::new(&log, -1));

        driver.start().unwrap();
        assert!(matches!(
            driver.tick(),
            Err(DriverError::InvalidAction(-1))
        ));
    }

    #[test]
    fn test_misshapen_observation_never_reaches_controller() {
        let log = Log::default();
        let mut env = ScriptedEnv::new(&log, 0);
        env.step_obs = Some(vec![0.0; 3]);
        let mut driver = Driver::new(env, Recorder::new(&log, 0));

        driver.start().unwrap();
        assert!(matches!(
            driver.tick(),
            Err(DriverError::ObservationShape {
                expected: 4,
                actual: 3
            })
        ));
        assert!(!events(&log).iter().any(|e| matches!(e, Event::Control(_))));
    }

    #[test]
    fn test_tick_before_start_fails() {
        let log = Log::default();
        let mut driver = Driver::new(ScriptedEnv::new(&log, 0), Recorder::new(&log, 0));
        assert!(matches!(driver.tick(), Err(DriverError::NotStarted)));
        assert!(events(&log).is_empty());
    }

    #[test]
    fn test_env_and_controller_errors_propagate() {
        let log = Log::default();
        let mut env = ScriptedEnv::new(&log, 0);
        env.fail_at = Some(1);
        let mut driver = Driver::new(env, Recorder::new(&log, 0));
        driver.start().unwrap();
        assert!(matches!(
            driver.tick(),
            Err(DriverError::Env(EnvError::Other(_)))
        ));

        let failing = |_: &[f64]| -> Result<i64, ControlError> {
            Err(ControlError::Other("policy unavailable".into()))
        };
        let mut driver = Driver::new(ScriptedEnv::new(&log, 0), failing);
        driver.start().unwrap();
        assert!(matches!(
            driver.tick(),
            Err(DriverError::Control(ControlError::Other(_)))
        ));
    }

    #[tokio::test]
    async fn test_run_stops_at_max_steps_and_closes_env() {
        let log = Log::default();
        let cfg = DriverConfig {
            max_steps: Some(5),
            ..DriverConfig::default()
        };
        let mut driver = Driver::with_config(ScriptedEnv::new(&log, 0), Recorder::new(&log, 1), &cfg);

        let summary = driver.run(std::future::pending()).await.unwrap();
        assert_eq!(summary.stop_reason, StopReason::MaxSteps);
        assert_eq!(summary.total_steps, 5);
        assert_eq!(summary.episodes, 0);
        assert_eq!(summary.mean_episode_reward, None);
        assert_eq!(events(&log).last(), Some(&Event::Close));
    }

    #[tokio::test]
    async fn test_run_stops_at_max_episodes() {
        let log = Log::default();
        let mut env = ScriptedEnv::new(&log, 0);
        env.terminate_at = vec![3, 5];
        let cfg = DriverConfig {
            max_episodes: Some(2),
            ..DriverConfig::default()
        };
        let mut driver = Driver::with_config(env, Recorder::new(&log, 1), &cfg);

        let summary = driver.run(std::future::pending()).await.unwrap();
        assert_eq!(summary.stop_reason, StopReason::MaxEpisodes);
        assert_eq!(summary.total_steps, 5);
        assert_eq!(summary.episodes, 2);
        assert_eq!(summary.mean_episode_reward, Some(2.5));
        assert_eq!(summary.last_episode.map(|e| e.index), Some(1));
    }

    #[tokio::test]
    async fn test_resolved_shutdown_stops_before_first_step() {
        let log = Log::default();
        let mut driver = Driver::new(ScriptedEnv::new(&log, 0), Recorder::new(&log, 1));

        let summary = driver.run(std::future::ready(())).await.unwrap();
        assert_eq!(summary.stop_reason, StopReason::Cancelled);
        assert_eq!(summary.total_steps, 0);
        assert_eq!(
            events(&log),
            vec![Event::Reset, Event::Sample(0), Event::Close]
        );
    }

    #[tokio::test]
    async fn test_run_until_cancelled() {
        let log = Log::default();
        let mut driver = Driver::new(ScriptedEnv::new(&log, 0), Recorder::new(&log, 1));

        let shutdown = tokio::time::sleep(Duration::from_millis(20));
        let summary = driver.run(shutdown).await.unwrap();
        assert_eq!(summary.stop_reason, StopReason::Cancelled);
        assert!(summary.total_steps > 0);
    }

    #[tokio::test]
    async fn test_run_surfaces_errors() {
        let log = Log::default();
        let mut env = ScriptedEnv::new(&log, 0);
        env.fail_at = Some(2);
        let mut driver = Driver::new(env, Recorder::new(&log, 1));

        let result = driver.run(std::future::pending()).await;
        assert!(matches!(result, Err(DriverError::Env(_))));
        assert_eq!(driver.total_steps(), 1);
        assert_eq!(
            events(&log)[2..],
            [
                Event::Step(0),
                Event::Control(vec![1.0, 0.0, 0.0, 0.0]),
                Event::Step(1),
                Event::Close,
            ]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_render_fps_paces_each_tick() {
        let log = Log::default();
        let mut env = ScriptedEnv::new(&log, 0);
        env.fps = Some(50);
        let cfg = DriverConfig {
            max_steps: Some(5),
            ..DriverConfig::default()
        };
        let mut driver = Driver::with_config(env, Recorder::new(&log, 1), &cfg);

        let started = Instant::now();
        let summary = driver.run(std::future::pending()).await.unwrap();
        let elapsed = started.elapsed();

        assert_eq!(summary.total_steps, 5);
        // One 20 ms frame per tick on the paused clock.
        assert!(elapsed >= Duration::from_millis(100), "{elapsed:?}");
        assert!(elapsed < Duration::from_millis(120), "{elapsed:?}");
        assert_eq!(summary.elapsed, elapsed);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_lands_between_paced_ticks() {
        let log = Log::default();
        let mut env = ScriptedEnv::new(&log, 0);
        env.fps = Some(50);
        let mut driver = Driver::new(env, Recorder::new(&log, 1));

        let shutdown = tokio::time::sleep(Duration::from_millis(50));
        let summary = driver.run(shutdown).await.unwrap();
        assert_eq!(summary.stop_reason, StopReason::Cancelled);
        assert_eq!(summary.total_steps, 3);
    }
}
