//! Simulated arena shared by every robot
//!
//! Bodies move with differential-drive kinematics, hear distress calls
//! through a directional loudness field and exchange radio packets whose
//! signal strength falls off with distance. Each robot's hardware is a
//! [`SimBody`] handle into the shared [`World`].

use parking_lot::Mutex;
use rand::Rng;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use ::rescue::library::algorithms::{Pose2D, WheelKinematics};
use ::rescue::library::DeviceId;
use ::rescue::prelude::*;
use std::collections::VecDeque;

/// Physical constants of the arena
#[derive(Debug, Clone)]
pub struct WorldParams {
    pub wheel_base: f64,
    /// Wheel surface speed at 100% (m/s)
    pub max_wheel_speed: f64,
    /// Packets beyond this distance (m) are lost
    pub radio_range: f64,
    /// Uniform noise on received signal strength (dB)
    pub signal_noise: f64,
    /// Background loudness everywhere
    pub ambient_loudness: f64,
    /// Loudness of a distress call right next to the caller
    pub call_loudness: f64,
    /// Distance (m) at which a call has lost half its loudness
    pub call_falloff: f64,
    /// How long one distress sound keeps playing (ms)
    pub call_ms: u64,
    pub sound_noise: f64,
    /// A healthy robot this close to a flipped one rights it (m)
    pub rescue_radius: f64,
}

impl Default for WorldParams {
    fn default() -> Self {
        Self {
            wheel_base: 0.1,
            max_wheel_speed: 0.5,
            radio_range: 6.0,
            signal_noise: 2.0,
            ambient_loudness: 15.0,
            call_loudness: 230.0,
            call_falloff: 0.8,
            call_ms: 500,
            sound_noise: 5.0,
            rescue_radius: 0.15,
        }
    }
}

#[derive(Debug)]
struct Body {
    id: DeviceId,
    pose: Pose2D,
    speeds: (i32, i32),
    upright: bool,
    group: Option<u8>,
    inbox: VecDeque<RawPacket>,
    calling_until: u64,
    mode: IndicatorMode,
}

struct WorldState {
    bodies: Vec<Body>,
    rng: ChaCha8Rng,
    last_step_ms: Option<u64>,
}

/// Handle to the shared arena
#[derive(Clone)]
pub struct World {
    state: Arc<Mutex<WorldState>>,
    params: Arc<WorldParams>,
    kinematics: WheelKinematics,
    clock: Arc<dyn Clock>,
}

impl World {
    pub fn new(params: WorldParams, clock: Arc<dyn Clock>, seed: u64) -> Self {
        Self {
            kinematics: WheelKinematics::new(params.wheel_base, params.max_wheel_speed),
            state: Arc::new(Mutex::new(WorldState {
                bodies: Vec::new(),
                rng: ChaCha8Rng::seed_from_u64(seed),
                last_step_ms: None,
            })),
            params: Arc::new(params),
            clock,
        }
    }

    /// Place a new upright robot and return its hardware handle
    pub fn spawn(&self, id: DeviceId, pose: Pose2D) -> SimBody {
        let mut state = self.state.lock();
        state.bodies.push(Body {
            id,
            pose,
            speeds: (0, 0),
            upright: true,
            group: None,
            inbox: VecDeque::new(),
            calling_until: 0,
            mode: IndicatorMode::Calm,
        });
        SimBody {
            world: self.clone(),
            index: state.bodies.len() - 1,
        }
    }

    pub fn now_ms(&self) -> u64 {
        self.clock.now_ms()
    }

    /// Integrate every body's motion up to the current time
    pub fn step(&self) {
        let now = self.clock.now_ms();
        let mut state = self.state.lock();
        let last = state.last_step_ms.replace(now).unwrap_or(now);
        let dt = now.saturating_sub(last) as f64 / 1000.0;
        if dt == 0.0 {
            return;
        }
        for body in state.bodies.iter_mut().filter(|b| b.upright) {
            let (left, right) = body.speeds;
            body.pose = self.kinematics.integrate(body.pose, left, right, dt);
        }
    }

    pub fn set_upright(&self, index: usize, upright: bool) {
        if let Some(body) = self.state.lock().bodies.get_mut(index) {
            body.upright = upright;
            if !upright {
                body.speeds = (0, 0);
            }
        }
    }

    pub fn is_upright(&self, index: usize) -> bool {
        self.state
            .lock()
            .bodies
            .get(index)
            .is_some_and(|b| b.upright)
    }

    pub fn pose(&self, index: usize) -> Option<Pose2D> {
        self.state.lock().bodies.get(index).map(|b| b.pose)
    }

    pub fn mode(&self, index: usize) -> Option<IndicatorMode> {
        self.state.lock().bodies.get(index).map(|b| b.mode)
    }

    /// Id and distance of the closest upright robot to `index`
    pub fn nearest_helper(&self, index: usize) -> Option<(DeviceId, f64)> {
        let state = self.state.lock();
        let victim = state.bodies.get(index)?;
        state
            .bodies
            .iter()
            .enumerate()
            .filter(|(i, b)| *i != index && b.upright)
            .map(|(_, b)| (b.id, b.pose.distance_to(&victim.pose)))
            .min_by(|a, b| a.1.total_cmp(&b.1))
    }

    pub fn rescue_radius(&self) -> f64 {
        self.params.rescue_radius
    }

    fn signal_strength(&self, distance: f64, rng: &mut ChaCha8Rng) -> i32 {
        let path_loss = 25.0 * (distance.max(0.1) / 0.1).log10();
        let noise = rng.gen_range(-self.params.signal_noise..=self.params.signal_noise);
        ((-45.0 - path_loss + noise).round() as i32).clamp(-128, -42)
    }

    fn broadcast(&self, from: usize, payload: &[u8]) {
        let mut state = self.state.lock();
        let WorldState { bodies, rng, .. } = &mut *state;
        let Some(sender) = bodies.get(from) else {
            return;
        };
        let (origin, group) = (sender.pose, sender.group);

        for (index, body) in bodies.iter_mut().enumerate() {
            if index == from || body.group.is_none() || body.group != group {
                continue;
            }
            let distance = body.pose.distance_to(&origin);
            if distance > self.params.radio_range {
                continue;
            }
            let signal_strength = self.signal_strength(distance, rng);
            body.inbox.push_back(RawPacket {
                payload: payload.to_vec(),
                signal_strength,
            });
        }
    }

    /// What the forward-facing microphone of `index` hears right now
    fn loudness_at(&self, index: usize) -> i32 {
        let now = self.clock.now_ms();
        let mut state = self.state.lock();
        let WorldState { bodies, rng, .. } = &mut *state;
        let Some(listener) = bodies.get(index) else {
            return 0;
        };

        let mut loudness = self.params.ambient_loudness;
        for (i, caller) in bodies.iter().enumerate() {
            if i == index || caller.calling_until <= now {
                continue;
            }
            let distance = listener.pose.distance_to(&caller.pose);
            let falloff = 1.0 / (1.0 + (distance / self.params.call_falloff).powi(2));
            // Full gain straight ahead, about a third from behind
            let facing = (1.0 + listener.pose.bearing_to(&caller.pose).cos()) / 2.0;
            loudness += self.params.call_loudness * falloff * (0.35 + 0.65 * facing);
        }
        loudness += rng.gen_range(-self.params.sound_noise..=self.params.sound_noise);
        (loudness.round() as i32).clamp(0, 255)
    }

    fn with_body<R>(&self, index: usize, f: impl FnOnce(&mut Body) -> R) -> Option<R> {
        self.state.lock().bodies.get_mut(index).map(f)
    }
}

/// One robot's hardware in the simulated world
pub struct SimBody {
    world: World,
    index: usize,
}

impl SimBody {
    /// Bundle this body as a robot's [`Hardware`]
    pub fn into_hardware(self) -> Hardware {
        let clock = self.world.clock.clone();
        let body = Arc::new(self);
        Hardware {
            drive: body.clone(),
            sound: body.clone(),
            accelerometer: body.clone(),
            indicator: body.clone(),
            radio: body,
            clock,
        }
    }
}

impl DifferentialDrive for SimBody {
    fn set_speeds(&self, left: i32, right: i32) {
        self.world.with_body(self.index, |body| {
            // Wheels spin in the air while flipped
            if body.upright {
                body.speeds = (left, right);
            }
        });
    }

    fn stop(&self) {
        self.world.with_body(self.index, |body| body.speeds = (0, 0));
    }
}

impl SoundSensor for SimBody {
    fn loudness(&self) -> i32 {
        self.world.loudness_at(self.index)
    }
}

impl Accelerometer for SimBody {
    fn vertical_acceleration(&self) -> i32 {
        if self.world.is_upright(self.index) {
            1000
        } else {
            -1000
        }
    }
}

impl Indicator for SimBody {
    fn set_mode(&self, mode: IndicatorMode) {
        let changed = self
            .world
            .with_body(self.index, |body| {
                let changed = body.mode != mode;
                body.mode = mode;
                changed.then_some(body.id)
            })
            .flatten();
        if let Some(id) = changed {
            tracing::debug!("robot {} shows {:?}", id, mode);
        }
    }

    fn show_frame(&self, _frame: &AnimationFrame) {}

    fn clear_display(&self) {}

    fn play_distress_sound(&self) {
        let until = self.world.now_ms() + self.world.params.call_ms;
        self.world.with_body(self.index, |body| {
            body.calling_until = body.calling_until.max(until);
        });
    }
}

impl RadioTransceiver for SimBody {
    fn configure(&self, group: u8, transmit_power: u8) -> RescueResult<()> {
        tracing::debug!(
            "body {} joins radio group {} at power {}",
            self.index,
            group,
            transmit_power
        );
        self.world
            .with_body(self.index, |body| body.group = Some(group))
            .ok_or_else(|| RescueError::hardware(format!("no body {}", self.index)))
    }

    fn send(&self, payload: &[u8]) -> RescueResult<()> {
        self.world.broadcast(self.index, payload);
        Ok(())
    }

    fn try_recv(&self) -> Option<RawPacket> {
        self.world
            .with_body(self.index, |body| body.inbox.pop_front())
            .flatten()
    }
}
