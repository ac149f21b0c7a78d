// Shared mock hardware for the rescue integration tests
#![allow(dead_code)]

use parking_lot::Mutex;
use rescue_core::hal::{
    Accelerometer, AnimationFrame, DifferentialDrive, Hardware, Indicator, IndicatorMode,
    ManualTrigger, RadioTransceiver, RawPacket, SimClock, SoundSensor, TriggerCallback,
};
use rescue_core::RescueResult;
use rescue_library::{DeviceId, MessageKind, RadioMessage};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicI32, Ordering};
use std::sync::Arc;

type StopHook = Box<dyn FnMut() + Send>;

#[derive(Default)]
pub struct MockDrive {
    commands: Mutex<Vec<(i32, i32)>>,
    on_stop: Mutex<Option<StopHook>>,
}

impl MockDrive {
    /// Run `hook` after every `stop()`; stops issued by the hook itself do not
    /// re-enter it
    pub fn on_stop(&self, hook: impl FnMut() + Send + 'static) {
        *self.on_stop.lock() = Some(Box::new(hook));
    }

    /// Last commanded speeds; (0, 0) when stopped or never driven
    pub fn current(&self) -> (i32, i32) {
        self.commands.lock().last().copied().unwrap_or((0, 0))
    }

    pub fn commands(&self) -> Vec<(i32, i32)> {
        self.commands.lock().clone()
    }
}

impl DifferentialDrive for MockDrive {
    fn set_speeds(&self, left: i32, right: i32) {
        self.commands.lock().push((left, right));
    }

    fn stop(&self) {
        self.commands.lock().push((0, 0));
        let hook = self.on_stop.lock().take();
        if let Some(mut hook) = hook {
            hook();
            let mut slot = self.on_stop.lock();
            if slot.is_none() {
                *slot = Some(hook);
            }
        }
    }
}

type LoudnessFn = Box<dyn Fn() -> i32 + Send + Sync>;

/// Constant loudness unless a script is installed
pub struct MockSound {
    level: AtomicI32,
    script: Mutex<Option<LoudnessFn>>,
}

impl MockSound {
    pub fn new(level: i32) -> Self {
        Self {
            level: AtomicI32::new(level),
            script: Mutex::new(None),
        }
    }

    pub fn set(&self, level: i32) {
        self.level.store(level, Ordering::SeqCst);
    }

    pub fn script(&self, f: impl Fn() -> i32 + Send + Sync + 'static) {
        *self.script.lock() = Some(Box::new(f));
    }
}

impl SoundSensor for MockSound {
    fn loudness(&self) -> i32 {
        match self.script.lock().as_ref() {
            Some(f) => f(),
            None => self.level.load(Ordering::SeqCst),
        }
    }
}

pub struct MockAccelerometer {
    value: AtomicI32,
}

impl MockAccelerometer {
    pub fn upright() -> Self {
        Self {
            value: AtomicI32::new(1000),
        }
    }

    pub fn set(&self, milli_g: i32) {
        self.value.store(milli_g, Ordering::SeqCst);
    }
}

impl Accelerometer for MockAccelerometer {
    fn vertical_acceleration(&self) -> i32 {
        self.value.load(Ordering::SeqCst)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Shown {
    Mode(IndicatorMode),
    Frame(AnimationFrame),
    Clear,
    Sound,
}

#[derive(Default)]
pub struct MockIndicator {
    shown: Mutex<Vec<Shown>>,
}

impl MockIndicator {
    pub fn mode(&self) -> Option<IndicatorMode> {
        self.shown.lock().iter().rev().find_map(|s| match s {
            Shown::Mode(mode) => Some(*mode),
            _ => None,
        })
    }

    pub fn sounds(&self) -> usize {
        self.shown
            .lock()
            .iter()
            .filter(|s| matches!(s, Shown::Sound))
            .count()
    }

    pub fn shown(&self) -> Vec<Shown> {
        self.shown.lock().clone()
    }
}

impl Indicator for MockIndicator {
    fn set_mode(&self, mode: IndicatorMode) {
        self.shown.lock().push(Shown::Mode(mode));
    }

    fn show_frame(&self, frame: &AnimationFrame) {
        self.shown.lock().push(Shown::Frame(*frame));
    }

    fn clear_display(&self) {
        self.shown.lock().push(Shown::Clear);
    }

    fn play_distress_sound(&self) {
        self.shown.lock().push(Shown::Sound);
    }
}

/// Records broadcasts and serves an inbox of received packets
#[derive(Default)]
pub struct MockRadio {
    configured: Mutex<Option<(u8, u8)>>,
    sent: Mutex<Vec<Vec<u8>>>,
    inbox: Mutex<VecDeque<RawPacket>>,
}

impl MockRadio {
    pub fn configured(&self) -> Option<(u8, u8)> {
        *self.configured.lock()
    }

    pub fn deliver(&self, message: RadioMessage, signal_strength: i32) {
        let payload = message.encode().unwrap();
        self.deliver_raw(payload, signal_strength);
    }

    pub fn deliver_raw(&self, payload: Vec<u8>, signal_strength: i32) {
        self.inbox.lock().push_back(RawPacket {
            payload,
            signal_strength,
        });
    }

    pub fn sent(&self) -> Vec<RadioMessage> {
        self.sent
            .lock()
            .iter()
            .map(|bytes| RadioMessage::decode(bytes).unwrap())
            .collect()
    }

    pub fn sent_count(&self, kind: MessageKind) -> usize {
        self.sent().iter().filter(|m| m.kind == kind).count()
    }
}

impl RadioTransceiver for MockRadio {
    fn configure(&self, group: u8, transmit_power: u8) -> RescueResult<()> {
        *self.configured.lock() = Some((group, transmit_power));
        Ok(())
    }

    fn send(&self, payload: &[u8]) -> RescueResult<()> {
        self.sent.lock().push(payload.to_vec());
        Ok(())
    }

    fn try_recv(&self) -> Option<RawPacket> {
        self.inbox.lock().pop_front()
    }
}

#[derive(Default)]
pub struct MockTrigger {
    callbacks: Mutex<Vec<TriggerCallback>>,
}

impl MockTrigger {
    pub fn fire(&self) {
        for callback in self.callbacks.lock().iter() {
            callback();
        }
    }
}

impl ManualTrigger for MockTrigger {
    fn on_trigger(&self, callback: TriggerCallback) {
        self.callbacks.lock().push(callback);
    }
}

/// One robot's worth of mocks on a virtual clock
pub struct TestRig {
    pub clock: Arc<SimClock>,
    pub drive: Arc<MockDrive>,
    pub sound: Arc<MockSound>,
    pub accelerometer: Arc<MockAccelerometer>,
    pub indicator: Arc<MockIndicator>,
    pub radio: Arc<MockRadio>,
}

impl TestRig {
    /// Upright robot hearing constant `loudness`
    pub fn new(loudness: i32) -> Self {
        Self {
            clock: Arc::new(SimClock::new()),
            drive: Arc::new(MockDrive::default()),
            sound: Arc::new(MockSound::new(loudness)),
            accelerometer: Arc::new(MockAccelerometer::upright()),
            indicator: Arc::new(MockIndicator::default()),
            radio: Arc::new(MockRadio::default()),
        }
    }

    pub fn hardware(&self) -> Hardware {
        Hardware {
            drive: self.drive.clone(),
            sound: self.sound.clone(),
            accelerometer: self.accelerometer.clone(),
            indicator: self.indicator.clone(),
            radio: self.radio.clone(),
            clock: self.clock.clone(),
        }
    }

    pub fn now(&self) -> u64 {
        use rescue_core::hal::Clock;
        self.clock.now_ms()
    }
}

pub fn alert(from: u32) -> RadioMessage {
    RadioMessage::alert(DeviceId(from))
}

pub fn beacon(from: u32) -> RadioMessage {
    RadioMessage::beacon(DeviceId(from))
}

pub fn done(from: u32) -> RadioMessage {
    RadioMessage::done(DeviceId(from))
}
