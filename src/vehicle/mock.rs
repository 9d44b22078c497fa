//! Recording driver used by the controller and relay tests

pub use super::driver::{Direction, FlipDirection, Rotation};

use super::driver::VehicleDriver;
use anyhow::{anyhow, Result};
use async_trait::async_trait;
use std::sync::{Arc, Mutex};
use tokio::sync::{watch, Notify, Semaphore};

/// A driver operation as observed by the test double
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DriverCall {
    Connect,
    TakeOff,
    Land,
    Travel(Direction, u32),
    Rotate(Rotation, u32),
    Hover,
    Flip(FlipDirection),
}

pub struct RecordingDriver {
    calls: Mutex<Vec<DriverCall>>,
    count_tx: watch::Sender<usize>,
    /// When set, `connect` waits for `release_connect`
    connect_gate: Option<Notify>,
    /// When set, motion calls wait for a permit
    motion_gate: Option<Semaphore>,
    /// Motion calls and landing fail
    fail: bool,
}

impl RecordingDriver {
    fn build(gated: bool, holding: bool, fail: bool) -> Arc<Self> {
        let (count_tx, _) = watch::channel(0);
        Arc::new(Self {
            calls: Mutex::new(Vec::new()),
            count_tx,
            connect_gate: gated.then(Notify::new),
            motion_gate: holding.then(|| Semaphore::new(0)),
            fail,
        })
    }

    /// Connects immediately, every call succeeds
    pub fn connected() -> Arc<Self> {
        Self::build(false, false, false)
    }

    /// Connection completes only after `release_connect`
    pub fn gated() -> Arc<Self> {
        Self::build(true, false, false)
    }

    /// Motion calls block until `release_motion`
    pub fn holding() -> Arc<Self> {
        Self::build(false, true, false)
    }

    /// Motion calls and landing are rejected
    pub fn failing() -> Arc<Self> {
        Self::build(false, false, true)
    }

    pub fn release_connect(&self) {
        if let Some(gate) = &self.connect_gate {
            gate.notify_one();
        }
    }

    pub fn release_motion(&self, permits: usize) {
        if let Some(gate) = &self.motion_gate {
            gate.add_permits(permits);
        }
    }

    /// Snapshot of every call so far
    pub fn calls(&self) -> Vec<DriverCall> {
        self.calls.lock().unwrap().clone()
    }

    /// Wait until at least `count` calls were recorded
    pub async fn wait_for_calls(&self, count: usize) -> Vec<DriverCall> {
        let mut count_rx = self.count_tx.subscribe();
        count_rx.wait_for(|n| *n >= count).await.unwrap();
        self.calls()
    }

    fn record(&self, call: DriverCall) {
        let mut calls = self.calls.lock().unwrap();
        calls.push(call);
        self.count_tx.send_replace(calls.len());
    }

    async fn motion(&self, call: DriverCall) -> Result<()> {
        self.record(call);
        if let Some(gate) = &self.motion_gate {
            gate.acquire().await?.forget();
        }
        if self.fail {
            return Err(anyhow!("rejected by test driver"));
        }
        Ok(())
    }
}

#[async_trait]
impl VehicleDriver for RecordingDriver {
    async fn connect(&self) -> Result<()> {
        if let Some(gate) = &self.connect_gate {
            gate.notified().await;
        }
        self.record(DriverCall::Connect);
        Ok(())
    }

    async fn take_off(&self) -> Result<()> {
        self.record(DriverCall::TakeOff);
        Ok(())
    }

    async fn land(&self) -> Result<()> {
        self.record(DriverCall::Land);
        if self.fail {
            return Err(anyhow!("landing rejected by test driver"));
        }
        Ok(())
    }

    async fn travel(&self, direction: Direction, distance_cm: u32) -> Result<()> {
        self.motion(DriverCall::Travel(direction, distance_cm)).await
    }

    async fn rotate(&self, rotation: Rotation, degrees: u32) -> Result<()> {
        self.motion(DriverCall::Rotate(rotation, degrees)).await
    }

    async fn hover(&self) -> Result<()> {
        self.motion(DriverCall::Hover).await
    }

    async fn flip(&self, direction: FlipDirection) -> Result<()> {
        self.motion(DriverCall::Flip(direction)).await
    }

    fn name(&self) -> &'static str {
        "Recording"
    }
}
