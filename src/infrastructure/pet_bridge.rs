use serde::Serialize;
use std::sync::Mutex;

pub const KNOWN_PETS: [&str; 7] = ["duck", "matan", "dragon", "cat", "snake", "wolf", "cow"];
pub const DEFAULT_PET: &str = "duck";
pub const DEFAULT_PET_SIZE: u32 = 48;
pub const DEFAULT_JUMP_POWER: f64 = 12.0;

pub fn is_known_pet(name: &str) -> bool {
    KNOWN_PETS.contains(&name)
}

/// Outbound calls to the desktop pet. Calls are fire-and-forget; the pet never
/// reports back into the scheduler.
pub trait PetController: Send + Sync {
    fn set_pet(&self, name: &str);
    fn set_size(&self, size_px: u32);
    fn set_jump_power(&self, power: f64);
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "call", rename_all = "snake_case")]
pub enum PetCall {
    SetPet { name: String },
    SetSize { size_px: u32 },
    SetJumpPower { power: f64 },
}

/// Keeps every call so a host without a live pet can replay or inspect them.
#[derive(Debug, Default)]
pub struct RecordingPetController {
    calls: Mutex<Vec<PetCall>>,
}

impl RecordingPetController {
    pub fn calls(&self) -> Vec<PetCall> {
        self.calls
            .lock()
            .map(|calls| calls.clone())
            .unwrap_or_default()
    }

    fn record(&self, call: PetCall) {
        if let Ok(mut calls) = self.calls.lock() {
            calls.push(call);
        }
    }
}

impl PetController for RecordingPetController {
    fn set_pet(&self, name: &str) {
        self.record(PetCall::SetPet {
            name: name.to_string(),
        });
    }

    fn set_size(&self, size_px: u32) {
        self.record(PetCall::SetSize { size_px });
    }

    fn set_jump_power(&self, power: f64) {
        self.record(PetCall::SetJumpPower { power });
    }
}
