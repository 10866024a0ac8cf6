//! Stateful consumer over any adapter

mod controller;

pub use controller::{
    ControllerOptions, ControllerState, DataChangeCallback, DataController, ErrorCallback,
    LoadPhase, SuccessCallback,
};
