#![no_std]

// must come first: the logging macros are textually scoped
#[macro_use]
mod fmt;

pub mod accel;
pub mod calibration;
pub mod calibration_async;
pub mod calibration_blocking;
pub mod chip;
pub mod config;
pub mod error;
pub mod fifo;
pub mod gyro;
pub mod interrupt;
pub mod magnetometer;
pub mod orientation;
pub mod registers;
pub mod sensitivity;
pub mod sensor;
pub mod sensor_async;
pub mod session;
