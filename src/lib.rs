//! telescroll
//!
//! Timer-driven teleprompter: per-viewer scroll state, reflowed text, an
//! end-of-text phase machine, and a session loop that pushes rendered frames
//! to display surfaces.
//!
//! The library follows a Pure Core / Impure Shell split. `reflow`, `engine`
//! and `model` never touch a clock or I/O; `session` and `coordinator` own
//! the timers; `transport`, `settings`, `config`, `logging` and `runner` are
//! the shell.

pub mod config;
pub mod coordinator;
pub mod engine;
pub mod logging;
pub mod model;
pub mod reflow;
pub mod runner;
pub mod session;
pub mod settings;
pub mod transport;
