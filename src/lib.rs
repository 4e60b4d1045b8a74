//! Core logic for a Spotify playback status display.
//!
//! The crate polls the Spotify Web API for the currently playing track,
//! extrapolates playback progress between polls, reacts to two physical
//! buttons and drops into a low-activity standby when nothing has played
//! for a while. Hardware concerns (pixels, buzzer, button levels) live
//! behind the traits in [`display`]; everything else is host-runnable.

pub mod auth;
pub mod button;
pub mod config;
pub mod controller;
pub mod display;
pub mod logging;
pub mod model;
