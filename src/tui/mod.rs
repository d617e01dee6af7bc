//! Inline menu engine.
//!
//! Organized along FP/Unix boundaries:
//! - `state`: pure data types (Key, Transition, MultiSelect, SingleSelect)
//! - `update`: pure transitions
//! - `keys`: raw byte decoding
//! - `view`: rendering into any `Write`
//! - `theme`: glyphs and styles
//! - `run`: the session, the only place effects are sequenced

pub mod keys;
pub mod run;
pub mod state;
pub mod theme;
pub mod update;
pub mod view;
