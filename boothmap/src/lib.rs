//! Viewport and interaction engine for the booth/prize-machine floor map.
//!
//! This crate is compiled to WebAssembly and runs in the browser, and also
//! builds natively so the layout and classification logic can be driven from
//! the `prizemap` command line tool. It owns the map canvas: turning
//! spreadsheet rows into booth groups, laying them out on a grid, deciding
//! which booths are highlighted or blinking, translating raw DOM input into
//! pan/zoom/drag/select gestures, and persisting the results. The host page
//! wires DOM events to the engine and reacts to the returned
//! [`engine::Action`]s.
//!
//! ## Module layout
//!
//! | Module | Role |
//! |--------|------|
//! | [`engine`] | Top-level engine and testable [`engine::EngineCore`] |
//! | [`booth`] | Row normalization, datasets and the machine filter |
//! | [`layout`] | Group footprints and the grid walk |
//! | [`scene`] | Per-frame layout pass: hit rects, paints, debug report |
//! | [`classify`] | Highlight and blink classification |
//! | [`camera`] | View state, fit/x3/free modes and coordinate conversions |
//! | [`input`] | Input event types and gesture states |
//! | [`hit`] | Rotation-aware hit-testing and rectangle selection |
//! | [`guides`] | Smart alignment guides and gap annotations |
//! | [`options`] | Persisted display options, including legacy shapes |
//! | [`persist`] | Typed key/value persistence over local storage |
//! | [`numeric`] | Loose number parsing and color ramps |
//! | [`render`] | Canvas 2D drawing of a laid-out frame |
//! | [`consts`] | Shared numeric constants and storage keys |

pub mod booth;
pub mod camera;
pub mod classify;
pub mod consts;
pub mod engine;
pub mod guides;
pub mod hit;
pub mod input;
pub mod layout;
pub mod numeric;
pub mod options;
pub mod persist;
pub mod render;
pub mod scene;
