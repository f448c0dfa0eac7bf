//! drumlib — percussion notation editing and playback engine for Drum
//! Sheet Creator.
//!
//! The crate owns the rhythmic core of the editor: quantizing pointer
//! positions onto the beat grid, validating note placement, grouping
//! notes for beaming, laying out measures and staff lines, and
//! scheduling audio triggers with a synchronized cursor. Rendering and
//! synthesis stay on the host side, consuming the layout tables and
//! trigger callbacks.
//!
//! # Example
//! ```
//! use drumlib::model::{InstrumentPart, NoteDuration, Partition};
//! use drumlib::store;
//!
//! let mut partition = Partition::new(1, "Groove");
//! let outcome = store::insert_or_replace(
//!     &mut partition, 0, 0.0,
//!     InstrumentPart::BassDrum, NoteDuration::Quarter, None,
//! );
//! assert!(outcome.applied());
//! ```

pub mod beaming;
pub mod error;
pub mod grid;
pub mod layout;
pub mod model;
pub mod playback;
pub mod player;
pub mod snapshot;
pub mod store;
pub mod timemap;

#[cfg(target_os = "android")]
pub mod android;

pub use error::{SnapshotError, StructuralError};
pub use layout::{compute_layout, LayoutConfig, ScoreLayout};
pub use model::*;
pub use playback::{generate_playback_map, playback_map_to_json, PlaybackMap};
pub use player::{AudioClock, Player, TriggerSink, VoiceHandle};
pub use snapshot::{partition_from_json, partition_to_json};
pub use store::{insert_or_replace, EditOutcome};

/// Parse a partition snapshot and produce its playback map as JSON.
/// Convenience function combining loading, layout, and scheduling —
/// this is the single call FFI hosts need for cursor-synchronized
/// playback.
///
/// Pass a negative loop bound to play the whole score.
pub fn playback_map_from_snapshot(
    snapshot_json: &str,
    measures_per_line: u32,
    loop_start: i64,
    loop_end: i64,
) -> Result<String, SnapshotError> {
    let partition = snapshot::partition_from_json(snapshot_json)?;
    let config = LayoutConfig {
        measures_per_line: if measures_per_line > 0 {
            measures_per_line
        } else {
            LayoutConfig::default().measures_per_line
        },
    };
    let loop_region = if loop_start >= 0 && loop_end >= loop_start {
        Some(LoopRegion {
            start_measure: loop_start as u32,
            end_measure: loop_end as u32,
        })
    } else {
        None
    };
    let map = playback::generate_playback_map(&partition, &config, loop_region);
    Ok(playback::playback_map_to_json(&map))
}

/// Parse a partition snapshot and produce its layout table as JSON.
pub fn layout_from_snapshot(
    snapshot_json: &str,
    measures_per_line: u32,
) -> Result<String, SnapshotError> {
    let partition = snapshot::partition_from_json(snapshot_json)?;
    let config = LayoutConfig {
        measures_per_line: if measures_per_line > 0 {
            measures_per_line
        } else {
            LayoutConfig::default().measures_per_line
        },
    };
    let layout = layout::compute_layout(&partition, &config);
    serde_json::to_string(&layout).map_err(SnapshotError::from)
}

// ═══════════════════════════════════════════════════════════════════════
// C FFI — for iOS (static library) and Android (JNI)
// ═══════════════════════════════════════════════════════════════════════

use std::ffi::{CStr, CString};
use std::os::raw::c_char;

/// Build a playback map from a partition snapshot and return it as a
/// JSON C string. The caller must free the returned string with
/// `drumlib_free_string`. Pass negative loop bounds to play the whole
/// score; pass 0 for the default measures-per-line.
///
/// # Safety
/// `snapshot_json` must be a valid null-terminated UTF-8 C string.
#[no_mangle]
pub unsafe extern "C" fn drumlib_playback_map(
    snapshot_json: *const c_char,
    measures_per_line: u32,
    loop_start: i64,
    loop_end: i64,
) -> *mut c_char {
    if snapshot_json.is_null() {
        return std::ptr::null_mut();
    }
    let c_str = unsafe { CStr::from_ptr(snapshot_json) };
    let json = match c_str.to_str() {
        Ok(s) => s,
        Err(_) => return std::ptr::null_mut(),
    };

    match playback_map_from_snapshot(json, measures_per_line, loop_start, loop_end) {
        Ok(out) => CString::new(out).unwrap_or_default().into_raw(),
        Err(_) => std::ptr::null_mut(),
    }
}

/// Build a layout table from a partition snapshot and return it as a
/// JSON C string. The caller must free the returned string with
/// `drumlib_free_string`.
///
/// # Safety
/// `snapshot_json` must be a valid null-terminated UTF-8 C string.
#[no_mangle]
pub unsafe extern "C" fn drumlib_layout(
    snapshot_json: *const c_char,
    measures_per_line: u32,
) -> *mut c_char {
    if snapshot_json.is_null() {
        return std::ptr::null_mut();
    }
    let c_str = unsafe { CStr::from_ptr(snapshot_json) };
    let json = match c_str.to_str() {
        Ok(s) => s,
        Err(_) => return std::ptr::null_mut(),
    };

    match layout_from_snapshot(json, measures_per_line) {
        Ok(out) => CString::new(out).unwrap_or_default().into_raw(),
        Err(_) => std::ptr::null_mut(),
    }
}

/// Free a string previously returned by drumlib functions.
///
/// # Safety
/// `ptr` must be a string previously returned by a drumlib function, or
/// null.
#[no_mangle]
pub unsafe extern "C" fn drumlib_free_string(ptr: *mut c_char) {
    if !ptr.is_null() {
        unsafe {
            let _ = CString::from_raw(ptr);
        }
    }
}
