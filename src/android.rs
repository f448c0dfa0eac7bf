//! JNI bindings for Android.
//!
//! These functions are called from Kotlin via the JNI bridge.

use jni::objects::{JClass, JString};
use jni::sys::{jint, jlong, jstring};
use jni::JNIEnv;

use crate::{layout_from_snapshot, playback_map_from_snapshot};

/// Build a playback map from a partition snapshot.
///
/// Called from Kotlin as:
///   external fun playbackMap(snapshot: String, measuresPerLine: Int,
///                            loopStart: Long, loopEnd: Long): String?
#[no_mangle]
pub extern "system" fn Java_com_drumsheet_app_DrumLib_playbackMap(
    mut env: JNIEnv,
    _class: JClass,
    snapshot: JString,
    measures_per_line: jint,
    loop_start: jlong,
    loop_end: jlong,
) -> jstring {
    let snapshot_str: String = match env.get_string(&snapshot) {
        Ok(s) => s.into(),
        Err(_) => return std::ptr::null_mut(),
    };

    let mpl = measures_per_line.max(0) as u32;

    match playback_map_from_snapshot(&snapshot_str, mpl, loop_start, loop_end) {
        Ok(json) => match env.new_string(&json) {
            Ok(js) => js.into_raw(),
            Err(_) => std::ptr::null_mut(),
        },
        Err(_) => std::ptr::null_mut(),
    }
}

/// Build a layout table from a partition snapshot.
///
/// Called from Kotlin as:
///   external fun layout(snapshot: String, measuresPerLine: Int): String?
#[no_mangle]
pub extern "system" fn Java_com_drumsheet_app_DrumLib_layout(
    mut env: JNIEnv,
    _class: JClass,
    snapshot: JString,
    measures_per_line: jint,
) -> jstring {
    let snapshot_str: String = match env.get_string(&snapshot) {
        Ok(s) => s.into(),
        Err(_) => return std::ptr::null_mut(),
    };

    let mpl = measures_per_line.max(0) as u32;

    match layout_from_snapshot(&snapshot_str, mpl) {
        Ok(json) => match env.new_string(&json) {
            Ok(js) => js.into_raw(),
            Err(_) => std::ptr::null_mut(),
        },
        Err(_) => std::ptr::null_mut(),
    }
}
