//! C FFI surface for powerplay.
//!
//! Pattern: opaque NavHandle + C strings + JSON serialization.
//!
//! A web or mobile shell owns the real history and the video frame; it
//! forwards user actions and history pops here and renders the returned
//! view JSON. Every string returned is freed with `pp_string_free`.

use std::cell::RefCell;
use std::ffi::{CStr, CString};
use std::os::raw::c_char;
use std::ptr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use serde::Serialize;

use powerplay_core::effects::{self, PlayerSurface};
use powerplay_core::{AppConfig, History, MemoryHistory, NavState, Navigator, Notice};

// ---------------------------------------------------------------------------
// Error handling (thread-local last error)
// ---------------------------------------------------------------------------

thread_local! {
    static LAST_ERROR: RefCell<Option<String>> = const { RefCell::new(None) };
}

fn set_error(msg: String) {
    LAST_ERROR.with(|cell| *cell.borrow_mut() = Some(msg));
}

fn clear_error() {
    LAST_ERROR.with(|cell| *cell.borrow_mut() = None);
}

/// Returns the last error message (caller frees with `pp_string_free`).
#[no_mangle]
pub extern "C" fn pp_last_error() -> *mut c_char {
    LAST_ERROR.with(|cell| {
        cell.borrow_mut()
            .take()
            .and_then(|s| CString::new(s).ok())
            .map(|s| s.into_raw())
            .unwrap_or(ptr::null_mut())
    })
}

/// Frees a string returned from powerplay FFI.
///
/// # Safety
/// Must be a pointer returned from this FFI and not already freed.
#[no_mangle]
pub unsafe extern "C" fn pp_string_free(ptr: *mut c_char) {
    if !ptr.is_null() {
        let _ = CString::from_raw(ptr);
    }
}

// ---------------------------------------------------------------------------
// Opaque handle
// ---------------------------------------------------------------------------

#[repr(C)]
pub struct NavHandle {
    _private: [u8; 0],
}

struct NavHandleInner {
    nav: Mutex<Navigator>,
    surface: Arc<HostSurface>,
}

/// The host draws the frame from the view's embed URL; only the
/// fullscreen flag lives here.
#[derive(Default)]
struct HostSurface {
    fullscreen: AtomicBool,
}

impl PlayerSurface for HostSurface {
    fn load(&self, _: &str) {}
    fn stop(&self) {}

    fn is_fullscreen(&self) -> bool {
        self.fullscreen.load(Ordering::SeqCst)
    }

    fn exit_fullscreen(&self) {
        self.fullscreen.store(false, Ordering::SeqCst);
    }
}

// ---------------------------------------------------------------------------
// Lifecycle
// ---------------------------------------------------------------------------

/// Opens a navigator over a catalog root (directory or http(s) URL).
/// `config_json` may be NULL for the default subject table.
///
/// # Safety
/// `root` must be a valid null-terminated C string; `config_json` must be
/// NULL or one.
#[no_mangle]
pub unsafe extern "C" fn pp_open(root: *const c_char, config_json: *const c_char) -> *mut NavHandle {
    clear_error();
    let root = match read_cstr(root) {
        Ok(r) => r,
        Err(e) => {
            set_error(e);
            return ptr::null_mut();
        }
    };
    let config = if config_json.is_null() {
        AppConfig::default()
    } else {
        let parsed = read_cstr(config_json)
            .and_then(|json| serde_json::from_str::<AppConfig>(&json).map_err(|e| e.to_string()));
        match parsed {
            Ok(c) => c,
            Err(e) => {
                set_error(e);
                return ptr::null_mut();
            }
        }
    };

    let surface = Arc::new(HostSurface::default());
    let nav = Navigator::new(config, effects::fetcher_for_root(&root), MemoryHistory::new())
        .with_player(surface.clone());
    let inner = NavHandleInner { nav: Mutex::new(nav), surface };
    Box::into_raw(Box::new(inner)) as *mut NavHandle
}

/// Releases the navigator.
#[no_mangle]
pub extern "C" fn pp_close(handle: *mut NavHandle) {
    if !handle.is_null() {
        unsafe {
            drop(Box::from_raw(handle as *mut NavHandleInner));
        }
    }
}

/// Hands the navigator the host's current history state before unlock
/// (page reload, deep link). `pp_unlock` then rebuilds that page.
/// Returns 1 on success, 0 on error.
#[no_mangle]
pub extern "C" fn pp_restore(handle: *mut NavHandle, state_json: *const c_char) -> i32 {
    clear_error();
    let inner = match handle_ref(handle) {
        Ok(h) => h,
        Err(e) => {
            set_error(e);
            return 0;
        }
    };
    let state = read_cstr(state_json)
        .and_then(|json| serde_json::from_str::<serde_json::Value>(&json).map_err(|e| e.to_string()))
        .and_then(|value| NavState::from_value(&value).ok_or_else(|| "unrecognised history state".to_string()));
    let state = match state {
        Ok(s) => s,
        Err(e) => {
            set_error(e);
            return 0;
        }
    };
    let mut nav = inner.nav.lock();
    if nav.is_unlocked() {
        set_error("navigator already unlocked".into());
        return 0;
    }
    nav.history_mut().replace(state);
    1
}

/// Checks the passphrase and enters the app. Returns the pop outcome JSON
/// of the cold start (caller frees), or NULL on a wrong passphrase.
#[no_mangle]
pub extern "C" fn pp_unlock(handle: *mut NavHandle, passphrase: *const c_char) -> *mut c_char {
    clear_error();
    let inner = match handle_ref(handle) {
        Ok(h) => h,
        Err(e) => return err_null(e),
    };
    let input = match read_cstr(passphrase) {
        Ok(s) => s,
        Err(e) => return err_null(e),
    };
    match inner.nav.lock().unlock(&input) {
        Ok(outcome) => json_to_cstr(&outcome),
        Err(e) => err_null(e.to_string()),
    }
}

// ---------------------------------------------------------------------------
// Forward navigation
// ---------------------------------------------------------------------------

/// Returns 1 on success, 0 on error.
#[no_mangle]
pub extern "C" fn pp_open_subject(handle: *mut NavHandle, subject: *const c_char) -> i32 {
    with_label(handle, subject, |nav, s| nav.open_subject(s))
}

/// Opens a paper (chapter grid or player). Returns 1 on success, 0 on
/// error; a missing catalog also queues a `load_failed` notice.
#[no_mangle]
pub extern "C" fn pp_open_paper(handle: *mut NavHandle, paper: *const c_char) -> i32 {
    with_label(handle, paper, |nav, p| nav.open_paper(p))
}

#[no_mangle]
pub extern "C" fn pp_open_chapter(handle: *mut NavHandle, chapter: *const c_char) -> i32 {
    with_label(handle, chapter, |nav, c| nav.open_chapter(c))
}

#[no_mangle]
pub extern "C" fn pp_go_home(handle: *mut NavHandle) -> i32 {
    clear_error();
    let inner = match handle_ref(handle) {
        Ok(h) => h,
        Err(e) => {
            set_error(e);
            return 0;
        }
    };
    match inner.nav.lock().go_home() {
        Ok(()) => 1,
        Err(e) => {
            set_error(e.to_string());
            0
        }
    }
}

// ---------------------------------------------------------------------------
// Backward navigation
// ---------------------------------------------------------------------------

/// Programmatic back. Returns the pop outcome JSON (caller frees).
#[no_mangle]
pub extern "C" fn pp_back(handle: *mut NavHandle) -> *mut c_char {
    clear_error();
    match handle_ref(handle) {
        Ok(inner) => json_to_cstr(&inner.nav.lock().back()),
        Err(e) => err_null(e),
    }
}

#[no_mangle]
pub extern "C" fn pp_forward(handle: *mut NavHandle) -> *mut c_char {
    clear_error();
    match handle_ref(handle) {
        Ok(inner) => json_to_cstr(&inner.nav.lock().forward()),
        Err(e) => err_null(e),
    }
}

/// Feeds a host history pop. `state_json` is the popped entry's state;
/// NULL or anything that does not decode recovers to home. A decoded
/// state also moves the navigator's own history to that entry.
/// Returns the pop outcome JSON (caller frees).
#[no_mangle]
pub extern "C" fn pp_pop(handle: *mut NavHandle, state_json: *const c_char) -> *mut c_char {
    clear_error();
    let inner = match handle_ref(handle) {
        Ok(h) => h,
        Err(e) => return err_null(e),
    };
    let state = read_cstr(state_json)
        .ok()
        .and_then(|json| serde_json::from_str::<serde_json::Value>(&json).ok())
        .and_then(|value| NavState::from_value(&value));
    json_to_cstr(&inner.nav.lock().pop(state))
}

/// Tells the navigator whether the video frame is fullscreen, so the
/// next back only leaves fullscreen.
#[no_mangle]
pub extern "C" fn pp_set_fullscreen(handle: *mut NavHandle, fullscreen: i32) -> i32 {
    clear_error();
    match handle_ref(handle) {
        Ok(inner) => {
            inner.surface.fullscreen.store(fullscreen != 0, Ordering::SeqCst);
            1
        }
        Err(e) => {
            set_error(e);
            0
        }
    }
}

/// The current history entry as JSON (`null` before unlock). Caller frees.
#[no_mangle]
pub extern "C" fn pp_history_state(handle: *mut NavHandle) -> *mut c_char {
    clear_error();
    match handle_ref(handle) {
        Ok(inner) => json_to_cstr(&inner.nav.lock().history().current()),
        Err(e) => err_null(e),
    }
}

// ---------------------------------------------------------------------------
// View
// ---------------------------------------------------------------------------

/// The view model JSON (caller frees).
#[no_mangle]
pub extern "C" fn pp_view(handle: *mut NavHandle) -> *mut c_char {
    clear_error();
    match handle_ref(handle) {
        Ok(inner) => json_to_cstr(inner.nav.lock().view()),
        Err(e) => err_null(e),
    }
}

/// Playlist rows JSON (caller frees).
#[no_mangle]
pub extern "C" fn pp_playlist(handle: *mut NavHandle) -> *mut c_char {
    clear_error();
    match handle_ref(handle) {
        Ok(inner) => json_to_cstr(&inner.nav.lock().playlist_view()),
        Err(e) => err_null(e),
    }
}

#[derive(Serialize)]
struct NoticeOut {
    #[serde(flatten)]
    notice: Notice,
    message: &'static str,
}

/// Drains pending notices as a JSON array (caller frees).
#[no_mangle]
pub extern "C" fn pp_notices(handle: *mut NavHandle) -> *mut c_char {
    clear_error();
    let inner = match handle_ref(handle) {
        Ok(h) => h,
        Err(e) => return err_null(e),
    };
    let notices: Vec<NoticeOut> = inner
        .nav
        .lock()
        .take_notices()
        .into_iter()
        .map(|notice| NoticeOut { message: notice.message(), notice })
        .collect();
    json_to_cstr(&notices)
}

// ---------------------------------------------------------------------------
// Playlist
// ---------------------------------------------------------------------------

/// Plays row `index` of the visible playlist. Returns 1 if it started.
#[no_mangle]
pub extern "C" fn pp_play(handle: *mut NavHandle, index: u32) -> i32 {
    with_nav(handle, |nav| nav.play(index as usize) as i32)
}

#[no_mangle]
pub extern "C" fn pp_next(handle: *mut NavHandle) -> i32 {
    with_nav(handle, |nav| nav.next() as i32)
}

#[no_mangle]
pub extern "C" fn pp_previous(handle: *mut NavHandle) -> i32 {
    with_nav(handle, |nav| nav.previous() as i32)
}

/// Filters the playlist; an empty query restores it. Returns 1 on success.
#[no_mangle]
pub extern "C" fn pp_search(handle: *mut NavHandle, query: *const c_char) -> i32 {
    clear_error();
    let query = match read_cstr(query) {
        Ok(q) => q,
        Err(e) => {
            set_error(e);
            return 0;
        }
    };
    with_nav(handle, |nav| {
        nav.search(&query);
        1
    })
}

#[no_mangle]
pub extern "C" fn pp_shuffle(handle: *mut NavHandle) -> i32 {
    with_nav(handle, |nav| {
        nav.shuffle();
        1
    })
}

#[no_mangle]
pub extern "C" fn pp_clear(handle: *mut NavHandle) -> i32 {
    with_nav(handle, |nav| {
        nav.clear_search();
        1
    })
}

// ---------------------------------------------------------------------------
// Version
// ---------------------------------------------------------------------------

/// Returns the FFI API version.
#[no_mangle]
pub extern "C" fn pp_version() -> u32 {
    1
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn handle_ref<'a>(handle: *mut NavHandle) -> Result<&'a NavHandleInner, String> {
    if handle.is_null() {
        return Err("null navigator handle".into());
    }
    Ok(unsafe { &*(handle as *mut NavHandleInner) })
}

fn with_nav(handle: *mut NavHandle, f: impl FnOnce(&mut Navigator) -> i32) -> i32 {
    match handle_ref(handle) {
        Ok(inner) => f(&mut inner.nav.lock()),
        Err(e) => {
            set_error(e);
            0
        }
    }
}

fn with_label(
    handle: *mut NavHandle,
    label: *const c_char,
    f: impl FnOnce(&mut Navigator, &str) -> powerplay_core::Result<()>,
) -> i32 {
    clear_error();
    let label = match read_cstr(label) {
        Ok(s) => s,
        Err(e) => {
            set_error(e);
            return 0;
        }
    };
    with_nav(handle, |nav| match f(nav, &label) {
        Ok(()) => 1,
        Err(e) => {
            set_error(e.to_string());
            0
        }
    })
}

fn read_cstr(ptr: *const c_char) -> Result<String, String> {
    if ptr.is_null() {
        return Err("null string pointer".into());
    }
    unsafe {
        CStr::from_ptr(ptr)
            .to_str()
            .map(String::from)
            .map_err(|_| "invalid utf-8".into())
    }
}

fn json_to_cstr<T: Serialize + ?Sized>(value: &T) -> *mut c_char {
    match serde_json::to_string(value) {
        Ok(json) => to_cstr(json),
        Err(e) => err_null(e.to_string()),
    }
}

fn to_cstr(s: String) -> *mut c_char {
    CString::new(s)
        .map(|c| c.into_raw())
        .unwrap_or(ptr::null_mut())
}

fn err_null(msg: String) -> *mut c_char {
    set_error(msg);
    ptr::null_mut()
}

// ---------------------------------------------------------------------------
// FFI Integration Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Value;
    use tempfile::TempDir;

    const ICT: &str = r#"{"Paper 1": [{"id": "x1", "title": "Intro"}, {"id": "x2", "title": "Networks"}]}"#;

    /// Open a navigator over a temp catalog root, already unlocked.
    fn ffi_nav() -> (TempDir, *mut NavHandle) {
        let dir = TempDir::new().expect("tempdir");
        std::fs::create_dir_all(dir.path().join("subjects")).unwrap();
        std::fs::write(dir.path().join("subjects").join("ict.html"), ICT).unwrap();

        let root = c(dir.path().to_str().unwrap());
        let handle = unsafe { pp_open(root.as_ptr(), ptr::null()) };
        assert!(!handle.is_null(), "pp_open returned null");
        let outcome = json(pp_unlock(handle, c("###@@@website").as_ptr()));
        assert_eq!(outcome["outcome"], "shown");
        (dir, handle)
    }

    /// Read a *mut c_char into a String and free it.
    fn read_ffi_string(ptr: *mut c_char) -> String {
        assert!(!ptr.is_null(), "FFI returned null string");
        let s = unsafe { CStr::from_ptr(ptr).to_str().unwrap().to_string() };
        unsafe { pp_string_free(ptr) };
        s
    }

    fn json(ptr: *mut c_char) -> Value {
        serde_json::from_str(&read_ffi_string(ptr)).unwrap()
    }

    fn c(s: &str) -> CString {
        CString::new(s).unwrap()
    }

    fn last_error() -> String {
        read_ffi_string(pp_last_error())
    }

    // -------------------------------------------------------------------
    // Lifecycle
    // -------------------------------------------------------------------

    #[test]
    fn ffi_version() {
        assert_eq!(pp_version(), 1);
    }

    #[test]
    fn ffi_null_handle_returns_error() {
        assert!(pp_view(ptr::null_mut()).is_null());
        assert!(last_error().contains("null"));
        assert_eq!(pp_next(ptr::null_mut()), 0);
    }

    #[test]
    fn ffi_bad_config_rejected() {
        let root = c(".");
        let config = c("{ not json");
        let handle = unsafe { pp_open(root.as_ptr(), config.as_ptr()) };
        assert!(handle.is_null());
        assert!(!last_error().is_empty());
    }

    #[test]
    fn ffi_wrong_passphrase() {
        let root = c(".");
        let handle = unsafe { pp_open(root.as_ptr(), ptr::null()) };
        assert!(pp_unlock(handle, c("nope").as_ptr()).is_null());
        assert_eq!(last_error(), "wrong passphrase");
        assert_eq!(pp_open_subject(handle, c("ICT").as_ptr()), 0);
        assert_eq!(last_error(), "navigator is locked");
        pp_close(handle);
    }

    // -------------------------------------------------------------------
    // Navigation
    // -------------------------------------------------------------------

    #[test]
    fn ffi_browse_to_player_and_back() {
        let (_dir, handle) = ffi_nav();
        assert_eq!(pp_open_subject(handle, c("ICT").as_ptr()), 1);
        assert_eq!(json(pp_view(handle))["cards"], serde_json::json!(["Paper 1"]));

        assert_eq!(pp_open_paper(handle, c("Paper 1").as_ptr()), 1);
        let view = json(pp_view(handle));
        assert_eq!(view["page"], "player");
        assert_eq!(view["now_playing"]["title"], "Intro");
        assert!(view["now_playing"]["embed_url"].as_str().unwrap().contains("/embed/x1?"));

        let state = json(pp_history_state(handle));
        assert_eq!(state["page"], "player");
        assert_eq!(state["subject"], "ICT");
        assert!(state.get("chapter").is_none());

        let outcome = json(pp_back(handle));
        assert_eq!(outcome, serde_json::json!({"outcome": "shown", "page": "papers"}));
        assert_eq!(json(pp_playlist(handle))["total"], 0);

        pp_close(handle);
    }

    #[test]
    fn ffi_missing_catalog_queues_notice() {
        let (_dir, handle) = ffi_nav();
        pp_open_subject(handle, c("Bangla").as_ptr());
        assert_eq!(pp_open_paper(handle, c("Paper 1").as_ptr()), 0);
        assert!(last_error().contains("Bangla"));

        let notices = json(pp_notices(handle));
        assert_eq!(notices[0]["kind"], "load_failed");
        assert_eq!(notices[0]["message"], "Error: Subject file not found or invalid.");
        assert_eq!(json(pp_view(handle))["page"], "home");
        assert_eq!(json(pp_history_state(handle))["page"], "home");
        assert_eq!(json(pp_notices(handle)), serde_json::json!([]));
        pp_close(handle);
    }

    #[test]
    fn ffi_host_pop_and_fullscreen() {
        let (_dir, handle) = ffi_nav();
        pp_open_subject(handle, c("ICT").as_ptr());
        pp_open_paper(handle, c("Paper 1").as_ptr());

        pp_set_fullscreen(handle, 1);
        let popped = c(r#"{"page":"papers","subject":"ICT"}"#);
        let outcome = json(pp_pop(handle, popped.as_ptr()));
        assert_eq!(outcome["outcome"], "fullscreen_exited");
        assert_eq!(json(pp_view(handle))["page"], "player");

        let outcome = json(pp_pop(handle, popped.as_ptr()));
        assert_eq!(outcome["page"], "papers");

        let garbage = c(r#"{"page":"lobby"}"#);
        assert_eq!(json(pp_pop(handle, garbage.as_ptr()))["page"], "home");
        assert_eq!(json(pp_pop(handle, ptr::null()))["page"], "home");
        let home = c(r#"{"page":"home"}"#);
        assert_eq!(json(pp_pop(handle, home.as_ptr()))["outcome"], "exit_prompt");
        assert_eq!(json(pp_notices(handle))[0]["kind"], "press_back_again");
        pp_close(handle);
    }

    #[test]
    fn ffi_host_pop_moves_history() {
        let (_dir, handle) = ffi_nav();
        pp_open_subject(handle, c("ICT").as_ptr());
        pp_open_paper(handle, c("Paper 1").as_ptr());

        let popped = c(r#"{"page":"papers","subject":"ICT"}"#);
        assert_eq!(json(pp_pop(handle, popped.as_ptr()))["page"], "papers");
        assert_eq!(json(pp_history_state(handle)), serde_json::json!({"page": "papers", "subject": "ICT"}));

        assert_eq!(json(pp_back(handle)), serde_json::json!({"outcome": "shown", "page": "home"}));
        assert_eq!(json(pp_history_state(handle))["page"], "home");
        assert_eq!(json(pp_forward(handle))["page"], "papers");
        pp_close(handle);
    }

    #[test]
    fn ffi_restore_before_unlock() {
        let dir = TempDir::new().expect("tempdir");
        std::fs::write(dir.path().join("ict.html"), ICT).unwrap();
        let root = c(dir.path().to_str().unwrap());
        let handle = unsafe { pp_open(root.as_ptr(), ptr::null()) };

        assert_eq!(pp_restore(handle, c(r#"{"page":"lobby"}"#).as_ptr()), 0);
        assert!(!last_error().is_empty());
        let state = c(r#"{"page":"player","subject":"ICT","paper":"Paper 1"}"#);
        assert_eq!(pp_restore(handle, state.as_ptr()), 1);

        let outcome = json(pp_unlock(handle, c("###@@@website").as_ptr()));
        assert_eq!(outcome, serde_json::json!({"outcome": "shown", "page": "player"}));
        assert_eq!(json(pp_view(handle))["now_playing"]["title"], "Intro");
        assert_eq!(json(pp_history_state(handle))["page"], "player");

        assert_eq!(pp_restore(handle, state.as_ptr()), 0);
        assert_eq!(last_error(), "navigator already unlocked");
        pp_close(handle);
    }

    // -------------------------------------------------------------------
    // Playlist
    // -------------------------------------------------------------------

    #[test]
    fn ffi_playlist_controls() {
        let (_dir, handle) = ffi_nav();
        pp_open_subject(handle, c("ICT").as_ptr());
        pp_open_paper(handle, c("Paper 1").as_ptr());

        assert_eq!(pp_next(handle), 1);
        assert_eq!(json(pp_view(handle))["now_playing"]["title"], "Networks");
        assert_eq!(pp_next(handle), 0);
        assert_eq!(pp_play(handle, 0), 1);
        assert_eq!(pp_play(handle, 9), 0);

        assert_eq!(pp_search(handle, c("net").as_ptr()), 1);
        let rows = json(pp_playlist(handle));
        assert_eq!(rows["total"], 1);
        assert_eq!(rows["query"], "net");
        assert_eq!(pp_clear(handle), 1);
        assert_eq!(pp_shuffle(handle), 1);
        assert_eq!(json(pp_playlist(handle))["total"], 2);
        pp_close(handle);
    }
}
