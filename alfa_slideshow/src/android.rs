//! ALFA Slideshow - Android JNI Bindings
//!
//! Exposes the presentation session to Kotlin via JNI. The Kotlin side
//! passes a `SlideshowBridge` object implementing the device-admin calls and
//! keeps the returned session handle; commands and events cross the boundary
//! as JSON.

#![cfg(feature = "android")]

use jni::objects::{GlobalRef, JClass, JObject, JObjectArray, JString, JValueOwned};
use jni::sys::{jboolean, jlong, jstring, JNI_FALSE, JNI_TRUE};
use jni::{JNIEnv, JavaVM};
use parking_lot::Mutex;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::bridge::LockBridge;
use crate::error::{SessionError, SessionResult};
use crate::media::Collection;
use crate::preview::PreviewEngine;
use crate::runtime::{SessionCommand, SessionEvent, SessionHandle, SessionRuntime};
use crate::session::{PlatformServices, SessionController};
use crate::settings::SessionConfig;
use crate::source::MediaSource;
use crate::store::{CollectionStore, SqliteCollectionStore};

// ═══════════════════════════════════════════════════════════════════════════════
// LOCK BRIDGE
// ═══════════════════════════════════════════════════════════════════════════════

/// `LockBridge` backed by a Kotlin `SlideshowBridge`
pub struct JniLockBridge {
    vm: JavaVM,
    bridge: GlobalRef,
}

impl JniLockBridge {
    pub fn new(env: &mut JNIEnv, bridge: &JObject) -> SessionResult<Self> {
        let vm = env.get_java_vm().map_err(platform)?;
        let bridge = env.new_global_ref(bridge).map_err(platform)?;
        Ok(Self { vm, bridge })
    }

    /// Call `method` with signature `sig` and convert the result while the
    /// thread is attached; Java exceptions are cleared
    fn call<T>(
        &self,
        method: &str,
        sig: &str,
        convert: impl FnOnce(JValueOwned<'_>) -> Option<T>,
    ) -> Option<T> {
        let mut env = match self.vm.attach_current_thread_permanently() {
            Ok(env) => env,
            Err(e) => {
                log::warn!("Cannot attach thread for {}: {}", method, e);
                return None;
            }
        };

        match env.call_method(self.bridge.as_obj(), method, sig, &[]) {
            Ok(value) => convert(value),
            Err(e) => {
                if env.exception_check().unwrap_or(false) {
                    let _ = env.exception_clear();
                }
                log::warn!("SlideshowBridge.{} failed: {}", method, e);
                None
            }
        }
    }

    fn call_bool(&self, method: &str) -> bool {
        self.call(method, "()Z", |value| value.z().ok())
            .unwrap_or(false)
    }

    fn call_void(&self, method: &str) {
        let _ = self.call(method, "()V", |_| Some(()));
    }
}

impl LockBridge for JniLockBridge {
    fn enter_secure_mode(&self) {
        self.call_void("enterSecureMode");
    }

    fn exit_secure_mode(&self) {
        self.call_void("exitSecureMode");
    }

    fn lock(&self) -> bool {
        self.call_bool("lockNow")
    }

    fn is_auto_lock_capable(&self) -> bool {
        self.call_bool("isAdminActive")
    }

    fn request_auto_lock_capability(&self) {
        self.call_void("requestAdmin");
    }
}

fn platform(e: jni::errors::Error) -> SessionError {
    SessionError::PlatformError(e.to_string())
}

// ═══════════════════════════════════════════════════════════════════════════════
// SESSION HOST
// ═══════════════════════════════════════════════════════════════════════════════

/// Running session owned by the Kotlin side through an opaque handle
struct NativeSession {
    runtime: tokio::runtime::Runtime,
    handle: SessionHandle,
    events: Mutex<mpsc::UnboundedReceiver<SessionEvent>>,
    task: JoinHandle<SessionController>,
}

impl NativeSession {
    /// Build the controller and spawn its runtime
    fn launch(
        lock_bridge: JniLockBridge,
        store: SqliteCollectionStore,
        config_path: PathBuf,
        collection: Collection,
    ) -> SessionResult<Self> {
        let config = SessionConfig::load_or_default(&config_path);
        let services = PlatformServices {
            lock_bridge: Arc::new(lock_bridge),
            store: Arc::new(store),
            loader: Arc::new(PreviewEngine::default()),
        };
        let controller = SessionController::new(collection, config, services)?;

        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(1)
            .thread_name("alfa-slideshow")
            .enable_all()
            .build()?;

        let (session, handle, events) = SessionRuntime::new(controller);
        let task = runtime.spawn(session.run());

        Ok(Self {
            runtime,
            handle,
            events: Mutex::new(events),
            task,
        })
    }

    /// Ask the session to end and wait for teardown
    fn close(self) {
        let NativeSession {
            runtime,
            handle,
            task,
            ..
        } = self;

        let _ = handle.blocking_send(SessionCommand::Shutdown);
        drop(handle);

        if let Err(e) = runtime.block_on(task) {
            log::warn!("Session task ended abnormally: {}", e);
        }
    }
}

fn into_handle(result: SessionResult<NativeSession>) -> jlong {
    match result {
        Ok(session) => Box::into_raw(Box::new(session)) as jlong,
        Err(e) => {
            log::warn!("Cannot open slideshow: {}", e);
            0
        }
    }
}

/// Borrow the session behind a handle returned by `open*`
fn session<'a>(handle: jlong) -> SessionResult<&'a NativeSession> {
    if handle == 0 {
        return Err(SessionError::SessionClosed);
    }
    // SAFETY: non-zero handles come from `into_handle` and stay valid until `close`
    Ok(unsafe { &*(handle as *const NativeSession) })
}

fn get_string(env: &mut JNIEnv, value: &JString) -> SessionResult<String> {
    Ok(env.get_string(value).map_err(platform)?.into())
}

fn get_strings(env: &mut JNIEnv, values: &JObjectArray) -> SessionResult<Vec<String>> {
    let len = env.get_array_length(values).map_err(platform)?;
    let mut out = Vec::with_capacity(len as usize);
    for i in 0..len {
        let element = env.get_object_array_element(values, i).map_err(platform)?;
        out.push(get_string(env, &JString::from(element))?);
    }
    Ok(out)
}

fn open_shared(
    env: &mut JNIEnv,
    bridge: &JObject,
    db_path: &JString,
    config_path: &JString,
    paths: &JObjectArray,
) -> SessionResult<NativeSession> {
    let lock_bridge = JniLockBridge::new(env, bridge)?;
    let store = SqliteCollectionStore::open(&PathBuf::from(get_string(env, db_path)?))?;
    let config_path = PathBuf::from(get_string(env, config_path)?);

    let files = get_strings(env, paths)?;
    let ingested = MediaSource::new().ingest(&files[..])?;
    for path in &ingested.rejected {
        log::info!("Skipping unsupported file {}", path.display());
    }

    NativeSession::launch(lock_bridge, store, config_path, ingested.collection)
}

fn open_saved(
    env: &mut JNIEnv,
    bridge: &JObject,
    db_path: &JString,
    config_path: &JString,
    collection_id: &JString,
) -> SessionResult<NativeSession> {
    let lock_bridge = JniLockBridge::new(env, bridge)?;
    let store = SqliteCollectionStore::open(&PathBuf::from(get_string(env, db_path)?))?;
    let config_path = PathBuf::from(get_string(env, config_path)?);

    let collection = store.load(&get_string(env, collection_id)?)?;

    NativeSession::launch(lock_bridge, store, config_path, collection)
}

// ═══════════════════════════════════════════════════════════════════════════════
// EXPORTS
// ═══════════════════════════════════════════════════════════════════════════════

/// Present shared/imported files as an unsaved collection; 0 on failure
#[no_mangle]
pub extern "system" fn Java_dev_alfa_slideshow_NativeSlideshow_openShared(
    mut env: JNIEnv,
    _class: JClass,
    bridge: JObject,
    db_path: JString,
    config_path: JString,
    paths: JObjectArray,
) -> jlong {
    into_handle(open_shared(&mut env, &bridge, &db_path, &config_path, &paths))
}

/// Present a saved collection; 0 on failure
#[no_mangle]
pub extern "system" fn Java_dev_alfa_slideshow_NativeSlideshow_openSaved(
    mut env: JNIEnv,
    _class: JClass,
    bridge: JObject,
    db_path: JString,
    config_path: JString,
    collection_id: JString,
) -> jlong {
    into_handle(open_saved(&mut env, &bridge, &db_path, &config_path, &collection_id))
}

/// Queue a JSON-encoded command
#[no_mangle]
pub extern "system" fn Java_dev_alfa_slideshow_NativeSlideshow_send(
    mut env: JNIEnv,
    _class: JClass,
    handle: jlong,
    command: JString,
) -> jboolean {
    let result = session(handle).and_then(|session| {
        let json = get_string(&mut env, &command)?;
        let command: SessionCommand = serde_json::from_str(&json)?;
        session.handle.blocking_send(command)
    });

    match result {
        Ok(()) => JNI_TRUE,
        Err(e) => {
            log::warn!("Command not delivered: {}", e);
            JNI_FALSE
        }
    }
}

/// Next JSON-encoded event, or null when none is queued
#[no_mangle]
pub extern "system" fn Java_dev_alfa_slideshow_NativeSlideshow_pollEvent(
    env: JNIEnv,
    _class: JClass,
    handle: jlong,
) -> jstring {
    let event = match session(handle).map(|session| session.events.lock().try_recv()) {
        Ok(Ok(event)) => event,
        _ => return std::ptr::null_mut(),
    };

    let json = match serde_json::to_string(&event) {
        Ok(json) => json,
        Err(e) => {
            log::warn!("Cannot encode event: {}", e);
            return std::ptr::null_mut();
        }
    };

    match env.new_string(json) {
        Ok(s) => s.into_raw(),
        Err(_) => std::ptr::null_mut(),
    }
}

/// Stop the session, wait for teardown and free the handle
#[no_mangle]
pub extern "system" fn Java_dev_alfa_slideshow_NativeSlideshow_close(
    _env: JNIEnv,
    _class: JClass,
    handle: jlong,
) {
    if handle == 0 {
        return;
    }
    // SAFETY: handle came from `into_handle`; Kotlin drops it after this call
    let session = unsafe { Box::from_raw(handle as *mut NativeSession) };
    session.close();
}
