use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::{Rc, Weak};
use std::time::Duration;

use hydrotag_core::{AnnotationView, Scheduler, TimerHandle};
use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;

/// What an interval callback acts on. The view is filled in after it has
/// been constructed (it owns the scheduler that owns the callbacks).
#[derive(Clone, Default)]
pub struct TickTarget {
    pub view: Rc<RefCell<Weak<RefCell<AnnotationView>>>>,
    pub listener: Rc<RefCell<Option<js_sys::Function>>>,
}

impl TickTarget {
    /// Tell the page something changed so it can re-render.
    pub fn notify(&self) {
        if let Some(f) = self.listener.borrow().as_ref() {
            if let Err(e) = f.call0(&JsValue::NULL) {
                log::error!("Change listener failed: {:?}", e);
            }
        }
    }
}

/// Repeating timers on `window.setInterval`.
pub struct IntervalScheduler {
    target: TickTarget,
    timers: HashMap<TimerHandle, (i32, Closure<dyn FnMut()>)>,
    // Cancelling from inside a tick must not drop the running closure; they
    // are released on the next schedule instead.
    retired: Vec<Closure<dyn FnMut()>>,
    next_id: u64,
}

impl IntervalScheduler {
    pub fn new(target: TickTarget) -> Self {
        Self {
            target,
            timers: HashMap::new(),
            retired: Vec::new(),
            next_id: 0,
        }
    }
}

impl Scheduler for IntervalScheduler {
    fn schedule_repeating(&mut self, period: Duration) -> Result<TimerHandle, String> {
        self.retired.clear();
        self.next_id += 1;
        let handle = TimerHandle(self.next_id);

        let target = self.target.clone();
        let cb = Closure::<dyn FnMut()>::new(move || {
            let Some(view) = target.view.borrow().upgrade() else { return };
            let outcome = match view.try_borrow_mut() {
                Ok(mut v) => v.tick(handle),
                Err(_) => {
                    log::warn!("Playback tick dropped: view busy");
                    return;
                }
            };
            log::debug!("Playback tick: {outcome:?}");
            target.notify();
        });

        let window = web_sys::window().ok_or("No window object")?;
        let ms = period.as_millis().min(i32::MAX as u128) as i32;
        let id = window
            .set_interval_with_callback_and_timeout_and_arguments_0(cb.as_ref().unchecked_ref(), ms)
            .map_err(|e| format!("setInterval failed: {:?}", e))?;
        self.timers.insert(handle, (id, cb));
        Ok(handle)
    }

    fn cancel(&mut self, handle: TimerHandle) {
        let Some((id, cb)) = self.timers.remove(&handle) else { return };
        if let Some(window) = web_sys::window() {
            window.clear_interval_with_handle(id);
        }
        self.retired.push(cb);
    }
}
