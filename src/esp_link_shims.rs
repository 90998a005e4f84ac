//! Runtime symbol providers for third-party crates.
//!
//! - `critical-section`: `embassy-sync` channels lock through it.  On the
//!   device one re-entrant process-wide mutex backs it; host builds use the
//!   `critical-section/std` implementation instead.
//! - `embassy-time-driver`: `async-io-mini` timers read the clock and
//!   schedule wake-ups through `_embassy_time_now` and
//!   `_embassy_time_schedule_wake`.  Both targets get a driver: ticks are
//!   microseconds (the driver's default 1 MHz tick rate), from
//!   `esp_timer_get_time()` on the device and a process-wide `Instant`
//!   epoch on the host.  Wake-ups are served by one timer thread.

#[cfg(target_os = "espidf")]
use core::cell::{Cell, RefCell};
use core::task::Waker;
use core::time::Duration;
use std::sync::{Condvar, Mutex, Once, PoisonError};
#[cfg(target_os = "espidf")]
use std::sync::MutexGuard;

#[cfg(target_os = "espidf")]
static CRITICAL_SECTION_MUTEX: Mutex<()> = Mutex::new(());

#[cfg(target_os = "espidf")]
thread_local! {
    static CRITICAL_SECTION_DEPTH: Cell<u8> = const { Cell::new(0) };
    static CRITICAL_SECTION_GUARD: RefCell<Option<MutexGuard<'static, ()>>> = const { RefCell::new(None) };
}

/// Critical-section acquire used by `critical-section` 1.x.
#[cfg(target_os = "espidf")]
#[unsafe(no_mangle)]
pub extern "C" fn _critical_section_1_0_acquire() -> u8 {
    CRITICAL_SECTION_DEPTH.with(|depth| {
        CRITICAL_SECTION_GUARD.with(|guard| {
            let d = depth.get();
            if d == 0 {
                // The guarded value is `()`; a poisoned lock carries no
                // broken state.
                let lock = CRITICAL_SECTION_MUTEX
                    .lock()
                    .unwrap_or_else(PoisonError::into_inner);
                *guard.borrow_mut() = Some(lock);
            }
            let new_depth = d.saturating_add(1);
            depth.set(new_depth);
            new_depth
        })
    })
}

/// Critical-section release used by `critical-section` 1.x.
#[cfg(target_os = "espidf")]
#[unsafe(no_mangle)]
pub extern "C" fn _critical_section_1_0_release(_token: u8) {
    CRITICAL_SECTION_DEPTH.with(|depth| {
        CRITICAL_SECTION_GUARD.with(|guard| {
            let d = depth.get();
            if d == 0 {
                return;
            }
            let new_depth = d - 1;
            depth.set(new_depth);
            if new_depth == 0 {
                *guard.borrow_mut() = None;
            }
        })
    })
}

// ── embassy-time driver ───────────────────────────────────────

/// Microseconds since boot.
#[cfg(target_os = "espidf")]
#[unsafe(no_mangle)]
pub fn _embassy_time_now() -> u64 {
    // SAFETY: esp_timer is started by the ESP-IDF startup code.
    unsafe { esp_idf_svc::sys::esp_timer_get_time() as u64 }
}

/// Microseconds since the first clock read in this process.
#[cfg(not(target_os = "espidf"))]
#[unsafe(no_mangle)]
pub fn _embassy_time_now() -> u64 {
    use std::sync::OnceLock;
    use std::time::Instant;

    static EPOCH: OnceLock<Instant> = OnceLock::new();
    EPOCH.get_or_init(Instant::now).elapsed().as_micros() as u64
}

/// Wake `waker` once the clock reaches `at`.
#[unsafe(no_mangle)]
pub fn _embassy_time_schedule_wake(at: u64, waker: &Waker) {
    {
        let mut pending = WAKE_QUEUE.lock().unwrap_or_else(PoisonError::into_inner);
        match pending.iter_mut().find(|(_, w)| w.will_wake(waker)) {
            Some(entry) => entry.0 = entry.0.min(at),
            None => pending.push((at, waker.clone())),
        }
    }
    WAKE_READY.notify_one();
    WAKE_THREAD.call_once(start_wake_thread);
}

/// Timers waiting for their deadline, one entry per task waker.
static WAKE_QUEUE: Mutex<Vec<(u64, Waker)>> = Mutex::new(Vec::new());
static WAKE_READY: Condvar = Condvar::new();
static WAKE_THREAD: Once = Once::new();

const WAKE_THREAD_STACK: usize = 4 * 1024;

fn start_wake_thread() {
    let spawned = std::thread::Builder::new()
        .name("timer-wake".into())
        .stack_size(WAKE_THREAD_STACK)
        .spawn(run_wake_thread);
    if let Err(e) = spawned {
        // Timers never fire without this thread.
        log::error!("Timer: wake thread spawn failed ({}); async sleeps will hang", e);
    }
}

fn run_wake_thread() {
    let mut due = Vec::new();
    let mut pending = WAKE_QUEUE.lock().unwrap_or_else(PoisonError::into_inner);
    loop {
        let now = _embassy_time_now();
        let mut i = 0;
        while i < pending.len() {
            if pending[i].0 <= now {
                due.push(pending.swap_remove(i).1);
            } else {
                i += 1;
            }
        }

        if !due.is_empty() {
            drop(pending);
            due.drain(..).for_each(Waker::wake);
            pending = WAKE_QUEUE.lock().unwrap_or_else(PoisonError::into_inner);
            continue;
        }

        pending = match pending.iter().map(|(at, _)| *at).min() {
            Some(next) => {
                let wait = Duration::from_micros(next.saturating_sub(now));
                WAKE_READY
                    .wait_timeout(pending, wait)
                    .unwrap_or_else(PoisonError::into_inner)
                    .0
            }
            None => WAKE_READY.wait(pending).unwrap_or_else(PoisonError::into_inner),
        };
    }
}
