use std::{ops::Deref, sync::Arc, thread, time::Duration, time::Instant};

use sharc::{upcast, SharedPtr};

trait Base: Send + Sync {
    fn name(&self) -> &'static str;
}

struct Derived;

impl Base for Derived {
    fn name(&self) -> &'static str {
        "Derived"
    }
}

impl Drop for Derived {
    fn drop(&mut self) {
        log::info!("Derived dropped on {:?}", thread::current().id());
    }
}

upcast!(Derived => dyn Base);

fn report(what: &str, ptr: &SharedPtr<dyn Base>) {
    log::info!(
        "{what}: get() = {:p}, use_count() = {}",
        *ptr,
        SharedPtr::use_count(ptr)
    );
}

fn share_between_threads() {
    let mut ptr: SharedPtr<dyn Base> = SharedPtr::into_upcast(SharedPtr::new(Derived));
    report("Created a shared Derived (as a pointer to Base)", &ptr);

    let handles: Vec<_> = (0..3)
        .map(|_| {
            let local = ptr.clone();
            thread::spawn(move || {
                thread::sleep(Duration::from_millis(50));
                let copy = local.clone();
                report(&format!("Local pointer to {} in a thread", copy.name()), &copy);
            })
        })
        .collect();

    SharedPtr::reset(&mut ptr);
    report("Shared ownership between 3 threads and released ownership from main", &ptr);

    for handle in handles {
        if handle.join().is_err() {
            log::error!("worker thread panicked");
        }
    }
    log::info!("All threads completed, the last one dropped Derived.");
}

fn test_clone_shared(n: f64) -> f64 {
    let ptr = SharedPtr::new(100);

    let start = Instant::now();
    for _ in 0..(n as u64) {
        std::hint::black_box(ptr.clone());
    }
    let end = Instant::now();
    (end - start).as_nanos() as f64 / n
}

fn test_clone_arc(n: f64) -> f64 {
    let arc = Arc::new(100);

    let start = Instant::now();
    for _ in 0..(n as u64) {
        std::hint::black_box(arc.clone());
    }
    let end = Instant::now();
    (end - start).as_nanos() as f64 / n
}

fn test_deref_shared(n: f64) -> f64 {
    let ptr = SharedPtr::new(100);

    let start = Instant::now();
    for _ in 0..(n as u64) {
        std::hint::black_box(ptr.deref());
    }
    let end = Instant::now();
    (end - start).as_nanos() as f64 / n
}

fn test_deref_arc(n: f64) -> f64 {
    let arc = Arc::new(100);

    let start = Instant::now();
    for _ in 0..(n as u64) {
        std::hint::black_box(arc.deref());
    }
    let end = Instant::now();
    (end - start).as_nanos() as f64 / n
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    share_between_threads();

    let n = 10e6;

    log::info!("Clone test SharedPtr ({}x): {}ns avg", n, test_clone_shared(n));
    log::info!("Clone test Arc ({}x): {}ns avg", n, test_clone_arc(n));

    log::info!("Deref test SharedPtr ({}x): {}ns avg", n, test_deref_shared(n));
    log::info!("Deref test Arc ({}x): {}ns avg", n, test_deref_arc(n));
}
