//! Thread priority helper for the dispatch worker.

/// Raise the calling thread's scheduling priority so dispatch ticks stay
/// close to the frame cadence under load.
///
/// On Linux this requests `SCHED_RR`; real-time policies need elevated
/// privileges and the call fails silently without them. On macOS it maps to a
/// user-initiated QoS class. Elsewhere it is a no-op.
pub fn promote_dispatch_thread() {
    #[cfg(target_os = "linux")]
    unsafe {
        use libc::{pthread_self, pthread_setschedparam, sched_param, SCHED_RR};

        let mut param: sched_param = std::mem::zeroed();
        param.sched_priority = 30;
        let _ = pthread_setschedparam(pthread_self(), SCHED_RR, &param);
    }
    #[cfg(target_os = "macos")]
    unsafe {
        // pthread/qos.h: QOS_CLASS_USER_INITIATED
        const QOS_CLASS_USER_INITIATED: u32 = 0x19;

        extern "C" {
            fn pthread_set_qos_class_self_np(qos_class: u32, relative_priority: i32) -> i32;
        }

        let _ = pthread_set_qos_class_self_np(QOS_CLASS_USER_INITIATED, 0);
    }
}
