#[cfg(test)]
static ENV_MUTEX: std::sync::Mutex<()> = std::sync::Mutex::new(());

#[cfg(test)]
pub(crate) fn env_lock() -> std::sync::MutexGuard<'static, ()> {
    ENV_MUTEX.lock().expect("env lock")
}

#[cfg(test)]
pub(crate) fn with_env_lock<F, R>(func: F) -> R
where
    F: FnOnce() -> R,
{
    let _guard = env_lock();
    func()
}
