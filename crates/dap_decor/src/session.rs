//! Shared per-session state.
//!
//! Every field has exactly one writing task; readers may race. Boolean flags
//! publish with release stores and acquire loads, the compound fields sit
//! behind short-lived mutexes that are never held across an await point.

use std::sync::{
    atomic::{AtomicBool, Ordering},
    Mutex, MutexGuard, PoisonError,
};

use crate::protocol::GracefulShutdown;

#[derive(Debug, Default)]
pub struct Session {
    client_supports_run_in_terminal: AtomicBool,
    process_running: AtomicBool,
    terminate_on_disconnect: AtomicBool,
    pre_terminate_commands: Mutex<Vec<String>>,
    exit_commands: Mutex<Vec<String>>,
    graceful_shutdown: Mutex<Option<GracefulShutdown>>,
    launch_program: Mutex<Option<String>>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl Session {
    pub fn new() -> Session {
        Session::default()
    }

    pub fn client_supports_run_in_terminal(&self) -> bool {
        self.client_supports_run_in_terminal.load(Ordering::Acquire)
    }

    pub fn set_client_supports_run_in_terminal(&self, value: bool) {
        self.client_supports_run_in_terminal
            .store(value, Ordering::Release);
    }

    pub fn process_running(&self) -> bool {
        self.process_running.load(Ordering::Acquire)
    }

    pub fn set_process_running(&self, value: bool) {
        self.process_running.store(value, Ordering::Release);
    }

    pub fn terminate_on_disconnect(&self) -> bool {
        self.terminate_on_disconnect.load(Ordering::Acquire)
    }

    pub fn set_terminate_on_disconnect(&self, value: bool) {
        self.terminate_on_disconnect.store(value, Ordering::Release);
    }

    pub fn pre_terminate_commands(&self) -> Vec<String> {
        lock(&self.pre_terminate_commands).clone()
    }

    pub fn set_pre_terminate_commands(&self, commands: Vec<String>) {
        *lock(&self.pre_terminate_commands) = commands;
    }

    pub fn exit_commands(&self) -> Vec<String> {
        lock(&self.exit_commands).clone()
    }

    pub fn set_exit_commands(&self, commands: Vec<String>) {
        *lock(&self.exit_commands) = commands;
    }

    pub fn graceful_shutdown(&self) -> Option<GracefulShutdown> {
        lock(&self.graceful_shutdown).clone()
    }

    pub fn set_graceful_shutdown(&self, value: Option<GracefulShutdown>) {
        *lock(&self.graceful_shutdown) = value;
    }

    pub fn launch_program(&self) -> Option<String> {
        lock(&self.launch_program).clone()
    }

    pub fn set_launch_program(&self, program: Option<String>) {
        *lock(&self.launch_program) = program;
    }
}
