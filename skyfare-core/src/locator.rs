use rand::Rng;
use std::collections::VecDeque;
use std::sync::{Mutex, PoisonError};

/// Characters a locator is drawn from.
pub const LOCATOR_ALPHABET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";

/// Random source for booking locators.
pub trait LocatorSource: Send + Sync {
    /// Produce a candidate locator of exactly `len` uppercase alphanumerics.
    fn next_code(&self, len: usize) -> String;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct RandomLocatorSource;

impl LocatorSource for RandomLocatorSource {
    fn next_code(&self, len: usize) -> String {
        let mut rng = rand::thread_rng();
        (0..len)
            .map(|_| LOCATOR_ALPHABET[rng.gen_range(0..LOCATOR_ALPHABET.len())] as char)
            .collect()
    }
}

/// Replays a fixed list of codes, then falls back to random ones.
/// Used to force collisions in tests.
#[derive(Debug, Default)]
pub struct ScriptedLocatorSource {
    codes: Mutex<VecDeque<String>>,
}

impl ScriptedLocatorSource {
    pub fn new<I, S>(codes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            codes: Mutex::new(codes.into_iter().map(Into::into).collect()),
        }
    }
}

impl LocatorSource for ScriptedLocatorSource {
    fn next_code(&self, len: usize) -> String {
        let scripted = self
            .codes
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .pop_front();
        scripted.unwrap_or_else(|| RandomLocatorSource.next_code(len))
    }
}
