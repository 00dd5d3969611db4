use tracing::warn;

use crate::api::ApiError;

/// A value fetched from the server, tagged with the generation of the newest
/// request so older responses can be dropped.
#[derive(Debug, Clone)]
pub struct Loadable<T> {
    pub data: Option<T>,
    pub loading: bool,
    pub error: Option<String>,
    generation: u64,
}

impl<T> Default for Loadable<T> {
    fn default() -> Self {
        Self {
            data: None,
            loading: false,
            error: None,
            generation: 0,
        }
    }
}

impl<T> Loadable<T> {
    /// Starts a new request and returns its generation.
    pub fn begin(&mut self) -> u64 {
        self.generation += 1;
        self.loading = true;
        self.error = None;
        self.generation
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn is_current(&self, generation: u64) -> bool {
        generation == self.generation
    }

    /// Applies a response. Returns false when it belongs to a superseded
    /// request. On failure the previous data is kept.
    pub fn finish(&mut self, generation: u64, result: Result<T, ApiError>, context: &str) -> bool {
        if !self.is_current(generation) {
            return false;
        }
        self.loading = false;
        match result {
            Ok(data) => {
                self.data = Some(data);
                self.error = None;
            }
            Err(err) => {
                warn!("{} failed: {}", context, err);
                self.error = Some(format!("Failed to load {}: {}", context, err.user_message()));
            }
        }
        true
    }

    pub fn data(&self) -> Option<&T> {
        self.data.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn status(code: u16) -> ApiError {
        ApiError::Status {
            url: "http://test/jobs".to_string(),
            status: code,
            body: String::new(),
        }
    }

    #[test]
    fn test_stale_generation_is_ignored() {
        let mut value: Loadable<u32> = Loadable::default();
        let first = value.begin();
        let second = value.begin();
        assert!(!value.finish(first, Ok(1), "numbers"));
        assert!(value.loading);
        assert!(value.finish(second, Ok(2), "numbers"));
        assert_eq!(value.data(), Some(&2));
        assert!(!value.loading);
    }

    #[test]
    fn test_error_keeps_previous_data() {
        let mut value: Loadable<u32> = Loadable::default();
        let generation = value.begin();
        value.finish(generation, Ok(5), "numbers");
        let generation = value.begin();
        value.finish(generation, Err(status(500)), "numbers");
        assert_eq!(value.data(), Some(&5));
        assert!(value.error.as_deref().unwrap().starts_with("Failed to load numbers"));
    }
}
