//! Egress proxy rotation: shuffle once, then round-robin on failure.

use rand::seq::SliceRandom;
use rand::Rng;

use crate::error::AurionError;

#[derive(Debug, Clone, Default)]
pub struct ProxyPool {
    endpoints: Vec<String>,
    current: usize,
}

impl ProxyPool {
    /// Keep `endpoints` in the given order.
    pub fn ordered(endpoints: Vec<String>) -> Result<Self, AurionError> {
        for endpoint in &endpoints {
            validate(endpoint)?;
        }
        Ok(Self {
            endpoints,
            current: 0,
        })
    }

    /// Shuffle `endpoints` once with `rng`, then rotate in that order.
    pub fn shuffled<R: Rng + ?Sized>(
        mut endpoints: Vec<String>,
        rng: &mut R,
    ) -> Result<Self, AurionError> {
        endpoints.shuffle(rng);
        Self::ordered(endpoints)
    }

    pub fn is_empty(&self) -> bool {
        self.endpoints.is_empty()
    }

    pub fn len(&self) -> usize {
        self.endpoints.len()
    }

    pub fn endpoints(&self) -> &[String] {
        &self.endpoints
    }

    pub fn current(&self) -> Option<&str> {
        self.endpoints.get(self.current).map(String::as_str)
    }

    /// Advance to the next endpoint. Returns `false` when there is nothing
    /// to rotate to (zero or one endpoint).
    pub fn rotate(&mut self) -> bool {
        if self.endpoints.len() <= 1 {
            return false;
        }
        self.current = (self.current + 1) % self.endpoints.len();
        true
    }
}

fn validate(endpoint: &str) -> Result<(), AurionError> {
    url::Url::parse(endpoint)
        .map(|_| ())
        .map_err(|e| AurionError::InvalidProxy {
            url: endpoint.to_string(),
            reason: e.to_string(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn endpoints() -> Vec<String> {
        vec![
            "http://10.0.0.1:3128".to_string(),
            "http://10.0.0.2:3128".to_string(),
            "http://10.0.0.3:3128".to_string(),
        ]
    }

    #[test]
    fn test_round_robin() {
        let mut pool = ProxyPool::ordered(endpoints()).unwrap();
        assert_eq!(pool.current(), Some("http://10.0.0.1:3128"));
        assert!(pool.rotate());
        assert_eq!(pool.current(), Some("http://10.0.0.2:3128"));
        assert!(pool.rotate());
        assert!(pool.rotate());
        assert_eq!(pool.current(), Some("http://10.0.0.1:3128"));
    }

    #[test]
    fn test_single_or_empty_pool_does_not_rotate() {
        let mut empty = ProxyPool::default();
        assert!(!empty.rotate());
        assert_eq!(empty.current(), None);

        let mut single = ProxyPool::ordered(vec!["http://10.0.0.1:3128".into()]).unwrap();
        assert!(!single.rotate());
        assert_eq!(single.current(), Some("http://10.0.0.1:3128"));
    }

    #[test]
    fn test_shuffle_is_reproducible_with_seed() {
        let a = ProxyPool::shuffled(endpoints(), &mut StdRng::seed_from_u64(7)).unwrap();
        let b = ProxyPool::shuffled(endpoints(), &mut StdRng::seed_from_u64(7)).unwrap();
        assert_eq!(a.endpoints(), b.endpoints());

        let mut sorted = a.endpoints().to_vec();
        sorted.sort();
        assert_eq!(sorted, endpoints());
    }

    #[test]
    fn test_invalid_endpoint_rejected() {
        let err = ProxyPool::ordered(vec!["not a url".into()]).unwrap_err();
        assert!(matches!(err, AurionError::InvalidProxy { .. }));
    }
}
