use std::collections::HashSet;

use crate::error::{NodeError, Result};

/// Known peer nodes and miner workers, stored as `host:port`.
#[derive(Debug, Default)]
pub struct PeerRegistry {
    nodes: HashSet<String>,
    miners: HashSet<String>,
}

impl PeerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `true` if the address was not known yet.
    pub fn register_node(&mut self, address: &str) -> Result<bool> {
        Ok(self.nodes.insert(normalize_address(address)?))
    }

    pub fn register_miner(&mut self, address: &str) -> Result<bool> {
        Ok(self.miners.insert(normalize_address(address)?))
    }

    pub fn nodes(&self) -> Vec<String> {
        sorted(&self.nodes)
    }

    pub fn miners(&self) -> Vec<String> {
        sorted(&self.miners)
    }
}

fn sorted(set: &HashSet<String>) -> Vec<String> {
    let mut out: Vec<String> = set.iter().cloned().collect();
    out.sort();
    out
}

/// Accept `host:port` or a full URL and reduce it to `host:port`.
pub fn normalize_address(address: &str) -> Result<String> {
    let trimmed = address.trim();
    let without_scheme = match trimmed.split_once("://") {
        Some((_, rest)) => rest,
        None => trimmed,
    };
    let authority = without_scheme
        .split('/')
        .next()
        .unwrap_or_default()
        .trim();
    if authority.is_empty() || authority.contains(char::is_whitespace) {
        return Err(NodeError::validation(format!("invalid node address {address:?}")));
    }
    Ok(authority.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalizes_address_forms() {
        assert_eq!(normalize_address("192.168.0.5:5000").unwrap(), "192.168.0.5:5000");
        assert_eq!(
            normalize_address("http://192.168.0.5:5000").unwrap(),
            "192.168.0.5:5000"
        );
        assert_eq!(
            normalize_address(" https://node.example:8080/api/v1 ").unwrap(),
            "node.example:8080"
        );
        assert!(normalize_address("").is_err());
        assert!(normalize_address("http://").is_err());
    }

    #[test]
    fn registry_is_a_set() {
        let mut reg = PeerRegistry::new();
        assert!(reg.register_node("http://10.0.0.1:5000").unwrap());
        assert!(!reg.register_node("10.0.0.1:5000").unwrap());
        assert!(reg.register_miner("10.0.0.9:6000").unwrap());
        assert_eq!(reg.nodes(), vec!["10.0.0.1:5000".to_string()]);
        assert_eq!(reg.miners(), vec!["10.0.0.9:6000".to_string()]);
    }
}
